use clap::Parser;
use image::{GrayImage, Luma};
use imgdupe::cli::Cli;
use imgdupe::error::ExitCode;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

fn ramp(width: u32, rising: bool) -> GrayImage {
    GrayImage::from_fn(width, width, |x, _| {
        let v = (x * 255 / (width - 1)) as u8;
        Luma([if rising { v } else { 255 - v }])
    })
}

/// `photos/` with a, its resized copy b, and an unrelated c.
fn setup() -> (TempDir, PathBuf) {
    let root = tempdir().unwrap();
    let photos = root.path().join("photos");
    fs::create_dir(&photos).unwrap();
    ramp(64, true).save(photos.join("a.png")).unwrap();
    ramp(96, true).save(photos.join("b.png")).unwrap();
    ramp(64, false).save(photos.join("c.png")).unwrap();
    (root, photos)
}

fn run(args: &[&str]) -> ExitCode {
    let mut argv = vec!["imgdupe", "-q"];
    argv.extend_from_slice(args);
    imgdupe::run_app(Cli::try_parse_from(argv).unwrap()).unwrap()
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn copy_logs(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with("image_copy_log_"))
        })
        .collect()
}

#[test]
fn test_organize_default_folders() {
    let (root, photos) = setup();

    let code = run(&["scan", photos.to_str().unwrap(), "--organize", "-y"]);
    assert_eq!(code, ExitCode::Success);

    let base = root.path().canonicalize().unwrap();
    assert_eq!(listing(&base.join("photos_unique")), vec!["a.png", "c.png"]);
    assert_eq!(listing(&base.join("photos_duplicates")), vec!["b.png"]);
    assert_eq!(listing(&photos), vec!["a.png", "b.png", "c.png"]);

    let logs = copy_logs(&base);
    assert_eq!(logs.len(), 1);
    let log = fs::read_to_string(&logs[0]).unwrap();
    assert!(log.contains("KEEP: "));
    assert!(log.contains("DUPLICATE: "));
    assert!(log.contains("UNIQUE: "));
}

#[test]
fn test_organize_custom_folders_and_log_dir() {
    let (_root, photos) = setup();
    let out = tempdir().unwrap();
    let unique = out.path().join("keep");
    let dups = out.path().join("dups");
    let logs = out.path().join("logs");

    let code = run(&[
        "scan",
        photos.to_str().unwrap(),
        "--organize",
        "-y",
        "--unique-dir",
        unique.to_str().unwrap(),
        "--duplicate-dir",
        dups.to_str().unwrap(),
        "--log-dir",
        logs.to_str().unwrap(),
    ]);

    assert_eq!(code, ExitCode::Success);
    assert_eq!(listing(&unique), vec!["a.png", "c.png"]);
    assert_eq!(listing(&dups), vec!["b.png"]);
    assert_eq!(copy_logs(&logs).len(), 1);
}

#[test]
fn test_organize_copies_undecodable_images_as_unique() {
    let (_root, photos) = setup();
    fs::write(photos.join("broken.jpg"), b"garbage").unwrap();
    let out = tempdir().unwrap();
    let unique = out.path().join("u");

    let code = run(&[
        "scan",
        photos.to_str().unwrap(),
        "--organize",
        "-y",
        "--unique-dir",
        unique.to_str().unwrap(),
        "--duplicate-dir",
        out.path().join("d").to_str().unwrap(),
    ]);

    assert_eq!(code, ExitCode::PartialSuccess);
    assert_eq!(listing(&unique), vec!["a.png", "broken.jpg", "c.png"]);
}

#[test]
fn test_organize_dry_run_writes_nothing() {
    let (root, photos) = setup();

    let code = run(&["scan", photos.to_str().unwrap(), "--organize", "--dry-run"]);
    assert_eq!(code, ExitCode::Success);

    assert_eq!(listing(root.path()), vec!["photos"]);
}

#[test]
fn test_organize_skipped_without_duplicates() {
    let root = tempdir().unwrap();
    let photos = root.path().join("photos");
    fs::create_dir(&photos).unwrap();
    ramp(64, true).save(photos.join("a.png")).unwrap();

    let code = run(&["scan", photos.to_str().unwrap(), "--organize", "-y"]);
    assert_eq!(code, ExitCode::NoDuplicates);
    assert_eq!(listing(root.path()), vec!["photos"]);
}
