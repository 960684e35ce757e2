use clap::Parser;
use image::{GrayImage, Luma};
use imgdupe::cli::Cli;
use imgdupe::error::ExitCode;
use imgdupe::scanner::PerceptualHasher;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn ramp(width: u32, rising: bool) -> GrayImage {
    GrayImage::from_fn(width, width, |x, _| {
        let v = (x * 255 / (width - 1)) as u8;
        Luma([if rising { v } else { 255 - v }])
    })
}

fn run(args: &[&str]) -> anyhow::Result<ExitCode> {
    let mut argv = vec!["imgdupe", "-q"];
    argv.extend_from_slice(args);
    imgdupe::run_app(Cli::try_parse_from(argv).unwrap())
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_exit_code_success_with_duplicates() {
    let dir = tempdir().unwrap();
    ramp(64, true).save(dir.path().join("a.png")).unwrap();
    ramp(100, true).save(dir.path().join("b.png")).unwrap();

    let code = run(&["scan", path_str(dir.path()), "--output", "json"]).unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_exit_code_no_duplicates() {
    let dir = tempdir().unwrap();
    ramp(64, true).save(dir.path().join("a.png")).unwrap();
    ramp(64, false).save(dir.path().join("b.png")).unwrap();

    let code = run(&["scan", path_str(dir.path())]).unwrap();
    assert_eq!(code, ExitCode::NoDuplicates);
}

#[test]
fn test_exit_code_partial_success_on_broken_image() {
    let dir = tempdir().unwrap();
    ramp(64, true).save(dir.path().join("a.png")).unwrap();
    ramp(100, true).save(dir.path().join("b.png")).unwrap();
    fs::write(dir.path().join("broken.jpg"), b"not a jpeg").unwrap();

    let code = run(&["scan", path_str(dir.path()), "--output", "csv"]).unwrap();
    assert_eq!(code, ExitCode::PartialSuccess);
}

#[test]
fn test_error_on_invalid_path() {
    let result = run(&["scan", "/non/existent/path/that/should/not/exist"]);
    let err = result.unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
}

#[test]
fn test_error_on_threshold_wider_than_fingerprint() {
    let dir = tempdir().unwrap();
    assert!(run(&["scan", path_str(dir.path()), "-t", "65"]).is_err());
    // 4x4 reduction gives 16-bit fingerprints
    assert!(run(&["scan", path_str(dir.path()), "--hash-size", "4", "-t", "17"]).is_err());
}

#[test]
fn test_high_threshold_is_accepted() {
    let dir = tempdir().unwrap();
    ramp(64, true).save(dir.path().join("a.png")).unwrap();

    let code = run(&["scan", path_str(dir.path()), "-t", "20"]).unwrap();
    assert_eq!(code, ExitCode::NoDuplicates);
}

#[test]
fn test_error_on_invalid_hash_size() {
    let dir = tempdir().unwrap();
    assert!(run(&["scan", path_str(dir.path()), "--hash-size", "1"]).is_err());
    assert!(run(&["scan", path_str(dir.path()), "--hash-size", "65"]).is_err());
}

#[test]
fn test_hash_command() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("a.png");
    ramp(64, true).save(&image).unwrap();

    assert_eq!(
        run(&["hash", path_str(&image), "-a", "ahash"]).unwrap(),
        ExitCode::Success
    );

    let missing = dir.path().join("missing.png");
    assert_eq!(
        run(&["hash", path_str(&image), path_str(&missing)]).unwrap(),
        ExitCode::PartialSuccess
    );
    assert!(run(&["hash", path_str(&missing)]).is_err());
}

#[test]
fn test_compare_command() {
    assert_eq!(
        run(&["compare", "0ff", "00f", "--hash-size", "3"]).unwrap(),
        ExitCode::Success
    );
    assert!(run(&["compare", "ff", "00f", "--hash-size", "3"]).is_err());
    assert!(run(&["compare", "zz", "00"]).is_err());
}

#[test]
fn test_hash_output_is_stable_across_calls() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("a.png");
    ramp(50, false).save(&image).unwrap();

    let hasher = PerceptualHasher::default();
    let first = hasher.compute_hash(&image).unwrap();
    let second = hasher.compute_hash(&image).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_hex(), "ffffffffffffffff");
}
