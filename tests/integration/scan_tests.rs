use image::{GrayImage, Luma};
use imgdupe::duplicates::{DuplicateFinder, FinderConfig, FinderError};
use imgdupe::scanner::{HashSize, PerceptualAlgorithm, WalkerConfig};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Left-to-right brightness ramp.
fn ramp(width: u32, height: u32, rising: bool) -> GrayImage {
    GrayImage::from_fn(width, height, |x, _| {
        let v = (x * 255 / (width - 1)) as u8;
        Luma([if rising { v } else { 255 - v }])
    })
}

/// Bright in the middle, dark at both edges.
fn tent(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, _| {
        let half = width / 2;
        let d = x.abs_diff(half);
        Luma([(255 - d * 255 / half) as u8])
    })
}

fn populate(dir: &Path) {
    ramp(64, 64, true).save(dir.join("a.png")).unwrap();
    ramp(128, 96, true).save(dir.join("b.png")).unwrap();
    ramp(64, 64, false).save(dir.join("c.png")).unwrap();
    tent(64, 64).save(dir.join("d.png")).unwrap();
}

fn names<'a>(paths: impl Iterator<Item = &'a Path>) -> Vec<String> {
    paths
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let (result, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(summary.total_files, 0);
    assert_eq!(summary.duplicate_groups, 0);
}

#[test]
fn test_scan_finds_resized_copy() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let (result, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(summary.total_files, 4);
    assert_eq!(summary.images_hashed, 4);
    assert_eq!(summary.duplicate_groups, 1);
    assert_eq!(summary.duplicate_files, 1);

    let group = &result.groups()[0];
    assert_eq!(
        names(group.members().iter().map(|m| m.entry.path.as_path())),
        vec!["a.png", "b.png"]
    );
    assert_eq!(
        names(result.ungrouped().iter().map(|m| m.entry.path.as_path())),
        vec!["c.png", "d.png"]
    );
}

#[test]
fn test_scan_every_algorithm_groups_identical_files() {
    let dir = tempdir().unwrap();
    tent(40, 40).save(dir.path().join("one.png")).unwrap();
    fs::copy(dir.path().join("one.png"), dir.path().join("two.png")).unwrap();

    for algorithm in PerceptualAlgorithm::ALL {
        let finder = DuplicateFinder::new(FinderConfig::default().with_algorithm(algorithm));
        let (result, _) = finder.find_duplicates(dir.path()).unwrap();
        assert_eq!(result.groups().len(), 1, "{algorithm}");
        assert_eq!(result.groups()[0].len(), 2, "{algorithm}");
    }
}

#[test]
fn test_scan_threshold_zero_still_groups_exact_matches() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let finder = DuplicateFinder::new(FinderConfig::default().with_threshold(0));
    let (result, _) = finder.find_duplicates(dir.path()).unwrap();

    assert_eq!(result.groups().len(), 1);
}

#[test]
fn test_scan_larger_hash_size() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let finder = DuplicateFinder::new(
        FinderConfig::default()
            .with_hash_size(HashSize::new(16).unwrap())
            .with_threshold(10),
    );
    let (result, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert_eq!(summary.hash_bits, 256);
    assert_eq!(result.groups().len(), 1);
    assert_eq!(result.groups()[0].representative().fingerprint.bits(), 256);
}

#[test]
fn test_scan_continues_past_undecodable_files() {
    let dir = tempdir().unwrap();
    populate(dir.path());
    fs::write(dir.path().join("broken.png"), b"\x89PNG but not really").unwrap();
    fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

    let (result, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(summary.total_files, 5);
    assert_eq!(summary.images_hashed, 4);
    assert_eq!(summary.skipped.len(), 1);
    assert!(summary.skipped[0].path.ends_with("broken.png"));
    assert_eq!(result.groups().len(), 1);
}

#[test]
fn test_scan_respects_extension_filter() {
    let dir = tempdir().unwrap();
    populate(dir.path());
    ramp(64, 64, true)
        .save(dir.path().join("copy.bmp"))
        .unwrap();

    let walker_config = WalkerConfig {
        extensions: vec!["png".to_string()],
        ..Default::default()
    };
    let finder = DuplicateFinder::new(FinderConfig::default().with_walker_config(walker_config));
    let (result, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert_eq!(summary.total_files, 4);
    assert_eq!(result.groups()[0].len(), 2);
}

#[test]
fn test_scan_nested_directories_in_sorted_order() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("b_album");
    fs::create_dir(&nested).unwrap();
    ramp(64, 64, true).save(nested.join("z.png")).unwrap();
    ramp(80, 80, true).save(dir.path().join("a.png")).unwrap();
    ramp(90, 90, true).save(dir.path().join("c.png")).unwrap();

    let (result, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    let group = &result.groups()[0];
    assert_eq!(
        names(group.members().iter().map(|m| m.entry.path.as_path())),
        vec!["a.png", "z.png", "c.png"]
    );
}

#[test]
fn test_scan_single_thread_matches_parallel() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let single = DuplicateFinder::new(FinderConfig::default().with_io_threads(1))
        .find_duplicates(dir.path())
        .unwrap()
        .0;
    let parallel = DuplicateFinder::new(FinderConfig::default().with_io_threads(8))
        .find_duplicates(dir.path())
        .unwrap()
        .0;

    assert_eq!(single, parallel);
}

#[test]
fn test_scan_rejects_file_path() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let result = DuplicateFinder::with_defaults().find_duplicates(&dir.path().join("a.png"));
    assert!(matches!(result, Err(FinderError::NotADirectory(_))));
}
