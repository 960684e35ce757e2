use figment::providers::{Format, Serialized, Toml};
use figment::Figment;
use imgdupe::config::{check_threshold, Config, ConfigError};
use imgdupe::scanner::{HashSize, PerceptualAlgorithm};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_load_from_env() {
    // Threads only: other tests in this binary load the config concurrently.
    std::env::set_var("IMGDUPE_THREADS", "3");

    let config: Config = Config::figment(None).extract().unwrap();
    assert_eq!(config.threads, 3);

    std::env::remove_var("IMGDUPE_THREADS");
}

#[test]
fn test_config_load_from_toml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
algorithm = "phash"
threshold = 3
hash_size = 12
follow_symlinks = true
skip_hidden = true
extensions = ["jpg", "png"]
"#,
    )
    .unwrap();

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .extract()
        .unwrap();

    assert_eq!(config.algorithm, PerceptualAlgorithm::Phash);
    assert_eq!(config.threshold, 3);
    assert_eq!(config.hash_size.bits(), 144);
    assert!(config.follow_symlinks);
    assert!(config.skip_hidden);
    assert_eq!(config.extensions, vec!["jpg", "png"]);
}

#[test]
fn test_config_threshold_is_checked_against_final_hash_size() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "hash_size = 2\nthreshold = 5\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert!(matches!(
        check_threshold(config.threshold, config.hash_size),
        Err(ConfigError::ThresholdTooLarge {
            threshold: 5,
            bits: 4
        })
    ));
    assert!(check_threshold(config.threshold, HashSize::new(3).unwrap()).is_ok());
}

#[test]
fn test_config_malformed_toml_is_fatal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "threshold = \"five\"\n").unwrap();

    assert!(matches!(Config::load(Some(&path)), Err(ConfigError::Load(_))));
}
