use super::load_existing_config as load_existing_config_impl;
use tempfile::TempDir;

#[test]
fn load_existing_config_falls_back_to_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = load_existing_config_impl(temp_dir.path());

    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert!(config.validate().is_ok());
}

#[test]
fn load_existing_config_ignores_broken_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    std::fs::write(temp_dir.path().join("config.toml"), "provider = [").expect("write config");

    let config = load_existing_config_impl(temp_dir.path());

    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert_eq!(config.retrieval.top_k, 4);
}
