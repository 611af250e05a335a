use kuit_engine::config::{ConfigError, ConfigLoader, DEFAULT_BASE_URL};
use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;

fn file_with(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[tokio::test]
#[serial]
async fn test_yaml_values_and_defaults() {
    let yaml = file_with(
        "ui:\n  base_url: http://10.0.0.1:8181\ntimeouts:\n  reconcile_ms: 5000\nbrowser:\n  headless: false\n",
    );

    let config = ConfigLoader::load_from(yaml.path()).await.unwrap();
    assert_eq!(config.ui.base_url, "http://10.0.0.1:8181");
    assert_eq!(config.timeouts.reconcile_ms, 5000);
    assert_eq!(config.timeouts.default_wait_ms, 10000);
    assert!(!config.browser.headless);
    assert_eq!(
        config.api_urls().maintenance,
        "http://10.0.0.1:8181/api/kytos/maintenance/v1/"
    );
}

#[tokio::test]
#[serial]
async fn test_empty_file_gives_defaults() {
    let yaml = file_with("  \n");
    let config = ConfigLoader::load_from(yaml.path()).await.unwrap();
    assert_eq!(config.ui.base_url, DEFAULT_BASE_URL);
}

#[tokio::test]
#[serial]
async fn test_malformed_yaml_is_a_parse_error() {
    let yaml = file_with("ui: [unclosed\n");
    assert!(matches!(
        ConfigLoader::load_from(yaml.path()).await,
        Err(ConfigError::Parse(_))
    ));
}

#[tokio::test]
#[serial]
async fn test_env_file_overrides_yaml() {
    let yaml = file_with("ui:\n  base_url: http://from-yaml:8181\n");
    let env = file_with("# controller under test\nBASE_URL=http://from-env:8181\nRECONCILE_TIMEOUT=3\n");

    let config = ConfigLoader::load(Some(yaml.path()), Some(env.path()))
        .await
        .unwrap();
    assert_eq!(config.ui.base_url, "http://from-env:8181");
    assert_eq!(config.timeouts.reconcile_ms, 3000);
}

#[tokio::test]
#[serial]
async fn test_missing_env_file_is_skipped() {
    let yaml = file_with("ui:\n  base_url: http://from-yaml:8181\n");
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join(".env");

    let config = ConfigLoader::load(Some(yaml.path()), Some(&missing))
        .await
        .unwrap();
    assert_eq!(config.ui.base_url, "http://from-yaml:8181");
}

#[tokio::test]
#[serial]
async fn test_process_env_wins_over_env_file() {
    let env = file_with("LINK_FILTER=from-file\n");
    let yaml = file_with("");
    // SAFETY: serialized with every other test that reads the environment.
    unsafe { std::env::set_var("LINK_FILTER", "from-process") };

    let loaded = ConfigLoader::load(Some(yaml.path()), Some(env.path())).await;
    unsafe { std::env::remove_var("LINK_FILTER") };

    let config = loaded.unwrap();
    assert_eq!(config.status_filters.link.as_deref(), Some("from-process"));
}
