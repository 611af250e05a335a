use super::schema::SuiteConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: '{value}'")]
    Env { key: String, value: String },
}

/// Variable overrides taken from an env file and the process environment.
pub type EnvOverrides = HashMap<String, String>;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./kuit.yaml
    /// 2. ~/.kuit/config.yaml
    /// 3. Default configuration
    pub async fn load_default() -> Result<SuiteConfig, ConfigError> {
        let local_config = PathBuf::from("./kuit.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".kuit").join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Ok(SuiteConfig::default())
    }

    pub async fn load_from(path: &Path) -> Result<SuiteConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        if content.trim().is_empty() {
            return Ok(SuiteConfig::default());
        }
        let config: SuiteConfig = serde_yaml::from_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Build the suite configuration once at startup.
    ///
    /// Precedence, lowest first: config file (or defaults), env file,
    /// process environment.
    pub async fn load(
        config_path: Option<&Path>,
        env_file: Option<&Path>,
    ) -> Result<SuiteConfig, ConfigError> {
        let config = match config_path {
            Some(path) => Self::load_from(path).await?,
            None => Self::load_default().await?,
        };

        let mut overrides = EnvOverrides::new();
        if let Some(path) = env_file {
            if path.exists() {
                let content = tokio::fs::read_to_string(path).await?;
                overrides.extend(parse_env_file(&content));
                info!("Loaded environment overrides from {}", path.display());
            } else {
                debug!("Env file {} not present, skipping", path.display());
            }
        }
        overrides.extend(std::env::vars().filter(|(key, _)| KNOWN_KEYS.contains(&key.as_str())));

        apply_overrides(config, &overrides)
    }
}

const KNOWN_KEYS: &[&str] = &[
    "BASE_URL",
    "API_MEFELINE_URL",
    "API_MAINTENANCE_URL",
    "API_SDNTRACE_URL",
    "API_SWITCHES_URL",
    "API_LINKS_URL",
    "API_INTERFACES_URL",
    "DEFAULT_TIMEOUT",
    "RECONCILE_TIMEOUT",
    "HEADLESS",
    "CHROMEDRIVER",
    "WEBDRIVER_URL",
    "SWITCH_FILTER",
    "LINK_FILTER",
    "INTERFACE_FILTER",
];

/// Parse `KEY=VALUE` lines. Blank lines and `#` comments are skipped,
/// an `export ` prefix is tolerated and matching outer quotes are removed.
pub fn parse_env_file(content: &str) -> EnvOverrides {
    let mut vars = EnvOverrides::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        let value = value.trim();
        let value = ['"', '\'']
            .iter()
            .find_map(|q| {
                value
                    .strip_prefix(*q)
                    .and_then(|rest| rest.strip_suffix(*q))
            })
            .unwrap_or(value);
        vars.insert(key.trim().to_string(), value.to_string());
    }
    vars
}

/// Apply environment-style overrides on top of a loaded configuration.
pub fn apply_overrides(
    mut config: SuiteConfig,
    vars: &EnvOverrides,
) -> Result<SuiteConfig, ConfigError> {
    let get = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();

    if let Some(url) = get("BASE_URL") {
        config.ui.base_url = url;
    }
    if let Some(url) = get("API_MEFELINE_URL") {
        config.api.circuits = Some(url);
    }
    if let Some(url) = get("API_MAINTENANCE_URL") {
        config.api.maintenance = Some(url);
    }
    if let Some(url) = get("API_SDNTRACE_URL") {
        config.api.traces = Some(url);
    }
    if let Some(url) = get("API_SWITCHES_URL") {
        config.api.switches = Some(url);
    }
    if let Some(url) = get("API_LINKS_URL") {
        config.api.links = Some(url);
    }
    if let Some(url) = get("API_INTERFACES_URL") {
        config.api.interfaces = Some(url);
    }
    if let Some(secs) = get("DEFAULT_TIMEOUT") {
        config.timeouts.default_wait_ms = parse_seconds("DEFAULT_TIMEOUT", &secs)?;
    }
    if let Some(secs) = get("RECONCILE_TIMEOUT") {
        config.timeouts.reconcile_ms = parse_seconds("RECONCILE_TIMEOUT", &secs)?;
    }
    if let Some(flag) = get("HEADLESS") {
        config.browser.headless = !flag.eq_ignore_ascii_case("false");
    }
    if let Some(path) = get("CHROMEDRIVER") {
        config.browser.driver_path = Some(PathBuf::from(path));
    }
    if let Some(url) = get("WEBDRIVER_URL") {
        config.browser.webdriver_url = Some(url);
    }
    if let Some(value) = get("SWITCH_FILTER") {
        config.status_filters.switch = Some(value);
    }
    if let Some(value) = get("LINK_FILTER") {
        config.status_filters.link = Some(value);
    }
    if let Some(value) = get("INTERFACE_FILTER") {
        config.status_filters.interface = Some(value);
    }
    Ok(config)
}

fn parse_seconds(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|secs| secs.checked_mul(1000))
        .ok_or_else(|| ConfigError::Env {
            key: key.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_file() {
        let vars = parse_env_file(
            "# comment\n\nBASE_URL=http://10.0.0.1:18181\nexport HEADLESS='false'\nSWITCH_FILTER=\"MIA\"\nnot a pair\n",
        );
        assert_eq!(vars.get("BASE_URL").unwrap(), "http://10.0.0.1:18181");
        assert_eq!(vars.get("HEADLESS").unwrap(), "false");
        assert_eq!(vars.get("SWITCH_FILTER").unwrap(), "MIA");
        assert_eq!(vars.len(), 3);
    }

    #[test]
    fn test_headless_only_disabled_by_false() {
        let mut vars = EnvOverrides::new();
        vars.insert("HEADLESS".into(), "FALSE".into());
        let config = apply_overrides(SuiteConfig::default(), &vars).unwrap();
        assert!(!config.browser.headless);

        vars.insert("HEADLESS".into(), "no".into());
        let config = apply_overrides(SuiteConfig::default(), &vars).unwrap();
        assert!(config.browser.headless);
    }

    #[test]
    fn test_default_timeout_is_seconds() {
        let mut vars = EnvOverrides::new();
        vars.insert("DEFAULT_TIMEOUT".into(), "15".into());
        let config = apply_overrides(SuiteConfig::default(), &vars).unwrap();
        assert_eq!(config.timeouts.default_wait_ms, 15000);

        vars.insert("DEFAULT_TIMEOUT".into(), "soon".into());
        assert!(matches!(
            apply_overrides(SuiteConfig::default(), &vars),
            Err(ConfigError::Env { .. })
        ));
    }

    #[test]
    fn test_timeout_too_large_for_millis_is_rejected() {
        let mut vars = EnvOverrides::new();
        vars.insert("RECONCILE_TIMEOUT".into(), u64::MAX.to_string());
        match apply_overrides(SuiteConfig::default(), &vars) {
            Err(ConfigError::Env { key, .. }) => assert_eq!(key, "RECONCILE_TIMEOUT"),
            other => panic!("expected an env error, got {:?}", other),
        }
    }

    #[test]
    fn test_api_urls_follow_base_url() {
        let mut vars = EnvOverrides::new();
        vars.insert("BASE_URL".into(), "http://ctl:8181/".into());
        vars.insert(
            "API_SDNTRACE_URL".into(),
            "http://other/api/amlight/sdntrace/v1/trace".into(),
        );
        let urls = apply_overrides(SuiteConfig::default(), &vars)
            .unwrap()
            .api_urls();
        assert_eq!(urls.circuits, "http://ctl:8181/api/kytos/mef_eline/v2/evc/");
        assert_eq!(urls.traces, "http://other/api/amlight/sdntrace/v1/trace");
    }
}
