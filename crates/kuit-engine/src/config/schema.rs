use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:18181";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteConfig {
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub status_filters: StatusFilters,
}

impl SuiteConfig {
    /// API endpoints, with unset entries derived from the UI base URL.
    pub fn api_urls(&self) -> ApiUrls {
        let base = self.ui.base_url.trim_end_matches('/');
        let or_default = |value: &Option<String>, path: &str| {
            value
                .clone()
                .unwrap_or_else(|| format!("{}{}", base, path))
        };
        ApiUrls {
            circuits: or_default(&self.api.circuits, "/api/kytos/mef_eline/v2/evc/"),
            maintenance: or_default(&self.api.maintenance, "/api/kytos/maintenance/v1/"),
            traces: or_default(&self.api.traces, "/api/amlight/sdntrace/v1/trace"),
            switches: or_default(&self.api.switches, "/api/kytos/topology/v3/switches"),
            links: or_default(&self.api.links, "/api/kytos/topology/v3/links"),
            interfaces: or_default(&self.api.interfaces, "/api/kytos/topology/v3/interfaces"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub circuits: Option<String>,
    #[serde(default)]
    pub maintenance: Option<String>,
    #[serde(default)]
    pub traces: Option<String>,
    #[serde(default)]
    pub switches: Option<String>,
    #[serde(default)]
    pub links: Option<String>,
    #[serde(default)]
    pub interfaces: Option<String>,
}

/// Fully resolved API endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiUrls {
    pub circuits: String,
    pub maintenance: String,
    pub traces: String,
    pub switches: String,
    pub links: String,
    pub interfaces: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// Bound for every element wait.
    #[serde(default = "default_wait_ms")]
    pub default_wait_ms: u64,
    /// Shared reconciliation deadline for positive and negative scenarios.
    #[serde(default = "default_reconcile_ms")]
    pub reconcile_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Upper bound for settle points without a completion signal.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_active_wait_ms")]
    pub active_wait_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl TimeoutsConfig {
    pub fn default_wait(&self) -> Duration {
        Duration::from_millis(self.default_wait_ms)
    }

    pub fn reconcile(&self) -> Duration {
        Duration::from_millis(self.reconcile_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn active_wait(&self) -> Duration {
        Duration::from_millis(self.active_wait_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            default_wait_ms: default_wait_ms(),
            reconcile_ms: default_reconcile_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            settle_ms: default_settle_ms(),
            active_wait_ms: default_active_wait_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_wait_ms() -> u64 {
    10000
}

fn default_reconcile_ms() -> u64 {
    30000
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_settle_ms() -> u64 {
    2000
}

fn default_active_wait_ms() -> u64 {
    60000
}

fn default_request_timeout_ms() -> u64 {
    10000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    #[serde(default = "default_true")]
    pub no_sandbox: bool,
    #[serde(default = "default_true")]
    pub disable_dev_shm: bool,
    #[serde(default = "default_true")]
    pub disable_gpu: bool,
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Explicit chromedriver binary, tried before any lookup.
    #[serde(default)]
    pub driver_path: Option<PathBuf>,
    /// Connect to an already running WebDriver server instead of spawning one.
    #[serde(default)]
    pub webdriver_url: Option<String>,
    #[serde(default = "default_driver_port")]
    pub driver_port: u16,
    /// Allow downloading chromedriver when no local binary is found.
    #[serde(default = "default_true")]
    pub allow_download: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: default_window_width(),
            window_height: default_window_height(),
            no_sandbox: true,
            disable_dev_shm: true,
            disable_gpu: true,
            extra_args: Vec::new(),
            driver_path: None,
            webdriver_url: None,
            driver_port: default_driver_port(),
            allow_download: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_driver_port() -> u16 {
    9515
}

/// Literal values typed into the status dashboard table filters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusFilters {
    #[serde(default)]
    pub switch: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub interface: Option<String>,
}
