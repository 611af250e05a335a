pub mod loader;
pub mod schema;

pub use loader::{ConfigError, ConfigLoader};
pub use schema::{
    ApiUrls, BrowserConfig, DEFAULT_BASE_URL, StatusFilters, SuiteConfig, TimeoutsConfig,
};
