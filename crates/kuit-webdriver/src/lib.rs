//! Chrome WebDriver implementation of the browser session.

pub mod chromedriver;
pub mod manager;
pub mod session;
pub mod webdriver;

pub use session::{ChromeSession, with_session};
