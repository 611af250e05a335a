pub mod api;
pub mod config;
pub mod fixtures;
pub mod page;
pub mod payload;
pub mod poller;
pub mod resolve;
pub mod scenario;
pub mod session;
pub mod suite;

pub use kuit_common::error;
pub use kuit_common::locator;
pub use kuit_common::protocol;
