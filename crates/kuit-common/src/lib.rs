pub mod error;
pub mod locator;
pub mod protocol;

pub use error::{ApiError, SessionError};
pub use locator::{Locator, LocatorCatalog, ResolveMode, Strategy};
