pub mod browser;
pub mod config;
pub mod error;

pub use config::AppConfig;
pub use error::{AuthError, DataError, FetchError, InputError, RenderError};
