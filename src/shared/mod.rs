pub mod config;
pub mod error;
pub mod format;

pub use config::AppConfig;
pub use error::{AppError, Result};
