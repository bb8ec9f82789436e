pub mod app_lifecycle;
pub mod error;
pub mod http_client;

pub use error::{AppError, AppResult, UpdateError};
