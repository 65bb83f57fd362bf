pub mod error;
pub mod router;
pub mod server;
pub mod webhook;

pub use error::ApiError;
pub use server::{HttpConfig, HttpServer};
