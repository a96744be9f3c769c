pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod range;
pub mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;
pub use handlers::AppState;
pub use server::{build_router, start, ServerHandle};
