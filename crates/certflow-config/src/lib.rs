pub mod app;
pub mod loader;

pub use app::{AppConfig, DatabaseConfig, LogFormat, LoggingConfig, ServerConfig, StorageConfig};
pub use loader::{ConfigLoader, ENV_PREFIX};
