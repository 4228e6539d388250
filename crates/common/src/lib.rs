pub mod config;
pub mod error;
pub mod logger;

// Re-export commonly used types
pub use config::{AppConfig, BackendKind, HealthReadiness};
pub use error::HarkError;
pub type Result<T> = std::result::Result<T, HarkError>;
