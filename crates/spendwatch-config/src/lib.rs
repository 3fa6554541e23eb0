//! spendwatch-config
//!
//! Persisted user configuration: analytics tuning, alert delivery and file locations.
//! Owns the `Config` model plus atomic disk persistence.

pub mod error;
pub mod manager;
pub mod model;
pub mod paths;

pub use error::ConfigError;
pub use manager::ConfigManager;
pub use model::{AlertConfig, Config};
pub use paths::app_data_dir;
