use spendwatch_config::ConfigError;
use spendwatch_core::CoreError;
use thiserror::Error;

/// Failures surfaced by the `spendwatch` binary.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid input: {0}")]
    Input(String),
}

impl CliError {
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, CliError::Core(err) if err.is_insufficient_data())
    }
}
