use std::{env, path::PathBuf};

const DEFAULT_DIR_NAME: &str = ".spendwatch";
const HOME_OVERRIDE_VAR: &str = "SPENDWATCH_HOME";

/// Root directory for configuration, data and the alert outbox.
///
/// `SPENDWATCH_HOME` wins when set; otherwise `~/.spendwatch`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_OVERRIDE_VAR) {
        return PathBuf::from(custom);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}
