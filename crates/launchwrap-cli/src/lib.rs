//! Shared plumbing for the `launchwrap` and `launchwrap-watchdog` binaries.

use std::path::PathBuf;

use launchwrap_args::{ConfigError, Environment};
use launchwrap_backend::{LaunchError, EXIT_FAILURE, EXIT_SETUP_FAILURE};
use launchwrap_config::{ConfigFileError, LaunchwrapConfig};

/// File name of the watchdog binary installed next to `launchwrap`.
pub const WATCHDOG_BIN: &str = "launchwrap-watchdog";

/// Load the launcher configuration from `env`.
///
/// A broken configuration file is reported and replaced by the defaults so
/// that the launch itself still happens.
pub fn load_config(env: &Environment) -> (LaunchwrapConfig, Option<ConfigFileError>) {
    match LaunchwrapConfig::from_env(|key| env.get(key).map(str::to_owned)) {
        Ok(config) => (config, None),
        Err(err) => (LaunchwrapConfig::default(), Some(err)),
    }
}

/// Map a failed launch to the launcher's exit code.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(err) = err.downcast_ref::<LaunchError>() {
        return err.exit_code();
    }
    match err.downcast_ref::<ConfigError>() {
        Some(ConfigError::ArgFile { .. }) => EXIT_SETUP_FAILURE,
        _ => EXIT_FAILURE,
    }
}

/// The watchdog binary next to the running executable, if installed.
pub fn watchdog_executable() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let candidate = exe
        .parent()?
        .join(format!("{WATCHDOG_BIN}{}", std::env::consts::EXE_SUFFIX));
    candidate.is_file().then_some(candidate)
}
