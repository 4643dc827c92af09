//! Turning a JVM-style command line into a [`LaunchConfiguration`].
//!
//! The launcher is invoked by the IDE exactly like a `java` binary would be:
//! JVM flags, system properties, a JDWP agent flag, the main class and the
//! program arguments, optionally indirected through `@argfile`s. This crate
//! normalizes that line into a backend-agnostic configuration; the backends
//! in `launchwrap-backend` re-emit it for Maven, Gradle or a plain JVM.

mod argfile;
mod builder;
mod config;
mod env;
mod jdwp;

use std::path::PathBuf;

use thiserror::Error;

pub use argfile::tokenize;
pub use builder::{LaunchConfigBuilder, PROJECT_PROPERTY_PREFIX};
pub use config::LaunchConfiguration;
pub use env::{vars, BackendKind, Environment};
pub use jdwp::{parse_debug_spec, parse_java_boolean, DebugSettings, SOCKET_TRANSPORT};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "only socket transport is supported for debugging (got `{transport}`); use transport={}",
        SOCKET_TRANSPORT
    )]
    UnsupportedTransport { transport: String },

    #[error("invalid debug address `{address}`")]
    InvalidDebugAddress { address: String },

    #[error("environment variable {variable} must point to the launcher scripts directory")]
    MissingScriptDirectory { variable: &'static str },

    #[error("failed to read argument file {path}: {source}")]
    ArgFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
