//! Launcher configuration and tracing setup.
//!
//! Configuration comes from an optional TOML file (named by
//! [`CONFIG_FILE_VAR`]) overlaid with a few environment variables. The only
//! section today is `[logging]`.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};

use thiserror::Error;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;

/// Path to an optional TOML configuration file.
pub const CONFIG_FILE_VAR: &str = "JDT_LAUNCHWRAP_CONFIG";
/// Overrides `logging.level`.
pub const LOG_LEVEL_VAR: &str = "JDT_LAUNCHWRAP_LOG_LEVEL";
/// Overrides `logging.file`; an empty value disables the file sink.
pub const LOG_FILE_VAR: &str = "JDT_LAUNCHWRAP_LOG_FILE";

/// File name of the diagnostic log inside the temporary directory.
pub const DEFAULT_LOG_FILE_NAME: &str = "launchwrap.log";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaunchwrapConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// A simple level (`info`, `debug`, ...) or an `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs in JSON format.
    #[serde(default)]
    pub json: bool,

    /// Mirror logs to stderr.
    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,

    /// Append-only diagnostic log. An empty path disables it.
    ///
    /// If the file cannot be opened, file logging is disabled while stderr
    /// logging stays active.
    #[serde(default = "LoggingConfig::default_file")]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    fn default_file() -> Option<PathBuf> {
        Some(std::env::temp_dir().join(DEFAULT_LOG_FILE_NAME))
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            // Anything else is treated as an `EnvFilter` directive string.
            _ => trimmed.to_owned(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        let directives = Self::normalize_level_directives(&self.level);
        tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        })
    }

    /// Effective filter; `RUST_LOG` is merged in when set.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        let config_directives = Self::normalize_level_directives(&self.level);

        match env_directives {
            Some(env_directives) => {
                let combined = format!("{config_directives},{env_directives}");
                tracing_subscriber::EnvFilter::try_new(combined)
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }

    /// The diagnostic log path, if file logging is enabled.
    pub fn file_path(&self) -> Option<&Path> {
        self.file
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
            file: Self::default_file(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl LaunchwrapConfig {
    /// Load a config file from TOML.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigFileError> {
        Self::parse(text, Path::new("<string>"))
    }

    fn parse(text: &str, path: &Path) -> Result<Self, ConfigFileError> {
        // `toml::de::Error`'s `Display` includes a source snippet; keep only the message.
        toml::from_str(text).map_err(|err| ConfigFileError::Parse {
            path: path.to_path_buf(),
            message: err.message().to_owned(),
        })
    }

    /// Resolve the configuration from the launcher environment.
    ///
    /// `lookup` returns the value of an environment variable.
    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigFileError> {
        let mut config = match lookup(CONFIG_FILE_VAR).filter(|path| !path.is_empty()) {
            Some(path) => Self::load_from_path(path)?,
            None => Self::default(),
        };

        if let Some(level) = lookup(LOG_LEVEL_VAR) {
            config.logging.level = level;
        }
        if let Some(file) = lookup(LOG_FILE_VAR) {
            config.logging.file = Some(PathBuf::from(file));
        }
        Ok(config)
    }
}

#[derive(Clone)]
struct MutexFileMakeWriter {
    file: Arc<Mutex<std::fs::File>>,
}

impl<'a> MakeWriter<'a> for MutexFileMakeWriter {
    type Writer = MutexFileWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        MutexFileWriter {
            guard: self
                .file
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        }
    }
}

struct MutexFileWriter<'a> {
    guard: std::sync::MutexGuard<'a, std::fs::File>,
}

impl Write for MutexFileWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.guard.flush()
    }
}

/// Subscriber built from a [`LoggingConfig`].
pub struct LoggingSetup {
    pub subscriber: Box<dyn tracing::Subscriber + Send + Sync>,
    /// Set when the diagnostic log file could not be opened.
    pub file_error: Option<(PathBuf, io::Error)>,
}

/// Build the subscriber for `config` without installing it.
pub fn build_subscriber(config: &LoggingConfig) -> LoggingSetup {
    let mut file_error = None;
    let file = config.file_path().and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(Arc::new(Mutex::new(file))),
            Err(err) => {
                file_error = Some((path.to_path_buf(), err));
                None
            }
        }
    });

    let make_writer = match (config.stderr, file) {
        (true, Some(file)) => BoxMakeWriter::new(io::stderr.and(MutexFileMakeWriter { file })),
        (true, None) => BoxMakeWriter::new(io::stderr),
        (false, Some(file)) => BoxMakeWriter::new(MutexFileMakeWriter { file }),
        (false, None) => BoxMakeWriter::new(io::sink),
    };

    let registry = tracing_subscriber::registry().with(config.env_filter());
    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if config.json {
        Box::new(
            registry.with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(make_writer)
                    .with_ansi(false),
            ),
        )
    } else {
        Box::new(
            registry.with(
                tracing_subscriber::fmt::layer()
                    .with_writer(make_writer)
                    .with_ansi(false),
            ),
        )
    };

    LoggingSetup {
        subscriber,
        file_error,
    }
}

static TRACING_INIT: Once = Once::new();

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let LoggingSetup {
            subscriber,
            file_error,
        } = build_subscriber(config);
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            if let Some((path, err)) = file_error {
                tracing::warn!(
                    target: "launchwrap.config",
                    path = %path.display(),
                    error = %err,
                    "failed to open log file; file logging disabled"
                );
            }
        }
    });
}
