//! Backends that turn a [`LaunchConfiguration`] into a running program.
//!
//! [`Backend::Plain`] starts the JVM directly. The Maven backends go through
//! `exec-maven-plugin` or the Micronaut Maven plugin, the Gradle backend through
//! a `run` task driven by an injected init script. Every backend runs its main
//! process under a [`CancellationToken`] that tears down the whole process tree.

mod executable;
mod gradle;
mod maven;
mod plain;
mod quote;

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use launchwrap_args::{BackendKind, ConfigError, LaunchConfiguration};
use launchwrap_process::{
    exit_code, watchdog, CancellationToken, CommandSpec, RunOutcome, SuperviseOptions,
    SupervisedChild,
};
use thiserror::Error;

pub use executable::{
    find_on_path, java_home, locate_tool, os_executable, ToolLayout, GRADLE, MAVEN,
};
pub use gradle::{GradleLauncher, INIT_SCRIPT_NAME};
pub use maven::{MavenFlavor, MavenLauncher, DEFAULT_EXEC_GOAL, MICRONAUT_RUN_GOAL};
pub use plain::PlainLauncher;
pub use quote::{quote, QuotedGroup};

/// Exit code for failures while preparing the launch (I/O, missing tools).
pub const EXIT_SETUP_FAILURE: i32 = 126;
/// Exit code when the launch was interrupted.
pub const EXIT_INTERRUPTED: i32 = 130;
/// Exit code for every other failure.
pub const EXIT_FAILURE: i32 = 255;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("cannot find `{tool}`: no wrapper script, installation directory or PATH entry")]
    ExecutableNotFound { tool: &'static str },

    #[error("file {path} is not executable")]
    NotExecutable { path: PathBuf },

    #[error("launch interrupted")]
    Interrupted,
}

impl LaunchError {
    /// The process exit code reported for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            LaunchError::Config(ConfigError::ArgFile { .. })
            | LaunchError::Io(_)
            | LaunchError::ExecutableNotFound { .. }
            | LaunchError::NotExecutable { .. } => EXIT_SETUP_FAILURE,
            LaunchError::Interrupted => EXIT_INTERRUPTED,
            LaunchError::Config(_) => EXIT_FAILURE,
        }
    }
}

pub type Result<T> = std::result::Result<T, LaunchError>;

/// One of the launch strategies, chosen by [`BackendKind`].
#[derive(Debug, Clone)]
pub enum Backend {
    Plain(PlainLauncher),
    Maven(MavenLauncher),
    Gradle(GradleLauncher),
}

impl Backend {
    pub fn for_kind(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Plain => Backend::Plain(PlainLauncher::default()),
            BackendKind::MavenExec => Backend::Maven(MavenLauncher::new(MavenFlavor::Exec)),
            BackendKind::MavenMicronaut => {
                Backend::Maven(MavenLauncher::new(MavenFlavor::Micronaut))
            }
            BackendKind::Gradle => Backend::Gradle(GradleLauncher::default()),
        }
    }

    /// Apply backend-specific defaults and overrides taken from `config`.
    pub fn configure(self, config: &mut LaunchConfiguration) -> Self {
        match self {
            Backend::Maven(maven) => Backend::Maven(maven.configure(config)),
            other => other,
        }
    }

    /// Run the program and return its exit code.
    pub fn execute(
        &self,
        config: &LaunchConfiguration,
        supervisor: &Supervisor,
    ) -> Result<i32> {
        match self {
            Backend::Plain(plain) => plain.execute(config, supervisor),
            Backend::Maven(maven) => maven.execute(config, supervisor),
            Backend::Gradle(gradle) => gradle.execute(config, supervisor),
        }
    }
}

/// How backends run their processes: the cancellation token, polling options
/// and the optional out-of-process watchdog.
#[derive(Debug, Clone, Default)]
pub struct Supervisor {
    pub cancel: CancellationToken,
    pub options: SuperviseOptions,
    /// Watchdog executable, started next to the main process where
    /// [`watchdog::required`] says so.
    pub watchdog: Option<PathBuf>,
}

impl Supervisor {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..Self::default()
        }
    }

    pub fn with_watchdog(mut self, executable: Option<PathBuf>) -> Self {
        self.watchdog = executable;
        self
    }

    /// Run a preparation step to completion. Cancellation interrupts it.
    fn run_step(&self, spec: &CommandSpec) -> Result<i32> {
        let outcome = SupervisedChild::spawn(spec)?.wait(&self.cancel, &self.options)?;
        finish(outcome)
    }

    /// Run the main process, with the watchdog attached when needed.
    fn run_main(&self, spec: &CommandSpec) -> Result<i32> {
        let child = SupervisedChild::spawn(spec)?;
        tracing::info!(
            target: "launchwrap.backend",
            pid = child.pid(),
            "main process started"
        );

        if let Some(executable) = self.watchdog.as_deref().filter(|_| watchdog::required()) {
            if let Err(err) = watchdog::spawn_detached(executable, std::process::id(), &[]) {
                tracing::warn!(
                    target: "launchwrap.backend",
                    executable = %executable.display(),
                    error = %err,
                    "failed to start watchdog"
                );
            }
        }

        let outcome = child.wait(&self.cancel, &self.options)?;
        finish(outcome)
    }
}

fn finish(outcome: RunOutcome) -> Result<i32> {
    match outcome {
        RunOutcome::Exited(status) => Ok(exit_code(status)),
        RunOutcome::Cancelled(_) => Err(LaunchError::Interrupted),
    }
}

/// The child environment for `config`: the captured environment without
/// launcher variables, plus `JAVA_HOME` when it can be derived.
pub(crate) fn child_environment(
    config: &LaunchConfiguration,
    set_java_home: bool,
) -> BTreeMap<String, String> {
    let mut env = config.environment.filtered();
    if set_java_home {
        if let Some(home) = java_home(&config.jvm_binary) {
            env.insert(
                launchwrap_args::vars::JAVA_HOME.to_owned(),
                home.to_string_lossy().into_owned(),
            );
        }
    }
    env
}
