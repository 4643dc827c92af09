//! Spawning and supervising build-tool and JVM processes.
//!
//! Launched programs inherit the launcher's stdio. Waiting is cooperative: the
//! supervisor polls the child and a [`CancellationToken`]; once the token is
//! cancelled the whole process tree rooted at the child is torn down (see
//! [`kill_tree`]).
//!
//! Some platforms do not deliver termination to the descendants of the
//! launcher itself. There a separate [`watchdog`] process is started next to
//! the main child.

mod tree;
pub mod watchdog;

use std::{
    collections::BTreeMap,
    fmt, io,
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus},
    thread,
    time::{Duration, Instant},
};

pub use tokio_util::sync::CancellationToken;
pub use tree::{kill_tree, ProcessTable};

/// Exit code used when a process status carries neither a code nor a signal.
pub const UNKNOWN_EXIT_CODE: i32 = 255;

/// A full command invocation (cwd + program + args + environment).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub cwd: PathBuf,
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Complete child environment. `None` inherits the launcher's environment.
    pub env: Option<BTreeMap<String, String>>,
}

impl CommandSpec {
    pub fn new(cwd: &Path, program: &Path, args: &[String]) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
            program: program.to_path_buf(),
            args: args.to_vec(),
            env: None,
        }
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// The program followed by its arguments, as handed to the OS.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.to_string_lossy().into_owned());
        argv.extend(self.args.iter().cloned());
        argv
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(&self.cwd);
        if let Some(env) = &self.env {
            cmd.env_clear().envs(env);
        }
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Human-readable only; not a round-trippable shell snippet.
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.contains(' ') || arg.contains('\t') {
                write!(f, " \"{}\"", arg.replace('"', "\\\""))?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// How a supervised process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process exited on its own.
    Exited(ExitStatus),
    /// Cancellation was requested and the process tree was terminated.
    Cancelled(ExitStatus),
}

impl RunOutcome {
    pub fn status(&self) -> ExitStatus {
        match self {
            Self::Exited(status) | Self::Cancelled(status) => *status,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Options controlling how a supervised child is awaited.
#[derive(Debug, Clone)]
pub struct SuperviseOptions {
    /// How often the child and the cancellation token are polled.
    pub poll_interval: Duration,
    /// How long to wait after terminating the tree before force-killing the
    /// direct child.
    pub kill_grace: Duration,
}

impl Default for SuperviseOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            kill_grace: Duration::from_millis(500),
        }
    }
}

/// A spawned child whose process tree is torn down on cancellation.
#[derive(Debug)]
pub struct SupervisedChild {
    child: Child,
    command: String,
}

impl SupervisedChild {
    /// Spawn `spec` with inherited stdio.
    pub fn spawn(spec: &CommandSpec) -> io::Result<Self> {
        let command = spec.to_string();
        let child = spec.to_command().spawn().map_err(|err| {
            io::Error::new(err.kind(), format!("failed to spawn `{command}`: {err}"))
        })?;
        tracing::debug!(
            target: "launchwrap.process",
            pid = child.id(),
            command = %command,
            "process started"
        );
        Ok(Self { child, command })
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Block until the child exits or `cancel` fires.
    ///
    /// Cancelling terminates the child and all of its live descendants. A
    /// child that already exited makes cancellation a no-op.
    pub fn wait(
        mut self,
        cancel: &CancellationToken,
        opts: &SuperviseOptions,
    ) -> io::Result<RunOutcome> {
        loop {
            if let Some(status) = self.child.try_wait()? {
                tracing::debug!(
                    target: "launchwrap.process",
                    pid = self.child.id(),
                    exit_code = exit_code(status),
                    "process exited"
                );
                return Ok(RunOutcome::Exited(status));
            }

            if cancel.is_cancelled() {
                tracing::info!(
                    target: "launchwrap.process",
                    pid = self.child.id(),
                    command = %self.command,
                    "cancellation requested, terminating process tree"
                );
                kill_tree(self.child.id());
                let status = self.reap(opts.kill_grace)?;
                return Ok(RunOutcome::Cancelled(status));
            }

            thread::sleep(opts.poll_interval);
        }
    }

    fn reap(&mut self, grace: Duration) -> io::Result<ExitStatus> {
        let start = Instant::now();
        while start.elapsed() < grace {
            if let Some(status) = self.child.try_wait()? {
                return Ok(status);
            }
            thread::sleep(Duration::from_millis(25));
        }

        tracing::warn!(
            target: "launchwrap.process",
            pid = self.child.id(),
            "process ignored termination request, killing"
        );
        // Already-exited children make this a no-op.
        let _ = self.child.kill();
        self.child.wait()
    }
}

/// Spawn `spec` and wait for it under `cancel`.
pub fn run_supervised(
    spec: &CommandSpec,
    cancel: &CancellationToken,
    opts: &SuperviseOptions,
) -> io::Result<RunOutcome> {
    SupervisedChild::spawn(spec)?.wait(cancel, opts)
}

/// Translate an exit status into a conventional shell exit code.
///
/// Statuses caused by a signal map to `128 + signal` on Unix.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    UNKNOWN_EXIT_CODE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_arguments_with_spaces() {
        let spec = CommandSpec::new(
            Path::new("/work"),
            Path::new("/usr/bin/mvn"),
            &["-Dexec.args=a b".into(), "exec".into()],
        );
        assert_eq!(spec.to_string(), "/usr/bin/mvn \"-Dexec.args=a b\" exec");
    }

    #[test]
    fn argv_starts_with_program() {
        let spec = CommandSpec::new(Path::new("."), Path::new("java"), &["-version".into()]);
        assert_eq!(spec.argv(), vec!["java".to_string(), "-version".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn signalled_status_maps_to_128_plus_signal() {
        use std::os::unix::process::ExitStatusExt;

        // Raw wait status for "terminated by SIGTERM".
        let status = ExitStatus::from_raw(libc::SIGTERM);
        assert_eq!(exit_code(status), 128 + libc::SIGTERM);
    }
}
