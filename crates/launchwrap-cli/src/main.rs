use anyhow::{Context, Result};
use clap::Parser;
use launchwrap_args::{BackendKind, Environment, LaunchConfigBuilder};
use launchwrap_backend::{Backend, Supervisor};
use launchwrap_cli::{exit_code_for, load_config, watchdog_executable};
use launchwrap_process::CancellationToken;
use std::path::PathBuf;

/// Runs a Java program the way the IDE asked for it, through the project's
/// build tool when there is one.
#[derive(Parser)]
#[command(name = "launchwrap", version)]
struct Cli {
    /// The JVM binary the IDE would have started
    jvm: PathBuf,
    /// The `java` command line: JVM flags, `@argfiles`, main class and program arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(target: "launchwrap.cli", error = %format!("{err:#}"), "launch failed");
            eprintln!("launchwrap: {err:#}");
            exit_code_for(&err)
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    let env = Environment::from_process();
    let (config, config_error) = load_config(&env);
    launchwrap_config::init_tracing(&config.logging);
    if let Some(err) = config_error {
        tracing::warn!(target: "launchwrap.cli", error = %err, "ignoring configuration file");
    }

    let kind = BackendKind::from_env(&env);
    tracing::debug!(
        target: "launchwrap.cli",
        jvm = %cli.jvm.display(),
        args = ?cli.args,
        backend = ?kind,
        "launch requested"
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        tracing::info!(target: "launchwrap.cli", "termination requested");
        on_signal.cancel();
    }) {
        tracing::warn!(target: "launchwrap.cli", error = %err, "failed to install signal handler");
    }

    let mut launch = LaunchConfigBuilder::new(kind, env)
        .jvm_binary(cli.jvm)
        .args(cli.args)
        .build()?;
    let backend = Backend::for_kind(kind).configure(&mut launch);
    let supervisor = Supervisor::new(cancel).with_watchdog(watchdog_executable());

    let code = backend
        .execute(&launch, &supervisor)
        .with_context(|| format!("failed to launch {}", launch.project_dir.display()))?;
    tracing::info!(target: "launchwrap.cli", exit_code = code, "launch finished");
    Ok(code)
}
