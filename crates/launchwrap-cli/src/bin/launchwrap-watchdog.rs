use clap::Parser;
use launchwrap_args::Environment;
use launchwrap_cli::load_config;
use launchwrap_process::watchdog::Watchdog;
use launchwrap_process::ProcessTable;

/// Tears down a launcher's process tree once the launcher itself is gone.
#[derive(Parser)]
#[command(name = "launchwrap-watchdog", version)]
struct Args {
    /// The launcher process to follow
    #[arg(long)]
    parent: u32,
    /// Processes to watch; defaults to the current descendants of `--parent`
    #[arg(long = "pid")]
    pids: Vec<u32>,
}

fn main() {
    let args = Args::parse();

    let (mut config, _) = load_config(&Environment::from_process());
    // Stdio is shared with the launched program; only the log file is used.
    config.logging.stderr = false;
    launchwrap_config::init_tracing(&config.logging);

    let watchdog = if args.pids.is_empty() {
        Watchdog::from_parent(args.parent, std::process::id(), &ProcessTable::capture())
    } else {
        Watchdog::new(args.parent, args.pids)
    };

    if let Err(err) = watchdog.run() {
        tracing::warn!(target: "launchwrap.watchdog", error = %err, "watchdog stopped");
        std::process::exit(1);
    }
}
