//! Out-of-process cleanup for platforms that orphan the launcher's children.
//!
//! On Windows the IDE terminates the launcher without tearing down the
//! subtree, and without giving the launcher a chance to run its own cleanup.
//! The launcher therefore starts a small companion process right after the
//! main child. The companion is handed a snapshot of the launcher's
//! descendants and exits when either
//!
//! - every snapshotted process has exited on its own, or
//! - the launcher exits; after [`GRACE_PERIOD`] it terminates every
//!   snapshotted process together with its live descendants.

use std::{
    io,
    path::Path,
    process::{Child, Command, Stdio},
    thread,
    time::Duration,
};

use crate::tree::{self, ProcessTable};

/// Delay between noticing the launcher exit and terminating the snapshot.
pub const GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Delay between two process table snapshots.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Whether this platform needs the companion process.
pub fn required() -> bool {
    cfg!(windows)
}

/// What the watchdog saw in one process table snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Running,
    /// Every watched process exited on its own.
    AllExited,
    /// The launcher is gone; the watched processes must be terminated.
    ParentExited,
}

#[derive(Debug, Clone)]
pub struct Watchdog {
    parent: u32,
    watched: Vec<u32>,
    grace: Duration,
    poll_interval: Duration,
}

impl Watchdog {
    pub fn new(parent: u32, watched: Vec<u32>) -> Self {
        Self {
            parent,
            watched,
            grace: GRACE_PERIOD,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Watch every current descendant of `parent` except `exclude` (the
    /// watchdog's own pid).
    pub fn from_parent(parent: u32, exclude: u32, table: &ProcessTable) -> Self {
        let watched = table
            .descendants(parent)
            .into_iter()
            .filter(|&pid| pid != exclude)
            .collect();
        Self::new(parent, watched)
    }

    pub fn with_timing(mut self, grace: Duration, poll_interval: Duration) -> Self {
        self.grace = grace;
        self.poll_interval = poll_interval;
        self
    }

    pub fn watched(&self) -> &[u32] {
        &self.watched
    }

    /// Drop exited processes from the watch list and classify the snapshot.
    pub fn observe(&mut self, table: &ProcessTable) -> Observation {
        self.watched.retain(|&pid| table.is_alive(pid));
        if self.watched.is_empty() {
            Observation::AllExited
        } else if !table.is_alive(self.parent) {
            Observation::ParentExited
        } else {
            Observation::Running
        }
    }

    /// Watched processes plus their live descendants, without duplicates.
    pub fn targets(&self, table: &ProcessTable) -> Vec<u32> {
        let mut out: Vec<u32> = Vec::new();
        for &pid in &self.watched {
            if table.is_alive(pid) && !out.contains(&pid) {
                out.push(pid);
            }
            for child in table.descendants(pid) {
                if !out.contains(&child) {
                    out.push(child);
                }
            }
        }
        out
    }

    /// Poll until one of the exit conditions holds.
    pub fn run(mut self) -> io::Result<()> {
        if self.watched.is_empty() {
            return Err(io::Error::other("no processes to watch"));
        }
        tracing::debug!(
            target: "launchwrap.watchdog",
            parent = self.parent,
            watched = ?self.watched,
            "watchdog started"
        );

        loop {
            match self.observe(&ProcessTable::capture()) {
                Observation::Running => thread::sleep(self.poll_interval),
                Observation::AllExited => {
                    tracing::debug!(target: "launchwrap.watchdog", "all watched processes exited");
                    return Ok(());
                }
                Observation::ParentExited => {
                    thread::sleep(self.grace);
                    let table = ProcessTable::capture();
                    let targets = self.targets(&table);
                    tracing::info!(
                        target: "launchwrap.watchdog",
                        parent = self.parent,
                        targets = ?targets,
                        "launcher exited, terminating leftover processes"
                    );
                    for pid in targets {
                        tree::destroy(&table, pid);
                    }
                    return Ok(());
                }
            }
        }
    }
}

/// Start the companion executable for `parent` watching `watched`.
///
/// The returned child is not awaited by the launcher.
pub fn spawn_detached(executable: &Path, parent: u32, watched: &[u32]) -> io::Result<Child> {
    let mut cmd = Command::new(executable);
    cmd.arg("--parent").arg(parent.to_string());
    for pid in watched {
        cmd.arg("--pid").arg(pid.to_string());
    }
    cmd.stdin(Stdio::null());
    let child = cmd.spawn()?;
    tracing::debug!(
        target: "launchwrap.watchdog",
        executable = %executable.display(),
        pid = child.id(),
        "watchdog launched"
    );
    Ok(child)
}
