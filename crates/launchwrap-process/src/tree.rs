use std::collections::{HashMap, HashSet, VecDeque};

use sysinfo::{ProcessStatus, System};

#[derive(Debug, Clone, Copy)]
struct ProcessEntry {
    parent: Option<u32>,
    alive: bool,
}

/// Point-in-time view of the parent/child relation between live processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessTable {
    entries: HashMap<u32, ProcessEntry>,
}

impl ProcessTable {
    /// Snapshot every process visible to the current user.
    pub fn capture() -> Self {
        let mut system = System::new();
        system.refresh_processes();

        let entries = system
            .processes()
            .iter()
            .map(|(pid, process)| {
                let alive = !matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead);
                (
                    pid.as_u32(),
                    ProcessEntry {
                        parent: process.parent().map(|parent| parent.as_u32()),
                        alive,
                    },
                )
            })
            .collect();

        Self { entries }
    }

    /// Build a table from `(pid, parent)` pairs, all considered alive.
    pub fn from_entries(entries: impl IntoIterator<Item = (u32, Option<u32>)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(pid, parent)| (pid, ProcessEntry { parent, alive: true }))
            .collect();
        Self { entries }
    }

    pub fn is_alive(&self, pid: u32) -> bool {
        self.entries.get(&pid).is_some_and(|entry| entry.alive)
    }

    pub fn parent(&self, pid: u32) -> Option<u32> {
        self.entries.get(&pid).and_then(|entry| entry.parent)
    }

    /// Live descendants of `pid` (excluding `pid`), parents before children.
    pub fn descendants(&self, pid: u32) -> Vec<u32> {
        let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
        for (&child, entry) in &self.entries {
            if let Some(parent) = entry.parent {
                if parent != child {
                    children.entry(parent).or_default().push(child);
                }
            }
        }
        for kids in children.values_mut() {
            kids.sort_unstable();
        }

        let mut out = Vec::new();
        let mut seen = HashSet::from([pid]);
        let mut queue = VecDeque::from([pid]);
        while let Some(current) = queue.pop_front() {
            let Some(kids) = children.get(&current) else {
                continue;
            };
            for &kid in kids {
                if seen.insert(kid) {
                    queue.push_back(kid);
                    if self.is_alive(kid) {
                        out.push(kid);
                    }
                }
            }
        }
        out
    }
}

/// Terminate `pid` and every live descendant.
///
/// The descendant set is captured before anything is destroyed so children
/// re-parented by the OS are still reached. Processes that already exited are
/// skipped and destroy failures are only logged.
pub fn kill_tree(pid: u32) {
    let table = ProcessTable::capture();
    let descendants = table.descendants(pid);
    tracing::info!(
        target: "launchwrap.process",
        pid,
        descendants = ?descendants,
        "process to be killed"
    );

    destroy(&table, pid);
    for child in descendants {
        destroy(&table, child);
    }
}

pub(crate) fn destroy(table: &ProcessTable, pid: u32) {
    if !table.is_alive(pid) {
        tracing::trace!(target: "launchwrap.process", pid, "already exited, skipping");
        return;
    }

    tracing::debug!(target: "launchwrap.process", pid, "trying to destroy process");
    match send_terminate(pid) {
        Ok(()) => tracing::debug!(target: "launchwrap.process", pid, "destroy succeeded"),
        Err(err) => tracing::warn!(
            target: "launchwrap.process",
            pid,
            error = %err,
            "destroy failed"
        ),
    }
}

#[cfg(unix)]
fn send_terminate(pid: u32) -> std::io::Result<()> {
    let Ok(raw) = libc::pid_t::try_from(pid) else {
        return Err(std::io::Error::other(format!("pid {pid} out of range")));
    };
    // SAFETY: `kill` has no memory-safety preconditions.
    if unsafe { libc::kill(raw, libc::SIGTERM) } == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        // Exited between the snapshot and the signal.
        return Ok(());
    }
    Err(err)
}

#[cfg(not(unix))]
fn send_terminate(pid: u32) -> std::io::Result<()> {
    use sysinfo::Pid;

    let mut system = System::new();
    let sys_pid = Pid::from_u32(pid);
    if !system.refresh_process(sys_pid) {
        return Ok(());
    }
    match system.process(sys_pid) {
        Some(process) if !process.kill() => Err(std::io::Error::other(format!(
            "failed to terminate process {pid}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descendants_are_listed_breadth_first() {
        let table = ProcessTable::from_entries([
            (1, None),
            (10, Some(1)),
            (11, Some(10)),
            (12, Some(10)),
            (13, Some(11)),
            (20, Some(1)),
        ]);

        assert_eq!(table.descendants(10), vec![11, 12, 13]);
        assert_eq!(table.descendants(13), Vec::<u32>::new());
    }

    #[test]
    fn descendants_of_unknown_pid_is_empty() {
        let table = ProcessTable::from_entries([(1, None)]);
        assert!(table.descendants(42).is_empty());
        assert!(!table.is_alive(42));
    }

    #[test]
    fn self_parented_entries_do_not_loop() {
        let table = ProcessTable::from_entries([(0, Some(0)), (5, Some(0))]);
        assert_eq!(table.descendants(0), vec![5]);
    }

    #[test]
    fn capture_contains_current_process() {
        let table = ProcessTable::capture();
        assert!(table.is_alive(std::process::id()));
    }
}
