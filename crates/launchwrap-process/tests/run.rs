use launchwrap_process::{
    exit_code, kill_tree, run_supervised, watchdog::Watchdog, CancellationToken, CommandSpec,
    ProcessTable, SuperviseOptions, SupervisedChild,
};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

fn helper() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_launchwrap_process_test_helper"))
}

fn helper_spec(args: &[&str]) -> CommandSpec {
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    CommandSpec::new(Path::new("."), &helper(), &args)
}

fn wait_for_descendant(pid: u32) -> u32 {
    let start = Instant::now();
    loop {
        if let Some(&child) = ProcessTable::capture().descendants(pid).first() {
            return child;
        }
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "helper {pid} never spawned its child"
        );
        thread::sleep(Duration::from_millis(20));
    }
}

fn assert_exits_soon(pid: u32) {
    let start = Instant::now();
    while ProcessTable::capture().is_alive(pid) {
        assert!(
            start.elapsed() < Duration::from_secs(3),
            "process {pid} survived tree termination"
        );
        thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn exit_code_is_propagated() {
    let outcome = run_supervised(
        &helper_spec(&["--exit-code", "7"]),
        &CancellationToken::new(),
        &SuperviseOptions::default(),
    )
    .unwrap();

    assert!(!outcome.is_cancelled());
    assert_eq!(exit_code(outcome.status()), 7);
}

#[test]
fn missing_program_is_an_io_error() {
    let spec = CommandSpec::new(
        Path::new("."),
        Path::new("/definitely/not/here/launchwrap"),
        &[],
    );
    let err = run_supervised(&spec, &CancellationToken::new(), &SuperviseOptions::default())
        .unwrap_err();
    assert!(err.to_string().contains("failed to spawn"));
}

#[test]
fn explicit_environment_replaces_the_inherited_one() {
    let mut env = BTreeMap::new();
    env.insert("LAUNCHWRAP_TEST_ONLY".to_string(), "1".to_string());
    let spec = helper_spec(&["--exit-code", "0"]).with_env(env);

    let outcome =
        run_supervised(&spec, &CancellationToken::new(), &SuperviseOptions::default()).unwrap();
    assert!(outcome.status().success());
}

#[test]
fn cancellation_kills_child() {
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();

    thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        canceller.cancel();
    });

    let start = Instant::now();
    let outcome = run_supervised(
        &helper_spec(&["--sleep-ms", "5000"]),
        &cancel,
        &SuperviseOptions::default(),
    )
    .unwrap();

    assert!(outcome.is_cancelled());
    assert!(
        start.elapsed() < Duration::from_secs(3),
        "expected cancellation kill to return promptly, took {:?}",
        start.elapsed()
    );
}

#[test]
fn cancellation_kills_process_tree() {
    let cancel = CancellationToken::new();
    let child = SupervisedChild::spawn(&helper_spec(&[
        "--spawn-child-sleep-ms",
        "5000",
        "--sleep-ms",
        "5000",
    ]))
    .unwrap();
    let grandchild = wait_for_descendant(child.pid());

    cancel.cancel();
    let outcome = child.wait(&cancel, &SuperviseOptions::default()).unwrap();

    assert!(outcome.is_cancelled());
    assert_exits_soon(grandchild);
}

#[test]
fn kill_tree_terminates_descendants() {
    let mut child = std::process::Command::new(helper())
        .args(["--spawn-child-sleep-ms", "5000", "--sleep-ms", "5000"])
        .stdout(std::process::Stdio::null())
        .spawn()
        .unwrap();
    let grandchild = wait_for_descendant(child.id());

    kill_tree(child.id());

    let start = Instant::now();
    child.wait().unwrap();
    assert!(start.elapsed() < Duration::from_secs(3));
    assert_exits_soon(grandchild);
}

#[test]
fn kill_tree_on_exited_process_is_a_no_op() {
    let mut child = std::process::Command::new(helper())
        .args(["--exit-code", "0"])
        .spawn()
        .unwrap();
    let pid = child.id();
    child.wait().unwrap();

    kill_tree(pid);
}

#[test]
fn watchdog_destroys_snapshot_after_parent_exits() {
    let mut parent = std::process::Command::new(helper())
        .args(["--spawn-child-sleep-ms", "30000", "--sleep-ms", "1500"])
        .stdout(std::process::Stdio::null())
        .spawn()
        .unwrap();
    let grandchild = wait_for_descendant(parent.id());

    let watchdog = Watchdog::from_parent(parent.id(), std::process::id(), &ProcessTable::capture())
        .with_timing(Duration::from_millis(100), Duration::from_millis(20));
    assert_eq!(watchdog.watched(), &[grandchild]);

    // Returns only once the parent is gone and the snapshot was destroyed.
    watchdog.run().unwrap();
    parent.wait().unwrap();
    assert_exits_soon(grandchild);
}

#[test]
fn watchdog_finishes_when_watched_processes_exit_first() {
    let mut parent = std::process::Command::new(helper())
        .args(["--spawn-child-sleep-ms", "1000", "--sleep-ms", "30000"])
        .stdout(std::process::Stdio::null())
        .spawn()
        .unwrap();
    let grandchild = wait_for_descendant(parent.id());

    let start = Instant::now();
    Watchdog::new(parent.id(), vec![grandchild])
        .with_timing(Duration::from_millis(100), Duration::from_millis(20))
        .run()
        .unwrap();
    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(ProcessTable::capture().is_alive(parent.id()));

    kill_tree(parent.id());
    parent.wait().unwrap();
}
