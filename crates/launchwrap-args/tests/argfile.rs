use launchwrap_args::{BackendKind, ConfigError, Environment, LaunchConfigBuilder};
use std::fs;

#[test]
fn argfile_tokens_are_spliced_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let argfile = dir.path().join("java.args");
    fs::write(
        &argfile,
        "# generated by the IDE\r\n-cp \"lib/a b.jar\"\r\n-Dmaven.skip=true\r\n",
    )
    .unwrap();

    let config = LaunchConfigBuilder::new(BackendKind::MavenExec, Environment::default())
        .args([
            "-Xmx256m".to_string(),
            format!("@{}", argfile.display()),
            "com.example.Main".to_string(),
            "--verbose".to_string(),
        ])
        .build()
        .unwrap();

    assert_eq!(config.classpath.as_deref(), Some("lib/a b.jar"));
    assert_eq!(config.project_properties.get("skip").map(String::as_str), Some("true"));
    assert_eq!(config.vm_args, vec!["-Xmx256m"]);
    assert_eq!(config.all_vm_args, vec!["-Xmx256m", "-Dmaven.skip=true"]);
    assert_eq!(config.main_class.as_deref(), Some("com.example.Main"));
    assert_eq!(config.program_args, vec!["--verbose"]);
}

#[test]
fn nested_argfiles_expand_and_may_supply_the_main_class() {
    let dir = tempfile::tempdir().unwrap();
    let inner = dir.path().join("inner.args");
    let outer = dir.path().join("outer.args");
    fs::write(&inner, "-ea\ncom.example.App \"first arg\" -x\n").unwrap();
    fs::write(&outer, format!("-Dlevel=3\n@{}\n", inner.display())).unwrap();

    let config = LaunchConfigBuilder::new(BackendKind::Plain, Environment::default())
        .args([format!("@{}", outer.display()), "tail".to_string()])
        .build()
        .unwrap();

    assert_eq!(config.all_vm_args, vec!["-Dlevel=3", "-ea"]);
    assert_eq!(config.main_class.as_deref(), Some("com.example.App"));
    assert_eq!(config.program_args, vec!["first arg", "-x", "tail"]);
}

#[test]
fn unreadable_argfile_is_reported_with_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.args");

    let err = LaunchConfigBuilder::new(BackendKind::Plain, Environment::default())
        .args([format!("@{}", missing.display())])
        .build()
        .unwrap_err();

    match err {
        ConfigError::ArgFile { path, .. } => assert_eq!(path, missing),
        other => panic!("unexpected error: {other}"),
    }
}
