use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::{
    parse_debug_spec, tokenize, vars, BackendKind, ConfigError, Environment,
    LaunchConfiguration, Result,
};

/// `-D` properties with this prefix are passed to the build tool instead of
/// the launched program.
pub const PROJECT_PROPERTY_PREFIX: &str = "maven.";

const JDWP_AGENT_PREFIX: &str = "-agentlib:jdwp=";
const JDWP_LEGACY_PREFIX: &str = "-Xrunjdwp:";
const LEGACY_DEBUG_FLAG: &str = "-Xdebug";

/// Builds a [`LaunchConfiguration`] from a `java`-style command line.
#[derive(Debug, Clone)]
pub struct LaunchConfigBuilder {
    kind: BackendKind,
    env: Environment,
    jvm_binary: PathBuf,
    args: Vec<String>,
    project_dir: Option<PathBuf>,
}

impl LaunchConfigBuilder {
    pub fn new(kind: BackendKind, env: Environment) -> Self {
        Self {
            kind,
            env,
            jvm_binary: PathBuf::new(),
            args: Vec::new(),
            project_dir: None,
        }
    }

    pub fn jvm_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.jvm_binary = path.into();
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Overrides the project directory from the environment.
    pub fn project_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_dir = Some(path.into());
        self
    }

    pub fn build(self) -> Result<LaunchConfiguration> {
        let mut config = LaunchConfiguration {
            jvm_binary: self.jvm_binary,
            ..LaunchConfiguration::default()
        };

        let mut pending: VecDeque<String> = self.args.into();
        while let Some(arg) = pending.pop_front() {
            if let Some(path) = arg.strip_prefix('@') {
                let tokens = read_argfile(Path::new(path))?;
                tracing::debug!(
                    target: "launchwrap.args",
                    path,
                    count = tokens.len(),
                    "expanded argument file"
                );
                for token in tokens.into_iter().rev() {
                    pending.push_front(token);
                }
                continue;
            }

            if !arg.starts_with('-') {
                config.main_class = Some(arg);
                config.program_args.extend(pending.drain(..));
                break;
            }

            match arg.as_str() {
                "-cp" | "-classpath" | "--classpath" | "--class-path" => {
                    config.classpath = take_value(&arg, &mut pending).or(config.classpath);
                }
                "-p" | "--module-path" => {
                    config.module_path = take_value(&arg, &mut pending).or(config.module_path);
                }
                "-m" | "--module" => config.uses_modules = true,
                LEGACY_DEBUG_FLAG => {}
                _ => {
                    if let Some(property) = arg.strip_prefix("-D") {
                        let (key, value) = property.split_once('=').unwrap_or((property, ""));
                        match key.strip_prefix(PROJECT_PROPERTY_PREFIX) {
                            Some(key) => {
                                config
                                    .project_properties
                                    .insert(key.to_owned(), value.to_owned());
                            }
                            None => {
                                config
                                    .system_properties
                                    .insert(key.to_owned(), value.to_owned());
                            }
                        }
                    } else if let Some(params) = arg
                        .strip_prefix(JDWP_AGENT_PREFIX)
                        .or_else(|| arg.strip_prefix(JDWP_LEGACY_PREFIX))
                    {
                        config.debug = parse_debug_spec(&arg, params)?;
                    } else {
                        config.vm_args.push(arg.clone());
                    }
                    config.all_vm_args.push(arg);
                }
            }
        }

        config.project_dir = self
            .project_dir
            .or_else(|| non_empty_path(&self.env, vars::PROJECT_DIR))
            .unwrap_or_else(|| PathBuf::from("."));
        config.project_root_dir = non_empty_path(&self.env, vars::PROJECT_ROOT);
        config.cwd = non_empty_path(&self.env, vars::CWD);
        config.script_dir = non_empty_path(&self.env, vars::PROJECT_SCRIPTS);

        if self.kind == BackendKind::Gradle && config.script_dir.is_none() {
            return Err(ConfigError::MissingScriptDirectory {
                variable: vars::PROJECT_SCRIPTS,
            });
        }

        tracing::info!(
            target: "launchwrap.args",
            project_dir = %config.project_dir.display(),
            project_root = %config.project_root_dir().display(),
            backend = ?self.kind,
            "resolved project directory"
        );

        config.environment = self.env;
        Ok(config)
    }
}

fn read_argfile(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ArgFile {
        path: path.to_path_buf(),
        source,
    })?;
    let text = text.replace("\r\n", "\n");
    Ok(tokenize(&text))
}

fn take_value(flag: &str, pending: &mut VecDeque<String>) -> Option<String> {
    let value = pending.pop_front();
    if value.is_none() {
        tracing::warn!(target: "launchwrap.args", flag, "missing value for flag; ignored");
    }
    value
}

fn non_empty_path(env: &Environment, key: &str) -> Option<PathBuf> {
    env.get(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(args: &[&str]) -> LaunchConfiguration {
        LaunchConfigBuilder::new(BackendKind::Plain, Environment::default())
            .jvm_binary("/opt/jdk/bin/java")
            .args(args.iter().copied())
            .build()
            .unwrap()
    }

    #[test]
    fn properties_are_routed_by_prefix() {
        let config = build(&["-Dmaven.foo=bar", "-Dfoo=bar", "-Dflag"]);

        assert_eq!(config.project_properties.get("foo").map(String::as_str), Some("bar"));
        assert_eq!(config.system_properties.get("foo").map(String::as_str), Some("bar"));
        assert_eq!(config.system_properties.get("flag").map(String::as_str), Some(""));
        assert!(!config.system_properties.contains_key("maven.foo"));
        assert_eq!(config.all_vm_args, vec!["-Dmaven.foo=bar", "-Dfoo=bar", "-Dflag"]);
        assert!(config.vm_args.is_empty());
    }

    #[test]
    fn main_class_stops_flag_parsing() {
        let config = build(&["-Xmx1g", "com.example.Main", "extra1", "-Dextra2=x", "@nope"]);

        assert_eq!(config.main_class.as_deref(), Some("com.example.Main"));
        assert_eq!(config.program_args, vec!["extra1", "-Dextra2=x", "@nope"]);
        assert_eq!(config.vm_args, vec!["-Xmx1g"]);
        assert!(config.system_properties.is_empty());
    }

    #[test]
    fn debug_flag_keeps_its_position() {
        let raw = "-agentlib:jdwp=transport=dt_socket,server=n,address=localhost:5005";
        let config = build(&["-ea", raw, "-Dx=1", "-Xdebug", "Main"]);

        assert!(config.debug.enabled);
        assert_eq!(config.debug.raw_flag, raw);
        assert_eq!(config.debug.port, Some(5005));
        assert_eq!(config.vm_args, vec!["-ea"]);
        assert_eq!(config.all_vm_args, vec!["-ea", raw, "-Dx=1"]);
    }

    #[test]
    fn legacy_jdwp_flag_is_recognized() {
        let config = build(&["-Xrunjdwp:transport=dt_socket,server=y,address=8000"]);
        assert!(config.debug.enabled);
        assert!(config.debug.server);
        assert!(config.vm_args.is_empty());
    }

    #[test]
    fn unsupported_transport_fails_the_build() {
        let err = LaunchConfigBuilder::new(BackendKind::Plain, Environment::default())
            .args(["-agentlib:jdwp=transport=dt_shmem,address=x"])
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedTransport { .. }));
    }

    #[test]
    fn path_flags_consume_their_value() {
        let config = build(&[
            "-classpath",
            "a.jar:b.jar",
            "--module-path",
            "mods",
            "-m",
            "app/com.example.Main",
        ]);

        assert_eq!(config.classpath.as_deref(), Some("a.jar:b.jar"));
        assert_eq!(config.module_path.as_deref(), Some("mods"));
        assert!(config.uses_modules);
        assert_eq!(config.main_class.as_deref(), Some("app/com.example.Main"));
        assert!(config.vm_args.is_empty());
    }

    #[test]
    fn trailing_path_flag_without_value_is_ignored() {
        let config = build(&["-cp"]);
        assert_eq!(config.classpath, None);
        assert_eq!(config.main_class, None);
    }

    #[test]
    fn directories_come_from_the_environment() {
        let env: Environment = [
            (vars::PROJECT_DIR, "/work/app"),
            (vars::PROJECT_ROOT, "/work"),
            (vars::CWD, "/tmp/run"),
        ]
        .into_iter()
        .collect();
        let config = LaunchConfigBuilder::new(BackendKind::MavenExec, env.clone())
            .build()
            .unwrap();
        assert_eq!(config.project_dir, PathBuf::from("/work/app"));
        assert_eq!(config.project_root_dir(), Path::new("/work"));
        assert_eq!(config.cwd.as_deref(), Some(Path::new("/tmp/run")));
        assert_eq!(config.environment, env);

        let config = LaunchConfigBuilder::new(BackendKind::MavenExec, env)
            .project_dir("/elsewhere")
            .build()
            .unwrap();
        assert_eq!(config.project_dir, PathBuf::from("/elsewhere"));
    }

    #[test]
    fn gradle_requires_the_script_directory() {
        let err = LaunchConfigBuilder::new(BackendKind::Gradle, Environment::default())
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingScriptDirectory { variable } if variable == vars::PROJECT_SCRIPTS
        ));

        let env = Environment::default().with(vars::PROJECT_SCRIPTS, "/opt/scripts");
        let config = LaunchConfigBuilder::new(BackendKind::Gradle, env)
            .build()
            .unwrap();
        assert_eq!(config.script_dir, Some(PathBuf::from("/opt/scripts")));
    }
}
