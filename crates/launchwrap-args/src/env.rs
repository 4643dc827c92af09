use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;

/// Environment variables understood by the launcher.
pub mod vars {
    /// Every launcher-internal variable starts with this prefix; they are
    /// never forwarded to a child process.
    pub const PREFIX: &str = "JDT_LAUNCHWRAP_";

    pub const PROJECT_DIR: &str = "JDT_LAUNCHWRAP_PROJECT_DIR";
    pub const PROJECT_ROOT: &str = "JDT_LAUNCHWRAP_PROJECT_ROOT";
    pub const CWD: &str = "JDT_LAUNCHWRAP_CWD";
    pub const PROJECT_TYPE: &str = "JDT_LAUNCHWRAP_PROJECT_TYPE";
    pub const PROJECT_CONTAINER: &str = "JDT_LAUNCHWRAP_PROJECT_CONTAINER";
    /// Presence enables continuous (watch) mode.
    pub const MICRONAUT_CONTINUOUS: &str = "JDT_LAUNCHWRAP_MICRONAUT_CONTINUOUS";
    pub const MAVEN_DEPENDENCIES: &str = "JDT_LAUNCHWRAP_MAVEN_DEPENDENCIES";
    pub const PROJECT_SCRIPTS: &str = "JDT_LAUNCHWRAP_PROJECT_SCRIPTS";
    pub const RUN_GOAL: &str = "JDT_LAUNCHWRAP_RUN_GOAL";

    pub const MAVEN_HOME: &str = "MAVEN_HOME";
    pub const GRADLE_HOME: &str = "GRADLE_HOME";
    pub const JAVA_HOME: &str = "JAVA_HOME";
    pub const PATH: &str = "PATH";
}

/// A captured process environment.
///
/// The launcher reads its settings from this snapshot rather than the live
/// process environment so that tests can build one by hand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Snapshot the current process environment. Entries that are not valid
    /// UTF-8 are converted lossily.
    pub fn from_process() -> Self {
        std::env::vars_os()
            .map(|(key, value)| {
                (
                    key.to_string_lossy().into_owned(),
                    value.to_string_lossy().into_owned(),
                )
            })
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// The environment handed to child processes: everything except the
    /// launcher's own [`vars::PREFIX`] variables.
    pub fn filtered(&self) -> BTreeMap<String, String> {
        self.vars
            .iter()
            .filter(|(key, _)| !key.starts_with(vars::PREFIX))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Directories listed in `PATH`, in search order.
    pub fn path_dirs(&self) -> Vec<PathBuf> {
        match self.get(vars::PATH) {
            Some(path) => std::env::split_paths(&OsString::from(path))
                .filter(|dir| !dir.as_os_str().is_empty())
                .collect(),
            None => Vec::new(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Which backend runs the program, as selected by the IDE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Plain,
    MavenExec,
    MavenMicronaut,
    Gradle,
}

impl BackendKind {
    pub fn from_env(env: &Environment) -> Self {
        let project_type = env.get(vars::PROJECT_TYPE).unwrap_or_default();
        if project_type.eq_ignore_ascii_case("gradle") {
            BackendKind::Gradle
        } else if project_type.eq_ignore_ascii_case("maven") {
            let container = env.get(vars::PROJECT_CONTAINER).unwrap_or_default();
            if container.eq_ignore_ascii_case("micronaut") {
                BackendKind::MavenMicronaut
            } else {
                BackendKind::MavenExec
            }
        } else {
            BackendKind::Plain
        }
    }

    /// Whether this backend goes through Maven.
    pub fn is_maven(self) -> bool {
        matches!(self, BackendKind::MavenExec | BackendKind::MavenMicronaut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filtered_drops_launcher_variables() {
        let env: Environment = [
            ("PATH", "/usr/bin"),
            (vars::PROJECT_DIR, "/work/app"),
            (vars::RUN_GOAL, "compile"),
            ("HOME", "/home/dev"),
        ]
        .into_iter()
        .collect();

        let filtered = env.filtered();
        assert_eq!(
            filtered.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["HOME", "PATH"]
        );
    }

    #[test]
    fn backend_selection() {
        let kind = |pairs: &[(&str, &str)]| {
            BackendKind::from_env(&pairs.iter().copied().collect::<Environment>())
        };

        assert_eq!(kind(&[]), BackendKind::Plain);
        assert_eq!(kind(&[(vars::PROJECT_TYPE, "Gradle")]), BackendKind::Gradle);
        assert_eq!(kind(&[(vars::PROJECT_TYPE, "maven")]), BackendKind::MavenExec);
        assert_eq!(
            kind(&[
                (vars::PROJECT_TYPE, "maven"),
                (vars::PROJECT_CONTAINER, "micronaut")
            ]),
            BackendKind::MavenMicronaut
        );
        assert_eq!(
            kind(&[
                (vars::PROJECT_TYPE, "gradle"),
                (vars::PROJECT_CONTAINER, "micronaut")
            ]),
            BackendKind::Gradle
        );
        assert_eq!(kind(&[(vars::PROJECT_TYPE, "ant")]), BackendKind::Plain);
    }

    #[cfg(unix)]
    #[test]
    fn path_dirs_skip_empty_entries() {
        let env = Environment::default().with(vars::PATH, "/usr/local/bin::/usr/bin");
        assert_eq!(
            env.path_dirs(),
            vec![PathBuf::from("/usr/local/bin"), PathBuf::from("/usr/bin")]
        );
    }
}
