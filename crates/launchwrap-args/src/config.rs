use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::{DebugSettings, Environment};

/// Backend-agnostic description of one program launch.
///
/// Built once by [`crate::LaunchConfigBuilder`] and then only read by the
/// backend that runs it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchConfiguration {
    pub project_dir: PathBuf,
    /// `None` means the project directory is the root.
    pub project_root_dir: Option<PathBuf>,
    /// Working directory of the launched program, when it differs from the
    /// build tool's.
    pub cwd: Option<PathBuf>,
    pub jvm_binary: PathBuf,
    pub classpath: Option<String>,
    pub module_path: Option<String>,
    pub uses_modules: bool,
    pub main_class: Option<String>,
    /// JVM flags without `-D` properties and debug flags.
    pub vm_args: Vec<String>,
    /// Every JVM flag in the order it was given, including `-D` properties
    /// and the debug flag.
    pub all_vm_args: Vec<String>,
    pub program_args: Vec<String>,
    pub system_properties: BTreeMap<String, String>,
    /// `-Dmaven.<key>=<value>` properties, prefix stripped.
    pub project_properties: BTreeMap<String, String>,
    pub debug: DebugSettings,
    pub environment: Environment,
    /// Directory holding the Gradle init script.
    pub script_dir: Option<PathBuf>,
}

impl LaunchConfiguration {
    pub fn project_root_dir(&self) -> &Path {
        self.project_root_dir.as_deref().unwrap_or(&self.project_dir)
    }

    /// `all_vm_args` minus the raw debug flag.
    pub fn jvm_args_without_debug(&self) -> impl Iterator<Item = &String> + '_ {
        self.all_vm_args
            .iter()
            .filter(move |arg| !self.debug.enabled || **arg != self.debug.raw_flag)
    }

    /// Remove a system property, including its `-D` flag in `all_vm_args`.
    pub fn remove_system_property(&mut self, key: &str) -> Option<String> {
        let value = self.system_properties.remove(key)?;
        let prefix = format!("-D{key}");
        self.all_vm_args.retain(|arg| {
            let name = arg.split_once('=').map_or(arg.as_str(), |(name, _)| name);
            name != prefix
        });
        Some(value)
    }
}
