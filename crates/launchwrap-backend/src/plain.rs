//! The no-build-tool path: the JVM binary is started directly with the
//! normalised command line. Build-tool translation lives in the Maven and
//! Gradle launchers.

use launchwrap_args::LaunchConfiguration;
use launchwrap_process::CommandSpec;

use crate::{child_environment, Result, Supervisor};

/// Runs the JVM binary directly, without a build tool in between.
#[derive(Debug, Clone, Default)]
pub struct PlainLauncher;

impl PlainLauncher {
    pub fn command(&self, config: &LaunchConfiguration) -> CommandSpec {
        let mut args: Vec<String> = config.all_vm_args.clone();

        if let Some(classpath) = &config.classpath {
            args.push("-cp".to_owned());
            args.push(classpath.clone());
        }
        if let Some(module_path) = &config.module_path {
            args.push("--module-path".to_owned());
            args.push(module_path.clone());
        }
        if let Some(main_class) = &config.main_class {
            if config.uses_modules {
                args.push("--module".to_owned());
            }
            args.push(main_class.clone());
        }
        args.extend(config.program_args.iter().cloned());

        let cwd = config.cwd.as_deref().unwrap_or(&config.project_dir);
        CommandSpec::new(cwd, &config.jvm_binary, &args).with_env(child_environment(config, true))
    }

    pub fn execute(&self, config: &LaunchConfiguration, supervisor: &Supervisor) -> Result<i32> {
        let spec = self.command(config);
        tracing::info!(target: "launchwrap.backend", command = %spec, "running JVM");
        supervisor.run_main(&spec)
    }
}
