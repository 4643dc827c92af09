use launchwrap_args::{vars, ConfigError, LaunchConfiguration};
use launchwrap_process::CommandSpec;

use crate::executable::{locate_tool, GRADLE};
use crate::{child_environment, QuotedGroup, Result, Supervisor};

/// Init script injected into every Gradle run; it wires the `run*`
/// properties into the application's `run` task.
pub const INIT_SCRIPT_NAME: &str = "launcher.groovy";

/// Runs the program through the Gradle `run` task.
#[derive(Debug, Clone)]
pub struct GradleLauncher {
    task: String,
}

impl Default for GradleLauncher {
    fn default() -> Self {
        Self {
            task: "run".to_owned(),
        }
    }
}

impl GradleLauncher {
    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn command(&self, config: &LaunchConfiguration) -> Result<CommandSpec> {
        let script_dir = config
            .script_dir
            .as_deref()
            .ok_or(ConfigError::MissingScriptDirectory {
                variable: vars::PROJECT_SCRIPTS,
            })?;
        let init_script = std::path::absolute(script_dir.join(INIT_SCRIPT_NAME))?;
        let program = locate_tool(config, GRADLE)?;

        let mut args = vec!["-I".to_owned(), init_script.display().to_string()];

        // Only plain JVM flags reach the run task; the debug agent flag is
        // passed through as-is.
        let mut jvm_args: QuotedGroup = config.vm_args.iter().collect();
        if config.debug.enabled {
            jvm_args.push(&config.debug.raw_flag);
        }
        args.extend(jvm_args.prefixed("-PrunJvmArgs="));

        let program_args: QuotedGroup = config.program_args.iter().collect();
        args.extend(program_args.prefixed("-PrunArgs="));

        if let Some(main_class) = &config.main_class {
            args.push(format!("-PrunClassName={main_class}"));
        }
        if let Some(cwd) = &config.cwd {
            args.push(format!("-PrunWorkingDir={}", cwd.display()));
        }
        if config.environment.is_set(vars::MICRONAUT_CONTINUOUS) {
            args.push("--continuous".to_owned());
        }
        args.extend(["-x".to_owned(), "check".to_owned(), self.task.clone()]);

        Ok(CommandSpec::new(&config.project_dir, &program, &args)
            .with_env(child_environment(config, true)))
    }

    pub fn execute(&self, config: &LaunchConfiguration, supervisor: &Supervisor) -> Result<i32> {
        let spec = self.command(config)?;
        tracing::info!(target: "launchwrap.backend", command = %spec, "running gradle");
        supervisor.run_main(&spec)
    }
}
