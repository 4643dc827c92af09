use std::path::Path;

use launchwrap_args::{vars, LaunchConfiguration};
use launchwrap_process::CommandSpec;

use crate::executable::{locate_tool, MAVEN};
use crate::{child_environment, quote, QuotedGroup, Result, Supervisor};

/// Goal used by the generic launcher unless overridden.
pub const DEFAULT_EXEC_GOAL: &str = "org.codehaus.mojo:exec-maven-plugin:3.1.0:exec";
/// Goal used for Micronaut applications.
pub const MICRONAUT_RUN_GOAL: &str = "mn:run";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MavenFlavor {
    /// `exec-maven-plugin`, configured through `exec.*` properties.
    Exec,
    /// The Micronaut Maven plugin, configured through `mn.*` properties.
    Micronaut,
}

/// Runs the program through Maven, optionally installing the modules it
/// depends on first.
#[derive(Debug, Clone)]
pub struct MavenLauncher {
    flavor: MavenFlavor,
    goal: String,
}

impl MavenLauncher {
    pub fn new(flavor: MavenFlavor) -> Self {
        let goal = match flavor {
            MavenFlavor::Exec => DEFAULT_EXEC_GOAL,
            MavenFlavor::Micronaut => MICRONAUT_RUN_GOAL,
        };
        Self {
            flavor,
            goal: goal.to_owned(),
        }
    }

    pub fn flavor(&self) -> MavenFlavor {
        self.flavor
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    /// Pick up a goal override.
    ///
    /// The environment variable wins over a system property of the same name.
    /// The property is removed either way so it never reaches the program.
    pub fn configure(mut self, config: &mut LaunchConfiguration) -> Self {
        let property = config.remove_system_property(vars::RUN_GOAL);
        let env = config.environment.get(vars::RUN_GOAL).map(str::to_owned);
        if let Some(goal) = env.or(property) {
            tracing::debug!(target: "launchwrap.backend", goal = %goal, "maven goal override");
            self.goal = goal;
        }
        self
    }

    /// The dependency install step, when the project is a module below the
    /// reactor root and the step is not disabled.
    pub fn install_command(&self, config: &LaunchConfiguration) -> Result<Option<CommandSpec>> {
        let root = config.project_root_dir();
        if root == config.project_dir {
            return Ok(None);
        }
        let enabled = config
            .environment
            .get(vars::MAVEN_DEPENDENCIES)
            .map_or(true, |value| value.eq_ignore_ascii_case("true"));
        if !enabled {
            return Ok(None);
        }

        let program = locate_tool(config, MAVEN)?;
        let args = vec![
            "-DskipTests".to_owned(),
            "--also-make".to_owned(),
            "--projects".to_owned(),
            relative_module_path(root, &config.project_dir),
            "install".to_owned(),
        ];
        Ok(Some(
            CommandSpec::new(root, &program, &args).with_env(child_environment(config, false)),
        ))
    }

    /// The main `mvn ... <goal>` invocation, run in the project directory.
    pub fn run_command(&self, config: &LaunchConfiguration) -> Result<CommandSpec> {
        let program = locate_tool(config, MAVEN)?;
        let mut args = match self.flavor {
            MavenFlavor::Exec => exec_properties(config),
            MavenFlavor::Micronaut => micronaut_properties(config),
        };
        args.extend(
            config
                .project_properties
                .iter()
                .map(|(key, value)| format!("-D{key}={value}")),
        );
        args.push(self.goal.clone());

        Ok(CommandSpec::new(&config.project_dir, &program, &args)
            .with_env(child_environment(config, false)))
    }

    pub fn execute(&self, config: &LaunchConfiguration, supervisor: &Supervisor) -> Result<i32> {
        if let Some(install) = self.install_command(config)? {
            tracing::info!(
                target: "launchwrap.backend",
                command = %install,
                "compiling before execution"
            );
            let code = supervisor.run_step(&install)?;
            if code != 0 {
                tracing::warn!(target: "launchwrap.backend", exit_code = code, "install step failed");
                return Ok(code);
            }
        }

        let spec = self.run_command(config)?;
        tracing::info!(target: "launchwrap.backend", command = %spec, "running maven");
        supervisor.run_main(&spec)
    }
}

fn exec_properties(config: &LaunchConfiguration) -> Vec<String> {
    let mut args = vec![format!("-Dexec.executable={}", config.jvm_binary.display())];

    let mut group: QuotedGroup = config.jvm_args_without_debug().collect();
    group.extend(["--class-path", "%classpath"]);
    if config.debug.enabled {
        group.push(&config.debug.raw_flag);
    }
    push_module_flags(&mut group, config);
    group.push("${exec.mainClass}");
    group.extend(&config.program_args);
    args.extend(group.prefixed("-Dexec.args="));

    if let Some(main_class) = &config.main_class {
        args.push(format!("-Dexec.mainClass={main_class}"));
    }
    if let Some(cwd) = &config.cwd {
        args.push(format!("-Dexec.workingdir={}", cwd.display()));
    }
    args
}

fn micronaut_properties(config: &LaunchConfiguration) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(main_class) = &config.main_class {
        args.push(format!("-Dmn.mainClass={main_class}"));
    }
    if !config.program_args.is_empty() {
        let app_args: Vec<String> = config.program_args.iter().map(|arg| quote(arg)).collect();
        args.push(format!("-Dmn.appArgs={}", app_args.join(" ")));
    }
    if !config.environment.is_set(vars::MICRONAUT_CONTINUOUS) {
        args.push("-Dmn.watch=false".to_owned());
    }

    let debug = &config.debug;
    let mut group: QuotedGroup = config.jvm_args_without_debug().collect();
    push_module_flags(&mut group, config);
    // The plugin only attaches in server mode; anything else keeps the
    // original agent flag.
    if debug.enabled && !debug.server {
        group.push(&debug.raw_flag);
    }
    args.extend(group.prefixed("-Dmn.jvmArgs="));

    if debug.enabled && debug.server {
        args.push("-Dmn.debug=true".to_owned());
        if let Some(host) = &debug.host {
            args.push(format!("-Dmn.debug.host={host}"));
        }
        if let Some(port) = debug.port {
            args.push(format!("-Dmn.debug.port={port}"));
        }
        args.push(format!("-Dmn.debug.suspend={}", debug.suspend));
    }
    args
}

fn push_module_flags(group: &mut QuotedGroup, config: &LaunchConfiguration) {
    if config.uses_modules {
        group.extend(["--module-path", "%modulepath"]);
        if config.main_class.is_some() {
            group.push("--module");
        }
    }
}

fn relative_module_path(root: &Path, project_dir: &Path) -> String {
    match project_dir.strip_prefix(root) {
        Ok(relative) => relative.display().to_string(),
        Err(_) => {
            tracing::warn!(
                target: "launchwrap.backend",
                root = %root.display(),
                project_dir = %project_dir.display(),
                "project directory is outside the project root"
            );
            project_dir.display().to_string()
        }
    }
}
