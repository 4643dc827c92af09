use std::path::{Path, PathBuf};

use launchwrap_args::{Environment, LaunchConfiguration};

use crate::{LaunchError, Result};

/// Where a build tool may be found: a wrapper script committed with the
/// project, an installation named by an environment variable, or `PATH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolLayout {
    pub wrapper: &'static str,
    pub home_var: &'static str,
    pub tool: &'static str,
}

pub const MAVEN: ToolLayout = ToolLayout {
    wrapper: "mvnw",
    home_var: launchwrap_args::vars::MAVEN_HOME,
    tool: "mvn",
};

pub const GRADLE: ToolLayout = ToolLayout {
    wrapper: "gradlew",
    home_var: launchwrap_args::vars::GRADLE_HOME,
    tool: "gradle",
};

/// The platform-specific script or binary `name` in `dir`.
///
/// On Windows `name.cmd` is preferred over `name.bat`. A file that exists
/// but cannot be executed is an error rather than a miss.
pub fn os_executable(dir: &Path, name: &str) -> Result<Option<PathBuf>> {
    let candidates = if cfg!(windows) {
        vec![dir.join(format!("{name}.cmd")), dir.join(format!("{name}.bat"))]
    } else {
        vec![dir.join(name)]
    };

    let Some(found) = candidates.into_iter().find(|path| path.exists()) else {
        return Ok(None);
    };
    if !is_executable(&found) {
        return Err(LaunchError::NotExecutable { path: found });
    }
    Ok(Some(found))
}

/// Search the `PATH` of `env` for `name`. Non-executable entries are skipped.
pub fn find_on_path(env: &Environment, name: &str) -> Option<PathBuf> {
    env.path_dirs()
        .iter()
        .find_map(|dir| os_executable(dir, name).ok().flatten())
}

/// Locate the build tool for `config`.
///
/// Order: wrapper in the project directory, wrapper in the project root,
/// `<home>/bin/<tool>`, `<home>/<tool>`, then `PATH`. The result is absolute.
pub fn locate_tool(config: &LaunchConfiguration, layout: ToolLayout) -> Result<PathBuf> {
    let env = &config.environment;

    let mut found = os_executable(&config.project_dir, layout.wrapper)?;
    if found.is_none() {
        found = os_executable(config.project_root_dir(), layout.wrapper)?;
    }
    if found.is_none() {
        if let Some(home) = env.get(layout.home_var).filter(|home| !home.is_empty()) {
            let home = Path::new(home);
            found = os_executable(&home.join("bin"), layout.tool)?;
            if found.is_none() {
                found = os_executable(home, layout.tool)?;
            }
        }
    }
    let found = match found {
        Some(found) => found,
        None => find_on_path(env, layout.tool).ok_or(LaunchError::ExecutableNotFound {
            tool: layout.tool,
        })?,
    };

    let found = std::path::absolute(&found)?;
    tracing::debug!(
        target: "launchwrap.backend",
        tool = layout.tool,
        path = %found.display(),
        "located build tool"
    );
    Ok(found)
}

/// The runtime home for a JVM binary: two levels up from `bin/java`, or
/// three when that lands in a `jre` directory.
pub fn java_home(jvm_binary: &Path) -> Option<PathBuf> {
    let mut home = jvm_binary.parent()?.parent()?;
    if home.file_name().is_some_and(|name| name == "jre") {
        home = home.parent()?;
    }
    if home.as_os_str().is_empty() {
        return None;
    }
    Some(home.to_path_buf())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
