//! External toolchain settings
//!
//! Names and locations of every program the harness drives. Values come from the
//! `[toolchain]` table of the configuration; paths may start with `~/`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConformError;
use crate::process::Invocation;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Toolchain {
    pub java: String,
    pub javac: String,
    pub dotnet: String,
    pub diff: String,
    /// Parser generator archive, relative to the project root
    pub generator_jar: PathBuf,
    /// Test driver copied next to every staged fixture set
    pub driver_script: PathBuf,
    /// Root of the per-grammar fixture directories
    pub examples_dir: PathBuf,
    /// File name of the Jython archive inside the Jython directory
    pub jython_jar: String,
    /// Jython directory used when none is configured
    pub default_jython_dir: String,
    /// Oldest acceptable Jython, as `major.minor.patch`
    pub min_jython_version: String,
    pub ironpython: IronPython,
}

/// How IronPython is launched
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IronPython {
    pub command: Vec<String>,
    /// Launcher used on macOS CI runners
    pub ci_macos: Vec<String>,
    /// Launcher used on Windows CI runners
    pub ci_windows: Vec<String>,
    /// Flags passed before the driver script
    #[serde(default)]
    pub flags: Vec<String>,
}

impl IronPython {
    /// The argv prefix that starts IronPython on `platform`.
    ///
    /// CI runners install IronPython in fixed places instead of on the path.
    pub fn launcher(&self, ci: bool, platform: Platform) -> Vec<String> {
        let argv = match (ci, platform) {
            (true, Platform::MacOs) => &self.ci_macos,
            (true, Platform::Windows) => &self.ci_windows,
            _ => &self.command,
        };
        argv.iter().map(|arg| expand_arg(arg)).collect()
    }

    /// The launcher as an invocation. An empty command is a configuration error.
    pub fn invocation(&self, ci: bool, platform: Platform) -> Result<Invocation, ConformError> {
        Invocation::from_argv(self.launcher(ci, platform))
            .ok_or_else(|| ConformError::Config("empty IronPython command".to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" => Platform::Linux,
            "macos" => Platform::MacOs,
            "windows" => Platform::Windows,
            _ => Platform::Other,
        }
    }
}

/// The user's home directory, from `HOME` or `USERPROFILE`.
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Expand a leading `~` to the home directory. Other paths pass through.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => rest,
        _ => return PathBuf::from(path),
    };
    match home_dir() {
        Some(home) => {
            let rest = rest.trim_start_matches(['/', '\\']);
            if rest.is_empty() {
                home
            } else {
                home.join(rest)
            }
        }
        None => PathBuf::from(path),
    }
}

fn expand_arg(arg: &str) -> String {
    expand_home(arg).to_string_lossy().into_owned()
}

impl Toolchain {
    /// Resolve a project-relative setting against `root`.
    pub fn in_project(root: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }

    pub fn jython_path(&self, jython_dir: &Path) -> PathBuf {
        jython_dir.join(&self.jython_jar)
    }
}
