//! Environment preflight
//!
//! Verifies the external toolchain before any work starts: the Java runtime and compiler,
//! a Jython archive of a supported version, IronPython and the dotnet CLI. The first
//! missing piece stops the run with [`ConformError::MissingDependency`]; nothing is
//! repaired or installed.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use crate::error::ConformError;
use crate::process::{Interrupt, Invocation, Outcome, ProcessRunner};
use crate::toolchain::{Platform, Toolchain};

/// Matches Python's `sys.version_info[:3]`, e.g. `(2, 7, 3)`
static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\((\d+), (\d+), (\d+).*\)").unwrap());

const VERSION_SCRIPT: &str = "import sys; print(sys.version_info[:3])";

pub type Version = (u32, u32, u32);

/// Parse interpreter output such as `(2, 7, 3)`.
pub fn parse_version_info(output: &str) -> Option<Version> {
    let caps = VERSION_PATTERN.captures(output.trim())?;
    let part = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();
    Some((part(1)?, part(2)?, part(3)?))
}

/// Parse a dotted `major.minor.patch` setting.
pub fn parse_dotted_version(text: &str) -> Option<Version> {
    let mut parts = text.trim().split('.').map(|p| p.parse::<u32>().ok());
    let version = (parts.next()??, parts.next()??, parts.next()??);
    match parts.next() {
        None => Some(version),
        Some(_) => None,
    }
}

/// Checks the toolchain through a process runner
pub struct Preflight<'a> {
    runner: &'a mut dyn ProcessRunner,
    toolchain: &'a Toolchain,
    ci: bool,
    platform: Platform,
    interrupt: Interrupt,
}

impl<'a> Preflight<'a> {
    pub fn new(runner: &'a mut dyn ProcessRunner, toolchain: &'a Toolchain) -> Self {
        Preflight {
            runner,
            toolchain,
            ci: false,
            platform: Platform::current(),
            interrupt: Interrupt::new(),
        }
    }

    pub fn ci(mut self, ci: bool) -> Self {
        self.ci = ci;
        self
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Stop with [`ConformError::Interrupted`] once `interrupt` is raised.
    pub fn interrupt(mut self, interrupt: &Interrupt) -> Self {
        self.interrupt = interrupt.clone();
        self
    }

    /// Run every check, stopping at the first failure.
    pub fn check(&mut self, jython_dir: &Path) -> Result<(), ConformError> {
        self.check_java()?;
        self.check_jython(jython_dir)?;
        self.check_ironpython()?;
        Ok(())
    }

    pub fn check_java(&mut self) -> Result<(), ConformError> {
        let java = Invocation::new(&self.toolchain.java).arg("-version");
        self.require(&java, "Unable to locate Java interpreter.")?;
        let javac = Invocation::new(&self.toolchain.javac).arg("-version");
        self.require(&javac, "Unable to locate Java compiler.")?;
        Ok(())
    }

    pub fn check_jython(&mut self, jython_dir: &Path) -> Result<(), ConformError> {
        if !jython_dir.is_dir() {
            return Err(missing(format!(
                "Specified Jython directory doesn't exist: {}",
                jython_dir.display()
            )));
        }
        let jar = self.toolchain.jython_path(jython_dir);
        if !jar.is_file() {
            return Err(missing(format!(
                "No {} found in specified Jython directory: {}",
                self.toolchain.jython_jar,
                jython_dir.display()
            )));
        }

        let version_check = Invocation::new(&self.toolchain.java)
            .arg("-jar")
            .path_arg(&jar)
            .args(["-c", VERSION_SCRIPT])
            .captured();
        let reported = self.runner.run(&version_check)?.stdout.trim().to_string();
        self.interrupt.check()?;
        let version = parse_version_info(&reported).ok_or_else(|| {
            missing(format!("Unable to interpret Jython version: {}", reported))
        })?;

        let minimum = parse_dotted_version(&self.toolchain.min_jython_version).ok_or_else(|| {
            ConformError::Config(format!(
                "invalid minimum Jython version '{}'",
                self.toolchain.min_jython_version
            ))
        })?;
        if version < minimum {
            return Err(missing(format!("Unsupported Jython version: {}", reported)));
        }
        log::debug!("Jython {:?} at {}", version, jar.display());
        Ok(())
    }

    pub fn check_ironpython(&mut self) -> Result<(), ConformError> {
        let ipy = self
            .toolchain
            .ironpython
            .invocation(self.ci, self.platform)?
            .arg("-V");
        self.require(&ipy, "IronPython not found")?;
        let dotnet = Invocation::new(&self.toolchain.dotnet).arg("--version");
        self.require(&dotnet, "dotnet not found")?;
        Ok(())
    }

    /// Run `invocation` quietly; any failure to start or non-zero exit becomes `message`.
    fn require(&mut self, invocation: &Invocation, message: &str) -> Result<Outcome, ConformError> {
        let invocation = invocation.clone().captured();
        let result = self.runner.run(&invocation);
        self.interrupt.check()?;
        match result {
            Ok(outcome) if outcome.success() => Ok(outcome),
            Ok(outcome) => {
                self.interrupt.check_settled()?;
                log::debug!("{} exited with {:?}", invocation, outcome.code);
                Err(missing(message))
            }
            Err(err @ ConformError::Interrupted) => Err(err),
            Err(err) => {
                log::debug!("{} could not run: {}", invocation, err);
                Err(missing(message))
            }
        }
    }
}

fn missing(message: impl Into<String>) -> ConformError {
    ConformError::MissingDependency(message.into())
}
