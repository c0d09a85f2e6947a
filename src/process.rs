//! Running external programs
//!
//! Everything the harness does outside its own process goes through [`ProcessRunner`].
//! [`SystemRunner`] spawns real processes; tests substitute a scripted runner so the
//! pipeline can be exercised without a Java or .NET installation.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::ConformError;

/// A program to run, its arguments and where to run it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Capture stdout/stderr instead of letting them through to the terminal
    pub capture: bool,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Invocation {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            capture: false,
        }
    }

    /// Build an invocation from a full argv. `None` when `argv` is empty.
    pub fn from_argv<I, S>(argv: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = argv.into_iter().map(Into::into);
        let program = argv.next()?;
        Some(Invocation::new(program).args(argv))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: impl AsRef<Path>) -> Self {
        let arg = path.as_ref().to_string_lossy().into_owned();
        self.arg(arg)
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn captured(mut self) -> Self {
        self.capture = true;
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// What a finished process left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Exit code; `None` when the process was killed by a signal
    pub code: Option<i32>,
    /// Captured output, empty unless the invocation asked for capture
    pub stdout: String,
    pub stderr: String,
}

impl Outcome {
    pub fn exited(code: i32) -> Self {
        Outcome {
            code: Some(code),
            ..Outcome::default()
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external programs to completion
pub trait ProcessRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<Outcome, ConformError>;
}

/// Spawns real processes, blocking until each one exits
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<Outcome, ConformError> {
        log::debug!("Running: {}", invocation);
        let program = which::which(&invocation.program)
            .map_err(|_| ConformError::ToolNotFound(invocation.program.clone()))?;

        let mut command = Command::new(&program);
        command.args(&invocation.args);
        if let Some(dir) = &invocation.cwd {
            command.current_dir(dir);
        }

        let spawn_error = |source| ConformError::Spawn {
            program: invocation.program.clone(),
            source,
        };

        if invocation.capture {
            let output = command
                .stdin(Stdio::null())
                .output()
                .map_err(spawn_error)?;
            if killed_by_interrupt(&output.status) {
                return Err(ConformError::Interrupted);
            }
            Ok(Outcome {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        } else {
            let status = command.status().map_err(spawn_error)?;
            if killed_by_interrupt(&status) {
                return Err(ConformError::Interrupted);
            }
            Ok(Outcome {
                code: status.code(),
                ..Outcome::default()
            })
        }
    }
}

/// A child that died from SIGINT went down with the user's Ctrl-C.
#[cfg(unix)]
fn killed_by_interrupt(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal() == Some(SIGINT)
}

#[cfg(not(unix))]
fn killed_by_interrupt(_status: &ExitStatus) -> bool {
    false
}

#[cfg(unix)]
const SIGINT: i32 = 2;

/// How long a failed process waits for a pending Ctrl-C to be noticed
const INTERRUPT_GRACE: Duration = Duration::from_millis(250);

/// Shared flag raised when the user interrupts the run
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    raised: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// `Err(Interrupted)` once the flag has been raised.
    pub fn check(&self) -> Result<(), ConformError> {
        if self.is_triggered() {
            Err(ConformError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Like [`check`](Self::check), but first gives a pending interrupt a moment to land.
    ///
    /// Ctrl-C reaches the child and the signal listener at the same time; a child that
    /// fails because of it can be reaped before the flag is raised.
    pub fn check_settled(&self) -> Result<(), ConformError> {
        if !self.is_triggered() {
            thread::sleep(INTERRUPT_GRACE);
        }
        self.check()
    }
}
