//! Error taxonomy for a conformance run
//!
//! Every failure, from a missing toolchain to a diff between result sets, ends up as a
//! [`ConformError`]. The CLI prints it and turns it into an exit status.

use std::fmt;
use std::io;
use std::path::Path;

use crate::pipeline::Stage;

#[derive(Debug)]
pub enum ConformError {
    /// A toolchain piece is absent or too old. Raised before any staging.
    MissingDependency(String),
    /// The allow-list named a grammar the registry does not know.
    UnknownGrammar { name: String, known: Vec<String> },
    /// An external process exited with a non-zero status.
    StageFailed { stage: Stage, message: String },
    /// The two result directories are not identical.
    ResultsDiffer,
    /// A program could not be found on the search path.
    ToolNotFound(String),
    /// A program was found but could not be started.
    Spawn { program: String, source: io::Error },
    Io { context: String, source: io::Error },
    Walk(ignore::Error),
    Pattern(globset::Error),
    Config(String),
    Interrupted,
}

impl ConformError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        ConformError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn io_at(action: &str, path: &Path, source: io::Error) -> Self {
        ConformError::io(format!("{} {}", action, path.display()), source)
    }

    /// Whether this error came from a user interrupt rather than a failure.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, ConformError::Interrupted)
    }
}

impl fmt::Display for ConformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConformError::MissingDependency(msg) => write!(f, "{}", msg),
            ConformError::UnknownGrammar { name, known } => write!(
                f,
                "Unknown grammar '{}' (available: {})",
                name,
                known.join(", ")
            ),
            ConformError::StageFailed { message, .. } => write!(f, "{}", message),
            ConformError::ResultsDiffer => write!(f, "Test results differ - should be identical"),
            ConformError::ToolNotFound(program) => {
                write!(f, "Unable to locate '{}' on the search path", program)
            }
            ConformError::Spawn { program, source } => {
                write!(f, "Unable to run '{}': {}", program, source)
            }
            ConformError::Io { context, source } => write!(f, "{}: {}", context, source),
            ConformError::Walk(err) => write!(f, "Directory walk failed: {}", err),
            ConformError::Pattern(err) => write!(f, "Invalid file pattern: {}", err),
            ConformError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ConformError::Interrupted => write!(f, "Interrupted"),
        }
    }
}

impl std::error::Error for ConformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConformError::Spawn { source, .. } | ConformError::Io { source, .. } => Some(source),
            ConformError::Walk(err) => Some(err),
            ConformError::Pattern(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ignore::Error> for ConformError {
    fn from(err: ignore::Error) -> Self {
        ConformError::Walk(err)
    }
}

impl From<globset::Error> for ConformError {
    fn from(err: globset::Error) -> Self {
        ConformError::Pattern(err)
    }
}
