//! Progress events
//!
//! The library never prints. It hands [`Progress`] events to a [`Reporter`]; the CLI
//! renders them with their `Display` form.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::pipeline::Stage;

const RULE_WIDTH: usize = 70;

#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    GrammarStarted { name: String },
    WorkingDirectory(PathBuf),
    StageCompleted {
        stage: Stage,
        elapsed: Option<Duration>,
    },
    /// Kept for inspection after the run
    Retained(PathBuf),
    /// All working directories were removed
    Deleted,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::GrammarStarted { name } => {
                let rule = "-".repeat(RULE_WIDTH);
                write!(f, "{}\nTesting with {} grammar\n{}", rule, name, rule)
            }
            Progress::WorkingDirectory(dir) => write!(f, "Working directory: {}", dir.display()),
            Progress::StageCompleted { stage, elapsed } => {
                write!(f, "{}", stage.success_message())?;
                if let Some(elapsed) = elapsed {
                    write!(f, " ({:.2} secs)", elapsed.as_secs_f64())?;
                }
                // the compare message carries its own punctuation
                if !matches!(stage, Stage::Compare) {
                    write!(f, ".")?;
                }
                Ok(())
            }
            Progress::Retained(dir) => write!(f, "Working directory retained: {}", dir.display()),
            Progress::Deleted => write!(f, "Working directories deleted."),
        }
    }
}

/// Receives progress events
pub trait Reporter {
    fn report(&mut self, event: &Progress);
}

/// Collects events, mostly for tests
impl Reporter for Vec<Progress> {
    fn report(&mut self, event: &Progress) {
        self.push(event.clone());
    }
}
