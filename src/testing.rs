//! Test support
//!
//! [`ScriptedRunner`] stands in for [`SystemRunner`](crate::process::SystemRunner) so the
//! preflight checks and the pipeline can be driven without external toolchains. Every
//! invocation is recorded; rules decide what each one returns, and by default every
//! program "succeeds" with empty output.

use crate::error::ConformError;
use crate::process::{Invocation, Outcome, ProcessRunner};

type Rule = Box<dyn FnMut(&Invocation) -> Option<Result<Outcome, ConformError>>>;

#[derive(Default)]
pub struct ScriptedRunner {
    calls: Vec<Invocation>,
    rules: Vec<Rule>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. The first rule returning `Some` decides the result.
    pub fn with_rule<F>(mut self, rule: F) -> Self
    where
        F: FnMut(&Invocation) -> Option<Result<Outcome, ConformError>> + 'static,
    {
        self.rules.push(Box::new(rule));
        self
    }

    /// Exit with `code` whenever `matches` holds.
    pub fn fail_when<P>(self, matches: P, code: i32) -> Self
    where
        P: Fn(&Invocation) -> bool + 'static,
    {
        self.with_rule(move |inv| matches(inv).then(|| Ok(Outcome::exited(code))))
    }

    /// Print `stdout` and succeed whenever `matches` holds.
    pub fn stdout_when<P>(self, matches: P, stdout: &str) -> Self
    where
        P: Fn(&Invocation) -> bool + 'static,
    {
        let stdout = stdout.to_string();
        self.with_rule(move |inv| {
            matches(inv).then(|| {
                Ok(Outcome {
                    code: Some(0),
                    stdout: stdout.clone(),
                    stderr: String::new(),
                })
            })
        })
    }

    /// Behave as if `program` were not installed.
    pub fn missing(self, program: &str) -> Self {
        let program = program.to_string();
        self.with_rule(move |inv| {
            (inv.program == program).then(|| Err(ConformError::ToolNotFound(program.clone())))
        })
    }

    /// Run `action` for its side effects whenever `matches` holds, then fall through.
    pub fn on<P, A>(self, matches: P, mut action: A) -> Self
    where
        P: Fn(&Invocation) -> bool + 'static,
        A: FnMut(&Invocation) + 'static,
    {
        self.with_rule(move |inv| {
            if matches(inv) {
                action(inv);
            }
            None
        })
    }

    pub fn calls(&self) -> &[Invocation] {
        &self.calls
    }

    pub fn count<P>(&self, matches: P) -> usize
    where
        P: Fn(&Invocation) -> bool,
    {
        self.calls.iter().filter(|inv| matches(inv)).count()
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<Outcome, ConformError> {
        self.calls.push(invocation.clone());
        for rule in self.rules.iter_mut() {
            if let Some(result) = rule(invocation) {
                return result;
            }
        }
        Ok(Outcome::exited(0))
    }
}

/// True when `invocation` runs `needle` or passes it as an argument.
pub fn mentions(invocation: &Invocation, needle: &str) -> bool {
    invocation.program == needle || invocation.args.iter().any(|a| a == needle)
}
