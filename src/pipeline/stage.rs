//! Named pipeline stages and the plan for a grammar

use std::fmt;

use crate::error::ConformError;
use crate::registry::Grammar;

/// Language the generator emits code for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Java,
    CSharp,
}

impl Target {
    /// Both targets, in the order they are exercised
    pub const ALL: [Target; 2] = [Target::Java, Target::CSharp];

    pub fn label(&self) -> &'static str {
        match self {
            Target::Java => "Java",
            Target::CSharp => "C#",
        }
    }

    /// Directory name the driver writes this target's results to
    pub fn results_dir(&self) -> &'static str {
        match self {
            Target::Java => "java",
            Target::CSharp => "csharp",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One step of a grammar's pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Copy fixtures and the driver into the working directory
    Fixtures,
    /// Generate the preprocessor grammar some grammars depend on
    GeneratePreprocessor(Target),
    /// Generate lexer and parser sources
    Generate(Target),
    /// Compile the generated sources
    Build(Target),
    /// Run the driver over the fixtures in lexer-only mode
    RunLexer(Target),
    /// Run the driver over the fixtures with the start production
    RunParser(Target),
    /// Diff the two result directories
    Compare,
}

impl Stage {
    /// Short machine-friendly name, used in logs
    pub fn name(&self) -> String {
        let target = |t: &Target| t.results_dir();
        match self {
            Stage::Fixtures => "fixtures".to_string(),
            Stage::GeneratePreprocessor(t) => format!("generate-preprocessor-{}", target(t)),
            Stage::Generate(t) => format!("generate-{}", target(t)),
            Stage::Build(t) => format!("build-{}", target(t)),
            Stage::RunLexer(t) => format!("lexer-{}", target(t)),
            Stage::RunParser(t) => format!("parser-{}", target(t)),
            Stage::Compare => "compare".to_string(),
        }
    }

    /// Lexer and parser runs report how long they took.
    pub fn is_timed(&self) -> bool {
        matches!(self, Stage::RunLexer(_) | Stage::RunParser(_))
    }

    pub fn success_message(&self) -> String {
        match self {
            Stage::Fixtures => "Test files copied to working directory".to_string(),
            Stage::GeneratePreprocessor(t) => format!("{} version of preprocessor created", t),
            Stage::Generate(t) => format!("{} version of lexer and parser created", t),
            Stage::Build(Target::Java) => "Java lexer and parser compiled".to_string(),
            Stage::Build(Target::CSharp) => "C# lexer and parser built".to_string(),
            Stage::RunLexer(t) => format!("{} lexer run completed", t),
            Stage::RunParser(t) => format!("{} parser run completed", t),
            Stage::Compare => "Results for C# & Java lexers & parsers are identical - yay!".to_string(),
        }
    }

    pub fn failure_message(&self) -> String {
        match self {
            Stage::Fixtures => "Staging test files failed".to_string(),
            Stage::GeneratePreprocessor(t) => format!("Preprocessor generation in {} failed", t),
            Stage::Generate(t) => format!("Parser generation in {} failed", t),
            Stage::Build(Target::Java) => "Java compilation failed".to_string(),
            Stage::Build(Target::CSharp) => "Failed to build generated C# code".to_string(),
            Stage::RunLexer(t) => format!("{} lexer test run failed", t),
            Stage::RunParser(t) => format!("{} parser test run failed", t),
            Stage::Compare => "Test results differ - should be identical".to_string(),
        }
    }

    /// The error raised when this stage's process exits unsuccessfully.
    pub fn failure(&self) -> ConformError {
        match self {
            Stage::Compare => ConformError::ResultsDiffer,
            stage => ConformError::StageFailed {
                stage: *stage,
                message: stage.failure_message(),
            },
        }
    }

    /// Label an error raised while running this stage, e.g. a tool that could not start.
    ///
    /// Interrupts pass through unchanged.
    pub fn wrap(&self, err: ConformError) -> ConformError {
        if err.is_interrupt() {
            return err;
        }
        let label = match self {
            Stage::Compare => "Comparing test results failed".to_string(),
            stage => stage.failure_message(),
        };
        ConformError::StageFailed {
            stage: *self,
            message: format!("{}: {}", label, err),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// The ordered stages for `grammar`.
///
/// Grammars with a preprocessor generate it before their own sources, for each target.
/// Stateful lexers never run standalone.
pub fn plan(grammar: &Grammar) -> Vec<Stage> {
    let mut stages = vec![Stage::Fixtures];
    for target in Target::ALL {
        if grammar.preprocessor.is_some() {
            stages.push(Stage::GeneratePreprocessor(target));
        }
        stages.push(Stage::Generate(target));
        stages.push(Stage::Build(target));
        if !grammar.stateful_lexer {
            stages.push(Stage::RunLexer(target));
        }
        stages.push(Stage::RunParser(target));
    }
    stages.push(Stage::Compare);
    stages
}
