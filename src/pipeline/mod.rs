//! Per-grammar conformance pipeline
//!
//! A grammar is exercised by a fixed sequence of named [`Stage`]s:
//!
//! ```text
//! Fixtures
//! [GeneratePreprocessor(Java)] Generate(Java) Build(Java) [RunLexer(Java)] RunParser(Java)
//! [GeneratePreprocessor(C#)]   Generate(C#)   Build(C#)   [RunLexer(C#)]   RunParser(C#)
//! Compare
//! ```
//!
//! [`plan`] decides which bracketed stages apply to a grammar. [`Pipeline`] runs them in
//! order against a [`ProcessRunner`](crate::process::ProcessRunner) and stops at the first
//! failure; every stage other than `Fixtures` is a single external process whose non-zero
//! exit becomes that stage's [`failure`](Stage::failure).

pub mod runner;
pub mod stage;

pub use runner::{GrammarRun, Pipeline, PipelineEnv, RESULTS_DIR};
pub use stage::{plan, Stage, Target};
