//! Cross-language conformance harness for generated lexers and parsers
//!
//!     The parser generator emits the same lexer and parser in Java and in C#. This crate
//!     checks that both behave identically: for every grammar it stages the fixtures in a
//!     scratch directory, generates and builds both variants, runs them over the fixtures
//!     with a shared test driver and diffs the two result sets.
//!
//!     Nothing here lexes or parses anything. All real work is done by external programs
//!     (java, javac, Jython, IronPython, dotnet, diff), so this is purely an orchestration
//!     layer.
//!
//! Layout
//!
//!     .
//!     ├── registry.rs     # Grammar descriptors and the allow-list
//!     ├── toolchain.rs    # External program settings
//!     ├── process.rs      # ProcessRunner seam, SystemRunner, interrupt flag
//!     ├── preflight.rs    # Toolchain checks
//!     ├── staging.rs      # Fixture copying
//!     ├── pipeline        # Named stages and the per-grammar runner
//!     ├── workspace.rs    # Working directory allocation and cleanup
//!     ├── progress.rs     # Events reported to the shell
//!     ├── harness.rs      # The whole run
//!     └── testing.rs      # Scripted runner for tests
//!
//!     This is a pure lib: it never prints and knows nothing of flags or of `JYTHONDIR` and
//!     `GITHUB_WORKFLOW`. The `conform-cli` crate turns those into [`harness::RunOptions`],
//!     and the `conform-config` crate provides the grammar table and toolchain settings.

pub mod error;
pub mod harness;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod progress;
pub mod registry;
pub mod staging;
pub mod testing;
pub mod toolchain;
pub mod workspace;

pub use error::ConformError;
pub use harness::{Harness, RunOptions, RunSummary};
pub use registry::{Grammar, GrammarRegistry, Selection};
