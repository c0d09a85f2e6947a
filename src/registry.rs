//! Grammar registry
//!
//! Each grammar exercised by the harness is described by a [`Grammar`] record: where its
//! fixtures live, which files to stage, the classes the generator produces and the start
//! production the driver parses with. The records are loaded once from the embedded
//! configuration (see the `conform-config` crate) and never change afterwards.
//!
//! Special cases that only a few grammars need (a stateful lexer, a preprocessor grammar,
//! extra generator arguments) are carried as data on the record rather than as checks on
//! the grammar name.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConformError;

/// Immutable description of one grammar under test
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Grammar {
    /// Selection key used by the allow-list (e.g. `json`)
    pub key: String,
    /// Display name (e.g. `JSON`)
    pub name: String,
    /// Fixture directory under the examples root, also the staged directory name
    pub dir: String,
    /// Grammar file passed to the generator
    pub grammar: String,
    /// Patterns to stage; a leading `../` reaches into a sibling directory
    pub files: Vec<String>,
    pub jlexer: String,
    pub jparser: String,
    /// Directory the C# generator writes its project into
    pub csdir: String,
    pub cspackage: String,
    /// Fixture file extension, including the dot
    pub ext: String,
    /// Start production for parser runs
    pub production: String,
    /// The lexer switches states under parser control, so it cannot run standalone.
    #[serde(default)]
    pub stateful_lexer: bool,
    #[serde(default)]
    pub preprocessor: Option<PreprocessorGrammar>,
    /// Extra generator arguments placed just before the grammar file
    #[serde(default)]
    pub generator_args: Vec<String>,
    /// Overrides `<examples>/<dir>` as the fixture source
    #[serde(default)]
    pub srcdir: Option<PathBuf>,
}

/// A secondary grammar generated ahead of the main one, for each target.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PreprocessorGrammar {
    pub grammar: String,
    /// Subdirectory of `csdir` the C# variant is written to
    pub csharp_subdir: String,
}

impl Grammar {
    /// Where the fixtures for this grammar are read from.
    ///
    /// A relative `srcdir` is taken from the project root.
    pub fn source_dir(&self, project_root: &Path, examples_root: &Path) -> PathBuf {
        match &self.srcdir {
            Some(dir) => project_root.join(dir),
            None => examples_root.join(&self.dir),
        }
    }

    /// Path of the generated Java parser source, relative to the staged directory.
    pub fn java_parser_source(&self) -> PathBuf {
        let (package, class) = self
            .jparser
            .rsplit_once('.')
            .unwrap_or(("", self.jparser.as_str()));
        let mut path: PathBuf = package.split('.').filter(|s| !s.is_empty()).collect();
        path.push(format!("{}.java", class));
        path
    }
}

/// Which grammars a run covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Only(Vec<String>),
}

impl Selection {
    /// Parse a comma-separated allow-list; `all` selects everything.
    pub fn parse(list: &str) -> Self {
        if list.trim() == "all" {
            return Selection::All;
        }
        Selection::Only(
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    pub fn includes(&self, key: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(keys) => keys.iter().any(|k| k == key),
        }
    }
}

/// Ordered registry of grammars
#[derive(Debug, Clone, Default)]
pub struct GrammarRegistry {
    grammars: Vec<Grammar>,
}

impl GrammarRegistry {
    pub fn new() -> Self {
        GrammarRegistry {
            grammars: Vec::new(),
        }
    }

    pub fn from_grammars(grammars: Vec<Grammar>) -> Self {
        let mut registry = Self::new();
        for grammar in grammars {
            registry.register(grammar);
        }
        registry
    }

    /// Register a grammar, replacing any earlier one with the same key in place.
    pub fn register(&mut self, grammar: Grammar) {
        match self.grammars.iter_mut().find(|g| g.key == grammar.key) {
            Some(existing) => *existing = grammar,
            None => self.grammars.push(grammar),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Grammar> {
        self.grammars.iter().find(|g| g.key == key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// All grammars in registration order
    pub fn list_all(&self) -> &[Grammar] {
        &self.grammars
    }

    pub fn keys(&self) -> Vec<String> {
        self.grammars.iter().map(|g| g.key.clone()).collect()
    }

    /// Grammars picked by `selection`, in registry order.
    ///
    /// Every key named by the selection must exist.
    pub fn select(&self, selection: &Selection) -> Result<Vec<&Grammar>, ConformError> {
        if let Selection::Only(keys) = selection {
            if let Some(unknown) = keys.iter().find(|k| !self.has(k)) {
                return Err(ConformError::UnknownGrammar {
                    name: unknown.clone(),
                    known: self.keys(),
                });
            }
        }
        Ok(self
            .grammars
            .iter()
            .filter(|g| selection.includes(&g.key))
            .collect())
    }
}
