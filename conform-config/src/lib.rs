//! Configuration for the conform harness
//!
//! Three layers, later ones winning key by key:
//!
//!   1. `defaults/conform.default.toml`, compiled in (toolchain names, grammar table)
//!   2. the per-user file at `~/.config/conform/conform.toml`, if present
//!   3. a file named on the command line with `--config`
//!
//! The merged tree is deserialized into [`ConformConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat};
use conform::registry::{Grammar, GrammarRegistry};
use conform::toolchain::{home_dir, Toolchain};
use conform::workspace::WorkspaceSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_TOML: &str = include_str!("../defaults/conform.default.toml");

/// Location of the per-user layer, relative to the home directory
const USER_CONFIG: &str = ".config/conform/conform.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct ConformConfig {
    pub toolchain: Toolchain,
    pub workspace: WorkspaceSettings,
    /// Grammar table, in run order
    pub grammars: Vec<Grammar>,
}

impl ConformConfig {
    pub fn registry(&self) -> GrammarRegistry {
        GrammarRegistry::from_grammars(self.grammars.clone())
    }
}

/// Stacks TOML files over the compiled-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    layers: ConfigBuilder<DefaultState>,
}

impl Loader {
    pub fn new() -> Self {
        let defaults = File::from_str(DEFAULT_TOML, FileFormat::Toml);
        Loader {
            layers: Config::builder().add_source(defaults),
        }
    }

    /// Add `path` on top. Building fails if the file is absent.
    pub fn with_file(self, path: impl AsRef<Path>) -> Self {
        self.layer(path.as_ref(), true)
    }

    /// Add `path` on top if it exists.
    pub fn with_optional_file(self, path: impl AsRef<Path>) -> Self {
        self.layer(path.as_ref(), false)
    }

    /// Add the per-user file when a home directory is known.
    pub fn with_user_file(self) -> Self {
        match user_config_path() {
            Some(path) => self.with_optional_file(path),
            None => self,
        }
    }

    fn layer(mut self, path: &Path, required: bool) -> Self {
        let file = File::from(path).format(FileFormat::Toml).required(required);
        self.layers = self.layers.add_source(file);
        self
    }

    pub fn build(self) -> Result<ConformConfig, ConfigError> {
        self.layers.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// `~/.config/conform/conform.toml`
pub fn user_config_path() -> Option<PathBuf> {
    home_dir().map(|home| home.join(USER_CONFIG))
}

/// The compiled-in configuration alone.
pub fn load_defaults() -> Result<ConformConfig, ConfigError> {
    Loader::new().build()
}
