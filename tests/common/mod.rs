#![allow(dead_code)]

use conform::registry::Grammar;
use conform::toolchain::{IronPython, Toolchain};
use conform::workspace::WorkspaceSettings;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn toolchain() -> Toolchain {
    Toolchain {
        java: "java".into(),
        javac: "javac".into(),
        dotnet: "dotnet".into(),
        diff: "diff".into(),
        generator_jar: "congocc.jar".into(),
        driver_script: "ptest.py".into(),
        examples_dir: "examples".into(),
        jython_jar: "jython.jar".into(),
        default_jython_dir: "~/bin".into(),
        min_jython_version: "2.7.2".into(),
        ironpython: IronPython {
            command: vec!["ipy".into()],
            ci_macos: vec!["mono".into(), "/opt/ipy.exe".into()],
            ci_windows: vec!["dotnet".into(), "/opt/ipy.dll".into()],
            flags: vec!["-X:FullFrames".into(), "-X:Debug".into()],
        },
    }
}

pub fn grammar(key: &str, name: &str, files: &[&str]) -> Grammar {
    Grammar {
        key: key.into(),
        name: name.into(),
        dir: key.into(),
        grammar: format!("{}.ccc", name),
        files: files.iter().map(|f| f.to_string()).collect(),
        jlexer: format!("org.parsers.{}.{}Lexer", key, name),
        jparser: format!("org.parsers.{}.{}Parser", key, name),
        csdir: format!("cs-{}parser", key),
        cspackage: format!("org.parsers.{}", key),
        ext: format!(".{}", key),
        production: "Root".into(),
        stateful_lexer: false,
        preprocessor: None,
        generator_args: Vec::new(),
        srcdir: None,
    }
}

/// A project root with fixtures, a driver and a parent directory for working directories
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ptest.py"), "# driver\n").unwrap();
        fs::create_dir(dir.path().join("work")).unwrap();
        Project { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn work(&self) -> PathBuf {
        self.root().join("work")
    }

    /// Write `contents` to `examples/<relative>`.
    pub fn fixture(&self, relative: &str, contents: &str) -> &Self {
        let path = self.root().join("examples").join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
        self
    }

    pub fn workspace(&self, keep_on_failure: bool) -> WorkspaceSettings {
        WorkspaceSettings {
            prefix: "conform-test-".into(),
            root: Some(self.work()),
            keep_on_failure,
        }
    }

    /// Directories left under the working-directory parent.
    pub fn leftovers(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<_> = fs::read_dir(self.work())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        dirs.sort();
        dirs
    }
}
