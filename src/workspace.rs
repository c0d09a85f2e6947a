//! Working directories
//!
//! Every grammar gets a fresh directory named `<prefix><key>-<random>`. The [`WorkArea`]
//! remembers what it allocated and decides at the end of the run whether to remove it.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ConformError;
use crate::progress::{Progress, Reporter};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkspaceSettings {
    /// Name prefix for working directories
    pub prefix: String,
    /// Parent directory; the system temp directory when unset
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Keep working directories when a run fails
    pub keep_on_failure: bool,
}

/// What happened to the working directories at the end of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposal {
    Retained,
    Deleted,
}

#[derive(Debug)]
pub struct WorkArea {
    settings: WorkspaceSettings,
    dirs: Vec<PathBuf>,
}

impl WorkArea {
    pub fn new(settings: WorkspaceSettings) -> Self {
        WorkArea {
            settings,
            dirs: Vec::new(),
        }
    }

    /// Create a new, uniquely named directory for the grammar `key`.
    pub fn allocate(&mut self, key: &str) -> Result<PathBuf, ConformError> {
        let parent = self.parent();
        fs::create_dir_all(&parent).map_err(|e| ConformError::io_at("Creating", &parent, e))?;
        let prefix = format!("{}{}-", self.settings.prefix, key);
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .keep(true)
            .tempdir_in(&parent)
            .map_err(|e| ConformError::io_at("Allocating a working directory in", &parent, e))?;
        let path = dir.path().to_path_buf();
        self.dirs.push(path.clone());
        Ok(path)
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn parent(&self) -> PathBuf {
        self.settings
            .root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Remove the working directories, unless asked to retain them or the run failed and
    /// failures keep their directories.
    pub fn finish(
        self,
        failed: bool,
        retain: bool,
        reporter: &mut dyn Reporter,
    ) -> Result<Disposal, ConformError> {
        if retain || (failed && self.settings.keep_on_failure) {
            for dir in &self.dirs {
                reporter.report(&Progress::Retained(dir.clone()));
            }
            return Ok(Disposal::Retained);
        }
        for dir in &self.dirs {
            remove_dir(dir)?;
        }
        reporter.report(&Progress::Deleted);
        Ok(Disposal::Deleted)
    }
}

fn remove_dir(dir: &Path) -> Result<(), ConformError> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ConformError::io_at("Removing", dir, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn settings(root: &Path, keep_on_failure: bool) -> WorkspaceSettings {
        WorkspaceSettings {
            prefix: "conform-test-".into(),
            root: Some(root.to_path_buf()),
            keep_on_failure,
        }
    }

    fn entries(root: &Path) -> usize {
        fs::read_dir(root).unwrap().count()
    }

    #[test]
    fn allocates_unique_prefixed_directories() {
        let root = tempdir().unwrap();
        let mut area = WorkArea::new(settings(root.path(), true));
        let a = area.allocate("json").unwrap();
        let b = area.allocate("json").unwrap();

        assert_ne!(a, b);
        assert!(a.is_dir() && b.is_dir());
        let name = a.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("conform-test-json-"));
        assert_eq!(area.dirs().len(), 2);
    }

    #[test]
    fn success_deletes_directories() {
        let root = tempdir().unwrap();
        let mut area = WorkArea::new(settings(root.path(), true));
        area.allocate("json").unwrap();
        let mut events: Vec<Progress> = Vec::new();

        let disposal = area.finish(false, false, &mut events).unwrap();

        assert_eq!(disposal, Disposal::Deleted);
        assert_eq!(entries(root.path()), 0);
        assert_eq!(events, vec![Progress::Deleted]);
    }

    #[test]
    fn retention_keeps_directories() {
        let root = tempdir().unwrap();
        let mut area = WorkArea::new(settings(root.path(), false));
        let dir = area.allocate("lua").unwrap();
        let mut events: Vec<Progress> = Vec::new();

        let disposal = area.finish(false, true, &mut events).unwrap();

        assert_eq!(disposal, Disposal::Retained);
        assert!(dir.is_dir());
        assert_eq!(events, vec![Progress::Retained(dir)]);
    }

    #[test]
    fn failure_follows_keep_on_failure() {
        let root = tempdir().unwrap();
        let mut keeping = WorkArea::new(settings(root.path(), true));
        keeping.allocate("java").unwrap();
        assert_eq!(
            keeping.finish(true, false, &mut Vec::<Progress>::new()).unwrap(),
            Disposal::Retained
        );
        assert_eq!(entries(root.path()), 1);

        let other = tempdir().unwrap();
        let mut removing = WorkArea::new(settings(other.path(), false));
        removing.allocate("java").unwrap();
        assert_eq!(
            removing.finish(true, false, &mut Vec::<Progress>::new()).unwrap(),
            Disposal::Deleted
        );
        assert_eq!(entries(other.path()), 0);
    }
}
