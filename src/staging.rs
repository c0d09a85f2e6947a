//! Fixture staging
//!
//! Copies a grammar's fixture set into its working directory. Each pattern is expanded
//! relative to the fixture directory; matches keep their relative position under the
//! destination. Directories are copied whole.
//!
//! A pattern beginning with `../` reaches into a sibling fixture directory, e.g.
//! `../java/Java*IdentifierDef.ccc` from `examples/preprocessor`. Its matches are placed as
//! if they lived in the fixture directory itself: the sibling segment of the relative path
//! is rewritten to the fixture directory's own name.

use globset::GlobBuilder;
use ignore::WalkBuilder;
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::ConformError;

const SIBLING_PREFIX: &str = "../";

/// Copy everything `patterns` match under `src` into `dest`.
///
/// Returns the destination path of every top-level match, in pattern order.
pub fn stage_fixtures(
    src: &Path,
    dest: &Path,
    patterns: &[String],
) -> Result<Vec<PathBuf>, ConformError> {
    let mut staged = Vec::new();
    for pattern in patterns {
        let sibling = pattern.starts_with(SIBLING_PREFIX);
        let matches = expand_pattern(src, pattern)?;
        if matches.is_empty() {
            log::warn!("Pattern '{}' matched nothing in {}", pattern, src.display());
        }
        for matched in matches {
            let target = destination_for(src, dest, &matched, sibling);
            copy_entry(&matched, &target)?;
            log::debug!("{} -> {}", matched.display(), target.display());
            staged.push(target);
        }
    }
    Ok(staged)
}

/// Expand a pattern relative to `src` into the existing paths it names.
pub fn expand_pattern(src: &Path, pattern: &str) -> Result<Vec<PathBuf>, ConformError> {
    let full = normalize(&src.join(pattern));
    let components: Vec<&OsStr> = full
        .components()
        .map(|c| c.as_os_str())
        .collect();
    let literal_len = components
        .iter()
        .take_while(|c| !is_glob(c))
        .count();

    let base: PathBuf = components[..literal_len].iter().collect();
    let rest = &components[literal_len..];

    if rest.is_empty() {
        return Ok(if base.exists() { vec![base] } else { Vec::new() });
    }
    if !base.is_dir() {
        return Ok(Vec::new());
    }

    let glob = rest
        .iter()
        .map(|c| c.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    let matcher = GlobBuilder::new(&glob)
        .literal_separator(true)
        .build()?
        .compile_matcher();

    let depth = rest.len();
    let mut found = Vec::new();
    let walker = WalkBuilder::new(&base)
        .standard_filters(false)
        .max_depth(Some(depth))
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();
    for entry in walker {
        let entry = entry?;
        if entry.depth() != depth {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(&base) {
            if matcher.is_match(relative) && !hides_from(relative, rest) {
                found.push(entry.path().to_path_buf());
            }
        }
    }
    Ok(found)
}

/// Wildcards never match a leading dot: `*.ccc` skips `.swap.ccc`, `.h*` finds `.hidden`.
fn hides_from(relative: &Path, pattern: &[&OsStr]) -> bool {
    relative
        .components()
        .zip(pattern)
        .any(|(c, p)| is_hidden(c.as_os_str()) && !is_hidden(p))
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Where a match lands under `dest`.
///
/// For sibling patterns the relative path looks like `../<sibling>/...`; its second
/// segment is replaced with the name of `src` before resolving against `dest`.
fn destination_for(src: &Path, dest: &Path, matched: &Path, sibling: bool) -> PathBuf {
    let relative = pathdiff::diff_paths(matched, normalize(src))
        .unwrap_or_else(|| matched.to_path_buf());
    let relative = if sibling {
        rewrite_sibling_segment(&relative, src.file_name())
    } else {
        relative
    };
    normalize(&dest.join(relative))
}

fn rewrite_sibling_segment(relative: &Path, own_name: Option<&OsStr>) -> PathBuf {
    let Some(own_name) = own_name else {
        return relative.to_path_buf();
    };
    relative
        .components()
        .enumerate()
        .map(|(i, c)| if i == 1 { own_name } else { c.as_os_str() })
        .collect()
}

fn copy_entry(from: &Path, to: &Path) -> Result<(), ConformError> {
    if from.is_dir() {
        copy_tree(from, to)
    } else {
        copy_file(from, to)
    }
}

fn copy_file(from: &Path, to: &Path) -> Result<(), ConformError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| ConformError::io_at("Creating", parent, e))?;
    }
    fs::copy(from, to).map_err(|e| ConformError::io_at("Copying", from, e))?;
    Ok(())
}

/// Recursively copy the directory `from` to `to`, merging into existing directories.
pub fn copy_tree(from: &Path, to: &Path) -> Result<(), ConformError> {
    for entry in WalkBuilder::new(from).standard_filters(false).build() {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        let target = to.join(relative);
        if entry.file_type().map_or(false, |t| t.is_dir()) {
            fs::create_dir_all(&target).map_err(|e| ConformError::io_at("Creating", &target, e))?;
        } else {
            copy_file(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn is_glob(component: &OsStr) -> bool {
    component
        .to_string_lossy()
        .contains(['*', '?', '[', '{'])
}

/// Lexically resolve `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        PathBuf::from(".")
    } else {
        out.iter().collect()
    }
}
