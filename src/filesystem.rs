//! Filesystem collaborator for globbing and removal.
//! The tree only produces patterns and concrete paths; listing and deleting
//! happen behind the `Filesystem` trait so other backends can be plugged in.

use globset::{Glob, GlobMatcher};
use log::debug;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::constants::SEPARATOR;
use crate::error::PathtreesResult;
use crate::template::join_raw;

/// Lazily produced glob matches.
pub type Matches = Box<dyn Iterator<Item = PathtreesResult<String>>>;

/// Trait for the host filesystem operations the tree delegates to.
pub trait Filesystem {
    /// Lists existing paths matching a glob pattern. `*` never crosses a
    /// separator.
    fn iglob(&self, pattern: &str) -> PathtreesResult<Matches>;

    /// Removes a single file.
    fn remove(&self, path: &str) -> PathtreesResult<()>;
}

/// The local filesystem, walked with `walkdir` and matched with `globset`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFilesystem;

fn has_magic(component: &str) -> bool {
    component.contains(['*', '?', '['])
}

/// Hidden entries only match components that start with a dot themselves.
fn hidden_mismatch(name: &str, component: &str) -> bool {
    name.starts_with('.') && !component.starts_with('.')
}

impl Filesystem for LocalFilesystem {
    fn iglob(&self, pattern: &str) -> PathtreesResult<Matches> {
        let components: Vec<&str> = pattern.split(SEPARATOR).collect();
        let Some(split) = components.iter().position(|c| has_magic(c)) else {
            let exists = Path::new(pattern).exists();
            let found = exists.then(|| Ok(pattern.to_string()));
            return Ok(Box::new(found.into_iter()));
        };

        let base = match components[..split].join("/") {
            base if base.is_empty() && pattern.starts_with(SEPARATOR) => "/".to_string(),
            base => base,
        };
        let root = if base.is_empty() { PathBuf::from(".") } else { PathBuf::from(&base) };
        if !root.is_dir() {
            debug!("Glob base {} does not exist", root.display());
            return Ok(Box::new(std::iter::empty()));
        }

        let tail: Vec<String> = components[split..].iter().map(|c| c.to_string()).collect();
        let matchers = tail
            .iter()
            .map(|c| -> PathtreesResult<GlobMatcher> { Ok(Glob::new(c)?.compile_matcher()) })
            .collect::<PathtreesResult<Vec<GlobMatcher>>>()?;
        let depth = tail.len();
        debug!("Globbing {} below {} (depth {})", pattern, root.display(), depth);

        // filter_entry prunes each level against its own component, so only
        // entries at the full depth are matches
        let walk_root = root.clone();
        let walker = WalkDir::new(&root)
            .max_depth(depth)
            .follow_links(true)
            .into_iter()
            .filter_entry(move |entry| {
                let level = entry.depth();
                if level == 0 {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                !hidden_mismatch(&name, &tail[level - 1])
                    && matchers[level - 1].is_match(entry.file_name())
            })
            .filter(move |entry| entry.as_ref().map_or(true, |e| e.depth() == depth))
            .map(move |entry| -> PathtreesResult<String> {
                let entry = entry?;
                let relative = entry.path().strip_prefix(&walk_root).unwrap_or(entry.path());
                Ok(join_raw(&base, &relative.to_string_lossy()))
            });

        Ok(Box::new(walker))
    }

    fn remove(&self, path: &str) -> PathtreesResult<()> {
        debug!("Removing {}", path);
        std::fs::remove_file(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_magic() {
        assert!(has_magic("*.png"));
        assert!(has_magic("a?"));
        assert!(has_magic("[ab]"));
        assert!(!has_magic("plots"));
    }

    #[test]
    fn test_hidden_mismatch() {
        assert!(hidden_mismatch(".git", "*"));
        assert!(!hidden_mismatch(".git", ".*"));
        assert!(!hidden_mismatch("src", "*"));
    }

    #[test]
    fn test_missing_base_is_empty() {
        let matches = LocalFilesystem.iglob("does/not/exist/*").unwrap();
        assert_eq!(matches.count(), 0);
    }
}
