//! Repository-root discovery: ascend parent directories looking for `.git`.

use std::path::{Path, PathBuf};

use crate::error::Error;

/// Ascends from `start` until a directory containing a child named `.git`
/// is found, and returns that directory.
pub fn find_git_root(start: &Path) -> Result<PathBuf, Error> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(".git").is_dir() {
            return Ok(current);
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return Err(Error::NotARepository),
        }
    }
}
