// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Absolute, lexically normalized paths for plan-relative resolution.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// An absolute path with `.` and `..` components resolved.
///
/// Values are immutable; [`ProjectPath::join`] returns a new path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectPath(PathBuf);

impl ProjectPath {
    /// Make `path` absolute (against the current directory) and normalize it.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let absolute = std::path::absolute(path.as_ref())?;
        Ok(Self(normalize(&absolute)))
    }

    /// Build from a path already known to be absolute.
    ///
    /// Returns `None` for relative paths.
    pub fn from_absolute(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        path.is_absolute().then(|| Self(normalize(path)))
    }

    /// Join a segment. An absolute segment replaces the base.
    pub fn join(&self, segment: impl AsRef<Path>) -> Self {
        Self(normalize(&self.0.join(segment)))
    }

    /// Parent directory, or the path itself at the root.
    pub fn parent(&self) -> Self {
        match self.0.parent() {
            Some(parent) => Self(parent.to_path_buf()),
            None => self.clone(),
        }
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for ProjectPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ProjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Lexical normalization: drops `.`, pops on `..` (never above the root).
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if out.parent().is_some() {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
