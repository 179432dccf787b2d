// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool availability checks used to enrich step failures.
//!
//! A failing step named "npm install" is far more useful with a hint that
//! `npm` is not installed. Checkers are consulted in registration order and
//! the first one that applies to the step answers, even if it finds nothing
//! wrong.

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Answers "is tool X installed and usable" for steps it recognizes.
pub trait ToolChecker: Send + Sync {
    /// Short display name (e.g. "Docker")
    fn name(&self) -> &str;

    /// Whether this checker is responsible for the given step.
    fn applies_to(&self, step_name: &str) -> bool;

    /// A diagnostic if the tool is missing or unusable, else `None`.
    fn diagnose(&self) -> Option<String>;
}

/// Ordered collection of tool checkers.
#[derive(Default)]
pub struct ToolRegistry {
    checkers: Vec<Box<dyn ToolChecker>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the Azure CLI, npm, Docker and .NET SDK checkers, probing PATH.
    pub fn with_builtin_checkers() -> Self {
        Self::with_probe(Arc::new(PathProbe::from_env()))
    }

    /// Built-in checkers backed by a custom probe.
    pub fn with_probe(probe: Arc<dyn BinaryProbe>) -> Self {
        let mut registry = Self::new();
        for checker in BinaryChecker::builtins(probe) {
            registry.register(checker);
        }
        registry
    }

    pub fn register(&mut self, checker: impl ToolChecker + 'static) {
        self.checkers.push(Box::new(checker));
    }

    /// Ask the first checker that applies to `step_name` for a diagnostic.
    pub fn diagnose(&self, step_name: &str) -> Option<String> {
        let checker = self.checkers.iter().find(|c| c.applies_to(step_name))?;
        let diagnosis = checker.diagnose();
        if let Some(message) = &diagnosis {
            tracing::debug!(step = step_name, checker = checker.name(), %message, "tool check failed");
        }
        diagnosis
    }

    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }
}

/// Locates executables.
pub trait BinaryProbe: Send + Sync {
    fn find(&self, binary: &str) -> Option<PathBuf>;
}

/// Searches a list of directories the way a shell searches `PATH`.
#[derive(Debug, Clone, Default)]
pub struct PathProbe {
    dirs: Vec<PathBuf>,
}

impl PathProbe {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    pub fn from_env() -> Self {
        let dirs = std::env::var_os("PATH")
            .map(|path| std::env::split_paths(&path).collect())
            .unwrap_or_default();
        Self { dirs }
    }
}

impl BinaryProbe for PathProbe {
    fn find(&self, binary: &str) -> Option<PathBuf> {
        self.dirs.iter().find_map(|dir| {
            let candidate = dir.join(binary);
            if is_executable(&candidate) {
                return Some(candidate);
            }
            if cfg!(windows) {
                let exe = dir.join(format!("{}.exe", binary));
                if exe.is_file() {
                    return Some(exe);
                }
            }
            None
        })
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata().map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Checks that a binary is on PATH for steps whose names mention a keyword.
pub struct BinaryChecker {
    name: String,
    binary: String,
    keywords: Vec<String>,
    install_hint: String,
    probe: Arc<dyn BinaryProbe>,
}

impl BinaryChecker {
    pub fn new(
        name: impl Into<String>,
        binary: impl Into<String>,
        keywords: &[&str],
        install_hint: impl Into<String>,
        probe: Arc<dyn BinaryProbe>,
    ) -> Self {
        Self {
            name: name.into(),
            binary: binary.into(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            install_hint: install_hint.into(),
            probe,
        }
    }

    pub fn builtins(probe: Arc<dyn BinaryProbe>) -> Vec<BinaryChecker> {
        vec![
            BinaryChecker::new(
                "Azure CLI",
                "az",
                &["azure", "az "],
                "install it from https://aka.ms/installazurecli and run `az login`",
                Arc::clone(&probe),
            ),
            BinaryChecker::new(
                "npm",
                "npm",
                &["npm", "node"],
                "install Node.js (which bundles npm) from https://nodejs.org",
                Arc::clone(&probe),
            ),
            BinaryChecker::new(
                "Docker",
                "docker",
                &["docker", "container", "image"],
                "install Docker and make sure the daemon is running",
                Arc::clone(&probe),
            ),
            BinaryChecker::new(
                ".NET SDK",
                "dotnet",
                &["dotnet", ".net", "nuget"],
                "install the .NET SDK from https://dot.net",
                probe,
            ),
        ]
    }
}

impl ToolChecker for BinaryChecker {
    fn name(&self) -> &str {
        &self.name
    }

    fn applies_to(&self, step_name: &str) -> bool {
        let step = step_name.to_lowercase();
        self.keywords.iter().any(|k| step.contains(k.as_str()))
    }

    fn diagnose(&self) -> Option<String> {
        match self.probe.find(&self.binary) {
            Some(_) => None,
            None => Some(format!(
                "{} (`{}`) was not found on PATH; {}",
                self.name, self.binary, self.install_hint
            )),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::BinaryProbe;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::path::PathBuf;

    /// Probe that only finds the binaries it was told about.
    #[derive(Default)]
    pub struct FakeProbe {
        installed: Mutex<HashSet<String>>,
    }

    impl FakeProbe {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_installed(binaries: &[&str]) -> Self {
            let probe = Self::new();
            for binary in binaries {
                probe.install(binary);
            }
            probe
        }

        pub fn install(&self, binary: &str) {
            self.installed.lock().insert(binary.to_string());
        }
    }

    impl BinaryProbe for FakeProbe {
        fn find(&self, binary: &str) -> Option<PathBuf> {
            self.installed.lock().contains(binary).then(|| PathBuf::from("/usr/bin").join(binary))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeProbe;

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
