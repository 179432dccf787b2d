// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named conditional sections of a plan.
//!
//! A plan declares the profiles it knows about; a trigger requests some of
//! them. [`Profile`] handles look up their state by name through a weak
//! reference, so they never keep the registry alive.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::PlanError;

#[derive(Debug, Default)]
struct Profiles {
    declared: Vec<String>,
    requested: Vec<String>,
}

/// Declared and requested profiles for one plan compilation.
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    inner: Arc<Mutex<Profiles>>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a profile. Declaring the same name twice returns handles to
    /// the same profile.
    pub fn declare(&self, name: impl Into<String>) -> Profile {
        let name = name.into();
        let mut inner = self.inner.lock();
        if !inner.declared.contains(&name) {
            inner.declared.push(name.clone());
        }
        Profile { name, registry: Arc::downgrade(&self.inner) }
    }

    /// Record that a trigger asked for `name`. Validity is checked by
    /// [`ProfileRegistry::validate`].
    pub fn request(&self, name: impl Into<String>) {
        let name = name.into();
        let mut inner = self.inner.lock();
        if !inner.requested.contains(&name) {
            inner.requested.push(name);
        }
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.inner.lock().declared.iter().any(|d| d == name)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.inner.lock().is_active(name)
    }

    pub fn declared(&self) -> Vec<String> {
        self.inner.lock().declared.clone()
    }

    pub fn requested(&self) -> Vec<String> {
        self.inner.lock().requested.clone()
    }

    /// Fail on the first requested profile that was never declared.
    pub fn validate(&self) -> Result<(), PlanError> {
        let inner = self.inner.lock();
        match inner.requested.iter().find(|r| !inner.declared.contains(r)) {
            Some(unknown) => Err(PlanError::UnknownProfile {
                requested: unknown.clone(),
                available: inner.declared.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl Profiles {
    fn is_active(&self, name: &str) -> bool {
        self.requested.iter().any(|r| r == name) && self.declared.iter().any(|d| d == name)
    }
}

/// Handle to a declared profile.
#[derive(Debug, Clone)]
pub struct Profile {
    name: String,
    registry: Weak<Mutex<Profiles>>,
}

impl Profile {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the profile was requested. A profile whose registry has been
    /// dropped is inactive.
    pub fn is_active(&self) -> bool {
        self.registry.upgrade().is_some_and(|inner| inner.lock().is_active(&self.name))
    }
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod tests;
