// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TOML plan files.
//!
//! A plan is the serialized output of a build script: declared profiles, an
//! ordered list of steps, and the artifact paths a successful build keeps.
//!
//! ```toml
//! profiles = ["push", "release"]
//! artifacts = ["dist/app.zip"]
//!
//! [[step]]
//! name = "banner"
//! log = "building app"
//!
//! [[step]]
//! name = "npm install"
//! run = "npm"
//! args = ["ci"]
//! cwd = "web"
//! timeout_ms = 600000
//!
//! [[step]]
//! name = "publish"
//! run = "npm"
//! args = ["publish"]
//! profile = "release"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kiln_adapters::{CommandOptions, ProcessExecutor, NO_TIMEOUT};
use kiln_core::{LogLevel, ProjectPath};
use serde::Deserialize;

use crate::error::PlanError;
use crate::profile::ProfileRegistry;
use crate::step::{BuildStep, CommandAction, StepRegistry};

/// Parsed, not yet compiled, plan file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanFile {
    #[serde(default)]
    pub profiles: Vec<String>,
    #[serde(default)]
    pub artifacts: Vec<PathBuf>,
    #[serde(default, rename = "step")]
    pub steps: Vec<StepDef>,
}

/// One `[[step]]` table. Exactly one of `run` or `log` must be set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepDef {
    pub name: String,
    #[serde(default)]
    pub run: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub timeout_ms: Option<i64>,
    #[serde(default)]
    pub log: Option<String>,
    #[serde(default)]
    pub level: Option<LogLevel>,
    /// Only include this step when the profile is active
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

/// Steps, profiles and artifact paths ready for one run.
#[derive(Debug)]
pub struct CompiledPlan {
    pub steps: StepRegistry,
    pub profiles: ProfileRegistry,
    pub artifacts: Vec<ProjectPath>,
    /// Directory relative paths were resolved against
    pub base_dir: ProjectPath,
}

impl PlanFile {
    pub fn parse(content: &str, origin: &Path) -> Result<Self, PlanError> {
        toml::from_str(content)
            .map_err(|e| PlanError::Parse { path: origin.to_path_buf(), message: e.to_string() })
    }

    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| PlanError::Read { path: path.to_path_buf(), source })?;
        Self::parse(&content, path)
    }

    /// Validate profile requests, then build the step registry.
    ///
    /// Steps gated on an inactive profile are left out. Relative `cwd` and
    /// artifact paths resolve against `base_dir`.
    pub fn compile(
        &self,
        base_dir: &ProjectPath,
        requested: &[String],
        executor: Arc<dyn ProcessExecutor>,
    ) -> Result<CompiledPlan, PlanError> {
        let profiles = ProfileRegistry::new();
        for name in &self.profiles {
            profiles.declare(name);
        }
        for name in requested {
            profiles.request(name);
        }
        profiles.validate()?;

        let mut steps = StepRegistry::new();
        for def in &self.steps {
            if let Some(profile) = &def.profile {
                if !profiles.is_declared(profile) {
                    return Err(invalid(def, format!("profile `{}` is not declared", profile)));
                }
                if !profiles.is_active(profile) {
                    tracing::debug!(step = %def.name, profile = %profile, "skipping inactive profile step");
                    continue;
                }
            }
            steps.add(def.to_step(base_dir, &executor)?);
        }

        let artifacts = self.artifacts.iter().map(|p| base_dir.join(p)).collect();
        Ok(CompiledPlan { steps, profiles, artifacts, base_dir: base_dir.clone() })
    }
}

impl StepDef {
    fn to_step(
        &self,
        base_dir: &ProjectPath,
        executor: &Arc<dyn ProcessExecutor>,
    ) -> Result<BuildStep, PlanError> {
        if self.name.trim().is_empty() {
            return Err(invalid(self, "step name must not be empty"));
        }
        let step = match (&self.run, &self.log) {
            (Some(program), None) => {
                if let Some(ms) = self.timeout_ms {
                    if ms < 0 && ms != NO_TIMEOUT {
                        return Err(invalid(
                            self,
                            format!("timeout_ms {} is invalid (use -1 to disable)", ms),
                        ));
                    }
                }
                let mut options = CommandOptions::new()
                    .args(self.args.clone())
                    .env(self.env.clone())
                    .working_directory(self.resolve_cwd(base_dir));
                options.timeout_ms = self.timeout_ms;
                BuildStep::action(
                    &self.name,
                    CommandAction::new(Arc::clone(executor), program, options),
                )
            }
            (None, Some(message)) => {
                BuildStep::log(&self.name, self.level.unwrap_or_default(), message)
            }
            (Some(_), Some(_)) => return Err(invalid(self, "set either `run` or `log`, not both")),
            (None, None) => return Err(invalid(self, "missing `run` or `log`")),
        };
        Ok(match &self.context {
            Some(context) => step.with_context(context),
            None => step,
        })
    }

    fn resolve_cwd(&self, base_dir: &ProjectPath) -> PathBuf {
        match &self.cwd {
            Some(cwd) => base_dir.join(cwd).into_path_buf(),
            None => base_dir.as_path().to_path_buf(),
        }
    }
}

fn invalid(def: &StepDef, message: impl Into<String>) -> PlanError {
    PlanError::InvalidStep { step: def.name.clone(), message: message.into() }
}

/// Load and compile the plan at `path`, resolving paths against its directory.
pub fn compile_file(
    path: &Path,
    requested: &[String],
    executor: Arc<dyn ProcessExecutor>,
) -> Result<CompiledPlan, PlanError> {
    let plan = PlanFile::load(path)?;
    let absolute = ProjectPath::new(path)
        .map_err(|source| PlanError::Read { path: path.to_path_buf(), source })?;
    plan.compile(&absolute.parent(), requested, executor)
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
