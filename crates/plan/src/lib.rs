// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kiln-plan: build steps, profiles and plan files

mod error;
pub mod file;
pub mod profile;
pub mod step;

pub use error::PlanError;
pub use file::{compile_file, CompiledPlan, PlanFile, StepDef};
pub use profile::{Profile, ProfileRegistry};
pub use step::{BuildStep, CommandAction, StepAction, StepContext, StepKind, StepRegistry};
