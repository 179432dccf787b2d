// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or compiling a plan. All of them are reported
/// before any step runs.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("profile `{requested}` was requested but never declared (available: {})", list(.available))]
    UnknownProfile { requested: String, available: Vec<String> },

    #[error("failed to read plan {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse plan {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("step `{step}`: {message}")]
    InvalidStep { step: String, message: String },
}

fn list(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}
