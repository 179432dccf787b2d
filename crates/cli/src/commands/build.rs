// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kiln trigger|cancel|retry|status|list` - Build control through the daemon

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use kiln_core::ProjectPath;

use crate::client::DaemonClient;
use crate::color;
use crate::output::{
    build_table_header, format_build_detail, format_build_row, format_or_json, OutputFormat,
};

#[derive(Args)]
pub struct TriggerArgs {
    /// Plan file to build
    #[arg(default_value = "kiln.toml")]
    pub plan: PathBuf,

    /// Activate a declared profile (can be repeated)
    #[arg(short = 'p', long = "profile")]
    pub profiles: Vec<String>,

    /// Origin label recorded on the build
    #[arg(long, default_value = "cli")]
    pub source: String,

    /// Stream the build log until it finishes
    #[arg(long, short)]
    pub follow: bool,
}

pub async fn trigger(client: &DaemonClient, args: TriggerArgs, format: OutputFormat) -> Result<()> {
    let plan = absolute_plan(&args.plan)?;
    let id = client.trigger(plan, args.profiles, args.source).await?;

    let obj = serde_json::json!({ "id": id });
    format_or_json(format, &obj, || println!("Build {} queued", color::header(id.as_str())))?;

    if args.follow {
        super::logs::follow(client, id.as_str(), 0, format).await?;
    }
    Ok(())
}

/// The daemon resolves plans from its own working directory, so only
/// absolute paths are sent.
pub fn absolute_plan(plan: &Path) -> Result<PathBuf> {
    Ok(ProjectPath::new(plan)?.into_path_buf())
}

pub async fn cancel(client: &DaemonClient, id: &str, format: OutputFormat) -> Result<()> {
    let (id, status) = client.cancel(id).await?;
    let obj = serde_json::json!({ "id": id, "status": status });
    format_or_json(format, &obj, || {
        println!("Build {} {}", color::header(id.as_str()), color::status(status))
    })
}

pub async fn retry(client: &DaemonClient, id: &str, follow: bool, format: OutputFormat) -> Result<()> {
    let (id, retry_of) = client.retry(id).await?;
    let obj = serde_json::json!({ "id": id, "retry_of": retry_of });
    format_or_json(format, &obj, || {
        println!("Build {} queued (retry of {})", color::header(id.as_str()), retry_of)
    })?;

    if follow {
        super::logs::follow(client, id.as_str(), 0, format).await?;
    }
    Ok(())
}

pub async fn status(client: &DaemonClient, id: &str, format: OutputFormat) -> Result<()> {
    let build = client.status(id).await?;
    format_or_json(format, &build, || println!("{}", format_build_detail(&build)))
}

pub async fn list(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let builds = client.list().await?;
    format_or_json(format, &builds, || {
        if builds.is_empty() {
            println!("No builds");
            return;
        }
        println!("{}", build_table_header());
        for build in &builds {
            println!("{}", format_build_row(build));
        }
    })
}

#[cfg(test)]
#[path = "build_tests.rs"]
mod tests;
