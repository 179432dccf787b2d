// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

struct Fixed {
    name: &'static str,
    prefix: &'static str,
    answer: Option<&'static str>,
}

impl ToolChecker for Fixed {
    fn name(&self) -> &str {
        self.name
    }

    fn applies_to(&self, step_name: &str) -> bool {
        step_name.starts_with(self.prefix)
    }

    fn diagnose(&self) -> Option<String> {
        self.answer.map(str::to_string)
    }
}

fn nothing_installed() -> ToolRegistry {
    ToolRegistry::with_probe(Arc::new(FakeProbe::new()))
}

#[test]
fn empty_registry_has_no_hint() {
    let registry = ToolRegistry::new();
    assert!(registry.is_empty());
    assert_eq!(registry.diagnose("npm install"), None);
}

#[test]
fn first_applicable_checker_wins_even_when_healthy() {
    let mut registry = ToolRegistry::new();
    registry.register(Fixed { name: "a", prefix: "build", answer: None });
    registry.register(Fixed { name: "b", prefix: "build", answer: Some("b says no") });
    assert_eq!(registry.diagnose("build app"), None);
}

#[test]
fn registration_order_decides_between_matches() {
    let mut registry = ToolRegistry::new();
    registry.register(Fixed { name: "a", prefix: "deploy", answer: Some("first") });
    registry.register(Fixed { name: "b", prefix: "deploy", answer: Some("second") });
    registry.register(Fixed { name: "c", prefix: "test", answer: Some("third") });

    assert_eq!(registry.diagnose("deploy web").as_deref(), Some("first"));
    assert_eq!(registry.diagnose("test unit").as_deref(), Some("third"));
    assert_eq!(registry.diagnose("lint"), None);
}

#[parameterized(
    npm = { "npm install", "npm" },
    node_case = { "Node Build", "npm" },
    docker = { "docker build", "docker" },
    container = { "Push container", "docker" },
    dotnet = { "dotnet test", "dotnet" },
    nuget = { "NuGet restore", "dotnet" },
    azure = { "Deploy to Azure", "az" },
)]
fn builtin_checker_reports_missing_binary(step: &str, binary: &str) {
    let hint = nothing_installed().diagnose(step).unwrap();
    assert!(hint.contains(&format!("(`{}`)", binary)), "{hint}");
    assert!(hint.contains("not found on PATH"));
}

#[test]
fn builtin_checker_is_quiet_when_installed() {
    let registry = ToolRegistry::with_probe(Arc::new(FakeProbe::with_installed(&["npm"])));
    assert_eq!(registry.diagnose("npm ci"), None);
    assert!(registry.diagnose("docker build").is_some());
}

#[test]
fn unrelated_step_gets_no_hint() {
    assert_eq!(nothing_installed().diagnose("cargo test"), None);
}

#[test]
fn builtins_are_registered_in_order() {
    let registry = nothing_installed();
    assert_eq!(registry.len(), 4);
    // "azure container" matches both Azure and Docker; Azure is registered first
    let hint = registry.diagnose("azure container deploy").unwrap();
    assert!(hint.starts_with("Azure CLI"));
}

#[cfg(unix)]
#[test]
fn path_probe_finds_only_executables() {
    use std::os::unix::fs::PermissionsExt;

    let dir = std::env::temp_dir().join(format!("kiln-probe-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let exe = dir.join("fake-tool");
    let plain = dir.join("plain-file");
    std::fs::write(&exe, "#!/bin/sh\n").unwrap();
    std::fs::write(&plain, "data").unwrap();
    std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
    std::fs::set_permissions(&plain, std::fs::Permissions::from_mode(0o644)).unwrap();

    let probe = PathProbe::new(vec![PathBuf::from("/nonexistent"), dir.clone()]);
    assert_eq!(probe.find("fake-tool"), Some(exe));
    assert_eq!(probe.find("plain-file"), None);
    assert_eq!(probe.find("missing"), None);

    std::fs::remove_dir_all(dir).unwrap();
}
