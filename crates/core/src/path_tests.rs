// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    plain = { "/work/app", "src", "/work/app/src" },
    dot = { "/work/app", "./src", "/work/app/src" },
    parent = { "/work/app", "../lib", "/work/lib" },
    nested = { "/work/app", "a/./b/../c", "/work/app/a/c" },
    above_root = { "/", "../../etc", "/etc" },
    absolute_segment = { "/work/app", "/opt/tool", "/opt/tool" },
)]
fn join_normalizes(base: &str, segment: &str, expected: &str) {
    let base = ProjectPath::from_absolute(base).unwrap();
    assert_eq!(base.join(segment).as_path(), Path::new(expected));
}

#[test]
fn join_returns_new_value() {
    let base = ProjectPath::from_absolute("/work").unwrap();
    let joined = base.join("out");
    assert_eq!(base.as_path(), Path::new("/work"));
    assert_eq!(joined.as_path(), Path::new("/work/out"));
}

#[test]
fn relative_paths_become_absolute() {
    let path = ProjectPath::new("some/dir/../file.toml").unwrap();
    assert!(path.as_path().is_absolute());
    assert!(path.as_path().ends_with("some/file.toml"));
}

#[test]
fn from_absolute_rejects_relative() {
    assert!(ProjectPath::from_absolute("relative/path").is_none());
}

#[test]
fn parent_of_file() {
    let path = ProjectPath::from_absolute("/work/plans/ci.toml").unwrap();
    assert_eq!(path.parent().as_path(), Path::new("/work/plans"));
}
