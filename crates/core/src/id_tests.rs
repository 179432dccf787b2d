// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

crate::define_id! {
    pub struct TestId("tst-");
}

#[test]
fn new_id_fits_inline() {
    let id = TestId::new();
    assert_eq!(&id[..4], TestId::PREFIX);
    assert_eq!(id.len(), 23);
    assert!(!id.0.is_heap_allocated());
    assert_eq!(TestId::new().suffix().len(), 19);
}

#[test]
fn ids_key_str_lookups() {
    let mut map = HashMap::new();
    map.insert(TestId::from_string("tst-k"), 42);
    assert_eq!(map.get("tst-k"), Some(&42));
    assert_ne!(TestId::new(), TestId::new());
}

#[test]
fn ids_serialize_as_bare_strings() {
    let id = TestId::from_string("tst-123");
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"tst-123\"");
    assert_eq!(serde_json::from_str::<TestId>("\"tst-123\"").unwrap(), id);
}

#[yare::parameterized(
    truncated = { "tst-abcdefghijklmnop", 8, "abcdefgh" },
    shorter_than_n = { "tst-abc", 8, "abc" },
    multibyte = { "tst-ébcdef", 2, "éb" },
)]
fn short_takes_leading_suffix_chars(id: &str, n: usize, expected: &str) {
    assert_eq!(TestId::from_string(id).short(n), expected);
    assert_eq!(short(TestId::from_string(id).suffix(), n), expected);
}

#[yare::parameterized(
    full = { "tst-abc123", true },
    with_type_prefix = { "tst-ab", true },
    suffix_only = { "abc", true },
    mismatch = { "abd", false },
    other_type = { "bld-abc", false },
    empty = { "", false },
)]
fn prefix_matching(query: &str, expected: bool) {
    assert_eq!(TestId::from_string("tst-abc123").matches_prefix(query), expected);
}
