//! Shared fixtures and snapshot assertions for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use snpsort::io::{parse_delimited, position_order, variant_table};
use snpsort::{PositionOrder, ReorderConfig, VariantTable};

const UPDATE_VAR: &str = "SNPSORT_UPDATE_SNAPSHOTS";

fn test_data(dir: &str, name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join(dir)
        .join(name)
}

pub fn fixture_path(name: &str) -> PathBuf {
    test_data("fixtures", name)
}

/// Compare a rendered table with `tests/snapshots/<name>` row by row.
///
/// With `SNPSORT_UPDATE_SNAPSHOTS` set the snapshot is rewritten instead.
pub fn assert_snapshot(name: &str, actual: &str) {
    let path = test_data("snapshots", name);
    if std::env::var_os(UPDATE_VAR).is_some() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected = fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("snapshot {} not found; set {UPDATE_VAR}=1", path.display()));
    let expected_rows: Vec<&str> = expected.lines().collect();
    let actual_rows: Vec<&str> = actual.lines().collect();
    if let Some(line) = first_difference(&expected_rows, &actual_rows) {
        panic!(
            "table {name} differs from its snapshot at line {line}\n  expected: {:?}\n  actual:   {:?}\n\
             set {UPDATE_VAR}=1 to regenerate",
            expected_rows.get(line - 1),
            actual_rows.get(line - 1),
        );
    }
}

/// 1-based line of the first differing row; `lines()` already folds `\r\n`.
fn first_difference(expected: &[&str], actual: &[&str]) -> Option<usize> {
    let rows = expected.len().max(actual.len());
    (0..rows)
        .find(|&idx| expected.get(idx) != actual.get(idx))
        .map(|idx| idx + 1)
}

/// Parse a raw table and a position order from in-memory text.
pub fn load(raw: &str, order: &str, config: &ReorderConfig) -> (VariantTable, PositionOrder) {
    let raw = parse_delimited(raw, None, Some("raw")).expect("raw table parses");
    let order = parse_delimited(order, None, Some("order")).expect("order parses");
    (
        variant_table(&raw, config).expect("raw table is well formed"),
        position_order(&order, config).expect("position order is well formed"),
    )
}

/// The checked-in raw table and position order.
pub fn load_fixtures(config: &ReorderConfig) -> (VariantTable, PositionOrder) {
    let raw = fs::read_to_string(fixture_path("raw_table.tsv")).expect("read raw fixture");
    let order = fs::read_to_string(fixture_path("position_order.csv")).expect("read order fixture");
    load(&raw, &order, config)
}
