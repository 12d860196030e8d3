//! Integration tests for schema and key discovery.

use odbc_reader_rs::driver::constants::*;
use odbc_reader_rs::driver::fixture::{FixtureCatalog, FixtureCell, FixtureColumn, FixtureResult, FixtureStatement};
use odbc_reader_rs::{CommandBehavior, DataReader, Nullability, ProviderInfo, ReaderOptions};

fn key_info() -> ReaderOptions {
    ReaderOptions::new()
        .with_behavior(CommandBehavior::KEY_INFO)
        .with_provider(ProviderInfo::generic())
}

fn orders_columns(names: &[&str]) -> Vec<FixtureColumn> {
    names
        .iter()
        .map(|n| FixtureColumn::new(*n, SQL_INTEGER).base("orders", *n).nullable(true))
        .collect()
}

fn key_flags(reader: &mut DataReader<FixtureStatement>) -> Vec<bool> {
    reader.schema().unwrap().iter().map(|c| c.is_key).collect()
}

#[test]
fn test_narrower_unique_index_becomes_the_key() {
    let stmt = FixtureStatement::new(vec![FixtureResult::new(orders_columns(&["a", "b", "c", "d"]))])
        .with_catalog(
            FixtureCatalog::new()
                .unique_index("orders", "ix_abc", &["a", "b", "c"])
                .unique_index("orders", "ix_ab", &["a", "b"]),
        );
    let calls = stmt.calls();
    let mut reader = DataReader::open(stmt, None, key_info()).unwrap();

    assert_eq!(key_flags(&mut reader), vec![true, true, false, false]);
    let schema = reader.schema().unwrap();
    assert!(schema[0].is_unique);
    assert_eq!(schema[0].nullability, Nullability::NoNulls);
    assert_eq!(schema[2].nullability, Nullability::Nullable);
    assert_eq!(schema[3].base_table_name.as_deref(), Some("orders"));
    assert_eq!(
        calls.snapshot().catalog_calls,
        vec![
            "primary_keys:orders".to_string(),
            "statistics:orders".to_string(),
            "special_columns:orders".to_string(),
        ]
    );
}

#[test]
fn test_table_without_keys_leaves_columns_unflagged() {
    let stmt = FixtureStatement::new(vec![FixtureResult::new(orders_columns(&["a", "b"]))])
        .with_catalog(FixtureCatalog::new());
    let mut reader = DataReader::open(stmt, None, key_info()).unwrap();
    assert_eq!(key_flags(&mut reader), vec![false, false]);
    assert!(reader.schema().unwrap().iter().all(|c| !c.is_unique));
}

#[test]
fn test_primary_key_and_row_version() {
    let stmt = FixtureStatement::new(vec![FixtureResult::new(orders_columns(&["id", "qty", "ts"]))
        .row(vec![FixtureCell::int(1), FixtureCell::int(2), FixtureCell::int(3)])])
    .with_catalog(
        FixtureCatalog::new()
            .primary_key("orders", &["id"])
            .unique_index("orders", "ix_qty", &["qty"])
            .row_version("orders", "ts"),
    );
    let mut reader = DataReader::open(stmt, None, key_info()).unwrap();
    assert!(reader.read().unwrap());

    assert_eq!(key_flags(&mut reader), vec![true, false, false]);
    let schema = reader.schema().unwrap();
    assert!(schema[2].is_row_version);
    assert!(!schema[0].is_row_version);

    // discovery does not disturb the current row
    assert_eq!(reader.get_i32(1).unwrap(), 2);
}

#[test]
fn test_base_table_from_command_text() {
    let stmt = FixtureStatement::new(vec![FixtureResult::new(vec![
        FixtureColumn::new("id", SQL_INTEGER),
        FixtureColumn::new("name", SQL_WVARCHAR),
    ])])
    .with_catalog(FixtureCatalog::new().primary_key("customers", &["id"]));
    let mut reader = DataReader::open(stmt, Some("SELECT id, name FROM sales.customers WHERE id > 10"), key_info()).unwrap();

    let schema = reader.schema().unwrap();
    assert!(schema[0].is_key);
    assert!(!schema[1].is_key);
    assert_eq!(schema[1].base_table_name.as_deref(), Some("customers"));
    assert_eq!(schema[1].base_schema_name.as_deref(), Some("sales"));
}

#[test]
fn test_join_is_not_resolved() {
    let stmt = FixtureStatement::new(vec![FixtureResult::new(vec![
        FixtureColumn::new("id", SQL_INTEGER),
        FixtureColumn::new("total", SQL_INTEGER),
    ])])
    .with_catalog(FixtureCatalog::new().primary_key("customers", &["id"]));
    let calls = stmt.calls();
    let mut reader = DataReader::open(
        stmt,
        Some("SELECT c.id, o.total FROM customers c JOIN orders o ON o.cid = c.id"),
        key_info(),
    )
    .unwrap();

    let schema = reader.schema().unwrap();
    assert!(schema.iter().all(|c| !c.is_key && c.base_table_name.is_none()));
    assert!(calls.snapshot().catalog_calls.is_empty());
}

#[test]
fn test_schema_without_key_info_skips_catalog() {
    let stmt = FixtureStatement::new(vec![FixtureResult::new(orders_columns(&["a"]))])
        .with_catalog(FixtureCatalog::new().primary_key("orders", &["a"]));
    let calls = stmt.calls();
    let mut reader = DataReader::open(stmt, None, ReaderOptions::new()).unwrap();
    let schema = reader.schema().unwrap();
    assert!(!schema[0].is_key);
    assert_eq!(schema[0].base_table_name, None);
    assert!(calls.snapshot().catalog_calls.is_empty());
}

#[test]
fn test_schema_follows_the_current_result() {
    let stmt = FixtureStatement::new(vec![
        FixtureResult::new(orders_columns(&["a", "b"])),
        FixtureResult::new(vec![FixtureColumn::new("note", SQL_WVARCHAR).octet_length(80)]),
    ]);
    let mut reader = DataReader::open(stmt, None, ReaderOptions::new()).unwrap();
    assert_eq!(reader.schema().unwrap().len(), 2);

    assert!(reader.next_result().unwrap());
    let schema = reader.schema().unwrap();
    assert_eq!(schema.len(), 1);
    assert_eq!(schema[0].name, "note");
    assert_eq!(schema[0].column_size, 40);

    assert!(!reader.next_result().unwrap());
    assert!(reader.schema().unwrap().is_empty());
}

#[test]
fn test_driver_reported_keys_skip_the_cascade() {
    let stmt = FixtureStatement::new(vec![FixtureResult::new(vec![
        FixtureColumn::new("id", SQL_INTEGER).base("orders", "id").key(true),
        FixtureColumn::new("ts", SQL_INTEGER).base("orders", "ts").key(false),
    ])])
    .with_catalog(FixtureCatalog::new().primary_key("orders", &["ts"]).row_version("orders", "ts"));
    let calls = stmt.calls();
    let options = ReaderOptions::new()
        .with_behavior(CommandBehavior::KEY_INFO)
        .with_provider(ProviderInfo::default());
    let mut reader = DataReader::open(stmt, None, options).unwrap();

    assert_eq!(key_flags(&mut reader), vec![true, false]);
    assert!(reader.schema().unwrap()[1].is_row_version);
    // only the row-version lookup runs, and only once
    assert_eq!(calls.snapshot().catalog_calls, vec!["special_columns:orders".to_string()]);
}
