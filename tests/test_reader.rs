//! Integration tests for row and result traversal.

use odbc_reader_rs::driver::constants::*;
use odbc_reader_rs::driver::fixture::{FixtureCell, FixtureColumn, FixtureResult, FixtureStatement};
use odbc_reader_rs::driver::{AttrValue, DescField, DiagnosticRecord, Indicator, RetCode, Statement};
use odbc_reader_rs::protocol::types::CDataType;
use odbc_reader_rs::{CommandBehavior, CursorState, DataReader, Error, OdbcType, OdbcValue, ProviderInfo, ReaderOptions};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_test_writer()
        .try_init();
}

fn int_bit_result() -> FixtureResult {
    FixtureResult::new(vec![
        FixtureColumn::new("id", SQL_INTEGER),
        FixtureColumn::new("active", SQL_BIT),
    ])
    .row(vec![FixtureCell::int(1), FixtureCell::bit(true)])
    .row(vec![FixtureCell::int(-2), FixtureCell::bit(false)])
    .row(vec![FixtureCell::int(i32::MAX), FixtureCell::Null])
}

fn names_result(names: &[&str]) -> FixtureResult {
    names.iter().fold(
        FixtureResult::new(vec![FixtureColumn::new("name", SQL_WVARCHAR)]),
        |r, n| r.row(vec![FixtureCell::text(n)]),
    )
}

fn open(stmt: FixtureStatement, behavior: CommandBehavior) -> DataReader<FixtureStatement> {
    init_tracing();
    DataReader::open(stmt, None, ReaderOptions::new().with_behavior(behavior)).unwrap()
}

#[test]
fn test_fixed_columns_three_rows() {
    let mut reader = open(FixtureStatement::new(vec![int_bit_result()]), CommandBehavior::DEFAULT);
    assert_eq!(reader.field_count().unwrap(), 2);

    let mut rows = Vec::new();
    while reader.read().unwrap() {
        rows.push(reader.get_values().unwrap());
    }
    assert_eq!(
        rows,
        vec![
            vec![OdbcValue::Int(1), OdbcValue::Bool(true)],
            vec![OdbcValue::Int(-2), OdbcValue::Bool(false)],
            vec![OdbcValue::Int(i32::MAX), OdbcValue::Null],
        ]
    );
    assert!(!reader.read().unwrap());
}

#[test]
fn test_values_are_fetched_once_per_row() {
    let stmt = FixtureStatement::new(vec![int_bit_result()]);
    let calls = stmt.calls();
    let mut reader = open(stmt, CommandBehavior::DEFAULT);
    reader.read().unwrap();

    assert!(!reader.is_null(0).unwrap());
    assert_eq!(reader.get_i32(0).unwrap(), 1);
    assert_eq!(reader.get_value(0).unwrap(), OdbcValue::Int(1));
    assert_eq!(calls.snapshot().get_data, 1);

    reader.read().unwrap();
    assert_eq!(reader.get_i32(0).unwrap(), -2);
    assert_eq!(calls.snapshot().get_data, 2);
}

#[test]
fn test_cached_null_is_not_fetched_again() {
    let stmt = FixtureStatement::new(vec![int_bit_result()]);
    let calls = stmt.calls();
    let mut reader = open(stmt, CommandBehavior::SEQUENTIAL_ACCESS);
    for _ in 0..3 {
        reader.read().unwrap();
    }
    let before = calls.snapshot().get_data;
    assert!(reader.is_null(1).unwrap());
    assert!(reader.is_null(1).unwrap());
    assert_eq!(reader.get_value(1).unwrap(), OdbcValue::Null);
    assert!(matches!(reader.get_bool(1), Err(Error::Cast { .. })));
    assert_eq!(calls.snapshot().get_data, before + 1);
}

#[test]
fn test_unsigned_small_int_is_promoted() {
    let stmt = FixtureStatement::new(vec![FixtureResult::new(vec![
        FixtureColumn::new("port", SQL_SMALLINT).unsigned(),
    ])
    .row(vec![FixtureCell::int(65535)])]);
    let mut reader = open(stmt, CommandBehavior::DEFAULT);
    assert_eq!(reader.get_field_type(0).unwrap(), OdbcType::Int);
    reader.read().unwrap();
    assert_eq!(reader.get_value(0).unwrap(), OdbcValue::Int(65535));
    assert_eq!(reader.get_i32(0).unwrap(), 65535);
}

#[test]
fn test_next_result_skips_results_without_columns() {
    let stmt = FixtureStatement::new(vec![
        names_result(&["a", "b"]),
        FixtureResult::affected(4),
        FixtureResult::affected(1),
        names_result(&["c"]),
    ]);
    let mut reader = open(stmt, CommandBehavior::DEFAULT);
    assert!(reader.read().unwrap());
    assert_eq!(reader.get_string(0).unwrap(), "a");

    assert!(reader.next_result().unwrap());
    assert_eq!(reader.records_affected(), 5);
    assert!(reader.read().unwrap());
    assert_eq!(reader.get_string(0).unwrap(), "c");
    assert!(!reader.read().unwrap());

    assert!(!reader.next_result().unwrap());
    assert_eq!(reader.field_count().unwrap(), 0);
    assert!(!reader.read().unwrap());
}

#[test]
fn test_single_result_drains_the_rest() {
    let stmt = FixtureStatement::new(vec![names_result(&["a"]), names_result(&["b"]), names_result(&["c"])]);
    let calls = stmt.calls();
    let mut reader = open(stmt, CommandBehavior::SINGLE_RESULT);
    assert!(reader.read().unwrap());
    assert!(!reader.next_result().unwrap());
    assert_eq!(calls.snapshot().more_results, 3);
    assert!(!reader.read().unwrap());
}

#[test]
fn test_info_messages_are_collected() {
    let stmt = FixtureStatement::new(vec![
        names_result(&["a"]),
        names_result(&["b"]).with_info("01000", "Changed database context"),
    ]);
    let mut reader = open(stmt, CommandBehavior::DEFAULT);
    assert!(reader.next_result().unwrap());
    assert_eq!(reader.info_messages().len(), 1);
    assert_eq!(reader.info_messages()[0].state, "01000");
    let taken = reader.take_info_messages();
    assert_eq!(taken[0].message, "Changed database context");
    assert!(reader.info_messages().is_empty());
}

#[test]
fn test_failed_result_is_reported() {
    let stmt = FixtureStatement::new(vec![
        names_result(&["a"]),
        FixtureResult::error("42S02", "Invalid object name 'missing'."),
        names_result(&["b"]),
    ]);
    let mut reader = open(stmt, CommandBehavior::DEFAULT);
    let err = reader.next_result().unwrap_err();
    assert_eq!(err.diagnostics()[0].state, "42S02");

    assert!(reader.next_result().unwrap());
    assert!(reader.read().unwrap());
    assert_eq!(reader.get_string(0).unwrap(), "b");
}

#[test]
fn test_close_merges_errors_of_discarded_results() {
    let stmt = FixtureStatement::new(vec![
        names_result(&["a"]),
        FixtureResult::error("HY000", "first"),
        FixtureResult::error("HY000", "second"),
    ]);
    let mut reader = open(stmt, CommandBehavior::DEFAULT);
    match reader.close() {
        Err(Error::Driver { code, diagnostics }) => {
            assert_eq!(code, RetCode::Error);
            let messages: Vec<_> = diagnostics.iter().map(|d| d.message.as_str()).collect();
            assert_eq!(messages, vec!["first", "second"]);
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert!(reader.is_closed());
    reader.close().unwrap();
}

#[test]
fn test_endless_failures_are_bounded() {
    let mut stmt = FixtureStatement::new(vec![names_result(&["a"])]);
    stmt.set_endless_errors(true);
    let calls = stmt.calls();
    init_tracing();
    let mut reader = DataReader::open(
        stmt,
        None,
        ReaderOptions::new().with_max_consecutive_failures(5),
    )
    .unwrap();
    let err = reader.close().unwrap_err();
    assert_eq!(err.diagnostics().len(), 5);
    assert_eq!(calls.snapshot().more_results, 5);
    assert!(reader.is_closed());
}

/// A driver that never runs out of results. Only the first one may have
/// columns.
struct EndlessEmptyResults {
    first_columns: i16,
    more_results: usize,
}

impl Statement for EndlessEmptyResults {
    fn fetch(&mut self) -> RetCode {
        RetCode::NoData
    }

    fn get_data(&mut self, _column: u16, _target: CDataType, _buf: &mut [u8]) -> (RetCode, Indicator) {
        (RetCode::NoData, Indicator::Null)
    }

    fn num_result_cols(&mut self) -> (RetCode, i16) {
        if self.more_results == 0 {
            (RetCode::Success, self.first_columns)
        } else {
            (RetCode::Success, 0)
        }
    }

    fn row_count(&mut self) -> (RetCode, i64) {
        (RetCode::Success, -1)
    }

    fn col_attribute(&mut self, _column: u16, _field: DescField) -> (RetCode, AttrValue) {
        (RetCode::Success, AttrValue::Numeric(0))
    }

    fn more_results(&mut self) -> RetCode {
        self.more_results += 1;
        assert!(self.more_results <= 1000, "traversal was never abandoned");
        RetCode::Success
    }

    fn diagnostics(&mut self) -> Vec<DiagnosticRecord> {
        Vec::new()
    }

    fn close_cursor(&mut self) -> RetCode {
        RetCode::Success
    }
}

#[test]
fn test_endless_empty_results_are_bounded() {
    init_tracing();
    let stmt = EndlessEmptyResults {
        first_columns: 1,
        more_results: 0,
    };
    let options = ReaderOptions::new().with_max_consecutive_failures(5);
    let mut reader = DataReader::open(stmt, None, options).unwrap();
    assert_eq!(reader.field_count().unwrap(), 1);

    assert!(!reader.next_result().unwrap());
    assert_eq!(reader.state(), CursorState::NoMoreResults);
    assert_eq!(reader.field_count().unwrap(), 0);
    assert!(!reader.read().unwrap());
    reader.close().unwrap();
}

#[test]
fn test_open_over_endless_empty_results_is_bounded() {
    init_tracing();
    let stmt = EndlessEmptyResults {
        first_columns: 0,
        more_results: 0,
    };
    let options = ReaderOptions::new().with_max_consecutive_failures(5);
    let mut reader = DataReader::open(stmt, None, options).unwrap();
    assert_eq!(reader.field_count().unwrap(), 0);
    assert!(!reader.read().unwrap());
}

#[test]
fn test_closed_reader_rejects_calls() {
    let mut reader = open(FixtureStatement::new(vec![names_result(&["a"])]), CommandBehavior::DEFAULT);
    reader.close().unwrap();
    assert!(matches!(reader.read(), Err(Error::Closed { operation: "read" })));
    assert!(matches!(reader.next_result(), Err(Error::Closed { .. })));
    assert!(matches!(reader.get_value(0), Err(Error::Closed { .. })));
    assert!(matches!(reader.field_count(), Err(Error::Closed { .. })));
    assert!(matches!(reader.has_rows(), Err(Error::Closed { .. })));
}

#[test]
fn test_cancel_stops_reading() {
    let stmt = FixtureStatement::new(vec![names_result(&["a", "b", "c"]), names_result(&["d"])]);
    let calls = stmt.calls();
    let mut reader = open(stmt, CommandBehavior::DEFAULT);
    let cancel = reader.cancel_handle();
    assert!(reader.read().unwrap());

    cancel.cancel();
    assert!(!reader.read().unwrap());
    assert!(matches!(reader.get_value(0), Err(Error::NoCurrentRow)));
    assert!(!reader.next_result().unwrap());
    assert_eq!(calls.snapshot().fetch, 1);
}

#[test]
fn test_has_rows_reads_ahead_once() {
    let stmt = FixtureStatement::new(vec![names_result(&["a", "b"]), names_result(&[])]);
    let calls = stmt.calls();
    let mut reader = open(stmt, CommandBehavior::DEFAULT);

    assert!(reader.has_rows().unwrap());
    assert!(reader.has_rows().unwrap());
    assert!(reader.read().unwrap());
    assert_eq!(calls.snapshot().fetch, 1);
    assert_eq!(reader.get_string(0).unwrap(), "a");
    assert!(reader.read().unwrap());
    assert_eq!(reader.get_string(0).unwrap(), "b");

    assert!(reader.next_result().unwrap());
    assert!(!reader.has_rows().unwrap());
    assert!(!reader.read().unwrap());
}

#[test]
fn test_single_row() {
    let stmt = FixtureStatement::new(vec![int_bit_result()]);
    let calls = stmt.calls();
    let mut reader = open(stmt, CommandBehavior::SINGLE_ROW);
    assert!(reader.read().unwrap());
    assert_eq!(reader.get_i32(0).unwrap(), 1);
    assert!(!reader.read().unwrap());
    assert_eq!(calls.snapshot().fetch, 1);
}

#[test]
fn test_schema_only_fetches_no_rows() {
    let stmt = FixtureStatement::new(vec![int_bit_result()]);
    let calls = stmt.calls();
    let mut reader = open(stmt, CommandBehavior::SCHEMA_ONLY);
    assert!(!reader.read().unwrap());
    assert_eq!(calls.snapshot().fetch, 0);
    let schema = reader.schema().unwrap();
    assert_eq!(schema.len(), 2);
    assert_eq!(schema[1].name, "active");
    assert_eq!(schema[1].odbc_type, OdbcType::Bit);
}

#[test]
fn test_fetch_error_is_raised() {
    let stmt = FixtureStatement::new(vec![names_result(&["a", "b"]).fail_fetch_at(1)]);
    let mut reader = open(stmt, CommandBehavior::DEFAULT);
    assert!(reader.read().unwrap());
    let err = reader.read().unwrap_err();
    assert_eq!(err.diagnostics()[0].message, "Fetch failed");
    assert!(matches!(reader.get_value(0), Err(Error::NoCurrentRow)));
}

#[test]
fn test_get_ordinal() {
    let stmt = FixtureStatement::new(vec![FixtureResult::new(vec![
        FixtureColumn::new("Id", SQL_INTEGER),
        FixtureColumn::new("id", SQL_INTEGER),
        FixtureColumn::new("Name", SQL_WVARCHAR).type_name("nvarchar"),
    ])]);
    let mut reader = open(stmt, CommandBehavior::DEFAULT);
    assert_eq!(reader.get_ordinal("id").unwrap(), 1);
    assert_eq!(reader.get_ordinal("ID").unwrap(), 0);
    assert_eq!(reader.get_ordinal("name").unwrap(), 2);
    assert!(matches!(reader.get_ordinal("missing"), Err(Error::ColumnNotFound { .. })));
    assert_eq!(reader.get_data_type_name(2).unwrap(), "nvarchar");
}

#[test]
fn test_hidden_columns_are_not_visible() {
    let stmt = FixtureStatement::new(vec![FixtureResult::new(vec![
        FixtureColumn::new("a", SQL_INTEGER).hidden(false).key(false),
        FixtureColumn::new("b", SQL_INTEGER).hidden(false).key(false),
        FixtureColumn::new("rid", SQL_INTEGER).hidden(true).key(true),
    ])
    .row(vec![FixtureCell::int(1), FixtureCell::int(2), FixtureCell::int(3)])]);
    let mut reader = DataReader::open(
        stmt,
        None,
        ReaderOptions::new()
            .with_behavior(CommandBehavior::KEY_INFO)
            .with_provider(ProviderInfo::default()),
    )
    .unwrap();
    assert_eq!(reader.field_count().unwrap(), 2);
    assert_eq!(reader.visible_field_count().unwrap(), 2);
    assert_eq!(reader.hidden_field_count(), 1);
    reader.read().unwrap();
    assert!(matches!(
        reader.get_value(2),
        Err(Error::ColumnIndexOutOfBounds { index: 2, count: 2 })
    ));
}

#[test]
fn test_close_connection_behavior() {
    let stmt = FixtureStatement::new(vec![names_result(&["a"])]);
    let calls = stmt.calls();
    let mut reader = open(stmt, CommandBehavior::CLOSE_CONNECTION);
    reader.close().unwrap();
    let log = calls.snapshot();
    assert_eq!(log.close_cursor, 1);
    assert_eq!(log.close_connection, 1);
}

#[test]
fn test_invalid_options_are_rejected() {
    let stmt = FixtureStatement::new(vec![names_result(&["a"])]);
    let result = DataReader::open(stmt, None, ReaderOptions::new().with_buffer_capacity(10));
    assert!(matches!(result, Err(Error::ArgumentOutOfRange { name: "buffer_capacity", .. })));
}
