//! Integration tests for chunked access to long values.

use odbc_reader_rs::driver::constants::*;
use odbc_reader_rs::driver::fixture::{CallCounter, FixtureCell, FixtureColumn, FixtureResult, FixtureStatement};
use odbc_reader_rs::{CommandBehavior, DataReader, Error, FieldLength, OdbcValue, ReaderOptions, VarKind};

fn long_text(len: usize) -> String {
    (0..len).map(|i| char::from(b'a' + (i % 26) as u8)).collect()
}

type Opened = (DataReader<FixtureStatement>, CallCounter);

fn reader_over(
    cells: Vec<FixtureCell>,
    columns: Vec<FixtureColumn>,
    behavior: CommandBehavior,
    no_total: bool,
) -> Opened {
    let mut stmt = FixtureStatement::new(vec![FixtureResult::new(columns).row(cells)]);
    stmt.set_no_total(no_total);
    let calls = stmt.calls();
    let options = ReaderOptions::new()
        .with_behavior(behavior)
        .with_buffer_capacity(2000);
    let mut reader = DataReader::open(stmt, None, options).unwrap();
    assert!(reader.read().unwrap());
    (reader, calls)
}

fn text_reader(text: &str, behavior: CommandBehavior) -> Opened {
    reader_over(
        vec![FixtureCell::text(text)],
        vec![FixtureColumn::new("body", SQL_WLONGVARCHAR)],
        behavior,
        false,
    )
}

#[test]
fn test_long_text_random_access() {
    let text = long_text(10_000);
    let (mut reader, calls) = text_reader(&text, CommandBehavior::DEFAULT);

    assert_eq!(reader.get_value(0).unwrap(), OdbcValue::Text(text.clone()));
    // 1996 payload bytes per call for 20000 bytes
    assert_eq!(calls.snapshot().get_data, 11);

    // sub-ranges come from the cached value
    let units: Vec<u16> = text.encode_utf16().collect();
    let mut rebuilt = Vec::new();
    let mut window = [0u16; 3000];
    let mut offset = 0i64;
    loop {
        let n = reader.get_chars(0, offset, Some(&mut window), 0, 3000).unwrap();
        if n == 0 {
            break;
        }
        rebuilt.extend_from_slice(&window[..n as usize]);
        offset += n;
    }
    assert_eq!(rebuilt, units);
    assert_eq!(reader.get_chars(0, 0, None, 0, 0).unwrap(), 10_000);
    assert_eq!(calls.snapshot().get_data, 11);
}

#[test]
fn test_random_access_windows_over_a_large_cached_value() {
    let text = long_text(2_000_000);
    let (mut reader, calls) = text_reader(&text, CommandBehavior::DEFAULT);
    assert_eq!(reader.get_chars(0, 0, None, 0, 0).unwrap(), 2_000_000);
    let fetches = calls.snapshot().get_data;

    let mut window = [0u16; 1000];
    let mut offset = 0i64;
    let mut windows = 0;
    loop {
        let n = reader.get_chars(0, offset, Some(&mut window), 0, 1000).unwrap();
        if n == 0 {
            break;
        }
        let expected: Vec<u16> = text[offset as usize..(offset + n) as usize].encode_utf16().collect();
        assert_eq!(&window[..n as usize], expected.as_slice());
        offset += n;
        windows += 1;
    }
    assert_eq!(windows, 2000);
    assert_eq!(offset, 2_000_000);
    assert_eq!(reader.field_length(0, VarKind::Text).unwrap(), FieldLength::Known(4_000_000));
    assert_eq!(calls.snapshot().get_data, fetches);
}

#[test]
fn test_long_text_sequential_windows() {
    let text = long_text(10_000);
    let (mut reader, calls) = text_reader(&text, CommandBehavior::SEQUENTIAL_ACCESS);

    let mut rebuilt = Vec::new();
    let mut window = [0u16; 500];
    let mut offset = 0i64;
    loop {
        let n = reader.get_chars(0, offset, Some(&mut window), 0, 500).unwrap();
        if n == 0 {
            break;
        }
        assert!(n <= 500);
        rebuilt.extend_from_slice(&window[..n as usize]);
        offset += n;
    }
    assert_eq!(String::from_utf16(&rebuilt).unwrap(), text);
    // 20 windows plus the call that found the column drained
    assert_eq!(calls.snapshot().get_data, 21);
}

#[test]
fn test_sequential_rejects_backward_reads() {
    let (mut reader, _) = text_reader("abcdefghij", CommandBehavior::SEQUENTIAL_ACCESS);
    let mut window = [0u16; 4];
    assert_eq!(reader.get_chars(0, 0, Some(&mut window), 0, 4).unwrap(), 4);
    match reader.get_chars(0, 2, Some(&mut window), 0, 4) {
        Err(Error::NonSequentialAccess {
            requested, delivered, ..
        }) => {
            assert_eq!(requested, 2);
            assert_eq!(delivered, 4);
        }
        other => panic!("unexpected: {other:?}"),
    }
    // skipping forward is fine
    assert_eq!(reader.get_chars(0, 6, Some(&mut window), 0, 4).unwrap(), 4);
    assert_eq!(String::from_utf16(&window).unwrap(), "ghij");
}

#[test]
fn test_random_access_binary_windows_match_whole_value() {
    let payload: Vec<u8> = (0..5000u32).map(|i| (i * 7 % 251) as u8).collect();
    let (mut reader, calls) = reader_over(
        vec![FixtureCell::binary(payload.clone())],
        vec![FixtureColumn::new("blob", SQL_LONGVARBINARY)],
        CommandBehavior::DEFAULT,
        false,
    );

    let mut piece = [0u8; 700];
    let mut rebuilt = Vec::new();
    let mut offset = 0;
    loop {
        let n = reader.get_bytes(0, offset, Some(&mut piece), 0, 700).unwrap();
        if n == 0 {
            break;
        }
        rebuilt.extend_from_slice(&piece[..n as usize]);
        offset += n;
    }
    assert_eq!(rebuilt, payload);
    let fetches = calls.snapshot().get_data;

    assert_eq!(reader.get_binary(0).unwrap().as_ref(), payload.as_slice());
    assert_eq!(reader.get_bytes(0, 0, None, 0, 0).unwrap(), 5000);
    assert_eq!(reader.get_bytes(0, 9000, Some(&mut piece), 0, 10).unwrap(), 0);
    assert_eq!(calls.snapshot().get_data, fetches);

    assert!(matches!(
        reader.get_bytes(0, -1, Some(&mut piece), 0, 10),
        Err(Error::ArgumentOutOfRange { name: "data_offset", .. })
    ));
    assert!(matches!(
        reader.get_bytes(0, 0, Some(&mut piece), 0, -5),
        Err(Error::ArgumentOutOfRange { name: "length", .. })
    ));
}

#[test]
fn test_sequential_length_probes() {
    let (mut reader, _) = reader_over(
        vec![FixtureCell::binary(vec![9u8; 300]), FixtureCell::text("hello")],
        vec![
            FixtureColumn::new("blob", SQL_VARBINARY),
            FixtureColumn::new("note", SQL_WVARCHAR),
        ],
        CommandBehavior::SEQUENTIAL_ACCESS,
        false,
    );
    assert_eq!(reader.get_bytes(0, 0, None, 0, 0).unwrap(), 300);
    let mut head = [0u8; 100];
    assert_eq!(reader.get_bytes(0, 0, Some(&mut head), 0, 100).unwrap(), 100);
    assert_eq!(reader.get_bytes(0, 0, None, 0, 0).unwrap(), 200);
    assert_eq!(reader.get_chars(1, 0, None, 0, 0).unwrap(), 5);
}

#[test]
fn test_sequential_probe_without_totals() {
    let (mut reader, _) = reader_over(
        vec![FixtureCell::binary(vec![1u8; 300]), FixtureCell::text("hello")],
        vec![
            FixtureColumn::new("blob", SQL_VARBINARY),
            FixtureColumn::new("note", SQL_WVARCHAR),
        ],
        CommandBehavior::SEQUENTIAL_ACCESS,
        true,
    );
    assert_eq!(reader.get_bytes(0, 0, None, 0, 0).unwrap(), -4);
    assert_eq!(reader.get_chars(1, 0, None, 0, 0).unwrap(), -2);
}

#[test]
fn test_sequential_probe_of_null_values() {
    let (mut reader, _) = reader_over(
        vec![FixtureCell::Null, FixtureCell::Null],
        vec![
            FixtureColumn::new("blob", SQL_VARBINARY),
            FixtureColumn::new("note", SQL_WVARCHAR),
        ],
        CommandBehavior::SEQUENTIAL_ACCESS,
        false,
    );
    assert_eq!(reader.get_bytes(0, 0, None, 0, 0).unwrap(), -1);
    assert!(reader.is_null(0).unwrap());
    assert!(matches!(reader.get_chars(1, 0, None, 0, 0), Err(Error::Cast { .. })));
    assert!(reader.is_null(1).unwrap());
}

#[test]
fn test_sequential_is_null_keeps_data() {
    let (mut reader, _) = text_reader("payload", CommandBehavior::SEQUENTIAL_ACCESS);
    assert!(!reader.is_null(0).unwrap());
    let mut window = [0u16; 16];
    assert_eq!(reader.get_chars(0, 0, Some(&mut window), 0, 16).unwrap(), 7);
    assert_eq!(String::from_utf16(&window[..7]).unwrap(), "payload");
}

#[test]
fn test_field_length_probes() {
    let (mut reader, _) = reader_over(
        vec![FixtureCell::binary(vec![4u8; 300]), FixtureCell::Null],
        vec![
            FixtureColumn::new("blob", SQL_VARBINARY),
            FixtureColumn::new("note", SQL_WVARCHAR),
        ],
        CommandBehavior::SEQUENTIAL_ACCESS,
        false,
    );
    assert_eq!(reader.field_length(0, VarKind::Binary).unwrap(), FieldLength::Known(300));
    assert_eq!(reader.field_length(1, VarKind::Text).unwrap(), FieldLength::Null);

    let (mut reader, _) = text_reader("hello", CommandBehavior::DEFAULT);
    assert_eq!(reader.field_length(0, VarKind::Text).unwrap(), FieldLength::Known(10));
}
