//! In-memory scripted driver.
//!
//! [`FixtureStatement`] implements [`Statement`] and [`CatalogStatement`]
//! over results described in memory. It follows the native data transfer
//! rules closely enough to exercise the reader: variable-length values are
//! handed out in buffer-sized pieces with truncation reported through the
//! indicator, drained columns answer `NoData`, and every call is counted so
//! tests can assert how often the driver was hit.
//!
//! Cells are stored in the representation the reader asks for: fixed cells
//! hold little-endian native structs, text cells hold UTF-16LE.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::constants::*;
use super::{AttrValue, CatalogStatement, DescField, DiagnosticRecord, Indicator, RetCode, Statement};
use crate::protocol::buffer::payload_capacity;
use crate::protocol::types::{CDataType, SqlType};

/// One cell of a fixture row.
#[derive(Debug, Clone, PartialEq)]
pub enum FixtureCell {
    Null,
    /// A fixed-size value, returned whole by a single call.
    Fixed(Vec<u8>),
    /// A variable-length value, returned in pieces.
    Data(Vec<u8>),
    /// A SQL Server variant holding a value of the given wire type.
    Variant { sql_type: i16, value: Box<FixtureCell> },
}

impl FixtureCell {
    pub fn bit(v: bool) -> Self {
        FixtureCell::Fixed(vec![u8::from(v)])
    }

    pub fn tiny_int(v: u8) -> Self {
        FixtureCell::Fixed(vec![v])
    }

    pub fn small_int(v: i16) -> Self {
        FixtureCell::Fixed(v.to_le_bytes().to_vec())
    }

    pub fn int(v: i32) -> Self {
        FixtureCell::Fixed(v.to_le_bytes().to_vec())
    }

    pub fn real(v: f32) -> Self {
        FixtureCell::Fixed(v.to_le_bytes().to_vec())
    }

    pub fn double(v: f64) -> Self {
        FixtureCell::Fixed(v.to_le_bytes().to_vec())
    }

    /// `SQL_DATE_STRUCT`.
    pub fn date(year: i16, month: u16, day: u16) -> Self {
        FixtureCell::Fixed(date_bytes(year, month, day))
    }

    /// `SQL_TIME_STRUCT`.
    pub fn time(hour: u16, minute: u16, second: u16) -> Self {
        FixtureCell::Fixed(time_bytes(hour, minute, second))
    }

    /// `SQL_TIMESTAMP_STRUCT`; `fraction` is in nanoseconds.
    pub fn timestamp(date: (i16, u16, u16), time: (u16, u16, u16), fraction: u32) -> Self {
        let mut bytes = date_bytes(date.0, date.1, date.2);
        bytes.extend_from_slice(&time_bytes(time.0, time.1, time.2));
        bytes.extend_from_slice(&fraction.to_le_bytes());
        FixtureCell::Fixed(bytes)
    }

    /// `SQLGUID` bytes.
    pub fn guid(bytes: [u8; 16]) -> Self {
        FixtureCell::Fixed(bytes.to_vec())
    }

    /// Wide text, also used for numbers the reader transfers as text.
    pub fn text(s: &str) -> Self {
        FixtureCell::Data(s.encode_utf16().flat_map(u16::to_le_bytes).collect())
    }

    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        FixtureCell::Data(bytes.into())
    }

    pub fn variant(sql_type: i16, value: FixtureCell) -> Self {
        FixtureCell::Variant {
            sql_type,
            value: Box::new(value),
        }
    }
}

fn date_bytes(year: i16, month: u16, day: u16) -> Vec<u8> {
    [year.to_le_bytes(), month.to_le_bytes(), day.to_le_bytes()].concat()
}

fn time_bytes(hour: u16, minute: u16, second: u16) -> Vec<u8> {
    [hour.to_le_bytes(), minute.to_le_bytes(), second.to_le_bytes()].concat()
}

/// Column description of a fixture result.
#[derive(Debug, Clone)]
pub struct FixtureColumn {
    pub name: String,
    pub sql_type: i16,
    pub type_name: String,
    pub unsigned: bool,
    pub nullable: i64,
    pub octet_length: i64,
    pub precision: i64,
    pub scale: i64,
    pub auto_increment: bool,
    pub updatable: i64,
    pub base_table: Option<String>,
    pub base_column: Option<String>,
    pub base_schema: Option<String>,
    pub base_catalog: Option<String>,
    /// SQL Server column-key attribute; `None` when not reported.
    pub key: Option<bool>,
    /// SQL Server hidden-column attribute; `None` when not reported.
    pub hidden: Option<bool>,
}

impl FixtureColumn {
    pub fn new(name: impl Into<String>, sql_type: i16) -> Self {
        let type_name = SqlType::from_raw(sql_type)
            .map(|t| format!("{:?}", t).to_lowercase())
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            name: name.into(),
            sql_type,
            type_name,
            unsigned: false,
            nullable: SQL_NULLABLE_UNKNOWN,
            octet_length: -1,
            precision: 0,
            scale: 0,
            auto_increment: false,
            updatable: 2,
            base_table: None,
            base_column: None,
            base_schema: None,
            base_catalog: None,
            key: None,
            hidden: None,
        }
    }

    pub fn type_name(mut self, name: impl Into<String>) -> Self {
        self.type_name = name.into();
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = if nullable { SQL_NULLABLE } else { SQL_NO_NULLS };
        self
    }

    pub fn octet_length(mut self, len: i64) -> Self {
        self.octet_length = len;
        self
    }

    pub fn precision(mut self, precision: i64, scale: i64) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.updatable = SQL_ATTR_READONLY;
        self
    }

    /// Base table and column reported by the driver.
    pub fn base(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.base_table = Some(table.into());
        self.base_column = Some(column.into());
        self
    }

    pub fn base_schema(mut self, schema: impl Into<String>) -> Self {
        self.base_schema = Some(schema.into());
        self
    }

    pub fn key(mut self, key: bool) -> Self {
        self.key = Some(key);
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }
}

/// One result produced by a fixture statement.
#[derive(Debug, Clone, Default)]
pub struct FixtureResult {
    columns: Vec<FixtureColumn>,
    rows: Vec<Vec<FixtureCell>>,
    row_count: i64,
    /// Reaching this result through `more_results` fails with this record.
    error: Option<DiagnosticRecord>,
    /// Reaching this result succeeds with information.
    info: Option<DiagnosticRecord>,
    /// Fetching the row at this position fails.
    fetch_error_at: Option<usize>,
}

impl FixtureResult {
    /// A row-producing result.
    pub fn new(columns: Vec<FixtureColumn>) -> Self {
        Self {
            columns,
            row_count: -1,
            ..Default::default()
        }
    }

    /// A result without columns, such as an `UPDATE` count.
    pub fn affected(rows: i64) -> Self {
        Self {
            row_count: rows,
            ..Default::default()
        }
    }

    /// A result the driver fails to produce.
    pub fn error(state: &str, message: &str) -> Self {
        Self {
            row_count: -1,
            error: Some(DiagnosticRecord::new(state, 0, message)),
            ..Default::default()
        }
    }

    pub fn row(mut self, cells: Vec<FixtureCell>) -> Self {
        self.rows.push(cells);
        self
    }

    pub fn row_count(mut self, rows: i64) -> Self {
        self.row_count = rows;
        self
    }

    pub fn with_info(mut self, state: &str, message: &str) -> Self {
        self.info = Some(DiagnosticRecord::new(state, 0, message));
        self
    }

    pub fn fail_fetch_at(mut self, row: usize) -> Self {
        self.fetch_error_at = Some(row);
        self
    }
}

/// Catalog data served by the secondary statement.
#[derive(Debug, Clone, Default)]
pub struct FixtureCatalog {
    primary_keys: HashMap<String, Vec<String>>,
    /// table -> (index name, columns in key order)
    unique_indexes: HashMap<String, Vec<(String, Vec<String>)>>,
    row_versions: HashMap<String, Vec<String>>,
    primary_keys_unsupported: bool,
}

impl FixtureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primary_key(mut self, table: &str, columns: &[&str]) -> Self {
        self.primary_keys
            .insert(table.to_string(), columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn unique_index(mut self, table: &str, index: &str, columns: &[&str]) -> Self {
        self.unique_indexes.entry(table.to_string()).or_default().push((
            index.to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
        ));
        self
    }

    pub fn row_version(mut self, table: &str, column: &str) -> Self {
        self.row_versions
            .entry(table.to_string())
            .or_default()
            .push(column.to_string());
        self
    }

    /// `SQLPrimaryKeys` fails with `IM001`.
    pub fn without_primary_keys(mut self) -> Self {
        self.primary_keys_unsupported = true;
        self
    }
}

/// Counters of native calls, shared by a statement and its catalog
/// statements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLog {
    pub fetch: usize,
    pub get_data: usize,
    pub col_attribute: usize,
    pub more_results: usize,
    pub close_cursor: usize,
    pub close_connection: usize,
    /// Catalog calls as `"primary_keys:<table>"`, `"statistics:<table>"`,
    /// `"special_columns:<table>"`.
    pub catalog_calls: Vec<String>,
}

/// Handle to the call counters of a fixture statement.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Rc<RefCell<CallLog>>);

impl CallCounter {
    /// Copy of the counters.
    pub fn snapshot(&self) -> CallLog {
        self.0.borrow().clone()
    }

    fn record(&self, f: impl FnOnce(&mut CallLog)) {
        f(&mut self.0.borrow_mut());
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct TransferState {
    offset: usize,
    drained: bool,
}

/// Scripted statement.
#[derive(Debug)]
pub struct FixtureStatement {
    results: Vec<FixtureResult>,
    current: usize,
    row: Option<usize>,
    transfers: Vec<TransferState>,
    diagnostics: Vec<DiagnosticRecord>,
    no_total: bool,
    endless_errors: bool,
    catalog: Option<FixtureCatalog>,
    calls: CallCounter,
}

impl FixtureStatement {
    /// A statement positioned on the first of `results`.
    pub fn new(results: Vec<FixtureResult>) -> Self {
        Self {
            results,
            current: 0,
            row: None,
            transfers: Vec::new(),
            diagnostics: Vec::new(),
            no_total: false,
            endless_errors: false,
            catalog: None,
            calls: CallCounter::default(),
        }
    }

    /// Serve key discovery from `catalog`.
    pub fn with_catalog(mut self, catalog: FixtureCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Report truncated transfers without their total length.
    pub fn set_no_total(&mut self, no_total: bool) {
        self.no_total = no_total;
    }

    /// After the last result, keep failing `more_results` instead of
    /// answering `NoData`.
    pub fn set_endless_errors(&mut self, endless: bool) {
        self.endless_errors = endless;
    }

    /// Counters shared with every statement derived from this one.
    pub fn calls(&self) -> CallCounter {
        self.calls.clone()
    }

    fn result(&self) -> Option<&FixtureResult> {
        self.results.get(self.current)
    }

    fn fail(&mut self, state: &str, message: &str) -> RetCode {
        self.diagnostics = vec![DiagnosticRecord::new(state, 0, message)];
        RetCode::Error
    }

    fn column(&self, column: u16) -> Option<&FixtureColumn> {
        self.result()?.columns.get(usize::from(column).checked_sub(1)?)
    }

    fn cell(&self, column: u16) -> Option<&FixtureCell> {
        let row = self.row?;
        self.result()?.rows.get(row)?.get(usize::from(column).checked_sub(1)?)
    }

    fn load_catalog_result(&mut self, columns: &[&str], rows: Vec<Vec<FixtureCell>>) {
        let columns = columns
            .iter()
            .map(|name| FixtureColumn::new(*name, SQL_WVARCHAR))
            .collect();
        self.results = vec![FixtureResult {
            columns,
            rows,
            row_count: -1,
            ..Default::default()
        }];
        self.current = 0;
        self.row = None;
    }

    fn transfer(
        cell: &FixtureCell,
        state: &mut TransferState,
        target: CDataType,
        buf: &mut [u8],
        no_total: bool,
    ) -> Result<(RetCode, Indicator), &'static str> {
        match cell {
            FixtureCell::Null => {
                if state.drained {
                    return Ok((RetCode::NoData, Indicator::NoTotal));
                }
                state.drained = true;
                Ok((RetCode::Success, Indicator::Null))
            }
            FixtureCell::Fixed(bytes) => {
                if buf.is_empty() {
                    // length probe
                    return Ok((RetCode::SuccessWithInfo, Indicator::Length(bytes.len())));
                }
                if target.is_variable() {
                    return Err("restricted data type attribute violation");
                }
                if state.drained {
                    return Ok((RetCode::NoData, Indicator::NoTotal));
                }
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                state.drained = true;
                Ok((RetCode::Success, Indicator::Length(bytes.len())))
            }
            FixtureCell::Data(bytes) => {
                if !target.is_variable() {
                    return Err("restricted data type attribute violation");
                }
                if state.drained {
                    return Ok((RetCode::NoData, Indicator::NoTotal));
                }
                let remaining = bytes.len() - state.offset;
                let n = remaining.min(payload_capacity(target, buf.len()));
                buf[..n].copy_from_slice(&bytes[state.offset..state.offset + n]);
                let term = target.terminator_len();
                if buf.len() >= n + term {
                    buf[n..n + term].fill(0);
                }
                state.offset += n;
                if n == remaining {
                    state.drained = true;
                    Ok((RetCode::Success, Indicator::Length(remaining)))
                } else if no_total {
                    Ok((RetCode::SuccessWithInfo, Indicator::NoTotal))
                } else {
                    Ok((RetCode::SuccessWithInfo, Indicator::Length(remaining)))
                }
            }
            FixtureCell::Variant { value, .. } => Self::transfer(value, state, target, buf, no_total),
        }
    }
}

impl Statement for FixtureStatement {
    fn fetch(&mut self) -> RetCode {
        self.calls.record(|log| log.fetch += 1);
        let Some((columns, rows, fetch_error_at)) = self
            .result()
            .map(|r| (r.columns.len(), r.rows.len(), r.fetch_error_at))
        else {
            return self.fail("24000", "Invalid cursor state");
        };
        if columns == 0 {
            return self.fail("24000", "Invalid cursor state");
        }
        let next = self.row.map_or(0, |r| r + 1);
        if fetch_error_at == Some(next) {
            return self.fail("HY000", "Fetch failed");
        }
        if next >= rows {
            self.row = Some(rows);
            return RetCode::NoData;
        }
        self.row = Some(next);
        self.transfers = vec![TransferState::default(); columns];
        RetCode::Success
    }

    fn get_data(&mut self, column: u16, target: CDataType, buf: &mut [u8]) -> (RetCode, Indicator) {
        self.calls.record(|log| log.get_data += 1);
        let Some(cell) = self.cell(column).cloned() else {
            return (self.fail("07009", "Invalid descriptor index"), Indicator::NoTotal);
        };
        let no_total = self.no_total;
        let state = &mut self.transfers[usize::from(column) - 1];
        match Self::transfer(&cell, state, target, buf, no_total) {
            Ok(reply) => reply,
            Err(message) => (self.fail("07006", message), Indicator::NoTotal),
        }
    }

    fn num_result_cols(&mut self) -> (RetCode, i16) {
        let count = self.result().map_or(0, |r| r.columns.len());
        (RetCode::Success, count as i16)
    }

    fn row_count(&mut self) -> (RetCode, i64) {
        (RetCode::Success, self.result().map_or(-1, |r| r.row_count))
    }

    fn col_attribute(&mut self, column: u16, field: DescField) -> (RetCode, AttrValue) {
        self.calls.record(|log| log.col_attribute += 1);
        let variant_type = match self.cell(column) {
            Some(FixtureCell::Variant { sql_type, .. }) => Some(*sql_type),
            _ => None,
        };
        let Some(col) = self.column(column) else {
            return (self.fail("07009", "Invalid descriptor index"), AttrValue::Numeric(0));
        };
        let text = |s: &Option<String>| AttrValue::Text(s.clone().unwrap_or_default());
        let value = match field {
            DescField::ConciseType => AttrValue::Numeric(i64::from(col.sql_type)),
            DescField::Unsigned => AttrValue::Numeric(i64::from(col.unsigned)),
            DescField::Updatable => AttrValue::Numeric(col.updatable),
            DescField::AutoUniqueValue => AttrValue::Numeric(i64::from(col.auto_increment)),
            DescField::TypeName => AttrValue::Text(col.type_name.clone()),
            DescField::SchemaName => text(&col.base_schema),
            DescField::CatalogName => text(&col.base_catalog),
            DescField::BaseColumnName => text(&col.base_column),
            DescField::BaseTableName => text(&col.base_table),
            DescField::Precision => AttrValue::Numeric(col.precision),
            DescField::Scale => AttrValue::Numeric(col.scale),
            DescField::Nullable => AttrValue::Numeric(col.nullable),
            DescField::Name => AttrValue::Text(col.name.clone()),
            DescField::OctetLength => AttrValue::Numeric(col.octet_length),
            DescField::SsColumnHidden => match col.hidden {
                Some(hidden) => AttrValue::Numeric(i64::from(hidden)),
                None => return (self.fail(SQLSTATE_INVALID_DESCRIPTOR_FIELD, "Invalid descriptor field identifier"), AttrValue::Numeric(0)),
            },
            DescField::SsColumnKey => match col.key {
                Some(key) => AttrValue::Numeric(i64::from(key)),
                None => return (self.fail(SQLSTATE_INVALID_DESCRIPTOR_FIELD, "Invalid descriptor field identifier"), AttrValue::Numeric(0)),
            },
            DescField::SsVariantSqlType => match variant_type {
                Some(sql_type) => AttrValue::Numeric(i64::from(sql_type)),
                None => return (self.fail("HY000", "Not a variant value"), AttrValue::Numeric(0)),
            },
        };
        (RetCode::Success, value)
    }

    fn more_results(&mut self) -> RetCode {
        self.calls.record(|log| log.more_results += 1);
        self.row = None;
        if self.current + 1 >= self.results.len() {
            self.current = self.results.len();
            if self.endless_errors {
                return self.fail("HY000", "Result failed");
            }
            return RetCode::NoData;
        }
        self.current += 1;
        let (error, info) = match self.result() {
            Some(r) => (r.error.clone(), r.info.clone()),
            None => (None, None),
        };
        if let Some(record) = error {
            self.diagnostics = vec![record];
            return RetCode::Error;
        }
        if let Some(record) = info {
            self.diagnostics = vec![record];
            return RetCode::SuccessWithInfo;
        }
        RetCode::Success
    }

    fn diagnostics(&mut self) -> Vec<DiagnosticRecord> {
        std::mem::take(&mut self.diagnostics)
    }

    fn close_cursor(&mut self) -> RetCode {
        self.calls.record(|log| log.close_cursor += 1);
        self.current = self.results.len();
        self.row = None;
        RetCode::Success
    }

    fn close_connection(&mut self) {
        self.calls.record(|log| log.close_connection += 1);
    }

    fn open_catalog_statement(&mut self) -> Option<Box<dyn CatalogStatement>> {
        let catalog = self.catalog.clone()?;
        let mut stmt = FixtureStatement::new(Vec::new());
        stmt.catalog = Some(catalog);
        stmt.no_total = self.no_total;
        stmt.calls = self.calls.clone();
        Some(Box::new(stmt))
    }
}

impl CatalogStatement for FixtureStatement {
    fn primary_keys(&mut self, _catalog: Option<&str>, _schema: Option<&str>, table: &str) -> RetCode {
        self.calls
            .record(|log| log.catalog_calls.push(format!("primary_keys:{table}")));
        let Some(catalog) = self.catalog.clone() else {
            return self.fail(SQLSTATE_DRIVER_NOT_CAPABLE, "Driver does not support this function");
        };
        if catalog.primary_keys_unsupported {
            return self.fail(SQLSTATE_DRIVER_NOT_CAPABLE, "Driver does not support this function");
        }
        let rows = catalog
            .primary_keys
            .get(table)
            .map(|columns| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(seq, column)| {
                        vec![
                            FixtureCell::Null,
                            FixtureCell::Null,
                            FixtureCell::text(table),
                            FixtureCell::text(column),
                            FixtureCell::small_int(seq as i16 + 1),
                            FixtureCell::text("PK"),
                        ]
                    })
                    .collect()
            })
            .unwrap_or_default();
        self.load_catalog_result(
            &["TABLE_CAT", "TABLE_SCHEM", "TABLE_NAME", "COLUMN_NAME", "KEY_SEQ", "PK_NAME"],
            rows,
        );
        RetCode::Success
    }

    fn statistics(
        &mut self,
        _catalog: Option<&str>,
        _schema: Option<&str>,
        table: &str,
        _unique_only: bool,
    ) -> RetCode {
        self.calls
            .record(|log| log.catalog_calls.push(format!("statistics:{table}")));
        let Some(catalog) = self.catalog.clone() else {
            return self.fail(SQLSTATE_DRIVER_NOT_CAPABLE, "Driver does not support this function");
        };
        let mut rows = Vec::new();
        if let Some(indexes) = catalog.unique_indexes.get(table) {
            // table statistics row: no index name
            rows.push(statistics_row(table, None, 0, None));
            for (index, columns) in indexes {
                for (pos, column) in columns.iter().enumerate() {
                    rows.push(statistics_row(table, Some(index), pos as i16 + 1, Some(column)));
                }
            }
        }
        self.load_catalog_result(
            &[
                "TABLE_CAT",
                "TABLE_SCHEM",
                "TABLE_NAME",
                "NON_UNIQUE",
                "INDEX_QUALIFIER",
                "INDEX_NAME",
                "TYPE",
                "ORDINAL_POSITION",
                "COLUMN_NAME",
                "ASC_OR_DESC",
                "CARDINALITY",
                "PAGES",
                "FILTER_CONDITION",
            ],
            rows,
        );
        RetCode::Success
    }

    fn special_columns(&mut self, _catalog: Option<&str>, _schema: Option<&str>, table: &str) -> RetCode {
        self.calls
            .record(|log| log.catalog_calls.push(format!("special_columns:{table}")));
        let Some(catalog) = self.catalog.clone() else {
            return self.fail(SQLSTATE_DRIVER_NOT_CAPABLE, "Driver does not support this function");
        };
        let rows = catalog
            .row_versions
            .get(table)
            .map(|columns| {
                columns
                    .iter()
                    .map(|column| vec![FixtureCell::Null, FixtureCell::text(column)])
                    .collect()
            })
            .unwrap_or_default();
        self.load_catalog_result(&["SCOPE", "COLUMN_NAME"], rows);
        RetCode::Success
    }
}

fn statistics_row(table: &str, index: Option<&str>, ordinal: i16, column: Option<&str>) -> Vec<FixtureCell> {
    let text_or_null = |s: Option<&str>| s.map_or(FixtureCell::Null, FixtureCell::text);
    vec![
        FixtureCell::Null,
        FixtureCell::Null,
        FixtureCell::text(table),
        FixtureCell::small_int(0),
        FixtureCell::Null,
        text_or_null(index),
        FixtureCell::small_int(if index.is_some() { 3 } else { 0 }),
        if index.is_some() {
            FixtureCell::small_int(ordinal)
        } else {
            FixtureCell::Null
        },
        text_or_null(column),
        FixtureCell::Null,
        FixtureCell::Null,
        FixtureCell::Null,
        FixtureCell::Null,
    ]
}
