//! Driver call surface consumed by the reader.
//!
//! The reader never talks to a driver manager directly. Everything it needs is
//! expressed by the [`Statement`] trait (the statement producing rows) and the
//! [`CatalogStatement`] trait (a secondary handle used for key discovery).
//! Column numbers passed across this boundary are 1-based, as in ODBC.

pub mod constants;
pub mod fixture;

use std::fmt;

use crate::protocol::types::CDataType;
use constants::*;

/// Native return code of a driver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetCode {
    Success,
    SuccessWithInfo,
    Error,
    InvalidHandle,
    NoData,
}

impl RetCode {
    /// `Success` or `SuccessWithInfo`.
    pub fn is_success(self) -> bool {
        matches!(self, RetCode::Success | RetCode::SuccessWithInfo)
    }
}

impl fmt::Display for RetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RetCode::Success => "SQL_SUCCESS",
            RetCode::SuccessWithInfo => "SQL_SUCCESS_WITH_INFO",
            RetCode::Error => "SQL_ERROR",
            RetCode::InvalidHandle => "SQL_INVALID_HANDLE",
            RetCode::NoData => "SQL_NO_DATA",
        };
        f.write_str(name)
    }
}

/// Length/indicator reported alongside column data.
///
/// Replaces the `SQL_NULL_DATA` and `SQL_NO_TOTAL` sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// The value is NULL.
    Null,
    /// More data is available but the driver cannot tell how much.
    NoTotal,
    /// Bytes available from the current read position, excluding any
    /// terminator.
    Length(usize),
}

/// Column attribute (descriptor field) identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescField {
    ConciseType,
    Unsigned,
    Updatable,
    AutoUniqueValue,
    TypeName,
    SchemaName,
    CatalogName,
    BaseColumnName,
    BaseTableName,
    Precision,
    Scale,
    Nullable,
    Name,
    OctetLength,
    /// SQL Server: column is hidden (added by the server for browse mode).
    SsColumnHidden,
    /// SQL Server: column is part of the key.
    SsColumnKey,
    /// SQL Server: runtime wire type of the current variant value.
    SsVariantSqlType,
}

impl DescField {
    /// Raw field identifier.
    pub fn raw(self) -> u16 {
        match self {
            DescField::ConciseType => SQL_DESC_CONCISE_TYPE,
            DescField::Unsigned => SQL_DESC_UNSIGNED,
            DescField::Updatable => SQL_DESC_UPDATABLE,
            DescField::AutoUniqueValue => SQL_DESC_AUTO_UNIQUE_VALUE,
            DescField::TypeName => SQL_DESC_TYPE_NAME,
            DescField::SchemaName => SQL_DESC_SCHEMA_NAME,
            DescField::CatalogName => SQL_DESC_CATALOG_NAME,
            DescField::BaseColumnName => SQL_DESC_BASE_COLUMN_NAME,
            DescField::BaseTableName => SQL_DESC_BASE_TABLE_NAME,
            DescField::Precision => SQL_DESC_PRECISION,
            DescField::Scale => SQL_DESC_SCALE,
            DescField::Nullable => SQL_DESC_NULLABLE,
            DescField::Name => SQL_DESC_NAME,
            DescField::OctetLength => SQL_DESC_OCTET_LENGTH,
            DescField::SsColumnHidden => SQL_CA_SS_COLUMN_HIDDEN,
            DescField::SsColumnKey => SQL_CA_SS_COLUMN_KEY,
            DescField::SsVariantSqlType => SQL_CA_SS_VARIANT_SQL_TYPE,
        }
    }

    /// Whether the field is a SQL Server driver extension.
    pub fn is_provider_specific(self) -> bool {
        matches!(
            self,
            DescField::SsColumnHidden | DescField::SsColumnKey | DescField::SsVariantSqlType
        )
    }
}

/// Value of a column attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Numeric(i64),
    Text(String),
}

impl AttrValue {
    /// Numeric value, if this is a numeric attribute.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Numeric(n) => Some(*n),
            AttrValue::Text(_) => None,
        }
    }

    /// Text value, if this is a non-empty string attribute.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

/// One native diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    /// Five character SQLSTATE.
    pub state: String,
    /// Driver specific error code.
    pub native_error: i32,
    /// Message text.
    pub message: String,
}

impl DiagnosticRecord {
    pub fn new(state: impl Into<String>, native_error: i32, message: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            native_error,
            message: message.into(),
        }
    }
}

/// A statement handle that has been executed and may produce results.
///
/// Methods mirror the native calls one to one and report outcomes through
/// [`RetCode`]; diagnostics for the last call are available from
/// [`Statement::diagnostics`].
pub trait Statement {
    /// Advance to the next row of the current result.
    fn fetch(&mut self) -> RetCode;

    /// Copy (part of) a column of the current row into `buf`.
    ///
    /// Variable-length transfers continue where the previous call for the
    /// same column stopped. Wide text is written as UTF-16LE followed by a
    /// two byte terminator that must fit in `buf`.
    fn get_data(&mut self, column: u16, target: CDataType, buf: &mut [u8]) -> (RetCode, Indicator);

    /// Number of columns in the current result.
    fn num_result_cols(&mut self) -> (RetCode, i16);

    /// Rows affected by the statement that produced the current result.
    fn row_count(&mut self) -> (RetCode, i64);

    /// Read a column attribute.
    fn col_attribute(&mut self, column: u16, field: DescField) -> (RetCode, AttrValue);

    /// Advance to the next result.
    fn more_results(&mut self) -> RetCode;

    /// Diagnostic records of the last call.
    fn diagnostics(&mut self) -> Vec<DiagnosticRecord>;

    /// Discard any pending results.
    fn close_cursor(&mut self) -> RetCode;

    /// Close the owning connection. Called on close under `CloseConnection`.
    fn close_connection(&mut self) {}

    /// Allocate a secondary statement on the same connection for catalog
    /// queries. `None` when the driver offers no such support.
    fn open_catalog_statement(&mut self) -> Option<Box<dyn CatalogStatement>> {
        None
    }
}

/// Secondary statement used to query catalog functions.
///
/// Each call replaces the current result with the catalog result, which is
/// then read through the ordinary [`Statement`] methods.
pub trait CatalogStatement: Statement {
    /// `SQLPrimaryKeys`.
    fn primary_keys(&mut self, catalog: Option<&str>, schema: Option<&str>, table: &str) -> RetCode;

    /// `SQLStatistics`, optionally restricted to unique indexes.
    fn statistics(
        &mut self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: &str,
        unique_only: bool,
    ) -> RetCode;

    /// `SQLSpecialColumns` for row-version columns.
    fn special_columns(&mut self, catalog: Option<&str>, schema: Option<&str>, table: &str) -> RetCode;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retcode_success() {
        assert!(RetCode::Success.is_success());
        assert!(RetCode::SuccessWithInfo.is_success());
        assert!(!RetCode::NoData.is_success());
        assert!(!RetCode::Error.is_success());
    }

    #[test]
    fn test_desc_field_raw() {
        assert_eq!(DescField::ConciseType.raw(), 2);
        assert_eq!(DescField::OctetLength.raw(), 1013);
        assert!(DescField::SsColumnKey.is_provider_specific());
        assert!(!DescField::Nullable.is_provider_specific());
    }

    #[test]
    fn test_attr_value_accessors() {
        assert_eq!(AttrValue::Numeric(4).as_i64(), Some(4));
        assert_eq!(AttrValue::Text(String::new()).as_text(), None);
        assert_eq!(AttrValue::Text("dbo".into()).as_text(), Some("dbo"));
    }
}
