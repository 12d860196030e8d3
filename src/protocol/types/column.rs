//! Column descriptors produced by metadata discovery.

use super::odbc_type::{OdbcType, SqlType};

/// Nullability as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Nullability {
    NoNulls,
    Nullable,
    #[default]
    Unknown,
}

impl Nullability {
    /// From a `SQL_DESC_NULLABLE` attribute value.
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            crate::driver::constants::SQL_NO_NULLS => Nullability::NoNulls,
            crate::driver::constants::SQL_NULLABLE => Nullability::Nullable,
            _ => Nullability::Unknown,
        }
    }
}

/// Schema information for one result column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// Column name (empty when the driver reports none).
    pub name: String,
    /// Zero-based position in the result.
    pub ordinal: usize,
    /// Size in bytes, or in characters for wide character types.
    pub column_size: i32,
    pub precision: u8,
    pub scale: u8,
    /// Logical type after sign promotion.
    pub odbc_type: OdbcType,
    /// Wire type of the promoted mapping.
    pub sql_type: SqlType,
    /// Unbounded (long) data type.
    pub is_long: bool,
    pub nullability: Nullability,
    pub is_read_only: bool,
    pub is_row_version: bool,
    pub is_unique: bool,
    pub is_key: bool,
    pub is_auto_increment: bool,
    pub base_schema_name: Option<String>,
    pub base_catalog_name: Option<String>,
    pub base_table_name: Option<String>,
    pub base_column_name: Option<String>,
}

impl ColumnDescriptor {
    /// A descriptor with only identity and type filled in.
    pub fn new(name: impl Into<String>, ordinal: usize, odbc_type: OdbcType, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            ordinal,
            column_size: -1,
            precision: 0,
            scale: 0,
            odbc_type,
            sql_type,
            is_long: sql_type.is_long(),
            nullability: Nullability::Unknown,
            is_read_only: false,
            is_row_version: false,
            is_unique: false,
            is_key: false,
            is_auto_increment: false,
            base_schema_name: None,
            base_catalog_name: None,
            base_table_name: None,
            base_column_name: None,
        }
    }

    /// Whether NULL values are allowed (known nullable only).
    pub fn allow_null(&self) -> bool {
        self.nullability == Nullability::Nullable
    }

    /// Mark as a member of the key used to identify rows.
    pub(crate) fn mark_key(&mut self) {
        self.is_key = true;
        self.is_unique = true;
        self.nullability = Nullability::NoNulls;
    }
}

/// Find the position of `name`, exact match first, then ignoring case.
pub fn find_by_name<T>(items: &[T], name: &str, key: impl Fn(&T) -> Option<&str>) -> Option<usize> {
    items
        .iter()
        .position(|item| key(item) == Some(name))
        .or_else(|| {
            items.iter().position(|item| {
                key(item).is_some_and(|candidate| candidate.eq_ignore_ascii_case(name))
            })
        })
}
