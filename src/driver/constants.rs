//! ODBC constants used by the reader.
//!
//! Values follow the ODBC 3.x headers (`sql.h`, `sqlext.h`) plus the
//! SQL Server driver extensions (`sqlncli.h`).

// SQL data types (wire types)
pub const SQL_CHAR: i16 = 1;
pub const SQL_NUMERIC: i16 = 2;
pub const SQL_DECIMAL: i16 = 3;
pub const SQL_INTEGER: i16 = 4;
pub const SQL_SMALLINT: i16 = 5;
pub const SQL_FLOAT: i16 = 6;
pub const SQL_REAL: i16 = 7;
pub const SQL_DOUBLE: i16 = 8;
pub const SQL_TIMESTAMP: i16 = 11;
pub const SQL_VARCHAR: i16 = 12;
pub const SQL_TYPE_DATE: i16 = 91;
pub const SQL_TYPE_TIME: i16 = 92;
pub const SQL_TYPE_TIMESTAMP: i16 = 93;
pub const SQL_LONGVARCHAR: i16 = -1;
pub const SQL_BINARY: i16 = -2;
pub const SQL_VARBINARY: i16 = -3;
pub const SQL_LONGVARBINARY: i16 = -4;
pub const SQL_BIGINT: i16 = -5;
pub const SQL_TINYINT: i16 = -6;
pub const SQL_BIT: i16 = -7;
pub const SQL_WCHAR: i16 = -8;
pub const SQL_WVARCHAR: i16 = -9;
pub const SQL_WLONGVARCHAR: i16 = -10;
pub const SQL_GUID: i16 = -11;
pub const SQL_SS_VARIANT: i16 = -150;
pub const SQL_SS_UDT: i16 = -151;
pub const SQL_SS_XML: i16 = -152;

// C data types (transfer types)
pub const SQL_C_CHAR: i16 = 1;
pub const SQL_C_WCHAR: i16 = -8;
pub const SQL_C_SLONG: i16 = -16;
pub const SQL_C_SSHORT: i16 = -15;
pub const SQL_C_REAL: i16 = 7;
pub const SQL_C_DOUBLE: i16 = 8;
pub const SQL_C_BIT: i16 = -7;
pub const SQL_C_UTINYINT: i16 = -28;
pub const SQL_C_SBIGINT: i16 = -25;
pub const SQL_C_BINARY: i16 = -2;
pub const SQL_C_TYPE_DATE: i16 = 91;
pub const SQL_C_TYPE_TIME: i16 = 92;
pub const SQL_C_TYPE_TIMESTAMP: i16 = 93;
pub const SQL_C_NUMERIC: i16 = 2;
pub const SQL_C_GUID: i16 = -11;

// Column attribute fields
pub const SQL_DESC_CONCISE_TYPE: u16 = 2;
pub const SQL_DESC_UNSIGNED: u16 = 8;
pub const SQL_DESC_UPDATABLE: u16 = 10;
pub const SQL_DESC_AUTO_UNIQUE_VALUE: u16 = 11;
pub const SQL_DESC_TYPE_NAME: u16 = 14;
pub const SQL_DESC_SCHEMA_NAME: u16 = 16;
pub const SQL_DESC_CATALOG_NAME: u16 = 17;
pub const SQL_DESC_BASE_COLUMN_NAME: u16 = 22;
pub const SQL_DESC_BASE_TABLE_NAME: u16 = 23;
pub const SQL_DESC_PRECISION: u16 = 1005;
pub const SQL_DESC_SCALE: u16 = 1006;
pub const SQL_DESC_NULLABLE: u16 = 1008;
pub const SQL_DESC_NAME: u16 = 1011;
pub const SQL_DESC_OCTET_LENGTH: u16 = 1013;
pub const SQL_CA_SS_COLUMN_HIDDEN: u16 = 1211;
pub const SQL_CA_SS_COLUMN_KEY: u16 = 1212;
pub const SQL_CA_SS_VARIANT_SQL_TYPE: u16 = 1215;

// Attribute values
pub const SQL_NO_NULLS: i64 = 0;
pub const SQL_NULLABLE: i64 = 1;
pub const SQL_NULLABLE_UNKNOWN: i64 = 2;
pub const SQL_ATTR_READONLY: i64 = 0;
pub const SQL_TRUE: i64 = 1;

// Catalog result set column numbers (1-based, as returned by the driver)
pub const SQL_PRIMARY_KEYS_COLUMN_NAME: u16 = 4;
pub const SQL_STATISTICS_INDEX_NAME: u16 = 6;
pub const SQL_STATISTICS_ORDINAL_POSITION: u16 = 8;
pub const SQL_STATISTICS_COLUMN_NAME: u16 = 9;
pub const SQL_SPECIAL_COLUMNS_COLUMN_NAME: u16 = 2;

// Diagnostic states
pub const SQLSTATE_DRIVER_NOT_CAPABLE: &str = "IM001";
pub const SQLSTATE_INVALID_DESCRIPTOR_FIELD: &str = "HY091";

/// Widest index the statistics scan will consider as a key candidate.
pub const MAX_INDEX_KEY_COLUMNS: usize = 16;
