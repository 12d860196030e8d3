//! Type tags used across the driver boundary.
//!
//! Three closed sets are involved when a column is read:
//! - [`OdbcType`]: the logical, provider-neutral type of a column.
//! - [`SqlType`]: the wire type a driver reports for a column.
//! - [`CDataType`]: the transfer type requested when the driver copies a
//!   value into the scratch buffer.

use std::fmt;

use crate::driver::constants::*;
use crate::error::{Error, Result};

/// Logical column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OdbcType {
    BigInt,
    Binary,
    Bit,
    Char,
    DateTime,
    Date,
    Time,
    Decimal,
    Double,
    Image,
    Int,
    NChar,
    NText,
    Numeric,
    NVarChar,
    Real,
    UniqueIdentifier,
    SmallDateTime,
    SmallInt,
    Text,
    Timestamp,
    TinyInt,
    VarBinary,
    VarChar,
    /// SQL Server `sql_variant`.
    Variant,
    /// SQL Server user defined type.
    Udt,
    /// SQL Server `xml`.
    Xml,
}

impl OdbcType {
    /// Every logical type, in registry order.
    pub const ALL: [OdbcType; 27] = [
        OdbcType::BigInt,
        OdbcType::Binary,
        OdbcType::Bit,
        OdbcType::Char,
        OdbcType::DateTime,
        OdbcType::Date,
        OdbcType::Time,
        OdbcType::Decimal,
        OdbcType::Double,
        OdbcType::Image,
        OdbcType::Int,
        OdbcType::NChar,
        OdbcType::NText,
        OdbcType::Numeric,
        OdbcType::NVarChar,
        OdbcType::Real,
        OdbcType::UniqueIdentifier,
        OdbcType::SmallDateTime,
        OdbcType::SmallInt,
        OdbcType::Text,
        OdbcType::Timestamp,
        OdbcType::TinyInt,
        OdbcType::VarBinary,
        OdbcType::VarChar,
        OdbcType::Variant,
        OdbcType::Udt,
        OdbcType::Xml,
    ];

    /// Position in [`OdbcType::ALL`].
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for OdbcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Wire type reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Char,
    Numeric,
    Decimal,
    Integer,
    SmallInt,
    Float,
    Real,
    Double,
    /// ODBC 2.x timestamp code.
    Timestamp,
    VarChar,
    TypeDate,
    TypeTime,
    TypeTimestamp,
    LongVarChar,
    Binary,
    VarBinary,
    LongVarBinary,
    BigInt,
    TinyInt,
    Bit,
    WChar,
    WVarChar,
    WLongVarChar,
    Guid,
    SsVariant,
    SsUdt,
    SsXml,
}

impl SqlType {
    /// Create from a raw type code.
    ///
    /// Returns `Err(Error::UnsupportedType)` for codes outside the registry.
    pub fn from_raw(raw: i16) -> Result<Self> {
        let sql_type = match raw {
            SQL_CHAR => SqlType::Char,
            SQL_NUMERIC => SqlType::Numeric,
            SQL_DECIMAL => SqlType::Decimal,
            SQL_INTEGER => SqlType::Integer,
            SQL_SMALLINT => SqlType::SmallInt,
            SQL_FLOAT => SqlType::Float,
            SQL_REAL => SqlType::Real,
            SQL_DOUBLE => SqlType::Double,
            SQL_TIMESTAMP => SqlType::Timestamp,
            SQL_VARCHAR => SqlType::VarChar,
            SQL_TYPE_DATE => SqlType::TypeDate,
            SQL_TYPE_TIME => SqlType::TypeTime,
            SQL_TYPE_TIMESTAMP => SqlType::TypeTimestamp,
            SQL_LONGVARCHAR => SqlType::LongVarChar,
            SQL_BINARY => SqlType::Binary,
            SQL_VARBINARY => SqlType::VarBinary,
            SQL_LONGVARBINARY => SqlType::LongVarBinary,
            SQL_BIGINT => SqlType::BigInt,
            SQL_TINYINT => SqlType::TinyInt,
            SQL_BIT => SqlType::Bit,
            SQL_WCHAR => SqlType::WChar,
            SQL_WVARCHAR => SqlType::WVarChar,
            SQL_WLONGVARCHAR => SqlType::WLongVarChar,
            SQL_GUID => SqlType::Guid,
            SQL_SS_VARIANT => SqlType::SsVariant,
            SQL_SS_UDT => SqlType::SsUdt,
            SQL_SS_XML => SqlType::SsXml,
            _ => return Err(Error::UnsupportedType { sql_type: raw }),
        };
        Ok(sql_type)
    }

    /// Raw type code.
    pub fn raw(self) -> i16 {
        match self {
            SqlType::Char => SQL_CHAR,
            SqlType::Numeric => SQL_NUMERIC,
            SqlType::Decimal => SQL_DECIMAL,
            SqlType::Integer => SQL_INTEGER,
            SqlType::SmallInt => SQL_SMALLINT,
            SqlType::Float => SQL_FLOAT,
            SqlType::Real => SQL_REAL,
            SqlType::Double => SQL_DOUBLE,
            SqlType::Timestamp => SQL_TIMESTAMP,
            SqlType::VarChar => SQL_VARCHAR,
            SqlType::TypeDate => SQL_TYPE_DATE,
            SqlType::TypeTime => SQL_TYPE_TIME,
            SqlType::TypeTimestamp => SQL_TYPE_TIMESTAMP,
            SqlType::LongVarChar => SQL_LONGVARCHAR,
            SqlType::Binary => SQL_BINARY,
            SqlType::VarBinary => SQL_VARBINARY,
            SqlType::LongVarBinary => SQL_LONGVARBINARY,
            SqlType::BigInt => SQL_BIGINT,
            SqlType::TinyInt => SQL_TINYINT,
            SqlType::Bit => SQL_BIT,
            SqlType::WChar => SQL_WCHAR,
            SqlType::WVarChar => SQL_WVARCHAR,
            SqlType::WLongVarChar => SQL_WLONGVARCHAR,
            SqlType::Guid => SQL_GUID,
            SqlType::SsVariant => SQL_SS_VARIANT,
            SqlType::SsUdt => SQL_SS_UDT,
            SqlType::SsXml => SQL_SS_XML,
        }
    }

    /// Wide character types report octet lengths twice their character count.
    pub fn is_wide(self) -> bool {
        matches!(
            self,
            SqlType::WChar | SqlType::WVarChar | SqlType::WLongVarChar
        )
    }

    /// Long (unbounded) data types.
    pub fn is_long(self) -> bool {
        matches!(
            self,
            SqlType::LongVarChar | SqlType::WLongVarChar | SqlType::LongVarBinary
        )
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.raw())
    }
}

/// Transfer type requested from the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CDataType {
    Char,
    WChar,
    SLong,
    SShort,
    Real,
    Double,
    Bit,
    UTinyInt,
    SBigInt,
    Binary,
    TypeDate,
    TypeTime,
    TypeTimestamp,
    Numeric,
    Guid,
}

impl CDataType {
    /// Raw type code.
    pub fn raw(self) -> i16 {
        match self {
            CDataType::Char => SQL_C_CHAR,
            CDataType::WChar => SQL_C_WCHAR,
            CDataType::SLong => SQL_C_SLONG,
            CDataType::SShort => SQL_C_SSHORT,
            CDataType::Real => SQL_C_REAL,
            CDataType::Double => SQL_C_DOUBLE,
            CDataType::Bit => SQL_C_BIT,
            CDataType::UTinyInt => SQL_C_UTINYINT,
            CDataType::SBigInt => SQL_C_SBIGINT,
            CDataType::Binary => SQL_C_BINARY,
            CDataType::TypeDate => SQL_C_TYPE_DATE,
            CDataType::TypeTime => SQL_C_TYPE_TIME,
            CDataType::TypeTimestamp => SQL_C_TYPE_TIMESTAMP,
            CDataType::Numeric => SQL_C_NUMERIC,
            CDataType::Guid => SQL_C_GUID,
        }
    }

    /// Size of a value of this transfer type, `None` for variable-length.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            CDataType::Char | CDataType::WChar | CDataType::Binary => None,
            CDataType::Bit | CDataType::UTinyInt => Some(1),
            CDataType::SShort => Some(2),
            CDataType::SLong | CDataType::Real => Some(4),
            CDataType::Double | CDataType::SBigInt => Some(8),
            CDataType::TypeDate | CDataType::TypeTime => Some(6),
            CDataType::TypeTimestamp | CDataType::Guid => Some(16),
            CDataType::Numeric => Some(19),
        }
    }

    /// Variable-length types are retrieved in chunks.
    pub fn is_variable(self) -> bool {
        self.fixed_width().is_none()
    }

    /// Bytes of terminator the driver appends to each chunk.
    pub fn terminator_len(self) -> usize {
        match self {
            CDataType::WChar => 2,
            CDataType::Char => 1,
            _ => 0,
        }
    }
}
