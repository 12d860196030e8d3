//! Type registry mapping logical types to fetch parameters.
//!
//! The registry is an immutable table built once and shared by reference
//! (usually through an `Arc`) between every reader that uses it.

use crate::error::Result;

use super::odbc_type::{CDataType, OdbcType, SqlType};

/// How the value of a column is materialized.
///
/// Matched once when a value is decoded; each variant knows the transfer
/// type it asks the driver for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    Text,
    Binary,
    /// Exact numerics arrive as text to preserve precision.
    Decimal,
    TinyInt,
    SmallInt,
    Int,
    /// 64-bit integers arrive as text.
    BigInt,
    Real,
    Double,
    Bit,
    Date,
    Time,
    Timestamp,
    Guid,
    /// Value whose wire type is only known per row.
    Variant,
}

impl Decoder {
    /// Transfer type requested from the driver.
    pub fn transfer_type(self) -> CDataType {
        match self {
            Decoder::Text | Decoder::Decimal | Decoder::BigInt => CDataType::WChar,
            Decoder::Binary | Decoder::Variant => CDataType::Binary,
            Decoder::TinyInt => CDataType::UTinyInt,
            Decoder::SmallInt => CDataType::SShort,
            Decoder::Int => CDataType::SLong,
            Decoder::Real => CDataType::Real,
            Decoder::Double => CDataType::Double,
            Decoder::Bit => CDataType::Bit,
            Decoder::Date => CDataType::TypeDate,
            Decoder::Time => CDataType::TypeTime,
            Decoder::Timestamp => CDataType::TypeTimestamp,
            Decoder::Guid => CDataType::Guid,
        }
    }
}

/// Fetch parameters for one logical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMapping {
    /// Logical type.
    pub odbc_type: OdbcType,
    /// Wire type reported for columns of this type.
    pub sql_type: SqlType,
    /// Transfer type used when reading.
    pub c_type: CDataType,
    /// Transfer type used when binding parameters.
    pub param_c_type: CDataType,
    /// Fixed byte width, `None` for variable-length types.
    pub buffer_size: Option<usize>,
    /// Display width in characters, `None` for variable-length types.
    pub column_size: Option<u32>,
    /// The driver may report the type as unsigned, which needs a wider
    /// mapping.
    pub sign_ambiguous: bool,
    /// Value decoder.
    pub decoder: Decoder,
}

impl TypeMapping {
    /// Whether values of this type are read in a single fixed-size call.
    pub fn is_fixed(&self) -> bool {
        self.buffer_size.is_some()
    }
}

#[allow(clippy::too_many_arguments)]
const fn mapping(
    odbc_type: OdbcType,
    sql_type: SqlType,
    c_type: CDataType,
    param_c_type: CDataType,
    buffer_size: Option<usize>,
    column_size: Option<u32>,
    sign_ambiguous: bool,
    decoder: Decoder,
) -> TypeMapping {
    TypeMapping {
        odbc_type,
        sql_type,
        c_type,
        param_c_type,
        buffer_size,
        column_size,
        sign_ambiguous,
        decoder,
    }
}

fn standard_mapping(odbc_type: OdbcType) -> TypeMapping {
    use CDataType as C;
    use OdbcType as T;
    use SqlType as S;

    match odbc_type {
        T::BigInt => mapping(T::BigInt, S::BigInt, C::SBigInt, C::SBigInt, Some(8), Some(20), true, Decoder::BigInt),
        T::Binary => mapping(T::Binary, S::Binary, C::Binary, C::Binary, None, None, false, Decoder::Binary),
        T::Bit => mapping(T::Bit, S::Bit, C::Bit, C::Bit, Some(1), Some(1), false, Decoder::Bit),
        T::Char => mapping(T::Char, S::Char, C::WChar, C::Char, None, None, false, Decoder::Text),
        T::DateTime => mapping(T::DateTime, S::TypeTimestamp, C::TypeTimestamp, C::TypeTimestamp, Some(16), Some(23), false, Decoder::Timestamp),
        T::Date => mapping(T::Date, S::TypeDate, C::TypeDate, C::TypeDate, Some(6), Some(10), false, Decoder::Date),
        T::Time => mapping(T::Time, S::TypeTime, C::TypeTime, C::TypeTime, Some(6), Some(12), false, Decoder::Time),
        T::Decimal => mapping(T::Decimal, S::Decimal, C::Numeric, C::Numeric, Some(19), Some(28), false, Decoder::Decimal),
        T::Double => mapping(T::Double, S::Double, C::Double, C::Double, Some(8), Some(15), false, Decoder::Double),
        T::Image => mapping(T::Image, S::LongVarBinary, C::Binary, C::Binary, None, None, false, Decoder::Binary),
        T::Int => mapping(T::Int, S::Integer, C::SLong, C::SLong, Some(4), Some(10), true, Decoder::Int),
        T::NChar => mapping(T::NChar, S::WChar, C::WChar, C::WChar, None, None, false, Decoder::Text),
        T::NText => mapping(T::NText, S::WLongVarChar, C::WChar, C::WChar, None, None, false, Decoder::Text),
        T::Numeric => mapping(T::Numeric, S::Numeric, C::Numeric, C::Numeric, Some(19), Some(28), false, Decoder::Decimal),
        T::NVarChar => mapping(T::NVarChar, S::WVarChar, C::WChar, C::WChar, None, None, false, Decoder::Text),
        T::Real => mapping(T::Real, S::Real, C::Real, C::Real, Some(4), Some(7), false, Decoder::Real),
        T::UniqueIdentifier => mapping(T::UniqueIdentifier, S::Guid, C::Guid, C::Guid, Some(16), Some(36), false, Decoder::Guid),
        T::SmallDateTime => mapping(T::SmallDateTime, S::TypeTimestamp, C::TypeTimestamp, C::TypeTimestamp, Some(16), Some(23), false, Decoder::Timestamp),
        T::SmallInt => mapping(T::SmallInt, S::SmallInt, C::SShort, C::SShort, Some(2), Some(5), true, Decoder::SmallInt),
        T::Text => mapping(T::Text, S::LongVarChar, C::WChar, C::Char, None, None, false, Decoder::Text),
        // rowversion: an opaque binary stamp
        T::Timestamp => mapping(T::Timestamp, S::Binary, C::Binary, C::Binary, None, None, false, Decoder::Binary),
        T::TinyInt => mapping(T::TinyInt, S::TinyInt, C::UTinyInt, C::UTinyInt, Some(1), Some(3), true, Decoder::TinyInt),
        T::VarBinary => mapping(T::VarBinary, S::VarBinary, C::Binary, C::Binary, None, None, false, Decoder::Binary),
        T::VarChar => mapping(T::VarChar, S::VarChar, C::WChar, C::Char, None, None, false, Decoder::Text),
        T::Variant => mapping(T::Variant, S::SsVariant, C::Binary, C::Binary, None, None, false, Decoder::Variant),
        T::Udt => mapping(T::Udt, S::SsUdt, C::Binary, C::Binary, None, None, false, Decoder::Binary),
        T::Xml => mapping(T::Xml, S::SsXml, C::WChar, C::WChar, None, None, false, Decoder::Text),
    }
}

/// Immutable registry of [`TypeMapping`]s.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    mappings: Vec<TypeMapping>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Build the standard registry.
    pub fn new() -> Self {
        Self {
            mappings: OdbcType::ALL.iter().map(|t| standard_mapping(*t)).collect(),
        }
    }

    /// Mapping for a logical type.
    pub fn resolve(&self, odbc_type: OdbcType) -> &TypeMapping {
        &self.mappings[odbc_type.index()]
    }

    /// Mapping for a wire type.
    pub fn resolve_from_wire(&self, sql_type: SqlType) -> &TypeMapping {
        let odbc_type = match sql_type {
            SqlType::Char => OdbcType::Char,
            SqlType::Numeric => OdbcType::Numeric,
            SqlType::Decimal => OdbcType::Decimal,
            SqlType::Integer => OdbcType::Int,
            SqlType::SmallInt => OdbcType::SmallInt,
            SqlType::Float | SqlType::Double => OdbcType::Double,
            SqlType::Real => OdbcType::Real,
            SqlType::Timestamp | SqlType::TypeTimestamp => OdbcType::DateTime,
            SqlType::VarChar => OdbcType::VarChar,
            SqlType::TypeDate => OdbcType::Date,
            SqlType::TypeTime => OdbcType::Time,
            SqlType::LongVarChar => OdbcType::Text,
            SqlType::Binary => OdbcType::Binary,
            SqlType::VarBinary => OdbcType::VarBinary,
            SqlType::LongVarBinary => OdbcType::Image,
            SqlType::BigInt => OdbcType::BigInt,
            SqlType::TinyInt => OdbcType::TinyInt,
            SqlType::Bit => OdbcType::Bit,
            SqlType::WChar => OdbcType::NChar,
            SqlType::WVarChar => OdbcType::NVarChar,
            SqlType::WLongVarChar => OdbcType::NText,
            SqlType::Guid => OdbcType::UniqueIdentifier,
            SqlType::SsVariant => OdbcType::Variant,
            SqlType::SsUdt => OdbcType::Udt,
            SqlType::SsXml => OdbcType::Xml,
        };
        self.resolve(odbc_type)
    }

    /// Mapping for a raw wire type code.
    ///
    /// Returns `Err(Error::UnsupportedType)` for unknown codes.
    pub fn resolve_raw(&self, raw: i16) -> Result<&TypeMapping> {
        Ok(self.resolve_from_wire(SqlType::from_raw(raw)?))
    }

    /// Widen a sign-ambiguous mapping so the top bit is never misread.
    ///
    /// Unsigned values move one size up (the unsigned 64-bit case to the
    /// decimal mapping); a signed tiny integer moves to the 16-bit mapping
    /// because the 8-bit transfer type is unsigned.
    pub fn promote(&self, mapping: &TypeMapping, is_unsigned: bool) -> &TypeMapping {
        let promoted = match (mapping.odbc_type, is_unsigned) {
            (OdbcType::BigInt, true) => OdbcType::Decimal,
            (OdbcType::Int, true) => OdbcType::BigInt,
            (OdbcType::SmallInt, true) => OdbcType::Int,
            (OdbcType::TinyInt, false) => OdbcType::SmallInt,
            (other, _) => other,
        };
        self.resolve(promoted)
    }
}
