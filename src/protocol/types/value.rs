//! Decoded column values.

use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

/// A 128-bit identifier in the layout drivers use for `SQL_GUID`.
///
/// The first three groups are stored little-endian, the last eight bytes
/// as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    /// Decode from the 16-byte `SQLGUID` layout.
    pub fn from_bytes_le(bytes: [u8; 16]) -> Self {
        let mut data4 = [0u8; 8];
        data4.copy_from_slice(&bytes[8..]);
        Self {
            data1: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            data2: u16::from_le_bytes([bytes[4], bytes[5]]),
            data3: u16::from_le_bytes([bytes[6], bytes[7]]),
            data4,
        }
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-",
            self.data1, self.data2, self.data3, self.data4[0], self.data4[1]
        )?;
        for b in &self.data4[2..] {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// A single decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum OdbcValue {
    /// NULL value.
    Null,
    Bool(bool),
    TinyInt(u8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Real(f32),
    Double(f64),
    /// Exact numeric as normalized text (preserves precision).
    Decimal(String),
    Text(String),
    Binary(Bytes),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Guid(Guid),
}

impl OdbcValue {
    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, OdbcValue::Null)
    }

    /// Name of the variant, used in cast error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            OdbcValue::Null => "NULL",
            OdbcValue::Bool(_) => "bool",
            OdbcValue::TinyInt(_) => "u8",
            OdbcValue::SmallInt(_) => "i16",
            OdbcValue::Int(_) => "i32",
            OdbcValue::BigInt(_) => "i64",
            OdbcValue::Real(_) => "f32",
            OdbcValue::Double(_) => "f64",
            OdbcValue::Decimal(_) => "decimal",
            OdbcValue::Text(_) => "string",
            OdbcValue::Binary(_) => "bytes",
            OdbcValue::Date(_) => "date",
            OdbcValue::Time(_) => "time",
            OdbcValue::Timestamp(_) => "timestamp",
            OdbcValue::Guid(_) => "guid",
        }
    }

    /// Try to get the value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OdbcValue::Text(s) | OdbcValue::Decimal(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the value as raw bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            OdbcValue::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Try to convert an integral or decimal value to i64.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            OdbcValue::Bool(b) => Some(i64::from(*b)),
            OdbcValue::TinyInt(v) => Some(i64::from(*v)),
            OdbcValue::SmallInt(v) => Some(i64::from(*v)),
            OdbcValue::Int(v) => Some(i64::from(*v)),
            OdbcValue::BigInt(v) => Some(*v),
            OdbcValue::Decimal(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to convert a numeric value to f64.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            OdbcValue::Real(v) => Some(f64::from(*v)),
            OdbcValue::Double(v) => Some(*v),
            OdbcValue::Decimal(s) => s.parse().ok(),
            other => other.to_i64().map(|v| v as f64),
        }
    }

    /// Try to get the value as a NaiveDateTime. Dates widen to midnight.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            OdbcValue::Timestamp(ts) => Some(*ts),
            OdbcValue::Date(d) => d.and_hms_opt(0, 0, 0),
            _ => None,
        }
    }
}

impl fmt::Display for OdbcValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OdbcValue::Null => write!(f, "NULL"),
            OdbcValue::Bool(b) => write!(f, "{}", b),
            OdbcValue::TinyInt(v) => write!(f, "{}", v),
            OdbcValue::SmallInt(v) => write!(f, "{}", v),
            OdbcValue::Int(v) => write!(f, "{}", v),
            OdbcValue::BigInt(v) => write!(f, "{}", v),
            OdbcValue::Real(v) => write!(f, "{}", v),
            OdbcValue::Double(v) => write!(f, "{}", v),
            OdbcValue::Decimal(s) | OdbcValue::Text(s) => write!(f, "{}", s),
            OdbcValue::Binary(b) => write!(f, "<BINARY: {} bytes>", b.len()),
            OdbcValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            OdbcValue::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            OdbcValue::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
            OdbcValue::Guid(g) => write!(f, "{}", g),
        }
    }
}
