//! Value decoders for data copied into the scratch buffer.
//!
//! ## Currently Supported
//!
//! | Transfer type | Decoder |
//! |---------------|---------|
//! | `SQL_C_BIT`, `SQL_C_UTINYINT`, `SQL_C_SSHORT`, `SQL_C_SLONG` | [`decode_fixed`] |
//! | `SQL_C_REAL`, `SQL_C_DOUBLE`, `SQL_C_GUID` | [`decode_fixed`] |
//! | `SQL_C_TYPE_DATE`, `SQL_C_TYPE_TIME`, `SQL_C_TYPE_TIMESTAMP` | `datetime` |
//! | Decimal and BIGINT text | `number` |
//!
//! Wide text and binary values are assembled by the chunk reader and need
//! no dedicated decoder.

mod datetime;
mod number;

pub use datetime::{decode_date, decode_time, decode_timestamp};
pub use number::{parse_bigint, parse_decimal};

use crate::error::{Error, Result};
use crate::protocol::buffer::ScratchBuffer;
use crate::protocol::types::{Decoder, Guid, OdbcValue};

/// Decode a fixed-size value fetched into `buffer`.
pub fn decode_fixed(decoder: Decoder, buffer: &ScratchBuffer) -> Result<OdbcValue> {
    let value = match decoder {
        Decoder::Bit => OdbcValue::Bool(buffer.read_u8(0)? != 0),
        Decoder::TinyInt => OdbcValue::TinyInt(buffer.read_u8(0)?),
        Decoder::SmallInt => OdbcValue::SmallInt(buffer.read_i16_le(0)?),
        Decoder::Int => OdbcValue::Int(buffer.read_i32_le(0)?),
        Decoder::Real => OdbcValue::Real(buffer.read_f32_le(0)?),
        Decoder::Double => OdbcValue::Double(buffer.read_f64_le(0)?),
        Decoder::Guid => OdbcValue::Guid(Guid::from_bytes_le(buffer.read_array(0)?)),
        Decoder::Date => OdbcValue::Date(decode_date(buffer.bytes(0, 6)?)?),
        Decoder::Time => OdbcValue::Time(decode_time(buffer.bytes(0, 6)?)?),
        Decoder::Timestamp => OdbcValue::Timestamp(decode_timestamp(buffer.bytes(0, 16)?)?),
        Decoder::Text | Decoder::Binary | Decoder::Decimal | Decoder::BigInt | Decoder::Variant => {
            return Err(Error::cast(format!(
                "{:?} values are not fixed-size",
                decoder
            )))
        }
    };
    Ok(value)
}
