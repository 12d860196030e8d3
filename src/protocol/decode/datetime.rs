//! Date and time struct decoders.
//!
//! The driver writes the ODBC structs in native (little-endian) layout:
//! - `SQL_DATE_STRUCT`: year `i16`, month `u16`, day `u16` (6 bytes)
//! - `SQL_TIME_STRUCT`: hour `u16`, minute `u16`, second `u16` (6 bytes)
//! - `SQL_TIMESTAMP_STRUCT`: date and time fields followed by a `u32`
//!   fraction in nanoseconds (16 bytes)

use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

fn field(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn expect_len(data: &[u8], len: usize, what: &str) -> Result<()> {
    if data.len() != len {
        return Err(Error::type_conversion(format!(
            "{} value must be exactly {} bytes, got {}",
            what,
            len,
            data.len()
        )));
    }
    Ok(())
}

/// Decode a `SQL_DATE_STRUCT`.
///
/// # Errors
/// Returns `Error::TypeConversion` if data is not exactly 6 bytes or names
/// a day that does not exist.
pub fn decode_date(data: &[u8]) -> Result<NaiveDate> {
    expect_len(data, 6, "DATE")?;
    let year = i16::from_le_bytes([data[0], data[1]]);
    let month = field(data, 2);
    let day = field(data, 4);
    NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day)).ok_or_else(|| {
        Error::type_conversion(format!(
            "Invalid DATE: year={}, month={}, day={}",
            year, month, day
        ))
    })
}

/// Decode a `SQL_TIME_STRUCT`.
pub fn decode_time(data: &[u8]) -> Result<NaiveTime> {
    expect_len(data, 6, "TIME")?;
    time_of_day(field(data, 0), field(data, 2), field(data, 4), 0)
}

/// Decode a `SQL_TIMESTAMP_STRUCT`.
pub fn decode_timestamp(data: &[u8]) -> Result<NaiveDateTime> {
    expect_len(data, 16, "TIMESTAMP")?;
    let date = decode_date(&data[..6])?;
    let fraction = u32::from_le_bytes([data[12], data[13], data[14], data[15]]);
    let time = time_of_day(field(data, 6), field(data, 8), field(data, 10), fraction)?;
    Ok(NaiveDateTime::new(date, time))
}

fn time_of_day(hour: u16, minute: u16, second: u16, nanos: u32) -> Result<NaiveTime> {
    NaiveTime::from_hms_nano_opt(u32::from(hour), u32::from(minute), u32::from(second), nanos)
        .ok_or_else(|| {
            Error::type_conversion(format!(
                "Invalid TIME: hour={}, minute={}, second={}, fraction={}",
                hour, minute, second, nanos
            ))
        })
}
