//! Scratch buffer shared by every column fetch of a reader.
//!
//! The driver copies column data into one owned region. A fetch never asks
//! for the whole region: [`RESERVED_HEADROOM`] bytes stay free so the driver
//! has room for terminators without reallocating. All reads of fetched data
//! are bounds-checked against the bytes the last fetch actually produced.

use crate::driver::{Indicator, RetCode, Statement};
use crate::error::{Error, Result};
use crate::protocol::types::CDataType;
use bytes::BytesMut;

/// Bytes at the end of the buffer that are never offered to the driver.
pub const RESERVED_HEADROOM: usize = 2;

/// Smallest capacity accepted for a scratch buffer.
pub const MIN_CAPACITY: usize = 64;

/// Result of one native column fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The value is NULL.
    Null,
    /// The rest of the value fit; `n` payload bytes are in the buffer.
    ///
    /// A column that was already drained completes with zero bytes.
    Complete(usize),
    /// The buffer was filled and more data remains.
    Partial {
        /// Payload bytes in the buffer.
        fetched: usize,
        /// Bytes that were available before this call, if the driver knew.
        available: Option<usize>,
    },
}

impl FetchOutcome {
    /// Payload bytes produced by this fetch.
    pub fn fetched(&self) -> usize {
        match self {
            FetchOutcome::Null => 0,
            FetchOutcome::Complete(n) => *n,
            FetchOutcome::Partial { fetched, .. } => *fetched,
        }
    }
}

/// Payload bytes that fit in a request of `request` bytes.
///
/// Wide text keeps whole code units and leaves room for the terminator.
pub fn payload_capacity(c_type: CDataType, request: usize) -> usize {
    match c_type.terminator_len() {
        0 => request,
        term => {
            let payload = request.saturating_sub(term);
            if c_type == CDataType::WChar {
                payload & !1
            } else {
                payload
            }
        }
    }
}

/// Owned, reusable region for native column fetches.
pub struct ScratchBuffer {
    data: BytesMut,
    filled: usize,
}

impl ScratchBuffer {
    /// Create a buffer of `capacity` bytes.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity < MIN_CAPACITY {
            return Err(Error::out_of_range("buffer_capacity", capacity as i64));
        }
        Ok(Self {
            data: BytesMut::zeroed(capacity),
            filled: 0,
        })
    }

    /// Total size of the region.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Largest request length handed to the driver.
    pub fn max_request(&self) -> usize {
        self.capacity() - RESERVED_HEADROOM
    }

    /// Largest payload a single fetch of `c_type` can produce.
    pub fn max_payload(&self, c_type: CDataType) -> usize {
        payload_capacity(c_type, self.max_request())
    }

    /// Payload bytes produced by the last fetch.
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Fetch (part of) a column into the buffer.
    ///
    /// `column` is the zero-based ordinal. `request` is the buffer length
    /// offered to the driver, terminator included. A `NoData` reply ends a
    /// variable-length transfer and is fatal for fixed-length types.
    #[track_caller]
    pub fn fetch<S: Statement + ?Sized>(
        &mut self,
        stmt: &mut S,
        column: usize,
        c_type: CDataType,
        request: usize,
    ) -> Result<FetchOutcome> {
        if request > self.max_request() {
            return Err(Error::BufferTooSmall {
                needed: request,
                available: self.max_request(),
                location: std::panic::Location::caller(),
            });
        }
        let column_number = u16::try_from(column + 1)
            .map_err(|_| Error::out_of_range("column", column as i64))?;

        self.filled = 0;
        let (rc, indicator) = stmt.get_data(column_number, c_type, &mut self.data[..request]);
        match rc {
            RetCode::Success | RetCode::SuccessWithInfo => {}
            RetCode::NoData if c_type.is_variable() => {
                tracing::trace!(column, ?c_type, "column drained");
                return Ok(FetchOutcome::Complete(0));
            }
            RetCode::NoData | RetCode::Error | RetCode::InvalidHandle => {
                return Err(Error::driver(rc, stmt.diagnostics()));
            }
        }

        let outcome = match (indicator, c_type.fixed_width()) {
            (Indicator::Null, _) => FetchOutcome::Null,
            (Indicator::Length(n), Some(width)) => FetchOutcome::Complete(n.min(width).min(request)),
            (Indicator::NoTotal, Some(width)) => FetchOutcome::Complete(width.min(request)),
            (Indicator::Length(n), None) => {
                let capacity = payload_capacity(c_type, request);
                if n > capacity {
                    FetchOutcome::Partial {
                        fetched: capacity,
                        available: Some(n),
                    }
                } else {
                    FetchOutcome::Complete(n)
                }
            }
            (Indicator::NoTotal, None) => FetchOutcome::Partial {
                fetched: payload_capacity(c_type, request),
                available: None,
            },
        };
        self.filled = outcome.fetched();
        tracing::trace!(column, ?c_type, request, ?outcome, "column fetch");
        Ok(outcome)
    }

    /// Fetched bytes `offset..offset + n`.
    #[track_caller]
    pub fn bytes(&self, offset: usize, n: usize) -> Result<&[u8]> {
        let end = offset.checked_add(n).filter(|end| *end <= self.filled);
        match end {
            Some(end) => Ok(&self.data[offset..end]),
            None => Err(Error::BufferTooSmall {
                needed: n,
                available: self.filled.saturating_sub(offset),
                location: std::panic::Location::caller(),
            }),
        }
    }

    /// Fetched bytes as a fixed-size array.
    #[track_caller]
    pub fn read_array<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(offset, N)?);
        Ok(out)
    }

    /// Read a single byte.
    #[track_caller]
    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        Ok(self.read_array::<1>(offset)?[0])
    }

    /// Read a little-endian i16.
    #[track_caller]
    pub fn read_i16_le(&self, offset: usize) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_array(offset)?))
    }

    /// Read a little-endian i32.
    #[track_caller]
    pub fn read_i32_le(&self, offset: usize) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array(offset)?))
    }

    /// Read a little-endian f32.
    #[track_caller]
    pub fn read_f32_le(&self, offset: usize) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array(offset)?))
    }

    /// Read a little-endian f64.
    #[track_caller]
    pub fn read_f64_le(&self, offset: usize) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_array(offset)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fixture::{FixtureCell, FixtureColumn, FixtureResult, FixtureStatement};
    use crate::driver::constants::*;

    fn statement(cell: FixtureCell, sql_type: i16) -> FixtureStatement {
        let mut stmt = FixtureStatement::new(vec![
            FixtureResult::new(vec![FixtureColumn::new("c", sql_type)]).row(vec![cell]),
        ]);
        assert_eq!(stmt.fetch(), RetCode::Success);
        stmt
    }

    #[test]
    fn test_new_rejects_tiny_capacity() {
        assert!(ScratchBuffer::new(8).is_err());
        let buf = ScratchBuffer::new(100).unwrap();
        assert_eq!(buf.max_request(), 98);
        assert_eq!(buf.max_payload(CDataType::WChar), 96);
        assert_eq!(buf.max_payload(CDataType::Binary), 98);
    }

    #[test]
    fn test_payload_capacity_keeps_whole_code_units() {
        assert_eq!(payload_capacity(CDataType::WChar, 9), 6);
        assert_eq!(payload_capacity(CDataType::WChar, 2), 0);
        assert_eq!(payload_capacity(CDataType::Char, 9), 8);
        assert_eq!(payload_capacity(CDataType::Binary, 9), 9);
    }

    #[test]
    fn test_fetch_fixed_value() {
        let mut stmt = statement(FixtureCell::int(-42), SQL_INTEGER);
        let mut buf = ScratchBuffer::new(64).unwrap();
        let outcome = buf.fetch(&mut stmt, 0, CDataType::SLong, 4).unwrap();
        assert_eq!(outcome, FetchOutcome::Complete(4));
        assert_eq!(buf.read_i32_le(0).unwrap(), -42);
    }

    #[test]
    fn test_fetch_rejects_oversized_request() {
        let mut stmt = statement(FixtureCell::int(1), SQL_INTEGER);
        let mut buf = ScratchBuffer::new(64).unwrap();
        match buf.fetch(&mut stmt, 0, CDataType::Binary, 64) {
            Err(Error::BufferTooSmall { needed, available, .. }) => {
                assert_eq!(needed, 64);
                assert_eq!(available, 62);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_fetch_partial_then_complete() {
        let payload: Vec<u8> = (0..100u8).collect();
        let mut stmt = statement(FixtureCell::binary(payload.clone()), SQL_VARBINARY);
        let mut buf = ScratchBuffer::new(64).unwrap();

        let first = buf.fetch(&mut stmt, 0, CDataType::Binary, 62).unwrap();
        assert_eq!(first, FetchOutcome::Partial { fetched: 62, available: Some(100) });
        assert_eq!(buf.bytes(0, 62).unwrap(), &payload[..62]);

        let second = buf.fetch(&mut stmt, 0, CDataType::Binary, 62).unwrap();
        assert_eq!(second, FetchOutcome::Complete(38));
        assert_eq!(buf.bytes(0, 38).unwrap(), &payload[62..]);

        // drained columns complete with nothing
        let third = buf.fetch(&mut stmt, 0, CDataType::Binary, 62).unwrap();
        assert_eq!(third, FetchOutcome::Complete(0));
    }

    #[test]
    fn test_fetch_no_data_is_fatal_for_fixed_types() {
        let mut stmt = statement(FixtureCell::int(5), SQL_INTEGER);
        let mut buf = ScratchBuffer::new(64).unwrap();
        buf.fetch(&mut stmt, 0, CDataType::SLong, 4).unwrap();
        match buf.fetch(&mut stmt, 0, CDataType::SLong, 4) {
            Err(Error::Driver { code, .. }) => assert_eq!(code, RetCode::NoData),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_fetch_unknown_total() {
        let mut stmt = statement(FixtureCell::text("abcdefghij"), SQL_WVARCHAR);
        stmt.set_no_total(true);
        let mut buf = ScratchBuffer::new(64).unwrap();
        let outcome = buf.fetch(&mut stmt, 0, CDataType::WChar, 10).unwrap();
        assert_eq!(outcome, FetchOutcome::Partial { fetched: 8, available: None });
        assert_eq!(buf.bytes(0, 8).unwrap(), b"a\0b\0c\0d\0");
    }

    #[test]
    fn test_reads_are_bounded_by_fetched_bytes() {
        let mut stmt = statement(FixtureCell::small_int(3), SQL_SMALLINT);
        let mut buf = ScratchBuffer::new(64).unwrap();
        buf.fetch(&mut stmt, 0, CDataType::SShort, 2).unwrap();
        assert_eq!(buf.read_i16_le(0).unwrap(), 3);
        assert!(matches!(buf.read_i32_le(0), Err(Error::BufferTooSmall { .. })));
    }

    #[test]
    fn test_fetch_null() {
        let mut stmt = statement(FixtureCell::Null, SQL_INTEGER);
        let mut buf = ScratchBuffer::new(64).unwrap();
        assert_eq!(buf.fetch(&mut stmt, 0, CDataType::SLong, 4).unwrap(), FetchOutcome::Null);
        assert_eq!(buf.filled(), 0);
    }
}
