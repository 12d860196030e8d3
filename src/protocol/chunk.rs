//! Chunked retrieval of variable-length values.
//!
//! Values longer than the scratch buffer arrive over several native calls.
//! [`materialize`] collects a whole value; [`stream_window`] moves exactly a
//! requested window into a caller buffer (or skips it) without keeping the
//! rest of the value around.

use crate::driver::Statement;
use crate::error::{Error, Result};
use crate::protocol::buffer::{FetchOutcome, ScratchBuffer};
use crate::protocol::types::CDataType;

/// Variable-length transfer flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// UTF-16 text, counted in code units.
    Text,
    /// Raw bytes.
    Binary,
}

impl VarKind {
    /// Transfer type requested from the driver.
    pub fn c_type(self) -> CDataType {
        match self {
            VarKind::Text => CDataType::WChar,
            VarKind::Binary => CDataType::Binary,
        }
    }

    /// Bytes per counted unit.
    pub fn unit(self) -> usize {
        match self {
            VarKind::Text => 2,
            VarKind::Binary => 1,
        }
    }
}

/// Read the rest of a variable-length value.
///
/// Returns `None` if the value is NULL. The loop stops when the driver
/// completes the value or stops producing bytes, so the number of calls is
/// bounded by `ceil(len / max_payload) + 1`.
pub fn materialize<S: Statement + ?Sized>(
    buffer: &mut ScratchBuffer,
    stmt: &mut S,
    column: usize,
    kind: VarKind,
) -> Result<Option<Vec<u8>>> {
    let request = buffer.max_request();
    let mut out = Vec::new();
    let mut chunks = 0usize;
    loop {
        let outcome = buffer.fetch(stmt, column, kind.c_type(), request)?;
        chunks += 1;
        match outcome {
            FetchOutcome::Null if chunks == 1 => return Ok(None),
            FetchOutcome::Null => break,
            FetchOutcome::Complete(n) => {
                out.extend_from_slice(buffer.bytes(0, n)?);
                break;
            }
            FetchOutcome::Partial { fetched, available } => {
                if fetched == 0 {
                    break;
                }
                if let Some(total) = available {
                    out.reserve(total);
                }
                out.extend_from_slice(buffer.bytes(0, fetched)?);
            }
        }
    }
    tracing::trace!(column, ?kind, chunks, len = out.len(), "materialized value");
    Ok(Some(out))
}

/// Destination of a streamed window.
pub enum Sink<'a> {
    /// Drop the data (forward skip).
    Discard,
    Bytes(&'a mut [u8]),
    /// UTF-16 code units.
    Units(&'a mut [u16]),
}

impl Sink<'_> {
    fn write(&mut self, at_unit: usize, bytes: &[u8]) {
        match self {
            Sink::Discard => {}
            Sink::Bytes(dest) => dest[at_unit..at_unit + bytes.len()].copy_from_slice(bytes),
            Sink::Units(dest) => {
                for (slot, pair) in dest[at_unit..].iter_mut().zip(bytes.chunks_exact(2)) {
                    *slot = u16::from_le_bytes([pair[0], pair[1]]);
                }
            }
        }
    }
}

/// Stream up to `units` units of the current value into `sink`.
///
/// Returns the number of units delivered, which is smaller than requested
/// only when the value ends first. A NULL value is a cast error: the caller
/// asked for data that does not exist.
pub fn stream_window<S: Statement + ?Sized>(
    buffer: &mut ScratchBuffer,
    stmt: &mut S,
    column: usize,
    kind: VarKind,
    mut sink: Sink<'_>,
    units: usize,
) -> Result<usize> {
    let c_type = kind.c_type();
    let mut remaining = units
        .checked_mul(kind.unit())
        .ok_or(Error::out_of_range("length", units as i64))?;
    let mut delivered = 0usize;
    while remaining > 0 {
        let payload = remaining.min(buffer.max_payload(c_type));
        let request = payload + c_type.terminator_len();
        let (read, done) = match buffer.fetch(stmt, column, c_type, request)? {
            FetchOutcome::Null => {
                return Err(Error::cast(format!("column {} is NULL", column)));
            }
            FetchOutcome::Complete(n) => (n, true),
            FetchOutcome::Partial { fetched, .. } => (fetched, false),
        };
        if read == 0 {
            break;
        }
        sink.write(delivered, buffer.bytes(0, read)?);
        delivered += read / kind.unit();
        remaining -= read;
        if done {
            break;
        }
    }
    Ok(delivered)
}
