//! Reading single fields of the current row.
//!
//! [`FieldReader`] bundles the pieces a column read touches (the statement,
//! the scratch buffer, the row cache and the sequential transfer state) for
//! the duration of one call. Every native fetch goes through
//! [`FieldReader::get_data`], which checks for cancellation, tracks the
//! current column and records NULLs in the cache as soon as they are seen.

use crate::driver::{DescField, Statement};
use crate::error::{Error, Result};
use crate::options::CancelHandle;
use crate::protocol::buffer::{FetchOutcome, ScratchBuffer};
use crate::protocol::chunk::{materialize, stream_window, Sink, VarKind};
use crate::protocol::decode::{decode_fixed, parse_bigint, parse_decimal};
use crate::protocol::types::{CDataType, Decoder, OdbcValue, RowCache, TypeMapping, TypeRegistry};

/// Length of a field as reported by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLength {
    Null,
    /// The driver could not tell how much data remains.
    Unknown,
    /// Bytes remaining from the current read position.
    Known(u64),
}

/// Progress of a sequential read within the current row.
///
/// Counts the bytes handed out for one column. The count restarts when the
/// reader moves to another column or another row.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChunkTransferState {
    column: Option<usize>,
    delivered: u64,
}

impl ChunkTransferState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all progress. Called on every row advance.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Make `column` the current column.
    pub fn enter(&mut self, column: usize) {
        if self.column != Some(column) {
            self.column = Some(column);
            self.delivered = 0;
        }
    }

    /// Bytes delivered so far for `column`.
    pub fn delivered(&self, column: usize) -> u64 {
        if self.column == Some(column) {
            self.delivered
        } else {
            0
        }
    }

    fn advance(&mut self, bytes: u64) {
        self.delivered += bytes;
    }
}

/// Caller buffer for [`FieldReader::read_window`].
pub enum Dest<'a> {
    Bytes(&'a mut [u8]),
    /// UTF-16 code units.
    Units(&'a mut [u16]),
}

impl<'a> Dest<'a> {
    fn len(&self) -> usize {
        match self {
            Dest::Bytes(d) => d.len(),
            Dest::Units(d) => d.len(),
        }
    }

    fn into_sink(self, start: usize, len: usize) -> Sink<'a> {
        match self {
            Dest::Bytes(d) => Sink::Bytes(&mut d[start..start + len]),
            Dest::Units(d) => Sink::Units(&mut d[start..start + len]),
        }
    }
}

fn copy_window<T: Copy>(src: &[T], data_offset: usize, dest: &mut [T], dest_offset: usize, length: usize) -> usize {
    if length == 0 || data_offset >= src.len() {
        return 0;
    }
    let n = (src.len() - data_offset)
        .min(length)
        .min(dest.len().saturating_sub(dest_offset));
    if n > 0 {
        dest[dest_offset..dest_offset + n].copy_from_slice(&src[data_offset..data_offset + n]);
    }
    n
}

fn non_negative(name: &'static str, value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::out_of_range(name, value))
}

/// Borrowed view over everything one field read needs.
pub(crate) struct FieldReader<'a, S: Statement + ?Sized> {
    pub stmt: &'a mut S,
    pub buffer: &'a mut ScratchBuffer,
    pub cache: &'a mut RowCache,
    pub transfer: &'a mut ChunkTransferState,
    pub registry: &'a TypeRegistry,
    pub cancel: &'a CancelHandle,
}

impl<S: Statement + ?Sized> FieldReader<'_, S> {
    fn check_canceled(&self) -> Result<()> {
        if self.cancel.is_canceled() {
            return Err(Error::Canceled);
        }
        Ok(())
    }

    /// One native fetch of `column`.
    pub fn get_data(&mut self, column: usize, c_type: CDataType, request: usize) -> Result<FetchOutcome> {
        self.check_canceled()?;
        self.transfer.enter(column);
        let outcome = self.buffer.fetch(self.stmt, column, c_type, request)?;
        if outcome == FetchOutcome::Null {
            self.cache.set(column, OdbcValue::Null)?;
        }
        Ok(outcome)
    }

    /// Probe the remaining length of `column` without consuming data.
    pub fn query_field_info(&mut self, column: usize, c_type: CDataType) -> Result<FieldLength> {
        let length = match self.get_data(column, c_type, c_type.terminator_len())? {
            FetchOutcome::Null => FieldLength::Null,
            FetchOutcome::Complete(n) => FieldLength::Known(n as u64),
            FetchOutcome::Partial {
                available: Some(n), ..
            } => FieldLength::Known(n as u64),
            FetchOutcome::Partial { available: None, .. } => FieldLength::Unknown,
        };
        Ok(length)
    }

    fn materialize(&mut self, column: usize, kind: VarKind) -> Result<Option<Vec<u8>>> {
        self.check_canceled()?;
        self.transfer.enter(column);
        let data = materialize(self.buffer, self.stmt, column, kind)?;
        if data.is_none() {
            self.cache.set(column, OdbcValue::Null)?;
        }
        Ok(data)
    }

    /// Read the whole value of `column` as text.
    pub fn read_text(&mut self, column: usize) -> Result<OdbcValue> {
        let Some(bytes) = self.materialize(column, VarKind::Text)? else {
            return Ok(OdbcValue::Null);
        };
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        let text = String::from_utf16(&units)
            .map_err(|e| Error::type_conversion(format!("column {column}: {e}")))?;
        Ok(OdbcValue::Text(text))
    }

    /// Read the whole value of `column` as bytes.
    pub fn read_binary(&mut self, column: usize) -> Result<OdbcValue> {
        Ok(match self.materialize(column, VarKind::Binary)? {
            Some(bytes) => OdbcValue::Binary(bytes.into()),
            None => OdbcValue::Null,
        })
    }

    /// Decode the value of `column` according to `mapping`.
    pub fn decode(&mut self, column: usize, mapping: &TypeMapping) -> Result<OdbcValue> {
        match mapping.decoder {
            Decoder::Text => self.read_text(column),
            Decoder::Binary => self.read_binary(column),
            Decoder::Decimal => match self.read_text(column)? {
                OdbcValue::Text(s) => Ok(OdbcValue::Decimal(parse_decimal(&s)?)),
                other => Ok(other),
            },
            Decoder::BigInt => match self.read_text(column)? {
                OdbcValue::Text(s) => Ok(OdbcValue::BigInt(parse_bigint(&s)?)),
                other => Ok(other),
            },
            Decoder::Variant => self.decode_variant(column),
            fixed => {
                let c_type = fixed.transfer_type();
                let width = c_type.fixed_width().unwrap_or(0);
                match self.get_data(column, c_type, width)? {
                    FetchOutcome::Null => Ok(OdbcValue::Null),
                    _ => decode_fixed(fixed, self.buffer),
                }
            }
        }
    }

    fn decode_variant(&mut self, column: usize) -> Result<OdbcValue> {
        if self.query_field_info(column, CDataType::Binary)? == FieldLength::Null {
            return Ok(OdbcValue::Null);
        }
        let column_number =
            u16::try_from(column + 1).map_err(|_| Error::out_of_range("column", column as i64))?;
        let (rc, attr) = self.stmt.col_attribute(column_number, DescField::SsVariantSqlType);
        if !rc.is_success() {
            return Err(Error::driver(rc, self.stmt.diagnostics()));
        }
        let raw = attr
            .as_i64()
            .and_then(|n| i16::try_from(n).ok())
            .ok_or_else(|| Error::cast(format!("column {column}: variant type is not reported")))?;
        let mapping = *self.registry.resolve_raw(raw)?;
        if mapping.decoder == Decoder::Variant {
            return Err(Error::cast(format!("column {column}: nested variant value")));
        }
        tracing::trace!(column, sql_type = %mapping.sql_type, "variant value");
        self.decode(column, &mapping)
    }

    fn stream(&mut self, column: usize, kind: VarKind, sink: Sink<'_>, units: usize) -> Result<usize> {
        self.check_canceled()?;
        self.transfer.enter(column);
        let delivered = stream_window(self.buffer, self.stmt, column, kind, sink, units)?;
        self.transfer.advance((delivered * kind.unit()) as u64);
        Ok(delivered)
    }

    /// Copy a window of a text or binary value into `dest`.
    ///
    /// Offsets and length are in units of `kind` (bytes or UTF-16 code
    /// units). Without a destination the total (random access) or remaining
    /// (sequential access) length is returned instead.
    #[allow(clippy::too_many_arguments)]
    pub fn read_window(
        &mut self,
        column: usize,
        kind: VarKind,
        data_offset: i64,
        dest: Option<Dest<'_>>,
        dest_offset: i64,
        length: i64,
        sequential: bool,
    ) -> Result<i64> {
        let data_offset = non_negative("data_offset", data_offset)?;
        let dest_offset = non_negative("buffer_offset", dest_offset)?;
        let length = non_negative("length", length)?;
        self.transfer.enter(column);

        if !sequential || self.cache.peek(column).is_some() {
            return self.read_cached_window(column, kind, data_offset, dest, dest_offset, length);
        }

        let Some(dest) = dest else {
            let unit = kind.unit() as i64;
            return match self.query_field_info(column, kind.c_type())? {
                FieldLength::Null => match kind {
                    VarKind::Text => Err(Error::cast(format!("column {column} is NULL"))),
                    VarKind::Binary => Ok(-1),
                },
                FieldLength::Unknown => Ok(-4 / unit),
                FieldLength::Known(n) => Ok(n as i64 / unit),
            };
        };

        let delivered = self.transfer.delivered(column) / kind.unit() as u64;
        let requested = data_offset as u64;
        if requested < delivered {
            return Err(Error::NonSequentialAccess {
                column,
                requested,
                delivered,
            });
        }
        let skip = (requested - delivered) as usize;
        if skip > 0 && self.stream(column, kind, Sink::Discard, skip)? < skip {
            return Ok(0);
        }

        let length = length.min(dest.len().saturating_sub(dest_offset));
        if length == 0 {
            if kind == VarKind::Text && self.query_field_info(column, kind.c_type())? == FieldLength::Null {
                return Err(Error::cast(format!("column {column} is NULL")));
            }
            return Ok(0);
        }
        let read = self.stream(column, kind, dest.into_sink(dest_offset, length), length)?;
        Ok(read as i64)
    }

    /// The cached value of `column`, materialized as `kind` on first use.
    fn cached_value(&mut self, column: usize, kind: VarKind) -> Result<&OdbcValue> {
        if self.cache.peek(column).is_none() {
            let value = match kind {
                VarKind::Text => self.read_text(column)?,
                VarKind::Binary => self.read_binary(column)?,
            };
            self.cache.set(column, value)?;
        }
        self.cache
            .peek(column)
            .ok_or(Error::ColumnIndexOutOfBounds {
                index: column,
                count: self.cache.len(),
            })
    }

    /// Length of a text or binary value in bytes.
    ///
    /// Under sequential access an uncached value is only probed and the
    /// remaining length is reported; otherwise the value is materialized.
    pub fn field_length(&mut self, column: usize, kind: VarKind, sequential: bool) -> Result<FieldLength> {
        self.transfer.enter(column);
        if sequential && self.cache.peek(column).is_none() {
            return self.query_field_info(column, kind.c_type());
        }
        match self.cached_value(column, kind)? {
            OdbcValue::Null => Ok(FieldLength::Null),
            OdbcValue::Binary(data) => Ok(FieldLength::Known(data.len() as u64)),
            OdbcValue::Text(_) => Ok(FieldLength::Known(self.cached_units(column).len() as u64 * 2)),
            other => Err(Error::cast(format!(
                "column {column}: {} value has no length",
                other.kind()
            ))),
        }
    }

    /// UTF-16 units of a cached text value, encoded once per row.
    fn cached_units(&mut self, column: usize) -> &[u16] {
        self.cache.text_units(column).unwrap_or_default()
    }

    fn read_cached_window(
        &mut self,
        column: usize,
        kind: VarKind,
        data_offset: usize,
        dest: Option<Dest<'_>>,
        dest_offset: usize,
        length: usize,
    ) -> Result<i64> {
        match (kind, self.cached_value(column, kind)?) {
            (_, OdbcValue::Null) => return Err(Error::cast(format!("column {column} is NULL"))),
            (VarKind::Binary, OdbcValue::Binary(data)) => {
                let copied = match dest {
                    Some(Dest::Bytes(d)) => copy_window(&data[..], data_offset, d, dest_offset, length),
                    _ => data.len(),
                };
                return Ok(copied as i64);
            }
            (VarKind::Text, OdbcValue::Text(_)) => {}
            (_, other) => {
                return Err(Error::cast(format!(
                    "column {column}: cannot read {} value as {:?}",
                    other.kind(),
                    kind
                )))
            }
        }
        let units = self.cached_units(column);
        let copied = match dest {
            Some(Dest::Units(d)) => copy_window(units, data_offset, d, dest_offset, length),
            _ => units.len(),
        };
        Ok(copied as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::constants::*;
    use crate::driver::fixture::{FixtureCell, FixtureColumn, FixtureResult, FixtureStatement};

    struct Parts {
        stmt: FixtureStatement,
        buffer: ScratchBuffer,
        cache: RowCache,
        transfer: ChunkTransferState,
        registry: TypeRegistry,
        cancel: CancelHandle,
    }

    impl Parts {
        fn new(columns: Vec<FixtureColumn>, row: Vec<FixtureCell>) -> Self {
            let count = columns.len();
            let mut stmt = FixtureStatement::new(vec![FixtureResult::new(columns).row(row)]);
            stmt.fetch();
            Self {
                stmt,
                buffer: ScratchBuffer::new(64).unwrap(),
                cache: RowCache::new(count),
                transfer: ChunkTransferState::new(),
                registry: TypeRegistry::new(),
                cancel: CancelHandle::new(),
            }
        }

        fn reader(&mut self) -> FieldReader<'_, FixtureStatement> {
            FieldReader {
                stmt: &mut self.stmt,
                buffer: &mut self.buffer,
                cache: &mut self.cache,
                transfer: &mut self.transfer,
                registry: &self.registry,
                cancel: &self.cancel,
            }
        }
    }

    #[test]
    fn test_decode_fixed_and_null() {
        let mut parts = Parts::new(
            vec![FixtureColumn::new("a", SQL_INTEGER), FixtureColumn::new("b", SQL_INTEGER)],
            vec![FixtureCell::int(-5), FixtureCell::Null],
        );
        let int = *parts.registry.resolve(crate::protocol::types::OdbcType::Int);
        assert_eq!(parts.reader().decode(0, &int).unwrap(), OdbcValue::Int(-5));
        assert_eq!(parts.reader().decode(1, &int).unwrap(), OdbcValue::Null);
        assert_eq!(parts.cache.peek(1), Some(&OdbcValue::Null));
    }

    #[test]
    fn test_decode_decimal_text() {
        let mut parts = Parts::new(
            vec![FixtureColumn::new("d", SQL_DECIMAL)],
            vec![FixtureCell::text(" +12.500")],
        );
        let mapping = *parts.registry.resolve_raw(SQL_DECIMAL).unwrap();
        match parts.reader().decode(0, &mapping).unwrap() {
            OdbcValue::Decimal(s) => assert_eq!(s, "12.500"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_decode_variant_uses_runtime_type() {
        let mut parts = Parts::new(
            vec![FixtureColumn::new("v", SQL_SS_VARIANT)],
            vec![FixtureCell::variant(SQL_INTEGER, FixtureCell::int(42))],
        );
        let mapping = *parts.registry.resolve_raw(SQL_SS_VARIANT).unwrap();
        assert_eq!(parts.reader().decode(0, &mapping).unwrap(), OdbcValue::Int(42));
    }

    #[test]
    fn test_transfer_state_resets_on_column_change() {
        let mut state = ChunkTransferState::new();
        state.enter(1);
        state.advance(10);
        assert_eq!(state.delivered(1), 10);
        assert_eq!(state.delivered(2), 0);
        state.enter(2);
        state.enter(1);
        assert_eq!(state.delivered(1), 0);
    }

    #[test]
    fn test_sequential_window_rejects_backward_offsets() {
        let mut parts = Parts::new(
            vec![FixtureColumn::new("b", SQL_LONGVARBINARY)],
            vec![FixtureCell::binary((0u8..40).collect::<Vec<_>>())],
        );
        let mut dest = [0u8; 8];
        let n = parts
            .reader()
            .read_window(0, VarKind::Binary, 0, Some(Dest::Bytes(&mut dest)), 0, 8, true)
            .unwrap();
        assert_eq!(n, 8);

        let n = parts
            .reader()
            .read_window(0, VarKind::Binary, 12, Some(Dest::Bytes(&mut dest)), 0, 4, true)
            .unwrap();
        assert_eq!(n, 4);
        assert_eq!(&dest[..4], &[12, 13, 14, 15]);

        let err = parts
            .reader()
            .read_window(0, VarKind::Binary, 3, Some(Dest::Bytes(&mut dest)), 0, 4, true)
            .unwrap_err();
        match err {
            Error::NonSequentialAccess { requested, delivered, .. } => {
                assert_eq!(requested, 3);
                assert_eq!(delivered, 16);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_sequential_probe_of_null() {
        let mut parts = Parts::new(
            vec![FixtureColumn::new("b", SQL_VARBINARY), FixtureColumn::new("t", SQL_WVARCHAR)],
            vec![FixtureCell::Null, FixtureCell::Null],
        );
        let n = parts.reader().read_window(0, VarKind::Binary, 0, None, 0, 0, true).unwrap();
        assert_eq!(n, -1);
        // the NULL is cached now
        assert!(matches!(
            parts.reader().read_window(0, VarKind::Binary, 0, None, 0, 0, true),
            Err(Error::Cast { .. })
        ));
        assert!(matches!(
            parts.reader().read_window(1, VarKind::Text, 0, None, 0, 0, true),
            Err(Error::Cast { .. })
        ));
    }

    #[test]
    fn test_negative_arguments() {
        let mut parts = Parts::new(vec![FixtureColumn::new("b", SQL_VARBINARY)], vec![FixtureCell::binary(vec![1])]);
        let err = parts.reader().read_window(0, VarKind::Binary, -1, None, 0, 0, false).unwrap_err();
        assert!(matches!(err, Error::ArgumentOutOfRange { name: "data_offset", .. }));
    }

    #[test]
    fn test_canceled_before_fetch() {
        let mut parts = Parts::new(vec![FixtureColumn::new("a", SQL_INTEGER)], vec![FixtureCell::int(1)]);
        parts.cancel.cancel();
        let int = *parts.registry.resolve(crate::protocol::types::OdbcType::Int);
        assert!(matches!(parts.reader().decode(0, &int), Err(Error::Canceled)));
        assert_eq!(parts.stmt.calls().snapshot().get_data, 0);
    }
}
