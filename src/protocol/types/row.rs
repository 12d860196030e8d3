//! Per-row cache of decoded column values.

use crate::error::{Error, Result};

use super::odbc_type::OdbcType;
use super::value::OdbcValue;

/// Per-column schema facts cached for the lifetime of a result.
#[derive(Debug, Clone, Default)]
pub struct ColumnSlot {
    pub name: Option<String>,
    pub type_name: Option<String>,
    /// Logical type after sign promotion.
    pub odbc_type: Option<OdbcType>,
}

/// Lazily populated values of the current row.
///
/// A slot is `None` until the column is read, then holds the decoded value
/// (possibly [`OdbcValue::Null`]) until the next [`RowCache::flush`]. Schema
/// slots survive flushes and are dropped with the cache when the result
/// changes.
#[derive(Debug)]
pub struct RowCache {
    values: Vec<Option<OdbcValue>>,
    /// UTF-16 form of cached text values, built on demand.
    units: Vec<Option<Vec<u16>>>,
    slots: Vec<ColumnSlot>,
}

impl RowCache {
    /// Create a cache for `count` columns.
    pub fn new(count: usize) -> Self {
        Self {
            values: vec![None; count],
            units: vec![None; count],
            slots: vec![ColumnSlot::default(); count],
        }
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the result has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Forget every value. Called once per row advance.
    pub fn flush(&mut self) {
        self.values.iter_mut().for_each(|v| *v = None);
        self.units.iter_mut().for_each(|u| *u = None);
    }

    /// Cached value, without fetching.
    pub fn peek(&self, column: usize) -> Option<&OdbcValue> {
        self.values.get(column).and_then(Option::as_ref)
    }

    /// Store a decoded value.
    pub fn set(&mut self, column: usize, value: OdbcValue) -> Result<()> {
        let count = self.len();
        let slot = self
            .values
            .get_mut(column)
            .ok_or(Error::ColumnIndexOutOfBounds { index: column, count })?;
        *slot = Some(value);
        if let Some(units) = self.units.get_mut(column) {
            *units = None;
        }
        Ok(())
    }

    /// Cached text value of `column` as UTF-16 code units.
    ///
    /// The units are encoded on first use and kept until the value changes.
    pub fn text_units(&mut self, column: usize) -> Option<&[u16]> {
        let Some(Some(OdbcValue::Text(text))) = self.values.get(column) else {
            return None;
        };
        let units = self.units.get_mut(column)?;
        Some(units.get_or_insert_with(|| text.encode_utf16().collect()).as_slice())
    }

    /// Return the cached value, or decode it once and remember it.
    ///
    /// The decoder receives the cache so that it can record a NULL as soon
    /// as the driver reports one.
    pub fn get_or_fetch<F>(&mut self, column: usize, decode: F) -> Result<OdbcValue>
    where
        F: FnOnce(&mut Self) -> Result<OdbcValue>,
    {
        if let Some(value) = self.peek(column) {
            return Ok(value.clone());
        }
        let value = decode(self)?;
        self.set(column, value.clone())?;
        Ok(value)
    }

    /// Schema slot of a column.
    pub fn slot(&self, column: usize) -> Result<&ColumnSlot> {
        self.slots.get(column).ok_or(Error::ColumnIndexOutOfBounds {
            index: column,
            count: self.slots.len(),
        })
    }

    /// Mutable schema slot of a column.
    pub fn slot_mut(&mut self, column: usize) -> Result<&mut ColumnSlot> {
        let count = self.slots.len();
        self.slots
            .get_mut(column)
            .ok_or(Error::ColumnIndexOutOfBounds { index: column, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_fetch_memoizes() {
        let mut cache = RowCache::new(2);
        let mut calls = 0;
        for _ in 0..3 {
            let v = cache
                .get_or_fetch(1, |_| {
                    calls += 1;
                    Ok(OdbcValue::Int(7))
                })
                .unwrap();
            assert_eq!(v, OdbcValue::Int(7));
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.peek(0), None);
    }

    #[test]
    fn test_decoder_can_record_null_early() {
        let mut cache = RowCache::new(1);
        let v = cache
            .get_or_fetch(0, |cache| {
                cache.set(0, OdbcValue::Null)?;
                Ok(OdbcValue::Null)
            })
            .unwrap();
        assert!(v.is_null());
        assert_eq!(cache.peek(0), Some(&OdbcValue::Null));
    }

    #[test]
    fn test_text_units_follow_the_cached_value() {
        let mut cache = RowCache::new(2);
        assert_eq!(cache.text_units(0), None);
        cache.set(0, OdbcValue::Text("h\u{e9}llo".into())).unwrap();
        cache.set(1, OdbcValue::Int(3)).unwrap();
        assert_eq!(cache.text_units(0).map(<[u16]>::len), Some(5));
        assert_eq!(cache.text_units(1), None);

        cache.set(0, OdbcValue::Text("\u{1f600}".into())).unwrap();
        assert_eq!(cache.text_units(0), Some(&[0xd83d, 0xde00][..]));
        cache.flush();
        assert_eq!(cache.text_units(0), None);
    }

    #[test]
    fn test_flush_keeps_schema_slots() {
        let mut cache = RowCache::new(1);
        cache.set(0, OdbcValue::Text("a".into())).unwrap();
        cache.slot_mut(0).unwrap().name = Some("col".into());
        cache.flush();
        assert_eq!(cache.peek(0), None);
        assert_eq!(cache.slot(0).unwrap().name.as_deref(), Some("col"));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut cache = RowCache::new(1);
        match cache.set(3, OdbcValue::Null) {
            Err(Error::ColumnIndexOutOfBounds { index, count }) => {
                assert_eq!(index, 3);
                assert_eq!(count, 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
