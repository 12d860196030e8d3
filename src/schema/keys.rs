//! Key column discovery through catalog queries.
//!
//! For each base table the cascade asks for the primary key, falls back to
//! the narrowest unique index fully covered by the result, and finally looks
//! up row-version columns. Every stage is best effort: a failing catalog
//! call is logged and the cascade moves on.

use crate::driver::constants::*;
use crate::driver::{CatalogStatement, RetCode};
use crate::error::{Error, Result};
use crate::options::ProviderInfo;
use crate::protocol::buffer::{FetchOutcome, ScratchBuffer};
use crate::protocol::chunk::{materialize, VarKind};
use crate::protocol::types::{find_by_name, CDataType, ColumnDescriptor};

use super::table_name::QualifiedTableName;

/// Columns of one unique index as read from the statistics result.
struct IndexRun {
    name: String,
    rows: usize,
    columns: Vec<(usize, String)>,
    partial: bool,
}

impl IndexRun {
    fn new(name: String) -> Self {
        Self {
            name,
            rows: 0,
            columns: Vec::new(),
            partial: false,
        }
    }

    fn continues(&self, name: &str, ordinal: i16) -> bool {
        self.name == name && i64::from(ordinal) == self.rows as i64 + 1
    }

    /// Keep this index if it is complete and narrower than `best`.
    fn finish(self, best: &mut Option<Vec<(usize, String)>>) {
        if self.partial || self.columns.is_empty() {
            return;
        }
        if best.as_ref().map_or(true, |b| b.len() > self.columns.len()) {
            tracing::debug!(index = %self.name, columns = self.columns.len(), "key candidate");
            *best = Some(self.columns);
        }
    }
}

/// Catalog-driven key discovery over the columns of one result.
pub(crate) struct KeyDiscovery<'a, C: CatalogStatement + ?Sized> {
    pub catalog: &'a mut C,
    pub buffer: &'a mut ScratchBuffer,
    pub columns: &'a mut [ColumnDescriptor],
    pub provider: &'a mut ProviderInfo,
}

impl<C: CatalogStatement + ?Sized> KeyDiscovery<'_, C> {
    /// Run the cascade for `table`. Returns the number of key columns found.
    ///
    /// `need_keys` is false when the driver already reported key columns;
    /// only row versions are looked up then.
    pub fn retrieve(&mut self, table: &QualifiedTableName, need_keys: bool, quoted: bool) -> usize {
        let mut found = 0;
        if need_keys {
            if !self.provider.no_primary_keys {
                match self.primary_keys(table, quoted) {
                    Ok(n) => found = n,
                    Err(e) => tracing::debug!(table = %table.table(quoted), error = %e, "primary key lookup failed"),
                }
                self.catalog.close_cursor();
            }
            if found == 0 {
                tracing::debug!(table = %table.table(quoted), "falling back to unique indexes");
                match self.unique_index(table, quoted) {
                    Ok(n) => found = n,
                    Err(e) => tracing::debug!(table = %table.table(quoted), error = %e, "statistics lookup failed"),
                }
                self.catalog.close_cursor();
            }
        }
        if let Err(e) = self.row_versions(table, quoted) {
            tracing::debug!(table = %table.table(quoted), error = %e, "special columns lookup failed");
        }
        self.catalog.close_cursor();
        found
    }

    /// Ordinal of the result column with base column `name`.
    ///
    /// When `table` is given the base table must match too. Falls back to
    /// the result column names.
    fn ordinal_of(&self, name: &str, table: Option<&str>) -> Option<usize> {
        if name.is_empty() {
            return None;
        }
        self.columns
            .iter()
            .position(|col| {
                col.base_column_name.as_deref() == Some(name)
                    && table.map_or(true, |t| col.base_table_name.as_deref() == Some(t))
            })
            .or_else(|| find_by_name(&*self.columns, name, |col| Some(col.name.as_str())))
    }

    fn next_row(&mut self) -> Result<bool> {
        match self.catalog.fetch() {
            RetCode::Success | RetCode::SuccessWithInfo => Ok(true),
            RetCode::NoData => Ok(false),
            rc => Err(Error::driver(rc, self.catalog.diagnostics())),
        }
    }

    fn read_text(&mut self, column: u16) -> Result<Option<String>> {
        let index = usize::from(column) - 1;
        let Some(bytes) = materialize(self.buffer, self.catalog, index, VarKind::Text)? else {
            return Ok(None);
        };
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(Some(String::from_utf16_lossy(&units)))
    }

    fn read_i16(&mut self, column: u16) -> Result<Option<i16>> {
        let index = usize::from(column) - 1;
        match self.buffer.fetch(self.catalog, index, CDataType::SShort, 2)? {
            FetchOutcome::Null => Ok(None),
            _ => Ok(Some(self.buffer.read_i16_le(0)?)),
        }
    }

    fn check_primary_keys(&mut self, rc: RetCode) -> Result<()> {
        if rc.is_success() {
            return Ok(());
        }
        let diagnostics = self.catalog.diagnostics();
        if diagnostics
            .iter()
            .any(|d| d.state == SQLSTATE_DRIVER_NOT_CAPABLE)
        {
            self.provider.no_primary_keys = true;
        }
        Err(Error::driver(rc, diagnostics))
    }

    fn primary_keys(&mut self, table: &QualifiedTableName, quoted: bool) -> Result<usize> {
        let rc = self.catalog.primary_keys(
            table.catalog.as_deref(),
            table.schema.as_deref(),
            table.table(quoted),
        );
        self.check_primary_keys(rc)?;

        let mut keys = Vec::new();
        while self.next_row()? {
            let name = self.read_text(SQL_PRIMARY_KEYS_COLUMN_NAME)?.unwrap_or_default();
            match self.ordinal_of(&name, Some(table.table.as_str())) {
                Some(ordinal) => keys.push((ordinal, name)),
                None => {
                    tracing::debug!(table = %table.table, column = %name, "primary key column not in result");
                    return Ok(0);
                }
            }
        }
        for (ordinal, name) in &keys {
            let col = &mut self.columns[*ordinal];
            col.mark_key();
            col.base_table_name = Some(table.table.clone());
            col.base_column_name.get_or_insert_with(|| name.clone());
        }
        Ok(keys.len())
    }

    fn unique_index(&mut self, table: &QualifiedTableName, quoted: bool) -> Result<usize> {
        let rc = self.catalog.statistics(
            table.catalog.as_deref(),
            table.schema.as_deref(),
            table.table(quoted),
            true,
        );
        if !rc.is_success() {
            return Err(Error::driver(rc, self.catalog.diagnostics()));
        }

        let mut best = None;
        let mut current: Option<IndexRun> = None;
        while self.next_row()? {
            let Some(index) = self.read_text(SQL_STATISTICS_INDEX_NAME)? else {
                continue;
            };
            let position = self.read_i16(SQL_STATISTICS_ORDINAL_POSITION)?.unwrap_or(0);
            let column = self.read_text(SQL_STATISTICS_COLUMN_NAME)?;

            if !current.as_ref().is_some_and(|run| run.continues(&index, position)) {
                if let Some(run) = current.take() {
                    run.finish(&mut best);
                }
                current = Some(IndexRun::new(index));
            }
            let Some(run) = current.as_mut() else {
                continue;
            };
            run.rows += 1;
            if run.partial {
                continue;
            }
            let ordinal = column
                .as_deref()
                .and_then(|name| self.ordinal_of(name, Some(table.table.as_str())));
            match (ordinal, column) {
                (Some(ordinal), Some(name)) if run.columns.len() < MAX_INDEX_KEY_COLUMNS => {
                    run.columns.push((ordinal, name));
                }
                _ => run.partial = true,
            }
        }
        if let Some(run) = current {
            run.finish(&mut best);
        }

        let Some(best) = best else {
            return Ok(0);
        };
        for (ordinal, name) in &best {
            let col = &mut self.columns[*ordinal];
            col.mark_key();
            col.base_table_name.get_or_insert_with(|| table.table.clone());
            col.base_column_name.get_or_insert_with(|| name.clone());
        }
        Ok(best.len())
    }

    fn row_versions(&mut self, table: &QualifiedTableName, quoted: bool) -> Result<()> {
        let rc = self.catalog.special_columns(
            table.catalog.as_deref(),
            table.schema.as_deref(),
            table.table(quoted),
        );
        if !rc.is_success() {
            return Err(Error::driver(rc, self.catalog.diagnostics()));
        }
        while self.next_row()? {
            let Some(name) = self.read_text(SQL_SPECIAL_COLUMNS_COLUMN_NAME)? else {
                continue;
            };
            if let Some(ordinal) = self.ordinal_of(&name, None) {
                let col = &mut self.columns[ordinal];
                col.is_row_version = true;
                col.base_column_name.get_or_insert(name);
            }
        }
        Ok(())
    }
}
