//! Forward-only reader over the results of an executed statement.
//!
//! [`DataReader`] owns the statement, one scratch buffer and the row cache
//! of the current result. It walks rows with [`DataReader::read`] and
//! results with [`DataReader::next_result`], and decodes column values on
//! demand. Values are cached per row, so a column is fetched from the
//! driver at most once per row under random access.
//!
//! Under [`CommandBehavior::SEQUENTIAL_ACCESS`] long values are not
//! materialized: [`DataReader::get_bytes`] and [`DataReader::get_chars`]
//! stream windows straight into the caller's buffer and only move forward.

use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::driver::{CatalogStatement, DescField, DiagnosticRecord, RetCode, Statement};
use crate::error::{Error, Result};
use crate::options::{CancelHandle, CommandBehavior, ReaderOptions};
use crate::protocol::buffer::ScratchBuffer;
use crate::protocol::chunk::VarKind;
use crate::protocol::field::{ChunkTransferState, Dest, FieldLength, FieldReader};
use crate::protocol::types::{find_by_name, ColumnDescriptor, Guid, OdbcType, OdbcValue, RowCache, TypeMapping};
use crate::schema::{self, SchemaRequest};

/// Whether the current result is known to have rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HasRows {
    DontKnow,
    Yes,
    No,
}

/// Position of a reader, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// On a result, before its first row.
    BeforeFirstRow,
    /// On a row; column values can be read.
    OnRow,
    /// Past the last row of the current result.
    RowsExhausted,
    /// Every result has been consumed.
    NoMoreResults,
    Closed,
}

/// Reader over the results of one statement.
///
/// The reader is the single owner of its statement, so only one column
/// fetch can ever be in flight against the scratch buffer. Dropping the
/// reader closes it, discarding pending results without reporting errors.
///
/// # Example
///
/// ```no_run
/// use odbc_reader_rs::driver::Statement;
/// use odbc_reader_rs::{DataReader, ReaderOptions, Result};
///
/// fn dump<S: Statement>(stmt: S) -> Result<()> {
///     let mut reader = DataReader::open(stmt, Some("SELECT id, name FROM users"), ReaderOptions::new())?;
///     loop {
///         while reader.read()? {
///             let id = reader.get_i32(0)?;
///             let name = if reader.is_null(1)? { String::new() } else { reader.get_string(1)? };
///             println!("{id}: {name}");
///         }
///         if !reader.next_result()? {
///             break;
///         }
///     }
///     reader.close()
/// }
/// ```
pub struct DataReader<S: Statement> {
    stmt: S,
    /// Secondary statement for catalog queries, opened on first use.
    catalog: Option<Box<dyn CatalogStatement>>,
    options: ReaderOptions,
    command_text: Option<String>,
    buffer: ScratchBuffer,
    /// Values of the current row; `None` when no result is open.
    cache: Option<RowCache>,
    transfer: ChunkTransferState,
    schema: Option<Vec<ColumnDescriptor>>,
    /// Trailing columns hidden from the caller (key-info only).
    hidden: usize,
    cancel: CancelHandle,
    info: Vec<DiagnosticRecord>,
    /// -1 until a statement reports a row count.
    records_affected: i64,
    result_index: usize,
    has_rows: HasRows,
    is_read: bool,
    /// `has_rows` already read the first row.
    skip_read_once: bool,
    rows_exhausted: bool,
    valid_result: bool,
    no_more_results: bool,
    no_more_rows: bool,
    closed: bool,
}

impl<S: Statement> DataReader<S> {
    /// Open a reader over an executed statement.
    ///
    /// `command_text` is only used to guess the base table of single-table
    /// commands during key discovery. Results without columns at the head
    /// of the statement are skipped, adding their row counts to
    /// [`records_affected`](Self::records_affected).
    pub fn open(stmt: S, command_text: Option<&str>, options: ReaderOptions) -> Result<Self> {
        options.validate()?;
        let buffer = ScratchBuffer::new(options.buffer_capacity)?;
        tracing::debug!(behavior = %options.behavior, capacity = options.buffer_capacity, "opening reader");
        let mut reader = Self {
            stmt,
            catalog: None,
            options,
            command_text: command_text.map(str::to_string),
            buffer,
            cache: None,
            transfer: ChunkTransferState::new(),
            schema: None,
            hidden: 0,
            cancel: CancelHandle::new(),
            info: Vec::new(),
            records_affected: -1,
            result_index: 0,
            has_rows: HasRows::DontKnow,
            is_read: false,
            skip_read_once: false,
            rows_exhausted: false,
            valid_result: false,
            no_more_results: false,
            no_more_rows: false,
            closed: false,
        };
        reader.first_result()?;
        Ok(reader)
    }

    fn behavior(&self, flag: CommandBehavior) -> bool {
        self.options.behavior.contains(flag)
    }

    fn is_sequential(&self) -> bool {
        self.behavior(CommandBehavior::SEQUENTIAL_ACCESS)
    }

    /// Handle that cancels this reader from elsewhere.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Where the reader stands.
    pub fn state(&self) -> CursorState {
        if self.closed {
            CursorState::Closed
        } else if self.no_more_results {
            CursorState::NoMoreResults
        } else if self.is_read {
            CursorState::OnRow
        } else if self.rows_exhausted {
            CursorState::RowsExhausted
        } else {
            CursorState::BeforeFirstRow
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of results advanced past since the reader was opened.
    pub fn result_index(&self) -> usize {
        self.result_index
    }

    /// Sum of the row counts reported by the statements consumed so far, or
    /// -1 if none reported one.
    pub fn records_affected(&self) -> i64 {
        self.records_affected
    }

    /// Informational diagnostics collected so far.
    pub fn info_messages(&self) -> &[DiagnosticRecord] {
        &self.info
    }

    /// Take and clear the informational diagnostics.
    pub fn take_info_messages(&mut self) -> Vec<DiagnosticRecord> {
        std::mem::take(&mut self.info)
    }

    fn add_records_affected(&mut self, rows: i64) {
        if rows >= 0 {
            if self.records_affected < 0 {
                self.records_affected = rows;
            } else {
                self.records_affected += rows;
            }
        }
    }

    fn collect_info(&mut self, operation: &'static str) {
        let records = self.stmt.diagnostics();
        for record in &records {
            tracing::debug!(operation, state = %record.state, message = %record.message, "driver info");
        }
        self.info.extend(records);
    }

    fn first_result(&mut self) -> Result<()> {
        let (_, rows) = self.stmt.row_count();
        self.add_records_affected(rows);
        let (rc, count) = self.field_count_no_throw();
        if rc.is_success() && count == 0 {
            self.advance_results(false, false)?;
        } else {
            self.valid_result = true;
        }
        Ok(())
    }

    /// Count the columns of the current result and set up its row cache.
    ///
    /// Under key-info behavior trailing hidden columns are excluded from
    /// the count.
    fn field_count_no_throw(&mut self) -> (RetCode, usize) {
        if self.cancel.is_canceled() {
            return (RetCode::Error, 0);
        }
        let (rc, count) = self.stmt.num_result_cols();
        if !rc.is_success() {
            return (rc, 0);
        }
        let count = usize::try_from(count).unwrap_or(0);
        self.hidden = 0;
        if self.behavior(CommandBehavior::KEY_INFO) {
            self.hidden = schema::count_hidden_columns(&mut self.stmt, count, &mut self.options.provider);
        }
        let visible = count - self.hidden;
        self.cache = Some(RowCache::new(visible));
        (rc, visible)
    }

    /// Number of visible columns in the current result.
    pub fn field_count(&mut self) -> Result<usize> {
        if self.closed {
            return Err(Error::Closed {
                operation: "field_count",
            });
        }
        if self.no_more_results {
            return Ok(0);
        }
        if self.cache.is_none() {
            let (rc, _) = self.field_count_no_throw();
            if !rc.is_success() {
                return Err(Error::driver(rc, self.stmt.diagnostics()));
            }
        }
        Ok(self.cache.as_ref().map_or(0, RowCache::len))
    }

    /// Number of hidden key columns trailing the visible ones.
    pub fn hidden_field_count(&self) -> usize {
        self.hidden
    }

    /// Same as [`field_count`](Self::field_count); pairs with
    /// [`hidden_field_count`](Self::hidden_field_count).
    pub fn visible_field_count(&mut self) -> Result<usize> {
        self.field_count()
    }

    /// Advance to the next row of the current result.
    ///
    /// Returns `false` at the end of the rows, after cancellation, under
    /// schema-only behavior, and after the first row under single-row
    /// behavior.
    pub fn read(&mut self) -> Result<bool> {
        if self.closed {
            return Err(Error::Closed { operation: "read" });
        }
        if self.cancel.is_canceled() {
            self.is_read = false;
            return Ok(false);
        }
        if self.skip_read_once {
            self.skip_read_once = false;
            return Ok(self.is_read);
        }
        if self.no_more_rows || self.no_more_results || self.behavior(CommandBehavior::SCHEMA_ONLY) {
            return Ok(false);
        }
        if !self.valid_result {
            return Ok(false);
        }

        let rc = self.stmt.fetch();
        match rc {
            RetCode::Success | RetCode::SuccessWithInfo => {
                if rc == RetCode::SuccessWithInfo {
                    self.collect_info("read");
                }
                self.has_rows = HasRows::Yes;
                self.is_read = true;
            }
            RetCode::NoData => {
                self.is_read = false;
                self.rows_exhausted = true;
                if self.has_rows == HasRows::DontKnow {
                    self.has_rows = HasRows::No;
                }
            }
            RetCode::Error | RetCode::InvalidHandle => {
                self.is_read = false;
                return Err(Error::driver(rc, self.stmt.diagnostics()));
            }
        }

        if let Some(cache) = self.cache.as_mut() {
            cache.flush();
        }
        self.transfer.reset();
        if self.behavior(CommandBehavior::SINGLE_ROW) {
            self.no_more_rows = true;
        }
        Ok(self.is_read)
    }

    /// Whether the current result has at least one row.
    ///
    /// May read the first row; the next [`read`](Self::read) then reports
    /// it instead of fetching again.
    pub fn has_rows(&mut self) -> Result<bool> {
        if self.closed {
            return Err(Error::Closed {
                operation: "has_rows",
            });
        }
        if self.has_rows == HasRows::DontKnow {
            self.read()?;
            self.skip_read_once = true;
        }
        Ok(self.has_rows == HasRows::Yes)
    }

    /// Advance to the next result that has columns.
    ///
    /// Results without columns in between are skipped and their row counts
    /// added to [`records_affected`](Self::records_affected). Under
    /// single-result behavior the remaining results are drained and `false`
    /// is returned once the driver runs out of them.
    pub fn next_result(&mut self) -> Result<bool> {
        self.advance_results(false, false)
    }

    fn advance_results(&mut self, disposing: bool, all_results: bool) -> Result<bool> {
        if self.closed {
            return Err(Error::Closed {
                operation: "next_result",
            });
        }
        if self.cancel.is_canceled() || self.no_more_results {
            return Ok(false);
        }
        self.is_read = false;
        self.skip_read_once = false;
        self.rows_exhausted = false;
        self.has_rows = HasRows::DontKnow;
        self.schema = None;
        self.transfer.reset();

        let single_result = self.behavior(CommandBehavior::SINGLE_RESULT);
        let max_failures = self.options.max_consecutive_failures;
        let mut errors = Vec::new();
        let mut failures = 0u32;
        let mut skipped = 0u32;
        let mut has_columns = false;
        let (rc, has_more, abandoned) = loop {
            self.valid_result = false;
            let rc = self.stmt.more_results();
            let has_more = rc.is_success();
            if rc == RetCode::SuccessWithInfo {
                self.collect_info("next_result");
            } else if !disposing && rc != RetCode::NoData && rc != RetCode::Success {
                errors.push(Error::driver(rc, self.stmt.diagnostics()));
                failures += 1;
            }

            if !disposing && has_more {
                failures = 0;
                self.result_index += 1;
                let (_, rows) = self.stmt.row_count();
                self.add_records_affected(rows);
                if !single_result {
                    let (_, count) = self.field_count_no_throw();
                    has_columns = count != 0;
                    self.valid_result = has_columns;
                }
            }

            let again = (!single_result && has_more && !has_columns)
                || (rc != RetCode::NoData && all_results)
                || (single_result && has_more);
            if !again {
                break (rc, has_more, false);
            }
            // results passed over count against the same bound as failures
            if has_more {
                skipped += 1;
            }
            if failures >= max_failures || skipped >= max_failures {
                break (rc, has_more, true);
            }
        };

        if abandoned {
            tracing::warn!(failures, skipped, "driver keeps producing results, abandoning traversal");
        }
        if rc == RetCode::NoData || abandoned {
            self.cache = None;
            self.valid_result = false;
            self.no_more_results = true;
        }
        if let Some(err) = Error::merge(errors) {
            return Err(err);
        }
        let has_more = has_more && !abandoned;
        tracing::debug!(result = self.result_index, has_more, records_affected = self.records_affected, "next result");
        Ok(has_more)
    }

    /// Close the reader, discarding any remaining results.
    ///
    /// Errors raised by the discarded results are reported. Closing twice
    /// is a no-op.
    pub fn close(&mut self) -> Result<()> {
        self.close_inner(false)
    }

    fn close_inner(&mut self, disposing: bool) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let mut error = self.advance_results(disposing, !disposing).err();
        let rc = self.stmt.close_cursor();
        if !rc.is_success() && error.is_none() {
            error = Some(Error::driver(rc, self.stmt.diagnostics()));
        }
        self.catalog = None;
        if self.behavior(CommandBehavior::CLOSE_CONNECTION) {
            self.stmt.close_connection();
        }

        self.closed = true;
        self.cache = None;
        self.schema = None;
        self.is_read = false;
        self.no_more_results = true;
        self.no_more_rows = true;
        tracing::debug!(records_affected = self.records_affected, "reader closed");

        match error {
            Some(err) if !disposing => Err(err),
            _ => Ok(()),
        }
    }

    fn check_column(&self, column: usize) -> Result<()> {
        let count = self.cache.as_ref().map_or(0, RowCache::len);
        if column >= count {
            return Err(Error::ColumnIndexOutOfBounds {
                index: column,
                count,
            });
        }
        Ok(())
    }

    /// A result must be open; no current row is needed.
    fn ensure_result(&self, operation: &'static str, column: usize) -> Result<()> {
        if self.closed {
            return Err(Error::Closed { operation });
        }
        if self.cache.is_none() {
            return Err(Error::NoCurrentRow);
        }
        self.check_column(column)
    }

    fn ensure_row(&self, operation: &'static str, column: usize) -> Result<()> {
        if self.closed {
            return Err(Error::Closed { operation });
        }
        if !self.is_read {
            return Err(Error::NoCurrentRow);
        }
        self.check_column(column)
    }

    fn field_reader(&mut self) -> Result<FieldReader<'_, S>> {
        let cache = self.cache.as_mut().ok_or(Error::NoCurrentRow)?;
        Ok(FieldReader {
            stmt: &mut self.stmt,
            buffer: &mut self.buffer,
            cache,
            transfer: &mut self.transfer,
            registry: &self.options.registry,
            cancel: &self.cancel,
        })
    }

    /// Mapping of a column, resolved once per result.
    fn mapping(&mut self, column: usize) -> Result<TypeMapping> {
        let cache = self.cache.as_mut().ok_or(Error::NoCurrentRow)?;
        if let Some(odbc_type) = cache.slot(column)?.odbc_type {
            return Ok(*self.options.registry.resolve(odbc_type));
        }
        let mapping = schema::column_mapping(&mut self.stmt, column, &self.options.registry)?;
        cache.slot_mut(column)?.odbc_type = Some(mapping.odbc_type);
        Ok(mapping)
    }

    fn text_attribute(&mut self, column: usize, field: DescField) -> Result<String> {
        let value = schema::column_attribute(&mut self.stmt, column, field)?;
        Ok(value.as_text().unwrap_or_default().to_string())
    }

    /// Column name.
    pub fn get_name(&mut self, column: usize) -> Result<String> {
        self.ensure_result("get_name", column)?;
        if let Some(cache) = &self.cache {
            if let Some(name) = &cache.slot(column)?.name {
                return Ok(name.clone());
            }
        }
        let name = self.text_attribute(column, DescField::Name)?;
        if let Some(cache) = self.cache.as_mut() {
            cache.slot_mut(column)?.name = Some(name.clone());
        }
        Ok(name)
    }

    /// Driver specific type name of a column.
    pub fn get_data_type_name(&mut self, column: usize) -> Result<String> {
        self.ensure_result("get_data_type_name", column)?;
        if let Some(cache) = &self.cache {
            if let Some(name) = &cache.slot(column)?.type_name {
                return Ok(name.clone());
            }
        }
        let name = self.text_attribute(column, DescField::TypeName)?;
        if let Some(cache) = self.cache.as_mut() {
            cache.slot_mut(column)?.type_name = Some(name.clone());
        }
        Ok(name)
    }

    /// Logical type of a column, after sign promotion.
    pub fn get_field_type(&mut self, column: usize) -> Result<OdbcType> {
        self.ensure_result("get_field_type", column)?;
        Ok(self.mapping(column)?.odbc_type)
    }

    /// Position of the column called `name`, exact match first, then
    /// ignoring case.
    pub fn get_ordinal(&mut self, name: &str) -> Result<usize> {
        let count = self.field_count()?;
        let mut names = Vec::with_capacity(count);
        for column in 0..count {
            names.push(self.get_name(column)?);
        }
        find_by_name(&names, name, |n| Some(n.as_str())).ok_or_else(|| Error::ColumnNotFound {
            name: name.to_string(),
        })
    }

    /// Value of a column in the current row.
    pub fn get_value(&mut self, column: usize) -> Result<OdbcValue> {
        self.ensure_row("get_value", column)?;
        let mapping = self.mapping(column)?;
        let cache = self.cache.as_mut().ok_or(Error::NoCurrentRow)?;
        let (stmt, buffer, transfer) = (&mut self.stmt, &mut self.buffer, &mut self.transfer);
        let (registry, cancel) = (&self.options.registry, &self.cancel);
        cache.get_or_fetch(column, |cache| {
            let mut field = FieldReader {
                stmt,
                buffer,
                cache,
                transfer,
                registry,
                cancel,
            };
            field.decode(column, &mapping)
        })
    }

    /// Values of every column in the current row.
    pub fn get_values(&mut self) -> Result<Vec<OdbcValue>> {
        let count = self.field_count()?;
        (0..count).map(|column| self.get_value(column)).collect()
    }

    /// Whether a column of the current row is NULL.
    ///
    /// Under sequential access a variable-length column is only probed, so
    /// its data can still be read afterwards.
    pub fn is_null(&mut self, column: usize) -> Result<bool> {
        self.ensure_row("is_null", column)?;
        if !self.is_sequential() {
            return Ok(self.get_value(column)?.is_null());
        }
        if let Some(value) = self.cache.as_ref().and_then(|c| c.peek(column)) {
            return Ok(value.is_null());
        }
        let mapping = self.mapping(column)?;
        if mapping.is_fixed() {
            return Ok(self.get_value(column)?.is_null());
        }
        let mut field = self.field_reader()?;
        Ok(field.query_field_info(column, mapping.c_type)? == FieldLength::Null)
    }

    fn typed<T>(
        &mut self,
        column: usize,
        target: &str,
        convert: impl FnOnce(&OdbcValue) -> Option<T>,
    ) -> Result<T> {
        let value = self.get_value(column)?;
        if value.is_null() {
            return Err(Error::cast(format!("column {column} is NULL")));
        }
        convert(&value).ok_or_else(|| {
            Error::cast(format!("column {column}: cannot read {} value as {target}", value.kind()))
        })
    }

    pub fn get_bool(&mut self, column: usize) -> Result<bool> {
        self.typed(column, "bool", |v| match v {
            OdbcValue::Bool(b) => Some(*b),
            _ => None,
        })
    }

    pub fn get_u8(&mut self, column: usize) -> Result<u8> {
        self.typed(column, "u8", |v| match v {
            OdbcValue::TinyInt(n) => Some(*n),
            _ => None,
        })
    }

    pub fn get_i16(&mut self, column: usize) -> Result<i16> {
        self.typed(column, "i16", |v| match v {
            OdbcValue::SmallInt(n) => Some(*n),
            OdbcValue::TinyInt(n) => Some(i16::from(*n)),
            _ => None,
        })
    }

    pub fn get_i32(&mut self, column: usize) -> Result<i32> {
        self.typed(column, "i32", |v| match v {
            OdbcValue::Int(n) => Some(*n),
            OdbcValue::SmallInt(n) => Some(i32::from(*n)),
            OdbcValue::TinyInt(n) => Some(i32::from(*n)),
            _ => None,
        })
    }

    /// Integral column as `i64`; decimal text is parsed.
    pub fn get_i64(&mut self, column: usize) -> Result<i64> {
        self.typed(column, "i64", |v| match v {
            OdbcValue::Bool(_) => None,
            other => other.to_i64(),
        })
    }

    pub fn get_f32(&mut self, column: usize) -> Result<f32> {
        self.typed(column, "f32", |v| match v {
            OdbcValue::Real(n) => Some(*n),
            _ => None,
        })
    }

    pub fn get_f64(&mut self, column: usize) -> Result<f64> {
        self.typed(column, "f64", |v| match v {
            OdbcValue::Bool(_) => None,
            other => other.to_f64(),
        })
    }

    /// Exact numeric as text.
    pub fn get_decimal(&mut self, column: usize) -> Result<String> {
        self.typed(column, "decimal", |v| match v {
            OdbcValue::Decimal(s) => Some(s.clone()),
            OdbcValue::BigInt(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn get_string(&mut self, column: usize) -> Result<String> {
        self.typed(column, "string", |v| v.as_str().map(str::to_string))
    }

    pub fn get_date(&mut self, column: usize) -> Result<NaiveDate> {
        self.typed(column, "date", |v| match v {
            OdbcValue::Date(d) => Some(*d),
            OdbcValue::Timestamp(ts) => Some(ts.date()),
            _ => None,
        })
    }

    pub fn get_time(&mut self, column: usize) -> Result<NaiveTime> {
        self.typed(column, "time", |v| match v {
            OdbcValue::Time(t) => Some(*t),
            _ => None,
        })
    }

    pub fn get_datetime(&mut self, column: usize) -> Result<NaiveDateTime> {
        self.typed(column, "timestamp", OdbcValue::as_datetime)
    }

    pub fn get_guid(&mut self, column: usize) -> Result<Guid> {
        self.typed(column, "guid", |v| match v {
            OdbcValue::Guid(g) => Some(*g),
            _ => None,
        })
    }

    /// Whole binary value.
    pub fn get_binary(&mut self, column: usize) -> Result<Bytes> {
        self.typed(column, "bytes", |v| match v {
            OdbcValue::Binary(b) => Some(b.clone()),
            _ => None,
        })
    }

    /// Length in bytes of a text or binary column of the current row.
    ///
    /// Under sequential access an unread value is probed, which reports the
    /// remaining length and does not consume data.
    pub fn field_length(&mut self, column: usize, kind: VarKind) -> Result<FieldLength> {
        self.ensure_row("field_length", column)?;
        let sequential = self.is_sequential();
        self.field_reader()?.field_length(column, kind, sequential)
    }

    /// Copy bytes of a binary column into `dest`, starting at `data_offset`
    /// of the value and `buffer_offset` of `dest`.
    ///
    /// Returns the number of bytes copied. Without `dest` the length of the
    /// value is returned instead: the whole length under random access, the
    /// remaining length under sequential access (-4 when the driver cannot
    /// tell, -1 for a NULL that was not read before). A `buffer_offset` at or
    /// past the end of `dest` copies nothing and returns 0.
    pub fn get_bytes(
        &mut self,
        column: usize,
        data_offset: i64,
        dest: Option<&mut [u8]>,
        buffer_offset: i64,
        length: i64,
    ) -> Result<i64> {
        self.ensure_row("get_bytes", column)?;
        let sequential = self.is_sequential();
        let mut field = self.field_reader()?;
        field.read_window(
            column,
            VarKind::Binary,
            data_offset,
            dest.map(Dest::Bytes),
            buffer_offset,
            length,
            sequential,
        )
    }

    /// Copy UTF-16 code units of a text column into `dest`.
    ///
    /// Works like [`get_bytes`](Self::get_bytes) with offsets and lengths
    /// counted in code units. Probing the length of a NULL value is an
    /// error; an unknown remaining length is reported as -2.
    pub fn get_chars(
        &mut self,
        column: usize,
        data_offset: i64,
        dest: Option<&mut [u16]>,
        buffer_offset: i64,
        length: i64,
    ) -> Result<i64> {
        self.ensure_row("get_chars", column)?;
        let sequential = self.is_sequential();
        let mut field = self.field_reader()?;
        field.read_window(
            column,
            VarKind::Text,
            data_offset,
            dest.map(Dest::Units),
            buffer_offset,
            length,
            sequential,
        )
    }

    /// Descriptors of the visible columns of the current result.
    ///
    /// Built on first use and kept until the reader moves to another
    /// result. Empty once every result has been consumed.
    pub fn schema(&mut self) -> Result<&[ColumnDescriptor]> {
        if self.closed {
            return Err(Error::Closed { operation: "schema" });
        }
        if self.schema.is_none() {
            let Some(cache) = &self.cache else {
                return Ok(&[]);
            };
            let request = SchemaRequest {
                registry: &self.options.registry,
                key_info: self.options.behavior.contains(CommandBehavior::KEY_INFO),
                quote_char: self.options.quote_char,
                command_text: self.command_text.as_deref(),
                visible: cache.len(),
                hidden: self.hidden,
            };
            let columns = schema::build_schema(
                &mut self.stmt,
                &mut self.catalog,
                &mut self.buffer,
                &mut self.options.provider,
                &request,
            )?;
            tracing::debug!(columns = columns.len(), "schema built");
            self.schema = Some(columns);
        }
        Ok(self.schema.as_deref().unwrap_or(&[]))
    }
}

impl<S: Statement> Drop for DataReader<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close_inner(true) {
            tracing::debug!(error = %e, "error while dropping reader");
        }
    }
}
