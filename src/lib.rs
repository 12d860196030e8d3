//! Forward-only result reader for ODBC-style drivers.
//!
//! Turns the narrow, stateful call surface of a driver statement (one
//! scratch buffer, one column fetch at a time, "more data" signaled through
//! length indicators) into a typed reader API with per-row value caching,
//! chunked access to long values and lazy schema and key discovery.
//!
//! The driver is reached only through the [`driver::Statement`] and
//! [`driver::CatalogStatement`] traits; [`driver::fixture`] provides an
//! in-memory implementation.
//!
//! # Example
//!
//! ```
//! use odbc_reader_rs::driver::constants::{SQL_INTEGER, SQL_WVARCHAR};
//! use odbc_reader_rs::driver::fixture::{FixtureCell, FixtureColumn, FixtureResult, FixtureStatement};
//! use odbc_reader_rs::{DataReader, ReaderOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let stmt = FixtureStatement::new(vec![FixtureResult::new(vec![
//!         FixtureColumn::new("id", SQL_INTEGER),
//!         FixtureColumn::new("name", SQL_WVARCHAR),
//!     ])
//!     .row(vec![FixtureCell::int(1), FixtureCell::text("Ada")])]);
//!
//!     let mut reader = DataReader::open(stmt, None, ReaderOptions::new())?;
//!     while reader.read()? {
//!         println!("{} {}", reader.get_i32(0)?, reader.get_string(1)?);
//!     }
//!     reader.close()
//! }
//! ```

pub mod driver;
pub mod error;
pub mod options;
pub mod protocol;
pub mod reader;
pub mod schema;

// Re-export main types
pub use error::{Error, Result};
pub use options::{CancelHandle, CommandBehavior, ProviderInfo, ReaderOptions};
pub use protocol::types::{ColumnDescriptor, Guid, Nullability, OdbcType, OdbcValue, SqlType, TypeRegistry};
pub use protocol::{FieldLength, VarKind};
pub use reader::{CursorState, DataReader};
pub use schema::QualifiedTableName;
