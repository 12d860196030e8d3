//! Reader configuration.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::protocol::buffer::MIN_CAPACITY;
use crate::protocol::types::TypeRegistry;

/// Default scratch buffer size in bytes.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// Default number of consecutive failed result advances tolerated before
/// traversal is abandoned.
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 2000;

/// Flags that change how a command's results are read.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CommandBehavior(u8);

impl CommandBehavior {
    pub const DEFAULT: CommandBehavior = CommandBehavior(0);
    /// Only the first result is exposed; the rest are drained.
    pub const SINGLE_RESULT: CommandBehavior = CommandBehavior(1);
    /// Column information only, no rows.
    pub const SCHEMA_ONLY: CommandBehavior = CommandBehavior(1 << 1);
    /// Discover key columns and base names.
    pub const KEY_INFO: CommandBehavior = CommandBehavior(1 << 2);
    /// At most one row is returned.
    pub const SINGLE_ROW: CommandBehavior = CommandBehavior(1 << 3);
    /// Values are read in column order and never cached in full.
    pub const SEQUENTIAL_ACCESS: CommandBehavior = CommandBehavior(1 << 4);
    /// Closing the reader closes the connection.
    pub const CLOSE_CONNECTION: CommandBehavior = CommandBehavior(1 << 5);

    const NAMES: [(&'static str, CommandBehavior); 6] = [
        ("SingleResult", Self::SINGLE_RESULT),
        ("SchemaOnly", Self::SCHEMA_ONLY),
        ("KeyInfo", Self::KEY_INFO),
        ("SingleRow", Self::SINGLE_ROW),
        ("SequentialAccess", Self::SEQUENTIAL_ACCESS),
        ("CloseConnection", Self::CLOSE_CONNECTION),
    ];

    /// Whether every flag of `other` is set.
    pub fn contains(self, other: CommandBehavior) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for CommandBehavior {
    type Output = CommandBehavior;

    fn bitor(self, rhs: Self) -> Self {
        CommandBehavior(self.0 | rhs.0)
    }
}

impl BitOrAssign for CommandBehavior {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for CommandBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for CommandBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Default");
        }
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
            .collect();
        f.write_str(&names.join("|"))
    }
}

impl FromStr for CommandBehavior {
    type Err = Error;

    /// Parse `|` or `,` separated flag names, ignoring case.
    fn from_str(s: &str) -> Result<Self> {
        let mut behavior = CommandBehavior::DEFAULT;
        for part in s.split(['|', ',']).map(str::trim).filter(|p| !p.is_empty()) {
            if part.eq_ignore_ascii_case("Default") {
                continue;
            }
            let (_, flag) = Self::NAMES
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(part))
                .ok_or_else(|| Error::InvalidOption {
                    message: format!("Unknown command behavior: {}", part),
                })?;
            behavior |= *flag;
        }
        Ok(behavior)
    }
}

/// Driver capabilities relevant to key discovery.
///
/// Flags start out as configured and are cleared at run time when the driver
/// proves it lacks a feature, so later results skip the failing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProviderInfo {
    /// The driver does not implement the primary-key catalog function.
    pub no_primary_keys: bool,
    /// The driver does not report the SQL Server column-key attribute.
    pub no_column_key: bool,
    /// The driver does not report the SQL Server hidden-column attribute.
    pub no_hidden_columns: bool,
}

impl ProviderInfo {
    /// Capabilities of a driver without SQL Server extensions.
    pub fn generic() -> Self {
        Self {
            no_primary_keys: false,
            no_column_key: true,
            no_hidden_columns: true,
        }
    }
}

/// Cooperative cancellation token.
///
/// Clones share one flag. The reader checks it before each native data
/// call; a canceled reader reports no further rows.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Options for opening a [`DataReader`](crate::DataReader).
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Command behavior flags.
    pub behavior: CommandBehavior,
    /// Scratch buffer size in bytes.
    pub buffer_capacity: usize,
    /// Identifier quote character of the data source.
    pub quote_char: char,
    /// Consecutive failed result advances tolerated while draining results.
    pub max_consecutive_failures: u32,
    /// Driver capabilities.
    pub provider: ProviderInfo,
    /// Shared type registry.
    pub registry: Arc<TypeRegistry>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderOptions {
    /// Create options with the default behavior.
    pub fn new() -> Self {
        Self {
            behavior: CommandBehavior::DEFAULT,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            quote_char: '"',
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            provider: ProviderInfo::default(),
            registry: Arc::new(TypeRegistry::new()),
        }
    }

    /// Set the command behavior.
    ///
    /// # Example
    ///
    /// ```
    /// use odbc_reader_rs::{CommandBehavior, ReaderOptions};
    ///
    /// let options = ReaderOptions::new()
    ///     .with_behavior(CommandBehavior::SEQUENTIAL_ACCESS | CommandBehavior::KEY_INFO);
    /// assert!(options.behavior.contains(CommandBehavior::KEY_INFO));
    /// ```
    pub fn with_behavior(mut self, behavior: CommandBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Set the scratch buffer size. Values below the minimum are rejected
    /// when the reader opens.
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn with_quote_char(mut self, quote_char: char) -> Self {
        self.quote_char = quote_char;
        self
    }

    /// Set the bound on consecutive failed result advances.
    pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = max;
        self
    }

    pub fn with_provider(mut self, provider: ProviderInfo) -> Self {
        self.provider = provider;
        self
    }

    /// Share an existing registry.
    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.buffer_capacity < MIN_CAPACITY {
            return Err(Error::out_of_range(
                "buffer_capacity",
                self.buffer_capacity as i64,
            ));
        }
        if self.max_consecutive_failures == 0 {
            return Err(Error::out_of_range("max_consecutive_failures", 0));
        }
        Ok(())
    }
}
