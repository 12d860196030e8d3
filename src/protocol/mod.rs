//! Data transfer between the driver and the reader.
//!
//! Everything below the reader's public surface lives here: the scratch
//! buffer every native fetch goes through, the chunk loops for long
//! values, the per-field read logic and the type tables that drive
//! decoding.

pub mod buffer;
pub mod chunk;
pub mod decode;
pub mod field;
pub mod types;

pub use buffer::{FetchOutcome, ScratchBuffer};
pub use chunk::VarKind;
pub use field::{ChunkTransferState, FieldLength};
pub use types::{ColumnDescriptor, OdbcType, OdbcValue, TypeMapping, TypeRegistry};
