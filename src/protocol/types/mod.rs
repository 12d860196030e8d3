//! Data types for result columns.

mod column;
mod odbc_type;
mod row;
mod type_map;
mod value;

pub use column::{find_by_name, ColumnDescriptor, Nullability};
pub use odbc_type::{CDataType, OdbcType, SqlType};
pub use row::{ColumnSlot, RowCache};
pub use type_map::{Decoder, TypeMapping, TypeRegistry};
pub use value::{Guid, OdbcValue};
