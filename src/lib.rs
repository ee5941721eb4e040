//! # rowbridge — cursor rows as typed records
//!
//! rowbridge sits between a blocking, forward-only result cursor and code
//! that wants labeled rows, synchronously or from async tasks.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use rowbridge::prelude::*;
//!
//! let cursor = MemoryCursor::from_path("users.json")?;
//! let mut rows = RowMaterializer::open(cursor, &TypeMap::standard())?;
//!
//! while let Some(row) = rows.advance()? {
//!     println!("{}", row.to_json());
//! }
//! rows.close()?;
//! ```
//!
//! ## Coercion
//!
//! | Semantic type              | Row value                               |
//! |----------------------------|-----------------------------------------|
//! | `BigDecimal`               | nearest `f64`                           |
//! | `Bit`                      | the driver's raw value, untouched       |
//! | `Date`, `Time`, `Timestamp`| canonical text, or null                 |
//! | `Float`                    | text rounded to 6 decimal places        |
//! | `Int`                      | `i32`, or null when the cell is null    |
//! | anything else              | the type's plain accessor               |

pub mod catalog;
pub mod config;
pub mod cursor;
pub mod error;
pub mod materializer;
pub mod memory;
pub mod row;
pub mod stream;
pub mod types;
pub mod value;

pub mod prelude {
    pub use crate::catalog::{ColumnCatalog, ColumnDescriptor};
    pub use crate::config::BridgeConfig;
    pub use crate::cursor::{Cursor, CursorMetadata, DriverResult, RowHandle};
    pub use crate::error::*;
    pub use crate::materializer::{RowMaterializer, State};
    pub use crate::memory::MemoryCursor;
    pub use crate::row::{ResultObject, Row};
    pub use crate::stream::AsyncRows;
    pub use crate::types::{Dialect, SemanticType, TypeMap};
    pub use crate::value::Value;
}

/// Build the catalog for `cursor` and bind a materializer using `types`.
///
/// # Example
///
/// ```
/// use rowbridge::memory::MemoryCursor;
/// use rowbridge::types::TypeMap;
///
/// let cursor = MemoryCursor::from_json(&serde_json::json!({
///     "columns": [{ "label": "ID", "type": 4 }],
///     "rows": [[1], [null]]
/// }))
/// .unwrap();
/// let mut rows = rowbridge::materialize(cursor, &TypeMap::standard()).unwrap();
/// assert_eq!(rows.consume_all().unwrap().len(), 2);
/// rows.close().unwrap();
/// ```
pub fn materialize<C: cursor::Cursor>(
    cursor: C,
    types: &types::TypeMap,
) -> Result<materializer::RowMaterializer<C>, error::BridgeError> {
    materializer::RowMaterializer::open(cursor, types)
}
