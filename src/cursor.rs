//! Driver-facing traits.
//!
//! A driver exposes a query's result as a [`Cursor`]: a forward-only
//! handle that yields one [`RowHandle`] per row and describes its columns
//! through [`CursorMetadata`]. Column positions are 1-based throughout.
//!
//! Accessors follow the usual driver contract: primitive accessors
//! (`read_short`, `read_int`, `read_float`, `read_double`, `read_boolean`)
//! cannot express NULL and return the type's zero for it, while object
//! accessors return `None`. `read_raw` returns the cell unconverted.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::error::DriverError;
use crate::value::Value;

/// Result type for driver calls.
pub type DriverResult<T> = Result<T, DriverError>;

/// Column descriptions for an open cursor.
pub trait CursorMetadata {
    fn column_count(&self) -> DriverResult<usize>;
    fn column_label(&self, position: usize) -> DriverResult<String>;
    fn column_name(&self, position: usize) -> DriverResult<String>;
    fn column_type(&self, position: usize) -> DriverResult<i32>;
    fn column_display_size(&self, position: usize) -> DriverResult<u32>;
}

/// One fetched row.
pub trait RowHandle {
    /// The cell as the driver holds it.
    fn read_raw(&self, position: usize) -> DriverResult<Value>;

    fn read_short(&self, position: usize) -> DriverResult<i16>;
    fn read_int(&self, position: usize) -> DriverResult<i32>;
    fn read_float(&self, position: usize) -> DriverResult<f32>;
    fn read_double(&self, position: usize) -> DriverResult<f64>;
    fn read_boolean(&self, position: usize) -> DriverResult<bool>;

    fn read_string(&self, position: usize) -> DriverResult<Option<String>>;
    fn read_big_decimal(&self, position: usize) -> DriverResult<Option<Decimal>>;
    fn read_date(&self, position: usize) -> DriverResult<Option<NaiveDate>>;
    fn read_time(&self, position: usize) -> DriverResult<Option<NaiveTime>>;
    fn read_timestamp(&self, position: usize) -> DriverResult<Option<NaiveDateTime>>;
    fn read_bytes(&self, position: usize) -> DriverResult<Option<Vec<u8>>>;

    /// Long character data. Drivers without a separate path read it as a string.
    fn read_big_string(&self, position: usize) -> DriverResult<Option<String>> {
        self.read_string(position)
    }
}

/// A forward-only result cursor.
pub trait Cursor {
    type Row: RowHandle;
    type Metadata: CursorMetadata;

    /// Advance to the next row, or `None` once the result is exhausted.
    fn fetch_next(&mut self) -> DriverResult<Option<Self::Row>>;

    fn metadata(&self) -> DriverResult<Self::Metadata>;

    /// Release the cursor.
    fn close(&mut self) -> DriverResult<()>;
}

impl<C: Cursor + ?Sized> Cursor for &mut C {
    type Row = C::Row;
    type Metadata = C::Metadata;

    fn fetch_next(&mut self) -> DriverResult<Option<Self::Row>> {
        (**self).fetch_next()
    }

    fn metadata(&self) -> DriverResult<Self::Metadata> {
        (**self).metadata()
    }

    fn close(&mut self) -> DriverResult<()> {
        (**self).close()
    }
}

impl<C: Cursor + ?Sized> Cursor for Box<C> {
    type Row = C::Row;
    type Metadata = C::Metadata;

    fn fetch_next(&mut self) -> DriverResult<Option<Self::Row>> {
        (**self).fetch_next()
    }

    fn metadata(&self) -> DriverResult<Self::Metadata> {
        (**self).metadata()
    }

    fn close(&mut self) -> DriverResult<()> {
        (**self).close()
    }
}
