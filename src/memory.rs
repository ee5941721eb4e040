//! In-memory cursor over a JSON fixture.
//!
//! A fixture names its columns and lists its rows as JSON cells:
//!
//! ```json
//! {
//!   "columns": [
//!     { "label": "ID", "type": 4 },
//!     { "label": "NAME", "name": "name", "type": 12, "display_size": 40 }
//!   ],
//!   "rows": [[1, "ada"], [2, null]]
//! }
//! ```
//!
//! Accessors convert cells the way a lenient driver does: numeric text is
//! accepted by numeric accessors, temporal cells are ISO-8601 strings, and
//! byte cells are arrays of integers or plain strings.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value as Json;
use std::collections::VecDeque;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::cursor::{Cursor, CursorMetadata, DriverResult, RowHandle};
use crate::error::{BridgeError, BridgeResult};
use crate::value::Value;

/// Driver-side failures of the in-memory cursor.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("cursor is closed")]
    Closed,

    #[error("no column at position {0}")]
    NoSuchColumn(usize),

    #[error("cannot read {found} at position {position} as {expected}")]
    Mismatch {
        position: usize,
        expected: &'static str,
        found: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureColumn {
    pub label: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub type_code: i32,
    #[serde(default)]
    pub display_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    pub columns: Vec<FixtureColumn>,
    #[serde(default)]
    pub rows: Vec<Vec<Json>>,
}

/// A [`Cursor`] that serves rows from a [`Fixture`].
#[derive(Debug)]
pub struct MemoryCursor {
    columns: Arc<Vec<FixtureColumn>>,
    rows: VecDeque<Vec<Json>>,
    closed: bool,
}

impl MemoryCursor {
    pub fn new(fixture: Fixture) -> BridgeResult<Self> {
        let width = fixture.columns.len();
        if let Some((i, row)) = fixture.rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(BridgeError::Config(format!(
                "Fixture row {} has {} cells, expected {}",
                i + 1,
                row.len(),
                width
            )));
        }

        Ok(Self {
            columns: Arc::new(fixture.columns),
            rows: fixture.rows.into(),
            closed: false,
        })
    }

    pub fn from_json(json: &Json) -> BridgeResult<Self> {
        let fixture: Fixture = serde_json::from_value(json.clone())?;
        Self::new(fixture)
    }

    pub fn from_path(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let fixture: Fixture = serde_json::from_str(&content)?;
        Self::new(fixture)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Cursor for MemoryCursor {
    type Row = MemoryRow;
    type Metadata = MemoryMetadata;

    fn fetch_next(&mut self) -> DriverResult<Option<MemoryRow>> {
        if self.closed {
            return Err(MemoryError::Closed.into());
        }
        Ok(self.rows.pop_front().map(|cells| MemoryRow { cells }))
    }

    fn metadata(&self) -> DriverResult<MemoryMetadata> {
        if self.closed {
            return Err(MemoryError::Closed.into());
        }
        Ok(MemoryMetadata {
            columns: Arc::clone(&self.columns),
        })
    }

    fn close(&mut self) -> DriverResult<()> {
        if self.closed {
            return Err(MemoryError::Closed.into());
        }
        self.closed = true;
        self.rows.clear();
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MemoryMetadata {
    columns: Arc<Vec<FixtureColumn>>,
}

impl MemoryMetadata {
    fn column(&self, position: usize) -> Result<&FixtureColumn, MemoryError> {
        position
            .checked_sub(1)
            .and_then(|i| self.columns.get(i))
            .ok_or(MemoryError::NoSuchColumn(position))
    }
}

impl CursorMetadata for MemoryMetadata {
    fn column_count(&self) -> DriverResult<usize> {
        Ok(self.columns.len())
    }

    fn column_label(&self, position: usize) -> DriverResult<String> {
        Ok(self.column(position)?.label.clone())
    }

    fn column_name(&self, position: usize) -> DriverResult<String> {
        let column = self.column(position)?;
        Ok(column.name.clone().unwrap_or_else(|| column.label.clone()))
    }

    fn column_type(&self, position: usize) -> DriverResult<i32> {
        Ok(self.column(position)?.type_code)
    }

    fn column_display_size(&self, position: usize) -> DriverResult<u32> {
        let column = self.column(position)?;
        Ok(column.display_size.unwrap_or(column.label.len() as u32))
    }
}

/// One fetched fixture row.
#[derive(Debug, Clone)]
pub struct MemoryRow {
    cells: Vec<Json>,
}

impl MemoryRow {
    fn cell(&self, position: usize) -> Result<&Json, MemoryError> {
        position
            .checked_sub(1)
            .and_then(|i| self.cells.get(i))
            .ok_or(MemoryError::NoSuchColumn(position))
    }

    fn mismatch(position: usize, expected: &'static str, found: &Json) -> MemoryError {
        MemoryError::Mismatch {
            position,
            expected,
            found: found.to_string(),
        }
    }

    fn integer<T: TryFrom<i64> + Default>(&self, position: usize, expected: &'static str) -> DriverResult<T> {
        let cell = self.cell(position)?;
        let wide = match cell {
            Json::Null => return Ok(T::default()),
            Json::Number(n) => n.as_i64(),
            Json::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        wide.and_then(|v| T::try_from(v).ok())
            .ok_or_else(|| Self::mismatch(position, expected, cell).into())
    }

    fn float(&self, position: usize, expected: &'static str) -> DriverResult<f64> {
        let cell = self.cell(position)?;
        let value = match cell {
            Json::Null => return Ok(0.0),
            Json::Number(n) => n.as_f64(),
            Json::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        value.ok_or_else(|| Self::mismatch(position, expected, cell).into())
    }

    fn text(&self, position: usize, expected: &'static str) -> DriverResult<Option<&str>> {
        match self.cell(position)? {
            Json::Null => Ok(None),
            Json::String(s) => Ok(Some(s.as_str())),
            other => Err(Self::mismatch(position, expected, other).into()),
        }
    }

    fn parse_temporal<T>(
        &self,
        position: usize,
        expected: &'static str,
        formats: &[&str],
        parse: fn(&str, &str) -> chrono::ParseResult<T>,
    ) -> DriverResult<Option<T>> {
        let Some(s) = self.text(position, expected)? else {
            return Ok(None);
        };
        formats
            .iter()
            .find_map(|fmt| parse(s, fmt).ok())
            .map(Some)
            .ok_or_else(|| Self::mismatch(position, expected, &Json::String(s.to_string())).into())
    }
}

impl RowHandle for MemoryRow {
    fn read_raw(&self, position: usize) -> DriverResult<Value> {
        let cell = self.cell(position)?;
        let value = match cell {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(v) => Value::Long(v),
                None => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Text(s.clone()),
            Json::Array(_) => Value::Bytes(self.read_bytes(position)?.unwrap_or_default()),
            Json::Object(_) => Value::Text(cell.to_string()),
        };
        Ok(value)
    }

    fn read_short(&self, position: usize) -> DriverResult<i16> {
        self.integer(position, "short")
    }

    fn read_int(&self, position: usize) -> DriverResult<i32> {
        self.integer(position, "int")
    }

    fn read_float(&self, position: usize) -> DriverResult<f32> {
        Ok(self.float(position, "float")? as f32)
    }

    fn read_double(&self, position: usize) -> DriverResult<f64> {
        self.float(position, "double")
    }

    fn read_boolean(&self, position: usize) -> DriverResult<bool> {
        let cell = self.cell(position)?;
        match cell {
            Json::Null => Ok(false),
            Json::Bool(b) => Ok(*b),
            Json::Number(n) => Ok(n.as_f64().is_some_and(|v| v != 0.0)),
            Json::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "t" | "true" | "1" | "y" | "yes" => Ok(true),
                "f" | "false" | "0" | "n" | "no" => Ok(false),
                _ => Err(Self::mismatch(position, "boolean", cell).into()),
            },
            _ => Err(Self::mismatch(position, "boolean", cell).into()),
        }
    }

    fn read_string(&self, position: usize) -> DriverResult<Option<String>> {
        let cell = self.cell(position)?;
        Ok(match cell {
            Json::Null => None,
            Json::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
    }

    fn read_big_decimal(&self, position: usize) -> DriverResult<Option<Decimal>> {
        let cell = self.cell(position)?;
        let text = match cell {
            Json::Null => return Ok(None),
            Json::Number(n) => n.to_string(),
            Json::String(s) => s.trim().to_string(),
            _ => return Err(Self::mismatch(position, "decimal", cell).into()),
        };
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map(Some)
            .map_err(|_| Self::mismatch(position, "decimal", cell).into())
    }

    fn read_date(&self, position: usize) -> DriverResult<Option<NaiveDate>> {
        self.parse_temporal(position, "date", &["%Y-%m-%d"], NaiveDate::parse_from_str)
    }

    fn read_time(&self, position: usize) -> DriverResult<Option<NaiveTime>> {
        self.parse_temporal(position, "time", &["%H:%M:%S%.f", "%H:%M"], NaiveTime::parse_from_str)
    }

    fn read_timestamp(&self, position: usize) -> DriverResult<Option<NaiveDateTime>> {
        self.parse_temporal(
            position,
            "timestamp",
            &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"],
            NaiveDateTime::parse_from_str,
        )
    }

    fn read_bytes(&self, position: usize) -> DriverResult<Option<Vec<u8>>> {
        let cell = self.cell(position)?;
        match cell {
            Json::Null => Ok(None),
            Json::String(s) => Ok(Some(s.as_bytes().to_vec())),
            Json::Array(items) => items
                .iter()
                .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect::<Option<Vec<u8>>>()
                .map(Some)
                .ok_or_else(|| Self::mismatch(position, "bytes", cell).into()),
            _ => Err(Self::mismatch(position, "bytes", cell).into()),
        }
    }
}
