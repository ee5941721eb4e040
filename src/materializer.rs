//! Row materialization engine.
//!
//! [`RowMaterializer`] walks a [`Cursor`] one row at a time, reads each
//! column through the accessor its [`SemanticType`] calls for, and
//! assembles the coerced values into a labeled [`Row`].
//!
//! ```text
//!            advance() -> Some(row)
//!              +------+
//!              v      |
//!   new --> [Ready] --+-- advance() -> None ----------> [Exhausted]
//!              |
//!              +------- fetch / coercion error -------> [Failed]
//!
//!   any state -- close() --> [Closed]
//! ```
//!
//! Terminal states never touch the cursor again: `Exhausted` keeps
//! answering `None`, `Failed` keeps re-reporting the original error.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::catalog::ColumnCatalog;
use crate::cursor::{Cursor, DriverResult, RowHandle};
use crate::error::{BridgeError, BridgeResult};
use crate::row::{ResultObject, Row};
use crate::types::{SemanticType, TypeMap};
use crate::value::Value;

/// Where a materializer is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Ready,
    Exhausted,
    Failed,
    Closed,
}

#[derive(Debug, Clone)]
struct ColumnPlan {
    position: usize,
    label: String,
    semantic: SemanticType,
    /// Index of the first column carrying this label.
    slot: usize,
}

/// Forward-only reader that turns cursor rows into [`Row`]s.
pub struct RowMaterializer<C: Cursor> {
    cursor: C,
    catalog: Arc<ColumnCatalog>,
    plan: Vec<ColumnPlan>,
    width: usize,
    state: State,
    failure: Option<String>,
    rows_read: u64,
}

impl<C: Cursor> RowMaterializer<C> {
    /// Bind a cursor to its catalog using the standard type table.
    pub fn new(cursor: C, catalog: impl Into<Arc<ColumnCatalog>>) -> Self {
        Self::with_type_map(cursor, catalog, &TypeMap::standard())
    }

    /// Bind a cursor to its catalog, resolving columns through `types`.
    pub fn with_type_map(
        cursor: C,
        catalog: impl Into<Arc<ColumnCatalog>>,
        types: &TypeMap,
    ) -> Self {
        let catalog = catalog.into();
        let mut slots: HashMap<&str, usize> = HashMap::with_capacity(catalog.len());
        let plan: Vec<ColumnPlan> = catalog
            .iter()
            .map(|column| {
                let next = slots.len();
                ColumnPlan {
                    position: column.position,
                    label: column.label.clone(),
                    semantic: types.resolve(column.type_code),
                    slot: *slots.entry(column.label.as_str()).or_insert(next),
                }
            })
            .collect();
        let width = slots.len();

        Self {
            cursor,
            catalog,
            plan,
            width,
            state: State::Ready,
            failure: None,
            rows_read: 0,
        }
    }

    /// Build the catalog from the cursor's own metadata, then bind.
    pub fn open(cursor: C, types: &TypeMap) -> BridgeResult<Self> {
        let metadata = cursor.metadata().map_err(BridgeError::Metadata)?;
        let catalog = ColumnCatalog::build(&metadata)?;
        Ok(Self::with_type_map(cursor, catalog, types))
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn catalog(&self) -> &Arc<ColumnCatalog> {
        &self.catalog
    }

    /// Semantic type chosen for each column, in column order.
    pub fn semantic_types(&self) -> Vec<SemanticType> {
        self.plan.iter().map(|c| c.semantic).collect()
    }

    /// Number of rows returned so far.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Read the next row.
    ///
    /// Returns `Ok(None)` once the cursor is exhausted, and keeps doing so.
    /// Any error moves the materializer to [`State::Failed`]; the row that
    /// caused it has already been consumed from the cursor.
    pub fn advance(&mut self) -> BridgeResult<Option<Row>> {
        match self.state {
            State::Ready => {}
            State::Exhausted => return Ok(None),
            State::Failed => {
                return Err(BridgeError::Failed(self.failure.clone().unwrap_or_default()));
            }
            State::Closed => return Err(BridgeError::Closed),
        }

        let handle = match self.cursor.fetch_next() {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                debug!("Cursor exhausted after {} rows", self.rows_read);
                self.state = State::Exhausted;
                return Ok(None);
            }
            Err(e) => return Err(self.fail(BridgeError::Fetch(e))),
        };

        match assemble(&handle, &self.plan, self.width) {
            Ok(row) => {
                self.rows_read += 1;
                trace!("Materialized row {}", self.rows_read);
                Ok(Some(row))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Drain every remaining row, or return the first error.
    pub fn consume_all(&mut self) -> BridgeResult<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.advance()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Drain every remaining row together with the column labels and type codes.
    pub fn to_object(&mut self) -> BridgeResult<ResultObject> {
        let rows = self.consume_all()?;
        Ok(ResultObject {
            labels: self.catalog.labels(),
            types: self.catalog.type_codes(),
            rows,
        })
    }

    /// Release the cursor. Calling this again is a no-op.
    ///
    /// The materializer counts as closed even if the driver reports an
    /// error, so a failed close is never retried.
    pub fn close(&mut self) -> BridgeResult<()> {
        if self.state == State::Closed {
            return Ok(());
        }
        self.state = State::Closed;
        debug!("Closing cursor after {} rows", self.rows_read);
        self.cursor.close().map_err(|e| {
            warn!("Cursor close failed: {}", e);
            BridgeError::Resource(e)
        })
    }

    fn fail(&mut self, err: BridgeError) -> BridgeError {
        warn!("Result set failed after {} rows: {}", self.rows_read, err);
        self.state = State::Failed;
        self.failure = Some(err.to_string());
        err
    }
}

impl<C: Cursor> Iterator for RowMaterializer<C> {
    type Item = BridgeResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state != State::Ready {
            return None;
        }
        self.advance().transpose()
    }
}

impl<C: Cursor> Drop for RowMaterializer<C> {
    fn drop(&mut self) {
        if self.state != State::Closed {
            warn!(
                "Result set dropped without close ({} rows read, state {:?})",
                self.rows_read, self.state
            );
        }
    }
}

/// Slots are handed out in first-appearance order, so a new label always
/// lands at the end and a repeated one overwrites its first column.
fn assemble<R: RowHandle>(handle: &R, plan: &[ColumnPlan], width: usize) -> BridgeResult<Row> {
    let mut fields: Vec<(String, Value)> = Vec::with_capacity(width);
    for column in plan {
        let value = coerce(handle, column.position, column.semantic)
            .map_err(|e| BridgeError::coercion(column.position, column.label.as_str(), e))?;
        match fields.get_mut(column.slot) {
            Some((_, current)) => *current = value,
            None => fields.push((column.label.clone(), value)),
        }
    }
    Ok(Row::from_fields(fields))
}

/// Read one cell through the accessor for its semantic type.
fn coerce<R: RowHandle>(row: &R, position: usize, semantic: SemanticType) -> DriverResult<Value> {
    let value = match semantic {
        SemanticType::BigDecimal => match row.read_big_decimal(position)? {
            Some(d) => Value::Double(d.to_string().parse::<f64>()?),
            None => Value::Null,
        },
        // Tri-state logicals pass through exactly as the driver holds them.
        SemanticType::Bit => row.read_raw(position)?,
        SemanticType::Date => row.read_date(position)?.map(|d| d.to_string()).into(),
        SemanticType::Time => row.read_time(position)?.map(|t| t.to_string()).into(),
        SemanticType::Timestamp => row.read_timestamp(position)?.map(|ts| ts.to_string()).into(),
        SemanticType::Float => Value::Text(format!("{:.6}", f64::from(row.read_float(position)?))),
        // The int accessor reads NULL as 0, so test the raw cell first.
        SemanticType::Int => {
            if row.read_raw(position)?.is_null() {
                Value::Null
            } else {
                Value::Int(row.read_int(position)?)
            }
        }
        SemanticType::Short => Value::Short(row.read_short(position)?),
        SemanticType::Double => Value::Double(row.read_double(position)?),
        SemanticType::Boolean => Value::Bool(row.read_boolean(position)?),
        SemanticType::BigString => row.read_big_string(position)?.into(),
        SemanticType::Bytes => row.read_bytes(position)?.into(),
        SemanticType::String | SemanticType::Unsupported => row.read_string(position)?.into(),
    };
    Ok(value)
}
