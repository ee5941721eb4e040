//! Column catalog built from cursor metadata.

use serde::Serialize;
use tracing::debug;

use crate::cursor::CursorMetadata;
use crate::error::{BridgeError, BridgeResult};

/// Static description of one result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    /// 1-based position in the cursor.
    pub position: usize,
    pub label: String,
    pub name: String,
    pub type_code: i32,
    pub display_size: u32,
}

/// The ordered columns of one cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnCatalog {
    columns: Vec<ColumnDescriptor>,
}

impl ColumnCatalog {
    /// Read every column description from `metadata`, positions `1..=count`.
    ///
    /// Fails as a whole on the first accessor error.
    pub fn build<M: CursorMetadata + ?Sized>(metadata: &M) -> BridgeResult<Self> {
        let count = metadata.column_count().map_err(BridgeError::Metadata)?;
        let mut columns = Vec::with_capacity(count);

        for position in 1..=count {
            columns.push(ColumnDescriptor {
                position,
                label: metadata.column_label(position).map_err(BridgeError::Metadata)?,
                name: metadata.column_name(position).map_err(BridgeError::Metadata)?,
                type_code: metadata.column_type(position).map_err(BridgeError::Metadata)?,
                display_size: metadata
                    .column_display_size(position)
                    .map_err(BridgeError::Metadata)?,
            });
        }

        debug!("Built column catalog with {} columns", columns.len());
        Ok(Self { columns })
    }

    /// Column at a 1-based position.
    pub fn get(&self, position: usize) -> Option<&ColumnDescriptor> {
        position.checked_sub(1).and_then(|i| self.columns.get(i))
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnDescriptor> {
        self.columns.iter()
    }

    pub fn labels(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.label.clone()).collect()
    }

    pub fn type_codes(&self) -> Vec<i32> {
        self.columns.iter().map(|c| c.type_code).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<'a> IntoIterator for &'a ColumnCatalog {
    type Item = &'a ColumnDescriptor;
    type IntoIter = std::slice::Iter<'a, ColumnDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}
