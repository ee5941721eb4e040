//! Error types for rowbridge.

use thiserror::Error;

/// An error raised by the driver behind a cursor.
///
/// Drivers are external collaborators, so their errors are carried as-is.
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for rowbridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Building the column catalog failed.
    #[error("Metadata error: {0}")]
    Metadata(#[source] DriverError),

    /// The cursor could not advance.
    #[error("Fetch error: {0}")]
    Fetch(#[source] DriverError),

    /// A column value could not be converted to its semantic type.
    #[error("Coercion error in column '{label}' (position {position}): {source}")]
    Coercion {
        position: usize,
        label: String,
        #[source]
        source: DriverError,
    },

    /// Releasing the cursor failed.
    #[error("Resource error: {0}")]
    Resource(#[source] DriverError),

    /// The materializer already failed; carries the original message.
    #[error("Result set failed earlier: {0}")]
    Failed(String),

    /// The materializer was closed.
    #[error("Result set is closed")]
    Closed,

    /// A blocking advance could not be joined.
    #[error("Blocking task failed: {0}")]
    Join(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Create a coercion error for a column.
    pub fn coercion(position: usize, label: impl Into<String>, source: impl Into<DriverError>) -> Self {
        Self::Coercion {
            position,
            label: label.into(),
            source: source.into(),
        }
    }

    /// Whether this error leaves the materializer permanently unusable.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Fetch(_) | Self::Coercion { .. } | Self::Failed(_) | Self::Closed | Self::Join(_)
        )
    }
}

/// Result type alias for rowbridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
