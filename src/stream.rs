//! Async access to a materializer.
//!
//! Cursor reads block, so each advance runs on tokio's blocking pool. The
//! materializer sits behind a mutex that the blocking task holds for the
//! whole operation, so advances on one result set never overlap. A caller
//! that stops waiting on `next_row` does not lose the cursor: the abandoned
//! advance finishes on its own and `close` waits for it before releasing
//! the cursor.

use std::sync::{Arc, Mutex, PoisonError, TryLockError};

use futures::stream::{self, Stream};
use tokio::task::JoinError;
use tracing::warn;

use crate::cursor::Cursor;
use crate::error::{BridgeError, BridgeResult};
use crate::materializer::{RowMaterializer, State};
use crate::row::{ResultObject, Row};

/// Async wrapper around a [`RowMaterializer`].
pub struct AsyncRows<C>
where
    C: Cursor + Send + 'static,
{
    inner: Arc<Mutex<RowMaterializer<C>>>,
}

impl<C> AsyncRows<C>
where
    C: Cursor + Send + 'static,
{
    pub fn new(materializer: RowMaterializer<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(materializer)),
        }
    }

    /// Current state. An abandoned advance that is still running reports `Ready`.
    pub fn state(&self) -> State {
        match self.inner.try_lock() {
            Ok(guard) => guard.state(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().state(),
            Err(TryLockError::WouldBlock) => State::Ready,
        }
    }

    /// Run `op` against the materializer on the blocking pool.
    async fn run<T, F>(&mut self, op: F) -> BridgeResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut RowMaterializer<C>) -> BridgeResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut guard = inner
                .lock()
                .map_err(|_| BridgeError::Failed("an earlier advance panicked".to_string()))?;
            op(&mut *guard)
        })
        .await
        .map_err(join_error)?
    }

    /// Read the next row; `Ok(None)` once the cursor is exhausted.
    pub async fn next_row(&mut self) -> BridgeResult<Option<Row>> {
        self.run(RowMaterializer::advance).await
    }

    /// Drain every remaining row.
    pub async fn collect_all(&mut self) -> BridgeResult<Vec<Row>> {
        self.run(RowMaterializer::consume_all).await
    }

    /// Drain every remaining row with the column labels and type codes.
    pub async fn to_object(&mut self) -> BridgeResult<ResultObject> {
        self.run(RowMaterializer::to_object).await
    }

    /// Release the cursor. Closing twice is a no-op.
    ///
    /// Waits for any advance still running, including one whose future was
    /// dropped, and closes the cursor even after a panicked advance.
    pub async fn close(&mut self) -> BridgeResult<()> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut guard = inner.lock().unwrap_or_else(PoisonError::into_inner);
            guard.close()
        })
        .await
        .map_err(join_error)?
    }

    /// Turn the rows into a stream ending after exhaustion or the first error.
    ///
    /// The cursor is closed as the stream ends. A close failure after
    /// exhaustion is yielded as the last item; after a read error only the
    /// read error is yielded.
    pub fn into_stream(self) -> impl Stream<Item = BridgeResult<Row>> {
        stream::unfold(Some(self), |slot| async move {
            let Some(mut rows) = slot else {
                return None;
            };
            match rows.next_row().await {
                Ok(Some(row)) => Some((Ok(row), Some(rows))),
                Ok(None) => match rows.close().await {
                    Ok(()) => None,
                    Err(e) => Some((Err(e), None)),
                },
                Err(e) => {
                    // Close failures are logged by the materializer.
                    let _ = rows.close().await;
                    Some((Err(e), None))
                }
            }
        })
    }

    /// Like [`AsyncRows::into_stream`], but hands the wrapper to `finish`
    /// once the stream ends instead of closing it. The caller closes it.
    pub fn into_stream_with<F>(self, finish: F) -> impl Stream<Item = BridgeResult<Row>>
    where
        F: FnOnce(AsyncRows<C>) + Send + 'static,
    {
        stream::unfold(Some((self, Some(finish))), |slot| async move {
            let Some((mut rows, mut finish)) = slot else {
                return None;
            };
            match rows.next_row().await {
                Ok(Some(row)) => Some((Ok(row), Some((rows, finish)))),
                Ok(None) => {
                    if let Some(finish) = finish.take() {
                        finish(rows);
                    }
                    None
                }
                Err(e) => {
                    if let Some(finish) = finish.take() {
                        finish(rows);
                    }
                    Some((Err(e), None))
                }
            }
        })
    }
}

fn join_error(e: JoinError) -> BridgeError {
    warn!("Blocking task did not complete: {}", e);
    BridgeError::Join(e.to_string())
}

impl<C> From<RowMaterializer<C>> for AsyncRows<C>
where
    C: Cursor + Send + 'static,
{
    fn from(materializer: RowMaterializer<C>) -> Self {
        Self::new(materializer)
    }
}
