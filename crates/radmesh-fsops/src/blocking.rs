//! Bridge from async callers to blocking filesystem work.

use crate::error::{FsOpsError, FsOpsResult};

/// Run `work` on the blocking pool and flatten join failures into [`FsOpsError`].
///
/// # Errors
///
/// Returns the error produced by `work`, or [`FsOpsError::Blocking`] when the
/// task panicked or was cancelled.
pub async fn run_blocking<T, F>(operation: &'static str, work: F) -> FsOpsResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> FsOpsResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|source| FsOpsError::Blocking { operation, source })?
}
