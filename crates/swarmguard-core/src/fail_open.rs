//! Fail-open helpers for bookkeeping writes
//!
//! Activity logs and similar side channels must never abort a run. Tool
//! execution, loop detection and report writing are not fail-open.

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Run an async bookkeeping operation, logging and swallowing any error
///
/// ```no_run
/// use swarmguard_core::fail_open::fail_open;
/// use swarmguard_core::Result;
///
/// async fn append_log() -> Result<()> {
///     Ok(())
/// }
///
/// async fn example() {
///     let written = fail_open("activity_log", || append_log()).await;
///     assert!(written.is_some());
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}
