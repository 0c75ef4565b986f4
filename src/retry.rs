use std::future::Future;

use log::warn;

use crate::error::DownloadError;

/// Retry a transport call up to `attempt_limit` total invocations.
///
/// Any error (timeout or otherwise) triggers another attempt; once the limit
/// is spent the caller gets a single `RetriesExhausted`. Applied at the
/// transport boundary only, so a failed image download surfaces as one image
/// failure and never aborts its chapter.
pub async fn with_retry<T, F, Fut>(
    mut op: F,
    attempt_limit: u32,
    context: &str,
) -> Result<T, DownloadError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DownloadError>>,
{
    for attempt in 1..=attempt_limit {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => warn!(
                "attempt {attempt}/{attempt_limit} for {context} failed ({}): {e}",
                e.kind()
            ),
        }
    }
    Err(DownloadError::RetriesExhausted {
        attempts: attempt_limit,
        context: context.to_string(),
    })
}
