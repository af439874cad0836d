//! Anti-bot defense detection.
//!
//! Adapters run every loaded page through [`detect_block`] before parsing it,
//! and map fetch errors through [`classify_fetch_error`]. The orchestrator
//! only ever sees the resulting [`SourceError`] variant.

use jobscout_core::error::{AppError, SourceError};
use jobscout_core::retry::{RetryPolicy, retry_with_backoff};
use jobscout_core::traits::Fetcher;

const BLOCK_MARKERS: &[&str] = &["captcha", "unusual traffic"];

/// Returns the reason if the page is a captcha or traffic wall.
///
/// Matches case-insensitively anywhere in the markup, which also catches
/// captcha iframes through their `src`.
pub fn detect_block(html: &str) -> Option<String> {
    let lowered = html.to_lowercase();
    BLOCK_MARKERS
        .iter()
        .find(|marker| lowered.contains(*marker))
        .map(|marker| format!("page contains '{marker}'"))
}

/// Turn a fetch failure into an adapter outcome.
///
/// 403 and an exhausted 429 are defenses, not transport faults.
pub fn classify_fetch_error(error: AppError) -> SourceError {
    match error {
        AppError::RateLimitExceeded => SourceError::blocked("rate limited (HTTP 429)"),
        AppError::HttpStatus { status: 403, url } => {
            SourceError::blocked(format!("access denied (HTTP 403) for {url}"))
        }
        other => SourceError::Failed(other),
    }
}

/// Fetch `url` with transient retries, then screen the page for a block.
pub(crate) async fn load_page<F: Fetcher>(
    fetcher: &F,
    retry: RetryPolicy,
    url: &str,
) -> Result<String, SourceError> {
    let html = retry_with_backoff(retry, || fetcher.fetch(url))
        .await
        .map_err(classify_fetch_error)?;
    if let Some(reason) = detect_block(&html) {
        tracing::warn!(%url, %reason, "Anti-bot defense detected");
        return Err(SourceError::blocked(reason));
    }
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_captcha_pages() {
        assert!(detect_block("<form id=\"captcha-form\"></form>").is_some());
        assert!(detect_block("<iframe src=\"https://www.google.com/recaptcha/api2\"></iframe>").is_some());
        assert!(
            detect_block("<p>Our systems have detected Unusual Traffic from your network</p>")
                .is_some()
        );
    }

    #[test]
    fn ordinary_pages_pass() {
        assert_eq!(detect_block("<div class=\"job_seen_beacon\">Data Analyst</div>"), None);
        assert_eq!(detect_block(""), None);
    }

    #[test]
    fn classifies_fetch_errors() {
        assert!(classify_fetch_error(AppError::RateLimitExceeded).is_blocked());
        assert!(
            classify_fetch_error(AppError::HttpStatus {
                status: 403,
                url: "https://www.indeed.com/jobs".into(),
            })
            .is_blocked()
        );
        assert!(!classify_fetch_error(AppError::Timeout(30)).is_blocked());
        assert!(
            !classify_fetch_error(AppError::HttpStatus {
                status: 500,
                url: "https://www.indeed.com/jobs".into(),
            })
            .is_blocked()
        );
    }
}
