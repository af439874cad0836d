use std::future::Future;

use futures::future::BoxFuture;

use crate::error::{AppError, SourceError};
use crate::governor::RateGovernor;
use crate::models::{OutputRecord, RawJob, Source};

/// Fetches raw HTML content from a URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// One search to run against a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub location: Option<String>,
    pub max_results: usize,
}

/// Site-specific extraction capability.
///
/// An adapter paces itself with the supplied governor before each
/// item-level interaction, classifies anti-bot walls as
/// [`SourceError::Blocked`], and returns either the full list of raw
/// listings or a single error, never both.
///
/// Adapters are stored as trait objects by the orchestrator, hence the boxed
/// future rather than `impl Future`.
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> Source;

    fn collect<'a>(
        &'a self,
        request: &'a SearchRequest,
        governor: &'a mut RateGovernor,
    ) -> BoxFuture<'a, Result<Vec<RawJob>, SourceError>>;
}

/// Append-only destination for accepted records and the final run summary.
pub trait Sink: Send + Sync {
    fn append(&self, record: &OutputRecord) -> impl Future<Output = Result<(), AppError>> + Send;
}
