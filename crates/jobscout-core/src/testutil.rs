//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use crate::error::{AppError, SourceError};
use crate::governor::RateGovernor;
use crate::models::{JobRecord, OutputRecord, RawJob, RunStats, Source};
use crate::traits::{Fetcher, SearchRequest, Sink, SourceAdapter};

/// A raw listing with every required field populated.
pub fn raw_job(title: &str, company: &str, location: &str) -> RawJob {
    RawJob {
        job_title: Some(title.to_string()),
        company_name: Some(company.to_string()),
        location: Some(location.to_string()),
        posted_date: Some("2024-01-15".to_string()),
        job_description: Some(format!("{title} at {company}")),
        apply_url: Some(format!(
            "https://jobs.example.com/{}",
            title.to_lowercase().replace(' ', "-")
        )),
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns a configurable response.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns a default HTML string.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    /// URLs requested, in call order.
    pub requested: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self::with_responses(vec![Ok(html.to_string())])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.requested.lock().unwrap().push(url.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("<html><body>default</body></html>".to_string())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockAdapter
// ---------------------------------------------------------------------------

/// Scripted outcome of one [`MockAdapter::collect`] call.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Jobs(Vec<RawJob>),
    Blocked(String),
    Failed(String),
    Panic(String),
}

/// Mock source adapter with scripted outcomes.
///
/// Passes the governor once per returned listing, like a real adapter, and
/// records the governor's gate count after each call.
#[derive(Clone)]
pub struct MockAdapter {
    source: Source,
    responses: Arc<Mutex<Vec<MockResponse>>>,
    fallback: MockResponse,
    calls: Arc<Mutex<Vec<SearchRequest>>>,
    gates_seen: Arc<Mutex<Vec<u64>>>,
}

impl MockAdapter {
    /// Returns `jobs` on every call.
    pub fn always(source: Source, jobs: Vec<RawJob>) -> Self {
        Self::with_responses(source, Vec::new()).fallback(MockResponse::Jobs(jobs))
    }

    pub fn always_blocked(source: Source, reason: &str) -> Self {
        Self::with_responses(source, Vec::new()).fallback(MockResponse::Blocked(reason.into()))
    }

    pub fn always_failing(source: Source, error: &str) -> Self {
        Self::with_responses(source, Vec::new()).fallback(MockResponse::Failed(error.into()))
    }

    /// Pops one response per call; returns no listings once exhausted.
    pub fn with_responses(source: Source, responses: Vec<MockResponse>) -> Self {
        Self {
            source,
            responses: Arc::new(Mutex::new(responses)),
            fallback: MockResponse::Jobs(Vec::new()),
            calls: Arc::new(Mutex::new(Vec::new())),
            gates_seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn fallback(mut self, response: MockResponse) -> Self {
        self.fallback = response;
        self
    }

    pub fn calls(&self) -> Vec<SearchRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn gates_seen(&self) -> Vec<u64> {
        self.gates_seen.lock().unwrap().clone()
    }

    fn next_response(&self) -> MockResponse {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            self.fallback.clone()
        } else {
            responses.remove(0)
        }
    }
}

impl SourceAdapter for MockAdapter {
    fn source(&self) -> Source {
        self.source
    }

    fn collect<'a>(
        &'a self,
        request: &'a SearchRequest,
        governor: &'a mut RateGovernor,
    ) -> BoxFuture<'a, Result<Vec<RawJob>, SourceError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(request.clone());
            let response = self.next_response();
            let result = match response {
                MockResponse::Jobs(jobs) => {
                    for _ in &jobs {
                        governor.gate().await;
                    }
                    Ok(jobs)
                }
                MockResponse::Blocked(reason) => Err(SourceError::blocked(reason)),
                MockResponse::Failed(msg) => Err(SourceError::Failed(AppError::Generic(msg))),
                MockResponse::Panic(msg) => panic!("{msg}"),
            };
            self.gates_seen.lock().unwrap().push(governor.gates());
            result
        })
    }
}

// ---------------------------------------------------------------------------
// MockSink
// ---------------------------------------------------------------------------

/// Mock sink that records appends and can fail on demand.
#[derive(Clone)]
pub struct MockSink {
    records: Arc<Mutex<Vec<OutputRecord>>>,
    job_error: Arc<Mutex<Option<AppError>>>,
    stats_error: Arc<Mutex<Option<AppError>>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            job_error: Arc::new(Mutex::new(None)),
            stats_error: Arc::new(Mutex::new(None)),
        }
    }

    /// The first job append fails with `error`; later ones succeed.
    pub fn with_job_error_once(error: AppError) -> Self {
        let sink = Self::new();
        *sink.job_error.lock().unwrap() = Some(error);
        sink
    }

    /// The run stats append fails with `error`.
    pub fn with_stats_error(error: AppError) -> Self {
        let sink = Self::new();
        *sink.stats_error.lock().unwrap() = Some(error);
        sink
    }

    pub fn records(&self) -> Vec<OutputRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn jobs(&self) -> Vec<JobRecord> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                OutputRecord::Job(job) => Some(job),
                OutputRecord::Stats { .. } => None,
            })
            .collect()
    }

    pub fn stats_records(&self) -> Vec<RunStats> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                OutputRecord::Stats { run_stats } => Some(run_stats),
                OutputRecord::Job(_) => None,
            })
            .collect()
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for MockSink {
    async fn append(&self, record: &OutputRecord) -> Result<(), AppError> {
        let slot = match record {
            OutputRecord::Job(_) => &self.job_error,
            OutputRecord::Stats { .. } => &self.stats_error,
        };
        if let Some(e) = slot.lock().unwrap().take() {
            return Err(e);
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
