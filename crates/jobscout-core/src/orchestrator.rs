//! Collection orchestrator: runs every enabled source for every query,
//! normalizes and deduplicates the results, and feeds the sink.
//!
//! # Per-query state machine
//!
//! ```text
//! START -> RUN_SOURCE(i) -> COLLECT -> DEDUP_AND_EMIT -+-> RUN_SOURCE(i+1)
//!              |                                        |
//!              +--[blocked / failed: count, skip]-------+-> QUERY_DONE
//!
//! after the last query (or cancellation): FINALIZE (run stats, exactly once)
//! ```
//!
//! Failures never escape a query. A blocked or failing source is counted and
//! skipped; anything else going wrong inside a query, panics included, is
//! counted as an error at the query boundary and the run moves on.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use chrono::Utc;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{AppError, SourceError};
use crate::fingerprint::{Fingerprint, SeenSet};
use crate::governor::{GovernorConfig, RateGovernor};
use crate::models::{Candidate, OutputRecord, RequiredField, RunStats, Source};
use crate::normalize::{SkillMatcher, normalize_raw};
use crate::traits::{SearchRequest, Sink, SourceAdapter};

/// Events emitted by the orchestrator for monitoring/logging.
#[derive(Debug, Clone)]
pub enum RunEvent<'a> {
    RunStarted {
        run_id: Uuid,
        queries: usize,
        sources: usize,
    },
    QueryStarted {
        query: &'a str,
    },
    SourceStarted {
        query: &'a str,
        source: Source,
    },
    SourceCollected {
        query: &'a str,
        source: Source,
        raw_count: usize,
    },
    SourceBlocked {
        query: &'a str,
        source: Source,
        reason: &'a str,
    },
    SourceFailed {
        query: &'a str,
        source: Source,
        error: &'a str,
    },
    RecordDropped {
        source: Source,
        missing: RequiredField,
    },
    DuplicateSkipped {
        source: Source,
        fingerprint: &'a Fingerprint,
    },
    RecordSaved {
        source: Source,
        fingerprint: &'a Fingerprint,
    },
    QueryAborted {
        query: &'a str,
        error: &'a str,
    },
    SourcesSkipped {
        query: &'a str,
        remaining_sources: usize,
    },
    Cancelled {
        remaining_queries: usize,
    },
    RunFinished {
        run_id: Uuid,
        stats: &'a RunStats,
    },
}

/// Trait for receiving run events (decoupled logging).
pub trait RunReporter: Send + Sync {
    fn report(&self, event: RunEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRunReporter;

impl RunReporter for TracingRunReporter {
    fn report(&self, event: RunEvent<'_>) {
        match event {
            RunEvent::RunStarted {
                run_id,
                queries,
                sources,
            } => {
                tracing::info!(%run_id, %queries, %sources, "Run started");
            }
            RunEvent::QueryStarted { query } => {
                tracing::info!(%query, "Processing query");
            }
            RunEvent::SourceStarted { query, source } => {
                tracing::debug!(%query, %source, "Collecting from source");
            }
            RunEvent::SourceCollected {
                query,
                source,
                raw_count,
            } => {
                tracing::info!(%query, %source, %raw_count, "Source returned listings");
            }
            RunEvent::SourceBlocked {
                query,
                source,
                reason,
            } => {
                tracing::warn!(%query, %source, %reason, "Source blocked, skipping for this query");
            }
            RunEvent::SourceFailed {
                query,
                source,
                error,
            } => {
                tracing::warn!(%query, %source, %error, "Source failed, skipping for this query");
            }
            RunEvent::RecordDropped { source, missing } => {
                tracing::debug!(%source, %missing, "Dropping listing with missing field");
            }
            RunEvent::DuplicateSkipped {
                source,
                fingerprint,
            } => {
                tracing::debug!(%source, fingerprint = %&fingerprint.as_str()[..8], "Duplicate listing");
            }
            RunEvent::RecordSaved {
                source,
                fingerprint,
            } => {
                tracing::debug!(%source, fingerprint = %&fingerprint.as_str()[..8], "Listing saved");
            }
            RunEvent::QueryAborted { query, error } => {
                tracing::error!(%query, %error, "Query aborted");
            }
            RunEvent::SourcesSkipped {
                query,
                remaining_sources,
            } => {
                tracing::warn!(%query, %remaining_sources, "Run cancelled, skipping remaining sources");
            }
            RunEvent::Cancelled { remaining_queries } => {
                tracing::warn!(%remaining_queries, "Run cancelled, skipping remaining queries");
            }
            RunEvent::RunFinished { run_id, stats } => {
                tracing::info!(
                    %run_id,
                    saved = stats.saved,
                    duplicates = stats.duplicates,
                    errors = stats.errors,
                    blocked_events = stats.blocked_events,
                    "Run finished"
                );
            }
        }
    }
}

/// Mutable state of one run: fingerprints seen so far and the counters.
///
/// Owned by the caller of [`Orchestrator::run_with_context`] for the whole
/// run and discarded afterwards; nothing survives into the next run.
#[derive(Debug, Default)]
pub struct RunContext {
    pub seen: SeenSet,
    pub stats: RunStats,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Drives the enabled source adapters for each query and feeds the sink.
pub struct Orchestrator<S: Sink> {
    adapters: Vec<Box<dyn SourceAdapter>>,
    sink: S,
    skills: SkillMatcher,
    governor: GovernorConfig,
    cancel: CancellationToken,
}

impl<S: Sink> Orchestrator<S> {
    /// Create an orchestrator with no sources. Each source later added with
    /// [`with_adapter`](Self::with_adapter) gets its own governor built from
    /// `governor`.
    pub fn new(sink: S, skills: SkillMatcher, governor: GovernorConfig) -> Self {
        Self {
            adapters: Vec::new(),
            sink,
            skills,
            governor,
            cancel: CancellationToken::new(),
        }
    }

    /// Register a source. Sources run in registration order.
    pub fn with_adapter(mut self, adapter: impl SourceAdapter + 'static) -> Self {
        self.adapters.push(Box::new(adapter));
        self
    }

    pub fn with_boxed_adapter(mut self, adapter: Box<dyn SourceAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// Stop starting new queries and sources once `token` is cancelled.
    /// The final stats record is still written.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sources(&self) -> Vec<Source> {
        self.adapters.iter().map(|a| a.source()).collect()
    }

    /// Run all queries with a fresh context and return the final counters.
    pub async fn run<R: RunReporter>(
        &self,
        requests: &[SearchRequest],
        reporter: &R,
    ) -> Result<RunStats, AppError> {
        let mut ctx = RunContext::new();
        self.run_with_context(requests, &mut ctx, reporter).await
    }

    /// Run all queries against a caller-owned context.
    ///
    /// Only fails if the final stats record cannot be written; every other
    /// failure is folded into the counters.
    pub async fn run_with_context<R: RunReporter>(
        &self,
        requests: &[SearchRequest],
        ctx: &mut RunContext,
        reporter: &R,
    ) -> Result<RunStats, AppError> {
        let run_id = Uuid::new_v4();
        reporter.report(RunEvent::RunStarted {
            run_id,
            queries: requests.len(),
            sources: self.adapters.len(),
        });

        // One governor per source, alive for the whole run.
        let mut governors: Vec<RateGovernor> = self
            .adapters
            .iter()
            .map(|_| RateGovernor::new(self.governor.clone()))
            .collect();

        for (idx, request) in requests.iter().enumerate() {
            if self.cancel.is_cancelled() {
                reporter.report(RunEvent::Cancelled {
                    remaining_queries: requests.len() - idx,
                });
                break;
            }

            reporter.report(RunEvent::QueryStarted {
                query: &request.query,
            });

            let outcome = AssertUnwindSafe(self.run_query(request, ctx, &mut governors, reporter))
                .catch_unwind()
                .await;

            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(panic) => panic_message(panic.as_ref()),
            };
            ctx.stats.errors += 1;
            reporter.report(RunEvent::QueryAborted {
                query: &request.query,
                error: &error,
            });
        }

        // FINALIZE
        let stats = ctx.stats;
        reporter.report(RunEvent::RunFinished {
            run_id,
            stats: &stats,
        });
        self.sink
            .append(&OutputRecord::Stats { run_stats: stats })
            .await?;

        Ok(stats)
    }

    async fn run_query<R: RunReporter>(
        &self,
        request: &SearchRequest,
        ctx: &mut RunContext,
        governors: &mut [RateGovernor],
        reporter: &R,
    ) -> Result<(), AppError> {
        let query = request.query.as_str();

        let total = self.adapters.len();
        for (idx, (adapter, governor)) in self.adapters.iter().zip(governors.iter_mut()).enumerate() {
            if self.cancel.is_cancelled() {
                reporter.report(RunEvent::SourcesSkipped {
                    query,
                    remaining_sources: total - idx,
                });
                break;
            }

            // RUN_SOURCE
            let source = adapter.source();
            reporter.report(RunEvent::SourceStarted { query, source });

            let raw = match adapter.collect(request, governor).await {
                Ok(raw) => raw,
                Err(SourceError::Blocked { reason }) => {
                    ctx.stats.blocked_events += 1;
                    reporter.report(RunEvent::SourceBlocked {
                        query,
                        source,
                        reason: &reason,
                    });
                    continue;
                }
                Err(SourceError::Failed(e)) => {
                    ctx.stats.errors += 1;
                    let error = e.to_string();
                    reporter.report(RunEvent::SourceFailed {
                        query,
                        source,
                        error: &error,
                    });
                    continue;
                }
            };
            reporter.report(RunEvent::SourceCollected {
                query,
                source,
                raw_count: raw.len(),
            });

            // COLLECT
            let candidates: Vec<Candidate> = raw
                .into_iter()
                .map(|job| normalize_raw(job, source, &self.skills, Utc::now()))
                .collect();

            // DEDUP_AND_EMIT
            for candidate in candidates {
                self.emit(candidate, ctx, reporter).await?;
            }
        }

        Ok(())
    }

    async fn emit<R: RunReporter>(
        &self,
        candidate: Candidate,
        ctx: &mut RunContext,
        reporter: &R,
    ) -> Result<(), AppError> {
        let source = candidate.source;
        let record = match candidate.into_record() {
            Ok(record) => record,
            Err(missing) => {
                reporter.report(RunEvent::RecordDropped { source, missing });
                return Ok(());
            }
        };

        let fingerprint = Fingerprint::of(&record);
        if ctx.seen.contains(&fingerprint) {
            ctx.stats.duplicates += 1;
            reporter.report(RunEvent::DuplicateSkipped {
                source,
                fingerprint: &fingerprint,
            });
            return Ok(());
        }

        // A listing enters the seen set only once it is written.
        self.sink.append(&OutputRecord::Job(record)).await?;
        ctx.seen.insert(fingerprint.clone());
        ctx.stats.saved += 1;
        reporter.report(RunEvent::RecordSaved {
            source,
            fingerprint: &fingerprint,
        });
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: <non-string payload>".to_string()
    }
}
