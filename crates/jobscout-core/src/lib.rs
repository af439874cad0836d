pub mod config;
pub mod error;
pub mod fingerprint;
pub mod governor;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod retry;
pub mod sink;
pub mod traits;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use config::RunInput;
pub use error::{AppError, SourceError};
pub use fingerprint::{Fingerprint, SeenSet};
pub use governor::{GovernorConfig, RateGovernor};
pub use models::{JobRecord, OutputRecord, RawJob, RunStats, Source, compute_hash};
pub use normalize::{SkillMatcher, SkillSpec};
pub use orchestrator::{Orchestrator, RunContext, RunReporter, TracingRunReporter};
pub use sink::JsonLinesSink;
pub use traits::{Fetcher, SearchRequest, Sink, SourceAdapter};
