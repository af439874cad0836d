use futures::future::BoxFuture;
use jobscout_core::error::{AppError, SourceError};
use jobscout_core::governor::RateGovernor;
use jobscout_core::models::{RawJob, Source};
use jobscout_core::retry::RetryPolicy;
use jobscout_core::traits::{Fetcher, SearchRequest, SourceAdapter};
use scraper::{Html, Selector};
use url::Url;

use crate::block::load_page;
use crate::html::{first_attr, first_text, selector, split_cards};

const SEARCH_URL: &str = "https://www.google.com/search";
const CARD: &str = r#"div[jscontroller="r7KRvb"]"#;

struct CardSelectors {
    title: Selector,
    company: Selector,
    location: Selector,
    posted: Selector,
    description: Selector,
    apply: Selector,
}

impl CardSelectors {
    fn new() -> Result<Self, AppError> {
        Ok(Self {
            title: selector("h2")?,
            company: selector(".nJlQNd")?,
            location: selector(".sMzDkb")?,
            posted: selector(".LL4CDc")?,
            description: selector(".HBvzbc")?,
            apply: selector(r#"a[href^="http"]"#)?,
        })
    }
}

/// Google Jobs search results.
///
/// Loads one results page per query and reads up to `max_results` listing
/// cards from it, passing the governor before each card.
pub struct GoogleJobsAdapter<F: Fetcher> {
    fetcher: F,
    retry: RetryPolicy,
}

impl<F: Fetcher> GoogleJobsAdapter<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// `<query> jobs in <location>`, or `<query> jobs` without a location.
    pub fn search_url(request: &SearchRequest) -> Result<Url, AppError> {
        let q = match &request.location {
            Some(location) => format!("{} jobs in {location}", request.query),
            None => format!("{} jobs", request.query),
        };
        Url::parse_with_params(SEARCH_URL, [("q", q.as_str()), ("ibp", "htl;jobs")])
            .map_err(|e| AppError::ConfigError(format!("invalid search URL: {e}")))
    }

    async fn collect_inner(
        &self,
        request: &SearchRequest,
        governor: &mut RateGovernor,
    ) -> Result<Vec<RawJob>, SourceError> {
        let url = Self::search_url(request)?;
        let html = load_page(&self.fetcher, self.retry, url.as_str()).await?;

        let cards = split_cards(&html, CARD, request.max_results)?;
        if cards.is_empty() {
            tracing::warn!(query = %request.query, "No Google Jobs cards on results page");
            return Ok(Vec::new());
        }

        let selectors = CardSelectors::new()?;
        let mut jobs = Vec::with_capacity(cards.len());
        for card in &cards {
            governor.gate().await;
            jobs.push(parse_card(card, &selectors));
        }
        tracing::debug!(query = %request.query, cards = jobs.len(), "Parsed Google Jobs cards");
        Ok(jobs)
    }
}

fn parse_card(card_html: &str, s: &CardSelectors) -> RawJob {
    let fragment = Html::parse_fragment(card_html);
    let root = fragment.root_element();
    RawJob {
        job_title: first_text(root, &s.title),
        company_name: first_text(root, &s.company),
        location: first_text(root, &s.location),
        posted_date: first_text(root, &s.posted),
        job_description: first_text(root, &s.description),
        apply_url: first_attr(root, &s.apply, "href"),
    }
}

impl<F: Fetcher + 'static> SourceAdapter for GoogleJobsAdapter<F> {
    fn source(&self) -> Source {
        Source::GoogleJobs
    }

    fn collect<'a>(
        &'a self,
        request: &'a SearchRequest,
        governor: &'a mut RateGovernor,
    ) -> BoxFuture<'a, Result<Vec<RawJob>, SourceError>> {
        Box::pin(self.collect_inner(request, governor))
    }
}
