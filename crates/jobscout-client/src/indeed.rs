use futures::future::BoxFuture;
use jobscout_core::error::{AppError, SourceError};
use jobscout_core::governor::RateGovernor;
use jobscout_core::models::{RawJob, Source};
use jobscout_core::retry::RetryPolicy;
use jobscout_core::traits::{Fetcher, SearchRequest, SourceAdapter};
use scraper::{Html, Selector};
use url::Url;

use crate::block::load_page;
use crate::html::{element_text, first_attr, first_text, resolve_url, selector, split_cards};

const SEARCH_URL: &str = "https://www.indeed.com/jobs";
const CARD: &str = ".job_seen_beacon";

/// Listings Indeed serves per results page.
pub const PAGE_SIZE: usize = 10;
/// Hard stop on pagination regardless of `max_results`.
pub const MAX_PAGES: usize = 10;

struct CardSelectors {
    title: Selector,
    company: Selector,
    location: Selector,
    posted: Selector,
    link: Selector,
}

impl CardSelectors {
    fn new() -> Result<Self, AppError> {
        Ok(Self {
            title: selector("h2")?,
            company: selector(".companyName")?,
            location: selector(".companyLocation")?,
            posted: selector("span.date")?,
            link: selector("a")?,
        })
    }
}

/// Indeed search results, following `start=` pagination.
pub struct IndeedAdapter<F: Fetcher> {
    fetcher: F,
    retry: RetryPolicy,
    max_pages: usize,
}

impl<F: Fetcher> IndeedAdapter<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            retry: RetryPolicy::default(),
            max_pages: MAX_PAGES,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Results page `page` (zero-based) for `request`.
    pub fn search_url(request: &SearchRequest, page: usize) -> Result<Url, AppError> {
        let mut url = Url::parse(SEARCH_URL)
            .map_err(|e| AppError::ConfigError(format!("invalid search URL: {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", &request.query);
            if let Some(location) = &request.location {
                pairs.append_pair("l", location);
            }
            if page > 0 {
                pairs.append_pair("start", &(page * PAGE_SIZE).to_string());
            }
        }
        Ok(url)
    }

    async fn collect_inner(
        &self,
        request: &SearchRequest,
        governor: &mut RateGovernor,
    ) -> Result<Vec<RawJob>, SourceError> {
        let selectors = CardSelectors::new()?;
        let mut jobs = Vec::new();

        for page in 0..self.max_pages {
            let remaining = request.max_results.saturating_sub(jobs.len());
            if remaining == 0 {
                break;
            }

            let url = Self::search_url(request, page)?;
            let html = match load_page(&self.fetcher, self.retry, url.as_str()).await {
                Ok(html) => html,
                // A defense on any page blocks the source; a later page failing
                // otherwise keeps what earlier pages produced.
                Err(e) if page > 0 && !e.is_blocked() => {
                    tracing::warn!(%url, error = %e, collected = jobs.len(), "Stopping Indeed pagination");
                    break;
                }
                Err(e) => return Err(e),
            };

            let cards = split_cards(&html, CARD, remaining)?;
            let page_len = cards.len();
            if page_len == 0 {
                if page == 0 {
                    tracing::warn!(query = %request.query, "No Indeed cards on results page");
                }
                break;
            }

            for card in &cards {
                governor.gate().await;
                jobs.push(parse_card(card, &selectors, &url));
            }
            tracing::debug!(%url, cards = page_len, "Parsed Indeed page");

            if page_len < PAGE_SIZE.min(remaining) {
                break;
            }
        }

        Ok(jobs)
    }
}

fn parse_card(card_html: &str, s: &CardSelectors, page_url: &Url) -> RawJob {
    let fragment = Html::parse_fragment(card_html);
    let root = fragment.root_element();
    RawJob {
        job_title: first_text(root, &s.title),
        company_name: first_text(root, &s.company),
        location: first_text(root, &s.location),
        posted_date: first_text(root, &s.posted),
        job_description: element_text(root),
        apply_url: first_attr(root, &s.link, "href").and_then(|href| resolve_url(page_url, &href)),
    }
}

impl<F: Fetcher + 'static> SourceAdapter for IndeedAdapter<F> {
    fn source(&self) -> Source {
        Source::Indeed
    }

    fn collect<'a>(
        &'a self,
        request: &'a SearchRequest,
        governor: &'a mut RateGovernor,
    ) -> BoxFuture<'a, Result<Vec<RawJob>, SourceError>> {
        Box::pin(self.collect_inner(request, governor))
    }
}
