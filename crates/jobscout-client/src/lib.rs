pub mod block;
#[cfg(feature = "browser")]
pub mod browser_fetcher;
pub mod fetcher;
pub mod google;
mod html;
pub mod indeed;

pub use block::{classify_fetch_error, detect_block};
#[cfg(feature = "browser")]
pub use browser_fetcher::BrowserFetcher;
pub use fetcher::{FetcherConfig, ReqwestFetcher};
pub use google::GoogleJobsAdapter;
pub use indeed::IndeedAdapter;
