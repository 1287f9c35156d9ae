//! Calendar feed downloading.

pub mod fetcher;

pub use fetcher::IcalFeedFetcher;
