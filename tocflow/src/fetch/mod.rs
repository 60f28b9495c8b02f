//! Fetching remote resources.

#[cfg(feature = "http")]
mod http;
mod protocols;

#[cfg(feature = "http")]
pub use http::HttpFetcher;
#[cfg(test)]
pub use protocols::MockFetcher;
pub use protocols::{FetchObserver, FetchResponse, Fetcher, LoggingFetchObserver, NoOpFetchObserver};
