mod aggregator;
mod client;
mod colors;
mod pagination;
mod provider;
mod types;

pub use aggregator::RepositoryFilters;
pub use client::{
    ClientOptions, RetryPolicy, DEFAULT_API_URL, DEFAULT_MAX_CONCURRENT_REQUESTS,
};
pub use provider::{CollectOptions, GitHubProvider};
