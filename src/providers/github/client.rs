mod core;
pub mod graphql;
pub mod rest;

pub use self::core::{
    ClientOptions, GitHubClient, RetryPolicy, DEFAULT_API_URL, DEFAULT_MAX_CONCURRENT_REQUESTS,
};
