mod github;

pub use github::{
    ClientOptions, CollectOptions, GitHubProvider, RepositoryFilters, RetryPolicy,
    DEFAULT_API_URL, DEFAULT_MAX_CONCURRENT_REQUESTS,
};
