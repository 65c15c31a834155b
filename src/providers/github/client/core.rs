use log::{debug, warn};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};
use url::Url;

use crate::auth::Token;
use crate::error::{Result, StatsError};

pub const DEFAULT_API_URL: &str = "https://api.github.com/";
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 10;

const USER_AGENT: &str = concat!("statsgen/", env!("CARGO_PKG_VERSION"));

/// Retry and polling schedule shared by both call shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt on transport failures
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every following retry
    pub base_delay: Duration,
    /// Wait between polls while a resource is still being computed (HTTP 202)
    pub poll_interval: Duration,
    /// Total poll attempts before giving up with an empty result
    pub max_polls: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            poll_interval: Duration::from_secs(2),
            max_polls: 30,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (starting at 0): `base_delay * 2^attempt`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub max_concurrent_requests: usize,
    pub retry: RetryPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<&'a Value>,
}

/// Status and decoded body of one HTTP exchange. Non-JSON bodies decode to `Value::Null`.
struct RawResponse {
    status: StatusCode,
    payload: Value,
}

/// GitHub API client for GraphQL queries and REST resource fetches.
///
/// All calls share one HTTP connection pool and one semaphore, so the number of
/// in-flight requests never exceeds `max_concurrent_requests` no matter how many
/// tasks use the client at once. Retries and rate-limit detection live here;
/// callers never retry on their own.
pub struct GitHubClient {
    client: Client,
    api_url: Url,
    graphql_url: Url,
    token: Option<Token>,
    semaphore: Arc<Semaphore>,
    retry: RetryPolicy,
}

impl GitHubClient {
    pub fn new(api_url: &str, token: Option<Token>, options: ClientOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| StatsError::Config(format!("Failed to create HTTP client: {e}")))?;

        Self::with_http_client(client, api_url, token, options)
    }

    /// Builds a client around an externally owned `reqwest::Client`.
    pub fn with_http_client(
        client: Client,
        api_url: &str,
        token: Option<Token>,
        options: ClientOptions,
    ) -> Result<Self> {
        // Url::join drops the last path segment unless the base ends with '/'
        let normalized = if api_url.ends_with('/') {
            api_url.to_string()
        } else {
            format!("{api_url}/")
        };

        let api_url = Url::parse(&normalized)
            .map_err(|e| StatsError::Config(format!("Invalid API URL: {e}")))?;

        let graphql_url = api_url
            .join("graphql")
            .map_err(|e| StatsError::Config(format!("Invalid GraphQL URL: {e}")))?;

        if options.max_concurrent_requests == 0 {
            return Err(StatsError::Config(
                "max concurrent requests must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            client,
            api_url,
            graphql_url,
            token,
            semaphore: Arc::new(Semaphore::new(options.max_concurrent_requests)),
            retry: options.retry,
        })
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    async fn acquire_slot(&self) -> Result<SemaphorePermit<'_>> {
        self.semaphore
            .acquire()
            .await
            .map_err(|_| StatsError::LimiterClosed)
    }

    /// Executes a GraphQL query and returns the raw JSON payload.
    ///
    /// Errors embedded in the payload (the `errors` field) are not inspected here.
    ///
    /// # Errors
    ///
    /// - `StatsError::RateLimited` on HTTP 403 (or 429), without retrying
    /// - `StatsError::Network` once transport retries are exhausted
    pub async fn structured_query(&self, query: &str, variables: Option<&Value>) -> Result<Value> {
        let body = QueryRequest { query, variables };

        let _permit = self.acquire_slot().await?;

        let response = self
            .send_with_retry(|| {
                self.auth_request(self.client.post(self.graphql_url.clone()).json(&body))
            })
            .await?;

        if is_rate_limited(response.status) {
            return Err(StatsError::RateLimited {
                endpoint: self.graphql_url.path().to_string(),
            });
        }

        Ok(response.payload)
    }

    /// Fetches a REST resource, polling while GitHub is still computing it.
    ///
    /// GitHub answers 202 for statistics it has not cached yet. The request is
    /// repeated every `poll_interval` up to `max_polls` times; if the resource
    /// never becomes ready the result is `Value::Null`.
    ///
    /// # Errors
    ///
    /// - `StatsError::RateLimited` on HTTP 403 (or 429), without retrying
    /// - `StatsError::Network` once transport retries are exhausted
    pub async fn resource_fetch(&self, path: &str, params: &[(&str, &str)]) -> Result<Value> {
        let url = self.resource_url(path, params)?;

        let _permit = self.acquire_slot().await?;

        for poll in 1..=self.retry.max_polls {
            let response = self
                .send_with_retry(|| self.auth_request(self.client.get(url.clone())))
                .await?;

            match response.status {
                StatusCode::ACCEPTED => {
                    debug!(
                        "{} still processing ({poll}/{})",
                        url.path(),
                        self.retry.max_polls
                    );
                    if poll < self.retry.max_polls {
                        tokio::time::sleep(self.retry.poll_interval).await;
                    }
                }
                status if is_rate_limited(status) => {
                    return Err(StatsError::RateLimited {
                        endpoint: url.path().to_string(),
                    });
                }
                _ => return Ok(response.payload),
            }
        }

        warn!(
            "{} was not ready after {} polls, treating as empty",
            url.path(),
            self.retry.max_polls
        );
        Ok(Value::Null)
    }

    fn resource_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .api_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| StatsError::Config(format!("Invalid resource path '{path}': {e}")))?;

        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }

        Ok(url)
    }

    /// Sends a request, retrying transport failures with exponential backoff.
    ///
    /// Any HTTP response, whatever its status, counts as a success here.
    async fn send_with_retry<F>(&self, build: F) -> Result<RawResponse>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            match Self::exchange(build()).await {
                Ok(response) => return Ok(response),
                Err(e) if is_transient(&e) && attempt < self.retry.max_retries => {
                    let delay = self.retry.backoff_delay(attempt);
                    warn!(
                        "Network error ({e}), retrying in {:?} ({}/{})...",
                        delay,
                        attempt + 1,
                        self.retry.max_retries
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn exchange(request: RequestBuilder) -> reqwest::Result<RawResponse> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let payload = serde_json::from_slice(&body).unwrap_or_else(|e| {
            debug!("Response body with status {status} is not JSON: {e}");
            Value::Null
        });

        Ok(RawResponse { status, payload })
    }
}

fn is_rate_limited(status: StatusCode) -> bool {
    status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS
}

fn is_transient(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout() || error.is_request() || error.is_body()
}
