use futures::future::join_all;
use log::{info, warn};

use crate::auth::Token;
use crate::error::{Result, StatsError};
use crate::output::PhaseProgress;
use crate::snapshot::Snapshot;

use super::aggregator::{Aggregator, RepositoryFilters};
use super::client::{ClientOptions, GitHubClient};
use super::pagination::paginate_repositories;

/// What to collect and what to leave out.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Login whose contributor statistics are counted
    pub username: String,
    pub filters: RepositoryFilters,
    /// Also list repositories the user contributed to but does not own
    pub include_contributed: bool,
}

/// Collects a profile [`Snapshot`] from the GitHub API.
///
/// One run goes through four phases, each finishing before the next starts:
/// 1. Repositories (owned and contributed-to, paginated together)
/// 2. Contribution totals across all years
/// 3. Lines added and deleted, per repository
/// 4. Traffic views, per repository
///
/// Per-repository calls run concurrently within a phase, bounded by the
/// client's request limiter.
pub struct GitHubProvider {
    client: GitHubClient,
    options: CollectOptions,
}

impl GitHubProvider {
    /// Creates a provider with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL is invalid or the username is empty.
    pub fn new(
        api_url: &str,
        token: Option<Token>,
        client_options: ClientOptions,
        options: CollectOptions,
    ) -> Result<Self> {
        let client = GitHubClient::new(api_url, token, client_options)?;
        Self::with_client(client, options)
    }

    pub fn with_client(client: GitHubClient, options: CollectOptions) -> Result<Self> {
        if options.username.trim().is_empty() {
            return Err(StatsError::Config("a username is required".to_string()));
        }

        Ok(Self { client, options })
    }

    /// Runs the full collection pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - GitHub signals rate limiting on any call
    /// - Listing repositories or contributions fails after retries
    ///
    /// Failures of a single repository's statistics are logged and skipped.
    pub async fn collect(&self) -> Result<Snapshot> {
        info!(
            "Starting stats collection for {} via {}",
            self.options.username,
            self.client.api_url()
        );

        let mut aggregator = Aggregator::new(&self.options.username, &self.options.filters);

        // Phase 1: repositories
        let progress = PhaseProgress::start("Fetching repositories");
        self.collect_repositories(&mut aggregator).await?;
        let repositories = aggregator.repositories().len();

        // Phase 2: contributions
        let progress = progress.advance(
            format!("Fetched {repositories} repositories"),
            "Counting contributions",
        );
        self.collect_contributions(&mut aggregator).await?;

        // Phase 3: code changes
        let progress = progress.advance(
            "Counted contributions".to_string(),
            &format!("Fetching code stats for {repositories} repositories"),
        );
        self.collect_code_stats(&mut aggregator).await?;

        // Phase 4: traffic
        let progress = progress.advance(
            "Fetched code stats".to_string(),
            &format!("Fetching traffic for {repositories} repositories"),
        );
        self.collect_traffic(&mut aggregator).await?;

        let snapshot = aggregator.finish();
        progress.finish(format!(
            "Collected stats for {} ({} languages)",
            snapshot.display_name,
            snapshot.languages.len()
        ));

        Ok(snapshot)
    }

    async fn collect_repositories(&self, aggregator: &mut Aggregator<'_>) -> Result<()> {
        let round_trips = paginate_repositories(
            &self.client,
            self.options.include_contributed,
            |page| {
                aggregator.observe_viewer(page.login.as_deref(), page.name.as_deref());
                for repository in page.repositories {
                    aggregator.accept_repository(repository);
                }
            },
        )
        .await?;

        info!(
            "Found {} repositories in {round_trips} requests",
            aggregator.repositories().len()
        );
        Ok(())
    }

    async fn collect_contributions(&self, aggregator: &mut Aggregator<'_>) -> Result<()> {
        let years = self.client.fetch_contribution_years().await?;
        if years.is_empty() {
            warn!("No contribution years found, skipping contributions");
            return Ok(());
        }

        let total = self.client.fetch_total_contributions(&years).await?;
        info!("{total} contributions over {} years", years.len());
        aggregator.add_contributions(total);
        Ok(())
    }

    async fn collect_code_stats(&self, aggregator: &mut Aggregator<'_>) -> Result<()> {
        let repositories: Vec<String> = aggregator.repositories().iter().cloned().collect();

        let results = join_all(
            repositories
                .iter()
                .map(|repo| self.client.fetch_contributor_stats(repo)),
        )
        .await;

        for (repo, result) in repositories.iter().zip(results) {
            if let Some(contributors) = keep_going(repo, "code stats", result)? {
                aggregator.add_contributor_stats(&contributors);
            }
        }

        info!(
            "{} lines changed by {}",
            aggregator.lines_changed(),
            aggregator.username()
        );
        Ok(())
    }

    async fn collect_traffic(&self, aggregator: &mut Aggregator<'_>) -> Result<()> {
        let repositories: Vec<String> = aggregator.repositories().iter().cloned().collect();

        let results = join_all(
            repositories
                .iter()
                .map(|repo| self.client.fetch_traffic_views(repo)),
        )
        .await;

        for (repo, result) in repositories.iter().zip(results) {
            if let Some(traffic) = keep_going(repo, "traffic", result)? {
                aggregator.add_traffic(traffic);
            }
        }

        Ok(())
    }
}

/// Rate limiting aborts the run; any other per-repository failure skips that repository.
fn keep_going<T>(repo: &str, what: &str, result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_rate_limit() => Err(e),
        Err(e) => {
            warn!("Skipping {what} for {repo}: {e}");
            Ok(None)
        }
    }
}
