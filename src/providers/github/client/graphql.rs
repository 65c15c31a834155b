use graphql_client::Response as GraphQLResponse;
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write;

use super::core::GitHubClient;
use crate::error::{Result, StatsError};
use crate::providers::github::types::{
    present, ContributionYearsData, RepositoriesData, RepositoriesViewer, YearlyContributionsData,
};

/// Owned and contributed-to repositories in one round trip, 100 per page (the
/// most GitHub allows) with each repository's 10 largest languages. Cursors are
/// variables, never spliced into the document.
const REPOSITORIES_QUERY: &str = r"
query Repositories($ownedCursor: String, $contribCursor: String) {
  viewer {
    login
    name
    repositories(
      first: 100
      orderBy: { field: UPDATED_AT, direction: DESC }
      isFork: false
      after: $ownedCursor
    ) {
      pageInfo { hasNextPage endCursor }
      nodes { ...RepositoryFields }
    }
    repositoriesContributedTo(
      first: 100
      includeUserRepositories: false
      orderBy: { field: UPDATED_AT, direction: DESC }
      contributionTypes: [COMMIT, PULL_REQUEST, REPOSITORY, PULL_REQUEST_REVIEW]
      after: $contribCursor
    ) {
      pageInfo { hasNextPage endCursor }
      nodes { ...RepositoryFields }
    }
  }
}

fragment RepositoryFields on Repository {
  nameWithOwner
  stargazerCount
  forkCount
  languages(first: 10, orderBy: { field: SIZE, direction: DESC }) {
    edges { size node { name color } }
  }
}
";

/// Error `type` GitHub sets when the GraphQL rate limit is exhausted.
const RATE_LIMITED: &str = "RATE_LIMITED";

const CONTRIBUTION_YEARS_QUERY: &str =
    "query ContributionYears { viewer { contributionsCollection { contributionYears } } }";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RepositoriesVariables<'a> {
    owned_cursor: Option<&'a str>,
    contrib_cursor: Option<&'a str>,
}

/// Builds one query with a `y<year>` alias per year, each asking for that year's total.
///
/// Years are integers, so nothing user-controlled reaches the query text.
pub fn yearly_contributions_query(years: &[i32]) -> String {
    let mut query = String::from("query YearlyContributions { viewer {");
    for year in years {
        let _ = write!(
            query,
            r#" y{year}: contributionsCollection(from: "{year}-01-01T00:00:00Z", to: "{next}-01-01T00:00:00Z") {{ contributionCalendar {{ totalContributions }} }}"#,
            next = year + 1
        );
    }
    query.push_str(" } }");
    query
}

/// Decodes a GraphQL payload into `T`, logging embedded errors.
///
/// Returns `Ok(None)` when the payload has no `data` or does not match the
/// expected shape.
///
/// # Errors
///
/// `StatsError::RateLimited` when GitHub reports a `RATE_LIMITED` error in an
/// otherwise successful response.
fn decode_data<T>(payload: Value, operation: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    if payload.is_null() {
        warn!("{operation}: empty response");
        return Ok(None);
    }

    let rate_limited = payload
        .get("errors")
        .and_then(Value::as_array)
        .is_some_and(|errors| {
            errors
                .iter()
                .any(|error| error.get("type").and_then(Value::as_str) == Some(RATE_LIMITED))
        });
    if rate_limited {
        return Err(StatsError::RateLimited {
            endpoint: format!("graphql {operation}"),
        });
    }

    let response: GraphQLResponse<T> = match serde_json::from_value(payload) {
        Ok(response) => response,
        Err(e) => {
            warn!("{operation}: unexpected response shape ({e})");
            return Ok(None);
        }
    };

    if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
        warn!(
            "{operation}: GraphQL errors: {}",
            errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    Ok(response.data)
}

impl GitHubClient {
    /// Fetches the next page of owned and contributed-to repositories together.
    ///
    /// `None` cursors start the respective listing from the beginning.
    pub async fn fetch_repositories_page(
        &self,
        owned_cursor: Option<&str>,
        contrib_cursor: Option<&str>,
    ) -> Result<RepositoriesViewer> {
        let variables = serde_json::to_value(RepositoriesVariables {
            owned_cursor,
            contrib_cursor,
        })?;

        let payload = self
            .structured_query(REPOSITORIES_QUERY, Some(&variables))
            .await?;

        // Without a page there is no telling how many repositories are missing
        decode_data::<RepositoriesData>(payload, "Repositories")?
            .and_then(|data| data.viewer)
            .ok_or_else(|| StatsError::MissingData {
                operation: "Repositories".to_string(),
            })
    }

    /// Years in which the viewer has any contributions.
    pub async fn fetch_contribution_years(&self) -> Result<Vec<i32>> {
        let payload = self
            .structured_query(CONTRIBUTION_YEARS_QUERY, None)
            .await?;

        let data: ContributionYearsData =
            decode_data(payload, "ContributionYears")?.unwrap_or_default();

        Ok(present(
            data.viewer
                .and_then(|viewer| viewer.contributions_collection)
                .and_then(|collection| collection.contribution_years),
        )
        .collect())
    }

    /// Sum of the yearly contribution totals for `years`, fetched in one query.
    pub async fn fetch_total_contributions(&self, years: &[i32]) -> Result<u64> {
        if years.is_empty() {
            return Ok(0);
        }

        let query = yearly_contributions_query(years);
        let payload = self.structured_query(&query, None).await?;

        let data: YearlyContributionsData =
            decode_data(payload, "YearlyContributions")?.unwrap_or_default();

        Ok(data
            .viewer
            .unwrap_or_default()
            .into_iter()
            .filter(|(alias, _)| alias.starts_with('y'))
            .filter_map(|(_, year)| year.0)
            .filter_map(|year| year.contribution_calendar)
            .filter_map(|calendar| calendar.total_contributions)
            .sum())
    }
}
