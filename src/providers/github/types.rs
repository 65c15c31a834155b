//! Response shapes for the GitHub API calls used by the collector.
//!
//! Every field that GitHub may omit or null out is optional, and list items are
//! wrapped in [`Lenient`] so one malformed record is dropped instead of failing
//! the whole response.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// A value that decodes to `None` instead of failing when it is null or malformed.
#[derive(Debug, Clone, PartialEq)]
pub struct Lenient<T>(pub Option<T>);

impl<'de, T: DeserializeOwned> Deserialize<'de> for Lenient<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self(serde_json::from_value(value).ok()))
    }
}

/// Flattens a list of lenient items, dropping the ones that failed to decode.
pub fn present<T>(items: Option<Vec<Lenient<T>>>) -> impl Iterator<Item = T> {
    items.into_iter().flatten().filter_map(|item| item.0)
}

// GraphQL: repositories page

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RepositoriesData {
    pub viewer: Option<RepositoriesViewer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepositoriesViewer {
    pub login: Option<String>,
    pub name: Option<String>,
    pub repositories: Option<RepositoryConnection>,
    pub repositories_contributed_to: Option<RepositoryConnection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepositoryConnection {
    pub page_info: Option<PageInfo>,
    pub nodes: Option<Vec<Lenient<RepositoryNode>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// One repository as returned by the owned or contributed-to listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepositoryNode {
    /// "owner/name" identity used for deduplication
    pub name_with_owner: Option<String>,
    pub stargazer_count: Option<u64>,
    pub fork_count: Option<u64>,
    pub languages: Option<LanguageConnection>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LanguageConnection {
    pub edges: Option<Vec<Lenient<LanguageEdge>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LanguageEdge {
    pub size: Option<u64>,
    pub node: Option<LanguageNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LanguageNode {
    pub name: Option<String>,
    pub color: Option<String>,
}

// GraphQL: contributions

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContributionYearsData {
    pub viewer: Option<ContributionYearsViewer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContributionYearsViewer {
    pub contributions_collection: Option<ContributionYears>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContributionYears {
    pub contribution_years: Option<Vec<Lenient<i32>>>,
}

/// `viewer` keyed by the per-year aliases (`y2023`, `y2024`, ...).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct YearlyContributionsData {
    pub viewer: Option<BTreeMap<String, Lenient<YearlyContributions>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct YearlyContributions {
    pub contribution_calendar: Option<ContributionCalendar>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContributionCalendar {
    pub total_contributions: Option<u64>,
}

// REST: /repos/{owner}/{repo}/stats/contributors

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContributorStats {
    pub author: Option<ContributorAuthor>,
    pub weeks: Option<Vec<Lenient<ContributorWeek>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContributorAuthor {
    pub login: Option<String>,
}

/// Weekly totals; GitHub abbreviates additions and deletions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContributorWeek {
    #[serde(rename = "a")]
    pub additions: Option<u64>,
    #[serde(rename = "d")]
    pub deletions: Option<u64>,
}

// REST: /repos/{owner}/{repo}/traffic/views

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrafficViews {
    pub views: Option<Vec<Lenient<DailyViews>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DailyViews {
    pub count: Option<u64>,
}
