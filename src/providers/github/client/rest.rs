use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::core::GitHubClient;
use crate::error::Result;
use crate::providers::github::types::{ContributorStats, Lenient, TrafficViews};

/// Decodes a REST payload, treating anything of the wrong shape as absent.
fn decode_resource<T: DeserializeOwned>(payload: Value, resource: &str) -> Option<T> {
    if payload.is_null() {
        return None;
    }

    serde_json::from_value(payload)
        .inspect_err(|e| debug!("Ignoring malformed {resource} response: {e}"))
        .ok()
}

impl GitHubClient {
    /// Per-contributor weekly statistics for `repo` ("owner/name").
    ///
    /// Returns an empty list when GitHub never finished computing them or the
    /// response is not a list.
    pub async fn fetch_contributor_stats(&self, repo: &str) -> Result<Vec<ContributorStats>> {
        let payload = self
            .resource_fetch(&format!("repos/{repo}/stats/contributors"), &[])
            .await?;

        let contributors: Vec<Lenient<ContributorStats>> =
            decode_resource(payload, "contributor stats").unwrap_or_default();

        Ok(contributors.into_iter().filter_map(|c| c.0).collect())
    }

    /// Daily page views for `repo` over the window GitHub keeps (14 days).
    pub async fn fetch_traffic_views(&self, repo: &str) -> Result<TrafficViews> {
        let payload = self
            .resource_fetch(&format!("repos/{repo}/traffic/views"), &[("per", "day")])
            .await?;

        Ok(decode_resource(payload, "traffic views").unwrap_or_default())
    }
}
