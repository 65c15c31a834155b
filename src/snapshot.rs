use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Accumulated bytes of code for one language across all observed repositories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageStats {
    /// Language name as reported by GitHub (case-sensitive key)
    pub name: String,
    /// Total bytes of code in this language
    pub size: u64,
    /// Hex display color (e.g., "#00ADD8")
    pub color: String,
    /// Share of the total size, 0-100
    pub percentage: f64,
}

impl LanguageStats {
    pub fn new(name: impl Into<String>, size: u64, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            color: color.into(),
            percentage: 0.0,
        }
    }
}

/// Aggregated profile statistics produced by one collection run.
///
/// Only the aggregator builds a `Snapshot`; once returned it is never mutated.
/// `lines_changed` is always derived from the added and deleted counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub username: String,
    pub display_name: String,
    pub collected_at: DateTime<Utc>,
    pub stars: u64,
    pub forks: u64,
    pub contributions: u64,
    pub repos_count: usize,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub views: u64,
    /// Every observed language, in first-seen order
    pub languages: Vec<LanguageStats>,
}

impl Snapshot {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            display_name: username.to_string(),
            collected_at: Utc::now(),
            stars: 0,
            forks: 0,
            contributions: 0,
            repos_count: 0,
            lines_added: 0,
            lines_deleted: 0,
            views: 0,
            languages: Vec::new(),
        }
    }

    pub fn lines_changed(&self) -> u64 {
        self.lines_added + self.lines_deleted
    }

    /// Returns the `limit` largest languages by size, largest first.
    pub fn top_languages(&self, limit: usize) -> Vec<&LanguageStats> {
        let mut languages: Vec<&LanguageStats> = self.languages.iter().collect();
        languages.sort_by(|a, b| b.size.cmp(&a.size));
        languages.truncate(limit);
        languages
    }

    /// Serializable view that includes the derived `lines_changed` counter.
    pub fn report(&self) -> SnapshotReport<'_> {
        SnapshotReport {
            snapshot: self,
            lines_changed: self.lines_changed(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SnapshotReport<'a> {
    #[serde(flatten)]
    snapshot: &'a Snapshot,
    lines_changed: u64,
}
