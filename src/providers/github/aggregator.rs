use indexmap::{IndexMap, IndexSet};
use log::debug;

use crate::snapshot::{LanguageStats, Snapshot};

use super::colors::language_color;
use super::types::{present, ContributorStats, RepositoryNode, TrafficViews};

/// Name used for language edges GitHub returns without a language node.
const UNKNOWN_LANGUAGE: &str = "Other";

/// Repository and language exclusion lists, compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct RepositoryFilters {
    exclude_repos: Vec<String>,
    exclude_languages: Vec<String>,
}

impl RepositoryFilters {
    pub fn new<R, L>(exclude_repos: R, exclude_languages: L) -> Self
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
        L: IntoIterator,
        L::Item: AsRef<str>,
    {
        let normalize = |value: &str| value.trim().to_lowercase();
        Self {
            exclude_repos: exclude_repos
                .into_iter()
                .map(|r| normalize(r.as_ref()))
                .filter(|r| !r.is_empty())
                .collect(),
            exclude_languages: exclude_languages
                .into_iter()
                .map(|l| normalize(l.as_ref()))
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }

    /// Matches either the full "owner/name" or just the repository name.
    pub fn is_repo_excluded(&self, name_with_owner: &str) -> bool {
        let full = name_with_owner.to_lowercase();
        let short = full.rsplit('/').next().unwrap_or(&full);
        self.exclude_repos
            .iter()
            .any(|excluded| *excluded == full || excluded == short)
    }

    pub fn is_language_excluded(&self, language: &str) -> bool {
        let language = language.to_lowercase();
        self.exclude_languages.iter().any(|l| *l == language)
    }
}

/// Folds repository pages and per-repository statistics into a [`Snapshot`].
///
/// Repositories are deduplicated by "owner/name"; a repository seen twice (owned
/// and contributed-to, or repeated across pages) counts once. The snapshot is
/// only handed out by [`Aggregator::finish`], which also computes language
/// percentages.
pub struct Aggregator<'a> {
    filters: &'a RepositoryFilters,
    snapshot: Snapshot,
    repositories: IndexSet<String>,
    languages: IndexMap<String, LanguageStats>,
}

impl<'a> Aggregator<'a> {
    pub fn new(username: &str, filters: &'a RepositoryFilters) -> Self {
        Self {
            filters,
            snapshot: Snapshot::new(username),
            repositories: IndexSet::new(),
            languages: IndexMap::new(),
        }
    }

    pub fn username(&self) -> &str {
        &self.snapshot.username
    }

    /// Repositories accepted so far, in discovery order.
    pub fn repositories(&self) -> &IndexSet<String> {
        &self.repositories
    }

    /// Records the viewer's display name; falls back to the login, then the username.
    pub fn observe_viewer(&mut self, login: Option<&str>, name: Option<&str>) {
        if self.snapshot.display_name != self.snapshot.username {
            return;
        }

        if let Some(display_name) = name
            .or(login)
            .map(str::trim)
            .filter(|display_name| !display_name.is_empty())
        {
            self.snapshot.display_name = display_name.to_string();
        }
    }

    /// Adds one repository's stars, forks and languages.
    ///
    /// Returns `false` without touching any counter when the repository has no
    /// identity, was already seen, or is excluded.
    pub fn accept_repository(&mut self, repository: RepositoryNode) -> bool {
        let Some(name) = repository.name_with_owner else {
            debug!("Skipping repository without nameWithOwner");
            return false;
        };

        if self.repositories.contains(&name) {
            return false;
        }

        if self.filters.is_repo_excluded(&name) {
            debug!("Skipping excluded repository {name}");
            return false;
        }

        self.snapshot.stars += repository.stargazer_count.unwrap_or(0);
        self.snapshot.forks += repository.fork_count.unwrap_or(0);

        let edges = repository.languages.and_then(|languages| languages.edges);
        for edge in present(edges) {
            let node = edge.node.unwrap_or_default();
            let language = node.name.unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string());

            if self.filters.is_language_excluded(&language) {
                continue;
            }

            let size = edge.size.unwrap_or(0);
            self.languages
                .entry(language)
                .and_modify(|stats| stats.size += size)
                .or_insert_with_key(|language| {
                    LanguageStats::new(
                        language.clone(),
                        size,
                        language_color(language, node.color.as_deref()),
                    )
                });
        }

        self.repositories.insert(name);
        true
    }

    pub fn lines_changed(&self) -> u64 {
        self.snapshot.lines_changed()
    }

    pub fn add_contributions(&mut self, total: u64) {
        self.snapshot.contributions += total;
    }

    /// Adds the weekly additions and deletions of the entries authored by the
    /// target user. Entries without a matching login are ignored.
    pub fn add_contributor_stats(&mut self, contributors: &[ContributorStats]) {
        let (added, deleted) = code_changes_for(contributors, &self.snapshot.username);
        self.snapshot.lines_added += added;
        self.snapshot.lines_deleted += deleted;
    }

    pub fn add_traffic(&mut self, traffic: TrafficViews) {
        self.snapshot.views += present(traffic.views)
            .filter_map(|day| day.count)
            .sum::<u64>();
    }

    /// Finalizes the run: language percentages are computed from the summed sizes.
    pub fn finish(self) -> Snapshot {
        let mut snapshot = self.snapshot;
        snapshot.repos_count = self.repositories.len();
        snapshot.languages = self.languages.into_values().collect();

        let total: u64 = snapshot.languages.iter().map(|l| l.size).sum();
        if total > 0 {
            for language in &mut snapshot.languages {
                #[allow(clippy::cast_precision_loss)]
                let percentage = language.size as f64 / total as f64 * 100.0;
                language.percentage = percentage;
            }
        }

        snapshot
    }
}

/// Lines added and deleted by `username` according to per-contributor stats.
fn code_changes_for(contributors: &[ContributorStats], username: &str) -> (u64, u64) {
    contributors
        .iter()
        .filter(|contributor| {
            contributor
                .author
                .as_ref()
                .and_then(|author| author.login.as_deref())
                .is_some_and(|login| login.eq_ignore_ascii_case(username))
        })
        .flat_map(|contributor| contributor.weeks.iter().flatten())
        .filter_map(|week| week.0.as_ref())
        .fold((0, 0), |(added, deleted), week| {
            (
                added + week.additions.unwrap_or(0),
                deleted + week.deletions.unwrap_or(0),
            )
        })
}
