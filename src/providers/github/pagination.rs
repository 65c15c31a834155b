use log::{debug, warn};

use crate::error::Result;

use super::client::GitHubClient;
use super::types::{present, PageInfo, RepositoryConnection, RepositoryNode};

/// Cursor state of one paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct PageCursor {
    cursor: Option<String>,
    has_more: bool,
}

impl PageCursor {
    /// A listing that starts from the beginning.
    pub fn start() -> Self {
        Self {
            cursor: None,
            has_more: true,
        }
    }

    /// A listing that is never consumed.
    pub fn exhausted() -> Self {
        Self {
            cursor: None,
            has_more: false,
        }
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Moves past the page just consumed. Only a live listing advances; a
    /// listing stops when GitHub reports no next page, gives no end cursor, or
    /// hands back the cursor it was asked for. A finished listing keeps its
    /// final end cursor, so later round trips get an empty page for it.
    fn advance(&mut self, page_info: Option<PageInfo>) {
        if !self.has_more {
            return;
        }

        let Some(PageInfo {
            has_next_page,
            end_cursor: Some(end_cursor),
        }) = page_info
        else {
            self.has_more = false;
            return;
        };

        if has_next_page && self.cursor.as_deref() == Some(end_cursor.as_str()) {
            warn!("Pagination cursor did not move ({end_cursor}), stopping");
            self.has_more = false;
            return;
        }

        self.has_more = has_next_page;
        self.cursor = Some(end_cursor);
    }
}

/// Independent cursors for the owned and contributed-to listings.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorPair {
    pub owned: PageCursor,
    pub contributed: PageCursor,
}

impl CursorPair {
    /// Starts both listings; the contributed-to listing is skipped entirely when
    /// `include_contributed` is false.
    pub fn new(include_contributed: bool) -> Self {
        Self {
            owned: PageCursor::start(),
            contributed: if include_contributed {
                PageCursor::start()
            } else {
                PageCursor::exhausted()
            },
        }
    }

    pub fn has_more(&self) -> bool {
        self.owned.has_more() || self.contributed.has_more()
    }
}

/// One round trip's worth of repositories from both listings.
#[derive(Debug, Default)]
pub struct RepositoryPage {
    pub login: Option<String>,
    pub name: Option<String>,
    /// Owned repositories first, then contributed-to ones; nulls already dropped.
    pub repositories: Vec<RepositoryNode>,
}

/// Walks the owned and contributed-to repository listings to the end.
///
/// Each round trip asks for the next page of both listings at once, so the
/// number of requests is the page count of the longer listing. Items from a
/// listing that is already exhausted are ignored. `visit` receives every page
/// in order.
///
/// Returns the number of round trips made.
///
/// # Errors
///
/// Propagates client errors (rate limiting, exhausted retries) unchanged.
pub async fn paginate_repositories<F>(
    client: &GitHubClient,
    include_contributed: bool,
    mut visit: F,
) -> Result<usize>
where
    F: FnMut(RepositoryPage),
{
    let mut cursors = CursorPair::new(include_contributed);
    let mut round_trips = 0;

    while cursors.has_more() {
        let viewer = client
            .fetch_repositories_page(cursors.owned.cursor(), cursors.contributed.cursor())
            .await?;
        round_trips += 1;

        let owned = viewer.repositories.unwrap_or_default();
        let contributed = viewer.repositories_contributed_to.unwrap_or_default();

        let mut repositories = Vec::new();
        let mut take = |cursor: &mut PageCursor, connection: RepositoryConnection| {
            if cursor.has_more() {
                repositories.extend(present(connection.nodes));
            }
            cursor.advance(connection.page_info);
        };
        take(&mut cursors.owned, owned);
        take(&mut cursors.contributed, contributed);

        debug!(
            "Repository page {round_trips}: {} repositories (more owned: {}, more contributed: {})",
            repositories.len(),
            cursors.owned.has_more(),
            cursors.contributed.has_more()
        );

        visit(RepositoryPage {
            login: viewer.login,
            name: viewer.name,
            repositories,
        });
    }

    Ok(round_trips)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatsError;
    use crate::providers::github::client::{ClientOptions, RetryPolicy};
    use mockito::{Matcher, Mock, ServerGuard};
    use serde_json::{json, Value};
    use std::time::Duration;

    fn create_test_client(url: &str) -> GitHubClient {
        let options = ClientOptions {
            max_concurrent_requests: 2,
            retry: RetryPolicy {
                max_retries: 0,
                base_delay: Duration::from_millis(1),
                poll_interval: Duration::from_millis(1),
                max_polls: 1,
            },
        };
        GitHubClient::new(url, None, options).unwrap()
    }

    fn create_test_connection(prefix: &str, page: usize, pages: usize) -> Value {
        // Past the last page GitHub returns an empty listing
        let nodes: Vec<Value> = if page < pages {
            vec![
                json!({ "nameWithOwner": format!("{prefix}/repo-{page}-a") }),
                Value::Null,
                json!({ "nameWithOwner": format!("{prefix}/repo-{page}-b") }),
            ]
        } else {
            Vec::new()
        };
        json!({
            "pageInfo": {
                "hasNextPage": page + 1 < pages,
                "endCursor": format!("{prefix}-{}", page.min(pages.saturating_sub(1)))
            },
            "nodes": nodes
        })
    }

    /// Cursor sent when requesting `page`: the end cursor of the previous page.
    fn cursor_for(prefix: &str, page: usize) -> Value {
        if page == 0 {
            Value::Null
        } else {
            json!(format!("{prefix}-{}", page - 1))
        }
    }

    /// Mocks `max(owned, contributed)` round trips, each expected exactly once.
    async fn mock_pages(server: &mut ServerGuard, owned: usize, contributed: usize) -> Vec<Mock> {
        let mut mocks = Vec::new();
        for page in 0..owned.max(contributed) {
            // An exhausted listing keeps sending the end cursor of its last page
            let owned_cursor = cursor_for("owned", page.min(owned));
            let contrib_cursor = cursor_for("contrib", page.min(contributed));
            let mock = server
                .mock("POST", "/graphql")
                .match_body(Matcher::PartialJson(json!({
                    "variables": { "ownedCursor": owned_cursor, "contribCursor": contrib_cursor }
                })))
                .with_status(200)
                .with_body(
                    json!({
                        "data": { "viewer": {
                            "login": "octocat",
                            "repositories": create_test_connection("owned", page, owned),
                            "repositoriesContributedTo":
                                create_test_connection("contrib", page, contributed)
                        }}
                    })
                    .to_string(),
                )
                .expect(1)
                .create_async()
                .await;
            mocks.push(mock);
        }
        mocks
    }

    #[test]
    fn test_cursor_advances_only_while_live() {
        let mut cursor = PageCursor::start();
        cursor.advance(Some(PageInfo {
            has_next_page: true,
            end_cursor: Some("a".to_string()),
        }));
        assert_eq!(cursor.cursor(), Some("a"));
        assert!(cursor.has_more());

        // The last page's end cursor is kept so the next request returns nothing
        cursor.advance(Some(PageInfo {
            has_next_page: false,
            end_cursor: Some("b".to_string()),
        }));
        assert_eq!(cursor.cursor(), Some("b"));
        assert!(!cursor.has_more());

        cursor.advance(Some(PageInfo {
            has_next_page: true,
            end_cursor: Some("c".to_string()),
        }));
        assert_eq!(cursor.cursor(), Some("b"));
        assert!(!cursor.has_more());
    }

    #[test]
    fn test_cursor_stops_on_missing_or_repeated_cursor() {
        let mut cursor = PageCursor::start();
        cursor.advance(Some(PageInfo {
            has_next_page: true,
            end_cursor: None,
        }));
        assert!(!cursor.has_more());

        let mut cursor = PageCursor::start();
        let page = PageInfo {
            has_next_page: true,
            end_cursor: Some("same".to_string()),
        };
        cursor.advance(Some(page.clone()));
        cursor.advance(Some(page));
        assert!(!cursor.has_more());

        let mut cursor = PageCursor::start();
        cursor.advance(None);
        assert!(!cursor.has_more());
    }

    #[test]
    fn test_cursor_pair_without_contributed() {
        let pair = CursorPair::new(false);
        assert!(pair.owned.has_more());
        assert!(!pair.contributed.has_more());
        assert!(pair.has_more());
    }

    async fn run_pagination(owned: usize, contributed: usize) -> (usize, Vec<String>) {
        let mut server = mockito::Server::new_async().await;
        let mocks = mock_pages(&mut server, owned, contributed).await;
        let client = create_test_client(&server.url());

        let mut seen = Vec::new();
        let round_trips = paginate_repositories(&client, true, |page| {
            assert_eq!(page.login.as_deref(), Some("octocat"));
            seen.extend(page.repositories.into_iter().filter_map(|r| r.name_with_owner));
        })
        .await
        .unwrap();

        for mock in mocks {
            mock.assert_async().await;
        }
        (round_trips, seen)
    }

    #[tokio::test]
    async fn test_round_trips_equal_longer_listing() {
        let (round_trips, seen) = run_pagination(3, 2).await;
        assert_eq!(round_trips, 3);
        assert_eq!(seen.len(), 2 * (3 + 2));

        let mut unique = seen.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), seen.len());
        assert!(seen.contains(&"owned/repo-2-b".to_string()));
        assert!(seen.contains(&"contrib/repo-1-a".to_string()));
    }

    #[tokio::test]
    async fn test_contributed_listing_longer_than_owned() {
        let (round_trips, seen) = run_pagination(1, 4).await;
        assert_eq!(round_trips, 4);
        assert_eq!(seen.len(), 2 * (1 + 4));
    }

    #[tokio::test]
    async fn test_single_page_each() {
        let (round_trips, seen) = run_pagination(1, 1).await;
        assert_eq!(round_trips, 1);
        assert_eq!(
            seen,
            vec![
                "owned/repo-0-a",
                "owned/repo-0-b",
                "contrib/repo-0-a",
                "contrib/repo-0-b"
            ]
        );
    }

    #[tokio::test]
    async fn test_contributed_nodes_ignored_when_excluded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_body(
                json!({
                    "data": { "viewer": {
                        "repositories": create_test_connection("owned", 0, 1),
                        "repositoriesContributedTo": create_test_connection("contrib", 0, 5)
                    }}
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let client = create_test_client(&server.url());

        let mut seen = Vec::new();
        let round_trips = paginate_repositories(&client, false, |page| {
            seen.extend(page.repositories.into_iter().filter_map(|r| r.name_with_owner));
        })
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(round_trips, 1);
        assert_eq!(seen, vec!["owned/repo-0-a", "owned/repo-0-b"]);
    }

    #[tokio::test]
    async fn test_missing_data_fails_pagination() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_body(r#"{"data":null,"errors":[{"message":"Resource not accessible"}]}"#)
            .expect(1)
            .create_async()
            .await;
        let client = create_test_client(&server.url());

        let mut pages = 0;
        let result = paginate_repositories(&client, true, |_| pages += 1).await;

        mock.assert_async().await;
        assert!(matches!(result, Err(StatsError::MissingData { .. })));
        assert_eq!(pages, 0);
    }

    #[tokio::test]
    async fn test_rate_limit_on_later_page_aborts() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("POST", "/graphql")
            .match_body(Matcher::PartialJson(json!({
                "variables": { "ownedCursor": null }
            })))
            .with_status(200)
            .with_body(
                json!({
                    "data": { "viewer": {
                        "repositories": create_test_connection("owned", 0, 2),
                        "repositoriesContributedTo": create_test_connection("contrib", 0, 1)
                    }}
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("POST", "/graphql")
            .match_body(Matcher::PartialJson(json!({
                "variables": { "ownedCursor": "owned-0" }
            })))
            .with_status(200)
            .with_body(
                r#"{"data":null,"errors":[{"type":"RATE_LIMITED","message":"API rate limit exceeded"}]}"#,
            )
            .expect(1)
            .create_async()
            .await;
        let client = create_test_client(&server.url());

        let mut seen = 0;
        let result =
            paginate_repositories(&client, true, |page| seen += page.repositories.len()).await;

        first.assert_async().await;
        second.assert_async().await;
        assert!(matches!(result, Err(StatsError::RateLimited { .. })));
        assert_eq!(seen, 4);
    }
}
