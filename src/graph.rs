//! Microsoft Graph OneNote fetcher.
//!
//! Walks the paginated `sections` and `pages` list endpoints and downloads
//! page HTML from the `content` endpoint. Listing pages follow the OData
//! pagination protocol: each response carries a `value` array and, while
//! more data remains, an `@odata.nextLink` URL.
//!
//! Every listing page is fetched with bounded retry (3 attempts, fixed 2 s
//! back-off, warnings to the log). When a page fails all attempts there is
//! no response body to take the next link from, so traversal stops and the
//! listing is reported as truncated instead of pretending to be complete.

use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Error, Result};

const LIST_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// One page of an OData listing response.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ListingPage<T> {
    #[serde(default)]
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

/// A section record as returned by the sections list endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRecord {
    pub id: String,
    pub display_name: String,
    pub last_modified_date_time: DateTime<Utc>,
}

/// A page record as returned by a section's pages list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PageRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// A fully traversed listing, with enough bookkeeping to report partial
/// results: how many pages were fetched and whether traversal stopped early
/// because a page exhausted its retries.
#[derive(Debug)]
pub struct Listing<T> {
    pub items: T,
    pub pages_fetched: u32,
    pub truncated: bool,
}

/// Section name → record, deduplicated.
pub type SectionListing = Listing<IndexMap<String, SectionRecord>>;
/// Page title → page id.
pub type PageListing = Listing<IndexMap<String, String>>;

pub struct GraphClient {
    http: reqwest::Client,
    base_url: String,
    user: String,
    token: String,
}

impl GraphClient {
    pub fn new(base_url: &str, user: &str, token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user: user.to_string(),
            token,
        }
    }

    /// List every section of the user's notebooks, merged across listing
    /// pages into a name → record mapping. Two records sharing a display
    /// name keep the one with the later `lastModifiedDateTime`.
    pub async fn list_sections(&self) -> Result<SectionListing> {
        let start = format!("{}/users/{}/onenote/sections", self.base_url, self.user);
        let mut sections = IndexMap::new();
        let (pages_fetched, truncated) = self
            .walk_listing::<SectionRecord>(start, |records| {
                merge_sections(&mut sections, records);
            })
            .await;

        Ok(Listing {
            items: sections,
            pages_fetched,
            truncated,
        })
    }

    /// List every page in one section as a title → id mapping. Duplicate
    /// titles are last-write-wins; each collision is logged because the
    /// earlier page becomes unreachable once stored.
    pub async fn list_pages(&self, section_id: &str) -> Result<PageListing> {
        let start = format!(
            "{}/users/{}/onenote/sections/{}/pages",
            self.base_url, self.user, section_id
        );
        let mut pages = IndexMap::new();
        let (pages_fetched, truncated) = self
            .walk_listing::<PageRecord>(start, |records| {
                merge_pages(&mut pages, records);
            })
            .await;

        Ok(Listing {
            items: pages,
            pages_fetched,
            truncated,
        })
    }

    /// Fetch one page's raw HTML. Single attempt; a failure here aborts the
    /// current sync rather than being silently skipped.
    pub async fn page_content(&self, page_id: &str) -> Result<String> {
        let url = format!(
            "{}/users/{}/onenote/pages/{}/content",
            self.base_url, self.user, page_id
        );
        let resp = self.http.get(&url).bearer_auth(&self.token).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(Error::Status { status, url });
        }
        Ok(body)
    }

    /// Traverse a paginated listing, feeding each page's records to `merge`.
    /// Returns (pages fetched, truncated).
    async fn walk_listing<T: DeserializeOwned>(
        &self,
        start: String,
        mut merge: impl FnMut(Vec<T>),
    ) -> (u32, bool) {
        let mut next = Some(start);
        let mut fetched = 0u32;

        while let Some(url) = next.take() {
            tracing::debug!(url = %url, "fetching listing page");
            match self.fetch_listing_page::<T>(&url).await {
                Some(page) => {
                    fetched += 1;
                    merge(page.value);
                    next = page.next_link;
                }
                None => {
                    tracing::warn!(
                        url = %url,
                        "listing page failed after {LIST_ATTEMPTS} attempts, stopping traversal"
                    );
                    return (fetched, true);
                }
            }
        }

        (fetched, false)
    }

    /// Fetch and parse one listing page with bounded retry. `None` means the
    /// retries are exhausted.
    async fn fetch_listing_page<T: DeserializeOwned>(&self, url: &str) -> Option<ListingPage<T>> {
        for attempt in 1..=LIST_ATTEMPTS {
            match self.fetch_json::<T>(url).await {
                Ok(page) => return Some(page),
                Err(e) => {
                    tracing::warn!(error = %e, attempt, url = %url, "listing page fetch failed");
                    if attempt < LIST_ATTEMPTS {
                        tokio::time::sleep(RETRY_BACKOFF).await;
                    }
                }
            }
        }
        None
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<ListingPage<T>> {
        let resp = self.http.get(url).bearer_auth(&self.token).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            tracing::warn!(%status, body = %body, "listing request rejected");
            return Err(Error::Status {
                status,
                url: url.to_string(),
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Merge one listing page of section records into the accumulated mapping,
/// keeping the later-modified record when display names collide.
fn merge_sections(into: &mut IndexMap<String, SectionRecord>, records: Vec<SectionRecord>) {
    for record in records {
        match into.get(&record.display_name) {
            Some(existing)
                if existing.last_modified_date_time >= record.last_modified_date_time => {}
            _ => {
                into.insert(record.display_name.clone(), record);
            }
        }
    }
}

/// Merge one listing page of page records into the accumulated title → id
/// mapping, last write wins.
fn merge_pages(into: &mut IndexMap<String, String>, records: Vec<PageRecord>) {
    for record in records {
        if into.contains_key(&record.title) {
            tracing::warn!(
                title = %record.title,
                "duplicate page title in section, keeping the later fetch"
            );
        }
        into.insert(record.title, record.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(id: &str, name: &str, modified: &str) -> SectionRecord {
        SectionRecord {
            id: id.to_string(),
            display_name: name.to_string(),
            last_modified_date_time: modified.parse().unwrap(),
        }
    }

    #[test]
    fn later_modified_section_wins() {
        let mut merged = IndexMap::new();
        merge_sections(
            &mut merged,
            vec![
                section("a", "Work", "2024-01-01T00:00:00Z"),
                section("b", "Work", "2024-06-01T00:00:00Z"),
            ],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged["Work"].id, "b");
    }

    #[test]
    fn earlier_duplicate_is_discarded_across_pages() {
        let mut merged = IndexMap::new();
        merge_sections(&mut merged, vec![section("a", "Work", "2024-06-01T00:00:00Z")]);
        merge_sections(&mut merged, vec![section("b", "Work", "2024-01-01T00:00:00Z")]);
        assert_eq!(merged["Work"].id, "a");
    }

    #[test]
    fn distinct_sections_keep_listing_order() {
        let mut merged = IndexMap::new();
        merge_sections(
            &mut merged,
            vec![
                section("a", "Work", "2024-01-01T00:00:00Z"),
                section("b", "Home", "2024-01-02T00:00:00Z"),
            ],
        );
        let names: Vec<&String> = merged.keys().collect();
        assert_eq!(names, ["Work", "Home"]);
    }

    #[test]
    fn duplicate_page_title_is_last_write_wins() {
        let mut merged = IndexMap::new();
        merge_pages(
            &mut merged,
            vec![
                PageRecord {
                    id: "p1".to_string(),
                    title: "Plan".to_string(),
                },
                PageRecord {
                    id: "p2".to_string(),
                    title: "Plan".to_string(),
                },
            ],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged["Plan"], "p2");
    }

    #[test]
    fn listing_page_parses_next_link() {
        let page: ListingPage<PageRecord> = serde_json::from_str(
            r#"{"value": [{"id": "p1", "title": "t"}],
                "@odata.nextLink": "https://example.test/next"}"#,
        )
        .unwrap();
        assert_eq!(page.value.len(), 1);
        assert_eq!(page.next_link.as_deref(), Some("https://example.test/next"));
    }

    #[test]
    fn listing_page_without_value_is_empty() {
        let page: ListingPage<PageRecord> = serde_json::from_str("{}").unwrap();
        assert!(page.value.is_empty());
        assert!(page.next_link.is_none());
    }
}
