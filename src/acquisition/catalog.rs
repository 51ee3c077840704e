//! Paginated granule search against the Earthdata CMR catalog.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::acquisition::client::{ensure_success, HttpClient};
use crate::error::Result;
use crate::utils::constants::{FIRST_PAGE, GRANULE_SUFFIX, SECURE_SCHEME};

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    feed: Feed,
}

#[derive(Debug, Default, Deserialize)]
struct Feed {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Default, Deserialize)]
struct Entry {
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Default, Deserialize)]
struct Link {
    #[serde(default)]
    href: Option<String>,
}

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GranulePage {
    /// Entries on the page, whether or not they had a usable link
    pub entries: usize,
    /// Secure `.nc` links in page order
    pub urls: Vec<String>,
}

impl GranulePage {
    /// Decode a `granules.json` body
    pub fn parse(body: &str) -> Result<Self> {
        let response: SearchResponse = serde_json::from_str(body)?;
        let entries = response.feed.entry.len();
        let urls = response
            .feed
            .entry
            .into_iter()
            .flat_map(|entry| entry.links)
            .filter_map(|link| link.href)
            .filter(|href| is_granule_link(href))
            .collect();
        Ok(Self { entries, urls })
    }
}

/// `https://` links ending in `.nc`
pub fn is_granule_link(href: &str) -> bool {
    href.starts_with(SECURE_SCHEME) && href.ends_with(GRANULE_SUFFIX)
}

/// Request pages from `FIRST_PAGE` until one comes back with no entries
///
/// Links are concatenated in page order; nothing is deduplicated.
pub async fn collect_pages<F, Fut>(mut fetch: F) -> Result<Vec<String>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<GranulePage>>,
{
    let mut urls = Vec::new();
    let mut page_num = FIRST_PAGE;
    loop {
        let page = fetch(page_num).await?;
        if page.entries == 0 {
            break;
        }
        debug!(page = page_num, entries = page.entries, links = page.urls.len(), "catalog page");
        urls.extend(page.urls);
        page_num += 1;
    }
    Ok(urls)
}

/// CMR granule search client
pub struct CatalogClient<'a> {
    http: &'a HttpClient,
    base_url: String,
    page_size: u32,
    timeout: Duration,
}

impl<'a> CatalogClient<'a> {
    pub fn new(http: &'a HttpClient, base_url: &str, page_size: u32, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size,
            timeout,
        }
    }

    pub async fn fetch_page(&self, concept_id: &str, page_num: u32) -> Result<GranulePage> {
        let response = self
            .http
            .inner()
            .get(format!("{}/granules.json", self.base_url))
            .query(&[
                ("collection_concept_id", concept_id.to_string()),
                ("page_size", self.page_size.to_string()),
                ("page_num", page_num.to_string()),
            ])
            .timeout(self.timeout)
            .send()
            .await?;
        let body = ensure_success(response)?.text().await?;
        GranulePage::parse(&body)
    }

    /// Every granule link of a collection
    pub async fn granule_urls(&self, concept_id: &str) -> Result<Vec<String>> {
        collect_pages(|page_num| self.fetch_page(concept_id, page_num)).await
    }
}
