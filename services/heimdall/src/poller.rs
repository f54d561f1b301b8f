//! Paginated site polling

use std::sync::Arc;

use crate::io::HttpClient;
use crate::site::{Site, SiteMessage};

/// Fixed page size of the list endpoints; a page shorter than this is
/// treated as the last one (size-based has-more heuristic, no cursor).
pub const PAGE_SIZE: usize = 32;

/// Whether a page of `len` records implies another page behind it
pub fn has_more(len: usize) -> bool {
    len == PAGE_SIZE
}

/// Client for the site list and message endpoints
pub struct SiteApi {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl std::fmt::Debug for SiteApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteApi")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl SiteApi {
    pub fn new(http: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Fetch one zero-indexed page of site snapshots
    pub async fn fetch_sites_page(&self, page: u32) -> crate::Result<Vec<Site>> {
        let url = format!("{}/api/sites/?page={}", self.base_url, page);
        let response = self.http.get(&url).await?;
        if response.status != 200 {
            return Err(crate::HeimdallError::Http(format!(
                "GET {} -> {}",
                url, response.status
            )));
        }
        Ok(serde_json::from_str(&response.body)?)
    }

    /// Fetch the full site list, page by page.
    ///
    /// Requests the next page only while pages come back full. A failed or
    /// undecodable page halts pagination for this pass and returns what was
    /// accumulated so far; there is no retry.
    pub async fn fetch_all_sites(&self) -> Vec<Site> {
        let mut sites = Vec::new();
        let mut page = 0u32;
        loop {
            let batch = match self.fetch_sites_page(page).await {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::warn!("Site list page {} failed, stopping: {}", page, e);
                    break;
                }
            };
            let len = batch.len();
            sites.extend(batch);
            if !has_more(len) {
                break;
            }
            page += 1;
        }
        sites
    }

    /// Fetch a site's most recent messages, newest-first as the server
    /// returns them
    pub async fn fetch_site_messages(&self, site_id: i64) -> crate::Result<Vec<SiteMessage>> {
        let url = format!("{}/api/sites/{}/messages/", self.base_url, site_id);
        let response = self.http.get(&url).await?;
        if response.status != 200 {
            return Err(crate::HeimdallError::Http(format!(
                "GET {} -> {}",
                url, response.status
            )));
        }
        Ok(serde_json::from_str(&response.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{HttpResponse, MockHttpClient};

    fn sites_json(ids: std::ops::Range<i64>) -> String {
        let sites: Vec<String> = ids
            .map(|id| format!(r#"{{"id": {}, "name": "s{}"}}"#, id, id))
            .collect();
        format!("[{}]", sites.join(","))
    }

    fn ok(body: String) -> crate::Result<HttpResponse> {
        Ok(HttpResponse { status: 200, body })
    }

    #[tokio::test]
    async fn short_page_stops_pagination() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .withf(|url| url.ends_with("/api/sites/?page=0"))
            .times(1)
            .returning(|_| Box::pin(async { ok(sites_json(1..4)) }));

        let api = SiteApi::new(Arc::new(mock), "http://localhost:7000");
        let sites = api.fetch_all_sites().await;
        assert_eq!(sites.len(), 3);
    }

    #[tokio::test]
    async fn full_page_requests_the_next_one() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .withf(|url| url.ends_with("?page=0"))
            .times(1)
            .returning(|_| Box::pin(async { ok(sites_json(1..33)) }));
        mock.expect_get()
            .withf(|url| url.ends_with("?page=1"))
            .times(1)
            .returning(|_| Box::pin(async { ok(sites_json(33..40)) }));

        let api = SiteApi::new(Arc::new(mock), "http://localhost:7000");
        let sites = api.fetch_all_sites().await;
        assert_eq!(sites.len(), 39);
    }

    #[tokio::test]
    async fn empty_page_is_end_of_data() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .times(1)
            .returning(|_| Box::pin(async { ok("[]".to_string()) }));

        let api = SiteApi::new(Arc::new(mock), "http://localhost:7000");
        assert!(api.fetch_all_sites().await.is_empty());
    }

    #[tokio::test]
    async fn non_success_page_halts_silently() {
        let mut mock = MockHttpClient::new();
        mock.expect_get().times(1).returning(|_| {
            Box::pin(async {
                Ok(HttpResponse {
                    status: 500,
                    body: "Internal Server Error".to_string(),
                })
            })
        });

        let api = SiteApi::new(Arc::new(mock), "http://localhost:7000");
        assert!(api.fetch_all_sites().await.is_empty());
    }

    #[tokio::test]
    async fn failed_second_page_keeps_first() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .withf(|url| url.ends_with("?page=0"))
            .times(1)
            .returning(|_| Box::pin(async { ok(sites_json(1..33)) }));
        mock.expect_get()
            .withf(|url| url.ends_with("?page=1"))
            .times(1)
            .returning(|_| {
                Box::pin(async { Err(crate::HeimdallError::Http("connection reset".to_string())) })
            });

        let api = SiteApi::new(Arc::new(mock), "http://localhost:7000");
        let sites = api.fetch_all_sites().await;
        assert_eq!(sites.len(), 32);
    }

    #[tokio::test]
    async fn fetch_messages_hits_site_path() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .withf(|url| url.ends_with("/api/sites/7/messages/"))
            .times(1)
            .returning(|_| {
                Box::pin(async {
                    ok(r#"[{"id": 2, "site": 7, "timestamp": 90, "text": "b", "tag": "warn"},
                           {"id": 1, "site": 7, "timestamp": 80, "text": "a", "tag": "info"}]"#
                        .to_string())
                })
            });

        let api = SiteApi::new(Arc::new(mock), "http://localhost:7000");
        let messages = api.fetch_site_messages(7).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, 2);
    }

    #[tokio::test]
    async fn fetch_messages_non_success_is_error() {
        let mut mock = MockHttpClient::new();
        mock.expect_get().returning(|_| {
            Box::pin(async {
                Ok(HttpResponse {
                    status: 404,
                    body: String::new(),
                })
            })
        });

        let api = SiteApi::new(Arc::new(mock), "http://localhost:7000");
        assert!(api.fetch_site_messages(7).await.is_err());
    }

    #[test]
    fn has_more_is_the_page_size_heuristic() {
        assert!(has_more(PAGE_SIZE));
        assert!(!has_more(PAGE_SIZE - 1));
        assert!(!has_more(0));
    }
}
