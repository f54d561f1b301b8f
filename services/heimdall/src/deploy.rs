//! Read-only deploy log client

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::fmt::{fmt_duration, fmt_timestamp};
use crate::io::HttpClient;
use crate::poller::has_more;

/// Lifecycle of a deploy run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStatus {
    Pending,
    Running,
    Failed,
    Success,
}

/// One deploy run, never mutated client-side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deploy {
    pub id: i64,
    pub repo: String,
    pub actor: String,
    #[serde(default)]
    pub sender: Option<String>,
    pub begin: i64,
    pub finish: i64,
    pub status: DeployStatus,
    /// Captured output of the deploy run
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}

impl Deploy {
    /// One-line log rendering: id, status, who, where, when, how long
    pub fn summary(&self) -> String {
        let sender = self.sender.as_deref().unwrap_or("-");
        format!(
            "#{} [{:?}] {}@{} in {} | {} | {}",
            self.id,
            self.status,
            sender,
            self.actor,
            self.repo,
            fmt_timestamp(self.begin),
            fmt_duration(self.begin, self.finish),
        )
    }
}

/// A fetched page plus whether the heuristic says more pages exist
#[derive(Debug)]
pub struct DeployPage {
    pub deploys: Vec<Deploy>,
    pub has_next: bool,
}

/// Client for the paginated deploy log endpoint
pub struct DeployApi {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl DeployApi {
    pub fn new(http: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Fetch one zero-indexed page of the deploy log
    pub async fn fetch_deploys_page(&self, page: u32) -> crate::Result<DeployPage> {
        let url = format!("{}/api/deploy/?page={}", self.base_url, page);
        let response = self.http.get(&url).await?;
        if response.status != 200 {
            return Err(crate::HeimdallError::Http(format!(
                "GET {} -> {}",
                url, response.status
            )));
        }
        let deploys: Vec<Deploy> = serde_json::from_str(&response.body)?;
        let has_next = has_more(deploys.len());
        Ok(DeployPage { deploys, has_next })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{HttpResponse, MockHttpClient};

    fn deploy_json(id: i64, status: &str) -> String {
        format!(
            r#"{{"id": {}, "repo": "web", "actor": "ci", "sender": "alice",
                 "begin": 100, "finish": 245, "status": "{}"}}"#,
            id, status
        )
    }

    #[tokio::test]
    async fn fetch_page_decodes_statuses() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .withf(|url| url.ends_with("/api/deploy/?page=0"))
            .times(1)
            .returning(|_| {
                Box::pin(async {
                    Ok(HttpResponse {
                        status: 200,
                        body: format!(
                            "[{},{}]",
                            deploy_json(1, "success"),
                            deploy_json(2, "running")
                        ),
                    })
                })
            });

        let api = DeployApi::new(Arc::new(mock), "http://localhost:7000");
        let page = api.fetch_deploys_page(0).await.unwrap();
        assert_eq!(page.deploys.len(), 2);
        assert_eq!(page.deploys[0].status, DeployStatus::Success);
        assert_eq!(page.deploys[1].status, DeployStatus::Running);
        assert!(!page.has_next);
    }

    #[tokio::test]
    async fn full_page_reports_more() {
        let rows: Vec<String> = (1..=32).map(|id| deploy_json(id, "pending")).collect();
        let body = format!("[{}]", rows.join(","));

        let mut mock = MockHttpClient::new();
        mock.expect_get().times(1).returning(move |_| {
            let body = body.clone();
            Box::pin(async move { Ok(HttpResponse { status: 200, body }) })
        });

        let api = DeployApi::new(Arc::new(mock), "http://localhost:7000");
        let page = api.fetch_deploys_page(0).await.unwrap();
        assert!(page.has_next);
    }

    #[tokio::test]
    async fn non_success_is_error() {
        let mut mock = MockHttpClient::new();
        mock.expect_get().returning(|_| {
            Box::pin(async {
                Ok(HttpResponse {
                    status: 502,
                    body: String::new(),
                })
            })
        });

        let api = DeployApi::new(Arc::new(mock), "http://localhost:7000");
        assert!(api.fetch_deploys_page(0).await.is_err());
    }

    #[test]
    fn summary_includes_duration_and_sender() {
        let deploy: Deploy = serde_json::from_str(&deploy_json(9, "failed")).unwrap();
        let line = deploy.summary();
        assert!(line.starts_with("#9 [Failed] alice@ci in web"), "{line}");
        assert!(line.ends_with("2m 25s"), "{line}");
    }

    #[test]
    fn summary_missing_sender() {
        let mut deploy: Deploy = serde_json::from_str(&deploy_json(9, "failed")).unwrap();
        deploy.sender = None;
        assert!(deploy.summary().contains("-@ci"), "{}", deploy.summary());
    }
}
