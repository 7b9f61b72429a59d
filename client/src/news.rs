use crate::error::{ClientError, ClientResult};
use common::{NewsArticle, NewsPage};
use serde::Deserialize;
use std::time::Duration;

/// Search term used for the news feed ("deepfake" in Korean)
pub const NEWS_QUERY: &str = "딥페이크";
pub const NEWS_LANGUAGE: &str = "ko";
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsEnvelope {
    status: String,
    #[serde(default)]
    total_results: u64,
    #[serde(default)]
    articles: Vec<NewsArticle>,
    #[serde(default)]
    message: Option<String>,
}

/// Client for the third-party news search API
#[derive(Clone)]
pub struct NewsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl NewsClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub async fn fetch(&self, page: u32, page_size: u32) -> ClientResult<NewsPage> {
        let page_size_param = page_size.to_string();
        let page_param = page.max(1).to_string();

        let response = self
            .http
            .get(format!("{}/everything", self.base_url))
            .query(&[
                ("q", NEWS_QUERY),
                ("language", NEWS_LANGUAGE),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size_param.as_str()),
                ("page", page_param.as_str()),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let envelope: NewsEnvelope = serde_json::from_str(&body)?;

        if envelope.status != "ok" {
            let message = envelope
                .message
                .unwrap_or_else(|| "Failed to load news".to_string());
            tracing::warn!("News API returned {}: {}", status, message);
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }

        Ok(NewsPage {
            articles: envelope.articles,
            total_results: envelope.total_results,
        })
    }
}

/// Page navigation over a news result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewsPager {
    current_page: u32,
    page_size: u32,
    total_results: u64,
}

impl NewsPager {
    pub fn new(page_size: u32) -> Self {
        Self {
            current_page: 1,
            page_size: page_size.max(1),
            total_results: 0,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn total_results(&self) -> u64 {
        self.total_results
    }

    pub fn total_pages(&self) -> u64 {
        self.total_results.div_ceil(self.page_size.max(1) as u64)
    }

    pub fn next_page(&self) -> Option<u32> {
        ((self.current_page as u64) < self.total_pages()).then(|| self.current_page + 1)
    }

    pub fn prev_page(&self) -> Option<u32> {
        (self.current_page > 1).then(|| self.current_page - 1)
    }

    /// Record a loaded page
    pub fn update(&mut self, page: u32, total_results: u64) {
        self.current_page = page.max(1);
        self.total_results = total_results;
    }
}

impl Default for NewsPager {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pager_bounds() {
        let mut pager = NewsPager::default();
        assert_eq!(pager.total_pages(), 0);
        assert_eq!(pager.next_page(), None);
        assert_eq!(pager.prev_page(), None);

        pager.update(1, 25);
        assert_eq!(pager.total_pages(), 3);
        assert_eq!(pager.next_page(), Some(2));
        assert_eq!(pager.prev_page(), None);

        pager.update(3, 25);
        assert_eq!(pager.next_page(), None);
        assert_eq!(pager.prev_page(), Some(2));
    }

    #[test]
    fn test_pager_exact_multiple() {
        let mut pager = NewsPager::new(10);
        pager.update(2, 20);
        assert_eq!(pager.total_pages(), 2);
        assert_eq!(pager.next_page(), None);
    }

    #[test]
    fn test_pager_zero_page_size_clamped() {
        let pager = NewsPager::new(0);
        assert_eq!(pager.page_size(), 1);

        let pager = NewsPager {
            current_page: 1,
            page_size: 0,
            total_results: 25,
        };
        assert_eq!(pager.total_pages(), 25);
    }

    #[test]
    fn test_envelope_error_shape() {
        let envelope: NewsEnvelope = serde_json::from_str(
            r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid."}"#,
        )
        .unwrap();
        assert_eq!(envelope.status, "error");
        assert!(envelope.articles.is_empty());
        assert_eq!(envelope.message.as_deref(), Some("Your API key is invalid."));
    }
}
