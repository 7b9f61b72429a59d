/// Integration tests for the news feed client
///
/// Run with: cargo test -p client --test integration_news
use client::news::{NewsClient, NewsPager};
use client::ClientError;
use std::time::Duration;
use test_utils::{FakeBackend, NEWS_API_KEY};

#[tokio::test]
async fn test_fetch_news_page() {
    let backend = FakeBackend::start().await.unwrap();
    let news = NewsClient::new(&backend.base_url, NEWS_API_KEY, Duration::from_secs(5)).unwrap();
    let mut pager = NewsPager::default();

    let page = news.fetch(2, pager.page_size()).await.unwrap();
    pager.update(2, page.total_results);

    assert_eq!(page.total_results, 25);
    assert_eq!(page.articles.len(), 1);
    assert_eq!(page.articles[0].title, "Deepfake crackdown");
    assert_eq!(
        page.articles[0].source.as_ref().and_then(|s| s.name.as_deref()),
        Some("Daily")
    );
    assert_eq!(pager.total_pages(), 3);
    assert_eq!(pager.next_page(), Some(3));
    assert_eq!(pager.prev_page(), Some(1));

    let query = backend.last_request("/everything").unwrap().query.unwrap();
    assert!(query.contains("pageSize=10"));
    assert!(query.contains("page=2"));
    assert!(query.contains("language=ko"));
    assert!(query.contains("sortBy=publishedAt"));
}

#[tokio::test]
async fn test_fetch_news_bad_key() {
    let backend = FakeBackend::start().await.unwrap();
    let news = NewsClient::new(&backend.base_url, "nope", Duration::from_secs(5)).unwrap();

    let err = news.fetch(1, 10).await.unwrap_err();

    assert!(matches!(
        err,
        ClientError::Server { status: 401, ref message } if message == "Your API key is invalid."
    ));
}
