//! News and preference endpoints.

use reqwest::header;
use serde::Serialize;
use std::time::Duration;

use super::{ApiClient, ApiError, Envelope};
use crate::catalog::{CategoriesPayload, Category};
use crate::news::TodayNews;

/// Payload for adding a brand-new category to the user's preferences.
#[derive(Debug, Clone, Serialize)]
pub struct CreateCategoryRequest {
    pub category_id: String,
    pub title: String,
    pub subcategories: Vec<CreateSubcategory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSubcategory {
    pub subcategory_id: String,
    pub title: String,
}

/// Payload for appending subcategories to an existing category.
#[derive(Debug, Clone, Serialize)]
pub struct AddSubcategoriesRequest {
    pub category_id: String,
    pub subcategories: Vec<CreateSubcategory>,
}

impl ApiClient {
    /// The user's stored preferences: categories filtered down to the
    /// selected subcategories. Empty when nothing has been set yet.
    pub async fn my_categories(&self) -> Result<Vec<Category>, ApiError> {
        let envelope: Envelope<Vec<Category>> = self.get("/news/get/my-categories").await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// First-time preference submission.
    pub async fn set_categories(&self, payload: &CategoriesPayload) -> Result<(), ApiError> {
        self.post::<serde_json::Value, _>("/news/set/categories", payload)
            .await
            .map(|_| ())
    }

    /// Replace an existing preference set.
    pub async fn update_categories(&self, payload: &CategoriesPayload) -> Result<(), ApiError> {
        self.put::<serde_json::Value, _>("/news/update/categories", payload)
            .await
            .map(|_| ())
    }

    pub async fn create_category(&self, request: &CreateCategoryRequest) -> Result<(), ApiError> {
        self.post::<serde_json::Value, _>("/news/create/category", request)
            .await
            .map(|_| ())
    }

    pub async fn add_subcategories(
        &self,
        request: &AddSubcategoriesRequest,
    ) -> Result<(), ApiError> {
        self.post::<serde_json::Value, _>("/news/add-subcategories", request)
            .await
            .map(|_| ())
    }

    /// Today's feed, one article list per provider.
    pub async fn today_news(&self) -> Result<TodayNews, ApiError> {
        let envelope: Envelope<TodayNews> = self.get("/news/get/news").await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// Open the server-sent-event notification stream.
    ///
    /// Returns the raw response; the caller consumes `bytes_stream()` and
    /// feeds chunks through [`drain_sse_events`]. The client-wide timeout
    /// would kill a long-lived stream, so it is overridden here.
    pub async fn open_notification_stream(&self) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}/news/stream", self.base_url);
        let mut request = self
            .http
            .get(&url)
            .header(header::ACCEPT, "text/event-stream")
            .timeout(Duration::from_secs(24 * 60 * 60));
        if let Some(cookie) = self.session.cookie_header() {
            request = request.header(header::COOKIE, cookie);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let bytes = response.bytes().await?;
            return Err(ApiError::from_response(status, &bytes));
        }
        Ok(response)
    }
}

/// Extract complete SSE events from the accumulation buffer.
///
/// Events are separated by a blank line; only `data:` lines carry payload.
/// Partial events stay in the buffer until the next chunk completes them.
pub fn drain_sse_events(buffer: &mut String) -> Vec<String> {
    let mut events = Vec::new();
    while let Some(pos) = buffer.find("\n\n") {
        let raw: String = buffer.drain(..pos + 2).collect();
        let data: Vec<&str> = raw
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(str::trim_start)
            .collect();
        if !data.is_empty() {
            events.push(data.join("\n"));
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::session::SessionStore;
    use httpmock::prelude::*;
    use std::sync::Arc;

    fn client_for(server: &MockServer) -> ApiClient {
        let session = Arc::new(SessionStore::in_memory());
        session.ingest_set_cookies(["access_token=a1", "refresh_token=r1"].iter().copied());
        let config = ApiConfig {
            base_url: server.base_url(),
            timeout_secs: 5,
        };
        ApiClient::new(&config, session).unwrap()
    }

    #[tokio::test]
    async fn test_my_categories_empty_when_unset() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/news/get/my-categories");
            then.status(200).json_body(serde_json::json!({
                "status": "success",
                "message": "Request Successful",
                "status_code": 200,
                "data": null,
            }));
        });

        let client = client_for(&server);
        let categories = client.my_categories().await.unwrap();
        assert!(categories.is_empty());
    }

    #[tokio::test]
    async fn test_set_categories_posts_grouped_payload() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/news/set/categories")
                .json_body(serde_json::json!({
                    "categories_data": [
                        {"category_id": "technical", "subcategories": ["llm"]}
                    ]
                }));
            then.status(201).json_body(serde_json::json!({
                "status": "success",
                "message": "Categories set",
                "status_code": 201,
            }));
        });

        let client = client_for(&server);
        let payload = CategoriesPayload {
            categories_data: crate::catalog::Catalog::default_catalog().group_selection(["llm"]),
        };
        client.set_categories(&payload).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn test_today_news_parses_provider_lists() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/news/get/news");
            then.status(200).json_body(serde_json::json!({
                "status": "success",
                "message": "Request Successful",
                "status_code": 200,
                "data": {
                    "google": [{
                        "title": "Model release",
                        "url": "https://example.com/a",
                        "description": "A new model",
                        "category_id": "technical",
                        "subcategory_id": "llm",
                        "news_from": "Google News",
                    }],
                    "anthropic": [],
                    "openai": [],
                },
            }));
        });

        let client = client_for(&server);
        let news = client.today_news().await.unwrap();
        assert_eq!(news.total(), 1);
        assert_eq!(news.google[0].title, "Model release");
    }

    #[test]
    fn test_drain_sse_events_handles_partial_chunks() {
        let mut buffer = String::new();

        buffer.push_str("data: news_updated\n");
        assert!(drain_sse_events(&mut buffer).is_empty());

        buffer.push_str("\ndata: cate");
        assert_eq!(drain_sse_events(&mut buffer), vec!["news_updated"]);

        buffer.push_str("gories_changed\n\n");
        assert_eq!(drain_sse_events(&mut buffer), vec!["categories_changed"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_sse_events_skips_comments_and_blank_events() {
        let mut buffer = ": keep-alive\n\ndata: ping\n\n".to_string();
        assert_eq!(drain_sse_events(&mut buffer), vec!["ping"]);
    }
}
