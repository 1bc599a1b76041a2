//! Server endpoints used by page behaviors.

use crate::config::EndpointConfig;
use crate::error::{Result, UiError};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// JSON body of the favorite toggle request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToggleFavoriteRequest {
    /// Book to toggle.
    pub book_id: String,
}

/// Response shared by the favorite endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteResponse {
    /// Whether the server applied the change.
    pub success: bool,
    /// Message to show the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FavoriteResponse {
    /// Successful response.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    /// Failed response.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Url-encoded body of the favorite removal request.
pub fn remove_favorite_body(book_id: &str) -> String {
    format!(
        "action=remove_favorite&book_id={}",
        urlencoding::encode(book_id)
    )
}

/// Favorite endpoints.
#[async_trait]
pub trait FavoriteApi: Send + Sync {
    /// Toggle a book in the user's favorites.
    async fn toggle(&self, book_id: &str) -> Result<FavoriteResponse>;

    /// Remove a book from the user's favorites.
    async fn remove(&self, book_id: &str) -> Result<FavoriteResponse>;
}

/// [`FavoriteApi`] over HTTP.
pub struct HttpFavoriteApi {
    client: reqwest::Client,
    toggle_url: String,
    remove_url: String,
}

impl HttpFavoriteApi {
    /// Build a client for the configured endpoints.
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            toggle_url: config.url(&config.favorite_toggle),
            remove_url: config.url(&config.favorite_remove),
        })
    }

    async fn read(response: reqwest::Response) -> Result<FavoriteResponse> {
        let status = response.status();
        if !status.is_success() {
            return Err(UiError::Request(format!(
                "Server returned {}",
                status
            )));
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl FavoriteApi for HttpFavoriteApi {
    async fn toggle(&self, book_id: &str) -> Result<FavoriteResponse> {
        tracing::debug!(book_id, url = %self.toggle_url, "Toggling favorite");
        let response = self
            .client
            .post(&self.toggle_url)
            .json(&ToggleFavoriteRequest {
                book_id: book_id.to_string(),
            })
            .send()
            .await?;
        Self::read(response).await
    }

    async fn remove(&self, book_id: &str) -> Result<FavoriteResponse> {
        tracing::debug!(book_id, url = %self.remove_url, "Removing favorite");
        let response = self
            .client
            .post(&self.remove_url)
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .body(remove_favorite_body(book_id))
            .send()
            .await?;
        Self::read(response).await
    }
}

/// A form built by script and submitted as a regular navigation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSubmission {
    /// Form action URL.
    pub action: String,
    /// HTTP method.
    pub method: String,
    /// Fields in order.
    pub fields: Vec<(String, String)>,
}

impl FormSubmission {
    /// A POST form.
    pub fn post(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            method: "POST".to_string(),
            fields: Vec::new(),
        }
    }

    /// Add a field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Value of a field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Performs form navigations.
pub trait FormSubmitter: Send + Sync {
    /// Submit the form; the page is expected to navigate away.
    fn submit(&self, form: &FormSubmission) -> Result<()>;
}

/// Submitter that only logs; used when no host navigation is available.
pub struct LoggingSubmitter;

impl FormSubmitter for LoggingSubmitter {
    fn submit(&self, form: &FormSubmission) -> Result<()> {
        tracing::info!(action = %form.action, method = %form.method, fields = form.fields.len(), "Form submitted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_body_is_encoded() {
        assert_eq!(
            remove_favorite_body("42"),
            "action=remove_favorite&book_id=42"
        );
        assert_eq!(
            remove_favorite_body("a&b=c"),
            "action=remove_favorite&book_id=a%26b%3Dc"
        );
    }

    #[test]
    fn test_response_message_optional() {
        let r: FavoriteResponse = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(r.success);
        assert_eq!(r.message, None);

        let r: FavoriteResponse =
            serde_json::from_str(r#"{"success":false,"message":"Not logged in"}"#).unwrap();
        assert_eq!(r, FavoriteResponse::failed("Not logged in"));
    }

    #[test]
    fn test_toggle_request_shape() {
        let body = serde_json::to_value(ToggleFavoriteRequest {
            book_id: "b-1".to_string(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "book_id": "b-1" }));
    }

    #[test]
    fn test_form_submission_fields() {
        let form = FormSubmission::post("/admin/categories/delete").field("category_id", "7");
        assert_eq!(form.method, "POST");
        assert_eq!(form.get("category_id"), Some("7"));
        assert_eq!(form.get("missing"), None);
    }

    #[test]
    fn test_http_api_resolves_urls() {
        let api = HttpFavoriteApi::new(&EndpointConfig::default()).unwrap();
        assert_eq!(api.toggle_url, "http://localhost:8080/api/favorites/toggle");
        assert_eq!(api.remove_url, "http://localhost:8080/favorites");
    }
}
