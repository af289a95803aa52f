//! Bearer-authenticated REST client
//!
//! Handles access token retrieval and HTTP requests for one provider API.
//! Paths are joined onto the base URL; absolute URLs (paging links) pass
//! through unchanged.

use std::sync::Arc;

use actionarc_core::AccessTokenSource;
use actionarc_domain::Result;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::http::{ensure_success, read_json, HttpClient};

pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const GOOGLE_CALENDAR_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
pub const GMAIL_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";
pub const SPOTIFY_BASE_URL: &str = "https://api.spotify.com/v1";

/// REST API client with token management
#[derive(Clone)]
pub struct ApiClient {
    provider: &'static str,
    base_url: String,
    http: HttpClient,
    tokens: Arc<dyn AccessTokenSource>,
}

impl ApiClient {
    /// # Arguments
    /// * `provider` - Label used in logs and error messages (`"graph"`, ...)
    /// * `base_url` - API root without trailing slash
    /// * `tokens` - Source of bearer tokens (usually an `OAuthManager`)
    pub fn new(
        provider: &'static str,
        base_url: impl Into<String>,
        http: HttpClient,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { provider, base_url, http, tokens }
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// Request builder with the bearer token attached.
    pub async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.tokens.access_token().await?;
        Ok(self.http.request(method, self.url(path)).bearer_auth(token))
    }

    /// Sends with retries and fails on any non-success status.
    pub async fn execute(&self, builder: RequestBuilder) -> Result<Response> {
        let response = self.http.send(builder).await?;
        ensure_success(response, self.provider).await
    }

    /// Sends and decodes a JSON body.
    pub async fn execute_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.http.send(builder).await?;
        read_json(response, self.provider).await
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        debug!(provider = self.provider, path, "GET");
        let builder = self.request(Method::GET, path).await?.query(query);
        self.execute_json(builder).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        debug!(provider = self.provider, path, "POST");
        let builder = self.request(Method::POST, path).await?.json(body);
        self.execute_json(builder).await
    }

    /// For endpoints answering 202/204 with no useful body.
    pub async fn send_no_content<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<()> {
        debug!(provider = self.provider, %method, path, "request without response body");
        let builder = self.request(method, path).await?;
        let builder = match body {
            Some(body) => builder.json(body),
            // Some APIs reject body-less PUT/POST without a Content-Length.
            None => builder.body(""),
        };
        self.execute(builder).await.map(|_| ())
    }
}


#[cfg(test)]
mod tests {
    use actionarc_domain::ActionArcError;
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::testing::api;

    #[test]
    fn absolute_urls_pass_through() {
        let client = api("graph", "https://graph.microsoft.com/v1.0/");
        assert_eq!(client.url("me/events"), "https://graph.microsoft.com/v1.0/me/events");
        assert_eq!(client.url("/me"), "https://graph.microsoft.com/v1.0/me");
        assert_eq!(client.url("https://next.example/page2"), "https://next.example/page2");
    }

    #[tokio::test]
    async fn get_json_sends_bearer_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/items"))
            .and(query_param("q", "x"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "n": 1 })))
            .expect(1)
            .mount(&server)
            .await;

        let value: Value = api("test", &server.uri()).get_json("items", &[("q", "x".into())]).await.unwrap();
        assert_eq!(value["n"], 1);
    }

    #[tokio::test]
    async fn no_content_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("PUT")).respond_with(ResponseTemplate::new(404)).mount(&server).await;

        let err = api("test", &server.uri())
            .send_no_content::<Value>(reqwest::Method::PUT, "player/pause", None)
            .await
            .unwrap_err();
        assert!(err.is_status(404));
        assert!(!matches!(err, ActionArcError::Auth(_)));
    }
}
