//! HTTP client for the dashboard API.
//!
//! Two endpoints are used:
//!
//! - **Upsert** (`PUT`): accepts `{"feeds": [...]}` with a bearer token and
//!   creates or updates each feed by its integration id.
//! - **Token refresh** (`POST`): exchanges a secret key and uuid for a
//!   short-lived JWT.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dashboard_api::DashboardClient;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DashboardClient::builder()
//!         .upsert_endpoint("https://dashboard.example/api/feeds")
//!         .token_endpoint("https://dashboard.example/api/token")
//!         .timeout(Duration::from_secs(5))
//!         .build()?;
//!
//!     let token = client.refresh_token("secret", "uuid").await?;
//!     client.upsert_feeds(&token, &[]).await?;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::feed::{TokenRequest, TokenResponse, UpsertFeed, UpsertRequest};
use crate::DashboardError;

/// Client for the feed upsert and token refresh endpoints.
#[derive(Debug, Clone)]
pub struct DashboardClient {
    client: Client,
    upsert_endpoint: String,
    token_endpoint: String,
}

impl DashboardClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> DashboardClientBuilder {
        DashboardClientBuilder::default()
    }

    /// Returns the upsert endpoint.
    pub fn upsert_endpoint(&self) -> &str {
        &self.upsert_endpoint
    }

    /// Returns the token refresh endpoint.
    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }

    /// Upsert a batch of feeds in a single request.
    pub async fn upsert_feeds(
        &self,
        token: &str,
        feeds: &[UpsertFeed],
    ) -> Result<(), DashboardError> {
        debug!(
            endpoint = %self.upsert_endpoint,
            feeds = feeds.len(),
            "upserting feeds"
        );

        let response = self
            .client
            .put(&self.upsert_endpoint)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&UpsertRequest { feeds })
            .send()
            .await?;

        check_status(response.status(), &self.upsert_endpoint)
    }

    /// Exchange a secret key and uuid for a fresh JWT.
    pub async fn refresh_token(
        &self,
        secret_key: &str,
        uuid: &str,
    ) -> Result<String, DashboardError> {
        let response = self
            .client
            .post(&self.token_endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&TokenRequest { secret_key, uuid })
            .send()
            .await?;

        check_status(response.status(), &self.token_endpoint)?;

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| DashboardError::Parse(e.to_string()))?;

        Ok(body.token)
    }
}

/// Builder for DashboardClient.
#[derive(Debug, Default)]
pub struct DashboardClientBuilder {
    upsert_endpoint: Option<String>,
    token_endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl DashboardClientBuilder {
    /// Set the feed upsert endpoint.
    pub fn upsert_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.upsert_endpoint = Some(endpoint.into());
        self
    }

    /// Set the JWT refresh endpoint.
    pub fn token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.token_endpoint = Some(endpoint.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<DashboardClient, DashboardError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));

        let client = Client::builder().timeout(timeout).build()?;

        Ok(DashboardClient {
            client,
            upsert_endpoint: self
                .upsert_endpoint
                .unwrap_or_else(|| "http://localhost:8080/api/feeds".to_string()),
            token_endpoint: self
                .token_endpoint
                .unwrap_or_else(|| "http://localhost:8080/api/token".to_string()),
        })
    }
}

fn check_status(status: StatusCode, endpoint: &str) -> Result<(), DashboardError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(DashboardError::Auth(format!(
            "'{}' rejected the token ({})",
            endpoint, status
        )));
    }

    if status == StatusCode::NOT_FOUND {
        return Err(DashboardError::NotFound(endpoint.to_string()));
    }

    if !status.is_success() {
        return Err(DashboardError::Http(format!("API returned status {}", status)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;
    use serde_json::{json, Value};
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// What the client sent to [`serve_once`].
    #[derive(Debug)]
    struct Request {
        line: String,
        headers: Vec<(String, String)>,
        body: Value,
    }

    impl Request {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        }
    }

    /// Accept one connection on a local port, answer it with `status` and a
    /// JSON `reply`, and hand back the request.
    async fn serve_once(
        status: &'static str,
        reply: &'static str,
    ) -> (String, JoinHandle<Request>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(stream);

            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();

            let mut headers = Vec::new();
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).await.unwrap();
                let header = header.trim_end();
                if header.is_empty() {
                    break;
                }
                if let Some((key, value)) = header.split_once(':') {
                    headers.push((key.trim().to_string(), value.trim().to_string()));
                }
            }

            let length = headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
                .map(|(_, value)| value.parse::<usize>().unwrap())
                .unwrap_or(0);
            let mut body = vec![0; length];
            reader.read_exact(&mut body).await.unwrap();

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{reply}",
                reply.len()
            );
            reader.get_mut().write_all(response.as_bytes()).await.unwrap();
            let _ = reader.get_mut().shutdown().await;

            Request {
                line: line.trim_end().to_string(),
                headers,
                body: serde_json::from_slice(&body).unwrap_or(Value::Null),
            }
        });

        (base, handle)
    }

    fn feed(integration_id: &str) -> UpsertFeed {
        UpsertFeed {
            integration_id: integration_id.to_string(),
            name: "web01".to_string(),
            description: "web01 reachability".to_string(),
            organisation_id: 1,
            space_id: 4,
            page_id: 3,
            dependencies: vec!["host::page_3:space_4:status::core01".to_string()],
            color: Color::Amber,
            message: "PING WARNING - rta 150ms".to_string(),
            custom_data: json!({ "tags": {} }),
        }
    }

    #[test]
    fn test_builder_defaults() {
        let client = DashboardClient::builder().build().unwrap();
        assert_eq!(client.upsert_endpoint(), "http://localhost:8080/api/feeds");
        assert_eq!(client.token_endpoint(), "http://localhost:8080/api/token");
    }

    #[test]
    fn test_builder_custom() {
        let client = DashboardClient::builder()
            .upsert_endpoint("https://dash.local/feeds")
            .token_endpoint("https://dash.local/token")
            .timeout(Duration::from_secs(3))
            .build()
            .unwrap();

        assert_eq!(client.upsert_endpoint(), "https://dash.local/feeds");
        assert_eq!(client.token_endpoint(), "https://dash.local/token");
    }

    #[test]
    fn test_check_status() {
        assert!(check_status(StatusCode::OK, "x").is_ok());
        assert!(check_status(StatusCode::NO_CONTENT, "x").is_ok());
        assert!(matches!(
            check_status(StatusCode::UNAUTHORIZED, "x"),
            Err(DashboardError::Auth(_))
        ));
        assert!(matches!(
            check_status(StatusCode::NOT_FOUND, "https://dash.local/feeds"),
            Err(DashboardError::NotFound(endpoint)) if endpoint == "https://dash.local/feeds"
        ));
        assert!(matches!(
            check_status(StatusCode::BAD_GATEWAY, "x"),
            Err(DashboardError::Http(_))
        ));
    }

    #[tokio::test]
    async fn test_upsert_sends_bearer_put() {
        let (base, server) = serve_once("200 OK", "{}").await;
        let client = DashboardClient::builder()
            .upsert_endpoint(format!("{base}/api/feeds"))
            .build()
            .unwrap();

        let feeds = vec![
            feed("host::page_3:space_4:status::web01"),
            feed("host::page_3:space_4:status::web02"),
        ];
        client.upsert_feeds("jwt-1", &feeds).await.unwrap();

        let request = server.await.unwrap();
        assert_eq!(request.line, "PUT /api/feeds HTTP/1.1");
        assert_eq!(request.header("authorization"), Some("Bearer jwt-1"));
        assert_eq!(request.header("content-type"), Some("application/json"));

        let sent = request.body["feeds"].as_array().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1]["integration_id"], "host::page_3:space_4:status::web02");
        assert_eq!(sent[0]["pageId"], 3);
        assert_eq!(sent[0]["color"], "amber");
        assert_eq!(sent[0]["dependencies"][0], "host::page_3:space_4:status::core01");
    }

    #[tokio::test]
    async fn test_upsert_rejected_token_is_auth_error() {
        let (base, server) = serve_once("401 Unauthorized", "{}").await;
        let client = DashboardClient::builder()
            .upsert_endpoint(format!("{base}/api/feeds"))
            .build()
            .unwrap();

        let result = client.upsert_feeds("expired", &[feed("a")]).await;
        assert!(matches!(result, Err(DashboardError::Auth(_))));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_token_posts_credentials() {
        let (base, server) = serve_once("200 OK", r#"{"token":"t"}"#).await;
        let client = DashboardClient::builder()
            .token_endpoint(format!("{base}/api/token"))
            .build()
            .unwrap();

        let token = client.refresh_token("s3cret", "1234-abcd").await.unwrap();
        assert_eq!(token, "t");

        let request = server.await.unwrap();
        assert_eq!(request.line, "POST /api/token HTTP/1.1");
        assert_eq!(request.header("authorization"), None);
        assert_eq!(request.body, json!({ "secret_key": "s3cret", "uuid": "1234-abcd" }));
    }

    #[tokio::test]
    async fn test_refresh_token_bad_body_is_parse_error() {
        let (base, server) = serve_once("200 OK", r#"{"jwt":"t"}"#).await;
        let client = DashboardClient::builder()
            .token_endpoint(format!("{base}/api/token"))
            .build()
            .unwrap();

        let result = client.refresh_token("s", "u").await;
        assert!(matches!(result, Err(DashboardError::Parse(_))));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_upsert_unreachable_endpoint_fails() {
        let client = DashboardClient::builder()
            .upsert_endpoint("http://127.0.0.1:9/feeds")
            .timeout(Duration::from_millis(500))
            .build()
            .unwrap();

        let result = client.upsert_feeds("token", &[]).await;
        assert!(result.is_err());
    }
}
