use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};

use crate::constants::*;
use crate::error::{TransportError, TransportInitError};

/// Raw HTTP outcome handed back to the query executor.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Something that can POST JSON from a context the service accepts.
///
/// A plain HTTP client works for some deployments; others only answer requests
/// that originate from a browser session. Implement this to swap the two.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the session. Called once before the first request.
    async fn connect(&mut self) -> Result<(), TransportInitError>;

    async fn post_json(&self, url: &str, body: String) -> Result<TransportResponse, TransportError>;
}

#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    pub user_agent: String,
    pub ui_language: String,
    pub ui_region: String,
    /// Page loaded once on connect so the session picks up the site's cookies.
    pub warmup_url: Option<String>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            ui_language: DEFAULT_UI_LANGUAGE.to_string(),
            ui_region: DEFAULT_UI_REGION.to_string(),
            warmup_url: Some(DEFAULT_STORE_LOCATOR_URL.to_string()),
        }
    }
}

/// Direct HTTP transport backed by reqwest, with a cookie store shared across
/// requests.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    config: HttpTransportConfig,
    client: Option<Client>,
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, TransportInitError> {
    HeaderValue::from_str(value).map_err(|_| TransportInitError::InvalidHeader(name.to_string()))
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Self {
        Self {
            config,
            client: None,
        }
    }

    fn default_headers(&self) -> Result<HeaderMap, TransportInitError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static(UI_LANGUAGE_HEADER),
            header_value(UI_LANGUAGE_HEADER, &self.config.ui_language)?,
        );
        headers.insert(
            HeaderName::from_static(UI_REGION_HEADER),
            header_value(UI_REGION_HEADER, &self.config.ui_region)?,
        );
        Ok(headers)
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(HttpTransportConfig::default())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn connect(&mut self) -> Result<(), TransportInitError> {
        header_value("user-agent", &self.config.user_agent)?;
        let client = Client::builder()
            .gzip(true)
            .brotli(true)
            .cookie_store(true)
            .user_agent(self.config.user_agent.clone())
            .default_headers(self.default_headers()?)
            .build()
            .map_err(TransportInitError::ClientBuildError)?;

        if let Some(warmup_url) = &self.config.warmup_url {
            tracing::info!(url = %warmup_url, "loading store locator page");
            let response = client
                .get(warmup_url)
                .send()
                .await
                .map_err(TransportInitError::WarmupRequestError)?;
            if !response.status().is_success() {
                return Err(TransportInitError::WarmupResponseError(response.status()));
            }
        }

        self.client = Some(client);
        Ok(())
    }

    async fn post_json(&self, url: &str, body: String) -> Result<TransportResponse, TransportError> {
        let client = self.client.as_ref().ok_or(TransportError::NotConnected)?;
        let response = client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn config_without_warmup() -> HttpTransportConfig {
        HttpTransportConfig {
            warmup_url: None,
            ..HttpTransportConfig::default()
        }
    }

    #[tokio::test]
    async fn post_json_sends_market_headers() {
        // Arrange
        let server = MockServer::start_async().await;
        let graphql_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/graphql")
                    .header("content-type", "application/json")
                    .header(UI_LANGUAGE_HEADER, DEFAULT_UI_LANGUAGE)
                    .header(UI_REGION_HEADER, DEFAULT_UI_REGION)
                    .body("[]");
                then.status(200).body("[{}]");
            })
            .await;
        let mut transport = HttpTransport::new(config_without_warmup());
        transport.connect().await.unwrap();

        // Act
        let response = transport
            .post_json(&server.url("/graphql"), "[]".to_string())
            .await;

        // Assert
        let response = response.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, "[{}]");
        graphql_mock.assert();
    }

    #[tokio::test]
    async fn post_json_before_connect() {
        let transport = HttpTransport::new(config_without_warmup());

        let response = transport
            .post_json("http://test.invalid", "[]".to_string())
            .await;

        assert!(matches!(response.unwrap_err(), TransportError::NotConnected));
    }

    #[tokio::test]
    async fn connect_loads_warmup_page() {
        // Arrange
        let server = MockServer::start_async().await;
        let page_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/store-locator");
                then.status(200).body("<html></html>");
            })
            .await;
        let mut transport = HttpTransport::new(HttpTransportConfig {
            warmup_url: Some(server.url("/store-locator")),
            ..HttpTransportConfig::default()
        });

        // Act
        let result = transport.connect().await;

        // Assert
        assert!(result.is_ok(), "Failed to connect: {:?}", result.unwrap_err());
        page_mock.assert();
    }

    #[tokio::test]
    async fn connect_warmup_bad_status() {
        // Arrange
        let server = MockServer::start_async().await;
        let page_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/store-locator");
                then.status(403);
            })
            .await;
        let mut transport = HttpTransport::new(HttpTransportConfig {
            warmup_url: Some(server.url("/store-locator")),
            ..HttpTransportConfig::default()
        });

        // Act
        let result = transport.connect().await;

        // Assert
        assert!(matches!(
            result.unwrap_err(),
            TransportInitError::WarmupResponseError(StatusCode::FORBIDDEN)
        ));
        page_mock.assert();
    }

    #[tokio::test]
    async fn connect_warmup_unreachable() {
        let mut transport = HttpTransport::new(HttpTransportConfig {
            warmup_url: Some("http://test.invalid".to_string()),
            ..HttpTransportConfig::default()
        });

        let result = transport.connect().await;

        assert!(matches!(
            result.unwrap_err(),
            TransportInitError::WarmupRequestError(_)
        ));
    }

    #[tokio::test]
    async fn connect_rejects_bad_header() {
        let mut transport = HttpTransport::new(HttpTransportConfig {
            ui_region: "DE\n".to_string(),
            ..config_without_warmup()
        });

        let result = transport.connect().await;

        assert!(matches!(
            result.unwrap_err(),
            TransportInitError::InvalidHeader(name) if name == UI_REGION_HEADER
        ));
    }
}
