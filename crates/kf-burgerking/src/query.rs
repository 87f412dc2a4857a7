use crate::api_interfaces::restaurants;
use crate::constants::*;
use crate::error::QueryError;
use crate::grid::Coordinate;
use crate::store::StoreRecord;
use crate::transport::Transport;

/// One coordinate and radius sent to the service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchWindow {
    pub coordinate: Coordinate,
    pub radius_m: f64,
}

/// The page of stores returned for a window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowResult {
    pub stores: Vec<StoreRecord>,
    /// How many stores the service says match, when it says so. Diagnostic only.
    pub total_count: Option<u64>,
    /// More stores matched than fit on the page; the rest are not retrievable.
    pub truncated: bool,
}

/// Issues one nearby-restaurants query per window over a [`Transport`].
///
/// Never retries; the caller decides what a failed window means.
#[derive(Debug)]
pub struct QueryExecutor<T> {
    transport: T,
    endpoint: String,
    page_size: u32,
}

impl<T: Transport> QueryExecutor<T> {
    pub fn new(transport: T, endpoint: Option<&str>, page_size: u32) -> Self {
        Self {
            transport,
            endpoint: endpoint
                .unwrap_or(DEFAULT_RESTAURANT_SERVICE_URL)
                .to_string(),
            page_size,
        }
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// The JSON batch body for a window: open restaurants near the coordinate.
    pub fn request_body(&self, window: &SearchWindow) -> Result<String, serde_json::Error> {
        let request = restaurants::Request {
            operation_name: GET_RESTAURANTS_OPERATION,
            variables: restaurants::Variables {
                input: restaurants::RestaurantsInput {
                    filter: "NEARBY",
                    coordinates: restaurants::Coordinates {
                        user_lat: window.coordinate.lat,
                        user_lng: window.coordinate.lng,
                        search_radius: window.radius_m,
                    },
                    first: self.page_size,
                    status: "OPEN",
                },
            },
            query: GET_RESTAURANTS_QUERY,
        };
        serde_json::to_string(&[request])
    }

    pub async fn fetch(&self, window: &SearchWindow) -> Result<WindowResult, QueryError> {
        let body = self.request_body(window)?;
        let response = self.transport.post_json(&self.endpoint, body).await?;
        if !response.status.is_success() {
            return Err(QueryError::ResponseError(response.status));
        }
        let elements: Vec<restaurants::Response> = serde_json::from_str(&response.body)?;
        let element = elements
            .into_iter()
            .next()
            .ok_or(QueryError::MalformedResponse("a response element"))?;
        let messages: Vec<String> = element.errors.into_iter().map(|e| e.message).collect();
        let page = match element.data.and_then(|data| data.restaurants) {
            Some(page) => page,
            None if !messages.is_empty() => return Err(QueryError::RemoteError(messages)),
            None => return Err(QueryError::MalformedResponse("data.restaurants")),
        };
        if !messages.is_empty() {
            // Partial result: failed nodes come back as null and are skipped below
            tracing::warn!(
                lat = window.coordinate.lat,
                lng = window.coordinate.lng,
                errors = %messages.join("; "),
                "service reported errors alongside data, keeping the page"
            );
        }

        let mut stores: Vec<StoreRecord> = page.nodes.into_iter().flatten().collect();
        stores.truncate(self.page_size as usize);
        let truncated = page
            .total_count
            .is_some_and(|total| total > u64::from(self.page_size));
        Ok(WindowResult {
            stores,
            total_count: page.total_count,
            truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::transport::{HttpTransport, HttpTransportConfig};
    use httpmock::prelude::*;
    use serde_json::{json, Value};

    const BERLIN: SearchWindow = SearchWindow {
        coordinate: Coordinate {
            lat: 52.52,
            lng: 13.4,
        },
        radius_m: 50_000.0,
    };

    async fn executor(url: &str, page_size: u32) -> QueryExecutor<HttpTransport> {
        let mut transport = HttpTransport::new(HttpTransportConfig {
            warmup_url: None,
            ..HttpTransportConfig::default()
        });
        transport.connect().await.unwrap();
        QueryExecutor::new(transport, Some(url), page_size)
    }

    fn nodes(count: usize) -> Vec<Value> {
        (0..count)
            .map(|i| json!({"storeId": format!("{}", 1000 + i), "name": format!("BK {}", i)}))
            .collect()
    }

    fn page(total_count: u64, nodes: Vec<Value>) -> Value {
        json!([{"data": {"restaurants": {"totalCount": total_count, "nodes": nodes}}}])
    }

    #[tokio::test]
    async fn fetch_success() {
        // Arrange
        let server = MockServer::start_async().await;
        let expected_request = json!([{
            "operationName": "GetRestaurants",
            "variables": {
                "input": {
                    "filter": "NEARBY",
                    "coordinates": {
                        "userLat": 52.52,
                        "userLng": 13.4,
                        "searchRadius": 50000.0
                    },
                    "first": 100,
                    "status": "OPEN"
                }
            },
            "query": GET_RESTAURANTS_QUERY
        }]);
        let graphql_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/graphql").json_body(expected_request);
                then.status(200).json_body(page(2, nodes(2)));
            })
            .await;
        let executor = executor(&server.url("/graphql"), 100).await;

        // Act
        let result = executor.fetch(&BERLIN).await;

        // Assert
        assert!(result.is_ok(), "Failed to fetch: {:?}", result.unwrap_err());
        let result = result.unwrap();
        assert_eq!(result.stores.len(), 2);
        assert_eq!(result.stores[0].identity(), Ok("1000".to_string()));
        assert_eq!(result.total_count, Some(2));
        assert!(!result.truncated);
        graphql_mock.assert();
    }

    #[tokio::test]
    async fn fetch_total_count_over_page_size() {
        // Arrange
        let server = MockServer::start_async().await;
        let graphql_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/graphql");
                then.status(200).json_body(page(150, nodes(100)));
            })
            .await;
        let executor = executor(&server.url("/graphql"), 100).await;

        // Act
        let result = executor.fetch(&BERLIN).await;

        // Assert
        let result = result.unwrap();
        assert_eq!(result.stores.len(), 100);
        assert_eq!(result.total_count, Some(150));
        assert!(result.truncated);
        graphql_mock.assert();
    }

    #[tokio::test]
    async fn fetch_caps_oversized_page() {
        // Arrange
        let server = MockServer::start_async().await;
        let graphql_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/graphql");
                then.status(200).json_body(page(12, nodes(12)));
            })
            .await;
        let executor = executor(&server.url("/graphql"), 10).await;

        // Act
        let result = executor.fetch(&BERLIN).await.unwrap();

        // Assert
        assert_eq!(result.stores.len(), 10);
        assert!(result.truncated);
        graphql_mock.assert();
    }

    #[tokio::test]
    async fn fetch_empty_page() {
        let server = MockServer::start_async().await;
        let graphql_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/graphql");
                then.status(200).json_body(json!([
                    {"data": {"restaurants": {"totalCount": 0, "nodes": [null]}}}
                ]));
            })
            .await;
        let executor = executor(&server.url("/graphql"), 100).await;

        let result = executor.fetch(&BERLIN).await.unwrap();

        assert!(result.stores.is_empty());
        assert!(!result.truncated);
        graphql_mock.assert();
    }

    #[tokio::test]
    async fn fetch_invalid_url() {
        let executor = executor("http://test.invalid", 100).await;

        let result = executor.fetch(&BERLIN).await;

        assert!(matches!(
            result.unwrap_err(),
            QueryError::TransportError(TransportError::RequestError(_))
        ));
    }

    #[tokio::test]
    async fn fetch_bad_status() {
        // Arrange
        let server = MockServer::start_async().await;
        let graphql_mock = server
            .mock_async(|when, then| {
                when.path("/graphql");
                then.status(403);
            })
            .await;
        let executor = executor(&server.url("/graphql"), 100).await;

        // Act
        let result = executor.fetch(&BERLIN).await;

        // Assert
        assert!(matches!(result.unwrap_err(), QueryError::ResponseError(_)));
        graphql_mock.assert();
    }

    #[tokio::test]
    async fn fetch_bad_json() {
        // Arrange
        let server = MockServer::start_async().await;
        let graphql_mock = server
            .mock_async(|when, then| {
                when.path("/graphql");
                then.status(200)
                    .header("Content-Type", "application/json")
                    .body(r#"{"error": "something is amiss" }"#);
            })
            .await;
        let executor = executor(&server.url("/graphql"), 100).await;

        // Act
        let result = executor.fetch(&BERLIN).await;

        // Assert
        assert!(matches!(result.unwrap_err(), QueryError::ParseError(_)));
        graphql_mock.assert();
    }

    #[tokio::test]
    async fn fetch_remote_errors() {
        // Arrange
        let server = MockServer::start_async().await;
        let graphql_mock = server
            .mock_async(|when, then| {
                when.path("/graphql");
                then.status(200).json_body(json!([
                    {"errors": [{"message": "market not found"}, {"message": "try again"}]}
                ]));
            })
            .await;
        let executor = executor(&server.url("/graphql"), 100).await;

        // Act
        let result = executor.fetch(&BERLIN).await;

        // Assert
        let err = result.unwrap_err();
        assert!(matches!(&err, QueryError::RemoteError(messages) if messages.len() == 2));
        assert_eq!(
            err.to_string(),
            "the service reported errors: market not found; try again"
        );
        graphql_mock.assert();
    }

    #[tokio::test]
    async fn fetch_partial_errors_keep_data() {
        // Arrange
        let server = MockServer::start_async().await;
        let graphql_mock = server
            .mock_async(|when, then| {
                when.path("/graphql");
                then.status(200).json_body(json!([{
                    "data": {"restaurants": {"totalCount": 2, "nodes": [{"storeId": "1"}, null]}},
                    "errors": [{"message": "Cannot return null for non-nullable field"}]
                }]));
            })
            .await;
        let executor = executor(&server.url("/graphql"), 100).await;

        // Act
        let result = executor.fetch(&BERLIN).await;

        // Assert
        assert!(result.is_ok(), "Failed to fetch: {:?}", result.unwrap_err());
        let result = result.unwrap();
        assert_eq!(result.stores.len(), 1);
        assert_eq!(result.stores[0].identity(), Ok("1".to_string()));
        assert_eq!(result.total_count, Some(2));
        graphql_mock.assert();
    }

    #[tokio::test]
    async fn fetch_missing_restaurants() {
        let server = MockServer::start_async().await;
        let graphql_mock = server
            .mock_async(|when, then| {
                when.path("/graphql");
                then.status(200).json_body(json!([{"data": {}}]));
            })
            .await;
        let executor = executor(&server.url("/graphql"), 100).await;

        let result = executor.fetch(&BERLIN).await;

        assert!(matches!(
            result.unwrap_err(),
            QueryError::MalformedResponse("data.restaurants")
        ));
        graphql_mock.assert();
    }

    #[tokio::test]
    async fn fetch_empty_batch() {
        let server = MockServer::start_async().await;
        let graphql_mock = server
            .mock_async(|when, then| {
                when.path("/graphql");
                then.status(200).json_body(json!([]));
            })
            .await;
        let executor = executor(&server.url("/graphql"), 100).await;

        let result = executor.fetch(&BERLIN).await;

        assert!(matches!(
            result.unwrap_err(),
            QueryError::MalformedResponse(_)
        ));
        graphql_mock.assert();
    }
}
