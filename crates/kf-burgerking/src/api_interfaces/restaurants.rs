use serde::{Deserialize, Serialize};

use crate::store::StoreRecord;

// The service takes a batch: the request body is a JSON array of these.

/// Raw GraphQL request.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request<'a> {
    pub operation_name: &'a str,
    pub variables: Variables,
    pub query: &'a str,
}

#[derive(Serialize)]
pub struct Variables {
    pub input: RestaurantsInput,
}

#[derive(Serialize)]
pub struct RestaurantsInput {
    pub filter: &'static str,
    pub coordinates: Coordinates,
    pub first: u32,
    pub status: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub user_lat: f64,
    pub user_lng: f64,
    pub search_radius: f64,
}

/// Raw response element from API. The response body is a JSON array of these.
#[derive(Deserialize)]
pub struct Response {
    pub data: Option<Data>,
    #[serde(default)]
    pub errors: Vec<RemoteError>,
}

#[derive(Deserialize)]
pub struct Data {
    pub restaurants: Option<Restaurants>,
}

/// Raw restaurant page from API.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurants {
    pub total_count: Option<u64>,
    #[serde(default)]
    pub nodes: Vec<Option<StoreRecord>>,
}

#[derive(Deserialize)]
pub struct RemoteError {
    pub message: String,
}
