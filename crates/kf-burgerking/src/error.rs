use thiserror::Error;

/// The transport or session could not be set up. Fatal for a sweep.
#[derive(Debug, Error)]
pub enum TransportInitError {
    #[error("unable to build the HTTP client: {0}")]
    ClientBuildError(#[source] reqwest::Error),
    #[error("invalid header value for {0}")]
    InvalidHeader(String),
    #[error("unable to load the store locator page: {0}")]
    WarmupRequestError(#[source] reqwest::Error),
    #[error("the store locator page responded with status code: {0}")]
    WarmupResponseError(reqwest::StatusCode),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("the request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("the transport has no session, call connect first")]
    NotConnected,
    #[error("{0}")]
    Other(String),
}

/// A single window's request failed. The sweep skips the window and carries on.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("the request failed: {0}")]
    TransportError(#[from] TransportError),
    #[error("the request failed with status code: {0}")]
    ResponseError(reqwest::StatusCode),
    #[error("unable to parse the response body: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("the service reported errors: {}", .0.join("; "))]
    RemoteError(Vec<String>),
    #[error("the response is missing {0}")]
    MalformedResponse(&'static str),
}

/// A candidate record carried neither `storeId` nor `number`.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("record has no storeId or number (name: {})", .name.as_deref().unwrap_or("<unnamed>"))]
pub struct IdentityError {
    pub name: Option<String>,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unable to create the output directory: {0}")]
    CreateDirError(#[source] std::io::Error),
    #[error("unable to write the file: {0}")]
    WriteError(#[from] std::io::Error),
    #[error("unable to serialize the data: {0}")]
    SerializeError(#[from] serde_json::Error),
    #[error("unable to write the rows: {0}")]
    CsvError(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unable to read the file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("unable to parse the file: {0}")]
    ParseError(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("unable to write the file: {0}")]
    WriteError(#[from] std::io::Error),
    #[error("unable to serialize the data: {0}")]
    SerializeError(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("grid steps must be positive and finite (lat: {lat_step}, lng: {lng_step})")]
    InvalidStep { lat_step: f64, lng_step: f64 },
    #[error("bounds are inverted or not finite")]
    InvalidBounds,
    #[error("grid would exceed {} points", crate::grid::MAX_GRID_POINTS)]
    TooManyPoints,
}

/// The sweep could not start. Nothing was queried.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("unable to set up the transport: {0}")]
    TransportInitError(#[from] TransportInitError),
    #[error("invalid search grid: {0}")]
    GridError(#[from] GridError),
    #[error("the sweep has already run")]
    AlreadyStarted,
}
