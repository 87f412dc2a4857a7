use crate::grid::Bounds;

/// The default endpoint for the Burger King restaurant GraphQL service (EU cluster)
pub const DEFAULT_RESTAURANT_SERVICE_URL: &str = "https://euc1-prod-bk.rbictg.com/graphql";

/// The store locator page visited to establish a session before querying
pub const DEFAULT_STORE_LOCATOR_URL: &str = "https://www.burgerking.de/store-locator";

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Market headers the service uses to pick the region
pub const UI_LANGUAGE_HEADER: &str = "x-ui-language";
pub const UI_REGION_HEADER: &str = "x-ui-region";
pub const DEFAULT_UI_LANGUAGE: &str = "de";
pub const DEFAULT_UI_REGION: &str = "DE";

pub const GET_RESTAURANTS_OPERATION: &str = "GetRestaurants";

pub const GET_RESTAURANTS_QUERY: &str = r#"query GetRestaurants($input: RestaurantsInput) {
  restaurants(input: $input) {
    totalCount
    nodes {
      _id
      storeId
      number
      name
      latitude
      longitude
      phoneNumber
      email
      physicalAddress {
        address1
        address2
        city
        country
        postalCode
        stateProvince
      }
      hasDelivery
      hasDineIn
      hasDriveThru
      hasMobileOrdering
      hasWifi
      hasPlayground
      hasParking
      franchiseGroupName
    }
  }
}"#;

/// Germany, including the islands.
pub const GERMANY_BOUNDS: Bounds = Bounds {
    lat_min: 47.3,
    lat_max: 55.0,
    lng_min: 5.9,
    lng_max: 15.0,
};

// Tuned for Germany at ~50km radius. Re-derive for other latitude bands.
pub const DEFAULT_LAT_STEP: f64 = 0.5;
pub const DEFAULT_LNG_STEP: f64 = 0.7;
pub const DEFAULT_SEARCH_RADIUS_METERS: f64 = 50_000.0;

/// The most locations the service hands back for a single window.
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 800;
pub const DEFAULT_CHECKPOINT_EVERY: usize = 20;

pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_SNAPSHOT_FILE: &str = "progress.json";
pub const DEFAULT_JSON_EXPORT_FILE: &str = "burger-king-stores-germany.json";
pub const DEFAULT_CSV_EXPORT_FILE: &str = "burger-king-stores-germany.csv";
