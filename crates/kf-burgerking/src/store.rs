use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::IdentityError;

pub const STORE_ID_FIELD: &str = "storeId";
pub const NUMBER_FIELD: &str = "number";
pub const ADDRESS_FIELD: &str = "physicalAddress";

/// One restaurant as the service returned it.
///
/// The whole received document is kept, including fields this crate does not
/// model; accessors read the modeled subset on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreRecord(Map<String, Value>);

fn render_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl StoreRecord {
    /// The deduplication key: `storeId`, falling back to `number`.
    ///
    /// Empty strings and nulls count as absent. Numeric ids are rendered as text.
    pub fn identity(&self) -> Result<String, IdentityError> {
        self.text(STORE_ID_FIELD)
            .or_else(|| self.text(NUMBER_FIELD))
            .ok_or_else(|| IdentityError { name: self.name() })
    }

    /// A top-level scalar field rendered as text, `None` if absent, null or empty.
    pub fn text(&self, field: &str) -> Option<String> {
        self.0.get(field).and_then(render_scalar)
    }

    /// A field of the nested `physicalAddress` object rendered as text.
    pub fn address_text(&self, field: &str) -> Option<String> {
        self.0
            .get(ADDRESS_FIELD)
            .and_then(Value::as_object)
            .and_then(|address| address.get(field))
            .and_then(render_scalar)
    }

    /// A capability flag. Absent or non-boolean values read as `false`.
    pub fn flag(&self, field: &str) -> bool {
        self.0.get(field).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn name(&self) -> Option<String> {
        self.text("name")
    }

    pub fn latitude(&self) -> Option<f64> {
        self.0.get("latitude").and_then(Value::as_f64)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.0.get("longitude").and_then(Value::as_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> StoreRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn identity_prefers_store_id() {
        let store = record(json!({"storeId": "7001", "number": "42"}));
        assert_eq!(store.identity(), Ok("7001".to_string()));
    }

    #[test]
    fn identity_falls_back_to_number() {
        let store = record(json!({"storeId": null, "number": "42"}));
        assert_eq!(store.identity(), Ok("42".to_string()));

        let store = record(json!({"storeId": "", "number": 42}));
        assert_eq!(store.identity(), Ok("42".to_string()));
    }

    #[test]
    fn identity_missing() {
        let store = record(json!({"name": "BK Nowhere"}));
        assert_eq!(
            store.identity(),
            Err(IdentityError {
                name: Some("BK Nowhere".to_string())
            })
        );
    }

    #[test]
    fn accessors_read_nested_address_and_flags() {
        let store = record(json!({
            "storeId": "7001",
            "latitude": 52.52,
            "longitude": 13.4,
            "physicalAddress": {"address1": "Alexanderplatz 1", "address2": null},
            "hasDriveThru": true,
            "hasWifi": "yes"
        }));

        assert_eq!(store.address_text("address1").as_deref(), Some("Alexanderplatz 1"));
        assert_eq!(store.address_text("address2"), None);
        assert_eq!(store.latitude(), Some(52.52));
        assert_eq!(store.longitude(), Some(13.4));
        assert!(store.flag("hasDriveThru"));
        assert!(!store.flag("hasWifi"));
        assert!(!store.flag("hasParking"));
    }

    #[test]
    fn unmodeled_fields_survive_serialization() {
        let raw = json!({
            "_id": "abc",
            "storeId": "7001",
            "diningRoomHours": {"mon": "10-22"},
            "address2": null
        });
        let store = record(raw.clone());

        assert_eq!(serde_json::to_value(&store).unwrap(), raw);
    }
}
