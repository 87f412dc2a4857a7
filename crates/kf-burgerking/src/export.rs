use std::path::Path;

use serde::Serialize;

use crate::error::ExportError;
use crate::store::StoreRecord;

/// Column order of the flat row format.
pub const COLUMNS: [&str; 20] = [
    "storeId",
    "number",
    "name",
    "latitude",
    "longitude",
    "address1",
    "address2",
    "city",
    "postalCode",
    "country",
    "phoneNumber",
    "email",
    "hasDelivery",
    "hasDineIn",
    "hasDriveThru",
    "hasMobileOrdering",
    "hasWifi",
    "hasPlayground",
    "hasParking",
    "franchiseGroupName",
];

/// One store flattened to scalar columns. Missing text is empty, missing flags
/// are false.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub store_id: String,
    pub number: String,
    pub name: String,
    pub latitude: String,
    pub longitude: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub phone_number: String,
    pub email: String,
    pub has_delivery: bool,
    pub has_dine_in: bool,
    pub has_drive_thru: bool,
    pub has_mobile_ordering: bool,
    pub has_wifi: bool,
    pub has_playground: bool,
    pub has_parking: bool,
    pub franchise_group_name: String,
}

impl From<&StoreRecord> for ExportRow {
    fn from(store: &StoreRecord) -> Self {
        let text = |field: &str| store.text(field).unwrap_or_default();
        let address = |field: &str| store.address_text(field).unwrap_or_default();
        Self {
            store_id: text("storeId"),
            number: text("number"),
            name: text("name"),
            latitude: text("latitude"),
            longitude: text("longitude"),
            address1: address("address1"),
            address2: address("address2"),
            city: address("city"),
            postal_code: address("postalCode"),
            country: address("country"),
            phone_number: text("phoneNumber"),
            email: text("email"),
            has_delivery: store.flag("hasDelivery"),
            has_dine_in: store.flag("hasDineIn"),
            has_drive_thru: store.flag("hasDriveThru"),
            has_mobile_ordering: store.flag("hasMobileOrdering"),
            has_wifi: store.flag("hasWifi"),
            has_playground: store.flag("hasPlayground"),
            has_parking: store.flag("hasParking"),
            franchise_group_name: text("franchiseGroupName"),
        }
    }
}

pub fn to_records(snapshot: &[StoreRecord]) -> Vec<ExportRow> {
    snapshot.iter().map(ExportRow::from).collect()
}

/// Render rows as CSV with a header line. Fields holding a delimiter, quote or
/// line break are quoted, with inner quotes doubled.
pub fn to_csv(rows: &[ExportRow]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if rows.is_empty() {
        writer.write_record(COLUMNS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::WriteError(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

async fn ensure_parent(path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(ExportError::CreateDirError)?;
    }
    Ok(())
}

/// Write every received document, unmodeled fields included, as a JSON array.
pub async fn write_json<P: AsRef<Path>>(path: P, snapshot: &[StoreRecord]) -> Result<(), ExportError> {
    let path = path.as_ref();
    ensure_parent(path).await?;
    let serialized = serde_json::to_string_pretty(snapshot)?;
    tokio::fs::write(path, serialized).await?;
    Ok(())
}

pub async fn write_csv<P: AsRef<Path>>(path: P, snapshot: &[StoreRecord]) -> Result<(), ExportError> {
    let path = path.as_ref();
    ensure_parent(path).await?;
    let serialized = to_csv(&to_records(snapshot))?;
    tokio::fs::write(path, serialized).await?;
    Ok(())
}
