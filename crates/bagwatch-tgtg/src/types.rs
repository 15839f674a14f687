// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the Too Good To Go API and conversion into
//! [`ListingSnapshot`].

use bagwatch_core::{ListingDetails, ListingId, ListingSnapshot, Money};
use bagwatch_core::types::PickupWindow;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Device type reported on auth requests.
pub(crate) const DEVICE_TYPE: &str = "ANDROID";

/// Search origin for the items endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Origin {
    pub latitude: f64,
    pub longitude: f64,
}

/// Request body for `item/v8/`.
#[derive(Debug, Clone, Serialize)]
pub struct ItemsRequest {
    pub origin: Origin,
    pub radius: u32,
    pub page_size: u32,
    pub page: u32,
    pub favorites_only: bool,
    pub with_stock_only: bool,
    pub discover: bool,
}

/// Response body of `item/v8/`.
///
/// Items stay untyped here so that one malformed entry cannot fail the
/// whole page; see [`parse_item`].
#[derive(Debug, Deserialize)]
pub struct ItemsResponse {
    #[serde(default)]
    pub items: Vec<Value>,
}

/// Request body for `auth/v5/authByEmail`.
#[derive(Debug, Serialize)]
pub struct AuthByEmailRequest<'a> {
    pub device_type: &'a str,
    pub email: &'a str,
}

/// Response body of `auth/v5/authByEmail`.
#[derive(Debug, Deserialize)]
pub struct AuthByEmailResponse {
    pub state: String,
    #[serde(default)]
    pub polling_id: Option<String>,
}

/// Request body for `auth/v5/authByRequestPollingId`.
#[derive(Debug, Serialize)]
pub struct AuthPollRequest<'a> {
    pub device_type: &'a str,
    pub email: &'a str,
    pub request_polling_id: &'a str,
}

/// Successful response body of `auth/v5/authByRequestPollingId`.
#[derive(Debug, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct RawPrice {
    code: String,
    minor_units: i64,
    decimals: u32,
}

impl From<RawPrice> for Money {
    fn from(raw: RawPrice) -> Self {
        Money {
            minor_units: raw.minor_units,
            decimals: raw.decimals,
            code: raw.code,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPicture {
    current_url: String,
}

#[derive(Debug, Deserialize)]
struct RawItemInfo {
    item_price: RawPrice,
    item_value: RawPrice,
    #[serde(default)]
    description: String,
    #[serde(default)]
    cover_picture: Option<RawPicture>,
}

#[derive(Debug, Deserialize)]
struct RawStore {
    store_name: String,
}

#[derive(Debug, Deserialize)]
struct RawInterval {
    start: String,
    end: String,
}

/// The display-only part of an item. Every field here is needed to render
/// a notification.
#[derive(Debug, Deserialize)]
struct RawDetails {
    item: RawItemInfo,
    store: RawStore,
    display_name: String,
    pickup_interval: RawInterval,
}

impl RawDetails {
    fn into_details(self) -> Result<ListingDetails, String> {
        let start = DateTime::parse_from_rfc3339(&self.pickup_interval.start)
            .map_err(|e| format!("bad pickup start: {e}"))?;
        let end = DateTime::parse_from_rfc3339(&self.pickup_interval.end)
            .map_err(|e| format!("bad pickup end: {e}"))?;
        Ok(ListingDetails {
            display_name: self.display_name,
            description: self.item.description,
            store_name: self.store.store_name,
            price: self.item.item_price.into(),
            value: self.item.item_value.into(),
            pickup: PickupWindow { start, end },
            image_url: self.item.cover_picture.map(|p| p.current_url),
        })
    }
}

/// The API sends ids as strings, but older payloads used numbers.
fn item_id(value: &Value) -> Option<ListingId> {
    match value.pointer("/item/item_id")? {
        Value::String(s) if !s.is_empty() => Some(ListingId(s.clone())),
        Value::Number(n) => Some(ListingId(n.to_string())),
        _ => None,
    }
}

/// Parse a single favorites entry.
///
/// Returns `None` only when the item id is missing, since such an entry
/// cannot be matched against stored state. A missing or unreadable
/// `items_available` keeps the listing present with an unknown stock count.
/// Display fields that fail to parse leave `details` empty: the listing
/// still counts as present but can never be announced.
pub fn parse_item(value: &Value) -> Option<ListingSnapshot> {
    let Some(id) = item_id(value) else {
        warn!("dropping favorite without item id");
        return None;
    };
    let items_available = value
        .get("items_available")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok());
    if items_available.is_none() {
        warn!(listing_id = %id, "favorite has no readable items_available");
    }

    let details = serde_json::from_value::<RawDetails>(value.clone())
        .map_err(|e| e.to_string())
        .and_then(RawDetails::into_details);
    let details = match details {
        Ok(details) => Some(details),
        Err(reason) => {
            warn!(listing_id = %id, reason = %reason, "favorite has incomplete display fields");
            None
        }
    };

    Some(ListingSnapshot {
        id,
        items_available,
        details,
    })
}

/// Parse every entry of a favorites page, skipping unusable ones.
pub fn parse_items(items: &[Value]) -> Vec<ListingSnapshot> {
    items.iter().filter_map(parse_item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_item() -> Value {
        json!({
            "item": {
                "item_id": "1234",
                "item_price": {"code": "EUR", "minor_units": 399, "decimals": 2},
                "item_value": {"code": "EUR", "minor_units": 1200, "decimals": 2},
                "description": "Bread and pastries\nAllergens: gluten",
                "cover_picture": {"current_url": "https://images.example/bag.jpg"}
            },
            "store": {"store_name": "Boulangerie Martin"},
            "display_name": "Boulangerie Martin - Centre",
            "pickup_interval": {
                "start": "2024-01-15T17:00:00Z",
                "end": "2024-01-15T18:30:00Z"
            },
            "items_available": 3
        })
    }

    #[test]
    fn parses_complete_item() {
        let snapshot = parse_item(&full_item()).unwrap();
        assert_eq!(snapshot.id, ListingId::from("1234"));
        assert_eq!(snapshot.items_available, Some(3));

        let details = snapshot.details.unwrap();
        assert_eq!(details.store_name, "Boulangerie Martin");
        assert_eq!(details.display_name, "Boulangerie Martin - Centre");
        assert_eq!(details.price.minor_units, 399);
        assert_eq!(details.value.to_string(), "12.00€");
        assert_eq!(details.image_url.as_deref(), Some("https://images.example/bag.jpg"));
        assert_eq!(details.pickup.start.to_rfc3339(), "2024-01-15T17:00:00+00:00");
    }

    #[test]
    fn numeric_item_id_is_accepted() {
        let mut item = full_item();
        item["item"]["item_id"] = json!(987);
        assert_eq!(parse_item(&item).unwrap().id, ListingId::from("987"));
    }

    #[test]
    fn missing_id_drops_item() {
        let mut item = full_item();
        item["item"].as_object_mut().unwrap().remove("item_id");
        assert!(parse_item(&item).is_none());
    }

    #[test]
    fn missing_availability_keeps_item_with_unknown_stock() {
        let mut item = full_item();
        item.as_object_mut().unwrap().remove("items_available");
        let snapshot = parse_item(&item).unwrap();
        assert_eq!(snapshot.id, ListingId::from("1234"));
        assert_eq!(snapshot.items_available, None);
    }

    #[test]
    fn non_numeric_availability_is_unknown() {
        let mut item = full_item();
        item["items_available"] = json!("lots");
        assert_eq!(parse_item(&item).unwrap().items_available, None);
    }

    #[test]
    fn sold_out_item_without_pickup_keeps_id() {
        let item = json!({
            "item": {"item_id": "55"},
            "items_available": 0
        });
        let snapshot = parse_item(&item).unwrap();
        assert_eq!(snapshot.items_available, Some(0));
        assert!(snapshot.details.is_none());
    }

    #[test]
    fn malformed_pickup_leaves_details_empty() {
        let mut item = full_item();
        item["pickup_interval"]["start"] = json!("tomorrow-ish");
        let snapshot = parse_item(&item).unwrap();
        assert!(snapshot.details.is_none());
    }

    #[test]
    fn missing_picture_is_not_fatal() {
        let mut item = full_item();
        item["item"].as_object_mut().unwrap().remove("cover_picture");
        let details = parse_item(&item).unwrap().details.unwrap();
        assert!(details.image_url.is_none());
    }

    #[test]
    fn parse_items_skips_bad_entries() {
        let items = vec![full_item(), json!({"items_available": 1}), json!("garbage")];
        let parsed = parse_items(&items);
        assert_eq!(parsed.len(), 1);
    }
}
