// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification message rendering.

use bagwatch_core::types::{OutboundMessage, ParseMode, PickupWindow};
use bagwatch_core::{BagwatchError, ChatId, ListingSnapshot};

const DATE_FORMAT: &str = "%d/%m/%Y";
const TIME_FORMAT: &str = "%H:%M";

/// Formats a pickup window in the marketplace's own UTC offset.
///
/// Same-day windows render as `DD/MM/YYYY HH:MM-HH:MM`, windows crossing
/// midnight as `DD/MM/YYYY HH:MM - DD/MM/YYYY HH:MM`.
pub fn format_pickup_window(window: &PickupWindow) -> String {
    let (start, end) = (window.start, window.end);
    if start.date_naive() == end.date_naive() {
        format!(
            "{} {}-{}",
            start.format(DATE_FORMAT),
            start.format(TIME_FORMAT),
            end.format(TIME_FORMAT)
        )
    } else {
        format!(
            "{} {} - {} {}",
            start.format(DATE_FORMAT),
            start.format(TIME_FORMAT),
            end.format(DATE_FORMAT),
            end.format(TIME_FORMAT)
        )
    }
}

/// Escapes the characters Telegram's HTML parse mode treats specially.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders the availability notification for a listing.
///
/// Fails with [`BagwatchError::InvalidListing`] when the snapshot carries
/// no display details.
pub fn render_notification(
    chat_id: ChatId,
    listing: &ListingSnapshot,
) -> Result<OutboundMessage, BagwatchError> {
    let details = listing
        .details
        .as_ref()
        .ok_or_else(|| BagwatchError::InvalidListing {
            listing_id: listing.id.clone(),
            reason: "missing display fields".into(),
        })?;

    let available = listing
        .items_available
        .ok_or_else(|| BagwatchError::InvalidListing {
            listing_id: listing.id.clone(),
            reason: "missing stock count".into(),
        })?;

    let description = details.description.lines().next().unwrap_or_default();

    let content = format!(
        "🎉 New surprise bag available!\n\n\
         🏪 <b>{store}</b>\n\
         📦 {name}\n\
         📝 {description}\n\n\
         💰 Price: {price}\n\
         💎 Value: {value}\n\
         📦 Available: {available}\n\
         ⏰ Pickup: {pickup}\n\n\
         ⚡️ Hurry, they tend to sell out fast!",
        store = escape_html(&details.store_name),
        name = escape_html(&details.display_name),
        description = escape_html(description),
        price = escape_html(&details.price.to_string()),
        value = escape_html(&details.value.to_string()),
        pickup = format_pickup_window(&details.pickup),
    );

    Ok(OutboundMessage {
        chat_id,
        content,
        image_url: details.image_url.clone(),
        parse_mode: ParseMode::Html,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bagwatch_core::{ListingDetails, ListingId, Money};
    use chrono::DateTime;

    fn window(start: &str, end: &str) -> PickupWindow {
        PickupWindow {
            start: DateTime::parse_from_rfc3339(start).unwrap(),
            end: DateTime::parse_from_rfc3339(end).unwrap(),
        }
    }

    fn euros(minor_units: i64) -> Money {
        Money {
            minor_units,
            decimals: 2,
            code: "EUR".into(),
        }
    }

    fn listing(details: Option<ListingDetails>) -> ListingSnapshot {
        ListingSnapshot {
            id: ListingId::from("42"),
            items_available: Some(3),
            details,
        }
    }

    fn details() -> ListingDetails {
        ListingDetails {
            display_name: "Pâtisserie Lune".into(),
            description: "Croissants & more\nAllergens: gluten".into(),
            store_name: "Lune <Centre>".into(),
            price: euros(399),
            value: euros(1200),
            pickup: window("2024-01-05T18:00:00Z", "2024-01-05T20:30:00Z"),
            image_url: Some("https://images.example/bag.jpg".into()),
        }
    }

    #[test]
    fn same_day_window() {
        let w = window("2024-01-05T18:00:00Z", "2024-01-05T20:30:00Z");
        assert_eq!(format_pickup_window(&w), "05/01/2024 18:00-20:30");
    }

    #[test]
    fn cross_day_window() {
        let w = window("2024-01-05T23:00:00Z", "2024-01-06T01:00:00Z");
        assert_eq!(format_pickup_window(&w), "05/01/2024 23:00 - 06/01/2024 01:00");
    }

    #[test]
    fn window_keeps_source_offset() {
        let w = window("2024-01-05T18:00:00+01:00", "2024-01-05T19:00:00+01:00");
        assert_eq!(format_pickup_window(&w), "05/01/2024 18:00-19:00");
    }

    #[test]
    fn escapes_html_metacharacters() {
        assert_eq!(escape_html("a < b & \"c\" > d"), "a &lt; b &amp; &quot;c&quot; &gt; d");
    }

    #[test]
    fn renders_full_notification() {
        let msg = render_notification(ChatId(7), &listing(Some(details()))).unwrap();
        assert_eq!(msg.chat_id, ChatId(7));
        assert_eq!(msg.parse_mode, ParseMode::Html);
        assert_eq!(msg.image_url.as_deref(), Some("https://images.example/bag.jpg"));

        assert!(msg.content.contains("🏪 <b>Lune &lt;Centre&gt;</b>"));
        assert!(msg.content.contains("📦 Pâtisserie Lune"));
        assert!(msg.content.contains("📝 Croissants &amp; more\n"));
        assert!(!msg.content.contains("Allergens"));
        assert!(msg.content.contains("💰 Price: 3.99€"));
        assert!(msg.content.contains("💎 Value: 12.00€"));
        assert!(msg.content.contains("📦 Available: 3"));
        assert!(msg.content.contains("⏰ Pickup: 05/01/2024 18:00-20:30"));
    }

    #[test]
    fn empty_description_renders_blank_line() {
        let mut d = details();
        d.description = String::new();
        let msg = render_notification(ChatId(7), &listing(Some(d))).unwrap();
        assert!(msg.content.contains("📝 \n"));
    }

    #[test]
    fn missing_details_is_invalid_listing() {
        let err = render_notification(ChatId(7), &listing(None)).unwrap_err();
        assert!(matches!(
            err,
            BagwatchError::InvalidListing { ref listing_id, .. } if listing_id.0 == "42"
        ));
    }

    #[test]
    fn unknown_stock_is_invalid_listing() {
        let mut snapshot = listing(Some(details()));
        snapshot.items_available = None;
        let err = render_notification(ChatId(7), &snapshot).unwrap_err();
        assert!(err.to_string().contains("missing stock count"));
    }
}
