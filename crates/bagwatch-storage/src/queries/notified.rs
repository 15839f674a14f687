// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notified-listing state per chat.

use std::collections::HashSet;

use bagwatch_core::{BagwatchError, ChatId, ListingId};
use rusqlite::params;

use crate::database::Database;

/// All listing ids with an outstanding notification for the chat.
pub async fn get_notified(db: &Database, chat_id: ChatId) -> Result<HashSet<ListingId>, BagwatchError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<HashSet<ListingId>> {
            let mut stmt =
                conn.prepare("SELECT listing_id FROM notified_listings WHERE chat_id = ?1")?;
            let rows = stmt.query_map(params![chat_id.0], |row| row.get::<_, String>(0))?;
            rows.map(|r| r.map(ListingId))
                .collect::<Result<HashSet<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a notification. A second mark of the same pair is ignored.
///
/// Marking for an unregistered chat fails on the foreign key.
pub async fn mark_notified(
    db: &Database,
    chat_id: ChatId,
    listing_id: &ListingId,
) -> Result<(), BagwatchError> {
    let listing_id = listing_id.0.clone();
    db.connection()
        .call(move |conn| -> rusqlite::Result<()> {
            conn.execute(
                "INSERT OR IGNORE INTO notified_listings (chat_id, listing_id) VALUES (?1, ?2)",
                params![chat_id.0, listing_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Clear a notification. Absent rows are a no-op.
pub async fn unmark_notified(
    db: &Database,
    chat_id: ChatId,
    listing_id: &ListingId,
) -> Result<(), BagwatchError> {
    let listing_id = listing_id.0.clone();
    db.connection()
        .call(move |conn| -> rusqlite::Result<()> {
            conn.execute(
                "DELETE FROM notified_listings WHERE chat_id = ?1 AND listing_id = ?2",
                params![chat_id.0, listing_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Number of outstanding notifications for the chat.
pub async fn count_notified(db: &Database, chat_id: ChatId) -> Result<usize, BagwatchError> {
    let count: i64 = db
        .connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM notified_listings WHERE chat_id = ?1",
                params![chat_id.0],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(usize::try_from(count).unwrap_or_default())
}
