// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification decision engine.
//!
//! Diffs a user's notified-set against a fresh favorites snapshot. After a
//! decision is applied, the notified-set holds exactly the listings that are
//! present in the snapshot with stock available, plus previously notified
//! listings whose stock count is unknown this cycle.

use std::collections::HashSet;

use bagwatch_core::{ListingId, ListingSnapshot};

/// The actions for one user in one cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decision {
    /// Notified listings that left the favorites set. Cleared silently.
    pub stale: Vec<ListingId>,
    /// Notified listings that are back to zero stock. Cleared silently.
    pub retracted: Vec<ListingId>,
    /// Listings with stock that have not been announced yet.
    pub notify: Vec<ListingSnapshot>,
}

impl Decision {
    pub fn is_empty(&self) -> bool {
        self.stale.is_empty() && self.retracted.is_empty() && self.notify.is_empty()
    }

    /// Applies the decision to a notified-set, as if every notification
    /// was delivered.
    pub fn apply(&self, notified: &mut HashSet<ListingId>) {
        for id in self.stale.iter().chain(&self.retracted) {
            notified.remove(id);
        }
        for listing in &self.notify {
            notified.insert(listing.id.clone());
        }
    }
}

/// Computes the actions that bring `notified` in line with `fresh`.
///
/// When the marketplace repeats a listing id, the first occurrence wins.
/// A listing with an unknown stock count is present but produces no action.
/// Stale and retracted ids are sorted; notifications keep snapshot order.
pub fn decide(notified: &HashSet<ListingId>, fresh: &[ListingSnapshot]) -> Decision {
    let mut present: HashSet<&ListingId> = HashSet::with_capacity(fresh.len());
    let ordered: Vec<&ListingSnapshot> = fresh
        .iter()
        .filter(|&listing| present.insert(&listing.id))
        .collect();

    let mut stale: Vec<ListingId> = notified
        .iter()
        .filter(|id| !present.contains(id))
        .cloned()
        .collect();
    stale.sort();

    let mut retracted = Vec::new();
    let mut notify = Vec::new();
    for listing in ordered {
        let already = notified.contains(&listing.id);
        if listing.in_stock() && !already {
            notify.push(listing.clone());
        } else if listing.sold_out() && already {
            retracted.push(listing.id.clone());
        }
    }
    retracted.sort();

    Decision {
        stale,
        retracted,
        notify,
    }
}
