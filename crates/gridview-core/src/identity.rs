#![forbid(unsafe_code)]

//! Card identity: every card needs a stable key before it can be laid out.
//!
//! [`assign_missing_keys`] stamps a fresh [`CardKey`] onto every card
//! configuration that lacks one and reports whether anything changed, so the
//! caller only persists when there is something new to persist.
//!
//! # Invariants
//!
//! 1. Existing non-empty keys are never rewritten.
//! 2. Running the assigner on its own output is a no-op (`None`).

use std::collections::HashSet;

use crate::config::ViewConfig;
use crate::model::CardKey;

/// Stamp a fresh key onto every card missing one.
///
/// Returns `None` when every card already carries a key; otherwise the
/// updated view configuration, which the caller is expected to persist.
#[must_use]
pub fn assign_missing_keys(view: &ViewConfig) -> Option<ViewConfig> {
    warn_duplicate_keys(view);
    if view.all_keyed() {
        return None;
    }

    let mut assigned = 0usize;
    let cards = view
        .cards
        .iter()
        .map(|card| {
            if card.key().is_some() {
                return card.clone();
            }
            assigned += 1;
            card.with_key(&CardKey::generate())
        })
        .collect();

    tracing::debug!(
        target: "gridview.identity",
        assigned,
        total = view.cards.len(),
        "assigned missing card keys"
    );

    Some(ViewConfig {
        cards,
        ..view.clone()
    })
}

/// Keys carried by more than one card, in first-repeat order.
///
/// Duplicates collapse into one layout entry, so they are logged rather than
/// rewritten; fresh keys are never duplicates of existing ones.
#[must_use]
pub fn duplicate_keys(view: &ViewConfig) -> Vec<CardKey> {
    let mut seen = HashSet::new();
    let mut repeated = Vec::new();
    for key in view.cards.iter().filter_map(|card| card.key()) {
        if !seen.insert(key.clone()) && !repeated.contains(&key) {
            repeated.push(key);
        }
    }
    repeated
}

fn warn_duplicate_keys(view: &ViewConfig) {
    for key in duplicate_keys(view) {
        tracing::warn!(target: "gridview.identity", %key, "duplicate card key in view");
    }
}
