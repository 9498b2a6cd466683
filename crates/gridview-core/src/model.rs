#![forbid(unsafe_code)]

//! Layout data model.
//!
//! A [`LayoutEntry`] is the persisted rectangle of one card, in grid units.
//! A [`LayoutSet`] is the key-addressed collection of entries for one view.
//!
//! # Persisted shape
//!
//! A layout set serializes as a plain JSON array, in card order:
//!
//! ```json
//! [{"key": "a1", "width": 3, "height": 4, "posX": 0, "posY": 0}]
//! ```
//!
//! `posX` / `posY` are omitted for cards that were sized but never placed;
//! the grid component auto-flows those.
//!
//! # Invariants
//!
//! 1. A set holds at most one entry per [`CardKey`].
//! 2. Iteration order is insertion order (card order for freshly assigned sets).
//! 3. Equality is key-addressed: two sets with the same entries in a different
//!    order are equal.

use std::borrow::Borrow;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Stable identifier of a card within a view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardKey(String);

impl CardKey {
    /// Wrap an existing key. Returns `None` for the empty string.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.is_empty() { None } else { Some(Self(key)) }
    }

    /// Generate a fresh random key (UUID v4, hyphenated).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CardKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Width/height/position of one card, in grid units.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutEntry {
    pub key: CardKey,
    pub width: u32,
    pub height: u32,
    #[serde(rename = "posX", default, skip_serializing_if = "Option::is_none")]
    pub pos_x: Option<u32>,
    #[serde(rename = "posY", default, skip_serializing_if = "Option::is_none")]
    pub pos_y: Option<u32>,
}

impl LayoutEntry {
    /// An entry with a size but no position; the grid auto-places it.
    #[must_use]
    pub fn sized(key: CardKey, width: u32, height: u32) -> Self {
        Self {
            key,
            width,
            height,
            pos_x: None,
            pos_y: None,
        }
    }

    /// Set an explicit grid position (builder pattern).
    #[must_use]
    pub fn at(mut self, pos_x: u32, pos_y: u32) -> Self {
        self.pos_x = Some(pos_x);
        self.pos_y = Some(pos_y);
        self
    }
}

/// Key-addressed, order-preserving collection of [`LayoutEntry`] values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<LayoutEntry>", into = "Vec<LayoutEntry>")]
pub struct LayoutSet {
    entries: IndexMap<CardKey, LayoutEntry>,
}

impl LayoutSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Insert an entry, replacing any previous entry for the same key.
    ///
    /// A replaced entry keeps its original position in iteration order.
    pub fn insert(&mut self, entry: LayoutEntry) -> Option<LayoutEntry> {
        self.entries.insert(entry.key.clone(), entry)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&LayoutEntry> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &LayoutEntry> {
        self.entries.values()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &CardKey> {
        self.entries.keys()
    }

    /// Drop every entry whose key is not accepted by `keep`.
    ///
    /// Returns the number of entries removed. Remaining entries keep their
    /// relative order.
    pub fn retain_keys(&mut self, mut keep: impl FnMut(&CardKey) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| keep(key));
        before - self.entries.len()
    }

    /// Persisted form: entries in order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<LayoutEntry> {
        self.entries.values().cloned().collect()
    }
}

impl From<Vec<LayoutEntry>> for LayoutSet {
    fn from(entries: Vec<LayoutEntry>) -> Self {
        entries.into_iter().collect()
    }
}

impl From<LayoutSet> for Vec<LayoutEntry> {
    fn from(set: LayoutSet) -> Self {
        set.entries.into_values().collect()
    }
}

impl FromIterator<LayoutEntry> for LayoutSet {
    fn from_iter<I: IntoIterator<Item = LayoutEntry>>(iter: I) -> Self {
        let mut set = Self::new();
        for entry in iter {
            set.insert(entry);
        }
        set
    }
}

impl<'a> IntoIterator for &'a LayoutSet {
    type Item = &'a LayoutEntry;
    type IntoIter = indexmap::map::Values<'a, CardKey, LayoutEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}
