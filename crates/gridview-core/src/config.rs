#![forbid(unsafe_code)]

//! Host configuration shape.
//!
//! The host persists a [`DashboardConfig`] made of [`ViewConfig`]s, each with
//! an ordered list of [`CardConfig`]s and an optional persisted layout. Only
//! the fields gridview reads are typed; everything else is carried in a
//! flattened JSON map so a load/save cycle never drops host data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{CardKey, LayoutSet};

/// The `layout` hint attached to a card configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardLayoutHint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One card's configuration as stored by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<CardLayoutHint>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CardConfig {
    /// The card's layout key, if it has a non-empty one.
    #[must_use]
    pub fn key(&self) -> Option<CardKey> {
        self.layout
            .as_ref()
            .and_then(|hint| hint.key.clone())
            .and_then(CardKey::new)
    }

    /// Return a copy carrying `key`, keeping every other hint field.
    #[must_use]
    pub fn with_key(&self, key: &CardKey) -> Self {
        let mut card = self.clone();
        card.layout.get_or_insert_with(CardLayoutHint::default).key = Some(key.to_string());
        card
    }
}

/// One view (dashboard tab) configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default)]
    pub cards: Vec<CardConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutSet>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ViewConfig {
    /// Whether every card carries a layout key.
    #[must_use]
    pub fn all_keyed(&self) -> bool {
        self.cards.iter().all(|card| card.key().is_some())
    }

    /// The persisted layout, or an empty set.
    #[must_use]
    pub fn persisted_layout(&self) -> LayoutSet {
        self.layout.clone().unwrap_or_default()
    }

    /// Return a copy with `layout` replaced.
    #[must_use]
    pub fn with_layout(&self, layout: LayoutSet) -> Self {
        Self {
            layout: Some(layout),
            ..self.clone()
        }
    }
}

/// The whole dashboard configuration as stored by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub views: Vec<ViewConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DashboardConfig {
    /// Return a copy with the view at `index` replaced by `view`.
    ///
    /// An out-of-range index leaves every view untouched.
    #[must_use]
    pub fn replace_view(&self, index: usize, view: ViewConfig) -> Self {
        let mut views = self.views.clone();
        if let Some(slot) = views.get_mut(index) {
            *slot = view;
        }
        Self {
            views,
            extra: self.extra.clone(),
        }
    }
}
