#![forbid(unsafe_code)]

//! View settings.
//!
//! [`GridSettings`] gathers the tunables of a grid view: the responsive column
//! table, the width given to newly sized cards, the assignment frame budget
//! and the pass-through options of the external grid component. Every field
//! has a default, so a partial document only overrides what it names:
//!
//! ```json
//! { "default_card_width": 4, "columns": [{ "min_width": 500, "columns": 8 }] }
//! ```
//!
//! `load_*` helpers parse and validate in one step.

use std::time::Duration;

use gridview_layout::{ColumnTable, DEFAULT_CARD_WIDTH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to load settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[cfg(feature = "toml")]
    #[error("invalid settings TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid settings: {}", .0.join("; "))]
    Validation(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Breakpoint table for the column resolver.
    pub columns: ColumnTable,
    /// Width, in grid units, of a card that has no persisted entry.
    pub default_card_width: u32,
    /// Work allowed per frame before assignment yields, in milliseconds.
    pub frame_budget_ms: u64,
    /// Grid row height in pixels.
    pub row_height: u32,
    /// Gap between items, `[x, y]` pixels.
    pub margin: [u32; 2],
    /// Padding around the grid, `[x, y]` pixels.
    pub container_padding: [u32; 2],
    /// CSS selector of the element that starts a drag.
    pub drag_handle: String,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            columns: ColumnTable::default(),
            default_card_width: DEFAULT_CARD_WIDTH,
            frame_budget_ms: 16,
            row_height: 40,
            margin: [8, 8],
            container_padding: [8, 8],
            drag_handle: ".overlay".to_owned(),
        }
    }
}

impl GridSettings {
    pub fn from_json_str(input: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(input)?)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml_str(input: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(input)?)
    }

    /// Parse JSON and reject invalid values.
    pub fn load_json_str(input: &str) -> Result<Self, SettingsError> {
        Self::from_json_str(input)?.validated()
    }

    /// Parse TOML and reject invalid values.
    #[cfg(feature = "toml")]
    pub fn load_toml_str(input: &str) -> Result<Self, SettingsError> {
        Self::from_toml_str(input)?.validated()
    }

    /// Human-readable problems; empty when the settings are usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut problems = self.columns.validate();
        if self.default_card_width == 0 {
            problems.push("default_card_width must be at least 1".to_owned());
        }
        if self.row_height == 0 {
            problems.push("row_height must be at least 1".to_owned());
        }
        if self.drag_handle.trim().is_empty() {
            problems.push("drag_handle must not be empty".to_owned());
        }
        problems
    }

    #[must_use]
    pub fn frame_budget(&self) -> Duration {
        Duration::from_millis(self.frame_budget_ms)
    }

    fn validated(self) -> Result<Self, SettingsError> {
        let problems = self.validate();
        if problems.is_empty() {
            Ok(self)
        } else {
            Err(SettingsError::Validation(problems))
        }
    }
}
