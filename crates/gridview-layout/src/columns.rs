#![forbid(unsafe_code)]

//! Responsive column count.
//!
//! A [`ColumnTable`] is an ascending list of [`ColumnTier`]s, each pairing a
//! viewport min-width with a column count. The column count for a viewport is
//! the count of the `n`-th tier, where `n` is how many min-widths the viewport
//! satisfies; a viewport satisfying none gets a single column.
//!
//! ```
//! use gridview_layout::ColumnTable;
//!
//! let table = ColumnTable::default(); // 300/600/900/1200 → 2/6/9/12
//! assert_eq!(table.columns_for_width(250), 1);
//! assert_eq!(table.columns_for_width(600), 6);
//! assert_eq!(table.columns_for_width(1920), 12);
//! ```
//!
//! # Invariants
//!
//! 1. The resolved column count is always >= 1.
//! 2. Min-widths are inclusive (`width >= min_width` satisfies a tier).
//! 3. [`ColumnResolver`] only reports a change when the count changes.

use serde::{Deserialize, Serialize};

/// One breakpoint: viewports at least `min_width` wide use `columns` tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTier {
    pub min_width: u32,
    pub columns: u32,
}

impl ColumnTier {
    #[must_use]
    pub const fn new(min_width: u32, columns: u32) -> Self {
        Self { min_width, columns }
    }
}

/// Ascending breakpoint table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnTable {
    tiers: Vec<ColumnTier>,
}

impl ColumnTable {
    /// The stock dashboard breakpoints.
    pub const DEFAULT_TIERS: [ColumnTier; 4] = [
        ColumnTier::new(300, 2),
        ColumnTier::new(600, 6),
        ColumnTier::new(900, 9),
        ColumnTier::new(1200, 12),
    ];

    #[must_use]
    pub fn new(tiers: impl IntoIterator<Item = ColumnTier>) -> Self {
        Self {
            tiers: tiers.into_iter().collect(),
        }
    }

    /// Build a table from parallel min-width and column lists.
    ///
    /// Extra entries in the longer list are ignored.
    #[must_use]
    pub fn from_parts(min_widths: &[u32], columns: &[u32]) -> Self {
        Self::new(
            min_widths
                .iter()
                .zip(columns)
                .map(|(&min_width, &columns)| ColumnTier::new(min_width, columns)),
        )
    }

    #[must_use]
    pub fn tiers(&self) -> &[ColumnTier] {
        &self.tiers
    }

    /// Number of breakpoints satisfied by `width`.
    #[must_use]
    pub fn satisfied(&self, width: u32) -> usize {
        self.tiers.iter().filter(|tier| width >= tier.min_width).count()
    }

    /// Column count for a given number of satisfied breakpoints.
    #[must_use]
    pub fn columns_for_satisfied(&self, satisfied: usize) -> u32 {
        satisfied
            .checked_sub(1)
            .and_then(|idx| self.tiers.get(idx))
            .map_or(1, |tier| tier.columns.max(1))
    }

    #[must_use]
    pub fn columns_for_width(&self, width: u32) -> u32 {
        self.columns_for_satisfied(self.satisfied(width))
    }

    /// Validate ordering and counts. An empty list means the table is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for pair in self.tiers.windows(2) {
            if pair[1].min_width <= pair[0].min_width {
                errors.push(format!(
                    "column tiers must be strictly ascending, got {} after {}",
                    pair[1].min_width, pair[0].min_width
                ));
            }
        }
        for tier in &self.tiers {
            if tier.columns == 0 {
                errors.push(format!("column tier at {} has zero columns", tier.min_width));
            }
        }
        errors
    }
}

impl Default for ColumnTable {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIERS)
    }
}

/// Tracks viewport and sidebar signals and the resulting column count.
#[derive(Debug, Clone)]
pub struct ColumnResolver {
    table: ColumnTable,
    satisfied: Option<usize>,
    sidebar_docked: Option<bool>,
    columns: Option<u32>,
}

impl ColumnResolver {
    #[must_use]
    pub fn new(table: ColumnTable) -> Self {
        Self {
            table,
            satisfied: None,
            sidebar_docked: None,
            columns: None,
        }
    }

    /// Current column count, once a viewport width has been seen.
    #[must_use]
    pub fn columns(&self) -> Option<u32> {
        self.columns
    }

    #[must_use]
    pub fn table(&self) -> &ColumnTable {
        &self.table
    }

    /// Feed a viewport width. Returns the new column count if it changed.
    ///
    /// Widths that do not cross a breakpoint are ignored.
    pub fn set_viewport_width(&mut self, width: u32) -> Option<u32> {
        let satisfied = self.table.satisfied(width);
        if self.satisfied == Some(satisfied) {
            return None;
        }
        self.satisfied = Some(satisfied);
        self.recompute()
    }

    /// Feed the host's docked-sidebar flag. A flip forces a recomputation.
    ///
    /// Returns the new column count if it changed.
    pub fn set_sidebar_docked(&mut self, docked: bool) -> Option<u32> {
        if self.sidebar_docked == Some(docked) {
            return None;
        }
        self.sidebar_docked = Some(docked);
        self.recompute()
    }

    fn recompute(&mut self) -> Option<u32> {
        let satisfied = self.satisfied?;
        let columns = self.table.columns_for_satisfied(satisfied);
        if self.columns == Some(columns) {
            return None;
        }
        tracing::debug!(
            target: "gridview.columns",
            satisfied,
            columns,
            previous = ?self.columns,
            "column count changed"
        );
        self.columns = Some(columns);
        Some(columns)
    }
}

impl Default for ColumnResolver {
    fn default() -> Self {
        Self::new(ColumnTable::default())
    }
}
