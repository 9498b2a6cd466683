#![forbid(unsafe_code)]

//! Layout solvers for gridview.
//!
//! - [`columns`]: maps viewport width to a column count through an ascending
//!   breakpoint table.
//! - [`assign`]: turns an ordered card list into a complete [`LayoutSet`],
//!   reusing persisted entries and sizing the rest through a [`SizeOracle`]
//!   under a frame budget.
//!
//! [`LayoutSet`]: gridview_core::LayoutSet

pub mod assign;
pub mod columns;
mod error;

pub use assign::{
    AssignOutcome, AssignRequest, DEFAULT_CARD_WIDTH, SizeOracle, assign_layout,
};
pub use columns::{ColumnResolver, ColumnTable, ColumnTier};
pub use error::{LayoutError, SizeQueryError};
