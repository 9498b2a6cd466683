#![forbid(unsafe_code)]

//! Gridview public facade crate.
//!
//! Re-exports the types a host needs to embed a grid view and offers a
//! prelude for day-to-day usage. The layered crates stay reachable as
//! [`core`], [`layout`] and [`runtime`].

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use gridview_core::{
    CardConfig, CardKey, DashboardConfig, DeterministicClock, FrameClock, FrameScheduler,
    HostFrames, LayoutEntry, LayoutSet, NextFrame, SystemClock, ViewConfig, assign_missing_keys,
};

// --- Layout re-exports -----------------------------------------------------

pub use gridview_layout::{
    ColumnResolver, ColumnTable, ColumnTier, DEFAULT_CARD_WIDTH, LayoutError, SizeOracle,
    SizeQueryError,
};

// --- Runtime re-exports ----------------------------------------------------

pub use gridview_runtime::{
    CardHandle, CardOptions, CardPath, GridElement, GridProps, GridSettings, GridView, HostApi,
    HostError, LayoutState, SaveError, SettingsError, ViewBindings, ViewChrome, ViewIntent,
    ViewProps,
};

#[cfg(feature = "subscriber")]
pub use gridview_runtime::logging;

// --- Errors ---------------------------------------------------------------

/// Top-level error type for gridview hosts.
#[derive(Debug)]
pub enum Error {
    /// Layout assignment failed.
    Layout(LayoutError),
    /// Saving the edited layout failed.
    Save(SaveError),
    /// Settings could not be loaded.
    Settings(SettingsError),
    /// The host rejected a request.
    Host(HostError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layout(err) => write!(f, "{err}"),
            Self::Save(err) => write!(f, "{err}"),
            Self::Settings(err) => write!(f, "{err}"),
            Self::Host(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Layout(err) => err.source(),
            Self::Save(err) => err.source(),
            Self::Settings(err) => err.source(),
            Self::Host(err) => err.source(),
        }
    }
}

impl From<LayoutError> for Error {
    fn from(err: LayoutError) -> Self {
        Self::Layout(err)
    }
}

impl From<SaveError> for Error {
    fn from(err: SaveError) -> Self {
        Self::Save(err)
    }
}

impl From<SettingsError> for Error {
    fn from(err: SettingsError) -> Self {
        Self::Settings(err)
    }
}

impl From<HostError> for Error {
    fn from(err: HostError) -> Self {
        Self::Host(err)
    }
}

/// Standard result type for gridview APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        CardHandle, CardKey, DashboardConfig, Error, GridSettings, GridView, HostApi, LayoutEntry,
        LayoutSet, Result, SizeOracle, ViewBindings, ViewConfig, ViewIntent, ViewProps,
    };

    pub use crate::{core, layout, runtime};
}

pub use gridview_core as core;
pub use gridview_layout as layout;
pub use gridview_runtime as runtime;
