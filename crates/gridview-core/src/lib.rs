#![forbid(unsafe_code)]

//! Core primitives for gridview.
//!
//! This crate holds the pieces every other gridview crate builds on:
//!
//! - [`model`]: [`CardKey`], [`LayoutEntry`] and the key-addressed [`LayoutSet`].
//! - [`config`]: the host's persisted configuration shape
//!   ([`DashboardConfig`] → [`ViewConfig`] → [`CardConfig`]).
//! - [`identity`]: stamping stable keys onto card configurations.
//! - [`run`]: monotonically increasing run tokens for superseding async work.
//! - [`frame`]: clocks, the next-frame primitive and the frame-budget
//!   [`FrameScheduler`].
//!
//! # Role in gridview
//! `gridview-core` has no opinion about how cards are sized or rendered.
//! `gridview-layout` consumes it to assign layouts, and `gridview-runtime`
//! drives both from host signals.

pub mod config;
pub mod frame;
pub mod identity;
pub mod model;
pub mod run;

pub use config::{CardConfig, CardLayoutHint, DashboardConfig, ViewConfig};
pub use frame::{
    DeterministicClock, FrameClock, FrameScheduler, HostFrames, NextFrame, SystemClock,
    DEFAULT_FRAME_BUDGET,
};
pub use identity::{assign_missing_keys, duplicate_keys};
pub use model::{CardKey, LayoutEntry, LayoutSet};
pub use run::{RunCounter, RunToken};
