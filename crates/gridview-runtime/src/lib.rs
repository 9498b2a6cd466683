#![forbid(unsafe_code)]

//! View runtime for gridview.
//!
//! - [`reconciler`]: the layout state machine (committed layout, edit buffer,
//!   assignment runs).
//! - [`elements`]: the key → element map the grid renders.
//! - [`view`]: [`GridView`], the host-facing shell wiring signals, assignment
//!   runs and persistence together.
//! - [`host`]: the traits and events at the host boundary.
//! - [`settings`]: [`GridSettings`] and its loaders.
//! - `logging` (feature `subscriber`): a ready-made `tracing` subscriber.

pub mod elements;
pub mod host;
#[cfg(feature = "subscriber")]
pub mod logging;
pub mod reconciler;
pub mod settings;
pub mod view;

pub use elements::{CardOptions, ElementMap, GridElement, build_elements};
pub use host::{CardHandle, CardPath, HostApi, HostError, IntentSink, ViewIntent};
pub use reconciler::{Change, Finish, LayoutState, Reaction, Reconciler};
pub use settings::{GridSettings, SettingsError};
pub use view::{GridProps, GridView, SaveError, ViewBindings, ViewChrome, ViewProps};
