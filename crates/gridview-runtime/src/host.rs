#![forbid(unsafe_code)]

//! Host boundary: what the embedding dashboard provides and receives.
//!
//! - [`CardHandle`]: the host's renderable card, held by reference only.
//! - [`HostApi`]: configuration persistence, the generic error channel and
//!   upward intents.
//! - [`ViewIntent`]: "create/edit/delete card" requests raised by the view.

use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use gridview_core::DashboardConfig;
use gridview_layout::LayoutError;
use serde::Serialize;
use thiserror::Error;

/// A host-owned card element.
///
/// Implementations are expected to be cheap handles (`Rc`, JS references).
pub trait CardHandle: Clone {
    /// Tell the card whether the view is in edit mode.
    fn set_edit_mode(&self, edit_mode: bool);
}

/// The host rejected a configuration save.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("host save failed: {message}")]
pub struct HostError {
    message: String,
}

impl HostError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Services the embedding dashboard provides to a view.
pub trait HostApi {
    /// Persist the whole dashboard configuration.
    fn save_config(&self, config: DashboardConfig) -> LocalBoxFuture<'static, Result<(), HostError>>;

    /// Surface a layout failure through the host's generic error channel.
    fn report_error(&self, error: &LayoutError);

    /// Deliver an upward intent (create/edit/delete card).
    fn emit(&self, intent: ViewIntent);
}

/// Position of a card: `[view_index, card_index]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "[usize; 2]")]
pub struct CardPath {
    pub view_index: usize,
    pub card_index: usize,
}

impl From<CardPath> for [usize; 2] {
    fn from(path: CardPath) -> Self {
        [path.view_index, path.card_index]
    }
}

impl fmt::Display for CardPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.view_index, self.card_index)
    }
}

/// Requests the view raises for the host to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ViewIntent {
    CreateCard,
    EditCard { path: CardPath },
    DeleteCard { path: CardPath },
}

impl ViewIntent {
    /// DOM event name a web host dispatches for this intent.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::CreateCard => "ll-create-card",
            Self::EditCard { .. } => "ll-edit-card",
            Self::DeleteCard { .. } => "ll-delete-card",
        }
    }
}

/// Callback forwarding intents upward.
pub type IntentSink = Rc<dyn Fn(ViewIntent)>;
