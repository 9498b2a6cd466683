#![forbid(unsafe_code)]

//! Rendered element map.
//!
//! [`build_elements`] derives, for the current card list and working layout,
//! the element the grid should render under each layout key: the bare card
//! outside edit mode, or the card wrapped in [`CardOptions`] (edit/delete
//! affordances carrying the card's `[view, card]` path) while editing.
//!
//! Elements are keyed by layout key, so a grid that keys its children on the
//! map survives reorderings without tearing everything down.

use std::fmt;

use futures::future::LocalBoxFuture;
use gridview_core::{CardConfig, CardKey, LayoutSet};
use gridview_layout::{SizeOracle, SizeQueryError};
use indexmap::IndexMap;

use crate::host::{CardHandle, CardPath, IntentSink, ViewIntent};

/// Edit-mode wrapper around a card.
#[derive(Clone)]
pub struct CardOptions<C> {
    card: C,
    path: CardPath,
    intents: IntentSink,
}

impl<C> CardOptions<C> {
    #[must_use]
    pub fn new(card: C, path: CardPath, intents: IntentSink) -> Self {
        Self {
            card,
            path,
            intents,
        }
    }

    #[must_use]
    pub fn card(&self) -> &C {
        &self.card
    }

    #[must_use]
    pub fn path(&self) -> CardPath {
        self.path
    }

    /// Ask the host to open the card editor.
    pub fn edit(&self) {
        (self.intents)(ViewIntent::EditCard { path: self.path });
    }

    /// Ask the host to delete the card.
    pub fn delete(&self) {
        (self.intents)(ViewIntent::DeleteCard { path: self.path });
    }

    /// The wrapper is as tall as the card it wraps.
    pub fn card_size<O>(&self, oracle: &O) -> LocalBoxFuture<'static, Result<u32, SizeQueryError>>
    where
        O: SizeOracle<C> + ?Sized,
    {
        oracle.size_of(&self.card)
    }
}

impl<C: fmt::Debug> fmt::Debug for CardOptions<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardOptions")
            .field("card", &self.card)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// What the grid renders for one layout key.
#[derive(Debug, Clone)]
pub enum GridElement<C> {
    Card(C),
    Options(CardOptions<C>),
}

impl<C> GridElement<C> {
    /// The underlying card, wrapped or not.
    #[must_use]
    pub fn card(&self) -> &C {
        match self {
            Self::Card(card) => card,
            Self::Options(options) => options.card(),
        }
    }

    #[must_use]
    pub fn options(&self) -> Option<&CardOptions<C>> {
        match self {
            Self::Card(_) => None,
            Self::Options(options) => Some(options),
        }
    }

    #[must_use]
    pub fn is_wrapped(&self) -> bool {
        matches!(self, Self::Options(_))
    }
}

/// Layout key → rendered element, in card order.
#[derive(Debug, Clone)]
pub struct ElementMap<C> {
    elements: IndexMap<CardKey, GridElement<C>>,
}

impl<C> Default for ElementMap<C> {
    fn default() -> Self {
        Self {
            elements: IndexMap::new(),
        }
    }
}

impl<C> ElementMap<C> {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&GridElement<C>> {
        self.elements.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &CardKey> {
        self.elements.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CardKey, &GridElement<C>)> {
        self.elements.iter()
    }
}

/// Build the element map for `cards` (paired by position with `configs`).
///
/// Cards without a key or without an entry in `layout` are not rendered.
/// Every rendered card is told the current edit mode.
pub fn build_elements<C: CardHandle>(
    cards: &[C],
    configs: &[CardConfig],
    layout: &LayoutSet,
    edit_mode: bool,
    view_index: usize,
    intents: &IntentSink,
) -> ElementMap<C> {
    let mut elements = IndexMap::with_capacity(cards.len());

    for (card_index, (card, config)) in cards.iter().zip(configs).enumerate() {
        let Some(key) = config.key() else {
            continue;
        };
        if !layout.contains(key.as_str()) {
            continue;
        }

        card.set_edit_mode(edit_mode);
        let element = if edit_mode {
            let path = CardPath {
                view_index,
                card_index,
            };
            GridElement::Options(CardOptions::new(card.clone(), path, intents.clone()))
        } else {
            GridElement::Card(card.clone())
        };
        elements.insert(key, element);
    }

    ElementMap { elements }
}
