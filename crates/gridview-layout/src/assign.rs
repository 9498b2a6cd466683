#![forbid(unsafe_code)]

//! Layout assignment: from an ordered card list to a complete [`LayoutSet`].
//!
//! For each card, in order:
//!
//! 1. a persisted entry for the card's key is reused verbatim, synchronously;
//! 2. otherwise the [`SizeOracle`] is asked for a height, the card gets the
//!    default width and no position (the grid auto-places it);
//! 3. the entry is appended in card order.
//!
//! Oracle queries run under a [`FrameScheduler`] so that a long batch gives
//! the renderer a chance to paint. Every run carries a [`RunToken`]; after
//! each suspension point a superseded run stops and reports
//! [`AssignOutcome::Superseded`] without producing output.
//!
//! # Failure Modes
//!
//! - A rejected size query aborts the whole run with
//!   [`LayoutError::SizeQuery`]; no partial layout is returned.
//! - A query that never settles stalls its run forever. Newer runs are not
//!   affected.

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use gridview_core::{
    CardKey, FrameClock, FrameScheduler, LayoutEntry, LayoutSet, NextFrame, RunToken, ViewConfig,
};
use tracing::Instrument;

use crate::error::{LayoutError, SizeQueryError};

/// Width, in grid units, given to every freshly sized card.
pub const DEFAULT_CARD_WIDTH: u32 = 3;

/// Asynchronous card height estimate, in grid units.
pub trait SizeOracle<C> {
    fn size_of(&self, card: &C) -> LocalBoxFuture<'static, Result<u32, SizeQueryError>>;
}

impl<C, T: SizeOracle<C> + ?Sized> SizeOracle<C> for Rc<T> {
    fn size_of(&self, card: &C) -> LocalBoxFuture<'static, Result<u32, SizeQueryError>> {
        (**self).size_of(card)
    }
}

/// Everything one assignment run needs, owned so the run can outlive its caller.
#[derive(Debug, Clone)]
pub struct AssignRequest<C> {
    cards: Vec<(C, CardKey)>,
    persisted: LayoutSet,
    default_width: u32,
}

impl<C> AssignRequest<C> {
    #[must_use]
    pub fn new(cards: impl IntoIterator<Item = (C, CardKey)>, persisted: LayoutSet) -> Self {
        Self {
            cards: cards.into_iter().collect(),
            persisted,
            default_width: DEFAULT_CARD_WIDTH,
        }
    }

    /// Override the width given to freshly sized cards (builder pattern).
    #[must_use]
    pub fn with_default_width(mut self, width: u32) -> Self {
        self.default_width = width;
        self
    }

    /// Replace the layout that existing entries are reused from (builder
    /// pattern).
    #[must_use]
    pub fn with_persisted(mut self, persisted: LayoutSet) -> Self {
        self.persisted = persisted;
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Number of cards that will need a size query.
    #[must_use]
    pub fn unresolved(&self) -> usize {
        self.cards
            .iter()
            .filter(|(_, key)| !self.persisted.contains(key.as_str()))
            .count()
    }
}

impl<C: Clone> AssignRequest<C> {
    /// Pair rendered cards with their configurations, by position.
    ///
    /// Fails with [`LayoutError::MissingKey`] if a paired configuration has no
    /// key yet. Cards beyond the shorter of the two lists are ignored.
    pub fn from_view(cards: &[C], view: &ViewConfig) -> Result<Self, LayoutError> {
        let pairs = cards
            .iter()
            .zip(&view.cards)
            .enumerate()
            .map(|(index, (card, config))| {
                config
                    .key()
                    .map(|key| (card.clone(), key))
                    .ok_or(LayoutError::MissingKey { index })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(pairs, view.persisted_layout()))
    }
}

/// Result of a run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignOutcome {
    /// One entry per input card, in card order.
    Complete(LayoutSet),
    /// A newer run started; this run's work is discarded.
    Superseded { generation: u64 },
}

/// Run layout assignment for `request`.
pub async fn assign_layout<C, O, K, F>(
    request: AssignRequest<C>,
    oracle: &O,
    scheduler: &mut FrameScheduler<K, F>,
    token: &RunToken,
) -> Result<AssignOutcome, LayoutError>
where
    O: SizeOracle<C> + ?Sized,
    K: FrameClock,
    F: NextFrame,
{
    let span = tracing::debug_span!(
        "assign.run",
        generation = token.generation(),
        cards = request.len(),
        unresolved = request.unresolved(),
    );
    assign_cards(request, oracle, scheduler, token)
        .instrument(span)
        .await
}

async fn assign_cards<C, O, K, F>(
    request: AssignRequest<C>,
    oracle: &O,
    scheduler: &mut FrameScheduler<K, F>,
    token: &RunToken,
) -> Result<AssignOutcome, LayoutError>
where
    O: SizeOracle<C> + ?Sized,
    K: FrameClock,
    F: NextFrame,
{
    if !token.is_current() {
        return Ok(superseded(token));
    }

    let AssignRequest {
        cards,
        persisted,
        default_width,
    } = request;
    let mut layout = LayoutSet::with_capacity(cards.len());
    let mut queried = 0usize;

    for (card, key) in cards {
        if let Some(existing) = persisted.get(key.as_str()) {
            layout.insert(existing.clone());
            continue;
        }

        queried += 1;
        let size = scheduler.run(oracle.size_of(&card)).await;
        if !token.is_current() {
            return Ok(superseded(token));
        }
        let height = size.map_err(|source| {
            tracing::warn!(
                target: "gridview.assign",
                generation = token.generation(),
                %key,
                error = %source,
                "size query failed, abandoning run"
            );
            LayoutError::SizeQuery {
                key: key.clone(),
                source,
            }
        })?;

        layout.insert(LayoutEntry::sized(key, default_width, height.max(1)));
    }

    tracing::debug!(
        target: "gridview.assign",
        generation = token.generation(),
        entries = layout.len(),
        queried,
        gated_steps = scheduler.gated_steps(),
        "assignment run complete"
    );
    Ok(AssignOutcome::Complete(layout))
}

fn superseded(token: &RunToken) -> AssignOutcome {
    tracing::debug!(
        target: "gridview.assign",
        generation = token.generation(),
        "assignment run superseded"
    );
    AssignOutcome::Superseded {
        generation: token.generation(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use futures::executor::block_on;
    use gridview_core::{DeterministicClock, HostFrames, RunCounter};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Card handles are plain names; sizes come from a fixed table.
    #[derive(Default)]
    struct TableOracle {
        sizes: HashMap<&'static str, Result<u32, SizeQueryError>>,
        queried: RefCell<Vec<&'static str>>,
    }

    impl TableOracle {
        fn with(mut self, card: &'static str, size: u32) -> Self {
            self.sizes.insert(card, Ok(size));
            self
        }

        fn failing(mut self, card: &'static str) -> Self {
            self.sizes.insert(card, Err(SizeQueryError::new("card not rendered")));
            self
        }
    }

    impl SizeOracle<&'static str> for TableOracle {
        fn size_of(&self, card: &&'static str) -> LocalBoxFuture<'static, Result<u32, SizeQueryError>> {
            self.queried.borrow_mut().push(*card);
            let result = self.sizes.get(card).cloned().unwrap_or(Ok(1));
            async move { result }.boxed_local()
        }
    }

    fn key(s: &str) -> CardKey {
        CardKey::new(s).unwrap()
    }

    fn request(names: &[&'static str], persisted: LayoutSet) -> AssignRequest<&'static str> {
        AssignRequest::new(names.iter().map(|&n| (n, key(n))), persisted)
    }

    fn run(
        request: AssignRequest<&'static str>,
        oracle: &TableOracle,
    ) -> Result<AssignOutcome, LayoutError> {
        let mut scheduler = FrameScheduler::new(DeterministicClock::new(), HostFrames::new());
        let token = RunCounter::new().begin();
        block_on(assign_layout(request, oracle, &mut scheduler, &token))
    }

    fn complete(outcome: Result<AssignOutcome, LayoutError>) -> LayoutSet {
        match outcome {
            Ok(AssignOutcome::Complete(layout)) => layout,
            other => panic!("expected a complete layout, got {other:?}"),
        }
    }

    #[test]
    fn fresh_cards_get_default_width_and_oracle_height() {
        let oracle = TableOracle::default().with("a", 4).with("b", 7);
        let layout = complete(run(request(&["a", "b"], LayoutSet::new()), &oracle));
        assert_eq!(
            layout.to_vec(),
            vec![
                LayoutEntry::sized(key("a"), DEFAULT_CARD_WIDTH, 4),
                LayoutEntry::sized(key("b"), DEFAULT_CARD_WIDTH, 7),
            ]
        );
    }

    #[test]
    fn persisted_entries_are_reused_without_query() {
        let persisted: LayoutSet = vec![LayoutEntry::sized(key("b"), 6, 2).at(3, 0)].into();
        let oracle = TableOracle::default().with("a", 4).with("c", 5);
        let layout = complete(run(request(&["a", "b", "c"], persisted), &oracle));
        assert_eq!(layout.get("b"), Some(&LayoutEntry::sized(key("b"), 6, 2).at(3, 0)));
        assert_eq!(*oracle.queried.borrow(), vec!["a", "c"]);
        let order: Vec<_> = layout.keys().map(CardKey::as_str).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn custom_default_width_applies_to_fresh_cards_only() {
        let persisted: LayoutSet = vec![LayoutEntry::sized(key("b"), 2, 2)].into();
        let oracle = TableOracle::default().with("a", 4);
        let layout = complete(run(
            request(&["a", "b"], persisted).with_default_width(4),
            &oracle,
        ));
        assert_eq!(layout.get("a").unwrap().width, 4);
        assert_eq!(layout.get("b").unwrap().width, 2);
    }

    #[test]
    fn zero_height_is_clamped_to_one() {
        let oracle = TableOracle::default().with("a", 0);
        let layout = complete(run(request(&["a"], LayoutSet::new()), &oracle));
        assert_eq!(layout.get("a").unwrap().height, 1);
    }

    #[test]
    fn rejected_query_commits_nothing() {
        let oracle = TableOracle::default()
            .with("a", 1)
            .with("b", 2)
            .failing("c")
            .with("d", 4)
            .with("e", 5);
        let err = run(request(&["a", "b", "c", "d", "e"], LayoutSet::new()), &oracle).unwrap_err();
        assert_eq!(
            err,
            LayoutError::SizeQuery {
                key: key("c"),
                source: SizeQueryError::new("card not rendered"),
            }
        );
        // Cards after the failure are never queried.
        assert_eq!(*oracle.queried.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn stale_token_returns_superseded_immediately() {
        let counter = RunCounter::new();
        let stale = counter.begin();
        let _newer = counter.begin();
        let oracle = TableOracle::default();
        let mut scheduler = FrameScheduler::new(DeterministicClock::new(), HostFrames::new());
        let outcome = block_on(assign_layout(
            request(&["a"], LayoutSet::new()),
            &oracle,
            &mut scheduler,
            &stale,
        ));
        assert_eq!(outcome, Ok(AssignOutcome::Superseded { generation: 1 }));
        assert!(oracle.queried.borrow().is_empty());
    }

    #[test]
    fn from_view_requires_keys() {
        let view: ViewConfig = serde_json::from_value(serde_json::json!({
            "cards": [{"layout": {"key": "a"}}, {"type": "no-key"}]
        }))
        .unwrap();
        let err = AssignRequest::from_view(&["a", "b"], &view).unwrap_err();
        assert_eq!(err, LayoutError::MissingKey { index: 1 });
    }

    #[test]
    fn from_view_pairs_by_position_and_uses_persisted_layout() {
        let view: ViewConfig = serde_json::from_value(serde_json::json!({
            "cards": [{"layout": {"key": "k1"}}, {"layout": {"key": "k2"}}],
            "layout": [{"key": "k2", "width": 3, "height": 9}]
        }))
        .unwrap();
        let req = AssignRequest::from_view(&["first", "second", "extra"], &view).unwrap();
        assert_eq!(req.len(), 2);
        assert_eq!(req.unresolved(), 1);
    }
}
