#![forbid(unsafe_code)]

//! Layout reconciler: the view's layout state machine.
//!
//! The reconciler owns the committed layout, the edit buffer and the
//! assignment run counter. It is fed plain diffs of the view's inputs
//! ([`Change`]) and answers with what the view has to do next ([`Reaction`]):
//! nothing, start an assignment run, or rebuild the element map from the
//! working layout.
//!
//! # State Machine
//!
//! ```text
//! Uninitialized ──(inputs change)──▶ Assigning{generation}
//! Assigning ──(current run completes)──▶ Ready | Editing
//! Assigning ──(run fails)──▶ Uninitialized
//! Ready ──(enter edit mode)──▶ Editing{committed, buffer = committed}
//! Editing ──(leave edit mode)──▶ Ready{committed}          (buffer dropped)
//! Editing ──(save)──▶ Editing{saved, buffer} | Ready{saved}
//! Ready | Editing ──(top-up run completes)──▶ same state, missing entries added
//! ```
//!
//! # Invariants
//!
//! 1. An edit buffer exists only in [`LayoutState::Editing`].
//! 2. Layout-changed events only ever replace the edit buffer.
//! 3. Only the result of the most recently started run is committed.
//!
//! # Failure Modes
//!
//! - A failed full run returns the machine to `Uninitialized`; the next input
//!   change starts a fresh run. A failed top-up keeps the working layout.
//! - A stale run's result (success or failure) is dropped before it is
//!   inspected.

use gridview_core::{CardKey, LayoutEntry, LayoutSet, RunCounter, RunToken};
use gridview_layout::{AssignOutcome, LayoutError};

/// Layout state of one view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LayoutState {
    /// No working layout.
    #[default]
    Uninitialized,
    /// An assignment run is in flight.
    Assigning { generation: u64 },
    /// Working layout complete, not editing.
    Ready { layout: LayoutSet },
    /// Editing: drag/resize events mutate `buffer`; `committed` is untouched.
    Editing {
        committed: LayoutSet,
        buffer: LayoutSet,
    },
}

impl LayoutState {
    /// The layout the grid renders: the committed layout, or the edit buffer
    /// while editing.
    #[must_use]
    pub fn working(&self) -> Option<&LayoutSet> {
        match self {
            Self::Uninitialized | Self::Assigning { .. } => None,
            Self::Ready { layout } => Some(layout),
            Self::Editing { buffer, .. } => Some(buffer),
        }
    }

    #[must_use]
    pub fn committed(&self) -> Option<&LayoutSet> {
        match self {
            Self::Uninitialized | Self::Assigning { .. } => None,
            Self::Ready { layout } => Some(layout),
            Self::Editing { committed, .. } => Some(committed),
        }
    }

    /// Stable label for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Assigning { .. } => "assigning",
            Self::Ready { .. } => "ready",
            Self::Editing { .. } => "editing",
        }
    }
}

/// Diff of the view's inputs since the previous observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change {
    /// Cards, dashboard config or column count changed.
    pub inputs_changed: bool,
    /// Current edit-mode flag.
    pub edit_mode: bool,
}

/// What the view must do after an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Idle,
    /// No working layout: start (or restart) an assignment run.
    Assign,
    /// Re-derive the element map from the working layout.
    Rebuild,
}

/// How an assignment run ended, from the reconciler's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finish {
    /// The run's layout is now the working layout.
    Committed,
    /// A newer run started; nothing changed.
    Superseded,
    /// The run failed; nothing was committed.
    Failed(LayoutError),
}

#[derive(Debug, Default)]
pub struct Reconciler {
    state: LayoutState,
    runs: RunCounter,
    edit_mode: bool,
}

impl Reconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &LayoutState {
        &self.state
    }

    #[must_use]
    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    #[must_use]
    pub fn working(&self) -> Option<&LayoutSet> {
        self.state.working()
    }

    #[must_use]
    pub fn edit_buffer(&self) -> Option<&LayoutSet> {
        match &self.state {
            LayoutState::Editing { buffer, .. } => Some(buffer),
            _ => None,
        }
    }

    /// Generation of the latest run started (0 if none).
    #[must_use]
    pub fn latest_generation(&self) -> u64 {
        self.runs.latest()
    }

    /// Apply an input diff.
    ///
    /// Edit-mode transitions are applied first, so a rebuild triggered by the
    /// same observation already sees the buffer (or its absence).
    pub fn observe(&mut self, change: Change) -> Reaction {
        let mode_changed = change.edit_mode != self.edit_mode;
        self.edit_mode = change.edit_mode;

        if mode_changed {
            self.state = match std::mem::take(&mut self.state) {
                LayoutState::Ready { layout } if change.edit_mode => LayoutState::Editing {
                    committed: layout.clone(),
                    buffer: layout,
                },
                LayoutState::Editing { committed, buffer } if !change.edit_mode => {
                    tracing::debug!(
                        target: "gridview.reconcile",
                        discarded = buffer.len(),
                        "left edit mode without saving"
                    );
                    LayoutState::Ready { layout: committed }
                }
                other => other,
            };
        }

        if !(change.inputs_changed || mode_changed) {
            return Reaction::Idle;
        }
        let reaction = if self.state.working().is_some() {
            Reaction::Rebuild
        } else {
            Reaction::Assign
        };
        tracing::debug!(
            target: "gridview.reconcile",
            state = self.state.name(),
            inputs_changed = change.inputs_changed,
            mode_changed,
            ?reaction,
            "observed input change"
        );
        reaction
    }

    /// Start an assignment run, superseding any run in flight.
    ///
    /// Without a working layout this is a full run and the state becomes
    /// `Assigning`. With one, it is a top-up run for cards that have no entry
    /// yet and the working layout stays in place.
    #[must_use]
    pub fn begin_assignment(&mut self) -> RunToken {
        let token = self.runs.begin();
        if self.state.working().is_none() {
            self.state = LayoutState::Assigning {
                generation: token.generation(),
            };
        }
        token
    }

    /// Land the result of the run identified by `token`.
    ///
    /// A full run (started from `Assigning`) installs its layout. A top-up run,
    /// started while a working layout already existed, only adds the entries
    /// that are still missing; a failed top-up leaves the layout untouched.
    pub fn finish_assignment(
        &mut self,
        token: &RunToken,
        result: Result<AssignOutcome, LayoutError>,
    ) -> Finish {
        if !token.is_current() {
            tracing::debug!(
                target: "gridview.reconcile",
                generation = token.generation(),
                latest = self.runs.latest(),
                "dropping stale assignment result"
            );
            return Finish::Superseded;
        }

        let layout = match result {
            Ok(AssignOutcome::Complete(layout)) => layout,
            Ok(AssignOutcome::Superseded { .. }) => return Finish::Superseded,
            Err(error) => return self.fail(token, error),
        };

        if self.is_full_run(token) {
            tracing::info!(
                target: "gridview.reconcile",
                generation = token.generation(),
                entries = layout.len(),
                edit_mode = self.edit_mode,
                "layout committed"
            );
            self.state = if self.edit_mode {
                LayoutState::Editing {
                    committed: layout.clone(),
                    buffer: layout,
                }
            } else {
                LayoutState::Ready { layout }
            };
            return Finish::Committed;
        }

        match &mut self.state {
            LayoutState::Ready { layout: working } => {
                let added = merge_missing(working, &layout);
                log_top_up(token, added);
                Finish::Committed
            }
            LayoutState::Editing { committed, buffer } => {
                merge_missing(committed, &layout);
                let added = merge_missing(buffer, &layout);
                log_top_up(token, added);
                Finish::Committed
            }
            LayoutState::Uninitialized | LayoutState::Assigning { .. } => Finish::Superseded,
        }
    }

    fn is_full_run(&self, token: &RunToken) -> bool {
        matches!(self.state, LayoutState::Assigning { generation } if generation == token.generation())
    }

    fn fail(&mut self, token: &RunToken, error: LayoutError) -> Finish {
        let full_run = self.is_full_run(token);
        tracing::warn!(
            target: "gridview.reconcile",
            generation = token.generation(),
            full_run,
            %error,
            "assignment failed, nothing committed"
        );
        if full_run {
            self.state = LayoutState::Uninitialized;
        }
        Finish::Failed(error)
    }

    /// Replace the edit buffer with the rendering layer's candidate layout.
    ///
    /// Returns `false` (and changes nothing) outside edit mode.
    pub fn layout_changed(&mut self, entries: Vec<LayoutEntry>) -> bool {
        match &mut self.state {
            LayoutState::Editing { buffer, .. } => {
                *buffer = LayoutSet::from(entries);
                true
            }
            other => {
                tracing::debug!(
                    target: "gridview.reconcile",
                    state = other.name(),
                    "ignoring layout change outside edit mode"
                );
                false
            }
        }
    }

    /// Record a successful save of `saved`.
    ///
    /// While still editing, `saved` becomes the committed layout and the
    /// buffer keeps any edits made during the save; otherwise the view
    /// returns to `Ready` with `saved`.
    pub fn commit_saved(&mut self, saved: LayoutSet) {
        match &mut self.state {
            LayoutState::Editing { committed, .. } => *committed = saved,
            _ => self.state = LayoutState::Ready { layout: saved },
        }
        tracing::info!(
            target: "gridview.reconcile",
            state = self.state.name(),
            "saved layout committed"
        );
    }

    /// Drop entries whose key no longer belongs to a card. Returns how many
    /// entries were removed across the committed layout and the buffer.
    pub fn prune(&mut self, mut keep: impl FnMut(&CardKey) -> bool) -> usize {
        match &mut self.state {
            LayoutState::Uninitialized | LayoutState::Assigning { .. } => 0,
            LayoutState::Ready { layout } => layout.retain_keys(&mut keep),
            LayoutState::Editing { committed, buffer } => {
                committed.retain_keys(&mut keep) + buffer.retain_keys(&mut keep)
            }
        }
    }
}

fn merge_missing(target: &mut LayoutSet, source: &LayoutSet) -> usize {
    let mut added = 0;
    for entry in source {
        if !target.contains(entry.key.as_str()) {
            target.insert(entry.clone());
            added += 1;
        }
    }
    added
}

fn log_top_up(token: &RunToken, added: usize) {
    tracing::info!(
        target: "gridview.reconcile",
        generation = token.generation(),
        added,
        "missing entries merged into working layout"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridview_layout::SizeQueryError;
    use pretty_assertions::assert_eq;

    fn key(k: &str) -> CardKey {
        CardKey::new(k).unwrap()
    }

    fn layout(entries: &[(&str, u32)]) -> LayoutSet {
        entries
            .iter()
            .map(|(k, h)| LayoutEntry::sized(key(k), 3, *h))
            .collect()
    }

    fn ready(reconciler: &mut Reconciler, set: LayoutSet) {
        assert_eq!(
            reconciler.observe(Change {
                inputs_changed: true,
                edit_mode: reconciler.edit_mode(),
            }),
            Reaction::Assign
        );
        let token = reconciler.begin_assignment();
        assert_eq!(
            reconciler.finish_assignment(&token, Ok(AssignOutcome::Complete(set))),
            Finish::Committed
        );
    }

    const INPUTS: Change = Change {
        inputs_changed: true,
        edit_mode: false,
    };
    const ENTER: Change = Change {
        inputs_changed: false,
        edit_mode: true,
    };
    const EXIT: Change = Change {
        inputs_changed: false,
        edit_mode: false,
    };

    #[test]
    fn starts_uninitialized_and_assigns_on_first_change() {
        let mut r = Reconciler::new();
        assert_eq!(r.state(), &LayoutState::Uninitialized);
        assert_eq!(r.observe(INPUTS), Reaction::Assign);
        let token = r.begin_assignment();
        assert_eq!(r.state(), &LayoutState::Assigning { generation: 1 });
        assert_eq!(token.generation(), 1);
    }

    #[test]
    fn no_change_is_idle() {
        let mut r = Reconciler::new();
        assert_eq!(r.observe(EXIT), Reaction::Idle);
    }

    #[test]
    fn working_layout_rebuilds_instead_of_reassigning() {
        let mut r = Reconciler::new();
        ready(&mut r, layout(&[("a", 2)]));
        assert_eq!(r.observe(INPUTS), Reaction::Rebuild);
        assert_eq!(r.latest_generation(), 1);
    }

    #[test]
    fn stale_result_is_dropped() {
        let mut r = Reconciler::new();
        r.observe(INPUTS);
        let old = r.begin_assignment();
        let new = r.begin_assignment();

        let stale = r.finish_assignment(&old, Ok(AssignOutcome::Complete(layout(&[("a", 9)]))));
        assert_eq!(stale, Finish::Superseded);
        assert_eq!(r.state(), &LayoutState::Assigning { generation: 2 });

        let current = r.finish_assignment(&new, Ok(AssignOutcome::Complete(layout(&[("a", 1)]))));
        assert_eq!(current, Finish::Committed);

        // A late stale write after the commit changes nothing either.
        let late = r.finish_assignment(&old, Ok(AssignOutcome::Complete(layout(&[("a", 9)]))));
        assert_eq!(late, Finish::Superseded);
        assert_eq!(r.working(), Some(&layout(&[("a", 1)])));
    }

    #[test]
    fn stale_failure_is_not_reported() {
        let mut r = Reconciler::new();
        r.observe(INPUTS);
        let old = r.begin_assignment();
        let _new = r.begin_assignment();
        let error = LayoutError::SizeQuery {
            key: key("a"),
            source: SizeQueryError::new("boom"),
        };
        assert_eq!(r.finish_assignment(&old, Err(error)), Finish::Superseded);
        assert_eq!(r.state(), &LayoutState::Assigning { generation: 2 });
    }

    #[test]
    fn failure_returns_to_uninitialized() {
        let mut r = Reconciler::new();
        r.observe(INPUTS);
        let token = r.begin_assignment();
        let error = LayoutError::SizeQuery {
            key: key("a"),
            source: SizeQueryError::new("boom"),
        };
        assert_eq!(
            r.finish_assignment(&token, Err(error.clone())),
            Finish::Failed(error)
        );
        assert_eq!(r.state(), &LayoutState::Uninitialized);
        assert_eq!(r.observe(INPUTS), Reaction::Assign);
    }

    #[test]
    fn edit_buffer_isolation() {
        let mut r = Reconciler::new();
        let committed = layout(&[("a", 2), ("b", 4)]);
        ready(&mut r, committed.clone());

        assert_eq!(r.observe(ENTER), Reaction::Rebuild);
        assert_eq!(r.edit_buffer(), Some(&committed));

        for height in 5..8 {
            let edited = vec![
                LayoutEntry::sized(key("a"), 6, height).at(0, 0),
                LayoutEntry::sized(key("b"), 3, 1).at(6, 0),
            ];
            assert!(r.layout_changed(edited));
        }
        assert_eq!(r.state().committed(), Some(&committed));

        assert_eq!(r.observe(EXIT), Reaction::Rebuild);
        assert_eq!(r.state(), &LayoutState::Ready { layout: committed });
        assert_eq!(r.edit_buffer(), None);
    }

    #[test]
    fn layout_change_outside_edit_mode_is_ignored() {
        let mut r = Reconciler::new();
        let committed = layout(&[("a", 2)]);
        ready(&mut r, committed.clone());
        assert!(!r.layout_changed(vec![LayoutEntry::sized(key("a"), 12, 12)]));
        assert_eq!(r.working(), Some(&committed));
    }

    #[test]
    fn completion_while_editing_lands_in_editing() {
        let mut r = Reconciler::new();
        r.observe(ENTER);
        let token = r.begin_assignment();
        let set = layout(&[("a", 2)]);
        r.finish_assignment(&token, Ok(AssignOutcome::Complete(set.clone())));
        assert_eq!(
            r.state(),
            &LayoutState::Editing {
                committed: set.clone(),
                buffer: set,
            }
        );
    }

    #[test]
    fn commit_saved_keeps_buffer_while_editing() {
        let mut r = Reconciler::new();
        ready(&mut r, layout(&[("a", 2)]));
        r.observe(ENTER);
        let saved = layout(&[("a", 7)]);
        r.layout_changed(saved.to_vec());
        r.layout_changed(layout(&[("a", 9)]).to_vec());
        r.commit_saved(saved.clone());
        assert_eq!(r.state().committed(), Some(&saved));
        assert_eq!(r.edit_buffer(), Some(&layout(&[("a", 9)])));

        r.observe(EXIT);
        assert_eq!(r.state(), &LayoutState::Ready { layout: saved });
    }

    #[test]
    fn commit_saved_after_edit_mode_ended() {
        let mut r = Reconciler::new();
        ready(&mut r, layout(&[("a", 2)]));
        r.observe(ENTER);
        r.observe(EXIT);
        r.commit_saved(layout(&[("a", 8)]));
        assert_eq!(r.state(), &LayoutState::Ready { layout: layout(&[("a", 8)]) });
    }

    #[test]
    fn top_up_merges_only_missing_entries() {
        let mut r = Reconciler::new();
        ready(&mut r, layout(&[("a", 2)]));
        assert_eq!(r.observe(INPUTS), Reaction::Rebuild);

        let token = r.begin_assignment();
        assert!(matches!(r.state(), LayoutState::Ready { .. }));
        let result = layout(&[("a", 99), ("b", 4)]);
        assert_eq!(
            r.finish_assignment(&token, Ok(AssignOutcome::Complete(result))),
            Finish::Committed
        );
        assert_eq!(r.working(), Some(&layout(&[("a", 2), ("b", 4)])));
    }

    #[test]
    fn failed_top_up_keeps_working_layout() {
        let mut r = Reconciler::new();
        ready(&mut r, layout(&[("a", 2)]));
        let token = r.begin_assignment();
        let error = LayoutError::SizeQuery {
            key: key("b"),
            source: SizeQueryError::new("boom"),
        };
        assert_eq!(r.finish_assignment(&token, Err(error.clone())), Finish::Failed(error));
        assert_eq!(r.working(), Some(&layout(&[("a", 2)])));
    }

    #[test]
    fn prune_drops_entries_for_removed_cards() {
        let mut r = Reconciler::new();
        ready(&mut r, layout(&[("a", 1), ("b", 1), ("c", 1)]));
        r.observe(ENTER);
        let removed = r.prune(|k| k.as_str() != "b");
        assert_eq!(removed, 2);
        assert_eq!(r.working(), Some(&layout(&[("a", 1), ("c", 1)])));
        assert_eq!(r.state().committed(), Some(&layout(&[("a", 1), ("c", 1)])));
    }
}
