#![forbid(unsafe_code)]

//! Grid view shell.
//!
//! [`GridView`] is the host-facing object for one dashboard view. The host
//! pushes inputs into it (view config, [`ViewProps`], viewport and sidebar
//! signals, drag/resize results) and reads back what to render
//! ([`GridProps`], [`ViewChrome`], [`GridView::item`]).
//!
//! Every input is diffed against the previous one and fed to the
//! [`Reconciler`]. Assignment runs are spawned on the host's local executor
//! and hold only a weak reference to the view, so dropping the view abandons
//! them.
//!
//! # Invariants
//!
//! 1. Card keys are stamped once per configuration and never regenerated for
//!    cards that already carry one.
//! 2. No `RefCell` borrow is held across an await or a host callback.
//! 3. `save_view` calls the host exactly once per invocation.
//!
//! # Failure Modes
//!
//! - Size query failures are reported through [`HostApi::report_error`].
//! - Save failures are returned to the caller and keep the edit buffer.
//! - Key persistence failures are logged; the keys stay stamped locally and
//!   the next successful save carries them.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::task::{LocalSpawn, LocalSpawnExt};
use gridview_core::{
    CardKey, DashboardConfig, FrameClock, FrameScheduler, LayoutEntry, LayoutSet, NextFrame,
    ViewConfig, assign_missing_keys,
};
use gridview_layout::{AssignRequest, ColumnResolver, SizeOracle, assign_layout};
use serde::Serialize;
use thiserror::Error;

use crate::elements::{ElementMap, GridElement, build_elements};
use crate::host::{CardHandle, HostApi, HostError, IntentSink, ViewIntent};
use crate::reconciler::{Change, Finish, LayoutState, Reaction, Reconciler};
use crate::settings::GridSettings;

/// Failure to save the edited layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error("the view is not in edit mode")]
    NotEditing,
    #[error("the view has no configuration yet")]
    NoConfig,
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Host-owned inputs, compared by identity between updates.
#[derive(Debug)]
pub struct ViewProps<C> {
    pub cards: Rc<[C]>,
    pub dashboard: Rc<DashboardConfig>,
    pub edit_mode: bool,
    /// Number of badges rendered above the grid.
    pub badges: usize,
    /// Right-to-left locale.
    pub rtl: bool,
}

impl<C> Clone for ViewProps<C> {
    fn clone(&self) -> Self {
        Self {
            cards: Rc::clone(&self.cards),
            dashboard: Rc::clone(&self.dashboard),
            edit_mode: self.edit_mode,
            badges: self.badges,
            rtl: self.rtl,
        }
    }
}

impl<C> ViewProps<C> {
    #[must_use]
    pub fn new(cards: impl Into<Rc<[C]>>, dashboard: impl Into<Rc<DashboardConfig>>) -> Self {
        Self {
            cards: cards.into(),
            dashboard: dashboard.into(),
            edit_mode: false,
            badges: 0,
            rtl: false,
        }
    }

    #[must_use]
    pub fn with_edit_mode(mut self, edit_mode: bool) -> Self {
        self.edit_mode = edit_mode;
        self
    }

    #[must_use]
    pub fn with_badges(mut self, badges: usize) -> Self {
        self.badges = badges;
        self
    }

    #[must_use]
    pub fn with_rtl(mut self, rtl: bool) -> Self {
        self.rtl = rtl;
        self
    }

    /// Whether the layout-relevant inputs differ from `other`.
    fn inputs_differ(&self, other: &Self) -> bool {
        !Rc::ptr_eq(&self.cards, &other.cards) || !Rc::ptr_eq(&self.dashboard, &other.dashboard)
    }
}

/// Services the view consumes.
pub struct ViewBindings<C> {
    pub host: Rc<dyn HostApi>,
    pub oracle: Rc<dyn SizeOracle<C>>,
    pub clock: Rc<dyn FrameClock>,
    pub frames: Rc<dyn NextFrame>,
    pub spawner: Rc<dyn LocalSpawn>,
}

impl<C> Clone for ViewBindings<C> {
    fn clone(&self) -> Self {
        Self {
            host: Rc::clone(&self.host),
            oracle: Rc::clone(&self.oracle),
            clock: Rc::clone(&self.clock),
            frames: Rc::clone(&self.frames),
            spawner: Rc::clone(&self.spawner),
        }
    }
}

/// Options for the external grid component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridProps {
    pub row_height: u32,
    pub margin: [u32; 2],
    pub container_padding: [u32; 2],
    pub columns: Option<u32>,
    pub drag_handle: String,
    pub drag_disabled: bool,
    pub resize_disabled: bool,
    pub layout: Vec<LayoutEntry>,
}

/// Which surrounding controls are visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewChrome {
    pub show_save_toolbar: bool,
    pub show_add_card: bool,
    pub show_badges: bool,
    /// Mirror the add-card button for right-to-left locales.
    pub add_card_rtl: bool,
}

// ---------------------------------------------------------------------------
// View state
// ---------------------------------------------------------------------------

struct PendingRun<C> {
    request: AssignRequest<C>,
    token: gridview_core::RunToken,
}

struct ViewState<C> {
    index: usize,
    settings: GridSettings,
    config: Option<ViewConfig>,
    /// Last unkeyed config received and the config stamped from it.
    stamped_from: Option<(ViewConfig, ViewConfig)>,
    props: Option<ViewProps<C>>,
    columns: ColumnResolver,
    reconciler: Reconciler,
    elements: ElementMap<C>,
    intents: IntentSink,
    attached: bool,
    keys_unsaved: bool,
}

impl<C: CardHandle> ViewState<C> {
    fn edit_mode(&self) -> bool {
        self.props.as_ref().is_some_and(|props| props.edit_mode)
    }

    fn reconcile(&mut self, inputs_changed: bool) -> Option<PendingRun<C>> {
        if !self.attached || self.columns.columns().is_none() {
            return None;
        }
        if self.config.is_none() || self.props.is_none() {
            return None;
        }

        let change = Change {
            inputs_changed,
            edit_mode: self.edit_mode(),
        };
        match self.reconciler.observe(change) {
            Reaction::Idle => None,
            Reaction::Assign => {
                self.elements = ElementMap::default();
                self.full_run()
            }
            Reaction::Rebuild => {
                self.prune_stale();
                self.rebuild_elements();
                self.top_up_run()
            }
        }
    }

    /// Cards paired with their configs, or `None` while some config lacks a
    /// key.
    fn request(&self) -> Option<AssignRequest<C>> {
        let config = self.config.as_ref()?;
        let props = self.props.as_ref()?;
        match AssignRequest::from_view(&props.cards, config) {
            Ok(request) => Some(request.with_default_width(self.settings.default_card_width)),
            Err(error) => {
                tracing::debug!(
                    target: "gridview.view",
                    view = self.index,
                    %error,
                    "waiting for card keys before assigning"
                );
                None
            }
        }
    }

    fn full_run(&mut self) -> Option<PendingRun<C>> {
        let request = self.request()?;
        let token = self.reconciler.begin_assignment();
        Some(PendingRun { request, token })
    }

    fn top_up_run(&mut self) -> Option<PendingRun<C>> {
        let working = self.reconciler.working()?.clone();
        let request = self.request()?.with_persisted(working);
        if request.unresolved() == 0 {
            return None;
        }
        tracing::debug!(
            target: "gridview.view",
            view = self.index,
            missing = request.unresolved(),
            "sizing cards added after the layout was built"
        );
        let token = self.reconciler.begin_assignment();
        Some(PendingRun { request, token })
    }

    fn prune_stale(&mut self) {
        let Some(config) = &self.config else {
            return;
        };
        let live: Vec<CardKey> = config.cards.iter().filter_map(|card| card.key()).collect();
        let removed = self.reconciler.prune(|key| live.contains(key));
        if removed > 0 {
            tracing::debug!(
                target: "gridview.view",
                view = self.index,
                removed,
                "pruned entries of removed cards"
            );
        }
    }

    fn rebuild_elements(&mut self) {
        let (Some(config), Some(props)) = (&self.config, &self.props) else {
            return;
        };
        let Some(working) = self.reconciler.working() else {
            self.elements = ElementMap::default();
            return;
        };
        self.elements = build_elements(
            &props.cards,
            &config.cards,
            working,
            props.edit_mode,
            self.index,
            &self.intents,
        );
    }

    /// Stamp keys onto `config`. The same unkeyed input seen again reuses the
    /// keys stamped the first time.
    fn stamp_keys(&mut self, config: ViewConfig) -> ViewConfig {
        if let Some((input, stamped)) = &self.stamped_from {
            if *input == config {
                tracing::debug!(
                    target: "gridview.identity",
                    view = self.index,
                    "unkeyed config seen again, reusing stamped keys"
                );
                return stamped.clone();
            }
        }
        let Some(stamped) = assign_missing_keys(&config) else {
            return config;
        };
        tracing::info!(
            target: "gridview.identity",
            view = self.index,
            "stamped keys on unkeyed cards"
        );
        self.keys_unsaved = true;
        self.stamped_from = Some((config, stamped.clone()));
        stamped
    }

    /// The dashboard config with this view's current config, if keys still
    /// need persisting. Clears the flag.
    fn take_unsaved_keys(&mut self) -> Option<DashboardConfig> {
        if !self.keys_unsaved || !self.attached {
            return None;
        }
        let config = self.config.as_ref()?;
        let props = self.props.as_ref()?;
        let dashboard = props.dashboard.replace_view(self.index, config.clone());
        self.keys_unsaved = false;
        Some(dashboard)
    }
}

// ---------------------------------------------------------------------------
// GridView
// ---------------------------------------------------------------------------

/// One dashboard view laid out on a responsive grid.
pub struct GridView<C> {
    state: Rc<RefCell<ViewState<C>>>,
    bindings: ViewBindings<C>,
}

impl<C: CardHandle + 'static> GridView<C> {
    /// Create the view at position `index` in the dashboard.
    #[must_use]
    pub fn new(index: usize, settings: GridSettings, bindings: ViewBindings<C>) -> Self {
        let host = Rc::clone(&bindings.host);
        let intents: IntentSink = Rc::new(move |intent| host.emit(intent));
        let state = ViewState {
            index,
            columns: ColumnResolver::new(settings.columns.clone()),
            settings,
            config: None,
            stamped_from: None,
            props: None,
            reconciler: Reconciler::new(),
            elements: ElementMap::default(),
            intents,
            attached: false,
            keys_unsaved: false,
        };
        Self {
            state: Rc::new(RefCell::new(state)),
            bindings,
        }
    }

    /// Install the view's configuration, stamping keys on unkeyed cards.
    ///
    /// Stamped keys are used locally right away and persisted through the host
    /// once the view is attached and the dashboard config is known.
    pub fn set_config(&self, config: ViewConfig) {
        let run = {
            let mut state = self.state.borrow_mut();
            let config = state.stamp_keys(config);
            state.config = Some(config);
            state.reconcile(true)
        };
        self.persist_keys();
        self.start(run);
    }

    /// First render: resolve columns for `viewport_width` and start working.
    pub fn attach(&self, viewport_width: u32) {
        let run = {
            let mut state = self.state.borrow_mut();
            state.attached = true;
            state.columns.set_viewport_width(viewport_width);
            tracing::debug!(
                target: "gridview.view",
                view = state.index,
                viewport_width,
                columns = ?state.columns.columns(),
                "view attached"
            );
            state.reconcile(true)
        };
        self.persist_keys();
        self.start(run);
    }

    /// Replace the host-owned inputs.
    pub fn update(&self, props: ViewProps<C>) {
        let run = {
            let mut state = self.state.borrow_mut();
            let inputs_changed = state
                .props
                .as_ref()
                .is_none_or(|old| old.inputs_differ(&props));
            state.props = Some(props);
            state.reconcile(inputs_changed)
        };
        self.persist_keys();
        self.start(run);
    }

    /// Viewport width changed; recomputes columns if a breakpoint was crossed.
    pub fn set_viewport_width(&self, width: u32) {
        let run = {
            let mut state = self.state.borrow_mut();
            match state.columns.set_viewport_width(width) {
                Some(_) => state.reconcile(true),
                None => None,
            }
        };
        self.start(run);
    }

    /// Sidebar docked state changed.
    pub fn set_sidebar_docked(&self, docked: bool) {
        let run = {
            let mut state = self.state.borrow_mut();
            match state.columns.set_sidebar_docked(docked) {
                Some(_) => state.reconcile(true),
                None => None,
            }
        };
        self.start(run);
    }

    /// Drag/resize result from the grid component. Only affects the edit
    /// buffer; returns whether it was accepted.
    pub fn layout_changed(&self, layout: Vec<LayoutEntry>) -> bool {
        self.state.borrow_mut().reconciler.layout_changed(layout)
    }

    /// Persist the edit buffer as the view's layout.
    ///
    /// # Errors
    ///
    /// [`SaveError::NotEditing`] without an edit buffer, [`SaveError::NoConfig`]
    /// before the view has a config and props, [`SaveError::Host`] when the host
    /// rejects the save. The edit buffer is kept on every error.
    pub async fn save_view(&self) -> Result<(), SaveError> {
        let (dashboard, view, layout) = {
            let state = self.state.borrow();
            let layout = state
                .reconciler
                .edit_buffer()
                .cloned()
                .ok_or(SaveError::NotEditing)?;
            let config = state.config.as_ref().ok_or(SaveError::NoConfig)?;
            let props = state.props.as_ref().ok_or(SaveError::NoConfig)?;
            let view = config.with_layout(layout.clone());
            let dashboard = props.dashboard.replace_view(state.index, view.clone());
            (dashboard, view, layout)
        };

        let entries = layout.len();
        if let Err(error) = self.bindings.host.save_config(dashboard).await {
            tracing::warn!(target: "gridview.view", %error, "layout save rejected");
            return Err(error.into());
        }

        let mut state = self.state.borrow_mut();
        if let Some((_, stamped)) = &mut state.stamped_from {
            *stamped = view.clone();
        }
        state.config = Some(view);
        state.keys_unsaved = false;
        state.reconciler.commit_saved(layout);
        state.rebuild_elements();
        tracing::info!(target: "gridview.view", view = state.index, entries, "layout saved");
        Ok(())
    }

    /// Ask the host to create a new card.
    pub fn add_card(&self) {
        self.bindings.host.emit(ViewIntent::CreateCard);
    }

    /// The element to render under `key`.
    #[must_use]
    pub fn item(&self, key: &str) -> Option<GridElement<C>> {
        self.state.borrow().elements.get(key).cloned()
    }

    /// Keys of the rendered elements, in card order.
    #[must_use]
    pub fn item_keys(&self) -> Vec<CardKey> {
        self.state.borrow().elements.keys().cloned().collect()
    }

    #[must_use]
    pub fn grid_props(&self) -> GridProps {
        let state = self.state.borrow();
        let edit_mode = state.edit_mode();
        GridProps {
            row_height: state.settings.row_height,
            margin: state.settings.margin,
            container_padding: state.settings.container_padding,
            columns: state.columns.columns(),
            drag_handle: state.settings.drag_handle.clone(),
            drag_disabled: !edit_mode,
            resize_disabled: !edit_mode,
            layout: state
                .reconciler
                .working()
                .map(LayoutSet::to_vec)
                .unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn chrome(&self) -> ViewChrome {
        let state = self.state.borrow();
        let Some(props) = &state.props else {
            return ViewChrome::default();
        };
        ViewChrome {
            show_save_toolbar: props.edit_mode,
            show_add_card: props.edit_mode,
            show_badges: props.badges > 0,
            add_card_rtl: props.rtl,
        }
    }

    #[must_use]
    pub fn state(&self) -> LayoutState {
        self.state.borrow().reconciler.state().clone()
    }

    /// The layout currently rendered (edit buffer while editing).
    #[must_use]
    pub fn layout(&self) -> Option<LayoutSet> {
        self.state.borrow().reconciler.working().cloned()
    }

    #[must_use]
    pub fn columns(&self) -> Option<u32> {
        self.state.borrow().columns.columns()
    }

    /// The view configuration in use, including stamped keys.
    #[must_use]
    pub fn config(&self) -> Option<ViewConfig> {
        self.state.borrow().config.clone()
    }

    fn persist_keys(&self) {
        let Some(dashboard) = self.state.borrow_mut().take_unsaved_keys() else {
            return;
        };
        let save = self.bindings.host.save_config(dashboard);
        let task = async move {
            if let Err(error) = save.await {
                tracing::warn!(target: "gridview.identity", %error, "failed to persist card keys");
            }
        };
        if let Err(error) = self.bindings.spawner.spawn_local(task) {
            tracing::warn!(target: "gridview.identity", %error, "could not spawn key save");
        }
    }

    fn start(&self, run: Option<PendingRun<C>>) {
        let Some(PendingRun { request, token }) = run else {
            return;
        };
        let weak: Weak<RefCell<ViewState<C>>> = Rc::downgrade(&self.state);
        let budget = self.state.borrow().settings.frame_budget();
        let ViewBindings {
            host,
            oracle,
            clock,
            frames,
            ..
        } = self.bindings.clone();
        let generation = token.generation();

        let task = async move {
            let mut scheduler = FrameScheduler::new(clock, frames).with_budget(budget);
            let result = assign_layout(request, &*oracle, &mut scheduler, &token).await;
            let Some(state) = weak.upgrade() else {
                return;
            };
            let failure = {
                let mut state = state.borrow_mut();
                match state.reconciler.finish_assignment(&token, result) {
                    Finish::Committed => {
                        state.rebuild_elements();
                        None
                    }
                    Finish::Superseded => None,
                    Finish::Failed(error) => Some(error),
                }
            };
            if let Some(error) = failure {
                host.report_error(&error);
            }
        };

        if let Err(error) = self.bindings.spawner.spawn_local(task) {
            tracing::warn!(
                target: "gridview.view",
                generation,
                %error,
                "could not spawn assignment run"
            );
        }
    }
}
