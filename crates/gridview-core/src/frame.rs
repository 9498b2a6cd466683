#![forbid(unsafe_code)]

//! Frame-budget scheduling for cooperative async work.
//!
//! [`FrameScheduler`] lets a long chain of awaited steps voluntarily give the
//! render loop a chance to paint. It tracks when the current frame window
//! opened; once a step starts more than the budget (one 60 Hz frame by default)
//! after that, the step's completion is additionally gated on the next-frame
//! signal.
//!
//! One next-frame signal is requested per window and shared by every step that
//! needs it. When the signal fires, the window closes and the next step opens
//! a fresh one.
//!
//! Time and frames are both injected: [`FrameClock`] supplies monotonic time
//! ([`SystemClock`] natively and on the web, [`DeterministicClock`] for hosts
//! and tests that drive time explicitly) and [`NextFrame`] supplies the
//! "wait for the next scheduling opportunity" primitive ([`HostFrames`] when
//! the host calls [`HostFrames::tick`] from its animation-frame callback).
//!
//! # Failure Modes
//!
//! - A host that never ticks stalls every gated step. Ungated steps are
//!   unaffected.
//! - Dropping a [`HostFrames`] releases all waiters, as if a frame had passed.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{self, LocalBoxFuture, Shared};
use futures::FutureExt;
use web_time::{Duration, Instant};

/// One frame at 60 Hz.
pub const DEFAULT_FRAME_BUDGET: Duration = Duration::from_millis(16);

// ---------------------------------------------------------------------------
// Clocks
// ---------------------------------------------------------------------------

/// Monotonic clock abstraction.
pub trait FrameClock {
    /// Elapsed time since an unspecified epoch, monotonically increasing.
    fn now_mono(&self) -> Duration;
}

impl<T: FrameClock + ?Sized> FrameClock for Rc<T> {
    fn now_mono(&self) -> Duration {
        (**self).now_mono()
    }
}

/// Wall clock backed by `web_time::Instant` (`performance.now()` on the web).
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for SystemClock {
    fn now_mono(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock advanced explicitly by its owner. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct DeterministicClock {
    now: Rc<Cell<Duration>>,
}

impl DeterministicClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }

    pub fn advance(&self, dt: Duration) {
        self.now.set(self.now.get().saturating_add(dt));
    }
}

impl FrameClock for DeterministicClock {
    fn now_mono(&self) -> Duration {
        self.now.get()
    }
}

// ---------------------------------------------------------------------------
// Next-frame signal
// ---------------------------------------------------------------------------

/// Source of "the renderer has had a chance to paint" signals.
pub trait NextFrame {
    /// A future resolving after the next frame has been rendered.
    fn next_frame(&self) -> LocalBoxFuture<'static, ()>;
}

impl<T: NextFrame + ?Sized> NextFrame for Rc<T> {
    fn next_frame(&self) -> LocalBoxFuture<'static, ()> {
        (**self).next_frame()
    }
}

/// Next-frame signals released by the host.
///
/// A web host calls [`tick`](Self::tick) from its animation-frame callback.
/// Clones share the same waiter list.
#[derive(Debug, Clone, Default)]
pub struct HostFrames {
    waiting: Rc<RefCell<Vec<oneshot::Sender<()>>>>,
}

impl HostFrames {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal that a frame has been rendered, releasing every waiter.
    ///
    /// Returns the number of waiters released.
    pub fn tick(&self) -> usize {
        let waiting = std::mem::take(&mut *self.waiting.borrow_mut());
        let released = waiting.len();
        for tx in waiting {
            let _ = tx.send(());
        }
        released
    }

    /// Number of outstanding next-frame requests.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.waiting.borrow().len()
    }
}

impl NextFrame for HostFrames {
    fn next_frame(&self) -> LocalBoxFuture<'static, ()> {
        let (tx, rx) = oneshot::channel();
        self.waiting.borrow_mut().push(tx);
        async move {
            // A dropped sender means the host went away; treat it as a frame.
            let _ = rx.await;
        }
        .boxed_local()
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Gates awaited steps on the next frame once the frame budget is spent.
pub struct FrameScheduler<K, F> {
    clock: K,
    frames: F,
    budget: Duration,
    window_start: Option<Duration>,
    gate: Option<Shared<LocalBoxFuture<'static, ()>>>,
    gated_steps: u64,
}

impl<K: FrameClock, F: NextFrame> FrameScheduler<K, F> {
    /// Create a scheduler with [`DEFAULT_FRAME_BUDGET`].
    #[must_use]
    pub fn new(clock: K, frames: F) -> Self {
        Self {
            clock,
            frames,
            budget: DEFAULT_FRAME_BUDGET,
            window_start: None,
            gate: None,
            gated_steps: 0,
        }
    }

    /// Override the per-frame budget (builder pattern).
    #[must_use]
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    #[must_use]
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Number of steps that had to wait for a frame.
    #[must_use]
    pub fn gated_steps(&self) -> u64 {
        self.gated_steps
    }

    /// Await `work`, additionally waiting for the next frame if the current
    /// window has exceeded the budget.
    pub async fn run<T>(&mut self, work: impl Future<Output = T>) -> T {
        self.close_window_if_painted();

        let frames = &self.frames;
        let gate = self
            .gate
            .get_or_insert_with(|| frames.next_frame().shared())
            .clone();

        let now = self.clock.now_mono();
        let wait = match self.window_start {
            None => {
                self.window_start = Some(now);
                None
            }
            Some(start) if now.saturating_sub(start) > self.budget => {
                self.gated_steps += 1;
                tracing::debug!(
                    target: "gridview.frame",
                    over_budget_us = now.saturating_sub(start).as_micros() as u64,
                    budget_us = self.budget.as_micros() as u64,
                    "frame budget exceeded, waiting for next frame"
                );
                Some(gate)
            }
            Some(_) => None,
        };

        match wait {
            Some(gate) => future::join(work, gate).await.0,
            None => work.await,
        }
    }

    fn close_window_if_painted(&mut self) {
        let painted = self
            .gate
            .as_ref()
            .is_some_and(|gate| gate.clone().now_or_never().is_some());
        if painted {
            self.gate = None;
            self.window_start = None;
        }
    }
}
