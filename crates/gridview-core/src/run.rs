#![forbid(unsafe_code)]

//! Run tokens for superseding asynchronous work.
//!
//! Each attempt at a long-running computation calls [`RunCounter::begin`] and
//! carries the returned [`RunToken`]. Starting a newer attempt makes every
//! older token stale; a holder checks [`RunToken::is_current`] after each
//! suspension point and drops its result when it has been superseded.
//!
//! This is the single-threaded counterpart of a cancellation token: nothing is
//! signalled, the stale run simply observes that it lost.
//!
//! # Invariants
//!
//! 1. Generations are strictly increasing, starting at 1.
//! 2. At most one token (the latest) is current at any time.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Issues monotonically increasing [`RunToken`]s.
///
/// Clones share the same counter.
#[derive(Clone, Default)]
pub struct RunCounter {
    latest: Rc<Cell<u64>>,
}

impl RunCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new run, superseding every token issued before.
    #[must_use]
    pub fn begin(&self) -> RunToken {
        let generation = self.latest.get().saturating_add(1);
        self.latest.set(generation);
        RunToken {
            generation,
            latest: Rc::clone(&self.latest),
        }
    }

    /// Generation of the most recently started run (0 if none).
    #[must_use]
    pub fn latest(&self) -> u64 {
        self.latest.get()
    }
}

impl fmt::Debug for RunCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunCounter")
            .field("latest", &self.latest.get())
            .finish()
    }
}

/// Identifies one run; compares its generation against the shared counter.
#[derive(Clone)]
pub struct RunToken {
    generation: u64,
    latest: Rc<Cell<u64>>,
}

impl RunToken {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// `true` while no newer run has been started.
    #[inline]
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.latest.get() == self.generation
    }
}

impl fmt::Debug for RunToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunToken")
            .field("generation", &self.generation)
            .field("current", &self.is_current())
            .finish()
    }
}
