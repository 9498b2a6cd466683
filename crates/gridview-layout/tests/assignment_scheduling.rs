#![forbid(unsafe_code)]

//! End-to-end assignment runs driven on a local executor.
//!
//! Validates:
//! - Known entries keep their relative order around interleaved async queries.
//! - Over-budget batches wait for host frames and still complete.
//! - A superseded run never produces output, even when its queries settle
//!   after the newer run finished.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use futures::channel::oneshot;
use futures::executor::LocalPool;
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;
use futures::FutureExt;
use gridview_core::{
    CardKey, DeterministicClock, FrameScheduler, HostFrames, LayoutEntry, LayoutSet, RunCounter,
};
use gridview_layout::{
    AssignOutcome, AssignRequest, LayoutError, SizeOracle, SizeQueryError, assign_layout,
};
use pretty_assertions::assert_eq;

type SizeResult = Result<u32, SizeQueryError>;

/// Oracle whose answers are released by the test.
#[derive(Default)]
struct ManualOracle {
    waiting: RefCell<HashMap<&'static str, Vec<oneshot::Sender<SizeResult>>>>,
}

impl ManualOracle {
    fn resolve(&self, card: &'static str, size: u32) -> usize {
        let senders = self.waiting.borrow_mut().remove(card).unwrap_or_default();
        let count = senders.len();
        for tx in senders {
            let _ = tx.send(Ok(size));
        }
        count
    }

    fn is_waiting_on(&self, card: &'static str) -> bool {
        self.waiting.borrow().get(card).is_some_and(|v| !v.is_empty())
    }
}

impl SizeOracle<&'static str> for ManualOracle {
    fn size_of(&self, card: &&'static str) -> LocalBoxFuture<'static, SizeResult> {
        let (tx, rx) = oneshot::channel();
        self.waiting.borrow_mut().entry(*card).or_default().push(tx);
        async move { rx.await.unwrap_or_else(|_| Err(SizeQueryError::new("oracle dropped"))) }
            .boxed_local()
    }
}

/// Oracle that answers immediately but burns wall time on the shared clock.
struct SlowOracle {
    clock: DeterministicClock,
    cost: Duration,
}

impl SizeOracle<&'static str> for SlowOracle {
    fn size_of(&self, card: &&'static str) -> LocalBoxFuture<'static, SizeResult> {
        self.clock.advance(self.cost);
        let size = card.len() as u32;
        async move { Ok(size) }.boxed_local()
    }
}

fn key(s: &str) -> CardKey {
    CardKey::new(s).unwrap()
}

type Slot = Rc<RefCell<Option<Result<AssignOutcome, LayoutError>>>>;

fn spawn_run<O: SizeOracle<&'static str> + 'static>(
    pool: &LocalPool,
    oracle: Rc<O>,
    request: AssignRequest<&'static str>,
    counter: &RunCounter,
    clock: &DeterministicClock,
    frames: &HostFrames,
) -> Slot {
    let slot: Slot = Rc::default();
    let out = Rc::clone(&slot);
    let token = counter.begin();
    let mut scheduler = FrameScheduler::new(clock.clone(), frames.clone());
    pool.spawner()
        .spawn_local(async move {
            let outcome = assign_layout(request, &*oracle, &mut scheduler, &token).await;
            *out.borrow_mut() = Some(outcome);
        })
        .unwrap();
    slot
}

#[test]
fn known_entries_keep_order_around_async_queries() {
    let mut pool = LocalPool::new();
    let oracle = Rc::new(ManualOracle::default());
    let persisted: LayoutSet = vec![
        LayoutEntry::sized(key("a"), 3, 1).at(0, 0),
        LayoutEntry::sized(key("b"), 3, 2).at(3, 0),
        LayoutEntry::sized(key("c"), 3, 3).at(6, 0),
    ]
    .into();
    let request = AssignRequest::new(
        ["a", "x", "b", "y", "c"].map(|n| (n, key(n))),
        persisted,
    );
    let slot = spawn_run(
        &pool,
        Rc::clone(&oracle),
        request,
        &RunCounter::new(),
        &DeterministicClock::new(),
        &HostFrames::new(),
    );

    pool.run_until_stalled();
    assert!(oracle.is_waiting_on("x"));
    assert!(!oracle.is_waiting_on("y"), "queries are issued in card order");

    oracle.resolve("x", 5);
    pool.run_until_stalled();
    oracle.resolve("y", 2);
    pool.run_until_stalled();

    let layout = match slot.borrow_mut().take() {
        Some(Ok(AssignOutcome::Complete(layout))) => layout,
        other => panic!("unexpected outcome {other:?}"),
    };
    let order: Vec<_> = layout.keys().map(CardKey::as_str).collect();
    assert_eq!(order, vec!["a", "x", "b", "y", "c"]);
    assert_eq!(layout.get("x"), Some(&LayoutEntry::sized(key("x"), 3, 5)));
}

#[test]
fn over_budget_batch_yields_to_frames_and_completes() {
    let mut pool = LocalPool::new();
    let clock = DeterministicClock::new();
    let frames = HostFrames::new();
    let oracle = Rc::new(SlowOracle {
        clock: clock.clone(),
        cost: Duration::from_millis(10),
    });
    let names = ["one", "three", "fives", "sixsix", "sevennn", "eight888"];
    let request = AssignRequest::new(names.map(|n| (n, key(n))), LayoutSet::new());
    let slot = spawn_run(&pool, oracle, request, &RunCounter::new(), &clock, &frames);

    let mut ticks = 0;
    while slot.borrow().is_none() {
        pool.run_until_stalled();
        if slot.borrow().is_none() {
            assert!(frames.pending() > 0, "a stalled run must be waiting on a frame");
            frames.tick();
            ticks += 1;
        }
        assert!(ticks < names.len(), "run did not converge");
    }
    assert!(ticks > 0, "60ms of work in one window must yield at least once");

    let layout = match slot.borrow_mut().take() {
        Some(Ok(AssignOutcome::Complete(layout))) => layout,
        other => panic!("unexpected outcome {other:?}"),
    };
    let heights: Vec<u32> = layout.iter().map(|e| e.height).collect();
    assert_eq!(heights, vec![3, 5, 5, 6, 7, 8]);
}

#[test]
fn superseded_run_discards_late_results() {
    let mut pool = LocalPool::new();
    let oracle = Rc::new(ManualOracle::default());
    let counter = RunCounter::new();
    let clock = DeterministicClock::new();
    let frames = HostFrames::new();
    let cards = || ["p", "q"].map(|n| (n, key(n)));

    let old = spawn_run(
        &pool,
        Rc::clone(&oracle),
        AssignRequest::new(cards(), LayoutSet::new()),
        &counter,
        &clock,
        &frames,
    );
    pool.run_until_stalled();

    let new = spawn_run(
        &pool,
        Rc::clone(&oracle),
        AssignRequest::new(cards(), LayoutSet::new()),
        &counter,
        &clock,
        &frames,
    );
    pool.run_until_stalled();

    // Both runs are waiting on "p"; releasing it lets the newer run proceed
    // while the old one observes that it lost.
    assert_eq!(oracle.resolve("p", 4), 2);
    pool.run_until_stalled();
    assert_eq!(oracle.resolve("q", 6), 1);
    pool.run_until_stalled();

    assert_eq!(
        old.borrow_mut().take(),
        Some(Ok(AssignOutcome::Superseded { generation: 1 }))
    );
    let expected: LayoutSet = vec![
        LayoutEntry::sized(key("p"), 3, 4),
        LayoutEntry::sized(key("q"), 3, 6),
    ]
    .into();
    assert_eq!(new.borrow_mut().take(), Some(Ok(AssignOutcome::Complete(expected))));
}
