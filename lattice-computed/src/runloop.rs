//! Run Loop
//!
//! Cooperative deferred execution. Work scheduled while a turn is running
//! executes once, at the end of that turn, before [`run`] returns.
//!
//! # Coalescing
//!
//! [`once`] takes a [`OnceKey`]. Scheduling the same key again before the
//! queue drains keeps a single entry in its original position, holding the
//! most recently scheduled job. Jobs read their inputs when they execute, so
//! a burst of writes still produces one up-to-date pass.
//!
//! # Implementation
//!
//! The queue is thread-local, like the tracking stack it replaces: every
//! callback of the object model runs on the thread that triggered it.
//! Work scheduled outside of [`run`] waits until the next turn ends or until
//! [`flush`] is called.

use std::cell::RefCell;

use indexmap::IndexMap;
use tracing::{trace, warn};

use crate::config::EngineConfig;
use crate::error::{Error, Result};

/// Identifies a coalescable job: a target (such as a helper) and a slot
/// within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OnceKey {
    pub target: u64,
    pub slot: usize,
}

impl OnceKey {
    pub fn new(target: u64, slot: usize) -> Self {
        Self { target, slot }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum JobKey {
    Once(OnceKey),
    Anonymous(u64),
}

type Job = Box<dyn FnOnce()>;

#[derive(Default)]
struct RunLoopState {
    depth: usize,
    next_anonymous: u64,
    queue: IndexMap<JobKey, Job>,
}

thread_local! {
    static RUN_LOOP: RefCell<RunLoopState> = RefCell::new(RunLoopState::default());
}

/// Guard that closes the turn when dropped, even if the turn panics.
struct Turn;

impl Turn {
    fn enter() -> Self {
        RUN_LOOP.with(|state| state.borrow_mut().depth += 1);
        Turn
    }
}

impl Drop for Turn {
    fn drop(&mut self) {
        RUN_LOOP.with(|state| state.borrow_mut().depth -= 1);
    }
}

/// Run `f` as one turn, then drain deferred work.
///
/// Nested calls join the outer turn; only the outermost call drains.
pub fn run<R>(f: impl FnOnce() -> R) -> Result<R> {
    let result = {
        let _turn = Turn::enter();
        f()
    };

    if !is_running() {
        flush()?;
    }
    Ok(result)
}

/// Whether a turn is in progress on this thread.
pub fn is_running() -> bool {
    RUN_LOOP.with(|state| state.borrow().depth > 0)
}

/// Schedule `job` to run once at the end of the turn, replacing any job
/// already queued under the same key.
pub fn once(key: OnceKey, job: impl FnOnce() + 'static) {
    RUN_LOOP.with(|state| {
        let replaced = state
            .borrow_mut()
            .queue
            .insert(JobKey::Once(key), Box::new(job))
            .is_some();
        trace!(?key, replaced, "scheduled once");
    });
}

/// Schedule `job` to run at the end of the turn.
pub fn schedule(job: impl FnOnce() + 'static) {
    RUN_LOOP.with(|state| {
        let mut state = state.borrow_mut();
        let key = JobKey::Anonymous(state.next_anonymous);
        state.next_anonymous += 1;
        state.queue.insert(key, Box::new(job));
    });
}

/// Number of jobs waiting to run.
pub fn pending() -> usize {
    RUN_LOOP.with(|state| state.borrow().queue.len())
}

/// Drain deferred work now, using the configured pass limit.
pub fn flush() -> Result<()> {
    flush_with_limit(EngineConfig::current().max_flush_passes)
}

/// Drain deferred work, allowing at most `max_passes` generations of jobs.
pub fn flush_with_limit(max_passes: usize) -> Result<()> {
    for pass in 0..max_passes {
        let batch = RUN_LOOP.with(|state| std::mem::take(&mut state.borrow_mut().queue));
        if batch.is_empty() {
            return Ok(());
        }

        trace!(pass, jobs = batch.len(), "flushing run loop");
        for job in batch.into_values() {
            job();
        }
    }

    if pending() == 0 {
        return Ok(());
    }

    warn!(passes = max_passes, pending = pending(), "run loop did not settle");
    Err(Error::RunLoopExhausted { passes: max_passes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn run_drains_deferred_work() {
        let ran = Rc::new(Cell::new(false));
        let ran_clone = Rc::clone(&ran);

        run(|| {
            schedule(move || ran_clone.set(true));
            assert!(!ran.get());
            assert!(is_running());
        })
        .unwrap();

        assert!(ran.get());
        assert!(!is_running());
        assert_eq!(pending(), 0);
    }

    #[test]
    fn once_coalesces_and_keeps_latest_job() {
        let value = Rc::new(Cell::new(0));
        let runs = Rc::new(Cell::new(0));

        run(|| {
            for i in 1..=3 {
                let value = Rc::clone(&value);
                let runs = Rc::clone(&runs);
                once(OnceKey::new(7, 0), move || {
                    value.set(i);
                    runs.set(runs.get() + 1);
                });
            }
            assert_eq!(pending(), 1);
        })
        .unwrap();

        assert_eq!(runs.get(), 1);
        assert_eq!(value.get(), 3);
    }

    #[test]
    fn distinct_keys_do_not_coalesce() {
        let runs = Rc::new(Cell::new(0));

        run(|| {
            for slot in 0..3 {
                let runs = Rc::clone(&runs);
                once(OnceKey::new(9, slot), move || runs.set(runs.get() + 1));
            }
        })
        .unwrap();

        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn nested_runs_drain_once_at_the_outermost_turn() {
        let ran = Rc::new(Cell::new(false));
        let ran_clone = Rc::clone(&ran);

        run(|| {
            run(|| schedule(move || ran_clone.set(true))).unwrap();
            assert!(!ran.get());
        })
        .unwrap();

        assert!(ran.get());
    }

    #[test]
    fn jobs_scheduled_while_flushing_run_in_a_later_pass() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let outer = Rc::clone(&order);

        run(|| {
            schedule(move || {
                outer.borrow_mut().push("first");
                let inner = Rc::clone(&outer);
                schedule(move || inner.borrow_mut().push("second"));
            });
        })
        .unwrap();

        assert_eq!(*order.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn self_rescheduling_work_exhausts_the_limit() {
        fn reschedule() {
            schedule(reschedule);
        }

        schedule(reschedule);
        let err = flush_with_limit(5).unwrap_err();
        assert!(matches!(err, Error::RunLoopExhausted { passes: 5 }));

        // leave the thread's queue empty for other tests
        RUN_LOOP.with(|state| state.borrow_mut().queue.clear());
    }
}
