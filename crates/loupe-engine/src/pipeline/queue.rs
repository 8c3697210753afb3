use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt::Debug;
use std::rc::Rc;

use anyhow::Result;

use super::scheduler::{DispatchPriority, Scheduler};

/// Lifecycle of a [`CoalescingQueue`].
///
/// `Idle → Scheduled` on the first enqueue, `Scheduled → Draining` when the
/// host calls [`CoalescingQueue::drain`], `Draining → Idle` once the pending
/// queue is observed empty. `Shutdown` is terminal.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum QueueState {
    Idle,
    Scheduled,
    Draining,
    Shutdown,
}

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Priority passed to the scheduler with every drain request.
    pub priority: DispatchPriority,
    /// Prefix for log records, to tell several surfaces apart.
    pub label: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            priority: DispatchPriority::Render,
            label: "view".to_string(),
        }
    }
}

impl QueueConfig {
    pub fn priority(mut self, priority: DispatchPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainReport<S> {
    /// Stages whose work ran, in execution order.
    pub executed: Vec<S>,
    /// Requests dropped as redundant.
    pub coalesced: usize,
}

impl<S> Default for DrainReport<S> {
    fn default() -> Self {
        Self { executed: Vec::new(), coalesced: 0 }
    }
}

impl<S> DrainReport<S> {
    /// `true` when the pass dequeued nothing at all.
    pub fn is_empty(&self) -> bool {
        self.executed.is_empty() && self.coalesced == 0
    }
}

struct Inner<S> {
    config: QueueConfig,
    scheduler: Rc<dyn Scheduler>,
    pending: RefCell<VecDeque<S>>,
    state: Cell<QueueState>,
}

/// Single-threaded queue that batches stage invalidations into drain passes.
///
/// The handle is cheap to clone; every clone refers to the same queue, so the
/// owning surface and its children can all hold one. Borrows of the internal
/// state never outlive a single method call, which is what makes `enqueue`
/// safe to call from inside a stage's work.
pub struct CoalescingQueue<S> {
    inner: Rc<Inner<S>>,
}

impl<S> Clone for CoalescingQueue<S> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<S: Copy + Ord + Debug> CoalescingQueue<S> {
    pub fn new(config: QueueConfig, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            inner: Rc::new(Inner {
                config,
                scheduler,
                pending: RefCell::new(VecDeque::new()),
                state: Cell::new(QueueState::Idle),
            }),
        }
    }

    pub fn state(&self) -> QueueState {
        self.inner.state.get()
    }

    pub fn is_shutdown(&self) -> bool {
        self.state() == QueueState::Shutdown
    }

    pub fn pending_len(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    /// Snapshot of the pending stages, head first.
    pub fn pending(&self) -> Vec<S> {
        self.inner.pending.borrow().iter().copied().collect()
    }

    /// Appends `stage` and requests a drain pass if none is scheduled or running.
    ///
    /// Never blocks and never runs stage work inline. After [`shutdown`] the
    /// request is discarded.
    ///
    /// [`shutdown`]: CoalescingQueue::shutdown
    pub fn enqueue(&self, stage: S) {
        let inner = &*self.inner;
        let state = inner.state.get();

        if state == QueueState::Shutdown {
            log::trace!("{}: dropping {stage:?} after shutdown", inner.config.label);
            return;
        }

        inner.pending.borrow_mut().push_back(stage);

        if state == QueueState::Idle {
            inner.state.set(QueueState::Scheduled);
            log::trace!(
                "{}: {stage:?} scheduled a drain ({:?})",
                inner.config.label,
                inner.config.priority
            );
            inner.scheduler.schedule_drain(inner.config.priority);
        }
    }

    /// Runs one drain pass, calling `work` for every stage that survives
    /// coalescing.
    ///
    /// A stage is dropped when it equals the stage just executed, or when the
    /// entry right behind it is the same or an earlier stage. Only that one
    /// entry is inspected, never the rest of the queue.
    ///
    /// A call made while a pass is already running, or after shutdown, does
    /// nothing and returns an empty report. If `work` fails the error is
    /// returned with the failing stage attached; the stages still queued stay
    /// queued for the pass the next `enqueue` schedules.
    pub fn drain<F>(&self, mut work: F) -> Result<DrainReport<S>>
    where
        F: FnMut(S) -> Result<()>,
    {
        let inner = &*self.inner;

        match inner.state.get() {
            QueueState::Draining => {
                log::trace!("{}: re-entrant drain ignored", inner.config.label);
                return Ok(DrainReport::default());
            }
            QueueState::Shutdown => return Ok(DrainReport::default()),
            QueueState::Idle | QueueState::Scheduled => {}
        }

        let _pass = PassGuard::enter(inner);
        let mut report = DrainReport::default();
        let mut last: Option<S> = None;

        loop {
            // Shutdown from inside a stage ends the pass.
            if inner.state.get() == QueueState::Shutdown {
                break;
            }

            let (current, next) = {
                let mut pending = inner.pending.borrow_mut();
                let Some(current) = pending.pop_front() else {
                    break;
                };
                (current, pending.front().copied())
            };

            if last == Some(current) || next.is_some_and(|next| next <= current) {
                report.coalesced += 1;
                continue;
            }

            if let Err(err) = work(current) {
                log::warn!(
                    "{}: {current:?} failed, {} stage(s) left pending",
                    inner.config.label,
                    inner.pending.borrow().len()
                );
                return Err(err.context(format!("{}: {current:?} failed", inner.config.label)));
            }

            report.executed.push(current);
            last = Some(current);
        }

        log::debug!(
            "{}: drain pass ran {:?}, coalesced {}",
            inner.config.label,
            report.executed,
            report.coalesced
        );

        Ok(report)
    }

    /// Discards all pending stages and stops accepting new ones.
    pub fn shutdown(&self) {
        let inner = &*self.inner;
        let dropped = {
            let mut pending = inner.pending.borrow_mut();
            let n = pending.len();
            pending.clear();
            n
        };
        inner.state.set(QueueState::Shutdown);
        log::debug!("{}: shut down, discarded {dropped} pending stage(s)", inner.config.label);
    }
}

/// Holds `Draining` for the duration of a pass and restores `Idle` on every
/// exit path, unwinding included.
struct PassGuard<'a, S> {
    inner: &'a Inner<S>,
}

impl<'a, S> PassGuard<'a, S> {
    fn enter(inner: &'a Inner<S>) -> Self {
        inner.state.set(QueueState::Draining);
        Self { inner }
    }
}

impl<S> Drop for PassGuard<'_, S> {
    fn drop(&mut self) {
        if self.inner.state.get() == QueueState::Draining {
            self.inner.state.set(QueueState::Idle);
        }
    }
}
