use std::cell::RefCell;

/// When a scheduled drain pass should run relative to the host's frame.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum DispatchPriority {
    /// Just before the next frame is painted, coalesced with the render cycle.
    #[default]
    Render,
    /// Once the host loop has no more input to process.
    Idle,
}

/// Host hook that arranges for a drain pass to run later on the owner thread.
///
/// Implementations must not drain inline: the request usually comes from
/// inside a property-change handler that is still mutating surface state.
/// The host later calls back into the queue (or the view manager owning it).
pub trait Scheduler {
    fn schedule_drain(&self, priority: DispatchPriority);
}

/// Scheduler that records requests for the caller to pump explicitly.
///
/// Used by headless hosts and tests.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    requests: RefCell<Vec<DispatchPriority>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests recorded since the last `take_requests`.
    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn has_pending(&self) -> bool {
        !self.requests.borrow().is_empty()
    }

    pub fn take_requests(&self) -> Vec<DispatchPriority> {
        std::mem::take(&mut *self.requests.borrow_mut())
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_drain(&self, priority: DispatchPriority) {
        self.requests.borrow_mut().push(priority);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_scheduler_records_in_order() {
        let s = ManualScheduler::new();
        s.schedule_drain(DispatchPriority::Idle);
        s.schedule_drain(DispatchPriority::Render);
        assert_eq!(s.request_count(), 2);
        assert_eq!(s.take_requests(), vec![DispatchPriority::Idle, DispatchPriority::Render]);
        assert!(!s.has_pending());
    }

    #[test]
    fn default_priority_is_render() {
        assert_eq!(DispatchPriority::default(), DispatchPriority::Render);
    }
}
