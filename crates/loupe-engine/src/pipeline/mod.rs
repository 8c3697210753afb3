//! View invalidation pipeline.
//!
//! Callers mark a [`Stage`] dirty; the [`CoalescingQueue`] batches those
//! requests and asks the host [`Scheduler`] for one drain pass, during which
//! the [`ViewManager`] runs each surviving stage against its [`ViewSurface`]
//! and chains the stages that depend on it.
//!
//! Everything here is single-threaded and owned by the host's UI thread.

mod manager;
mod queue;
mod scheduler;
mod stage;

pub use manager::{BoundsBox, ViewChange, ViewManager, ViewState, ViewSurface};
pub use queue::{CoalescingQueue, DrainReport, QueueConfig, QueueState};
pub use scheduler::{DispatchPriority, ManualScheduler, Scheduler};
pub use stage::Stage;
