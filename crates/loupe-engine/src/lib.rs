//! Loupe engine crate.
//!
//! Toolkit-agnostic core of the viewer: the stage invalidation pipeline, the
//! geometry it works in, and logger setup for binaries.

pub mod coords;
pub mod logging;
pub mod pipeline;
