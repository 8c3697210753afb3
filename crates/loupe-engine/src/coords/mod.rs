//! Geometry shared by the view pipeline and its surfaces.
//!
//! Two spaces are in play:
//! - screen space: pixels of the owning surface, origin top-left, +Y down
//! - content space: units of the layers being viewed (image pixels)
//!
//! `scale` converts content units to screen pixels.

mod rect;
mod vec2;

pub use rect::Rect;
pub use vec2::Vec2;
