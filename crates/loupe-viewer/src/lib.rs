//! Loupe viewer — a pan/zoom image surface on top of `loupe-engine`.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use loupe_engine::pipeline::ManualScheduler;
//! use loupe_viewer::{ImageViewer, Layer, LayerId, ViewerConfig};
//!
//! let scheduler = Rc::new(ManualScheduler::new());
//! let mut view = ImageViewer::managed(ViewerConfig::default(), scheduler.clone());
//! view.surface_mut().resize(800.0, 600.0);
//! view.surface_mut().push_layer(Layer::image(LayerId(0), 4000, 3000))?;
//!
//! // When the scheduler fires:
//! view.drain()?;
//! let visible = view.state().viewport;
//! ```

pub mod config;
pub mod error;
pub mod layer;
pub mod minimap;
pub mod viewer;

pub use config::ViewerConfig;
pub use error::ViewerError;
pub use layer::{Layer, LayerId};
pub use minimap::{Minimap, MinimapLayout};
pub use viewer::ImageViewer;
