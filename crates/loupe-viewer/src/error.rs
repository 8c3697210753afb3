use std::fmt;

use loupe_engine::coords::Rect;

use crate::layer::LayerId;

/// Rejected viewer input.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerError {
    /// Layer bounds are not finite or have a negative extent.
    InvalidBounds { id: LayerId, bounds: Rect },
    DuplicateLayer(LayerId),
    UnknownLayer(LayerId),
    /// Zoom factors must be finite and positive.
    InvalidZoom(f32),
}

impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerError::InvalidBounds { id, bounds } => {
                write!(f, "layer {id} has invalid bounds {bounds:?}")
            }
            ViewerError::DuplicateLayer(id) => write!(f, "layer {id} already exists"),
            ViewerError::UnknownLayer(id) => write!(f, "no layer {id}"),
            ViewerError::InvalidZoom(z) => write!(f, "invalid zoom factor {z}"),
        }
    }
}

impl std::error::Error for ViewerError {}
