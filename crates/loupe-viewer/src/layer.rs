use std::fmt;

use loupe_engine::coords::Rect;

use crate::error::ViewerError;

/// Stable identifier of a layer within one viewer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u32);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something placed on the viewer's canvas, in content coordinates.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Layer {
    id: LayerId,
    bounds: Rect,
}

impl Layer {
    pub fn new(id: LayerId, bounds: Rect) -> Result<Self, ViewerError> {
        if !bounds.is_finite() || bounds.size.x < 0.0 || bounds.size.y < 0.0 {
            return Err(ViewerError::InvalidBounds { id, bounds });
        }
        Ok(Self { id, bounds })
    }

    /// A `width × height` image anchored at the content origin.
    pub fn image(id: LayerId, width: u32, height: u32) -> Self {
        Self {
            id,
            bounds: Rect::new(0.0, 0.0, width as f32, height as f32),
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }
}

/// Union of all layer bounds; the default rect when there are none.
pub(crate) fn union_bounds(layers: &[Layer]) -> Rect {
    layers
        .iter()
        .map(Layer::bounds)
        .reduce(Rect::union)
        .unwrap_or_default()
}
