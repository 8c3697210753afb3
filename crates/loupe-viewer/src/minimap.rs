use loupe_engine::coords::{Rect, Vec2};
use loupe_engine::pipeline::ViewState;

/// Overview thumbnail pinned to the bottom-right corner of the surface.
#[derive(Debug, Clone)]
pub struct Minimap {
    /// Longest edge of the minimap frame in screen pixels.
    pub extent: f32,
    /// Gap between the frame and the surface edges.
    pub margin: f32,
    pub visible: bool,
}

impl Default for Minimap {
    fn default() -> Self {
        Self {
            extent: 180.0,
            margin: 12.0,
            visible: true,
        }
    }
}

impl Minimap {
    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    /// Frame rectangle for a surface of `surface` pixels.
    ///
    /// The frame shrinks on small surfaces so it never covers more than 40%
    /// of the shorter edge.
    pub fn frame(&self, surface: Vec2) -> Rect {
        let extent = self.extent.min(surface.min_element() * 0.4).max(0.0);
        let origin = surface - Vec2::splat(extent + self.margin);
        Rect::from_origin_size(origin, Vec2::splat(extent))
    }

    pub fn layout(&self, surface: Vec2, state: &ViewState) -> Option<MinimapLayout> {
        if !self.visible {
            return None;
        }
        MinimapLayout::compute(state.view_box, state.viewport, self.frame(surface))
    }
}

/// Resolved minimap geometry for one frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MinimapLayout {
    /// Where the whole view box is drawn, aspect-preserved inside the frame.
    pub thumbnail: Rect,
    /// Visible region inside `thumbnail`; `None` when the view is off-content.
    pub indicator: Option<Rect>,
    view_box: Rect,
    scale: f32,
}

impl MinimapLayout {
    pub fn compute(view_box: Rect, viewport: Rect, frame: Rect) -> Option<Self> {
        if view_box.is_empty() || frame.is_empty() {
            return None;
        }

        let scale = (frame.size / view_box.size).min_element();
        let thumbnail = Rect::from_center_size(frame.center(), view_box.size * scale);
        let indicator = Rect::from_origin_size(
            thumbnail.origin + (viewport.origin - view_box.origin) * scale,
            viewport.size * scale,
        )
        .intersect(thumbnail);

        Some(Self { thumbnail, indicator, view_box, scale })
    }

    /// Content units to minimap pixels.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn contains(&self, p: Vec2) -> bool {
        self.thumbnail.contains(p)
    }

    /// Content point under a screen point inside the thumbnail.
    pub fn to_content(&self, p: Vec2) -> Vec2 {
        self.view_box.origin + (p - self.thumbnail.origin) / self.scale
    }
}
