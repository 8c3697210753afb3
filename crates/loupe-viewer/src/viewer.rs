use std::rc::Rc;

use anyhow::Result;

use loupe_engine::coords::{Rect, Vec2};
use loupe_engine::pipeline::{
    BoundsBox, CoalescingQueue, QueueConfig, Scheduler, Stage, ViewManager, ViewState, ViewSurface,
};

use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::layer::{union_bounds, Layer, LayerId};

/// Pan/zoom viewer over a stack of content-space layers.
///
/// Interaction methods never recompute anything themselves: they record the
/// request and mark the relevant [`Stage`] dirty. The values become visible
/// in the manager's [`ViewState`] after the next drain pass.
///
/// The view location is kept as the content point shown at the center of the
/// surface; `None` means "center of the bounds box" until the user pans or
/// zooms around an anchor.
pub struct ImageViewer {
    config: ViewerConfig,
    queue: CoalescingQueue<Stage>,
    layers: Vec<Layer>,

    /// Size reported by the host, committed on the next context-size stage.
    requested_size: Vec2,
    size: Vec2,

    /// Zoom relative to the fit scale.
    zoom: f32,
    center: Option<Vec2>,

    // Last values seen from the pipeline.
    view_box: Rect,
    fit_scale: f32,

    render_generation: u64,
}

impl ImageViewer {
    /// `queue` must be the queue the owning [`ViewManager`] drains.
    pub fn new(config: ViewerConfig, queue: CoalescingQueue<Stage>) -> Self {
        Self {
            config,
            queue,
            layers: Vec::new(),
            requested_size: Vec2::default(),
            size: Vec2::default(),
            zoom: 1.0,
            center: None,
            view_box: Rect::default(),
            fit_scale: 1.0,
            render_generation: 0,
        }
    }

    /// Builds a viewer together with the manager that drains its queue, with
    /// a full recompute already requested.
    pub fn managed(config: ViewerConfig, scheduler: Rc<dyn Scheduler>) -> ViewManager<ImageViewer> {
        let queue = CoalescingQueue::new(
            QueueConfig::default().priority(config.priority).label("image-viewer"),
            scheduler,
        );
        let manager = ViewManager::new(queue.clone(), ImageViewer::new(config, queue));
        manager.invalidate_all();
        manager
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Committed surface size in screen pixels.
    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Effective scale including zoom requests not yet drained.
    ///
    /// Gestures arriving between passes compose with this value, so several
    /// wheel ticks or a zoom followed by a pan in one frame all apply.
    pub fn scale(&self) -> f32 {
        self.config.clamp_scale(self.fit_scale * self.zoom)
    }

    /// Content point shown at the center of the surface.
    pub fn center(&self) -> Vec2 {
        self.center.unwrap_or_else(|| self.view_box.center())
    }

    /// Bumped by every render-canvas stage; hosts repaint when it moves.
    pub fn render_generation(&self) -> u64 {
        self.render_generation
    }

    pub fn screen_to_content(&self, p: Vec2) -> Vec2 {
        self.center() + (p - self.size * 0.5) / self.scale()
    }

    pub fn content_to_screen(&self, p: Vec2) -> Vec2 {
        (p - self.center()) * self.scale() + self.size * 0.5
    }

    // ── host input ────────────────────────────────────────────────────────

    /// Records a new surface size in screen pixels.
    pub fn resize(&mut self, width: f32, height: f32) {
        let size = Vec2::new(width.max(0.0), height.max(0.0));
        if size != self.requested_size {
            self.requested_size = size;
            self.queue.enqueue(Stage::ContextSize);
        }
    }

    pub fn set_layers(&mut self, layers: Vec<Layer>) -> Result<(), ViewerError> {
        for (i, layer) in layers.iter().enumerate() {
            if layers[..i].iter().any(|l| l.id() == layer.id()) {
                return Err(ViewerError::DuplicateLayer(layer.id()));
            }
        }
        self.layers = layers;
        self.queue.enqueue(Stage::ComputeViewBox);
        Ok(())
    }

    pub fn push_layer(&mut self, layer: Layer) -> Result<(), ViewerError> {
        if self.layers.iter().any(|l| l.id() == layer.id()) {
            return Err(ViewerError::DuplicateLayer(layer.id()));
        }
        self.layers.push(layer);
        self.queue.enqueue(Stage::ComputeViewBox);
        Ok(())
    }

    pub fn remove_layer(&mut self, id: LayerId) -> Result<Layer, ViewerError> {
        let index = self
            .layers
            .iter()
            .position(|l| l.id() == id)
            .ok_or(ViewerError::UnknownLayer(id))?;
        let layer = self.layers.remove(index);
        self.queue.enqueue(Stage::ComputeViewBox);
        Ok(layer)
    }

    pub fn clear_layers(&mut self) {
        if !self.layers.is_empty() {
            self.layers.clear();
            self.queue.enqueue(Stage::ComputeViewBox);
        }
    }

    // ── navigation ────────────────────────────────────────────────────────

    /// Multiplies the scale by `factor`, keeping the content under the screen
    /// point `anchor` in place.
    pub fn zoom_at(&mut self, factor: f32, anchor: Vec2) -> Result<(), ViewerError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ViewerError::InvalidZoom(factor));
        }

        let old_scale = self.scale();
        let new_scale = self.config.clamp_scale(old_scale * factor);
        if new_scale == old_scale {
            return Ok(());
        }

        let pinned = self.screen_to_content(anchor);
        self.center = Some(pinned + (self.center() - pinned) * (old_scale / new_scale));
        self.zoom = new_scale / self.fit_scale;

        // Location chains into scale.
        self.queue.enqueue(Stage::ContextLocation);
        Ok(())
    }

    /// One zoom step in (`steps > 0`) or out around the surface center.
    pub fn zoom_steps(&mut self, steps: f32) -> Result<(), ViewerError> {
        let factor = self.config.zoom_step.powf(steps);
        self.zoom_at(factor, self.size * 0.5)
    }

    /// Sets the zoom relative to the fit scale (1.0 = fit).
    pub fn set_zoom(&mut self, zoom: f32) -> Result<(), ViewerError> {
        if !zoom.is_finite() || zoom <= 0.0 {
            return Err(ViewerError::InvalidZoom(zoom));
        }
        self.zoom = zoom;
        self.queue.enqueue(Stage::ComputeScale);
        Ok(())
    }

    /// Drags the content by `delta` screen pixels.
    pub fn pan_by(&mut self, delta: Vec2) {
        if delta == Vec2::default() {
            return;
        }
        self.center = Some(self.center() - delta / self.scale());
        self.queue.enqueue(Stage::ContextLocation);
    }

    /// Centers the view on a content-space point.
    pub fn navigate_to(&mut self, content: Vec2) {
        self.center = Some(content);
        self.queue.enqueue(Stage::ContextLocation);
    }

    /// Back to a centered fit.
    pub fn reset_view(&mut self) {
        self.zoom = 1.0;
        self.center = None;
        self.queue.enqueue(Stage::ContextLocation);
    }

    fn fit_scale_for(&self, bounds: Rect) -> f32 {
        let pad = self.config.fit_padding.max(0.0) * 2.0;
        let avail = Vec2::new(self.size.x - pad, self.size.y - pad);
        if bounds.is_empty() || avail.x <= 0.0 || avail.y <= 0.0 {
            return 1.0;
        }
        (avail / bounds.size).min_element()
    }
}

impl ViewSurface for ImageViewer {
    fn refresh_size(&mut self) -> Result<()> {
        if self.size != self.requested_size {
            log::trace!("surface size {:?} -> {:?}", self.size, self.requested_size);
            self.size = self.requested_size;
        }
        Ok(())
    }

    fn compute_bounds_box(&mut self, _state: &ViewState) -> Result<BoundsBox> {
        let rect = union_bounds(&self.layers);
        Ok(BoundsBox { rect, fit_scale: self.fit_scale_for(rect) })
    }

    fn refresh_offset(&mut self, state: &ViewState) -> Result<()> {
        self.view_box = state.view_box;
        if let Some(center) = self.center {
            self.center = Some(center.clamp(state.view_box.origin, state.view_box.max()));
        }
        Ok(())
    }

    fn compute_scale(&mut self, state: &ViewState) -> Result<f32> {
        self.fit_scale = state.fit_scale;
        Ok(self.scale())
    }

    fn compute_viewport(&mut self, state: &ViewState) -> Result<Rect> {
        Ok(Rect::from_center_size(self.center(), self.size / state.scale))
    }

    fn invalidate_render_surfaces(&mut self) -> Result<()> {
        self.render_generation = self.render_generation.wrapping_add(1);
        Ok(())
    }
}
