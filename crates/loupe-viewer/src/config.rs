use loupe_engine::pipeline::DispatchPriority;

/// Viewer configuration.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Lower bound for the effective content-to-screen scale.
    pub min_scale: f32,
    /// Upper bound for the effective content-to-screen scale.
    pub max_scale: f32,
    /// Multiplier applied per zoom-in step (its inverse per zoom-out step).
    pub zoom_step: f32,
    /// Screen pixels kept clear on every side when fitting content.
    pub fit_padding: f32,
    /// Priority the viewer's drain requests are scheduled at.
    pub priority: DispatchPriority,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.01,
            max_scale: 64.0,
            zoom_step: 1.25,
            fit_padding: 0.0,
            priority: DispatchPriority::Render,
        }
    }
}

impl ViewerConfig {
    /// Bounds for the effective scale; given in either order.
    pub fn scale_range(mut self, a: f32, b: f32) -> Self {
        self.min_scale = a.min(b);
        self.max_scale = a.max(b);
        self
    }

    pub fn zoom_step(mut self, step: f32) -> Self {
        self.zoom_step = step;
        self
    }

    pub fn fit_padding(mut self, padding: f32) -> Self {
        self.fit_padding = padding;
        self
    }

    pub fn priority(mut self, priority: DispatchPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Clamps into the scale range. Inverted fields set directly are treated
    /// as the same range.
    pub(crate) fn clamp_scale(&self, scale: f32) -> f32 {
        let lo = self.min_scale.min(self.max_scale);
        let hi = self.min_scale.max(self.max_scale);
        scale.max(lo).min(hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_range_accepts_either_order() {
        let c = ViewerConfig::default().scale_range(4.0, 0.5);
        assert_eq!((c.min_scale, c.max_scale), (0.5, 4.0));
        assert_eq!(c.clamp_scale(1.0), 1.0);
        assert_eq!(c.clamp_scale(0.1), 0.5);
        assert_eq!(c.clamp_scale(9.0), 4.0);
    }

    #[test]
    fn inverted_fields_still_clamp_into_range() {
        let c = ViewerConfig {
            min_scale: 8.0,
            max_scale: 2.0,
            ..ViewerConfig::default()
        };
        assert_eq!(c.clamp_scale(4.0), 4.0);
        assert_eq!(c.clamp_scale(1.0), 2.0);
    }
}
