use std::fmt;

/// One phase of the view recomputation pipeline.
///
/// Variants are totally ordered by pipeline position. A later stage consumes
/// the results of earlier ones, which is what lets the queue drop a request
/// when an earlier-or-equal stage is already waiting right behind it.
///
/// "Nothing processed yet" is `Option::<Stage>::None`, which orders before
/// every variant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Commit the surface's pending size.
    ContextSize = 1,
    /// Recompute the content bounds box and the scale that fits it.
    ComputeViewBox = 2,
    /// Refresh the view location against the current bounds box.
    ContextLocation = 3,
    ComputeScale = 4,
    /// Recompute the visible content-space rectangle.
    ComputeViewport = 5,
    RenderCanvas = 6,
}

impl Stage {
    /// Every stage in pipeline order.
    pub const ALL: [Stage; 6] = [
        Stage::ContextSize,
        Stage::ComputeViewBox,
        Stage::ContextLocation,
        Stage::ComputeScale,
        Stage::ComputeViewport,
        Stage::RenderCanvas,
    ];

    /// The stage whose inputs this stage produces.
    pub const fn successor(self) -> Option<Stage> {
        match self {
            Stage::ContextSize => Some(Stage::ComputeViewBox),
            Stage::ComputeViewBox => Some(Stage::ContextLocation),
            Stage::ContextLocation => Some(Stage::ComputeScale),
            Stage::ComputeScale => Some(Stage::ComputeViewport),
            Stage::ComputeViewport => Some(Stage::RenderCanvas),
            Stage::RenderCanvas => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Stage::ContextSize => "context-size",
            Stage::ComputeViewBox => "compute-view-box",
            Stage::ContextLocation => "context-location",
            Stage::ComputeScale => "compute-scale",
            Stage::ComputeViewport => "compute-viewport",
            Stage::RenderCanvas => "render-canvas",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_sorted_by_pipeline_position() {
        let mut sorted = Stage::ALL;
        sorted.sort();
        assert_eq!(sorted, Stage::ALL);
    }

    #[test]
    fn indices_match_pipeline_table() {
        let indices: Vec<u8> = Stage::ALL.iter().map(|&s| s as u8).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn nothing_processed_orders_first() {
        assert!(None < Some(Stage::ContextSize));
    }

    #[test]
    fn successors_walk_the_pipeline() {
        let chain: Vec<Stage> =
            std::iter::successors(Some(Stage::ContextSize), |s| s.successor()).collect();
        assert_eq!(chain, Stage::ALL.to_vec());
    }

    #[test]
    fn display_uses_kebab_names() {
        assert_eq!(Stage::ComputeViewBox.to_string(), "compute-view-box");
        assert_eq!(format!("{}", Stage::RenderCanvas), "render-canvas");
    }
}
