//! Debug rendering modes for visualization and profiling.
//!
//! Provides heatmaps of traversal cost and octree depth as alternatives to
//! the shaded image.

/// Debug visualization mode for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebugMode {
    /// Normal rendering (default).
    #[default]
    None,
    /// Heatmap showing computational cost per pixel (traversal steps).
    TraversalSteps,
    /// Heatmap showing octree depth reached.
    NodeDepth,
    /// Heatmap showing distance from camera.
    Distance,
    /// Surface normals as RGB.
    Normals,
}

impl DebugMode {
    /// All modes in cycling order.
    pub const ALL: [Self; 5] = [
        Self::None,
        Self::TraversalSteps,
        Self::NodeDepth,
        Self::Distance,
        Self::Normals,
    ];

    /// Cycle to the next debug mode.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::None => Self::TraversalSteps,
            Self::TraversalSteps => Self::NodeDepth,
            Self::NodeDepth => Self::Distance,
            Self::Distance => Self::Normals,
            Self::Normals => Self::None,
        }
    }

    /// CLI name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::TraversalSteps => "steps",
            Self::NodeDepth => "depth",
            Self::Distance => "distance",
            Self::Normals => "normals",
        }
    }

    /// Parse a CLI name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.name() == name)
    }
}
