//! Configuration surface for routing and layout.
//!
//! All knobs have working defaults; hosts override globally through
//! [`RoutingConfig`]/[`LayoutConfig`] and per edge through
//! [`RoutingOverrides`]. Invalid values (negative radius or separation) are
//! treated as zero/disabled at the point of use rather than rejected.
use derive_builder::Builder;

/// Knobs consumed by the single-edge router, the overlap separator and the
/// path renderer.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(default)]
pub struct RoutingConfig {
    /// Obstacle inflation in px.
    pub padding: f64,
    /// Mandatory straight-out length from the source port.
    pub source_stub_length: f64,
    /// Mandatory straight-out length into the target port.
    pub target_stub_length: f64,
    /// Additive cost per direction change during pathfinding.
    pub bend_penalty: f64,
    /// Per-unit cost added to horizontal segments below the source port.
    /// Applied by the orchestrator to labelled edges only, so their first
    /// bend lands near the source where the label is drawn.
    pub early_bend_bias: f64,
    /// Perpendicular offset between overlapping parallel edges.
    pub edge_separation: f64,
    /// Maximum radius of the rounded-corner arc at each bend.
    pub bend_radius: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            padding: 20.0,
            source_stub_length: 20.0,
            target_stub_length: 20.0,
            bend_penalty: 1.0,
            early_bend_bias: 0.1,
            edge_separation: 5.0,
            bend_radius: 8.0,
        }
    }
}

/// Per-edge overrides carried on an edge record. Unset fields fall through
/// to the batch-wide configuration.
#[derive(Debug, Clone, Default, PartialEq, Builder)]
#[builder(default)]
pub struct RoutingOverrides {
    pub padding: Option<f64>,
    pub source_stub_length: Option<f64>,
    pub target_stub_length: Option<f64>,
    pub bend_penalty: Option<f64>,
    pub early_bend_bias: Option<f64>,
    pub edge_separation: Option<f64>,
    pub bend_radius: Option<f64>,
}

impl RoutingOverrides {
    /// Resolves defaults ← `base` ← `self` into a concrete configuration.
    pub fn merged(&self, base: &RoutingConfig) -> RoutingConfig {
        RoutingConfig {
            padding: self.padding.unwrap_or(base.padding),
            source_stub_length: self.source_stub_length.unwrap_or(base.source_stub_length),
            target_stub_length: self.target_stub_length.unwrap_or(base.target_stub_length),
            bend_penalty: self.bend_penalty.unwrap_or(base.bend_penalty),
            early_bend_bias: self.early_bend_bias.unwrap_or(base.early_bend_bias),
            edge_separation: self.edge_separation.unwrap_or(base.edge_separation),
            bend_radius: self.bend_radius.unwrap_or(base.bend_radius),
        }
    }
}

/// Knobs consumed by the layered layout engine.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(default)]
pub struct LayoutConfig {
    /// Spacing between neighboring nodes within one rank.
    pub horizontal_gap: f64,
    /// Spacing between consecutive ranks.
    pub vertical_gap: f64,
    /// Reduced rank spacing applied between rank pairs whose connecting
    /// edges carry no labels. `None` disables compaction.
    pub compact_gap: Option<f64>,
    /// Fallback node width when the host has not measured the node.
    pub node_width: f64,
    /// Fallback node height when the host has not measured the node.
    pub node_height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            horizontal_gap: 40.0,
            vertical_gap: 60.0,
            compact_gap: None,
            node_width: 150.0,
            node_height: 60.0,
        }
    }
}
