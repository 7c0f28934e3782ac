use serde::{Deserialize, Serialize};

/// Value of the `phase` field on every phase-0 artifact.
pub const PHASE0: &str = "phase0";

/// Room extents in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub length: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Plane,
    Box,
}

/// One static surface of a template: floor, ceiling, or wall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    /// Two extents for planes, three for boxes.
    pub size: Vec<f64>,
    pub position: [f64; 3],
    pub rotation: [f64; 3],
    pub collider: bool,
    pub teleportable: bool,
}

/// Static geometry resolved from a template id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateGeometry {
    pub template_id: String,
    pub dimensions: Dimensions,
    pub nodes: Vec<Node>,
}

impl TemplateGeometry {
    /// Number of nodes a player may teleport onto.
    pub fn teleportable_surfaces(&self) -> usize {
        self.nodes.iter().filter(|n| n.teleportable).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementMode {
    Placeholder,
}

/// Clamped and rounded transform of a compiled placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompiledTransform {
    pub pos: [f64; 3],
    pub rot: [f64; 3],
    pub scale: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledPlacement {
    /// Positional id (`placement_000`, `placement_001`, ...), not derived
    /// from the asset.
    pub placement_id: String,
    pub asset_id: String,
    pub mode: PlacementMode,
    pub transform: CompiledTransform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    pub floor_anchored_only: bool,
    pub stacking_enabled: bool,
}

impl Constraints {
    /// Phase 0 only places props on the floor and never stacks them.
    pub const PHASE0: Constraints = Constraints {
        floor_anchored_only: true,
        stacking_enabled: false,
    };
}

/// The compiled, geometry-resolved output of phase 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase0Artifact {
    pub phase: String,
    pub world_id: String,
    pub worldspec_version: String,
    pub template: TemplateGeometry,
    pub placements: Vec<CompiledPlacement>,
    pub constraints: Constraints,
}
