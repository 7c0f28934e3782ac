use serde::{Deserialize, Serialize};

/// Version string stamped on every planned world specification.
pub const WORLDSPEC_VERSION: &str = "0.1";

/// A declarative description of a world to build.
///
/// Produced by the planner and never mutated afterwards. The compiler does
/// not consume this type directly: it accepts any JSON document that passes
/// the world-specification schema, so hand-written specs with partial or
/// malformed transforms still compile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSpec {
    pub worldspec_version: String,
    pub template_id: String,
    pub seed: u64,
    pub stylekit_id: String,
    pub pack_ids: Vec<String>,
    pub placements: Vec<PlacementRequest>,
    pub budgets: Budgets,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Colors>,
}

impl WorldSpec {
    /// Convert to a JSON value, the form consumed by validation and compilation.
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// An instruction to position one asset instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRequest {
    pub asset_id: String,
    pub transform: Transform,
}

/// Position, Euler rotation in degrees, and per-axis scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub pos: [f64; 3],
    pub rot: [f64; 3],
    pub scale: [f64; 3],
}

impl Transform {
    /// A floor-anchored transform at `(x, 0, z)` turned `yaw` degrees about Y.
    pub fn floor(x: f64, z: f64, yaw: f64) -> Self {
        Self {
            pos: [x, 0.0, z],
            rot: [0.0, yaw, 0.0],
            scale: [1.0, 1.0, 1.0],
        }
    }
}

/// Resource budgets for a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budgets {
    pub max_props: u32,
    pub max_texture_tier: u32,
    pub max_lights: u32,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            max_props: 4,
            max_texture_tier: 1,
            max_lights: 2,
        }
    }
}

/// Surface colors resolved from the selected style kit's palette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Colors {
    pub wall: String,
    pub floor: String,
    pub ceiling: String,
    pub accent: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budgets() {
        let budgets = Budgets::default();
        assert_eq!(budgets.max_props, 4);
        assert_eq!(budgets.max_texture_tier, 1);
        assert_eq!(budgets.max_lights, 2);
    }

    #[test]
    fn floor_transform_is_anchored() {
        let t = Transform::floor(1.5, -0.5, 90.0);
        assert_eq!(t.pos, [1.5, 0.0, -0.5]);
        assert_eq!(t.rot, [0.0, 90.0, 0.0]);
        assert_eq!(t.scale, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn colors_omitted_when_absent() {
        let spec = WorldSpec {
            worldspec_version: WORLDSPEC_VERSION.to_string(),
            template_id: "room_basic".to_string(),
            seed: 7,
            stylekit_id: "neutral_daylight".to_string(),
            pack_ids: vec!["core_pack".to_string()],
            placements: Vec::new(),
            budgets: Budgets::default(),
            colors: None,
        };
        let value = spec.to_value().unwrap();
        assert!(value.get("colors").is_none());
        assert_eq!(value["seed"], serde_json::json!(7));
    }
}
