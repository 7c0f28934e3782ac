//! Built-in template geometry.

use thiserror::Error;

use crate::schema::artifact::{Dimensions, Node, NodeKind, TemplateGeometry};

/// The only template currently supported.
pub const ROOM_BASIC: &str = "room_basic";

const WALL_THICKNESS: f64 = 0.2;

const ROOM_BASIC_DIMENSIONS: Dimensions = Dimensions {
    width: 8.0,
    length: 8.0,
    height: 3.0,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unsupported template_id '{0}'")]
    UnsupportedTemplate(String),
}

/// Optional replacements for the default room extents. Values that are not
/// positive finite numbers are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DimensionOverrides {
    pub width: Option<f64>,
    pub length: Option<f64>,
    pub height: Option<f64>,
}

/// Resolve a template id to its static geometry.
pub fn build_template_geometry(template_id: &str) -> Result<TemplateGeometry, TemplateError> {
    match template_id {
        ROOM_BASIC => Ok(build_room_basic(None)),
        other => Err(TemplateError::UnsupportedTemplate(other.to_string())),
    }
}

/// An axis-aligned room: floor, ceiling and four walls around the origin.
/// Only the floor is teleportable.
pub fn build_room_basic(overrides: Option<&DimensionOverrides>) -> TemplateGeometry {
    let mut dims = ROOM_BASIC_DIMENSIONS;
    if let Some(o) = overrides {
        let usable = |v: Option<f64>| v.filter(|v| v.is_finite() && *v > 0.0);
        if let Some(w) = usable(o.width) {
            dims.width = w;
        }
        if let Some(l) = usable(o.length) {
            dims.length = l;
        }
        if let Some(h) = usable(o.height) {
            dims.height = h;
        }
    }

    let half_width = dims.width / 2.0;
    let half_length = dims.length / 2.0;
    let half_height = dims.height / 2.0;

    let surface = |id: &str,
                   kind: NodeKind,
                   size: Vec<f64>,
                   position: [f64; 3],
                   rotation: [f64; 3],
                   teleportable: bool| Node {
        id: id.to_string(),
        kind,
        size,
        position,
        rotation,
        collider: true,
        teleportable,
    };

    let nodes = vec![
        surface(
            "floor",
            NodeKind::Plane,
            vec![dims.width, dims.length],
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            true,
        ),
        surface(
            "ceiling",
            NodeKind::Plane,
            vec![dims.width, dims.length],
            [0.0, dims.height, 0.0],
            [180.0, 0.0, 0.0],
            false,
        ),
        surface(
            "wall_north",
            NodeKind::Box,
            vec![dims.width, dims.height, WALL_THICKNESS],
            [0.0, half_height, -half_length],
            [0.0, 0.0, 0.0],
            false,
        ),
        surface(
            "wall_south",
            NodeKind::Box,
            vec![dims.width, dims.height, WALL_THICKNESS],
            [0.0, half_height, half_length],
            [0.0, 0.0, 0.0],
            false,
        ),
        surface(
            "wall_east",
            NodeKind::Box,
            vec![WALL_THICKNESS, dims.height, dims.length],
            [half_width, half_height, 0.0],
            [0.0, 0.0, 0.0],
            false,
        ),
        surface(
            "wall_west",
            NodeKind::Box,
            vec![WALL_THICKNESS, dims.height, dims.length],
            [-half_width, half_height, 0.0],
            [0.0, 0.0, 0.0],
            false,
        ),
    ];

    TemplateGeometry {
        template_id: ROOM_BASIC.to_string(),
        dimensions: dims,
        nodes,
    }
}
