//! Phase-0 compilation: world specification to placeholder geometry.
//!
//! The top-level document is held to the world-specification schema, but
//! individual placement transforms are forgiving: malformed vectors fall
//! back to defaults instead of failing the build.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::canonical;
use crate::core::template::{build_template_geometry, TemplateError};
use crate::core::validate::{FieldError, SchemaError, SchemaSet};
use crate::schema::artifact::{
    CompiledPlacement, CompiledTransform, Constraints, Dimensions, Phase0Artifact,
    PlacementMode, PHASE0,
};

/// Distance kept between a prop's origin and the room walls.
pub const WALL_MARGIN: f64 = 0.25;
pub const UNKNOWN_ASSET: &str = "unknown_asset";
pub const ARTIFACT_FILE_NAME: &str = "phase0.json";

const ZERO: [f64; 3] = [0.0, 0.0, 0.0];
const UNIT: [f64; 3] = [1.0, 1.0, 1.0];

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("world specification failed validation with {} error(s)", .0.len())]
    Invalid(Vec<FieldError>),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    /// The failure as a structured `{path, message}` list.
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            Self::Invalid(errors) => errors.clone(),
            Self::Template(e) => vec![FieldError::new("$.template_id", e.to_string())],
            Self::Io { path, .. } => {
                vec![FieldError::new(path.display().to_string(), self.to_string())]
            }
            Self::Schema(_) | Self::Json(_) => vec![FieldError::new("$", self.to_string())],
        }
    }
}

/// Result of a successful compilation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileOutput {
    pub world_id: String,
    /// Where the artifact was written, if persistence was requested.
    pub phase0_artifact: Option<PathBuf>,
    pub teleportable_surfaces: usize,
    pub phase0_data: Phase0Artifact,
}

pub struct Phase0Compiler<'a> {
    schemas: &'a SchemaSet,
}

impl<'a> Phase0Compiler<'a> {
    pub fn new(schemas: &'a SchemaSet) -> Self {
        Self { schemas }
    }

    /// Compile `worldspec`, optionally writing the artifact to
    /// `<build_root>/<world_id>/phase0.json`.
    ///
    /// Nothing touches the filesystem unless every step before the write
    /// succeeded. Re-running with the same input rewrites identical bytes.
    pub fn compile(
        &self,
        worldspec: &Value,
        build_root: &Path,
        write_artifact: bool,
    ) -> Result<CompileOutput, CompileError> {
        let errors = self.schemas.validate_worldspec(worldspec)?;
        if !errors.is_empty() {
            return Err(CompileError::Invalid(errors));
        }

        let template_id = worldspec
            .get("template_id")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let template = build_template_geometry(template_id)?;

        let raw_placements = worldspec
            .get("placements")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let placements = compile_placements(raw_placements, &template.dimensions);

        let world_id = world_id_for(worldspec)?;
        let teleportable_surfaces = template.teleportable_surfaces();
        let phase0_data = Phase0Artifact {
            phase: PHASE0.to_string(),
            world_id: world_id.clone(),
            worldspec_version: worldspec
                .get("worldspec_version")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            template,
            placements,
            constraints: Constraints::PHASE0,
        };

        let phase0_artifact = if write_artifact {
            Some(write_phase0(build_root, &phase0_data)?)
        } else {
            None
        };

        Ok(CompileOutput {
            world_id,
            phase0_artifact,
            teleportable_surfaces,
            phase0_data,
        })
    }
}

/// `world_` followed by the first 10 hex digits of the SHA-256 of the
/// canonical encoding of `worldspec`.
pub fn world_id_for(worldspec: &Value) -> Result<String, serde_json::Error> {
    let digest = Sha256::digest(canonical::canonical_bytes(worldspec)?);
    let digest_hex = hex::encode(digest);
    Ok(format!("world_{}", &digest_hex[..10]))
}

fn write_phase0(build_root: &Path, artifact: &Phase0Artifact) -> Result<PathBuf, CompileError> {
    let dir = build_root.join(&artifact.world_id);
    let path = dir.join(ARTIFACT_FILE_NAME);
    let body = canonical::pretty_sorted(&serde_json::to_value(artifact)?)?;
    std::fs::create_dir_all(&dir).map_err(|source| CompileError::Io {
        path: dir.clone(),
        source,
    })?;
    std::fs::write(&path, body).map_err(|source| CompileError::Io {
        path: path.clone(),
        source,
    })?;
    tracing::info!(world_id = %artifact.world_id, path = %path.display(), "phase0 artifact written");
    Ok(path)
}

/// Placement ids come from the raw input index, so skipped entries still
/// consume an id.
fn compile_placements(raw: &[Value], dimensions: &Dimensions) -> Vec<CompiledPlacement> {
    raw.iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let entry = entry.as_object()?;
            let transform = entry.get("transform").and_then(Value::as_object);
            let field = |name: &str| transform.and_then(|t| t.get(name));

            let asset_id = match entry.get("asset_id") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => UNKNOWN_ASSET.to_string(),
            };
            let pos = vec3_or(field("pos"), ZERO);
            let rot = vec3_or(field("rot"), ZERO);
            let scale = vec3_or(field("scale"), UNIT);

            Some(CompiledPlacement {
                placement_id: format!("placement_{:03}", index),
                asset_id,
                mode: PlacementMode::Placeholder,
                transform: CompiledTransform {
                    pos: clamp_floor_position(pos, dimensions),
                    rot: rot.map(round3),
                    scale: scale.map(round3),
                },
            })
        })
        .collect()
}

/// A 3-element numeric array, or `default` for anything else.
fn vec3_or(value: Option<&Value>, default: [f64; 3]) -> [f64; 3] {
    let Some(items) = value.and_then(Value::as_array) else {
        return default;
    };
    if items.len() != 3 {
        return default;
    }
    let mut out = [0.0; 3];
    for (slot, item) in out.iter_mut().zip(items) {
        match item.as_f64() {
            Some(v) => *slot = v,
            None => return default,
        }
    }
    out
}

/// Keep the origin `WALL_MARGIN` inside the walls and drop it to the floor.
fn clamp_floor_position(pos: [f64; 3], dimensions: &Dimensions) -> [f64; 3] {
    let max_x = (dimensions.width / 2.0 - WALL_MARGIN).max(0.0);
    let max_z = (dimensions.length / 2.0 - WALL_MARGIN).max(0.0);
    [
        round3(pos[0].clamp(-max_x, max_x)),
        0.0,
        round3(pos[2].clamp(-max_z, max_z)),
    ]
}

fn round3(v: f64) -> f64 {
    canonical::round_decimal(v, 3)
}
