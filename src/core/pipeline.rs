//! The application context: schemas plus both registries, wired to the
//! planner and the phase-0 compiler.

use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::compiler::{CompileError, CompileOutput, Phase0Compiler};
use crate::core::planner::{PlanError, Planner, Preferences};
use crate::core::registry::{PackRegistry, StyleKitRegistry};
use crate::core::validate::{FieldError, SchemaError, SchemaSet};
use crate::schema::worldspec::WorldSpec;

pub const DEFAULT_PACKS_DIR: &str = "packs";
pub const DEFAULT_STYLEKITS_DIR: &str = "stylekits";
pub const DEFAULT_BUILD_ROOT: &str = "build";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("planning failed: {0}")]
    Plan(#[from] PlanError),
    #[error("compilation failed: {0}")]
    Compile(#[from] CompileError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// The failure as a structured `{path, message}` list.
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            Self::Plan(e) => e.field_errors(),
            Self::Compile(e) => e.field_errors(),
            Self::Schema(_) | Self::Json(_) => vec![FieldError::new("$", self.to_string())],
        }
    }
}

/// Loaded schemas and registries, read-only once built.
///
/// Built via `WorldPipeline::builder()`. Planning and compilation borrow
/// from it, so one pipeline can serve any number of calls, including from
/// several threads at once.
#[derive(Debug)]
pub struct WorldPipeline {
    schemas: SchemaSet,
    packs: PackRegistry,
    stylekits: StyleKitRegistry,
    build_root: PathBuf,
}

/// Builder for constructing a `WorldPipeline`.
pub struct WorldPipelineBuilder {
    packs_dir: PathBuf,
    stylekits_dir: PathBuf,
    build_root: PathBuf,
    schemas: Option<SchemaSet>,
    /// Directly provided registries (for testing without files).
    packs: Option<PackRegistry>,
    stylekits: Option<StyleKitRegistry>,
}

impl WorldPipeline {
    pub fn builder() -> WorldPipelineBuilder {
        WorldPipelineBuilder {
            packs_dir: PathBuf::from(DEFAULT_PACKS_DIR),
            stylekits_dir: PathBuf::from(DEFAULT_STYLEKITS_DIR),
            build_root: PathBuf::from(DEFAULT_BUILD_ROOT),
            schemas: None,
            packs: None,
            stylekits: None,
        }
    }

    pub fn schemas(&self) -> &SchemaSet {
        &self.schemas
    }

    pub fn packs(&self) -> &PackRegistry {
        &self.packs
    }

    pub fn stylekits(&self) -> &StyleKitRegistry {
        &self.stylekits
    }

    pub fn build_root(&self) -> &Path {
        &self.build_root
    }

    pub fn planner(&self) -> Planner<'_> {
        Planner::new(&self.packs, &self.stylekits, &self.schemas)
    }

    pub fn compiler(&self) -> Phase0Compiler<'_> {
        Phase0Compiler::new(&self.schemas)
    }

    pub fn plan(
        &self,
        prompt: &str,
        seed: Option<u64>,
        preferences: Option<&Preferences>,
    ) -> Result<WorldSpec, PlanError> {
        self.planner().plan(prompt, seed, preferences)
    }

    /// Compile into the configured build root.
    pub fn compile(
        &self,
        worldspec: &Value,
        write_artifact: bool,
    ) -> Result<CompileOutput, CompileError> {
        self.compiler()
            .compile(worldspec, &self.build_root, write_artifact)
    }

    /// Validate a world specification; an empty list means valid.
    pub fn validate(&self, worldspec: &Value) -> Result<Vec<FieldError>, SchemaError> {
        self.schemas.validate_worldspec(worldspec)
    }

    /// Plan a world and compile it in one step.
    pub fn plan_and_compile(
        &self,
        prompt: &str,
        seed: Option<u64>,
        preferences: Option<&Preferences>,
        write_artifact: bool,
    ) -> Result<(WorldSpec, CompileOutput), PipelineError> {
        let worldspec = self.plan(prompt, seed, preferences)?;
        let output = self.compile(&worldspec.to_value()?, write_artifact)?;
        Ok((worldspec, output))
    }
}

impl WorldPipelineBuilder {
    pub fn packs_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.packs_dir = path.into();
        self
    }

    pub fn stylekits_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.stylekits_dir = path.into();
        self
    }

    pub fn build_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.build_root = path.into();
        self
    }

    /// Use these schemas instead of the built-in ones.
    pub fn schemas(mut self, schemas: SchemaSet) -> Self {
        self.schemas = Some(schemas);
        self
    }

    /// Provide a pack registry directly (for testing without files).
    pub fn with_pack_registry(mut self, packs: PackRegistry) -> Self {
        self.packs = Some(packs);
        self
    }

    /// Provide a style-kit registry directly (for testing without files).
    pub fn with_stylekit_registry(mut self, stylekits: StyleKitRegistry) -> Self {
        self.stylekits = Some(stylekits);
        self
    }

    pub fn build(self) -> Result<WorldPipeline, PipelineError> {
        let schemas = match self.schemas {
            Some(schemas) => schemas,
            None => SchemaSet::builtin()?,
        };

        let packs = match self.packs {
            Some(packs) => packs,
            None => PackRegistry::load(&self.packs_dir, &schemas)?,
        };
        let stylekits = match self.stylekits {
            Some(stylekits) => stylekits,
            None => StyleKitRegistry::load(&self.stylekits_dir, &schemas)?,
        };

        for error in packs.errors().iter().chain(stylekits.errors()) {
            tracing::warn!(path = %error.path, "{}", error.message);
        }

        Ok(WorldPipeline {
            schemas,
            packs,
            stylekits,
            build_root: self.build_root,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::manifest::{AssetEntry, PackManifest, StyleKitManifest};

    fn injected() -> WorldPipeline {
        let mut packs = PackRegistry::new();
        packs.register(PackManifest {
            pack_id: "solo_pack".to_string(),
            name: None,
            version: None,
            tags: Vec::new(),
            assets: vec![AssetEntry {
                asset_id: "solo_crate_01".to_string(),
                label: "Crate".to_string(),
                tags: vec!["crate".to_string()],
            }],
            manifest_path: PathBuf::new(),
        });
        let mut stylekits = StyleKitRegistry::new();
        stylekits.register(StyleKitManifest {
            stylekit_id: "plain".to_string(),
            name: None,
            tags: Vec::new(),
            lighting: Default::default(),
            palette: Default::default(),
            manifest_path: PathBuf::new(),
        });
        WorldPipeline::builder()
            .with_pack_registry(packs)
            .with_stylekit_registry(stylekits)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_defaults() {
        let builder = WorldPipeline::builder();
        assert_eq!(builder.packs_dir, PathBuf::from("packs"));
        assert_eq!(builder.stylekits_dir, PathBuf::from("stylekits"));
        assert_eq!(builder.build_root, PathBuf::from("build"));
    }

    #[test]
    fn injected_registries_plan_without_files() {
        let pipeline = injected();
        let spec = pipeline.plan("a crate", Some(3), None).unwrap();
        assert_eq!(spec.pack_ids, ["solo_pack"]);
        assert_eq!(spec.stylekit_id, "plain");
        assert_eq!(spec.placements.len(), 1);
        assert_eq!(spec.placements[0].asset_id, "solo_crate_01");
    }

    #[test]
    fn plan_and_compile_without_write() {
        let pipeline = injected();
        let (spec, output) = pipeline
            .plan_and_compile("a crate", Some(3), None, false)
            .unwrap();
        assert!(output.phase0_artifact.is_none());
        assert_eq!(output.phase0_data.placements.len(), spec.placements.len());
        assert_eq!(
            output.world_id,
            crate::core::compiler::world_id_for(&spec.to_value().unwrap()).unwrap()
        );
    }
}
