//! JSON-schema validation with structured `{path, message}` diagnostics.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

const WORLDSPEC_SCHEMA: &str = include_str!("../../schemas/worldspec_v0.schema.json");
const PACK_MANIFEST_SCHEMA: &str = include_str!("../../schemas/pack_manifest_v0.schema.json");
const STYLEKIT_MANIFEST_SCHEMA: &str =
    include_str!("../../schemas/stylekit_manifest_v0.schema.json");

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error in {kind} schema: {source}")]
    Json {
        kind: SchemaKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid {kind} schema: {message}")]
    Invalid { kind: SchemaKind, message: String },
}

/// The three documents this crate validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    WorldSpec,
    PackManifest,
    StyleKitManifest,
}

impl SchemaKind {
    /// File name of the schema inside a schema directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::WorldSpec => "worldspec_v0.schema.json",
            Self::PackManifest => "pack_manifest_v0.schema.json",
            Self::StyleKitManifest => "stylekit_manifest_v0.schema.json",
        }
    }

    fn builtin_source(&self) -> &'static str {
        match self {
            Self::WorldSpec => WORLDSPEC_SCHEMA,
            Self::PackManifest => PACK_MANIFEST_SCHEMA,
            Self::StyleKitManifest => STYLEKIT_MANIFEST_SCHEMA,
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WorldSpec => "worldspec",
            Self::PackManifest => "pack manifest",
            Self::StyleKitManifest => "stylekit manifest",
        };
        f.write_str(name)
    }
}

/// A single structured diagnostic: where and what.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A schema document compiled on first use, then shared read-only.
struct LazySchema {
    kind: SchemaKind,
    source: Value,
    compiled: OnceLock<jsonschema::Validator>,
}

impl LazySchema {
    fn new(kind: SchemaKind, source: Value) -> Self {
        Self {
            kind,
            source,
            compiled: OnceLock::new(),
        }
    }

    fn validator(&self) -> Result<&jsonschema::Validator, SchemaError> {
        if let Some(validator) = self.compiled.get() {
            return Ok(validator);
        }
        let validator =
            jsonschema::validator_for(&self.source).map_err(|e| SchemaError::Invalid {
                kind: self.kind,
                message: e.to_string(),
            })?;
        // Racing first uses may both compile; the first stored copy wins.
        Ok(self.compiled.get_or_init(|| validator))
    }
}

impl fmt::Debug for LazySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySchema")
            .field("kind", &self.kind)
            .field("compiled", &self.compiled.get().is_some())
            .finish()
    }
}

/// The world-specification, pack and style-kit schemas.
///
/// Owned by whoever needs validation (usually a `WorldPipeline`) and passed
/// by reference; there is no process-global cache. Each schema is compiled
/// at most once per set and the set is safe to share across threads.
#[derive(Debug)]
pub struct SchemaSet {
    worldspec: LazySchema,
    pack_manifest: LazySchema,
    stylekit_manifest: LazySchema,
}

impl SchemaSet {
    /// The schemas shipped with the crate.
    pub fn builtin() -> Result<SchemaSet, SchemaError> {
        let parse = |kind: SchemaKind| {
            serde_json::from_str::<Value>(kind.builtin_source())
                .map_err(|source| SchemaError::Json { kind, source })
        };
        Ok(Self::from_sources(
            parse(SchemaKind::WorldSpec)?,
            parse(SchemaKind::PackManifest)?,
            parse(SchemaKind::StyleKitManifest)?,
        ))
    }

    /// Load all three schemas from `dir`, using their standard file names.
    pub fn from_dir(dir: &Path) -> Result<SchemaSet, SchemaError> {
        let load = |kind: SchemaKind| {
            let path = dir.join(kind.file_name());
            let contents = std::fs::read_to_string(&path).map_err(|source| SchemaError::Io {
                path: path.display().to_string(),
                source,
            })?;
            serde_json::from_str::<Value>(&contents)
                .map_err(|source| SchemaError::Json { kind, source })
        };
        Ok(Self::from_sources(
            load(SchemaKind::WorldSpec)?,
            load(SchemaKind::PackManifest)?,
            load(SchemaKind::StyleKitManifest)?,
        ))
    }

    /// Build a set from already-parsed schema documents.
    pub fn from_sources(
        worldspec: Value,
        pack_manifest: Value,
        stylekit_manifest: Value,
    ) -> SchemaSet {
        SchemaSet {
            worldspec: LazySchema::new(SchemaKind::WorldSpec, worldspec),
            pack_manifest: LazySchema::new(SchemaKind::PackManifest, pack_manifest),
            stylekit_manifest: LazySchema::new(SchemaKind::StyleKitManifest, stylekit_manifest),
        }
    }

    fn schema(&self, kind: SchemaKind) -> &LazySchema {
        match kind {
            SchemaKind::WorldSpec => &self.worldspec,
            SchemaKind::PackManifest => &self.pack_manifest,
            SchemaKind::StyleKitManifest => &self.stylekit_manifest,
        }
    }

    /// Validate `instance` against the `kind` schema.
    ///
    /// Returns every violation ordered by path; an empty list means valid.
    /// Only a broken schema document is reported as `Err`.
    pub fn validate(
        &self,
        kind: SchemaKind,
        instance: &Value,
    ) -> Result<Vec<FieldError>, SchemaError> {
        let validator = self.schema(kind).validator()?;
        let mut located: Vec<(Vec<PathSegment>, FieldError)> = validator
            .iter_errors(instance)
            .map(|e| {
                let segments = pointer_segments(&e.instance_path.to_string());
                let error = FieldError::new(render_segments(&segments), e.to_string());
                (segments, error)
            })
            .collect();
        located.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(located.into_iter().map(|(_, error)| error).collect())
    }

    pub fn validate_worldspec(&self, worldspec: &Value) -> Result<Vec<FieldError>, SchemaError> {
        self.validate(SchemaKind::WorldSpec, worldspec)
    }
}

/// One step of an instance path. Indices order numerically and before keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum PathSegment {
    Index(u64),
    Key(String),
}

fn pointer_segments(pointer: &str) -> Vec<PathSegment> {
    pointer
        .split('/')
        .skip(1)
        .map(|part| {
            let part = part.replace("~1", "/").replace("~0", "~");
            let canonical_index = part.bytes().all(|b| b.is_ascii_digit())
                && (part == "0" || !part.starts_with('0'));
            match part.parse::<u64>() {
                Ok(index) if canonical_index => PathSegment::Index(index),
                _ => PathSegment::Key(part),
            }
        })
        .collect()
}

fn render_segments(segments: &[PathSegment]) -> String {
    let mut out = String::from("$");
    for segment in segments {
        match segment {
            PathSegment::Index(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
            PathSegment::Key(key) => {
                out.push('.');
                out.push_str(key);
            }
        }
    }
    out
}

/// Render a JSON pointer (`/placements/0/asset_id`) in `$` notation
/// (`$.placements[0].asset_id`).
pub fn format_instance_path(pointer: &str) -> String {
    render_segments(&pointer_segments(pointer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_spec() -> Value {
        json!({
            "worldspec_version": "0.1",
            "template_id": "room_basic",
            "seed": 42,
            "placements": [
                {"asset_id": "core_chair_01", "transform": {"pos": [0, 0, 0]}}
            ]
        })
    }

    #[test]
    fn format_root_path() {
        assert_eq!(format_instance_path(""), "$");
    }

    #[test]
    fn format_nested_path() {
        assert_eq!(
            format_instance_path("/placements/0/asset_id"),
            "$.placements[0].asset_id"
        );
        assert_eq!(format_instance_path("/a~1b/c~0d"), "$.a/b.c~d");
        assert_eq!(format_instance_path("/codes/007"), "$.codes.007");
    }

    #[test]
    fn builtin_accepts_valid_spec() {
        let schemas = SchemaSet::builtin().unwrap();
        let errors = schemas.validate_worldspec(&valid_spec()).unwrap();
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn seed_type_error_reports_path() {
        let schemas = SchemaSet::builtin().unwrap();
        let mut spec = valid_spec();
        spec["seed"] = json!("42");
        let errors = schemas.validate_worldspec(&spec).unwrap();
        assert!(!errors.is_empty());
        assert!(errors.iter().any(|e| e.path == "$.seed"));
    }

    #[test]
    fn errors_are_sorted_by_path() {
        let schemas = SchemaSet::builtin().unwrap();
        let spec = json!({
            "worldspec_version": 1,
            "template_id": "room_basic",
            "seed": "x",
            "placements": []
        });
        let errors = schemas.validate_worldspec(&spec).unwrap();
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn array_indices_sort_numerically() {
        let schemas = SchemaSet::builtin().unwrap();
        let mut spec = valid_spec();
        let placements: Vec<Value> = (0..11)
            .map(|i| {
                if i == 2 || i == 10 {
                    json!({"transform": {}})
                } else {
                    json!({"asset_id": format!("asset_{:02}", i)})
                }
            })
            .collect();
        spec["placements"] = Value::Array(placements);
        let errors = schemas.validate_worldspec(&spec).unwrap();
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["$.placements[2]", "$.placements[10]"]);
    }

    #[test]
    fn segments_order_indices_before_keys() {
        let mut paths = vec![
            pointer_segments("/placements/10/asset_id"),
            pointer_segments("/seed"),
            pointer_segments("/placements/9"),
            pointer_segments(""),
        ];
        paths.sort();
        let rendered: Vec<String> = paths.iter().map(|p| render_segments(p)).collect();
        assert_eq!(
            rendered,
            ["$", "$.placements[9]", "$.placements[10].asset_id", "$.seed"]
        );
    }

    #[test]
    fn broken_schema_is_reported_lazily() {
        let schemas = SchemaSet::from_sources(json!({"type": 12}), json!({}), json!({}));
        assert!(schemas
            .validate(SchemaKind::PackManifest, &json!({}))
            .unwrap()
            .is_empty());
        assert!(matches!(
            schemas.validate_worldspec(&valid_spec()),
            Err(SchemaError::Invalid {
                kind: SchemaKind::WorldSpec,
                ..
            })
        ));
    }

    #[test]
    fn field_error_display() {
        let e = FieldError::new("$.seed", "bad");
        assert_eq!(e.to_string(), "$.seed: bad");
    }
}
