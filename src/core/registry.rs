//! Pack and style-kit registries loaded from manifest trees.
//!
//! A registry scans a directory recursively for manifests with a fixed file
//! name, visits them in sorted path order, validates each against its schema
//! and indexes it by id. A bad manifest is recorded in `errors()` and never
//! stops the rest of the load. The first manifest seen for an id wins.

use rustc_hash::FxHashSet;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::validate::{FieldError, SchemaError, SchemaKind, SchemaSet};
use crate::schema::manifest::{AssetEntry, PackManifest, StyleKitManifest};

pub const PACK_MANIFEST_FILE: &str = "pack.json";
pub const STYLEKIT_MANIFEST_FILE: &str = "stylekit.json";

/// An asset together with the pack that declared it.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredAsset {
    pub pack_id: String,
    pub asset: AssetEntry,
}

#[derive(Debug, Clone, Default)]
pub struct PackRegistry {
    packs: BTreeMap<String, PackManifest>,
    assets: BTreeMap<String, RegisteredAsset>,
    tags_index: BTreeMap<String, FxHashSet<String>>,
    errors: Vec<FieldError>,
}

impl PackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `pack.json` under `root`.
    ///
    /// Only an unusable pack schema is returned as `Err`; everything wrong
    /// with individual manifests ends up in `errors()`.
    pub fn load(root: &Path, schemas: &SchemaSet) -> Result<PackRegistry, SchemaError> {
        let mut registry = PackRegistry::new();
        if !root.exists() {
            registry.errors.push(FieldError::new(
                root.display().to_string(),
                "packs directory does not exist",
            ));
            return Ok(registry);
        }

        let manifests: Vec<PackManifest> = load_manifests(
            root,
            PACK_MANIFEST_FILE,
            SchemaKind::PackManifest,
            schemas,
            &mut registry.errors,
        )?;
        for manifest in manifests {
            registry.register(manifest);
        }
        tracing::debug!(
            root = %root.display(),
            packs = registry.packs.len(),
            assets = registry.assets.len(),
            errors = registry.errors.len(),
            "pack registry loaded"
        );
        Ok(registry)
    }

    /// Add a manifest. Returns `false` (and records an error) when its
    /// `pack_id` is already registered. Assets whose ids were claimed by an
    /// earlier pack are skipped individually.
    pub fn register(&mut self, manifest: PackManifest) -> bool {
        let source = manifest.manifest_path.display().to_string();
        if self.packs.contains_key(&manifest.pack_id) {
            tracing::warn!(pack_id = %manifest.pack_id, path = %source, "duplicate pack_id skipped");
            self.errors.push(FieldError::new(
                source,
                format!("duplicate pack_id '{}' skipped", manifest.pack_id),
            ));
            return false;
        }

        for asset in &manifest.assets {
            if let Some(existing) = self.assets.get(&asset.asset_id) {
                tracing::warn!(asset_id = %asset.asset_id, path = %source, "duplicate asset_id skipped");
                self.errors.push(FieldError::new(
                    source.clone(),
                    format!(
                        "duplicate asset_id '{}' skipped (already in pack '{}')",
                        asset.asset_id, existing.pack_id
                    ),
                ));
                continue;
            }
            self.assets.insert(
                asset.asset_id.clone(),
                RegisteredAsset {
                    pack_id: manifest.pack_id.clone(),
                    asset: asset.clone(),
                },
            );
        }

        self.tags_index.insert(
            manifest.pack_id.clone(),
            manifest.tags.iter().cloned().collect(),
        );
        self.packs.insert(manifest.pack_id.clone(), manifest);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.packs.len()
    }

    /// Pack ids in lexicographic order.
    pub fn pack_ids(&self) -> impl Iterator<Item = &str> {
        self.packs.keys().map(String::as_str)
    }

    pub fn get_pack(&self, pack_id: &str) -> Option<&PackManifest> {
        self.packs.get(pack_id)
    }

    pub fn contains_pack(&self, pack_id: &str) -> bool {
        self.packs.contains_key(pack_id)
    }

    pub fn asset(&self, asset_id: &str) -> Option<&RegisteredAsset> {
        self.assets.get(asset_id)
    }

    pub fn contains_asset(&self, asset_id: &str) -> bool {
        self.assets.contains_key(asset_id)
    }

    /// Ids of packs carrying ALL of `tags`, sorted. No tags matches every pack.
    pub fn search_packs(&self, tags: &[&str]) -> Vec<String> {
        search_tags(&self.tags_index, tags)
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }
}

#[derive(Debug, Clone, Default)]
pub struct StyleKitRegistry {
    stylekits: BTreeMap<String, StyleKitManifest>,
    tags_index: BTreeMap<String, FxHashSet<String>>,
    errors: Vec<FieldError>,
}

impl StyleKitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `stylekit.json` under `root`.
    pub fn load(root: &Path, schemas: &SchemaSet) -> Result<StyleKitRegistry, SchemaError> {
        let mut registry = StyleKitRegistry::new();
        if !root.exists() {
            registry.errors.push(FieldError::new(
                root.display().to_string(),
                "stylekits directory does not exist",
            ));
            return Ok(registry);
        }

        let manifests: Vec<StyleKitManifest> = load_manifests(
            root,
            STYLEKIT_MANIFEST_FILE,
            SchemaKind::StyleKitManifest,
            schemas,
            &mut registry.errors,
        )?;
        for manifest in manifests {
            registry.register(manifest);
        }
        tracing::debug!(
            root = %root.display(),
            stylekits = registry.stylekits.len(),
            errors = registry.errors.len(),
            "stylekit registry loaded"
        );
        Ok(registry)
    }

    /// Add a manifest. Returns `false` (and records an error) when its
    /// `stylekit_id` is already registered.
    pub fn register(&mut self, manifest: StyleKitManifest) -> bool {
        if self.stylekits.contains_key(&manifest.stylekit_id) {
            let source = manifest.manifest_path.display().to_string();
            tracing::warn!(stylekit_id = %manifest.stylekit_id, path = %source, "duplicate stylekit_id skipped");
            self.errors.push(FieldError::new(
                source,
                format!("duplicate stylekit_id '{}' skipped", manifest.stylekit_id),
            ));
            return false;
        }
        self.tags_index.insert(
            manifest.stylekit_id.clone(),
            manifest.tags.iter().cloned().collect(),
        );
        self.stylekits.insert(manifest.stylekit_id.clone(), manifest);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.stylekits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stylekits.len()
    }

    /// Style kit ids in lexicographic order.
    pub fn list_stylekits(&self) -> Vec<String> {
        self.stylekits.keys().cloned().collect()
    }

    pub fn get_stylekit(&self, stylekit_id: &str) -> Option<&StyleKitManifest> {
        self.stylekits.get(stylekit_id)
    }

    pub fn contains_stylekit(&self, stylekit_id: &str) -> bool {
        self.stylekits.contains_key(stylekit_id)
    }

    /// All loaded style kits, ordered by id.
    pub fn stylekits(&self) -> impl Iterator<Item = &StyleKitManifest> {
        self.stylekits.values()
    }

    /// Ids of style kits carrying ALL of `tags`, sorted.
    pub fn search_stylekits(&self, tags: &[&str]) -> Vec<String> {
        search_tags(&self.tags_index, tags)
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }
}

fn search_tags(index: &BTreeMap<String, FxHashSet<String>>, tags: &[&str]) -> Vec<String> {
    index
        .iter()
        .filter(|(_, have)| tags.iter().all(|t| have.contains(*t)))
        .map(|(id, _)| id.clone())
        .collect()
}

/// Parse, validate and deserialize every manifest named `file_name` under
/// `root`, in sorted path order. Failures are appended to `errors`.
fn load_manifests<T>(
    root: &Path,
    file_name: &str,
    kind: SchemaKind,
    schemas: &SchemaSet,
    errors: &mut Vec<FieldError>,
) -> Result<Vec<T>, SchemaError>
where
    T: DeserializeOwned + HasManifestPath,
{
    let mut paths = Vec::new();
    collect_manifest_paths(root, file_name, &mut paths, errors);
    paths.sort();

    let mut manifests = Vec::new();
    for path in paths {
        let source = path.display().to_string();
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(path = %source, error = %e, "manifest unreadable");
                errors.push(FieldError::new(source, format!("unreadable: {}", e)));
                continue;
            }
        };
        let raw: Value = match serde_json::from_str(&contents) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(path = %source, error = %e, "manifest is not valid JSON");
                errors.push(FieldError::new(source, format!("invalid JSON: {}", e)));
                continue;
            }
        };

        let schema_errors = schemas.validate(kind, &raw)?;
        if !schema_errors.is_empty() {
            tracing::warn!(path = %source, count = schema_errors.len(), "manifest failed {} schema", kind);
            errors.extend(schema_errors.into_iter().map(|e| {
                FieldError::new(format!("{}:{}", source, e.path), e.message)
            }));
            continue;
        }

        match serde_json::from_value::<T>(raw) {
            Ok(mut manifest) => {
                manifest.set_manifest_path(path);
                manifests.push(manifest);
            }
            Err(e) => {
                errors.push(FieldError::new(source, format!("invalid {}: {}", kind, e)));
            }
        }
    }
    Ok(manifests)
}

fn collect_manifest_paths(
    dir: &Path,
    file_name: &str,
    out: &mut Vec<PathBuf>,
    errors: &mut Vec<FieldError>,
) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            errors.push(FieldError::new(
                dir.display().to_string(),
                format!("unreadable directory: {}", e),
            ));
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_manifest_paths(&path, file_name, out, errors);
        } else if path.file_name().and_then(|s| s.to_str()) == Some(file_name) {
            out.push(path);
        }
    }
}

trait HasManifestPath {
    fn set_manifest_path(&mut self, path: PathBuf);
}

impl HasManifestPath for PackManifest {
    fn set_manifest_path(&mut self, path: PathBuf) {
        self.manifest_path = path;
    }
}

impl HasManifestPath for StyleKitManifest {
    fn set_manifest_path(&mut self, path: PathBuf) {
        self.manifest_path = path;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(id: &str, tags: &[&str], assets: &[&str]) -> PackManifest {
        PackManifest {
            pack_id: id.to_string(),
            name: None,
            version: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            assets: assets
                .iter()
                .map(|a| AssetEntry {
                    asset_id: a.to_string(),
                    label: String::new(),
                    tags: Vec::new(),
                })
                .collect(),
            manifest_path: PathBuf::from(format!("{}/pack.json", id)),
        }
    }

    fn kit(id: &str, tags: &[&str]) -> StyleKitManifest {
        StyleKitManifest {
            stylekit_id: id.to_string(),
            name: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            lighting: Default::default(),
            palette: Default::default(),
            manifest_path: PathBuf::new(),
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = PackRegistry::new();
        assert!(registry.register(pack("core_pack", &["indoor"], &["chair", "table"])));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains_pack("core_pack"));
        assert_eq!(registry.asset("chair").unwrap().pack_id, "core_pack");
        assert!(registry.errors().is_empty());
    }

    #[test]
    fn duplicate_pack_keeps_first() {
        let mut registry = PackRegistry::new();
        registry.register(pack("p", &["first"], &["a"]));
        assert!(!registry.register(pack("p", &["second"], &["b"])));
        assert_eq!(registry.errors().len(), 1);
        assert_eq!(registry.get_pack("p").unwrap().tags, vec!["first".to_string()]);
        assert!(!registry.contains_asset("b"));
    }

    #[test]
    fn duplicate_asset_skipped_per_repeat() {
        let mut registry = PackRegistry::new();
        registry.register(pack("a", &[], &["shared"]));
        registry.register(pack("b", &[], &["shared", "b_only"]));
        registry.register(pack("c", &[], &["shared"]));
        assert_eq!(registry.errors().len(), 2);
        assert_eq!(registry.asset("shared").unwrap().pack_id, "a");
        assert!(registry.contains_asset("b_only"));
        assert!(registry.errors()[0].message.contains("already in pack 'a'"));
    }

    #[test]
    fn search_requires_all_tags() {
        let mut registry = PackRegistry::new();
        registry.register(pack("city", &["outdoor", "prototype"], &[]));
        registry.register(pack("core", &["indoor", "basic", "prototype"], &[]));
        assert_eq!(registry.search_packs(&["prototype"]), ["city", "core"]);
        assert_eq!(registry.search_packs(&["indoor", "basic"]), ["core"]);
        assert!(registry.search_packs(&["missing"]).is_empty());
        assert_eq!(registry.search_packs(&[]), ["city", "core"]);
    }

    #[test]
    fn stylekit_duplicates_and_search() {
        let mut registry = StyleKitRegistry::new();
        registry.register(kit("neutral", &["indoor", "day"]));
        registry.register(kit("moody", &["indoor", "night"]));
        assert!(!registry.register(kit("moody", &["other"])));
        assert_eq!(registry.list_stylekits(), ["moody", "neutral"]);
        assert_eq!(registry.search_stylekits(&["night"]), ["moody"]);
        assert_eq!(registry.errors().len(), 1);
        assert!(registry.errors()[0].message.contains("duplicate stylekit_id"));
    }

    #[test]
    fn missing_root_is_recorded() {
        let schemas = SchemaSet::builtin().unwrap();
        let registry = PackRegistry::load(Path::new("does/not/exist"), &schemas).unwrap();
        assert!(registry.is_empty());
        assert_eq!(registry.errors().len(), 1);
        assert_eq!(registry.errors()[0].message, "packs directory does not exist");
    }
}
