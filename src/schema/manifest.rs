use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A placeable asset declared by a pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetEntry {
    pub asset_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A named bundle of placeable assets with shared tags (`pack.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackManifest {
    pub pack_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub assets: Vec<AssetEntry>,
    /// File the manifest was loaded from; empty for in-memory manifests.
    #[serde(skip)]
    pub manifest_path: PathBuf,
}

/// Lighting parameters of a style kit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Lighting {
    #[serde(default)]
    pub preset: String,
}

/// Palette colors of a style kit. Missing entries fall back to defaults
/// when the planner resolves world colors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Palette {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
}

/// A named bundle of visual parameters with shared tags (`stylekit.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleKitManifest {
    pub stylekit_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub lighting: Lighting,
    #[serde(default)]
    pub palette: Palette,
    #[serde(skip)]
    pub manifest_path: PathBuf,
}
