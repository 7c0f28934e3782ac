//! Prompt-driven world planning.
//!
//! Turns a free-text prompt into a complete world specification: picks a
//! pack and a style kit by matching prompt tokens against manifest tags,
//! ranks the pack's assets, and scatters the best ones over fixed floor
//! slots with a seeded generator. The same prompt, seed, preferences and
//! registry contents always produce the same specification.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Reverse;
use thiserror::Error;

use crate::core::canonical;
use crate::core::registry::{PackRegistry, StyleKitRegistry};
use crate::core::template::ROOM_BASIC;
use crate::core::validate::{FieldError, SchemaError, SchemaSet};
use crate::schema::manifest::{AssetEntry, StyleKitManifest};
use crate::schema::worldspec::{
    Budgets, Colors, PlacementRequest, Transform, WorldSpec, WORLDSPEC_VERSION,
};

pub const TEMPLATE_ALLOWLIST: &[&str] = &[ROOM_BASIC];
pub const DEFAULT_TEMPLATE_ID: &str = ROOM_BASIC;
pub const DEFAULT_STYLEKIT_ID: &str = "neutral_daylight";
pub const DEFAULT_PACK_ID: &str = "core_pack";

/// Seed source used when the prompt is empty.
const DEFAULT_PROMPT: &str = "default";

const OUTDOOR_WORDS: &[&str] = &["outdoor", "city", "street", "plaza", "park"];
const INDOOR_WORDS: &[&str] = &["indoor", "room", "office", "studio", "living"];

/// Deterministic `(x, z)` floor positions. Props are never stacked.
pub const FLOOR_SLOTS: [(f64, f64); 6] = [
    (-1.75, -1.25),
    (1.65, -1.10),
    (-1.40, 0.95),
    (1.35, 1.15),
    (0.00, -1.55),
    (0.15, 1.55),
];

/// Compass headings a prop may face, in degrees.
const YAW_STEPS: [u32; 8] = [0, 45, 90, 135, 180, 225, 270, 315];

const DEFAULT_WALL_COLOR: &str = "#d8d8d8";
const DEFAULT_FLOOR_COLOR: &str = "#8b7d6b";
const DEFAULT_ACCENT_COLOR: &str = "#4a90e2";

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("no valid packs loaded; planner cannot select assets")]
    NoPacks,
    #[error("no valid stylekits loaded; planner cannot select style")]
    NoStyleKits,
    #[error("planned world specification failed validation with {} error(s)", .errors.len())]
    Invalid {
        errors: Vec<FieldError>,
        /// The rejected draft, kept for diagnostics.
        worldspec: Box<WorldSpec>,
    },
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PlanError {
    /// The failure as a structured `{path, message}` list.
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            Self::NoPacks => vec![FieldError::new("$.pack_registry", self.to_string())],
            Self::NoStyleKits => vec![FieldError::new("$.stylekit_registry", self.to_string())],
            Self::Invalid { errors, .. } => errors.clone(),
            Self::Schema(_) | Self::Json(_) => vec![FieldError::new("$", self.to_string())],
        }
    }
}

/// Caller overrides for the planning budgets. Only positive values apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub max_props: Option<u32>,
    #[serde(default)]
    pub max_texture_tier: Option<u32>,
    #[serde(default)]
    pub max_lights: Option<u32>,
}

impl Preferences {
    fn apply(&self, budgets: &mut Budgets) {
        let positive = |v: Option<u32>| v.filter(|v| *v > 0);
        if let Some(v) = positive(self.max_props) {
            budgets.max_props = v;
        }
        if let Some(v) = positive(self.max_texture_tier) {
            budgets.max_texture_tier = v;
        }
        if let Some(v) = positive(self.max_lights) {
            budgets.max_lights = v;
        }
    }
}

/// Plans world specifications against a pair of loaded registries.
pub struct Planner<'a> {
    packs: &'a PackRegistry,
    stylekits: &'a StyleKitRegistry,
    schemas: &'a SchemaSet,
}

impl<'a> Planner<'a> {
    pub fn new(
        packs: &'a PackRegistry,
        stylekits: &'a StyleKitRegistry,
        schemas: &'a SchemaSet,
    ) -> Self {
        Self {
            packs,
            stylekits,
            schemas,
        }
    }

    /// Plan a world for `prompt`.
    ///
    /// Without an explicit `seed` one is derived from the prompt text, so
    /// identical prompts always plan identically.
    pub fn plan(
        &self,
        prompt: &str,
        seed: Option<u64>,
        preferences: Option<&Preferences>,
    ) -> Result<WorldSpec, PlanError> {
        let prompt = prompt.trim();
        let tokens = tokenize(prompt);
        let seed = seed.unwrap_or_else(|| {
            seed_from_prompt(if prompt.is_empty() { DEFAULT_PROMPT } else { prompt })
        });

        if self.packs.is_empty() {
            return Err(PlanError::NoPacks);
        }
        if self.stylekits.is_empty() {
            return Err(PlanError::NoStyleKits);
        }

        let template_id = if TEMPLATE_ALLOWLIST.contains(&DEFAULT_TEMPLATE_ID) {
            DEFAULT_TEMPLATE_ID
        } else {
            TEMPLATE_ALLOWLIST[0]
        };
        let stylekit_id = self.select_stylekit_id(&tokens);
        let pack_ids = self.select_pack_ids(&tokens);

        let mut budgets = Budgets::default();
        if let Some(prefs) = preferences {
            prefs.apply(&mut budgets);
        }

        let assets = self.collect_assets(&pack_ids);
        let placements = build_placements(&assets, &tokens, seed, budgets.max_props);
        let colors = self
            .stylekits
            .get_stylekit(&stylekit_id)
            .map(colors_from_stylekit);

        tracing::debug!(
            seed,
            stylekit = %stylekit_id,
            packs = ?pack_ids,
            placements = placements.len(),
            "world planned"
        );

        let worldspec = WorldSpec {
            worldspec_version: WORLDSPEC_VERSION.to_string(),
            template_id: template_id.to_string(),
            seed,
            stylekit_id,
            pack_ids,
            placements,
            budgets,
            colors,
        };

        let errors = self.schemas.validate_worldspec(&worldspec.to_value()?)?;
        if !errors.is_empty() {
            tracing::warn!(count = errors.len(), "planned world specification is invalid");
            return Err(PlanError::Invalid {
                errors,
                worldspec: Box::new(worldspec),
            });
        }
        Ok(worldspec)
    }

    /// Outdoor words are checked before indoor ones. Without a tag match the
    /// default pack is used, or failing that the first pack by id.
    fn select_pack_ids(&self, tokens: &FxHashSet<String>) -> Vec<String> {
        let desired = if OUTDOOR_WORDS.iter().any(|w| tokens.contains(*w)) {
            Some("outdoor")
        } else if INDOOR_WORDS.iter().any(|w| tokens.contains(*w)) {
            Some("indoor")
        } else {
            None
        };

        if let Some(tag) = desired {
            if let Some(first) = self.packs.search_packs(&[tag]).into_iter().next() {
                return vec![first];
            }
        }

        if self.packs.contains_pack(DEFAULT_PACK_ID) {
            return vec![DEFAULT_PACK_ID.to_string()];
        }
        self.packs
            .pack_ids()
            .next()
            .map(|id| vec![id.to_string()])
            .unwrap_or_default()
    }

    fn select_stylekit_id(&self, tokens: &FxHashSet<String>) -> String {
        let fallback = if self.stylekits.contains_stylekit(DEFAULT_STYLEKIT_ID) {
            DEFAULT_STYLEKIT_ID.to_string()
        } else {
            self.stylekits
                .list_stylekits()
                .into_iter()
                .next()
                .unwrap_or_default()
        };

        let mut ranked: Vec<(u32, &str)> = self
            .stylekits
            .stylekits()
            .map(|kit| (stylekit_score(kit, tokens), kit.stylekit_id.as_str()))
            .collect();
        ranked.sort_by_key(|&(score, id)| (Reverse(score), id));

        match ranked.first() {
            Some(&(score, id)) if score > 0 => id.to_string(),
            _ => fallback,
        }
    }

    fn collect_assets(&self, pack_ids: &[String]) -> Vec<&'a AssetEntry> {
        let packs = self.packs;
        pack_ids
            .iter()
            .filter_map(|id| packs.get_pack(id))
            .flat_map(|pack| pack.assets.iter())
            .collect()
    }
}

/// Lowercase alphanumeric word tokens, duplicates collapsed.
pub fn tokenize(text: &str) -> FxHashSet<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// First 32 bits of the SHA-256 digest of the trimmed prompt.
pub fn seed_from_prompt(prompt: &str) -> u64 {
    let digest = Sha256::digest(prompt.trim().as_bytes());
    u64::from(u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]))
}

/// Matching tags, plus one if any token occurs inside the lighting preset.
fn stylekit_score(kit: &StyleKitManifest, tokens: &FxHashSet<String>) -> u32 {
    let tags: FxHashSet<&str> = kit.tags.iter().map(String::as_str).collect();
    let tag_hits = tags.iter().filter(|t| tokens.contains(**t)).count() as u32;
    let preset = kit.lighting.preset.to_lowercase();
    let preset_hit = tokens.iter().any(|t| preset.contains(t.as_str()));
    tag_hits + u32::from(preset_hit)
}

/// Two points per matching tag, one per matching label word.
fn asset_score(asset: &AssetEntry, tokens: &FxHashSet<String>) -> u32 {
    let tags: FxHashSet<&str> = asset.tags.iter().map(String::as_str).collect();
    let tag_hits = tags.iter().filter(|t| tokens.contains(**t)).count() as u32;
    let label_hits = tokenize(&asset.label)
        .iter()
        .filter(|w| tokens.contains(*w))
        .count() as u32;
    tag_hits * 2 + label_hits
}

fn build_placements(
    assets: &[&AssetEntry],
    tokens: &FxHashSet<String>,
    seed: u64,
    max_props: u32,
) -> Vec<PlacementRequest> {
    if assets.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<(u32, &AssetEntry)> =
        assets.iter().map(|a| (asset_score(a, tokens), *a)).collect();
    ranked.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then_with(|| a.asset_id.cmp(&b.asset_id)));

    let count = (max_props as usize)
        .min(ranked.len())
        .min(FLOOR_SLOTS.len())
        .max(1);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut slots = FLOOR_SLOTS.to_vec();
    slots.shuffle(&mut rng);

    ranked
        .iter()
        .take(count)
        .zip(slots)
        .map(|((_, asset), (x, z))| {
            let yaw = YAW_STEPS[rng.gen_range(0..YAW_STEPS.len())];
            PlacementRequest {
                asset_id: asset.asset_id.clone(),
                transform: Transform::floor(round2(x), round2(z), f64::from(yaw)),
            }
        })
        .collect()
}

fn colors_from_stylekit(kit: &StyleKitManifest) -> Colors {
    let wall = kit
        .palette
        .wall
        .clone()
        .unwrap_or_else(|| DEFAULT_WALL_COLOR.to_string());
    Colors {
        floor: kit
            .palette
            .floor
            .clone()
            .unwrap_or_else(|| DEFAULT_FLOOR_COLOR.to_string()),
        ceiling: wall.clone(),
        accent: kit
            .palette
            .accent
            .clone()
            .unwrap_or_else(|| DEFAULT_ACCENT_COLOR.to_string()),
        wall,
    }
}

fn round2(v: f64) -> f64 {
    canonical::round_decimal(v, 2)
}
