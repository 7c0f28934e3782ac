/// Registry integration tests: loading pack and style-kit manifest trees.
use std::path::Path;

use worldspec_pipeline::core::registry::{PackRegistry, StyleKitRegistry};
use worldspec_pipeline::core::validate::SchemaSet;

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn valid_packs_load_with_assets_and_tags() {
    let schemas = SchemaSet::builtin().unwrap();
    let registry = PackRegistry::load(&fixture("packs_valid"), &schemas).unwrap();

    assert!(registry.errors().is_empty(), "{:?}", registry.errors());
    assert_eq!(registry.pack_ids().collect::<Vec<_>>(), ["city_pack", "core_pack"]);
    assert_eq!(registry.asset("core_chair_01").unwrap().pack_id, "core_pack");
    assert_eq!(registry.asset("city_bench_01").unwrap().pack_id, "city_pack");
    assert_eq!(registry.search_packs(&["prototype"]), ["city_pack", "core_pack"]);
    assert_eq!(registry.search_packs(&["outdoor"]), ["city_pack"]);

    let core = registry.get_pack("core_pack").unwrap();
    assert!(core.manifest_path.ends_with("core_pack/pack.json"));
}

#[test]
fn invalid_pack_is_reported_with_file_and_json_path() {
    let schemas = SchemaSet::builtin().unwrap();
    let registry = PackRegistry::load(&fixture("packs_invalid"), &schemas).unwrap();

    assert!(registry.is_empty());
    assert_eq!(registry.errors().len(), 1);
    let error = &registry.errors()[0];
    assert!(error.path.ends_with("pack.json:$"), "{}", error.path);
    assert!(error.message.contains("pack_id"), "{}", error.message);
}

#[test]
fn broken_json_does_not_stop_later_manifests() {
    let schemas = SchemaSet::builtin().unwrap();
    let registry = PackRegistry::load(&fixture("packs_mixed"), &schemas).unwrap();

    assert_eq!(registry.len(), 1);
    assert!(registry.contains_asset("good_box_01"));
    assert_eq!(registry.errors().len(), 1);
    assert!(registry.errors()[0].message.starts_with("invalid JSON"));
    assert!(registry.errors()[0].path.contains("a_bad"));
}

#[test]
fn duplicate_asset_keeps_first_pack_in_path_order() {
    let schemas = SchemaSet::builtin().unwrap();
    let registry = PackRegistry::load(&fixture("packs_duplicate"), &schemas).unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.asset("shared_asset_01").unwrap().pack_id, "pack_a");
    assert_eq!(registry.asset("shared_asset_01").unwrap().asset.label, "Shared Crate");
    assert!(registry.contains_asset("b_only_01"));

    assert_eq!(registry.errors().len(), 1);
    let error = &registry.errors()[0];
    assert!(error.path.contains("pack_b"));
    assert_eq!(
        error.message,
        "duplicate asset_id 'shared_asset_01' skipped (already in pack 'pack_a')"
    );
}

#[test]
fn missing_directories_yield_empty_registries() {
    let schemas = SchemaSet::builtin().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");

    let packs = PackRegistry::load(&missing, &schemas).unwrap();
    let kits = StyleKitRegistry::load(&missing, &schemas).unwrap();
    assert!(packs.is_empty());
    assert!(kits.is_empty());
    assert_eq!(kits.errors()[0].message, "stylekits directory does not exist");
}

#[test]
fn empty_directory_loads_nothing_without_errors() {
    let schemas = SchemaSet::builtin().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let packs = PackRegistry::load(dir.path(), &schemas).unwrap();
    assert!(packs.is_empty());
    assert!(packs.errors().is_empty());
}

#[test]
fn valid_stylekits_load_and_search() {
    let schemas = SchemaSet::builtin().unwrap();
    let registry = StyleKitRegistry::load(&fixture("stylekits_valid"), &schemas).unwrap();

    assert!(registry.errors().is_empty(), "{:?}", registry.errors());
    assert_eq!(registry.list_stylekits(), ["moody_evening", "neutral_daylight"]);
    assert_eq!(registry.search_stylekits(&["indoor"]), ["moody_evening", "neutral_daylight"]);
    assert_eq!(registry.search_stylekits(&["night"]), ["moody_evening"]);
    let moody = registry.get_stylekit("moody_evening").unwrap();
    assert_eq!(moody.lighting.preset, "night_low_key");
}

#[test]
fn invalid_stylekit_is_reported() {
    let schemas = SchemaSet::builtin().unwrap();
    let registry = StyleKitRegistry::load(&fixture("stylekits_invalid"), &schemas).unwrap();

    assert!(registry.is_empty());
    assert_eq!(registry.errors().len(), 1);
    assert!(registry.errors()[0].path.ends_with("stylekit.json:$"));
    assert!(registry.errors()[0].message.contains("stylekit_id"));
}

#[test]
fn duplicate_stylekits_keep_first_and_report_each_repeat() {
    let schemas = SchemaSet::builtin().unwrap();
    let registry = StyleKitRegistry::load(&fixture("stylekits_duplicate"), &schemas).unwrap();

    assert_eq!(registry.len(), 1);
    assert_eq!(
        registry.get_stylekit("dup_stylekit").unwrap().name.as_deref(),
        Some("Copy a")
    );
    assert_eq!(registry.errors().len(), 2);
    for error in registry.errors() {
        assert_eq!(error.message, "duplicate stylekit_id 'dup_stylekit' skipped");
    }
}

#[test]
fn manifests_written_at_runtime_are_discovered_recursively() {
    let schemas = SchemaSet::builtin().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("group").join("deep_pack");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(
        nested.join("pack.json"),
        r#"{"pack_id": "deep_pack", "assets": [{"asset_id": "deep_crate_01"}]}"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("notes.json"), "{}").unwrap();

    let registry = PackRegistry::load(dir.path(), &schemas).unwrap();
    assert_eq!(registry.pack_ids().collect::<Vec<_>>(), ["deep_pack"]);
    assert!(registry.errors().is_empty());
}
