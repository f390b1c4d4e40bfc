use std::{fs, path::Path};

use modfs_mod_protocol::ModProfile;
use modfs_overlay::{
    cache::{CacheState, FIRST_SHARED_BUCKET, UNIQUE_BUCKET},
    CacheConfig, CacheDirectory, OverrideMapping, Resolution,
};

fn write(base: &Path, relative: &str) {
    let path = base.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, relative).unwrap();
}

#[test]
fn cache_lifecycle() {
    let root = tempfile::tempdir().unwrap();
    let mut cache = CacheDirectory::new(CacheConfig::new(root.path()));

    cache.startup("cache_test").unwrap();

    let base = cache.base_path(false).unwrap().to_path_buf();
    let unique_bucket = base.join(UNIQUE_BUCKET.to_string());
    let shared_bucket = base.join(FIRST_SHARED_BUCKET.to_string());

    let alpha = cache.get_cache_path("alpha", false, true).unwrap();
    let beta = cache.get_cache_path("beta", false, true).unwrap();
    let gamma = cache.get_cache_path("gamma", false, false).unwrap();

    assert!(alpha.starts_with(&unique_bucket));
    assert!(beta.starts_with(&unique_bucket));
    assert_ne!(alpha, beta);
    assert!(gamma.starts_with(&shared_bucket));

    for path in [&alpha, &beta, &gamma] {
        assert!(path.is_dir(), "{path:?} was handed out without existing");
    }

    cache.shutdown(true);

    assert_eq!(cache.state(), CacheState::Shutdown);
    assert!(!root.path().join("cache_test").exists());
}

#[test]
fn profile_packages_resolve_in_load_order() {
    let workspace = tempfile::tempdir().unwrap();
    let mods = workspace.path();

    write(mods, "base/data/hud.txd");
    write(mods, "base/data/radar.txd");
    write(mods, "base/data/handling.cfg");
    write(mods, "hd/data/hud.txd");
    write(mods, "hd/data/handling.cfg");
    write(mods, "ignored-disabled/data/radar.txd");

    let profile_path = mods.join("profile.toml");
    fs::write(
        &profile_path,
        r#"
profileVersion = "v1"
exclude_packages = ["*-disabled"]

[[packages]]
id = "hd"
path = "hd"
load_after = [{ id = "base" }]
exclude_files = ["data/*.cfg"]

[[packages]]
id = "base"
path = "base"

[[packages]]
id = "ignored-disabled"
path = "ignored-disabled"
priority = 100
"#,
    )
    .unwrap();

    let profile = ModProfile::from_file(&profile_path).unwrap();

    let mut mapping = OverrideMapping::new();
    mapping.scan_profile(&profile).unwrap();

    let resolver = mapping.resolver();

    // Same priority, so the package loaded last wins.
    assert_eq!(resolver.resolve("data0:/data/HUD.txd").unwrap().source, "hd");
    assert_eq!(resolver.resolve("data/radar.txd").unwrap().source, "base");
    assert_eq!(resolver.resolve("data/handling.cfg").unwrap().source, "base");
    assert!(resolver.resolve("data/missing.txd").is_none());

    let root = tempfile::tempdir().unwrap();
    let mut cache = CacheDirectory::new(CacheConfig::new(root.path()));
    cache.startup("merged").unwrap();

    match resolver.resolve_with_cache("data/hud.txd", &mut cache).unwrap() {
        Some(Resolution::Merged {
            sources,
            cache_path,
        }) => {
            let ids = sources
                .iter()
                .map(|candidate| candidate.source.as_str())
                .collect::<Vec<_>>();

            assert_eq!(ids, ["hd", "base"]);
            assert!(cache_path.is_dir());
        }
        other => panic!("expected a merged resolution, got {other:?}"),
    }

    cache.shutdown(true);
}
