//! End-to-end layer loading: loader config on disk, TOML and JSON layer
//! files, environment and overrides stacked into one layered map.

use std::fs;

use serde_json::json;
use strata_config::{LayerLoader, LayerOrigin, LoaderConfig};

fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn full_stack_resolves_by_priority() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("base.toml"),
        "timeout = 200\nregion = \"eu\"\n[cache]\nmode = \"off\"\n",
    )
    .unwrap();
    fs::write(dir.path().join("local.json"), r#"{"region": "us", "retries": 3}"#).unwrap();
    fs::write(
        dir.path().join("strata.toml"),
        "files = [\"base.toml\", \"missing.toml\", \"local.json\"]\nenv_prefix = \"APP_\"\n",
    )
    .unwrap();

    let config = LoaderConfig::load_from(&dir.path().join("strata.toml")).unwrap();
    let loaded = LayerLoader::new(config)
        .with_defaults(json!({"timeout": 100, "retries": 0, "verbose": false}))
        .with_env_vars(env(&[("APP_RETRIES", "5"), ("HOME", "/root")]))
        .with_overrides(json!({"verbose": true}))
        .load()
        .unwrap();

    let map = loaded.map();
    assert_eq!(map.layer_count(), 5);
    assert_eq!(map["timeout"], json!(200));
    assert_eq!(map["region"], json!("us"));
    assert_eq!(map["retries"], json!(5));
    assert_eq!(map["verbose"], json!(true));
    assert_eq!(map["cache"], json!({"mode": "off"}));
    assert_eq!(map.get_all("retries"), vec![&json!(0), &json!(3), &json!(5)]);

    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["cache", "region", "retries", "timeout", "verbose"]);

    let origins: Vec<LayerOrigin> = loaded.sources().iter().map(|s| s.origin).collect();
    assert_eq!(
        origins,
        vec![
            LayerOrigin::Defaults,
            LayerOrigin::File,
            LayerOrigin::File,
            LayerOrigin::Env,
            LayerOrigin::Overrides,
        ]
    );
    let region_source = loaded.origin_of("region").unwrap();
    assert_eq!(region_source.path.as_deref(), Some(dir.path().join("local.json").as_path()));
}

#[test]
fn loaded_map_behaves_like_any_layered_map() {
    let mut map = LayerLoader::new(LoaderConfig {
        include_env: false,
        ..LoaderConfig::default()
    })
    .with_defaults(json!({"a": 1, "b": 1}))
    .with_overrides(json!({"a": 2}))
    .load()
    .unwrap()
    .into_map();

    assert!(map.is_truthy());
    assert_eq!(map.insert("a".into(), json!(3)), Some(json!(2)));
    assert_eq!(map.get_all("a"), vec![&json!(1), &json!(3)]);

    assert_eq!(map.remove("a").unwrap(), vec![json!(1), json!(3)]);
    assert_eq!(map.to_value(), json!({"b": 1}));
}

#[test]
fn bad_layer_file_reports_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.toml");
    fs::write(&bad, "not = [valid").unwrap();

    let err = LayerLoader::new(LoaderConfig {
        files: vec![bad.clone()],
        include_env: false,
        ..LoaderConfig::default()
    })
    .load()
    .unwrap_err();

    assert!(err.to_string().contains("bad.toml"));
}
