use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use token_sync::load_config::load_config;
use token_sync_core::generate::Format;

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

#[test]
#[serial]
fn full_config_is_loaded() {
    env::remove_var("GITHUB_BRANCH");
    let file = config_file(
        r#"
output_dir: ./tmp/build
manifest_dir: design/tokens
targets:
  - destination: web/tokens.css
    format: css/variables
  - destination: web/tokens.mjs
    format: javascript/es6
publish:
  base_branch: develop
  branch_prefix: tokens/sync
  title: "Sync tokens"
  labels: [tokens]
"#,
    );

    let config = load_config(Some(file.path())).expect("Config should load");

    assert_eq!(config.output_dir, PathBuf::from("./tmp/build"));
    assert_eq!(config.manifest_repo_path("t.json"), "design/tokens/t.json");
    assert_eq!(config.targets.len(), 2);
    assert_eq!(config.targets[1].destination, "web/tokens.mjs");
    assert_eq!(config.targets[1].format, Format::Es6Module);
    assert_eq!(config.publish.base_branch, "develop");
    assert_eq!(config.publish.branch_prefix, "tokens/sync");
    assert_eq!(config.publish.title, "Sync tokens");
    assert_eq!(config.publish.labels, vec!["tokens"]);
}

#[test]
#[serial]
fn missing_keys_fall_back_to_reference_configuration() {
    env::remove_var("GITHUB_BRANCH");
    let file = config_file("publish:\n  base_branch: release\n");

    let config = load_config(Some(file.path())).expect("Config should load");

    assert_eq!(config.publish.base_branch, "release");
    assert_eq!(config.publish.labels, vec!["design-tokens", "auto-generated"]);
    let destinations: Vec<&str> = config.targets.iter().map(|t| t.destination.as_str()).collect();
    assert_eq!(
        destinations,
        vec!["output/tokens.css", "output/tokens.scss", "output/tokens.js"]
    );
}

#[test]
#[serial]
fn no_file_and_empty_file_use_defaults() {
    env::remove_var("GITHUB_BRANCH");
    let defaults = load_config(None).expect("defaults");
    let empty = load_config(Some(config_file("").path())).expect("empty file");
    assert_eq!(defaults, empty);
    assert_eq!(defaults.publish.base_branch, "main");
}

#[test]
#[serial]
fn github_branch_env_overrides_base_branch() {
    let file = config_file("publish:\n  base_branch: develop\n");
    env::set_var("GITHUB_BRANCH", "staging");

    let config = load_config(Some(file.path()));
    env::remove_var("GITHUB_BRANCH");

    assert_eq!(config.expect("Config should load").publish.base_branch, "staging");
}

#[test]
#[serial]
fn unknown_format_is_rejected() {
    env::remove_var("GITHUB_BRANCH");
    let file = config_file("targets:\n  - destination: a.less\n    format: less/variables\n");
    let err = load_config(Some(file.path())).expect_err("should fail");
    assert!(format!("{err:#}").contains("Failed to parse config YAML"));
}

#[test]
#[serial]
fn missing_file_is_an_error() {
    let err = load_config(Some(std::path::Path::new("/definitely/missing.yaml"))).expect_err("missing");
    assert!(format!("{err:#}").contains("Failed to read config file"));
}
