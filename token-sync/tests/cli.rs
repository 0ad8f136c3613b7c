use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use token_sync::cli::{run, Cli, Commands};
use tracing::field::{Field, Visit};
use tracing::Level;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{Layer, Registry};

const MANIFEST: &str = r##"{
  "color": {"primary": {"value": "#112233", "type": "color"}},
  "size": {"gap": {"value": "4", "type": "size"}}
}"##;

/// Creates a manifest and a config whose output directory lives in the same temp dir.
fn workspace(manifest: &str) -> TempDir {
    let dir = TempDir::new().expect("Creating temp dir failed");
    write(dir.path().join("tokens.json"), manifest).expect("Writing manifest failed");
    write(
        dir.path().join("config.yaml"),
        format!("output_dir: {}\n", dir.path().join("out").display()),
    )
    .expect("Writing config failed");
    dir
}

fn command() -> Command {
    let mut cmd = Command::cargo_bin("token-sync").expect("Binary exists");
    cmd.env_remove("GITHUB_BRANCH").env("RUST_LOG", "warn");
    cmd
}

#[test]
fn build_writes_artifacts_and_prints_json() {
    let dir = workspace(MANIFEST);

    command()
        .arg("build")
        .arg("--manifest")
        .arg(dir.path().join("tokens.json"))
        .arg("--config")
        .arg(dir.path().join("config.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"outputFiles\"").and(predicate::str::contains("output/tokens.css")));

    let css = std::fs::read_to_string(dir.path().join("out/output/tokens.css")).expect("css written");
    assert!(css.contains("--size-gap: 4px;"));
}

#[test]
fn sync_with_malformed_manifest_fails_at_validation() {
    let dir = workspace("{ definitely not json");

    // Dummy credentials: validation fails before any request is sent.
    command()
        .arg("sync")
        .arg("--manifest")
        .arg(dir.path().join("tokens.json"))
        .arg("--config")
        .arg(dir.path().join("config.yaml"))
        .env("GITHUB_TOKEN", "dummy")
        .env("GITHUB_OWNER", "acme")
        .env("GITHUB_REPO", "design")
        .env("GITHUB_API_URL", "http://127.0.0.1:9")
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"stage\": \"validate\"").and(predicate::str::contains("malformed manifest")));

    assert!(!dir.path().join("out").exists());
}

#[test]
fn sync_without_credentials_fails_early() {
    let dir = workspace(MANIFEST);

    command()
        .current_dir(dir.path())
        .arg("sync")
        .arg("--manifest")
        .arg(dir.path().join("tokens.json"))
        .env_remove("GITHUB_TOKEN")
        .env_remove("GITHUB_OWNER")
        .env_remove("GITHUB_REPO")
        .assert()
        .failure()
        .stderr(predicate::str::contains("GITHUB_TOKEN"));
}

#[test]
fn help_lists_subcommands() {
    command()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("sync")
                .and(predicate::str::contains("build"))
                .and(predicate::str::contains("preview")),
        );
}

/// Records the level and message of every event emitted on the current thread.
#[derive(Clone, Default)]
struct MessageLog {
    entries: Arc<Mutex<Vec<(Level, String)>>>,
}

struct MessageVisitor<'a>(&'a mut String);

impl Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.0 = format!("{value:?}");
        }
    }
}

impl<S: tracing::Subscriber> Layer<S> for MessageLog {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut message = String::new();
        event.record(&mut MessageVisitor(&mut message));
        self.entries
            .lock()
            .unwrap()
            .push((*event.metadata().level(), message));
    }
}

#[tokio::test]
async fn failed_build_still_emits_startup_events() {
    let log = MessageLog::default();
    let _guard = tracing::subscriber::set_default(Registry::default().with(log.clone()));

    // A missing manifest makes the build fail, after the start-up event.
    let result = run(Cli {
        command: Commands::Build {
            manifest: PathBuf::from("does-not-exist.json"),
            config: None,
        },
    })
    .await;
    assert!(result.is_err());

    let entries = log.entries.lock().unwrap();
    let infos: Vec<&str> = entries
        .iter()
        .filter(|(level, _)| *level == Level::INFO)
        .map(|(_, message)| message.as_str())
        .collect();
    assert_eq!(infos.first().copied(), Some("trace_initialised"), "{entries:?}");
    assert!(infos.contains(&"Building artifacts"), "{entries:?}");
}
