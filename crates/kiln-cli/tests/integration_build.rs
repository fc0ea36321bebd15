//! End-to-end production builds: entry resolution, orchestration and the
//! manifest on disk.

mod common;

use common::{project, write, FakeBundler};
use kiln_cli::build::{BuildPlan, JsonDescriptionFactory, Orchestrator, RunStatus};
use kiln_cli::cli::{BuildArgs, GlobalArgs};
use kiln_cli::config::{EntryPattern, KilnConfig, RunMode};
use kiln_cli::entry::EntryResolver;
use kiln_cli::manifest::{Manifest, ManifestStore};
use std::sync::Arc;

async fn run(config: KilnConfig, bundler: FakeBundler, ssr: bool) -> (RunStatus, Arc<Orchestrator>) {
    let config = Arc::new(config);
    let entries = EntryResolver::from_config(&config)
        .resolve(&config.entries)
        .await
        .unwrap();
    let plan = BuildPlan::new(
        &JsonDescriptionFactory::new(),
        &config,
        RunMode::production(ssr),
        &entries,
    )
    .unwrap();

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&config),
        Arc::new(bundler),
        ManifestStore::for_config(&config),
    ));
    (orchestrator.run(&plan).await, orchestrator)
}

#[tokio::test]
async fn test_conventional_entry_builds_and_records_manifest() {
    let temp = project();
    let config = KilnConfig::default_config(temp.path().to_path_buf());

    let (status, orchestrator) = run(config, FakeBundler::clean(), false).await;
    assert_eq!(status, RunStatus::Success);

    // In-memory accessor and the file on disk agree
    let in_memory = orchestrator.manifest().accessor().get();
    assert_eq!(in_memory.assets_urls, vec!["bundle-index.0.js"]);

    let from_disk = ManifestStore::new(temp.path().join("public/stats.json"))
        .read()
        .await
        .unwrap();
    assert_eq!(*from_disk, *in_memory);
}

#[tokio::test]
async fn test_build_errors_fail_the_run() {
    let temp = project();
    let config = KilnConfig::default_config(temp.path().to_path_buf());

    let (status, _) = run(config, FakeBundler::failing(1), false).await;
    assert_eq!(status, RunStatus::Failure);
    assert_eq!(status.code(), 1);
}

#[tokio::test]
async fn test_ssr_run_builds_both_targets() {
    let temp = project();
    let bundler = FakeBundler::clean();
    let config = KilnConfig::default_config(temp.path().to_path_buf());

    let (status, orchestrator) = run(config, bundler, true).await;
    assert_eq!(status, RunStatus::Success);
    assert!(orchestrator.state().is_ready());
}

#[tokio::test]
async fn test_named_entries_and_styles() {
    let temp = project();
    write(temp.path(), "src/admin/main.ts", "");
    write(temp.path(), "src/styles/index.scss", "");
    write(temp.path(), "src/styles/index-print.scss", "");

    let mut config = KilnConfig::default_config(temp.path().to_path_buf());
    config.entries = vec![
        EntryPattern::base("src/index.tsx"),
        EntryPattern::entry("src/admin/**/*.ts", "admin"),
        EntryPattern::styles("src/styles/*.scss", None),
    ];

    let entries = EntryResolver::from_config(&config)
        .resolve(&config.entries)
        .await
        .unwrap();
    let names: Vec<_> = entries.names().collect();
    assert_eq!(names, vec!["admin", "index", "style", "style-print"]);
}

#[tokio::test]
async fn test_missing_entries_are_a_configuration_error() {
    let temp = tempfile::TempDir::new().unwrap();
    let config = KilnConfig::default_config(temp.path().to_path_buf());

    let result = EntryResolver::from_config(&config)
        .resolve(&config.entries)
        .await;
    assert!(matches!(
        result,
        Err(kiln_cli::CliError::Config(kiln_cli::ConfigError::NoEntries { .. }))
    ));
}

/// Stand-in bundler: prints stats JSON, with an error when `src/broken` exists.
#[cfg(unix)]
const FAKE_BUNDLER: &str = r#"
if [ -e src/broken ]; then
  printf '{"errors":["Module not found: ./missing"],"assets":[]}'
  exit 1
fi
case "$2" in
  *server*) printf '{"errors":[],"assets":[{"name":"server.js","size":2048}]}' ;;
  *) printf 'webpack 5\n{"errors":[],"warnings":[],"assets":[{"name":"frontend/bundle-index.js","size":1024}],"chunks":[]}' ;;
esac
"#;

#[cfg(unix)]
fn command_project() -> tempfile::TempDir {
    let temp = project();
    write(temp.path(), "fake-bundler.sh", FAKE_BUNDLER);
    write(
        temp.path(),
        "kiln.config.json",
        r#"{ "bundler": { "command": "sh", "args": ["fake-bundler.sh"] } }"#,
    );
    temp
}

#[cfg(unix)]
#[tokio::test]
#[serial_test::serial]
async fn test_build_command_with_external_bundler() {
    let temp = command_project();
    let global = GlobalArgs {
        cwd: Some(temp.path().to_path_buf()),
        ..Default::default()
    };

    let status = kiln_cli::commands::build_execute(
        BuildArgs {
            ssr: true,
            ..Default::default()
        },
        &global,
    )
    .await
    .unwrap();
    assert_eq!(status, RunStatus::Success);

    let stats = std::fs::read_to_string(temp.path().join("public/stats.json")).unwrap();
    let manifest: Manifest = serde_json::from_str(&stats).unwrap();
    assert_eq!(manifest.assets_urls, vec!["frontend/bundle-index.js"]);
    assert!(temp.path().join(".kiln/server.production.json").exists());
}

#[cfg(unix)]
#[tokio::test]
#[serial_test::serial]
async fn test_build_command_fails_on_compile_errors() {
    let temp = command_project();
    write(temp.path(), "src/broken", "");
    let global = GlobalArgs {
        cwd: Some(temp.path().to_path_buf()),
        ..Default::default()
    };

    let status = kiln_cli::commands::build_execute(BuildArgs::default(), &global)
        .await
        .unwrap();
    assert_eq!(status, RunStatus::Failure);
}
