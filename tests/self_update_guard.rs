// tests/self_update_guard.rs
//
// `SelfUpdater::execute` replaces the running process, so these tests only
// exercise `prepare`, which must resolve everything fallible up front.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use upkeep::control::ControlRegistry;
use upkeep::errors::UpkeepError;
use upkeep::process::{LaunchPlan, Supervisor, SupervisorSettings};
use upkeep::release::ReleaseSource;
use upkeep::selfupdate::{cmdline, HelperLaunch, SelfUpdater};
use upkeep::workdir::WorkDir;
use upkeep_test_utils::builders::ReleaseBuilder;
use upkeep_test_utils::fake_launcher::FakeLauncher;
use upkeep_test_utils::fake_release::FakeReleaseSource;
use upkeep_test_utils::init_tracing;

struct Fixture {
    updater: SelfUpdater,
    workdir: WorkDir,
    source: Arc<FakeReleaseSource>,
}

fn make_fixture(dir: &Path, enabled: bool) -> Fixture {
    let source = Arc::new(FakeReleaseSource::new());

    let helper_src = dir.join("upkeep-helper");
    std::fs::write(&helper_src, b"helper binary").unwrap();

    let workdir = WorkDir::at(dir.join(".upkeep"));
    workdir.ensure().unwrap();

    let launcher = Arc::new(FakeLauncher::new());
    let settings = SupervisorSettings {
        plan: LaunchPlan {
            program: "java".to_string(),
            args: vec![],
        },
        artifact: "app.jar".into(),
        discovery_name: "upkeep#1".to_string(),
        channel_grace: Duration::from_millis(10),
    };
    let supervisor = Supervisor::new(launcher, ControlRegistry::new(), settings);

    let updater = SelfUpdater::new(
        source.clone() as Arc<dyn ReleaseSource>,
        Regex::new("(?i)upkeep-.*").unwrap(),
        enabled,
        workdir.clone(),
        supervisor,
        helper_src,
    );
    Fixture {
        updater,
        workdir,
        source,
    }
}

#[tokio::test]
async fn disabled_self_update_is_rejected() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let fx = make_fixture(dir.path(), false);

    match fx.updater.prepare("v2.0").await {
        Err(UpkeepError::SelfUpdateDisabled) => {}
        other => panic!("expected SelfUpdateDisabled, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_tag_fails_before_any_side_effect() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let fx = make_fixture(dir.path(), true);

    match fx.updater.prepare("v9.9").await {
        Err(UpkeepError::ReleaseNotFound(tag)) => assert_eq!(tag, "v9.9"),
        other => panic!("expected ReleaseNotFound, got {other:?}"),
    }
    assert!(!fx.workdir.helper_path().exists());
}

#[tokio::test]
async fn release_without_a_binary_asset_is_rejected() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let fx = make_fixture(dir.path(), true);

    fx.source.insert_tag(
        ReleaseBuilder::new(3, "v3.0")
            .asset("app-v3.0.jar", "https://dl/app-v3.0.jar")
            .build(),
    );

    match fx.updater.prepare("v3.0").await {
        Err(UpkeepError::NoMatchingAsset(name)) => assert_eq!(name, "v3.0"),
        other => panic!("expected NoMatchingAsset, got {other:?}"),
    }
    assert!(!fx.workdir.helper_path().exists());
}

#[tokio::test]
async fn prepare_resolves_the_launch_and_installs_the_helper() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let fx = make_fixture(dir.path(), true);

    fx.source.insert_tag(
        ReleaseBuilder::new(4, "v4.0")
            .asset("app-v4.0.jar", "https://dl/app-v4.0.jar")
            .asset("upkeep-linux-x86_64", "https://dl/upkeep-linux")
            .build(),
    );

    let launch = fx.updater.prepare("v4.0").await.unwrap();

    assert_eq!(launch.helper, fx.workdir.helper_path());
    assert!(launch.helper.exists());
    assert_eq!(launch.supervisor_pid, std::process::id());
    assert_eq!(launch.binary, std::env::current_exe().unwrap());
    assert!(!launch.relaunch_cmd.trim().is_empty());
    assert_eq!(launch.download_url, "https://dl/upkeep-linux");
}

#[test]
fn helper_args_follow_the_expected_order() {
    let launch = HelperLaunch {
        helper: PathBuf::from("/work/.upkeep/upkeep-helper"),
        supervisor_pid: 42,
        binary: PathBuf::from("/usr/local/bin/upkeep"),
        relaunch_cmd: "upkeep --config Upkeep.toml".to_string(),
        download_url: "https://dl/upkeep-linux".to_string(),
    };
    assert_eq!(
        launch.args(),
        vec![
            "42".to_string(),
            "/usr/local/bin/upkeep".to_string(),
            "upkeep --config Upkeep.toml".to_string(),
            "https://dl/upkeep-linux".to_string(),
        ]
    );
}

#[test]
fn current_cmdline_reports_this_process() {
    let cmd = cmdline::current_cmdline().unwrap();
    assert!(!cmd.trim().is_empty());
}
