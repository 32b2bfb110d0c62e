// tests/config_loading.rs

use std::time::Duration;

use upkeep::config::{load_or_init, parse_config, WebhookSection};
use upkeep::config::loader::write_default;
use upkeep::errors::UpkeepError;
use upkeep::update::CheckSchedule;

const FULL_CONFIG: &str = r#"
[process]
artifact = "server/app.jar"
runtime = "java"
runtime_args = ["-Xmx2G"]
inject_arg = "-javaagent:{shim}={payload}"
invoke_args = ["-jar", "{artifact}"]

[update]
check_interval_minutes = 5
asset_pattern = "server-.*\\.jar"

[github]
owner = "acme"
repo = "server"

[self_update]
enabled = false
asset_pattern = "upkeep-.*"

[webhook]
logging_url = "https://discord.com/api/webhooks/123456/token-abc"

[shim]
source = "shims/upkeep-shim.jar"
"#;

#[test]
fn test_missing_config_is_created_and_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Upkeep.toml");

    match load_or_init(&path) {
        Err(UpkeepError::ConfigCreated(reported)) => {
            assert!(reported.contains("Upkeep.toml"));
        }
        other => panic!("expected ConfigCreated, got {other:?}"),
    }
    assert!(path.exists());

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("[process]"));
    assert!(contents.contains("[github]"));

    // The freshly written defaults have no repository coordinates, so the
    // next load still refuses to run until the operator fills them in.
    match load_or_init(&path) {
        Err(UpkeepError::ConfigError(msg)) => {
            assert!(msg.contains("owner"));
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn test_write_default_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Upkeep.toml");
    std::fs::write(&path, "# hand-edited").unwrap();

    match write_default(&path) {
        Err(UpkeepError::ConfigError(msg)) => assert!(msg.contains("refusing to overwrite")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "# hand-edited");
}

#[test]
fn test_full_config_parses() {
    let cfg = parse_config(FULL_CONFIG).unwrap();

    assert_eq!(cfg.process.artifact, "server/app.jar");
    assert_eq!(cfg.process.runtime, "java");
    assert_eq!(cfg.process.runtime_args, vec!["-Xmx2G"]);
    assert_eq!(cfg.update.check_interval_minutes, 5);
    assert_eq!(cfg.github.owner, "acme");
    assert_eq!(cfg.github.repo, "server");
    assert!(!cfg.self_update.enabled);
    assert_eq!(cfg.shim.source, "shims/upkeep-shim.jar");

    assert!(cfg.asset_regex().is_match("server-1.2.jar"));
    assert!(!cfg.asset_regex().is_match("sources.zip"));
    assert!(cfg.self_update_regex().is_match("upkeep-linux-x86_64"));

    let creds = cfg.webhook.credentials().unwrap();
    assert_eq!(creds.id, "123456");
    assert_eq!(creds.token, "token-abc");
}

#[test]
fn test_minimal_config_fills_defaults() {
    let cfg = parse_config(
        r#"
[process]
artifact = "app.jar"

[update]
check_interval_minutes = 0
"#,
    )
    .unwrap();

    assert_eq!(cfg.process.runtime, "java");
    assert_eq!(cfg.process.inject_arg, "-javaagent:{shim}={payload}");
    assert_eq!(cfg.process.invoke_args, vec!["-jar", "{artifact}"]);
    assert!(cfg.asset_regex().is_match("anything.jar"));
    assert!(cfg.webhook.credentials().is_none());
}

#[test]
fn test_missing_artifact_is_rejected() {
    match parse_config("") {
        Err(UpkeepError::ConfigError(msg)) => assert!(msg.contains("[process].artifact")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn test_invalid_asset_pattern_is_rejected() {
    let result = parse_config(
        r#"
[process]
artifact = "app.jar"

[update]
check_interval_minutes = 0
asset_pattern = "(["
"#,
    );
    match result {
        Err(UpkeepError::ConfigError(msg)) => {
            assert!(msg.contains("[update].asset_pattern"));
            assert!(msg.contains("not a valid regex"));
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn test_inject_arg_must_keep_both_placeholders() {
    let result = parse_config(
        r#"
[process]
artifact = "app.jar"
inject_arg = "-javaagent:{shim}"

[update]
check_interval_minutes = 0
"#,
    );
    match result {
        Err(UpkeepError::ConfigError(msg)) => assert!(msg.contains("{payload}")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn test_invoke_args_must_reference_the_artifact() {
    let result = parse_config(
        r#"
[process]
artifact = "app.jar"
invoke_args = ["-jar", "app.jar"]

[update]
check_interval_minutes = 0
"#,
    );
    match result {
        Err(UpkeepError::ConfigError(msg)) => assert!(msg.contains("{artifact}")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn test_github_coordinates_required_only_when_checking() {
    // Polling enabled without coordinates: rejected.
    let result = parse_config(
        r#"
[process]
artifact = "app.jar"

[update]
check_interval_minutes = 10
"#,
    );
    match result {
        Err(UpkeepError::ConfigError(msg)) => assert!(msg.contains("[github]")),
        other => panic!("expected ConfigError, got {other:?}"),
    }

    // Checking disabled: the same config is fine.
    assert!(parse_config(
        r#"
[process]
artifact = "app.jar"

[update]
check_interval_minutes = -1
"#,
    )
    .is_ok());
}

#[test]
fn test_webhook_url_must_carry_both_credential_segments() {
    let result = parse_config(
        r#"
[process]
artifact = "app.jar"

[update]
check_interval_minutes = 0

[webhook]
logging_url = "nope"
"#,
    );
    match result {
        Err(UpkeepError::ConfigError(msg)) => assert!(msg.contains("[webhook]")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn test_webhook_credentials_take_the_last_two_segments() {
    let section = WebhookSection {
        logging_url: "https://discord.com/api/webhooks/123456/tok-en/".to_string(),
    };
    let creds = section.credentials().unwrap();
    assert_eq!(creds.id, "123456");
    assert_eq!(creds.token, "tok-en");

    let empty = WebhookSection {
        logging_url: "  ".to_string(),
    };
    assert!(empty.credentials().is_none());

    let single = WebhookSection {
        logging_url: "nope".to_string(),
    };
    assert!(single.credentials().is_none());
}

#[test]
fn test_check_schedule_mapping() {
    assert_eq!(
        CheckSchedule::from_minutes(10),
        CheckSchedule::Every(Duration::from_secs(600))
    );
    assert_eq!(CheckSchedule::from_minutes(1), CheckSchedule::Every(Duration::from_secs(60)));
    assert_eq!(CheckSchedule::from_minutes(0), CheckSchedule::FirstStartOnly);
    assert_eq!(CheckSchedule::from_minutes(-1), CheckSchedule::Disabled);
    assert_eq!(CheckSchedule::from_minutes(-100), CheckSchedule::Disabled);
}
