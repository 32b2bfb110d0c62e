// tests/launch_plan.rs

use std::path::Path;

use upkeep::config::WebhookCredentials;
use upkeep::control::encode_injection_payload;
use upkeep::process::LaunchPlan;
use upkeep_test_utils::builders::ConfigFileBuilder;

#[test]
fn plan_orders_inject_runtime_invoke() {
    let cfg = ConfigFileBuilder::new("server/app.jar")
        .runtime_arg("-Xmx2G")
        .runtime_arg("-XX:+UseZGC")
        .build();

    let plan = LaunchPlan::build(
        &cfg,
        Path::new(".upkeep/upkeep-shim.jar"),
        "upkeep#9",
        Path::new("server/app.jar"),
    );

    assert_eq!(plan.program, "java");
    assert_eq!(
        plan.args,
        vec![
            "-javaagent:.upkeep/upkeep-shim.jar=upkeep#9",
            "-Xmx2G",
            "-XX:+UseZGC",
            "-jar",
            "server/app.jar",
        ]
    );
}

#[test]
fn custom_invoke_args_fill_the_artifact_placeholder() {
    let cfg = ConfigFileBuilder::new("bin/service")
        .runtime("dotnet")
        .inject_arg("--inject={shim},{payload}")
        .invoke_args(&["exec", "{artifact}", "--verbose"])
        .build();

    let plan = LaunchPlan::build(
        &cfg,
        Path::new("shim.dll"),
        "upkeep#3",
        Path::new("bin/service"),
    );

    assert_eq!(plan.program, "dotnet");
    assert_eq!(
        plan.args,
        vec!["--inject=shim.dll,upkeep#3", "exec", "bin/service", "--verbose"]
    );
}

#[test]
fn webhook_payload_flows_through_the_injection_argument() {
    let creds = WebhookCredentials {
        id: "123".to_string(),
        token: "tok".to_string(),
    };
    let payload = encode_injection_payload("upkeep#5", Some(&creds));

    let cfg = ConfigFileBuilder::new("app.jar").build();
    let plan = LaunchPlan::build(&cfg, Path::new("shim.jar"), &payload, Path::new("app.jar"));

    assert_eq!(plan.args[0], "-javaagent:shim.jar=upkeep#5/;/123%%tok");
}
