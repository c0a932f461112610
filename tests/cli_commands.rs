mod common;

use common::TestContext;
use predicates::prelude::*;
use serde_json::json;

#[test]
fn help_lists_options() {
    let ctx = TestContext::new();
    ctx.cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--parameters"))
        .stdout(predicate::str::contains("--glance-host"))
        .stdout(predicate::str::contains("--glance-port"));
}

#[test]
fn version_succeeds() {
    let ctx = TestContext::new();
    ctx.cli().arg("--version").assert().success().stdout(predicate::str::contains("prebake"));
}

#[test]
fn missing_arguments_is_usage_error() {
    let ctx = TestContext::new();
    ctx.cli().assert().code(1).stderr(predicate::str::contains("Usage"));
}

#[test]
fn invalid_port_is_usage_error() {
    let ctx = TestContext::new();
    ctx.cli()
        .args(["in.template", "out.template", "--glance-port", "not-a-port"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--glance-port"));
}

/// Port with nothing listening, so any run past the privilege check fails to connect.
fn closed_port() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port().to_string()
}

#[test]
fn failed_run_exits_with_error_and_writes_nothing() {
    let ctx = TestContext::new();
    let input = ctx.write_template("mytemplate.template", &json!({"Resources": {}}));

    ctx.cli()
        .arg(&input)
        .arg(ctx.output_path())
        .args(["-H", "127.0.0.1", "-P", &closed_port()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ERROR"))
        .stderr(
            predicate::str::contains("administrative privileges")
                .or(predicate::str::contains("Cannot connect to image registry")),
        );
    assert!(!ctx.output_path().exists());
}

#[test]
fn debug_flag_enables_debug_logging() {
    let ctx = TestContext::new();
    let input = ctx.write_template("mytemplate.template", &json!({"Resources": {}}));

    ctx.cli()
        .arg(&input)
        .arg(ctx.output_path())
        .args(["-H", "127.0.0.1", "-P", &closed_port(), "-d"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("DEBUG"))
        .stderr(predicate::str::contains("Converting"));
}

#[test]
fn default_logging_omits_debug_lines() {
    let ctx = TestContext::new();
    let input = ctx.write_template("mytemplate.template", &json!({"Resources": {}}));

    ctx.cli()
        .arg(&input)
        .arg(ctx.output_path())
        .args(["-H", "127.0.0.1", "-P", &closed_port()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("DEBUG").not());
}
