#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn inkdesk(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("inkdesk").unwrap();
    cmd.current_dir(dir.path()).env("INKDESK_ROOT", dir.path());
    cmd
}

fn init_studio(dir: &TempDir) {
    inkdesk(dir)
        .args(["init", "--name", "Black Lotus"])
        .assert()
        .success();
}

// ---------------------------------------------------------------------------
// inkdesk init / config
// ---------------------------------------------------------------------------

#[test]
fn init_writes_config() {
    let dir = TempDir::new().unwrap();
    init_studio(&dir);

    let config = std::fs::read_to_string(dir.path().join(".inkdesk/config.yaml")).unwrap();
    assert!(config.contains("Black Lotus"));
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    init_studio(&dir);
    inkdesk(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:"));
}

#[test]
fn config_validate_warns_about_missing_url() {
    let dir = TempDir::new().unwrap();
    init_studio(&dir);
    inkdesk(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gateway.url"));
}

#[test]
fn config_show_json_has_effects() {
    let dir = TempDir::new().unwrap();
    init_studio(&dir);
    let output = inkdesk(&dir)
        .args(["--json", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["effects"]["bookings_collection"], "bookings");
    assert_eq!(json["studio"]["name"], "Black Lotus");
}

#[test]
fn commands_need_init() {
    let dir = TempDir::new().unwrap();
    inkdesk(&dir)
        .args(["dispatch", "create-booking", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

// ---------------------------------------------------------------------------
// inkdesk actions
// ---------------------------------------------------------------------------

#[test]
fn actions_lists_registry() {
    let dir = TempDir::new().unwrap();
    inkdesk(&dir)
        .arg("actions")
        .assert()
        .success()
        .stdout(predicate::str::contains("create-booking"))
        .stdout(predicate::str::contains("ai-suggest-slots"));
}

#[test]
fn actions_json_is_the_catalog() {
    let dir = TempDir::new().unwrap();
    let output = inkdesk(&dir).args(["actions", "--json"]).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 7);
    assert_eq!(json[0]["type"], "create-client");
}

// ---------------------------------------------------------------------------
// inkdesk dispatch
// ---------------------------------------------------------------------------

#[test]
fn dispatch_booking_offline() {
    let dir = TempDir::new().unwrap();
    init_studio(&dir);
    inkdesk(&dir)
        .args([
            "dispatch",
            "create-booking",
            "--offline",
            "--payload",
            r#"{"clientName":"Maria","style":"fine line"}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Booking request"))
        .stdout(predicate::str::contains("Maria"));
}

#[test]
fn offline_deposit_is_marked_offline() {
    let dir = TempDir::new().unwrap();
    init_studio(&dir);
    inkdesk(&dir)
        .args([
            "dispatch",
            "send-deposit",
            "--offline",
            "--payload",
            r#"{"bookingId":"b_9","amountCents":50000}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("(offline)"));
}

#[test]
fn dispatch_create_client_shows_form_seed() {
    let dir = TempDir::new().unwrap();
    init_studio(&dir);
    inkdesk(&dir)
        .args([
            "dispatch",
            "create-client",
            "--offline",
            "--payload",
            r#"{"email":"maria@example.com"}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Opened create-client form"))
        .stdout(predicate::str::contains("maria@example.com"));
}

#[test]
fn dispatch_unknown_type_fails() {
    let dir = TempDir::new().unwrap();
    init_studio(&dir);
    inkdesk(&dir)
        .args(["dispatch", "tattoo-everyone", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown action type"));
}

#[test]
fn dispatch_rejects_bad_payload() {
    let dir = TempDir::new().unwrap();
    init_studio(&dir);
    inkdesk(&dir)
        .args(["dispatch", "send-deposit", "--offline", "--payload", "[1,2]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid payload"));
}

#[test]
fn online_dispatch_without_url_explains_offline() {
    let dir = TempDir::new().unwrap();
    init_studio(&dir);
    inkdesk(&dir)
        .args(["dispatch", "create-quote"])
        .env_remove("INKDESK_GATEWAY_KEY")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--offline"));
}

// ---------------------------------------------------------------------------
// inkdesk interpret
// ---------------------------------------------------------------------------

#[test]
fn blank_interpret_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    init_studio(&dir);
    inkdesk(&dir)
        .args(["interpret", "   ", "--offline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to interpret"));
}

#[test]
fn offline_interpret_cannot_understand() {
    let dir = TempDir::new().unwrap();
    init_studio(&dir);
    inkdesk(&dir)
        .args(["interpret", "book Maria next Tuesday", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not understand the command"));
}

// ---------------------------------------------------------------------------
// inkdesk interpret against a backend
// ---------------------------------------------------------------------------

/// Point the studio's gateway at `server`.
fn connect_studio(dir: &TempDir, server: &mockito::Server) {
    init_studio(dir);
    let path = dir.path().join(".inkdesk/config.yaml");
    let mut config: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    config["gateway"]["url"] = serde_yaml::Value::String(server.url());
    std::fs::write(&path, serde_yaml::to_string(&config).unwrap()).unwrap();
}

/// The AI reads a booking request as a low-confidence deposit request.
fn misread_as_deposit(server: &mut mockito::Server) -> mockito::Mock {
    let reply = serde_json::json!({
        "action": "send-deposit",
        "payload": {"bookingId": "b_9", "amountCents": 50000},
        "confidence": 0.3
    });
    server
        .mock("POST", "/functions/v1/ai-chat")
        .with_status(200)
        .with_body(serde_json::json!({ "content": reply.to_string() }).to_string())
        .create()
}

#[test]
fn interpret_declined_at_prompt_dispatches_nothing() {
    let mut server = mockito::Server::new();
    let ai = misread_as_deposit(&mut server);
    let deposit = server
        .mock("POST", "/functions/v1/create-deposit-link")
        .expect(0)
        .create();

    let dir = TempDir::new().unwrap();
    connect_studio(&dir, &server);
    inkdesk(&dir)
        .args(["interpret", "book maria for a sleeve"])
        .env("INKDESK_GATEWAY_KEY", "test-key")
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Proposed: send-deposit (30% confident)"))
        .stdout(predicate::str::contains("Not dispatched."));

    ai.assert();
    deposit.assert();
}

#[test]
fn interpret_refuses_a_proposal_other_than_the_confirmed_type() {
    let mut server = mockito::Server::new();
    let _ai = misread_as_deposit(&mut server);
    let deposit = server
        .mock("POST", "/functions/v1/create-deposit-link")
        .expect(0)
        .create();

    let dir = TempDir::new().unwrap();
    connect_studio(&dir, &server);
    inkdesk(&dir)
        .args([
            "interpret",
            "book maria for a sleeve",
            "--confirm",
            "create-booking",
        ])
        .env("INKDESK_GATEWAY_KEY", "test-key")
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing dispatched"));

    deposit.assert();
}

#[test]
fn interpret_dispatches_after_yes_at_prompt() {
    let mut server = mockito::Server::new();
    let reply = serde_json::json!({
        "action": "create-booking",
        "payload": {"clientName": "Maria"},
        "confidence": 0.9
    });
    let _ai = server
        .mock("POST", "/functions/v1/ai-chat")
        .with_status(200)
        .with_body(serde_json::json!({ "content": reply.to_string() }).to_string())
        .create();
    let booking = server
        .mock("POST", "/rest/v1/bookings")
        .match_body(mockito::Matcher::PartialJson(
            serde_json::json!({"clientName": "Maria", "status": "requested"}),
        ))
        .with_status(201)
        .with_body(r#"[{"id":"b_1","clientName":"Maria"}]"#)
        .expect(1)
        .create();
    let _audit = server
        .mock("POST", "/rest/v1/action_log")
        .with_status(201)
        .with_body("[{}]")
        .create();

    let dir = TempDir::new().unwrap();
    connect_studio(&dir, &server);
    inkdesk(&dir)
        .args(["interpret", "book Maria"])
        .env("INKDESK_GATEWAY_KEY", "test-key")
        .write_stdin("y\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Booking request"));

    booking.assert();
}

#[test]
fn interpret_rejects_unknown_confirm_type_before_calling_out() {
    let dir = TempDir::new().unwrap();
    init_studio(&dir);
    inkdesk(&dir)
        .args(["interpret", "book Maria", "--offline", "--confirm", "tattoo-everyone"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown action type"));
}
