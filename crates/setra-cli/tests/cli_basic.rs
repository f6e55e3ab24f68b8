//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against a throwaway data directory.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "setra-cli", "--"])
        .args(args)
        .env("SETRA_DATA_DIR", data_dir)
        .env("SETRA_ENV", "dev")
        .env_remove("SETRA_API_URL")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).expect("stdout is not JSON")
}

#[test]
fn test_config_get_default_interval() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "refresh.interval_ms"]);
    assert_eq!(code, 0, "config get failed");
    assert_eq!(stdout.trim(), "5000");
}

#[test]
fn test_config_get_unknown_key() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["config", "get", "no.such.key"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_set_and_list() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["config", "set", "refresh.interval_ms", "2000"]);
    assert_eq!(code, 0, "config set failed");
    assert_eq!(stdout.trim(), "ok");

    let (stdout, _, code) = run_cli(dir.path(), &["config", "list"]);
    assert_eq!(code, 0, "config list failed");
    let config = json(&stdout);
    assert_eq!(config["refresh"]["interval_ms"], 2000);
    assert_eq!(config["api"]["base_url"], "http://localhost:3001");
}

#[test]
fn test_config_set_rejects_zero_interval() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["config", "set", "refresh.interval_ms", "0"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_refresh_pause_persists() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["refresh", "status"]);
    assert_eq!(code, 0, "refresh status failed");
    assert_eq!(json(&stdout)["state"], "running");

    let (stdout, _, code) = run_cli(dir.path(), &["refresh", "pause"]);
    assert_eq!(code, 0, "refresh pause failed");
    assert_eq!(json(&stdout)["state"], "paused");

    let (stdout, _, _) = run_cli(dir.path(), &["refresh", "status"]);
    assert_eq!(json(&stdout)["state"], "paused");

    let (stdout, _, code) = run_cli(dir.path(), &["refresh", "resume"]);
    assert_eq!(code, 0, "refresh resume failed");
    assert_eq!(json(&stdout)["state"], "running");
}

#[test]
fn test_access_check_operator_on_users_page() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(
        dir.path(),
        &["access", "check", "/users", "--roles", "operator"],
    );
    assert_eq!(code, 0, "access check failed");
    let report = json(&stdout);
    assert_eq!(report["decision"], "denied");
    assert_eq!(report["redirect_to"], "/chats");
    assert_eq!(report["navigation"][0]["kind"], "redirect");
    assert_eq!(report["navigation"][0]["path"], "/chats");
}

#[test]
fn test_access_check_anonymous_goes_to_login() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["access", "check", "/chats"]);
    assert_eq!(code, 0, "access check failed");
    let report = json(&stdout);
    assert_eq!(report["decision"], "denied");
    assert_eq!(report["redirect_to"], "/login");
}

#[test]
fn test_access_pages_for_operator() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["access", "pages", "--roles", "operator"]);
    assert_eq!(code, 0, "access pages failed");
    let pages = json(&stdout);
    let pages = pages.as_array().unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0]["path"], "/chats");
}

#[test]
fn test_access_landing() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["access", "landing", "--roles", "support"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "/");

    let (stdout, _, _) = run_cli(dir.path(), &["access", "landing", "--roles", "guest"]);
    assert_eq!(stdout.trim(), "/login");
}

#[test]
fn test_auth_status_without_token() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["auth", "status"]);
    assert_eq!(code, 0, "auth status failed");
    assert_eq!(json(&stdout)["identity"]["status"], "anonymous");
}

#[test]
fn test_chats_require_sign_in() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["chats", "list"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_config_effective_and_path() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["config", "effective"]);
    assert_eq!(code, 0, "config effective failed");
    let effective = json(&stdout);
    assert_eq!(effective["api_url"], "http://localhost:3001");
    assert_eq!(effective["refresh_interval_ms"], 5000);
    assert_eq!(effective["auto_refresh"], true);

    let (stdout, _, code) = run_cli(dir.path(), &["config", "path"]);
    assert_eq!(code, 0);
    assert!(stdout.trim().ends_with("config.toml"));
}

/// Persist an unsigned token carrying `roles`, the way `auth login` leaves it.
fn store_token(data_dir: &Path, roles: &[&str]) {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;

    let claims = serde_json::json!({
        "sub": "u7",
        "email": "op@example.com",
        "roles": roles,
    });
    let token = format!(
        "{}.{}.signature",
        URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    );
    let storage = serde_json::json!({ "authToken": token });
    std::fs::write(
        data_dir.join("local-storage.json"),
        serde_json::to_string(&storage).unwrap(),
    )
    .unwrap();
}

/// Same as [`run_cli`] but pointed at a mock backend.
fn run_cli_against(data_dir: &Path, api_url: &str, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "setra-cli", "--"])
        .args(args)
        .env("SETRA_DATA_DIR", data_dir)
        .env("SETRA_ENV", "dev")
        .env("SETRA_API_URL", api_url)
        .output()
        .expect("Failed to execute CLI command");
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

#[test]
fn test_operator_is_kept_out_of_user_management() {
    let mut server = mockito::Server::new();
    let _me = server
        .mock("GET", "/users/me")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"u7","email":"op@example.com","name":"Operadora"}"#)
        .create();
    let users = server.mock("GET", "/users").expect(0).create();
    let metrics = server.mock("GET", "/dashboard/metrics").expect(0).create();

    let dir = tempfile::tempdir().unwrap();
    store_token(dir.path(), &["operator"]);

    let (stdout, stderr, code) = run_cli_against(dir.path(), &server.url(), &["users", "list"]);
    assert_eq!(code, 1, "operator listed users: {stdout}");
    assert!(stderr.contains("redirected to /chats"), "stderr: {stderr}");

    let (_, stderr, code) = run_cli_against(dir.path(), &server.url(), &["metrics"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("redirected to /chats"), "stderr: {stderr}");

    users.assert();
    metrics.assert();
}

#[test]
fn test_operator_can_list_chats() {
    let mut server = mockito::Server::new();
    let _me = server
        .mock("GET", "/users/me")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"u7","email":"op@example.com","name":"Operadora"}"#)
        .create();
    let _conversations = server
        .mock("GET", "/conversations")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .create();

    let dir = tempfile::tempdir().unwrap();
    store_token(dir.path(), &["operator"]);

    let (stdout, stderr, code) = run_cli_against(dir.path(), &server.url(), &["chats", "list"]);
    assert_eq!(code, 0, "chats list failed: {stderr}");
    assert_eq!(json(&stdout), serde_json::json!([]));
}

#[test]
fn test_refresh_pause_refused_while_watch_owns_state() {
    let dir = tempfile::tempdir().unwrap();
    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64;
    // ahead of now so the lease outlives `cargo run` start-up
    let storage = serde_json::json!({
        "auto-refresh-owner": (now_ms + 2_000).to_string(),
        "auto-refresh-paused": "false",
    });
    let path = dir.path().join("local-storage.json");
    std::fs::write(&path, storage.to_string()).unwrap();

    let (stdout, stderr, code) = run_cli(dir.path(), &["refresh", "pause"]);
    assert_eq!(code, 1, "pause went through: {stdout}");
    assert!(stderr.contains("owned by a running `setra watch`"), "stderr: {stderr}");

    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(stored["auto-refresh-paused"], "false");
}
