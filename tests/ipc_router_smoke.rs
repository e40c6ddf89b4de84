use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_labdocsd");
    let mut child = Command::new(exe)
        .env_remove("LABDOCSD_WORKSPACE")
        .env_remove("LABDOCSD_ADMIN_SECRET")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn labdocsd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> &str {
    assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false), "{}", value);
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

#[test]
fn router_dispatch_smoke() {
    let workspace = temp_dir("labdocs-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health["version"].is_string());
    assert!(health["workspacePath"].is_null());

    for (i, method) in [
        "teachers.list",
        "teachers.overview",
        "practices.search",
        "stats.get",
        "reports.practicesPdf",
    ]
    .iter()
    .enumerate()
    {
        let resp = request(&mut stdin, &mut reader, &format!("nw{i}"), method, json!({}));
        assert_eq!(error_code(&resp), "no_workspace", "{}", method);
    }

    let unknown = request(&mut stdin, &mut reader, "2", "classes.list", json!({}));
    assert_eq!(error_code(&unknown), "not_implemented");

    let missing_path = request(&mut stdin, &mut reader, "3", "workspace.select", json!({}));
    assert_eq!(error_code(&missing_path), "bad_params");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert!(workspace.join("lab_management.db").is_file());
    assert!(workspace.join("uploads").is_dir());

    let health = request_ok(&mut stdin, &mut reader, "5", "health", json!({}));
    assert_eq!(
        health["workspacePath"].as_str(),
        Some(workspace.to_string_lossy().as_ref())
    );

    let empty_search = request(
        &mut stdin,
        &mut reader,
        "6",
        "practices.search",
        json!({ "term": "" }),
    );
    assert_eq!(error_code(&empty_search), "validation_failed");

    let no_hits = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "practices.search",
        json!({ "term": "anything" }),
    );
    assert_eq!(no_hits["practices"], json!([]));

    let not_found = request(
        &mut stdin,
        &mut reader,
        "8",
        "practices.get",
        json!({ "practiceId": 404 }),
    );
    assert_eq!(error_code(&not_found), "not_found");

    let empty_report = request(
        &mut stdin,
        &mut reader,
        "9",
        "reports.practicesPdf",
        json!({ "practiceIds": [] }),
    );
    assert_eq!(error_code(&empty_report), "validation_failed");

    let closed = request_ok(&mut stdin, &mut reader, "10", "workspace.close", json!({}));
    assert_eq!(closed["closed"], json!(true));
    let after_close = request(&mut stdin, &mut reader, "11", "stats.get", json!({}));
    assert_eq!(error_code(&after_close), "no_workspace");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn malformed_json_gets_error_line_and_loop_continues() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse error line");
    assert_eq!(value["error"]["code"], json!("bad_json"));

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health["version"].is_string());

    drop(stdin);
    let _ = child.wait();
}
