use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
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

fn write_sample_pdf(path: &Path, pages: usize) {
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for _ in 0..pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("save sample pdf");
}

fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return out;
    };
    for entry in entries.flatten() {
        let p = entry.path();
        if p.is_dir() {
            out.extend(files_under(&p));
        } else {
            out.push(p);
        }
    }
    out
}

#[test]
fn titration_lab_scenario_through_sidecar() {
    let workspace = temp_dir("labdocs-lifecycle");
    let sample = workspace.join("sample.pdf");
    write_sample_pdf(&sample, 3);
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "teachers.create",
        json!({
            "name": "Dr. Smith",
            "subjects": ["Chemistry", "Biology"],
            "adminPassword": "123"
        }),
    );
    assert!(created.get("teacherId").and_then(|v| v.as_i64()).is_some());

    let names = request_ok(&mut stdin, &mut reader, "3", "teachers.list", json!({}));
    assert_eq!(names["teachers"], json!(["Dr. Smith"]));

    let subjects = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "teachers.subjects",
        json!({ "teacherName": "Dr. Smith" }),
    );
    assert_eq!(subjects["subjects"], json!(["Chemistry", "Biology"]));

    let submitted = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "practices.submit",
        json!({
            "teacherName": "Dr. Smith",
            "subject": "Chemistry",
            "title": "Titration Lab",
            "objective": "",
            "filePath": sample.to_string_lossy()
        }),
    );
    let practice_id = submitted["practiceId"].as_i64().expect("practiceId");
    let practice = &submitted["practice"];
    assert_eq!(practice["numPages"], json!(3));
    assert_eq!(practice["teacherName"], json!("Dr. Smith"));
    let stored = PathBuf::from(practice["filePath"].as_str().expect("filePath"));
    assert!(stored.is_file());
    assert_eq!(
        stored.parent(),
        Some(workspace.join("uploads").join("Dr. Smith").join("Chemistry").as_path())
    );
    let stored_name = stored.file_name().expect("name").to_string_lossy().to_string();
    assert!(stored_name.starts_with("Titration_Lab_Chemistry_teacher"));
    assert!(stored_name.ends_with(".pdf"));

    let found = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "practices.search",
        json!({ "term": "Titration" }),
    );
    let hits = found["practices"].as_array().expect("practices");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["teacherName"], json!("Dr. Smith"));

    let missing = request(
        &mut stdin,
        &mut reader,
        "7",
        "practices.submit",
        json!({
            "teacherName": "Unknown Teacher",
            "subject": "Chemistry",
            "title": "Titration Lab",
            "filePath": sample.to_string_lossy()
        }),
    );
    assert_eq!(error_code(&missing), "not_found");

    let stats = request_ok(&mut stdin, &mut reader, "8", "stats.get", json!({}));
    assert_eq!(stats, json!({ "practiceCount": 1, "teacherCount": 1 }));
    assert_eq!(files_under(&workspace.join("uploads")).len(), 1);

    let fetched = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "practices.get",
        json!({ "practiceId": practice_id }),
    );
    assert_eq!(fetched["practice"]["title"], json!("Titration Lab"));
    for key in ["objective", "introduction", "summary", "development", "goals"] {
        assert!(fetched["practice"][key].is_string(), "missing {}", key);
    }

    let by_teacher = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "practices.byTeacher",
        json!({ "teacherName": "Dr. Smith" }),
    );
    assert_eq!(by_teacher["practices"].as_array().map(|a| a.len()), Some(1));

    let report = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "reports.practicesPdf",
        json!({ "practiceIds": [practice_id] }),
    );
    let report_path = PathBuf::from(report["path"].as_str().expect("report path"));
    assert_eq!(report_path.parent(), Some(workspace.as_path()));
    let report_name = report_path.file_name().expect("name").to_string_lossy().to_string();
    assert!(report_name.starts_with("practice_report_"));
    let doc = lopdf::Document::load(&report_path).expect("load report");
    assert_eq!(doc.get_pages().len(), 1);

    let activity = request_ok(&mut stdin, &mut reader, "12", "activity.recent", json!({}));
    let messages: Vec<&str> = activity["activities"]
        .as_array()
        .expect("activities")
        .iter()
        .filter_map(|a| a["message"].as_str())
        .collect();
    assert!(messages[0].starts_with("Report generated"));
    assert!(messages.contains(&"New practice added: Titration Lab"));
    assert!(messages.contains(&"New teacher added: Dr. Smith"));

    let overview = request_ok(&mut stdin, &mut reader, "13", "teachers.overview", json!({}));
    assert_eq!(overview["teachers"][0]["practiceCount"], json!(1));
    assert_eq!(overview["teachers"][0]["subjectCount"], json!(2));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn data_survives_sidecar_restart() {
    let workspace = temp_dir("labdocs-restart");
    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "2",
            "teachers.create",
            json!({ "name": "Ada", "subjects": ["Physics"], "adminPassword": "123" }),
        );
        let closed = request_ok(&mut stdin, &mut reader, "3", "workspace.close", json!({}));
        assert_eq!(closed["closed"], json!(true));
        drop(stdin);
        let _ = child.wait();
    }

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let names = request_ok(&mut stdin, &mut reader, "2", "teachers.list", json!({}));
    assert_eq!(names["teachers"], json!(["Ada"]));
    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
