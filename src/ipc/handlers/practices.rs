use crate::ipc::error::{ok, service_err};
use crate::ipc::helpers::{required_i64, required_str, session, str_or_empty};
use crate::ipc::types::{AppState, Request};
use crate::records::{self, PracticeSubmission};
use serde_json::json;

fn handle_practices_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let mut submission = PracticeSubmission::default();
    for (key, slot) in [
        ("teacherName", &mut submission.teacher_name),
        ("subject", &mut submission.subject),
        ("title", &mut submission.title),
        ("objective", &mut submission.objective),
        ("filePath", &mut submission.source_path),
    ] {
        match str_or_empty(req, key) {
            Ok(v) => *slot = v,
            Err(e) => return e,
        }
    }
    let session = match session(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };

    let practice = match records::submit_practice(session, state.extractor.as_ref(), &submission)
        .and_then(|id| records::get_practice_by_id(session, id))
    {
        Ok(p) => p,
        Err(e) => return service_err(&req.id, &e),
    };
    state
        .activity
        .record(format!("New practice added: {}", practice.title));
    ok(
        &req.id,
        json!({ "practiceId": practice.id, "practice": practice }),
    )
}

fn handle_practices_search(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match session(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let term = match str_or_empty(req, "term") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match records::search_practices(session, &term) {
        Ok(rows) => ok(&req.id, json!({ "practices": rows })),
        Err(e) => service_err(&req.id, &e),
    }
}

fn handle_practices_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match session(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let id = match required_i64(req, "practiceId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match records::get_practice_by_id(session, id) {
        Ok(practice) => ok(&req.id, json!({ "practice": practice })),
        Err(e) => service_err(&req.id, &e),
    }
}

fn handle_practices_by_teacher(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match session(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let name = match required_str(req, "teacherName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match records::get_practices_by_teacher(session, &name) {
        Ok(rows) => ok(&req.id, json!({ "practices": rows })),
        Err(e) => service_err(&req.id, &e),
    }
}

fn handle_stats_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match session(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match records::compute_statistics(session) {
        Ok(stats) => ok(&req.id, json!(stats)),
        Err(e) => service_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "practices.submit" => Some(handle_practices_submit(state, req)),
        "practices.search" => Some(handle_practices_search(state, req)),
        "practices.get" => Some(handle_practices_get(state, req)),
        "practices.byTeacher" => Some(handle_practices_by_teacher(state, req)),
        "stats.get" => Some(handle_stats_get(state, req)),
        _ => None,
    }
}
