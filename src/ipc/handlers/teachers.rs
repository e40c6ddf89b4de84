use crate::ipc::error::{ok, service_err};
use crate::ipc::helpers::{required_str, session, str_or_empty, string_list};
use crate::ipc::types::{AppState, Request};
use crate::records;
use serde_json::json;

fn handle_teachers_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match session(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match records::list_teacher_names(session) {
        Ok(names) => ok(&req.id, json!({ "teachers": names })),
        Err(e) => service_err(&req.id, &e),
    }
}

fn handle_teachers_overview(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match session(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    match records::list_teacher_overviews(session) {
        Ok(rows) => ok(&req.id, json!({ "teachers": rows })),
        Err(e) => service_err(&req.id, &e),
    }
}

fn handle_teachers_subjects(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match session(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let name = match required_str(req, "teacherName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match records::get_subjects_for_teacher(session, &name) {
        Ok(subjects) => ok(&req.id, json!({ "subjects": subjects })),
        Err(e) => service_err(&req.id, &e),
    }
}

fn handle_teachers_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = match str_or_empty(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subjects = match string_list(req, "subjects") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let password = match str_or_empty(req, "adminPassword") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let session = match session(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };

    let teacher =
        match records::add_teacher(session, state.verifier.as_ref(), &name, &subjects, &password) {
            Ok(t) => t,
            Err(e) => return service_err(&req.id, &e),
        };
    state
        .activity
        .record(format!("New teacher added: {}", teacher.name));
    ok(
        &req.id,
        json!({ "teacherId": teacher.id, "name": teacher.name, "subjects": teacher.subjects }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "teachers.list" => Some(handle_teachers_list(state, req)),
        "teachers.overview" => Some(handle_teachers_overview(state, req)),
        "teachers.subjects" => Some(handle_teachers_subjects(state, req)),
        "teachers.create" => Some(handle_teachers_create(state, req)),
        _ => None,
    }
}
