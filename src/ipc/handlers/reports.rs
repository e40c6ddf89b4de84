use crate::ipc::error::{err, ok, service_err};
use crate::ipc::helpers::session;
use crate::ipc::types::{AppState, Request};
use crate::records;
use crate::report;
use serde_json::json;

fn practice_ids(req: &Request) -> Result<Vec<i64>, serde_json::Value> {
    let Some(items) = req.params.get("practiceIds").and_then(|v| v.as_array()) else {
        return Err(err(&req.id, "bad_params", "missing practiceIds", None));
    };
    items
        .iter()
        .map(|v| {
            v.as_i64().ok_or_else(|| {
                err(
                    &req.id,
                    "bad_params",
                    "practiceIds must contain integers",
                    Some(json!({ "value": v })),
                )
            })
        })
        .collect()
}

fn handle_reports_practices_pdf(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match session(state, req) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let ids = match practice_ids(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let practices = match ids
        .iter()
        .map(|id| records::get_practice_by_id(session, *id))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(v) => v,
        Err(e) => return service_err(&req.id, &e),
    };
    let path = match report::export_practice_report(&practices, session.workspace()) {
        Ok(p) => p,
        Err(e) => return service_err(&req.id, &e),
    };

    let path = path.to_string_lossy().to_string();
    state
        .activity
        .record(format!("Report generated: {}", path));
    ok(
        &req.id,
        json!({ "path": path, "practiceCount": practices.len() }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.practicesPdf" => Some(handle_reports_practices_pdf(state, req)),
        _ => None,
    }
}
