use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::session::Session;
use serde_json::json;
use std::path::PathBuf;

const DEFAULT_ACTIVITY_LIMIT: usize = 20;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state
                .session
                .as_ref()
                .map(|s| s.workspace().to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    // Only one session at a time; release the previous database first.
    state.close_session();
    match Session::open(&path) {
        Ok(session) => {
            state.session = Some(session);
            ok(&req.id, json!({ "workspacePath": path.to_string_lossy() }))
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:#}"), None),
    }
}

fn handle_workspace_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    let was_open = state.session.is_some();
    state.close_session();
    ok(&req.id, json!({ "closed": was_open }))
}

fn handle_activity_recent(state: &mut AppState, req: &Request) -> serde_json::Value {
    let limit = req
        .params
        .get("limit")
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    ok(
        &req.id,
        json!({ "activities": state.activity.recent(limit) }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "workspace.close" => Some(handle_workspace_close(state, req)),
        "activity.recent" => Some(handle_activity_recent(state, req)),
        _ => None,
    }
}
