use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::session::Session;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// Missing or null string params read as empty; the record service decides
/// whether empty is acceptable.
pub fn str_or_empty(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(String::new()),
        Some(v) => v
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| err(&req.id, "bad_params", format!("{} must be a string", key), None)),
    }
}

pub fn required_i64(req: &Request, key: &str) -> Result<i64, serde_json::Value> {
    let v = req
        .params
        .get(key)
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))?;
    v.as_i64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
        .ok_or_else(|| err(&req.id, "bad_params", format!("{} must be an integer", key), None))
}

pub fn string_list(req: &Request, key: &str) -> Result<Vec<String>, serde_json::Value> {
    let Some(v) = req.params.get(key) else {
        return Ok(Vec::new());
    };
    let Some(items) = v.as_array() else {
        return Err(err(&req.id, "bad_params", format!("{} must be an array", key), None));
    };
    items
        .iter()
        .map(|item| {
            item.as_str().map(|s| s.to_string()).ok_or_else(|| {
                err(
                    &req.id,
                    "bad_params",
                    format!("{} must contain only strings", key),
                    None,
                )
            })
        })
        .collect()
}

pub fn session<'a>(state: &'a AppState, req: &Request) -> Result<&'a Session, serde_json::Value> {
    state
        .session
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}
