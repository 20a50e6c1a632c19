use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "settings": state.settings.to_json(),
            "openSessions": state.dialogs.len(),
        }),
    )
}

fn handle_settings_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "settings": state.settings.to_json() }))
}

fn handle_settings_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    if !req.params.is_object() {
        return err(&req.id, "bad_params", "params must be an object", None);
    }
    match state.settings.apply_patch(&req.params) {
        Ok(()) => {
            tracing::info!(settings = %state.settings.to_json(), "settings updated");
            // Open dialogs keep the grouping they were opened with until reloaded.
            ok(&req.id, json!({ "settings": state.settings.to_json() }))
        }
        Err(e) => err(&req.id, "bad_params", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "settings.get" => Some(handle_settings_get(state, req)),
        "settings.update" => Some(handle_settings_update(state, req)),
        _ => None,
    }
}
