use crate::config::Settings;
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_classes, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::schedule::group_by_day_and_slot;
use serde_json::json;

fn schedule_group(settings: &Settings, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let classes = get_classes(params)?;
    let days = group_by_day_and_slot(&classes, settings);
    Ok(json!({ "days": days }))
}

fn handle_schedule_group(state: &mut AppState, req: &Request) -> serde_json::Value {
    match schedule_group(&state.settings, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schedule.group" => Some(handle_schedule_group(state, req)),
        _ => None,
    }
}
