use crate::assign::{AssignDialog, CreditEntry, SelectionError};
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    get_classes, get_numeric_input, get_optional_bool, get_optional_str, get_required_bool,
    get_required_str, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::selection::SlotMode;
use serde_json::json;
use uuid::Uuid;

impl From<SelectionError> for HandlerErr {
    fn from(e: SelectionError) -> Self {
        let details = match &e {
            SelectionError::UnknownSlot(key) => json!({ "groupKey": key }),
            SelectionError::UnknownClass { group_key, class_id } => {
                json!({ "groupKey": group_key, "classId": class_id })
            }
        };
        HandlerErr {
            code: "not_found",
            message: e.to_string(),
            details: Some(details),
        }
    }
}

fn dialog_mut<'a>(
    state: &'a mut AppState,
    params: &serde_json::Value,
) -> Result<&'a mut AssignDialog, HandlerErr> {
    let session_id = get_required_str(params, "sessionId")?;
    state
        .dialogs
        .get_mut(&session_id)
        .ok_or_else(|| HandlerErr::not_found(format!("unknown selection session: {}", session_id)))
}

fn get_credit_entries(params: &serde_json::Value) -> Result<Vec<CreditEntry>, HandlerErr> {
    match params.get("credits") {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(raw) => serde_json::from_value(raw.clone())
            .map_err(|e| HandlerErr::bad_params(format!("invalid credits: {}", e))),
    }
}

fn selection_open(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let classes = get_classes(params)?;
    let course_id = get_optional_str(params, "courseId")?;
    let credits = get_credit_entries(params)?;
    let simple_mode = get_optional_bool(params, "simpleMode")?;

    let dialog = AssignDialog::open(&classes, course_id, &credits, simple_mode, &state.settings);
    let session_id = Uuid::new_v4().to_string();
    tracing::info!(
        session_id = %session_id,
        course_id = dialog.course_id().unwrap_or("-"),
        classes = classes.len(),
        simple_mode,
        "selection session opened"
    );
    let result = json!({
        "sessionId": session_id,
        "days": dialog.days(),
        "summary": dialog.summary(),
    });
    state.dialogs.insert(session_id, dialog);
    Ok(result)
}

fn selection_reload(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let classes = get_classes(params)?;
    let settings = state.settings;
    let dialog = dialog_mut(state, params)?;
    dialog.reload(&classes, &settings);
    Ok(json!({
        "days": dialog.days(),
        "summary": dialog.summary(),
    }))
}

fn selection_toggle_slot(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let group_key = get_required_str(params, "groupKey")?;
    let dialog = dialog_mut(state, params)?;
    let active = dialog.toggle_slot_active(&group_key)?;
    Ok(json!({ "active": active, "summary": dialog.summary() }))
}

fn selection_set_mode(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let group_key = get_required_str(params, "groupKey")?;
    let raw_mode = get_required_str(params, "mode")?;
    let mode = SlotMode::parse(&raw_mode)
        .ok_or_else(|| HandlerErr::bad_params("mode must be \"all\" or \"count\""))?;
    let dialog = dialog_mut(state, params)?;
    dialog.update_slot_mode(&group_key, mode)?;
    Ok(json!({ "summary": dialog.summary() }))
}

fn selection_set_count(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let group_key = get_required_str(params, "groupKey")?;
    let requested = get_numeric_input(params, "count")?;
    let dialog = dialog_mut(state, params)?;
    let applied = dialog.update_slot_count(&group_key, requested)?;
    Ok(json!({ "applied": applied, "summary": dialog.summary() }))
}

fn selection_toggle_class(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let group_key = get_required_str(params, "groupKey")?;
    let class_id = get_required_str(params, "classId")?;
    let currently_selected = get_required_bool(params, "currentlySelected")?;
    let dialog = dialog_mut(state, params)?;
    dialog.toggle_class_override(&group_key, &class_id, currently_selected)?;
    Ok(json!({ "summary": dialog.summary() }))
}

fn selection_set_details(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let start_date = get_optional_str(params, "startDate")?;
    let message = get_optional_str(params, "message")?;
    // Credits come from a free-text input; numbers are accepted too.
    let credits = match params.get("credits") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(_) => return Err(HandlerErr::bad_params("credits must be a string or number")),
    };
    let dialog = dialog_mut(state, params)?;
    if let Some(v) = start_date {
        dialog.set_start_date(&v);
    }
    if let Some(v) = message {
        dialog.set_message(&v);
    }
    if let Some(v) = credits {
        dialog.set_credits_input(&v);
    }
    Ok(json!({ "summary": dialog.summary() }))
}

fn selection_summary(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let dialog = dialog_mut(state, params)?;
    Ok(json!({ "summary": dialog.summary() }))
}

fn selection_confirm(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let session_id = get_required_str(params, "sessionId")?;
    let dialog = dialog_mut(state, params)?;
    let payload = dialog.confirm().map_err(|blockers| HandlerErr {
        code: "precondition_failed",
        message: "confirmation is not available yet".to_string(),
        details: Some(json!({ "blockers": blockers })),
    })?;
    state.dialogs.remove(&session_id);
    tracing::info!(
        session_id = %session_id,
        classes = payload.class_ids.len(),
        credits = payload.credits,
        "selection session confirmed"
    );
    Ok(json!({ "payload": payload }))
}

fn selection_close(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let session_id = get_required_str(params, "sessionId")?;
    let closed = state.dialogs.remove(&session_id).is_some();
    tracing::debug!(session_id = %session_id, closed, "selection session closed");
    Ok(json!({ "closed": closed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "selection.open" => selection_open(state, &req.params),
        "selection.reload" => selection_reload(state, &req.params),
        "selection.toggleSlot" => selection_toggle_slot(state, &req.params),
        "selection.setMode" => selection_set_mode(state, &req.params),
        "selection.setCount" => selection_set_count(state, &req.params),
        "selection.toggleClass" => selection_toggle_class(state, &req.params),
        "selection.setDetails" => selection_set_details(state, &req.params),
        "selection.summary" => selection_summary(state, &req.params),
        "selection.confirm" => selection_confirm(state, &req.params),
        "selection.close" => selection_close(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    })
}
