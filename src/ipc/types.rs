use std::collections::HashMap;

use serde::Deserialize;

use crate::assign::AssignDialog;
use crate::config::Settings;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub settings: Settings,
    /// Open assign dialogs keyed by session id. Nothing here outlives the
    /// process.
    pub dialogs: HashMap<String, AssignDialog>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            dialogs: HashMap::new(),
        }
    }
}
