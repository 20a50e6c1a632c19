use crate::config::Settings;
use crate::schedule::{find_slot, group_by_day_and_slot, iter_slots, ClassSession, DaySlotGroup, TimeSlotGroup};
use crate::selection::{confirm_blockers, insufficient_credits, Blocker, SelectionState, SlotMode};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditEntry {
    pub course_id: String,
    pub credits: f64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("unknown slot {0:?}")]
    UnknownSlot(String),
    #[error("class {class_id:?} is not part of slot {group_key:?}")]
    UnknownClass { group_key: String, class_id: String },
}

/// What the "assign students to course" call receives on confirm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignPayload {
    pub class_ids: Vec<String>,
    pub start_date: String,
    pub message: String,
    pub credits: i64,
}

/// Integer-field parse of free text: optional sign and leading digits after
/// trimming. Anything without a leading number reads as 0.
pub fn parse_credits(raw: &str) -> i64 {
    let t = raw.trim_start();
    let (neg, rest) = match t.as_bytes().first() {
        Some(b'-') => (true, &t[1..]),
        Some(b'+') => (false, &t[1..]),
        _ => (false, t),
    };
    let value = rest
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .fold(0i64, |acc, b| acc.saturating_mul(10).saturating_add(i64::from(b - b'0')));
    if neg {
        -value
    } else {
        value
    }
}

/// One opening of the assign dialog. Dropped on close or confirm.
#[derive(Debug, Clone)]
pub struct AssignDialog {
    course_id: Option<String>,
    days: Vec<DaySlotGroup>,
    state: SelectionState,
    credits_remaining: Option<f64>,
    simple_mode: bool,
    start_date: String,
    message: String,
    credits_input: String,
}

impl AssignDialog {
    pub fn open(
        classes: &[ClassSession],
        course_id: Option<String>,
        credits: &[CreditEntry],
        simple_mode: bool,
        settings: &Settings,
    ) -> Self {
        let credits_remaining = course_id.as_deref().and_then(|cid| {
            credits
                .iter()
                .find(|e| e.course_id == cid)
                .map(|e| e.credits)
        });
        Self {
            course_id,
            days: group_by_day_and_slot(classes, settings),
            state: SelectionState::new(),
            credits_remaining,
            simple_mode,
            start_date: String::new(),
            message: String::new(),
            credits_input: String::new(),
        }
    }

    pub fn course_id(&self) -> Option<&str> {
        self.course_id.as_deref()
    }

    pub fn days(&self) -> &[DaySlotGroup] {
        &self.days
    }

    /// Regroups refetched sessions, keeping whatever selection state still
    /// applies.
    pub fn reload(&mut self, classes: &[ClassSession], settings: &Settings) {
        self.days = group_by_day_and_slot(classes, settings);
        self.state.reconcile(&self.days);
    }

    fn slot(&self, group_key: &str) -> Result<&TimeSlotGroup, SelectionError> {
        find_slot(&self.days, group_key).ok_or_else(|| SelectionError::UnknownSlot(group_key.to_string()))
    }

    pub fn toggle_slot_active(&mut self, group_key: &str) -> Result<bool, SelectionError> {
        self.slot(group_key)?;
        Ok(self.state.toggle_slot_active(group_key))
    }

    pub fn update_slot_mode(&mut self, group_key: &str, mode: SlotMode) -> Result<(), SelectionError> {
        self.slot(group_key)?;
        self.state.update_slot_mode(group_key, mode);
        Ok(())
    }

    pub fn update_slot_count(&mut self, group_key: &str, requested: f64) -> Result<bool, SelectionError> {
        let slot = find_slot(&self.days, group_key).ok_or_else(|| SelectionError::UnknownSlot(group_key.to_string()))?;
        Ok(self.state.update_slot_count(slot, requested))
    }

    pub fn toggle_class_override(
        &mut self,
        group_key: &str,
        class_id: &str,
        currently_selected: bool,
    ) -> Result<(), SelectionError> {
        let slot = find_slot(&self.days, group_key).ok_or_else(|| SelectionError::UnknownSlot(group_key.to_string()))?;
        if !slot.contains(class_id) {
            return Err(SelectionError::UnknownClass {
                group_key: group_key.to_string(),
                class_id: class_id.to_string(),
            });
        }
        self.state.toggle_class_override(slot, class_id, currently_selected);
        Ok(())
    }

    pub fn set_start_date(&mut self, v: &str) {
        self.start_date = v.trim().to_string();
    }

    pub fn set_message(&mut self, v: &str) {
        self.message = v.to_string();
    }

    pub fn set_credits_input(&mut self, v: &str) {
        self.credits_input = v.to_string();
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.state.all_selected_ids(&self.days)
    }

    /// Builds the confirm payload, or returns the blockers that keep the
    /// action disabled.
    pub fn confirm(&self) -> Result<AssignPayload, Vec<Blocker>> {
        let class_ids = self.selected_ids();
        let blockers = confirm_blockers(class_ids.len(), self.simple_mode, &self.start_date);
        if !blockers.is_empty() {
            return Err(blockers);
        }
        Ok(AssignPayload {
            class_ids,
            start_date: self.start_date.clone(),
            message: self.message.clone(),
            credits: parse_credits(&self.credits_input),
        })
    }

    pub fn summary(&self) -> serde_json::Value {
        let selected = self.selected_ids();
        let blockers = confirm_blockers(selected.len(), self.simple_mode, &self.start_date);
        let slots: Vec<serde_json::Value> = iter_slots(&self.days)
            .map(|slot| {
                let sel = self.state.selection(&slot.group_key);
                json!({
                    "groupKey": slot.group_key,
                    "day": slot.day,
                    "timeSlot": slot.time_slot,
                    "active": self.state.is_active(&slot.group_key),
                    "mode": sel.mode,
                    "count": sel.count,
                    "overrides": sel.manual_overrides,
                    "selectedIds": self.state.effective_ids(slot),
                })
            })
            .collect();
        json!({
            "selectedIds": selected,
            "selectedCount": selected.len(),
            "creditsRemaining": self.credits_remaining,
            "insufficientCredits": insufficient_credits(self.credits_remaining, selected.len()),
            "activeSlots": self.state.active_count(),
            "canConfirm": blockers.is_empty(),
            "blockers": blockers,
            "simpleMode": self.simple_mode,
            "startDate": self.start_date,
            "slots": slots,
        })
    }
}
