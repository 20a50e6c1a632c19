use crate::schedule::{iter_slots, DaySlotGroup, TimeSlotGroup};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotMode {
    #[default]
    All,
    Count,
}

impl SlotMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "all" => Some(SlotMode::All),
            "count" => Some(SlotMode::Count),
            _ => None,
        }
    }
}

/// Baseline membership implied by a slot's mode, before overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Natural {
    All,
    /// The first `n` sessions of the slot, which are the `n` nearest.
    Nearest(usize),
}

impl Natural {
    pub fn includes(self, position: usize) -> bool {
        match self {
            Natural::All => true,
            Natural::Nearest(n) => position < n,
        }
    }

    pub fn contains(self, slot: &TimeSlotGroup, class_id: &str) -> bool {
        slot.class_ids()
            .position(|id| id == class_id)
            .map(|pos| self.includes(pos))
            .unwrap_or(false)
    }
}

/// Per-slot configuration. Persists across activate/deactivate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSelection {
    pub mode: SlotMode,
    pub count: usize,
    /// `true` forces a session in, `false` forces it out. Only entries that
    /// differ from the natural baseline are kept.
    pub manual_overrides: BTreeMap<String, bool>,
}

impl Default for SlotSelection {
    fn default() -> Self {
        Self {
            mode: SlotMode::All,
            count: 1,
            manual_overrides: BTreeMap::new(),
        }
    }
}

impl SlotSelection {
    pub fn natural(&self) -> Natural {
        match self.mode {
            SlotMode::All => Natural::All,
            SlotMode::Count => Natural::Nearest(self.count),
        }
    }
}

/// Selected session ids for one slot, in slot order (nearest first).
///
/// Inactive slots contribute nothing. Overrides naming ids outside the slot
/// are ignored, so the result is always a subset of the slot's sessions.
pub fn effective_ids_for_slot(slot: &TimeSlotGroup, active: bool, selection: &SlotSelection) -> Vec<String> {
    if !active {
        return Vec::new();
    }
    let natural = selection.natural();
    slot.classes
        .iter()
        .enumerate()
        .filter(|(pos, c)| {
            selection
                .manual_overrides
                .get(&c.id)
                .copied()
                .unwrap_or_else(|| natural.includes(*pos))
        })
        .map(|(_, c)| c.id.clone())
        .collect()
}

/// Interprets a raw count request. Returns `None` for input that must be
/// ignored (NaN, zero, negative); fractions truncate, large values clamp to
/// the slot length.
pub fn clamp_count(requested: f64, slot_len: usize) -> Option<usize> {
    if !requested.is_finite() {
        return None;
    }
    let whole = requested.trunc();
    if whole < 1.0 || slot_len == 0 {
        return None;
    }
    if whole >= slot_len as f64 {
        return Some(slot_len);
    }
    Some(whole as usize)
}

/// Selection state for one assign workflow: which slots are on and how each
/// slot picks its sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    active_slots: BTreeSet<String>,
    selections: HashMap<String, SlotSelection>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, group_key: &str) -> bool {
        self.active_slots.contains(group_key)
    }

    pub fn active_count(&self) -> usize {
        self.active_slots.len()
    }

    /// Stored configuration for a slot, or the default when the slot has not
    /// been touched yet.
    pub fn selection(&self, group_key: &str) -> SlotSelection {
        self.selections.get(group_key).cloned().unwrap_or_default()
    }

    fn selection_mut(&mut self, group_key: &str) -> &mut SlotSelection {
        self.selections.entry(group_key.to_string()).or_default()
    }

    /// Flips the slot's active flag and returns the new value. The slot's
    /// selection config is left untouched so re-activating restores it.
    pub fn toggle_slot_active(&mut self, group_key: &str) -> bool {
        if self.active_slots.remove(group_key) {
            false
        } else {
            self.active_slots.insert(group_key.to_string());
            true
        }
    }

    /// Switching to `count` starts over at the nearest session. Switching to
    /// `all` drops inclusions, which the `all` baseline already covers, and
    /// keeps explicit exclusions.
    pub fn update_slot_mode(&mut self, group_key: &str, mode: SlotMode) {
        let sel = self.selection_mut(group_key);
        sel.mode = mode;
        match mode {
            SlotMode::Count => {
                sel.count = 1;
                sel.manual_overrides.clear();
            }
            SlotMode::All => sel.manual_overrides.retain(|_, included| !*included),
        }
    }

    /// Applies a count request. Invalid input leaves the previous count and
    /// overrides in place and returns `false`.
    pub fn update_slot_count(&mut self, slot: &TimeSlotGroup, requested: f64) -> bool {
        let Some(count) = clamp_count(requested, slot.classes.len()) else {
            tracing::debug!(group_key = %slot.group_key, requested, "ignoring invalid slot count");
            return false;
        };
        let sel = self.selection_mut(&slot.group_key);
        sel.count = count;
        sel.manual_overrides.clear();
        true
    }

    /// Flips one session's displayed membership.
    ///
    /// If the flip lands back on the natural membership the override entry is
    /// dropped; otherwise an override holding the new state is recorded.
    pub fn toggle_class_override(&mut self, slot: &TimeSlotGroup, class_id: &str, currently_selected: bool) {
        let sel = self.selection_mut(&slot.group_key);
        let naturally_in = sel.natural().contains(slot, class_id);
        let wanted = !currently_selected;
        if wanted == naturally_in {
            sel.manual_overrides.remove(class_id);
        } else {
            sel.manual_overrides.insert(class_id.to_string(), wanted);
        }
    }

    pub fn effective_ids(&self, slot: &TimeSlotGroup) -> Vec<String> {
        let active = self.is_active(&slot.group_key);
        match self.selections.get(&slot.group_key) {
            Some(sel) => effective_ids_for_slot(slot, active, sel),
            None => effective_ids_for_slot(slot, active, &SlotSelection::default()),
        }
    }

    /// Final selection across every slot, grouped by day then slot.
    pub fn all_selected_ids(&self, days: &[DaySlotGroup]) -> Vec<String> {
        iter_slots(days).flat_map(|slot| self.effective_ids(slot)).collect()
    }

    /// Drops state for slots that no longer exist after a refetch, prunes
    /// overrides for sessions that left their slot, and clamps stored counts
    /// to the new slot length.
    pub fn reconcile(&mut self, days: &[DaySlotGroup]) {
        let slots: HashMap<&str, &TimeSlotGroup> =
            iter_slots(days).map(|s| (s.group_key.as_str(), s)).collect();

        self.active_slots.retain(|k| slots.contains_key(k.as_str()));
        self.selections.retain(|k, sel| {
            let Some(slot) = slots.get(k.as_str()) else {
                return false;
            };
            sel.manual_overrides.retain(|id, _| slot.contains(id));
            sel.count = sel.count.clamp(1, slot.classes.len().max(1));
            true
        });
    }
}

/// Advisory only: confirmation is never blocked by this.
pub fn insufficient_credits(credits_remaining: Option<f64>, selected_count: usize) -> bool {
    match credits_remaining {
        Some(c) => c < selected_count as f64,
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Blocker {
    NothingSelected,
    MissingStartDate,
}

/// Reasons the confirm action is disabled. Empty means it may fire.
pub fn confirm_blockers(selected_count: usize, simple_mode: bool, start_date: &str) -> Vec<Blocker> {
    let mut out = Vec::new();
    if selected_count == 0 {
        out.push(Blocker::NothingSelected);
    }
    if !simple_mode && start_date.trim().is_empty() {
        out.push(Blocker::MissingStartDate);
    }
    out
}
