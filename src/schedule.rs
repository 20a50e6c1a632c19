use crate::config::{ClockFormat, Settings, Zone};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Weekday};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

pub const INVALID_DATE: &str = "Invalid Date";

/// Calendar order used for day groups. Not rotated to start at "today".
pub const WEEK_ORDER: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Completed,
    Canceled,
    Rescheduled,
    #[default]
    #[serde(other)]
    Scheduled,
}

/// One scheduled occurrence of a class, as returned by the roster API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSession {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub status: SessionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlotGroup {
    pub group_key: String,
    pub day: String,
    pub time_slot: String,
    /// Nearest first. Count-mode selection takes a prefix of this list.
    pub classes: Vec<ClassSession>,
}

impl TimeSlotGroup {
    pub fn contains(&self, class_id: &str) -> bool {
        self.classes.iter().any(|c| c.id == class_id)
    }

    pub fn class_ids(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(|c| c.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySlotGroup {
    pub day: String,
    pub time_slots: Vec<TimeSlotGroup>,
}

pub fn group_key(day: &str, time_slot: &str) -> String {
    format!("{}__{}", day, time_slot)
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}

/// Parses an API timestamp into the configured zone.
///
/// Accepts RFC 3339 (any offset), a naive `YYYY-MM-DDTHH:MM[:SS[.f]]` which is
/// read as wall-clock time in `zone`, and a bare `YYYY-MM-DD` which is read as
/// UTC midnight.
pub fn parse_timestamp(raw: &str, zone: Zone) -> Option<DateTime<FixedOffset>> {
    let t = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(to_zone(dt, zone));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(t, fmt) {
            return from_wall_clock(naive, zone);
        }
    }
    let date = NaiveDate::parse_from_str(t, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(to_zone(midnight.and_utc().fixed_offset(), zone))
}

fn to_zone(dt: DateTime<FixedOffset>, zone: Zone) -> DateTime<FixedOffset> {
    match zone {
        Zone::Local => dt.with_timezone(&Local).fixed_offset(),
        Zone::Fixed(off) => dt.with_timezone(&off),
    }
}

fn from_wall_clock(naive: NaiveDateTime, zone: Zone) -> Option<DateTime<FixedOffset>> {
    match zone {
        Zone::Local => Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.fixed_offset()),
        Zone::Fixed(off) => off.from_local_datetime(&naive).single(),
    }
}

pub fn format_clock(dt: &DateTime<FixedOffset>, clock: ClockFormat) -> String {
    match clock {
        ClockFormat::TwelveHour => dt.format("%-I:%M %p").to_string(),
        ClockFormat::TwentyFourHour => dt.format("%H:%M").to_string(),
    }
}

/// Sort position of a day label. Sessions with unusable start times sort
/// after Saturday.
fn day_rank(start: Option<&DateTime<FixedOffset>>) -> u8 {
    use chrono::Datelike;
    match start {
        Some(dt) => dt.weekday().num_days_from_sunday() as u8,
        None => WEEK_ORDER.len() as u8,
    }
}

fn day_label(rank: u8) -> &'static str {
    WEEK_ORDER
        .get(rank as usize)
        .copied()
        .map(weekday_name)
        .unwrap_or(INVALID_DATE)
}

struct SlotAcc {
    time_slot: String,
    classes: Vec<(Option<DateTime<FixedOffset>>, ClassSession)>,
}

/// Partitions sessions by weekday, then by formatted `start - end` clock
/// range.
///
/// Slots merge on exact label equality, so the same clock range on different
/// dates collapses into one recurring weekly slot. Time slots within a day
/// keep first-seen order; sessions within a slot are sorted by start time.
/// Days without sessions are omitted.
pub fn group_by_day_and_slot(classes: &[ClassSession], settings: &Settings) -> Vec<DaySlotGroup> {
    let mut days: BTreeMap<u8, Vec<SlotAcc>> = BTreeMap::new();
    let mut index: HashMap<(u8, String), usize> = HashMap::new();

    for class in classes {
        let start = parse_timestamp(&class.start_time, settings.zone);
        let end = parse_timestamp(&class.end_time, settings.zone);
        if start.is_none() || end.is_none() {
            tracing::warn!(
                class_id = %class.id,
                start_time = %class.start_time,
                end_time = %class.end_time,
                "malformed class timestamp; grouping under \"{}\"",
                INVALID_DATE
            );
        }

        let rank = day_rank(start.as_ref());
        let label = |dt: &Option<DateTime<FixedOffset>>| match dt {
            Some(v) => format_clock(v, settings.clock),
            None => INVALID_DATE.to_string(),
        };
        let time_slot = format!("{} - {}", label(&start), label(&end));

        let slots = days.entry(rank).or_default();
        let pos = *index.entry((rank, time_slot.clone())).or_insert_with(|| {
            slots.push(SlotAcc {
                time_slot,
                classes: Vec::new(),
            });
            slots.len() - 1
        });
        slots[pos].classes.push((start, class.clone()));
    }

    days.into_iter()
        .map(|(rank, slots)| {
            let day = day_label(rank).to_string();
            let time_slots = slots
                .into_iter()
                .map(|mut acc| {
                    acc.classes.sort_by(|a, b| nearest_first(a.0.as_ref(), b.0.as_ref()));
                    TimeSlotGroup {
                        group_key: group_key(&day, &acc.time_slot),
                        day: day.clone(),
                        time_slot: acc.time_slot,
                        classes: acc.classes.into_iter().map(|(_, c)| c).collect(),
                    }
                })
                .collect();
            DaySlotGroup { day, time_slots }
        })
        .collect()
}

fn nearest_first(a: Option<&DateTime<FixedOffset>>, b: Option<&DateTime<FixedOffset>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn find_slot<'a>(days: &'a [DaySlotGroup], key: &str) -> Option<&'a TimeSlotGroup> {
    iter_slots(days).find(|s| s.group_key == key)
}

/// Slots in grouping order: day order first, then slot order within the day.
pub fn iter_slots(days: &[DaySlotGroup]) -> impl Iterator<Item = &TimeSlotGroup> {
    days.iter().flat_map(|d| d.time_slots.iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn utc_settings() -> Settings {
        Settings {
            clock: ClockFormat::TwelveHour,
            zone: Zone::parse("+00:00").unwrap(),
        }
    }

    fn session(id: &str, start: &str, end: &str) -> ClassSession {
        ClassSession {
            id: id.to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            status: SessionStatus::Scheduled,
        }
    }

    #[test]
    fn empty_input_groups_to_nothing() {
        assert!(group_by_day_and_slot(&[], &utc_settings()).is_empty());
    }

    #[test]
    fn recurring_weekly_slot_collapses_and_sorts_nearest_first() {
        // 2024-01-01, -08 and -15 are Mondays.
        let classes = vec![
            session("C", "2024-01-15T15:00:00Z", "2024-01-15T16:00:00Z"),
            session("A", "2024-01-01T15:00:00Z", "2024-01-01T16:00:00Z"),
            session("B", "2024-01-08T15:00:00Z", "2024-01-08T16:00:00Z"),
        ];
        let days = group_by_day_and_slot(&classes, &utc_settings());
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].day, "Monday");
        assert_eq!(days[0].time_slots.len(), 1);
        let slot = &days[0].time_slots[0];
        assert_eq!(slot.time_slot, "3:00 PM - 4:00 PM");
        assert_eq!(slot.group_key, "Monday__3:00 PM - 4:00 PM");
        let ids: Vec<&str> = slot.class_ids().collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn days_follow_calendar_order_regardless_of_input_order() {
        let classes = vec![
            session("sat", "2024-01-06T09:00:00Z", "2024-01-06T10:00:00Z"),
            session("wed", "2024-01-03T09:00:00Z", "2024-01-03T10:00:00Z"),
            session("sun", "2024-01-07T09:00:00Z", "2024-01-07T10:00:00Z"),
            session("mon", "2024-01-01T09:00:00Z", "2024-01-01T10:00:00Z"),
        ];
        let days = group_by_day_and_slot(&classes, &utc_settings());
        let names: Vec<&str> = days.iter().map(|d| d.day.as_str()).collect();
        assert_eq!(names, vec!["Sunday", "Monday", "Wednesday", "Saturday"]);
    }

    #[test]
    fn slots_within_a_day_keep_first_seen_order() {
        let classes = vec![
            session("late", "2024-01-01T18:00:00Z", "2024-01-01T19:00:00Z"),
            session("early", "2024-01-01T08:00:00Z", "2024-01-01T09:00:00Z"),
            session("late2", "2024-01-08T18:00:00Z", "2024-01-08T19:00:00Z"),
        ];
        let days = group_by_day_and_slot(&classes, &utc_settings());
        let slots: Vec<&str> = days[0].time_slots.iter().map(|s| s.time_slot.as_str()).collect();
        assert_eq!(slots, vec!["6:00 PM - 7:00 PM", "8:00 AM - 9:00 AM"]);
    }

    #[test]
    fn every_session_lands_in_exactly_one_slot() {
        let mut classes = Vec::new();
        for week in 0..4 {
            for (day, hour) in [(1, 9), (1, 15), (3, 9), (5, 17), (6, 10)] {
                let date = NaiveDate::from_ymd_opt(2024, 1, day + 7 * week).unwrap();
                let start = date.and_hms_opt(hour, 30, 0).unwrap().and_utc();
                let end = start + chrono::Duration::minutes(45);
                classes.push(session(
                    &format!("{day}-{hour}-{week}"),
                    &start.to_rfc3339(),
                    &end.to_rfc3339(),
                ));
            }
        }
        let days = group_by_day_and_slot(&classes, &utc_settings());
        let mut seen = HashSet::new();
        let mut total = 0;
        for slot in iter_slots(&days) {
            for c in &slot.classes {
                assert!(seen.insert(c.id.clone()), "duplicate {}", c.id);
                total += 1;
            }
            for pair in slot.classes.windows(2) {
                let a = parse_timestamp(&pair[0].start_time, Zone::Local).unwrap();
                let b = parse_timestamp(&pair[1].start_time, Zone::Local).unwrap();
                assert!(a <= b);
            }
        }
        assert_eq!(total, classes.len());
    }

    #[test]
    fn weekday_follows_configured_zone() {
        // 23:30 UTC Monday is Tuesday morning at +05:30.
        let classes = vec![session("x", "2024-01-01T23:30:00Z", "2024-01-02T00:30:00Z")];
        let ist = Settings {
            clock: ClockFormat::TwentyFourHour,
            zone: Zone::parse("+05:30").unwrap(),
        };
        let days = group_by_day_and_slot(&classes, &ist);
        assert_eq!(days[0].day, "Tuesday");
        assert_eq!(days[0].time_slots[0].time_slot, "05:00 - 06:00");
    }

    #[test]
    fn naive_timestamps_are_wall_clock_in_zone() {
        let zone = Zone::parse("-05:00").unwrap();
        let dt = parse_timestamp("2024-01-01T15:30:00", zone).unwrap();
        assert_eq!(format_clock(&dt, ClockFormat::TwelveHour), "3:30 PM");
        assert_eq!(dt.offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn malformed_timestamps_group_under_invalid_date_after_saturday() {
        let classes = vec![
            session("bad", "not a date", "2024-01-06T10:00:00Z"),
            session("sat", "2024-01-06T09:00:00Z", "2024-01-06T10:00:00Z"),
        ];
        let days = group_by_day_and_slot(&classes, &utc_settings());
        assert_eq!(days.len(), 2);
        assert_eq!(days[1].day, INVALID_DATE);
        assert_eq!(days[1].time_slots[0].time_slot, "Invalid Date - 10:00 AM");
        assert_eq!(days[1].time_slots[0].classes[0].id, "bad");
    }

    #[test]
    fn unknown_status_reads_as_scheduled() {
        let raw = r#"[{"_id":"a","startTime":"2024-01-01T10:00:00Z","endTime":"2024-01-01T11:00:00Z","status":"paused"},
                      {"_id":"b","startTime":"2024-01-01T10:00:00Z","endTime":"2024-01-01T11:00:00Z","status":"canceled"},
                      {"id":"c","startTime":"2024-01-01T10:00:00Z","endTime":"2024-01-01T11:00:00Z"}]"#;
        let parsed: Vec<ClassSession> = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed[0].status, SessionStatus::Scheduled);
        assert_eq!(parsed[1].status, SessionStatus::Canceled);
        assert_eq!(parsed[2].status, SessionStatus::Scheduled);
        assert_eq!(parsed[2].id, "c");
        assert_eq!(serde_json::to_value(parsed[0].status).unwrap(), "scheduled");
    }
}
