use serde_json::json;
use std::collections::HashSet;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar(offset: &str, clock: &str) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_rosterd");
    let mut child = Command::new(exe)
        .env("ROSTERD_UTC_OFFSET", offset)
        .env("ROSTERD_CLOCK", clock)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn rosterd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

#[test]
fn grouping_orders_days_and_keeps_every_session() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar("+00:00", "12h");

    let classes = json!([
        { "_id": "sat1", "startTime": "2024-01-06T10:00:00Z", "endTime": "2024-01-06T10:30:00Z", "status": "completed" },
        { "_id": "mon2", "startTime": "2024-01-08T15:30:00Z", "endTime": "2024-01-08T16:00:00Z", "status": "scheduled" },
        { "_id": "sun1", "startTime": "2024-01-07T08:00:00Z", "endTime": "2024-01-07T09:00:00Z", "status": "canceled" },
        { "_id": "mon1", "startTime": "2024-01-01T15:30:00Z", "endTime": "2024-01-01T16:00:00Z", "status": "scheduled" },
        { "_id": "monAM", "startTime": "2024-01-01T09:00:00Z", "endTime": "2024-01-01T10:00:00Z", "status": "whatever" }
    ]);
    let result = request_ok(&mut stdin, &mut reader, "1", "schedule.group", json!({ "classes": classes }));
    let days = result["days"].as_array().expect("days");

    let names: Vec<&str> = days.iter().map(|d| d["day"].as_str().unwrap_or("")).collect();
    assert_eq!(names, vec!["Sunday", "Monday", "Saturday"]);

    let monday = &days[1]["timeSlots"];
    assert_eq!(monday[0]["timeSlot"], json!("3:30 PM - 4:00 PM"));
    assert_eq!(monday[0]["groupKey"], json!("Monday__3:30 PM - 4:00 PM"));
    assert_eq!(monday[0]["classes"][0]["_id"], json!("mon1"));
    assert_eq!(monday[0]["classes"][1]["_id"], json!("mon2"));
    assert_eq!(monday[1]["timeSlot"], json!("9:00 AM - 10:00 AM"));
    assert_eq!(monday[1]["classes"][0]["status"], json!("scheduled"));

    let mut seen = HashSet::new();
    for day in days {
        for slot in day["timeSlots"].as_array().expect("timeSlots") {
            for c in slot["classes"].as_array().expect("classes") {
                assert!(seen.insert(c["_id"].as_str().unwrap_or("").to_string()));
            }
        }
    }
    assert_eq!(seen.len(), 5);

    let empty = request_ok(&mut stdin, &mut reader, "2", "schedule.group", json!({ "classes": [] }));
    assert_eq!(empty["days"], json!([]));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn grouping_uses_configured_zone_and_clock() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar("-05:00", "24h");

    // 02:00 UTC Tuesday is 21:00 Monday at -05:00.
    let classes = json!([
        { "_id": "x", "startTime": "2024-01-02T02:00:00Z", "endTime": "2024-01-02T03:00:00Z" },
        { "_id": "bad", "startTime": "yesterday-ish", "endTime": "later" }
    ]);
    let result = request_ok(&mut stdin, &mut reader, "1", "schedule.group", json!({ "classes": classes }));
    let days = result["days"].as_array().expect("days");
    assert_eq!(days.len(), 2);
    assert_eq!(days[0]["day"], json!("Monday"));
    assert_eq!(days[0]["timeSlots"][0]["timeSlot"], json!("21:00 - 22:00"));
    assert_eq!(days[1]["day"], json!("Invalid Date"));
    assert_eq!(days[1]["timeSlots"][0]["groupKey"], json!("Invalid Date__Invalid Date - Invalid Date"));

    drop(stdin);
    let _ = child.wait();
}
