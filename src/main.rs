mod assign;
mod config;
mod ipc;
mod logging;
mod schedule;
mod selection;

use std::io::{self, BufRead, Write};

fn main() -> anyhow::Result<()> {
    if let Err(e) = logging::init() {
        eprintln!("rosterd: logging disabled: {e}");
    }

    let settings = config::Settings::from_env();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        settings = %settings.to_json(),
        "rosterd starting"
    );
    let mut state = ipc::AppState::new(settings);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("stdin closed: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::warn!("unparseable request line: {e}");
                let reply = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() },
                });
                writeln!(stdout, "{}", reply)?;
                stdout.flush()?;
                continue;
            }
        };

        tracing::debug!(id = %req.id, method = %req.method, "request");
        let resp = ipc::handle_request(&mut state, req);
        writeln!(stdout, "{}", resp)?;
        stdout.flush()?;
    }
    Ok(())
}
