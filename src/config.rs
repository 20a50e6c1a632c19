use chrono::{FixedOffset, Offset, Utc};
use serde_json::json;

pub const ENV_CLOCK: &str = "ROSTERD_CLOCK";
pub const ENV_UTC_OFFSET: &str = "ROSTERD_UTC_OFFSET";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("clock must be \"12h\" or \"24h\", got {0:?}")]
    Clock(String),
    #[error("utcOffset must be \"local\" or +HH:MM / -HH:MM, got {0:?}")]
    UtcOffset(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockFormat {
    /// `3:30 PM`
    #[default]
    TwelveHour,
    /// `15:30`
    TwentyFourHour,
}

impl ClockFormat {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "12h" | "12" => Ok(ClockFormat::TwelveHour),
            "24h" | "24" => Ok(ClockFormat::TwentyFourHour),
            _ => Err(ConfigError::Clock(raw.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClockFormat::TwelveHour => "12h",
            ClockFormat::TwentyFourHour => "24h",
        }
    }
}

/// Zone used to derive weekday and clock time from session timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zone {
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl Zone {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let t = raw.trim();
        if t.eq_ignore_ascii_case("local") {
            return Ok(Zone::Local);
        }
        if t.eq_ignore_ascii_case("utc") || t == "Z" {
            return Ok(Zone::Fixed(Utc.fix()));
        }
        let bad = || ConfigError::UtcOffset(raw.to_string());
        let (sign, rest) = match t.chars().next() {
            Some('+') => (1, &t[1..]),
            Some('-') => (-1, &t[1..]),
            _ => return Err(bad()),
        };
        let (h, m) = rest.split_once(':').ok_or_else(bad)?;
        if h.len() != 2 || m.len() != 2 {
            return Err(bad());
        }
        let hours: i32 = h.parse().map_err(|_| bad())?;
        let minutes: i32 = m.parse().map_err(|_| bad())?;
        if hours > 23 || minutes > 59 {
            return Err(bad());
        }
        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(Zone::Fixed)
            .ok_or_else(bad)
    }

    pub fn label(self) -> String {
        match self {
            Zone::Local => "local".to_string(),
            Zone::Fixed(off) => {
                let secs = off.local_minus_utc();
                let sign = if secs < 0 { '-' } else { '+' };
                let abs = secs.abs();
                format!("{}{:02}:{:02}", sign, abs / 3600, (abs % 3600) / 60)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
    pub clock: ClockFormat,
    pub zone: Zone,
}

impl Settings {
    /// Reads `ROSTERD_CLOCK` / `ROSTERD_UTC_OFFSET`. Bad values fall back to
    /// the default with a warning; startup never fails on configuration.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();
        if let Some(raw) = lookup(ENV_CLOCK) {
            match ClockFormat::parse(&raw) {
                Ok(v) => settings.clock = v,
                Err(e) => tracing::warn!(var = ENV_CLOCK, "{e}; using default"),
            }
        }
        if let Some(raw) = lookup(ENV_UTC_OFFSET) {
            match Zone::parse(&raw) {
                Ok(v) => settings.zone = v,
                Err(e) => tracing::warn!(var = ENV_UTC_OFFSET, "{e}; using default"),
            }
        }
        settings
    }

    /// Applies a partial update from `settings.update` params. Nothing is
    /// changed unless every supplied field parses.
    pub fn apply_patch(&mut self, params: &serde_json::Value) -> Result<(), ConfigError> {
        let clock = match params.get("clock") {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(raw)) => Some(ClockFormat::parse(raw)?),
            Some(other) => return Err(ConfigError::Clock(other.to_string())),
        };
        let zone = match params.get("utcOffset") {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(raw)) => Some(Zone::parse(raw)?),
            Some(other) => return Err(ConfigError::UtcOffset(other.to_string())),
        };
        if let Some(c) = clock {
            self.clock = c;
        }
        if let Some(z) = zone {
            self.zone = z;
        }
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "clock": self.clock.as_str(),
            "utcOffset": self.zone.label(),
        })
    }
}
