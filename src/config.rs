//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{FixedOffset, Local, Offset};
use secrecy::SecretString;

use crate::error::ConfigError;

/// Default digest cadence when `REPORT_INTERVAL_HOURS` is unset or invalid.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(5 * 3600);

/// How often the digest is sent to every user.
#[derive(Debug, Clone)]
pub enum DigestSchedule {
    /// Fixed interval between runs.
    Interval(Duration),
    /// Cron expression (seconds field included), evaluated in the planner timezone.
    Cron(cron::Schedule),
}

impl DigestSchedule {
    /// Time to wait from `now` until the next run.
    pub fn next_delay(&self, now: chrono::DateTime<FixedOffset>) -> Duration {
        match self {
            Self::Interval(every) => *every,
            Self::Cron(schedule) => schedule
                .after(&now)
                .next()
                .and_then(|next| (next - now).to_std().ok())
                .unwrap_or(DEFAULT_REPORT_INTERVAL),
        }
    }
}

impl std::fmt::Display for DigestSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interval(every) => {
                let secs = every.as_secs();
                if secs % 3600 == 0 {
                    write!(f, "every {} h", secs / 3600)
                } else {
                    write!(f, "every {} min", secs / 60)
                }
            }
            Self::Cron(schedule) => write!(f, "cron '{schedule}'"),
        }
    }
}

/// Planner configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Telegram Bot API token.
    pub telegram_token: SecretString,
    /// Usernames or numeric ids allowed to talk to the bot (`*` = everyone).
    pub allowed_users: Vec<String>,
    /// Path of the libSQL database file.
    pub db_path: PathBuf,
    /// Digest cadence.
    pub digest_schedule: DigestSchedule,
    /// Timezone used for "now" in recurrence windows and digests.
    pub utc_offset: FixedOffset,
}

impl PlannerConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let telegram_token = get("TELEGRAM_BOT_TOKEN")
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".to_string()))?;

        let allowed_users: Vec<String> = get("TELEGRAM_ALLOWED_USERS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let db_path = get("PLANNER_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/daily-planner.db"));

        let digest_schedule = match get("REPORT_CRON") {
            Some(expr) => {
                let schedule =
                    cron::Schedule::from_str(&expr).map_err(|e| ConfigError::InvalidValue {
                        key: "REPORT_CRON".to_string(),
                        message: e.to_string(),
                    })?;
                DigestSchedule::Cron(schedule)
            }
            None => DigestSchedule::Interval(parse_interval_hours(
                get("REPORT_INTERVAL_HOURS").as_deref(),
            )),
        };

        let utc_offset = match get("PLANNER_UTC_OFFSET") {
            Some(raw) => FixedOffset::from_str(&raw).map_err(|e| ConfigError::InvalidValue {
                key: "PLANNER_UTC_OFFSET".to_string(),
                message: format!("expected +HH:MM, got '{raw}': {e}"),
            })?,
            None => Local::now().offset().fix(),
        };

        Ok(Self {
            telegram_token,
            allowed_users,
            db_path,
            digest_schedule,
            utc_offset,
        })
    }
}

/// Parse a positive whole number of hours; anything else falls back to the default.
pub fn parse_interval_hours(raw: Option<&str>) -> Duration {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|h| *h > 0)
        .and_then(|h| h.checked_mul(3600))
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_REPORT_INTERVAL)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::TimeZone;
    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = PlannerConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn defaults_applied() {
        let cfg = PlannerConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:ABC"),
            ("PLANNER_UTC_OFFSET", "+03:00"),
        ]))
        .unwrap();
        assert_eq!(cfg.telegram_token.expose_secret(), "123:ABC");
        assert_eq!(cfg.allowed_users, vec!["*".to_string()]);
        assert_eq!(cfg.db_path, PathBuf::from("./data/daily-planner.db"));
        assert!(matches!(cfg.digest_schedule, DigestSchedule::Interval(d) if d == DEFAULT_REPORT_INTERVAL));
        assert_eq!(cfg.utc_offset.local_minus_utc(), 3 * 3600);
    }

    #[test]
    fn allowed_users_are_split_and_trimmed() {
        let cfg = PlannerConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("TELEGRAM_ALLOWED_USERS", "alice, 12345 ,,bob"),
        ]))
        .unwrap();
        assert_eq!(cfg.allowed_users, vec!["alice", "12345", "bob"]);
    }

    #[test]
    fn interval_hours_fallbacks() {
        assert_eq!(parse_interval_hours(Some("3")), Duration::from_secs(3 * 3600));
        assert_eq!(parse_interval_hours(Some("0")), DEFAULT_REPORT_INTERVAL);
        assert_eq!(parse_interval_hours(Some("-2")), DEFAULT_REPORT_INTERVAL);
        assert_eq!(parse_interval_hours(Some("abc")), DEFAULT_REPORT_INTERVAL);
        assert_eq!(parse_interval_hours(None), DEFAULT_REPORT_INTERVAL);
    }

    #[test]
    fn interval_hours_overflow_falls_back() {
        assert_eq!(
            parse_interval_hours(Some("18446744073709551615")),
            DEFAULT_REPORT_INTERVAL
        );
        let max_hours = (u64::MAX / 3600).to_string();
        assert_eq!(
            parse_interval_hours(Some(&max_hours)),
            Duration::from_secs(u64::MAX / 3600 * 3600)
        );
    }

    #[test]
    fn invalid_cron_rejected() {
        let err = PlannerConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("REPORT_CRON", "not a cron"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "REPORT_CRON"));
    }

    #[test]
    fn invalid_offset_rejected() {
        let err = PlannerConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("PLANNER_UTC_OFFSET", "Moscow"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "PLANNER_UTC_OFFSET"));
    }

    #[test]
    fn cron_schedule_next_delay() {
        let schedule = DigestSchedule::Cron(cron::Schedule::from_str("0 0 9 * * *").unwrap());
        let tz = FixedOffset::east_opt(0).unwrap();
        let now = tz.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap();
        assert_eq!(schedule.next_delay(now), Duration::from_secs(30 * 60));
    }

    #[test]
    fn interval_schedule_display() {
        let schedule = DigestSchedule::Interval(Duration::from_secs(4 * 3600));
        assert_eq!(schedule.to_string(), "every 4 h");
    }
}
