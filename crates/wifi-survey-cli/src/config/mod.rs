//! Configuration loading and resolution.

use std::path::PathBuf;

/// Environment variable overriding the survey database path.
pub const SURVEY_DB_ENV: &str = "WIFI_SURVEY_DB";

/// Environment variable overriding the speed database path.
pub const SPEED_DB_ENV: &str = "WIFI_SPEED_DB";

const DEFAULT_SURVEY_DB: &str = "plan-b-survey.db";
const DEFAULT_SPEED_DB: &str = "plan-b-tor-speed.db";

/// Resolve the survey database path: explicit flag, then environment, then default.
pub fn resolve_survey_db(explicit: Option<&str>) -> PathBuf {
    resolve(explicit, SURVEY_DB_ENV, DEFAULT_SURVEY_DB)
}

/// Resolve the speed database path: explicit flag, then environment, then default.
pub fn resolve_speed_db(explicit: Option<&str>) -> PathBuf {
    resolve(explicit, SPEED_DB_ENV, DEFAULT_SPEED_DB)
}

fn resolve(explicit: Option<&str>, env_key: &str, default: &str) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }

    match std::env::var(env_key) {
        Ok(env_path) if !env_path.trim().is_empty() => PathBuf::from(env_path),
        _ => PathBuf::from(default),
    }
}
