use chrono::{DateTime, NaiveDate, Utc};
use std::path::{Path, PathBuf};

/// Fixed simulated wall clock start: Monday 2025-01-06 09:00 UTC.
#[must_use]
pub fn simulation_epoch_ms() -> i64 {
    NaiveDate::from_ymd_opt(2025, 1, 6)
        .and_then(|date| date.and_hms_opt(9, 0, 0))
        .map_or(0, |start| start.and_utc().timestamp_millis())
}

/// Human-readable UTC time for a simulated clock value.
#[must_use]
pub fn format_clock(now_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(now_ms).map_or_else(
        || format!("{now_ms}ms"),
        |at| at.format("%Y-%m-%d %H:%M").to_string(),
    )
}

/// Save directory for one scenario run: `{base}/{scenario}/seed-{seed}/{timestamp}`.
#[must_use]
pub fn save_dir(base: &Path, scenario: &str, seed: u64) -> PathBuf {
    let ts = Utc::now().format("%Y%m%dT%H%M%S%3f");
    base.join(scenario)
        .join(format!("seed-{seed}"))
        .join(ts.to_string())
}

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_trims_and_filters() {
        let parts = split_csv(" alpha, ,beta,  gamma ");
        assert_eq!(parts, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn simulation_epoch_is_a_monday_morning() {
        assert_eq!(format_clock(simulation_epoch_ms()), "2025-01-06 09:00");
    }

    #[test]
    fn save_dir_includes_key_segments() {
        let dir = save_dir(Path::new("target/saves"), "smoke", 42);
        let text = dir.to_string_lossy();
        assert!(text.contains("target/saves/smoke/seed-42/"));
    }
}
