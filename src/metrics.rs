/// Completion percentage of a run (0 when the total is unknown).
pub fn progress_percent(completed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (completed as f64 / total as f64) * 100.0
}

/// Share of allowed feature calls, or `None` before any call was decided.
pub fn success_rate(success: u64, failure: u64) -> Option<f64> {
    let decided = success + failure;
    if decided == 0 {
        return None;
    }
    Some((success as f64 / decided as f64) * 100.0)
}

pub fn format_success_rate(success: u64, failure: u64) -> String {
    match success_rate(success, failure) {
        Some(rate) => format!("{rate:.1}%"),
        None => "0%".to_string(),
    }
}

/// Compact duration such as `42s` or `3m 07s`.
pub fn format_seconds(secs: f64) -> String {
    if !secs.is_finite() || secs <= 0.0 {
        return "-".to_string();
    }
    let total = secs.round() as u64;
    if total < 60 {
        format!("{total}s")
    } else {
        format!("{}m {:02}s", total / 60, total % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_rate_is_zero_without_decisions() {
        assert_eq!(format_success_rate(0, 0), "0%");
    }

    #[test]
    fn success_rate_has_one_decimal() {
        assert_eq!(format_success_rate(3, 1), "75.0%");
        assert_eq!(format_success_rate(1, 2), "33.3%");
    }

    #[test]
    fn progress_is_ratio_of_iterations() {
        assert_eq!(progress_percent(25, 50), 50.0);
        assert_eq!(progress_percent(0, 0), 0.0);
        assert_eq!(progress_percent(50, 50), 100.0);
    }

    #[test]
    fn seconds_format() {
        assert_eq!(format_seconds(0.0), "-");
        assert_eq!(format_seconds(41.6), "42s");
        assert_eq!(format_seconds(187.0), "3m 07s");
    }
}
