//! Display helpers for fractional-minute totals.

/// Render fractional minutes as `hh:mm:ss`, rounding to the nearest second.
/// Hours are not capped at 24.
pub fn format_minutes(minutes: f64) -> String {
    let total_seconds = if minutes.is_finite() && minutes > 0.0 {
        (minutes * 60.0).round() as u64
    } else {
        0
    };
    let hours = total_seconds / 3600;
    let mins = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    format!("{hours:02}:{mins:02}:{secs:02}")
}

/// Progress towards `target` as a whole percentage, capped at 100.
pub fn progress_pct(minutes: f64, target: f64) -> u8 {
    if !(target.is_finite() && target > 0.0) || !minutes.is_finite() || minutes <= 0.0 {
        return 0;
    }
    (minutes / target * 100.0).floor().min(100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_fractional_minutes() {
        assert_eq!(format_minutes(0.0), "00:00:00");
        assert_eq!(format_minutes(1.5), "00:01:30");
        assert_eq!(format_minutes(125.25), "02:05:15");
        assert_eq!(format_minutes(0.0083), "00:00:00");
        assert_eq!(format_minutes(0.0084), "00:00:01");
        assert_eq!(format_minutes(1500.0), "25:00:00");
    }

    #[test]
    fn negative_and_nan_render_as_zero() {
        assert_eq!(format_minutes(-3.0), "00:00:00");
        assert_eq!(format_minutes(f64::NAN), "00:00:00");
    }

    #[test]
    fn progress_is_capped() {
        assert_eq!(progress_pct(60.0, 120.0), 50);
        assert_eq!(progress_pct(59.9, 120.0), 49);
        assert_eq!(progress_pct(500.0, 120.0), 100);
        assert_eq!(progress_pct(10.0, 0.0), 0);
    }
}
