//! Sleep-plan helpers
//!
//! Derives concrete times from a prescription (planned bed time from target
//! wake minus window), prefills a fresh night from the plan, and exposes the
//! window slider grid used when picking a new window.

use chrono::{Duration, NaiveTime};

use crate::types::{DiaryEntry, WindowSettings};

/// Smallest selectable window (minutes)
pub const WINDOW_MIN_MINUTES: u32 = 300;

/// Upper bound of the window grid, exclusive (minutes)
pub const WINDOW_MAX_MINUTES: u32 = 720;

/// Grid step (minutes)
pub const WINDOW_STEP_MINUTES: u32 = 15;

/// The bed time implied by a prescription: target wake minus the window,
/// wrapping around midnight as a bare time-of-day.
pub fn planned_bed_time(settings: &WindowSettings) -> NaiveTime {
    let window = Duration::minutes((settings.window_hours * 60.0).round() as i64);
    settings.target_wake.overflowing_sub_signed(window).0
}

/// Prefill a new night from the plan: in bed at the planned bed time, lights
/// out 15 minutes later, asleep after 30, up at the target wake time.
pub fn default_entry(settings: &WindowSettings) -> DiaryEntry {
    let bed = planned_bed_time(settings);
    DiaryEntry {
        bed_time: Some(bed),
        lights_out: Some(bed.overflowing_add_signed(Duration::minutes(15)).0),
        sleep_onset: Some(bed.overflowing_add_signed(Duration::minutes(30)).0),
        wake_up: Some(settings.target_wake),
        out_of_bed: Some(settings.target_wake),
        waso_minutes: 0,
        nap_minutes: 0,
        awakenings: vec![],
    }
}

/// Selectable window sizes in minutes: 5 h up to (not including) 12 h in
/// 15-minute steps
pub fn window_options() -> Vec<u32> {
    (WINDOW_MIN_MINUTES..WINDOW_MAX_MINUTES)
        .step_by(WINDOW_STEP_MINUTES as usize)
        .collect()
}

/// Label for a window size in minutes: "6:00", "5:15"
pub fn window_label(minutes: u32) -> String {
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(s: &str) -> NaiveTime {
        s.parse().unwrap()
    }

    fn settings(wake: &str, hours: f64) -> WindowSettings {
        WindowSettings {
            target_wake: time(wake),
            window_hours: hours,
        }
    }

    #[test]
    fn test_planned_bed_time_wraps_midnight() {
        assert_eq!(planned_bed_time(&settings("07:00:00", 6.0)), time("01:00:00"));
        assert_eq!(planned_bed_time(&settings("06:00:00", 7.5)), time("22:30:00"));
    }

    #[test]
    fn test_default_entry_offsets() {
        let entry = default_entry(&settings("07:00:00", 6.0));
        assert_eq!(entry.bed_time, Some(time("01:00:00")));
        assert_eq!(entry.lights_out, Some(time("01:15:00")));
        assert_eq!(entry.sleep_onset, Some(time("01:30:00")));
        assert_eq!(entry.wake_up, Some(time("07:00:00")));
        assert_eq!(entry.out_of_bed, Some(time("07:00:00")));
        assert!(entry.awakenings.is_empty());
    }

    #[test]
    fn test_window_grid() {
        let options = window_options();
        assert_eq!(options.first(), Some(&300));
        assert_eq!(options.last(), Some(&705));
        assert!(options.windows(2).all(|w| w[1] - w[0] == 15));
    }

    #[test]
    fn test_window_label() {
        assert_eq!(window_label(360), "6:00");
        assert_eq!(window_label(315), "5:15");
    }
}
