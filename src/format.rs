//! Duration formatting helpers
//!
//! Output strings match the original diary's Norwegian labels ("7 t 30 min",
//! "7t 30m"); they are part of the observable contract and covered by tests.

/// Format fractional hours as "H t M min", rounding to the nearest minute.
/// Whole hours drop the minute part: "6 t".
pub fn hours_as_hm(hours: f64) -> String {
    let total_min = (hours * 60.0).round() as i64;
    let h = total_min / 60;
    let m = total_min % 60;
    if m == 0 {
        format!("{h} t")
    } else {
        format!("{h} t {m} min")
    }
}

/// Compact "Ht Mm" form used in table cells, truncating to whole minutes
pub fn minutes_as_hm(minutes: f64) -> String {
    let total = minutes as i64;
    format!("{}t {}m", total / 60, total % 60)
}
