//! Period summaries
//!
//! Aggregate numbers for a report over an inclusive date range: night count
//! and means of SE, TST, TIB, WASO and daytime sleep. Unlike the advice
//! engine this looks at any range, not just the active window.

use chrono::NaiveDate;
use serde::Serialize;

use crate::types::NightMetrics;

/// Aggregate report numbers for a date range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub nights: usize,
    pub mean_se: f64,
    pub mean_tst_min: f64,
    pub mean_tib_min: f64,
    /// Mean of per-night awakening totals (minutes)
    pub mean_waso_min: f64,
    pub mean_nap_min: f64,
}

/// Summarize the nights falling inside `[from, to]`, both ends inclusive.
/// Returns `None` when the range holds no nights.
pub fn summarize(nights: &[NightMetrics], from: NaiveDate, to: NaiveDate) -> Option<PeriodSummary> {
    let selected: Vec<&NightMetrics> = nights
        .iter()
        .filter(|n| n.date >= from && n.date <= to)
        .collect();
    if selected.is_empty() {
        return None;
    }

    let n = selected.len() as f64;
    // WASO here is the sum of logged awakening spans, the number the printed
    // report has always shown, not the entry's waso_minutes field.
    let waso_total: f64 = selected
        .iter()
        .map(|night| {
            night
                .awakenings
                .iter()
                .map(|a| f64::from(a.duration_min))
                .sum::<f64>()
        })
        .sum();

    Some(PeriodSummary {
        from,
        to,
        nights: selected.len(),
        mean_se: selected.iter().map(|m| m.se).sum::<f64>() / n,
        mean_tst_min: selected.iter().map(|m| m.tst_min).sum::<f64>() / n,
        mean_tib_min: selected.iter().map(|m| m.tib_min).sum::<f64>() / n,
        mean_waso_min: waso_total / n,
        mean_nap_min: selected
            .iter()
            .map(|m| f64::from(m.nap_minutes))
            .sum::<f64>()
            / n,
    })
}
