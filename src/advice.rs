//! Adherence and advice engine
//!
//! Aggregates recent nights against the active prescription period and
//! produces the CBT-i outcomes: window recommendation (expand / hold /
//! reduce), daytime-nap assessment, and adherence scoring against the plan
//! that applied on each specific night.
//!
//! All outputs are typed values; rendering them as text is the caller's job.

use chrono::{Days, Duration, NaiveDate};
use serde::Serialize;

use crate::types::{DiaryFile, NightMetrics};

/// Nights considered by an assessment (the most recent week)
pub const ANALYSIS_NIGHTS: usize = 7;

/// Minimum relevant nights before a recommendation is given
pub const MIN_NIGHTS_FOR_ADVICE: usize = 3;

/// Mean SE above this recommends expanding the window (%)
pub const SE_INCREASE_THRESHOLD: f64 = 85.0;

/// Mean SE below this recommends reducing the window (%)
pub const SE_DECREASE_THRESHOLD: f64 = 80.0;

/// The window is never reduced below this (hours)
pub const MIN_WINDOW_HOURS: f64 = 5.0;

/// Window adjustments happen in steps of this size (hours)
pub const ADJUST_STEP_HOURS: f64 = 0.25;

/// Bed and wake times within this of the plan count as adherent (minutes)
pub const ADHERENCE_TOLERANCE_MIN: f64 = 30.0;

/// Aggregate statistics over the relevant nights
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodStats {
    pub nights: usize,
    pub mean_se: f64,
    pub mean_tst_min: f64,
    pub mean_tib_min: f64,
    pub mean_nap_min: f64,
    pub nights_with_naps: usize,
}

/// Sleep-window recommendation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum WindowAdvice {
    /// Fewer than three relevant nights; no recommendation yet
    InsufficientData { nights: usize },
    /// Mean SE above 85%: expand the window by 15 minutes
    Increase { new_window_hours: f64 },
    /// Mean SE below 80%: reduce the window by 15 minutes
    Decrease { new_window_hours: f64 },
    /// Mean SE below 80% but the window is already at the 5 h floor
    HoldAtFloor,
    /// Mean SE in the 80-85% band: keep the current window
    Hold,
}

/// Message severity, mirroring the presentation layer's box styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Info,
    Warning,
}

/// Qualifier on mean nap minutes per logged night
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NapLoad {
    /// Under 10 minutes per day
    Low,
    /// 10 to 29 minutes per day
    Moderate,
    /// 30 minutes or more per day
    High,
}

/// Assessment of daytime sleep in the relevant window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NapAssessment {
    pub days_with_naps: usize,
    pub mean_nap_min_per_day: f64,
    /// Duration qualifier; absent when no naps were logged
    pub load: Option<NapLoad>,
    pub severity: Severity,
}

/// Tone of the adherence feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdherenceTone {
    /// High adherence and high SE: in position to expand
    ReadyToExpand,
    /// High adherence, SE still low: keep going, this is normal
    OnTrack,
    /// Some nights hit the window; aim for more consistency
    Mixed,
    /// Most nights miss the window by more than the tolerance
    OffPlan,
}

/// Adherence over the relevant nights
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdherenceSummary {
    pub adherent_nights: usize,
    pub checked_nights: usize,
    pub rate: f64,
    pub tone: AdherenceTone,
}

/// Full assessment of the current prescription period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    /// Start of the active period the nights were filtered by
    pub period_start: Option<NaiveDate>,
    pub stats: PeriodStats,
    pub window: WindowAdvice,
    pub naps: NapAssessment,
    pub adherence: AdherenceSummary,
}

/// Engine producing assessments from computed night metrics
pub struct AdviceEngine;

impl AdviceEngine {
    /// Assess the most recent nights against the active prescription period.
    ///
    /// `nights` must be ordered by date (as `NightCalculator::compute_all`
    /// returns them). Returns `None` when no night falls inside the active
    /// period, e.g. right after a new window started.
    pub fn assess(
        nights: &[NightMetrics],
        diary: &DiaryFile,
        today: NaiveDate,
    ) -> Option<Assessment> {
        let period_start = diary.active_period().map(|p| p.start_date);

        // Last week of history, excluding tonight, restricted to nights
        // under the currently active window. Without an active period all
        // history stays relevant.
        let history: Vec<&NightMetrics> = nights.iter().filter(|n| n.date < today).collect();
        let recent = &history[history.len().saturating_sub(ANALYSIS_NIGHTS)..];
        let relevant: Vec<&NightMetrics> = recent
            .iter()
            .filter(|n| period_start.map_or(true, |start| n.date >= start))
            .copied()
            .collect();

        if relevant.is_empty() {
            return None;
        }

        let stats = aggregate(&relevant);
        let window = recommend_window(&stats, diary.meta.settings.window_hours);
        let naps = assess_naps(&stats);
        let adherence = score_adherence(&relevant, diary, stats.mean_se);

        Some(Assessment {
            period_start,
            stats,
            window,
            naps,
            adherence,
        })
    }
}

fn aggregate(relevant: &[&NightMetrics]) -> PeriodStats {
    let n = relevant.len() as f64;
    PeriodStats {
        nights: relevant.len(),
        mean_se: relevant.iter().map(|m| m.se).sum::<f64>() / n,
        mean_tst_min: relevant.iter().map(|m| m.tst_min).sum::<f64>() / n,
        mean_tib_min: relevant.iter().map(|m| m.tib_min).sum::<f64>() / n,
        mean_nap_min: relevant
            .iter()
            .map(|m| f64::from(m.nap_minutes))
            .sum::<f64>()
            / n,
        nights_with_naps: relevant.iter().filter(|m| m.nap_minutes > 0).count(),
    }
}

fn recommend_window(stats: &PeriodStats, current_window_hours: f64) -> WindowAdvice {
    if stats.nights < MIN_NIGHTS_FOR_ADVICE {
        WindowAdvice::InsufficientData {
            nights: stats.nights,
        }
    } else if stats.mean_se > SE_INCREASE_THRESHOLD {
        WindowAdvice::Increase {
            new_window_hours: current_window_hours + ADJUST_STEP_HOURS,
        }
    } else if stats.mean_se < SE_DECREASE_THRESHOLD {
        if current_window_hours <= MIN_WINDOW_HOURS {
            WindowAdvice::HoldAtFloor
        } else {
            WindowAdvice::Decrease {
                new_window_hours: current_window_hours - ADJUST_STEP_HOURS,
            }
        }
    } else {
        WindowAdvice::Hold
    }
}

fn assess_naps(stats: &PeriodStats) -> NapAssessment {
    let severity = match stats.nights_with_naps {
        0 => Severity::Success,
        1..=3 => Severity::Info,
        _ => Severity::Warning,
    };

    let load = if stats.nights_with_naps > 0 {
        Some(if stats.mean_nap_min < 10.0 {
            NapLoad::Low
        } else if stats.mean_nap_min < 30.0 {
            NapLoad::Moderate
        } else {
            NapLoad::High
        })
    } else {
        None
    };

    // Long naps undercut sleep restriction even when rare
    let severity = match (severity, load) {
        (Severity::Info, Some(NapLoad::High)) => Severity::Warning,
        (s, _) => s,
    };

    NapAssessment {
        days_with_naps: stats.nights_with_naps,
        mean_nap_min_per_day: stats.mean_nap_min,
        load,
        severity,
    }
}

fn score_adherence(
    relevant: &[&NightMetrics],
    diary: &DiaryFile,
    mean_se: f64,
) -> AdherenceSummary {
    // A night whose plan cannot be computed counts as checked but not
    // adherent; errors must not inflate the rate.
    let adherent_nights = relevant
        .iter()
        .filter(|night| night_is_adherent(night, diary))
        .count();
    let checked_nights = relevant.len();
    let rate = adherent_nights as f64 / checked_nights as f64;

    let tone = if rate >= 0.7 {
        if mean_se > SE_INCREASE_THRESHOLD {
            AdherenceTone::ReadyToExpand
        } else {
            AdherenceTone::OnTrack
        }
    } else if rate < 0.3 {
        AdherenceTone::OffPlan
    } else {
        AdherenceTone::Mixed
    };

    AdherenceSummary {
        adherent_nights,
        checked_nights,
        rate,
        tone,
    }
}

/// Whether a night matched the window prescribed for its own date (±30 min
/// on both bed time and out-of-bed time).
fn night_is_adherent(night: &NightMetrics, diary: &DiaryFile) -> bool {
    let plan = diary.window_for_date(night.date);

    let Some(window) = Duration::try_minutes((plan.window_hours * 60.0).round() as i64) else {
        return false;
    };
    let planned_wake = (night.date + Days::new(1)).and_time(plan.target_wake);
    let Some(planned_bed) = planned_wake.checked_sub_signed(window) else {
        return false;
    };

    let bed_diff_min = (night.bed - planned_bed).num_seconds().abs() as f64 / 60.0;
    let wake_diff_min = (night.out_of_bed - planned_wake).num_seconds().abs() as f64 / 60.0;

    bed_diff_min <= ADHERENCE_TOLERANCE_MIN && wake_diff_min <= ADHERENCE_TOLERANCE_MIN
}
