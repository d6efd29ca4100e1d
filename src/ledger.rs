//! Sleep-window history ledger
//!
//! The window history is an ordered sequence of prescription periods: at most
//! one is open (`end_date = None`), closed periods are disjoint and sorted by
//! start date. The ledger owns every mutation of that sequence and keeps the
//! `settings` mirror in `meta` synchronized with the active period; the
//! history is the source of truth, `settings` only a read-through cache.

use chrono::{Days, NaiveDate, NaiveTime};
use thiserror::Error;

use crate::error::DiaryError;
use crate::types::{DiaryFile, WindowPeriod, WindowSettings};

/// A blocking problem in an edited history
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryViolation {
    #[error("{count} periods are marked as ongoing; only one may be active at a time")]
    MultipleActivePeriods { count: usize },

    #[error("period {index} ends ({end}) on or after the next period starts ({next_start})")]
    OverlappingPeriods {
        index: usize,
        end: NaiveDate,
        next_start: NaiveDate,
    },

    #[error("period {index} ends ({end}) before it starts ({start})")]
    EndBeforeStart {
        index: usize,
        start: NaiveDate,
        end: NaiveDate,
    },
}

/// A non-blocking oddity worth surfacing to the user
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryWarning {
    #[error("no period is marked as ongoing; recommendations are unavailable")]
    NoActivePeriod,
}

/// Result of validating an edited history
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryReport {
    pub violations: Vec<HistoryViolation>,
    pub warnings: Vec<HistoryWarning>,
}

impl HistoryReport {
    /// Whether the history may be persisted
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Validate an edited history, sorting it by start date as a side effect.
///
/// Blocking violations: more than one open period, a closed period reaching
/// into its successor, or a period ending before it starts. A history with
/// zero open periods is allowed but flagged as a warning.
pub fn validate_history(periods: &mut Vec<WindowPeriod>) -> HistoryReport {
    periods.sort_by_key(|p| p.start_date);

    let mut report = HistoryReport::default();

    let active_count = periods.iter().filter(|p| p.is_active()).count();
    if active_count > 1 {
        report.violations.push(HistoryViolation::MultipleActivePeriods {
            count: active_count,
        });
    } else if active_count == 0 {
        report.warnings.push(HistoryWarning::NoActivePeriod);
    }

    for (index, period) in periods.iter().enumerate() {
        if let Some(end) = period.end_date {
            if end < period.start_date {
                report.violations.push(HistoryViolation::EndBeforeStart {
                    index,
                    start: period.start_date,
                    end,
                });
            }
            if let Some(next) = periods.get(index + 1) {
                if end >= next.start_date {
                    report.violations.push(HistoryViolation::OverlappingPeriods {
                        index,
                        end,
                        next_start: next.start_date,
                    });
                }
            }
        }
    }

    report
}

impl DiaryFile {
    /// Bootstrap the window history for legacy files lacking one.
    ///
    /// The synthesized period carries the cached settings and starts today.
    /// The caller is expected to persist the diary right away.
    pub fn ensure_window_history(&mut self, today: NaiveDate) {
        if self.meta.window_history.is_empty() {
            log::info!("diary has no window history; bootstrapping from settings");
            self.meta
                .window_history
                .push(WindowPeriod::open(today, &self.meta.settings));
        }
    }

    /// The ongoing period, if any
    pub fn active_period(&self) -> Option<&WindowPeriod> {
        self.meta.window_history.iter().find(|p| p.is_active())
    }

    /// Apply a settings change, updating the history.
    ///
    /// Unchanged values are a no-op. A change on the same day the active
    /// period started mutates it in place, so a period can never end before
    /// it starts. Otherwise the active period is closed at yesterday and a
    /// new open period starts today. The settings cache is resynchronized in
    /// every case.
    pub fn apply_settings_change(
        &mut self,
        target_wake: NaiveTime,
        window_hours: f64,
        today: NaiveDate,
    ) {
        self.ensure_window_history(today);

        let new_settings = WindowSettings {
            target_wake,
            window_hours,
        };

        match self
            .meta
            .window_history
            .iter()
            .position(|p| p.is_active())
        {
            Some(idx) => {
                let active = &mut self.meta.window_history[idx];
                if active.target_wake == target_wake && active.window_hours == window_hours {
                    // Idempotent: nothing changed
                } else if active.start_date == today {
                    active.target_wake = target_wake;
                    active.window_hours = window_hours;
                } else {
                    let closed_on = today - Days::new(1);
                    let started = active.start_date;
                    active.end_date = Some(closed_on);
                    log::debug!("closed window period started {started} at {closed_on}");
                    self.meta
                        .window_history
                        .push(WindowPeriod::open(today, &new_settings));
                }
            }
            None => {
                self.meta
                    .window_history
                    .push(WindowPeriod::open(today, &new_settings));
            }
        }

        self.sync_settings_cache();
    }

    /// The window that applied on a given date.
    ///
    /// Scans periods in stored order and returns the first whose inclusive
    /// interval contains the date; dates older than the earliest recorded
    /// period fall back to the cached settings.
    pub fn window_for_date(&self, target: NaiveDate) -> WindowSettings {
        self.meta
            .window_history
            .iter()
            .find(|p| p.contains(target))
            .map(WindowPeriod::settings)
            .unwrap_or_else(|| self.meta.settings.clone())
    }

    /// Bulk-replace the history, as the interactive editor does.
    ///
    /// Validation is enforced here, not left to the caller: the periods are
    /// sorted, blocking violations reject the whole edit, and warnings come
    /// back in the report of a successful save.
    pub fn replace_history(
        &mut self,
        mut periods: Vec<WindowPeriod>,
    ) -> Result<HistoryReport, DiaryError> {
        let report = validate_history(&mut periods);
        if !report.is_valid() {
            let summary: Vec<String> =
                report.violations.iter().map(|v| v.to_string()).collect();
            return Err(DiaryError::InvalidHistory(summary.join("; ")));
        }

        self.meta.window_history = periods;
        self.sync_settings_cache();
        Ok(report)
    }

    /// Delete one closed period from the history. The active period cannot
    /// be deleted.
    pub fn remove_period(&mut self, index: usize) -> Result<WindowPeriod, DiaryError> {
        match self.meta.window_history.get(index) {
            None => Err(DiaryError::InvalidHistory(format!(
                "no period at index {index}"
            ))),
            Some(period) if period.is_active() => Err(DiaryError::InvalidHistory(
                "the ongoing period cannot be deleted".to_string(),
            )),
            Some(_) => Ok(self.meta.window_history.remove(index)),
        }
    }

    /// Recompute the `settings` cache from the active period. Single
    /// synchronization point for the settings/history duality.
    fn sync_settings_cache(&mut self) {
        if let Some(active) = self.active_period() {
            self.meta.settings = active.settings();
        }
    }
}
