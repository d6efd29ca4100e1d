//! Night-metrics computation
//!
//! This module turns one raw diary entry into derived metrics:
//! - TIB: time in bed, out-of-bed minus bed time
//! - TST: total sleep time, wake-up minus sleep onset minus WASO
//! - SE: sleep efficiency, TST/TIB in percent, clamped to 0-100
//! - normalized awakening intervals with absolute timestamps
//!
//! All durations are computed from pivot-resolved absolute timestamps so
//! nights crossing midnight come out right.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::BTreeMap;

use crate::error::DiaryError;
use crate::pivot::resolve_timestamp;
use crate::types::{AwakeSpan, DiaryEntry, NightMetrics};

/// Calculator for per-night metrics
pub struct NightCalculator;

/// One night that could not be computed, tied to its log date
#[derive(Debug)]
pub struct NightFailure {
    pub date: String,
    pub error: DiaryError,
}

/// Outcome of a batch computation: metrics ordered by date plus the nights
/// that failed. Failures never poison the rest of the batch.
#[derive(Debug, Default)]
pub struct NightBatch {
    pub nights: Vec<NightMetrics>,
    pub failures: Vec<NightFailure>,
}

impl NightCalculator {
    /// Compute metrics for a single night.
    ///
    /// A missing primary time is a hard error for the night; `waso_minutes`,
    /// `nap_minutes` and `awakenings` are optional and default to zero/empty.
    pub fn compute_night(
        log_date: NaiveDate,
        entry: &DiaryEntry,
    ) -> Result<NightMetrics, DiaryError> {
        let bed = required(entry.bed_time, "bed_time", log_date)?;
        let lights_out = required(entry.lights_out, "lights_out", log_date)?;
        let sleep_onset = required(entry.sleep_onset, "sleep_onset", log_date)?;
        let wake_up = required(entry.wake_up, "wake_up", log_date)?;
        let out_of_bed = required(entry.out_of_bed, "out_of_bed", log_date)?;

        let tib_min = minutes_between(bed, out_of_bed);
        let tst_min = minutes_between(sleep_onset, wake_up) - f64::from(entry.waso_minutes);

        // Logged WASO can exceed the onset-to-wake span; clamping beats
        // rejecting the entry.
        let se = if tib_min > 0.0 {
            (tst_min / tib_min * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        let awakenings = entry
            .awakenings
            .iter()
            .map(|awakening| {
                let start = resolve_timestamp(awakening.time, log_date);
                AwakeSpan {
                    start,
                    end: start + Duration::minutes(i64::from(awakening.duration_min)),
                    duration_min: awakening.duration_min,
                }
            })
            .collect();

        Ok(NightMetrics {
            date: log_date,
            bed,
            lights_out,
            sleep_onset,
            wake_up,
            out_of_bed,
            tib_min,
            tst_min,
            se,
            waso_minutes: entry.waso_minutes,
            nap_minutes: entry.nap_minutes,
            awakenings,
        })
    }

    /// Compute metrics for every entry in a diary.
    ///
    /// Nights come back ordered by date with duplicate log dates collapsed
    /// (last write wins). An unparseable date key or missing field lands in
    /// `failures` without touching the other nights.
    pub fn compute_all(entries: &BTreeMap<String, DiaryEntry>) -> NightBatch {
        let mut by_date: BTreeMap<NaiveDate, NightMetrics> = BTreeMap::new();
        let mut failures = Vec::new();

        for (date_str, entry) in entries {
            let log_date = match NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
                Ok(d) => d,
                Err(e) => {
                    failures.push(NightFailure {
                        date: date_str.clone(),
                        error: DiaryError::DateParseError(format!("{date_str}: {e}")),
                    });
                    continue;
                }
            };

            match Self::compute_night(log_date, entry) {
                Ok(metrics) => {
                    by_date.insert(log_date, metrics);
                }
                Err(error) => failures.push(NightFailure {
                    date: date_str.clone(),
                    error,
                }),
            }
        }

        NightBatch {
            nights: by_date.into_values().collect(),
            failures,
        }
    }
}

fn required(
    time: Option<NaiveTime>,
    name: &'static str,
    log_date: NaiveDate,
) -> Result<NaiveDateTime, DiaryError> {
    time.map(|t| resolve_timestamp(t, log_date))
        .ok_or(DiaryError::MissingField(name))
}

fn minutes_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    (end - start).num_seconds() as f64 / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Awakening;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn time(s: &str) -> Option<NaiveTime> {
        Some(s.parse().unwrap())
    }

    fn entry(
        bed: &str,
        lights: &str,
        onset: &str,
        wake: &str,
        out: &str,
        waso: u32,
    ) -> DiaryEntry {
        DiaryEntry {
            bed_time: time(bed),
            lights_out: time(lights),
            sleep_onset: time(onset),
            wake_up: time(wake),
            out_of_bed: time(out),
            waso_minutes: waso,
            nap_minutes: 0,
            awakenings: vec![],
        }
    }

    #[test]
    fn test_basic_night() {
        let e = entry("23:00:00", "23:15:00", "23:30:00", "07:00:00", "07:15:00", 15);
        let m = NightCalculator::compute_night(date("2026-02-01"), &e).unwrap();

        // 23:00 to 07:15 = 495 min in bed
        assert_eq!(m.tib_min, 495.0);
        // 23:30 to 07:00 = 450 min, minus 15 min WASO
        assert_eq!(m.tst_min, 435.0);
        // 435 / 495 = 87.87...%
        assert!((m.se - 87.9).abs() < 0.1);
    }

    #[test]
    fn test_midnight_crossover() {
        let e = entry("22:00:00", "22:15:00", "22:30:00", "06:00:00", "06:15:00", 0);
        let m = NightCalculator::compute_night(date("2026-02-01"), &e).unwrap();

        assert_eq!(m.bed.date(), date("2026-02-01"));
        assert_eq!(m.out_of_bed.date(), date("2026-02-02"));
        assert_eq!(m.tib_min, 495.0);
    }

    #[test]
    fn test_waso_subtraction() {
        let e = entry("23:00:00", "23:00:00", "23:00:00", "07:00:00", "07:00:00", 60);
        let m = NightCalculator::compute_night(date("2026-02-01"), &e).unwrap();

        assert_eq!(m.tib_min, 480.0);
        assert_eq!(m.tst_min, 420.0);
        assert_eq!(m.se, 420.0 / 480.0 * 100.0);
    }

    #[test]
    fn test_se_clamped_low() {
        // WASO larger than the whole onset-to-wake span
        let e = entry("23:00:00", "23:00:00", "23:00:00", "07:00:00", "07:00:00", 600);
        let m = NightCalculator::compute_night(date("2026-02-01"), &e).unwrap();
        assert!(m.tst_min < 0.0);
        assert_eq!(m.se, 0.0);
    }

    #[test]
    fn test_se_clamped_high() {
        // Onset logged before bed time makes TST exceed TIB
        let e = entry("23:00:00", "23:00:00", "22:00:00", "07:00:00", "07:00:00", 0);
        let m = NightCalculator::compute_night(date("2026-02-01"), &e).unwrap();
        assert!(m.tst_min > m.tib_min);
        assert_eq!(m.se, 100.0);
    }

    #[test]
    fn test_missing_field_is_a_hard_error() {
        let mut e = entry("23:00:00", "23:15:00", "23:30:00", "07:00:00", "07:15:00", 0);
        e.sleep_onset = None;
        let err = NightCalculator::compute_night(date("2026-02-01"), &e).unwrap_err();
        assert!(matches!(err, DiaryError::MissingField("sleep_onset")));
    }

    #[test]
    fn test_awakening_spans() {
        let mut e = entry("23:00:00", "23:15:00", "23:30:00", "07:00:00", "07:15:00", 25);
        e.awakenings = vec![
            Awakening {
                time: "03:00:00".parse().unwrap(),
                duration_min: 15,
            },
            Awakening {
                time: "23:45:00".parse().unwrap(),
                duration_min: 10,
            },
        ];
        let m = NightCalculator::compute_night(date("2026-02-01"), &e).unwrap();

        // 03:00 falls on the morning side of the night
        assert_eq!(m.awakenings[0].start.date(), date("2026-02-02"));
        assert_eq!(m.awakenings[0].end - m.awakenings[0].start, Duration::minutes(15));
        // 23:45 stays on the log date
        assert_eq!(m.awakenings[1].start.date(), date("2026-02-01"));
    }

    #[test]
    fn test_empty_batch() {
        let batch = NightCalculator::compute_all(&BTreeMap::new());
        assert!(batch.nights.is_empty());
        assert!(batch.failures.is_empty());
    }

    #[test]
    fn test_batch_isolates_failures() {
        let mut entries = BTreeMap::new();
        entries.insert(
            "2026-02-01".to_string(),
            entry("23:00:00", "23:15:00", "23:30:00", "07:00:00", "07:15:00", 0),
        );
        let mut broken = entry("23:00:00", "23:15:00", "23:30:00", "07:00:00", "07:15:00", 0);
        broken.wake_up = None;
        entries.insert("2026-02-02".to_string(), broken);
        entries.insert(
            "not-a-date".to_string(),
            entry("23:00:00", "23:15:00", "23:30:00", "07:00:00", "07:15:00", 0),
        );

        let batch = NightCalculator::compute_all(&entries);
        assert_eq!(batch.nights.len(), 1);
        assert_eq!(batch.nights[0].date, date("2026-02-01"));
        assert_eq!(batch.failures.len(), 2);
    }

    #[test]
    fn test_batch_collapses_duplicate_dates() {
        // Two string keys resolving to the same calendar date: the key that
        // iterates last wins.
        let mut entries = BTreeMap::new();
        entries.insert(
            "2026-02-01".to_string(),
            entry("23:00:00", "23:15:00", "23:30:00", "07:00:00", "07:15:00", 10),
        );
        entries.insert(
            "2026-2-1".to_string(),
            entry("23:00:00", "23:15:00", "23:30:00", "07:00:00", "07:15:00", 40),
        );

        let batch = NightCalculator::compute_all(&entries);
        assert_eq!(batch.nights.len(), 1);
        assert_eq!(batch.nights[0].waso_minutes, 40);
    }

    #[test]
    fn test_batch_orders_by_date() {
        let mut entries = BTreeMap::new();
        for day in ["2026-02-03", "2026-02-01", "2026-02-02"] {
            entries.insert(
                day.to_string(),
                entry("23:00:00", "23:15:00", "23:30:00", "07:00:00", "07:15:00", 0),
            );
        }
        let batch = NightCalculator::compute_all(&entries);
        let dates: Vec<_> = batch.nights.iter().map(|n| n.date).collect();
        assert_eq!(
            dates,
            vec![date("2026-02-01"), date("2026-02-02"), date("2026-02-03")]
        );
    }
}
