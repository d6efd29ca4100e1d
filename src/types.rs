//! Core types for the Sovnlog engine
//!
//! This module defines the persisted diary schema (exact wire keys matter for
//! compatibility with existing diary files) and the derived per-night metrics
//! that flow through the rest of the engine.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::DIARY_VERSION;

/// One mid-night awakening as logged by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Awakening {
    /// Time-of-day the awakening started
    pub time: NaiveTime,
    /// How long the user was awake (minutes)
    pub duration_min: u32,
}

/// One logged night, keyed in the diary by its log date.
///
/// The five primary times are optional on the wire: older files can lack
/// fields, and a missing time must fail only that night's computation, not
/// the whole file load. `waso_minutes`, `nap_minutes` and `awakenings`
/// default to zero/empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub bed_time: Option<NaiveTime>,
    pub lights_out: Option<NaiveTime>,
    pub sleep_onset: Option<NaiveTime>,
    pub wake_up: Option<NaiveTime>,
    pub out_of_bed: Option<NaiveTime>,
    /// Total minutes awake after sleep onset
    #[serde(default)]
    pub waso_minutes: u32,
    /// Minutes slept during the daytime
    #[serde(default)]
    pub nap_minutes: u32,
    /// A malformed awakening is dropped at load; it never fails the night.
    #[serde(default, deserialize_with = "lenient_awakenings")]
    pub awakenings: Vec<Awakening>,
}

fn lenient_awakenings<'de, D>(deserializer: D) -> Result<Vec<Awakening>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<serde_json::Value> = Vec::deserialize(deserializer)?;
    let mut parsed = Vec::with_capacity(raw.len());
    for value in raw {
        match serde_json::from_value::<Awakening>(value) {
            Ok(awakening) => parsed.push(awakening),
            Err(e) => log::debug!("dropping malformed awakening: {e}"),
        }
    }
    Ok(parsed)
}

/// The currently prescribed sleep window: wake-up target and hours in bed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSettings {
    /// Target wake-up time
    pub target_wake: NaiveTime,
    /// Permitted hours in bed
    pub window_hours: f64,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            target_wake: NaiveTime::from_hms_opt(7, 0, 0).expect("valid literal time"),
            window_hours: 6.0,
        }
    }
}

/// One prescription interval in the window history.
///
/// `end_date` is inclusive; `None` marks the ongoing (active) period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowPeriod {
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub target_wake: NaiveTime,
    pub window_hours: f64,
}

impl WindowPeriod {
    /// Create an open (active) period starting on the given date
    pub fn open(start_date: NaiveDate, settings: &WindowSettings) -> Self {
        Self {
            start_date,
            end_date: None,
            target_wake: settings.target_wake,
            window_hours: settings.window_hours,
        }
    }

    /// Whether this period is the ongoing one
    pub fn is_active(&self) -> bool {
        self.end_date.is_none()
    }

    /// Whether the inclusive interval contains the date
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && self.end_date.map_or(true, |end| date <= end)
    }

    /// The window values prescribed by this period
    pub fn settings(&self) -> WindowSettings {
        WindowSettings {
            target_wake: self.target_wake,
            window_hours: self.window_hours,
        }
    }
}

/// Diary metadata: identity, the cached settings mirror and the window history.
///
/// The history is the source of truth for the prescribed window; `settings`
/// is a read-through cache of the active period, resynchronized by the ledger
/// on every mutation. `window_history` defaults to empty so legacy files
/// missing it still load (the ledger bootstraps it on first access).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryMeta {
    pub name: String,
    pub created: NaiveDate,
    pub version: String,
    pub settings: WindowSettings,
    #[serde(default)]
    pub window_history: Vec<WindowPeriod>,
}

/// Root aggregate: metadata plus per-night entries keyed by log-date string.
///
/// The ordered map gives chronological iteration (ISO dates sort
/// lexicographically) and last-write-wins overwrite semantics per log date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryFile {
    pub meta: DiaryMeta,
    #[serde(default)]
    pub entries: BTreeMap<String, DiaryEntry>,
}

impl DiaryFile {
    /// Create a fresh diary with default settings and one open window period
    pub fn new(name: impl Into<String>, today: NaiveDate) -> Self {
        let settings = WindowSettings::default();
        let bootstrap = WindowPeriod::open(today, &settings);
        Self {
            meta: DiaryMeta {
                name: name.into(),
                created: today,
                version: DIARY_VERSION.to_string(),
                settings,
                window_history: vec![bootstrap],
            },
            entries: BTreeMap::new(),
        }
    }

    /// Load a diary from its JSON representation
    pub fn from_json(json: &str) -> Result<Self, crate::DiaryError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the diary for storage
    pub fn to_json(&self) -> Result<String, crate::DiaryError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Insert or overwrite the entry for a log date
    pub fn upsert_entry(&mut self, date: NaiveDate, entry: DiaryEntry) {
        self.entries.insert(date.to_string(), entry);
    }

    /// Look up the entry for a log date
    pub fn entry(&self, date: NaiveDate) -> Option<&DiaryEntry> {
        self.entries.get(&date.to_string())
    }
}

/// A normalized awakening interval with absolute timestamps
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AwakeSpan {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_min: u32,
}

/// Derived metrics for one night. Never persisted; always recomputed from
/// the entry and its log date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NightMetrics {
    /// The night's log date
    pub date: NaiveDate,
    pub bed: NaiveDateTime,
    pub lights_out: NaiveDateTime,
    pub sleep_onset: NaiveDateTime,
    pub wake_up: NaiveDateTime,
    pub out_of_bed: NaiveDateTime,
    /// Time in bed (minutes)
    pub tib_min: f64,
    /// Total sleep time (minutes)
    pub tst_min: f64,
    /// Sleep efficiency (%, clamped to 0-100)
    pub se: f64,
    pub waso_minutes: u32,
    pub nap_minutes: u32,
    pub awakenings: Vec<AwakeSpan>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_new_diary_has_bootstrap_period() {
        let diary = DiaryFile::new("Kari", date("2026-02-01"));
        assert_eq!(diary.meta.version, "2.0");
        assert_eq!(diary.meta.window_history.len(), 1);
        let period = &diary.meta.window_history[0];
        assert!(period.is_active());
        assert_eq!(period.start_date, date("2026-02-01"));
        assert_eq!(period.settings(), diary.meta.settings);
        assert!(diary.entries.is_empty());
    }

    #[test]
    fn test_json_round_trip_is_lossless() {
        let mut diary = DiaryFile::new("Kari", date("2026-02-01"));
        diary.upsert_entry(
            date("2026-02-03"),
            DiaryEntry {
                bed_time: Some("23:00:00".parse().unwrap()),
                lights_out: Some("23:15:00".parse().unwrap()),
                sleep_onset: Some("23:30:00".parse().unwrap()),
                wake_up: Some("07:00:00".parse().unwrap()),
                out_of_bed: Some("07:15:00".parse().unwrap()),
                waso_minutes: 15,
                nap_minutes: 20,
                awakenings: vec![Awakening {
                    time: "03:00:00".parse().unwrap(),
                    duration_min: 15,
                }],
            },
        );

        let json = diary.to_json().unwrap();
        let reloaded = DiaryFile::from_json(&json).unwrap();
        assert_eq!(diary, reloaded);
    }

    #[test]
    fn test_wire_keys_match_legacy_format() {
        let diary = DiaryFile::new("Kari", date("2026-02-01"));
        let value: serde_json::Value =
            serde_json::from_str(&diary.to_json().unwrap()).unwrap();

        assert_eq!(value["meta"]["settings"]["target_wake"], "07:00:00");
        assert_eq!(value["meta"]["settings"]["window_hours"], 6.0);
        assert_eq!(value["meta"]["window_history"][0]["start_date"], "2026-02-01");
        assert!(value["meta"]["window_history"][0]["end_date"].is_null());
    }

    #[test]
    fn test_legacy_file_without_history_loads() {
        let json = r#"{
            "meta": {
                "name": "Ola",
                "created": "2025-11-01",
                "version": "1.0",
                "settings": { "target_wake": "06:30:00", "window_hours": 7.0 }
            },
            "entries": {}
        }"#;
        let diary = DiaryFile::from_json(json).unwrap();
        assert!(diary.meta.window_history.is_empty());
        assert_eq!(diary.meta.settings.window_hours, 7.0);
    }

    #[test]
    fn test_malformed_awakening_is_dropped() {
        let json = r#"{
            "bed_time": "23:00:00",
            "lights_out": "23:15:00",
            "sleep_onset": "23:30:00",
            "wake_up": "07:00:00",
            "out_of_bed": "07:15:00",
            "waso_minutes": 10,
            "nap_minutes": 0,
            "awakenings": [
                { "time": "not a time", "duration_min": 5 },
                { "time": "03:30:00", "duration_min": 10 }
            ]
        }"#;
        let entry: DiaryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.awakenings.len(), 1);
        assert_eq!(entry.awakenings[0].duration_min, 10);
    }

    #[test]
    fn test_entry_with_missing_times_loads() {
        let entry: DiaryEntry = serde_json::from_str(r#"{ "wake_up": "07:00:00" }"#).unwrap();
        assert!(entry.bed_time.is_none());
        assert_eq!(entry.wake_up, Some("07:00:00".parse().unwrap()));
        assert_eq!(entry.waso_minutes, 0);
        assert!(entry.awakenings.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_rejected() {
        assert!(DiaryFile::from_json("not valid json").is_err());
    }

    #[test]
    fn test_upsert_overwrites_same_date() {
        let mut diary = DiaryFile::new("Kari", date("2026-02-01"));
        let first = DiaryEntry {
            bed_time: Some("23:00:00".parse().unwrap()),
            lights_out: None,
            sleep_onset: None,
            wake_up: None,
            out_of_bed: None,
            waso_minutes: 0,
            nap_minutes: 0,
            awakenings: vec![],
        };
        let mut second = first.clone();
        second.waso_minutes = 45;

        diary.upsert_entry(date("2026-02-02"), first);
        diary.upsert_entry(date("2026-02-02"), second);
        assert_eq!(diary.entries.len(), 1);
        assert_eq!(diary.entry(date("2026-02-02")).unwrap().waso_minutes, 45);
    }
}
