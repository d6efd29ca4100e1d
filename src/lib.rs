//! Sovnlog - sleep-metric and sleep-window engine for a CBT-i sleep diary
//!
//! Sovnlog turns raw per-night diary entries into clinically meaningful
//! metrics (TIB, TST, SE, WASO intervals), tracks how the prescribed sleep
//! window changes over time, and assesses adherence against the plan that
//! applied on each specific night.
//!
//! ## Modules
//!
//! - **pivot**: resolves bare times-of-day to absolute timestamps (18:00 pivot)
//! - **metrics**: per-night metric computation from diary entries
//! - **ledger**: the sleep-window history ledger and its validation
//! - **advice**: window recommendation, nap assessment and adherence scoring
//! - **summary**: aggregate report numbers over a date range

pub mod advice;
pub mod error;
pub mod format;
pub mod ledger;
pub mod metrics;
pub mod pivot;
pub mod plan;
pub mod summary;
pub mod types;

pub use advice::{AdviceEngine, Assessment};
pub use error::DiaryError;
pub use ledger::{validate_history, HistoryReport};
pub use metrics::{NightBatch, NightCalculator};
pub use pivot::{resolve_timestamp, PIVOT_HOUR};
pub use types::{DiaryEntry, DiaryFile, NightMetrics, WindowPeriod, WindowSettings};

/// Sovnlog version embedded in CLI output
pub const SOVNLOG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Schema version written into new diary files
pub const DIARY_VERSION: &str = "2.0";
