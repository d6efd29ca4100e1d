//! Sovnlog CLI - inspect a sleep-diary file from the command line
//!
//! Commands:
//! - report: aggregate numbers and a day-by-day table for a date range
//! - advise: window recommendation, nap assessment and adherence
//! - validate: check the diary file structure and its window history

use clap::{Parser, Subcommand};
use chrono::{Days, Local, NaiveDate};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use sovnlog::advice::{AdviceEngine, WindowAdvice};
use sovnlog::format::{hours_as_hm, minutes_as_hm};
use sovnlog::ledger::validate_history;
use sovnlog::metrics::NightCalculator;
use sovnlog::summary::summarize;
use sovnlog::types::DiaryFile;
use sovnlog::SOVNLOG_VERSION;

/// Sovnlog - sleep-metric and sleep-window engine for a CBT-i sleep diary
#[derive(Parser)]
#[command(name = "sovnlog")]
#[command(version = SOVNLOG_VERSION)]
#[command(about = "Inspect a CBT-i sleep diary file", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print aggregate numbers and a day-by-day table
    Report {
        /// Diary JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// First date of the range (default: a week ago)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date of the range (default: yesterday)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Assess the current prescription period and print recommendations
    Advise {
        /// Diary JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check the diary file structure and its window history
    Validate {
        /// Diary JSON file
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Report {
            input,
            from,
            to,
            json,
        } => cmd_report(&input, from, to, json),
        Commands::Advise { input, json } => cmd_advise(&input, json),
        Commands::Validate { input } => cmd_validate(&input),
    }
}

fn load_diary(path: &PathBuf) -> Result<DiaryFile, String> {
    let raw = fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    DiaryFile::from_json(&raw).map_err(|e| format!("cannot parse {}: {e}", path.display()))
}

fn cmd_report(
    input: &PathBuf,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    json: bool,
) -> ExitCode {
    let diary = match load_diary(input) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let today = Local::now().date_naive();
    let from = from.unwrap_or(today - Days::new(7));
    let to = to.unwrap_or(today - Days::new(1));

    let batch = NightCalculator::compute_all(&diary.entries);
    for failure in &batch.failures {
        log::warn!("skipping night {}: {}", failure.date, failure.error);
    }

    let Some(summary) = summarize(&batch.nights, from, to) else {
        eprintln!("no nights logged between {from} and {to}");
        return ExitCode::FAILURE;
    };

    if json {
        match serde_json::to_string_pretty(&summary) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    println!("Sleep diary report ({})", diary.meta.name);
    println!("Period: {from} - {to}");
    println!("{} nights logged.", summary.nights);
    println!();
    println!("Averages:");
    println!("  SE:   {:.1}%", summary.mean_se);
    println!("  TST:  {}", minutes_as_hm(summary.mean_tst_min));
    println!("  TIB:  {}", minutes_as_hm(summary.mean_tib_min));
    println!("  WASO: {} min", summary.mean_waso_min as i64);
    println!("  Nap:  {} min", summary.mean_nap_min as i64);
    println!();
    println!("Day by day:");
    println!("| {:<10} | {:<6} | {:<7} | {:<7} | {:<5} | {:<5} |", "Date", "SE", "TST", "TIB", "WASO", "Nap");
    for night in batch
        .nights
        .iter()
        .filter(|n| n.date >= from && n.date <= to)
    {
        let waso: u32 = night.awakenings.iter().map(|a| a.duration_min).sum();
        println!(
            "| {:<10} | {:<6} | {:<7} | {:<7} | {:<5} | {:<5} |",
            night.date,
            format!("{:.1}%", night.se),
            minutes_as_hm(night.tst_min),
            minutes_as_hm(night.tib_min),
            format!("{waso}m"),
            format!("{}m", night.nap_minutes),
        );
    }

    ExitCode::SUCCESS
}

fn cmd_advise(input: &PathBuf, json: bool) -> ExitCode {
    let diary = match load_diary(input) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let today = Local::now().date_naive();
    let batch = NightCalculator::compute_all(&diary.entries);
    for failure in &batch.failures {
        log::warn!("skipping night {}: {}", failure.date, failure.error);
    }

    let Some(assessment) = AdviceEngine::assess(&batch.nights, &diary, today) else {
        eprintln!("no nights logged in the current period yet");
        return ExitCode::FAILURE;
    };

    if json {
        match serde_json::to_string_pretty(&assessment) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    let stats = &assessment.stats;
    println!("Sleep efficiency:  {:.1}%", stats.mean_se);
    println!("Total sleep (TST): {}", minutes_as_hm(stats.mean_tst_min));
    println!("Time in bed (TIB): {}", minutes_as_hm(stats.mean_tib_min));
    println!();

    match &assessment.window {
        WindowAdvice::InsufficientData { nights } => println!(
            "Need at least 3 nights in this period for a recommendation (have {nights})."
        ),
        WindowAdvice::Increase { new_window_hours } => println!(
            "Recommendation: INCREASE the sleep window by 15 minutes (to {}).",
            hours_as_hm(*new_window_hours)
        ),
        WindowAdvice::Decrease { new_window_hours } => println!(
            "Recommendation: REDUCE the sleep window by 15 minutes (to {}).",
            hours_as_hm(*new_window_hours)
        ),
        WindowAdvice::HoldAtFloor => {
            println!("Already at the minimum window (5 h); hold steady.")
        }
        WindowAdvice::Hold => println!("Keep the current window."),
    }

    println!(
        "Nights within the window (+/-30 min): {} / {}",
        assessment.adherence.adherent_nights, assessment.adherence.checked_nights
    );
    println!(
        "Days with daytime sleep: {} (mean {:.1} min/day)",
        assessment.naps.days_with_naps, assessment.naps.mean_nap_min_per_day
    );

    ExitCode::SUCCESS
}

fn cmd_validate(input: &PathBuf) -> ExitCode {
    let diary = match load_diary(input) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut ok = true;

    let batch = NightCalculator::compute_all(&diary.entries);
    for failure in &batch.failures {
        ok = false;
        println!("night {}: {}", failure.date, failure.error);
    }

    let mut history = diary.meta.window_history.clone();
    let report = validate_history(&mut history);
    for violation in &report.violations {
        ok = false;
        println!("history: {violation}");
    }
    for warning in &report.warnings {
        println!("warning: {warning}");
    }

    if ok {
        println!(
            "{} ok: {} nights, {} window periods",
            input.display(),
            batch.nights.len(),
            history.len()
        );
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
