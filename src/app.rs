use log::{debug, info};

use fieldplan_analysis::*;
use snafu::{prelude::*, Snafu};

use chrono::Utc;
use std::path::{Path, PathBuf};

use crate::args::{Args, Command};

pub mod config_reader;
pub mod io_csv;
pub mod io_xlsx;
pub mod outbox;
pub mod properties_file;

use crate::app::config_reader::read_config;
use crate::app::io_csv::CsvStore;
use crate::app::outbox::Outbox;
use crate::app::properties_file::PropertiesFile;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AppError {
    #[snafu(display("Error opening file {path}: {source}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}: {source}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON in {path}: {source}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error reading CSV file {path}: {source}"))]
    ReadingCsv { source: csv::Error, path: String },
    #[snafu(display("Error writing CSV file {path}: {source}"))]
    WritingCsv { source: csv::Error, path: String },
    #[snafu(display("Error opening workbook {path}: {source}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Workbook {path} has no sheet named {sheet:?}"))]
    MissingSheet { path: String, sheet: String },
    #[snafu(display("Invalid configuration: {message}"))]
    InvalidConfig { message: String },
    #[snafu(display("Invalid configuration: {source}"))]
    Config { source: ConfigError },
    #[snafu(display("{source}"))]
    Analysis { source: AnalysisError },
}

pub type AppResult<T> = Result<T, AppError>;

fn load_config(args: &Args) -> AppResult<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => AnalysisConfig::default(),
    };
    if args.test_mode {
        config.mode = RunMode::Test;
    }
    config.validate().context(ConfigSnafu)?;
    debug!("load_config: {:?}", config);
    Ok(config)
}

type FileOrchestrator<'a> =
    Orchestrator<'a, CsvStore, PropertiesFile, RetryingNotifier<Outbox>>;

fn orchestrator<'a>(config: &'a AnalysisConfig, data_dir: &Path) -> FileOrchestrator<'a> {
    let store = CsvStore::new(data_dir);
    let properties = PropertiesFile::new(data_dir.join("properties.json"));
    let notifier = RetryingNotifier::new(
        Outbox::new(data_dir.join("outbox")),
        config.send_attempts,
        config.send_retry_delay,
    );
    Orchestrator::new(config, store, properties, notifier)
}

pub fn run(args: &Args) -> AppResult<()> {
    let config = load_config(args)?;
    let data_dir = PathBuf::from(&args.data);
    info!(
        "Using data directory {:?} in {:?} mode",
        data_dir.display().to_string(),
        config.mode
    );

    if let Command::Import {
        workbook,
        budget_sheet,
        field_plan_sheet,
    } = &args.command
    {
        let budget_sheet = budget_sheet.clone().unwrap_or_else(|| config.budget_table.clone());
        let plan_sheet = field_plan_sheet
            .clone()
            .unwrap_or_else(|| config.field_plan_table.clone());
        let store = CsvStore::new(&data_dir);
        for (sheet, table) in [
            (budget_sheet, &config.budget_table),
            (plan_sheet, &config.field_plan_table),
        ] {
            let n = io_xlsx::import_sheet(workbook, &sheet, &store, table)?;
            println!("Imported {} rows from sheet {:?} into table {}", n, sheet, table);
        }
        return Ok(());
    }

    let mut orch = orchestrator(&config, &data_dir);
    let now = Utc::now();
    match &args.command {
        Command::Analyze => {
            let s = orch.run_analysis_pass(now).context(AnalysisSnafu)?;
            println!(
                "analyzed: {}, sent without marking: {}, waiting for a field plan: {}, failed: {}, alerts sent: {}",
                s.analyzed, s.sent_unmarked, s.waiting_for_plan, s.failed, s.sweep.alerts_sent
            );
        }
        Command::Sweep => {
            let s = orch
                .run_missing_counterpart_sweep(now)
                .context(AnalysisSnafu)?;
            println!(
                "alerts sent: {}, failed: {}, still waiting: {}",
                s.alerts_sent, s.send_failures, s.still_waiting
            );
        }
        Command::CheckPlans => {
            let s = orch.run_new_field_plan_check(now).context(AnalysisSnafu)?;
            println!(
                "new field plans: {}, budgets analyzed: {}, failed: {}, alerts sent: {}",
                s.announced, s.analyzed, s.failed, s.sweep.alerts_sent
            );
        }
        Command::WeeklySummary => {
            let s = orch.run_weekly_summary(now).context(AnalysisSnafu)?;
            println!(
                "analyzed: {}, pending: {}, waiting for a field plan: {}",
                s.analyzed, s.pending, s.waiting_for_plan
            );
        }
        Command::AnalyzeOrg { name } => {
            let outcome = orch
                .analyze_organization(name, now)
                .context(AnalysisSnafu)?;
            println!("{}: {:?}", name, outcome);
        }
        Command::Import { .. } => {}
    }
    Ok(())
}
