// ********* Configuration **********

use std::time::Duration;

use log::warn;
use snafu::{ensure, Snafu};

use crate::tactic::TacticKind;

/// Expected cost of one contact attempt for a tactic, in dollars.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct TacticTarget {
    pub target: f64,
    pub std_dev: f64,
}

impl TacticTarget {
    pub const fn new(target: f64, std_dev: f64) -> TacticTarget {
        TacticTarget { target, std_dev }
    }

    pub fn lower_bound(&self) -> f64 {
        self.target - self.std_dev
    }

    pub fn upper_bound(&self) -> f64 {
        self.target + self.std_dev
    }
}

/// The cost-per-attempt bands of the tactics that have a budget category.
#[derive(PartialEq, Debug, Clone)]
pub struct TacticTargets {
    pub door: TacticTarget,
    pub phone: TacticTarget,
    pub text: TacticTarget,
    pub open: TacticTarget,
}

impl TacticTargets {
    pub const DEFAULT_TARGETS: TacticTargets = TacticTargets {
        door: TacticTarget::new(1.00, 0.20),
        phone: TacticTarget::new(0.66, 0.15),
        text: TacticTarget::new(0.02, 0.01),
        open: TacticTarget::new(0.40, 0.10),
    };

    /// The band for a tactic, or None for tactics without cost analysis.
    pub fn for_kind(&self, kind: TacticKind) -> Option<TacticTarget> {
        match kind {
            TacticKind::Door => Some(self.door),
            TacticKind::Phone => Some(self.phone),
            TacticKind::Text => Some(self.text),
            TacticKind::Open => Some(self.open),
            TacticKind::Relational | TacticKind::Registration | TacticKind::Mail => None,
        }
    }

    pub fn set_for_kind(&mut self, kind: TacticKind, target: TacticTarget) -> bool {
        match kind {
            TacticKind::Door => self.door = target,
            TacticKind::Phone => self.phone = target,
            TacticKind::Text => self.text = target,
            TacticKind::Open => self.open = target,
            _ => return false,
        }
        true
    }
}

impl Default for TacticTargets {
    fn default() -> Self {
        TacticTargets::DEFAULT_TARGETS
    }
}

/// Production sends to the full recipient list and marks budgets analyzed.
/// Test sends to the test recipients only, tags the subjects, and never marks anything.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum RunMode {
    Production,
    Test,
}

#[derive(PartialEq, Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("{tactic} cost target must be positive, got {value}"))]
    TargetNotPositive { tactic: TacticKind, value: f64 },
    #[snafu(display("{tactic} cost standard deviation must not be negative, got {value}"))]
    NegativeStdDev { tactic: TacticKind, value: f64 },
    #[snafu(display("missing counterpart threshold must be positive, got {hours} hours"))]
    ThresholdNotPositive { hours: i64 },
    #[snafu(display("data stipend hourly rate must be positive, got {rate}"))]
    RateNotPositive { rate: f64 },
    #[snafu(display("at least one send attempt is required"))]
    NoSendAttempt {},
    #[snafu(display("table names must not be empty"))]
    EmptyTableName {},
    #[snafu(display("no valid recipient address in {mode:?} mode"))]
    NoValidRecipient { mode: RunMode },
}

#[derive(PartialEq, Debug, Clone)]
pub struct AnalysisConfig {
    pub mode: RunMode,
    pub recipients: Vec<String>,
    pub test_recipients: Vec<String>,
    pub reply_to: String,
    pub targets: TacticTargets,
    /// Hours a submission may wait for its counterpart before an alert is sent.
    pub missing_threshold_hours: i64,
    /// Hourly labor rate used to express data funding as stipend hours.
    pub data_stipend_hourly_rate: f64,
    pub budget_table: String,
    pub field_plan_table: String,
    /// Names containing spaces that must not be split when a list is space separated.
    pub multi_word_names: Vec<String>,
    /// Named in the summary of fully funded programs.
    pub funder_name: String,
    pub send_attempts: u32,
    pub send_retry_delay: Duration,
}

impl AnalysisConfig {
    pub const DEFAULT_THRESHOLD_HOURS: i64 = 72;
    pub const DEFAULT_HOURLY_RATE: f64 = 20.0;
    pub const DEFAULT_BUDGET_TABLE: &'static str = "2025_field_budget";
    pub const DEFAULT_FIELD_PLAN_TABLE: &'static str = "2025_field_plan";

    /// Recipients for the current mode, with malformed addresses removed.
    pub fn active_recipients(&self) -> Vec<String> {
        let all = match self.mode {
            RunMode::Production => &self.recipients,
            RunMode::Test => &self.test_recipients,
        };
        all.iter()
            .map(|s| s.trim().to_string())
            .filter(|s| {
                let ok = is_valid_address(s);
                if !ok {
                    warn!("active_recipients: dropping invalid address {:?}", s);
                }
                ok
            })
            .collect()
    }

    pub fn subject(&self, subject: &str) -> String {
        match self.mode {
            RunMode::Production => subject.to_string(),
            RunMode::Test => format!("[TEST] {}", subject),
        }
    }

    pub fn missing_threshold(&self) -> chrono::Duration {
        chrono::Duration::hours(self.missing_threshold_hours)
    }

    /// Checks the values that would otherwise produce meaningless analyses.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in TacticKind::ALL {
            if let Some(t) = self.targets.for_kind(kind) {
                ensure!(
                    t.target.is_finite() && t.target > 0.0,
                    TargetNotPositiveSnafu {
                        tactic: kind,
                        value: t.target
                    }
                );
                ensure!(
                    t.std_dev.is_finite() && t.std_dev >= 0.0,
                    NegativeStdDevSnafu {
                        tactic: kind,
                        value: t.std_dev
                    }
                );
            }
        }
        ensure!(
            self.missing_threshold_hours > 0,
            ThresholdNotPositiveSnafu {
                hours: self.missing_threshold_hours
            }
        );
        ensure!(
            self.data_stipend_hourly_rate.is_finite() && self.data_stipend_hourly_rate > 0.0,
            RateNotPositiveSnafu {
                rate: self.data_stipend_hourly_rate
            }
        );
        ensure!(self.send_attempts > 0, NoSendAttemptSnafu);
        ensure!(
            !self.budget_table.trim().is_empty() && !self.field_plan_table.trim().is_empty(),
            EmptyTableNameSnafu
        );
        ensure!(
            !self.active_recipients().is_empty(),
            NoValidRecipientSnafu { mode: self.mode }
        );
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            mode: RunMode::Production,
            recipients: vec!["datateam@example.org".to_string()],
            test_recipients: vec!["datateam@example.org".to_string()],
            reply_to: "datateam@example.org".to_string(),
            targets: TacticTargets::DEFAULT_TARGETS,
            missing_threshold_hours: AnalysisConfig::DEFAULT_THRESHOLD_HOURS,
            data_stipend_hourly_rate: AnalysisConfig::DEFAULT_HOURLY_RATE,
            budget_table: AnalysisConfig::DEFAULT_BUDGET_TABLE.to_string(),
            field_plan_table: AnalysisConfig::DEFAULT_FIELD_PLAN_TABLE.to_string(),
            multi_word_names: [
                "St. Clair",
                "African American",
                "Native American",
                "Pacific Islander",
                "Middle Eastern",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            funder_name: "Alabama Forward".to_string(),
            send_attempts: 3,
            send_retry_delay: Duration::from_secs(1),
        }
    }
}

/// A loose `local@domain.tld` shape check.
pub fn is_valid_address(s: &str) -> bool {
    if s.chars().any(|c| c.is_whitespace()) {
        return false;
    }
    match s.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.contains('@') => {
            match domain.rsplit_once('.') {
                Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
                None => false,
            }
        }
        _ => false,
    }
}
