// Reading the JSON configuration file.

use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;

use fieldplan_analysis::{AnalysisConfig, RunMode, TacticKind, TacticTarget};
use log::debug;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::app::*;

/// Every key is optional. Missing keys keep the defaults of [`AnalysisConfig`].
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(rename = "testMode")]
    pub test_mode: Option<bool>,
    pub recipients: Option<Vec<String>>,
    #[serde(rename = "testRecipients")]
    pub test_recipients: Option<Vec<String>>,
    #[serde(rename = "replyTo")]
    pub reply_to: Option<String>,
    /// Keyed by tactic name: DOOR, PHONE, TEXT or OPEN.
    #[serde(rename = "costTargets")]
    pub cost_targets: Option<BTreeMap<String, CostTargetFile>>,
    #[serde(rename = "missingThresholdHours")]
    pub missing_threshold_hours: Option<i64>,
    #[serde(rename = "dataStipendHourlyRate")]
    pub data_stipend_hourly_rate: Option<f64>,
    #[serde(rename = "budgetTable")]
    pub budget_table: Option<String>,
    #[serde(rename = "fieldPlanTable")]
    pub field_plan_table: Option<String>,
    #[serde(rename = "multiWordNames")]
    pub multi_word_names: Option<Vec<String>>,
    #[serde(rename = "funderName")]
    pub funder_name: Option<String>,
    #[serde(rename = "sendAttempts")]
    pub send_attempts: Option<u32>,
    #[serde(rename = "sendRetryDelayMs")]
    pub send_retry_delay_ms: Option<u64>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CostTargetFile {
    pub target: f64,
    #[serde(rename = "stdDev")]
    pub std_dev: f64,
}

impl ConfigFile {
    pub fn into_config(self) -> AppResult<AnalysisConfig> {
        let mut c = AnalysisConfig::default();
        if let Some(true) = self.test_mode {
            c.mode = RunMode::Test;
        }
        if let Some(x) = self.recipients {
            c.recipients = x;
        }
        if let Some(x) = self.test_recipients {
            c.test_recipients = x;
        }
        if let Some(x) = self.reply_to {
            c.reply_to = x;
        }
        for (name, t) in self.cost_targets.unwrap_or_default() {
            let kind = match TacticKind::from_name(&name) {
                Some(k) => k,
                None => {
                    return InvalidConfigSnafu {
                        message: format!("unknown tactic {:?} in costTargets", name),
                    }
                    .fail()
                }
            };
            if !c.targets.set_for_kind(kind, TacticTarget::new(t.target, t.std_dev)) {
                return InvalidConfigSnafu {
                    message: format!("tactic {} has no cost target", kind),
                }
                .fail();
            }
        }
        if let Some(x) = self.missing_threshold_hours {
            c.missing_threshold_hours = x;
        }
        if let Some(x) = self.data_stipend_hourly_rate {
            c.data_stipend_hourly_rate = x;
        }
        if let Some(x) = self.budget_table {
            c.budget_table = x;
        }
        if let Some(x) = self.field_plan_table {
            c.field_plan_table = x;
        }
        if let Some(x) = self.multi_word_names {
            c.multi_word_names = x;
        }
        if let Some(x) = self.funder_name {
            c.funder_name = x;
        }
        if let Some(x) = self.send_attempts {
            c.send_attempts = x;
        }
        if let Some(x) = self.send_retry_delay_ms {
            c.send_retry_delay = Duration::from_millis(x);
        }
        Ok(c)
    }
}

pub fn parse_config(contents: &str, path: &str) -> AppResult<AnalysisConfig> {
    let cf: ConfigFile = serde_json::from_str(contents).context(ParsingJsonSnafu { path })?;
    debug!("parse_config: {:?}", cf);
    cf.into_config()
}

pub fn read_config(path: &str) -> AppResult<AnalysisConfig> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    parse_config(&contents, path)
}
