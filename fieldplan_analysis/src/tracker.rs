// ********* Missing counterpart tracking ***********

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};

use crate::cell::normalize_text;
use crate::config::AnalysisConfig;
use crate::notifier::{Message, Notifier};
use crate::store::{PropertyError, PropertyStore};

/// Which half of a submission pair is missing.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Direction {
    /// A budget was submitted and no field plan matches it.
    BudgetMissingPlan,
    /// A field plan was submitted and no budget matches it.
    PlanMissingBudget,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::BudgetMissingPlan, Direction::PlanMissingBudget];

    pub fn key_prefix(&self) -> &'static str {
        match self {
            Direction::BudgetMissingPlan => "MISSING_PLAN_",
            Direction::PlanMissingBudget => "MISSING_BUDGET_",
        }
    }

    pub fn key(&self, org_name: &str) -> String {
        format!("{}{}", self.key_prefix(), normalize_text(org_name))
    }

    fn alert(&self, org_name: &str, since: &DateTime<Utc>, threshold_hours: i64) -> (String, String) {
        match self {
            Direction::BudgetMissingPlan => (
                format!("Missing Field Plan: {}", org_name),
                format!(
                    "<h2>Missing Field Plan Alert</h2>\n\
                     <p><strong>Organization:</strong> {}</p>\n\
                     <p>This organization submitted a budget more than {} hours ago (first seen {}) but has not yet submitted a field plan.</p>\n\
                     <p>The budget analysis cannot be completed without a corresponding field plan.</p>\n\
                     <p>Please follow up with the organization to request their field plan submission.</p>\n",
                    org_name,
                    threshold_hours,
                    since.to_rfc3339(),
                ),
            ),
            Direction::PlanMissingBudget => (
                format!("Missing Budget: {}", org_name),
                format!(
                    "<h2>Missing Budget Alert</h2>\n\
                     <p><strong>Organization:</strong> {}</p>\n\
                     <p>This organization submitted a field plan more than {} hours ago (first seen {}) but has not yet submitted a budget.</p>\n\
                     <p>Cost efficiency analysis cannot be performed without budget data.</p>\n\
                     <p>Please follow up with the organization to request their budget submission.</p>\n",
                    org_name,
                    threshold_hours,
                    since.to_rfc3339(),
                ),
            ),
        }
    }
}

/// Outcome of one sweep.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct SweepSummary {
    pub alerts_sent: usize,
    pub send_failures: usize,
    pub still_waiting: usize,
    pub discarded: usize,
}

impl SweepSummary {
    pub fn merge(self, other: SweepSummary) -> SweepSummary {
        SweepSummary {
            alerts_sent: self.alerts_sent + other.alerts_sent,
            send_failures: self.send_failures + other.send_failures,
            still_waiting: self.still_waiting + other.still_waiting,
            discarded: self.discarded + other.discarded,
        }
    }
}

/// Persistent record of the submissions waiting for their counterpart.
///
/// Each (direction, organization) pair is either untracked, or tracked with the time it was
/// first observed. A sweep alerts once per tracked pair older than the threshold and forgets
/// it in the same step.
pub struct MissingCounterpartTracker {
    threshold: Duration,
}

impl MissingCounterpartTracker {
    pub fn new(threshold: Duration) -> MissingCounterpartTracker {
        MissingCounterpartTracker { threshold }
    }

    pub fn from_config(config: &AnalysisConfig) -> MissingCounterpartTracker {
        MissingCounterpartTracker::new(config.missing_threshold())
    }

    /// Starts tracking unless already tracked. Returns true if a record was created.
    pub fn track<P: PropertyStore + ?Sized>(
        &self,
        props: &mut P,
        direction: Direction,
        org_name: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, PropertyError> {
        let key = direction.key(org_name);
        if props.get(&key)?.is_some() {
            debug!("track: {} already tracked", key);
            return Ok(false);
        }
        info!("track: {} first seen at {}", key, now.to_rfc3339());
        props.set(&key, &now.to_rfc3339())?;
        Ok(true)
    }

    /// Forgets a tracked pair. Returns true if a record existed.
    pub fn resolve<P: PropertyStore + ?Sized>(
        &self,
        props: &mut P,
        direction: Direction,
        org_name: &str,
    ) -> Result<bool, PropertyError> {
        let key = direction.key(org_name);
        if props.get(&key)?.is_none() {
            return Ok(false);
        }
        info!("resolve: {} has its counterpart", key);
        props.delete(&key)?;
        Ok(true)
    }

    pub fn is_tracked<P: PropertyStore + ?Sized>(
        &self,
        props: &P,
        direction: Direction,
        org_name: &str,
    ) -> Result<bool, PropertyError> {
        Ok(props.get(&direction.key(org_name))?.is_some())
    }

    /// Alerts on every pair of this direction that waited longer than the threshold.
    ///
    /// A record is deleted once its alert is sent. When the send fails the record stays, and
    /// the next sweep retries it.
    pub fn sweep<P: PropertyStore + ?Sized, N: Notifier + ?Sized>(
        &self,
        direction: Direction,
        now: DateTime<Utc>,
        props: &mut P,
        notifier: &mut N,
        config: &AnalysisConfig,
    ) -> Result<SweepSummary, PropertyError> {
        let mut summary = SweepSummary::default();
        let prefix = direction.key_prefix();
        for (key, value) in props.list_prefix(prefix)? {
            let org_name = &key[prefix.len()..];
            let since = match DateTime::parse_from_rfc3339(&value) {
                Ok(ts) => ts.with_timezone(&Utc),
                Err(e) => {
                    warn!("sweep: discarding {} with unreadable timestamp {:?}: {}", key, value, e);
                    props.delete(&key)?;
                    summary.discarded += 1;
                    continue;
                }
            };
            if now - since <= self.threshold {
                summary.still_waiting += 1;
                continue;
            }
            let (subject, body) = direction.alert(org_name, &since, self.threshold.num_hours());
            let msg = Message::compose(config, &subject, &body);
            match notifier.send(&msg) {
                Ok(()) => {
                    info!("sweep: alert sent for {}", key);
                    props.delete(&key)?;
                    summary.alerts_sent += 1;
                }
                Err(e) => {
                    warn!("sweep: alert for {} not sent, will retry: {}", key, e);
                    summary.send_failures += 1;
                }
            }
        }
        Ok(summary)
    }
}
