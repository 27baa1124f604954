// ********* Analysis orchestration ***********

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use snafu::{OptionExt, ResultExt, Snafu};

use crate::cell::CellValue;
use crate::config::{AnalysisConfig, RunMode};
use crate::matcher::{FieldPlanIndex, OrgIndex};
use crate::notifier::{Message, Notifier, NotifyError};
use crate::records::{Budget, BudgetColumns, FieldPlan};
use crate::report::{
    error_subject, new_field_plan_subject, render_error_html, render_field_plan_html,
    AnalysisReport, WeeklySummary,
};
use crate::store::{PropertyError, PropertyStore, Row, StoreError, TabularStore};
use crate::tracker::{Direction, MissingCounterpartTracker, SweepSummary};

/// Property holding the index of the last field plan row that was announced.
pub const LAST_PROCESSED_ROW: &str = "LAST_PROCESSED_ROW";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AnalysisError {
    #[snafu(display("Configuration error: {message}"))]
    Configuration { message: String },
    #[snafu(display("Tabular store error: {source}"))]
    Store { source: StoreError },
    #[snafu(display("Property store error: {source}"))]
    Property { source: PropertyError },
    #[snafu(display("Could not send the report for {org}: {source}"))]
    Notify { org: String, source: NotifyError },
    #[snafu(display("No budget found for organization {org:?}"))]
    NoBudget { org: String },
}

/// What happened to one budget.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum BudgetOutcome {
    /// The report was sent and the budget marked analyzed.
    Analyzed,
    /// The report was sent. Marking is suppressed in test mode.
    SentUnmarked,
    /// No field plan matches the budget yet.
    WaitingForPlan,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct PassSummary {
    pub analyzed: usize,
    pub sent_unmarked: usize,
    pub waiting_for_plan: usize,
    pub failed: usize,
    pub sweep: SweepSummary,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct NewPlanSummary {
    pub announced: usize,
    pub analyzed: usize,
    pub failed: usize,
    pub sweep: SweepSummary,
}

/// Runs the scheduled entry points against a store, a property map and a notifier.
pub struct Orchestrator<'a, S, P, N> {
    config: &'a AnalysisConfig,
    store: S,
    properties: P,
    notifier: N,
    tracker: MissingCounterpartTracker,
}

impl<'a, S: TabularStore, P: PropertyStore, N: Notifier> Orchestrator<'a, S, P, N> {
    pub fn new(
        config: &'a AnalysisConfig,
        store: S,
        properties: P,
        notifier: N,
    ) -> Orchestrator<'a, S, P, N> {
        Orchestrator {
            config,
            store,
            properties,
            notifier,
            tracker: MissingCounterpartTracker::from_config(config),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn properties(&self) -> &P {
        &self.properties
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn into_parts(self) -> (S, P, N) {
        (self.store, self.properties, self.notifier)
    }

    // ***** Entry points *****

    /// Analyzes every budget not analyzed yet, then sweeps both tracking directions.
    pub fn run_analysis_pass(&mut self, now: DateTime<Utc>) -> Result<PassSummary, AnalysisError> {
        info!("run_analysis_pass: starting at {}", now.to_rfc3339());
        if let Err(e) = self.check_tables() {
            warn!("run_analysis_pass: aborted: {}", e);
            self.notify_error("analysis pass", &e);
            return Err(e);
        }
        let budgets = self.load_budgets()?;
        let plans = FieldPlanIndex::new(self.load_plans()?);
        debug!(
            "run_analysis_pass: {} budgets, {} organizations with a field plan",
            budgets.len(),
            plans.len()
        );

        let mut summary = PassSummary::default();
        for budget in budgets.iter().filter(|b| !b.analyzed) {
            match self.process_budget(budget, &plans, now) {
                Ok(BudgetOutcome::Analyzed) => summary.analyzed += 1,
                Ok(BudgetOutcome::SentUnmarked) => summary.sent_unmarked += 1,
                Ok(BudgetOutcome::WaitingForPlan) => summary.waiting_for_plan += 1,
                Err(e) => {
                    warn!(
                        "run_analysis_pass: budget of {} (row {}) failed: {}",
                        budget.member_org_name, budget.row_index, e
                    );
                    summary.failed += 1;
                    self.notify_error(&budget.member_org_name, &e);
                }
            }
        }

        summary.sweep = self.run_missing_counterpart_sweep(now)?;
        info!(
            "run_analysis_pass: {} analyzed, {} sent without marking, {} waiting for a plan, {} failed, {} alerts",
            summary.analyzed,
            summary.sent_unmarked,
            summary.waiting_for_plan,
            summary.failed,
            summary.sweep.alerts_sent
        );
        Ok(summary)
    }

    pub fn run_missing_counterpart_sweep(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<SweepSummary, AnalysisError> {
        let mut summary = SweepSummary::default();
        for direction in Direction::ALL {
            summary = summary.merge(self.sweep(direction, now)?);
        }
        Ok(summary)
    }

    /// Announces the field plans submitted since the last check.
    pub fn run_new_field_plan_check(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<NewPlanSummary, AnalysisError> {
        info!("run_new_field_plan_check: starting at {}", now.to_rfc3339());
        if let Err(e) = self.check_tables() {
            warn!("run_new_field_plan_check: aborted: {}", e);
            self.notify_error("field plan check", &e);
            return Err(e);
        }
        let rows = self
            .store
            .list_rows(&self.config.field_plan_table)
            .context(StoreSnafu)?;
        let cursor = self.read_cursor()?;
        let budgets = OrgIndex::new(self.load_budgets()?);
        let plans = FieldPlanIndex::new(self.load_plans()?);

        // Budget rows analyzed during this check. The index above is not updated.
        let mut analyzed_rows: HashSet<usize> = HashSet::new();
        let mut summary = NewPlanSummary::default();
        for (idx, row) in rows.iter().enumerate().skip(cursor.saturating_add(1)) {
            if is_blank(row) {
                self.write_cursor(idx)?;
                continue;
            }
            let plan = FieldPlan::from_row(idx, row, &self.config.multi_word_names);
            let msg = Message::compose(
                self.config,
                &new_field_plan_subject(&plan),
                &render_field_plan_html(&plan),
            );
            if let Err(e) = self.notifier.send(&msg) {
                warn!(
                    "run_new_field_plan_check: announcement of row {} failed, will retry: {}",
                    idx, e
                );
                summary.failed += 1;
                break;
            }
            summary.announced += 1;
            self.write_cursor(idx)?;

            let org = plan.member_org_name.clone();
            if org.is_empty() {
                continue;
            }
            self.tracker
                .resolve(&mut self.properties, Direction::BudgetMissingPlan, &org)
                .context(PropertySnafu)?;
            match budgets.find(&org) {
                None => {
                    self.tracker
                        .track(&mut self.properties, Direction::PlanMissingBudget, &org, now)
                        .context(PropertySnafu)?;
                }
                Some(budget) => {
                    self.tracker
                        .resolve(&mut self.properties, Direction::PlanMissingBudget, &org)
                        .context(PropertySnafu)?;
                    if budget.analyzed || analyzed_rows.contains(&budget.row_index) {
                        continue;
                    }
                    let newest = plans.find_field_plan_for(&org).unwrap_or(&plan);
                    match self.analyze_and_send(budget, newest) {
                        Ok(_) => {
                            analyzed_rows.insert(budget.row_index);
                            summary.analyzed += 1;
                        }
                        Err(e) => {
                            warn!("run_new_field_plan_check: budget of {} failed: {}", org, e);
                            self.notify_error(&org, &e);
                        }
                    }
                }
            }
        }

        summary.sweep = self.sweep(Direction::PlanMissingBudget, now)?;
        info!(
            "run_new_field_plan_check: {} announced, {} budgets analyzed, {} alerts",
            summary.announced, summary.analyzed, summary.sweep.alerts_sent
        );
        Ok(summary)
    }

    /// Sends the status counts of the budget table.
    pub fn run_weekly_summary(&mut self, now: DateTime<Utc>) -> Result<WeeklySummary, AnalysisError> {
        self.check_tables()?;
        let mut summary = WeeklySummary::default();
        for budget in self.load_budgets()? {
            if budget.analyzed {
                summary.analyzed += 1;
            } else {
                summary.pending += 1;
                let waiting = self
                    .tracker
                    .is_tracked(
                        &self.properties,
                        Direction::BudgetMissingPlan,
                        &budget.member_org_name,
                    )
                    .context(PropertySnafu)?;
                if waiting {
                    summary.waiting_for_plan += 1;
                }
            }
            summary.total_requested += budget.requested_total;
            summary.total_gap += budget.gap_total.abs();
        }
        let date = now.format("%Y-%m-%d").to_string();
        let msg = Message::compose(
            self.config,
            &summary.subject(&date),
            &summary.render_html(&date),
        );
        self.notifier.send(&msg).context(NotifySnafu {
            org: "weekly summary",
        })?;
        info!(
            "run_weekly_summary: {} analyzed, {} pending",
            summary.analyzed, summary.pending
        );
        Ok(summary)
    }

    /// Analyzes the most recent budget of an organization, even if it was analyzed before.
    pub fn analyze_organization(
        &mut self,
        org_name: &str,
        now: DateTime<Utc>,
    ) -> Result<BudgetOutcome, AnalysisError> {
        info!("analyze_organization: {}", org_name);
        self.check_tables()?;
        let budgets = OrgIndex::new(self.load_budgets()?);
        let budget = budgets
            .find(org_name)
            .context(NoBudgetSnafu { org: org_name })?;
        let plans = FieldPlanIndex::new(self.load_plans()?);
        let res = self.process_budget(budget, &plans, now);
        if let Err(e) = &res {
            self.notify_error(&budget.member_org_name, e);
        }
        res
    }

    // ***** Steps *****

    fn process_budget(
        &mut self,
        budget: &Budget,
        plans: &FieldPlanIndex,
        now: DateTime<Utc>,
    ) -> Result<BudgetOutcome, AnalysisError> {
        let org = &budget.member_org_name;
        self.tracker
            .resolve(&mut self.properties, Direction::PlanMissingBudget, org)
            .context(PropertySnafu)?;
        match plans.find_field_plan_for(org) {
            None => {
                debug!("process_budget: no field plan for {}", org);
                self.tracker
                    .track(&mut self.properties, Direction::BudgetMissingPlan, org, now)
                    .context(PropertySnafu)?;
                Ok(BudgetOutcome::WaitingForPlan)
            }
            Some(plan) => {
                self.tracker
                    .resolve(&mut self.properties, Direction::BudgetMissingPlan, org)
                    .context(PropertySnafu)?;
                self.analyze_and_send(budget, plan)
            }
        }
    }

    /// The budget is marked only after its report was sent.
    fn analyze_and_send(
        &mut self,
        budget: &Budget,
        plan: &FieldPlan,
    ) -> Result<BudgetOutcome, AnalysisError> {
        let report = AnalysisReport::build(budget, plan, self.config);
        let msg = Message::compose(self.config, &report.subject(), &report.render_html());
        self.notifier.send(&msg).context(NotifySnafu {
            org: budget.member_org_name.as_str(),
        })?;
        match self.config.mode {
            RunMode::Test => {
                info!(
                    "analyze_and_send: test mode, {} (row {}) left unmarked",
                    budget.member_org_name, budget.row_index
                );
                Ok(BudgetOutcome::SentUnmarked)
            }
            RunMode::Production => {
                if !budget.analyzed {
                    self.store
                        .set_cell(
                            &self.config.budget_table,
                            budget.row_index,
                            BudgetColumns::ANALYZED,
                            CellValue::Bool(true),
                        )
                        .context(StoreSnafu)?;
                }
                info!(
                    "analyze_and_send: {} (row {}) analyzed",
                    budget.member_org_name, budget.row_index
                );
                Ok(BudgetOutcome::Analyzed)
            }
        }
    }

    fn sweep(&mut self, direction: Direction, now: DateTime<Utc>) -> Result<SweepSummary, AnalysisError> {
        self.tracker
            .sweep(
                direction,
                now,
                &mut self.properties,
                &mut self.notifier,
                self.config,
            )
            .context(PropertySnafu)
    }

    /// Best effort: a failure is only logged.
    fn notify_error(&mut self, label: &str, error: &AnalysisError) {
        let msg = Message::compose(
            self.config,
            &error_subject(label),
            &render_error_html(label, &error.to_string()),
        );
        if let Err(e) = self.notifier.send(&msg) {
            warn!("notify_error: could not report the error for {}: {}", label, e);
        }
    }

    // ***** Loading *****

    fn check_tables(&self) -> Result<(), AnalysisError> {
        let mut missing: Vec<&str> = Vec::new();
        for table in [&self.config.budget_table, &self.config.field_plan_table] {
            if !self.store.has_table(table) {
                missing.push(table);
            }
        }
        if !missing.is_empty() {
            return ConfigurationSnafu {
                message: format!("missing table(s): {}", missing.join(", ")),
            }
            .fail();
        }
        Ok(())
    }

    fn load_budgets(&self) -> Result<Vec<Budget>, AnalysisError> {
        let rows = self
            .store
            .list_rows(&self.config.budget_table)
            .context(StoreSnafu)?;
        let mut res = Vec::new();
        for (idx, row) in rows.iter().enumerate().skip(1) {
            if is_blank(row) {
                continue;
            }
            let budget = Budget::from_row(idx, row);
            if budget.member_org_name.is_empty() {
                warn!("load_budgets: row {} has no organization name, skipping", idx);
                continue;
            }
            res.push(budget);
        }
        Ok(res)
    }

    fn load_plans(&self) -> Result<Vec<FieldPlan>, AnalysisError> {
        let rows = self
            .store
            .list_rows(&self.config.field_plan_table)
            .context(StoreSnafu)?;
        Ok(rows
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, row)| !is_blank(row))
            .map(|(idx, row)| FieldPlan::from_row(idx, row, &self.config.multi_word_names))
            .collect())
    }

    fn read_cursor(&self) -> Result<usize, AnalysisError> {
        let value = self
            .properties
            .get(LAST_PROCESSED_ROW)
            .context(PropertySnafu)?;
        Ok(match value {
            None => 0,
            Some(v) => match v.trim().parse::<usize>() {
                Ok(x) => x,
                Err(_) => {
                    warn!("read_cursor: ignoring unreadable cursor {:?}", v);
                    0
                }
            },
        })
    }

    fn write_cursor(&mut self, row: usize) -> Result<(), AnalysisError> {
        self.properties
            .set(LAST_PROCESSED_ROW, &row.to_string())
            .context(PropertySnafu)
    }
}

fn is_blank(row: &Row) -> bool {
    row.iter().all(|c| c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::RecordingNotifier;
    use crate::records::tests::budget_row;
    use crate::records::FieldPlanColumns;
    use crate::store::{MemoryProperties, MemoryStore};
    use crate::tactic::TacticKind;
    use chrono::{Duration, TimeZone};

    type TestOrchestrator<'a> = Orchestrator<'a, MemoryStore, MemoryProperties, RecordingNotifier>;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn header() -> Row {
        vec![CellValue::Text("Timestamp".to_string())]
    }

    fn acme_budget_row() -> Row {
        budget_row(
            "Acme Org",
            &[
                (36, CellValue::Number(150.0)),
                (38, CellValue::Number(-50.0)),
                (51, CellValue::Number(150.0)),
                (53, CellValue::Number(-50.0)),
            ],
        )
    }

    fn plan_row(org: &str) -> Row {
        let mut row = vec![CellValue::Empty; FieldPlanColumns::WIDTH];
        row[FieldPlanColumns::TIMESTAMP] = CellValue::Text("2025-02-20 08:00:00".to_string());
        row[FieldPlanColumns::MEMBER_NAME] = CellValue::Text(org.to_string());
        row[FieldPlanColumns::NEED_COACHING] = CellValue::Number(9.0);
        let door = TacticKind::Door.columns();
        row[door.program_length] = CellValue::Number(4.0);
        row[door.weekly_volunteers] = CellValue::Number(5.0);
        row[door.weekly_hours] = CellValue::Number(3.0);
        row[door.hourly_attempts] = CellValue::Number(10.0);
        row
    }

    fn store(budgets: Vec<Row>, plans: Vec<Row>) -> MemoryStore {
        let config = AnalysisConfig::default();
        let mut s = MemoryStore::new();
        let mut b = vec![header()];
        b.extend(budgets);
        let mut p = vec![header()];
        p.extend(plans);
        s.insert_table(&config.budget_table, b);
        s.insert_table(&config.field_plan_table, p);
        s
    }

    fn orchestrator(config: &AnalysisConfig, store: MemoryStore) -> TestOrchestrator<'_> {
        Orchestrator::new(config, store, MemoryProperties::new(), RecordingNotifier::new())
    }

    fn analyzed_flag(o: &TestOrchestrator, row: usize) -> bool {
        let r = o.store().get_row(&o.config.budget_table, row).unwrap();
        r.get(BudgetColumns::ANALYZED)
            .map(|c| c.as_flag())
            .unwrap_or(false)
    }

    #[test]
    fn acme_end_to_end() {
        let config = AnalysisConfig::default();
        let mut o = orchestrator(&config, store(vec![acme_budget_row()], vec![plan_row("Acme Org")]));
        let s = o.run_analysis_pass(t0()).unwrap();
        assert_eq!(s.analyzed, 1);
        assert!(analyzed_flag(&o, 1));
        let sent = &o.notifier().sent;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Budget Analysis: Acme Org");
        assert!(sent[0].body.contains("Cost Per Attempt: $0.25"));
        assert!(sent[0].body.contains("Status: below target range"));
        assert!(sent[0].body.contains("by up to $50.00"));
        assert!(sent[0].body.contains("originally negative"));
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let config = AnalysisConfig::default();
        let mut o = orchestrator(
            &config,
            store(
                vec![acme_budget_row(), budget_row("Beta Org", &[])],
                vec![plan_row("Acme Org")],
            ),
        );
        let first = o.run_analysis_pass(t0()).unwrap();
        assert_eq!(first.analyzed, 1);
        assert_eq!(first.waiting_for_plan, 1);
        let sends = o.notifier().sent.len();
        let props = o.properties().len();

        let second = o.run_analysis_pass(t0() + Duration::minutes(5)).unwrap();
        assert_eq!(second.analyzed, 0);
        assert_eq!(second.sweep.alerts_sent, 0);
        assert_eq!(o.notifier().sent.len(), sends);
        assert_eq!(o.properties().len(), props);
    }

    #[test]
    fn failed_send_leaves_budget_unanalyzed() {
        let config = AnalysisConfig::default();
        let st = store(vec![acme_budget_row()], vec![plan_row("Acme Org")]);
        // The report and the error notification both fail.
        let mut o = Orchestrator::new(&config, st, MemoryProperties::new(), RecordingNotifier::failing(2));
        let s = o.run_analysis_pass(t0()).unwrap();
        assert_eq!(s.failed, 1);
        assert!(!analyzed_flag(&o, 1));

        let s = o.run_analysis_pass(t0() + Duration::hours(12)).unwrap();
        assert_eq!(s.analyzed, 1);
        assert!(analyzed_flag(&o, 1));
    }

    #[test]
    fn failed_send_is_reported() {
        let config = AnalysisConfig::default();
        let st = store(vec![acme_budget_row()], vec![plan_row("Acme Org")]);
        let mut o = Orchestrator::new(&config, st, MemoryProperties::new(), RecordingNotifier::failing(1));
        o.run_analysis_pass(t0()).unwrap();
        assert_eq!(o.notifier().subjects(), vec!["Budget Analysis Error: Acme Org"]);
    }

    #[test]
    fn test_mode_never_marks() {
        let config = AnalysisConfig {
            mode: RunMode::Test,
            ..AnalysisConfig::default()
        };
        let mut o = orchestrator(&config, store(vec![acme_budget_row()], vec![plan_row("Acme Org")]));
        let s = o.run_analysis_pass(t0()).unwrap();
        assert_eq!(s.sent_unmarked, 1);
        assert!(!analyzed_flag(&o, 1));
        assert_eq!(o.notifier().subjects(), vec!["[TEST] Budget Analysis: Acme Org"]);
    }

    #[test]
    fn missing_plan_is_alerted_once() {
        let config = AnalysisConfig::default();
        let mut o = orchestrator(&config, store(vec![acme_budget_row()], vec![]));
        let s = o.run_analysis_pass(t0()).unwrap();
        assert_eq!(s.waiting_for_plan, 1);
        assert!(o.notifier().sent.is_empty());
        assert!(o
            .properties()
            .get("MISSING_PLAN_Acme Org")
            .unwrap()
            .is_some());

        let s = o.run_missing_counterpart_sweep(t0() + Duration::hours(73)).unwrap();
        assert_eq!(s.alerts_sent, 1);
        let s = o.run_missing_counterpart_sweep(t0() + Duration::hours(146)).unwrap();
        assert_eq!(s.alerts_sent, 0);
        assert_eq!(o.notifier().subjects(), vec!["Missing Field Plan: Acme Org"]);
    }

    #[test]
    fn plan_arrival_resolves_tracking() {
        let config = AnalysisConfig::default();
        let mut o = orchestrator(&config, store(vec![acme_budget_row()], vec![]));
        o.run_analysis_pass(t0()).unwrap();
        let (mut st, props, notifier) = o.into_parts();
        st.append_row(&config.field_plan_table, plan_row("Acme  Org")).unwrap();

        let mut o = Orchestrator::new(&config, st, props, notifier);
        let s = o.run_analysis_pass(t0() + Duration::hours(80)).unwrap();
        assert_eq!(s.analyzed, 1);
        assert_eq!(s.sweep.alerts_sent, 0);
        assert!(o.properties().is_empty());
    }

    #[test]
    fn most_recent_plan_is_used() {
        let config = AnalysisConfig::default();
        let mut old_plan = plan_row("Acme Org");
        old_plan[FieldPlanColumns::NEED_COACHING] = CellValue::Number(2.0);
        let mut o = orchestrator(
            &config,
            store(vec![acme_budget_row()], vec![old_plan, plan_row("Acme Org")]),
        );
        o.run_analysis_pass(t0()).unwrap();
        assert!(o.notifier().sent[0].body.contains("did not request coaching"));
    }

    #[test]
    fn missing_table_aborts_cleanly() {
        let config = AnalysisConfig::default();
        let mut st = MemoryStore::new();
        st.insert_table(&config.budget_table, vec![header(), acme_budget_row()]);
        let mut o = orchestrator(&config, st);
        let res = o.run_analysis_pass(t0());
        assert!(matches!(res, Err(AnalysisError::Configuration { .. })));
        assert!(!analyzed_flag(&o, 1));
        assert!(o.properties().is_empty());
        assert_eq!(
            o.notifier().subjects(),
            vec!["Budget Analysis Error: analysis pass"]
        );
    }

    #[test]
    fn one_bad_budget_does_not_stop_the_pass() {
        let config = AnalysisConfig::default();
        let st = store(
            vec![acme_budget_row(), budget_row("Beta Org", &[])],
            vec![plan_row("Acme Org"), plan_row("Beta Org")],
        );
        let mut o = Orchestrator::new(&config, st, MemoryProperties::new(), RecordingNotifier::failing(1));
        let s = o.run_analysis_pass(t0()).unwrap();
        assert_eq!(s.failed, 1);
        assert_eq!(s.analyzed, 1);
        assert!(!analyzed_flag(&o, 1));
        assert!(analyzed_flag(&o, 2));
    }

    #[test]
    fn new_plans_are_announced_once() {
        let config = AnalysisConfig::default();
        let mut o = orchestrator(
            &config,
            store(vec![acme_budget_row()], vec![plan_row("Acme Org"), plan_row("Gamma Org")]),
        );
        let s = o.run_new_field_plan_check(t0()).unwrap();
        assert_eq!(s.announced, 2);
        assert_eq!(s.analyzed, 1);
        assert_eq!(
            o.properties().get(LAST_PROCESSED_ROW).unwrap(),
            Some("2".to_string())
        );
        assert!(o
            .properties()
            .get("MISSING_BUDGET_Gamma Org")
            .unwrap()
            .is_some());
        assert!(analyzed_flag(&o, 1));
        assert_eq!(
            o.notifier().subjects(),
            vec![
                "New Field Plan: Acme Org",
                "Budget Analysis: Acme Org",
                "New Field Plan: Gamma Org",
            ]
        );

        let s = o.run_new_field_plan_check(t0() + Duration::hours(1)).unwrap();
        assert_eq!(s.announced, 0);
        assert_eq!(o.notifier().sent.len(), 3);
    }

    #[test]
    fn budget_is_analyzed_once_per_check() {
        let config = AnalysisConfig::default();
        let mut o = orchestrator(
            &config,
            store(vec![acme_budget_row()], vec![plan_row("Acme Org"), plan_row("Acme Org")]),
        );
        let s = o.run_new_field_plan_check(t0()).unwrap();
        assert_eq!(s.announced, 2);
        assert_eq!(s.analyzed, 1);
        assert_eq!(
            o.notifier().subjects(),
            vec![
                "New Field Plan: Acme Org",
                "Budget Analysis: Acme Org",
                "New Field Plan: Acme Org",
            ]
        );
        assert!(analyzed_flag(&o, 1));
    }

    #[test]
    fn budget_is_analyzed_once_per_check_in_test_mode() {
        let config = AnalysisConfig {
            mode: RunMode::Test,
            ..AnalysisConfig::default()
        };
        let mut o = orchestrator(
            &config,
            store(vec![acme_budget_row()], vec![plan_row("Acme Org"), plan_row("Acme Org")]),
        );
        let s = o.run_new_field_plan_check(t0()).unwrap();
        assert_eq!(s.analyzed, 1);
        let reports = o
            .notifier()
            .subjects()
            .into_iter()
            .filter(|s| s.contains("Budget Analysis"))
            .count();
        assert_eq!(reports, 1);
    }

    #[test]
    fn exhausted_cursor_does_not_overflow() {
        let config = AnalysisConfig::default();
        let mut o = orchestrator(&config, store(vec![], vec![plan_row("Acme Org")]));
        o.properties
            .set(LAST_PROCESSED_ROW, &usize::MAX.to_string())
            .unwrap();
        let s = o.run_new_field_plan_check(t0()).unwrap();
        assert_eq!(s.announced, 0);
        assert!(o.notifier().sent.is_empty());
    }

    #[test]
    fn failed_announcement_stops_the_cursor() {
        let config = AnalysisConfig::default();
        let st = store(vec![], vec![plan_row("Acme Org"), plan_row("Gamma Org")]);
        let mut o = Orchestrator::new(&config, st, MemoryProperties::new(), RecordingNotifier::failing(1));
        let s = o.run_new_field_plan_check(t0()).unwrap();
        assert_eq!(s.failed, 1);
        assert_eq!(s.announced, 0);
        assert_eq!(o.properties().get(LAST_PROCESSED_ROW).unwrap(), None);

        let s = o.run_new_field_plan_check(t0()).unwrap();
        assert_eq!(s.announced, 2);
    }

    #[test]
    fn weekly_summary_counts() {
        let config = AnalysisConfig::default();
        let mut done = budget_row("Beta Org", &[(51, CellValue::Number(1000.0)), (53, CellValue::Number(200.0))]);
        done[BudgetColumns::ANALYZED] = CellValue::Bool(true);
        let mut o = orchestrator(&config, store(vec![acme_budget_row(), done], vec![]));
        o.run_analysis_pass(t0()).unwrap();
        let w = o.run_weekly_summary(t0()).unwrap();
        assert_eq!(w.analyzed, 1);
        assert_eq!(w.pending, 1);
        assert_eq!(w.waiting_for_plan, 1);
        assert_eq!(w.total_requested, 1150.0);
        assert_eq!(w.total_gap, 250.0);
        assert_eq!(
            o.notifier().subjects(),
            vec!["Weekly Budget Analysis Summary - 2025-03-01"]
        );
    }

    #[test]
    fn manual_analysis() {
        let config = AnalysisConfig::default();
        let mut o = orchestrator(&config, store(vec![acme_budget_row()], vec![plan_row("Acme Org")]));
        o.run_analysis_pass(t0()).unwrap();
        let outcome = o.analyze_organization(" Acme Org ", t0()).unwrap();
        assert_eq!(outcome, BudgetOutcome::Analyzed);
        assert_eq!(o.notifier().sent.len(), 2);
        assert!(matches!(
            o.analyze_organization("Nobody", t0()),
            Err(AnalysisError::NoBudget { .. })
        ));
    }
}
