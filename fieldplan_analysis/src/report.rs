// ********* Reports and email bodies ***********

use std::fmt::Write;

use crate::config::AnalysisConfig;
use crate::cost::{analyze_tactic_costs, TacticCostAnalysis};
use crate::gap::{analyze_gaps, GapRecommendation, SIGN_NOTE};
use crate::records::{Budget, BudgetCategory, FieldPlan};
use crate::tactic::Tactic;

/// The analysis of one budget against its field plan. Built for one email, never persisted.
#[derive(PartialEq, Debug, Clone)]
pub struct AnalysisReport {
    pub org_name: String,
    pub budget_row: usize,
    pub plan_row: usize,
    pub tactic_costs: Vec<TacticCostAnalysis>,
    pub gaps: Vec<GapRecommendation>,
    pub request_summary: String,
    pub non_outreach_summary: String,
    pub outreach_summary: String,
    pub data_stipend_summary: String,
    pub plan_submitted_at: String,
    pub plan_confidence: f64,
    pub coaching_message: String,
    pub tactics: Vec<Tactic>,
}

impl AnalysisReport {
    pub fn build(budget: &Budget, plan: &FieldPlan, config: &AnalysisConfig) -> AnalysisReport {
        AnalysisReport {
            org_name: budget.member_org_name.clone(),
            budget_row: budget.row_index,
            plan_row: plan.row_index,
            tactic_costs: analyze_tactic_costs(budget, &plan.tactics, &config.targets),
            gaps: analyze_gaps(budget, &plan.tactics, &config.targets),
            request_summary: request_summary(budget, &config.funder_name),
            non_outreach_summary: non_outreach_summary(budget),
            outreach_summary: outreach_summary(budget),
            data_stipend_summary: data_stipend_summary(budget, config.data_stipend_hourly_rate),
            plan_submitted_at: plan.submitted_at.clone(),
            plan_confidence: plan.plan_confidence,
            coaching_message: plan.coaching_message(),
            tactics: plan.tactics.clone(),
        }
    }

    pub fn subject(&self) -> String {
        format!("Budget Analysis: {}", self.org_name)
    }

    pub fn render_html(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "<h2>Budget Analysis for {}</h2>", escape(&self.org_name));
        let _ = writeln!(s, "<h3>Summary</h3>");
        for p in [
            &self.request_summary,
            &self.non_outreach_summary,
            &self.outreach_summary,
            &self.data_stipend_summary,
        ] {
            let _ = writeln!(s, "<p>{}</p>", escape(p));
        }

        let _ = writeln!(s, "<h3>Tactic Cost Analysis</h3>");
        if self.tactic_costs.is_empty() {
            let _ = writeln!(s, "<p>No cost analyzed tactic was found in the field plan.</p>");
        }
        for t in self.tactic_costs.iter() {
            let _ = writeln!(s, "<h4>{}</h4>", t.tactic_type);
            let _ = writeln!(s, "<ul>");
            let _ = writeln!(s, "<li>Funding Requested: ${:.2}</li>", t.funding_requested);
            let _ = writeln!(s, "<li>Program Attempts: {}</li>", t.program_attempts);
            if t.cost_per_attempt.is_finite() {
                let _ = writeln!(s, "<li>Cost Per Attempt: ${:.2}</li>", t.cost_per_attempt);
            } else {
                let _ = writeln!(s, "<li>Cost Per Attempt: no attempts planned</li>");
            }
            let _ = writeln!(
                s,
                "<li>Target Range: ${:.2} - ${:.2}</li>",
                t.lower_bound, t.upper_bound
            );
            let _ = writeln!(s, "<li>Status: {} target range</li>", t.status);
            let _ = writeln!(s, "</ul>");
            let _ = writeln!(
                s,
                "<p><strong>Recommendation:</strong> {}</p>",
                escape(&t.recommendation)
            );
        }

        if !self.gaps.is_empty() {
            let _ = writeln!(s, "<h3>Funding Gap Analysis</h3>");
            for g in self.gaps.iter() {
                let _ = writeln!(
                    s,
                    "<p><strong>{}:</strong> {}</p>",
                    g.category,
                    escape(&g.recommendation_text)
                );
            }
        }

        if !self.tactics.is_empty() {
            let _ = writeln!(s, "<h3>Field Tactic Metrics</h3>");
            for t in self.tactics.iter() {
                s.push_str(&tactic_metrics_html(t, &self.org_name));
            }
        }

        let _ = writeln!(s, "<h3>Field Plan Details</h3>");
        let _ = writeln!(
            s,
            "<p>This analysis is based on the field plan submitted on {}</p>",
            escape(&self.plan_submitted_at)
        );
        let _ = writeln!(s, "<p>Confidence Level: {}/10</p>", self.plan_confidence);
        let _ = writeln!(s, "<p>{}</p>", escape(&self.coaching_message));
        s
    }
}

pub fn request_summary(budget: &Budget, funder_name: &str) -> String {
    let requested = budget.requested_total;
    let gap = budget.gap_total.abs();
    if requested > 0.0 && gap == requested {
        return format!(
            "This program will be entirely funded by this request. Reach out to ask if they will be seeking additional funds for this program or if they will only run their program with support from {}.",
            funder_name
        );
    }
    let note = if budget.gap_total < 0.0 { SIGN_NOTE } else { "" };
    let project = if budget.project_total != 0.0 {
        format!("${:.2}", budget.project_total)
    } else {
        "an unspecified amount".to_string()
    };
    format!(
        "{} requested ${:.2} and described a funding gap of ${:.2}{}. Their project costs {} to run.",
        budget.member_org_name, requested, gap, note, project
    )
}

pub fn non_outreach_summary(budget: &Budget) -> String {
    let total = budget.non_outreach_requested();
    format!(
        "{} is requesting ${:.2} in resources for indirect costs. That represents {:.1}% of their total funding request.",
        budget.member_org_name,
        total,
        budget.proportion_of_request(total)
    )
}

pub fn outreach_summary(budget: &Budget) -> String {
    let total = budget.outreach_requested();
    format!(
        "{} is requesting ${:.2} in resources for outreach costs. That represents {:.1}% of their total funding request.",
        budget.member_org_name,
        total,
        budget.proportion_of_request(total)
    )
}

pub fn data_stipend_summary(budget: &Budget, hourly_rate: f64) -> String {
    let data = budget.requested(BudgetCategory::Data);
    if data > 0.0 && hourly_rate > 0.0 {
        format!(
            "{} is requesting ${:.2} in data funding. This represents {:.1} hours of labor that can be offset by a data stipend.",
            budget.member_org_name,
            data,
            data / hourly_rate
        )
    } else {
        format!("{} did not request data funding.", budget.member_org_name)
    }
}

fn tactic_metrics_html(t: &Tactic, org: &str) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "<h4>{} Metrics</h4>", t.kind.description());
    let _ = writeln!(s, "<ul>");
    let _ = writeln!(s, "<li>Program Length: {} weeks</li>", t.program_length);
    let _ = writeln!(s, "<li>Weekly Volunteers: {}</li>", t.weekly_volunteers);
    let _ = writeln!(s, "<li>Weekly Hours per Volunteer: {}</li>", t.weekly_hours);
    let _ = writeln!(s, "<li>Total Program Hours: {}</li>", t.program_volunteer_hours());
    let _ = writeln!(s, "<li>Weekly Contact Attempts: {}</li>", t.weekly_attempts());
    let _ = writeln!(s, "<li>Total Program Attempts: {}</li>", t.program_attempts());
    let _ = writeln!(s, "</ul>");
    let _ = writeln!(s, "<p>{}</p>", escape(&t.attempt_narrative(org)));
    let _ = writeln!(s, "<p>{}</p>", escape(&t.contacts_narrative(org)));
    s
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None specified".to_string()
    } else {
        escape(&items.join(", "))
    }
}

fn text_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        escape(value)
    }
}

pub fn new_field_plan_subject(plan: &FieldPlan) -> String {
    let org = if plan.member_org_name.is_empty() {
        "Unknown Organization"
    } else {
        &plan.member_org_name
    };
    format!("New Field Plan: {}", org)
}

/// Body of the notification sent for every new field plan.
pub fn render_field_plan_html(plan: &FieldPlan) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "<h2>New Field Plan Entry</h2>");
    let _ = writeln!(s, "<h3>Contact Information</h3>");
    let _ = writeln!(
        s,
        "<p><strong>Organization:</strong> {}</p>",
        text_or(&plan.member_org_name, "Not specified")
    );
    let _ = writeln!(
        s,
        "<p><strong>Contact:</strong> {}</p>",
        text_or(&plan.contact_name(), "Not specified")
    );
    let _ = writeln!(
        s,
        "<p><strong>Email:</strong> {}</p>",
        text_or(&plan.contact_email, "Not provided")
    );
    let _ = writeln!(
        s,
        "<p><strong>Phone:</strong> {}</p>",
        text_or(&plan.contact_phone, "Not provided")
    );

    let _ = writeln!(s, "<h3>Program Details</h3>");
    let _ = writeln!(
        s,
        "<p><strong>Data Storage:</strong> {}</p>",
        list_or_none(&plan.data_storage)
    );
    let _ = writeln!(
        s,
        "<p><strong>VAN Committee:</strong> {}</p>",
        text_or(&plan.van_committee, "None specified")
    );
    let _ = writeln!(
        s,
        "<p><strong>Program Tools:</strong> {}</p>",
        list_or_none(&plan.program_tools)
    );
    let _ = writeln!(
        s,
        "<p><strong>Program Dates:</strong> {}</p>",
        text_or(&plan.program_dates, "None specified")
    );
    let _ = writeln!(
        s,
        "<p><strong>Field Counties:</strong> {}</p>",
        list_or_none(&plan.field_counties)
    );

    let _ = writeln!(s, "<h3>Demographics</h3>");
    for (label, items) in [
        ("Race", &plan.demo_race),
        ("Age", &plan.demo_age),
        ("Gender", &plan.demo_gender),
        ("Affinity Groups", &plan.demo_affinity),
    ] {
        let _ = writeln!(s, "<p><strong>{}:</strong> {}</p>", label, list_or_none(items));
    }

    let _ = writeln!(s, "<h3>Coaching Assessment</h3>");
    let _ = writeln!(s, "<p>{}</p>", escape(&plan.coaching_message()));

    if plan.tactics.is_empty() {
        let _ = writeln!(s, "<p>No field tactics were specified in this plan.</p>");
    } else {
        let _ = writeln!(s, "<h3>Field Tactic Analysis</h3>");
        for t in plan.tactics.iter() {
            s.push_str(&tactic_metrics_html(t, &plan.member_org_name));
        }
    }
    s
}

/// Status counts of the budget table.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct WeeklySummary {
    pub analyzed: usize,
    pub pending: usize,
    pub waiting_for_plan: usize,
    pub total_requested: f64,
    /// Sum of the absolute gaps.
    pub total_gap: f64,
}

impl WeeklySummary {
    pub fn subject(&self, date: &str) -> String {
        format!("Weekly Budget Analysis Summary - {}", date)
    }

    pub fn render_html(&self, date: &str) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "<h2>Weekly Budget Analysis Summary</h2>");
        let _ = writeln!(s, "<p>Report generated on: {}</p>", date);
        let _ = writeln!(s, "<h3>Analysis Status</h3>");
        let _ = writeln!(s, "<ul>");
        let _ = writeln!(s, "<li>Budgets Analyzed: {}</li>", self.analyzed);
        let _ = writeln!(s, "<li>Budgets Pending: {}</li>", self.pending);
        let _ = writeln!(s, "<li>Waiting for Field Plans: {}</li>", self.waiting_for_plan);
        let _ = writeln!(s, "</ul>");
        let _ = writeln!(s, "<h3>Financial Summary</h3>");
        let _ = writeln!(s, "<ul>");
        let _ = writeln!(s, "<li>Total Requested: ${:.2}</li>", self.total_requested);
        let _ = writeln!(s, "<li>Total Gap Identified: ${:.2}</li>", self.total_gap);
        let _ = writeln!(s, "</ul>");
        let _ = writeln!(
            s,
            "<p>So far, {} budgets have been analyzed and {} remain to be analyzed.</p>",
            self.analyzed, self.pending
        );
        s
    }
}

pub fn error_subject(org_name: &str) -> String {
    format!("Budget Analysis Error: {}", org_name)
}

pub fn render_error_html(org_name: &str, error: &str) -> String {
    format!(
        "<h2>Budget Analysis Error</h2>\n\
         <p><strong>Organization:</strong> {}</p>\n\
         <p><strong>Error:</strong> {}</p>\n\
         <p>The budget analysis encountered an error and could not be completed.</p>\n\
         <p>Please check the logs for more details.</p>\n",
        escape(org_name),
        escape(error)
    )
}

fn escape(s: &str) -> String {
    let mut res = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => res.push_str("&amp;"),
            '<' => res.push_str("&lt;"),
            '>' => res.push_str("&gt;"),
            '"' => res.push_str("&quot;"),
            _ => res.push(c),
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellValue;
    use crate::cost::CostStatus;
    use crate::records::tests::budget_row;
    use crate::records::FieldPlanColumns;
    use crate::tactic::TacticKind;

    fn acme_budget(entries: &[(usize, CellValue)]) -> Budget {
        Budget::from_row(1, &budget_row("Acme Org", entries))
    }

    fn acme_plan() -> FieldPlan {
        let mut row = vec![CellValue::Empty; FieldPlanColumns::WIDTH];
        row[FieldPlanColumns::TIMESTAMP] = CellValue::Text("2025-02-20 08:00:00".to_string());
        row[FieldPlanColumns::MEMBER_NAME] = CellValue::Text("Acme Org".to_string());
        row[FieldPlanColumns::PLAN_CONFIDENCE] = CellValue::Number(8.0);
        row[FieldPlanColumns::NEED_COACHING] = CellValue::Number(4.0);
        let door = TacticKind::Door.columns();
        row[door.program_length] = CellValue::Number(4.0);
        row[door.weekly_volunteers] = CellValue::Number(5.0);
        row[door.weekly_hours] = CellValue::Number(3.0);
        row[door.hourly_attempts] = CellValue::Number(10.0);
        FieldPlan::from_row(1, &row, &[])
    }

    #[test]
    fn acme_report() {
        let budget = acme_budget(&[
            (36, CellValue::Number(150.0)),
            (38, CellValue::Number(-50.0)),
            (51, CellValue::Number(150.0)),
        ]);
        let r = AnalysisReport::build(&budget, &acme_plan(), &AnalysisConfig::default());
        assert_eq!(r.tactic_costs.len(), 1);
        assert_eq!(r.tactic_costs[0].cost_per_attempt, 0.25);
        assert_eq!(r.tactic_costs[0].status, CostStatus::Below);
        assert_eq!(r.gaps.len(), 1);
        assert_eq!(r.gaps[0].gap_amount, 50.0);
        assert!(r.gaps[0].was_negative);
        assert!(r.gaps[0].can_increase);
        assert_eq!(r.subject(), "Budget Analysis: Acme Org");

        let html = r.render_html();
        assert!(html.contains("<h2>Budget Analysis for Acme Org</h2>"));
        assert!(html.contains("Cost Per Attempt: $0.25"));
        assert!(html.contains("Status: below target range"));
        assert!(html.contains("<strong>canvass:</strong>"));
        assert!(html.contains("Confidence Level: 8/10"));
        assert!(html.contains("confirm what coaching"));
    }

    #[test]
    fn request_summaries() {
        let full = acme_budget(&[(51, CellValue::Number(500.0)), (53, CellValue::Number(-500.0))]);
        assert!(request_summary(&full, "Alabama Forward").contains("entirely funded"));
        assert!(request_summary(&full, "Alabama Forward").contains("Alabama Forward"));

        let partial = acme_budget(&[
            (51, CellValue::Number(500.0)),
            (52, CellValue::Number(2000.0)),
            (53, CellValue::Number(-300.0)),
        ]);
        let s = request_summary(&partial, "Alabama Forward");
        assert!(s.contains("requested $500.00"));
        assert!(s.contains("gap of $300.00"));
        assert!(s.contains("originally negative"));
        assert!(s.contains("costs $2000.00"));

        let nothing = acme_budget(&[]);
        assert!(request_summary(&nothing, "Alabama Forward").contains("an unspecified amount"));
    }

    #[test]
    fn proportions_and_stipend() {
        let b = acme_budget(&[
            (9, CellValue::Number(200.0)),
            (36, CellValue::Number(600.0)),
            (51, CellValue::Number(800.0)),
        ]);
        assert!(non_outreach_summary(&b).contains("$200.00"));
        assert!(non_outreach_summary(&b).contains("25.0%"));
        assert!(outreach_summary(&b).contains("75.0%"));
        assert!(data_stipend_summary(&b, 20.0).contains("10.0 hours"));

        let none = acme_budget(&[]);
        assert!(non_outreach_summary(&none).contains("0.0%"));
        assert_eq!(
            data_stipend_summary(&none, 20.0),
            "Acme Org did not request data funding."
        );
    }

    #[test]
    fn field_plan_body() {
        let html = render_field_plan_html(&acme_plan());
        assert!(html.contains("<strong>Organization:</strong> Acme Org"));
        assert!(html.contains("<strong>Email:</strong> Not provided"));
        assert!(html.contains("<strong>Race:</strong> None specified"));
        assert!(html.contains("<h4>Door Canvassing Metrics</h4>"));
        assert!(html.contains("Total Program Attempts: 600"));
        assert_eq!(new_field_plan_subject(&acme_plan()), "New Field Plan: Acme Org");
    }

    #[test]
    fn weekly_body() {
        let w = WeeklySummary {
            analyzed: 3,
            pending: 2,
            waiting_for_plan: 1,
            total_requested: 1500.0,
            total_gap: 250.5,
        };
        assert_eq!(
            w.subject("2025-03-03"),
            "Weekly Budget Analysis Summary - 2025-03-03"
        );
        let html = w.render_html("2025-03-03");
        assert!(html.contains("Budgets Analyzed: 3"));
        assert!(html.contains("Waiting for Field Plans: 1"));
        assert!(html.contains("Total Gap Identified: $250.50"));
    }

    #[test]
    fn html_is_escaped() {
        let html = render_error_html("A & B <Org>", "bad \"value\"");
        assert!(html.contains("A &amp; B &lt;Org&gt;"));
        assert!(html.contains("bad &quot;value&quot;"));
    }
}
