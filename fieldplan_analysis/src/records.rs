// ********* Submission records ***********

use std::fmt::Display;

use crate::cell::CellValue;
use crate::tactic::Tactic;

/// A line item of the budget form.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum BudgetCategory {
    Admin,
    Data,
    Travel,
    Comms,
    Design,
    Video,
    Print,
    Postage,
    Training,
    Supplies,
    Canvass,
    Phone,
    Text,
    Event,
    Digital,
}

impl BudgetCategory {
    /// In the order of the form.
    pub const ALL: [BudgetCategory; 15] = [
        BudgetCategory::Admin,
        BudgetCategory::Data,
        BudgetCategory::Travel,
        BudgetCategory::Comms,
        BudgetCategory::Design,
        BudgetCategory::Video,
        BudgetCategory::Print,
        BudgetCategory::Postage,
        BudgetCategory::Training,
        BudgetCategory::Supplies,
        BudgetCategory::Canvass,
        BudgetCategory::Phone,
        BudgetCategory::Text,
        BudgetCategory::Event,
        BudgetCategory::Digital,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BudgetCategory::Admin => "admin",
            BudgetCategory::Data => "data",
            BudgetCategory::Travel => "travel",
            BudgetCategory::Comms => "comms",
            BudgetCategory::Design => "design",
            BudgetCategory::Video => "video",
            BudgetCategory::Print => "print",
            BudgetCategory::Postage => "postage",
            BudgetCategory::Training => "training",
            BudgetCategory::Supplies => "supplies",
            BudgetCategory::Canvass => "canvass",
            BudgetCategory::Phone => "phone",
            BudgetCategory::Text => "text",
            BudgetCategory::Event => "event",
            BudgetCategory::Digital => "digital",
        }
    }

    /// Categories that pay for reaching voters directly.
    pub fn is_outreach(&self) -> bool {
        matches!(
            self,
            BudgetCategory::Canvass
                | BudgetCategory::Phone
                | BudgetCategory::Text
                | BudgetCategory::Event
                | BudgetCategory::Digital
        )
    }

    /// Column of the requested amount. Total and gap follow it.
    fn first_column(&self) -> usize {
        let pos = BudgetCategory::ALL
            .iter()
            .position(|c| c == self)
            .unwrap_or_default();
        BudgetColumns::FIRST_CATEGORY + 3 * pos
    }
}

impl Display for BudgetCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Column indexes of the budget table. Column 0 holds the form timestamp.
pub struct BudgetColumns;

impl BudgetColumns {
    pub const TIMESTAMP: usize = 0;
    pub const FIRST_NAME: usize = 1;
    pub const LAST_NAME: usize = 2;
    pub const CONTACT_EMAIL: usize = 3;
    pub const CONTACT_PHONE: usize = 4;
    pub const MEMBER_NAME: usize = 5;
    pub const FIRST_CATEGORY: usize = 6;
    pub const REQUESTED_TOTAL: usize = 51;
    pub const PROJECT_TOTAL: usize = 52;
    pub const GAP_TOTAL: usize = 53;
    pub const SUBMIT_FIELD_PLAN: usize = 54;
    pub const ANALYZED: usize = 55;
    pub const WIDTH: usize = 56;
}

/// Column indexes of the field plan table. Column 0 holds the form timestamp.
/// The tactic blocks are described by [`crate::tactic::TacticKind::columns`].
pub struct FieldPlanColumns;

impl FieldPlanColumns {
    pub const TIMESTAMP: usize = 0;
    pub const MEMBER_NAME: usize = 1;
    pub const FIRST_NAME: usize = 2;
    pub const LAST_NAME: usize = 3;
    pub const CONTACT_EMAIL: usize = 4;
    pub const CONTACT_PHONE: usize = 5;
    pub const DATA_STORAGE: usize = 6;
    pub const DATA_STIPEND: usize = 7;
    pub const DATA_PLAN: usize = 8;
    pub const VAN_COMMITTEE: usize = 9;
    pub const DATA_SHARE: usize = 10;
    pub const SHARE_ORG: usize = 11;
    pub const PROGRAM_TOOLS: usize = 12;
    pub const PROGRAM_DATES: usize = 13;
    pub const PROGRAM_TYPES: usize = 14;
    pub const FIELD_TACTICS: usize = 15;
    pub const FIELD_STAFF: usize = 16;
    pub const FIELD_COUNTIES: usize = 17;
    pub const PRECINCTS: usize = 19;
    pub const DIFF_PRECINCTS: usize = 20;
    pub const DEMO_RACE: usize = 21;
    pub const DEMO_AGE: usize = 22;
    pub const DEMO_GENDER: usize = 23;
    pub const DEMO_AFFINITY: usize = 24;
    pub const PLAN_CONFIDENCE: usize = 54;
    pub const IMPLEMENTATION: usize = 55;
    pub const NEED_COACHING: usize = 56;
    pub const FP_EXPERIENCE: usize = 57;
    pub const WIDTH: usize = 58;
}

fn cell(row: &[CellValue], idx: usize) -> &CellValue {
    static EMPTY: CellValue = CellValue::Empty;
    row.get(idx).unwrap_or(&EMPTY)
}

/// Requested, total and gap amounts of one budget category.
#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct CategoryLine {
    pub requested: f64,
    pub total: f64,
    /// As entered. Some organizations enter gaps as negative numbers.
    pub gap: f64,
}

/// A budget submission.
#[derive(PartialEq, Debug, Clone)]
pub struct Budget {
    /// Position of the row in the budget table.
    pub row_index: usize,
    pub submitted_at: String,
    pub member_org_name: String,
    pub first_name: String,
    pub last_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    lines: Vec<CategoryLine>,
    pub requested_total: f64,
    pub project_total: f64,
    pub gap_total: f64,
    pub submit_field_plan: String,
    pub analyzed: bool,
}

impl Budget {
    pub fn from_row(row_index: usize, row: &[CellValue]) -> Budget {
        let lines = BudgetCategory::ALL
            .iter()
            .map(|c| {
                let col = c.first_column();
                CategoryLine {
                    requested: cell(row, col).as_number(),
                    total: cell(row, col + 1).as_number(),
                    gap: cell(row, col + 2).as_number(),
                }
            })
            .collect();
        Budget {
            row_index,
            submitted_at: cell(row, BudgetColumns::TIMESTAMP).as_text(),
            member_org_name: cell(row, BudgetColumns::MEMBER_NAME).as_text(),
            first_name: cell(row, BudgetColumns::FIRST_NAME).as_text(),
            last_name: cell(row, BudgetColumns::LAST_NAME).as_text(),
            contact_email: cell(row, BudgetColumns::CONTACT_EMAIL).as_text(),
            contact_phone: cell(row, BudgetColumns::CONTACT_PHONE).as_text(),
            lines,
            requested_total: cell(row, BudgetColumns::REQUESTED_TOTAL).as_number(),
            project_total: cell(row, BudgetColumns::PROJECT_TOTAL).as_number(),
            gap_total: cell(row, BudgetColumns::GAP_TOTAL).as_number(),
            submit_field_plan: cell(row, BudgetColumns::SUBMIT_FIELD_PLAN).as_text(),
            analyzed: cell(row, BudgetColumns::ANALYZED).as_flag(),
        }
    }

    pub fn line(&self, category: BudgetCategory) -> CategoryLine {
        let pos = BudgetCategory::ALL
            .iter()
            .position(|c| *c == category)
            .unwrap_or_default();
        self.lines.get(pos).copied().unwrap_or_default()
    }

    pub fn requested(&self, category: BudgetCategory) -> f64 {
        self.line(category).requested
    }

    pub fn gap(&self, category: BudgetCategory) -> f64 {
        self.line(category).gap
    }

    pub fn non_outreach_requested(&self) -> f64 {
        BudgetCategory::ALL
            .iter()
            .filter(|c| !c.is_outreach())
            .map(|c| self.requested(*c))
            .sum()
    }

    pub fn outreach_requested(&self) -> f64 {
        BudgetCategory::ALL
            .iter()
            .filter(|c| c.is_outreach())
            .map(|c| self.requested(*c))
            .sum()
    }

    /// Share of the total request, in percent. Zero when nothing was requested.
    pub fn proportion_of_request(&self, amount: f64) -> f64 {
        if self.requested_total == 0.0 {
            0.0
        } else {
            amount / self.requested_total * 100.0
        }
    }
}

/// A field plan submission.
#[derive(PartialEq, Debug, Clone)]
pub struct FieldPlan {
    /// Position of the row in the field plan table.
    pub row_index: usize,
    pub submitted_at: String,
    pub member_org_name: String,
    pub first_name: String,
    pub last_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub data_storage: Vec<String>,
    pub data_stipend: String,
    pub data_plan: String,
    pub van_committee: String,
    pub data_share: String,
    pub share_org: String,
    pub program_tools: Vec<String>,
    pub program_dates: String,
    pub program_types: Vec<String>,
    pub field_tactics: Vec<String>,
    pub field_staff: String,
    pub field_counties: Vec<String>,
    pub precincts: Vec<String>,
    pub diff_precincts: String,
    pub demo_race: Vec<String>,
    pub demo_age: Vec<String>,
    pub demo_gender: Vec<String>,
    pub demo_affinity: Vec<String>,
    pub plan_confidence: f64,
    pub implementation: String,
    pub coaching_need: f64,
    pub form_experience: String,
    pub tactics: Vec<Tactic>,
}

impl FieldPlan {
    pub fn from_row(row_index: usize, row: &[CellValue], multi_word_names: &[String]) -> FieldPlan {
        let text = |idx| cell(row, idx).as_text();
        let list = |idx| cell(row, idx).as_list(multi_word_names);
        FieldPlan {
            row_index,
            submitted_at: text(FieldPlanColumns::TIMESTAMP),
            member_org_name: text(FieldPlanColumns::MEMBER_NAME),
            first_name: text(FieldPlanColumns::FIRST_NAME),
            last_name: text(FieldPlanColumns::LAST_NAME),
            contact_email: text(FieldPlanColumns::CONTACT_EMAIL),
            contact_phone: text(FieldPlanColumns::CONTACT_PHONE),
            data_storage: list(FieldPlanColumns::DATA_STORAGE),
            data_stipend: text(FieldPlanColumns::DATA_STIPEND),
            data_plan: text(FieldPlanColumns::DATA_PLAN),
            van_committee: text(FieldPlanColumns::VAN_COMMITTEE),
            data_share: text(FieldPlanColumns::DATA_SHARE),
            share_org: text(FieldPlanColumns::SHARE_ORG),
            program_tools: list(FieldPlanColumns::PROGRAM_TOOLS),
            program_dates: text(FieldPlanColumns::PROGRAM_DATES),
            program_types: list(FieldPlanColumns::PROGRAM_TYPES),
            field_tactics: list(FieldPlanColumns::FIELD_TACTICS),
            field_staff: text(FieldPlanColumns::FIELD_STAFF),
            field_counties: list(FieldPlanColumns::FIELD_COUNTIES),
            precincts: list(FieldPlanColumns::PRECINCTS),
            diff_precincts: text(FieldPlanColumns::DIFF_PRECINCTS),
            demo_race: list(FieldPlanColumns::DEMO_RACE),
            demo_age: list(FieldPlanColumns::DEMO_AGE),
            demo_gender: list(FieldPlanColumns::DEMO_GENDER),
            demo_affinity: list(FieldPlanColumns::DEMO_AFFINITY),
            plan_confidence: cell(row, FieldPlanColumns::PLAN_CONFIDENCE).as_number(),
            implementation: text(FieldPlanColumns::IMPLEMENTATION),
            coaching_need: cell(row, FieldPlanColumns::NEED_COACHING).as_number(),
            form_experience: text(FieldPlanColumns::FP_EXPERIENCE),
            tactics: Tactic::all_from_row(row),
        }
    }

    pub fn contact_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn has_county(&self, county: &str) -> bool {
        self.field_counties.iter().any(|c| c == county)
    }

    pub fn coaching_message(&self) -> String {
        let org = &self.member_org_name;
        let score = self.coaching_need;
        if score <= 5.0 {
            format!(
                "{} had a confidence score of {}. Reach out to them to confirm what coaching they will need.",
                org, score
            )
        } else if score <= 8.0 {
            format!(
                "{} had a confidence score of {}. Reach out to them to ask if they would like some coaching on their field plan.",
                org, score
            )
        } else {
            format!(
                "{} had a confidence score of {}. They did not request coaching on their field plan.",
                org, score
            )
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tactic::TacticKind;

    pub(crate) fn budget_row(org: &str, entries: &[(usize, CellValue)]) -> Vec<CellValue> {
        let mut row = vec![CellValue::Empty; BudgetColumns::WIDTH];
        row[BudgetColumns::TIMESTAMP] = CellValue::Text("2025-03-01 10:00:00".to_string());
        row[BudgetColumns::MEMBER_NAME] = CellValue::Text(org.to_string());
        for (idx, v) in entries {
            row[*idx] = v.clone();
        }
        row
    }

    #[test]
    fn category_columns() {
        assert_eq!(BudgetCategory::Admin.first_column(), 6);
        assert_eq!(BudgetCategory::Canvass.first_column(), 36);
        assert_eq!(BudgetCategory::Phone.first_column(), 39);
        assert_eq!(BudgetCategory::Digital.first_column(), 48);
    }

    #[test]
    fn budget_numbers_are_coerced() {
        let row = budget_row(
            "Acme Org",
            &[
                (36, CellValue::Number(150.0)),
                (38, CellValue::Text("-50".to_string())),
                (39, CellValue::Text("lots".to_string())),
                (42, CellValue::Text("".to_string())),
                (51, CellValue::Number(1000.0)),
                (55, CellValue::Bool(true)),
            ],
        );
        let b = Budget::from_row(3, &row);
        assert_eq!(b.row_index, 3);
        assert_eq!(b.member_org_name, "Acme Org");
        assert_eq!(b.requested(BudgetCategory::Canvass), 150.0);
        assert_eq!(b.gap(BudgetCategory::Canvass), -50.0);
        assert_eq!(b.requested(BudgetCategory::Phone), 0.0);
        assert_eq!(b.requested(BudgetCategory::Text), 0.0);
        assert_eq!(b.requested_total, 1000.0);
        assert_eq!(b.project_total, 0.0);
        assert!(b.analyzed);
    }

    #[test]
    fn short_rows_are_zero() {
        let b = Budget::from_row(1, &[CellValue::Empty]);
        for c in BudgetCategory::ALL {
            assert_eq!(b.line(c), CategoryLine::default());
        }
        assert_eq!(b.member_org_name, "");
        assert!(!b.analyzed);
    }

    #[test]
    fn outreach_split() {
        let row = budget_row(
            "Acme Org",
            &[
                (6, CellValue::Number(100.0)),
                (9, CellValue::Number(200.0)),
                (36, CellValue::Number(300.0)),
                (45, CellValue::Number(400.0)),
                (51, CellValue::Number(1000.0)),
            ],
        );
        let b = Budget::from_row(1, &row);
        assert_eq!(b.non_outreach_requested(), 300.0);
        assert_eq!(b.outreach_requested(), 700.0);
        assert_eq!(b.proportion_of_request(300.0), 30.0);
        let b0 = Budget::from_row(1, &budget_row("X", &[]));
        assert_eq!(b0.proportion_of_request(300.0), 0.0);
    }

    #[test]
    fn field_plan_lists_and_tactics() {
        let mut row = vec![CellValue::Empty; FieldPlanColumns::WIDTH];
        row[FieldPlanColumns::MEMBER_NAME] = CellValue::Text(" Acme\u{00A0}Org ".to_string());
        row[FieldPlanColumns::FIELD_COUNTIES] =
            CellValue::Text("Jefferson St. Clair".to_string());
        row[FieldPlanColumns::PROGRAM_TOOLS] = CellValue::Text("VAN, Mobilize".to_string());
        row[FieldPlanColumns::NEED_COACHING] = CellValue::Number(7.0);
        let door = TacticKind::Door.columns();
        row[door.program_length] = CellValue::Number(4.0);
        row[door.weekly_volunteers] = CellValue::Number(5.0);
        row[door.weekly_hours] = CellValue::Number(3.0);
        row[door.hourly_attempts] = CellValue::Number(10.0);

        let names = vec!["St. Clair".to_string()];
        let p = FieldPlan::from_row(2, &row, &names);
        assert_eq!(p.member_org_name, "Acme Org");
        assert_eq!(p.field_counties, vec!["Jefferson", "St. Clair"]);
        assert!(p.has_county("St. Clair"));
        assert_eq!(p.program_tools, vec!["VAN", "Mobilize"]);
        assert!(p.demo_race.is_empty());
        assert_eq!(p.tactics.len(), 1);
        assert_eq!(p.tactics[0].kind, TacticKind::Door);
        assert!(p.coaching_message().contains("ask if they would like some coaching"));
    }

    #[test]
    fn coaching_messages() {
        let mut p = FieldPlan::from_row(1, &[], &[]);
        p.coaching_need = 3.0;
        assert!(p.coaching_message().contains("confirm what coaching"));
        p.coaching_need = 9.0;
        assert!(p.coaching_message().contains("did not request coaching"));
    }
}
