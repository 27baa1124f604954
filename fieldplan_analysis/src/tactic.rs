use std::fmt::Display;

use log::warn;
use snafu::{ensure, OptionExt, Snafu};

use crate::cell::CellValue;

/// The outreach methods a field plan can describe.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum TacticKind {
    Phone,
    Door,
    Open,
    Relational,
    Registration,
    Text,
    Mail,
}

/// The columns of one tactic block in a field plan row.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct TacticColumns {
    pub program_length: usize,
    pub weekly_volunteers: usize,
    pub weekly_hours: usize,
    pub hourly_attempts: usize,
}

impl TacticColumns {
    const fn starting_at(first: usize) -> TacticColumns {
        TacticColumns {
            program_length: first,
            weekly_volunteers: first + 1,
            weekly_hours: first + 2,
            hourly_attempts: first + 3,
        }
    }
}

impl TacticKind {
    /// In the order of the blocks in the field plan form.
    pub const ALL: [TacticKind; 7] = [
        TacticKind::Phone,
        TacticKind::Door,
        TacticKind::Open,
        TacticKind::Relational,
        TacticKind::Registration,
        TacticKind::Text,
        TacticKind::Mail,
    ];

    pub fn columns(&self) -> TacticColumns {
        match self {
            TacticKind::Phone => TacticColumns::starting_at(26),
            TacticKind::Door => TacticColumns::starting_at(30),
            TacticKind::Open => TacticColumns::starting_at(34),
            TacticKind::Relational => TacticColumns::starting_at(38),
            TacticKind::Registration => TacticColumns::starting_at(42),
            TacticKind::Text => TacticColumns::starting_at(46),
            TacticKind::Mail => TacticColumns::starting_at(50),
        }
    }

    /// Fraction of attempts expected to reach someone.
    pub fn contact_rate(&self) -> (f64, f64) {
        match self {
            TacticKind::Phone => (0.05, 0.10),
            TacticKind::Door => (0.05, 0.10),
            TacticKind::Open => (0.10, 0.20),
            TacticKind::Relational => (0.50, 0.70),
            TacticKind::Registration => (0.10, 0.30),
            TacticKind::Text => (0.01, 0.05),
            TacticKind::Mail => (0.70, 0.90),
        }
    }

    /// Highest number of hourly attempts per volunteer that is still reasonable.
    pub fn reasonable_hourly_attempts(&self) -> f64 {
        match self {
            TacticKind::Phone => 30.0,
            TacticKind::Door => 30.0,
            TacticKind::Open => 60.0,
            TacticKind::Relational => 30.0,
            TacticKind::Registration => 5.0,
            TacticKind::Text => 2000.0,
            TacticKind::Mail => 1000.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TacticKind::Phone => "PHONE",
            TacticKind::Door => "DOOR",
            TacticKind::Open => "OPEN",
            TacticKind::Relational => "RELATIONAL",
            TacticKind::Registration => "REGISTRATION",
            TacticKind::Text => "TEXT",
            TacticKind::Mail => "MAIL",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TacticKind::Phone => "Phone Banking",
            TacticKind::Door => "Door Canvassing",
            TacticKind::Open => "Open Canvassing / Tabling",
            TacticKind::Relational => "Relational Organizing",
            TacticKind::Registration => "Voter Registration",
            TacticKind::Text => "Text Banking",
            TacticKind::Mail => "Mail",
        }
    }

    pub fn from_name(s: &str) -> Option<TacticKind> {
        TacticKind::ALL
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
    }
}

impl Display for TacticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Snafu, PartialEq)]
pub enum TacticError {
    #[snafu(display("{tactic}: {field} in column {column} must be a valid number. Got: {value:?}"))]
    NotANumber {
        tactic: TacticKind,
        field: &'static str,
        column: usize,
        value: String,
    },
    #[snafu(display("{tactic}: {field} in column {column} must be greater than 0. Got: {value}"))]
    NotPositive {
        tactic: TacticKind,
        field: &'static str,
        column: usize,
        value: f64,
    },
}

/// How demanding the hourly attempts of a tactic are for a volunteer.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum AttemptBand {
    Reasonable,
    AtRisk,
    Unrealistic,
}

/// One validated tactic block of a field plan.
///
/// Absence of a tactic is represented by the absence of the value, never by zeros:
/// all four inputs are positive and finite.
#[derive(PartialEq, Debug, Clone)]
pub struct Tactic {
    pub kind: TacticKind,
    pub program_length: f64,
    pub weekly_volunteers: f64,
    pub weekly_hours: f64,
    pub hourly_attempts: f64,
}

impl Tactic {
    pub fn new(
        kind: TacticKind,
        program_length: f64,
        weekly_volunteers: f64,
        weekly_hours: f64,
        hourly_attempts: f64,
    ) -> Result<Tactic, TacticError> {
        let row = {
            let cols = kind.columns();
            let mut row = vec![CellValue::Empty; cols.hourly_attempts + 1];
            row[cols.program_length] = CellValue::Number(program_length);
            row[cols.weekly_volunteers] = CellValue::Number(weekly_volunteers);
            row[cols.weekly_hours] = CellValue::Number(weekly_hours);
            row[cols.hourly_attempts] = CellValue::Number(hourly_attempts);
            row
        };
        Tactic::from_row(kind, &row)
    }

    /// Reads the block of this tactic from a field plan row.
    pub fn from_row(kind: TacticKind, row: &[CellValue]) -> Result<Tactic, TacticError> {
        let cols = kind.columns();
        Ok(Tactic {
            kind,
            program_length: read_positive(kind, row, cols.program_length, "Program Length")?,
            weekly_volunteers: read_positive(
                kind,
                row,
                cols.weekly_volunteers,
                "Weekly Volunteers",
            )?,
            weekly_hours: read_positive(kind, row, cols.weekly_hours, "Weekly Hours")?,
            hourly_attempts: read_positive(kind, row, cols.hourly_attempts, "Hourly Attempts")?,
        })
    }

    /// True when any cell of the block of this tactic was filled in.
    pub fn is_present(kind: TacticKind, row: &[CellValue]) -> bool {
        let cols = kind.columns();
        [
            cols.program_length,
            cols.weekly_volunteers,
            cols.weekly_hours,
            cols.hourly_attempts,
        ]
        .iter()
        .any(|idx| row.get(*idx).map(|c| !c.is_empty()).unwrap_or(false))
    }

    /// All the valid tactics of a row, in form order.
    ///
    /// A malformed block only excludes its own tactic.
    pub fn all_from_row(row: &[CellValue]) -> Vec<Tactic> {
        TacticKind::ALL
            .iter()
            .filter(|kind| Tactic::is_present(**kind, row))
            .filter_map(|kind| match Tactic::from_row(*kind, row) {
                Ok(t) => Some(t),
                Err(e) => {
                    warn!("Skipping tactic: {}", e);
                    None
                }
            })
            .collect()
    }

    pub fn weekly_volunteer_hours(&self) -> f64 {
        self.weekly_volunteers * self.weekly_hours
    }

    pub fn program_volunteer_hours(&self) -> f64 {
        self.weekly_volunteers * self.weekly_hours * self.program_length
    }

    pub fn weekly_attempts(&self) -> f64 {
        self.weekly_volunteers * self.weekly_hours * self.hourly_attempts
    }

    pub fn program_attempts(&self) -> f64 {
        self.program_length * self.weekly_volunteers * self.weekly_hours * self.hourly_attempts
    }

    pub fn attempt_band(&self) -> AttemptBand {
        let reasonable = self.kind.reasonable_hourly_attempts();
        if self.hourly_attempts <= reasonable {
            AttemptBand::Reasonable
        } else if self.hourly_attempts <= reasonable + 10.0 {
            AttemptBand::AtRisk
        } else {
            AttemptBand::Unrealistic
        }
    }

    /// Range of people expected to be reached over the whole program.
    pub fn expected_contacts(&self) -> (f64, f64) {
        let (low, high) = self.kind.contact_rate();
        let attempts = self.program_attempts();
        (attempts * low, attempts * high)
    }

    pub fn attempt_narrative(&self, org: &str) -> String {
        let a = self.hourly_attempts;
        match self.attempt_band() {
            AttemptBand::Reasonable => format!(
                "{} has a reasonable hourly attempt where each volunteer is only expected to attempt to contact {} people per hour",
                org, a
            ),
            AttemptBand::AtRisk => format!(
                "{} is at risk of expecting too many attempts for each volunteer. They expect {} attempts per hour per volunteer.",
                org, a
            ),
            AttemptBand::Unrealistic => format!(
                "{} is expecting an unrealistic number of attempts per hour for their volunteers. They expect {} contacts each hour per volunteer.",
                org, a
            ),
        }
    }

    pub fn contacts_narrative(&self, org: &str) -> String {
        let (low, high) = self.expected_contacts();
        format!(
            "{} intends to successfully reach between {:.0} and {:.0} people during the course of their {} week program",
            org, low, high, self.program_length
        )
    }
}

fn read_positive(
    tactic: TacticKind,
    row: &[CellValue],
    column: usize,
    field: &'static str,
) -> Result<f64, TacticError> {
    let cell = row.get(column).cloned().unwrap_or_default();
    let value = cell.as_finite_number().context(NotANumberSnafu {
        tactic,
        field,
        column,
        value: cell.to_string(),
    })?;
    ensure!(
        value > 0.0,
        NotPositiveSnafu {
            tactic,
            field,
            column,
            value
        }
    );
    Ok(value)
}
