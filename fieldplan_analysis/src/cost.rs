// ********* Tactic cost analysis ***********

use std::fmt::Display;

use crate::config::{TacticTarget, TacticTargets};
use crate::records::{Budget, BudgetCategory};
use crate::tactic::{Tactic, TacticKind};

// Absorbs the rounding of target ± std_dev so that the bounds stay inclusive.
const EPSILON: f64 = 1e-9;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum CostStatus {
    Below,
    Within,
    Above,
}

impl CostStatus {
    pub fn classify(cost_per_attempt: f64, target: &TacticTarget) -> CostStatus {
        if cost_per_attempt <= target.lower_bound() + EPSILON {
            CostStatus::Below
        } else if cost_per_attempt >= target.upper_bound() - EPSILON {
            CostStatus::Above
        } else {
            CostStatus::Within
        }
    }

    pub fn recommendation(&self, kind: TacticKind) -> String {
        match self {
            CostStatus::Within => format!(
                "{} funding is appropriately aligned with planned activities.",
                kind
            ),
            CostStatus::Below => format!(
                "{} funding is below the standard range. Consider increasing funding to better support planned activities.",
                kind
            ),
            CostStatus::Above => format!(
                "{} funding exceeds the standard range. Review if the funding request aligns with realistic program expectations.",
                kind
            ),
        }
    }
}

impl Display for CostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CostStatus::Below => "below",
            CostStatus::Within => "within",
            CostStatus::Above => "above",
        };
        write!(f, "{}", s)
    }
}

/// The budget line that funds a tactic, if the tactic is cost analyzed.
pub fn funding_category(kind: TacticKind) -> Option<BudgetCategory> {
    match kind {
        TacticKind::Door | TacticKind::Open => Some(BudgetCategory::Canvass),
        TacticKind::Phone => Some(BudgetCategory::Phone),
        TacticKind::Text => Some(BudgetCategory::Text),
        TacticKind::Relational | TacticKind::Registration | TacticKind::Mail => None,
    }
}

/// Funding divided by attempts. Infinite when no attempt is planned.
pub fn cost_per_attempt(funding: f64, program_attempts: f64) -> f64 {
    if program_attempts > 0.0 {
        funding / program_attempts
    } else {
        f64::INFINITY
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct TacticCostAnalysis {
    pub tactic_type: TacticKind,
    pub funding_requested: f64,
    pub program_attempts: f64,
    pub cost_per_attempt: f64,
    pub target_cost: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub status: CostStatus,
    pub recommendation: String,
}

/// Cost analysis of one tactic against the budget line funding it.
///
/// Returns None for the tactics that no budget line funds.
pub fn analyze_tactic_cost(
    budget: &Budget,
    tactic: &Tactic,
    targets: &TacticTargets,
) -> Option<TacticCostAnalysis> {
    let category = funding_category(tactic.kind)?;
    let target = targets.for_kind(tactic.kind)?;
    let funding_requested = budget.requested(category);
    let program_attempts = tactic.program_attempts();
    let cost = cost_per_attempt(funding_requested, program_attempts);
    let status = CostStatus::classify(cost, &target);
    Some(TacticCostAnalysis {
        tactic_type: tactic.kind,
        funding_requested,
        program_attempts,
        cost_per_attempt: cost,
        target_cost: target.target,
        lower_bound: target.lower_bound(),
        upper_bound: target.upper_bound(),
        status,
        recommendation: status.recommendation(tactic.kind),
    })
}

pub fn analyze_tactic_costs(
    budget: &Budget,
    tactics: &[Tactic],
    targets: &TacticTargets,
) -> Vec<TacticCostAnalysis> {
    tactics
        .iter()
        .filter_map(|t| analyze_tactic_cost(budget, t, targets))
        .collect()
}
