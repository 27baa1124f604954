// ********* Funding gap analysis ***********

use log::debug;

use crate::config::TacticTargets;
use crate::cost::cost_per_attempt;
use crate::records::{Budget, BudgetCategory};
use crate::tactic::{Tactic, TacticKind};

const EPSILON: f64 = 1e-9;

pub const SIGN_NOTE: &str = " (gap was originally negative, converted to positive for analysis)";

#[derive(PartialEq, Debug, Clone)]
pub struct GapRecommendation {
    pub category: BudgetCategory,
    pub requested_amount: f64,
    /// Always the absolute value of the stored gap.
    pub gap_amount: f64,
    pub was_negative: bool,
    pub can_increase: bool,
    pub recommendation_text: String,
}

/// The tactics whose cost ceiling bounds an increase of a category, in order of preference.
fn ceiling_tactics(category: BudgetCategory) -> &'static [TacticKind] {
    match category {
        BudgetCategory::Canvass => &[TacticKind::Door, TacticKind::Open],
        BudgetCategory::Phone => &[TacticKind::Phone],
        BudgetCategory::Text => &[TacticKind::Text],
        _ => &[],
    }
}

/// Whether adding `gap` to the category keeps the cost of its tactic at or below the upper bound.
///
/// A category without a planned tactic has no ceiling.
fn can_increase(
    category: BudgetCategory,
    requested: f64,
    gap: f64,
    tactics: &[Tactic],
    targets: &TacticTargets,
) -> bool {
    let tactic = ceiling_tactics(category)
        .iter()
        .find_map(|kind| tactics.iter().find(|t| t.kind == *kind));
    let tactic = match tactic {
        Some(t) => t,
        None => return true,
    };
    let target = match targets.for_kind(tactic.kind) {
        Some(t) => t,
        None => return true,
    };
    let new_cost = cost_per_attempt(requested + gap, tactic.program_attempts());
    debug!(
        "can_increase: {} with {} would cost {} per attempt (ceiling {})",
        category,
        tactic.kind,
        new_cost,
        target.upper_bound()
    );
    new_cost <= target.upper_bound() + EPSILON
}

/// Recommendations for every category with a non-zero gap, in form order.
pub fn analyze_gaps(
    budget: &Budget,
    tactics: &[Tactic],
    targets: &TacticTargets,
) -> Vec<GapRecommendation> {
    let mut res = Vec::new();
    for category in BudgetCategory::ALL {
        let line = budget.line(category);
        let gap_amount = line.gap.abs();
        if gap_amount <= 0.0 {
            continue;
        }
        let was_negative = line.gap < 0.0;
        let increase = can_increase(category, line.requested, gap_amount, tactics, targets);
        let mut text = if increase {
            format!(
                "Consider increasing {} funding by up to ${:.2} while maintaining cost efficiency.",
                category, gap_amount
            )
        } else {
            format!(
                "Gap identified in {} but increasing funding would exceed efficiency targets.",
                category
            )
        };
        if was_negative {
            text.push_str(SIGN_NOTE);
        }
        res.push(GapRecommendation {
            category,
            requested_amount: line.requested,
            gap_amount,
            was_negative,
            can_increase: increase,
            recommendation_text: text,
        });
    }
    res
}
