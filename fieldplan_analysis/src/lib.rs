//! Matching and analysis of field program budgets against field plans.
//!
//! Organizations submit a budget and a field plan through two independent forms. This crate
//! pairs each budget with the most recent field plan of the same organization, checks the
//! cost per contact attempt of every planned tactic against target bands, reviews the funding
//! gaps, and reports through a [`Notifier`]. Submissions still waiting for their counterpart
//! are tracked in a persistent [`PropertyStore`] and alerted once.
//!
//! Storage, notification and time are supplied by the caller. [`MemoryStore`],
//! [`MemoryProperties`] and [`RecordingNotifier`] are in-memory versions of each.

mod cell;
mod config;
mod cost;
mod gap;
mod matcher;
mod notifier;
mod orchestrator;
mod records;
mod report;
mod store;
mod tactic;
mod tracker;

pub use crate::cell::{normalize_text, CellValue};
pub use crate::config::{
    is_valid_address, AnalysisConfig, ConfigError, RunMode, TacticTarget, TacticTargets,
};
pub use crate::cost::{
    analyze_tactic_cost, analyze_tactic_costs, cost_per_attempt, funding_category, CostStatus,
    TacticCostAnalysis,
};
pub use crate::gap::{analyze_gaps, GapRecommendation};
pub use crate::matcher::{FieldPlanIndex, OrgIndex, Submission};
pub use crate::notifier::{Message, Notifier, NotifyError, RecordingNotifier, RetryingNotifier};
pub use crate::orchestrator::{
    AnalysisError, BudgetOutcome, NewPlanSummary, Orchestrator, PassSummary, LAST_PROCESSED_ROW,
};
pub use crate::records::{
    Budget, BudgetCategory, BudgetColumns, CategoryLine, FieldPlan, FieldPlanColumns,
};
pub use crate::report::{AnalysisReport, WeeklySummary};
pub use crate::store::{
    MemoryProperties, MemoryStore, PropertyError, PropertyStore, Row, StoreError, TabularStore,
};
pub use crate::tactic::{AttemptBand, Tactic, TacticColumns, TacticError, TacticKind};
pub use crate::tracker::{Direction, MissingCounterpartTracker, SweepSummary};
