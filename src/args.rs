use clap::{Parser, Subcommand};

/// Matches budget submissions with field plans and sends cost-efficiency analyses.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file. All the keys are optional, see the README
    /// for the complete list.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory, default data) The directory holding the tables (one CSV file per table), the
    /// persistent properties and the outbox of notifications.
    #[clap(short, long, value_parser, default_value = "data")]
    pub data: String,

    /// If passed as an argument, notifications only go to the test recipients and are marked as
    /// tests. Submissions are not marked as analyzed.
    #[clap(long, takes_value = false)]
    pub test_mode: bool,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Analyzes every budget not yet analyzed, then alerts about submissions still missing
    /// their counterpart.
    Analyze,
    /// Only alerts about submissions that waited too long for their counterpart.
    Sweep,
    /// Announces the field plans submitted since the last check and analyzes the budgets
    /// they complete.
    CheckPlans,
    /// Sends the summary of all the submissions received so far.
    WeeklySummary,
    /// Analyzes the most recent budget of one organization, even if it was already analyzed.
    AnalyzeOrg {
        /// The name of the organization, as entered in the forms.
        #[clap(value_parser)]
        name: String,
    },
    /// Copies the budget and field plan sheets of an Excel workbook into the data directory.
    Import {
        /// (file path) The Excel workbook.
        #[clap(value_parser)]
        workbook: String,
        /// (default: the budget table name) The worksheet holding the budgets.
        #[clap(long, value_parser)]
        budget_sheet: Option<String>,
        /// (default: the field plan table name) The worksheet holding the field plans.
        #[clap(long, value_parser)]
        field_plan_sheet: Option<String>,
    },
}
