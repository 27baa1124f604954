// ********* Organization matching ***********

use std::collections::HashMap;

use log::debug;

use crate::cell::normalize_text;
use crate::records::{Budget, FieldPlan};

/// A row that belongs to an organization.
pub trait Submission {
    fn org_name(&self) -> &str;
    fn row_index(&self) -> usize;
}

impl Submission for Budget {
    fn org_name(&self) -> &str {
        &self.member_org_name
    }
    fn row_index(&self) -> usize {
        self.row_index
    }
}

impl Submission for FieldPlan {
    fn org_name(&self) -> &str {
        &self.member_org_name
    }
    fn row_index(&self) -> usize {
        self.row_index
    }
}

/// Lookup from normalized organization name to the most recent submission.
///
/// Matching is exact after whitespace normalization, and case sensitive.
#[derive(Debug)]
pub struct OrgIndex<T> {
    by_name: HashMap<String, T>,
}

impl<T: Submission> OrgIndex<T> {
    pub fn new(submissions: Vec<T>) -> OrgIndex<T> {
        let mut by_name: HashMap<String, T> = HashMap::new();
        for s in submissions {
            let key = normalize_text(s.org_name());
            if key.is_empty() {
                debug!("OrgIndex: skipping row {} without organization name", s.row_index());
                continue;
            }
            let newer = match by_name.get(&key) {
                Some(prev) => s.row_index() > prev.row_index(),
                None => true,
            };
            if newer {
                by_name.insert(key, s);
            }
        }
        OrgIndex { by_name }
    }

    pub fn find(&self, org_name: &str) -> Option<&T> {
        let key = normalize_text(org_name);
        if key.is_empty() {
            return None;
        }
        self.by_name.get(&key)
    }

    pub fn contains(&self, org_name: &str) -> bool {
        self.find(org_name).is_some()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Matches budgets to field plans.
pub type FieldPlanIndex = OrgIndex<FieldPlan>;

impl FieldPlanIndex {
    pub fn find_field_plan_for(&self, org_name: &str) -> Option<&FieldPlan> {
        self.find(org_name)
    }
}
