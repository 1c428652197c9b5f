//! Validation report containing all issues for a dataset.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::issue::{IssueKind, Severity, ValidationIssue};
use crate::policy::SeverityPolicy;

/// Validation report for one extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub dataset: String,
    pub rows_checked: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Create an empty report for a dataset.
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            rows_checked: 0,
            issues: Vec::new(),
        }
    }

    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = ValidationIssue>) {
        self.issues.extend(issues);
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Total number of issues.
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn fatal_count(&self, policy: &SeverityPolicy) -> usize {
        self.issues
            .iter()
            .filter(|issue| policy.is_fatal(issue.kind))
            .count()
    }

    pub fn warning_count(&self, policy: &SeverityPolicy) -> usize {
        self.len() - self.fatal_count(policy)
    }

    /// True iff no issue is fatal under `policy`. Warnings never matter.
    pub fn is_usable(&self, policy: &SeverityPolicy) -> bool {
        self.fatal_count(policy) == 0
    }

    pub fn has_kind(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|issue| issue.kind == kind)
    }

    pub fn issues_for<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a ValidationIssue> {
        self.issues.iter().filter(move |issue| issue.column == column)
    }

    pub fn counts_by_kind(&self) -> BTreeMap<IssueKind, usize> {
        let mut counts = BTreeMap::new();
        for issue in &self.issues {
            *counts.entry(issue.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Issues with fatal ones first, otherwise in discovery order.
    pub fn sorted_by_severity(&self, policy: &SeverityPolicy) -> Vec<(Severity, &ValidationIssue)> {
        let mut issues: Vec<_> = self
            .issues
            .iter()
            .map(|issue| (policy.severity(issue.kind), issue))
            .collect();
        issues.sort_by_key(|(severity, _)| *severity);
        issues
    }
}
