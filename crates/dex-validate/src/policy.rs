use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::issue::{IssueKind, Severity};

/// Decides which issue kinds are fatal.
///
/// The default is [`SeverityPolicy::soft`]: type mismatches and missing
/// values block a dataset, constraint violations are warnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityPolicy {
    fatal: BTreeSet<IssueKind>,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self::soft()
    }
}

impl SeverityPolicy {
    pub fn soft() -> Self {
        Self {
            fatal: [IssueKind::TypeMismatch, IssueKind::MissingValue]
                .into_iter()
                .collect(),
        }
    }

    /// Every kind except unused domain values and anomalies is fatal.
    pub fn strict() -> Self {
        Self {
            fatal: IssueKind::ALL
                .into_iter()
                .filter(|kind| !matches!(kind, IssueKind::UnusedDomainValue | IssueKind::Anomaly))
                .collect(),
        }
    }

    /// Nothing is fatal: every issue is reported only.
    pub fn permissive() -> Self {
        Self {
            fatal: BTreeSet::new(),
        }
    }

    /// When `allow` is set, missing values are reported as warnings.
    #[must_use]
    pub fn allow_nulls(self, allow: bool) -> Self {
        if allow {
            self.with_warning(IssueKind::MissingValue)
        } else {
            self.with_fatal(IssueKind::MissingValue)
        }
    }

    #[must_use]
    pub fn with_fatal(mut self, kind: IssueKind) -> Self {
        self.fatal.insert(kind);
        self
    }

    #[must_use]
    pub fn with_warning(mut self, kind: IssueKind) -> Self {
        self.fatal.remove(&kind);
        self
    }

    pub fn is_fatal(&self, kind: IssueKind) -> bool {
        self.fatal.contains(&kind)
    }

    pub fn severity(&self, kind: IssueKind) -> Severity {
        if self.is_fatal(kind) {
            Severity::Fatal
        } else {
            Severity::Warning
        }
    }

    /// Fatal kinds in declaration order.
    pub fn fatal_kinds(&self) -> impl Iterator<Item = IssueKind> + '_ {
        self.fatal.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_policy_blocks_type_and_missing_only() {
        let policy = SeverityPolicy::default();
        assert!(policy.is_fatal(IssueKind::TypeMismatch));
        assert!(policy.is_fatal(IssueKind::MissingValue));
        assert_eq!(policy.severity(IssueKind::DomainViolation), Severity::Warning);
        assert_eq!(policy.severity(IssueKind::PatternViolation), Severity::Warning);
        assert_eq!(policy.severity(IssueKind::RangeViolation), Severity::Warning);
    }

    #[test]
    fn strict_policy_spares_dataset_hints() {
        let policy = SeverityPolicy::strict();
        assert!(policy.is_fatal(IssueKind::RangeViolation));
        assert!(policy.is_fatal(IssueKind::HierarchyInconsistency));
        assert!(!policy.is_fatal(IssueKind::UnusedDomainValue));
        assert!(!policy.is_fatal(IssueKind::Anomaly));
    }

    #[test]
    fn permissive_policy_has_no_fatal_kinds() {
        let policy = SeverityPolicy::permissive();
        assert_eq!(policy.fatal_kinds().count(), 0);
        assert!(IssueKind::ALL.iter().all(|kind| policy.severity(*kind) == Severity::Warning));
        assert_eq!(
            policy.with_fatal(IssueKind::TypeMismatch).fatal_kinds().collect::<Vec<_>>(),
            vec![IssueKind::TypeMismatch]
        );
        assert_eq!(
            SeverityPolicy::soft().fatal_kinds().collect::<Vec<_>>(),
            vec![IssueKind::TypeMismatch, IssueKind::MissingValue]
        );
    }

    #[test]
    fn allow_nulls_downgrades_missing_values() {
        let policy = SeverityPolicy::strict().allow_nulls(true);
        assert!(!policy.is_fatal(IssueKind::MissingValue));
        assert!(policy.allow_nulls(false).is_fatal(IssueKind::MissingValue));
    }
}
