//! Domain membership checks.
//!
//! Comparison is exact on the coerced value: no case folding, no trimming of
//! text. Members that cannot be coerced to the column type are compared by
//! their raw text.

use dex_model::{ColumnMetadata, DataType, RawValue, Value};

use crate::issue::{IssueKind, ValidationIssue};

struct Member {
    text: String,
    value: Option<Value>,
}

/// The declared domain of a column with a record of which members were seen.
pub(crate) struct DomainSet {
    members: Vec<Member>,
    seen: Vec<bool>,
}

impl DomainSet {
    pub fn new(members: &[RawValue], datatype: DataType) -> Self {
        let members: Vec<Member> = members
            .iter()
            .map(|raw| Member {
                text: raw.as_text().into_owned(),
                value: Value::coerce(raw, datatype).ok(),
            })
            .collect();
        let seen = vec![false; members.len()];
        Self { members, seen }
    }

    /// Index of the matching member, if any.
    fn position(&self, raw: &RawValue, coerced: Option<&Value>) -> Option<usize> {
        match coerced {
            Some(value) => self
                .members
                .iter()
                .position(|member| member.value.as_ref() == Some(value)),
            None => {
                let text = raw.as_text();
                self.members.iter().position(|member| member.text == text)
            }
        }
    }

    /// Members never matched by [`check`].
    pub fn unseen(&self) -> impl Iterator<Item = &str> {
        self.members
            .iter()
            .zip(&self.seen)
            .filter(|(_, seen)| !**seen)
            .map(|(member, _)| member.text.as_str())
    }
}

pub fn check(
    column: &ColumnMetadata,
    domain: &mut DomainSet,
    row: usize,
    raw: &RawValue,
    coerced: Option<&Value>,
) -> Option<ValidationIssue> {
    if let Some(position) = domain.position(raw, coerced) {
        domain.seen[position] = true;
        return None;
    }
    let text = raw.as_text().into_owned();
    let message = format!("'{text}' is not in domain of '{}'", column.name);
    Some(ValidationIssue::at_row(
        row,
        &column.name,
        IssueKind::DomainViolation,
        Some(text),
        message,
    ))
}

/// One `UnusedDomainValue` issue per member that never occurred.
pub fn unused(column: &ColumnMetadata, domain: &DomainSet) -> Vec<ValidationIssue> {
    domain
        .unseen()
        .map(|member| {
            ValidationIssue::dataset(
                &column.name,
                IssueKind::UnusedDomainValue,
                member.to_string(),
                format!(
                    "'{member}' is in domain of '{}' but not present in the data",
                    column.name
                ),
            )
        })
        .collect()
}
