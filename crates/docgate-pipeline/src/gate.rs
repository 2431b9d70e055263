//! Stage gate evaluation.
//!
//! Pure: callers supply a freshly fetched attachment set.

use std::collections::HashMap;

use docgate_core::Attachment;
use serde::Serialize;

/// Outcome of a gate check. `missing` keeps the order of the requirement list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GateResult {
    pub satisfied: bool,
    pub missing: Vec<String>,
}

pub struct StageGate;

impl StageGate {
    /// A requirement is met iff at least one attachment is tagged with its id.
    ///
    /// Untagged attachments count toward nothing. Ids of deleted categories
    /// are evaluated like any other and therefore always come back missing.
    pub fn evaluate(attachments: &[Attachment], required: Option<&[String]>) -> GateResult {
        let required = required.unwrap_or(&[]);
        if required.is_empty() {
            return GateResult {
                satisfied: true,
                missing: Vec::new(),
            };
        }

        let mut by_category: HashMap<&str, usize> = HashMap::new();
        for attachment in attachments.iter().filter(|a| a.is_tagged()) {
            if let Some(category) = attachment.category.as_deref() {
                *by_category.entry(category).or_default() += 1;
            }
        }

        let mut missing: Vec<String> = Vec::new();
        for id in required {
            let present = by_category.get(id.as_str()).is_some_and(|n| *n > 0);
            if !present && !missing.contains(id) {
                missing.push(id.clone());
            }
        }

        GateResult {
            satisfied: missing.is_empty(),
            missing,
        }
    }
}
