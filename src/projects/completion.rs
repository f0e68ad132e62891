//! Completion rules for project controls.
//!
//! Non-applicable controls are ignored by every counter; non-applicable
//! subcontrols are ignored when judging their control.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubControlStatus {
    pub is_applicable: bool,
    pub implemented: i32,
    pub evidence_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlStatus {
    pub is_applicable: bool,
    pub subcontrols: Vec<SubControlStatus>,
}

impl ControlStatus {
    fn applicable_subcontrols(&self) -> impl Iterator<Item = &SubControlStatus> {
        self.subcontrols.iter().filter(|s| s.is_applicable)
    }

    /// Applicable, and every applicable subcontrol fully implemented.
    pub fn is_complete(&self) -> bool {
        self.is_applicable && self.applicable_subcontrols().all(|s| s.implemented == 100)
    }

    pub fn is_not_implemented(&self) -> bool {
        self.is_applicable && !self.is_complete()
    }

    pub fn is_missing_evidence(&self) -> bool {
        self.is_applicable && self.applicable_subcontrols().any(|s| s.evidence_count == 0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompletionCounts {
    pub complete: usize,
    pub not_implemented: usize,
    pub missing_evidence: usize,
}

pub fn count_completion(controls: &[ControlStatus]) -> CompletionCounts {
    controls
        .iter()
        .fold(CompletionCounts::default(), |mut counts, control| {
            counts.complete += usize::from(control.is_complete());
            counts.not_implemented += usize::from(control.is_not_implemented());
            counts.missing_evidence += usize::from(control.is_missing_evidence());
            counts
        })
}
