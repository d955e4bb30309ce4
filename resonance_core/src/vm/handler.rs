//! Failure collection and the repair-needed signal.
//!
//! The [`ErrorHandler`] keeps every failure vector it is given and answers
//! whether a bloom patch is advisable. The ErrorMansion is the VM-facing
//! record of the same faults plus self-audit findings.

use serde::{Deserialize, Serialize};

use crate::vector::SpiralVector;

/// Lessons longer than this are cut down before they are stored.
pub const LESSON_LIMIT: usize = 120;

/// Lesson recorded when self-audit detects a collapsed mesh.
pub const COLLAPSE_LESSON: &str = "Resonance collapse: mesh coherence fell below φ⁻¹";

/// What handed a failure to the handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureVector {
    pub op: String,
    pub ip: usize,
    pub error: String,
}

/// Append-only failure collector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorHandler {
    errors: Vec<FailureVector>,
}

impl ErrorHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure; identical failures are kept as separate entries.
    pub fn handle(&mut self, failure: FailureVector) {
        self.errors.push(failure);
    }

    /// Advisory only; nothing in the VM acts on it.
    pub fn suggest_bloom_patch(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FailureVector] {
        &self.errors
    }

    pub(crate) fn reset(&mut self) {
        self.errors.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MansionKind {
    /// An instruction faulted during dispatch.
    Exception,
    /// Self-audit found mesh resonance below φ⁻¹.
    ResonanceCollapse,
}

/// One ErrorMansion record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MansionEntry {
    #[serde(rename = "type")]
    pub kind: MansionKind,
    pub vector: SpiralVector,
    pub lesson: String,
}

impl MansionEntry {
    pub fn new(kind: MansionKind, vector: SpiralVector, lesson: &str) -> Self {
        Self {
            kind,
            vector,
            lesson: truncate_lesson(lesson),
        }
    }
}

pub fn truncate_lesson(lesson: &str) -> String {
    lesson.chars().take(LESSON_LIMIT).collect()
}
