use serde::Serialize;

use crate::schema::{Level, Stage};

/// The audit treatment chosen for one request.
///
/// `omit_stages` borrows from the evaluator that produced it, so evaluation
/// never allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Disposition<'a> {
    /// How much of the request to record.
    pub level: Level,
    /// Stages for which no audit event is emitted.
    pub omit_stages: &'a [Stage],
    /// Whether managed fields are stripped from logged object bodies.
    pub omit_managed_fields: bool,
}

impl Disposition<'_> {
    /// Returns `true` when events for `stage` are suppressed.
    pub fn omits_stage(&self, stage: &Stage) -> bool {
        self.omit_stages.contains(stage)
    }

    /// Returns `true` when the request is not audited at all.
    pub fn is_silent(&self) -> bool {
        self.level == Level::None
    }
}
