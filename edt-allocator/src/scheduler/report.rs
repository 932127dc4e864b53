/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Allocation report: one entry per session request, in request order.
//!
//! `Placed` and `PlacedPartial` both mean a session was committed to the
//! grid; partial placements are warnings the caller can act on (assign a
//! teacher or room by hand), not failures.

use rust_decimal::Decimal;
use serde::Serialize;

use super::error::AllocationIssue;
use crate::entity::SessionRequest;
use crate::model::Session;

/// Terminal state of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "issues", rename_all = "snake_case")]
pub enum Outcome {
    /// Slot, teacher(s) and room all assigned as the policy required.
    Placed,
    /// Committed, but a teacher and/or room phase came up empty.
    PlacedPartial(Vec<AllocationIssue>),
    /// Nothing committed.
    Unplaced(AllocationIssue),
}

impl Outcome {
    pub fn is_committed(&self) -> bool {
        !matches!(self, Outcome::Unplaced(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub request: SessionRequest,
    pub outcome: Outcome,
    /// The committed session; `None` exactly when `Unplaced`.
    pub session: Option<Session>,
}

/// Counts per outcome class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub placed: usize,
    pub partial: usize,
    pub unplaced: usize,
}

impl ReportSummary {
    pub fn total(&self) -> usize {
        self.placed + self.partial + self.unplaced
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationReport {
    pub subject: String,
    /// Balancing target (VHM) in effect during the run.
    pub mean_volume: Option<Decimal>,
    pub entries: Vec<ReportEntry>,
}

impl AllocationReport {
    pub fn new(subject: impl Into<String>, mean_volume: Option<Decimal>) -> Self {
        Self {
            subject: subject.into(),
            mean_volume,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: ReportEntry) {
        self.entries.push(entry);
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for entry in &self.entries {
            match entry.outcome {
                Outcome::Placed => summary.placed += 1,
                Outcome::PlacedPartial(_) => summary.partial += 1,
                Outcome::Unplaced(_) => summary.unplaced += 1,
            }
        }
        summary
    }

    /// Sessions committed by this run, in request order.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.entries.iter().filter_map(|e| e.session.as_ref())
    }

    /// `true` when every request was placed with nothing missing.
    pub fn is_complete(&self) -> bool {
        self.entries
            .iter()
            .all(|e| matches!(e.outcome, Outcome::Placed))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Day, RoomKind, SessionId, SessionType, StudentGroup, TimeSlot};

    fn request() -> SessionRequest {
        SessionRequest {
            subject: "Algo".into(),
            kind: SessionType::Tutorial,
            group: StudentGroup::group("", "A", 1),
        }
    }

    fn session() -> Session {
        Session {
            id: SessionId(0),
            subject: "Algo".into(),
            kind: SessionType::Tutorial,
            group: StudentGroup::group("", "A", 1),
            slot: TimeSlot::new(Day::Monday, "P1"),
            teachers: vec![],
            room: None,
        }
    }

    #[test]
    fn summary_counts_each_outcome_class() {
        let mut report = AllocationReport::new("Algo", None);
        report.push(ReportEntry {
            request: request(),
            outcome: Outcome::Placed,
            session: Some(session()),
        });
        report.push(ReportEntry {
            request: request(),
            outcome: Outcome::PlacedPartial(vec![AllocationIssue::NoRoomAvailable {
                kind: RoomKind::TutorialRoom,
            }]),
            session: Some(session()),
        });
        report.push(ReportEntry {
            request: request(),
            outcome: Outcome::Unplaced(AllocationIssue::NoSlotAvailable),
            session: None,
        });

        let summary = report.summary();
        assert_eq!(
            summary,
            ReportSummary {
                placed: 1,
                partial: 1,
                unplaced: 1
            }
        );
        assert_eq!(summary.total(), 3);
        assert_eq!(report.sessions().count(), 2);
        assert!(!report.is_complete());
    }

    #[test]
    fn empty_report_is_complete() {
        let report = AllocationReport::new("Algo", None);
        assert!(report.is_complete());
        assert_eq!(report.summary().total(), 0);
    }

    #[test]
    fn unplaced_is_the_only_uncommitted_outcome() {
        assert!(Outcome::Placed.is_committed());
        assert!(Outcome::PlacedPartial(vec![]).is_committed());
        assert!(!Outcome::Unplaced(AllocationIssue::NoSlotAvailable).is_committed());
    }
}
