/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the session allocator.
//!
//! Two enums model the two failure layers:
//!
//! * [`AllocationIssue`]: why one session request did not get everything it
//!   asked for.  Non-fatal; carried inside the report outcome, the batch
//!   continues.
//! * [`AllocationError`]: top-level failure returned from
//!   [`SessionAllocator::auto_generate_subject_sessions()`](super::SessionAllocator::auto_generate_subject_sessions).
//!   Aborts the subject's batch before anything is placed.
//!
//! Identical inputs always produce identical issues, so neither layer has a
//! retry notion.

use serde::Serialize;
use thiserror::Error;

use crate::model::RoomKind;

// ── Per-request issues ────────────────────────────────────────────────────────

/// Detailed reason why a single request was left unplaced or only partially
/// staffed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum AllocationIssue {
    /// Every candidate slot already holds a session of the request's cohort
    /// (or the week has no slots at all).
    NoSlotAvailable,

    /// Fewer teachers were free than the session needs.  `assigned` may be
    /// non-zero for a co-taught lab.
    NoTeacherAvailable { required: u32, assigned: u32 },

    /// No room of the matching kind was free at the chosen slot.
    NoRoomAvailable { kind: RoomKind },
}

impl std::fmt::Display for AllocationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationIssue::NoSlotAvailable => {
                write!(f, "no conflict-free slot left in the week")
            }

            AllocationIssue::NoTeacherAvailable { required, assigned } => write!(
                f,
                "only {} of {} required teacher(s) available at the chosen slot",
                assigned, required
            ),

            AllocationIssue::NoRoomAvailable { kind } => {
                write!(f, "no free room of kind '{}' at the chosen slot", kind)
            }
        }
    }
}

// ── Top-level errors ──────────────────────────────────────────────────────────

/// Fatal error for one subject's batch.  Other subjects are unaffected.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// The subject's configuration breaks an invariant (negative count or
    /// volume, zero lab staffing).
    #[error("subject '{subject}' has an invalid configuration: {reason}")]
    InvalidSubjectConfiguration { subject: String, reason: String },

    /// The requested subject is not in the catalog.
    #[error("unknown subject '{0}'")]
    UnknownSubject(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_messages_carry_their_values() {
        let msg = AllocationIssue::NoTeacherAvailable {
            required: 2,
            assigned: 1,
        }
        .to_string();
        assert!(msg.contains("1 of 2"), "{msg}");

        let msg = AllocationIssue::NoRoomAvailable {
            kind: RoomKind::Lab,
        }
        .to_string();
        assert!(msg.contains("'lab'"), "{msg}");
    }

    #[test]
    fn error_messages_name_the_subject() {
        let err = AllocationError::InvalidSubjectConfiguration {
            subject: "Algo".into(),
            reason: "td_groups is negative (-1)".into(),
        };
        assert_eq!(
            err.to_string(),
            "subject 'Algo' has an invalid configuration: td_groups is negative (-1)"
        );
        assert_eq!(
            AllocationError::UnknownSubject("X".into()).to_string(),
            "unknown subject 'X'"
        );
    }
}
