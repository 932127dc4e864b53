//! Automatic session generation and assignment.
//!
//! [`SessionAllocator`] expands one subject into its session requests and
//! resolves each request against the [`GridState`], in entity-generator
//! order:
//!
//! ```text
//! Pending ──► SlotChosen ──► TeacherPhase ──► RoomPhase ──► Committed
//!    │             │               │               │
//!    └─────────────┴─► Unplaced    └───────────────┴─► PlacedPartial (still committed)
//! ```
//!
//! # Design decisions
//!
//! | Topic | Choice |
//! |---|---|
//! | State | Catalog behind `Arc`, grid passed as `&mut`, one writer per run |
//! | Ordering | Requests strictly sequential; request N+1 sees N's commit |
//! | Ranking | `(wish tier, current volume, catalog index)` ascending |
//! | Rooms | First fit in catalog order, no balancing dimension |
//! | Errors | Only invalid input aborts; every request yields one report entry |
//!
//! # Example
//! ```rust,ignore
//! let allocator = SessionAllocator::new(Arc::new(catalog));
//! let report = allocator.auto_generate_subject_sessions(&mut grid, "Algorithms", &policy)?;
//! ```

pub mod error;
pub mod report;

pub use error::{AllocationError, AllocationIssue};
pub use report::{AllocationReport, Outcome, ReportEntry, ReportSummary};

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::entity::{expand, SessionRequest};
use crate::grid::GridState;
use crate::model::{Catalog, RoomKind, Session, SessionType, Subject, TimeSlot, MAX_WISHES};
use crate::volume::{
    expected_teacher_count, global_mean_volume, session_volume, teacher_volumes, MeanDenominator,
};

// ── Policy ────────────────────────────────────────────────────────────────────

/// Which phases of the allocation are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulingPolicy {
    pub assign_teachers: bool,
    pub assign_rooms: bool,
    pub respect_wishes: bool,
    /// When `false` the first canonical slot and the first candidates are
    /// taken unconditionally (draft generation before manual curation).
    pub avoid_conflicts: bool,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self {
            assign_teachers: true,
            assign_rooms: true,
            respect_wishes: true,
            avoid_conflicts: true,
        }
    }
}

/// Wish tier of a teacher that did not wish for the slot.
const NO_WISH_TIER: usize = MAX_WISHES;

/// Running teacher → current total volume for one batch.
type VolumeLedger = BTreeMap<String, Decimal>;

// ── SessionAllocator ──────────────────────────────────────────────────────────

/// The allocation engine.
///
/// Holds a shared reference to the catalog.  All per-run state (the volume
/// ledger) is built inside each call and dropped at the end, so the allocator
/// itself is `Send + Sync`; the `&mut GridState` argument is what serialises
/// concurrent callers.
pub struct SessionAllocator {
    catalog: Arc<Catalog>,
    denominator: MeanDenominator,
}

impl SessionAllocator {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            denominator: MeanDenominator::default(),
        }
    }

    /// Choose which teachers count towards the VHM.
    pub fn with_denominator(mut self, denominator: MeanDenominator) -> Self {
        self.denominator = denominator;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The balancing target (VHM) under the configured denominator.
    pub fn mean_volume(&self) -> Option<Decimal> {
        global_mean_volume(
            &self.catalog.subjects,
            expected_teacher_count(&self.catalog.teachers, self.denominator),
        )
    }

    // ── Public entry points ───────────────────────────────────────────────────

    /// Generate, place and staff every session `subject` requires.
    ///
    /// Sessions are committed to `grid` one request at a time.  The returned
    /// report has exactly one entry per request, in entity-generator order.
    ///
    /// # Errors
    /// * [`AllocationError::UnknownSubject`] – `subject` is not in the catalog.
    /// * [`AllocationError::InvalidSubjectConfiguration`] – the subject fails
    ///   validation.  Nothing is placed.
    pub fn auto_generate_subject_sessions(
        &self,
        grid: &mut GridState,
        subject: &str,
        policy: &SchedulingPolicy,
    ) -> Result<AllocationReport, AllocationError> {
        let subject = self
            .catalog
            .subject(subject)
            .ok_or_else(|| AllocationError::UnknownSubject(subject.to_string()))?;
        subject.validate()?;

        let requests = expand(subject);
        let slots = self.catalog.week.canonical_slots();
        let mean = self.mean_volume();
        let mut ledger = teacher_volumes(&self.catalog, grid.sessions());

        info!(
            subject = %subject.name,
            requests = requests.len(),
            slots = slots.len(),
            teachers = self.catalog.teachers.len(),
            rooms = self.catalog.rooms.len(),
            vhm = ?mean,
            ?policy,
            "=== auto-generating subject sessions ==="
        );

        let mut report = AllocationReport::new(subject.name.clone(), mean);
        for request in requests {
            let entry = self.allocate_request(grid, subject, request, &slots, policy, &mut ledger);
            report.push(entry);
        }

        let summary = report.summary();
        info!(
            subject = %subject.name,
            placed = summary.placed,
            partial = summary.partial,
            unplaced = summary.unplaced,
            "=== subject allocation complete ==="
        );
        Ok(report)
    }

    /// Place and staff a single request, e.g. one group re-added by hand after
    /// its session was deleted.
    ///
    /// # Errors
    /// Same as [`auto_generate_subject_sessions`](Self::auto_generate_subject_sessions)
    /// for the request's subject.
    pub fn allocate_session_request(
        &self,
        grid: &mut GridState,
        request: SessionRequest,
        policy: &SchedulingPolicy,
    ) -> Result<ReportEntry, AllocationError> {
        let subject = self
            .catalog
            .subject(&request.subject)
            .ok_or_else(|| AllocationError::UnknownSubject(request.subject.clone()))?;
        subject.validate()?;

        let slots = self.catalog.week.canonical_slots();
        let mut ledger = teacher_volumes(&self.catalog, grid.sessions());
        Ok(self.allocate_request(grid, subject, request, &slots, policy, &mut ledger))
    }

    /// Run [`auto_generate_subject_sessions`](Self::auto_generate_subject_sessions)
    /// for every catalog subject, in catalog order.
    ///
    /// A subject that fails validation yields an `Err` in its slot of the
    /// result; the following subjects are still processed.
    pub fn auto_generate_all(
        &self,
        grid: &mut GridState,
        policy: &SchedulingPolicy,
    ) -> Vec<(String, Result<AllocationReport, AllocationError>)> {
        self.catalog
            .subjects
            .iter()
            .map(|s| {
                let result = self.auto_generate_subject_sessions(grid, &s.name, policy);
                if let Err(e) = &result {
                    warn!(subject = %s.name, error = %e, "subject skipped");
                }
                (s.name.clone(), result)
            })
            .collect()
    }

    /// All-or-nothing variant: allocate against a copy of `grid` and swap it
    /// in only if no request ended `Unplaced`.
    ///
    /// Returns the report together with whether it was committed.
    pub fn auto_generate_transactional(
        &self,
        grid: &mut GridState,
        subject: &str,
        policy: &SchedulingPolicy,
    ) -> Result<(AllocationReport, bool), AllocationError> {
        let mut draft = grid.clone();
        let report = self.auto_generate_subject_sessions(&mut draft, subject, policy)?;
        let unplaced = report.summary().unplaced;
        if unplaced == 0 {
            *grid = draft;
            Ok((report, true))
        } else {
            warn!(
                subject = %report.subject,
                unplaced,
                "✗ transactional run left requests unplaced, grid left untouched"
            );
            Ok((report, false))
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Per-request pipeline
    // ─────────────────────────────────────────────────────────────────────────

    fn allocate_request(
        &self,
        grid: &mut GridState,
        subject: &Subject,
        request: SessionRequest,
        slots: &[TimeSlot],
        policy: &SchedulingPolicy,
        ledger: &mut VolumeLedger,
    ) -> ReportEntry {
        // 1. Slot
        let Some(slot) = Self::select_slot(grid, &request, slots, policy) else {
            warn!(
                subject = %request.subject,
                kind = %request.kind,
                group = %request.group,
                "✗ unplaced: no slot available"
            );
            return ReportEntry {
                request,
                outcome: Outcome::Unplaced(AllocationIssue::NoSlotAvailable),
                session: None,
            };
        };

        let mut issues = Vec::new();

        // 2. Teacher(s)
        let mut teachers: Vec<String> = Vec::new();
        if policy.assign_teachers {
            let required = match request.kind {
                SessionType::Lab => subject.nb_enseignants_tp,
                _ => 1,
            };
            let volume = session_volume(subject, request.kind);
            for _ in 0..required {
                let Some(name) = self.select_teacher(grid, &slot, &teachers, policy, ledger)
                else {
                    break;
                };
                *ledger.entry(name.clone()).or_default() += volume;
                teachers.push(name);
            }
            let assigned = teachers.len() as u32;
            if assigned < required {
                issues.push(AllocationIssue::NoTeacherAvailable { required, assigned });
            }
        }

        // 3. Room
        let mut room = None;
        if policy.assign_rooms {
            room = self.select_room(grid, &slot, request.kind, policy);
            if room.is_none() {
                issues.push(AllocationIssue::NoRoomAvailable {
                    kind: RoomKind::for_session(request.kind),
                });
            }
        }

        // 4. Commit
        let session = Session {
            id: grid.allocate_id(),
            subject: request.subject.clone(),
            kind: request.kind,
            group: request.group.clone(),
            slot,
            teachers,
            room,
        };
        grid.place(session.clone());

        let outcome = if issues.is_empty() {
            info!(
                id = %session.id,
                kind = %session.kind,
                group = %session.group,
                slot = %session.slot,
                teachers = ?session.teachers,
                room = ?session.room,
                "✓ placed"
            );
            Outcome::Placed
        } else {
            for issue in &issues {
                warn!(
                    id = %session.id,
                    kind = %session.kind,
                    group = %session.group,
                    slot = %session.slot,
                    %issue,
                    "placed partially"
                );
            }
            Outcome::PlacedPartial(issues)
        };

        ReportEntry {
            request,
            outcome,
            session: Some(session),
        }
    }

    /// First canonical slot where the request's cohort is free, or simply the
    /// first canonical slot when conflicts are not avoided.
    fn select_slot(
        grid: &GridState,
        request: &SessionRequest,
        slots: &[TimeSlot],
        policy: &SchedulingPolicy,
    ) -> Option<TimeSlot> {
        if !policy.avoid_conflicts {
            return slots.first().cloned();
        }
        let cohort = request.group.cohort();
        slots
            .iter()
            .find(|slot| !grid.is_cohort_busy(slot, &cohort))
            .cloned()
    }

    /// Best-ranked teacher for `slot`, skipping those already chosen for this
    /// session.
    ///
    /// Rank key, ascending: wish tier (1st, 2nd, 3rd choice, none), then
    /// current total volume, then catalog position.  With wishes ignored every
    /// teacher is in the same tier, so the choice is purely load balancing.
    fn select_teacher(
        &self,
        grid: &GridState,
        slot: &TimeSlot,
        chosen: &[String],
        policy: &SchedulingPolicy,
        ledger: &VolumeLedger,
    ) -> Option<String> {
        let best = self
            .catalog
            .teachers
            .iter()
            .enumerate()
            .filter(|(_, t)| !chosen.contains(&t.name))
            .filter(|(_, t)| !policy.avoid_conflicts || !grid.is_teacher_busy(slot, &t.name))
            .map(|(idx, t)| {
                let tier = if policy.respect_wishes {
                    t.wish_rank(slot).unwrap_or(NO_WISH_TIER)
                } else {
                    0
                };
                let volume = ledger.get(&t.name).copied().unwrap_or_default();
                debug!(teacher = %t.name, %slot, tier, %volume, "teacher candidate");
                ((tier, volume, idx), t)
            })
            .min_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, t)| t.name.clone());

        if best.is_none() {
            debug!(%slot, "no teacher candidate left");
        }
        best
    }

    /// First room (catalog order) of the kind `kind` needs that is free at
    /// `slot`.
    fn select_room(
        &self,
        grid: &GridState,
        slot: &TimeSlot,
        kind: SessionType,
        policy: &SchedulingPolicy,
    ) -> Option<String> {
        self.catalog
            .rooms
            .iter()
            .filter(|r| r.kind.accepts(kind))
            .find(|r| !policy.avoid_conflicts || !grid.is_room_busy(slot, &r.name))
            .map(|r| r.name.clone())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
