//! Grid state: the authoritative set of placed sessions for one term.
//!
//! Three lookup indices answer "is this resource busy at this slot?" in O(1):
//!
//! | Index | Key | Invariant when `avoid_conflicts` is on |
//! |---|---|---|
//! | teacher | `(slot, teacher)` | at most one session |
//! | room | `(slot, room)` | at most one session |
//! | cohort | `(slot, track + section)` | at most one session |
//!
//! The indices are multimaps: draft generation with conflict avoidance
//! disabled may legitimately stack several sessions on one key, and
//! [`GridState::conflicts`] reports every such collision.
//!
//! `GridState` has no interior mutability.  Every mutation goes through
//! `&mut self`, which is what keeps the allocator single-writer.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;

use serde::Serialize;
use tracing::debug;

use crate::model::{Cohort, Session, SessionId, StudentGroup, TimeSlot};

type Index<K> = HashMap<(TimeSlot, K), BTreeSet<SessionId>>;

// ── Conflicts ─────────────────────────────────────────────────────────────────

/// Which index a collision was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ConflictKind {
    Teacher,
    Room,
    Cohort,
}

/// Two or more sessions sharing one `(slot, resource)` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub slot: TimeSlot,
    /// Teacher name, room name, or cohort label.
    pub resource: String,
    pub sessions: Vec<SessionId>,
}

// ── GridState ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct GridState {
    /// Sessions keyed by id; `BTreeMap` so iteration is always in id order.
    sessions: BTreeMap<SessionId, Session>,
    by_teacher: Index<String>,
    by_room: Index<String>,
    by_cohort: Index<Cohort>,
    next_id: u64,
}

impl GridState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a grid from already-scheduled sessions.
    pub fn from_sessions(sessions: impl IntoIterator<Item = Session>) -> Self {
        let mut grid = Self::new();
        for session in sessions {
            grid.place(session);
        }
        grid
    }

    /// Hand out a fresh id, greater than every id placed so far.
    pub fn allocate_id(&mut self) -> SessionId {
        let id = SessionId(self.next_id);
        self.next_id += 1;
        id
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// `true` if placing a session for `group` at `slot` would collide with an
    /// existing session of the same cohort, or with `teacher` / `room` when
    /// supplied.
    pub fn has_conflict(
        &self,
        slot: &TimeSlot,
        teacher: Option<&str>,
        room: Option<&str>,
        group: &StudentGroup,
    ) -> bool {
        self.is_cohort_busy(slot, &group.cohort())
            || teacher.is_some_and(|t| self.is_teacher_busy(slot, t))
            || room.is_some_and(|r| self.is_room_busy(slot, r))
    }

    pub fn is_teacher_busy(&self, slot: &TimeSlot, teacher: &str) -> bool {
        Self::occupied(&self.by_teacher, slot, teacher.to_string())
    }

    pub fn is_room_busy(&self, slot: &TimeSlot, room: &str) -> bool {
        Self::occupied(&self.by_room, slot, room.to_string())
    }

    pub fn is_cohort_busy(&self, slot: &TimeSlot, cohort: &Cohort) -> bool {
        Self::occupied(&self.by_cohort, slot, cohort.clone())
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// All sessions in id order.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn sessions_for_subject<'a>(
        &'a self,
        subject: &'a str,
    ) -> impl Iterator<Item = &'a Session> + 'a {
        self.sessions.values().filter(move |s| s.subject == subject)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    // ── Mutation ──────────────────────────────────────────────────────────────

    /// Insert `session` and index it.
    ///
    /// Placing an id that is already present replaces the old session (and
    /// its index entries) and returns it.  Nothing here can fail half-way, so
    /// the three indices are always consistent with `sessions`.
    pub fn place(&mut self, session: Session) -> Option<Session> {
        let previous = self.remove(session.id);
        if previous.is_some() {
            debug!(id = %session.id, "re-placing existing session (update)");
        }

        let id = session.id;
        for teacher in &session.teachers {
            Self::index_insert(&mut self.by_teacher, &session.slot, teacher.clone(), id);
        }
        if let Some(room) = &session.room {
            Self::index_insert(&mut self.by_room, &session.slot, room.clone(), id);
        }
        Self::index_insert(&mut self.by_cohort, &session.slot, session.group.cohort(), id);

        self.next_id = self.next_id.max(id.0 + 1);
        self.sessions.insert(id, session);
        previous
    }

    /// Remove a session and its index entries.  Unknown ids are a no-op.
    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        let session = self.sessions.remove(&id)?;
        for teacher in &session.teachers {
            Self::index_remove(&mut self.by_teacher, &session.slot, teacher.clone(), id);
        }
        if let Some(room) = &session.room {
            Self::index_remove(&mut self.by_room, &session.slot, room.clone(), id);
        }
        Self::index_remove(&mut self.by_cohort, &session.slot, session.group.cohort(), id);
        Some(session)
    }

    /// Remove every session of `subject`, returning them in id order.
    pub fn remove_subject(&mut self, subject: &str) -> Vec<Session> {
        let ids: Vec<SessionId> = self.sessions_for_subject(subject).map(|s| s.id).collect();
        ids.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    // ── Audit ─────────────────────────────────────────────────────────────────

    /// Every index key holding more than one session, sorted by kind, slot and
    /// resource.  Empty after any batch run with conflict avoidance.
    pub fn conflicts(&self) -> Vec<Conflict> {
        let mut out = Vec::new();
        Self::collect_conflicts(&self.by_teacher, ConflictKind::Teacher, &mut out);
        Self::collect_conflicts(&self.by_room, ConflictKind::Room, &mut out);
        Self::collect_conflicts(&self.by_cohort, ConflictKind::Cohort, &mut out);
        out.sort_by(|a, b| {
            (a.kind, &a.slot, &a.resource).cmp(&(b.kind, &b.slot, &b.resource))
        });
        out
    }

    // ── Index helpers ─────────────────────────────────────────────────────────

    fn occupied<K: Hash + Eq>(index: &Index<K>, slot: &TimeSlot, key: K) -> bool {
        index
            .get(&(slot.clone(), key))
            .is_some_and(|ids| !ids.is_empty())
    }

    fn index_insert<K: Hash + Eq>(index: &mut Index<K>, slot: &TimeSlot, key: K, id: SessionId) {
        index.entry((slot.clone(), key)).or_default().insert(id);
    }

    fn index_remove<K: Hash + Eq>(index: &mut Index<K>, slot: &TimeSlot, key: K, id: SessionId) {
        let k = (slot.clone(), key);
        if let Some(ids) = index.get_mut(&k) {
            ids.remove(&id);
            if ids.is_empty() {
                index.remove(&k);
            }
        }
    }

    fn collect_conflicts<K: Hash + Eq + ToString>(
        index: &Index<K>,
        kind: ConflictKind,
        out: &mut Vec<Conflict>,
    ) {
        for ((slot, key), ids) in index {
            if ids.len() > 1 {
                out.push(Conflict {
                    kind,
                    slot: slot.clone(),
                    resource: key.to_string(),
                    sessions: ids.iter().copied().collect(),
                });
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
