/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core timetable data structures.
//!
//! Two layers model the two sides of the allocation pipeline:
//!
//! ```text
//! YAML catalog ──(config)──►  Catalog + WeekGrid  ──(scheduler)──►  Session  ──►  GridState
//!                              ↑ read-only during a run               ↑ committed, one per request
//! ```
//!
//! # Ownership model
//! A [`Catalog`] is immutable for the duration of one allocation run and is
//! shared behind an `Arc`.  Sessions are owned by the
//! [`GridState`](crate::grid::GridState); the engine only ever holds a
//! `&mut GridState`, so the borrow checker enforces the single-writer rule.

use std::fmt;

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::scheduler::AllocationError;

// ── Weekly grid ───────────────────────────────────────────────────────────────

/// Teaching day.  The derived `Ord` is the canonical Monday → Saturday order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    #[serde(alias = "lundi")]
    Monday,
    #[serde(alias = "mardi")]
    Tuesday,
    #[serde(alias = "mercredi")]
    Wednesday,
    #[serde(alias = "jeudi")]
    Thursday,
    #[serde(alias = "vendredi")]
    Friday,
    #[serde(alias = "samedi")]
    Saturday,
}

impl Day {
    /// All teaching days in canonical order.
    pub const ALL: [Day; 6] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Day::Monday => "monday",
            Day::Tuesday => "tuesday",
            Day::Wednesday => "wednesday",
            Day::Thursday => "thursday",
            Day::Friday => "friday",
            Day::Saturday => "saturday",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One teaching period of the day, e.g. `P1 08:30–10:00`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    pub label: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Period {
    pub fn new(label: impl Into<String>, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            label: label.into(),
            start,
            end,
        }
    }
}

/// A (day, period) cell of the weekly grid.
///
/// The period is referenced by its label; canonical ordering is owned by
/// [`WeekGrid`], not by the derived `Ord` (which is only used for stable map
/// iteration).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub day: Day,
    pub period: String,
}

impl TimeSlot {
    pub fn new(day: Day, period: impl Into<String>) -> Self {
        Self {
            day,
            period: period.into(),
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.day, self.period)
    }
}

/// The configured teaching week: which days and which periods exist.
///
/// Days are kept sorted Monday → Saturday and periods sorted by start time,
/// so [`canonical_slots`](Self::canonical_slots) is always deterministic
/// whatever order the configuration listed them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekGrid {
    days: Vec<Day>,
    periods: Vec<Period>,
}

impl WeekGrid {
    pub fn new(mut days: Vec<Day>, mut periods: Vec<Period>) -> Self {
        days.sort_unstable();
        days.dedup();
        periods.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.label.cmp(&b.label)));
        Self { days, periods }
    }

    /// Fallback week used when the catalog file has no `week` section:
    /// Monday → Saturday, four periods of 1h30.
    pub fn default_week() -> Self {
        Self::new(
            Day::ALL.to_vec(),
            vec![
                Period::new("P1", hm(8, 30), hm(10, 0)),
                Period::new("P2", hm(10, 15), hm(11, 45)),
                Period::new("P3", hm(13, 0), hm(14, 30)),
                Period::new("P4", hm(14, 45), hm(16, 15)),
            ],
        )
    }

    pub fn days(&self) -> &[Day] {
        &self.days
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn period(&self, label: &str) -> Option<&Period> {
        self.periods.iter().find(|p| p.label == label)
    }

    /// Returns `true` if `slot` names a configured day and period.
    pub fn contains(&self, slot: &TimeSlot) -> bool {
        self.days.contains(&slot.day) && self.period(&slot.period).is_some()
    }

    /// Cartesian product days × periods in canonical order (day-major).
    pub fn canonical_slots(&self) -> Vec<TimeSlot> {
        self.days
            .iter()
            .flat_map(|&day| {
                self.periods
                    .iter()
                    .map(move |p| TimeSlot::new(day, p.label.clone()))
            })
            .collect()
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

// ── Session & room types ──────────────────────────────────────────────────────

/// Kind of teaching session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    /// Cours magistral – one per lecture section.
    #[serde(alias = "cours")]
    Lecture,
    /// Travaux dirigés.
    #[serde(alias = "td")]
    Tutorial,
    /// Travaux pratiques, possibly co-taught.
    #[serde(alias = "tp")]
    Lab,
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionType::Lecture => "lecture",
            SessionType::Tutorial => "tutorial",
            SessionType::Lab => "lab",
        })
    }
}

/// Room type tag.  Each kind hosts exactly one [`SessionType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    #[serde(alias = "amphi")]
    LectureHall,
    #[serde(alias = "salle_td")]
    TutorialRoom,
    #[serde(alias = "salle_tp")]
    Lab,
}

impl RoomKind {
    /// The room kind a session of type `kind` must be hosted in.
    pub fn for_session(kind: SessionType) -> Self {
        match kind {
            SessionType::Lecture => RoomKind::LectureHall,
            SessionType::Tutorial => RoomKind::TutorialRoom,
            SessionType::Lab => RoomKind::Lab,
        }
    }

    pub fn accepts(self, kind: SessionType) -> bool {
        Self::for_session(kind) == self
    }
}

impl fmt::Display for RoomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RoomKind::LectureHall => "lecture_hall",
            RoomKind::TutorialRoom => "tutorial_room",
            RoomKind::Lab => "lab",
        })
    }
}

// ── Student groups ────────────────────────────────────────────────────────────

/// Identifies which students attend a session.
///
/// `number == None` is a whole lecture section; `Some(n)` is tutorial/lab
/// group `n` (1-based) of that section.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StudentGroup {
    #[serde(default)]
    pub track: String,
    pub section: String,
    #[serde(default)]
    pub number: Option<u32>,
}

impl StudentGroup {
    pub fn section(track: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            track: track.into(),
            section: section.into(),
            number: None,
        }
    }

    pub fn group(track: impl Into<String>, section: impl Into<String>, number: u32) -> Self {
        Self {
            track: track.into(),
            section: section.into(),
            number: Some(number),
        }
    }

    /// `"Section A"` or `"Section A – G2"`.
    pub fn label(&self) -> String {
        match self.number {
            None => format!("Section {}", self.section),
            Some(n) => format!("Section {} – G{}", self.section, n),
        }
    }

    /// [`label`](Self::label) prefixed with the track, e.g.
    /// `"L2 Info – Section A – G2"`.
    pub fn qualified_label(&self) -> String {
        if self.track.is_empty() {
            self.label()
        } else {
            format!("{} – {}", self.track, self.label())
        }
    }

    /// The cohort used for student-side conflict detection.
    pub fn cohort(&self) -> Cohort {
        Cohort {
            track: self.track.clone(),
            section: self.section.clone(),
        }
    }
}

impl fmt::Display for StudentGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_label())
    }
}

/// A lecture section of one track, together with all of its tutorial and
/// lab groups.  Two sessions of the same cohort may not share a time slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Cohort {
    pub track: String,
    pub section: String,
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.track.is_empty() {
            write!(f, "Section {}", self.section)
        } else {
            write!(f, "{} – Section {}", self.track, self.section)
        }
    }
}

// ── Subject ───────────────────────────────────────────────────────────────────

/// Hour-equivalent billed for one unit of each session type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitVolumes {
    pub lecture: Decimal,
    pub tutorial: Decimal,
    pub lab: Decimal,
}

impl UnitVolumes {
    pub fn get(&self, kind: SessionType) -> Decimal {
        match kind {
            SessionType::Lecture => self.lecture,
            SessionType::Tutorial => self.tutorial,
            SessionType::Lab => self.lab,
        }
    }
}

/// Structural configuration of one subject (matière).
///
/// Group counts are unsigned, so a negative count can only arise at the
/// configuration boundary, where it is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subject {
    /// Unique subject name.
    pub name: String,

    /// Owning program / track; prefixes every student-group label.
    pub track: String,

    /// Number of lecture sections.
    pub sections_cours: u32,

    /// Tutorial groups per section.
    pub td_groups: u32,

    /// Lab groups per section.
    pub tp_groups: u32,

    pub volumes: UnitVolumes,

    /// Teachers required simultaneously in one lab group.
    pub nb_enseignants_tp: u32,
}

impl Subject {
    /// Number of session requests the entity generator emits for this subject,
    /// `None` if it does not fit in a `u32`.
    pub fn expected_session_count(&self) -> Option<u32> {
        self.td_groups
            .checked_add(self.tp_groups)
            .and_then(|groups| groups.checked_add(1))
            .and_then(|per_section| per_section.checked_mul(self.sections_cours))
    }

    /// Checks the invariants the type system cannot express.
    ///
    /// # Errors
    /// [`AllocationError::InvalidSubjectConfiguration`] for a negative unit
    /// volume, a zero lab staffing requirement, or group counts whose session
    /// total overflows.
    pub fn validate(&self) -> Result<(), AllocationError> {
        for kind in [SessionType::Lecture, SessionType::Tutorial, SessionType::Lab] {
            let v = self.volumes.get(kind);
            if v < Decimal::ZERO {
                return Err(AllocationError::InvalidSubjectConfiguration {
                    subject: self.name.clone(),
                    reason: format!("{kind} unit volume is negative ({v})"),
                });
            }
        }
        if self.nb_enseignants_tp == 0 {
            return Err(AllocationError::InvalidSubjectConfiguration {
                subject: self.name.clone(),
                reason: "nb_enseignants_tp must be at least 1".to_string(),
            });
        }
        if self.expected_session_count().is_none() {
            return Err(AllocationError::InvalidSubjectConfiguration {
                subject: self.name.clone(),
                reason: format!(
                    "too many sessions ({} sections × (1 + {} td + {} tp))",
                    self.sections_cours, self.td_groups, self.tp_groups
                ),
            });
        }
        Ok(())
    }
}

// ── Teacher / Room ────────────────────────────────────────────────────────────

/// Number of ranked wishes a teacher may express.
pub const MAX_WISHES: usize = 3;

/// A teacher and the volume credits that exist independently of sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Teacher {
    pub name: String,

    /// Preferred slots, best first.  At most three.
    pub wishes: Vec<TimeSlot>,

    /// Flat-rate volume credit.
    pub forfait: Decimal,

    /// Signed supplementary adjustments, accumulated over the term.
    pub supplementary: Vec<Decimal>,

    /// Teacher carries forfait only and may be left out of the VHM
    /// denominator.
    pub forfait_only: bool,
}

impl Teacher {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 0-based rank of `slot` in the wish list, `None` when not wished.
    /// Only the first [`MAX_WISHES`] entries count.
    pub fn wish_rank(&self, slot: &TimeSlot) -> Option<usize> {
        self.wishes.iter().take(MAX_WISHES).position(|w| w == slot)
    }

    pub fn supplementary_total(&self) -> Decimal {
        self.supplementary.iter().copied().sum()
    }

    /// Volume credited regardless of sessions taught.
    pub fn fixed_volume(&self) -> Decimal {
        self.forfait + self.supplementary_total()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Room {
    pub name: String,
    pub kind: RoomKind,
}

impl Room {
    pub fn new(name: impl Into<String>, kind: RoomKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// Grid-unique session identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One scheduled séance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub subject: String,
    pub kind: SessionType,
    pub group: StudentGroup,
    pub slot: TimeSlot,

    /// Assigned teachers.  Empty when none could be assigned; more than one
    /// only for co-taught labs.
    #[serde(default)]
    pub teachers: Vec<String>,

    #[serde(default)]
    pub room: Option<String>,
}

impl Session {
    pub fn has_teacher(&self, name: &str) -> bool {
        self.teachers.iter().any(|t| t == name)
    }
}

// ── Catalog ───────────────────────────────────────────────────────────────────

/// Read-only view of everything the engine allocates against, in canonical
/// (configuration) order.  List order is the tie-break order for teachers and
/// rooms.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub week: WeekGrid,
    pub subjects: Vec<Subject>,
    pub teachers: Vec<Teacher>,
    pub rooms: Vec<Room>,
}

impl Catalog {
    pub fn subject(&self, name: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.name == name)
    }

    pub fn teacher(&self, name: &str) -> Option<&Teacher> {
        self.teachers.iter().find(|t| t.name == name)
    }

    pub fn room(&self, name: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.name == name)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
