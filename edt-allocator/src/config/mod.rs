//! Timetable catalog loading and validation.
//!
//! One YAML document carries the week layout, subjects, teachers, rooms,
//! already-placed sessions and the default allocation policy:
//!
//! ```yaml
//! week:
//!   days: [monday, tuesday, wednesday, thursday, friday]
//!   periods:
//!     - { label: P1, start: "08:30", end: "10:00" }
//!     - { label: P2, start: "10:15", end: "11:45" }
//! subjects:
//!   - name: Algorithms
//!     track: "L2 Info"
//!     sections_cours: 1
//!     td_groups: 2
//!     tp_groups: 1
//!     volumes: { cours: 2, td: 1.5, tp: 1.5 }
//!     nb_enseignants_tp: 2
//! teachers:
//!   - name: Alice
//!     wishes: [{ day: monday, period: P1 }]
//!     forfait: 0
//! rooms:
//!   - { name: Amphi A, kind: lecture_hall }
//! policy:
//!   respect_wishes: true
//! balancing:
//!   denominator: exclude_forfait_only
//! ```

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::grid::GridState;
use crate::model::{
    Catalog, Day, Period, Room, RoomKind, Session, SessionId, SessionType, StudentGroup, Subject,
    Teacher, TimeSlot, UnitVolumes, WeekGrid,
};
use crate::scheduler::{AllocationError, SchedulingPolicy};
use crate::volume::MeanDenominator;

/// Wishes beyond this rank are dropped at load time.
pub use crate::model::MAX_WISHES;

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
///
/// Kept private – callers work with [`Catalog`] / [`CatalogManager`].
#[derive(Debug, Deserialize)]
struct CatalogFile {
    week: Option<WeekEntry>,
    #[serde(default)]
    subjects: Vec<SubjectEntry>,
    #[serde(default)]
    teachers: Vec<TeacherEntry>,
    #[serde(default)]
    rooms: Vec<RoomEntry>,
    #[serde(default)]
    sessions: Vec<SessionEntry>,
    #[serde(default)]
    policy: SchedulingPolicy,
    #[serde(default)]
    balancing: BalancingEntry,
}

#[derive(Debug, Deserialize)]
struct WeekEntry {
    days: Vec<Day>,
    periods: Vec<PeriodEntry>,
}

#[derive(Debug, Deserialize)]
struct PeriodEntry {
    label: String,
    start: String,
    end: String,
}

/// Counts are signed here so that a negative value reaches validation
/// instead of failing as an opaque type error.
#[derive(Debug, Deserialize)]
struct SubjectEntry {
    name: String,
    #[serde(default)]
    track: String,
    sections_cours: i64,
    #[serde(default)]
    td_groups: i64,
    #[serde(default)]
    tp_groups: i64,
    #[serde(default)]
    volumes: VolumesEntry,
    #[serde(default = "default_nb_enseignants_tp", alias = "nbEnseignantsTP")]
    nb_enseignants_tp: i64,
}

fn default_nb_enseignants_tp() -> i64 {
    1
}

/// Volumes deserialize straight into `Decimal`, so `1.1` stays `1.1`.
#[derive(Debug, Default, Deserialize)]
struct VolumesEntry {
    #[serde(default, alias = "lecture")]
    cours: Decimal,
    #[serde(default, alias = "tutorial")]
    td: Decimal,
    #[serde(default, alias = "lab")]
    tp: Decimal,
}

#[derive(Debug, Deserialize)]
struct TeacherEntry {
    name: String,
    #[serde(default)]
    wishes: Vec<TimeSlot>,
    #[serde(default)]
    forfait: Decimal,
    #[serde(default)]
    supplementary: Vec<Decimal>,
    #[serde(default)]
    forfait_only: bool,
}

#[derive(Debug, Deserialize)]
struct RoomEntry {
    name: String,
    kind: RoomKind,
}

#[derive(Debug, Deserialize)]
struct SessionEntry {
    subject: String,
    kind: SessionType,
    group: StudentGroup,
    day: Day,
    period: String,
    #[serde(default)]
    teachers: Vec<String>,
    room: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BalancingEntry {
    #[serde(default)]
    denominator: MeanDenominator,
}

// ── Conversion helpers ────────────────────────────────────────────────────────

fn parse_time(label: &str, field: &str, value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .with_context(|| format!("period '{label}': invalid {field} time '{value}' (expected HH:MM)"))
}

fn count(subject: &str, field: &str, value: i64) -> Result<u32, AllocationError> {
    u32::try_from(value).map_err(|_| AllocationError::InvalidSubjectConfiguration {
        subject: subject.to_string(),
        reason: if value < 0 {
            format!("{field} is negative ({value})")
        } else {
            format!("{field} is too large ({value})")
        },
    })
}

fn build_week(entry: WeekEntry) -> Result<WeekGrid> {
    let mut labels = HashSet::new();
    let mut periods = Vec::with_capacity(entry.periods.len());
    for p in entry.periods {
        if !labels.insert(p.label.clone()) {
            bail!("duplicate period label '{}'", p.label);
        }
        let start = parse_time(&p.label, "start", &p.start)?;
        let end = parse_time(&p.label, "end", &p.end)?;
        if end <= start {
            bail!("period '{}' ends before it starts", p.label);
        }
        periods.push(Period::new(p.label, start, end));
    }
    Ok(WeekGrid::new(entry.days, periods))
}

fn build_subject(entry: SubjectEntry) -> Result<Subject> {
    let name = entry.name;
    let subject = Subject {
        sections_cours: count(&name, "sections_cours", entry.sections_cours)?,
        td_groups: count(&name, "td_groups", entry.td_groups)?,
        tp_groups: count(&name, "tp_groups", entry.tp_groups)?,
        nb_enseignants_tp: count(&name, "nb_enseignants_tp", entry.nb_enseignants_tp)?,
        volumes: UnitVolumes {
            lecture: entry.volumes.cours,
            tutorial: entry.volumes.td,
            lab: entry.volumes.tp,
        },
        track: entry.track,
        name,
    };
    subject.validate()?;
    Ok(subject)
}

fn build_teacher(entry: TeacherEntry, week: &WeekGrid) -> Result<Teacher> {
    let mut wishes = entry.wishes;
    if let Some(unknown) = wishes.iter().find(|w| !week.contains(w)) {
        bail!(
            "teacher '{}': wish {} is not a slot of the configured week",
            entry.name,
            unknown
        );
    }
    if wishes.len() > MAX_WISHES {
        warn!(
            teacher = %entry.name,
            count = wishes.len(),
            "more than {MAX_WISHES} wishes, keeping the first {MAX_WISHES}"
        );
        wishes.truncate(MAX_WISHES);
    }

    if entry.forfait < Decimal::ZERO {
        bail!("teacher '{}': forfait is negative ({})", entry.name, entry.forfait);
    }

    Ok(Teacher {
        name: entry.name,
        wishes,
        forfait: entry.forfait,
        supplementary: entry.supplementary,
        forfait_only: entry.forfait_only,
    })
}

fn ensure_unique<'a>(what: &str, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            bail!("duplicate {what} name '{name}'");
        }
    }
    Ok(())
}

// ── CatalogManager ────────────────────────────────────────────────────────────

/// Loads and holds the timetable catalog from a YAML file.
#[derive(Debug, Default)]
pub struct CatalogManager {
    catalog: Catalog,

    /// Already-placed sessions, ids assigned in file order.
    sessions: Vec<Session>,

    policy: SchedulingPolicy,

    denominator: MeanDenominator,

    /// Set to `true` after a successful load.
    loaded: bool,
}

impl CatalogManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `path` and replaces any previously loaded catalog.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is structurally
    /// invalid, or a validation rule fails (negative counts, duplicate names,
    /// wishes outside the week, …).
    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        info!("Loading timetable catalog from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open catalog file: {}", path.display()))?;

        self.load_from_str(&content)
            .with_context(|| format!("Invalid catalog file: {}", path.display()))
    }

    /// Same as [`load_from_file`](Self::load_from_file) for an in-memory
    /// document.
    pub fn load_from_str(&mut self, content: &str) -> Result<()> {
        // Reset state before (re-)loading
        *self = Self::default();

        let file: CatalogFile =
            serde_yaml::from_str(content).context("Failed to parse catalog YAML")?;

        let week = match file.week {
            Some(entry) => build_week(entry)?,
            None => {
                warn!("No week section in catalog, using default Monday–Saturday grid");
                WeekGrid::default_week()
            }
        };

        ensure_unique("subject", file.subjects.iter().map(|s| s.name.as_str()))?;
        ensure_unique("teacher", file.teachers.iter().map(|t| t.name.as_str()))?;
        ensure_unique("room", file.rooms.iter().map(|r| r.name.as_str()))?;

        let subjects = file
            .subjects
            .into_iter()
            .map(build_subject)
            .collect::<Result<Vec<_>>>()?;
        let teachers = file
            .teachers
            .into_iter()
            .map(|t| build_teacher(t, &week))
            .collect::<Result<Vec<_>>>()?;
        let rooms: Vec<Room> = file
            .rooms
            .into_iter()
            .map(|r| Room::new(r.name, r.kind))
            .collect();

        let catalog = Catalog {
            week,
            subjects,
            teachers,
            rooms,
        };

        let sessions: Vec<Session> = file
            .sessions
            .into_iter()
            .enumerate()
            .map(|(i, e)| {
                let session = Session {
                    id: SessionId(i as u64),
                    subject: e.subject,
                    kind: e.kind,
                    group: e.group,
                    slot: TimeSlot::new(e.day, e.period),
                    teachers: e.teachers,
                    room: e.room,
                };
                Self::check_session(&catalog, &session);
                session
            })
            .collect();

        for s in &catalog.subjects {
            debug!(
                "  Subject: {} | track: {} | sections: {} | td/tp per section: {}/{}",
                s.name, s.track, s.sections_cours, s.td_groups, s.tp_groups
            );
        }

        info!(
            days = catalog.week.days().len(),
            periods = catalog.week.periods().len(),
            subjects = catalog.subjects.len(),
            teachers = catalog.teachers.len(),
            rooms = catalog.rooms.len(),
            sessions = sessions.len(),
            "Successfully loaded timetable catalog"
        );

        self.catalog = catalog;
        self.sessions = sessions;
        self.policy = file.policy;
        self.denominator = file.balancing.denominator;
        self.loaded = true;
        Ok(())
    }

    /// Existing sessions may reference things the catalog no longer has
    /// (manual edits, renamed rooms).  They are kept, but flagged.
    fn check_session(catalog: &Catalog, session: &Session) {
        if catalog.subject(&session.subject).is_none() {
            warn!(id = %session.id, subject = %session.subject, "existing session references unknown subject");
        }
        if !catalog.week.contains(&session.slot) {
            warn!(id = %session.id, slot = %session.slot, "existing session is outside the configured week");
        }
        for t in &session.teachers {
            if catalog.teacher(t).is_none() {
                warn!(id = %session.id, teacher = %t, "existing session references unknown teacher");
            }
        }
        if let Some(room) = &session.room {
            match catalog.room(room) {
                None => warn!(id = %session.id, room = %room, "existing session references unknown room"),
                Some(r) if !r.kind.accepts(session.kind) => warn!(
                    id = %session.id,
                    room = %room,
                    kind = %session.kind,
                    "existing session is in a room of the wrong kind"
                ),
                Some(_) => {}
            }
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Grid state seeded with the loaded sessions.
    pub fn build_grid(&self) -> GridState {
        GridState::from_sessions(self.sessions.iter().cloned())
    }

    pub fn policy(&self) -> SchedulingPolicy {
        self.policy
    }

    pub fn denominator(&self) -> MeanDenominator {
        self.denominator
    }

    /// Consume the manager, keeping only the catalog.
    pub fn into_catalog(self) -> Catalog {
        self.catalog
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    const FULL: &str = r#"
week:
  days: [mardi, monday]
  periods:
    - { label: P2, start: "10:15", end: "11:45" }
    - { label: P1, start: "08:30", end: "10:00" }
subjects:
  - name: Algorithms
    track: "L2 Info"
    sections_cours: 1
    td_groups: 2
    tp_groups: 1
    volumes: { cours: 2, td: 1.5, tp: 1.5 }
    nb_enseignants_tp: 2
teachers:
  - name: Alice
    wishes:
      - { day: monday, period: P1 }
      - { day: tuesday, period: P2 }
    forfait: 0
  - name: Bob
    forfait: 4.5
    supplementary: [1.5, -0.5]
    forfait_only: true
rooms:
  - { name: Amphi A, kind: lecture_hall }
  - { name: TD 1, kind: salle_td }
sessions:
  - subject: Algorithms
    kind: lecture
    group: { track: "L2 Info", section: A }
    day: monday
    period: P1
    teachers: [Alice]
    room: Amphi A
policy:
  respect_wishes: false
balancing:
  denominator: exclude_forfait_only
"#;

    // ── load_from_file ────────────────────────────────────────────────────────

    #[test]
    fn load_full_catalog() {
        let f = yaml_tempfile(FULL);
        let mut mgr = CatalogManager::new();
        mgr.load_from_file(f.path()).unwrap();

        assert!(mgr.is_loaded());
        let cat = mgr.catalog();
        assert_eq!(cat.week.days(), &[Day::Monday, Day::Tuesday]);
        assert_eq!(cat.week.periods()[0].label, "P1");

        let algo = cat.subject("Algorithms").unwrap();
        assert_eq!(algo.track, "L2 Info");
        assert_eq!((algo.sections_cours, algo.td_groups, algo.tp_groups), (1, 2, 1));
        assert_eq!(algo.volumes.tutorial, Decimal::new(15, 1));
        assert_eq!(algo.nb_enseignants_tp, 2);

        let bob = cat.teacher("Bob").unwrap();
        assert_eq!(bob.forfait, Decimal::new(45, 1));
        assert_eq!(bob.supplementary_total(), Decimal::from(1));
        assert!(bob.forfait_only);
        assert_eq!(cat.teacher("Alice").unwrap().wishes.len(), 2);

        assert_eq!(cat.room("TD 1").unwrap().kind, RoomKind::TutorialRoom);

        assert_eq!(mgr.sessions().len(), 1);
        let grid = mgr.build_grid();
        assert!(grid.is_teacher_busy(&TimeSlot::new(Day::Monday, "P1"), "Alice"));

        assert!(!mgr.policy().respect_wishes);
        assert!(mgr.policy().assign_teachers, "unset policy flags default to true");
        assert_eq!(mgr.denominator(), MeanDenominator::ExcludeForfaitOnly);
    }

    #[test]
    fn missing_week_falls_back_to_default() {
        let f = yaml_tempfile("subjects: []\n");
        let mut mgr = CatalogManager::new();
        mgr.load_from_file(f.path()).unwrap();
        assert_eq!(mgr.catalog().week, WeekGrid::default_week());
        assert_eq!(mgr.policy(), SchedulingPolicy::default());
        assert_eq!(mgr.denominator(), MeanDenominator::AllTeachers);
    }

    #[test]
    fn missing_file_returns_error() {
        let mut mgr = CatalogManager::new();
        let result = mgr.load_from_file(Path::new("/nonexistent/path/catalog.yaml"));
        assert!(result.is_err());
        assert!(!mgr.is_loaded());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        let mut mgr = CatalogManager::new();
        assert!(mgr.load_from_file(f.path()).is_err());
        assert!(!mgr.is_loaded());
    }

    #[test]
    fn bundled_demo_catalog_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos/catalog.yaml");
        let mut mgr = CatalogManager::new();
        mgr.load_from_file(&path).unwrap();
        assert_eq!(mgr.catalog().subjects.len(), 3);
        assert_eq!(
            mgr.catalog().teacher("Chloé").unwrap().wishes[0],
            TimeSlot::new(Day::Monday, "P2")
        );
        assert_eq!(mgr.build_grid().len(), 1);
        assert!(mgr.build_grid().conflicts().is_empty());
    }

    // ── Validation ────────────────────────────────────────────────────────────

    #[test]
    fn negative_group_count_is_invalid_subject_configuration() {
        let yaml = "subjects:\n  - { name: Algo, sections_cours: 1, td_groups: -2 }\n";
        let mut mgr = CatalogManager::new();
        let err = mgr.load_from_str(yaml).unwrap_err();
        let inner = err.downcast_ref::<AllocationError>().unwrap();
        assert!(matches!(
            inner,
            AllocationError::InvalidSubjectConfiguration { subject, reason }
                if subject == "Algo" && reason.contains("td_groups")
        ));
        assert!(!mgr.is_loaded());
    }

    #[test]
    fn negative_volume_is_rejected() {
        let yaml = "subjects:\n  - { name: Algo, sections_cours: 1, volumes: { cours: -1 } }\n";
        assert!(CatalogManager::new().load_from_str(yaml).is_err());
    }

    #[test]
    fn overflowing_group_counts_are_rejected() {
        let yaml = "subjects:\n  - { name: Algo, sections_cours: 2, td_groups: 4294967295 }\n";
        let err = CatalogManager::new().load_from_str(yaml).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AllocationError>(),
            Some(AllocationError::InvalidSubjectConfiguration { subject, .. }) if subject == "Algo"
        ));
    }

    #[test]
    fn volumes_are_read_as_exact_decimals() {
        let yaml = r#"
subjects:
  - name: Algo
    sections_cours: 1
    volumes: { cours: 0.1, td: "0.2", tp: 3 }
teachers:
  - { name: Alice, forfait: 1.1, supplementary: [0.1, 0.2] }
"#;
        let mut mgr = CatalogManager::new();
        mgr.load_from_str(yaml).unwrap();
        let algo = mgr.catalog().subject("Algo").unwrap();
        assert_eq!(algo.volumes.lecture, Decimal::new(1, 1));
        assert_eq!(algo.volumes.tutorial, Decimal::new(2, 1));
        assert_eq!(algo.volumes.lab, Decimal::from(3));
        let alice = mgr.catalog().teacher("Alice").unwrap();
        assert_eq!(alice.forfait, Decimal::new(11, 1));
        assert_eq!(alice.supplementary_total(), Decimal::new(3, 1));
    }

    #[test]
    fn zero_lab_staffing_is_rejected() {
        let yaml = "subjects:\n  - { name: Algo, sections_cours: 1, nb_enseignants_tp: 0 }\n";
        assert!(CatalogManager::new().load_from_str(yaml).is_err());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let yaml = "teachers:\n  - { name: Alice }\n  - { name: Alice }\n";
        let err = CatalogManager::new().load_from_str(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate teacher"), "{err}");
    }

    #[test]
    fn wish_outside_week_is_rejected() {
        let yaml = r#"
week:
  days: [monday]
  periods: [{ label: P1, start: "08:00", end: "10:00" }]
teachers:
  - { name: Alice, wishes: [{ day: friday, period: P1 }] }
"#;
        assert!(CatalogManager::new().load_from_str(yaml).is_err());
    }

    #[test]
    fn extra_wishes_are_truncated() {
        let yaml = r#"
week:
  days: [monday]
  periods:
    - { label: P1, start: "08:00", end: "09:00" }
    - { label: P2, start: "09:00", end: "10:00" }
    - { label: P3, start: "10:00", end: "11:00" }
    - { label: P4, start: "11:00", end: "12:00" }
teachers:
  - name: Alice
    wishes:
      - { day: monday, period: P4 }
      - { day: monday, period: P3 }
      - { day: monday, period: P2 }
      - { day: monday, period: P1 }
"#;
        let mut mgr = CatalogManager::new();
        mgr.load_from_str(yaml).unwrap();
        let alice = mgr.catalog().teacher("Alice").unwrap();
        assert_eq!(alice.wishes.len(), MAX_WISHES);
        assert_eq!(alice.wishes[0], TimeSlot::new(Day::Monday, "P4"));
    }

    #[test]
    fn bad_period_time_is_rejected() {
        let yaml = "week:\n  days: [monday]\n  periods: [{ label: P1, start: \"8h\", end: \"10:00\" }]\n";
        assert!(CatalogManager::new().load_from_str(yaml).is_err());
    }

    #[test]
    fn duplicate_period_label_is_rejected() {
        let yaml = r#"
week:
  days: [monday]
  periods:
    - { label: P1, start: "08:00", end: "09:00" }
    - { label: P1, start: "09:00", end: "10:00" }
"#;
        assert!(CatalogManager::new().load_from_str(yaml).is_err());
    }

    // ── Reload ────────────────────────────────────────────────────────────────

    #[test]
    fn reload_replaces_previous_catalog() {
        let f1 = yaml_tempfile("rooms:\n  - { name: R1, kind: lab }\n");
        let f2 = yaml_tempfile("rooms:\n  - { name: R2, kind: amphi }\n");

        let mut mgr = CatalogManager::new();
        mgr.load_from_file(f1.path()).unwrap();
        assert!(mgr.catalog().room("R1").is_some());

        mgr.load_from_file(f2.path()).unwrap();
        assert!(mgr.catalog().room("R1").is_none(), "old room must be gone");
        assert_eq!(mgr.catalog().room("R2").unwrap().kind, RoomKind::LectureHall);
    }

    #[test]
    fn failed_reload_leaves_manager_unloaded() {
        let mut mgr = CatalogManager::new();
        mgr.load_from_str(FULL).unwrap();
        assert!(mgr.load_from_str("subjects: 3").is_err());
        assert!(!mgr.is_loaded());
        assert!(mgr.catalog().subjects.is_empty());
    }
}
