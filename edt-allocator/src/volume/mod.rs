//! Teaching-volume model.
//!
//! All values are hour-equivalents held as [`Decimal`], so sums over many
//! small allocations never accumulate floating-point drift.  Nothing here
//! mutates state; the scheduler calls these functions to rank teachers and to
//! report the balancing target.
//!
//! | Quantity | Definition |
//! |---|---|
//! | session volume | unit volume of the type, × `nb_enseignants_tp` for labs |
//! | VHT | Σ session volume over every session a subject requires |
//! | teacher volume | Σ session volume over sessions taught + forfait + supplementary |
//! | VHM | Σ VHT over all subjects ÷ teachers carrying load |

pub mod stats;

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{Catalog, Session, SessionType, Subject, Teacher};

// ── Denominator policy ────────────────────────────────────────────────────────

/// Which teachers count towards the VHM denominator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeanDenominator {
    /// Every registered teacher.
    #[default]
    AllTeachers,
    /// Registered teachers minus those flagged `forfait_only`.
    ExcludeForfaitOnly,
}

// ── Per-session volumes ───────────────────────────────────────────────────────

/// Volume of one session of `kind` of `subject`.
///
/// A lab bills `nb_enseignants_tp` teacher-shares, and every teacher of the
/// lab is credited the full amount.
pub fn session_volume(subject: &Subject, kind: SessionType) -> Decimal {
    let unit = subject.volumes.get(kind);
    match kind {
        SessionType::Lab => unit * Decimal::from(subject.nb_enseignants_tp),
        _ => unit,
    }
}

/// Theoretical volume of every session `subject` requires (VHT).
pub fn subject_theoretical_volume(subject: &Subject) -> Decimal {
    let sections = Decimal::from(subject.sections_cours);
    sections
        * (session_volume(subject, SessionType::Lecture)
            + Decimal::from(subject.td_groups) * session_volume(subject, SessionType::Tutorial)
            + Decimal::from(subject.tp_groups) * session_volume(subject, SessionType::Lab))
}

// ── Per-teacher volumes ───────────────────────────────────────────────────────

/// Current total volume of `teacher` given the sessions placed so far.
pub fn teacher_volume<'a>(
    teacher: &Teacher,
    sessions: impl IntoIterator<Item = &'a Session>,
    catalog: &Catalog,
) -> Decimal {
    taught_volume(&teacher.name, sessions, catalog) + teacher.fixed_volume()
}

/// Session-derived part of a teacher's volume.
fn taught_volume<'a>(
    teacher: &str,
    sessions: impl IntoIterator<Item = &'a Session>,
    catalog: &Catalog,
) -> Decimal {
    sessions
        .into_iter()
        .filter(|s| s.has_teacher(teacher))
        .filter_map(|s| match catalog.subject(&s.subject) {
            Some(subject) => Some(session_volume(subject, s.kind)),
            None => {
                warn!(session = %s.id, subject = %s.subject, "session references unknown subject, counted as zero volume");
                None
            }
        })
        .sum()
}

/// Current total volume of every catalog teacher, in one pass over
/// `sessions`.
pub fn teacher_volumes<'a>(
    catalog: &Catalog,
    sessions: impl IntoIterator<Item = &'a Session>,
) -> BTreeMap<String, Decimal> {
    let subjects: HashMap<&str, &Subject> = catalog
        .subjects
        .iter()
        .map(|s| (s.name.as_str(), s))
        .collect();

    let mut volumes: BTreeMap<String, Decimal> = catalog
        .teachers
        .iter()
        .map(|t| (t.name.clone(), t.fixed_volume()))
        .collect();

    for session in sessions {
        let Some(subject) = subjects.get(session.subject.as_str()) else {
            warn!(session = %session.id, subject = %session.subject, "session references unknown subject, counted as zero volume");
            continue;
        };
        let volume = session_volume(subject, session.kind);
        for name in &session.teachers {
            if let Some(v) = volumes.get_mut(name) {
                *v += volume;
            }
        }
    }
    volumes
}

// ── Global mean (VHM) ─────────────────────────────────────────────────────────

/// Number of teachers expected to carry load under `denominator`.
pub fn expected_teacher_count(teachers: &[Teacher], denominator: MeanDenominator) -> usize {
    match denominator {
        MeanDenominator::AllTeachers => teachers.len(),
        MeanDenominator::ExcludeForfaitOnly => teachers.iter().filter(|t| !t.forfait_only).count(),
    }
}

/// VHM: total theoretical volume of all `subjects` divided by `teacher_count`.
///
/// Returns `None` when `teacher_count` is zero.
pub fn global_mean_volume(subjects: &[Subject], teacher_count: usize) -> Option<Decimal> {
    if teacher_count == 0 {
        return None;
    }
    let total: Decimal = subjects.iter().map(subject_theoretical_volume).sum();
    total.checked_div(Decimal::from(teacher_count))
}

// ── Load table ────────────────────────────────────────────────────────────────

/// One row of the per-teacher load report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeacherLoad {
    pub name: String,
    pub taught: Decimal,
    pub forfait: Decimal,
    pub supplementary: Decimal,
    pub total: Decimal,
    /// `total − VHM`; negative means under-loaded.  `None` without a VHM.
    pub deviation: Option<Decimal>,
}

/// Per-teacher volume breakdown in catalog order.
pub fn load_table<'a>(
    catalog: &Catalog,
    sessions: impl IntoIterator<Item = &'a Session>,
    denominator: MeanDenominator,
) -> Vec<TeacherLoad> {
    let sessions: Vec<&Session> = sessions.into_iter().collect();
    let mean = global_mean_volume(
        &catalog.subjects,
        expected_teacher_count(&catalog.teachers, denominator),
    );

    catalog
        .teachers
        .iter()
        .map(|t| {
            let taught = taught_volume(&t.name, sessions.iter().copied(), catalog);
            let total = taught + t.fixed_volume();
            TeacherLoad {
                name: t.name.clone(),
                taught,
                forfait: t.forfait,
                supplementary: t.supplementary_total(),
                total,
                deviation: mean.map(|m| total - m),
            }
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
