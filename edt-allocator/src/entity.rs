/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Entity generator: expands a [`Subject`] into the session requests it
//! requires.
//!
//! Output order is the allocation priority used by the scheduler:
//!
//! ```text
//! Lecture  Section A, Section B, …
//! Section A: Tutorial G1..Gtd, Lab G1..Gtp
//! Section B: Tutorial G1..Gtd, Lab G1..Gtp
//! ```

use serde::Serialize;

use crate::model::{SessionType, StudentGroup, Subject};

/// One session the subject needs, not yet placed on the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRequest {
    pub subject: String,
    pub kind: SessionType,
    pub group: StudentGroup,
}

/// Section letter for a 0-based section index: `A`..`Z`, then `AA`, `AB`, …
pub fn section_letter(index: u32) -> String {
    let mut n = index as u64 + 1;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Expand `subject` into its ordered session requests.
///
/// Emits `sections_cours × (1 + td_groups + tp_groups)` requests.  Callers
/// run [`Subject::validate`] first, which rejects counts whose total
/// overflows.
pub fn expand(subject: &Subject) -> Vec<SessionRequest> {
    let capacity = subject.expected_session_count().unwrap_or_default();
    let mut requests = Vec::with_capacity(capacity as usize);
    let sections: Vec<String> = (0..subject.sections_cours).map(section_letter).collect();

    let request = |kind, group| SessionRequest {
        subject: subject.name.clone(),
        kind,
        group,
    };

    for section in &sections {
        requests.push(request(
            SessionType::Lecture,
            StudentGroup::section(subject.track.clone(), section.clone()),
        ));
    }

    for section in &sections {
        for n in 1..=subject.td_groups {
            requests.push(request(
                SessionType::Tutorial,
                StudentGroup::group(subject.track.clone(), section.clone(), n),
            ));
        }
        for n in 1..=subject.tp_groups {
            requests.push(request(
                SessionType::Lab,
                StudentGroup::group(subject.track.clone(), section.clone(), n),
            ));
        }
    }

    requests
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UnitVolumes;

    fn subject(sections: u32, td: u32, tp: u32) -> Subject {
        Subject {
            name: "Algorithms".into(),
            track: String::new(),
            sections_cours: sections,
            td_groups: td,
            tp_groups: tp,
            volumes: UnitVolumes::default(),
            nb_enseignants_tp: 1,
        }
    }

    fn labels(requests: &[SessionRequest]) -> Vec<(SessionType, String)> {
        requests.iter().map(|r| (r.kind, r.group.label())).collect()
    }

    #[test]
    fn section_letters_continue_past_z() {
        assert_eq!(section_letter(0), "A");
        assert_eq!(section_letter(25), "Z");
        assert_eq!(section_letter(26), "AA");
        assert_eq!(section_letter(27), "AB");
        assert_eq!(section_letter(701), "ZZ");
        assert_eq!(section_letter(702), "AAA");
    }

    #[test]
    fn algorithms_scenario_yields_lecture_then_two_tutorials() {
        let requests = expand(&subject(1, 2, 0));
        assert_eq!(
            labels(&requests),
            vec![
                (SessionType::Lecture, "Section A".to_string()),
                (SessionType::Tutorial, "Section A – G1".to_string()),
                (SessionType::Tutorial, "Section A – G2".to_string()),
            ]
        );
        assert!(requests.iter().all(|r| r.subject == "Algorithms"));
    }

    #[test]
    fn lectures_first_then_per_section_tutorials_then_labs() {
        let requests = expand(&subject(2, 1, 2));
        assert_eq!(
            labels(&requests),
            vec![
                (SessionType::Lecture, "Section A".to_string()),
                (SessionType::Lecture, "Section B".to_string()),
                (SessionType::Tutorial, "Section A – G1".to_string()),
                (SessionType::Lab, "Section A – G1".to_string()),
                (SessionType::Lab, "Section A – G2".to_string()),
                (SessionType::Tutorial, "Section B – G1".to_string()),
                (SessionType::Lab, "Section B – G1".to_string()),
                (SessionType::Lab, "Section B – G2".to_string()),
            ]
        );
    }

    #[test]
    fn request_count_matches_formula() {
        for (s, td, tp) in [(0, 3, 3), (1, 0, 0), (3, 2, 4), (4, 0, 1)] {
            let subj = subject(s, td, tp);
            assert_eq!(expand(&subj).len() as u32, s + s * td + s * tp);
        }
    }

    #[test]
    fn groups_carry_the_subject_track() {
        let mut subj = subject(1, 1, 0);
        subj.track = "Track X".into();
        let requests = expand(&subj);
        assert_eq!(requests[1].group.qualified_label(), "Track X – Section A – G1");
    }
}
