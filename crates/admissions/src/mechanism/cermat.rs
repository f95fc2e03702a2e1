use std::collections::{BTreeMap, BTreeSet};

use super::snapshot::{CermatStep, StepSnapshot};
use super::{empty_sets, ensure_capacity, Mechanism, MechanismError, MechanismKind};
use crate::admission::{AdmissionData, SchoolId, StudentId};
use crate::allocation::{Allocation, SchoolSets};

/// Iterative best-rank resolution as proposed for the national admission round.
///
/// 1. From exam results and capacity each school determines who is entitled to admission
///    (the applicants above its cutoff).
/// 2. Among entitled students, pick those who listed the school first; if there are none
///    anywhere, those who listed it second, and so on.
/// 3. Those students are admitted and struck off every school they ranked lower, including
///    one that may have admitted them earlier.
/// 4. Striking students off frees seats and moves the cutoffs down. Repeat from 2.
///
/// Produces the same allocation as [`super::SchoolOptimal`].
pub struct Cermat<'a> {
    data: &'a AdmissionData,
    applicants: BTreeMap<SchoolId, Vec<StudentId>>,
    cutoffs: BTreeMap<SchoolId, usize>,
    accepted: SchoolSets,
    max_rank: usize,
    pending: Option<BestMatch>,
    round: usize,
}

/// Improving matches found at the smallest preference rank.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BestMatch {
    rank: usize,
    pairs: BTreeSet<(StudentId, SchoolId)>,
}

impl<'a> Cermat<'a> {
    pub fn new(data: &'a AdmissionData) -> Self {
        let mut mechanism = Self {
            data,
            applicants: data.exams().clone(),
            cutoffs: data.seats().clone(),
            accepted: empty_sets(data),
            max_rank: data.max_preferences(),
            pending: None,
            round: 0,
        };
        mechanism.pending = mechanism.find_best_match();
        mechanism
    }

    /// Every entitled, not yet accepted student whose `rank`-th choice is the school, taken
    /// at the smallest rank with any such student across all schools.
    fn find_best_match(&self) -> Option<BestMatch> {
        for rank in 0..self.max_rank {
            let mut pairs = BTreeSet::new();
            for (school, applicants) in &self.applicants {
                let cutoff = self.cutoffs.get(school).copied().unwrap_or(0);
                let accepted = self.accepted.get(school);
                for student in applicants.iter().take(cutoff) {
                    let already = accepted.map(|set| set.contains(student)).unwrap_or(false);
                    if !already && self.data.preferences(student).get(rank) == Some(school) {
                        pairs.insert((student.clone(), school.clone()));
                    }
                }
            }
            if !pairs.is_empty() {
                return Some(BestMatch { rank, pairs });
            }
        }
        None
    }
}

impl Mechanism for Cermat<'_> {
    fn kind(&self) -> MechanismKind {
        MechanismKind::Cermat
    }

    fn data(&self) -> &AdmissionData {
        self.data
    }

    fn is_done(&self) -> bool {
        self.pending.is_none()
    }

    fn step(&mut self) -> Result<StepSnapshot, MechanismError> {
        let Some(best) = self.pending.take() else {
            return Err(MechanismError::AlreadyDone {
                mechanism: self.kind(),
            });
        };
        let data = self.data;
        self.round += 1;

        // All matches at the best rank are applied together before searching again.
        for (student, school) in &best.pairs {
            self.accepted
                .entry(school.clone())
                .or_default()
                .insert(student.clone());
            for worse in data.preferences(student).iter().skip(best.rank + 1) {
                if let Some(applicants) = self.applicants.get_mut(worse) {
                    applicants.retain(|candidate| candidate != student);
                }
                if let Some(accepted) = self.accepted.get_mut(worse) {
                    accepted.remove(student);
                }
            }
        }
        ensure_capacity(data, &self.accepted)?;

        let snapshot = CermatStep {
            round: self.round,
            best_rank: best.rank,
            best_match: best.pairs,
            cutoffs: self.cutoffs.clone(),
            applicants: self.applicants.clone(),
            accepted: self.accepted.clone(),
        };
        self.pending = self.find_best_match();
        Ok(StepSnapshot::Cermat(snapshot))
    }

    fn allocate(&self) -> Result<Allocation, MechanismError> {
        if !self.is_done() {
            return Err(MechanismError::NotDone {
                mechanism: self.kind(),
            });
        }
        Ok(Allocation::from_held(self.data, &self.accepted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crossed_preferences() -> AdmissionData {
        AdmissionData::builder()
            .student(1, "ABC".chars())
            .student(2, "BAC".chars())
            .student(3, "ABC".chars())
            .school('A', 1, [2, 1, 3])
            .school('B', 1, [1, 2, 3])
            .school('C', 1, [1, 2, 3])
            .build()
            .expect("consistent data")
    }

    #[test]
    fn resolves_all_matches_at_the_best_rank_together() {
        let data = crossed_preferences();
        let mut mechanism = Cermat::new(&data);

        let StepSnapshot::Cermat(step) = mechanism.step().expect("round one") else {
            panic!("expected a cermat snapshot");
        };

        assert_eq!(step.best_rank, 1);
        assert_eq!(
            step.best_match,
            BTreeSet::from([
                (StudentId::from(1), SchoolId::from('B')),
                (StudentId::from(2), SchoolId::from('A')),
            ])
        );
        assert_eq!(step.applicants[&SchoolId::from('C')], vec![StudentId::from(3)]);
    }

    #[test]
    fn cutoff_moves_down_as_students_are_struck_off() {
        let data = crossed_preferences();
        let mut mechanism = Cermat::new(&data);
        mechanism.step().expect("round one");

        let StepSnapshot::Cermat(step) = mechanism.step().expect("round two") else {
            panic!("expected a cermat snapshot");
        };

        assert_eq!(step.best_rank, 2);
        assert_eq!(
            step.best_match,
            BTreeSet::from([(StudentId::from(3), SchoolId::from('C'))])
        );
        assert!(mechanism.is_done());
    }

    #[test]
    fn admission_at_a_better_school_revokes_a_worse_one() {
        let data = AdmissionData::builder()
            .student(1, "ABX".chars())
            .student(3, "YXA".chars())
            .school('A', 1, [3, 1])
            .school('B', 1, [1])
            .school('X', 1, [1, 3])
            .school('Y', 0, [3])
            .build()
            .expect("consistent data");
        let mut mechanism = Cermat::new(&data);

        mechanism.step().expect("round one");
        assert!(mechanism.accepted[&SchoolId::from('B')].contains(&StudentId::from(1)));
        assert_eq!(mechanism.applicants[&SchoolId::from('X')], vec![StudentId::from(3)]);

        mechanism.step().expect("round two");
        assert!(mechanism.accepted[&SchoolId::from('X')].contains(&StudentId::from(3)));
        assert_eq!(mechanism.applicants[&SchoolId::from('A')], vec![StudentId::from(1)]);

        mechanism.step().expect("round three");
        assert!(mechanism.accepted[&SchoolId::from('A')].contains(&StudentId::from(1)));
        assert!(mechanism.accepted[&SchoolId::from('B')].is_empty());
        assert!(mechanism.is_done());

        let allocation = mechanism.allocate().expect("done");
        assert!(allocation.rejected.is_empty());
        assert_eq!(allocation.school_of(&StudentId::from(3)), Some(&SchoolId::from('X')));
    }

    #[test]
    fn is_done_has_no_side_effects() {
        let data = crossed_preferences();
        let mechanism = Cermat::new(&data);
        let before = mechanism.pending.clone();
        assert!(!mechanism.is_done());
        assert!(!mechanism.is_done());
        assert_eq!(mechanism.pending, before);
    }
}
