use std::collections::{BTreeMap, BTreeSet};

use super::snapshot::{DeferredAcceptanceStep, StepSnapshot};
use super::{empty_sets, ensure_capacity, Mechanism, MechanismError, MechanismKind};
use crate::admission::{AdmissionData, StudentId};
use crate::allocation::{Allocation, SchoolSets};

/// Student-proposing deferred acceptance (Gale-Shapley), the student-optimal stable mechanism.
///
/// 1. Every student not currently held applies to the next school on their list.
/// 2. Each school pools its held students with the new applicants and conditionally keeps
///    the best ones by exam order, up to capacity; it may drop students it held before.
/// 3. Rejected students move on to their next choice. Repeat until every student is held
///    or has exhausted their list; conditional acceptances then become final.
pub struct DeferredAcceptance<'a> {
    data: &'a AdmissionData,
    accepted: SchoolSets,
    positions: BTreeMap<StudentId, usize>,
    round: usize,
}

impl<'a> DeferredAcceptance<'a> {
    pub fn new(data: &'a AdmissionData) -> Self {
        Self {
            data,
            accepted: empty_sets(data),
            positions: data.students().map(|student| (student.clone(), 0)).collect(),
            round: 0,
        }
    }

    fn held(&self) -> BTreeSet<&StudentId> {
        self.accepted.values().flatten().collect()
    }

    fn position(&self, student: &StudentId) -> usize {
        self.positions.get(student).copied().unwrap_or(0)
    }
}

impl Mechanism for DeferredAcceptance<'_> {
    fn kind(&self) -> MechanismKind {
        MechanismKind::DeferredAcceptance
    }

    fn data(&self) -> &AdmissionData {
        self.data
    }

    fn is_done(&self) -> bool {
        let held = self.held();
        self.data.students().all(|student| {
            held.contains(student) || self.position(student) >= self.data.preferences(student).len()
        })
    }

    fn step(&mut self) -> Result<StepSnapshot, MechanismError> {
        if self.is_done() {
            return Err(MechanismError::AlreadyDone {
                mechanism: self.kind(),
            });
        }
        let data = self.data;
        self.round += 1;

        let mut to_compare = self.accepted.clone();
        let held: BTreeSet<StudentId> = self.held().into_iter().cloned().collect();
        for (student, preferences) in data.applications() {
            if held.contains(student) {
                continue;
            }
            if let Some(school) = preferences.get(self.position(student)) {
                to_compare
                    .entry(school.clone())
                    .or_default()
                    .insert(student.clone());
            }
        }
        let positions = self.positions.clone();

        for (school, ranking) in data.exams() {
            let capacity = data.capacity(school);
            let Some(pool) = to_compare.get(school) else {
                continue;
            };
            let candidates: Vec<&StudentId> = ranking
                .iter()
                .filter(|student| pool.contains(*student))
                .collect();

            let kept = candidates.iter().take(capacity).map(|student| (*student).clone());
            self.accepted.insert(school.clone(), kept.collect());

            for student in candidates.iter().skip(capacity) {
                if let Some(position) = self.positions.get_mut(*student) {
                    *position += 1;
                }
            }
        }
        ensure_capacity(data, &self.accepted)?;

        Ok(StepSnapshot::DeferredAcceptance(DeferredAcceptanceStep {
            round: self.round,
            positions,
            to_compare,
            accepted: self.accepted.clone(),
        }))
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
    use crate::admission::SchoolId;

    fn competing_for_one_seat() -> AdmissionData {
        AdmissionData::builder()
            .student(1, "AB".chars())
            .student(2, "AB".chars())
            .student(3, "A".chars())
            .school('A', 1, [3, 2, 1])
            .school('B', 1, [1, 2])
            .build()
            .expect("consistent data")
    }

    #[test]
    fn first_round_pools_first_choices() {
        let data = competing_for_one_seat();
        let mut mechanism = DeferredAcceptance::new(&data);

        let snapshot = mechanism.step().expect("first round runs");
        let StepSnapshot::DeferredAcceptance(step) = snapshot else {
            panic!("expected a deferred acceptance snapshot");
        };

        assert_eq!(step.round, 1);
        assert!(step.positions.values().all(|position| *position == 0));
        assert_eq!(step.to_compare[&SchoolId::from('A')].len(), 3);
        assert_eq!(
            step.accepted[&SchoolId::from('A')],
            BTreeSet::from([StudentId::from(3)])
        );
        assert_eq!(mechanism.position(&StudentId::from(1)), 1);
        assert_eq!(mechanism.position(&StudentId::from(3)), 0);
    }

    #[test]
    fn rejected_students_move_down_their_lists() {
        let data = competing_for_one_seat();
        let allocation = DeferredAcceptance::new(&data)
            .evaluate()
            .expect("evaluation succeeds");

        assert_eq!(
            allocation.accepted[&SchoolId::from('A')],
            BTreeSet::from([StudentId::from(3)])
        );
        assert_eq!(
            allocation.accepted[&SchoolId::from('B')],
            BTreeSet::from([StudentId::from(1)])
        );
        assert_eq!(allocation.rejected, BTreeSet::from([StudentId::from(2)]));
    }

    #[test]
    fn held_student_is_displaced_by_a_better_candidate() {
        let data = AdmissionData::builder()
            .student(1, "B".chars())
            .student(2, "AB".chars())
            .student(3, "A".chars())
            .school('A', 1, [3, 2])
            .school('B', 1, [2, 1])
            .build()
            .expect("consistent data");
        let mut mechanism = DeferredAcceptance::new(&data);

        mechanism.step().expect("round one");
        assert!(mechanism.accepted[&SchoolId::from('B')].contains(&StudentId::from(1)));

        mechanism.step().expect("round two");
        assert_eq!(
            mechanism.accepted[&SchoolId::from('B')],
            BTreeSet::from([StudentId::from(2)])
        );
        assert!(mechanism.is_done());
        let allocation = mechanism.allocate().expect("done");
        assert_eq!(allocation.rejected, BTreeSet::from([StudentId::from(1)]));
    }

    #[test]
    fn zero_capacity_and_empty_lists_end_rejected() {
        let data = AdmissionData::builder()
            .student(1, "A".chars())
            .student(2, Vec::<char>::new())
            .school('A', 0, [1])
            .build()
            .expect("consistent data");

        let allocation = DeferredAcceptance::new(&data)
            .evaluate()
            .expect("evaluation succeeds");

        assert!(allocation.accepted[&SchoolId::from('A')].is_empty());
        assert_eq!(
            allocation.rejected,
            BTreeSet::from([StudentId::from(1), StudentId::from(2)])
        );
    }

    #[test]
    fn protocol_misuse_is_reported() {
        let data = competing_for_one_seat();
        let mut mechanism = DeferredAcceptance::new(&data);

        assert_eq!(
            mechanism.allocate(),
            Err(MechanismError::NotDone {
                mechanism: MechanismKind::DeferredAcceptance
            })
        );
        while !mechanism.is_done() {
            mechanism.step().expect("round runs");
        }
        assert_eq!(
            mechanism.step(),
            Err(MechanismError::AlreadyDone {
                mechanism: MechanismKind::DeferredAcceptance
            })
        );
        let first = mechanism.allocate().expect("done");
        let second = mechanism.allocate().expect("still done");
        assert_eq!(first, second);
    }
}
