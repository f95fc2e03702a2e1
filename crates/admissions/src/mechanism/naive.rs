use std::collections::{BTreeMap, BTreeSet};

use super::snapshot::{NaiveStep, StepSnapshot};
use super::{empty_sets, ensure_capacity, Mechanism, MechanismError, MechanismKind};
use crate::admission::{AdmissionData, SchoolId, StudentId};
use crate::allocation::{Allocation, SchoolSets};

/// Single-offer mechanism following the literal statutory wording.
///
/// 1. Every school offers admission to all remaining applicants above its cutoff.
/// 2. Each student enrols at the best school among this round's offers; the enrolment is
///    final.
/// 3. Everyone who received an offer leaves every pool, seats are recounted, and the round
///    repeats with the students not yet enrolled.
///
/// Not stable: a student who enrols early at a lower choice is never reconsidered by a
/// better school that later admits a weaker applicant.
pub struct Naive<'a> {
    data: &'a AdmissionData,
    remaining_seats: BTreeMap<SchoolId, usize>,
    remaining_applicants: BTreeMap<SchoolId, Vec<StudentId>>,
    accepted: SchoolSets,
    round: usize,
}

impl<'a> Naive<'a> {
    pub fn new(data: &'a AdmissionData) -> Self {
        Self {
            data,
            remaining_seats: data.seats().clone(),
            remaining_applicants: data.exams().clone(),
            accepted: empty_sets(data),
            round: 0,
        }
    }

    fn seats_left(&self, school: &SchoolId) -> usize {
        self.remaining_seats.get(school).copied().unwrap_or(0)
    }
}

impl Mechanism for Naive<'_> {
    fn kind(&self) -> MechanismKind {
        MechanismKind::Naive
    }

    fn data(&self) -> &AdmissionData {
        self.data
    }

    fn is_done(&self) -> bool {
        self.remaining_applicants
            .iter()
            .all(|(school, applicants)| applicants.is_empty() || self.seats_left(school) == 0)
    }

    fn step(&mut self) -> Result<StepSnapshot, MechanismError> {
        if self.is_done() {
            return Err(MechanismError::AlreadyDone {
                mechanism: self.kind(),
            });
        }
        let data = self.data;
        self.round += 1;

        let mut offers: BTreeMap<StudentId, BTreeSet<SchoolId>> = BTreeMap::new();
        for (school, applicants) in &self.remaining_applicants {
            for student in applicants.iter().take(self.seats_left(school)) {
                offers
                    .entry(student.clone())
                    .or_default()
                    .insert(school.clone());
            }
        }

        for (student, offering) in &offers {
            let enrolled = data
                .preferences(student)
                .iter()
                .find(|school| offering.contains(*school));
            if let Some(school) = enrolled {
                self.accepted
                    .entry(school.clone())
                    .or_default()
                    .insert(student.clone());
            }
        }

        for applicants in self.remaining_applicants.values_mut() {
            applicants.retain(|student| !offers.contains_key(student));
        }
        ensure_capacity(data, &self.accepted)?;

        self.remaining_seats = data
            .schools()
            .map(|school| {
                let enrolled = self.accepted.get(school).map(BTreeSet::len).unwrap_or(0);
                (school.clone(), data.capacity(school).saturating_sub(enrolled))
            })
            .collect();

        Ok(StepSnapshot::Naive(NaiveStep {
            round: self.round,
            offers,
            accepted: self.accepted.clone(),
            remaining_seats: self.remaining_seats.clone(),
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

    fn cyclic_conflict() -> AdmissionData {
        AdmissionData::builder()
            .student(1, "ABC".chars())
            .student(2, "ABD".chars())
            .student(3, "ACD".chars())
            .student(4, "BCD".chars())
            .school('A', 1, [1, 2, 3])
            .school('B', 1, [1, 2, 4])
            .school('C', 1, [1, 3, 4])
            .school('D', 1, [2, 3, 4])
            .build()
            .expect("consistent data")
    }

    #[test]
    fn offered_students_leave_every_pool() {
        let data = cyclic_conflict();
        let mut mechanism = Naive::new(&data);

        let StepSnapshot::Naive(step) = mechanism.step().expect("round one") else {
            panic!("expected a naive snapshot");
        };

        assert_eq!(
            step.offers[&StudentId::from(1)],
            BTreeSet::from([SchoolId::from('A'), SchoolId::from('B'), SchoolId::from('C')])
        );
        assert_eq!(
            step.offers[&StudentId::from(2)],
            BTreeSet::from([SchoolId::from('D')])
        );
        assert_eq!(step.remaining_seats[&SchoolId::from('A')], 0);
        assert_eq!(step.remaining_seats[&SchoolId::from('B')], 1);
        assert!(mechanism
            .remaining_applicants
            .values()
            .all(|applicants| !applicants.contains(&StudentId::from(2))));
    }

    #[test]
    fn early_enrolment_is_final() {
        let data = cyclic_conflict();
        let allocation = Naive::new(&data).evaluate().expect("evaluation succeeds");

        assert_eq!(
            allocation.school_of(&StudentId::from(2)),
            Some(&SchoolId::from('D'))
        );
        assert_eq!(
            allocation.school_of(&StudentId::from(4)),
            Some(&SchoolId::from('B'))
        );
        assert!(allocation.rejected.is_empty());
    }

    #[test]
    fn stops_when_no_seats_remain() {
        let data = AdmissionData::builder()
            .student(1, "A".chars())
            .student(2, "A".chars())
            .school('A', 1, [2, 1])
            .build()
            .expect("consistent data");
        let mut mechanism = Naive::new(&data);

        mechanism.step().expect("round one");
        assert!(mechanism.is_done());
        assert_eq!(
            mechanism.remaining_applicants[&SchoolId::from('A')],
            vec![StudentId::from(1)]
        );
        let allocation = mechanism.allocate().expect("done");
        assert_eq!(allocation.rejected, BTreeSet::from([StudentId::from(1)]));
    }
}
