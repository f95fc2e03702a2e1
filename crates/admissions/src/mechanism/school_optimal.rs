use std::collections::{BTreeMap, BTreeSet};

use super::snapshot::{SchoolOptimalStep, StepSnapshot};
use super::{empty_sets, ensure_capacity, Mechanism, MechanismError, MechanismKind};
use crate::admission::{AdmissionData, SchoolId, StudentId};
use crate::allocation::{Allocation, SchoolSets};

/// School-proposing stable mechanism, the dual of deferred acceptance.
///
/// Schools offer their free seats to the best applicants they have not approached yet. Each
/// student conditionally holds the most preferred school among everything currently on the
/// table and declines the rest, which frees those seats for the next round. The result is
/// the stable matching most preferred by schools and coincides with [`super::Cermat`].
pub struct SchoolOptimal<'a> {
    data: &'a AdmissionData,
    remaining_applicants: BTreeMap<SchoolId, Vec<StudentId>>,
    accepted: SchoolSets,
    holds: BTreeMap<StudentId, SchoolId>,
    round: usize,
}

impl<'a> SchoolOptimal<'a> {
    pub fn new(data: &'a AdmissionData) -> Self {
        Self {
            data,
            remaining_applicants: data.exams().clone(),
            accepted: empty_sets(data),
            holds: BTreeMap::new(),
            round: 0,
        }
    }

    fn free_seats(&self, school: &SchoolId) -> usize {
        let held = self.accepted.get(school).map(BTreeSet::len).unwrap_or(0);
        self.data.capacity(school).saturating_sub(held)
    }
}

impl Mechanism for SchoolOptimal<'_> {
    fn kind(&self) -> MechanismKind {
        MechanismKind::SchoolOptimal
    }

    fn data(&self) -> &AdmissionData {
        self.data
    }

    fn is_done(&self) -> bool {
        self.remaining_applicants
            .iter()
            .all(|(school, applicants)| applicants.is_empty() || self.free_seats(school) == 0)
    }

    fn step(&mut self) -> Result<StepSnapshot, MechanismError> {
        if self.is_done() {
            return Err(MechanismError::AlreadyDone {
                mechanism: self.kind(),
            });
        }
        let data = self.data;
        self.round += 1;

        let free: BTreeMap<SchoolId, usize> = data
            .schools()
            .map(|school| (school.clone(), self.free_seats(school)))
            .collect();

        let mut offers: BTreeMap<StudentId, BTreeSet<SchoolId>> = BTreeMap::new();
        for (school, applicants) in self.remaining_applicants.iter_mut() {
            let count = free
                .get(school)
                .copied()
                .unwrap_or(0)
                .min(applicants.len());
            for student in applicants.drain(..count) {
                offers.entry(student).or_default().insert(school.clone());
            }
        }

        for (student, offering) in &offers {
            let current = self.holds.get(student).cloned();
            let best = data
                .preferences(student)
                .iter()
                .find(|school| offering.contains(*school) || current.as_ref() == Some(*school))
                .cloned();
            let Some(best) = best else {
                continue;
            };
            if current.as_ref() == Some(&best) {
                continue;
            }
            if let Some(previous) = self.holds.insert(student.clone(), best.clone()) {
                if let Some(students) = self.accepted.get_mut(&previous) {
                    students.remove(student);
                }
            }
            self.accepted.entry(best).or_default().insert(student.clone());
        }
        ensure_capacity(data, &self.accepted)?;

        Ok(StepSnapshot::SchoolOptimal(SchoolOptimalStep {
            round: self.round,
            remaining_applicants: self.remaining_applicants.clone(),
            offers,
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
