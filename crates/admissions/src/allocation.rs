use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::admission::{AdmissionData, SchoolId, StudentId};

/// Students held per school while a mechanism runs, and accepted per school once it is done.
pub type SchoolSets = BTreeMap<SchoolId, BTreeSet<StudentId>>;

/// Final outcome of a mechanism run.
///
/// Every school of the input appears in `accepted`, possibly with an empty set. `rejected`
/// holds the students admitted nowhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub accepted: SchoolSets,
    pub rejected: BTreeSet<StudentId>,
}

impl Allocation {
    pub fn new(accepted: SchoolSets, rejected: BTreeSet<StudentId>) -> Self {
        Self { accepted, rejected }
    }

    /// Projects held sets into a final allocation over the universes of `data`.
    pub(crate) fn from_held(data: &AdmissionData, held: &SchoolSets) -> Self {
        let accepted: SchoolSets = data
            .schools()
            .map(|school| {
                let students = held.get(school).cloned().unwrap_or_default();
                (school.clone(), students)
            })
            .collect();

        let admitted: BTreeSet<&StudentId> = accepted.values().flatten().collect();
        let rejected = data
            .students()
            .filter(|student| !admitted.contains(student))
            .cloned()
            .collect();

        Self { accepted, rejected }
    }

    /// School admitting `student`, if any.
    pub fn school_of(&self, student: &StudentId) -> Option<&SchoolId> {
        self.accepted
            .iter()
            .find(|(_, students)| students.contains(student))
            .map(|(school, _)| school)
    }

    pub fn accepted_at(&self, school: &SchoolId) -> Option<&BTreeSet<StudentId>> {
        self.accepted.get(school)
    }

    pub fn num_accepted(&self) -> usize {
        self.accepted.values().map(BTreeSet::len).sum()
    }

    /// Student to school mapping for every admitted student.
    pub fn assignments(&self) -> BTreeMap<&StudentId, &SchoolId> {
        self.accepted
            .iter()
            .flat_map(|(school, students)| students.iter().map(move |student| (student, school)))
            .collect()
    }
}
