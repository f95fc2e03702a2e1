//! Outcome analysis: justified envy, stability, student-side Pareto comparison, and a
//! side-by-side report of several mechanisms run on the same data.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::admission::{AdmissionData, SchoolId, StudentId};
use crate::allocation::Allocation;
use crate::mechanism::{MechanismError, MechanismKind};
use crate::observer::NoopObserver;

/// A student who prefers `school` to their own outcome and would be admitted there ahead of
/// `displaced`, or into a seat left empty when `displaced` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct EnvyPair {
    pub student: StudentId,
    pub school: SchoolId,
    pub displaced: Option<StudentId>,
}

/// Zero-based rank of the school admitting `student` on their own list.
pub fn preference_rank_of(
    data: &AdmissionData,
    allocation: &Allocation,
    student: &StudentId,
) -> Option<usize> {
    allocation
        .school_of(student)
        .and_then(|school| data.preference_rank(student, school))
}

pub fn preference_ranks(
    data: &AdmissionData,
    allocation: &Allocation,
) -> BTreeMap<StudentId, Option<usize>> {
    data.students()
        .map(|student| {
            (
                student.clone(),
                preference_rank_of(data, allocation, student),
            )
        })
        .collect()
}

/// All justified-envy pairs of `allocation`, at most one per student and school.
///
/// When the envied school is full, `displaced` names its weakest held student by exam order.
pub fn justified_envy(data: &AdmissionData, allocation: &Allocation) -> Vec<EnvyPair> {
    let mut pairs = Vec::new();
    for student in data.students() {
        let preferences = data.preferences(student);
        let own = preference_rank_of(data, allocation, student).unwrap_or(preferences.len());

        for school in &preferences[..own] {
            let Some(exam_rank) = data.exam_rank(school, student) else {
                continue;
            };
            let held = allocation
                .accepted_at(school)
                .cloned()
                .unwrap_or_default();

            if held.len() < data.capacity(school) {
                pairs.push(EnvyPair {
                    student: student.clone(),
                    school: school.clone(),
                    displaced: None,
                });
                continue;
            }

            let weakest = held
                .iter()
                .filter_map(|other| data.exam_rank(school, other).map(|rank| (rank, other)))
                .max();
            if let Some((rank, other)) = weakest {
                if rank > exam_rank {
                    pairs.push(EnvyPair {
                        student: student.clone(),
                        school: school.clone(),
                        displaced: Some(other.clone()),
                    });
                }
            }
        }
    }
    pairs
}

/// Whether `allocation` has no justified envy (and wastes no wanted seat).
pub fn is_stable(data: &AdmissionData, allocation: &Allocation) -> bool {
    justified_envy(data, allocation).is_empty()
}

fn outcome(rank: Option<usize>) -> usize {
    rank.unwrap_or(usize::MAX)
}

/// Students strictly better off in `after` than in `before`.
pub fn pareto_improvements(
    data: &AdmissionData,
    before: &Allocation,
    after: &Allocation,
) -> BTreeSet<StudentId> {
    data.students()
        .filter(|student| {
            outcome(preference_rank_of(data, after, student))
                < outcome(preference_rank_of(data, before, student))
        })
        .cloned()
        .collect()
}

/// Whether every student weakly prefers `other` to `allocation` and at least one strictly.
pub fn is_pareto_dominated(
    data: &AdmissionData,
    allocation: &Allocation,
    other: &Allocation,
) -> bool {
    let no_one_worse = data.students().all(|student| {
        outcome(preference_rank_of(data, other, student))
            <= outcome(preference_rank_of(data, allocation, student))
    });
    no_one_worse && !pareto_improvements(data, allocation, other).is_empty()
}

/// Outcome of one mechanism in a [`ComparisonReport`].
#[derive(Debug, Clone, Serialize)]
pub struct MechanismSummary {
    pub mechanism: MechanismKind,
    pub mechanism_label: &'static str,
    /// Number of students admitted at their first, second, ... choice.
    pub assigned_by_rank: Vec<usize>,
    pub rejected: usize,
    pub stable: bool,
    pub envy: Vec<EnvyPair>,
    pub allocation: Allocation,
}

impl MechanismSummary {
    pub fn from_allocation(
        data: &AdmissionData,
        mechanism: MechanismKind,
        allocation: Allocation,
    ) -> Self {
        let mut assigned_by_rank = vec![0; data.max_preferences()];
        for rank in preference_ranks(data, &allocation).into_values().flatten() {
            if let Some(count) = assigned_by_rank.get_mut(rank) {
                *count += 1;
            }
        }
        let envy = justified_envy(data, &allocation);

        Self {
            mechanism,
            mechanism_label: mechanism.label(),
            assigned_by_rank,
            rejected: allocation.rejected.len(),
            stable: envy.is_empty(),
            envy,
            allocation,
        }
    }

    pub fn accepted(&self) -> usize {
        self.assigned_by_rank.iter().sum()
    }
}

/// `dominated` leaves every student weakly worse off than `by`, and someone strictly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DominanceEntry {
    pub dominated: MechanismKind,
    pub by: MechanismKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub students: usize,
    pub schools: usize,
    pub seats: usize,
    pub summaries: Vec<MechanismSummary>,
    pub dominance: Vec<DominanceEntry>,
    /// Pairs of mechanisms that produced identical allocations.
    pub identical: Vec<(MechanismKind, MechanismKind)>,
}

impl ComparisonReport {
    /// Run every mechanism in `kinds` on `data` and compare the outcomes.
    pub fn run(data: &AdmissionData, kinds: &[MechanismKind]) -> Result<Self, MechanismError> {
        let mut summaries = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let allocation = kind.run(data, &mut NoopObserver)?;
            summaries.push(MechanismSummary::from_allocation(data, *kind, allocation));
        }

        let mut dominance = Vec::new();
        let mut identical = Vec::new();
        for (index, left) in summaries.iter().enumerate() {
            for right in &summaries[index + 1..] {
                if left.allocation == right.allocation {
                    identical.push((left.mechanism, right.mechanism));
                    continue;
                }
                if is_pareto_dominated(data, &left.allocation, &right.allocation) {
                    dominance.push(DominanceEntry {
                        dominated: left.mechanism,
                        by: right.mechanism,
                    });
                } else if is_pareto_dominated(data, &right.allocation, &left.allocation) {
                    dominance.push(DominanceEntry {
                        dominated: right.mechanism,
                        by: left.mechanism,
                    });
                }
            }
        }

        Ok(Self {
            students: data.num_students(),
            schools: data.num_schools(),
            seats: data.total_seats(),
            summaries,
            dominance,
            identical,
        })
    }

    /// Compare all four mechanisms.
    pub fn compare_all(data: &AdmissionData) -> Result<Self, MechanismError> {
        Self::run(data, &MechanismKind::ordered())
    }

    pub fn summary(&self, mechanism: MechanismKind) -> Option<&MechanismSummary> {
        self.summaries
            .iter()
            .find(|summary| summary.mechanism == mechanism)
    }
}
