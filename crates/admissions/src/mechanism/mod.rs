//! Matching mechanisms assigning students to schools.
//!
//! Every mechanism follows the same protocol: build the run state from validated
//! [`AdmissionData`], call [`Mechanism::step`] until [`Mechanism::is_done`], then project the
//! state with [`Mechanism::allocate`]. [`Mechanism::evaluate_with`] drives that loop and reports
//! each round to an [`AdmissionObserver`].

mod cermat;
mod deferred_acceptance;
mod naive;
mod school_optimal;
pub mod snapshot;

pub use cermat::Cermat;
pub use deferred_acceptance::DeferredAcceptance;
pub use naive::Naive;
pub use school_optimal::SchoolOptimal;
pub use snapshot::{
    CermatStep, DeferredAcceptanceStep, NaiveStep, SchoolOptimalStep, StepSnapshot,
};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::admission::{AdmissionData, SchoolId};
use crate::allocation::{Allocation, SchoolSets};
use crate::observer::{AdmissionObserver, NoopObserver};

/// Iterate-until-done contract shared by all mechanisms.
pub trait Mechanism {
    fn kind(&self) -> MechanismKind;

    fn data(&self) -> &AdmissionData;

    /// Whether another round would change nothing. Free of side effects.
    fn is_done(&self) -> bool;

    /// Run one round of the update rule.
    fn step(&mut self) -> Result<StepSnapshot, MechanismError>;

    /// Project the current state into the final allocation. Only valid once done.
    fn allocate(&self) -> Result<Allocation, MechanismError>;

    /// Run to completion without observing intermediate rounds.
    fn evaluate(self) -> Result<Allocation, MechanismError>
    where
        Self: Sized,
    {
        self.evaluate_with(&mut NoopObserver)
    }

    /// Run to completion, reporting the start, every round, and the result to `observer`.
    fn evaluate_with(
        mut self,
        observer: &mut dyn AdmissionObserver,
    ) -> Result<Allocation, MechanismError>
    where
        Self: Sized,
    {
        let kind = self.kind();
        observer.log_start(kind, self.data());

        let mut rounds = 0usize;
        while !self.is_done() {
            let snapshot = self.step()?;
            rounds += 1;
            debug!(
                mechanism = kind.label(),
                round = rounds,
                held = snapshot.held(),
                "round complete"
            );
            observer.log_step(&snapshot);
        }

        let allocation = self.allocate()?;
        info!(
            mechanism = kind.label(),
            rounds,
            accepted = allocation.num_accepted(),
            rejected = allocation.rejected.len(),
            "allocation complete"
        );
        observer.log_end(&allocation);
        Ok(allocation)
    }
}

/// Names the available mechanisms for configuration, reports, and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MechanismKind {
    DeferredAcceptance,
    SchoolOptimal,
    Cermat,
    Naive,
}

impl MechanismKind {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::DeferredAcceptance,
            Self::Cermat,
            Self::Naive,
            Self::SchoolOptimal,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::DeferredAcceptance => "Deferred acceptance",
            Self::SchoolOptimal => "School-optimal stable mechanism",
            Self::Cermat => "Cermat mechanism",
            Self::Naive => "Naive mechanism",
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::DeferredAcceptance => "deferred_acceptance",
            Self::SchoolOptimal => "school_optimal",
            Self::Cermat => "cermat",
            Self::Naive => "naive",
        }
    }

    /// Whether the mechanism always produces a matching without justified envy.
    pub const fn guarantees_stability(self) -> bool {
        !matches!(self, Self::Naive)
    }

    /// Build the mechanism for `data` and run it to completion.
    pub fn run(
        self,
        data: &AdmissionData,
        observer: &mut dyn AdmissionObserver,
    ) -> Result<Allocation, MechanismError> {
        match self {
            Self::DeferredAcceptance => DeferredAcceptance::new(data).evaluate_with(observer),
            Self::SchoolOptimal => SchoolOptimal::new(data).evaluate_with(observer),
            Self::Cermat => Cermat::new(data).evaluate_with(observer),
            Self::Naive => Naive::new(data).evaluate_with(observer),
        }
    }
}

impl fmt::Display for MechanismKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for MechanismKind {
    type Err = UnknownMechanism;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "deferred_acceptance" | "da" => Ok(Self::DeferredAcceptance),
            "school_optimal" | "sosm" => Ok(Self::SchoolOptimal),
            "cermat" | "cm" => Ok(Self::Cermat),
            "naive" => Ok(Self::Naive),
            _ => Err(UnknownMechanism(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mechanism '{0}' (expected deferred_acceptance, school_optimal, cermat, or naive)")]
pub struct UnknownMechanism(pub String);

/// Protocol misuse and internal invariant violations raised while running a mechanism.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MechanismError {
    #[error("{mechanism} has already finished; no further rounds can run")]
    AlreadyDone { mechanism: MechanismKind },
    #[error("{mechanism} has not finished; the allocation is not final yet")]
    NotDone { mechanism: MechanismKind },
    #[error("school {school} holds {held} students but has only {seats} seats")]
    CapacityExceeded {
        school: SchoolId,
        held: usize,
        seats: usize,
    },
}

pub(crate) fn empty_sets(data: &AdmissionData) -> SchoolSets {
    data.schools()
        .map(|school| (school.clone(), Default::default()))
        .collect()
}

pub(crate) fn ensure_capacity(
    data: &AdmissionData,
    held: &SchoolSets,
) -> Result<(), MechanismError> {
    for (school, students) in held {
        let seats = data.capacity(school);
        if students.len() > seats {
            return Err(MechanismError::CapacityExceeded {
                school: school.clone(),
                held: students.len(),
                seats,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::StudentId;
    use std::collections::BTreeSet;

    #[test]
    fn parses_mechanism_names_and_aliases() {
        assert_eq!(
            "deferred-acceptance".parse::<MechanismKind>(),
            Ok(MechanismKind::DeferredAcceptance)
        );
        assert_eq!("SOSM".parse::<MechanismKind>(), Ok(MechanismKind::SchoolOptimal));
        assert_eq!(" cermat ".parse::<MechanismKind>(), Ok(MechanismKind::Cermat));
        assert!("lottery".parse::<MechanismKind>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for kind in MechanismKind::ordered() {
            assert_eq!(kind.to_string().parse::<MechanismKind>(), Ok(kind));
        }
    }

    #[test]
    fn only_naive_lacks_stability_guarantee() {
        let unstable: Vec<_> = MechanismKind::ordered()
            .into_iter()
            .filter(|kind| !kind.guarantees_stability())
            .collect();
        assert_eq!(unstable, vec![MechanismKind::Naive]);
    }

    #[test]
    fn ensure_capacity_flags_overfull_school() {
        let data = AdmissionData::builder()
            .student(1, "A".chars())
            .student(2, "A".chars())
            .school('A', 1, [1, 2])
            .build()
            .expect("consistent data");
        let mut held = empty_sets(&data);
        held.insert(
            SchoolId::from('A'),
            BTreeSet::from([StudentId::from(1), StudentId::from(2)]),
        );

        assert_eq!(
            ensure_capacity(&data, &held),
            Err(MechanismError::CapacityExceeded {
                school: SchoolId::from('A'),
                held: 2,
                seats: 1,
            })
        );
    }
}
