use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::MechanismKind;
use crate::admission::{SchoolId, StudentId};
use crate::allocation::SchoolSets;

/// Observer-facing record of one round, tagged by the mechanism that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mechanism", rename_all = "snake_case")]
pub enum StepSnapshot {
    DeferredAcceptance(DeferredAcceptanceStep),
    SchoolOptimal(SchoolOptimalStep),
    Cermat(CermatStep),
    Naive(NaiveStep),
}

impl StepSnapshot {
    pub fn kind(&self) -> MechanismKind {
        match self {
            Self::DeferredAcceptance(_) => MechanismKind::DeferredAcceptance,
            Self::SchoolOptimal(_) => MechanismKind::SchoolOptimal,
            Self::Cermat(_) => MechanismKind::Cermat,
            Self::Naive(_) => MechanismKind::Naive,
        }
    }

    pub fn round(&self) -> usize {
        match self {
            Self::DeferredAcceptance(step) => step.round,
            Self::SchoolOptimal(step) => step.round,
            Self::Cermat(step) => step.round,
            Self::Naive(step) => step.round,
        }
    }

    /// Students held (conditionally or finally) per school at the end of the round.
    pub fn accepted(&self) -> &SchoolSets {
        match self {
            Self::DeferredAcceptance(step) => &step.accepted,
            Self::SchoolOptimal(step) => &step.accepted,
            Self::Cermat(step) => &step.accepted,
            Self::Naive(step) => &step.accepted,
        }
    }

    pub fn held(&self) -> usize {
        self.accepted().values().map(BTreeSet::len).sum()
    }
}

/// Deferred acceptance round: who proposed where and who is still held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeferredAcceptanceStep {
    pub round: usize,
    /// Cursor into each student's preference list at the start of the round.
    pub positions: BTreeMap<StudentId, usize>,
    /// Candidate pool per school: previously held plus newly proposing students.
    pub to_compare: SchoolSets,
    pub accepted: SchoolSets,
}

/// School-proposing round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchoolOptimalStep {
    pub round: usize,
    pub remaining_applicants: BTreeMap<SchoolId, Vec<StudentId>>,
    /// Schools that made an offer to each student this round.
    pub offers: BTreeMap<StudentId, BTreeSet<SchoolId>>,
    pub accepted: SchoolSets,
}

/// Best-rank resolution round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CermatStep {
    pub round: usize,
    /// Zero-based preference rank resolved this round.
    pub best_rank: usize,
    pub best_match: BTreeSet<(StudentId, SchoolId)>,
    pub cutoffs: BTreeMap<SchoolId, usize>,
    pub applicants: BTreeMap<SchoolId, Vec<StudentId>>,
    pub accepted: SchoolSets,
}

/// Single-offer round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NaiveStep {
    pub round: usize,
    pub offers: BTreeMap<StudentId, BTreeSet<SchoolId>>,
    pub accepted: SchoolSets,
    pub remaining_seats: BTreeMap<SchoolId, usize>,
}
