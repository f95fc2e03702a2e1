//! Matching mechanisms for centralized school admissions.
//!
//! Students rank schools, schools rank applicants by exam results, and each school has a fixed
//! number of seats. The crate implements four ways of turning those inputs into an allocation
//! (student-proposing deferred acceptance, its school-proposing dual, the iterative best-rank
//! procedure used in the national admission round, and a naive single-offer procedure), plus
//! tooling to load rounds, observe them step by step, and compare the outcomes.

pub mod admission;
pub mod allocation;
pub mod analysis;
pub mod config;
pub mod error;
pub mod import;
pub mod mechanism;
pub mod observer;
pub mod telemetry;

pub use admission::{AdmissionData, AdmissionDataBuilder, DataError, SchoolId, StudentId};
pub use allocation::{Allocation, SchoolSets};
pub use mechanism::{
    Cermat, DeferredAcceptance, Mechanism, MechanismError, MechanismKind, Naive, SchoolOptimal,
    StepSnapshot,
};
pub use observer::{
    AdmissionObserver, CompositeObserver, NoopObserver, RecordingObserver, TracingObserver,
};
