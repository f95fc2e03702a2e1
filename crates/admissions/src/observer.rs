//! Read-only hooks into a running mechanism.
//!
//! Observers receive the input once, a snapshot per round, and the final allocation. They
//! cannot influence control flow; every run builds its own observer.

use serde::Serialize;
use tracing::{debug, info};

use crate::admission::AdmissionData;
use crate::allocation::Allocation;
use crate::mechanism::{MechanismKind, StepSnapshot};

pub trait AdmissionObserver {
    fn log_start(&mut self, mechanism: MechanismKind, data: &AdmissionData);
    fn log_step(&mut self, snapshot: &StepSnapshot);
    fn log_end(&mut self, allocation: &Allocation);
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl AdmissionObserver for NoopObserver {
    fn log_start(&mut self, _mechanism: MechanismKind, _data: &AdmissionData) {}

    fn log_step(&mut self, _snapshot: &StepSnapshot) {}

    fn log_end(&mut self, _allocation: &Allocation) {}
}

/// Emits the run as structured `tracing` events.
#[derive(Debug, Default)]
pub struct TracingObserver {
    mechanism: Option<MechanismKind>,
    rounds: usize,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AdmissionObserver for TracingObserver {
    fn log_start(&mut self, mechanism: MechanismKind, data: &AdmissionData) {
        self.mechanism = Some(mechanism);
        self.rounds = 0;
        info!(
            mechanism = mechanism.label(),
            students = data.num_students(),
            schools = data.num_schools(),
            seats = data.total_seats(),
            "starting admission run"
        );
    }

    fn log_step(&mut self, snapshot: &StepSnapshot) {
        self.rounds += 1;
        match snapshot {
            StepSnapshot::DeferredAcceptance(step) => debug!(
                round = step.round,
                proposing = step.to_compare.values().map(|pool| pool.len()).sum::<usize>(),
                held = snapshot.held(),
                "deferred acceptance round"
            ),
            StepSnapshot::SchoolOptimal(step) => debug!(
                round = step.round,
                offers = step.offers.len(),
                held = snapshot.held(),
                "school-optimal round"
            ),
            StepSnapshot::Cermat(step) => debug!(
                round = step.round,
                best_rank = step.best_rank + 1,
                matched = step.best_match.len(),
                held = snapshot.held(),
                "cermat round"
            ),
            StepSnapshot::Naive(step) => debug!(
                round = step.round,
                offers = step.offers.len(),
                enrolled = snapshot.held(),
                "naive round"
            ),
        }
    }

    fn log_end(&mut self, allocation: &Allocation) {
        info!(
            mechanism = self.mechanism.map(MechanismKind::label).unwrap_or("unknown"),
            rounds = self.rounds,
            accepted = allocation.num_accepted(),
            rejected = allocation.rejected.len(),
            "admission run finished"
        );
    }
}

/// Keeps the whole run for later rendering.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordingObserver {
    pub mechanism: Option<MechanismKind>,
    pub data: Option<AdmissionData>,
    pub steps: Vec<StepSnapshot>,
    pub allocation: Option<Allocation>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rounds(&self) -> usize {
        self.steps.len()
    }
}

impl AdmissionObserver for RecordingObserver {
    fn log_start(&mut self, mechanism: MechanismKind, data: &AdmissionData) {
        self.mechanism = Some(mechanism);
        self.data = Some(data.clone());
        self.steps.clear();
        self.allocation = None;
    }

    fn log_step(&mut self, snapshot: &StepSnapshot) {
        self.steps.push(snapshot.clone());
    }

    fn log_end(&mut self, allocation: &Allocation) {
        self.allocation = Some(allocation.clone());
    }
}

/// Forwards every event to each wrapped observer in order.
#[derive(Default)]
pub struct CompositeObserver<'a> {
    observers: Vec<&'a mut dyn AdmissionObserver>,
}

impl<'a> CompositeObserver<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: &'a mut dyn AdmissionObserver) -> Self {
        self.observers.push(observer);
        self
    }
}

impl AdmissionObserver for CompositeObserver<'_> {
    fn log_start(&mut self, mechanism: MechanismKind, data: &AdmissionData) {
        for observer in self.observers.iter_mut() {
            observer.log_start(mechanism, data);
        }
    }

    fn log_step(&mut self, snapshot: &StepSnapshot) {
        for observer in self.observers.iter_mut() {
            observer.log_step(snapshot);
        }
    }

    fn log_end(&mut self, allocation: &Allocation) {
        for observer in self.observers.iter_mut() {
            observer.log_end(allocation);
        }
    }
}
