//! Observer that measures job turnaround and throughput.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::atomic::{Atomic, AtomicState};
use crate::event::Event;
use crate::port::PortId;
use crate::types::{SimTime, PHASE_ACTIVE};

const PHASE_DONE: &str = "done";

/// Measurements published by a [`Transducer`] when its observation window
/// closes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransducerReport {
    pub end_time: SimTime,
    pub jobs_arrived: usize,
    pub jobs_solved: usize,
    pub avg_turnaround: f64,
    pub throughput: f64,
    /// Set once the observation window has closed
    pub finished: bool,
}

/// Shared access to a transducer's report, kept by whoever built the model.
pub type ReportHandle = Arc<Mutex<TransducerReport>>;

/// Records job arrivals on `arrived` and completions on `solved` during an
/// observation window. When the window closes it publishes a
/// [`TransducerReport`], emits one event on `out` and passivates.
#[derive(Debug)]
pub struct Transducer {
    state: AtomicState,
    observation_time: SimTime,
    clock: SimTime,
    arrivals: HashMap<i64, SimTime>,
    jobs_arrived: usize,
    jobs_solved: usize,
    total_turnaround: SimTime,
    report: ReportHandle,
}

impl Transducer {
    pub const ARRIVED: PortId = PortId::input(0);
    pub const SOLVED: PortId = PortId::input(1);
    pub const OUT: PortId = PortId::output(0);

    pub fn new(name: impl Into<String>, observation_time: SimTime) -> Self {
        let mut state = AtomicState::new(name);
        state.add_in_port("arrived");
        state.add_in_port("solved");
        state.add_out_port("out");
        Self {
            state,
            observation_time,
            clock: 0.0,
            arrivals: HashMap::new(),
            jobs_arrived: 0,
            jobs_solved: 0,
            total_turnaround: 0.0,
            report: ReportHandle::default(),
        }
    }

    /// A handle that stays readable after the model is moved into a tree.
    pub fn report(&self) -> ReportHandle {
        Arc::clone(&self.report)
    }

    fn job_id(event: &Event) -> Option<i64> {
        event.value().as_integer()
    }

    fn publish(&self) {
        let (avg_turnaround, throughput) = if self.jobs_solved > 0 {
            let solved = self.jobs_solved as f64;
            let throughput = if self.clock > 0.0 { solved / self.clock } else { 0.0 };
            (self.total_turnaround / solved, throughput)
        } else {
            (0.0, 0.0)
        };

        let report = TransducerReport {
            end_time: self.clock,
            jobs_arrived: self.jobs_arrived,
            jobs_solved: self.jobs_solved,
            avg_turnaround,
            throughput,
            finished: true,
        };
        info!(
            transducer = %self.state.name(),
            end_time = report.end_time,
            arrived = report.jobs_arrived,
            solved = report.jobs_solved,
            avg_turnaround = report.avg_turnaround,
            throughput = report.throughput,
            "observation finished"
        );
        *self.report.lock() = report;
    }
}

impl Atomic for Transducer {
    fn state(&self) -> &AtomicState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut AtomicState {
        &mut self.state
    }

    fn initialize(&mut self) {
        self.clock = 0.0;
        self.arrivals.clear();
        self.jobs_arrived = 0;
        self.jobs_solved = 0;
        self.total_turnaround = 0.0;
        *self.report.lock() = TransducerReport::default();
        self.state.hold_in(PHASE_ACTIVE, self.observation_time);
    }

    fn deltint(&mut self) {
        self.clock += self.state.sigma();
        if self.state.phase_is(PHASE_ACTIVE) {
            self.publish();
            self.state.hold_in(PHASE_DONE, 0.0);
        } else {
            self.state.passivate();
        }
    }

    fn deltext(&mut self, e: SimTime) {
        self.clock += e;
        if !self.state.phase_is(PHASE_ACTIVE) {
            return;
        }

        if let Some(id) = self.state.port(Self::ARRIVED).single_value().and_then(Self::job_id) {
            debug!(job = id, time = self.clock, "job arrived");
            self.arrivals.insert(id, self.clock);
            self.jobs_arrived += 1;
        }
        if let Some(id) = self.state.port(Self::SOLVED).single_value().and_then(Self::job_id) {
            if let Some(arrival) = self.arrivals.remove(&id) {
                self.total_turnaround += self.clock - arrival;
            }
            debug!(job = id, time = self.clock, "job solved");
            self.jobs_solved += 1;
        }
    }

    // sigma is already aged to zero here, so the elapsed time is what
    // reaches the end of the window.
    fn deltcon(&mut self, e: SimTime) {
        self.clock += e;
        self.deltint();
        self.deltext(0.0);
    }

    fn lambda(&mut self) {
        if self.state.phase_is(PHASE_DONE) {
            self.state.port_mut(Self::OUT).add_value(Event::empty());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measures_turnaround() {
        let mut transducer = Transducer::new("t", 10.0);
        let report = transducer.report();
        transducer.initialize();

        transducer.state_mut().port_mut(Transducer::ARRIVED).add_value(1i64);
        transducer.deltext(1.0);
        transducer.state_mut().component_mut().clear_ports();

        transducer.state_mut().port_mut(Transducer::SOLVED).add_value(1i64);
        transducer.deltext(4.0);
        transducer.state_mut().component_mut().clear_ports();

        // 10 - 1 - 4 time units remain in the window
        transducer.state_mut().set_sigma(5.0);
        transducer.deltint();
        assert!(transducer.state().phase_is("done"));

        let report = report.lock().clone();
        assert!(report.finished);
        assert_eq!(report.end_time, 10.0);
        assert_eq!(report.jobs_arrived, 1);
        assert_eq!(report.jobs_solved, 1);
        assert_eq!(report.avg_turnaround, 4.0);
        assert_eq!(report.throughput, 0.1);

        transducer.lambda();
        assert_eq!(transducer.state().port(Transducer::OUT).len(), 1);
        transducer.deltint();
        assert!(transducer.state().phase_is("passive"));
    }

    #[test]
    fn test_window_closing_with_input() {
        let mut transducer = Transducer::new("t", 2.0);
        let report = transducer.report();
        transducer.initialize();

        transducer.state_mut().port_mut(Transducer::ARRIVED).add_value(1i64);
        transducer.state_mut().set_sigma(1.0);
        transducer.deltext(1.0);
        transducer.state_mut().component_mut().clear_ports();

        // input lands exactly when the window closes
        transducer.state_mut().port_mut(Transducer::ARRIVED).add_value(2i64);
        transducer.state_mut().set_sigma(0.0);
        transducer.deltcon(1.0);

        let report = report.lock().clone();
        assert_eq!(report.end_time, 2.0);
        assert_eq!(report.jobs_arrived, 1);
        assert!(transducer.state().phase_is("done"));
    }

    #[test]
    fn test_ignores_input_after_window() {
        let mut transducer = Transducer::new("t", 1.0);
        transducer.initialize();
        transducer.deltint();
        transducer.state_mut().port_mut(Transducer::ARRIVED).add_value(3i64);
        transducer.deltext(0.0);
        assert_eq!(transducer.report().lock().jobs_arrived, 0);
    }
}
