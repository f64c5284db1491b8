//! Periodic job source.

use crate::atomic::{Atomic, AtomicState};
use crate::port::PortId;
use crate::types::{SimTime, PHASE_ACTIVE};

/// Emits job ids `1, 2, 3, ...` every `period` time units, starting one
/// period after initialization. Any input on `stop` passivates it for good.
#[derive(Debug)]
pub struct Generator {
    state: AtomicState,
    period: SimTime,
    job_counter: i64,
}

impl Generator {
    pub const STOP: PortId = PortId::input(0);
    pub const OUT: PortId = PortId::output(0);

    pub fn new(name: impl Into<String>, period: SimTime) -> Self {
        let mut state = AtomicState::new(name);
        state.add_in_port("stop");
        state.add_out_port("out");
        Self {
            state,
            period,
            job_counter: 1,
        }
    }

    pub fn period(&self) -> SimTime {
        self.period
    }

    /// Id of the next job to be emitted.
    pub fn next_job(&self) -> i64 {
        self.job_counter
    }
}

impl Atomic for Generator {
    fn state(&self) -> &AtomicState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut AtomicState {
        &mut self.state
    }

    fn initialize(&mut self) {
        self.job_counter = 1;
        self.state.hold_in(PHASE_ACTIVE, self.period);
    }

    fn deltint(&mut self) {
        self.job_counter += 1;
        self.state.hold_in(PHASE_ACTIVE, self.period);
    }

    fn deltext(&mut self, _e: SimTime) {
        self.state.passivate();
    }

    fn lambda(&mut self) {
        let job = self.job_counter;
        self.state.port_mut(Self::OUT).add_value(job);
    }
}
