//! Single-server job processor.

use crate::atomic::{Atomic, AtomicState};
use crate::event::Event;
use crate::port::PortId;
use crate::types::{SimTime, PHASE_ACTIVE, PHASE_PASSIVE};

/// Accepts a job when idle and emits it `processing_time` later. Jobs that
/// arrive while busy are dropped.
#[derive(Debug)]
pub struct Processor {
    state: AtomicState,
    processing_time: SimTime,
    current: Option<Event>,
}

impl Processor {
    pub const IN: PortId = PortId::input(0);
    pub const OUT: PortId = PortId::output(0);

    pub fn new(name: impl Into<String>, processing_time: SimTime) -> Self {
        let mut state = AtomicState::new(name);
        state.add_in_port("in");
        state.add_out_port("out");
        Self {
            state,
            processing_time,
            current: None,
        }
    }

    /// The job being served, if any.
    pub fn current(&self) -> Option<&Event> {
        self.current.as_ref()
    }
}

impl Atomic for Processor {
    fn state(&self) -> &AtomicState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut AtomicState {
        &mut self.state
    }

    fn initialize(&mut self) {
        self.current = None;
        self.state.passivate();
    }

    fn deltint(&mut self) {
        self.current = None;
        self.state.passivate();
    }

    fn deltext(&mut self, _e: SimTime) {
        if !self.state.phase_is(PHASE_PASSIVE) {
            return;
        }
        if let Some(job) = self.state.port(Self::IN).single_value() {
            self.current = Some(job.clone());
            self.state.hold_in(PHASE_ACTIVE, self.processing_time);
        }
    }

    fn lambda(&mut self) {
        if let Some(job) = self.current.clone() {
            self.state.port_mut(Self::OUT).add_value(job);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serves_one_job_at_a_time() {
        let mut processor = Processor::new("proc", 3.0);
        processor.initialize();

        processor.state_mut().port_mut(Processor::IN).add_value(1i64);
        processor.deltext(0.0);
        assert!(processor.state().phase_is("active"));
        assert_eq!(processor.ta(), 3.0);
        processor.state_mut().port_mut(Processor::IN).clear();

        // busy: the second job is dropped and sigma is untouched
        processor.state_mut().port_mut(Processor::IN).add_value(2i64);
        processor.deltext(1.0);
        assert_eq!(processor.ta(), 3.0);

        processor.lambda();
        let out = processor.state().port(Processor::OUT);
        assert_eq!(out.single_payload().and_then(|v| v.as_integer()), Some(1));

        processor.deltint();
        assert!(processor.current().is_none());
        assert!(processor.state().phase_is("passive"));
    }

    #[test]
    fn test_output_shares_payload() {
        let mut processor = Processor::new("proc", 1.0);
        processor.initialize();
        let job = Event::new(42i64);
        processor.state_mut().port_mut(Processor::IN).add_value(job.clone());
        processor.deltext(0.0);
        processor.lambda();
        let emitted = processor.state().port(Processor::OUT).single_value().unwrap();
        assert!(emitted.shares_payload(&job));
    }
}
