//! Abstract simulators: the run-time counterpart of the model tree.
//!
//! Every node of the model tree gets an executor for the duration of a run:
//!
//! - [`Simulator`] drives an atomic model
//! - [`Coordinator`] drives a coupled model, recursively owning one executor
//!   per child
//!
//! Both answer the same protocol (`initialize`, `ta`, `lambda`, `deltfcn`,
//! `clear`, `exit`) and are gathered in the closed [`AbstractSimulator`]
//! variant so a coordinator can hold a homogeneous list of children.
//!
//! # Protocol
//!
//! One cycle at clock time `t` is:
//!
//! 1. `lambda`: imminent models (`tN == t`) produce output, then values move
//!    along internal and external output couplings
//! 2. `deltfcn`: values move along external input couplings, then each model
//!    runs its internal, external or confluent transition
//! 3. `clear`: every port in the tree is emptied

pub mod coordinator;
pub mod simulator;

use crate::clock::SimulationClock;
use crate::component::Component;
use crate::types::SimTime;

pub use coordinator::Coordinator;
pub use simulator::Simulator;

/// One node of the executor tree.
pub enum AbstractSimulator<'a> {
    Simulator(Simulator<'a>),
    Coordinator(Coordinator<'a>),
}

impl<'a> AbstractSimulator<'a> {
    pub fn initialize(&mut self, clock: &SimulationClock) {
        match self {
            AbstractSimulator::Simulator(s) => s.initialize(clock),
            AbstractSimulator::Coordinator(c) => c.initialize(clock),
        }
    }

    pub fn exit(&mut self) {
        match self {
            AbstractSimulator::Simulator(s) => s.exit(),
            AbstractSimulator::Coordinator(c) => c.exit(),
        }
    }

    pub fn ta(&self, clock: &SimulationClock) -> SimTime {
        match self {
            AbstractSimulator::Simulator(s) => s.ta(),
            AbstractSimulator::Coordinator(c) => c.ta(clock),
        }
    }

    pub fn lambda(&mut self, clock: &SimulationClock) {
        match self {
            AbstractSimulator::Simulator(s) => s.lambda(clock),
            AbstractSimulator::Coordinator(c) => c.lambda(clock),
        }
    }

    pub fn deltfcn(&mut self, clock: &SimulationClock) {
        match self {
            AbstractSimulator::Simulator(s) => s.deltfcn(clock),
            AbstractSimulator::Coordinator(c) => c.deltfcn(clock),
        }
    }

    pub fn clear(&mut self) {
        match self {
            AbstractSimulator::Simulator(s) => s.clear(),
            AbstractSimulator::Coordinator(c) => c.clear(),
        }
    }

    pub fn tl(&self) -> SimTime {
        match self {
            AbstractSimulator::Simulator(s) => s.tl(),
            AbstractSimulator::Coordinator(c) => c.tl(),
        }
    }

    pub fn tn(&self) -> SimTime {
        match self {
            AbstractSimulator::Simulator(s) => s.tn(),
            AbstractSimulator::Coordinator(c) => c.tn(),
        }
    }

    pub fn component(&self) -> &Component {
        match self {
            AbstractSimulator::Simulator(s) => s.component(),
            AbstractSimulator::Coordinator(c) => c.component(),
        }
    }

    pub fn component_mut(&mut self) -> &mut Component {
        match self {
            AbstractSimulator::Simulator(s) => s.component_mut(),
            AbstractSimulator::Coordinator(c) => c.component_mut(),
        }
    }
}
