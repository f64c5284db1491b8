//! Leaf behavior: the phase/sigma state machine.
//!
//! Concrete models embed an [`AtomicState`] and implement [`Atomic`]. The
//! simulator only ever talks to a model through this trait, so the protocol
//! (when `lambda` fires, which transition runs, how sigma is aged) lives in
//! [`Simulator`](crate::executor::Simulator) and never in the models.

use std::fmt;

use crate::component::Component;
use crate::port::{Port, PortId};
use crate::types::{SimTime, INFINITY, PHASE_ACTIVE, PHASE_PASSIVE};

/// Structural and scheduling state of an atomic model.
#[derive(Clone, Debug)]
pub struct AtomicState {
    component: Component,
    phase: String,
    sigma: SimTime,
}

impl AtomicState {
    /// Creates a passive state for a model named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            component: Component::new(name),
            phase: PHASE_PASSIVE.to_string(),
            sigma: INFINITY,
        }
    }

    pub fn name(&self) -> &str {
        self.component.name()
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn component_mut(&mut self) -> &mut Component {
        &mut self.component
    }

    /// Declares an input port on the embedded component.
    pub fn add_in_port(&mut self, name: impl Into<String>) -> PortId {
        self.component.add_in_port(name)
    }

    /// Declares an output port on the embedded component.
    pub fn add_out_port(&mut self, name: impl Into<String>) -> PortId {
        self.component.add_out_port(name)
    }

    pub fn port(&self, id: PortId) -> &Port {
        self.component.port(id)
    }

    pub fn port_mut(&mut self, id: PortId) -> &mut Port {
        self.component.port_mut(id)
    }

    pub fn phase(&self) -> &str {
        &self.phase
    }

    pub fn phase_is(&self, phase: &str) -> bool {
        self.phase == phase
    }

    pub fn set_phase(&mut self, phase: impl Into<String>) {
        self.phase = phase.into();
    }

    pub fn sigma(&self) -> SimTime {
        self.sigma
    }

    pub fn set_sigma(&mut self, sigma: SimTime) {
        self.sigma = sigma;
    }

    /// Stays in `phase` for `sigma` time units.
    pub fn hold_in(&mut self, phase: impl Into<String>, sigma: SimTime) {
        self.phase = phase.into();
        self.sigma = sigma;
    }

    /// Fires an internal transition immediately.
    pub fn activate(&mut self) {
        self.hold_in(PHASE_ACTIVE, 0.0);
    }

    /// Waits for external input only.
    pub fn passivate(&mut self) {
        self.passivate_in(PHASE_PASSIVE);
    }

    /// Waits for external input only, in the given phase.
    pub fn passivate_in(&mut self, phase: impl Into<String>) {
        self.hold_in(phase, INFINITY);
    }
}

impl fmt::Display for AtomicState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}, {}", self.name(), self.phase, self.sigma)
    }
}

/// The behavior of a leaf model.
///
/// Implementors provide access to their [`AtomicState`] plus the two
/// mandatory transitions and the output function. Everything else has the
/// standard default.
pub trait Atomic: Send {
    fn state(&self) -> &AtomicState;

    fn state_mut(&mut self) -> &mut AtomicState;

    /// Called once when the simulation starts.
    fn initialize(&mut self) {}

    /// Called once when the simulation ends.
    fn exit(&mut self) {}

    /// Time advance. Defaults to the current sigma.
    fn ta(&self) -> SimTime {
        self.state().sigma()
    }

    /// Internal transition, run when sigma expires with no input pending.
    fn deltint(&mut self);

    /// External transition.
    ///
    /// # Arguments
    /// * `e` - Time elapsed since the last transition
    fn deltext(&mut self, e: SimTime);

    /// Confluent transition, run when input arrives exactly at the internal
    /// deadline.
    ///
    /// The default applies the internal transition first, then the external
    /// one with zero elapsed time.
    fn deltcon(&mut self, _e: SimTime) {
        self.deltint();
        self.deltext(0.0);
    }

    /// Output function. Appends events to the output ports based on the
    /// state before the upcoming transition.
    fn lambda(&mut self);

    fn name(&self) -> &str {
        self.state().name()
    }

    fn component(&self) -> &Component {
        self.state().component()
    }

    fn component_mut(&mut self) -> &mut Component {
        self.state_mut().component_mut()
    }
}
