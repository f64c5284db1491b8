//! Integration tests for the leaf simulator protocol.
//!
//! These tests drive a single atomic model through `Simulator` by hand and
//! check:
//! - transition dispatch (internal, external, confluent, no-op)
//! - elapsed time and sigma aging
//! - output only at the scheduled time

use hdevs::executor::Simulator;
use hdevs::{Atomic, AtomicState, PortId, SimTime, SimulationClock, INFINITY, PHASE_ACTIVE};

// ============================================================================
// Test Models
// ============================================================================

/// Records every transition it receives.
struct Recorder {
    state: AtomicState,
    period: SimTime,
    calls: Vec<String>,
}

impl Recorder {
    const IN: PortId = PortId::input(0);
    const OUT: PortId = PortId::output(0);

    fn new(period: SimTime) -> Self {
        let mut state = AtomicState::new("recorder");
        state.add_in_port("in");
        state.add_out_port("out");
        Self {
            state,
            period,
            calls: Vec::new(),
        }
    }
}

impl Atomic for Recorder {
    fn state(&self) -> &AtomicState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut AtomicState {
        &mut self.state
    }

    fn initialize(&mut self) {
        self.state.hold_in(PHASE_ACTIVE, self.period);
    }

    fn deltint(&mut self) {
        self.calls.push("int".into());
        self.state.hold_in(PHASE_ACTIVE, self.period);
    }

    fn deltext(&mut self, e: SimTime) {
        self.calls.push(format!("ext({}, sigma {})", e, self.state.sigma()));
    }

    fn deltcon(&mut self, e: SimTime) {
        self.calls.push(format!("con({})", e));
        self.deltint();
        self.deltext(0.0);
    }

    fn lambda(&mut self) {
        self.state.port_mut(Self::OUT).add_value(1i64);
    }
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_initialize_schedules_first_event() {
    let mut model = Recorder::new(2.0);
    let clock = SimulationClock::with_time(1.0);
    let mut sim = Simulator::new(&mut model);
    sim.initialize(&clock);

    assert_eq!(sim.tl(), 1.0);
    assert_eq!(sim.tn(), 3.0);
}

#[test]
fn test_internal_transition_at_tn() {
    let mut model = Recorder::new(2.0);
    let mut clock = SimulationClock::new();
    {
        let mut sim = Simulator::new(&mut model);
        sim.initialize(&clock);

        clock.set_time(2.0);
        sim.lambda(&clock);
        assert_eq!(sim.component().port(Recorder::OUT).len(), 1);
        sim.deltfcn(&clock);
        sim.clear();

        assert_eq!(sim.tl(), 2.0);
        assert_eq!(sim.tn(), 4.0);
        assert!(sim.component().is_output_empty());
    }
    assert_eq!(model.calls, vec!["int"]);
}

#[test]
fn test_external_transition_ages_sigma() {
    let mut model = Recorder::new(4.0);
    let mut clock = SimulationClock::new();
    {
        let mut sim = Simulator::new(&mut model);
        sim.initialize(&clock);

        clock.set_time(1.5);
        sim.component_mut().port_mut(Recorder::IN).add_value(7i64);
        sim.deltfcn(&clock);

        // the model kept its remaining sigma
        assert_eq!(sim.tn(), 4.0);
    }
    assert_eq!(model.calls, vec!["ext(1.5, sigma 2.5)"]);
}

#[test]
fn test_input_at_last_transition_time() {
    let mut model = Recorder::new(2.0);
    let clock = SimulationClock::new();
    {
        let mut sim = Simulator::new(&mut model);
        sim.initialize(&clock);
        sim.component_mut().port_mut(Recorder::IN).add_value(1i64);
        sim.deltfcn(&clock);
        assert_eq!(sim.tn(), 2.0);
    }
    assert_eq!(model.calls, vec!["ext(0, sigma 2)"]);
}

#[test]
fn test_confluent_transition() {
    let mut model = Recorder::new(2.0);
    let mut clock = SimulationClock::new();
    {
        let mut sim = Simulator::new(&mut model);
        sim.initialize(&clock);

        clock.set_time(2.0);
        sim.component_mut().port_mut(Recorder::IN).add_value(1i64);
        sim.deltfcn(&clock);
        assert_eq!(sim.tn(), 4.0);
    }
    assert_eq!(model.calls, vec!["con(2)", "int", "ext(0, sigma 2)"]);
}

#[test]
fn test_no_input_before_tn_is_noop() {
    let mut model = Recorder::new(2.0);
    let mut clock = SimulationClock::new();
    {
        let mut sim = Simulator::new(&mut model);
        sim.initialize(&clock);

        clock.set_time(1.0);
        sim.lambda(&clock);
        sim.deltfcn(&clock);

        assert!(sim.component().is_output_empty());
        assert_eq!(sim.tl(), 0.0);
        assert_eq!(sim.tn(), 2.0);
    }
    assert!(model.calls.is_empty());
}

#[test]
fn test_passive_model_never_fires() {
    let mut model = Recorder::new(INFINITY);
    let clock = SimulationClock::new();
    let mut sim = Simulator::new(&mut model);
    sim.initialize(&clock);

    assert_eq!(sim.ta(), INFINITY);
    assert_eq!(sim.tn(), INFINITY);
}
