//! Leaf simulator: drives one atomic model through the DEVS protocol.

use tracing::trace;

use crate::atomic::Atomic;
use crate::clock::SimulationClock;
use crate::component::Component;
use crate::types::{SimTime, INFINITY};

/// Drives a single [`Atomic`] model.
///
/// The simulator owns only the bookkeeping times `tL` (last transition) and
/// `tN` (next scheduled transition); the model is borrowed for the run.
pub struct Simulator<'a> {
    model: &'a mut dyn Atomic,
    tl: SimTime,
    tn: SimTime,
}

impl<'a> Simulator<'a> {
    pub fn new(model: &'a mut dyn Atomic) -> Self {
        Self {
            model,
            tl: 0.0,
            tn: INFINITY,
        }
    }

    /// Initializes the model and schedules its first internal event.
    pub fn initialize(&mut self, clock: &SimulationClock) {
        self.model.initialize();
        self.tl = clock.time();
        self.tn = self.tl + self.model.ta();
    }

    pub fn exit(&mut self) {
        self.model.exit();
    }

    pub fn ta(&self) -> SimTime {
        self.model.ta()
    }

    /// Runs the output function if the model is imminent.
    pub fn lambda(&mut self, clock: &SimulationClock) {
        if clock.time() == self.tn {
            self.model.lambda();
        }
    }

    /// Runs whichever transition applies at the current time.
    ///
    /// | input empty | `t == tN` | transition |
    /// |---|---|---|
    /// | yes | no | none, times unchanged |
    /// | no | yes | confluent, `deltcon(t - tL)` |
    /// | yes | yes | internal, `deltint()` |
    /// | no | no | external, `deltext(t - tL)` |
    ///
    /// Sigma is aged by the elapsed time before the confluent and external
    /// transitions run.
    pub fn deltfcn(&mut self, clock: &SimulationClock) {
        let t = clock.time();
        let input_empty = self.model.component().is_input_empty();

        match (input_empty, t == self.tn) {
            (true, false) => return,
            (false, true) => {
                let e = t - self.tl;
                self.age_sigma(e);
                trace!(model = self.model.name(), t, e, "deltcon");
                self.model.deltcon(e);
            }
            (true, true) => {
                trace!(model = self.model.name(), t, "deltint");
                self.model.deltint();
            }
            (false, false) => {
                let e = t - self.tl;
                self.age_sigma(e);
                trace!(model = self.model.name(), t, e, "deltext");
                self.model.deltext(e);
            }
        }

        self.tl = t;
        self.tn = self.tl + self.model.ta();
    }

    fn age_sigma(&mut self, e: SimTime) {
        let state = self.model.state_mut();
        let sigma = state.sigma() - e;
        state.set_sigma(sigma);
    }

    /// Empties the model's input and output ports.
    pub fn clear(&mut self) {
        self.model.component_mut().clear_ports();
    }

    pub fn tl(&self) -> SimTime {
        self.tl
    }

    pub fn tn(&self) -> SimTime {
        self.tn
    }

    pub fn component(&self) -> &Component {
        self.model.component()
    }

    pub fn component_mut(&mut self) -> &mut Component {
        self.model.component_mut()
    }

    pub fn model(&self) -> &dyn Atomic {
        &*self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomic::AtomicState;
    use crate::event::Event;
    use crate::port::PortId;

    /// Holds "active" for a fixed period and records every callback.
    struct Probe {
        state: AtomicState,
        period: SimTime,
        calls: Vec<String>,
        sigma_seen: Vec<SimTime>,
    }

    impl Probe {
        fn new(period: SimTime) -> Self {
            let mut state = AtomicState::new("probe");
            state.add_in_port("in");
            state.add_out_port("out");
            Self {
                state,
                period,
                calls: Vec::new(),
                sigma_seen: Vec::new(),
            }
        }
    }

    impl Atomic for Probe {
        fn state(&self) -> &AtomicState {
            &self.state
        }
        fn state_mut(&mut self) -> &mut AtomicState {
            &mut self.state
        }
        fn initialize(&mut self) {
            self.state.hold_in("active", self.period);
        }
        fn deltint(&mut self) {
            self.calls.push("deltint".into());
            self.state.hold_in("active", self.period);
        }
        fn deltext(&mut self, e: SimTime) {
            self.calls.push(format!("deltext({})", e));
            self.sigma_seen.push(self.state.sigma());
        }
        fn lambda(&mut self) {
            self.calls.push("lambda".into());
        }
    }

    fn feed(sim: &mut Simulator<'_>) {
        sim.component_mut().port_mut(PortId::input(0)).add_value(Event::new(1i64));
    }

    #[test]
    fn test_initialize_schedules_first_event() {
        let mut model = Probe::new(2.0);
        let mut sim = Simulator::new(&mut model);
        sim.initialize(&SimulationClock::with_time(1.0));
        assert_eq!(sim.tl(), 1.0);
        assert_eq!(sim.tn(), 3.0);
    }

    #[test]
    fn test_idle_step_is_noop() {
        let mut model = Probe::new(2.0);
        {
            let mut sim = Simulator::new(&mut model);
            sim.initialize(&SimulationClock::new());
            let clock = SimulationClock::with_time(1.0);
            sim.lambda(&clock);
            sim.deltfcn(&clock);
            assert_eq!(sim.tl(), 0.0);
            assert_eq!(sim.tn(), 2.0);
        }
        assert!(model.calls.is_empty());
    }

    #[test]
    fn test_internal_transition() {
        let mut model = Probe::new(2.0);
        {
            let mut sim = Simulator::new(&mut model);
            sim.initialize(&SimulationClock::new());
            let clock = SimulationClock::with_time(2.0);
            sim.lambda(&clock);
            sim.deltfcn(&clock);
            assert_eq!(sim.tl(), 2.0);
            assert_eq!(sim.tn(), 4.0);
        }
        assert_eq!(model.calls, vec!["lambda", "deltint"]);
    }

    #[test]
    fn test_external_transition_ages_sigma() {
        let mut model = Probe::new(2.0);
        {
            let mut sim = Simulator::new(&mut model);
            sim.initialize(&SimulationClock::new());
            let clock = SimulationClock::with_time(0.5);
            feed(&mut sim);
            sim.deltfcn(&clock);
            assert_eq!(sim.tl(), 0.5);
            assert_eq!(sim.tn(), 2.0);
        }
        assert_eq!(model.calls, vec!["deltext(0.5)"]);
        assert_eq!(model.sigma_seen, vec![1.5]);
    }

    #[test]
    fn test_confluent_transition() {
        let mut model = Probe::new(2.0);
        {
            let mut sim = Simulator::new(&mut model);
            sim.initialize(&SimulationClock::new());
            let clock = SimulationClock::with_time(2.0);
            sim.lambda(&clock);
            feed(&mut sim);
            sim.deltfcn(&clock);
        }
        assert_eq!(model.calls, vec!["lambda", "deltint", "deltext(0)"]);
    }

    #[test]
    fn test_clear_empties_ports() {
        let mut model = Probe::new(2.0);
        let mut sim = Simulator::new(&mut model);
        feed(&mut sim);
        sim.component_mut()
            .port_mut(PortId::output(0))
            .add_value(Event::new(2i64));
        sim.clear();
        assert!(sim.component().is_input_empty());
        assert!(sim.component().is_output_empty());
    }
}
