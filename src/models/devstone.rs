//! DEVStone synthetic benchmark models.
//!
//! A DEVStone tree of depth `d` and width `w` nests `d` coupled models. The
//! innermost one holds a single atomic model; every other level holds the
//! next level plus `w - 1` atomic models fed from the level's `iIn` port.
//!
//! | Topology | Extra wiring per level |
//! |----------|------------------------|
//! | LI | none |
//! | HI | atomics chained `oOut -> iIn` |
//! | HO | as HI, plus every atomic drives `oOut2` and `iIn2` feeds the next level |
//!
//! With zero delays and a single value injected on the root `iIn`, the
//! number of external transitions is `1 + (d-1)(w-1)` for LI and
//! `1 + (d-1)(w-1)w/2` for HI and HO.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::atomic::{Atomic, AtomicState};
use crate::coupled::{Coupled, ModelError};
use crate::coupling::ComponentRef;
use crate::port::PortId;
use crate::stats::{Timer, TransitionCounters};
use crate::types::{SimTime, PHASE_ACTIVE};

/// Shape of the wiring inside each level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topology {
    #[serde(rename = "LI")]
    Li,
    #[serde(rename = "HI")]
    Hi,
    #[serde(rename = "HO")]
    Ho,
}

impl Topology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topology::Li => "LI",
            Topology::Hi => "HI",
            Topology::Ho => "HO",
        }
    }

    fn uses_output(&self) -> bool {
        !matches!(self, Topology::Li)
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topology {
    type Err = DevstoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LI" => Ok(Topology::Li),
            "HI" => Ok(Topology::Hi),
            "HO" => Ok(Topology::Ho),
            other => Err(DevstoneError::Topology(other.to_string())),
        }
    }
}

/// Errors raised while building a DEVStone tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DevstoneError {
    #[error("topology error ({0})")]
    Topology(String),

    #[error("dimension error (topology: {topology}, field: {field}, value: {value})")]
    Dimension {
        topology: Topology,
        field: &'static str,
        value: usize,
    },

    #[error("timing config error (field: {field}, value: {value})")]
    Timing { field: &'static str, value: SimTime },

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Delays of a DEVStone atomic model.
///
/// `prep_time` is simulated time spent active after each input.
/// `int_delay` and `ext_delay` are wall-clock milliseconds of busy work in
/// the internal and external transitions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DevstoneTiming {
    pub int_delay: f64,
    pub ext_delay: f64,
    pub prep_time: SimTime,
}

impl DevstoneTiming {
    pub fn new(int_delay: f64, ext_delay: f64, prep_time: SimTime) -> Self {
        Self {
            int_delay,
            ext_delay,
            prep_time,
        }
    }

    pub fn validate(&self) -> Result<(), DevstoneError> {
        let fields = [
            ("int_delay", self.int_delay),
            ("ext_delay", self.ext_delay),
            ("prep_time", self.prep_time),
        ];
        match fields.into_iter().find(|(_, value)| *value < 0.0) {
            Some((field, value)) => Err(DevstoneError::Timing { field, value }),
            None => Ok(()),
        }
    }
}

fn busy_wait(ms: f64) {
    if ms <= 0.0 {
        return;
    }
    let timer = Timer::start();
    while timer.elapsed_ms() < ms {
        std::hint::spin_loop();
    }
}

/// The DEVStone leaf: stays active for `prep_time` after every input and
/// then emits a single `0` when `use_out` is set.
#[derive(Debug)]
pub struct DevstoneAtomic {
    state: AtomicState,
    use_out: bool,
    timing: DevstoneTiming,
    counters: TransitionCounters,
}

impl DevstoneAtomic {
    pub const IN: PortId = PortId::input(0);
    pub const OUT: PortId = PortId::output(0);

    pub fn new(
        name: impl Into<String>,
        timing: DevstoneTiming,
        use_out: bool,
        counters: TransitionCounters,
    ) -> Result<Self, DevstoneError> {
        timing.validate()?;
        let mut state = AtomicState::new(name);
        state.add_in_port("iIn");
        state.add_out_port("oOut");
        Ok(Self {
            state,
            use_out,
            timing,
            counters,
        })
    }
}

impl Atomic for DevstoneAtomic {
    fn state(&self) -> &AtomicState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut AtomicState {
        &mut self.state
    }

    fn initialize(&mut self) {
        self.state.passivate();
    }

    fn deltint(&mut self) {
        self.counters.record_internal();
        busy_wait(self.timing.int_delay);
        self.state.passivate();
    }

    fn deltext(&mut self, _e: SimTime) {
        self.counters.record_external(self.state.port(Self::IN).len());
        busy_wait(self.timing.ext_delay);
        self.state.hold_in(PHASE_ACTIVE, self.timing.prep_time);
    }

    fn deltcon(&mut self, _e: SimTime) {
        self.counters.record_confluent();
        self.deltint();
        self.deltext(0.0);
    }

    fn lambda(&mut self) {
        if self.use_out {
            self.state.port_mut(Self::OUT).add_value(0i64);
        }
    }
}

/// Builds a DEVStone tree named `{name}_{depth-1}`.
///
/// Every atomic model in the tree reports to `counters`.
pub fn devstone(
    name: &str,
    topology: Topology,
    depth: usize,
    width: usize,
    timing: DevstoneTiming,
    counters: &TransitionCounters,
) -> Result<Coupled, DevstoneError> {
    if depth < 1 {
        return Err(DevstoneError::Dimension {
            topology,
            field: "depth",
            value: depth,
        });
    }
    if width < 1 {
        return Err(DevstoneError::Dimension {
            topology,
            field: "width",
            value: width,
        });
    }
    timing.validate()?;

    let mut level = Coupled::new(format!("{}_{}", name, depth - 1));
    let i_in = level.add_in_port("iIn");
    let o_out = level.add_out_port("oOut");
    let (i_in2, o_out2) = match topology {
        Topology::Ho => (Some(level.add_in_port("iIn2")), Some(level.add_out_port("oOut2"))),
        _ => (None, None),
    };

    if depth == 1 {
        let atomic = DevstoneAtomic::new("atomic_0_0", timing, true, counters.clone())?;
        let atomic = level.add_atomic(atomic)?;
        level.add_coupling(ComponentRef::This, i_in, atomic, DevstoneAtomic::IN)?;
        level.add_coupling(atomic, DevstoneAtomic::OUT, ComponentRef::This, o_out)?;
        return Ok(level);
    }

    let inner = devstone(name, topology, depth - 1, width, timing, counters)?;
    let inner_in = inner.component().port_id_by_name("iIn");
    let inner_out = inner.component().port_id_by_name("oOut");
    let inner_in2 = inner.component().port_id_by_name("iIn2");
    let inner = level.add_coupled(inner)?;

    let missing = || {
        DevstoneError::Model(ModelError::InvalidCoupling {
            parent: format!("{}_{}", name, depth - 1),
            reason: "inner level is missing a port".into(),
        })
    };
    level.add_coupling(ComponentRef::This, i_in, inner, inner_in.ok_or_else(missing)?)?;
    level.add_coupling(inner, inner_out.ok_or_else(missing)?, ComponentRef::This, o_out)?;
    if let Some(i_in2) = i_in2 {
        level.add_coupling(ComponentRef::This, i_in2, inner, inner_in2.ok_or_else(missing)?)?;
    }

    let mut previous = None;
    for i in 0..width - 1 {
        let atomic = DevstoneAtomic::new(
            format!("atomic_{}_{}", depth - 1, i),
            timing,
            topology.uses_output(),
            counters.clone(),
        )?;
        let atomic = level.add_atomic(atomic)?;
        level.add_coupling(ComponentRef::This, i_in, atomic, DevstoneAtomic::IN)?;

        if topology != Topology::Li {
            if let Some(previous) = previous {
                level.add_coupling(previous, DevstoneAtomic::OUT, atomic, DevstoneAtomic::IN)?;
            }
            if let Some(o_out2) = o_out2 {
                level.add_coupling(atomic, DevstoneAtomic::OUT, ComponentRef::This, o_out2)?;
            }
        }
        previous = Some(atomic);
    }

    Ok(level)
}

/// Emits `1, 2, ...` on `oOut`: the first value after `prep_time`, then one
/// every `period` until `max_events` values have been sent.
#[derive(Debug)]
pub struct DevstoneGenerator {
    state: AtomicState,
    prep_time: SimTime,
    period: SimTime,
    max_events: u64,
    counter: u64,
}

impl DevstoneGenerator {
    pub const OUT: PortId = PortId::output(0);

    pub fn new(name: impl Into<String>, prep_time: SimTime, period: SimTime, max_events: u64) -> Self {
        let mut state = AtomicState::new(name);
        state.add_out_port("oOut");
        Self {
            state,
            prep_time,
            period,
            max_events,
            counter: 1,
        }
    }
}

impl Atomic for DevstoneGenerator {
    fn state(&self) -> &AtomicState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut AtomicState {
        &mut self.state
    }

    fn initialize(&mut self) {
        self.counter = 1;
        if self.max_events == 0 {
            self.state.passivate();
        } else {
            self.state.hold_in(PHASE_ACTIVE, self.prep_time);
        }
    }

    fn deltint(&mut self) {
        self.counter += 1;
        if self.counter > self.max_events {
            self.state.passivate();
        } else {
            self.state.hold_in(PHASE_ACTIVE, self.period);
        }
    }

    fn deltext(&mut self, _e: SimTime) {
        self.state.passivate();
    }

    fn lambda(&mut self) {
        let value = self.counter as i64;
        self.state.port_mut(Self::OUT).add_value(value);
    }
}

/// A DEVStone tree driven by a [`DevstoneGenerator`], wrapped in a root
/// coupled model named `{name}_bench`. For HO the generator feeds both
/// inputs.
#[allow(clippy::too_many_arguments)]
pub fn devstone_bench(
    name: &str,
    topology: Topology,
    depth: usize,
    width: usize,
    timing: DevstoneTiming,
    period: SimTime,
    max_events: u64,
    counters: &TransitionCounters,
) -> Result<Coupled, DevstoneError> {
    let tree = devstone(name, topology, depth, width, timing, counters)?;
    let tree_in = tree.component().port_id_by_name("iIn");
    let tree_in2 = tree.component().port_id_by_name("iIn2");

    let mut root = Coupled::new(format!("{}_bench", name));
    let generator = root.add_atomic(DevstoneGenerator::new("generator", 0.0, period, max_events))?;
    let tree = root.add_coupled(tree)?;

    for port in [tree_in, tree_in2].into_iter().flatten() {
        root.add_coupling(generator, DevstoneGenerator::OUT, tree, port)?;
    }
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero() -> DevstoneTiming {
        DevstoneTiming::default()
    }

    #[test]
    fn test_topology_parsing() {
        assert_eq!("LI".parse::<Topology>().unwrap(), Topology::Li);
        assert_eq!("HO".parse::<Topology>().unwrap(), Topology::Ho);
        assert_eq!(
            "HOmod".parse::<Topology>(),
            Err(DevstoneError::Topology("HOmod".into()))
        );
        assert_eq!(Topology::Hi.to_string(), "HI");
    }

    #[test]
    fn test_rejects_bad_dimensions_and_timing() {
        let counters = TransitionCounters::new();
        assert!(matches!(
            devstone("d", Topology::Li, 0, 1, zero(), &counters),
            Err(DevstoneError::Dimension { field: "depth", .. })
        ));
        assert!(matches!(
            devstone("d", Topology::Hi, 1, 0, zero(), &counters),
            Err(DevstoneError::Dimension { field: "width", .. })
        ));
        let timing = DevstoneTiming::new(0.0, -1.0, 0.0);
        assert_eq!(
            devstone("d", Topology::Ho, 1, 1, timing, &counters).err(),
            Some(DevstoneError::Timing {
                field: "ext_delay",
                value: -1.0
            })
        );
    }

    #[test]
    fn test_names_follow_depth() {
        let counters = TransitionCounters::new();
        let tree = devstone("LI", Topology::Li, 3, 2, zero(), &counters).unwrap();
        assert_eq!(tree.name(), "LI_2");
        assert!(tree.component_from_path("LI_2.LI_1.LI_0.atomic_0_0").is_some());
        assert!(tree.component_from_path("LI_1.atomic_1_0").is_some());
        assert!(tree.component_from_path("atomic_2_0").is_some());
    }

    #[test]
    fn test_ho_ports() {
        let counters = TransitionCounters::new();
        let tree = devstone("HO", Topology::Ho, 2, 3, zero(), &counters).unwrap();
        let component = tree.component();
        assert!(component.port_by_name("iIn2").is_some());
        assert!(component.port_by_name("oOut2").is_some());
        assert_eq!(tree.eoc().len(), 3);
    }

    #[test]
    fn test_generator_is_bounded() {
        let mut generator = DevstoneGenerator::new("gen", 0.0, 1.0, 2);
        generator.initialize();
        assert_eq!(generator.ta(), 0.0);
        generator.deltint();
        assert_eq!(generator.ta(), 1.0);
        generator.deltint();
        assert!(generator.state().phase_is("passive"));
    }
}
