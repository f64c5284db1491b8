//! Composite simulator: drives a coupled model and its subtree.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::clock::SimulationClock;
use crate::component::Component;
use crate::coupled::{split_path, Coupled, Model, PortLocator, PortSource};
use crate::coupling::{ComponentRef, Coupling, PortRef, PortResolver};
use crate::executor::{AbstractSimulator, Simulator};
use crate::port::{Port, PortId};
use crate::types::{SimTime, INFINITY};

/// Drives a [`Coupled`] model.
///
/// One child simulator is built per child component when the coordinator is
/// created: a [`Simulator`] for atomic children and a nested `Coordinator`
/// for coupled ones. The coordinator borrows the tree for the whole run and
/// never changes its structure.
pub struct Coordinator<'a> {
    component: &'a mut Component,
    ic: &'a [Coupling],
    eic: &'a [Coupling],
    eoc: &'a [Coupling],
    simulators: Vec<AbstractSimulator<'a>>,
    tl: SimTime,
    tn: SimTime,
}

impl<'a> Coordinator<'a> {
    pub fn new(model: &'a mut Coupled) -> Self {
        let Coupled {
            component,
            components,
            ic,
            eic,
            eoc,
        } = model;

        let simulators = components
            .iter_mut()
            .map(|child| match child {
                Model::Atomic(atomic) => AbstractSimulator::Simulator(Simulator::new(&mut **atomic)),
                Model::Coupled(coupled) => AbstractSimulator::Coordinator(Coordinator::new(coupled)),
            })
            .collect();

        let ic: &'a Vec<Coupling> = ic;
        let eic: &'a Vec<Coupling> = eic;
        let eoc: &'a Vec<Coupling> = eoc;

        Self {
            component,
            ic,
            eic,
            eoc,
            simulators,
            tl: 0.0,
            tn: INFINITY,
        }
    }

    pub fn initialize(&mut self, clock: &SimulationClock) {
        for simulator in &mut self.simulators {
            simulator.initialize(clock);
        }
        self.tl = clock.time();
        self.tn = self.tl + self.ta(clock);
    }

    pub fn exit(&mut self) {
        for simulator in &mut self.simulators {
            simulator.exit();
        }
    }

    /// Time until the earliest child transition.
    pub fn ta(&self, clock: &SimulationClock) -> SimTime {
        let tn = self
            .simulators
            .iter()
            .map(AbstractSimulator::tn)
            .fold(INFINITY, SimTime::min);
        tn - clock.time()
    }

    /// Runs every child's output function, then moves the results along
    /// internal and external output couplings.
    pub fn lambda(&mut self, clock: &SimulationClock) {
        #[cfg(feature = "parallel")]
        self.simulators.par_iter_mut().for_each(|s| s.lambda(clock));
        #[cfg(not(feature = "parallel"))]
        self.simulators.iter_mut().for_each(|s| s.lambda(clock));

        self.propagate_output();
    }

    /// Internal couplings run before external output couplings, so a value
    /// can cross a sibling and leave the coupled model in the same cycle.
    pub fn propagate_output(&mut self) {
        let (ic, eoc) = (self.ic, self.eoc);
        for coupling in ic.iter().chain(eoc) {
            coupling.propagate_values(self);
        }
    }

    /// Delivers external input to the children, then runs their transitions.
    pub fn deltfcn(&mut self, clock: &SimulationClock) {
        self.propagate_input();

        #[cfg(feature = "parallel")]
        self.simulators.par_iter_mut().for_each(|s| s.deltfcn(clock));
        #[cfg(not(feature = "parallel"))]
        self.simulators.iter_mut().for_each(|s| s.deltfcn(clock));

        self.tl = clock.time();
        self.tn = self.tl + self.ta(clock);
    }

    pub fn propagate_input(&mut self) {
        let eic = self.eic;
        for coupling in eic {
            coupling.propagate_values(self);
        }
    }

    /// Clears every child, then this model's own ports.
    pub fn clear(&mut self) {
        for simulator in &mut self.simulators {
            simulator.clear();
        }
        self.component.clear_ports();
    }

    pub fn tl(&self) -> SimTime {
        self.tl
    }

    pub fn tn(&self) -> SimTime {
        self.tn
    }

    pub fn component(&self) -> &Component {
        &*self.component
    }

    pub fn component_mut(&mut self) -> &mut Component {
        &mut *self.component
    }

    pub fn simulators(&self) -> &[AbstractSimulator<'a>] {
        &self.simulators
    }

    /// Resolves a port path against the live tree, with the same rules as
    /// [`Coupled::locate_port`].
    pub fn locate_port(&self, path: &str) -> Option<PortLocator> {
        let segments = split_path(path)?;
        if segments.len() > 1 && segments[0] == self.component.name() {
            if let Some(locator) = self.walk_port(&segments[1..]) {
                return Some(locator);
            }
        }
        self.walk_port(&segments)
    }

    fn walk_port(&self, segments: &[&str]) -> Option<PortLocator> {
        let (port_name, owners) = segments.split_last()?;
        let mut route = Vec::with_capacity(owners.len());
        let mut current = self;
        let mut component: &Component = self.component();

        for (depth, name) in owners.iter().enumerate() {
            let index = current
                .simulators
                .iter()
                .position(|s| s.component().name() == *name)?;
            route.push(index);
            match &current.simulators[index] {
                AbstractSimulator::Coordinator(coordinator) => {
                    current = coordinator;
                    component = coordinator.component();
                }
                AbstractSimulator::Simulator(simulator) => {
                    if depth + 1 != owners.len() {
                        return None;
                    }
                    component = simulator.component();
                }
            }
        }

        let port = component.port_id_by_name(port_name)?;
        Some(PortLocator { route, port })
    }

    pub fn port_from_path(&self, path: &str) -> Option<&Port> {
        let locator = self.locate_port(path)?;
        self.port_at(&locator)
    }

    fn port_along(&self, route: &[usize], port: PortId) -> Option<&Port> {
        match route.split_first() {
            None => self.component().get_port(port),
            Some((&index, rest)) => match self.simulators.get(index)? {
                AbstractSimulator::Coordinator(coordinator) => coordinator.port_along(rest, port),
                AbstractSimulator::Simulator(simulator) if rest.is_empty() => {
                    simulator.component().get_port(port)
                }
                AbstractSimulator::Simulator(_) => None,
            },
        }
    }

    /// Mutable access to one of this model's own ports.
    pub fn port_mut(&mut self, port: PortId) -> Option<&mut Port> {
        self.component.get_port_mut(port)
    }
}

impl PortSource for Coordinator<'_> {
    fn port_at(&self, locator: &PortLocator) -> Option<&Port> {
        self.port_along(&locator.route, locator.port)
    }
}

impl PortResolver for Coordinator<'_> {
    fn resolve(&self, port: &PortRef) -> Option<&Port> {
        match port.owner {
            ComponentRef::This => self.component().get_port(port.port),
            ComponentRef::Child(id) => self
                .simulators
                .get(id.index())?
                .component()
                .get_port(port.port),
        }
    }

    fn resolve_mut(&mut self, port: &PortRef) -> Option<&mut Port> {
        match port.owner {
            ComponentRef::This => self.component.get_port_mut(port.port),
            ComponentRef::Child(id) => self
                .simulators
                .get_mut(id.index())?
                .component_mut()
                .get_port_mut(port.port),
        }
    }
}
