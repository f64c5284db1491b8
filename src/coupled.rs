//! Composite models and hierarchical path resolution.
//!
//! A [`Coupled`] model owns its children and the couplings declared on it.
//! Couplings are classified when they are added:
//!
//! - source is the coupled model itself: external input (`eic`)
//! - destination is the coupled model itself: external output (`eoc`)
//! - otherwise: internal (`ic`)
//!
//! Ports anywhere in the tree can be found by dot-separated path, e.g.
//! `"top.proc.out"`. The first segment may name the receiver (absolute
//! path) or one of its children (relative path); a single segment names a
//! port of the receiver.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::atomic::Atomic;
use crate::component::Component;
use crate::coupling::{ComponentRef, Coupling, PortRef, PortResolver};
use crate::port::{Port, PortDirection, PortId};

/// Errors raised while composing a model tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("component '{child}' already exists in '{parent}'")]
    DuplicateName { parent: String, child: String },

    #[error("invalid coupling in '{parent}': {reason}")]
    InvalidCoupling { parent: String, reason: String },
}

/// Index of a child inside its parent coupled model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(usize);

impl ComponentId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// A node of the model tree.
pub enum Model {
    Atomic(Box<dyn Atomic>),
    Coupled(Coupled),
}

impl Model {
    pub fn name(&self) -> &str {
        self.component().name()
    }

    pub fn component(&self) -> &Component {
        match self {
            Model::Atomic(atomic) => atomic.component(),
            Model::Coupled(coupled) => coupled.component(),
        }
    }

    pub fn component_mut(&mut self) -> &mut Component {
        match self {
            Model::Atomic(atomic) => atomic.component_mut(),
            Model::Coupled(coupled) => coupled.component_mut(),
        }
    }

    pub fn as_atomic(&self) -> Option<&dyn Atomic> {
        match self {
            Model::Atomic(atomic) => Some(atomic.as_ref()),
            Model::Coupled(_) => None,
        }
    }

    pub fn as_coupled(&self) -> Option<&Coupled> {
        match self {
            Model::Atomic(_) => None,
            Model::Coupled(coupled) => Some(coupled),
        }
    }

    pub fn is_coupled(&self) -> bool {
        matches!(self, Model::Coupled(_))
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Model::Atomic(atomic) => f.debug_tuple("Atomic").field(&atomic.state()).finish(),
            Model::Coupled(coupled) => f.debug_tuple("Coupled").field(coupled).finish(),
        }
    }
}

impl From<Coupled> for Model {
    fn from(coupled: Coupled) -> Self {
        Model::Coupled(coupled)
    }
}

impl From<Box<dyn Atomic>> for Model {
    fn from(atomic: Box<dyn Atomic>) -> Self {
        Model::Atomic(atomic)
    }
}

/// A borrowed view of a node found by path. Unlike [`Model`] it can also
/// refer to the receiver of the lookup.
#[derive(Clone, Copy)]
pub enum ModelRef<'a> {
    Atomic(&'a dyn Atomic),
    Coupled(&'a Coupled),
}

impl<'a> ModelRef<'a> {
    pub fn name(&self) -> &'a str {
        self.component().name()
    }

    pub fn component(&self) -> &'a Component {
        match *self {
            ModelRef::Atomic(atomic) => atomic.component(),
            ModelRef::Coupled(coupled) => coupled.component(),
        }
    }

    pub fn is_coupled(&self) -> bool {
        matches!(self, ModelRef::Coupled(_))
    }
}

impl<'a> From<&'a Model> for ModelRef<'a> {
    fn from(model: &'a Model) -> Self {
        match model {
            Model::Atomic(atomic) => ModelRef::Atomic(atomic.as_ref()),
            Model::Coupled(coupled) => ModelRef::Coupled(coupled),
        }
    }
}

/// A resolved port address: the chain of child indices from the root of the
/// lookup down to the owning component, plus the port handle.
///
/// Locators are computed once and stay valid for the lifetime of the tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortLocator {
    pub route: Vec<usize>,
    pub port: PortId,
}

/// Read access to ports by [`PortLocator`].
pub trait PortSource {
    fn port_at(&self, locator: &PortLocator) -> Option<&Port>;
}

/// Structural size of a model tree, receiver included.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeCounts {
    pub atomics: usize,
    pub coupleds: usize,
    pub eic: usize,
    pub ic: usize,
    pub eoc: usize,
}

/// A composite model.
#[derive(Debug, Default)]
pub struct Coupled {
    pub(crate) component: Component,
    pub(crate) components: Vec<Model>,
    pub(crate) ic: Vec<Coupling>,
    pub(crate) eic: Vec<Coupling>,
    pub(crate) eoc: Vec<Coupling>,
}

impl Coupled {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            component: Component::new(name),
            ..Default::default()
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

    pub fn add_in_port(&mut self, name: impl Into<String>) -> PortId {
        self.component.add_in_port(name)
    }

    pub fn add_out_port(&mut self, name: impl Into<String>) -> PortId {
        self.component.add_out_port(name)
    }

    pub fn port(&self, id: PortId) -> &Port {
        self.component.port(id)
    }

    pub fn port_mut(&mut self, id: PortId) -> &mut Port {
        self.component.port_mut(id)
    }

    /// Adds a child and returns its id.
    ///
    /// Fails if a sibling already uses the same name, since names are what
    /// path resolution walks.
    pub fn add_component(&mut self, model: impl Into<Model>) -> Result<ComponentId, ModelError> {
        let model = model.into();
        if self.child_id(model.name()).is_some() {
            return Err(ModelError::DuplicateName {
                parent: self.name().to_string(),
                child: model.name().to_string(),
            });
        }
        self.components.push(model);
        Ok(ComponentId(self.components.len() - 1))
    }

    /// Adds an atomic child.
    pub fn add_atomic<A: Atomic + 'static>(&mut self, atomic: A) -> Result<ComponentId, ModelError> {
        self.add_component(Model::Atomic(Box::new(atomic)))
    }

    /// Adds a coupled child.
    pub fn add_coupled(&mut self, coupled: Coupled) -> Result<ComponentId, ModelError> {
        self.add_component(Model::Coupled(coupled))
    }

    /// Declares a coupling from `from_port` of `from` to `to_port` of `to`.
    ///
    /// Use [`ComponentRef::This`] for the coupled model itself. The coupling
    /// is classified by its endpoints and checked against the allowed port
    /// directions:
    ///
    /// - external input: own input port to a child input port
    /// - internal: child output port to a child input port
    /// - external output: child output port to own output port
    pub fn add_coupling(
        &mut self,
        from: impl Into<ComponentRef>,
        from_port: PortId,
        to: impl Into<ComponentRef>,
        to_port: PortId,
    ) -> Result<(), ModelError> {
        let from = PortRef::new(from, from_port);
        let to = PortRef::new(to, to_port);

        let (expected_from, expected_to) = match (from.owner, to.owner) {
            (ComponentRef::This, ComponentRef::This) => {
                return Err(self.invalid_coupling("both ends are the coupled model itself".into()));
            }
            (ComponentRef::This, ComponentRef::Child(_)) => (PortDirection::In, PortDirection::In),
            (ComponentRef::Child(_), ComponentRef::This) => (PortDirection::Out, PortDirection::Out),
            (ComponentRef::Child(_), ComponentRef::Child(_)) => (PortDirection::Out, PortDirection::In),
        };
        self.check_endpoint(&from, expected_from)?;
        self.check_endpoint(&to, expected_to)?;

        let coupling = Coupling::new(from, to);
        match (from.owner, to.owner) {
            (ComponentRef::This, _) => self.eic.push(coupling),
            (_, ComponentRef::This) => self.eoc.push(coupling),
            _ => self.ic.push(coupling),
        }
        Ok(())
    }

    fn check_endpoint(&self, end: &PortRef, direction: PortDirection) -> Result<(), ModelError> {
        let component = match end.owner {
            ComponentRef::This => &self.component,
            ComponentRef::Child(id) => match self.components.get(id.0) {
                Some(child) => child.component(),
                None => {
                    return Err(self.invalid_coupling(format!("no child with index {}", id.0)));
                }
            },
        };
        if !component.has_port(end.port) {
            return Err(self.invalid_coupling(format!(
                "'{}' has no port {:?}",
                component.name(),
                end.port
            )));
        }
        if end.port.direction != direction {
            return Err(self.invalid_coupling(format!(
                "port '{}' of '{}' must be {:?}",
                component.port(end.port).name(),
                component.name(),
                direction
            )));
        }
        Ok(())
    }

    fn invalid_coupling(&self, reason: String) -> ModelError {
        ModelError::InvalidCoupling {
            parent: self.name().to_string(),
            reason,
        }
    }

    pub fn components(&self) -> &[Model] {
        &self.components
    }

    pub fn child(&self, id: ComponentId) -> Option<&Model> {
        self.components.get(id.0)
    }

    pub fn child_mut(&mut self, id: ComponentId) -> Option<&mut Model> {
        self.components.get_mut(id.0)
    }

    /// Finds a direct child by name.
    pub fn child_id(&self, name: &str) -> Option<ComponentId> {
        self.components
            .iter()
            .position(|c| c.name() == name)
            .map(ComponentId)
    }

    pub fn ic(&self) -> &[Coupling] {
        &self.ic
    }

    pub fn eic(&self) -> &[Coupling] {
        &self.eic
    }

    pub fn eoc(&self) -> &[Coupling] {
        &self.eoc
    }

    /// Counts models and couplings in the whole subtree.
    pub fn counts(&self) -> TreeCounts {
        let mut counts = TreeCounts {
            atomics: 0,
            coupleds: 1,
            eic: self.eic.len(),
            ic: self.ic.len(),
            eoc: self.eoc.len(),
        };
        for child in &self.components {
            match child {
                Model::Atomic(_) => counts.atomics += 1,
                Model::Coupled(coupled) => {
                    let sub = coupled.counts();
                    counts.atomics += sub.atomics;
                    counts.coupleds += sub.coupleds;
                    counts.eic += sub.eic;
                    counts.ic += sub.ic;
                    counts.eoc += sub.eoc;
                }
            }
        }
        counts
    }

    /// Resolves a component by path. Returns `None` if any segment is
    /// missing or an intermediate segment is not a coupled model.
    pub fn component_from_path(&self, path: &str) -> Option<ModelRef<'_>> {
        let segments = split_path(path)?;
        if segments[0] == self.name() {
            if segments.len() == 1 {
                return Some(ModelRef::Coupled(self));
            }
            if let Some(found) = self.walk_components(&segments[1..]) {
                return Some(found);
            }
        }
        self.walk_components(&segments)
    }

    fn walk_components(&self, segments: &[&str]) -> Option<ModelRef<'_>> {
        let (last, intermediate) = segments.split_last()?;
        let mut current = self;
        for name in intermediate {
            current = current.child(current.child_id(name)?)?.as_coupled()?;
        }
        current.child(current.child_id(last)?).map(ModelRef::from)
    }

    /// Resolves a port path to a reusable [`PortLocator`].
    pub fn locate_port(&self, path: &str) -> Option<PortLocator> {
        let segments = split_path(path)?;
        if segments.len() > 1 && segments[0] == self.name() {
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
        let mut component = &self.component;

        for (depth, name) in owners.iter().enumerate() {
            let id = current.child_id(name)?;
            route.push(id.0);
            match &current.components[id.0] {
                Model::Coupled(coupled) => {
                    current = coupled;
                    component = &coupled.component;
                }
                Model::Atomic(atomic) => {
                    // An atomic model can only be the last owner on the path.
                    if depth + 1 != owners.len() {
                        return None;
                    }
                    component = atomic.component();
                }
            }
        }

        let port = component.port_id_by_name(port_name)?;
        Some(PortLocator { route, port })
    }

    /// Resolves a port by path.
    pub fn port_from_path(&self, path: &str) -> Option<&Port> {
        let locator = self.locate_port(path)?;
        self.port_at(&locator)
    }
}

impl PortSource for Coupled {
    fn port_at(&self, locator: &PortLocator) -> Option<&Port> {
        let mut current = Some(self);
        let mut component = &self.component;
        for &index in &locator.route {
            match current?.components.get(index)? {
                Model::Coupled(coupled) => {
                    current = Some(coupled);
                    component = &coupled.component;
                }
                Model::Atomic(atomic) => {
                    current = None;
                    component = atomic.component();
                }
            }
        }
        component.get_port(locator.port)
    }
}

impl PortResolver for Coupled {
    fn resolve(&self, port: &PortRef) -> Option<&Port> {
        match port.owner {
            ComponentRef::This => self.component.get_port(port.port),
            ComponentRef::Child(id) => self.components.get(id.0)?.component().get_port(port.port),
        }
    }

    fn resolve_mut(&mut self, port: &PortRef) -> Option<&mut Port> {
        match port.owner {
            ComponentRef::This => self.component.get_port_mut(port.port),
            ComponentRef::Child(id) => self
                .components
                .get_mut(id.0)?
                .component_mut()
                .get_port_mut(port.port),
        }
    }
}

/// Splits a dotted path, rejecting empty paths and empty segments.
pub(crate) fn split_path(path: &str) -> Option<Vec<&str>> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(segments)
}
