//! Directional port-to-port links.

use serde::{Deserialize, Serialize};

use crate::coupled::ComponentId;
use crate::event::Event;
use crate::port::{Port, PortId};

/// The component side of a port reference, seen from the coupled model that
/// declares the coupling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentRef {
    /// The enclosing coupled model itself.
    This,
    /// One of its children.
    Child(ComponentId),
}

impl From<ComponentId> for ComponentRef {
    fn from(id: ComponentId) -> Self {
        ComponentRef::Child(id)
    }
}

/// A non-owning reference to a port, relative to a coupled model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub owner: ComponentRef,
    pub port: PortId,
}

impl PortRef {
    pub fn new(owner: impl Into<ComponentRef>, port: PortId) -> Self {
        Self {
            owner: owner.into(),
            port,
        }
    }
}

/// Something that can hand out the ports a coupling refers to.
///
/// Implemented by [`Coupled`](crate::coupled::Coupled) for the static tree
/// and by [`Coordinator`](crate::executor::Coordinator) during a run.
pub trait PortResolver {
    fn resolve(&self, port: &PortRef) -> Option<&Port>;

    fn resolve_mut(&mut self, port: &PortRef) -> Option<&mut Port>;
}

/// A directional link between two ports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupling {
    from: PortRef,
    to: PortRef,
}

impl Coupling {
    pub fn new(from: PortRef, to: PortRef) -> Self {
        Self { from, to }
    }

    pub fn from(&self) -> &PortRef {
        &self.from
    }

    pub fn to(&self) -> &PortRef {
        &self.to
    }

    /// Copies every event on the source port onto the destination port.
    ///
    /// Events are shared, not duplicated, and the source keeps its values
    /// until its owner is cleared.
    pub fn propagate_values<R: PortResolver + ?Sized>(&self, ports: &mut R) {
        let values: Vec<Event> = match ports.resolve(&self.from) {
            Some(source) if !source.is_empty() => source.values().to_vec(),
            _ => return,
        };
        if let Some(destination) = ports.resolve_mut(&self.to) {
            destination.add_values(values);
        }
    }
}
