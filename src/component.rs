//! The structural part shared by every model: a name and its ports.

use crate::port::{Port, PortDirection, PortId};

/// A named node of the model tree with its declared input and output ports.
///
/// Every concrete model embeds one `Component`. Ports are declared once,
/// while the model is built, and addressed afterwards through [`PortId`]
/// handles.
#[derive(Clone, Debug, Default)]
pub struct Component {
    name: String,
    in_ports: Vec<Port>,
    out_ports: Vec<Port>,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            in_ports: Vec::new(),
            out_ports: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declares a new input port and returns its handle.
    pub fn add_in_port(&mut self, name: impl Into<String>) -> PortId {
        self.in_ports.push(Port::new(name));
        PortId::input(self.in_ports.len() - 1)
    }

    /// Declares a new output port and returns its handle.
    pub fn add_out_port(&mut self, name: impl Into<String>) -> PortId {
        self.out_ports.push(Port::new(name));
        PortId::output(self.out_ports.len() - 1)
    }

    /// Returns true if `id` refers to a port declared on this component.
    pub fn has_port(&self, id: PortId) -> bool {
        self.get_port(id).is_some()
    }

    /// Looks up a port, returning `None` for a stale handle.
    pub fn get_port(&self, id: PortId) -> Option<&Port> {
        match id.direction {
            PortDirection::In => self.in_ports.get(id.index),
            PortDirection::Out => self.out_ports.get(id.index),
        }
    }

    pub fn get_port_mut(&mut self, id: PortId) -> Option<&mut Port> {
        match id.direction {
            PortDirection::In => self.in_ports.get_mut(id.index),
            PortDirection::Out => self.out_ports.get_mut(id.index),
        }
    }

    /// Returns the port behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this component. Handles returned by
    /// `add_in_port`/`add_out_port` are always valid.
    pub fn port(&self, id: PortId) -> &Port {
        match id.direction {
            PortDirection::In => &self.in_ports[id.index],
            PortDirection::Out => &self.out_ports[id.index],
        }
    }

    /// Mutable counterpart of [`port`](Self::port).
    pub fn port_mut(&mut self, id: PortId) -> &mut Port {
        match id.direction {
            PortDirection::In => &mut self.in_ports[id.index],
            PortDirection::Out => &mut self.out_ports[id.index],
        }
    }

    /// Finds a port by name, input ports first.
    pub fn port_id_by_name(&self, name: &str) -> Option<PortId> {
        if let Some(index) = self.in_ports.iter().position(|p| p.name() == name) {
            return Some(PortId::input(index));
        }
        self.out_ports
            .iter()
            .position(|p| p.name() == name)
            .map(PortId::output)
    }

    pub fn port_by_name(&self, name: &str) -> Option<&Port> {
        self.port_id_by_name(name).map(|id| self.port(id))
    }

    pub fn in_ports(&self) -> &[Port] {
        &self.in_ports
    }

    pub fn out_ports(&self) -> &[Port] {
        &self.out_ports
    }

    /// Returns true when no input port holds an event.
    pub fn is_input_empty(&self) -> bool {
        self.in_ports.iter().all(Port::is_empty)
    }

    /// Returns true when no output port holds an event.
    pub fn is_output_empty(&self) -> bool {
        self.out_ports.iter().all(Port::is_empty)
    }

    /// Empties every input and output port.
    pub fn clear_ports(&mut self) {
        self.in_ports.iter_mut().for_each(Port::clear);
        self.out_ports.iter_mut().for_each(Port::clear);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;

    fn component() -> (Component, PortId, PortId) {
        let mut c = Component::new("proc");
        let i = c.add_in_port("in");
        let o = c.add_out_port("out");
        (c, i, o)
    }

    #[test]
    fn test_port_declaration() {
        let (c, i, o) = component();
        assert_eq!(c.name(), "proc");
        assert_eq!(i, PortId::input(0));
        assert_eq!(o, PortId::output(0));
        assert_eq!(c.port(i).name(), "in");
        assert_eq!(c.port(o).name(), "out");
        assert!(!c.has_port(PortId::input(1)));
    }

    #[test]
    fn test_port_lookup_by_name() {
        let mut c = Component::new("dup");
        c.add_out_port("x");
        let input = c.add_in_port("x");
        assert_eq!(c.port_id_by_name("x"), Some(input));
        assert!(c.port_by_name("missing").is_none());
    }

    #[test]
    fn test_input_empty_and_clear() {
        let (mut c, i, o) = component();
        assert!(c.is_input_empty());

        c.port_mut(i).add_value(Event::new(1i64));
        c.port_mut(o).add_value(Event::new(2i64));
        assert!(!c.is_input_empty());
        assert!(!c.is_output_empty());

        c.clear_ports();
        assert!(c.is_input_empty());
        assert!(c.is_output_empty());
    }
}
