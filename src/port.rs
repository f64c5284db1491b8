//! Ports: the per-cycle event buffers owned by models.

use serde::{Deserialize, Serialize};

use crate::event::{Event, Value};

/// Whether a port receives or emits events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    In,
    Out,
}

/// Handle to a port declared on a [`Component`](crate::component::Component).
///
/// Handles are returned by `add_in_port`/`add_out_port` and stay valid for
/// the lifetime of the component; the tree is never restructured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortId {
    pub direction: PortDirection,
    pub index: usize,
}

impl PortId {
    pub const fn input(index: usize) -> Self {
        Self {
            direction: PortDirection::In,
            index,
        }
    }

    pub const fn output(index: usize) -> Self {
        Self {
            direction: PortDirection::Out,
            index,
        }
    }

    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::In
    }

    pub fn is_output(&self) -> bool {
        self.direction == PortDirection::Out
    }
}

/// An ordered collection of the events produced on one port during the
/// current cycle.
///
/// Insertion order is preserved and duplicates are allowed, since several
/// couplings may fan into the same port.
#[derive(Clone, Debug, Default)]
pub struct Port {
    name: String,
    values: Vec<Event>,
}

impl Port {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends one event.
    pub fn add_value(&mut self, event: impl Into<Event>) {
        self.values.push(event.into());
    }

    /// Appends a batch of events, keeping their order.
    pub fn add_values<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = Event>,
    {
        self.values.extend(events);
    }

    /// Events received this cycle, in arrival order.
    pub fn values(&self) -> &[Event] {
        &self.values
    }

    /// The first event of this cycle.
    ///
    /// Callers check [`is_empty`](Self::is_empty) first; an empty port yields
    /// `None` rather than panicking.
    pub fn single_value(&self) -> Option<&Event> {
        self.values.first()
    }

    /// Convenience accessor for the payload of [`single_value`](Self::single_value).
    pub fn single_payload(&self) -> Option<&Value> {
        self.single_value().map(Event::value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drops every event held by this port.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_starts_empty() {
        let port = Port::new("in");
        assert_eq!(port.name(), "in");
        assert!(port.is_empty());
        assert!(port.single_value().is_none());
    }

    #[test]
    fn test_port_preserves_order_and_duplicates() {
        let mut port = Port::new("in");
        let shared = Event::new(1i64);
        port.add_value(shared.clone());
        port.add_value(2i64);
        port.add_value(shared.clone());

        let ints: Vec<i64> = port
            .values()
            .iter()
            .filter_map(|e| e.value().as_integer())
            .collect();
        assert_eq!(ints, vec![1, 2, 1]);
        assert_eq!(port.single_payload(), Some(&Value::Integer(1)));
        assert_eq!(shared.share_count(), 3);
    }

    #[test]
    fn test_add_values_batch() {
        let mut port = Port::new("out");
        port.add_values(vec![Event::new(1.0f64), Event::new(2.0f64)]);
        assert_eq!(port.len(), 2);
    }

    #[test]
    fn test_clear_releases_payloads() {
        let event = Event::new(true);
        let mut port = Port::new("out");
        port.add_value(event.clone());
        assert_eq!(event.share_count(), 2);

        port.clear();
        assert!(port.is_empty());
        assert_eq!(event.share_count(), 1);
    }

    #[test]
    fn test_port_id_direction() {
        assert!(PortId::input(0).is_input());
        assert!(PortId::output(3).is_output());
        assert_ne!(PortId::input(1), PortId::output(1));
    }
}
