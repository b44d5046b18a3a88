//! Ports of models and instances.

use crate::constant::Const;
use crate::ids::{InstanceId, ModelId, NetId};
use serde::{Deserialize, Serialize};

/// Direction of a port relative to the node that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Data flows into the node.
    In,
    /// Data flows out of the node.
    Out,
    /// Bidirectional.
    InOut,
}

/// The owner of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Node {
    /// A port on a model's boundary.
    Model(ModelId),
    /// A port on an instance.
    Instance(InstanceId),
}

/// A port: a named connection point on a model or an instance.
///
/// The port is the single place a connection is recorded; the net-side view
/// is an index derived from it by [`Design`](crate::Design).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Port name, unique within its node.
    pub name: String,
    /// The model or instance this port belongs to.
    pub node: Node,
    /// Direction relative to `node`.
    pub direction: Direction,
    /// Value of an unconnected input, for model ports.
    pub default: Option<Const>,
    pub(crate) connection: Option<NetId>,
}

impl Port {
    /// Returns the net this port is connected to.
    pub fn connection(&self) -> Option<NetId> {
        self.connection
    }

    /// Returns whether the port is connected.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Returns whether this port drives its net.
    ///
    /// An instance port drives when it is an output; a model port drives the
    /// model's internal net when it is an input of the model.
    pub fn is_output(&self) -> bool {
        match self.node {
            Node::Instance(_) => self.direction == Direction::Out,
            Node::Model(_) => self.direction == Direction::In,
        }
    }

    /// Returns whether this port is driven by its net.
    pub fn is_input(&self) -> bool {
        match self.node {
            Node::Instance(_) => self.direction == Direction::In,
            Node::Model(_) => self.direction == Direction::Out,
        }
    }

    /// Returns whether the port is bidirectional.
    pub fn is_bidir(&self) -> bool {
        self.direction == Direction::InOut
    }

    /// Returns the owning instance, if this is an instance port.
    pub fn instance(&self) -> Option<InstanceId> {
        match self.node {
            Node::Instance(inst) => Some(inst),
            Node::Model(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(node: Node, direction: Direction) -> Port {
        Port {
            name: "p".into(),
            node,
            direction,
            default: None,
            connection: None,
        }
    }

    #[test]
    fn instance_ports_keep_direction() {
        let node = Node::Instance(InstanceId::from_raw(0));
        assert!(port(node, Direction::Out).is_output());
        assert!(port(node, Direction::In).is_input());
        assert!(!port(node, Direction::In).is_output());
    }

    #[test]
    fn model_ports_are_inverted() {
        let node = Node::Model(ModelId::from_raw(0));
        assert!(port(node, Direction::In).is_output());
        assert!(port(node, Direction::Out).is_input());
    }

    #[test]
    fn inout_is_neither_input_nor_output() {
        let p = port(Node::Model(ModelId::from_raw(0)), Direction::InOut);
        assert!(p.is_bidir());
        assert!(!p.is_input());
        assert!(!p.is_output());
        assert_eq!(p.instance(), None);
    }
}
