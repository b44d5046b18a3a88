//! Models, instances, and nets.

use crate::constant::Const;
use crate::ids::{InstanceId, ModelId, NetId, PortId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use weft_fabric::CellKind;

/// A named collection of ports, nets, and instances.
///
/// The top model is the user design. Library models describe the fabric
/// primitives; they carry a [`CellKind`] and parameter defaults, and have no
/// contents of their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    /// Model name, unique within the design.
    pub name: String,
    /// The primitive kind, for library models.
    pub kind: Option<CellKind>,
    /// Parameter defaults, consulted when an instance does not set one.
    pub params: BTreeMap<String, Const>,
    pub(crate) ports: Vec<PortId>,
    pub(crate) nets: BTreeMap<String, NetId>,
    pub(crate) instances: Vec<InstanceId>,
}

impl Model {
    pub(crate) fn new(name: String, kind: Option<CellKind>) -> Self {
        Self {
            name,
            kind,
            params: BTreeMap::new(),
            ports: Vec::new(),
            nets: BTreeMap::new(),
            instances: Vec::new(),
        }
    }

    /// Returns the boundary ports in declaration order.
    pub fn ports(&self) -> &[PortId] {
        &self.ports
    }

    /// Returns the live nets, keyed by name.
    pub fn nets(&self) -> &BTreeMap<String, NetId> {
        &self.nets
    }

    /// Returns the instances in creation order.
    pub fn instances(&self) -> &[InstanceId] {
        &self.instances
    }
}

/// An instance of a library model inside a parent model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// The model this is an instance of.
    pub model: ModelId,
    /// The model this instance lives in.
    pub parent: ModelId,
    /// The primitive kind, fixed when the instance is created.
    pub kind: CellKind,
    /// Parameters set on this instance.
    pub params: BTreeMap<String, Const>,
    /// Free-form attributes, such as a `loc` constraint.
    pub attrs: BTreeMap<String, String>,
    pub(crate) ports: Vec<PortId>,
}

impl Instance {
    /// Returns the ports in the order of the instantiated model's ports.
    pub fn ports(&self) -> &[PortId] {
        &self.ports
    }

    /// Returns whether the instance itself sets parameter `name`, ignoring
    /// model defaults.
    pub fn self_has_param(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Returns attribute `name`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

/// A net: one electrical node inside a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Net {
    /// Net name, unique among the live nets of its model.
    pub name: String,
    /// The model this net belongs to.
    pub model: ModelId,
    /// Constant logic level driving this net, if any.
    pub constant: Option<bool>,
    /// Whether the net lies on a timing-critical path.
    pub critical: bool,
    pub(crate) removed: bool,
}

impl Net {
    /// Returns whether the net is driven by a constant.
    pub fn is_constant(&self) -> bool {
        self.constant.is_some()
    }

    /// Returns whether the net has been removed from its model.
    pub fn is_removed(&self) -> bool {
        self.removed
    }
}
