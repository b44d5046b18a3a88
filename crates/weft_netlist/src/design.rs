//! The design graph.
//!
//! A [`Design`] owns every model, instance, port, and net in arenas. Each
//! port records its connection; the net-to-ports index is derived from those
//! records and updated by [`connect`](Design::connect) and
//! [`disconnect`](Design::disconnect), the only operations that change
//! connectivity.

use crate::arena::Arena;
use crate::constant::Const;
use crate::error::NetlistError;
use crate::ids::{InstanceId, ModelId, NetId, PortId};
use crate::model::{Instance, Model, Net};
use crate::port::{Direction, Node, Port};
use std::collections::{BTreeMap, BTreeSet};
use weft_fabric::CellKind;

/// A netlist: models, their instances and nets, and the connections between
/// them.
#[derive(Debug, Clone, Default)]
pub struct Design {
    models: Arena<ModelId, Model>,
    instances: Arena<InstanceId, Instance>,
    ports: Arena<PortId, Port>,
    nets: Arena<NetId, Net>,
    net_ports: Vec<BTreeSet<PortId>>,
    model_names: BTreeMap<String, ModelId>,
    top: Option<ModelId>,
    temp_counter: u32,
}

impl Design {
    /// Creates an empty design.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Models ---

    /// Adds a model. Library models pass the primitive kind they describe.
    pub fn add_model(
        &mut self,
        name: impl Into<String>,
        kind: Option<CellKind>,
    ) -> Result<ModelId, NetlistError> {
        let name = name.into();
        if self.model_names.contains_key(&name) {
            return Err(NetlistError::DuplicateModel(name));
        }
        let id = self.models.alloc(Model::new(name.clone(), kind));
        self.model_names.insert(name, id);
        Ok(id)
    }

    /// Looks up a model by name.
    pub fn find_model(&self, name: &str) -> Option<ModelId> {
        self.model_names.get(name).copied()
    }

    /// Returns the first library model describing primitives of `kind`.
    pub fn primitive(&self, kind: CellKind) -> Option<ModelId> {
        self.models
            .iter()
            .find(|(_, m)| m.kind == Some(kind))
            .map(|(id, _)| id)
    }

    /// Returns a model.
    pub fn model(&self, id: ModelId) -> &Model {
        &self.models[id]
    }

    /// Sets a parameter default on a model.
    pub fn set_model_param(&mut self, model: ModelId, name: impl Into<String>, value: Const) {
        self.models[model].params.insert(name.into(), value);
    }

    /// Marks `model` as the user design.
    pub fn set_top(&mut self, model: ModelId) {
        self.top = Some(model);
    }

    /// Returns the user design model, if one was set.
    pub fn top(&self) -> Option<ModelId> {
        self.top
    }

    /// Adds a boundary port to `model`.
    ///
    /// Ports added after a model has been instantiated do not appear on the
    /// existing instances.
    pub fn add_model_port(
        &mut self,
        model: ModelId,
        name: impl Into<String>,
        direction: Direction,
    ) -> PortId {
        let id = self.ports.alloc(Port {
            name: name.into(),
            node: Node::Model(model),
            direction,
            default: None,
            connection: None,
        });
        self.models[model].ports.push(id);
        id
    }

    /// Sets the value a model port takes when an instance leaves it
    /// unconnected.
    pub fn set_port_default(&mut self, port: PortId, value: Const) {
        self.ports[port].default = Some(value);
    }

    /// Looks up a boundary port of `model` by name.
    pub fn find_model_port(&self, model: ModelId, name: &str) -> Option<PortId> {
        self.find_port_in(&self.models[model].ports, name)
    }

    // --- Instances ---

    /// Instantiates library model `of` inside `parent`, creating one port per
    /// model port.
    pub fn add_instance(
        &mut self,
        parent: ModelId,
        of: ModelId,
    ) -> Result<InstanceId, NetlistError> {
        let template = &self.models[of];
        let kind = template
            .kind
            .ok_or_else(|| NetlistError::NotAPrimitive(template.name.clone()))?;
        let shape: Vec<(String, Direction)> = template
            .ports
            .iter()
            .map(|&p| (self.ports[p].name.clone(), self.ports[p].direction))
            .collect();

        let id = self.instances.alloc(Instance {
            model: of,
            parent,
            kind,
            params: BTreeMap::new(),
            attrs: BTreeMap::new(),
            ports: Vec::with_capacity(shape.len()),
        });
        for (name, direction) in shape {
            let port = self.ports.alloc(Port {
                name,
                node: Node::Instance(id),
                direction,
                default: None,
                connection: None,
            });
            self.instances[id].ports.push(port);
        }
        self.models[parent].instances.push(id);
        Ok(id)
    }

    /// Returns an instance.
    pub fn instance(&self, id: InstanceId) -> &Instance {
        &self.instances[id]
    }

    /// Returns the number of instances ever created.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Describes an instance for messages, e.g. `inst3 (ICESTORM_LC)`.
    pub fn instance_label(&self, id: InstanceId) -> String {
        format!("{id} ({})", self.models[self.instances[id].model].name)
    }

    /// Looks up a port of an instance by name.
    pub fn find_instance_port(&self, inst: InstanceId, name: &str) -> Option<PortId> {
        self.find_port_in(&self.instances[inst].ports, name)
    }

    fn find_port_in(&self, ports: &[PortId], name: &str) -> Option<PortId> {
        ports.iter().copied().find(|&p| self.ports[p].name == name)
    }

    /// Sets a parameter on an instance.
    pub fn set_param(&mut self, inst: InstanceId, name: impl Into<String>, value: Const) {
        self.instances[inst].params.insert(name.into(), value);
    }

    /// Returns a parameter of an instance, falling back to the default of
    /// the instantiated model.
    pub fn get_param(&self, inst: InstanceId, name: &str) -> Option<&Const> {
        let instance = &self.instances[inst];
        instance
            .params
            .get(name)
            .or_else(|| self.models[instance.model].params.get(name))
    }

    /// Returns whether a one-bit flag parameter is set. Missing, string, and
    /// empty values read as clear.
    pub fn param_flag(&self, inst: InstanceId, name: &str) -> bool {
        self.get_param(inst, name)
            .and_then(Const::as_bits)
            .is_some_and(|bits| bits.first() == Some(&true))
    }

    /// Sets an attribute on an instance.
    pub fn set_attr(&mut self, inst: InstanceId, name: impl Into<String>, value: impl Into<String>) {
        self.instances[inst].attrs.insert(name.into(), value.into());
    }

    // --- Ports ---

    /// Returns a port.
    pub fn port(&self, id: PortId) -> &Port {
        &self.ports[id]
    }

    /// Returns the model whose nets a port can connect to.
    pub fn port_scope(&self, port: PortId) -> ModelId {
        match self.ports[port].node {
            Node::Model(m) => m,
            Node::Instance(i) => self.instances[i].parent,
        }
    }

    /// Connects `port` to `net`, replacing any previous connection.
    ///
    /// # Panics
    ///
    /// Panics if the net is not a live net of the model the port sees.
    pub fn connect(&mut self, port: PortId, net: NetId) {
        assert!(!self.nets[net].removed, "connecting to removed net {net}");
        assert_eq!(
            self.nets[net].model,
            self.port_scope(port),
            "port {port} and net {net} are in different models"
        );
        self.disconnect(port);
        self.ports[port].connection = Some(net);
        self.net_ports[net.as_raw() as usize].insert(port);
    }

    /// Disconnects `port` from its net, if any.
    pub fn disconnect(&mut self, port: PortId) {
        if let Some(net) = self.ports[port].connection.take() {
            let removed = self.net_ports[net.as_raw() as usize].remove(&port);
            assert!(removed, "net {net} did not list connected port {port}");
        }
    }

    /// Returns the other port on `port`'s net, when the net has exactly two
    /// connections.
    pub fn connection_other_port(&self, port: PortId) -> Option<PortId> {
        let net = self.ports[port].connection?;
        let conns = &self.net_ports[net.as_raw() as usize];
        if conns.len() != 2 {
            return None;
        }
        conns.iter().copied().find(|&p| p != port)
    }

    // --- Nets ---

    /// Returns a net.
    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id]
    }

    /// Returns the number of nets ever created, including removed ones.
    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    /// Returns the ports connected to `net`, in id order.
    pub fn connections(&self, net: NetId) -> &BTreeSet<PortId> {
        &self.net_ports[net.as_raw() as usize]
    }

    /// Returns the first port driving `net`.
    pub fn driver(&self, net: NetId) -> Option<PortId> {
        self.connections(net)
            .iter()
            .copied()
            .find(|&p| self.ports[p].is_output())
    }

    /// Looks up a live net of `model` by name.
    pub fn find_net(&self, model: ModelId, name: &str) -> Option<NetId> {
        self.models[model].nets.get(name).copied()
    }

    /// Returns the net called `name`, creating it if needed.
    pub fn find_or_add_net(&mut self, model: ModelId, name: &str) -> NetId {
        assert!(!name.is_empty(), "net names must not be empty");
        match self.find_net(model, name) {
            Some(net) => net,
            None => self.alloc_net(model, name.to_string()),
        }
    }

    /// Adds a net named `name`, or `name$2`, `name$3`, ... if taken.
    pub fn add_net(&mut self, model: ModelId, name: &str) -> NetId {
        let unique = self.unique_name(model, name, None);
        self.alloc_net(model, unique)
    }

    /// Adds a net with a fresh `$temp$<k>` name.
    pub fn add_temp_net(&mut self, model: ModelId) -> NetId {
        loop {
            let name = format!("$temp${}", self.temp_counter);
            self.temp_counter += 1;
            if !self.models[model].nets.contains_key(&name) {
                return self.alloc_net(model, name);
            }
        }
    }

    /// Renames a net, suffixing `$2`, `$3`, ... if `new_name` is taken or
    /// equals the current name.
    pub fn rename_net(&mut self, net: NetId, new_name: &str) {
        let model = self.nets[net].model;
        let old = self.nets[net].name.clone();
        let unique = self.unique_name(model, new_name, Some(&old));
        let nets = &mut self.models[model].nets;
        nets.remove(&old);
        nets.insert(unique.clone(), net);
        self.nets[net].name = unique;
    }

    fn unique_name(&self, model: ModelId, base: &str, skip: Option<&str>) -> String {
        let nets = &self.models[model].nets;
        let taken = |name: &str| nets.contains_key(name) || skip == Some(name);
        let mut name = base.to_string();
        let mut i = 2;
        while taken(&name) {
            name = format!("{base}${i}");
            i += 1;
        }
        name
    }

    fn alloc_net(&mut self, model: ModelId, name: String) -> NetId {
        let id = self.nets.alloc(Net {
            name: name.clone(),
            model,
            constant: None,
            critical: false,
            removed: false,
        });
        self.net_ports.push(BTreeSet::new());
        self.models[model].nets.insert(name, id);
        id
    }

    /// Drives `net` with a constant level.
    pub fn set_constant(&mut self, net: NetId, level: bool) {
        self.nets[net].constant = Some(level);
    }

    /// Flags `net` as timing-critical.
    pub fn set_critical(&mut self, net: NetId, critical: bool) {
        self.nets[net].critical = critical;
    }

    /// Removes a net from its model.
    ///
    /// # Panics
    ///
    /// Panics if the net still has connections.
    pub fn remove_net(&mut self, net: NetId) {
        assert!(
            self.connections(net).is_empty(),
            "removing net {net} with live connections"
        );
        let model = self.nets[net].model;
        let name = self.nets[net].name.clone();
        self.models[model].nets.remove(&name);
        self.nets[net].removed = true;
    }

    /// Recomputes the net-to-ports index from the port records and checks it
    /// against the maintained one.
    ///
    /// # Panics
    ///
    /// Panics if the two views disagree.
    pub fn assert_consistent(&self) {
        let mut derived = vec![BTreeSet::new(); self.nets.len()];
        for (id, port) in self.ports.iter() {
            if let Some(net) = port.connection {
                derived[net.as_raw() as usize].insert(id);
            }
        }
        for (i, (kept, fresh)) in self.net_ports.iter().zip(&derived).enumerate() {
            assert_eq!(kept, fresh, "connection index of net{i} is out of sync");
        }
    }
}
