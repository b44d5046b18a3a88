//! Whole-model cleanup and well-formedness checks.

use crate::design::Design;
use crate::error::NetlistError;
use crate::ids::{ModelId, NetId, PortId};
use crate::port::Node;
use std::collections::BTreeSet;
use weft_fabric::CellKind;

impl Design {
    /// Returns whether `port` is the pad pin of an I/O or PLL instance.
    fn is_pad_pin(&self, port: PortId) -> bool {
        let p = self.port(port);
        match p.node {
            Node::Instance(inst) => match self.instance(inst).kind {
                CellKind::Io => p.name == "PACKAGE_PIN",
                CellKind::Pll => p.name == "PACKAGEPIN",
                _ => false,
            },
            Node::Model(_) => false,
        }
    }

    /// Returns the nets of `model` that tie one of its boundary ports
    /// straight to a package pad.
    ///
    /// These nets leave the fabric through dedicated pad wiring and are
    /// neither checked for drivers nor routed.
    pub fn boundary_nets(&self, model: ModelId) -> BTreeSet<NetId> {
        self.model(model)
            .ports()
            .iter()
            .filter_map(|&p| {
                let net = self.port(p).connection()?;
                let other = self.connection_other_port(p)?;
                self.is_pad_pin(other).then_some(net)
            })
            .collect()
    }

    /// Removes nets of `model` that cannot carry a signal.
    ///
    /// A net is kept only if it has an input, has a driver (a constant
    /// counts), and has more than one distinct connection (a constant counts
    /// as one). Everything else is disconnected and removed. Returns the
    /// number of nets removed.
    pub fn prune(&mut self, model: ModelId) -> usize {
        let nets: Vec<NetId> = self.model(model).nets().values().copied().collect();
        let mut removed = 0;
        for net in nets {
            let mut distinct = self.connections(net).len();
            let mut driver = false;
            if self.net(net).is_constant() {
                driver = true;
                distinct += 1;
            }
            let mut input = false;
            for &p in self.connections(net) {
                let port = self.port(p);
                input |= port.is_input() || port.is_bidir();
                driver |= port.is_output() || port.is_bidir();
            }
            if input && driver && distinct > 1 {
                continue;
            }

            let ports: Vec<PortId> = self.connections(net).iter().copied().collect();
            for p in ports {
                self.disconnect(p);
            }
            tracing::trace!(net = %self.net(net).name, "pruned");
            self.remove_net(net);
            removed += 1;
        }
        if removed > 0 {
            tracing::debug!(model = %self.model(model).name, removed, "pruned dangling nets");
        }
        removed
    }

    /// Checks that every net of `model` is well formed.
    ///
    /// Bidirectional model ports must connect straight to a pad pin. Every
    /// other net needs exactly one driver (a constant counts) and at least
    /// one input. Returns every violation found, in net-name order.
    pub fn check(&self, model: ModelId) -> Vec<NetlistError> {
        let mut errors = Vec::new();

        for &p in self.model(model).ports() {
            let port = self.port(p);
            let Some(net) = port.connection() else {
                continue;
            };
            if port.is_bidir()
                && !self
                    .connection_other_port(p)
                    .is_some_and(|q| self.is_pad_pin(q))
            {
                errors.push(NetlistError::IllegalBidir {
                    port: port.name.clone(),
                    net: self.net(net).name.clone(),
                });
            }
        }

        let boundary = self.boundary_nets(model);
        for (name, &net) in self.model(model).nets() {
            if self.connections(net).is_empty() {
                errors.push(NetlistError::Unconnected(name.clone()));
                continue;
            }
            if boundary.contains(&net) {
                continue;
            }

            let mut drivers = usize::from(self.net(net).is_constant());
            let mut input = false;
            for &p in self.connections(net) {
                let port = self.port(p);
                if port.is_bidir() {
                    errors.push(NetlistError::IllegalBidir {
                        port: port.name.clone(),
                        net: name.clone(),
                    });
                }
                input |= port.is_input();
                drivers += usize::from(port.is_output());
            }
            if drivers != 1 {
                errors.push(NetlistError::DriverCount {
                    net: name.clone(),
                    drivers,
                });
            }
            if !input {
                errors.push(NetlistError::NoInput(name.clone()));
            }
        }
        errors
    }
}
