//! Placement and routing results.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use weft_fabric::{SiteId, SwitchId, WireId};
use weft_netlist::{InstanceId, NetId};

/// An assignment of instances to sites.
///
/// The map is kept injective: placing an instance on a site held by another
/// instance is a logic error. Locked instances are never moved by placement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    sites: BTreeMap<InstanceId, SiteId>,
    occupants: BTreeMap<SiteId, InstanceId>,
    locked: BTreeSet<InstanceId>,
}

impl Placement {
    /// Creates an empty placement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts `inst` on `site`, moving it if it was already placed.
    ///
    /// # Panics
    ///
    /// Panics if another instance occupies `site`.
    pub fn place(&mut self, inst: InstanceId, site: SiteId) {
        if let Some(&other) = self.occupants.get(&site) {
            assert_eq!(other, inst, "{site} is already occupied by {other}");
            return;
        }
        if let Some(old) = self.sites.insert(inst, site) {
            self.occupants.remove(&old);
        }
        self.occupants.insert(site, inst);
    }

    /// Places `inst` on `site` and marks it immovable.
    pub fn lock(&mut self, inst: InstanceId, site: SiteId) {
        self.place(inst, site);
        self.locked.insert(inst);
    }

    /// Returns whether `inst` is locked.
    pub fn is_locked(&self, inst: InstanceId) -> bool {
        self.locked.contains(&inst)
    }

    /// Returns the site of `inst`, if placed.
    pub fn site(&self, inst: InstanceId) -> Option<SiteId> {
        self.sites.get(&inst).copied()
    }

    /// Returns the instance on `site`, if any.
    pub fn occupant(&self, site: SiteId) -> Option<InstanceId> {
        self.occupants.get(&site).copied()
    }

    /// Returns the number of placed instances.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Returns whether nothing is placed.
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Iterates over `(instance, site)` pairs in instance order.
    pub fn iter(&self) -> impl Iterator<Item = (InstanceId, SiteId)> + '_ {
        self.sites.iter().map(|(&i, &s)| (i, s))
    }

    /// Iterates over locked instances and their sites.
    pub fn locked(&self) -> impl Iterator<Item = (InstanceId, SiteId)> + '_ {
        self.locked.iter().map(|&i| (i, self.sites[&i]))
    }
}

/// The switches one net uses, each with the input wire it selects.
///
/// An empty route means the driver wire is the sink wire.
pub type NetRoute = BTreeMap<SwitchId, WireId>;

/// The routed design: one [`NetRoute`] per routed net.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingSolution {
    routes: BTreeMap<NetId, NetRoute>,
    passes: usize,
}

impl RoutingSolution {
    pub(crate) fn new(routes: BTreeMap<NetId, NetRoute>, passes: usize) -> Self {
        Self { routes, passes }
    }

    /// Returns the route of `net`, if it was routed.
    pub fn route(&self, net: NetId) -> Option<&NetRoute> {
        self.routes.get(&net)
    }

    /// Iterates over routed nets in id order.
    pub fn iter(&self) -> impl Iterator<Item = (NetId, &NetRoute)> {
        self.routes.iter().map(|(&n, r)| (n, r))
    }

    /// Returns the number of routed nets.
    pub fn net_count(&self) -> usize {
        self.routes.len()
    }

    /// Returns the total number of switches set.
    pub fn switch_count(&self) -> usize {
        self.routes.values().map(BTreeMap::len).sum()
    }

    /// Returns the number of negotiation passes it took to converge.
    pub fn passes(&self) -> usize {
        self.passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(n: u32) -> InstanceId {
        InstanceId::from_raw(n)
    }

    #[test]
    fn replacing_frees_old_site() {
        let mut p = Placement::new();
        let a = SiteId::from_raw(1);
        let b = SiteId::from_raw(2);
        p.place(inst(0), a);
        p.place(inst(0), b);
        assert_eq!(p.site(inst(0)), Some(b));
        assert_eq!(p.occupant(a), None);
        assert_eq!(p.occupant(b), Some(inst(0)));
        assert_eq!(p.len(), 1);
    }

    #[test]
    #[should_panic(expected = "already occupied")]
    fn double_occupancy_panics() {
        let mut p = Placement::new();
        p.place(inst(0), SiteId::from_raw(1));
        p.place(inst(1), SiteId::from_raw(1));
    }

    #[test]
    fn locked_instances_are_listed() {
        let mut p = Placement::new();
        p.lock(inst(2), SiteId::from_raw(5));
        p.place(inst(1), SiteId::from_raw(4));
        assert!(p.is_locked(inst(2)));
        assert!(!p.is_locked(inst(1)));
        assert_eq!(p.locked().collect::<Vec<_>>(), vec![(inst(2), SiteId::from_raw(5))]);
    }

    #[test]
    fn placement_serializes() {
        let mut p = Placement::new();
        p.place(inst(0), SiteId::from_raw(3));
        let json = serde_json::to_string(&p).unwrap();
        let back: Placement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
