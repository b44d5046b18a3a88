//! Carry chain discovery.
//!
//! A chain link is a logic cell whose `COUT` net feeds the `CIN` port of
//! another logic cell. Linked cells must end up in consecutive logic slots of
//! one column, so the placer treats each chain as a single unit.

use crate::error::PnrError;
use std::collections::{BTreeMap, BTreeSet};
use weft_fabric::CellKind;
use weft_netlist::{Design, InstanceId, ModelId};

/// Returns every carry chain of `top` with at least two cells, each ordered
/// from the cell whose `CIN` is outside the chain to the last `COUT`.
///
/// Chains are returned in order of their first cell.
pub(crate) fn carry_chains(design: &Design, top: ModelId) -> Result<Vec<Vec<InstanceId>>, PnrError> {
    let mut next: BTreeMap<InstanceId, InstanceId> = BTreeMap::new();
    let mut has_prev = BTreeSet::new();

    for &inst in design.model(top).instances() {
        if design.instance(inst).kind != CellKind::Logic {
            continue;
        }
        let Some(cout) = design.find_instance_port(inst, "COUT") else {
            continue;
        };
        let Some(net) = design.port(cout).connection() else {
            continue;
        };
        let successors: Vec<InstanceId> = design
            .connections(net)
            .iter()
            .map(|&p| design.port(p))
            .filter(|p| p.name == "CIN")
            .filter_map(|p| p.instance())
            .filter(|&i| i != inst && design.instance(i).kind == CellKind::Logic)
            .collect();
        match successors.as_slice() {
            [] => {}
            [succ] => {
                next.insert(inst, *succ);
                has_prev.insert(*succ);
            }
            _ => {
                return Err(PnrError::IllegalPlacement(format!(
                    "carry out of {} feeds {} carry inputs",
                    design.instance_label(inst),
                    successors.len()
                )))
            }
        }
    }

    let mut chains = Vec::new();
    let mut seen = BTreeSet::new();
    for &head in next.keys() {
        if has_prev.contains(&head) {
            continue;
        }
        let mut chain = vec![head];
        let mut cur = head;
        while let Some(&succ) = next.get(&cur) {
            chain.push(succ);
            cur = succ;
        }
        seen.extend(chain.iter().copied());
        chains.push(chain);
    }

    if let Some(&stuck) = next.keys().find(|i| !seen.contains(i)) {
        return Err(PnrError::IllegalPlacement(format!(
            "carry chain through {} forms a loop",
            design.instance_label(stuck)
        )));
    }
    Ok(chains)
}
