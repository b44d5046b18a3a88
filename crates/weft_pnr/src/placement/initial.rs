//! Initial placement.
//!
//! Locked instances go first, then chains with locked members lined up
//! around those members, then the remaining carry chains (longest first)
//! into the first free column run that holds them, then I/O instances onto
//! bank-compatible sites. Logic cells with flip-flop controls follow,
//! grouped by control set so that cells sharing a clock fill a tile
//! together. Everything else goes onto random free sites of its kind.

use crate::error::PnrError;
use crate::placement::context::{PlaceContext, LOGIC_SLOTS};
use crate::placement::layout::Layout;
use rand::Rng;
use std::collections::BTreeMap;
use weft_fabric::{CellKind, SiteId};
use weft_netlist::Design;

/// Random draws before falling back to a linear scan.
const RANDOM_TRIES: usize = 32;

/// Checks that the device has enough sites of every kind.
pub(crate) fn check_feasible(ctx: &PlaceContext<'_>) -> Result<(), PnrError> {
    let mut demand: BTreeMap<CellKind, usize> = BTreeMap::new();
    for &kind in &ctx.kinds {
        *demand.entry(kind).or_default() += 1;
    }
    for (kind, demand) in demand {
        let supply = ctx.fabric.cells_of_kind(kind).len();
        if demand > supply {
            return Err(PnrError::Infeasible {
                kind,
                demand,
                supply,
            });
        }
    }
    Ok(())
}

/// Builds a complete, legal starting layout.
pub(crate) fn initial_layout(
    ctx: &PlaceContext<'_>,
    design: &Design,
    rng: &mut impl Rng,
) -> Result<Layout, PnrError> {
    check_feasible(ctx)?;
    let mut layout = Layout::new(ctx);

    for (i, locked) in ctx.locked.iter().enumerate() {
        let Some(site) = *locked else { continue };
        let site_kind = ctx.fabric.cell_kind(site);
        if site_kind != ctx.kinds[i] {
            return Err(PnrError::IllegalLock {
                instance: ctx.label(design, i),
                kind: ctx.kinds[i],
                site,
                site_kind,
            });
        }
        if let (Some(std), Some(bank)) = (ctx.io_std[i], ctx.bank(site)) {
            if let Some(other) = layout.banks.conflict(bank, std, None) {
                return Err(PnrError::BankConflict {
                    bank,
                    first: ctx.standards[other].clone(),
                    second: ctx.standards[std].clone(),
                });
            }
        }
        put_checked(ctx, design, &mut layout, &[(i, site)])?;
    }

    for chain in &ctx.chains {
        let locked = chain.iter().filter(|&&m| ctx.locked[m].is_some()).count();
        if locked > 0 && locked < chain.len() {
            let moves = anchor_chain(ctx, design, &layout, chain)?;
            put_checked(ctx, design, &mut layout, &moves)?;
        }
    }

    let mut chains: Vec<usize> = (0..ctx.chains.len())
        .filter(|&c| ctx.chains[c].iter().all(|&m| !layout.is_placed(m)))
        .collect();
    chains.sort_by_key(|&c| std::cmp::Reverse(ctx.chains[c].len()));
    for c in chains {
        let chain = &ctx.chains[c];
        let run = first_free_run(ctx, &layout, chain).ok_or_else(|| {
            PnrError::ChainDoesNotFit {
                head: ctx.label(design, chain[0]),
                len: chain.len(),
            }
        })?;
        for (&m, site) in chain.iter().zip(run) {
            layout.put(ctx, m, site);
        }
    }

    for i in (0..ctx.insts.len()).filter(|&i| ctx.kinds[i] == CellKind::Io) {
        if layout.is_placed(i) {
            continue;
        }
        let Some(std) = ctx.io_std[i] else { continue };
        let site = find_site(ctx, &layout, rng, CellKind::Io, |site| {
            ctx.bank(site)
                .map_or(true, |bank| layout.banks.conflict(bank, std, None).is_none())
        })
        .ok_or_else(|| bank_conflict(ctx, &layout, std))?;
        layout.put(ctx, i, site);
    }

    // Bigger control classes first, each class contiguous.
    let mut controlled: Vec<usize> = (0..ctx.insts.len())
        .filter(|&i| !layout.is_placed(i) && !ctx.controls[i].is_free())
        .collect();
    let mut class_size = BTreeMap::new();
    for &i in &controlled {
        *class_size.entry(ctx.controls[i]).or_insert(0usize) += 1;
    }
    controlled.sort_by_key(|&i| {
        let controls = ctx.controls[i];
        (std::cmp::Reverse(class_size[&controls]), controls, i)
    });
    for i in controlled {
        let site = find_tile_site(ctx, &layout, i)
            .ok_or_else(|| PnrError::NoCompatibleTile(ctx.label(design, i)))?;
        layout.put(ctx, i, site);
    }

    for i in 0..ctx.insts.len() {
        if layout.is_placed(i) {
            continue;
        }
        let kind = ctx.kinds[i];
        let site = find_site(ctx, &layout, rng, kind, |_| true).ok_or(PnrError::Infeasible {
            kind,
            demand: ctx.kinds.iter().filter(|&&k| k == kind).count(),
            supply: ctx.fabric.cells_of_kind(kind).len(),
        })?;
        layout.put(ctx, i, site);
    }

    Ok(layout)
}

/// Applies `moves` to unplaced instances, refusing a tile control clash.
fn put_checked(
    ctx: &PlaceContext<'_>,
    design: &Design,
    layout: &mut Layout,
    moves: &[(usize, SiteId)],
) -> Result<(), PnrError> {
    if let Some((moved, other, signal)) = layout.control_conflict(ctx, moves) {
        let site = moves
            .iter()
            .find(|&&(m, _)| m == moved)
            .map_or_else(|| layout.site(moved), |&(_, s)| s);
        return Err(PnrError::TileConflict {
            tile: ctx.fabric.cell_location(site).tile,
            signal,
            first: ctx.label(design, other),
            second: ctx.label(design, moved),
        });
    }
    for &(i, site) in moves {
        layout.put(ctx, i, site);
    }
    Ok(())
}

/// Lines up a chain around its locked members: the run is anchored at the
/// first locked member, every other locked member must already sit on its
/// run position, and the positions left for free members must be empty.
fn anchor_chain(
    ctx: &PlaceContext<'_>,
    design: &Design,
    layout: &Layout,
    chain: &[usize],
) -> Result<Vec<(usize, SiteId)>, PnrError> {
    let conflict = |m: usize| PnrError::ChainLockConflict {
        head: ctx.label(design, chain[0]),
        instance: ctx.label(design, m),
    };
    let Some((k, m, site)) = chain
        .iter()
        .enumerate()
        .find_map(|(k, &m)| ctx.locked[m].map(|site| (k, m, site)))
    else {
        return Ok(Vec::new());
    };
    let (x, pos) = ctx.column_pos(site);
    let run = (pos as usize)
        .checked_sub(k)
        .and_then(|start| ctx.column_run(x, start as u32, chain.len()))
        .ok_or_else(|| conflict(m))?;

    let mut moves = Vec::new();
    for (&member, &target) in chain.iter().zip(&run) {
        match ctx.locked[member] {
            Some(locked) if locked != target => return Err(conflict(member)),
            Some(_) => {}
            None if layout.is_free(target) => moves.push((member, target)),
            None => return Err(conflict(m)),
        }
    }
    Ok(moves)
}

/// Finds a free logic site for a cell with flip-flop controls, preferring
/// a tile already holding its control class, then a tile with no controls
/// claimed, then any compatible tile.
fn find_tile_site(ctx: &PlaceContext<'_>, layout: &Layout, i: usize) -> Option<SiteId> {
    let mut unclaimed = None;
    let mut compatible = None;
    for &site in ctx.fabric.cells_of_kind(CellKind::Logic) {
        if !layout.is_free(site) || layout.control_conflict(ctx, &[(i, site)]).is_some() {
            continue;
        }
        let members = layout.tile_members(ctx, site);
        if members.iter().any(|&m| ctx.controls[m] == ctx.controls[i]) {
            return Some(site);
        }
        if unclaimed.is_none() && members.iter().all(|&m| ctx.controls[m].is_free()) {
            unclaimed = Some(site);
        }
        compatible.get_or_insert(site);
    }
    unclaimed.or(compatible)
}

/// Finds a free site of `kind` accepted by `accept`, trying random sites
/// first and then every site in order.
fn find_site(
    ctx: &PlaceContext<'_>,
    layout: &Layout,
    rng: &mut impl Rng,
    kind: CellKind,
    accept: impl Fn(SiteId) -> bool,
) -> Option<SiteId> {
    let sites = ctx.fabric.cells_of_kind(kind);
    if sites.is_empty() {
        return None;
    }
    let usable = |s: SiteId| layout.is_free(s) && accept(s);
    for _ in 0..RANDOM_TRIES {
        let site = sites[rng.gen_range(0..sites.len())];
        if usable(site) {
            return Some(site);
        }
    }
    sites.iter().copied().find(|&s| usable(s))
}

/// Returns the first run of free logic sites that holds `chain` without a
/// tile control clash, scanning columns left to right and positions bottom
/// to top.
fn first_free_run(ctx: &PlaceContext<'_>, layout: &Layout, chain: &[usize]) -> Option<Vec<SiteId>> {
    let positions = ctx.fabric.height() * LOGIC_SLOTS;
    (0..ctx.fabric.width()).find_map(|x| {
        (0..positions).find_map(|pos| {
            ctx.column_run(x, pos, chain.len()).filter(|run| {
                if !run.iter().all(|&s| layout.is_free(s)) {
                    return false;
                }
                let moves: Vec<(usize, SiteId)> =
                    chain.iter().copied().zip(run.iter().copied()).collect();
                layout.control_conflict(ctx, &moves).is_none()
            })
        })
    })
}

/// Explains why no I/O site accepts standard `std`.
fn bank_conflict(ctx: &PlaceContext<'_>, layout: &Layout, std: usize) -> PnrError {
    let blocked = ctx
        .fabric
        .cells_of_kind(CellKind::Io)
        .iter()
        .filter(|&&s| layout.is_free(s))
        .find_map(|&s| {
            let bank = ctx.bank(s)?;
            let other = layout.banks.conflict(bank, std, None)?;
            Some((bank, other))
        });
    match blocked {
        Some((bank, other)) => PnrError::BankConflict {
            bank,
            first: ctx.standards[other].clone(),
            second: ctx.standards[std].clone(),
        },
        None => PnrError::Infeasible {
            kind: CellKind::Io,
            demand: ctx.kinds.iter().filter(|&&k| k == CellKind::Io).count(),
            supply: ctx.fabric.cells_of_kind(CellKind::Io).len(),
        },
    }
}
