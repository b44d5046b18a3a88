//! The placer's working assignment of instances to sites.

use crate::placement::context::PlaceContext;
use crate::placement::legality::BankTracker;
use crate::state::Placement;
use weft_fabric::SiteId;

/// A partial or complete assignment, indexed densely.
///
/// The occupant table is the inverse of `site_of`, so the assignment is
/// injective by construction. I/O standard counts per bank follow every
/// change.
#[derive(Debug, Clone)]
pub(crate) struct Layout {
    site_of: Vec<Option<SiteId>>,
    occupant: Vec<Option<usize>>,
    pub(crate) banks: BankTracker,
}

impl Layout {
    pub(crate) fn new(ctx: &PlaceContext<'_>) -> Self {
        Self {
            site_of: vec![None; ctx.insts.len()],
            occupant: vec![None; ctx.fabric.cell_count()],
            banks: BankTracker::default(),
        }
    }

    /// Returns the site of instance `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is not placed yet.
    pub(crate) fn site(&self, i: usize) -> SiteId {
        self.site_of[i].unwrap_or_else(|| panic!("instance #{i} is not placed"))
    }

    pub(crate) fn is_placed(&self, i: usize) -> bool {
        self.site_of[i].is_some()
    }

    pub(crate) fn occupant(&self, site: SiteId) -> Option<usize> {
        self.occupant[site.index()]
    }

    pub(crate) fn is_free(&self, site: SiteId) -> bool {
        self.occupant(site).is_none()
    }

    /// Puts unplaced instance `i` on free `site`.
    pub(crate) fn put(&mut self, ctx: &PlaceContext<'_>, i: usize, site: SiteId) {
        debug_assert!(self.site_of[i].is_none() && self.is_free(site));
        self.site_of[i] = Some(site);
        self.occupant[site.index()] = Some(i);
        if let (Some(std), Some(bank)) = (ctx.io_std[i], ctx.bank(site)) {
            self.banks.add(bank, std);
        }
    }

    /// Lifts instance `i` off its site.
    pub(crate) fn take(&mut self, ctx: &PlaceContext<'_>, i: usize) {
        let Some(site) = self.site_of[i].take() else {
            return;
        };
        self.occupant[site.index()] = None;
        if let (Some(std), Some(bank)) = (ctx.io_std[i], ctx.bank(site)) {
            self.banks.remove(bank, std);
        }
    }

    /// Moves several instances at once. Every target must be free or held
    /// by one of the moved instances.
    pub(crate) fn apply(&mut self, ctx: &PlaceContext<'_>, moves: &[(usize, SiteId)]) {
        for &(i, _) in moves {
            self.take(ctx, i);
        }
        for &(i, site) in moves {
            self.put(ctx, i, site);
        }
    }

    /// Finds a logic tile whose cells would disagree on shared controls
    /// after `moves`, returning the clashing pair and the signal.
    ///
    /// Only moved cells are compared, so the current layout is assumed
    /// consistent.
    pub(crate) fn control_conflict(
        &self,
        ctx: &PlaceContext<'_>,
        moves: &[(usize, SiteId)],
    ) -> Option<(usize, usize, &'static str)> {
        for &(i, site) in moves {
            let mine = &ctx.controls[i];
            if mine.is_free() {
                continue;
            }
            for other in ctx.tile_sites(site) {
                let occupant = match moves.iter().find(|&&(_, s)| s == other) {
                    Some(&(m, _)) => Some(m),
                    None => self
                        .occupant(other)
                        .filter(|&o| moves.iter().all(|&(m, _)| m != o)),
                };
                let Some(o) = occupant.filter(|&o| o != i) else {
                    continue;
                };
                if let Some(signal) = mine.conflict(&ctx.controls[o]) {
                    return Some((i, o, signal));
                }
            }
        }
        None
    }

    /// Returns the instances on the tile holding `site`.
    pub(crate) fn tile_members(&self, ctx: &PlaceContext<'_>, site: SiteId) -> Vec<usize> {
        ctx.tile_sites(site)
            .into_iter()
            .filter_map(|s| self.occupant(s))
            .collect()
    }

    pub(crate) fn to_placement(&self, ctx: &PlaceContext<'_>) -> Placement {
        let mut placement = Placement::new();
        for (i, site) in self.site_of.iter().enumerate() {
            let Some(site) = *site else { continue };
            if ctx.locked[i].is_some() {
                placement.lock(ctx.insts[i], site);
            } else {
                placement.place(ctx.insts[i], site);
            }
        }
        placement
    }
}
