//! Placement cost.
//!
//! The cost of a placement is the sum over nets of half-perimeter wire length
//! (HPWL), with timing-critical nets weighted up, plus a penalty for carry
//! chains that are not laid out in consecutive slots of one column.

use crate::placement::context::PlaceContext;
use crate::placement::layout::Layout;

/// Penalty per unit of carry chain misalignment.
pub(crate) const CHAIN_WEIGHT: f64 = 10.0;

/// Returns the half-perimeter of the bounding box of `points`.
///
/// Fewer than two points cost nothing.
pub(crate) fn hpwl(points: impl IntoIterator<Item = (i32, i32)>) -> f64 {
    let mut points = points.into_iter();
    let Some((x0, y0)) = points.next() else {
        return 0.0;
    };
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (x0, x0, y0, y0);
    for (x, y) in points {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    f64::from((max_x - min_x) + (max_y - min_y))
}

/// Returns the misalignment of consecutive chain members given their
/// `(column, position)`: zero exactly when each member sits one position
/// above its predecessor in the same column.
pub(crate) fn chain_misalignment(positions: &[(u32, u32)]) -> f64 {
    positions
        .windows(2)
        .map(|w| {
            let dx = w[0].0.abs_diff(w[1].0);
            let dpos = (i64::from(w[1].1) - i64::from(w[0].1) - 1).unsigned_abs();
            dx as f64 + dpos as f64
        })
        .sum()
}

/// Returns the weighted HPWL of net `n`.
pub(crate) fn net_cost(ctx: &PlaceContext<'_>, layout: &Layout, n: usize) -> f64 {
    let net = &ctx.nets[n];
    net.weight * hpwl(net.members.iter().map(|&m| ctx.xy(layout.site(m))))
}

/// Returns the penalty of chain `c`.
pub(crate) fn chain_cost(ctx: &PlaceContext<'_>, layout: &Layout, c: usize) -> f64 {
    let positions: Vec<(u32, u32)> = ctx.chains[c]
        .iter()
        .map(|&m| ctx.column_pos(layout.site(m)))
        .collect();
    CHAIN_WEIGHT * chain_misalignment(&positions)
}

/// Returns the full cost of `layout`, computed from scratch.
pub(crate) fn total_cost(ctx: &PlaceContext<'_>, layout: &Layout) -> f64 {
    let nets: f64 = (0..ctx.nets.len()).map(|n| net_cost(ctx, layout, n)).sum();
    let chains: f64 = (0..ctx.chains.len()).map(|c| chain_cost(ctx, layout, c)).sum();
    nets + chains
}
