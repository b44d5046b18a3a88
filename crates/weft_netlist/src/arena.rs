//! Id-indexed storage behind [`Design`](crate::Design).
//!
//! Models, instances, ports, and nets are never freed. A removed net keeps
//! its slot with a tombstone flag, so every id the design handed out can
//! still be looked up.

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// An id that names a slot of an [`Arena`].
pub(crate) trait EntityId: Copy {
    /// The id of slot `index`.
    fn at(index: usize) -> Self;

    /// The slot this id names.
    fn slot(self) -> usize;
}

/// Entities of one sort, in creation order.
#[derive(Debug, Clone)]
pub(crate) struct Arena<I, T> {
    items: Vec<T>,
    ids: PhantomData<fn() -> I>,
}

impl<I, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            ids: PhantomData,
        }
    }
}

impl<I: EntityId, T> Arena<I, T> {
    pub(crate) fn alloc(&mut self, item: T) -> I {
        self.items.push(item);
        I::at(self.items.len() - 1)
    }

    /// Number of entities ever created, tombstones included.
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (I, &T)> + '_ {
        self.items.iter().enumerate().map(|(k, item)| (I::at(k), item))
    }
}

impl<I: EntityId, T> Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        &self.items[id.slot()]
    }
}

impl<I: EntityId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        &mut self.items[id.slot()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{NetId, PortId};

    #[test]
    fn ids_count_up_from_zero() {
        let mut nets: Arena<NetId, &str> = Arena::default();
        assert_eq!(nets.alloc("clk"), NetId::from_raw(0));
        assert_eq!(nets.alloc("rst"), NetId::from_raw(1));
        assert_eq!(nets[NetId::from_raw(1)], "rst");
        assert_eq!(nets.len(), 2);
    }

    #[test]
    fn slots_are_edited_in_place() {
        let mut ports: Arena<PortId, Option<u32>> = Arena::default();
        let p = ports.alloc(None);
        ports[p] = Some(7);
        let all: Vec<_> = ports.iter().collect();
        assert_eq!(all, vec![(p, &Some(7))]);
    }
}
