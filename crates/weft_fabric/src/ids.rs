//! Opaque ID newtypes for fabric entities.
//!
//! Tile, wire, and switch ids are dense 0-based indices. Site ids are cell
//! numbers and start at 1, so `SiteId::from_raw(0)` never names a real site.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` value.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` value.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// A tile, indexed `x + width * y`.
    TileId, "t"
);

define_id!(
    /// A placement site (cell), numbered from 1.
    SiteId, "cell "
);

define_id!(
    /// A routing wire (net node). Global wires occupy the lowest ids.
    WireId, "w"
);

define_id!(
    /// A configurable switch driving one wire.
    SwitchId, "sw"
);

impl SiteId {
    /// Returns the 0-based position of this site in dense storage.
    ///
    /// # Panics
    ///
    /// Panics on the reserved cell number 0.
    pub fn index(self) -> usize {
        assert!(self.0 > 0, "cell numbers start at 1");
        (self.0 - 1) as usize
    }
}
