//! Opaque id newtypes for netlist entities.
//!
//! Ids are handed out by the design in creation order, which is also the
//! order every deterministic pass iterates in.

use crate::arena::EntityId;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl EntityId for $name {
            fn at(index: usize) -> Self {
                Self(index as u32)
            }

            fn slot(self) -> usize {
                self.0 as usize
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
    /// A model: the top-level design or a fabric primitive.
    ModelId, "model"
);

define_id!(
    /// An instance of a primitive inside a model.
    InstanceId, "inst"
);

define_id!(
    /// A port of a model or an instance.
    PortId, "port"
);

define_id!(
    /// A net inside a model.
    NetId, "net"
);
