//! The fabric database: a static, read-only description of one FPGA device.
//!
//! A [`Fabric`] holds the tile grid, the placement sites (cells), the routing
//! wires and the switches between them, and the layout of configuration
//! bits. It is assembled through a [`FabricBuilder`] by a loader and never
//! changes afterwards; placement, routing and configuration assembly only
//! read it.
//!
//! [`load_device`] builds one of the procedurally generated devices:
//!
//! ```
//! use weft_fabric::{load_device, CellKind};
//!
//! let fabric = load_device("mini-6x6").unwrap();
//! assert_eq!(fabric.cells_of_kind(CellKind::Ram).len(), 2);
//! ```

#![warn(missing_docs)]

pub mod builder;
pub mod devices;
pub mod fabric;
pub mod ids;
pub mod types;

pub use builder::{FabricBuilder, FabricError};
pub use devices::{device_names, load_device, mini_device, DeviceSpec};
pub use fabric::{Cell, Fabric, WireInfo};
pub use ids::{SiteId, SwitchId, TileId, WireId};
pub use types::{CellKind, ConfigBit, ExtraBit, Location, Package, Switch, TileKind};
