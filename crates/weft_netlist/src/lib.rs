//! The design graph: a packed netlist of fabric primitives.
//!
//! Models, instances, ports, and nets live in append-only tables inside a
//! [`Design`] and are addressed by stable ids. A port stores its connection;
//! the net-to-ports index is derived from those records and kept in step by
//! [`Design::connect`] and [`Design::disconnect`].
//!
//! ```
//! use weft_netlist::{add_fabric_library, Design};
//! use weft_fabric::CellKind;
//!
//! let mut d = Design::new();
//! add_fabric_library(&mut d).unwrap();
//! let top = d.add_model("top", None).unwrap();
//! let lc = d.primitive(CellKind::Logic).unwrap();
//! let a = d.add_instance(top, lc).unwrap();
//! let b = d.add_instance(top, lc).unwrap();
//! let n = d.add_net(top, "n");
//! d.connect(d.find_instance_port(a, "O").unwrap(), n);
//! d.connect(d.find_instance_port(b, "I0").unwrap(), n);
//! assert!(d.check(top).is_empty());
//! ```

#![warn(missing_docs)]

mod arena;
pub mod check;
pub mod constant;
pub mod design;
pub mod error;
pub mod ids;
pub mod library;
pub mod model;
pub mod port;

pub use constant::Const;
pub use design::Design;
pub use error::NetlistError;
pub use ids::{InstanceId, ModelId, NetId, PortId};
pub use library::{add_fabric_library, DEFAULT_IO_STANDARD};
pub use model::{Instance, Model, Net};
pub use port::{Direction, Node, Port};
