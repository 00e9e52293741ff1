//! mesh-topology: link-state database, path computation, and multi-path
//! scheduling (§4.4). Consumes LSAs and link probe samples; produces the
//! path sets and per-destination schedulers mesh-transport dispatches
//! through.

pub mod cost;
pub mod lsdb;
pub mod routing;
pub mod scheduler;

pub use cost::{link_cost, CostCoefficients, NormalizationScale};
pub use lsdb::LinkStateDb;
pub use routing::{k_shortest_paths, shortest_path, Graph};
pub use scheduler::{CreditWindow, PathScheduler};
