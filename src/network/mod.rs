pub use curve::{Curve, CurveType};
pub use error::NetworkError;
pub use link::{LinkEnum, LinkStatus, Pipe, Pump, Valve, ValveType};
pub use model::WaterNetwork;
pub use node::{Junction, NodeEnum, Reservoir, Tank};
pub use options::{DemandModel, HeadlossFormula, SimOptions};
pub use pattern::Pattern;

//List all the submodules here
pub mod curve;
pub mod error;
pub mod link;
pub mod model;
pub mod node;
pub mod options;
pub mod pattern;
