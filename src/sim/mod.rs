pub use eps::EpsSimulator;
pub use results::{EventKind, LinkColumn, NodeColumn, ResultsStore, RunSummary, SimEvent};

//List all the submodules here
pub mod eps;
pub mod results;
