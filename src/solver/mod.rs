pub use assembly::{Assembler, StepInputs};
pub use layout::StateLayout;
pub use newton::{NewtonConfig, NewtonSolution};

//List all the submodules here
pub mod assembly;
pub mod headloss;
pub mod layout;
pub mod newton;
