pub use todini::todini;

//List all the submodules here
pub mod todini;
