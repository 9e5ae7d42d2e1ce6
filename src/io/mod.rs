//List all the submodules here
pub mod csv_io;
pub mod net_binary_io;
pub mod net_text_io;
