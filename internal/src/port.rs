pub mod barista;
pub mod bus;
pub mod device;
pub mod pid;
pub mod probe;
