pub mod pid;
pub mod serial;
pub mod wiring;
