pub mod brew;
pub mod error;
pub mod instruction;
pub mod point;
pub mod temperature;
