pub mod app_config;
pub mod barista_config;
pub mod bus_config;
pub mod hardware_config;
