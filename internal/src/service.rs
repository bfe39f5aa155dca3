pub mod barista_service;
pub mod pipeline;
pub mod time_transformer;
pub mod water_transformer;
