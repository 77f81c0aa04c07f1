// Domain layer: records and ports (interfaces) the engine is built against.

pub mod model;
pub mod ports;
