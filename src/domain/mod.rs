// Domain layer: core models and ports (interfaces). Only std and serde.

pub mod model;
pub mod ports;
