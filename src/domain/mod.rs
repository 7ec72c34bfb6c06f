// Domain layer: cart models and the ports the core depends on.

pub mod model;
pub mod ports;
