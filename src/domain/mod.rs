// Domain layer: route metadata, decoded values and the ports the core talks to.

pub mod model;
pub mod ports;
