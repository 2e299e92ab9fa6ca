// Domain layer: session and resource models plus the ports the core depends on.

pub mod model;
pub mod ports;
