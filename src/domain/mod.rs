// Domain layer: the data model and the ports (traits) the core and app layers meet at.

pub mod model;
pub mod ports;
