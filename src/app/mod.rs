//! Application-layer boundary: port traits between the connectivity core
//! and the outside world (storage, network link, transports, system).

pub mod ports;
