// Domain layer: records, ledger types and the ports the adapters implement.

pub mod model;
pub mod ports;
