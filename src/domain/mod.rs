// Domain layer: run models and ports (interfaces) shared by the engine, the
// workloads and the storage adapters.

pub mod model;
pub mod ports;
