// Application layer: workloads that plug the generators into the engine.

pub mod workloads;
