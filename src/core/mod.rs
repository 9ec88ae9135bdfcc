pub mod document;
pub mod engine;
pub mod hooks;
pub mod regex_gen;
pub mod rnd;
pub mod schema;
pub mod symbol;
pub mod xml_gen;

pub use crate::domain::model::{Batch, RunReport, RunSettings, Sample};
pub use crate::domain::ports::{Storage, Workload};
pub use crate::utils::error::Result;
