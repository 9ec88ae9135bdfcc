pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::LocalStorage;
pub use app::workloads::{SymbolWorkload, XmlWorkload};
pub use crate::core::{engine::DiceEngine, rnd::Rnd, schema::Schema, xml_gen::XmlGenerator};
pub use utils::error::{DiceError, Result};
