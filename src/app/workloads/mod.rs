pub mod symbol_workload;
pub mod xml_workload;

pub use symbol_workload::{render_values, OutputFormat, SymbolWorkload};
pub use xml_workload::XmlWorkload;
