use crate::core::rnd::Rnd;
use crate::core::symbol::{SymbolSpec, SymbolValue};
use crate::domain::model::Sample;
use crate::domain::ports::Workload;
use crate::utils::error::{DiceError, Result};
use serde::Serialize;

pub struct SymbolWorkload {
    spec: SymbolSpec,
    stem: String,
}

impl SymbolWorkload {
    pub fn new(spec: SymbolSpec, stem: impl Into<String>) -> Self {
        Self {
            spec,
            stem: stem.into(),
        }
    }

    pub fn spec(&self) -> &SymbolSpec {
        &self.spec
    }

    pub fn value(&self, rnd: &mut Rnd) -> Result<SymbolValue> {
        self.spec.sample(rnd)
    }
}

impl Workload for SymbolWorkload {
    fn name(&self) -> &str {
        "symbol"
    }

    fn produce(&self, rnd: &mut Rnd, index: usize) -> Result<Sample> {
        let value = self.value(rnd)?;
        Ok(Sample {
            index,
            file_name: format!("{}-{:04}.bin", self.stem, index),
            content: value.to_bytes(),
        })
    }
}

#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    index: usize,
    kind: &'a str,
    value: String,
}

/// Render sampled values for stdout.
pub fn render_values(values: &[SymbolValue], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(values
            .iter()
            .map(|v| format!("{}\n", v))
            .collect::<String>()),
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(values)?;
            out.push('\n');
            Ok(out)
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            for (index, value) in values.iter().enumerate() {
                writer.serialize(CsvRow {
                    index,
                    kind: value_kind(value),
                    value: value.to_string(),
                })?;
            }
            let data = writer
                .into_inner()
                .map_err(|e| DiceError::IoError(e.into_error()))?;
            String::from_utf8(data).map_err(|e| DiceError::generation(e.to_string()))
        }
    }
}

fn value_kind(value: &SymbolValue) -> &'static str {
    match value {
        SymbolValue::Bytes(_) => "bytes",
        SymbolValue::Text(_) => "string",
        SymbolValue::List(_) => "string_list",
        SymbolValue::Integer(_) => "integer",
    }
}
