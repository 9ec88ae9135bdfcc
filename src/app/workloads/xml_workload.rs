use crate::core::hooks::{OverrideRule, PathOverrides};
use crate::core::rnd::Rnd;
use crate::core::schema::Schema;
use crate::core::xml_gen::{GeneratorOptions, XmlGenerator};
use crate::domain::model::Sample;
use crate::domain::ports::Workload;
use crate::utils::error::Result;
use std::path::Path;

/// Random documents from one RELAX NG schema.
pub struct XmlWorkload {
    generator: XmlGenerator,
    start: Option<String>,
    stem: String,
}

impl XmlWorkload {
    pub fn new(generator: XmlGenerator, start: Option<String>, stem: impl Into<String>) -> Self {
        Self {
            generator,
            start,
            stem: stem.into(),
        }
    }

    /// Load the schema and install path overrides when there are any. Output
    /// files are named after the schema file.
    pub fn from_schema_file<P: AsRef<Path>>(
        path: P,
        options: GeneratorOptions,
        overrides: Vec<OverrideRule>,
        start: Option<String>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let schema = Schema::load(path)?;
        let mut generator = XmlGenerator::new(schema, options);
        if !overrides.is_empty() {
            let hook = PathOverrides::new(overrides)?;
            tracing::debug!("Installing {} path overrides", hook.len());
            generator = generator.with_hook(Box::new(hook))?;
        }

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sample")
            .to_string();
        Ok(Self::new(generator, start, stem))
    }

    pub fn generator(&self) -> &XmlGenerator {
        &self.generator
    }

    pub fn document(&self, rnd: &mut Rnd) -> Result<String> {
        self.generator.generate_document(rnd, self.start.as_deref())
    }
}

impl Workload for XmlWorkload {
    fn name(&self) -> &str {
        "xml"
    }

    fn produce(&self, rnd: &mut Rnd, index: usize) -> Result<Sample> {
        let mut content = self.document(rnd)?;
        content.push('\n');
        Ok(Sample {
            index,
            file_name: format!("{}-{:04}.xml", self.stem, index),
            content: content.into_bytes(),
        })
    }
}
