use crate::app::workloads::OutputFormat;
use crate::core::symbol::{SymbolKind, SymbolSpec};
use crate::core::xml_gen::GeneratorOptions;
use crate::domain::model::RunSettings;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_bounds, validate_file_extension, validate_path, validate_positive_number,
    validate_range, Validate,
};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "dice")]
#[command(version)]
#[command(about = "Random test input generator for fuzzing")]
pub struct CliConfig {
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Seed for reproducible output")]
    pub seed: Option<u64>,

    #[arg(long, global = true, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Generate XML documents from a RELAX NG schema
    Xml(XmlArgs),
    /// Sample values of a symbol
    Symbol(SymbolArgs),
    /// Run the jobs of a TOML configuration file
    Run(RunArgs),
}

#[derive(Debug, Clone, Args)]
pub struct XmlArgs {
    /// Path to the .rng schema
    pub schema: String,

    #[arg(long, help = "Start from this define instead of <start>")]
    pub start: Option<String>,

    #[arg(short = 'n', long, default_value_t = 1)]
    pub count: usize,

    #[arg(short, long, help = "Write files here instead of stdout")]
    pub output: Option<String>,

    #[arg(long, help = "Bundle all documents into this zip inside --output")]
    pub archive: Option<String>,

    #[arg(long, help = "Skip documents that fail instead of aborting")]
    pub keep_going: bool,

    #[arg(long)]
    pub max_depth: Option<usize>,

    #[arg(long, help = "Probability of walking an <optional> block")]
    pub optional_probability: Option<f64>,

    #[arg(long, help = "Shuffle <interleave> children")]
    pub shuffle_interleave: bool,
}

impl XmlArgs {
    pub fn generator_options(&self) -> GeneratorOptions {
        let mut options = GeneratorOptions::default();
        if let Some(depth) = self.max_depth {
            options.max_depth = depth;
        }
        if let Some(p) = self.optional_probability {
            options.optional_probability = p;
        }
        options.shuffle_interleave = self.shuffle_interleave;
        options
    }

    pub fn settings(&self, seed: Option<u64>) -> RunSettings {
        RunSettings {
            seed,
            count: self.count,
            keep_going: self.keep_going,
            archive: self.archive.clone(),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct SymbolArgs {
    #[arg(value_enum)]
    pub kind: SymbolKind,

    #[arg(short = 'n', long, default_value_t = 1)]
    pub count: usize,

    #[arg(long, allow_hyphen_values = true)]
    pub min: Option<i64>,

    #[arg(long, allow_hyphen_values = true)]
    pub max: Option<i64>,

    #[arg(long, value_delimiter = ',', help = "Only draw from these values")]
    pub scope: Option<Vec<String>>,

    #[arg(long, value_delimiter = ',', help = "Never produce these values")]
    pub exclude: Vec<String>,

    #[arg(long, value_delimiter = ',', help = "Items every string list must hold")]
    pub require: Vec<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[arg(short, long, help = "Write raw values as files here instead of stdout")]
    pub output: Option<String>,

    #[arg(long)]
    pub archive: Option<String>,
}

impl SymbolArgs {
    pub fn spec(&self) -> SymbolSpec {
        SymbolSpec {
            kind: self.kind,
            scope: self.scope.clone(),
            exclude: self.exclude.clone(),
            minimum: self.min,
            maximum: self.max,
            required: self.require.clone(),
        }
    }

    pub fn settings(&self, seed: Option<u64>) -> RunSettings {
        RunSettings {
            seed,
            count: self.count,
            keep_going: false,
            archive: self.archive.clone(),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[arg(short, long, default_value = "dice.toml")]
    pub config: String,

    #[arg(long, help = "Show the plan without generating anything")]
    pub dry_run: bool,
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        match &self.command {
            Command::Xml(args) => {
                validate_file_extension("schema", &args.schema, &["rng"])?;
                validate_positive_number("count", args.count, 1)?;
                if let Some(output) = &args.output {
                    validate_path("output", output)?;
                }
                if let Some(archive) = &args.archive {
                    validate_file_extension("archive", archive, &["zip"])?;
                }
                if let Some(depth) = args.max_depth {
                    validate_positive_number("max_depth", depth, 1)?;
                }
                if let Some(p) = args.optional_probability {
                    validate_range("optional_probability", p, 0.0, 1.0)?;
                }
            }
            Command::Symbol(args) => {
                validate_positive_number("count", args.count, 1)?;
                validate_bounds("min/max", args.min, args.max)?;
                if let Some(output) = &args.output {
                    validate_path("output", output)?;
                }
                if let Some(archive) = &args.archive {
                    validate_file_extension("archive", archive, &["zip"])?;
                }
            }
            Command::Run(args) => {
                validate_file_extension("config", &args.config, &["toml"])?;
            }
        }
        Ok(())
    }
}
