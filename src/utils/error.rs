use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiceError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("XML parsing error: {0}")]
    XmlError(#[from] roxmltree::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid pattern '{pattern}': {message}")]
    PatternError { pattern: String, message: String },

    #[error("Schema error: {message}")]
    SchemaError { message: String },

    #[error("Generation error: {message}")]
    GenerationError { message: String },

    #[error("Gave up on {symbol} after {attempts} attempts: {reason}")]
    ExhaustedError {
        symbol: String,
        attempts: usize,
        reason: String,
    },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Parse,
    Schema,
    Generation,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DiceError {
    pub fn schema(message: impl Into<String>) -> Self {
        DiceError::SchemaError {
            message: message.into(),
        }
    }

    pub fn generation(message: impl Into<String>) -> Self {
        DiceError::GenerationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            DiceError::ZipError(_) | DiceError::IoError(_) => ErrorCategory::Io,
            DiceError::CsvError(_)
            | DiceError::SerializationError(_)
            | DiceError::XmlError(_)
            | DiceError::TomlError(_)
            | DiceError::PatternError { .. } => ErrorCategory::Parse,
            DiceError::SchemaError { .. } => ErrorCategory::Schema,
            DiceError::GenerationError { .. } | DiceError::ExhaustedError { .. } => {
                ErrorCategory::Generation
            }
            DiceError::MissingConfigError { .. }
            | DiceError::InvalidConfigValueError { .. }
            | DiceError::ConfigValidationError { .. } => ErrorCategory::Configuration,
        }
    }

    /// 嚴重程度決定 CLI 的退出碼
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單一樣本放棄重抽，換個種子通常就能成功
            DiceError::ExhaustedError { .. } => ErrorSeverity::Medium,
            DiceError::GenerationError { .. } | DiceError::PatternError { .. } => {
                ErrorSeverity::High
            }
            DiceError::SchemaError { .. }
            | DiceError::XmlError(_)
            | DiceError::TomlError(_)
            | DiceError::CsvError(_)
            | DiceError::SerializationError(_)
            | DiceError::MissingConfigError { .. }
            | DiceError::InvalidConfigValueError { .. }
            | DiceError::ConfigValidationError { .. } => ErrorSeverity::High,
            DiceError::IoError(_) | DiceError::ZipError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self.category() {
            ErrorCategory::Io => {
                "Check that the output directory exists and is writable".to_string()
            }
            ErrorCategory::Parse => match self {
                DiceError::PatternError { .. } => {
                    "Simplify the pattern parameter or override the node in the config".to_string()
                }
                DiceError::XmlError(_) => "Make sure the schema file is well-formed XML".to_string(),
                DiceError::TomlError(_) => "Make sure the config file is valid TOML".to_string(),
                _ => "Check the input file format".to_string(),
            },
            ErrorCategory::Schema => {
                "Check the RELAX NG schema and its included files".to_string()
            }
            ErrorCategory::Generation => match self {
                DiceError::ExhaustedError { .. } => {
                    "Relax the scope/exclusion constraints or try another seed".to_string()
                }
                _ => "Run with --verbose to see which schema node failed".to_string(),
            },
            ErrorCategory::Configuration => {
                "Review the command line arguments or the config file".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            DiceError::IoError(e) => format!("Could not read or write a file: {}", e),
            DiceError::ZipError(e) => format!("Could not build the output archive: {}", e),
            DiceError::XmlError(e) => format!("The schema is not valid XML: {}", e),
            DiceError::TomlError(e) => format!("The config file is not valid TOML: {}", e),
            DiceError::ExhaustedError { symbol, .. } => {
                format!("No value of {} satisfies the given constraints", symbol)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DiceError>;
