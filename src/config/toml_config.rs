use crate::core::hooks::OverrideRule;
use crate::core::symbol::SymbolSpec;
use crate::core::xml_gen::GeneratorOptions;
use crate::domain::model::RunSettings;
use crate::utils::error::{DiceError, Result};
use crate::utils::validation::{
    validate_bounds, validate_file_extension, validate_non_empty_string, validate_path,
    validate_positive_number, validate_range, validate_required_field, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub campaign: CampaignConfig,
    pub generator: Option<GeneratorConfig>,
    pub overrides: Option<Vec<OverrideRule>>,
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
    /// 設定檔所在目錄，用來解析相對的 schema 路徑
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub name: String,
    pub description: Option<String>,
    pub seed: Option<u64>,
    pub output_path: String,
    pub monitor: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub max_depth: Option<usize>,
    pub max_nesting: Option<usize>,
    pub optional_probability: Option<f64>,
    pub shuffle_interleave: Option<bool>,
    pub repeat_rate: Option<f64>,
    pub max_repeat: Option<usize>,
    pub max_elements: Option<usize>,
    pub strip_elements: Option<Vec<String>>,
    pub pattern_max_extra: Option<u32>,
}

impl GeneratorConfig {
    pub fn to_options(&self) -> GeneratorOptions {
        let mut options = GeneratorOptions::default();
        if let Some(v) = self.max_depth {
            options.max_depth = v;
        }
        if let Some(v) = self.max_nesting {
            options.max_nesting = v;
        }
        if let Some(v) = self.optional_probability {
            options.optional_probability = v;
        }
        if let Some(v) = self.shuffle_interleave {
            options.shuffle_interleave = v;
        }
        if let Some(v) = self.repeat_rate {
            options.repeat_rate = v;
        }
        if let Some(v) = self.max_repeat {
            options.max_repeat = v;
        }
        if let Some(v) = self.max_elements {
            options.max_elements = v;
        }
        if let Some(v) = &self.strip_elements {
            options.strip_elements = v.clone();
        }
        if let Some(v) = self.pattern_max_extra {
            options.regex.max_extra = v;
        }
        options
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Xml,
    Symbol,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub r#type: JobType,
    pub schema: Option<String>,
    pub start: Option<String>,
    pub symbol: Option<SymbolSpec>,
    pub count: Option<usize>,
    pub seed: Option<u64>,
    pub archive: Option<String>,
    pub keep_going: Option<bool>,
    pub enabled: Option<bool>,
}

impl JobConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn count(&self) -> usize {
        self.count.unwrap_or(1)
    }

    /// 工作沒有指定 seed 時沿用 campaign 的 seed
    pub fn settings(&self, campaign_seed: Option<u64>) -> RunSettings {
        RunSettings {
            seed: self.seed.or(campaign_seed),
            count: self.count(),
            keep_going: self.keep_going.unwrap_or(false),
            archive: self.archive.clone(),
        }
    }

    fn validate_job(&self, index: usize) -> Result<()> {
        let field = |name: &str| format!("jobs[{}].{}", index, name);

        validate_non_empty_string(&field("name"), &self.name)?;
        validate_positive_number(&field("count"), self.count(), 1)?;
        if let Some(archive) = &self.archive {
            validate_file_extension(&field("archive"), archive, &["zip"])?;
        }

        match self.r#type {
            JobType::Xml => {
                let schema = validate_required_field(&field("schema"), &self.schema)?;
                validate_file_extension(&field("schema"), schema, &["rng"])?;
            }
            JobType::Symbol => {
                let spec = validate_required_field(&field("symbol"), &self.symbol)?;
                validate_bounds(&field("symbol"), spec.minimum, spec.maximum)?;
            }
        }
        Ok(())
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DiceError::IoError)?;
        let mut config = Self::from_toml_str(&content)?;
        config.base_dir = path.as_ref().parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DiceError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CORPUS_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DiceError::PatternError {
            pattern: r"\$\{([^}]+)\}".to_string(),
            message: e.to_string(),
        })?;

        // 找不到的變數保留原樣
        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("campaign.name", &self.campaign.name)?;
        validate_path("campaign.output_path", &self.campaign.output_path)?;

        if let Some(generator) = &self.generator {
            if let Some(depth) = generator.max_depth {
                validate_positive_number("generator.max_depth", depth, 1)?;
            }
            // 每層約 32 KiB stack
            if let Some(nesting) = generator.max_nesting {
                validate_range("generator.max_nesting", nesting, 1, 4096)?;
            }
            if let Some(p) = generator.optional_probability {
                validate_range("generator.optional_probability", p, 0.0, 1.0)?;
            }
            if let Some(rate) = generator.repeat_rate {
                if rate <= 0.0 {
                    return Err(DiceError::InvalidConfigValueError {
                        field: "generator.repeat_rate".to_string(),
                        value: rate.to_string(),
                        reason: "Rate must be positive".to_string(),
                    });
                }
            }
        }

        if self.jobs.is_empty() {
            return Err(DiceError::MissingConfigError {
                field: "jobs".to_string(),
            });
        }
        for (index, job) in self.jobs.iter().enumerate() {
            job.validate_job(index)?;
        }

        Ok(())
    }

    pub fn output_path(&self) -> &str {
        &self.campaign.output_path
    }

    pub fn seed(&self) -> Option<u64> {
        self.campaign.seed
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.campaign.monitor.unwrap_or(false)
    }

    pub fn generator_options(&self) -> GeneratorOptions {
        self.generator
            .as_ref()
            .map(GeneratorConfig::to_options)
            .unwrap_or_default()
    }

    pub fn override_rules(&self) -> Vec<OverrideRule> {
        self.overrides.clone().unwrap_or_default()
    }

    pub fn enabled_jobs(&self) -> impl Iterator<Item = &JobConfig> {
        self.jobs.iter().filter(|job| job.is_enabled())
    }

    /// 相對路徑以設定檔目錄為基準
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
