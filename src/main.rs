use clap::{Parser, ValueEnum};
use dice::app::workloads::{render_values, SymbolWorkload, XmlWorkload};
use dice::config::cli::{Command, RunArgs, SymbolArgs, XmlArgs};
use dice::config::toml_config::{JobConfig, JobType, TomlConfig};
use dice::core::rnd::Rnd;
use dice::domain::model::RunReport;
use dice::utils::error::{DiceError, ErrorSeverity, Result};
use dice::utils::{logger, validation::Validate};
use dice::{CliConfig, DiceEngine, LocalStorage};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("🎲 Starting dice");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if config.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let result = match &config.command {
        Command::Xml(args) => run_xml(&config, args).await,
        Command::Symbol(args) => run_symbol(&config, args).await,
        Command::Run(args) => run_config(&config, args).await,
    };

    if let Err(e) = result {
        report_failure(&e);
    }

    Ok(())
}

async fn run_xml(config: &CliConfig, args: &XmlArgs) -> Result<()> {
    let workload = XmlWorkload::from_schema_file(
        &args.schema,
        args.generator_options(),
        Vec::new(),
        args.start.clone(),
    )?;
    let engine =
        DiceEngine::new_with_monitoring(workload, args.settings(config.seed), config.monitor);

    match output_dir(&args.output, &args.archive) {
        Some(dir) => {
            let report = engine.run(&LocalStorage::new(dir.clone())).await?;
            print_report(&report, &dir);
        }
        None => {
            let batch = engine.generate()?;
            for (i, sample) in batch.samples.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                print!("{}", String::from_utf8_lossy(&sample.content));
            }
        }
    }
    Ok(())
}

async fn run_symbol(config: &CliConfig, args: &SymbolArgs) -> Result<()> {
    let stem = args
        .kind
        .to_possible_value()
        .map(|v| v.get_name().to_string())
        .unwrap_or_else(|| "symbol".to_string());
    let workload = SymbolWorkload::new(args.spec(), stem);

    match output_dir(&args.output, &args.archive) {
        Some(dir) => {
            let engine = DiceEngine::new_with_monitoring(
                workload,
                args.settings(config.seed),
                config.monitor,
            );
            let report = engine.run(&LocalStorage::new(dir.clone())).await?;
            print_report(&report, &dir);
        }
        None => {
            let mut rnd = Rnd::from_seed(config.seed);
            let values = (0..args.count)
                .map(|_| workload.value(&mut rnd))
                .collect::<Result<Vec<_>>>()?;
            print!("{}", render_values(&values, args.format)?);
        }
    }
    Ok(())
}

async fn run_config(cli: &CliConfig, args: &RunArgs) -> Result<()> {
    tracing::info!("📁 Loading configuration from: {}", args.config);

    // 載入 TOML 配置
    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    // 命令列的 seed 優先
    let seed = cli.seed.or(config.seed());
    display_config_summary(&config, seed, args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No samples will be generated");
        perform_dry_run(&config, seed);
        return Ok(());
    }

    let monitor_enabled = cli.monitor || config.monitoring_enabled();
    for job in config.enabled_jobs() {
        let dir = std::path::Path::new(config.output_path())
            .join(&job.name)
            .to_string_lossy()
            .to_string();
        let report = run_job(&config, job, seed, monitor_enabled, &dir).await?;
        print_report(&report, &dir);
    }
    Ok(())
}

async fn run_job(
    config: &TomlConfig,
    job: &JobConfig,
    seed: Option<u64>,
    monitor_enabled: bool,
    dir: &str,
) -> Result<RunReport> {
    tracing::info!("🚀 Running job '{}'", job.name);
    let storage = LocalStorage::new(dir.to_string());
    let settings = job.settings(seed);

    match job.r#type {
        JobType::Xml => {
            let schema = job.schema.as_deref().ok_or_else(|| DiceError::MissingConfigError {
                field: format!("{}.schema", job.name),
            })?;
            let workload = XmlWorkload::from_schema_file(
                config.resolve_path(schema),
                config.generator_options(),
                config.override_rules(),
                job.start.clone(),
            )?;
            DiceEngine::new_with_monitoring(workload, settings, monitor_enabled)
                .run(&storage)
                .await
        }
        JobType::Symbol => {
            let spec = job.symbol.clone().ok_or_else(|| DiceError::MissingConfigError {
                field: format!("{}.symbol", job.name),
            })?;
            let workload = SymbolWorkload::new(spec, job.name.clone());
            DiceEngine::new_with_monitoring(workload, settings, monitor_enabled)
                .run(&storage)
                .await
        }
    }
}

/// `--archive` 沒有搭配 `--output` 時寫到目前目錄
fn output_dir(output: &Option<String>, archive: &Option<String>) -> Option<String> {
    output
        .clone()
        .or_else(|| archive.as_ref().map(|_| ".".to_string()))
}

fn print_report(report: &RunReport, dir: &str) {
    println!(
        "✅ {}: {} generated, {} failed",
        report.workload, report.generated, report.failed
    );
    println!("📁 Output saved to: {} ({} files)", dir, report.files.len());
}

fn report_failure(e: &DiceError) {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ Generation failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };

    if exit_code > 0 {
        std::process::exit(exit_code);
    }
}

fn display_config_summary(config: &TomlConfig, seed: Option<u64>, args: &RunArgs) {
    println!("📋 Configuration Summary:");
    println!("  Campaign: {}", config.campaign.name);
    if let Some(description) = &config.campaign.description {
        println!("  Description: {}", description);
    }
    println!("  Output: {}", config.output_path());
    println!(
        "  Seed: {}",
        seed.map_or_else(|| "random".to_string(), |s| s.to_string())
    );
    println!(
        "  Jobs: {} ({} enabled)",
        config.jobs.len(),
        config.enabled_jobs().count()
    );

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig, seed: Option<u64>) {
    println!("🔍 Dry Run Analysis:");
    println!();

    let options = config.generator_options();
    println!("⚙️ Generator:");
    println!("  Max depth: {}", options.max_depth);
    println!("  Optional probability: {}", options.optional_probability);
    println!("  Shuffle interleave: {}", options.shuffle_interleave);
    println!("  Stripped elements: {}", options.strip_elements.join(", "));

    let overrides = config.override_rules();
    if !overrides.is_empty() {
        println!();
        println!("🔧 Overrides:");
        for rule in &overrides {
            match &rule.value {
                Some(value) if !rule.skip => println!("  {} = {}", rule.xml_path, value),
                _ => println!("  {} (skipped)", rule.xml_path),
            }
        }
    }

    println!();
    println!("📦 Jobs:");
    for job in &config.jobs {
        let settings = job.settings(seed);
        let status = if job.is_enabled() { "✅" } else { "⏸️" };
        let source = match job.r#type {
            JobType::Xml => job
                .schema
                .as_deref()
                .map(|s| config.resolve_path(s).display().to_string())
                .unwrap_or_default(),
            JobType::Symbol => job
                .symbol
                .as_ref()
                .map(|s| format!("{:?}", s.kind))
                .unwrap_or_default(),
        };
        println!(
            "  {} {} [{:?}] {} x{}{}",
            status,
            job.name,
            job.r#type,
            source,
            settings.count,
            settings
                .archive
                .as_ref()
                .map(|a| format!(" -> {}", a))
                .unwrap_or_default()
        );
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
}
