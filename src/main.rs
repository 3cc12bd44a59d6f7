use clap::Parser;
use par_build::config::toml_config::DEFAULT_CONFIG_FILE;
use par_build::core::TableSource;
use par_build::utils::{logger, validation::Validate};
use par_build::{
    CliArgs, CsvDirectorySource, GoogleSheetsSource, LocalStorage, ParConfig, ParPipeline,
    ReportEngine, SourceType,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting par-build");

    // 載入配置：指定的檔案必須存在，預設檔案可省略
    let loaded = match &args.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            ParConfig::from_file(path)
        }
        None => ParConfig::load_or_default(DEFAULT_CONFIG_FILE),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.severity().exit_code());
        }
    };

    args.apply_to(&mut config);

    if args.verbose {
        tracing::debug!("Configuration: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.severity().exit_code());
    }

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be fetched or written");
        perform_dry_run(&config);
        return Ok(());
    }

    let result = match config.source.r#type {
        SourceType::Csv => {
            let source = CsvDirectorySource::new(&config.source.csv_dir);
            run_with(source, config).await
        }
        SourceType::GoogleSheets => match GoogleSheetsSource::from_config(&config.source) {
            Ok(source) => run_with(source, config).await,
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(output_path) => {
            tracing::info!("✅ PAR build completed successfully!");
            println!("✅ PAR build completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ PAR build failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            std::process::exit(e.severity().exit_code());
        }
    }

    Ok(())
}

async fn run_with<T: TableSource>(source: T, config: ParConfig) -> par_build::Result<String> {
    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = ParPipeline::new(storage, source, config);
    ReportEngine::new(pipeline).run().await
}

fn display_config_summary(config: &ParConfig, args: &CliArgs) {
    println!("📋 Configuration Summary:");
    println!("  Year: {}", config.report.year);
    println!("  Person: {}", config.report.person);
    match config.source.r#type {
        SourceType::Csv => println!("  Source: CSV files in {}", config.source.csv_dir),
        SourceType::GoogleSheets => match &config.source.spreadsheet_id {
            Some(id) => println!("  Source: Google Sheets {}", id),
            None => println!("  Source: Google Sheets '{}'", config.source.spreadsheet_name),
        },
    }
    println!("  Output: {}", config.tex_path());

    if config.bundle.enabled {
        println!("  Bundle: {}", config.bundle.filename);
    }
    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &ParConfig) {
    println!("🔍 Dry Run Analysis:");
    println!();

    println!("📡 Tables:");
    for name in config.tables.required() {
        println!("  {} (required)", name);
    }
    if config.sections.publications {
        for name in config.tables.optional() {
            println!("  {} (optional)", name);
        }
    }

    println!();
    println!("📝 Sections:");
    let sections = [
        ("Course List", config.sections.course_list),
        ("Course Prep", config.sections.future_courses),
        ("Course Development", config.sections.course_development),
        ("Advising", config.sections.advising),
        ("Publications", config.sections.publications),
    ];
    for (title, enabled) in sections {
        println!("  {} {}", if enabled { "✅" } else { "⏭️" }, title);
    }

    println!();
    println!("💾 Output:");
    println!("  {}", config.tex_path());
    println!(
        "  {}/{}_<category>.bib per publication category",
        config.report.output_dir, config.report.bib_prefix
    );
    if config.bundle.enabled {
        println!("  {}/{}", config.report.output_dir, config.bundle.filename);
    }

    println!();
    println!("✅ Dry run analysis complete.");
}
