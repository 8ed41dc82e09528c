use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use orgfinder::batch::{export_batch_summary, finalize_batch_summary, new_batch_summary, parse_names_file, NameRunResult};
use orgfinder::cli::Cli;
use orgfinder::config::{self, AppConfig};
use orgfinder::directory::DirectoryCache;
use orgfinder::export::write_exports;
use orgfinder::logger::{RunLogger, VerbosityLevel};
use orgfinder::oracle::{AgentOracle, OracleCredentials};
use orgfinder::pipeline::run_search;
use orgfinder::profile::DiscoverySettings;
use orgfinder::record::ResultRecord;

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("orgfinder={}", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Handle --init first (before any other processing)
    if cli.init {
        match AppConfig::create_default_config() {
            Ok(path) => {
                println!("✅ Created default configuration file at: {}", path.display());
                println!("   Edit this file to customize settings, then run orgfinder again.");
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("❌ Failed to create configuration file: {}", e);
                std::process::exit(1);
            }
        }
    }

    let app_config = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(config::ConfigError::FileNotFound(path)) => match AppConfig::prompt_create_config() {
            Ok(Some(created_path)) => {
                println!("✅ Created default configuration file at: {}", created_path.display());
                println!("   Edit this file to customize settings, then run orgfinder again.");
                std::process::exit(0);
            }
            Ok(None) => {
                eprintln!("❌ Configuration file not found at: {}", path.display());
                eprintln!("   Run with --init to create a default configuration file.");
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("❌ Failed to create configuration file: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let verbosity = VerbosityLevel::from_verbose_count(cli.verbose);
    let logger = match &cli.log_file {
        Some(path) => RunLogger::with_log_file(verbosity, path.clone()),
        None => RunLogger::new(verbosity),
    };

    if let Err(e) = cli.validate() {
        logger.error(&format!("Invalid arguments: {}", e));
        std::process::exit(1);
    }

    let search_key_var = app_config
        .search
        .enabled
        .then_some(app_config.search.api_key_env.as_str());
    let credentials = match OracleCredentials::from_env(&app_config.oracle.api_key_env, search_key_var) {
        Ok(credentials) => credentials,
        Err(e) => {
            logger.error(&e.to_string());
            std::process::exit(1);
        }
    };
    let oracle = AgentOracle::new(&app_config.oracle, &app_config.search, credentials)
        .context("Failed to create research agent")?;

    let discovery = DiscoverySettings {
        max_profiles: cli.max_profiles.unwrap_or(app_config.discovery.max_profiles),
        profile_pattern: app_config.discovery.profile_regex()?,
    };

    let names = match &cli.names_file {
        Some(file) => {
            let names = parse_names_file(Path::new(file))?;
            if names.is_empty() {
                logger.error("No names found in names file");
                std::process::exit(1);
            }
            names
        }
        None => cli.name.iter().cloned().collect(),
    };

    let dataset = cli.dataset.as_deref().context("A dataset is required")?;
    let mut cache = DirectoryCache::new();
    let directory = match cache.load_path(Path::new(dataset), &app_config.dataset) {
        Ok(directory) => directory,
        Err(e) => {
            logger.error(&format!("Failed to load dataset: {}", e));
            std::process::exit(1);
        }
    };
    logger.info(&format!("Loaded {} directory entries from {}", directory.len(), dataset));

    let batch = cli.is_batch_mode();
    let mut summary = new_batch_summary();
    let mut records: Vec<ResultRecord> = Vec::new();
    let batch_start = Instant::now();

    logger.start_progress(names.len() as u64).await;
    for name in &names {
        logger.update_progress(&format!("searching '{}'", name)).await;
        let started = Instant::now();
        match run_search(&oracle, name, &directory, &discovery, |event| logger.on_event(event)).await {
            Ok(report) => {
                logger.record_run(&report);
                summary
                    .results
                    .push(NameRunResult::from_report(&report, started.elapsed().as_secs_f64()));
                records.extend(report.records);
            }
            Err(e) => {
                // Dataset failures hit every name the same way
                logger.record_failed_run(name, &e.to_string());
                if !batch {
                    logger.finish_progress("Search aborted").await;
                    std::process::exit(1);
                }
                summary
                    .results
                    .push(NameRunResult::failed(name, &e, started.elapsed().as_secs_f64()));
            }
        }
        logger.advance_progress().await;
    }
    logger.finish_progress("All searches finished").await;

    let output_dir = cli.get_output_dir();
    let written = write_exports(&records, cli.output_format(), &output_dir, &cli.output, batch)
        .context("Failed to export results")?;
    for path in &written {
        logger.log_export_success(&path.display().to_string());
    }

    if batch {
        summary.total_duration_secs = batch_start.elapsed().as_secs_f64();
        finalize_batch_summary(&mut summary);
        let summary_path = output_dir.join(format!("{}_batch_summary.json", cli.output));
        export_batch_summary(&summary, &summary_path)?;
        logger.log_export_success(&summary_path.display().to_string());
    }

    logger.print_final_summary();

    if logger.is_log_export_enabled() {
        if let Err(e) = logger.export_logs() {
            eprintln!("⚠️  Failed to write log file: {}", e);
        }
    }

    Ok(())
}
