//! CLI entrypoint for celltype-quorum
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use celltype_application::{
    NoProgress, OracleGateway, ProgressNotifier, RunAnnotationUseCase, RunConfig,
};
use celltype_domain::{FinalReport, MarkerSet, OutputFormat};
use celltype_infrastructure::{
    ConfigLoader, FileConfig, FileOracleConfig, FileResponseCache, HttpOracleGateway,
    JsonlConversationLogger, Severity,
};
use celltype_presentation::{
    Cli, ConsoleFormatter, ProgressReporter, SimpleProgress, load_markers, set_color_enabled,
};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("Failed to load configuration")?
    };
    apply_cli_overrides(&cli, &mut config)?;

    let _log_guard = init_logging(&cli, &config)?;
    info!("Starting celltype-quorum");

    if cli.show_config {
        show_config(&cli, &config)?;
        return Ok(());
    }

    if cli.clear_cache {
        clear_cache(&config)?;
        if cli.markers.is_empty() {
            return Ok(());
        }
    }

    if cli.markers.is_empty() {
        bail!("--markers is required");
    }
    let sets = cli
        .markers
        .iter()
        .map(|path| load_markers(path))
        .collect::<Result<Vec<_>, _>>()?;
    info!(
        sets = sets.len(),
        clusters = sets.iter().map(MarkerSet::len).sum::<usize>(),
        "Loaded marker genes"
    );

    for issue in config.validate() {
        if issue.severity == Severity::Warning {
            warn!("{}", issue.message);
        }
    }
    let run_config = config.to_run_config()?;

    // === Dependency Injection ===
    let gateway = Arc::new(
        HttpOracleGateway::new(config.http_settings(), &config.base_url_overrides())
            .context("Failed to build HTTP client")?,
    );
    let use_case = build_use_case(gateway, &config, &run_config);

    let reports = run(&use_case, &cli, &run_config, &sets).await?;

    if !config.output.color {
        set_color_enabled(false);
    }
    let format = cli
        .output
        .map(OutputFormat::from)
        .or(config.output.format)
        .unwrap_or_default();
    if let [report] = reports.as_slice() {
        println!("{}", ConsoleFormatter::render(report, format));
    } else {
        let named: Vec<(String, FinalReport)> = cli
            .markers
            .iter()
            .map(|path| path.display().to_string())
            .zip(reports)
            .collect();
        println!("{}", ConsoleFormatter::render_batch(&named, format));
    }

    Ok(())
}

/// CLI flags win over every configuration source.
fn apply_cli_overrides(cli: &Cli, config: &mut FileConfig) -> Result<()> {
    if !cli.oracles.is_empty() {
        config.oracles = cli
            .oracles
            .iter()
            .map(|target| FileOracleConfig::from_target(target))
            .collect::<Result<_, _>>()?;
    }
    if let Some(species) = &cli.species {
        config.annotation.species = species.clone();
    }
    if let Some(tissue) = &cli.tissue {
        config.annotation.tissue = Some(tissue.clone());
    }
    if let Some(context) = &cli.context {
        config.annotation.additional_context = Some(context.clone());
    }
    if let Some(path) = &cli.prompt_template {
        let template = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt template {}", path.display()))?;
        config.annotation.prompt_template = Some(template);
    }
    if let Some(threshold) = cli.consensus_threshold {
        config.consensus.threshold = threshold;
    }
    if let Some(threshold) = cli.entropy_threshold {
        config.consensus.entropy_threshold = threshold;
    }
    if let Some(rounds) = cli.max_rounds {
        config.consensus.max_discussion_rounds = rounds;
    }
    if let Some(mode) = cli.consensus_mode {
        config.consensus.mode = mode.into();
    }
    if let Some(checker) = &cli.checker {
        config.consensus.checker = Some(checker.clone());
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }
    if let Some(dir) = &cli.log_dir {
        config.logging.dir = Some(dir.clone());
    }
    if let Some(path) = &cli.conversation_log {
        config.logging.conversation_log = Some(path.clone());
    }
    Ok(())
}

/// Install the stderr subscriber and, with a log directory, a daily file.
///
/// The returned guard flushes the file writer when dropped.
fn init_logging(cli: &Cli, config: &FileConfig) -> Result<Option<WorkerGuard>> {
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(level));

    let Some(dir) = &config.logging.dir else {
        tracing_subscriber::registry().with(stderr_layer).init();
        return Ok(None);
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let appender = tracing_appender::rolling::daily(dir, "celltype-quorum.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(EnvFilter::new(if cli.verbose == 0 { "info" } else { level }));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(Some(guard))
}

fn show_config(cli: &Cli, config: &FileConfig) -> Result<()> {
    ConfigLoader::print_config_sources(cli.config.as_ref());

    let issues = config.validate();
    if !issues.is_empty() {
        println!("\nIssues:");
        for issue in &issues {
            let tag = match issue.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            };
            println!("  [{}] {}", tag, issue.message);
        }
    }

    let mut redacted = config.clone();
    for oracle in &mut redacted.oracles {
        if oracle.api_key.is_some() {
            oracle.api_key = Some("***".to_string());
        }
    }
    for provider in redacted.providers.values_mut() {
        if provider.api_key.is_some() {
            provider.api_key = Some("***".to_string());
        }
    }
    println!(
        "\nEffective configuration:\n{}",
        toml::to_string_pretty(&redacted).context("Failed to render configuration")?
    );
    Ok(())
}

fn clear_cache(config: &FileConfig) -> Result<()> {
    let Some(dir) = config.cache.resolved_dir() else {
        bail!("Could not determine the cache directory; set [cache] dir");
    };
    let cache = FileResponseCache::new(&dir);
    let stats = cache.stats()?;
    let removed = cache
        .clear()
        .with_context(|| format!("Failed to clear cache at {}", dir.display()))?;
    println!(
        "Removed {} cached responses ({} bytes) from {}",
        removed,
        stats.total_bytes,
        dir.display()
    );
    Ok(())
}

fn build_use_case<G: OracleGateway + 'static>(
    gateway: Arc<G>,
    config: &FileConfig,
    run_config: &RunConfig,
) -> RunAnnotationUseCase<G> {
    let mut use_case = RunAnnotationUseCase::new(gateway);

    if run_config.use_cache {
        match config.cache.resolved_dir() {
            Some(dir) => {
                info!(dir = %dir.display(), "Using response cache");
                use_case = use_case.with_cache(Arc::new(FileResponseCache::new(dir)));
            }
            None => warn!("No cache directory available; running without cache"),
        }
    }

    if let Some(path) = &config.logging.conversation_log
        && let Some(logger) = JsonlConversationLogger::new(path)
    {
        info!(path = %logger.path().display(), "Writing conversation log");
        use_case = use_case.with_conversation_logger(Arc::new(logger));
    }

    use_case
}

async fn run<G: OracleGateway + 'static>(
    use_case: &RunAnnotationUseCase<G>,
    cli: &Cli,
    run_config: &RunConfig,
    sets: &[MarkerSet],
) -> Result<Vec<FinalReport>> {
    let progress: Box<dyn ProgressNotifier> = if cli.quiet {
        Box::new(NoProgress)
    } else if std::io::stderr().is_terminal() {
        Box::new(ProgressReporter::new())
    } else {
        Box::new(SimpleProgress)
    };

    if !cli.quiet {
        print_header(run_config, sets, &cli.markers);
    }

    let reports = match sets {
        [markers] => vec![
            use_case
                .execute_with_progress(run_config, markers, progress.as_ref())
                .await?,
        ],
        _ => {
            use_case
                .execute_batch(run_config, sets, progress.as_ref())
                .await?
        }
    };
    Ok(reports)
}

fn print_header(run_config: &RunConfig, sets: &[MarkerSet], paths: &[PathBuf]) {
    eprintln!();
    for (markers, path) in sets.iter().zip(paths) {
        eprintln!(
            "Annotating {} clusters from {} ({})",
            markers.len(),
            path.display(),
            run_config.context.describe()
        );
    }
    if sets.len() > 1 {
        eprintln!("Batched: one prompt per oracle covers all {} marker sets", sets.len());
    }
    eprintln!(
        "Oracles: {}",
        run_config
            .oracles
            .iter()
            .map(|o| o.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    eprintln!();
}
