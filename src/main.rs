#![forbid(unsafe_code)]
//! # data_text_pipeline CLI
//!
//! Runs the analysis pipeline over one or more data files (`.csv`, `.json`)
//! or text documents (`.txt`, `.md`, `.pdf`, `.docx`, `.odt`). Directories are
//! walked for data files; more than one resolved file runs in batch mode,
//! where a failing file is reported and the rest still run.
//!
//! ## Example
//! ```bash
//! data_text_pipeline data/products.csv -t review --clean --all -o output
//! data_text_pipeline data/ -t review --sentiment --export json
//! data_text_pipeline --clear-cache=nlp --cache-stats
//! ```
//!
//! Set `RUST_LOG=info` to follow progress, `RUST_LOG=debug` to see cache hits.

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use log::{error, info, warn};

use data_text_pipeline::batch::DATA_EXTENSIONS;
use data_text_pipeline::{
    CacheManager, CacheStats, Category, CleanStrategy, Config, ExportFormat, KeywordMethod,
    Pipeline, Result, collect_files, print_failed_files, run_batch,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Data files, text documents or directories to analyze
    #[arg(required_unless_present_any = ["clear_cache", "cache_stats"])]
    inputs: Vec<PathBuf>,

    /// Column of the data file holding the text to analyze
    #[arg(short = 't', long)]
    text_column: Option<String>,

    /// Additional text document to analyze (.txt, .md, .pdf, .docx, .odt)
    #[arg(long)]
    text_file: Option<PathBuf>,

    /// Clean data and text before analysis
    #[arg(short, long, default_value_t = false)]
    clean: bool,

    /// How missing values are cleaned (default from config: drop)
    #[arg(long, value_enum)]
    clean_strategy: Option<CleanStrategy>,

    /// Statistics of every numeric column
    #[arg(long, default_value_t = false)]
    analyze_data: bool,

    /// Word counts, top words and language of the text
    #[arg(long, default_value_t = false)]
    analyze_text: bool,

    /// Sentiment polarity and subjectivity
    #[arg(long, default_value_t = false)]
    sentiment: bool,

    /// Named entities by type
    #[arg(long, default_value_t = false)]
    entities: bool,

    /// Keyword extraction method
    #[arg(long, value_enum)]
    keywords: Option<KeywordMethod>,

    /// Bucket keywords into topics
    #[arg(long, default_value_t = false)]
    topics: bool,

    /// Readability scores
    #[arg(long, default_value_t = false)]
    complexity: bool,

    /// Run every analysis enabled in the config, draw charts and export in the config's format
    #[arg(short, long, default_value_t = false)]
    all: bool,

    /// Correlate a numeric column with text length (and sentiment, if analyzed)
    #[arg(long, value_name = "COLUMN")]
    correlate: Option<String>,

    /// Write SVG charts of the results (implied by --all)
    #[arg(long, default_value_t = false)]
    visualize: bool,

    /// Export result tables in this format
    #[arg(long, value_enum)]
    export: Option<ExportFormat>,

    /// Output directory for reports, charts and exports (default from config: output)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file (.json, .yaml, .yml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not read or write the result cache
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// Cache directory (default from config: .cache)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Delete cached results of one category, or all of them
    #[arg(long, value_enum, require_equals = true, value_name = "CATEGORY")]
    clear_cache: Option<Option<Category>>,

    /// Print cache statistics when done
    #[arg(long, default_value_t = false)]
    cache_stats: bool,
}

impl Cli {
    /// Config file values, overridden by whatever was given on the command line.
    fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if self.no_cache {
            config.pipeline.use_cache = false;
        }
        if let Some(dir) = &self.cache_dir {
            config.cache.directory = dir.clone();
        }
        if let Some(strategy) = self.clean_strategy {
            config.pipeline.clean_strategy = strategy;
        }
        if let Some(method) = self.keywords {
            config.pipeline.keyword_method = method;
        }
        if let Some(format) = self.export {
            config.export.format = format;
        }
        if let Some(dir) = &self.output {
            config.output.directory = dir.clone();
        }
        Ok(config)
    }
}

fn is_data_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| DATA_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string())
}

/// Run the selected steps on one input and write its outputs.
fn process_file(cli: &Cli, config: &Config, path: &Path, batch: bool) -> Result<Pipeline> {
    let settings = &config.pipeline;
    let mut pipeline = Pipeline::from_config(config.clone())?;

    if is_data_file(path) {
        pipeline.load_structured_data(path)?;
        if let Some(column) = &cli.text_column {
            pipeline.load_text_column(column)?;
        }
    } else {
        pipeline.load_text_file(path)?;
    }
    if let Some(text_file) = &cli.text_file {
        pipeline.load_text_file(text_file)?;
    }

    if cli.clean {
        pipeline
            .clean_data(settings.clean_strategy)?
            .clean_text()?;
    }

    let has_table = pipeline.table().is_some();
    let has_text = !pipeline.texts().is_empty();
    if cli.all && !has_text {
        warn!("{}: no text loaded, running data analysis only", path.display());
    }

    if cli.analyze_data || (cli.all && has_table) {
        pipeline.analyze_data()?;
    }
    if cli.analyze_text || (cli.all && has_text) {
        pipeline.analyze_text()?;
    }
    if cli.sentiment || (cli.all && has_text && settings.analyze_sentiment) {
        pipeline.analyze_sentiment()?;
    }
    if cli.entities || (cli.all && has_text && settings.extract_entities) {
        pipeline.extract_entities()?;
    }
    if cli.keywords.is_some() || (cli.all && has_text && settings.extract_keywords) {
        pipeline.extract_keywords(settings.keyword_method, settings.top_n)?;
    }
    if cli.topics || (cli.all && has_text && settings.detect_topics) {
        pipeline.detect_topics()?;
    }
    if cli.complexity || (cli.all && has_text && settings.analyze_complexity) {
        pipeline.analyze_complexity()?;
    }
    if let Some(column) = &cli.correlate {
        pipeline.correlate_data_with_text_length(column)?;
        if pipeline.result("sentiment").is_some() {
            pipeline.correlate_sentiment_with_column(column)?;
        }
    }

    let stem = file_stem(path);
    let out_dir = &config.output.directory;
    let report_path = if batch {
        out_dir.join(format!("{stem}_{}", config.output.report_name))
    } else {
        config.report_path()
    };

    println!("{}", pipeline.generate_report());
    pipeline.save_report(&report_path)?;

    if cli.visualize || cli.all {
        let chart_dir = if batch {
            out_dir.join(format!("{stem}_charts"))
        } else {
            out_dir.join("charts")
        };
        let charts = pipeline.create_visualizations(&chart_dir)?;
        info!("{} chart(s) written to {}", charts.len(), chart_dir.display());
    }
    if cli.export.is_some() || cli.all {
        let files = pipeline.export_results(config.export.format, out_dir)?;
        info!("{} export file(s) written to {}", files.len(), out_dir.display());
    }
    println!("{}", pipeline.summary());
    Ok(pipeline)
}

/// Sum of per-file session counters.
fn add_counters(total: &mut CacheStats, stats: &CacheStats) {
    total.hits += stats.hits;
    total.misses += stats.misses;
    total.writes += stats.writes;
    total.write_errors += stats.write_errors;
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Error: {}", e);
            process::exit(1);
        }
    };

    if let Some(category) = cli.clear_cache {
        match CacheManager::new(&config.cache.directory).and_then(|mut c| c.clear(category)) {
            Ok(removed) => {
                let scope = category.map(|c| c.to_string()).unwrap_or_else(|| "all".into());
                println!("Cleared {removed} cached result(s) ({scope})");
            }
            Err(e) => {
                error!("Error clearing cache: {}", e);
                process::exit(1);
            }
        }
    }

    let files: Vec<PathBuf> = cli.inputs.iter().flat_map(|p| collect_files(p)).collect();
    if files.is_empty() && !cli.inputs.is_empty() {
        error!("Error: no data files found in the given inputs");
        process::exit(1);
    }

    let batch = files.len() > 1;
    let mut counters = CacheStats::default();
    let report = run_batch(&files, |path| {
        let pipeline = process_file(&cli, &config, path, batch)?;
        if let Some(Ok(stats)) = pipeline.cache_stats() {
            add_counters(&mut counters, &stats);
        }
        Ok(())
    });

    if cli.cache_stats {
        match CacheManager::new(&config.cache.directory).and_then(|c| c.stats()) {
            Ok(mut stats) => {
                add_counters(&mut stats, &counters);
                println!("Cache statistics ({}):", config.cache.directory.display());
                println!("{stats}");
            }
            Err(e) => {
                error!("Error reading cache statistics: {}", e);
                process::exit(1);
            }
        }
    }

    if !report.is_success() {
        print_failed_files(&report.failed_files);
        process::exit(1);
    }
}
