//! The analysis pipeline: loaded data, text entries and named results,
//! advanced by chained operations.
//!
//! ```no_run
//! use data_text_pipeline::{CleanStrategy, Pipeline};
//!
//! # fn main() -> data_text_pipeline::Result<()> {
//! let mut pipeline = Pipeline::with_cache(".cache")?;
//! pipeline
//!     .load_structured_data("data/products.csv")?
//!     .load_text_column("review")?
//!     .clean_data(CleanStrategy::Drop)?
//!     .clean_text()?
//!     .analyze_data()?
//!     .analyze_sentiment()?;
//! println!("{}", pipeline.generate_report());
//! # Ok(())
//! # }
//! ```
//!
//! Every expensive step goes through the cache when one is attached. Loads
//! are keyed by the file's stamp, analyses by the exact text entries (or
//! table) they run on plus their parameters.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheManager, CacheStats, Category, FileStamp};
use crate::charts;
use crate::config::Config;
use crate::documents;
use crate::entities::{self, EntitySummary};
use crate::error::{PipelineError, Result};
use crate::export::{self, ExportFormat, ResultTable};
use crate::keywords::{self, Keyword, KeywordMethod, Topics};
use crate::readability::{self, ComplexityReport};
use crate::sentiment::{self, SentimentSummary};
use crate::stats::{
    self, Correlation, CorrelationStrength, DataStatistics, TextStatistics, describe, pearson,
};
use crate::table::{CleanStrategy, Table};
use crate::textclean::{TextEntry, clean_text};

const BANNER_WIDTH: usize = 60;

/// Anything an operation can leave behind in the results map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnalysisResult {
    DataStatistics(DataStatistics),
    TextStatistics(TextStatistics),
    Correlation(Correlation),
    Sentiment(SentimentSummary),
    Entities(EntitySummary),
    Keywords {
        method: KeywordMethod,
        keywords: Vec<Keyword>,
    },
    Topics(Topics),
    Readability(ComplexityReport),
}

/// Sizes of the current state and which analyses have run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub data_rows: usize,
    pub data_columns: usize,
    pub text_entries: usize,
    pub analyses: Vec<String>,
}

impl std::fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rule = "=".repeat(BANNER_WIDTH);
        writeln!(f, "{rule}\nPIPELINE SUMMARY\n{rule}")?;
        writeln!(f, "Data rows: {}", self.data_rows)?;
        writeln!(f, "Data columns: {}", self.data_columns)?;
        writeln!(f, "Text entries: {}", self.text_entries)?;
        write!(f, "Analyses: {}", self.analyses.join(", "))
    }
}

#[derive(Debug, Default)]
pub struct Pipeline {
    config: Config,
    cache: Option<CacheManager>,
    table: Option<Table>,
    texts: Vec<TextEntry>,
    source: Option<PathBuf>,
    results: BTreeMap<String, AnalysisResult>,
}

/// Consult the cache when there is one, otherwise just compute.
fn cached<T, K, F>(
    cache: &mut Option<CacheManager>,
    category: Category,
    operation: &str,
    inputs: &K,
    compute: F,
) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    K: Serialize + ?Sized,
    F: FnOnce() -> Result<T>,
{
    match cache {
        Some(cache) => cache.get_or_compute(category, operation, inputs, compute),
        None => compute(),
    }
}

impl Pipeline {
    /// No cache, default configuration.
    pub fn new() -> Self {
        Pipeline::default()
    }

    pub fn with_cache(dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Pipeline {
            cache: Some(CacheManager::new(dir)?),
            ..Pipeline::default()
        })
    }

    /// Attach a cache at `config.cache.directory` unless `use_cache` is off.
    pub fn from_config(config: Config) -> Result<Self> {
        let cache = if config.pipeline.use_cache {
            Some(CacheManager::new(&config.cache.directory)?)
        } else {
            None
        };
        Ok(Pipeline {
            config,
            cache,
            ..Pipeline::default()
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    pub fn texts(&self) -> &[TextEntry] {
        &self.texts
    }

    pub fn results(&self) -> &BTreeMap<String, AnalysisResult> {
        &self.results
    }

    pub fn result(&self, name: &str) -> Option<&AnalysisResult> {
        self.results.get(name)
    }

    pub fn cache(&self) -> Option<&CacheManager> {
        self.cache.as_ref()
    }

    pub fn cache_stats(&self) -> Option<Result<CacheStats>> {
        self.cache.as_ref().map(CacheManager::stats)
    }

    fn require_table(&self) -> Result<&Table> {
        self.table.as_ref().ok_or(PipelineError::MissingPrerequisite(
            "no structured data loaded; call load_structured_data first",
        ))
    }

    fn require_texts(&self) -> Result<()> {
        if self.texts.is_empty() {
            Err(PipelineError::MissingPrerequisite(
                "no text loaded; call load_text_column or load_text_file first",
            ))
        } else {
            Ok(())
        }
    }

    // ---- loading ----

    /// Load a CSV or JSON table.
    pub fn load_structured_data(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::NotFound(path.to_path_buf()));
        }
        let stamp = FileStamp::of(path)?;
        let table = cached(
            &mut self.cache,
            Category::Data,
            "load_structured_data",
            &stamp,
            || Table::load(path),
        )?;
        info!(
            "Loaded {} rows x {} columns from {}",
            table.len(),
            table.columns().len(),
            path.display()
        );
        self.table = Some(table);
        self.source = Some(path.to_path_buf());
        Ok(self)
    }

    /// Take the non-missing values of a table column as the text to analyse.
    pub fn load_text_column(&mut self, column: &str) -> Result<&mut Self> {
        let texts = self.require_table()?.text_values(column)?;
        info!("Loaded {} text entries from column '{}'", texts.len(), column);
        self.texts = texts;
        Ok(self)
    }

    /// Read a text document, one entry per non-empty line.
    pub fn load_text_file(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::NotFound(path.to_path_buf()));
        }
        let stamp = FileStamp::of(path)?;
        let texts = cached(&mut self.cache, Category::Data, "load_text_file", &stamp, || {
            documents::load_text_entries(path)
        })?;
        info!("Loaded {} text entries from {}", texts.len(), path.display());
        self.texts = texts;
        if self.source.is_none() {
            self.source = Some(path.to_path_buf());
        }
        Ok(self)
    }

    // ---- cleaning ----

    /// Handle missing values, then remove duplicate rows.
    pub fn clean_data(&mut self, strategy: CleanStrategy) -> Result<&mut Self> {
        let Some(table) = self.table.as_mut() else {
            warn!("clean_data: no structured data loaded, skipping");
            return Ok(self);
        };
        let summary = table.clean(strategy);
        info!(
            "Cleaned data with '{}': {} -> {} rows ({} removed)",
            strategy.as_str(),
            summary.rows_before,
            summary.rows_after,
            summary.removed()
        );
        Ok(self)
    }

    /// Strip URLs, e-mail addresses and special characters; drop entries left empty.
    pub fn clean_text(&mut self) -> Result<&mut Self> {
        if self.texts.is_empty() {
            warn!("clean_text: no text loaded, skipping");
            return Ok(self);
        }
        let before = self.texts.len();
        self.texts = std::mem::take(&mut self.texts)
            .into_iter()
            .filter_map(|entry| {
                let text = clean_text(&entry.text);
                (!text.is_empty()).then_some(TextEntry { text, ..entry })
            })
            .collect();
        info!("Cleaned {} text entries ({} kept)", before, self.texts.len());
        Ok(self)
    }

    // ---- statistics ----

    /// Mean, median, standard deviation and range of every numeric column.
    pub fn analyze_data(&mut self) -> Result<&mut Self> {
        let table = self.table.as_ref().ok_or(PipelineError::MissingPrerequisite(
            "no structured data loaded; call load_structured_data first",
        ))?;
        let statistics: DataStatistics =
            cached(&mut self.cache, Category::Analysis, "analyze_data", table, || {
                Ok(table
                    .numeric_columns()
                    .into_iter()
                    .filter_map(|name| {
                        let values: Vec<f64> = table
                            .numeric_values(name)
                            .ok()?
                            .into_iter()
                            .map(|(_, v)| v)
                            .collect();
                        describe(&values).map(|s| (name.to_string(), s))
                    })
                    .collect())
            })?;
        if statistics.is_empty() {
            warn!("analyze_data: no numeric columns found");
            return Ok(self);
        }
        info!("Analyzed {} numeric columns", statistics.len());
        self.results.insert(
            "data_statistics".to_string(),
            AnalysisResult::DataStatistics(statistics),
        );
        Ok(self)
    }

    /// Word counts, vocabulary size, top words and language.
    pub fn analyze_text(&mut self) -> Result<&mut Self> {
        self.require_texts()?;
        let statistics: TextStatistics =
            cached(&mut self.cache, Category::Analysis, "analyze_text", &self.texts, || {
                Ok(stats::text_statistics(&self.texts))
            })?;
        info!(
            "Analyzed {} text entries ({} words)",
            statistics.total_entries, statistics.total_words
        );
        self.results.insert(
            "text_statistics".to_string(),
            AnalysisResult::TextStatistics(statistics),
        );
        Ok(self)
    }

    /// Pearson correlation between a numeric column and the word count of
    /// the text from the same row.
    pub fn correlate_data_with_text_length(&mut self, column: &str) -> Result<&mut Self> {
        self.require_texts()?;
        let lengths: HashMap<usize, f64> = self
            .texts
            .iter()
            .filter_map(|e| e.row.map(|row| (row, e.word_count() as f64)))
            .collect();
        let correlation = self.correlate(column, "text_length", &lengths)?;
        info!(
            "Correlation of '{}' with text length: {:.3} ({})",
            column, correlation.coefficient, correlation.strength
        );
        self.results
            .insert("correlation".to_string(), AnalysisResult::Correlation(correlation));
        Ok(self)
    }

    /// Pearson correlation between a numeric column and per-row polarity.
    pub fn correlate_sentiment_with_column(&mut self, column: &str) -> Result<&mut Self> {
        let Some(AnalysisResult::Sentiment(summary)) = self.results.get("sentiment") else {
            return Err(PipelineError::MissingPrerequisite(
                "no sentiment results; call analyze_sentiment first",
            ));
        };
        let polarity: HashMap<usize, f64> = summary
            .sentiments
            .iter()
            .filter_map(|s| s.row.map(|row| (row, s.polarity)))
            .collect();
        let correlation = self.correlate(column, "sentiment_polarity", &polarity)?;
        info!(
            "Correlation of '{}' with sentiment: {:.3} ({})",
            column, correlation.coefficient, correlation.strength
        );
        self.results.insert(
            "sentiment_correlation".to_string(),
            AnalysisResult::Correlation(correlation),
        );
        Ok(self)
    }

    fn correlate(
        &self,
        column: &str,
        against: &str,
        by_row: &HashMap<usize, f64>,
    ) -> Result<Correlation> {
        let values = self.require_table()?.numeric_values(column)?;
        let (xs, ys): (Vec<f64>, Vec<f64>) = values
            .into_iter()
            .filter_map(|(row, x)| by_row.get(&row).map(|y| (x, *y)))
            .unzip();
        if xs.len() < 2 {
            return Err(PipelineError::InsufficientData(format!(
                "'{column}' and {against} share {} row(s), need at least 2",
                xs.len()
            )));
        }
        let coefficient = pearson(&xs, &ys).ok_or_else(|| {
            PipelineError::InsufficientData(format!("'{column}' or {against} is constant"))
        })?;
        Ok(Correlation {
            column: column.to_string(),
            against: against.to_string(),
            coefficient,
            pairs: xs.len(),
            strength: CorrelationStrength::of(coefficient),
        })
    }

    // ---- NLP ----

    pub fn analyze_sentiment(&mut self) -> Result<&mut Self> {
        self.require_texts()?;
        let summary: SentimentSummary =
            cached(&mut self.cache, Category::Nlp, "analyze_sentiment", &self.texts, || {
                Ok(sentiment::analyze(&self.texts))
            })?;
        info!(
            "Sentiment: {} positive, {} neutral, {} negative (avg polarity {:.3})",
            summary.positive_count,
            summary.neutral_count,
            summary.negative_count,
            summary.avg_polarity
        );
        self.results
            .insert("sentiment".to_string(), AnalysisResult::Sentiment(summary));
        Ok(self)
    }

    pub fn extract_entities(&mut self) -> Result<&mut Self> {
        self.require_texts()?;
        let summary: EntitySummary =
            cached(&mut self.cache, Category::Nlp, "extract_entities", &self.texts, || {
                Ok(entities::summarize(&self.texts))
            })?;
        info!(
            "Extracted {} entity mentions across {} types",
            summary.values().map(|c| c.total).sum::<usize>(),
            summary.len()
        );
        self.results
            .insert("entities".to_string(), AnalysisResult::Entities(summary));
        Ok(self)
    }

    pub fn extract_keywords(&mut self, method: KeywordMethod, top_n: usize) -> Result<&mut Self> {
        self.require_texts()?;
        let inputs = (method, top_n, &self.texts);
        let found: Vec<Keyword> =
            cached(&mut self.cache, Category::Nlp, "extract_keywords", &inputs, || {
                Ok(keywords::extract(&self.texts, method, top_n))
            })?;
        info!("Extracted {} keywords with {}", found.len(), method);
        self.results.insert(
            "keywords".to_string(),
            AnalysisResult::Keywords {
                method,
                keywords: found,
            },
        );
        Ok(self)
    }

    pub fn detect_topics(&mut self) -> Result<&mut Self> {
        self.require_texts()?;
        let topics: Topics =
            cached(&mut self.cache, Category::Nlp, "detect_topics", &self.texts, || {
                Ok(keywords::detect_topics(&self.texts))
            })?;
        info!("Detected {} topics", topics.len());
        self.results
            .insert("topics".to_string(), AnalysisResult::Topics(topics));
        Ok(self)
    }

    pub fn analyze_complexity(&mut self) -> Result<&mut Self> {
        self.require_texts()?;
        let report: ComplexityReport =
            cached(&mut self.cache, Category::Nlp, "analyze_complexity", &self.texts, || {
                Ok(readability::complexity(&self.texts))
            })?;
        info!(
            "Average reading ease {:.1}: {}",
            report.avg_reading_ease, report.interpretation
        );
        self.results
            .insert("readability".to_string(), AnalysisResult::Readability(report));
        Ok(self)
    }

    // ---- output ----

    /// Draw charts for the current results into `dir`.
    pub fn create_visualizations(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let viz = &self.config.visualization;
        charts::render_all(
            &self.results,
            dir.as_ref(),
            (viz.width, viz.height),
            viz.create_dashboard,
        )
    }

    /// Write every result table, and the enriched data table when sentiment
    /// or entity columns are configured and a table is loaded.
    pub fn export_results(
        &self,
        format: ExportFormat,
        dir: impl AsRef<Path>,
    ) -> Result<Vec<PathBuf>> {
        let mut tables: Vec<ResultTable> = self
            .results
            .iter()
            .flat_map(|(name, result)| export::result_tables(name, result))
            .collect();

        if let Some(table) = &self.table {
            let options = &self.config.export;
            let sentiment = match self.results.get("sentiment") {
                Some(AnalysisResult::Sentiment(s)) if options.include_sentiment => Some(s),
                _ => None,
            };
            let entity_texts = options.include_entities.then_some(self.texts.as_slice());
            if sentiment.is_some() || entity_texts.is_some() {
                tables.push(export::enriched_table(table, sentiment, entity_texts));
            }
        }

        if tables.is_empty() {
            warn!("export_results: nothing to export");
            return Ok(Vec::new());
        }
        export::export_tables(&tables, dir.as_ref(), &self.export_stem(), format)
    }

    fn export_stem(&self) -> String {
        self.source
            .as_deref()
            .and_then(Path::file_stem)
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pipeline".to_string())
    }

    pub fn generate_report(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(BANNER_WIDTH);
        let dash = "-".repeat(BANNER_WIDTH);
        let section = |out: &mut String, title: &str| {
            let _ = write!(out, "\n\n{title}\n{dash}\n");
        };

        let _ = write!(out, "{rule}\nUNIFIED PIPELINE ANALYSIS REPORT\n{rule}");
        if let Some(source) = &self.source {
            let _ = write!(out, "\nSource: {}", source.display());
        }

        for (name, result) in &self.results {
            match result {
                AnalysisResult::DataStatistics(stats) => {
                    section(&mut out, "STRUCTURED DATA STATISTICS");
                    for (column, s) in stats {
                        let _ = writeln!(out, "{column}:");
                        let _ = writeln!(out, "  Mean: {:.2}", s.mean);
                        let _ = writeln!(out, "  Median: {:.2}", s.median);
                        let _ = writeln!(out, "  Std Dev: {:.2}", s.std);
                        let _ = writeln!(out, "  Range: {:.2} - {:.2}", s.min, s.max);
                    }
                }
                AnalysisResult::TextStatistics(t) => {
                    section(&mut out, "TEXT ANALYSIS");
                    let _ = writeln!(out, "Total entries: {}", t.total_entries);
                    let _ = writeln!(out, "Total words: {}", t.total_words);
                    let _ = writeln!(out, "Unique words: {}", t.unique_words);
                    let _ = writeln!(out, "Avg words/entry: {:.1}", t.avg_words_per_entry);
                    if let (Some(lang), Some(conf)) = (&t.language, t.language_confidence) {
                        let _ = writeln!(out, "Language: {lang} (confidence {conf:.2})");
                    }
                    let _ = writeln!(out, "Top {} words:", t.top_words.len());
                    for (word, count) in &t.top_words {
                        let _ = writeln!(out, "  {word}: {count}");
                    }
                }
                AnalysisResult::Correlation(c) => {
                    let title = if name == "sentiment_correlation" {
                        "SENTIMENT CORRELATION"
                    } else {
                        "CORRELATION ANALYSIS"
                    };
                    section(&mut out, title);
                    let _ = writeln!(out, "Column: {}", c.column);
                    let _ = writeln!(
                        out,
                        "Correlation with {}: {:.3} ({} pairs)",
                        c.against, c.coefficient, c.pairs
                    );
                    let _ = writeln!(out, "Interpretation: {} correlation", c.strength);
                }
                AnalysisResult::Sentiment(s) => {
                    section(&mut out, "SENTIMENT ANALYSIS");
                    let _ = writeln!(out, "Entries: {}", s.total);
                    let _ = writeln!(out, "Average polarity: {:.3}", s.avg_polarity);
                    let _ = writeln!(out, "Average subjectivity: {:.3}", s.avg_subjectivity);
                    let _ = writeln!(out, "Positive: {}", s.positive_count);
                    let _ = writeln!(out, "Neutral: {}", s.neutral_count);
                    let _ = writeln!(out, "Negative: {}", s.negative_count);
                }
                AnalysisResult::Entities(summary) => {
                    section(&mut out, "NAMED ENTITIES");
                    for (kind, counts) in summary {
                        let top: Vec<String> = counts
                            .top
                            .iter()
                            .map(|(e, n)| format!("{e} ({n})"))
                            .collect();
                        let _ = writeln!(
                            out,
                            "{kind}: {} mentions, {} unique. Top: {}",
                            counts.total,
                            counts.unique,
                            top.join(", ")
                        );
                    }
                }
                AnalysisResult::Keywords { method, keywords } => {
                    section(&mut out, &format!("KEYWORDS ({})", method.as_str().to_uppercase()));
                    for k in keywords {
                        let _ = writeln!(out, "  {}: {:.3}", k.phrase, k.score);
                    }
                }
                AnalysisResult::Topics(topics) => {
                    section(&mut out, "TOPICS");
                    for (topic, words) in topics {
                        let _ = writeln!(out, "{topic}: {}", words.join(", "));
                    }
                }
                AnalysisResult::Readability(r) => {
                    section(&mut out, "READABILITY");
                    let _ = writeln!(out, "Average reading ease: {:.2}", r.avg_reading_ease);
                    let _ = writeln!(out, "Average grade level: {:.2}", r.avg_grade_level);
                    let _ = writeln!(out, "Interpretation: {}", r.interpretation);
                }
            }
        }

        let _ = write!(out, "\n{rule}\nREPORT COMPLETE\n{rule}\n");
        out
    }

    /// Write the report, creating parent directories.
    pub fn save_report(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.generate_report())?;
        info!("Report saved to {}", path.display());
        Ok(path.to_path_buf())
    }

    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            data_rows: self.table.as_ref().map(Table::len).unwrap_or(0),
            data_columns: self.table.as_ref().map(|t| t.columns().len()).unwrap_or(0),
            text_entries: self.texts.len(),
            analyses: self.results.keys().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PRODUCTS: &str = "product,rating,price,review\n\
        Laptop,4.5,1200,Great laptop! Fast performance and excellent build quality.\n\
        Phone,3.8,800,Good phone but battery life could be better.\n\
        Tablet,4.2,600,Nice tablet for media consumption. Screen is beautiful.\n\
        Monitor,4.7,400,Amazing monitor! Colors are vibrant and sharp.\n\
        Keyboard,3.5,150,Keyboard is okay but keys feel cheap.\n";

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, content).unwrap();
        p
    }

    #[test]
    fn chained_run_over_products() {
        let td = tempdir().unwrap();
        let csv = write(td.path(), "products.csv", PRODUCTS);
        let mut p = Pipeline::new();
        p.load_structured_data(&csv)
            .unwrap()
            .load_text_column("review")
            .unwrap()
            .clean_data(CleanStrategy::Drop)
            .unwrap()
            .clean_text()
            .unwrap()
            .analyze_data()
            .unwrap()
            .analyze_text()
            .unwrap()
            .correlate_data_with_text_length("rating")
            .unwrap();

        assert_eq!(p.table().unwrap().len(), 5);
        assert_eq!(p.texts().len(), 5);
        let Some(AnalysisResult::DataStatistics(stats)) = p.result("data_statistics") else {
            panic!("missing data statistics");
        };
        assert!((stats["rating"].mean - 4.14).abs() < 1e-9);
        assert_eq!(stats["price"].max, 1200.0);
        let Some(AnalysisResult::Correlation(c)) = p.result("correlation") else {
            panic!("missing correlation");
        };
        assert_eq!(c.pairs, 5);
        assert!((-1.0..=1.0).contains(&c.coefficient));

        let summary = p.summary();
        assert_eq!(summary.data_rows, 5);
        assert_eq!(summary.data_columns, 4);
        assert_eq!(
            summary.analyses,
            vec!["correlation", "data_statistics", "text_statistics"]
        );
    }

    #[test]
    fn null_text_cells_are_skipped() {
        let td = tempdir().unwrap();
        let json = write(
            td.path(),
            "r.json",
            r#"[{"id": 1, "review": "great!"}, {"id": 2, "review": null}, {"id": 3, "review": "bad product"}]"#,
        );
        let mut p = Pipeline::new();
        p.load_structured_data(&json).unwrap().load_text_column("review").unwrap();
        let texts: Vec<&str> = p.texts().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["great!", "bad product"]);
        assert_eq!(p.texts()[1].row, Some(2));
    }

    #[test]
    fn missing_prerequisites_are_reported() {
        let mut p = Pipeline::new();
        assert!(matches!(
            p.load_text_column("review"),
            Err(PipelineError::MissingPrerequisite(_))
        ));
        assert!(matches!(p.analyze_data(), Err(PipelineError::MissingPrerequisite(_))));
        assert!(matches!(
            p.analyze_sentiment(),
            Err(PipelineError::MissingPrerequisite(_))
        ));
        assert!(matches!(
            p.correlate_sentiment_with_column("rating"),
            Err(PipelineError::MissingPrerequisite(_))
        ));
        // cleaning with nothing loaded is a warning only
        p.clean_data(CleanStrategy::Fill).unwrap().clean_text().unwrap();
    }

    #[test]
    fn unknown_inputs() {
        let td = tempdir().unwrap();
        let mut p = Pipeline::new();
        assert!(matches!(
            p.load_structured_data(td.path().join("nope.csv")),
            Err(PipelineError::NotFound(_))
        ));
        let xlsx = write(td.path(), "data.xlsx", "PK");
        assert!(matches!(
            p.load_structured_data(&xlsx),
            Err(PipelineError::UnsupportedFormat(_))
        ));
        let csv = write(td.path(), "products.csv", PRODUCTS);
        p.load_structured_data(&csv).unwrap();
        assert!(matches!(
            p.load_text_column("missing"),
            Err(PipelineError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn correlation_pairs_survive_row_drops() {
        let td = tempdir().unwrap();
        let csv = write(
            td.path(),
            "d.csv",
            "score,review\n1,one\n,dropped row here\n2,one two\n3,one two three\n",
        );
        let mut p = Pipeline::new();
        p.load_structured_data(&csv)
            .unwrap()
            .load_text_column("review")
            .unwrap()
            .clean_data(CleanStrategy::Drop)
            .unwrap()
            .correlate_data_with_text_length("score")
            .unwrap();
        let Some(AnalysisResult::Correlation(c)) = p.result("correlation") else {
            panic!("missing correlation");
        };
        assert_eq!(c.pairs, 3);
        assert!((c.coefficient - 1.0).abs() < 1e-9);
        assert_eq!(c.strength, CorrelationStrength::Strong);
    }

    #[test]
    fn nlp_results_and_sentiment_correlation() {
        let td = tempdir().unwrap();
        let csv = write(td.path(), "products.csv", PRODUCTS);
        let mut p = Pipeline::new();
        p.load_structured_data(&csv)
            .unwrap()
            .load_text_column("review")
            .unwrap()
            .analyze_sentiment()
            .unwrap()
            .correlate_sentiment_with_column("rating")
            .unwrap()
            .extract_entities()
            .unwrap()
            .extract_keywords(KeywordMethod::Rake, 5)
            .unwrap()
            .detect_topics()
            .unwrap()
            .analyze_complexity()
            .unwrap();

        let Some(AnalysisResult::Sentiment(s)) = p.result("sentiment") else {
            panic!("missing sentiment");
        };
        assert_eq!(s.total, 5);
        assert_eq!(s.positive_count + s.neutral_count + s.negative_count, 5);
        let Some(AnalysisResult::Keywords { keywords, .. }) = p.result("keywords") else {
            panic!("missing keywords");
        };
        assert!(keywords.len() <= 5);
        assert!(p.result("sentiment_correlation").is_some());
        assert!(p.result("topics").is_some());
        assert!(p.result("readability").is_some());
    }

    #[test]
    fn second_run_is_served_from_cache() {
        let td = tempdir().unwrap();
        let csv = write(td.path(), "products.csv", PRODUCTS);
        let cache_dir = td.path().join("cache");

        let run = || {
            let mut p = Pipeline::with_cache(&cache_dir).unwrap();
            p.load_structured_data(&csv)
                .unwrap()
                .load_text_column("review")
                .unwrap()
                .analyze_sentiment()
                .unwrap();
            p
        };
        let first = run();
        let stats = first.cache_stats().unwrap().unwrap();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.writes, 2);

        let second = run();
        let stats = second.cache_stats().unwrap().unwrap();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 0);
        assert_eq!(first.result("sentiment"), second.result("sentiment"));
    }

    #[test]
    fn cached_table_keeps_analysis_fingerprint() {
        let td = tempdir().unwrap();
        let csv = write(
            td.path(),
            "scores.csv",
            "score,weight\n0.46499999999999997,1.1\n0.30000000000000004,2.2\n",
        );
        let cache_dir = td.path().join("cache");
        let run = || {
            let mut p = Pipeline::with_cache(&cache_dir).unwrap();
            p.load_structured_data(&csv).unwrap().analyze_data().unwrap();
            p
        };

        let first = run();
        let stats = first.cache_stats().unwrap().unwrap();
        assert_eq!((stats.hits, stats.misses), (0, 2));

        let second = run();
        let stats = second.cache_stats().unwrap().unwrap();
        assert_eq!((stats.hits, stats.misses), (2, 0));
        assert_eq!(first.table(), second.table());
        assert_eq!(first.result("data_statistics"), second.result("data_statistics"));
    }

    #[test]
    fn summary_counts_rows_columns_and_entries() {
        let td = tempdir().unwrap();
        let csv = write(td.path(), "products.csv", PRODUCTS);
        let mut p = Pipeline::new();
        p.load_structured_data(&csv)
            .unwrap()
            .load_text_column("review")
            .unwrap()
            .analyze_sentiment()
            .unwrap();
        let summary = p.summary();
        assert_eq!(summary.analyses, vec!["sentiment".to_string()]);
        let printed = summary.to_string();
        assert!(printed.contains("PIPELINE SUMMARY"));
        assert!(printed.contains(&format!("Data rows: {}", summary.data_rows)));
        assert!(printed.contains(&format!("Text entries: {}", summary.text_entries)));
        assert!(printed.ends_with("Analyses: sentiment"));
    }

    #[test]
    fn report_lists_sections() {
        let td = tempdir().unwrap();
        let csv = write(td.path(), "products.csv", PRODUCTS);
        let mut p = Pipeline::new();
        p.load_structured_data(&csv)
            .unwrap()
            .load_text_column("review")
            .unwrap()
            .analyze_data()
            .unwrap()
            .analyze_text()
            .unwrap()
            .analyze_sentiment()
            .unwrap();
        let report = p.generate_report();
        assert!(report.starts_with(&"=".repeat(60)));
        assert!(report.contains("UNIFIED PIPELINE ANALYSIS REPORT"));
        assert!(report.contains("STRUCTURED DATA STATISTICS"));
        assert!(report.contains("  Mean: 4.14"));
        assert!(report.contains("TEXT ANALYSIS"));
        assert!(report.contains("SENTIMENT ANALYSIS"));
        assert!(report.trim_end().ends_with(&"=".repeat(60)));

        let saved = p.save_report(td.path().join("out/report.txt")).unwrap();
        assert_eq!(fs::read_to_string(saved).unwrap(), report);
    }

    #[test]
    fn exports_include_enriched_table() {
        let td = tempdir().unwrap();
        let csv = write(td.path(), "products.csv", PRODUCTS);
        let mut p = Pipeline::new();
        p.load_structured_data(&csv)
            .unwrap()
            .load_text_column("review")
            .unwrap()
            .analyze_sentiment()
            .unwrap();
        let out = td.path().join("exports");
        let written = p.export_results(ExportFormat::Csv, &out).unwrap();
        assert_eq!(written.len(), 2);
        let enriched = written
            .iter()
            .find(|w| w.to_string_lossy().ends_with("_data_enriched.csv"))
            .unwrap();
        let content = fs::read_to_string(enriched).unwrap();
        assert!(content.starts_with(
            "product,rating,price,review,sentiment_polarity,sentiment_subjectivity\n"
        ));
        assert_eq!(content.lines().count(), 6);
    }

    #[test]
    fn text_file_input() {
        let td = tempdir().unwrap();
        let txt = write(
            td.path(),
            "notes.txt",
            "Apple Inc. opened an office in Seattle.\n\nVisit https://example.com now!!!\n",
        );
        let mut p = Pipeline::new();
        p.load_text_file(&txt).unwrap().clean_text().unwrap();
        assert_eq!(p.texts().len(), 2);
        assert_eq!(p.texts()[1].text, "Visit now");
        p.extract_entities().unwrap();
        let Some(AnalysisResult::Entities(e)) = p.result("entities") else {
            panic!("missing entities");
        };
        assert!(!e.is_empty());
    }
}
