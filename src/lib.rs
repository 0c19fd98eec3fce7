#![forbid(unsafe_code)]
//! # data_text_pipeline
//!
//! Load a table (CSV / JSON) or a text document (TXT, PDF, DOCX, ODT), clean
//! it, and run statistics and NLP analyses over it: descriptive statistics,
//! text statistics, correlation, sentiment, named entities, keywords, topics
//! and readability. Results end up in a text report, SVG charts and
//! CSV / TSV / JSON / TXT exports.
//!
//! Expensive steps are cached on disk by [`CacheManager`], keyed by a
//! fingerprint of the operation and its exact inputs and partitioned into
//! the `data`, `analysis` and `nlp` categories.
//!
//! The entry point is [`Pipeline`]; every operation returns
//! `Result<&mut Pipeline>` so calls chain with `?`.

pub mod batch;
pub mod cache;
pub mod charts;
pub mod config;
pub mod documents;
pub mod entities;
pub mod error;
pub mod export;
pub mod keywords;
pub mod pipeline;
pub mod readability;
pub mod sentiment;
pub mod stats;
pub mod table;
pub mod textclean;

pub use batch::{BatchReport, collect_files, print_failed_files, run_batch};
pub use cache::{CacheManager, CacheStats, Category, FileStamp, Fingerprint};
pub use config::Config;
pub use error::{PipelineError, Result};
pub use export::{ExportFormat, csv_safe_cell};
pub use keywords::KeywordMethod;
pub use pipeline::{AnalysisResult, Pipeline, PipelineSummary};
pub use table::{Cell, CleanStrategy, Table};
pub use textclean::{TextEntry, count_words, sort_map_to_vec, trim_to_words};
