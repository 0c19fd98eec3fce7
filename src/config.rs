//! Run configuration, read from JSON or YAML.
//!
//! Every field has a default, so a file only needs the values it changes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::export::ExportFormat;
use crate::keywords::KeywordMethod;
use crate::table::CleanStrategy;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub cache: CacheConfig,
    pub visualization: VisualizationConfig,
    pub export: ExportConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub use_cache: bool,
    pub clean_strategy: CleanStrategy,
    pub analyze_sentiment: bool,
    pub extract_entities: bool,
    pub extract_keywords: bool,
    pub detect_topics: bool,
    pub analyze_complexity: bool,
    pub keyword_method: KeywordMethod,
    pub top_n: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            use_cache: true,
            clean_strategy: CleanStrategy::Drop,
            analyze_sentiment: true,
            extract_entities: true,
            extract_keywords: true,
            detect_topics: true,
            analyze_complexity: true,
            keyword_method: KeywordMethod::Rake,
            top_n: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub directory: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            directory: PathBuf::from(".cache"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    /// Also draw one combined `dashboard.svg`.
    pub create_dashboard: bool,
    pub width: u32,
    pub height: u32,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        VisualizationConfig {
            create_dashboard: true,
            width: 1024,
            height: 640,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub format: ExportFormat,
    /// Write the table again with per-row polarity and subjectivity.
    pub include_sentiment: bool,
    /// Add a column listing the entities found in each row's text.
    pub include_entities: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            format: ExportFormat::Csv,
            include_sentiment: true,
            include_entities: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub report_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            directory: PathBuf::from("output"),
            report_name: "unified_report.txt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Yaml,
}

fn format_of(path: &Path) -> Result<ConfigFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "json" => Ok(ConfigFormat::Json),
        "yaml" | "yml" => Ok(ConfigFormat::Yaml),
        "" => Err(PipelineError::UnsupportedFormat("(no extension)".to_string())),
        other => Err(PipelineError::UnsupportedFormat(format!(".{other}"))),
    }
}

impl Config {
    /// Read a `.json`, `.yaml` or `.yml` file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Config> {
        let format = format_of(path)?;
        if !path.exists() {
            return Err(PipelineError::NotFound(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)?;
        let config = match format {
            ConfigFormat::Json => serde_json::from_str(&contents)
                .map_err(|e| PipelineError::parse(path, e.to_string()))?,
            ConfigFormat::Yaml => serde_yaml::from_str(&contents)
                .map_err(|e| PipelineError::parse(path, e.to_string()))?,
        };
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write the configuration in the format named by the file extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match format_of(path)? {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Yaml => serde_yaml::to_string(self)?,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    /// Where the text report goes.
    pub fn report_path(&self) -> PathBuf {
        self.output.directory.join(&self.output.report_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert!(c.pipeline.use_cache);
        assert_eq!(c.pipeline.clean_strategy, CleanStrategy::Drop);
        assert_eq!(c.pipeline.keyword_method, KeywordMethod::Rake);
        assert_eq!(c.pipeline.top_n, 10);
        assert_eq!(c.cache.directory, PathBuf::from(".cache"));
        assert_eq!(c.export.format, ExportFormat::Csv);
        assert_eq!(c.report_path(), PathBuf::from("output/unified_report.txt"));
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let td = tempfile::tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(
            &p,
            "pipeline:\n  use_cache: false\n  clean_strategy: forward_fill\n  keyword_method: tfidf\noutput:\n  directory: reports\n",
        )
        .unwrap();
        let c = Config::load(&p).unwrap();
        assert!(!c.pipeline.use_cache);
        assert_eq!(c.pipeline.clean_strategy, CleanStrategy::ForwardFill);
        assert_eq!(c.pipeline.keyword_method, KeywordMethod::Tfidf);
        assert!(c.pipeline.analyze_sentiment);
        assert_eq!(c.output.directory, PathBuf::from("reports"));
        assert_eq!(c.output.report_name, "unified_report.txt");
    }

    #[test]
    fn save_and_reload_json_and_yaml() {
        let td = tempfile::tempdir().unwrap();
        let mut c = Config::default();
        c.pipeline.top_n = 3;
        c.export.format = ExportFormat::Json;
        for name in ["nested/c.json", "c.yml"] {
            let p = td.path().join(name);
            c.save(&p).unwrap();
            assert_eq!(Config::load(&p).unwrap(), c);
        }
    }

    #[test]
    fn bad_inputs() {
        let td = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::load(&td.path().join("missing.json")),
            Err(PipelineError::NotFound(_))
        ));
        assert!(matches!(
            Config::load(&td.path().join("c.toml")),
            Err(PipelineError::UnsupportedFormat(_))
        ));
        let p = td.path().join("broken.json");
        fs::write(&p, "{ not json").unwrap();
        assert!(matches!(Config::load(&p), Err(PipelineError::Parse { .. })));
    }
}
