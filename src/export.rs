//! Result exports as CSV, TSV, JSON or aligned plain text.
//!
//! Each analysis result is flattened into one or more [`ResultTable`]s and
//! written to `<dir>/<stem>_<YYYYMMDD>_<HHMMSS>_<table>.<ext>`.

use std::borrow::Cow;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::ValueEnum;
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

use crate::entities;
use crate::error::Result;
use crate::pipeline::AnalysisResult;
use crate::sentiment::SentimentSummary;
use crate::table::{Cell, Table};
use crate::textclean::TextEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Txt,
    #[default]
    Csv,
    Tsv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A flat, named table ready for export.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl ResultTable {
    pub fn new(name: impl Into<String>, headers: &[&str]) -> Self {
        ResultTable {
            name: name.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }
}

/// Prefix cells a spreadsheet would evaluate as a formula with `'`.
pub fn csv_safe_cell(s: &str) -> Cow<'_, str> {
    if s.starts_with(['=', '+', '-', '@', '\t', '\r']) {
        Cow::Owned(format!("'{s}"))
    } else {
        Cow::Borrowed(s)
    }
}

fn text(s: impl Into<String>) -> Cell {
    Cell::Text(s.into())
}

fn int(n: usize) -> Cell {
    Cell::Int(n as i64)
}

fn row_cell(row: Option<usize>) -> Cell {
    row.map(int).unwrap_or(Cell::Null)
}

/// Flatten one named analysis result.
pub fn result_tables(name: &str, result: &AnalysisResult) -> Vec<ResultTable> {
    match result {
        AnalysisResult::DataStatistics(stats) => {
            let mut t = ResultTable::new(
                name,
                &["column", "count", "mean", "median", "std", "min", "max"],
            );
            for (column, s) in stats {
                t.push(vec![
                    text(column.as_str()),
                    int(s.count),
                    Cell::Float(s.mean),
                    Cell::Float(s.median),
                    Cell::Float(s.std),
                    Cell::Float(s.min),
                    Cell::Float(s.max),
                ]);
            }
            vec![t]
        }
        AnalysisResult::TextStatistics(stats) => {
            let mut summary = ResultTable::new(name, &["metric", "value"]);
            summary.push(vec![text("total_entries"), int(stats.total_entries)]);
            summary.push(vec![text("total_words"), int(stats.total_words)]);
            summary.push(vec![text("unique_words"), int(stats.unique_words)]);
            summary.push(vec![
                text("avg_words_per_entry"),
                Cell::Float(stats.avg_words_per_entry),
            ]);
            if let Some(lang) = &stats.language {
                summary.push(vec![text("language"), text(lang.as_str())]);
            }
            let mut words = ResultTable::new(format!("{name}_top_words"), &["word", "count"]);
            for (word, count) in &stats.top_words {
                words.push(vec![text(word.as_str()), Cell::Int(i64::from(*count))]);
            }
            vec![summary, words]
        }
        AnalysisResult::Correlation(c) => {
            let mut t = ResultTable::new(
                name,
                &["column", "against", "coefficient", "pairs", "strength"],
            );
            t.push(vec![
                text(c.column.as_str()),
                text(c.against.as_str()),
                Cell::Float(c.coefficient),
                int(c.pairs),
                text(c.strength.to_string()),
            ]);
            vec![t]
        }
        AnalysisResult::Sentiment(s) => {
            let mut t = ResultTable::new(name, &["row", "polarity", "subjectivity", "label"]);
            for score in &s.sentiments {
                t.push(vec![
                    row_cell(score.row),
                    Cell::Float(score.polarity),
                    Cell::Float(score.subjectivity),
                    text(score.label.to_string()),
                ]);
            }
            vec![t]
        }
        AnalysisResult::Entities(summary) => {
            let mut t = ResultTable::new(name, &["type", "entity", "count"]);
            for (kind, counts) in summary {
                for (entity, count) in &counts.top {
                    t.push(vec![text(kind.as_str()), text(entity.as_str()), int(*count)]);
                }
            }
            vec![t]
        }
        AnalysisResult::Keywords { method, keywords } => {
            let mut t = ResultTable::new(name, &["keyword", "score", "method"]);
            for k in keywords {
                t.push(vec![
                    text(k.phrase.as_str()),
                    Cell::Float(k.score),
                    text(method.as_str()),
                ]);
            }
            vec![t]
        }
        AnalysisResult::Topics(topics) => {
            let mut t = ResultTable::new(name, &["topic", "keyword"]);
            for (topic, keywords) in topics {
                for k in keywords {
                    t.push(vec![text(topic.to_string()), text(k.as_str())]);
                }
            }
            vec![t]
        }
        AnalysisResult::Readability(report) => {
            let mut t = ResultTable::new(
                name,
                &[
                    "row",
                    "flesch_reading_ease",
                    "flesch_kincaid_grade",
                    "avg_words_per_sentence",
                    "avg_syllables_per_word",
                    "interpretation",
                ],
            );
            for r in &report.texts {
                t.push(vec![
                    row_cell(r.row),
                    Cell::Float(r.flesch_reading_ease),
                    Cell::Float(r.flesch_kincaid_grade),
                    Cell::Float(r.avg_words_per_sentence),
                    Cell::Float(r.avg_syllables_per_word),
                    text(r.interpretation.as_str()),
                ]);
            }
            vec![t]
        }
    }
}

/// The loaded table with per-row sentiment and/or entity columns appended.
///
/// Rows without a matching text entry get empty cells.
pub fn enriched_table(
    table: &Table,
    sentiment: Option<&SentimentSummary>,
    entity_texts: Option<&[TextEntry]>,
) -> ResultTable {
    let mut headers: Vec<&str> = table.columns().iter().map(String::as_str).collect();
    if sentiment.is_some() {
        headers.extend(["sentiment_polarity", "sentiment_subjectivity"]);
    }
    if entity_texts.is_some() {
        headers.push("entities");
    }
    let mut out = ResultTable::new("data_enriched", &headers);

    for row in table.rows() {
        let mut cells = row.cells.clone();
        if let Some(summary) = sentiment {
            match summary.sentiments.iter().find(|s| s.row == Some(row.id)) {
                Some(score) => {
                    cells.push(Cell::Float(score.polarity));
                    cells.push(Cell::Float(score.subjectivity));
                }
                None => cells.extend([Cell::Null, Cell::Null]),
            }
        }
        if let Some(texts) = entity_texts {
            let found: Vec<String> = texts
                .iter()
                .filter(|t| t.row == Some(row.id))
                .flat_map(|t| entities::extract(&t.text))
                .map(|e| format!("{} ({})", e.text, e.kind))
                .collect();
            cells.push(if found.is_empty() {
                Cell::Null
            } else {
                text(found.join("; "))
            });
        }
        out.push(cells);
    }
    out
}

/// Timestamp used in export file names.
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Write every table to `dir`, creating it if needed.
pub fn export_tables(
    tables: &[ResultTable],
    dir: &Path,
    stem: &str,
    format: ExportFormat,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let stamp = timestamp();
    tables
        .iter()
        .map(|t| {
            let path = dir.join(format!("{stem}_{stamp}_{}.{}", t.name, format.extension()));
            write_table(t, &path, format)?;
            log::info!("Exported {} to {}", t.name, path.display());
            Ok(path)
        })
        .collect()
}

pub fn write_table(table: &ResultTable, path: &Path, format: ExportFormat) -> Result<()> {
    match format {
        ExportFormat::Csv => write_delimited(table, path, b','),
        ExportFormat::Tsv => write_delimited(table, path, b'\t'),
        ExportFormat::Json => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &JsonRecords(table))?;
            Ok(())
        }
        ExportFormat::Txt => {
            let mut writer = BufWriter::new(File::create(path)?);
            writer.write_all(render_text(table).as_bytes())?;
            writer.flush()?;
            Ok(())
        }
    }
}

fn write_delimited(table: &ResultTable, path: &Path, delimiter: u8) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)?;
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        let record: Vec<Cow<'_, str>> = row
            .iter()
            .map(|cell| match cell {
                Cell::Text(s) => csv_safe_cell(s),
                other => Cow::Owned(other.to_string()),
            })
            .collect();
        wtr.write_record(record.iter().map(|c| c.as_bytes()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Columns padded to their widest cell.
pub fn render_text(table: &ResultTable) -> String {
    let rendered: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(Cell::to_string).collect())
        .collect();
    let mut widths: Vec<usize> = table.headers.iter().map(|h| h.chars().count()).collect();
    for row in &rendered {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    let mut out = format!("{}\n", table.name);
    out.push_str(&line(&table.headers));
    out.push('\n');
    for row in &rendered {
        out.push_str(&line(row));
        out.push('\n');
    }
    out
}

/// Serialises a table as an array of objects, keys in header order.
struct JsonRecords<'a>(&'a ResultTable);

impl Serialize for JsonRecords<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let table = self.0;
        let mut seq = serializer.serialize_seq(Some(table.rows.len()))?;
        for row in &table.rows {
            seq.serialize_element(&JsonRecord {
                headers: &table.headers,
                cells: row,
            })?;
        }
        seq.end()
    }
}

struct JsonRecord<'a> {
    headers: &'a [String],
    cells: &'a [Cell],
}

impl Serialize for JsonRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.headers.len()))?;
        for (header, cell) in self.headers.iter().zip(self.cells) {
            map.serialize_entry(header, cell)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::{SentimentLabel, SentimentScore};

    fn sample() -> ResultTable {
        let mut t = ResultTable::new("keywords", &["keyword", "score"]);
        t.push(vec![text("battery life"), Cell::Float(4.0)]);
        t.push(vec![text("=SUM(A1)"), Cell::Float(-1.5)]);
        t
    }

    #[test]
    fn formula_cells_are_escaped() {
        assert_eq!(csv_safe_cell("=1+1"), "'=1+1");
        assert_eq!(csv_safe_cell("@cmd"), "'@cmd");
        assert_eq!(csv_safe_cell("plain"), "plain");
    }

    #[test]
    fn csv_and_tsv_output() {
        let td = tempfile::tempdir().unwrap();
        let csv_path = td.path().join("k.csv");
        write_table(&sample(), &csv_path, ExportFormat::Csv).unwrap();
        let csv = fs::read_to_string(&csv_path).unwrap();
        assert_eq!(csv, "keyword,score\nbattery life,4\n'=SUM(A1),-1.5\n");

        let tsv_path = td.path().join("k.tsv");
        write_table(&sample(), &tsv_path, ExportFormat::Tsv).unwrap();
        assert!(fs::read_to_string(&tsv_path).unwrap().starts_with("keyword\tscore\n"));
    }

    #[test]
    fn json_keeps_header_order() {
        let td = tempfile::tempdir().unwrap();
        let p = td.path().join("k.json");
        write_table(&sample(), &p, ExportFormat::Json).unwrap();
        let raw = fs::read_to_string(&p).unwrap();
        assert!(raw.find("\"keyword\"").unwrap() < raw.find("\"score\"").unwrap());
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v[0]["keyword"], "battery life");
        assert_eq!(v[1]["score"], -1.5);
    }

    #[test]
    fn text_is_aligned() {
        let out = render_text(&sample());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "keywords");
        assert_eq!(lines[1], "keyword       score");
        assert_eq!(lines[2], "battery life  4");
    }

    #[test]
    fn enrichment_matches_rows_by_id() {
        let table = Table::new(
            vec!["rating".into(), "review".into()],
            vec![
                vec![Cell::Int(5), Cell::Text("great".into())],
                vec![Cell::Int(1), Cell::Null],
            ],
        );
        let summary = SentimentSummary {
            sentiments: vec![SentimentScore {
                row: Some(0),
                polarity: 0.8,
                subjectivity: 0.75,
                label: SentimentLabel::Positive,
            }],
            avg_polarity: 0.8,
            avg_subjectivity: 0.75,
            positive_count: 1,
            neutral_count: 0,
            negative_count: 0,
            total: 1,
        };
        let texts = vec![TextEntry::from_row("Bought it in Seattle.", 0)];
        let t = enriched_table(&table, Some(&summary), Some(&texts));
        assert_eq!(
            t.headers,
            vec!["rating", "review", "sentiment_polarity", "sentiment_subjectivity", "entities"]
        );
        assert_eq!(t.rows[0][2], Cell::Float(0.8));
        assert_eq!(t.rows[0][4], Cell::Text("Seattle (GPE)".into()));
        assert_eq!(t.rows[1][2], Cell::Null);
        assert_eq!(t.rows[1][4], Cell::Null);
    }

    #[test]
    fn readability_rows_join_back_to_table() {
        let entries = vec![
            TextEntry::from_row("Short and clear.", 2),
            TextEntry::from_row("Another plain line.", 5),
        ];
        let result = AnalysisResult::Readability(crate::readability::complexity(&entries));
        let tables = result_tables("readability", &result);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].headers[0], "row");
        assert_eq!(tables[0].rows[0][0], Cell::Int(2));
        assert_eq!(tables[0].rows[1][0], Cell::Int(5));
    }

    #[test]
    fn export_file_names() {
        let td = tempfile::tempdir().unwrap();
        let paths = export_tables(&[sample()], &td.path().join("out"), "reviews", ExportFormat::Csv)
            .unwrap();
        let name = paths[0].file_name().unwrap().to_string_lossy().to_string();
        let re = regex::Regex::new(r"^reviews_\d{8}_\d{6}_keywords\.csv$").unwrap();
        assert!(re.is_match(&name), "{name}");
    }
}
