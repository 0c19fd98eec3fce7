//! Tabular data: a small typed table with CSV and JSON loaders and the
//! missing-value cleaning strategies.
//!
//! Every row remembers its position in the source file (`Row::id`). Cleaning
//! drops and reorders nothing but whole rows, so ids stay valid and text
//! entries extracted earlier can still be paired with their row.

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use clap::ValueEnum;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{PipelineError, Result};
use crate::textclean::TextEntry;

/// Strings read as missing values, in addition to the empty cell.
const NA_VALUES: &[&str] = &[
    "#N/A", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Cell::Int(_) | Cell::Float(_))
    }

    /// Type-tagged rendering used to compare rows for duplicate removal.
    fn identity(&self) -> String {
        match self {
            Cell::Null => "n:".to_string(),
            Cell::Bool(b) => format!("b:{b}"),
            Cell::Int(i) => format!("i:{i}"),
            Cell::Float(f) => format!("f:{f:?}"),
            Cell::Text(s) => format!("s:{s}"),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Float(x) => write!(f, "{x}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<&JsonValue> for Cell {
    fn from(val: &JsonValue) -> Self {
        match val {
            JsonValue::Null => Cell::Null,
            JsonValue::Bool(b) => Cell::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Cell::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Cell::Float(f)
                } else {
                    Cell::Text(n.to_string())
                }
            }
            JsonValue::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: usize,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

/// How `clean_data` treats missing values before removing duplicate rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CleanStrategy {
    /// Remove every row holding a missing value.
    #[default]
    Drop,
    /// Replace missing values with 0.
    Fill,
    /// Copy the last non-missing value of the same column downwards.
    #[value(alias = "forward_fill")]
    ForwardFill,
}

impl CleanStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CleanStrategy::Drop => "drop",
            CleanStrategy::Fill => "fill",
            CleanStrategy::ForwardFill => "forward_fill",
        }
    }
}

impl FromStr for CleanStrategy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "drop" => Ok(CleanStrategy::Drop),
            "fill" => Ok(CleanStrategy::Fill),
            "forward_fill" | "forward-fill" | "ffill" => Ok(CleanStrategy::ForwardFill),
            other => Err(PipelineError::InvalidStrategy {
                kind: "clean strategy",
                value: other.to_string(),
                expected: "drop, fill, forward_fill",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanSummary {
    pub rows_before: usize,
    pub rows_after: usize,
}

impl CleanSummary {
    pub fn removed(&self) -> usize {
        self.rows_before - self.rows_after
    }
}

impl Table {
    /// Build a table from column names and raw rows. Short rows are padded with nulls.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(id, mut cells)| {
                cells.resize(width, Cell::Null);
                Row { id, cells }
            })
            .collect();
        Table { columns, rows }
    }

    /// Load a table from a file. Dispatch by extension.
    ///
    /// * `.csv` – header row, per-column type inference
    /// * `.json` – `[{"col": value, ...}, ...]` or `{"col": [values], ...}`
    pub fn load(path: &Path) -> Result<Table> {
        if !path.exists() {
            return Err(PipelineError::NotFound(path.to_path_buf()));
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Table::from_csv_path(path),
            "json" => Table::from_json_path(path),
            "" => Err(PipelineError::UnsupportedFormat("(no extension)".to_string())),
            other => Err(PipelineError::UnsupportedFormat(format!(".{other}"))),
        }
    }

    pub fn from_csv_path(path: &Path) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)?;
        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut raw: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record?;
            raw.push(record.iter().map(String::from).collect());
        }

        let kinds: Vec<ColumnKind> = (0..columns.len())
            .map(|idx| ColumnKind::infer(raw.iter().map(|r| r.get(idx).map(String::as_str))))
            .collect();

        let rows = raw
            .iter()
            .map(|record| {
                kinds
                    .iter()
                    .enumerate()
                    .map(|(idx, kind)| kind.convert(record.get(idx).map(String::as_str)))
                    .collect()
            })
            .collect();
        Ok(Table::new(columns, rows))
    }

    pub fn from_json_path(path: &Path) -> Result<Table> {
        let reader = BufReader::new(File::open(path)?);
        let parsed: JsonTable = serde_json::from_reader(reader)
            .map_err(|e| PipelineError::parse(path, e.to_string()))?;
        match parsed {
            JsonTable::Records(records) => {
                let mut columns: Vec<String> = Vec::new();
                for record in &records {
                    for (key, _) in &record.0 {
                        if !columns.contains(key) {
                            columns.push(key.clone());
                        }
                    }
                }
                let rows = records
                    .iter()
                    .map(|record| {
                        columns
                            .iter()
                            .map(|col| {
                                record
                                    .0
                                    .iter()
                                    .find(|(k, _)| k == col)
                                    .map(|(_, v)| Cell::from(v))
                                    .unwrap_or(Cell::Null)
                            })
                            .collect()
                    })
                    .collect();
                Ok(Table::new(columns, rows))
            }
            JsonTable::Columns(object) => {
                let mut columns = Vec::with_capacity(object.0.len());
                let mut values: Vec<&Vec<JsonValue>> = Vec::with_capacity(object.0.len());
                for (key, val) in &object.0 {
                    let arr = val.as_array().ok_or_else(|| {
                        PipelineError::parse(path, format!("column '{key}' is not an array"))
                    })?;
                    columns.push(key.clone());
                    values.push(arr);
                }
                let height = values.iter().map(|v| v.len()).max().unwrap_or(0);
                let rows = (0..height)
                    .map(|i| {
                        values
                            .iter()
                            .map(|col| col.get(i).map(Cell::from).unwrap_or(Cell::Null))
                            .collect()
                    })
                    .collect();
                Ok(Table::new(columns, rows))
            }
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| PipelineError::ColumnNotFound(name.to_string()))
    }

    /// Columns whose non-missing cells are all integers or floats.
    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(idx, _)| {
                let mut seen = false;
                for row in &self.rows {
                    let cell = &row.cells[*idx];
                    if cell.is_null() {
                        continue;
                    }
                    if !cell.is_numeric() {
                        return false;
                    }
                    seen = true;
                }
                seen
            })
            .map(|(_, name)| name.as_str())
            .collect()
    }

    /// `(row id, value)` for every numeric cell of the column.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<(usize, f64)>> {
        let idx = self.column_index(name)?;
        let values: Vec<(usize, f64)> = self
            .rows
            .iter()
            .filter_map(|row| row.cells[idx].as_f64().map(|v| (row.id, v)))
            .collect();
        if values.is_empty() {
            return Err(PipelineError::NotNumeric(name.to_string()));
        }
        Ok(values)
    }

    /// Non-missing, non-blank cells of a column as text entries tagged with their row id.
    pub fn text_values(&self, name: &str) -> Result<Vec<TextEntry>> {
        let idx = self.column_index(name)?;
        Ok(self
            .rows
            .iter()
            .filter_map(|row| {
                let cell = &row.cells[idx];
                if cell.is_null() {
                    return None;
                }
                let text = cell.to_string();
                if text.trim().is_empty() {
                    None
                } else {
                    Some(TextEntry::from_row(text, row.id))
                }
            })
            .collect())
    }

    /// Apply the missing-value strategy, then remove exact duplicate rows.
    pub fn clean(&mut self, strategy: CleanStrategy) -> CleanSummary {
        let rows_before = self.rows.len();
        match strategy {
            CleanStrategy::Drop => self.rows.retain(|row| !row.cells.iter().any(Cell::is_null)),
            CleanStrategy::Fill => {
                for row in &mut self.rows {
                    for cell in &mut row.cells {
                        if cell.is_null() {
                            *cell = Cell::Int(0);
                        }
                    }
                }
            }
            CleanStrategy::ForwardFill => {
                let mut last: Vec<Cell> = vec![Cell::Null; self.columns.len()];
                for row in &mut self.rows {
                    for (idx, cell) in row.cells.iter_mut().enumerate() {
                        if cell.is_null() {
                            *cell = last[idx].clone();
                        } else {
                            last[idx] = cell.clone();
                        }
                    }
                }
            }
        }
        self.drop_duplicates();
        CleanSummary {
            rows_before,
            rows_after: self.rows.len(),
        }
    }

    /// Keep the first occurrence of every distinct row.
    pub fn drop_duplicates(&mut self) {
        let mut seen = HashSet::new();
        self.rows.retain(|row| {
            let key: Vec<String> = row.cells.iter().map(Cell::identity).collect();
            seen.insert(key.join("\u{1f}"))
        });
    }
}

// ---------------------------------------------------------------------------
// Type inference for CSV columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Int,
    Float,
    Bool,
    Text,
}

fn is_missing(raw: Option<&str>) -> bool {
    match raw {
        None => true,
        Some(s) => {
            let s = s.trim();
            s.is_empty() || NA_VALUES.contains(&s)
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}

impl ColumnKind {
    /// Narrowest kind every non-missing value fits, `Text` when nothing else does.
    fn infer<'a>(values: impl Iterator<Item = Option<&'a str>>) -> ColumnKind {
        let mut int_ok = true;
        let mut float_ok = true;
        let mut bool_ok = true;
        let mut any = false;
        for raw in values {
            if is_missing(raw) {
                continue;
            }
            any = true;
            let s = raw.unwrap_or_default().trim();
            int_ok &= s.parse::<i64>().is_ok();
            float_ok &= parse_finite(s).is_some();
            bool_ok &= parse_bool(s).is_some();
        }
        if !any {
            ColumnKind::Text
        } else if int_ok {
            ColumnKind::Int
        } else if float_ok {
            ColumnKind::Float
        } else if bool_ok {
            ColumnKind::Bool
        } else {
            ColumnKind::Text
        }
    }

    fn convert(self, raw: Option<&str>) -> Cell {
        if is_missing(raw) {
            return Cell::Null;
        }
        let raw = raw.unwrap_or_default();
        let s = raw.trim();
        match self {
            ColumnKind::Int => s.parse().map(Cell::Int).unwrap_or(Cell::Null),
            ColumnKind::Float => parse_finite(s).map(Cell::Float).unwrap_or(Cell::Null),
            ColumnKind::Bool => parse_bool(s).map(Cell::Bool).unwrap_or(Cell::Null),
            ColumnKind::Text => Cell::Text(raw.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// JSON input shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonTable {
    Records(Vec<OrderedObject>),
    Columns(OrderedObject),
}

/// A JSON object with its keys kept in document order.
struct OrderedObject(Vec<(String, JsonValue)>);

impl<'de> Deserialize<'de> for OrderedObject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ObjectVisitor;

        impl<'de> Visitor<'de> for ObjectVisitor {
            type Value = OrderedObject;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, JsonValue>()? {
                    entries.push((key, value));
                }
                Ok(OrderedObject(entries))
            }
        }

        deserializer.deserialize_map(ObjectVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn sample() -> Table {
        Table::new(
            vec!["name".into(), "score".into(), "city".into()],
            vec![
                vec![Cell::Text("Alice".into()), Cell::Int(85), Cell::Text("NYC".into())],
                vec![Cell::Text("Bob".into()), Cell::Null, Cell::Text("LA".into())],
                vec![Cell::Text("Alice".into()), Cell::Int(85), Cell::Text("NYC".into())],
                vec![Cell::Text("Cara".into()), Cell::Int(78), Cell::Null],
            ],
        )
    }

    #[test]
    fn csv_infers_column_types() {
        let td = tempdir().unwrap();
        let p = td.path().join("d.csv");
        fs::write(
            &p,
            "product,rating,price,review,in_stock\n\
             Laptop,4.5,1200,great!,true\n\
             Phone,3.8,800,,false\n\
             Tablet,NaN,600,\"bad, product\",true\n",
        )
        .unwrap();
        let t = Table::load(&p).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.columns().len(), 5);
        assert_eq!(t.rows()[0].cells[1], Cell::Float(4.5));
        assert_eq!(t.rows()[0].cells[2], Cell::Int(1200));
        assert_eq!(t.rows()[1].cells[3], Cell::Null);
        assert_eq!(t.rows()[2].cells[1], Cell::Null);
        assert_eq!(t.rows()[2].cells[3], Cell::Text("bad, product".into()));
        assert_eq!(t.rows()[0].cells[4], Cell::Bool(true));
        assert_eq!(t.numeric_columns(), vec!["rating", "price"]);
    }

    #[test]
    fn json_records_keep_document_order() {
        let td = tempdir().unwrap();
        let p = td.path().join("d.json");
        fs::write(
            &p,
            r#"[{"zeta": 1, "alpha": "x"}, {"zeta": 2.5, "alpha": null, "extra": true}]"#,
        )
        .unwrap();
        let t = Table::load(&p).unwrap();
        assert_eq!(t.columns(), &["zeta", "alpha", "extra"]);
        assert_eq!(t.rows()[0].cells[2], Cell::Null);
        assert_eq!(t.rows()[1].cells[0], Cell::Float(2.5));
    }

    #[test]
    fn json_column_lists() {
        let td = tempdir().unwrap();
        let p = td.path().join("cols.json");
        fs::write(&p, r#"{"a": [1, 2, 3], "b": ["x", "y"]}"#).unwrap();
        let t = Table::load(&p).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.rows()[2].cells[1], Cell::Null);
    }

    #[test]
    fn load_rejects_unknown_and_missing() {
        let td = tempdir().unwrap();
        let p = td.path().join("d.xlsx");
        fs::write(&p, b"PK").unwrap();
        assert!(matches!(
            Table::load(&p),
            Err(PipelineError::UnsupportedFormat(ext)) if ext == ".xlsx"
        ));
        assert!(matches!(
            Table::load(&td.path().join("missing.csv")),
            Err(PipelineError::NotFound(_))
        ));
    }

    #[test]
    fn text_values_drop_nulls_and_keep_row_ids() {
        let t = Table::new(
            vec!["review".into()],
            vec![
                vec![Cell::Text("great!".into())],
                vec![Cell::Null],
                vec![Cell::Text("bad product".into())],
            ],
        );
        let texts = t.text_values("review").unwrap();
        let plain: Vec<&str> = texts.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(plain, vec!["great!", "bad product"]);
        assert_eq!(texts[1].row, Some(2));
        assert!(matches!(
            t.text_values("nope"),
            Err(PipelineError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn drop_strategy_removes_nulls_and_duplicates() {
        let mut t = sample();
        let s = t.clean(CleanStrategy::Drop);
        assert_eq!(s.rows_before, 4);
        assert_eq!(s.rows_after, 1);
        assert_eq!(s.removed(), 3);
        assert_eq!(t.rows()[0].id, 0);
    }

    #[test]
    fn fill_strategy_uses_zero() {
        let mut t = sample();
        let s = t.clean(CleanStrategy::Fill);
        assert_eq!(s.rows_after, 3);
        assert_eq!(t.rows()[1].cells[1], Cell::Int(0));
        assert_eq!(t.rows()[2].cells[2], Cell::Int(0));
        // duplicate row 2 removed, ids preserved
        assert_eq!(t.rows()[2].id, 3);
    }

    #[test]
    fn forward_fill_copies_previous_value() {
        let mut t = sample();
        t.clean(CleanStrategy::ForwardFill);
        assert_eq!(t.rows()[1].cells[1], Cell::Int(85));
        let cara = t.rows().iter().find(|r| r.id == 3).unwrap();
        assert_eq!(cara.cells[2], Cell::Text("NYC".into()));
    }

    #[test]
    fn strategy_parsing() {
        assert_eq!("forward_fill".parse::<CleanStrategy>().unwrap(), CleanStrategy::ForwardFill);
        assert!(matches!(
            "bogus".parse::<CleanStrategy>(),
            Err(PipelineError::InvalidStrategy { .. })
        ));
    }

    #[test]
    fn numeric_values_rejects_text_columns() {
        let t = sample();
        assert_eq!(t.numeric_values("score").unwrap(), vec![(0, 85.0), (2, 85.0), (3, 78.0)]);
        assert!(matches!(
            t.numeric_values("name"),
            Err(PipelineError::NotNumeric(_))
        ));
    }
}
