//! SVG bar charts of the analysis results.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::error::{PipelineError, Result};
use crate::pipeline::AnalysisResult;

/// Bars beyond this are dropped so labels stay readable.
const MAX_BARS: usize = 15;

/// A chart ready to draw: file stem, caption and `(label, value)` bars.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub file_stem: &'static str,
    pub title: String,
    pub bars: Vec<(String, f64)>,
}

fn chart_error(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Chart(e.to_string())
}

/// The chart a result is drawn as, if it has one.
pub fn chart_for(result: &AnalysisResult) -> Option<BarChart> {
    let chart = match result {
        AnalysisResult::Sentiment(s) => BarChart {
            file_stem: "sentiment_distribution",
            title: "Sentiment distribution".to_string(),
            bars: vec![
                ("positive".to_string(), s.positive_count as f64),
                ("neutral".to_string(), s.neutral_count as f64),
                ("negative".to_string(), s.negative_count as f64),
            ],
        },
        AnalysisResult::TextStatistics(t) => BarChart {
            file_stem: "top_words",
            title: "Most frequent words".to_string(),
            bars: t
                .top_words
                .iter()
                .map(|(w, c)| (w.clone(), f64::from(*c)))
                .collect(),
        },
        AnalysisResult::Keywords { method, keywords } => BarChart {
            file_stem: "keywords",
            title: format!("Keywords ({method})"),
            bars: keywords.iter().map(|k| (k.phrase.clone(), k.score)).collect(),
        },
        AnalysisResult::Entities(summary) => BarChart {
            file_stem: "entity_types",
            title: "Entity mentions by type".to_string(),
            bars: summary
                .iter()
                .map(|(kind, counts)| (kind.to_string(), counts.total as f64))
                .collect(),
        },
        AnalysisResult::DataStatistics(stats) => BarChart {
            file_stem: "column_means",
            title: "Column means".to_string(),
            bars: stats.iter().map(|(c, s)| (c.clone(), s.mean)).collect(),
        },
        AnalysisResult::Topics(topics) => BarChart {
            file_stem: "topics",
            title: "Keywords per topic".to_string(),
            bars: topics
                .iter()
                .map(|(t, k)| (t.to_string(), k.len() as f64))
                .collect(),
        },
        AnalysisResult::Readability(report) => BarChart {
            file_stem: "readability",
            title: format!("Reading ease (average {:.1})", report.avg_reading_ease),
            bars: report
                .texts
                .iter()
                .enumerate()
                .map(|(i, r)| (format!("#{i}"), r.flesch_reading_ease))
                .collect(),
        },
        AnalysisResult::Correlation(_) => return None,
    };
    if chart.bars.is_empty() {
        None
    } else {
        Some(chart)
    }
}

/// Draw one SVG per chartable result, plus `dashboard.svg` with the first
/// four when `dashboard` is set. Returns the written paths.
pub fn render_all(
    results: &BTreeMap<String, AnalysisResult>,
    dir: &Path,
    size: (u32, u32),
    dashboard: bool,
) -> Result<Vec<PathBuf>> {
    let charts: Vec<BarChart> = results.values().filter_map(chart_for).collect();
    if charts.is_empty() {
        log::warn!("No chartable results; nothing to visualise");
        return Ok(Vec::new());
    }
    fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for chart in &charts {
        let path = dir.join(format!("{}.svg", chart.file_stem));
        let root = SVGBackend::new(&path, size).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;
        draw_bars(&root, chart)?;
        root.present().map_err(chart_error)?;
        drop(root);
        log::info!("Chart saved to {}", path.display());
        written.push(path);
    }

    if dashboard {
        let path = dir.join("dashboard.svg");
        let root = SVGBackend::new(&path, (size.0 * 2, size.1 * 2)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;
        for (area, chart) in root.split_evenly((2, 2)).iter().zip(&charts) {
            draw_bars(area, chart)?;
        }
        root.present().map_err(chart_error)?;
        drop(root);
        log::info!("Dashboard saved to {}", path.display());
        written.push(path);
    }
    Ok(written)
}

fn draw_bars<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, chart: &BarChart) -> Result<()> {
    let bars = &chart.bars[..chart.bars.len().min(MAX_BARS)];
    let lo = bars.iter().map(|b| b.1).fold(0.0_f64, f64::min);
    let hi = bars.iter().map(|b| b.1).fold(0.0_f64, f64::max);
    let (lo, hi) = if hi - lo <= f64::EPSILON {
        (0.0, 1.0)
    } else {
        (lo * 1.1, hi * 1.1)
    };

    let mut ctx = ChartBuilder::on(area)
        .caption(&chart.title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d((0..bars.len() as i32).into_segmented(), lo..hi)
        .map_err(chart_error)?;

    let label = |v: &SegmentValue<i32>| match v {
        SegmentValue::CenterOf(i) => bars
            .get(*i as usize)
            .map(|b| b.0.clone())
            .unwrap_or_default(),
        _ => String::new(),
    };
    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len())
        .x_label_formatter(&label)
        .draw()
        .map_err(chart_error)?;

    ctx.draw_series(bars.iter().enumerate().map(|(i, (_, value))| {
        let i = i as i32;
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *value)],
            Palette99::pick(i as usize).filled(),
        );
        bar.set_margin(0, 0, 5, 5);
        bar
    }))
    .map_err(chart_error)?;
    Ok(())
}
