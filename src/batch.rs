//! Input discovery and sequential multi-file runs.
//!
//! A failing file never stops the batch; its path and error are recorded in
//! the [`BatchReport`] and the next file is processed.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use walkdir::WalkDir;

use crate::error::Result;

const TEMPLATE_BATCH: &str = "{msg} {pos}/{len} files ({percent}%) {wide_bar} {eta}";

/// Extensions picked up when walking a directory.
pub const DATA_EXTENSIONS: &[&str] = &["csv", "json"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: Vec<PathBuf>,
    /// `(path, error message)` per failed file.
    pub failed_files: Vec<(String, String)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed_files.is_empty()
    }
}

/// A file path as given, or every data file below a directory in path order.
///
/// A path that does not exist is returned unchanged so the caller reports it.
pub fn collect_files(path: &Path) -> Vec<PathBuf> {
    if !path.is_dir() {
        return vec![path.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                log::warn!("Skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| DATA_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

pub fn print_failed_files(failed_files: &[(String, String)]) {
    eprintln!("\n{} file(s) could not be processed:", failed_files.len());
    for (path, reason) in failed_files {
        eprintln!("  {path}: {reason}");
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    if len < 2 || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    match ProgressStyle::default_bar().template(TEMPLATE_BATCH) {
        Ok(style) => pb.set_style(style.progress_chars("=> ")),
        Err(e) => log::debug!("Progress template rejected: {e}"),
    }
    pb.set_message("Processing");
    pb
}

/// Run `process` on every file in order, collecting failures.
pub fn run_batch<F>(files: &[PathBuf], mut process: F) -> BatchReport
where
    F: FnMut(&Path) -> Result<()>,
{
    let pb = progress_bar(files.len());
    let mut report = BatchReport::default();
    for file in files {
        match process(file) {
            Ok(()) => report.processed.push(file.clone()),
            Err(e) => {
                log::error!("Error processing {}: {e}", file.display());
                report
                    .failed_files
                    .push((file.display().to_string(), e.to_string()));
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    log::info!(
        "Batch finished: {} processed, {} failed",
        report.processed.len(),
        report.failed_files.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use std::fs;

    #[test]
    fn walks_directories_for_data_files() {
        let td = tempfile::tempdir().unwrap();
        fs::create_dir(td.path().join("nested")).unwrap();
        fs::write(td.path().join("b.csv"), "a\n1\n").unwrap();
        fs::write(td.path().join("nested/a.JSON"), "[]").unwrap();
        fs::write(td.path().join("notes.txt"), "x").unwrap();

        let files = collect_files(td.path());
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("b.csv"));
        assert!(files[1].ends_with("nested/a.JSON"));

        let single = td.path().join("notes.txt");
        assert_eq!(collect_files(&single), vec![single]);
    }

    #[test]
    fn failures_do_not_stop_the_batch() {
        let files = vec![
            PathBuf::from("one.csv"),
            PathBuf::from("two.csv"),
            PathBuf::from("three.csv"),
        ];
        let mut seen = Vec::new();
        let report = run_batch(&files, |p| {
            seen.push(p.to_path_buf());
            if p.ends_with("two.csv") {
                Err(PipelineError::NotFound(p.to_path_buf()))
            } else {
                Ok(())
            }
        });
        assert_eq!(seen.len(), 3);
        assert_eq!(report.processed.len(), 2);
        assert!(!report.is_success());
        assert_eq!(report.failed_files[0].0, "two.csv");
        assert!(report.failed_files[0].1.contains("not found"));
    }
}
