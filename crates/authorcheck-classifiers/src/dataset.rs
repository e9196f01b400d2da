//! Labeled dataset loading, cleaning, and splitting
//!
//! Datasets are CSV files with at least a `text` column and a `generated`
//! column holding `0` (human) or `1` (AI). Other columns are carried through
//! cleaning untouched and ignored by training.

use authorcheck_core::text::is_blank;
use authorcheck_core::{normalize, Error, Label, LabeledExample, Result};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::path::Path;
use tracing::{info, warn};

/// Column holding the text
pub const TEXT_COLUMN: &str = "text";

/// Column holding the 0/1 label
pub const LABEL_COLUMN: &str = "generated";

fn csv_error(path: &Path, err: csv::Error) -> Error {
    Error::dataset(format!("{}: {}", path.display(), err))
}

fn column_index(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| Error::dataset(format!("{}: missing '{}' column", path.display(), name)))
}

fn parse_label(field: &str) -> Option<Label> {
    field.trim().parse::<f64>().ok().and_then(Label::from_value)
}

/// Load a cleaned dataset.
///
/// A missing file is a configuration error. Text is normalized again on the
/// way in (normalization is idempotent). Rows with an unreadable label or no
/// text left after normalization are skipped with a warning.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Vec<LabeledExample>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::config(format!(
            "dataset not found at {}",
            path.display()
        )));
    }

    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
    let text_idx = column_index(&headers, TEXT_COLUMN, path)?;
    let label_idx = column_index(&headers, LABEL_COLUMN, path)?;

    let mut examples = Vec::new();
    let mut skipped = 0usize;

    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| csv_error(path, e))?;
        let text = normalize(record.get(text_idx).unwrap_or_default());
        let label = record.get(label_idx).and_then(parse_label);

        match label {
            Some(label) if !is_blank(&text) => examples.push(LabeledExample::new(text, label)),
            _ => {
                skipped += 1;
                warn!(row = row + 1, "Skipping dataset row with empty text or invalid label");
            }
        }
    }

    info!(
        path = %path.display(),
        examples = examples.len(),
        skipped,
        "Loaded dataset"
    );
    Ok(examples)
}

/// Train/test partition of a dataset
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub train: Vec<LabeledExample>,
    pub test: Vec<LabeledExample>,
}

impl DatasetSplit {
    pub fn train_texts(&self) -> Vec<&str> {
        self.train.iter().map(|e| e.text.as_str()).collect()
    }

    pub fn train_labels(&self) -> Vec<Label> {
        self.train.iter().map(|e| e.label).collect()
    }

    pub fn test_texts(&self) -> Vec<&str> {
        self.test.iter().map(|e| e.text.as_str()).collect()
    }

    pub fn test_labels(&self) -> Vec<Label> {
        self.test.iter().map(|e| e.label).collect()
    }
}

/// Shuffle with a seeded RNG and hold out `ceil(test_size * n)` examples.
///
/// The same examples, `test_size` and `seed` always give the same split.
pub fn train_test_split(
    examples: &[LabeledExample],
    test_size: f64,
    seed: u64,
) -> Result<DatasetSplit> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(Error::config(format!(
            "test_size must be between 0 and 1, got {}",
            test_size
        )));
    }

    let n = examples.len();
    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(Error::dataset(format!(
            "cannot split {} examples with test_size {}",
            n, test_size
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));

    let test = order[..n_test].iter().map(|&i| examples[i].clone()).collect();
    let train = order[n_test..].iter().map(|&i| examples[i].clone()).collect();
    Ok(DatasetSplit { train, test })
}

/// Outcome of a cleaning pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningReport {
    /// Data rows read from the raw file
    pub rows_read: usize,
    /// Rows written to the cleaned file
    pub rows_written: usize,
    /// Rows dropped for missing text or label
    pub rows_dropped: usize,
    /// Written rows whose text became empty after normalization
    pub empty_after_cleaning: usize,
}

/// Clean a raw dataset into `output`.
///
/// Drops rows whose text is missing or blank, or whose label is missing,
/// normalizes the remaining text, and writes every column back out.
pub fn clean_dataset(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<CleaningReport> {
    let input = input.as_ref();
    let output = output.as_ref();
    if !input.is_file() {
        return Err(Error::config(format!(
            "raw dataset not found at {}",
            input.display()
        )));
    }

    let mut reader = csv::Reader::from_path(input).map_err(|e| csv_error(input, e))?;
    let headers = reader.headers().map_err(|e| csv_error(input, e))?.clone();
    let text_idx = column_index(&headers, TEXT_COLUMN, input)?;
    let label_idx = column_index(&headers, LABEL_COLUMN, input)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(output).map_err(|e| csv_error(output, e))?;
    writer
        .write_record(&headers)
        .map_err(|e| csv_error(output, e))?;

    let mut report = CleaningReport::default();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(input, e))?;
        report.rows_read += 1;

        let text = record.get(text_idx).unwrap_or_default();
        let label = record.get(label_idx).unwrap_or_default();
        if is_blank(text) || label.trim().is_empty() {
            report.rows_dropped += 1;
            continue;
        }

        let cleaned = normalize(text);
        if is_blank(&cleaned) {
            report.empty_after_cleaning += 1;
        }

        let row: Vec<&str> = record
            .iter()
            .enumerate()
            .map(|(i, field)| if i == text_idx { cleaned.as_str() } else { field })
            .collect();
        writer.write_record(&row).map_err(|e| csv_error(output, e))?;
        report.rows_written += 1;
    }
    writer.flush()?;

    info!(
        input = %input.display(),
        output = %output.display(),
        read = report.rows_read,
        written = report.rows_written,
        dropped = report.rows_dropped,
        empty_after_cleaning = report.empty_after_cleaning,
        "Cleaned dataset"
    );
    Ok(report)
}
