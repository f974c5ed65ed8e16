//! Result aggregation: per-page results → one ordered table → CSV.
//!
//! Each page's response is kept as one opaque row. The table has two
//! columns: [`PAGE_COLUMN`] (1-based page number) and [`CONTENT_COLUMN`]
//! (the cleaned response text). The aggregator never interprets the
//! content; a response that happens to contain a table stays inside its
//! cell.

use crate::error::ExtractError;
use crate::output::ExtractionResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const PAGE_COLUMN: &str = "page";
pub const CONTENT_COLUMN: &str = "content";

/// Default filename for the CSV export.
pub const EXPORT_FILENAME: &str = "extracted_data.csv";

/// Content type of the CSV export.
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Ordered table built from all successful extraction results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedDataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A CSV export ready to hand to a download or file writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: &'static str,
    pub content_type: &'static str,
    pub body: String,
}

/// Merge per-page results into one dataset.
///
/// Failed pages are dropped; the remaining rows keep page order.
///
/// # Errors
/// [`ExtractError::NoDataExtracted`] when no result succeeded, so callers
/// can tell "ran but found nothing" apart from "never ran".
pub fn aggregate(results: &[ExtractionResult]) -> Result<AggregatedDataset, ExtractError> {
    let mut successful: Vec<&ExtractionResult> =
        results.iter().filter(|r| r.is_success()).collect();

    if successful.is_empty() {
        let first_error = results
            .iter()
            .find_map(|r| r.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no pages were attempted".to_string());
        return Err(ExtractError::NoDataExtracted {
            total: results.len(),
            first_error,
        });
    }

    // Results normally arrive in page order already.
    successful.sort_by_key(|r| r.page_index);

    let rows = successful
        .into_iter()
        .map(|r| vec![r.page_num().to_string(), r.content.clone()])
        .collect::<Vec<_>>();
    debug!(
        "Aggregated {} of {} page results",
        rows.len(),
        results.len()
    );

    Ok(AggregatedDataset {
        headers: vec![PAGE_COLUMN.to_string(), CONTENT_COLUMN.to_string()],
        rows,
    })
}

impl AggregatedDataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, top to bottom. `None` if the column is unknown.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.headers.iter().position(|h| h == name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    /// Serialise as CSV: a header row, then one record per row.
    ///
    /// Fields with commas, quotes or newlines are quoted, so multi-line page
    /// content survives a round trip through [`AggregatedDataset::from_csv`].
    pub fn to_csv(&self) -> Result<String, ExtractError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ExtractError::CsvFailed(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| ExtractError::CsvFailed(e.to_string()))
    }

    /// Parse a CSV export back into a dataset.
    pub fn from_csv(input: &str) -> Result<Self, ExtractError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(input.as_bytes());

        let headers = reader
            .headers()?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        let rows = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()?;

        Ok(Self { headers, rows })
    }

    /// CSV body plus the fixed download filename and content type.
    pub fn export_csv(&self) -> Result<CsvExport, ExtractError> {
        Ok(CsvExport {
            filename: EXPORT_FILENAME,
            content_type: CSV_CONTENT_TYPE,
            body: self.to_csv()?,
        })
    }

    /// Write the CSV export to `path`.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    pub async fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), ExtractError> {
        let path = path.as_ref();
        let body = self.to_csv()?;
        let write_err = |source: std::io::Error| ExtractError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let tmp_path = path.with_extension("csv.tmp");
        tokio::fs::write(&tmp_path, body).await.map_err(write_err)?;
        tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;
    use pretty_assertions::assert_eq;

    fn failed(index: usize) -> ExtractionResult {
        ExtractionResult::failure(
            index,
            PageError::ServiceFailed {
                page: index + 1,
                detail: "boom".into(),
            },
        )
    }

    #[test]
    fn drops_failed_pages_and_keeps_order() {
        let results = vec![
            ExtractionResult::success(0, "first"),
            failed(1),
            ExtractionResult::success(2, "third"),
        ];
        let ds = aggregate(&results).unwrap();
        assert_eq!(ds.headers, vec!["page", "content"]);
        assert_eq!(
            ds.rows,
            vec![
                vec!["1".to_string(), "first".to_string()],
                vec!["3".to_string(), "third".to_string()],
            ]
        );
    }

    #[test]
    fn aggregation_is_idempotent() {
        let results = vec![
            ExtractionResult::success(0, "a"),
            ExtractionResult::success(1, "b"),
        ];
        assert_eq!(aggregate(&results).unwrap(), aggregate(&results).unwrap());
    }

    #[test]
    fn all_failed_is_no_data() {
        let err = aggregate(&[failed(0), failed(1)]).unwrap_err();
        match err {
            ExtractError::NoDataExtracted { total, first_error } => {
                assert_eq!(total, 2);
                assert!(first_error.contains("Page 1"), "got: {first_error}");
            }
            other => panic!("expected NoDataExtracted, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_is_no_data() {
        assert!(matches!(
            aggregate(&[]),
            Err(ExtractError::NoDataExtracted { total: 0, .. })
        ));
    }

    #[test]
    fn out_of_order_results_are_sorted() {
        let results = vec![
            ExtractionResult::success(2, "c"),
            ExtractionResult::success(0, "a"),
        ];
        let ds = aggregate(&results).unwrap();
        assert_eq!(ds.column(PAGE_COLUMN).unwrap(), vec!["1", "3"]);
    }

    #[test]
    fn csv_round_trip_keeps_shape() {
        let results = vec![
            ExtractionResult::success(0, "Name, Amount\n\"Ada\", 12"),
            ExtractionResult::success(1, "plain"),
        ];
        let ds = aggregate(&results).unwrap();
        let csv = ds.to_csv().unwrap();
        let parsed = AggregatedDataset::from_csv(&csv).unwrap();
        assert_eq!(parsed.headers, ds.headers);
        assert_eq!(parsed.len(), ds.len());
        assert_eq!(parsed, ds);
    }

    #[test]
    fn csv_is_stable() {
        let ds = aggregate(&[ExtractionResult::success(0, "x")]).unwrap();
        assert_eq!(ds.to_csv().unwrap(), ds.to_csv().unwrap());
        assert_eq!(ds.to_csv().unwrap(), "page,content\n1,x\n");
    }

    #[test]
    fn export_has_fixed_name_and_type() {
        let ds = aggregate(&[ExtractionResult::success(0, "x")]).unwrap();
        let export = ds.export_csv().unwrap();
        assert_eq!(export.filename, "extracted_data.csv");
        assert_eq!(export.content_type, "text/csv");
        assert_eq!(export.body, ds.to_csv().unwrap());
    }

    #[tokio::test]
    async fn write_csv_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join(EXPORT_FILENAME);
        let ds = aggregate(&[ExtractionResult::success(0, "x")]).unwrap();

        ds.write_csv(&path).await.unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, ds.to_csv().unwrap());
        assert!(!path.with_extension("csv.tmp").exists());
    }
}
