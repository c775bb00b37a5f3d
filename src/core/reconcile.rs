use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::{debug, warn};
use tempfile::{NamedTempFile, TempPath};

use super::chunk::Batch;
use super::flatten::{FlatRecord, cell_text};
use super::item::RowWriter;
use crate::error::ConvertError;

/// Shape of a reconciled table.
#[derive(Debug)]
pub struct TableSummary {
    /// Number of data rows written to the sink.
    pub total_rows: usize,
    /// The global column ordering, sorted lexicographically.
    pub columns: Vec<String>,
    /// First rows of the output, aligned to `columns`.
    pub preview: Vec<Vec<String>>,
}

/// Re-aligns independently flattened batches to one global column ordering.
///
/// Works in two passes. Pass 1 consumes every batch once, unions its column
/// set and spills its rows as JSON-Lines to a private temp file, so no batch
/// stays live after it is seen. Pass 2 re-reads the spill files in order and
/// emits every row aligned to the sorted global column set, filling missing
/// cells with the empty-string placeholder.
///
/// Spill files are removed when the reconciler returns, on every exit path.
/// Only the spill currently being written or replayed holds an open file
/// handle, so descriptor usage stays constant in the number of batches.
///
/// Rows without any columns cannot be represented in a rectangular table: a
/// document of empty objects yields an empty column set, no header and zero
/// output rows.
pub struct SchemaReconciler {
    max_preview: usize,
}

impl SchemaReconciler {
    pub fn new(max_preview: usize) -> Self {
        Self { max_preview }
    }

    pub fn reconcile<I, W>(&self, batches: I, writer: &W) -> Result<TableSummary, ConvertError>
    where
        I: IntoIterator<Item = Batch>,
        W: RowWriter + ?Sized,
    {
        let mut columns: BTreeSet<String> = BTreeSet::new();
        let mut spills: Vec<(TempPath, usize)> = Vec::new();
        let mut total_rows = 0usize;

        // Pass 1: union columns, spill rows, drop each batch as it is seen.
        for batch in batches {
            if batch.is_empty() {
                continue;
            }
            columns.extend(batch.columns().iter().cloned());
            total_rows += batch.len();
            spills.push((spill_batch(&batch)?, batch.len()));
        }
        debug!(
            "pass 1 complete: {} rows, {} columns across {} spill files",
            total_rows,
            columns.len(),
            spills.len()
        );

        // BTreeSet iterates in sorted order, which is exactly the mandated
        // lexicographic global ordering.
        let global_columns: Vec<String> = columns.into_iter().collect();

        let mut preview = Vec::new();
        let mut written = 0usize;

        writer.open()?;
        if !global_columns.is_empty() {
            writer.write_header(&global_columns)?;

            // Pass 2: realign every spilled row to the global column set.
            for (spill, rows) in &spills {
                match self.replay_spill(spill, &global_columns, writer, &mut preview) {
                    Ok(count) => written += count,
                    Err(error @ ConvertError::RowWrite(_)) => return Err(error),
                    Err(error) => {
                        // One unreadable spill file must not abort the rest
                        // of the conversion.
                        warn!("skipping unreadable spill file ({rows} rows): {error}");
                    }
                }
            }
        }
        writer.flush()?;
        writer.close()?;

        if written != total_rows {
            warn!("wrote {written} of {total_rows} flattened rows");
        }

        Ok(TableSummary {
            total_rows: written,
            columns: global_columns,
            preview,
        })
    }

    fn replay_spill<W>(
        &self,
        spill: &Path,
        columns: &[String],
        writer: &W,
        preview: &mut Vec<Vec<String>>,
    ) -> Result<usize, ConvertError>
    where
        W: RowWriter + ?Sized,
    {
        let file =
            File::open(spill).map_err(|error| ConvertError::ResourceExhausted(error.to_string()))?;
        let reader = BufReader::new(file);
        let mut count = 0usize;

        for line in reader.lines() {
            let line = line.map_err(|error| ConvertError::ResourceExhausted(error.to_string()))?;
            if line.is_empty() {
                continue;
            }
            let record: FlatRecord = serde_json::from_str(&line)
                .map_err(|error| ConvertError::RecordRead(error.to_string()))?;
            let cells: Vec<String> = columns
                .iter()
                .map(|column| record.get(column).map(cell_text).unwrap_or_default())
                .collect();
            writer.write_row(&cells)?;
            if preview.len() < self.max_preview {
                preview.push(cells);
            }
            count += 1;
        }
        Ok(count)
    }
}

/// Writes one batch to its own temp file, one JSON object per line.
///
/// Returns the spill as a path only: the write handle is closed here so a
/// long conversion does not accumulate one open descriptor per batch, while
/// delete-on-drop is preserved by the `TempPath`.
fn spill_batch(batch: &Batch) -> Result<TempPath, ConvertError> {
    let spill =
        NamedTempFile::new().map_err(|error| ConvertError::ResourceExhausted(error.to_string()))?;
    let mut out = BufWriter::new(spill.as_file());
    for record in batch.records() {
        serde_json::to_writer(&mut out, record)
            .map_err(|error| ConvertError::ResourceExhausted(error.to_string()))?;
        out.write_all(b"\n")
            .map_err(|error| ConvertError::ResourceExhausted(error.to_string()))?;
    }
    out.flush()
        .map_err(|error| ConvertError::ResourceExhausted(error.to_string()))?;
    drop(out);
    Ok(spill.into_temp_path())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::SchemaReconciler;
    use crate::core::chunk::ChunkProcessor;
    use crate::core::flatten::FlattenConfig;
    use crate::item::csv::csv_writer::CsvRowWriterBuilder;

    fn reconcile_to_csv(document: serde_json::Value, chunk_size: usize) -> (super::TableSummary, String) {
        let processor = ChunkProcessor::new(document, chunk_size, FlattenConfig::new());
        let writer = CsvRowWriterBuilder::new().from_writer(vec![]);
        let summary = SchemaReconciler::new(20)
            .reconcile(processor, &writer)
            .unwrap();
        let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        (summary, data)
    }

    #[test]
    fn batches_are_realigned_to_sorted_global_columns() {
        let (summary, data) = reconcile_to_csv(json!([{"x": 1}, {"x": 2, "y": 3}]), 1);

        assert_eq!(summary.total_rows, 2);
        assert_eq!(summary.columns, vec!["x", "y"]);
        assert_eq!(data, "x,y\n1,\n2,3\n");
    }

    #[test]
    fn output_is_rectangular_across_disjoint_schemas() {
        let (summary, data) = reconcile_to_csv(
            json!([{"a": 1}, {"b": 2}, {"c": {"d": 3}}]),
            1,
        );

        assert_eq!(summary.columns, vec!["a", "b", "c_d"]);
        for row in &summary.preview {
            assert_eq!(row.len(), summary.columns.len());
        }
        assert_eq!(data, "a,b,c_d\n1,,\n,2,\n,,3\n");
    }

    #[test]
    fn global_columns_are_the_union_of_local_columns() {
        let processor = ChunkProcessor::new(
            json!([{"b": 1}, {"a": 1}, {"c": 1}]),
            1,
            FlattenConfig::new(),
        );
        let locals: Vec<_> = processor.collect();
        let mut union: Vec<String> = locals
            .iter()
            .flat_map(|batch| batch.columns().iter().cloned())
            .collect();
        union.sort();

        let (summary, _) = reconcile_to_csv(json!([{"b": 1}, {"a": 1}, {"c": 1}]), 1);
        assert_eq!(summary.columns, union);
    }

    #[test]
    fn preview_is_capped() {
        let rows: Vec<_> = (0..50).map(|i| json!({"n": i})).collect();
        let (summary, _) = reconcile_to_csv(json!(rows), 10);

        assert_eq!(summary.total_rows, 50);
        assert_eq!(summary.preview.len(), 20);
        assert_eq!(summary.preview[0], vec!["0".to_string()]);
    }

    #[test]
    fn empty_document_produces_no_rows_and_no_header() {
        let (summary, data) = reconcile_to_csv(json!([]), 1000);

        assert_eq!(summary.total_rows, 0);
        assert!(summary.columns.is_empty());
        assert_eq!(data, "");
    }

    #[test]
    fn spilled_batches_do_not_hold_open_descriptors() {
        // One spill per batch: with 2000 single-row batches this would blow
        // through typical descriptor limits if every spill kept its write
        // handle open until pass 2.
        let rows: Vec<_> = (0..2000).map(|i| json!({"n": i})).collect();
        let (summary, _) = reconcile_to_csv(json!(rows), 1);

        assert_eq!(summary.total_rows, 2000);
        assert_eq!(summary.columns, vec!["n"]);
    }

    #[test]
    fn empty_objects_yield_no_columns_and_no_rows() {
        let (summary, data) = reconcile_to_csv(json!([{}, {}]), 1000);

        assert_eq!(summary.total_rows, 0);
        assert!(summary.columns.is_empty());
        assert_eq!(data, "");
    }

    #[test]
    fn null_and_missing_cells_share_the_placeholder() {
        let (_, data) = reconcile_to_csv(json!([{"a": null, "b": 1}, {"b": 2}]), 1000);

        assert_eq!(data, "a,b\n,1\n,2\n");
    }
}
