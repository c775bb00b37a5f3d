use std::collections::BTreeMap;
use std::collections::BTreeSet;

use log::{debug, info, warn};
use serde_json::Value;

use super::convert::ConvertConfig;
use super::flatten::{FlatRecord, cell_text, flatten};
use super::item::{RecordReader, RowWriter};
use crate::error::ConvertError;

/// Result of a streaming conversion.
#[derive(Debug)]
pub struct StreamSummary {
    /// Number of rows written. Skipped records are not counted.
    pub total_rows: usize,
    /// The committed header: sorted sampled columns plus the overflow column.
    pub header: Vec<String>,
    /// First flattened records, kept verbatim before placeholder filling and
    /// overflow routing, for the caller to render.
    pub preview: Vec<FlatRecord>,
    /// Records dropped after a read failure.
    pub skipped: usize,
}

/// Streams records to the sink against a schema discovered from a bounded
/// prefix sample.
///
/// Up to `sample_size` records are drawn from the front of the source and
/// flattened; the sorted union of their keys, plus one catch-all overflow
/// column, becomes the permanent header. The sampled records are then written
/// in their original order, followed by the remainder of the source, one
/// record at a time. Fields that first appear after the sample are
/// JSON-encoded into the overflow cell rather than dropped.
///
/// Memory is O(sample_size + one record); committed output is never
/// re-scanned. A record that fails to read after the schema is committed is
/// skipped and tallied, so one bad record cannot abort a long stream.
pub struct StreamingConverter {
    config: ConvertConfig,
}

impl StreamingConverter {
    pub fn new(config: ConvertConfig) -> Self {
        Self { config }
    }

    pub fn convert<R, W>(&self, reader: &R, writer: &W) -> Result<StreamSummary, ConvertError>
    where
        R: RecordReader + ?Sized,
        W: RowWriter + ?Sized,
    {
        let flatten_config = self.config.flatten_config();
        let mut sampled: Vec<FlatRecord> = Vec::new();
        let mut keys: BTreeSet<String> = BTreeSet::new();
        let mut skipped = 0usize;

        // Sample phase: bound schema discovery to a prefix of the input.
        while sampled.len() < self.config.sample_size {
            match reader.read() {
                Ok(Some(value)) => {
                    let record = flatten(&value, &flatten_config);
                    keys.extend(record.keys().cloned());
                    sampled.push(record);
                }
                Ok(None) => break,
                Err(error) => {
                    skipped += 1;
                    warn!("skipping unreadable record during sampling: {error}");
                }
            }
        }

        let mut header: Vec<String> = keys.into_iter().collect();
        if !header.iter().any(|column| *column == self.config.overflow_column) {
            header.push(self.config.overflow_column.clone());
        }
        debug!("schema committed after {} sampled records: {} columns", sampled.len(), header.len());

        // The header is frozen from here on; later fields go to overflow.
        writer.open()?;
        writer.write_header(&header)?;

        let mut preview: Vec<FlatRecord> = Vec::new();
        let mut total_rows = 0usize;

        for record in sampled {
            self.write_record(record, &header, writer, &mut preview)?;
            total_rows += 1;
        }

        loop {
            match reader.read() {
                Ok(Some(value)) => {
                    let record = flatten(&value, &flatten_config);
                    self.write_record(record, &header, writer, &mut preview)?;
                    total_rows += 1;
                }
                Ok(None) => break,
                Err(error) => {
                    skipped += 1;
                    warn!("skipping unreadable record: {error}");
                }
            }
        }
        writer.flush()?;
        writer.close()?;

        info!(
            "streamed {total_rows} rows across {} columns ({skipped} skipped)",
            header.len()
        );

        Ok(StreamSummary {
            total_rows,
            header,
            preview,
            skipped,
        })
    }

    fn write_record<W>(
        &self,
        record: FlatRecord,
        header: &[String],
        writer: &W,
        preview: &mut Vec<FlatRecord>,
    ) -> Result<(), ConvertError>
    where
        W: RowWriter + ?Sized,
    {
        if preview.len() < self.config.max_preview {
            preview.push(record.clone());
        }
        let cells = aligned_cells(&record, header, &self.config.overflow_column)?;
        writer.write_row(&cells)
    }
}

/// Aligns one flattened record to a committed header.
///
/// Every header column except the overflow one gets the record's value or the
/// empty-string placeholder. Keys outside the header are collected into a map
/// and serialized as one compact JSON object into the overflow cell; when the
/// record also carries a field named like the overflow column, that field
/// joins the map instead of being lost.
pub(crate) fn aligned_cells(
    record: &FlatRecord,
    header: &[String],
    overflow_column: &str,
) -> Result<Vec<String>, ConvertError> {
    let mut drift: BTreeMap<&String, &Value> = BTreeMap::new();
    for (key, value) in record {
        if !header.contains(key) {
            drift.insert(key, value);
        }
    }

    let mut cells = Vec::with_capacity(header.len());
    for column in header {
        if column == overflow_column {
            if drift.is_empty() {
                cells.push(record.get(column).map(cell_text).unwrap_or_default());
            } else {
                if let Some(own) = record.get(column) {
                    drift.insert(column, own);
                }
                let encoded = serde_json::to_string(&drift)
                    .map_err(|error| ConvertError::RowWrite(error.to_string()))?;
                cells.push(encoded);
            }
        } else {
            cells.push(record.get(column).map(cell_text).unwrap_or_default());
        }
    }
    Ok(cells)
}
