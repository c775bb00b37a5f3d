use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use log::info;
use serde::Serialize;
use uuid::Uuid;

use super::build_name;
use super::chunk::ChunkProcessor;
use super::flatten::FlattenConfig;
use super::item::{RecordReader, RowWriter};
use super::reconcile::SchemaReconciler;
use super::stream::{StreamingConverter, aligned_cells};
use crate::error::ConvertError;
use crate::item::json::json_reader::parse_document;

/// Default batch size for the chunked path.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default schema-discovery sample for the streaming path.
pub const DEFAULT_SAMPLE_SIZE: usize = 500;
/// Default number of rows retained for caller display.
pub const DEFAULT_MAX_PREVIEW: usize = 20;
/// Default per-array element cap during flattening.
pub const DEFAULT_ARRAY_SAMPLE_LIMIT: usize = 10;
/// Default name of the streaming path's catch-all column.
pub const DEFAULT_OVERFLOW_COLUMN: &str = "_extra";
/// Default cap on materialized JSON-Lines records.
pub const DEFAULT_MAX_LINES: usize = 100_000;
/// Default row cutoff for [`Converter::analyze_document`].
pub const DEFAULT_ANALYZE_ROW_LIMIT: usize = 10_000;

/// Configuration recognized by the conversion engine.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Batch size for the chunked path.
    pub chunk_size: usize,
    /// Schema-discovery sample for the streaming path.
    pub sample_size: usize,
    /// Rows retained for caller display.
    pub max_preview: usize,
    /// Per-array element cap during flattening.
    pub array_sample_limit: usize,
    /// Separator placed between key path components.
    pub key_separator: char,
    /// Name of the streaming path's catch-all column.
    pub overflow_column: String,
    /// Cap on materialized JSON-Lines records.
    pub max_lines: usize,
    /// Row cutoff after which an analysis reports an estimate.
    pub analyze_row_limit: usize,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            sample_size: DEFAULT_SAMPLE_SIZE,
            max_preview: DEFAULT_MAX_PREVIEW,
            array_sample_limit: DEFAULT_ARRAY_SAMPLE_LIMIT,
            key_separator: '_',
            overflow_column: DEFAULT_OVERFLOW_COLUMN.to_string(),
            max_lines: DEFAULT_MAX_LINES,
            analyze_row_limit: DEFAULT_ANALYZE_ROW_LIMIT,
        }
    }
}

impl ConvertConfig {
    pub(crate) fn flatten_config(&self) -> FlattenConfig {
        FlattenConfig::new()
            .key_separator(self.key_separator)
            .array_sample_limit(self.array_sample_limit)
    }
}

/// Details of one finished conversion.
#[derive(Debug, Clone)]
pub struct ConversionSummary {
    /// Unique identifier for this conversion run
    pub id: Uuid,
    /// Generated name, used in logs
    pub name: String,
    /// The time when the conversion started
    pub start: Instant,
    /// The time when the conversion finished
    pub end: Instant,
    /// The total duration of the conversion
    pub duration: Duration,
    /// Number of data rows written to the sink
    pub total_rows: usize,
    /// The committed column ordering
    pub columns: Vec<String>,
    /// First output rows, aligned to `columns`
    pub preview: Vec<Vec<String>>,
    /// Records skipped after read failures (streaming path only)
    pub skipped: usize,
}

/// Row and column counts for a document, without producing output.
#[derive(Debug, Serialize)]
pub struct AnalyzeReport {
    pub rows: usize,
    pub columns: usize,
    pub column_names: Vec<String>,
    /// True when analysis stopped early at the configured row limit.
    pub estimated: bool,
}

/// Entry point tying the parser front-end, the engine and a sink together.
///
/// Built through [`ConverterBuilder`]; a `Converter` is stateless apart from
/// its configuration and can run any number of conversions.
pub struct Converter {
    config: ConvertConfig,
}

impl Converter {
    pub fn new(config: ConvertConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Batch path: parse the raw text, flatten it in bounded batches, then
    /// reconcile every batch to one global column ordering and write the
    /// rectangular result to `writer`.
    pub fn convert_document<W>(&self, text: &str, writer: &W) -> Result<ConversionSummary, ConvertError>
    where
        W: RowWriter + ?Sized,
    {
        let id = Uuid::new_v4();
        let name = build_name();
        let start = Instant::now();
        info!("start of conversion: {name}, id: {id}");

        let document = parse_document(text, &self.config)?;
        let processor = ChunkProcessor::new(document, self.config.chunk_size, self.config.flatten_config());
        let table = SchemaReconciler::new(self.config.max_preview).reconcile(processor, writer)?;

        info!(
            "end of conversion: {name}, {} rows x {} columns",
            table.total_rows,
            table.columns.len()
        );

        Ok(ConversionSummary {
            id,
            name,
            start,
            end: Instant::now(),
            duration: start.elapsed(),
            total_rows: table.total_rows,
            columns: table.columns,
            preview: table.preview,
            skipped: 0,
        })
    }

    /// Streaming path: discover a schema from a bounded prefix of `reader`,
    /// then write every record incrementally against it. Schema drift is
    /// routed into the overflow column, never dropped.
    pub fn convert_stream<R, W>(&self, reader: &R, writer: &W) -> Result<ConversionSummary, ConvertError>
    where
        R: RecordReader + ?Sized,
        W: RowWriter + ?Sized,
    {
        let id = Uuid::new_v4();
        let name = build_name();
        let start = Instant::now();
        info!("start of streaming conversion: {name}, id: {id}");

        let stream = StreamingConverter::new(self.config.clone()).convert(reader, writer)?;

        let mut preview = Vec::with_capacity(stream.preview.len());
        for record in &stream.preview {
            preview.push(aligned_cells(record, &stream.header, &self.config.overflow_column)?);
        }

        info!(
            "end of streaming conversion: {name}, {} rows x {} columns, {} skipped",
            stream.total_rows,
            stream.header.len(),
            stream.skipped
        );

        Ok(ConversionSummary {
            id,
            name,
            start,
            end: Instant::now(),
            duration: start.elapsed(),
            total_rows: stream.total_rows,
            columns: stream.header,
            preview,
            skipped: stream.skipped,
        })
    }

    /// Quick analysis without producing output: row and column counts over
    /// the flattened document, stopping early past `analyze_row_limit`.
    pub fn analyze_document(&self, text: &str) -> Result<AnalyzeReport, ConvertError> {
        let document = parse_document(text, &self.config)?;
        let processor = ChunkProcessor::new(document, self.config.chunk_size, self.config.flatten_config());

        let mut columns: BTreeSet<String> = BTreeSet::new();
        let mut rows = 0usize;
        let mut estimated = false;

        for batch in processor {
            columns.extend(batch.columns().iter().cloned());
            rows += batch.len();
            if rows > self.config.analyze_row_limit {
                estimated = true;
                break;
            }
        }

        Ok(AnalyzeReport {
            rows,
            columns: columns.len(),
            column_names: columns.into_iter().collect(),
            estimated,
        })
    }
}

/// Builder for [`Converter`].
#[derive(Default)]
pub struct ConverterBuilder {
    config: ConvertConfig,
}

impl ConverterBuilder {
    pub fn new() -> Self {
        Self {
            config: ConvertConfig::default(),
        }
    }

    /// Sets the batch size for the chunked path.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    /// Sets the schema-discovery sample size for the streaming path.
    pub fn sample_size(mut self, sample_size: usize) -> Self {
        self.config.sample_size = sample_size;
        self
    }

    /// Sets the number of rows retained for caller display.
    pub fn max_preview(mut self, max_preview: usize) -> Self {
        self.config.max_preview = max_preview;
        self
    }

    /// Sets the per-array element cap during flattening.
    pub fn array_sample_limit(mut self, array_sample_limit: usize) -> Self {
        self.config.array_sample_limit = array_sample_limit;
        self
    }

    /// Sets the separator placed between key path components.
    pub fn key_separator(mut self, key_separator: char) -> Self {
        self.config.key_separator = key_separator;
        self
    }

    /// Sets the name of the streaming path's catch-all column.
    pub fn overflow_column(mut self, overflow_column: impl Into<String>) -> Self {
        self.config.overflow_column = overflow_column.into();
        self
    }

    /// Sets the cap on materialized JSON-Lines records.
    pub fn max_lines(mut self, max_lines: usize) -> Self {
        self.config.max_lines = max_lines;
        self
    }

    pub fn build(self) -> Converter {
        Converter::new(self.config)
    }
}
