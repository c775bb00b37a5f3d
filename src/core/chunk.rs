use std::collections::BTreeSet;

use log::debug;
use serde_json::Value;

use super::flatten::{FlatRecord, FlattenConfig, SCALAR_COLUMN, flatten};

/// A bounded group of flattened records sharing one local column set.
///
/// Batches are created by the [`ChunkProcessor`], consumed once by the
/// schema reconciler, and never retained beyond that pass.
pub struct Batch {
    records: Vec<FlatRecord>,
    columns: BTreeSet<String>,
}

impl Batch {
    fn from_records(records: Vec<FlatRecord>) -> Self {
        let mut columns = BTreeSet::new();
        for record in &records {
            columns.extend(record.keys().cloned());
        }
        Self { records, columns }
    }

    pub fn records(&self) -> &[FlatRecord] {
        &self.records
    }

    /// Union of the key paths of every record in this batch.
    pub fn columns(&self) -> &BTreeSet<String> {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

enum ChunkSource {
    Sequence(Vec<Value>),
    Single(Value),
}

/// Splits a materialized document into fixed-size batches of flat records.
///
/// An array document is cut into consecutive slices of `chunk_size` elements.
/// A slice made entirely of objects flattens each element independently; a
/// slice containing any non-object degrades to a single opaque `value`
/// column for the whole slice. Non-array documents yield exactly one batch
/// with one record.
///
/// Each yielded [`Batch`] is fully materialized and holds no reference to
/// prior batches, so its memory is releasable as soon as it is consumed.
pub struct ChunkProcessor {
    source: ChunkSource,
    chunk_size: usize,
    flatten_config: FlattenConfig,
    cursor: usize,
    done: bool,
}

impl ChunkProcessor {
    pub fn new(document: Value, chunk_size: usize, flatten_config: FlattenConfig) -> Self {
        let source = match document {
            Value::Array(items) => ChunkSource::Sequence(items),
            other => ChunkSource::Single(other),
        };
        Self {
            source,
            chunk_size: chunk_size.max(1),
            flatten_config,
            cursor: 0,
            done: false,
        }
    }

    fn batch_for_slice(&self, slice: &[Value]) -> Batch {
        if slice.iter().all(Value::is_object) {
            let records = slice
                .iter()
                .map(|item| flatten(item, &self.flatten_config))
                .collect();
            Batch::from_records(records)
        } else {
            // Mixed or scalar slices degrade to one opaque column for the
            // whole slice; per-element typing is traded away for simplicity.
            let records = slice
                .iter()
                .map(|item| {
                    let mut record = FlatRecord::new();
                    record.insert(SCALAR_COLUMN.to_string(), item.clone());
                    record
                })
                .collect();
            Batch::from_records(records)
        }
    }
}

impl Iterator for ChunkProcessor {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.done {
            return None;
        }
        match &self.source {
            ChunkSource::Single(value) => {
                self.done = true;
                let record = flatten(value, &self.flatten_config);
                Some(Batch::from_records(vec![record]))
            }
            ChunkSource::Sequence(items) => {
                if self.cursor >= items.len() {
                    self.done = true;
                    return None;
                }
                let end = (self.cursor + self.chunk_size).min(items.len());
                let batch = self.batch_for_slice(&items[self.cursor..end]);
                debug!(
                    "flattened chunk {}..{} into {} rows, {} local columns",
                    self.cursor,
                    end,
                    batch.len(),
                    batch.columns().len()
                );
                self.cursor = end;
                Some(batch)
            }
        }
    }
}
