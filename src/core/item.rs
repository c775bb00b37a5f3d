use std::cell::Cell;

use serde_json::Value;

use crate::error::ConvertError;

/// Type alias for the result of a single read operation.
///
/// - `Ok(Some(value))`: a record was read successfully
/// - `Ok(None)`: the source is exhausted
/// - `Err(error)`: this record could not be read; the source may still yield
///   further records on subsequent calls
pub type RecordReaderResult = Result<Option<Value>, ConvertError>;

/// Pull-based source of JSON records, one value per call.
///
/// Implementations use interior mutability so a reader can be shared by
/// reference with the converter that drains it.
pub trait RecordReader {
    /// Reads the next record from the source.
    fn read(&self) -> RecordReaderResult;
}

/// Append-only sink for rectangular rows.
///
/// A conversion writes exactly one header followed by rows that all have the
/// same number of cells as the header. Writers must not reorder or buffer
/// rows beyond what `flush` drains.
pub trait RowWriter {
    /// Writes the single committed header row.
    fn write_header(&self, columns: &[String]) -> Result<(), ConvertError>;

    /// Writes one data row, already aligned to the header.
    fn write_row(&self, cells: &[String]) -> Result<(), ConvertError>;

    /// Flushes any internal buffer to the underlying sink.
    fn flush(&self) -> Result<(), ConvertError>;

    /// Called once before the header is written.
    fn open(&self) -> Result<(), ConvertError> {
        Ok(())
    }

    /// Called once after the last row; the writer may release resources.
    fn close(&self) -> Result<(), ConvertError> {
        Ok(())
    }
}

/// In-memory record source.
///
/// Replays a materialized list of values through the [`RecordReader`]
/// interface, which lets the streaming path consume a document the parser
/// front-end fully materialized. Also convenient in tests.
pub struct VecReader {
    items: Vec<Value>,
    cursor: Cell<usize>,
}

impl VecReader {
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items,
            cursor: Cell::new(0),
        }
    }
}

impl RecordReader for VecReader {
    fn read(&self) -> RecordReaderResult {
        let index = self.cursor.get();
        match self.items.get(index) {
            Some(value) => {
                self.cursor.set(index + 1);
                Ok(Some(value.clone()))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{RecordReader, VecReader};

    #[test]
    fn vec_reader_yields_items_in_order_then_none() {
        let reader = VecReader::new(vec![json!({"a": 1}), json!(2)]);

        assert_eq!(reader.read().unwrap(), Some(json!({"a": 1})));
        assert_eq!(reader.read().unwrap(), Some(json!(2)));
        assert_eq!(reader.read().unwrap(), None);
        assert_eq!(reader.read().unwrap(), None);
    }
}
