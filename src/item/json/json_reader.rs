use std::cell::{Cell, RefCell};
use std::io::{BufRead, BufReader, Lines, Read};

use log::{debug, warn};
use serde_json::Value;

use crate::core::convert::ConvertConfig;
use crate::core::item::{RecordReader, RecordReaderResult};
use crate::error::ConvertError;

/// Line-level parse failures past this point stop collection silently
/// instead of raising: verbose for early mistakes, best effort for huge
/// files.
const VERBOSE_ERROR_LINES: usize = 100;

/// Parses raw text as one JSON document, falling back to JSON-Lines.
///
/// The whole-document parse is always attempted first, so a single valid
/// JSON array or object is never misinterpreted as JSON-Lines. Only when it
/// fails is the input reinterpreted line by line, producing an array of the
/// per-line values.
///
/// A parse failure within the first [`VERBOSE_ERROR_LINES`] lines raises
/// [`ConvertError::MalformedInput`] naming the 1-based line number; beyond
/// that, collection stops silently with what parsed so far. The number of
/// materialized records is capped at `config.max_lines`.
pub fn parse_document(text: &str, config: &ConvertConfig) -> Result<Value, ConvertError> {
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(error) => {
            debug!("whole-document parse failed ({error}), trying JSON-Lines");
            parse_json_lines(text, config)
        }
    }
}

fn parse_json_lines(text: &str, config: &ConvertConfig) -> Result<Value, ConvertError> {
    let mut records = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(value) => {
                records.push(value);
                if records.len() >= config.max_lines {
                    warn!("JSON-Lines input truncated at {} records", config.max_lines);
                    break;
                }
            }
            Err(error) => {
                if line_number <= VERBOSE_ERROR_LINES {
                    return Err(ConvertError::MalformedInput {
                        line: line_number,
                        column: error.column(),
                        reason: error.to_string(),
                    });
                }
                debug!("stopping JSON-Lines collection at line {line_number}: {error}");
                break;
            }
        }
    }
    Ok(Value::Array(records))
}

/// Lazy JSON-Lines record reader for the streaming path.
///
/// Yields one parsed value per non-blank line without materializing the
/// input. A line that fails to parse surfaces as an error for that record
/// only; subsequent reads continue with the next line, which lets the
/// streaming converter skip bad records instead of aborting.
pub struct JsonLinesReader<R> {
    lines: RefCell<Lines<BufReader<R>>>,
    line_number: Cell<usize>,
}

impl<R: Read> RecordReader for JsonLinesReader<R> {
    fn read(&self) -> RecordReaderResult {
        loop {
            let next = self.lines.borrow_mut().next();
            match next {
                None => return Ok(None),
                Some(Err(error)) => {
                    return Err(ConvertError::RecordRead(error.to_string()));
                }
                Some(Ok(line)) => {
                    self.line_number.set(self.line_number.get() + 1);
                    if line.trim().is_empty() {
                        continue;
                    }
                    return match serde_json::from_str(&line) {
                        Ok(value) => Ok(Some(value)),
                        Err(error) => Err(ConvertError::RecordRead(format!(
                            "invalid JSON on line {}: {error}",
                            self.line_number.get()
                        ))),
                    };
                }
            }
        }
    }
}

#[derive(Default)]
pub struct JsonLinesReaderBuilder {
    capacity: Option<usize>,
}

impl JsonLinesReaderBuilder {
    pub fn new() -> JsonLinesReaderBuilder {
        Self {
            capacity: Some(8 * 1024),
        }
    }

    /// Sets the buffer capacity of the underlying reader.
    pub fn capacity(mut self, capacity: usize) -> JsonLinesReaderBuilder {
        self.capacity = Some(capacity);
        self
    }

    pub fn from_reader<R: Read>(self, rdr: R) -> JsonLinesReader<R> {
        let buf_reader = BufReader::with_capacity(self.capacity.unwrap_or(8 * 1024), rdr);
        JsonLinesReader {
            lines: RefCell::new(buf_reader.lines()),
            line_number: Cell::new(0),
        }
    }
}
