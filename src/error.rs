use thiserror::Error;

#[derive(Error, Debug)]
/// Conversion error
pub enum ConvertError {
    /// The input is neither a whole JSON document nor line-wise JSON-Lines.
    /// Fatal for the current conversion.
    #[error("invalid JSON on line {line}, column {column}: {reason}")]
    MalformedInput {
        /// 1-based line number of the first offending line.
        line: usize,
        /// Column offset reported by the JSON parser.
        column: usize,
        /// Original decode failure reason.
        reason: String,
    },

    /// A single record could not be read or parsed. Bulk consumers skip the
    /// record; single-record consumers propagate.
    #[error("RecordReader from: {0}")]
    RecordRead(String),

    /// The output sink rejected a write. Always propagated.
    #[error("RowWriter from: {0}")]
    RowWrite(String),

    /// Spill storage could not be created, written or re-read. Distinct from
    /// `MalformedInput` because the remediation differs: use the streaming
    /// path or a smaller file instead of fixing the JSON.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
}
