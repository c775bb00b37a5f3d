#[cfg(feature = "logger")]
/// This module provides a row writer that logs every emitted row.
pub mod logger;

/// This module provides the CSV row writer for the rectangular output boundary.
pub mod csv;

/// This module provides the JSON parser front-end and record readers.
pub mod json;
