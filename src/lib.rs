/*!
 # Flattable

 A toolkit for turning arbitrarily nested JSON or JSON-Lines documents into
 flat, rectangular tables suitable for CSV export, without loading the whole
 input into memory and without knowing the schema in advance.

 ## Core Concepts

 - **Flattener:** a pure function that collapses one nested JSON value into a
   single-level mapping keyed by path strings (`a_b_0_c`). Large arrays are
   sampled, with a count marker recording the truncated length.
 - **ChunkProcessor:** splits a materialized collection into fixed-size
   batches of flattened records, yielded lazily so each batch can be dropped
   once consumed.
 - **SchemaReconciler:** unions the column sets of all batches, sorts them
   into one global ordering, and re-emits every row aligned to it. Rows are
   spilled to temporary files between the two passes, so peak memory stays
   bounded by one batch.
 - **StreamingConverter:** the alternative path for unbounded inputs.
   Discovers a schema from a bounded prefix sample, freezes it, then streams
   every record straight to the sink. Fields that appear after the sample are
   routed into a single overflow column instead of being dropped.
 - **RecordReader / RowWriter:** the traits at the input and output
   boundaries. Readers hand over one `serde_json::Value` at a time; writers
   accept a header and rectangular rows of cells.

 ## Getting Started

```rust
use flattable::{
    core::convert::ConverterBuilder,
    item::csv::csv_writer::CsvRowWriterBuilder,
};

fn main() -> Result<(), flattable::ConvertError> {
    let writer = CsvRowWriterBuilder::new().from_writer(vec![]);

    let summary = ConverterBuilder::new()
        .chunk_size(1000)
        .build()
        .convert_document(r#"[{"x":1},{"x":2,"y":3}]"#, &writer)?;

    assert_eq!(summary.total_rows, 2);
    assert_eq!(summary.columns, vec!["x".to_string(), "y".to_string()]);

    let data = String::from_utf8(writer.into_inner()?).unwrap();
    assert_eq!(data, "x,y\n1,\n2,3\n");
    Ok(())
}
```

 ## Features

 | **Feature** | **Description**                                          |
 |-------------|----------------------------------------------------------|
 | logger      | Enables a logging `RowWriter`, useful for debugging      |
 | full        | Enables all available features                           |
 */

/// Core module for flattening and conversion
pub mod core;

/// Error types for conversions
pub mod error;

#[doc(inline)]
pub use error::*;

/// Set of record readers / row writers (for example: the CSV row writer)
pub mod item;
