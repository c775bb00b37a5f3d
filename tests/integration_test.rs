use std::io::Cursor;

use anyhow::Result;
use serde_json::{Value, json};

use flattable::{
    ConvertError,
    core::{
        convert::ConverterBuilder,
        session::{SessionEntry, SessionStore},
    },
    item::{
        csv::csv_writer::CsvRowWriterBuilder,
        json::json_reader::JsonLinesReaderBuilder,
    },
};

fn convert_to_string(text: &str, chunk_size: usize) -> Result<(flattable::core::convert::ConversionSummary, String)> {
    let _ = env_logger::try_init();
    let writer = CsvRowWriterBuilder::new().from_writer(vec![]);
    let summary = ConverterBuilder::new()
        .chunk_size(chunk_size)
        .build()
        .convert_document(text, &writer)?;
    let data = String::from_utf8(writer.into_inner()?)?;
    Ok((summary, data))
}

#[test]
fn nested_object_becomes_one_row_with_path_columns() -> Result<()> {
    let (summary, data) = convert_to_string(r#"{"a": 1, "b": {"c": 2}}"#, 1000)?;

    assert_eq!(summary.total_rows, 1);
    assert_eq!(summary.columns, vec!["a", "b_c"]);
    assert_eq!(data, "a,b_c\n1,2\n");

    Ok(())
}

#[test]
fn single_row_batches_are_reconciled_to_the_union_schema() -> Result<()> {
    let (summary, data) = convert_to_string(r#"[{"x":1},{"x":2,"y":3}]"#, 1)?;

    assert_eq!(summary.total_rows, 2);
    assert_eq!(summary.columns, vec!["x", "y"]);
    assert_eq!(data, "x,y\n1,\n2,3\n");

    Ok(())
}

#[test]
fn long_arrays_are_sampled_with_a_count_column() -> Result<()> {
    let (summary, data) =
        convert_to_string(r#"{"items": [1,2,3,4,5,6,7,8,9,10,11,12]}"#, 1000)?;

    let expected: Vec<String> = (0..10)
        .map(|i| format!("items_{i}"))
        .chain(std::iter::once("items_count".to_string()))
        .collect();
    assert_eq!(summary.columns, expected);
    assert!(!summary.columns.contains(&"items_10".to_string()));
    assert_eq!(data, "items_0,items_1,items_2,items_3,items_4,items_5,items_6,items_7,items_8,items_9,items_count\n1,2,3,4,5,6,7,8,9,10,12\n");

    Ok(())
}

#[test]
fn json_lines_are_recognized_after_whole_document_parse_fails() -> Result<()> {
    let (summary, data) = convert_to_string("{\"a\":1}\n{\"b\":2}\n", 1000)?;

    assert_eq!(summary.total_rows, 2);
    assert_eq!(summary.columns, vec!["a", "b"]);
    assert_eq!(data, "a,b\n1,\n,2\n");

    Ok(())
}

#[test]
fn streaming_routes_post_sample_fields_into_the_overflow_cell() -> Result<()> {
    let _ = env_logger::try_init();
    let reader = JsonLinesReaderBuilder::new()
        .from_reader(Cursor::new("{\"a\":1}\n{\"a\":1,\"b\":2}\n"));
    let writer = CsvRowWriterBuilder::new().from_writer(vec![]);

    let summary = ConverterBuilder::new()
        .sample_size(1)
        .build()
        .convert_stream(&reader, &writer)?;

    assert_eq!(summary.columns, vec!["a", "_extra"]);
    assert_eq!(summary.total_rows, 2);

    let data = String::from_utf8(writer.into_inner()?)?;
    let mut rows = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data.as_bytes());
    let records: Vec<_> = rows.records().collect::<std::result::Result<_, _>>()?;

    assert_eq!(&records[0][1], "");
    let extra: Value = serde_json::from_str(&records[1][1])?;
    assert_eq!(extra, json!({"b": 2}));

    Ok(())
}

#[test]
fn malformed_json_lines_error_names_the_offending_line() {
    let mut lines: Vec<String> = (1..=10).map(|i| format!("{{\"n\":{i}}}")).collect();
    lines[4] = "{\"n\": oops}".to_string();
    let text = lines.join("\n");

    let writer = CsvRowWriterBuilder::new().from_writer(vec![]);
    let error = ConverterBuilder::new()
        .build()
        .convert_document(&text, &writer)
        .unwrap_err();

    match error {
        ConvertError::MalformedInput { line, reason, .. } => {
            assert_eq!(line, 5);
            assert!(!reason.is_empty());
        }
        other => panic!("expected MalformedInput, got {other:?}"),
    }
}

#[test]
fn conversion_is_deterministic_end_to_end() -> Result<()> {
    let text = r#"[{"b": {"x": [1,2,3]}, "a": 1}, {"c": null}, 7, {"a": 2}]"#;

    let (first_summary, first) = convert_to_string(text, 2)?;
    let (second_summary, second) = convert_to_string(text, 2)?;

    assert_eq!(first, second);
    assert_eq!(first_summary.columns, second_summary.columns);
    assert_eq!(first_summary.total_rows, second_summary.total_rows);

    Ok(())
}

#[test]
fn every_output_row_is_rectangular() -> Result<()> {
    let rows: Vec<Value> = (0..40)
        .map(|i| {
            if i % 3 == 0 {
                json!({"a": i, "b": {"c": i}})
            } else {
                json!({"d": i})
            }
        })
        .collect();
    let text = serde_json::to_string(&rows)?;

    let (summary, data) = convert_to_string(&text, 7)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data.as_bytes());
    let mut count = 0;
    for record in reader.records() {
        assert_eq!(record?.len(), summary.columns.len());
        count += 1;
    }
    assert_eq!(count, summary.total_rows);

    let mut sorted = summary.columns.clone();
    sorted.sort();
    assert_eq!(summary.columns, sorted);

    Ok(())
}

#[test]
fn truncated_streaming_source_still_yields_accurate_counts() -> Result<()> {
    // The caller bounds runtime by truncating the source; the engine must
    // report exactly what was written.
    let text: String = (0..100).map(|i| format!("{{\"n\":{i}}}\n")).collect();
    let truncated = text.lines().take(30).collect::<Vec<_>>().join("\n");

    let reader = JsonLinesReaderBuilder::new().from_reader(Cursor::new(truncated));
    let writer = CsvRowWriterBuilder::new().from_writer(vec![]);

    let summary = ConverterBuilder::new()
        .sample_size(10)
        .build()
        .convert_stream(&reader, &writer)?;

    assert_eq!(summary.total_rows, 30);
    assert_eq!(summary.skipped, 0);

    Ok(())
}

#[test]
fn file_backed_conversion_can_be_claimed_through_the_session_store() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let output_path = dir.path().join("converted.csv");

    let writer = CsvRowWriterBuilder::new().from_path(&output_path)?;
    let summary = ConverterBuilder::new()
        .build()
        .convert_document(r#"[{"x":1},{"y":2}]"#, &writer)?;
    drop(writer);

    let mut store = SessionStore::new(8);
    let id = store.insert(SessionEntry {
        output_path: output_path.clone(),
        summary,
    });

    let entry = store.take(&id).expect("entry was just inserted");
    assert!(store.take(&id).is_none());

    let data = std::fs::read_to_string(&entry.output_path)?;
    assert_eq!(data, "x,y\n1,\n,2\n");

    Ok(())
}

#[test]
fn custom_separator_and_overflow_column_are_respected() -> Result<()> {
    let writer = CsvRowWriterBuilder::new().from_writer(vec![]);
    let summary = ConverterBuilder::new()
        .key_separator('.')
        .overflow_column("__rest")
        .sample_size(1)
        .build()
        .convert_stream(
            &JsonLinesReaderBuilder::new()
                .from_reader(Cursor::new("{\"a\":{\"b\":1}}\n{\"a\":{\"b\":1},\"z\":2}\n")),
            &writer,
        )?;

    assert_eq!(summary.columns, vec!["a.b", "__rest"]);
    assert_eq!(summary.total_rows, 2);

    Ok(())
}
