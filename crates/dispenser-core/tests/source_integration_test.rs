//! Integration tests for reading sources end to end
//!
//! Tests use temporary directories with real file fixtures to verify:
//! - Glob expansion and ordered concatenation
//! - Per-target row limits
//! - Format detection across every supported format
//! - Error reporting for bad references and bad content
//! - One-shot and replayable references

use dispenser_core::{
    Error, FormatTag, MemoryCollection, Record, Reference, Source, SourceKind, SourceOptions,
    resolve,
};
use serde_json::{Value, json};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

fn read_all(source: Source) -> Vec<Value> {
    source
        .into_iter()
        .map(|record| Value::Object(record.unwrap()))
        .collect()
}

fn keys(record: &Value) -> Vec<&str> {
    record
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect()
}

fn write_csv_rows(dir: &Path, name: &str, count: usize) {
    let mut text = String::from("n\n");
    for i in 0..count {
        text.push_str(&format!("{}\n", i));
    }
    fs::write(dir.join(name), text).unwrap();
}

// =============================================================================
// Glob Concatenation Tests
// =============================================================================

#[test]
fn test_glob_yields_files_in_order() {
    let dir = TempDir::new().unwrap();
    // Written out of order on purpose
    fs::write(dir.path().join("data3.csv"), "x\n3\n").unwrap();
    fs::write(dir.path().join("data1.csv"), "x\n1\n").unwrap();
    fs::write(dir.path().join("data2.csv"), "x\n2\n").unwrap();

    let pattern = dir.path().join("data*.csv");
    let source = Source::new(pattern.to_str().unwrap()).unwrap();
    assert_eq!(source.kind(), SourceKind::Glob);

    assert_eq!(
        read_all(source),
        vec![json!({"x": "1"}), json!({"x": "2"}), json!({"x": "3"})]
    );
}

#[test]
fn test_glob_over_mixed_formats() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.csv"), "id\n1\n").unwrap();
    fs::write(dir.path().join("b.json"), r#"[{"id": 2, "extra": true}]"#).unwrap();
    fs::write(dir.path().join("c.py"), "[{'id': 3}]").unwrap();

    let source = Source::new(dir.path().join("*")).unwrap();
    assert_eq!(
        read_all(source),
        vec![
            json!({"id": "1"}),
            json!({"id": 2, "extra": true}),
            json!({"id": 3})
        ]
    );
}

#[test]
fn test_glob_without_matches_is_empty() {
    let dir = TempDir::new().unwrap();
    let source = Source::new(dir.path().join("*.csv")).unwrap();
    assert!(read_all(source).is_empty());
}

// =============================================================================
// Limit Tests
// =============================================================================

#[test]
fn test_limit_on_single_file() {
    let dir = TempDir::new().unwrap();
    write_csv_rows(dir.path(), "five.csv", 5);

    let options = SourceOptions::default().with_limit(2);
    let source = Source::with_options(dir.path().join("five.csv"), options).unwrap();
    assert_eq!(read_all(source), vec![json!({"n": "0"}), json!({"n": "1"})]);
}

#[test]
fn test_limit_is_per_target() {
    let dir = TempDir::new().unwrap();
    write_csv_rows(dir.path(), "a.csv", 5);
    write_csv_rows(dir.path(), "b.csv", 5);

    let options = SourceOptions::default().with_limit(2);
    let source = Source::with_options(dir.path().join("*.csv"), options).unwrap();
    assert_eq!(read_all(source).len(), 4);
}

#[test]
fn test_zero_limit_is_empty() {
    let dir = TempDir::new().unwrap();
    write_csv_rows(dir.path(), "a.csv", 5);

    let options = SourceOptions::default().with_limit(0);
    let source = Source::with_options(dir.path().join("a.csv"), options).unwrap();
    assert!(read_all(source).is_empty());
}

// =============================================================================
// Format Tests
// =============================================================================

#[test]
fn test_json_file_preserves_field_order() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("people.json");
    fs::write(
        &file,
        r#"[{"zeta": 1, "alpha": {"nested": [1, 2]}, "mid": null}, {"zeta": 2}]"#,
    )
    .unwrap();

    let records = read_all(Source::new(file).unwrap());
    assert_eq!(records.len(), 2);
    assert_eq!(keys(&records[0]), vec!["zeta", "alpha", "mid"]);
    assert_eq!(records[0]["alpha"], json!({"nested": [1, 2]}));
}

#[test]
fn test_json_lines_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("events.jsonl");
    fs::write(&file, "{\"e\": 1}\n{\"e\": 2}\n{\"e\": 3}\n").unwrap();

    assert_eq!(read_all(Source::new(file).unwrap()).len(), 3);
}

#[test]
fn test_pickle_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("rows.pkl");
    let rows = json!([{"b": 1, "a": "x"}, {"b": 2, "a": "y"}]);
    fs::write(&file, serde_pickle::to_vec(&rows, serde_pickle::SerOptions::new()).unwrap()).unwrap();

    let records = read_all(Source::new(file).unwrap());
    assert_eq!(records, vec![json!({"b": 1, "a": "x"}), json!({"b": 2, "a": "y"})]);
    assert_eq!(keys(&records[0]), vec!["b", "a"]);
}

#[test]
fn test_pickle_detected_without_extension() {
    let bytes = serde_pickle::to_vec(&json!([{"a": 1}]), serde_pickle::SerOptions::new()).unwrap();
    let source = Source::new(Reference::reader(Cursor::new(bytes))).unwrap();
    assert_eq!(read_all(source), vec![json!({"a": 1})]);
}

#[test]
fn test_xml_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("people.xml");
    fs::write(
        &file,
        r#"<?xml version="1.0"?>
<people>
  <person id="1"><name>Alice</name><city>Oslo</city></person>
  <person id="2"><name>Bob</name><city>Lima</city></person>
</people>"#,
    )
    .unwrap();

    let records = read_all(Source::new(file).unwrap());
    assert_eq!(records.len(), 2);
    assert_eq!(keys(&records[1]), vec!["tag", "id", "name", "city"]);
    assert_eq!(records[1]["name"], json!("Bob"));
}

#[cfg(feature = "yaml")]
#[test]
fn test_yaml_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("people.yml");
    fs::write(&file, "- name: Alice\n  age: 30\n- name: Bob\n  age: 25\n").unwrap();

    let records = read_all(Source::new(file).unwrap());
    assert_eq!(
        records,
        vec![json!({"name": "Alice", "age": 30}), json!({"name": "Bob", "age": 25})]
    );
}

#[test]
fn test_literal_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("rows.py");
    fs::write(&file, "[OrderedDict([('z', 1), ('a', (1, 2))]), {'z': None}]").unwrap();

    let records = read_all(Source::new(file).unwrap());
    assert_eq!(records, vec![json!({"z": 1, "a": [1, 2]}), json!({"z": null})]);
    assert_eq!(keys(&records[0]), vec!["z", "a"]);
}

#[test]
fn test_inline_strings_are_sniffed() {
    assert_eq!(
        read_all(Source::new("name,n\nx,1\n").unwrap()),
        vec![json!({"name": "x", "n": "1"})]
    );
    assert_eq!(
        read_all(Source::new(r#"[{"a": 1}]"#).unwrap()),
        vec![json!({"a": 1})]
    );
    assert_eq!(
        read_all(Source::new("[{'a': True}]").unwrap()),
        vec![json!({"a": true})]
    );
    assert_eq!(
        read_all(Source::new("<r><i v='1'/><i v='2'/></r>").unwrap()).len(),
        2
    );
}

#[cfg(feature = "excel")]
fn write_workbook(path: &Path) {
    use rust_xlsxwriter::Workbook;

    let mut workbook = Workbook::new();
    let people = workbook.add_worksheet().set_name("People").unwrap();
    people.write_string(0, 0, "name").unwrap();
    people.write_string(0, 1, "age").unwrap();
    people.write_string(0, 2, "active").unwrap();
    people.write_string(1, 0, "Alice").unwrap();
    people.write_number(1, 1, 30).unwrap();
    people.write_boolean(1, 2, true).unwrap();
    // Short row
    people.write_string(2, 0, "Bob").unwrap();
    people.write_number(2, 1, 25).unwrap();

    let cities = workbook.add_worksheet().set_name("Cities").unwrap();
    cities.write_string(0, 0, "city").unwrap();
    cities.write_string(1, 0, "Oslo").unwrap();

    fs::write(path, workbook.save_to_buffer().unwrap()).unwrap();
}

#[cfg(feature = "excel")]
#[test]
fn test_xlsx_file_reads_first_sheet() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("staff.xlsx");
    write_workbook(&file);

    let records = read_all(Source::new(file).unwrap());
    assert_eq!(records.len(), 2);
    assert_eq!(keys(&records[0]), vec!["name", "age", "active"]);
    assert_eq!(records[0]["name"], json!("Alice"));
    assert_eq!(records[0]["age"].as_f64(), Some(30.0));
    assert_eq!(records[0]["active"], json!(true));
    assert_eq!(keys(&records[1]), vec!["name", "age", "active"]);
    assert_eq!(records[1]["active"], Value::Null);
}

#[cfg(feature = "excel")]
#[test]
fn test_xlsx_named_sheet() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("staff.xlsx");
    write_workbook(&file);

    let options = SourceOptions::default().with_sheet("Cities");
    let source = Source::with_options(file.clone(), options).unwrap();
    assert_eq!(read_all(source), vec![json!({"city": "Oslo"})]);

    let options = SourceOptions::default().with_sheet("Missing");
    let results: Vec<_> = Source::with_options(file, options)
        .unwrap()
        .into_iter()
        .collect();
    assert!(results[0].as_ref().unwrap_err().is_decode());
}

#[cfg(feature = "excel")]
#[test]
fn test_workbook_detected_without_extension() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("staff.xlsx");
    write_workbook(&file);

    let bytes = fs::read(&file).unwrap();
    let source = Source::new(Reference::reader(Cursor::new(bytes))).unwrap();
    assert_eq!(read_all(source).len(), 2);
}

#[test]
fn test_format_override() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("export.txt");
    fs::write(&file, "a;b\n1;2\n").unwrap();

    let options = SourceOptions::default()
        .with_format(FormatTag::Csv)
        .with_delimiter(';');
    let source = Source::with_options(file, options).unwrap();
    assert_eq!(read_all(source), vec![json!({"a": "1", "b": "2"})]);
}

// =============================================================================
// Native Source Tests
// =============================================================================

#[test]
fn test_collection_source() {
    let docs: Vec<Record> = vec![
        json!({"_id": 1, "name": "a"}).as_object().unwrap().clone(),
        json!({"_id": 2, "name": "b"}).as_object().unwrap().clone(),
    ];
    let options = SourceOptions::default().with_limit(1);
    let mut source = Source::with_options(
        Reference::collection(MemoryCollection::new("users", docs)),
        options,
    )
    .unwrap();

    assert_eq!(source.kind(), SourceKind::Collection);
    assert_eq!(source.table_name(), "users");
    assert_eq!(source.records().unwrap().count(), 1);
    // Collections can be queried again
    assert_eq!(source.records().unwrap().count(), 1);
}

#[test]
fn test_sequence_source_is_one_shot() {
    let records: Vec<Record> = vec![json!({"a": 1}).as_object().unwrap().clone()];
    let mut source = Source::new(records).unwrap();
    assert_eq!(source.kind(), SourceKind::Sequence);

    assert_eq!(source.records().unwrap().count(), 1);
    assert!(matches!(
        source.records().err().unwrap(),
        Error::ExhaustedSource { .. }
    ));
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[test]
fn test_truncated_json_is_decode_error() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("broken.json");
    fs::write(&file, r#"{"a":1,"#).unwrap();

    let results: Vec<_> = Source::new(file.clone()).unwrap().into_iter().collect();
    assert_eq!(results.len(), 1);

    let err = results.into_iter().next().unwrap().unwrap_err();
    assert!(err.is_decode());
    assert_eq!(err.target(), Some(file.to_str().unwrap()));
    assert!(err.to_string().contains("broken.json"));
}

#[test]
fn test_decode_error_halts_the_stream() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.json"), "[{\"a\": 1}]").unwrap();
    fs::write(dir.path().join("b.json"), "{oops").unwrap();
    fs::write(dir.path().join("c.json"), "[{\"a\": 3}]").unwrap();

    let results: Vec<_> = Source::new(dir.path().join("*.json"))
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(results[1].as_ref().unwrap_err().target().unwrap().ends_with("b.json"));
}

#[test]
fn test_deeply_nested_literal_is_decode_error() {
    let text = format!("{}'a'{}", "[".repeat(20_000), "]".repeat(20_000));
    let options = SourceOptions::default().with_format(FormatTag::LiteralPython);
    let results: Vec<_> = Source::with_options(text, options)
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(results.len(), 1);
    assert!(results[0].as_ref().unwrap_err().is_decode());
}

#[test]
fn test_none_literal_yields_nothing() {
    let options = SourceOptions::default().with_format(FormatTag::LiteralPython);
    let source = Source::with_options("None", options).unwrap();
    assert!(read_all(source).is_empty());
}

#[test]
fn test_integer_reference_is_unresolvable() {
    let err = Source::new(json!(42)).unwrap_err();
    assert!(matches!(err, Error::UnresolvableSource { .. }));
}

#[test]
fn test_second_pass_over_handle_is_exhausted() {
    let mut source = Source::new(Reference::reader(Cursor::new(b"a\n1\n2\n".to_vec()))).unwrap();
    assert_eq!(source.records().unwrap().count(), 2);

    let err = source.records().err().unwrap();
    assert!(matches!(err, Error::ExhaustedSource { .. }));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let source = Source::new(dir.path().join("absent.csv")).unwrap();
    let results: Vec<_> = source.into_iter().collect();
    assert!(matches!(results[0], Err(Error::Io { .. })));
}

// =============================================================================
// Idempotence Tests
// =============================================================================

#[test]
fn test_classify_and_detect_are_idempotent() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("rows");
    fs::write(&file, "<rows><row/></rows>").unwrap();
    let options = SourceOptions::default();

    let first = resolve(Reference::from(file.clone())).unwrap();
    let second = resolve(Reference::from(file.clone())).unwrap();
    assert_eq!(first[0].kind(), second[0].kind());
    assert_eq!(
        first[0].detect(&options).unwrap(),
        second[0].detect(&options).unwrap()
    );
    assert_eq!(first[0].detect(&options).unwrap(), Some(FormatTag::Xml));
}
