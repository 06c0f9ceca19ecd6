//! Tests for `host::read_events`.

use std::io::{BufReader, Write};

use injest::host::read_events;

#[test]
fn reads_json_lines_and_skips_blanks() {
    let input = concat!(
        r#"{"specversion":"1.0","id":"a","source":"s","type":"t"}"#,
        "\n\n",
        r#"{"specversion":"1.0","id":"b","source":"s","type":"t","data":{"n":1}}"#,
        "\n",
    );
    let events = read_events(input.as_bytes()).expect("should read");
    let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn invalid_line_is_reported_with_its_number() {
    let input = concat!(
        r#"{"specversion":"1.0","id":"a","source":"s","type":"t"}"#,
        "\n",
        r#"{"specversion":"1.0","id":"","source":"s","type":"t"}"#,
        "\n",
    );
    let err = read_events(input.as_bytes()).expect_err("blank id is invalid");
    assert!(format!("{err:#}").contains("line 2"), "got: {err:#}");
}

#[test]
fn reads_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        r#"{{"specversion":"1.0","id":"f","source":"s","type":"t"}}"#
    )
    .expect("write");

    let reader = BufReader::new(file.reopen().expect("reopen"));
    let events = read_events(reader).expect("should read");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, "f");
}
