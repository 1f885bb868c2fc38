mod common;

use common::{rows, ScriptedFile};
use csv_importer::{
    parse_preview, CsvImportError, ImportConfig, MemoryFile, WarningKind, PREVIEW_ROW_COUNT,
};
use std::io;

#[tokio::test]
async fn pads_short_files_to_row_count() -> anyhow::Result<()> {
    let file = MemoryFile::shared("short.csv", "ColA,ColB\nAAAA,BBBB\n");
    let report = parse_preview(file, &ImportConfig::default()).await?;

    assert_eq!(report.first_rows.len(), PREVIEW_ROW_COUNT);
    assert_eq!(
        &report.first_rows[..2],
        &rows(&[&["ColA", "ColB"], &["AAAA", "BBBB"]])[..]
    );
    assert!(report.first_rows[2..].iter().all(Vec::is_empty));
    assert!(!report.is_single_line);
    assert_eq!(report.first_chunk, "ColA,ColB\nAAAA,BBBB\n");
    assert_eq!(report.parse_warning, None);
    Ok(())
}

#[tokio::test]
async fn honours_configured_row_count() -> anyhow::Result<()> {
    let file = MemoryFile::shared("rows.csv", "a,b\n1,2\n3,4\n5,6\n");
    let config = ImportConfig::default().with_preview_row_count(2);
    let report = parse_preview(file, &config).await?;

    assert_eq!(report.first_rows, rows(&[&["a", "b"], &["1", "2"]]));
    Ok(())
}

#[tokio::test]
async fn single_line_file_is_flagged() -> anyhow::Result<()> {
    let file = MemoryFile::shared("one.csv", "ColA,ColB\n");
    let report = parse_preview(file, &ImportConfig::default()).await?;

    assert!(report.is_single_line);
    assert_eq!(report.first_rows[0], vec!["ColA", "ColB"]);
    Ok(())
}

#[tokio::test]
async fn stops_reading_once_row_cap_is_hit() -> anyhow::Result<()> {
    let mut data = String::from("id,value\n");
    for i in 0..200_000 {
        data.push_str(&format!("{i},value-{i}\n"));
    }
    let total = data.len();
    let file = ScriptedFile::from_bytes("big.csv", data);

    let report = parse_preview(file.shared(), &ImportConfig::default()).await?;

    assert!(!report.is_single_line);
    assert_eq!(report.first_rows[4], vec!["3", "value-3"]);
    assert!(
        file.bytes_served() < 100_000,
        "read {} of {total} bytes",
        file.bytes_served()
    );
    Ok(())
}

#[tokio::test]
async fn empty_file_is_a_distinct_failure() {
    for content in ["", "\n\n", "\u{feff}"] {
        let file = MemoryFile::shared("empty.csv", content);
        let failure = parse_preview(file, &ImportConfig::default())
            .await
            .expect_err("empty file must fail");

        assert!(failure.is_empty_file(), "content {content:?}");
        assert_eq!(failure.file.name(), "empty.csv");
        assert_eq!(failure.to_string(), "could not preview empty.csv: file is empty");
    }
}

#[tokio::test]
async fn read_error_is_tagged_with_file() {
    let file = ScriptedFile::new(
        "broken.csv",
        vec![Err(io::ErrorKind::ConnectionReset)],
    );
    let failure = parse_preview(file.shared(), &ImportConfig::default())
        .await
        .expect_err("read error must fail");

    assert!(!failure.is_empty_file());
    assert_eq!(failure.file.name(), "broken.csv");
    assert!(matches!(failure.source, CsvImportError::Io(ref e) if e.kind() == io::ErrorKind::ConnectionReset));
}

#[tokio::test]
async fn keeps_only_first_warning() -> anyhow::Result<()> {
    let file = MemoryFile::shared("ragged.csv", "a,b\n1\n2,3,4\n");
    let report = parse_preview(file, &ImportConfig::default()).await?;

    let warning = report.parse_warning.expect("warning");
    assert_eq!(warning.kind, WarningKind::TooFewFields);
    assert_eq!(warning.row, Some(1));
    assert_eq!(report.first_rows[1], vec!["1"]);
    assert_eq!(report.first_rows[2], vec!["2", "3", "4"]);
    Ok(())
}

#[tokio::test]
async fn undetectable_delimiter_warns_and_defaults_to_comma() -> anyhow::Result<()> {
    let file = MemoryFile::shared("names.csv", "name\nalice\nbob\n");
    let report = parse_preview(file, &ImportConfig::default()).await?;

    assert_eq!(
        report.parse_warning.map(|w| w.kind),
        Some(WarningKind::UndetectableDelimiter)
    );
    assert_eq!(report.first_rows[1], vec!["alice"]);
    Ok(())
}

#[tokio::test]
async fn guesses_semicolons() -> anyhow::Result<()> {
    let file = MemoryFile::shared("semi.csv", "a;b;c\n1;2;3\n");
    let report = parse_preview(file, &ImportConfig::default()).await?;

    assert_eq!(report.first_rows[1], vec!["1", "2", "3"]);
    assert_eq!(report.parse_warning, None);
    Ok(())
}

#[tokio::test]
async fn strips_utf8_bom_from_first_header() -> anyhow::Result<()> {
    let file = MemoryFile::shared("bom.csv", "\u{feff}ColA,ColB\nAAAA,BBBB\n");
    let report = parse_preview(file, &ImportConfig::default()).await?;

    assert_eq!(report.first_rows[0][0], "ColA");
    assert!(!report.first_chunk.starts_with('\u{feff}'));
    Ok(())
}

#[tokio::test]
async fn decodes_configured_encoding() -> anyhow::Result<()> {
    let file = MemoryFile::shared("latin.csv", &b"name,city\ncaf\xe9,K\xf6ln\n"[..]);
    let config = ImportConfig::default().with_encoding_label("windows-1252")?;
    let report = parse_preview(file, &config).await?;

    assert_eq!(report.first_rows[1], vec!["café", "Köln"]);
    Ok(())
}

#[tokio::test]
async fn trailing_newline_does_not_matter() -> anyhow::Result<()> {
    let with = parse_preview(
        MemoryFile::shared("a.csv", "ColA,ColB\nAAAA,BBBB\n"),
        &ImportConfig::default(),
    )
    .await?;
    let without = parse_preview(
        MemoryFile::shared("b.csv", "ColA,ColB\nAAAA,BBBB"),
        &ImportConfig::default(),
    )
    .await?;

    assert_eq!(with.first_rows, without.first_rows);
    assert_eq!(with.is_single_line, without.is_single_line);
    Ok(())
}

#[tokio::test]
async fn passes_tokenizer_options_through() -> anyhow::Result<()> {
    let content = "# exported\n'a'|'b'\n'x|y'|z\n";
    let config = ImportConfig::default()
        .with_delimiter(b'|')
        .with_quote(b'\'')
        .with_comment(b'#');
    let report = parse_preview(MemoryFile::shared("opts.csv", content), &config).await?;

    assert_eq!(report.first_rows[0], vec!["a", "b"]);
    assert_eq!(report.first_rows[1], vec!["x|y", "z"]);
    Ok(())
}
