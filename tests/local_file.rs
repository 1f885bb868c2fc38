use async_compression::tokio::write::GzipEncoder;
use csv_importer::{
    generate_preview_columns, parse_preview, process_file, Field, FieldAssignmentMap,
    ImportConfig, LocalFile,
};
use std::convert::Infallible;
use std::fs::File;
use std::io::Write;
use tokio::io::AsyncWriteExt;

#[tokio::test]
async fn imports_gzip_file_from_disk() -> anyhow::Result<()> {
    // Create small CSV
    let dir = tempfile::tempdir()?;
    let mut csv = String::from("sku,col1\n");
    for i in 0..100_000 {
        csv.push_str(&format!("SKU{i:06},{i}\n"));
    }

    let gz_path = dir.path().join("tiny.csv.gz");
    let mut encoder = GzipEncoder::new(tokio::fs::File::create(&gz_path).await?);
    encoder.write_all(csv.as_bytes()).await?;
    encoder.shutdown().await?;

    let file = LocalFile::shared(&gz_path);
    let config = ImportConfig::default().with_chunk_size(64 * 1024);
    let preview = parse_preview(file.clone(), &config).await?;
    assert_eq!(preview.first_rows[1], vec!["SKU000000", "0"]);

    let fields = [Field::new("sku", "SKU")];
    let columns = generate_preview_columns(&preview.first_rows, true);
    let assignments = FieldAssignmentMap::new().auto_match(&fields, &columns);
    assert_eq!(assignments.get("sku"), Some(0));

    let mut last = None;
    let summary = process_file(
        file,
        &config,
        true,
        &assignments,
        |_| {},
        |records, _| {
            last = records.last().map(|r| r["sku"].clone());
            async { Ok::<(), Infallible>(()) }
        },
    )
    .await?;

    assert_eq!(summary.row_count, 100_000);
    assert!(summary.batch_count > 1);
    assert_eq!(last.as_deref(), Some("SKU099999"));
    Ok(())
}

#[tokio::test]
async fn reads_plain_file_from_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("plain.csv");
    let mut f = File::create(&path)?;
    writeln!(f, "a;b")?;
    writeln!(f, "1;2")?;

    let preview = parse_preview(LocalFile::shared(&path), &ImportConfig::default()).await?;
    assert_eq!(preview.file.name(), "plain.csv");
    assert_eq!(preview.first_rows[1], vec!["1", "2"]);
    Ok(())
}
