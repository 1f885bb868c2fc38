use csv_importer::{
    generate_preview_columns, parse_preview, process_file, Field, FieldAssignmentMap,
    ImportConfig, MemoryFile,
};
use std::convert::Infallible;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let file = MemoryFile::shared(
        "contacts.csv",
        "Name,Email\nAda,ada@example.com\nGrace,grace@example.com\n",
    );
    let config = ImportConfig::default();

    let preview = parse_preview(file.clone(), &config).await?;
    let columns = generate_preview_columns(&preview.first_rows, true);
    let fields = [Field::new("name", "Name"), Field::new("email", "Email")];
    let assignments = FieldAssignmentMap::new().auto_match(&fields, &columns);

    process_file(
        file,
        &config,
        true,
        &assignments,
        |rows| println!("progress +{rows}"),
        |records, info| async move {
            for (i, record) in records.iter().enumerate() {
                println!("#{} {:?}", info.start_index + i, record);
            }
            Ok::<(), Infallible>(())
        },
    )
    .await?;
    Ok(())
}
