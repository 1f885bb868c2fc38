use clap::{Arg, ArgAction, Command};
use crc32fast::Hasher as Crc32;
use csv_importer::{
    generate_preview_columns, parse_preview, process_file, Field, FieldRegistry, ImportConfig,
    LocalFile,
};
use std::convert::Infallible;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// `name`, `name:Label` or `name:Label?` (trailing `?` marks it optional).
fn parse_field(arg: &str) -> Field {
    let (arg, optional) = match arg.strip_suffix('?') {
        Some(rest) => (rest, true),
        None => (arg, false),
    };
    let (name, label) = arg.split_once(':').unwrap_or((arg, arg));
    let field = Field::new(name, label);
    if optional {
        field.optional()
    } else {
        field
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let matches = Command::new("bench")
        .about("Preview, auto-match and stream a CSV file through the import pipeline")
        .arg(Arg::new("path").long("path").value_parser(clap::value_parser!(PathBuf)).required(true))
        .arg(Arg::new("field").long("field").help("Target field: name[:Label][?]").action(ArgAction::Append).required(true))
        .arg(Arg::new("no-headers").long("no-headers").help("Treat the first row as data").action(ArgAction::SetTrue))
        .arg(Arg::new("delimiter").long("delimiter").help("Field delimiter (guessed when omitted)"))
        .arg(Arg::new("encoding").long("encoding").help("Text encoding label").default_value("utf-8"))
        .arg(Arg::new("chunk-size").long("chunk-size").help("Bytes per chunk").value_parser(clap::value_parser!(usize)))
        .arg(Arg::new("verify").long("verify").help("CRC32 over every delivered record").action(ArgAction::SetTrue))
        .get_matches();

    let path = matches.get_one::<PathBuf>("path").expect("required by clap");
    let fields: FieldRegistry = matches
        .get_many::<String>("field")
        .expect("required by clap")
        .map(|s| parse_field(s))
        .collect();

    let mut config = ImportConfig::default()
        .with_encoding_label(matches.get_one::<String>("encoding").expect("defaulted by clap"))?;
    if let Some(d) = matches.get_one::<String>("delimiter") {
        let byte = d.bytes().next().ok_or_else(|| anyhow::anyhow!("empty delimiter"))?;
        config = config.with_delimiter(byte);
    }
    if let Some(&size) = matches.get_one::<usize>("chunk-size") {
        config = config.with_chunk_size(size);
    }

    let file = LocalFile::shared(path);
    let preview = parse_preview(file.clone(), &config).await?;
    if let Some(warning) = &preview.parse_warning {
        info!(%warning, "preview warning");
    }
    let has_headers = !matches.get_flag("no-headers") && !preview.is_single_line;

    let columns = generate_preview_columns(&preview.first_rows, has_headers);
    let assignments = csv_importer::FieldAssignmentMap::new().auto_match(fields.fields(), &columns);
    for field in fields.fields() {
        let code = assignments
            .get(&field.name)
            .map(|idx| columns[idx].code.clone())
            .unwrap_or_else(|| "-".to_string());
        info!(field = %field.name, column = %code, "assignment");
    }
    let missing = assignments.unassigned_required(fields.fields());
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|f| f.name.as_str()).collect();
        anyhow::bail!("no column matched required fields: {}", names.join(", "));
    }

    let verify = matches.get_flag("verify");
    let mut crc = Crc32::new();
    let start = Instant::now();

    let summary = process_file(
        file,
        &config,
        has_headers,
        &assignments,
        |_| {},
        |records, _info| {
            if verify {
                // fields separated by '\x1f' (unit separator), records by '\x1e'
                for record in &records {
                    for (fi, value) in record.values().enumerate() {
                        if fi > 0 {
                            crc.update(&[0x1f]);
                        }
                        crc.update(value.as_bytes());
                    }
                    crc.update(&[0x1e]);
                }
            }
            async { Ok::<(), Infallible>(()) }
        },
    )
    .await?;

    let elapsed = start.elapsed().as_secs_f64();
    let rps = (summary.row_count as f64) / elapsed;
    println!(
        "source={} rows={} batches={}\nelapsed={:.1}s rows/sec={:.0}",
        preview, summary.row_count, summary.batch_count, elapsed, rps
    );
    if verify {
        println!("crc=0x{:08x}", crc.finalize());
    }
    Ok(())
}
