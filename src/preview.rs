use crate::io::SharedFile;
use crate::stream::ByteStreamAdapter;
use crate::tokenizer::{start_rows, ParseWarning};
use crate::{CsvImportError, CsvResult, ImportConfig, RawRow};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// Outcome of a successful preview pass.
#[derive(Debug, Clone)]
pub struct PreviewReport {
    pub file: SharedFile,
    /// Decoded text of the first chunk read.
    pub first_chunk: String,
    /// Exactly `preview_row_count` rows, padded with empty rows.
    pub first_rows: Vec<RawRow>,
    /// The file ended after a single row.
    pub is_single_line: bool,
    pub parse_warning: Option<ParseWarning>,
}

/// A failed preview, tagged with the file so the caller can offer a retry.
#[derive(Debug, Error)]
#[error("could not preview {}: {source}", .file.name())]
pub struct PreviewFailure {
    pub file: SharedFile,
    #[source]
    pub source: CsvImportError,
}

impl PreviewFailure {
    pub fn is_empty_file(&self) -> bool {
        matches!(self.source, CsvImportError::EmptyFile)
    }
}

pub type PreviewResult = Result<PreviewReport, PreviewFailure>;

impl fmt::Display for PreviewReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} preview rows", self.file.name(), self.first_rows.len())?;
        if self.is_single_line {
            f.write_str(", single line")?;
        }
        f.write_str(")")
    }
}

/// Read just enough of `file` to fill the preview rows.
///
/// Reading stops as soon as the row cap is hit; the rest of the file is
/// never touched. Every failure comes back as [`PreviewFailure`].
pub async fn parse_preview(file: SharedFile, config: &ImportConfig) -> PreviewResult {
    match read_preview(&file, config).await {
        Ok(report) => Ok(report),
        Err(source) => Err(PreviewFailure { file, source }),
    }
}

async fn read_preview(file: &SharedFile, config: &ImportConfig) -> CsvResult<PreviewReport> {
    let cap = config.preview_row_count;
    debug!(file = file.name(), cap, "starting preview pass");

    let raw = file.open().await?;
    let adapter = ByteStreamAdapter::new(raw, config.encoding, config.preview_chunk_size());
    let control = adapter.control();

    let Some((first_chunk, mut rows)) = start_rows(adapter, config).await? else {
        return Err(CsvImportError::EmptyFile);
    };

    let mut first_rows: Vec<RawRow> = Vec::with_capacity(cap);
    let mut hit_cap = cap == 0;
    while !hit_cap {
        match rows.next_row().await? {
            Some(row) => {
                first_rows.push(row);
                hit_cap = first_rows.len() >= cap;
            }
            None => break,
        }
    }
    if hit_cap {
        debug!(file = file.name(), cap, "preview row cap reached, aborting read");
        control.pause();
        control.stop();
    }

    if first_rows.is_empty() {
        return Err(CsvImportError::EmptyFile);
    }

    let is_single_line = !hit_cap && first_rows.len() == 1;
    let parse_warning = rows.warning().cloned();
    first_rows.resize_with(cap, Vec::new);

    info!(
        file = file.name(),
        is_single_line,
        warning = parse_warning.is_some(),
        "preview ready"
    );
    Ok(PreviewReport {
        file: file.clone(),
        first_chunk,
        first_rows,
        is_single_line,
        parse_warning,
    })
}
