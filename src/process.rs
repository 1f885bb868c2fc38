use crate::assignment::FieldAssignmentMap;
use crate::io::SharedFile;
use crate::stream::ByteStreamAdapter;
use crate::tokenizer::start_rows;
use crate::{CsvResult, ImportConfig, RawRow};
use std::collections::BTreeMap;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, warn};

/// One projected row: assigned field name -> cell text.
///
/// Unassigned fields are absent; an assigned column past the end of a short
/// row yields an empty string.
pub type ImportRecord = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchInfo {
    /// Position of the batch's first record among all delivered records
    /// (header excluded).
    pub start_index: usize,
}

/// Totals for a completed full pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub row_count: usize,
    pub batch_count: usize,
    /// Batches whose callback returned an error or panicked. The pass carries
    /// on past them.
    pub failed_batch_count: usize,
}

/// Stream the whole of `file` through `on_batch`.
///
/// Rows are tokenized in chunks of roughly `chunk_size` bytes. For each chunk
/// the stream is paused, `on_progress` gets the chunk's row count, and
/// `on_batch` gets the projected records if there are any. Reading resumes only
/// after the returned future settles, and never before yielding to the runtime
/// once. A failing or panicking callback is logged and counted, not
/// propagated; only source or tokenizer errors end the pass early.
pub async fn process_file<P, B, Fut, E>(
    file: SharedFile,
    config: &ImportConfig,
    has_headers: bool,
    assignments: &FieldAssignmentMap,
    mut on_progress: P,
    mut on_batch: B,
) -> CsvResult<ImportSummary>
where
    P: FnMut(usize),
    B: FnMut(Vec<ImportRecord>, BatchInfo) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: fmt::Display,
{
    let chunk_size = config.full_chunk_size();
    let mut summary = ImportSummary::default();
    debug!(file = file.name(), chunk_size, has_headers, "starting full pass");

    let raw = file.open().await?;
    let adapter = ByteStreamAdapter::new(raw, config.encoding, chunk_size);
    let control = adapter.control();

    // Warnings were already surfaced by the preview pass.
    let Some((_, mut rows)) = start_rows(adapter, config).await? else {
        info!(file = file.name(), "nothing to import");
        return Ok(summary);
    };

    let mut skip_line = has_headers;
    let mut chunk_start = 0u64;
    let mut pending: Vec<RawRow> = Vec::new();

    loop {
        let row = rows.next_row().await?;
        let done = row.is_none();
        if let Some(row) = row {
            pending.push(row);
        }

        let chunk_full = rows.byte_offset().saturating_sub(chunk_start) >= chunk_size as u64;
        if !(done || chunk_full) {
            continue;
        }
        if pending.is_empty() {
            if done {
                break;
            }
            continue;
        }

        // The tokenizer is not polled again until the batch settles; the gate
        // only makes that state visible on the adapter's control handle.
        control.pause();
        chunk_start = rows.byte_offset();
        let mut chunk = std::mem::take(&mut pending);
        if skip_line {
            skip_line = false;
            chunk.remove(0);
        }

        let records: Vec<ImportRecord> =
            chunk.iter().map(|raw| project_row(raw, assignments)).collect();
        let count = records.len();
        on_progress(count);

        if count > 0 {
            let info = BatchInfo {
                start_index: summary.row_count,
            };
            summary.row_count += count;
            summary.batch_count += 1;
            debug!(start_index = info.start_index, rows = count, "delivering batch");

            // TODO: collect callback errors into the summary instead of only counting them
            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| on_batch(records, info))) {
                Ok(delivery) => AssertUnwindSafe(delivery).catch_unwind().await,
                Err(payload) => Err(payload),
            };
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    summary.failed_batch_count += 1;
                    warn!(start_index = info.start_index, error = %err, "batch callback failed");
                }
                Err(payload) => {
                    summary.failed_batch_count += 1;
                    let message = panic_message(payload.as_ref());
                    warn!(start_index = info.start_index, panic = message, "batch callback panicked");
                }
            }
        }

        tokio::task::yield_now().await;
        control.resume();

        if done {
            break;
        }
    }

    info!(
        file = file.name(),
        rows = summary.row_count,
        batches = summary.batch_count,
        failed_batches = summary.failed_batch_count,
        "full pass complete"
    );
    Ok(summary)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

fn project_row(raw: &[String], assignments: &FieldAssignmentMap) -> ImportRecord {
    assignments
        .iter()
        .map(|(field, &idx)| (field.clone(), raw.get(idx).cloned().unwrap_or_default()))
        .collect()
}
