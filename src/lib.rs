//! Streaming CSV import core.
//!
//! - Preview pass: bounded read of the first rows, used to build the column model.
//! - Assignment: map caller-declared fields to source columns (manual or by header).
//! - Full pass: re-read the whole file, project rows into records and hand them
//!   to an async callback in batches, pausing the stream until each batch settles.
//!
//! Data shape:
//! - `PreviewReport { first_chunk, first_rows, is_single_line, parse_warning }`
//! - `Column { index, code, header, values }`
//! - Streaming records: `ImportRecord` (field name -> cell text)
#![cfg_attr(docsrs, feature(doc_cfg))]
//
mod assignment;
mod codec;
mod columns;
mod config;
mod io;
mod preview;
mod process;
mod session;
mod stream;
mod tokenizer;

pub use crate::assignment::{AssignmentState, Field, FieldAssignmentMap, FieldRegistry};
pub use crate::columns::{generate_column_code, generate_preview_columns, parse_column_code, Column};
pub use crate::config::{
    ImportConfig, Newline, DEFAULT_CHUNK_SIZE, PREVIEW_CHUNK_SIZE, PREVIEW_ROW_COUNT,
};
pub use crate::io::{BoxedReader, FileSource, LocalFile, MemoryFile, SharedFile};
pub use crate::preview::{parse_preview, PreviewFailure, PreviewReport, PreviewResult};
pub use crate::process::{process_file, BatchInfo, ImportRecord, ImportSummary};
pub use crate::session::{ImportPhase, OperationLock, OperationToken, SessionError};
pub use crate::stream::{ByteStreamAdapter, StreamControl, StreamEvent};
pub use crate::tokenizer::{ParseWarning, WarningKind};

use thiserror::Error;

/// One tokenized CSV line.
pub type RawRow = Vec<String>;

/// Error type returned by the parsing passes.
#[derive(Debug, Error)]
pub enum CsvImportError {
    #[error("file is empty")]
    EmptyFile,
    #[error("unknown text encoding: {0}")]
    UnknownEncoding(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv_async::Error),
}

pub type CsvResult<T> = std::result::Result<T, CsvImportError>;
