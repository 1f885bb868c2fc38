use crate::{CsvImportError, CsvResult};

/// Number of rows the preview pass keeps (and pads to).
pub const PREVIEW_ROW_COUNT: usize = 5;

/// Bytes read per chunk during the preview pass.
pub const PREVIEW_CHUNK_SIZE: usize = 10_000;

/// Bytes read per chunk during the full pass (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 20;

/// Record terminator handed to the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Newline {
    /// `\r`, `\n` or `\r\n`
    #[default]
    Auto,
    Lf,
    Cr,
    Crlf,
}

/// Parse options shared by the preview and full passes.
///
/// Everything except `encoding` and `chunk_size` is passed straight through
/// to the tokenizer.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Field delimiter; `None` guesses from `delimiters_to_guess`.
    pub delimiter: Option<u8>,
    pub newline: Newline,
    pub quote: u8,
    /// Escape byte for quotes; `None` (or the quote byte) means doubled quotes.
    pub escape: Option<u8>,
    /// Lines starting with this byte are ignored.
    pub comment: Option<u8>,
    /// Drop rows whose fields are all blank.
    pub skip_empty_lines: bool,
    pub delimiters_to_guess: Vec<u8>,
    /// Overrides both the preview and full-pass chunk sizes.
    pub chunk_size: Option<usize>,
    pub encoding: &'static encoding_rs::Encoding,
    pub preview_row_count: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            newline: Newline::Auto,
            quote: b'"',
            escape: None,
            comment: None,
            skip_empty_lines: false,
            delimiters_to_guess: vec![b',', b'\t', b'|', b';'],
            chunk_size: None,
            encoding: encoding_rs::UTF_8,
            preview_row_count: PREVIEW_ROW_COUNT,
        }
    }
}

impl ImportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_newline(mut self, newline: Newline) -> Self {
        self.newline = newline;
        self
    }

    pub fn with_quote(mut self, quote: u8) -> Self {
        self.quote = quote;
        self
    }

    pub fn with_escape(mut self, escape: u8) -> Self {
        self.escape = Some(escape);
        self
    }

    pub fn with_comment(mut self, comment: u8) -> Self {
        self.comment = Some(comment);
        self
    }

    pub fn with_skip_empty_lines(mut self, skip: bool) -> Self {
        self.skip_empty_lines = skip;
        self
    }

    pub fn with_delimiters_to_guess(mut self, candidates: impl Into<Vec<u8>>) -> Self {
        self.delimiters_to_guess = candidates.into();
        self
    }

    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = Some(bytes);
        self
    }

    pub fn with_encoding(mut self, encoding: &'static encoding_rs::Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Resolve a WHATWG encoding label such as `"utf-8"` or `"windows-1252"`.
    pub fn with_encoding_label(self, label: &str) -> CsvResult<Self> {
        let encoding = encoding_rs::Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| CsvImportError::UnknownEncoding(label.to_string()))?;
        Ok(self.with_encoding(encoding))
    }

    pub fn with_preview_row_count(mut self, rows: usize) -> Self {
        self.preview_row_count = rows;
        self
    }

    pub(crate) fn preview_chunk_size(&self) -> usize {
        self.chunk_size.unwrap_or(PREVIEW_CHUNK_SIZE).max(1)
    }

    pub(crate) fn full_chunk_size(&self) -> usize {
        self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE).max(1)
    }
}
