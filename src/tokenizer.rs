use crate::config::{ImportConfig, Newline, PREVIEW_CHUNK_SIZE};
use crate::io::BoxedReader;
use crate::stream::{text_reader, ByteStreamAdapter};
use crate::{CsvResult, RawRow};
use csv_async::{AsyncReader, AsyncReaderBuilder, StringRecord, Terminator};
use futures::stream::{self, StreamExt};
use std::fmt;
use tokio::io::AsyncRead;
use tracing::debug;

const GUESS_SAMPLE_LINES: usize = 10;
const GUESS_SAMPLE_BYTES: usize = PREVIEW_CHUNK_SIZE;
const FALLBACK_DELIMITER: u8 = b',';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    TooFewFields,
    TooManyFields,
    UndetectableDelimiter,
}

/// Non-fatal tokenizer diagnostic; parsing carries on past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub kind: WarningKind,
    pub message: String,
    /// 0-based row the warning refers to, if any.
    pub row: Option<usize>,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "row {row}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Hook the tokenizer up to `adapter`.
///
/// When the delimiter has to be guessed, leading chunks are pulled until the
/// sample spans enough lines (or bytes) and then replayed ahead of the rest of
/// the stream. Returns the first decoded chunk alongside the row reader, or
/// `None` if the source decodes to nothing.
pub(crate) async fn start_rows<R>(
    mut adapter: ByteStreamAdapter<R>,
    config: &ImportConfig,
) -> CsvResult<Option<(String, RowReader<BoxedReader>)>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut leading: Vec<String> = Vec::new();
    let mut sample = String::new();
    while leading.is_empty() || needs_more_sample(config, &sample) {
        match adapter.next_chunk().await {
            Some(chunk) => {
                let chunk = chunk?;
                sample.push_str(&chunk);
                leading.push(chunk);
            }
            None => break,
        }
    }
    let Some(first_chunk) = leading.first().cloned() else {
        return Ok(None);
    };

    let (delimiter, warning) = resolve_delimiter(config, &sample);
    let chunks = stream::iter(leading.into_iter().map(Ok)).chain(adapter.into_stream());
    let reader: BoxedReader = Box::new(text_reader(chunks));
    let rows = RowReader::new(reader, config, delimiter).with_warning(warning);
    Ok(Some((first_chunk, rows)))
}

fn needs_more_sample(config: &ImportConfig, sample: &str) -> bool {
    config.delimiter.is_none()
        && sample.len() < GUESS_SAMPLE_BYTES
        && sample.matches('\n').count() < GUESS_SAMPLE_LINES
}

/// Pick the delimiter: configured one, else a guess from `sample`.
pub(crate) fn resolve_delimiter(config: &ImportConfig, sample: &str) -> (u8, Option<ParseWarning>) {
    if let Some(delimiter) = config.delimiter {
        return (delimiter, None);
    }
    match guess_delimiter(sample, &config.delimiters_to_guess, config.quote, config.comment) {
        Some(delimiter) => {
            let shown = (delimiter as char).escape_default().to_string();
            debug!(delimiter = %shown, "guessed delimiter");
            (delimiter, None)
        }
        None => (
            FALLBACK_DELIMITER,
            Some(ParseWarning {
                kind: WarningKind::UndetectableDelimiter,
                message: "unable to auto-detect delimiting character; defaulted to ','"
                    .to_string(),
                row: None,
            }),
        ),
    }
}

/// Best candidate by field-count consistency across the first lines of `sample`.
///
/// A candidate must split lines into two or more fields on average.
pub(crate) fn guess_delimiter(
    sample: &str,
    candidates: &[u8],
    quote: u8,
    comment: Option<u8>,
) -> Option<u8> {
    let lines: Vec<&str> = sample
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| comment.map_or(true, |c| !line.as_bytes().starts_with(&[c])))
        .take(GUESS_SAMPLE_LINES)
        .collect();
    if lines.is_empty() {
        return None;
    }

    let mut best: Option<(u8, usize, f32)> = None;
    for &delimiter in candidates {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_fields(line.as_bytes(), delimiter, quote))
            .collect();
        let avg = counts.iter().sum::<usize>() as f32 / counts.len() as f32;
        if avg <= 1.99 {
            continue;
        }
        let delta: usize = counts.windows(2).map(|w| w[0].abs_diff(w[1])).sum();

        let better = match best {
            None => true,
            Some((_, best_delta, best_avg)) => {
                delta < best_delta || (delta == best_delta && avg > best_avg)
            }
        };
        if better {
            best = Some((delimiter, delta, avg));
        }
    }
    best.map(|(delimiter, _, _)| delimiter)
}

fn count_fields(line: &[u8], delimiter: u8, quote: u8) -> usize {
    let mut in_quotes = false;
    let mut fields = 1;
    for &b in line {
        if b == quote {
            in_quotes = !in_quotes;
        } else if b == delimiter && !in_quotes {
            fields += 1;
        }
    }
    fields
}

/// Configure csv-async from the passthrough options.
pub(crate) fn build_tokenizer<R>(reader: R, config: &ImportConfig, delimiter: u8) -> AsyncReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    let terminator = match config.newline {
        Newline::Auto | Newline::Crlf => Terminator::CRLF,
        Newline::Lf => Terminator::Any(b'\n'),
        Newline::Cr => Terminator::Any(b'\r'),
    };
    let escape = config.escape.filter(|&e| e != config.quote);

    AsyncReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .quote(config.quote)
        .escape(escape)
        .double_quote(escape.is_none())
        .comment(config.comment)
        .terminator(terminator)
        .create_reader(reader)
}

/// Row-at-a-time view over the tokenizer with field-count diagnostics.
pub(crate) struct RowReader<R> {
    inner: AsyncReader<R>,
    record: StringRecord,
    skip_empty: bool,
    expected_width: Option<usize>,
    rows_read: usize,
    warning: Option<ParseWarning>,
}

impl<R> RowReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub(crate) fn new(reader: R, config: &ImportConfig, delimiter: u8) -> Self {
        Self {
            inner: build_tokenizer(reader, config, delimiter),
            record: StringRecord::new(),
            skip_empty: config.skip_empty_lines,
            expected_width: None,
            rows_read: 0,
            warning: None,
        }
    }

    /// Seed the diagnostics slot with a warning raised before tokenizing.
    pub(crate) fn with_warning(mut self, warning: Option<ParseWarning>) -> Self {
        self.warning = warning;
        self
    }

    pub(crate) async fn next_row(&mut self) -> CsvResult<Option<RawRow>> {
        loop {
            if !self.inner.read_record(&mut self.record).await? {
                return Ok(None);
            }
            if self.skip_empty && self.record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }

            let width = self.record.len();
            let row = self.rows_read;
            self.rows_read += 1;
            match self.expected_width {
                None => self.expected_width = Some(width),
                Some(expected) if expected != width => self.note_width(row, expected, width),
                Some(_) => {}
            }

            return Ok(Some(self.record.iter().map(str::to_string).collect()));
        }
    }

    /// Bytes of decoded text the tokenizer has consumed so far.
    pub(crate) fn byte_offset(&self) -> u64 {
        self.inner.position().byte()
    }

    /// First diagnostic seen; later ones are dropped.
    pub(crate) fn warning(&self) -> Option<&ParseWarning> {
        self.warning.as_ref()
    }

    fn note_width(&mut self, row: usize, expected: usize, found: usize) {
        if self.warning.is_some() {
            return;
        }
        let (kind, adjective) = if found < expected {
            (WarningKind::TooFewFields, "few")
        } else {
            (WarningKind::TooManyFields, "many")
        };
        self.warning = Some(ParseWarning {
            kind,
            message: format!("too {adjective} fields: expected {expected} fields but parsed {found}"),
            row: Some(row),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_common_delimiters() {
        let cands = [b',', b'\t', b'|', b';'];
        assert_eq!(guess_delimiter("a,b,c\nd,e,f", &cands, b'"', None), Some(b','));
        assert_eq!(guess_delimiter("a;b;c\nd;e;f", &cands, b'"', None), Some(b';'));
        assert_eq!(guess_delimiter("a\tb\n1\t2\n", &cands, b'"', None), Some(b'\t'));
    }

    #[test]
    fn prefers_consistent_counts_and_respects_quotes() {
        let cands = [b',', b';'];
        let sample = "\"x,y\";b\n\"1,2\";c\n";
        assert_eq!(guess_delimiter(sample, &cands, b'"', None), Some(b';'));
    }

    #[test]
    fn single_column_is_undetectable() {
        let config = ImportConfig::default();
        let (delimiter, warning) = resolve_delimiter(&config, "name\nalice\nbob\n");
        assert_eq!(delimiter, b',');
        assert_eq!(warning.map(|w| w.kind), Some(WarningKind::UndetectableDelimiter));
    }

    #[test]
    fn configured_delimiter_wins() {
        let config = ImportConfig::default().with_delimiter(b'|');
        assert_eq!(resolve_delimiter(&config, "a,b\n"), (b'|', None));
    }
}
