use async_compression::tokio::bufread::{GzipDecoder, ZstdDecoder};
use bytes::Bytes;
use futures::future::BoxFuture;
use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncRead, BufReader};

pub type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;

/// A user-selected file that can be read from the start any number of times.
///
/// The preview pass and the full pass each call [`FileSource::open`] and own
/// the reader they get back; nothing is shared between passes.
pub trait FileSource: fmt::Debug + Send + Sync {
    /// Display name, also used as an extension hint.
    fn name(&self) -> &str;

    fn open(&self) -> BoxFuture<'_, std::io::Result<BoxedReader>>;
}

pub type SharedFile = Arc<dyn FileSource>;

/// File contents already held in memory (what a picker or drop event hands over).
#[derive(Debug, Clone)]
pub struct MemoryFile {
    name: String,
    data: Bytes,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn shared(name: impl Into<String>, data: impl Into<Bytes>) -> SharedFile {
        Arc::new(Self::new(name, data))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl FileSource for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> BoxFuture<'_, std::io::Result<BoxedReader>> {
        let reader: BoxedReader = Box::new(Cursor::new(self.data.clone()));
        Box::pin(async move { Ok(reader) })
    }
}

/// A local file, transparently decompressed when it ends in `.gz` or `.zst`.
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    name: String,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        Self { path, name }
    }

    pub fn shared(path: impl Into<PathBuf>) -> SharedFile {
        Arc::new(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileSource for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> BoxFuture<'_, std::io::Result<BoxedReader>> {
        Box::pin(async move {
            let file = File::open(&self.path).await?;
            Ok(decompress(file, Compression::from_name(&self.name)))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Compression {
    None,
    Gzip,
    Zstd,
}

impl Compression {
    /// Extension-based guess; there is no content-type to go on for local files.
    pub(crate) fn from_name(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name.ends_with(".gz") {
            Compression::Gzip
        } else if name.ends_with(".zst") {
            Compression::Zstd
        } else {
            Compression::None
        }
    }
}

pub(crate) fn decompress<R>(raw: R, compression: Compression) -> BoxedReader
where
    R: AsyncRead + Unpin + Send + 'static,
{
    // The adapter does its own chunking; keep the read-ahead small.
    let buf = BufReader::with_capacity(64 * 1024, raw);
    match compression {
        Compression::Gzip => Box::new(GzipDecoder::new(buf)),
        Compression::Zstd => Box::new(ZstdDecoder::new(buf)),
        Compression::None => Box::new(buf),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_from_extension() {
        assert_eq!(Compression::from_name("data.csv"), Compression::None);
        assert_eq!(Compression::from_name("data.CSV.GZ"), Compression::Gzip);
        assert_eq!(Compression::from_name("data.csv.zst"), Compression::Zstd);
    }
}
