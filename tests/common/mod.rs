#![allow(dead_code)]

use csv_importer::{BoxedReader, FileSource, SharedFile};
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

/// Serves a fixed sequence of reads, each capped to what the caller asks for.
struct ScriptedReader {
    parts: VecDeque<Result<Vec<u8>, io::ErrorKind>>,
    served: Arc<AtomicUsize>,
}

impl AsyncRead for ScriptedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.parts.pop_front() {
            None => Poll::Ready(Ok(())),
            Some(Err(kind)) => Poll::Ready(Err(io::Error::new(kind, "scripted failure"))),
            Some(Ok(mut bytes)) => {
                let n = bytes.len().min(buf.remaining());
                let rest = bytes.split_off(n);
                buf.put_slice(&bytes);
                self.served.fetch_add(n, Ordering::SeqCst);
                if !rest.is_empty() {
                    self.parts.push_front(Ok(rest));
                }
                Poll::Ready(Ok(()))
            }
        }
    }
}

/// A file whose every `open` replays the same scripted reads.
#[derive(Debug, Clone)]
pub struct ScriptedFile {
    name: String,
    parts: Vec<Result<Vec<u8>, io::ErrorKind>>,
    served: Arc<AtomicUsize>,
}

impl ScriptedFile {
    pub fn new(name: &str, parts: Vec<Result<Vec<u8>, io::ErrorKind>>) -> Self {
        Self {
            name: name.to_string(),
            parts,
            served: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Whole contents in one buffer; reads are limited only by the caller.
    pub fn from_bytes(name: &str, data: impl Into<Vec<u8>>) -> Self {
        Self::new(name, vec![Ok(data.into())])
    }

    /// Bytes handed out across all opens so far.
    pub fn bytes_served(&self) -> usize {
        self.served.load(Ordering::SeqCst)
    }

    pub fn shared(&self) -> SharedFile {
        Arc::new(self.clone())
    }
}

impl FileSource for ScriptedFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> BoxFuture<'_, io::Result<BoxedReader>> {
        let reader = ScriptedReader {
            parts: self.parts.iter().cloned().collect(),
            served: Arc::clone(&self.served),
        };
        Box::pin(async move { Ok(Box::new(reader) as BoxedReader) })
    }
}

pub fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
    data.iter()
        .map(|r| r.iter().map(|s| s.to_string()).collect())
        .collect()
}
