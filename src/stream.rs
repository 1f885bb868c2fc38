use crate::codec::Transcoder;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tokio_util::codec::Decoder;
use tokio_util::io::StreamReader;

/// Notification emitted by [`ByteStreamAdapter::pump`].
#[derive(Debug)]
pub enum StreamEvent {
    Data(String),
    End,
    Error(io::Error),
}

#[derive(Debug)]
struct Shared {
    paused: watch::Sender<bool>,
    stopped: AtomicBool,
}

/// Cloneable pause/resume/stop handle for one adapter.
#[derive(Debug, Clone)]
pub struct StreamControl {
    shared: Arc<Shared>,
}

impl StreamControl {
    fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                paused,
                stopped: AtomicBool::new(false),
            }),
        }
    }

    /// Takes effect before the next chunk is read.
    pub fn pause(&self) {
        self.shared.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.shared.paused.send_replace(false);
    }

    /// Tear the adapter down; no chunk is delivered after this returns.
    pub fn stop(&self) {
        self.shared.stopped.store(true, Ordering::SeqCst);
        // wake a reader parked on the pause gate
        self.shared.paused.send_modify(|_| {});
    }

    pub fn is_paused(&self) -> bool {
        *self.shared.paused.borrow()
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.shared.paused.subscribe()
    }
}

/// Reads a byte source in fixed-size chunks and decodes each one to text.
///
/// Pull with [`next_chunk`](Self::next_chunk), or drive listener-style with
/// [`pump`](Self::pump). Either way every read waits on the pause gate first
/// and re-checks the stop flag after every await.
pub struct ByteStreamAdapter<R> {
    reader: R,
    transcoder: Transcoder,
    scratch: Vec<u8>,
    gate: watch::Receiver<bool>,
    control: StreamControl,
    finished: bool,
}

impl<R> ByteStreamAdapter<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(reader: R, encoding: &'static encoding_rs::Encoding, chunk_size: usize) -> Self {
        let control = StreamControl::new();
        Self {
            reader,
            transcoder: Transcoder::new(encoding),
            scratch: vec![0; chunk_size.max(1)],
            gate: control.subscribe(),
            control,
            finished: false,
        }
    }

    pub fn control(&self) -> StreamControl {
        self.control.clone()
    }

    /// Next decoded chunk; `None` once the source is exhausted, failed or stopped.
    ///
    /// Chunks that decode to nothing (a lone BOM, the first half of a
    /// multi-byte character) are folded into the following read.
    pub async fn next_chunk(&mut self) -> Option<io::Result<String>> {
        loop {
            if self.finished || !self.wait_for_resume().await {
                self.finished = true;
                return None;
            }

            let read = self.reader.read(&mut self.scratch).await;
            if self.control.is_stopped() {
                self.finished = true;
                return None;
            }

            let decoded = match read {
                Ok(0) => {
                    self.finished = true;
                    let mut rest = BytesMut::new();
                    self.transcoder.decode_eof(&mut rest)
                }
                Ok(n) => {
                    let mut src = BytesMut::from(&self.scratch[..n]);
                    self.transcoder.decode(&mut src)
                }
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            };

            match decoded {
                Ok(Some(text)) => return Some(into_string(text)),
                Ok(None) if self.finished => return None,
                Ok(None) => continue,
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
        }
    }

    /// Push every chunk to `listener` until end, error or stop.
    ///
    /// `End` is only emitted on natural completion and `Error` at most once;
    /// nothing follows either of them, and nothing at all is emitted after
    /// [`StreamControl::stop`].
    pub async fn pump<F>(mut self, mut listener: F)
    where
        F: FnMut(StreamEvent),
    {
        loop {
            match self.next_chunk().await {
                Some(Ok(text)) => listener(StreamEvent::Data(text)),
                Some(Err(err)) => {
                    listener(StreamEvent::Error(err));
                    return;
                }
                None => {
                    if !self.control.is_stopped() {
                        listener(StreamEvent::End);
                    }
                    return;
                }
            }
        }
    }

    pub fn into_stream(self) -> BoxStream<'static, io::Result<String>> {
        stream::unfold(self, |mut adapter| async move {
            adapter.next_chunk().await.map(|chunk| (chunk, adapter))
        })
        .boxed()
    }

    /// Decoded text as an `AsyncRead`, ready for the tokenizer.
    pub fn into_async_read(self) -> impl AsyncRead + Unpin + Send + 'static {
        text_reader(self.into_stream())
    }

    async fn wait_for_resume(&mut self) -> bool {
        loop {
            if self.control.is_stopped() {
                return false;
            }
            if !*self.gate.borrow_and_update() {
                return true;
            }
            if self.gate.changed().await.is_err() {
                return false;
            }
        }
    }
}

/// Wrap a stream of decoded text chunks as an `AsyncRead`.
pub(crate) fn text_reader<S>(chunks: S) -> impl AsyncRead + Unpin + Send + 'static
where
    S: Stream<Item = io::Result<String>> + Unpin + Send + 'static,
{
    StreamReader::new(chunks.map_ok(Bytes::from))
}

fn into_string(text: BytesMut) -> io::Result<String> {
    String::from_utf8(text.to_vec()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
