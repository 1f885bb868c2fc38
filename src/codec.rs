use bytes::{Buf, BytesMut};
use std::io;
use tokio_util::codec::Decoder;

/// Incremental text decoder producing UTF-8.
///
/// A multi-byte sequence split across two `decode` calls stays inside the
/// encoding_rs decoder state and is emitted once the rest arrives. A leading
/// byte-order mark for the configured encoding is dropped once, at stream start.
pub struct Transcoder {
    decoder: encoding_rs::Decoder,
}

impl Transcoder {
    pub fn new(encoding: &'static encoding_rs::Encoding) -> Self {
        Self {
            decoder: encoding.new_decoder_with_bom_removal(),
        }
    }

    fn transcode(&mut self, src: &mut BytesMut, last: bool) -> Option<BytesMut> {
        let mut out = vec![
            0;
            self.decoder
                .max_utf8_buffer_length(src.len())
                .unwrap_or_else(|| src.len() * 3 + 4)
        ];

        let (_result, bytes_read, bytes_written, _had_errors) =
            self.decoder.decode_to_utf8(src, &mut out, last);

        src.advance(bytes_read);
        if bytes_written == 0 {
            return None;
        }
        out.truncate(bytes_written);
        Some(BytesMut::from(&out[..]))
    }
}

impl Decoder for Transcoder {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        Ok(self.transcode(src, false))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let out = self.transcode(buf, true);
        buf.clear();
        Ok(out)
    }
}
