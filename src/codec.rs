//! Line framing for the text protocol
//!
//! Splits the socket on `\n` and never fails on a bad line: an over-long
//! line comes out as `Line::TooLong` and the rest of it is skipped, and
//! bytes that are not UTF-8 are decoded lossily. Only IO errors end the
//! stream.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder, Encoder};

/// One framed line from a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Text(String),
    /// Line exceeded the length limit and was dropped
    TooLong,
}

/// Newline codec that survives malformed input
#[derive(Debug, Clone)]
pub struct CommandCodec {
    inner: AnyDelimiterCodec,
}

impl CommandCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            inner: AnyDelimiterCodec::new_with_max_length(
                b"\n".to_vec(),
                b"\n".to_vec(),
                max_length,
            ),
        }
    }

    fn frame(
        chunk: Result<Option<Bytes>, AnyDelimiterCodecError>,
    ) -> Result<Option<Line>, AnyDelimiterCodecError> {
        match chunk {
            Ok(Some(chunk)) => Ok(Some(Line::Text(
                String::from_utf8_lossy(&chunk).into_owned(),
            ))),
            Ok(None) => Ok(None),
            // The inner codec skips to the next newline on its next call.
            Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => Ok(Some(Line::TooLong)),
            Err(e) => Err(e),
        }
    }
}

impl Decoder for CommandCodec {
    type Item = Line;
    type Error = AnyDelimiterCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Line>, Self::Error> {
        Self::frame(self.inner.decode(buf))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Line>, Self::Error> {
        Self::frame(self.inner.decode_eof(buf))
    }
}

impl Encoder<String> for CommandCodec {
    type Error = AnyDelimiterCodecError;

    fn encode(&mut self, line: String, buf: &mut BytesMut) -> Result<(), Self::Error> {
        self.inner.encode(line, buf)
    }
}
