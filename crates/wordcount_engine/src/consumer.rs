//! Boundary-safe consumption of chunked text streams.
//!
//! Transport chunks can end in the middle of a word. The consumer holds back the
//! text after the last whitespace of every chunk and prepends it to the next
//! one, so each segment handed to the handler only contains whole words.

use std::future::Future;
use std::pin::pin;

use bytes::Bytes;
use counter_logging::{engine_debug, engine_trace, engine_warn};
use encoding_rs::{Decoder, Encoding, UTF_8};
use futures_util::{Stream, StreamExt};
use wordcount_core::Carry;

use crate::SourceError;

/// Lifecycle of one [`consume`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeState {
    Idle,
    Reading,
    Flushing,
    Failed,
    Done,
}

/// Why a consumption stopped early.
#[derive(Debug, thiserror::Error)]
pub enum ConsumeError<E> {
    #[error("source failed: {0}")]
    Source(#[source] SourceError),
    #[error("segment handler failed: {0}")]
    Handler(#[source] E),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsumeSummary {
    pub chunks: usize,
    pub bytes: u64,
    pub segments: usize,
}

/// Reads `source` to the end, calling `handle` once per chunk plus once for the
/// final carry.
///
/// Calls happen in arrival order and each one is awaited before the next chunk
/// is read. A failing handler or source stops the consumption immediately: the
/// source is dropped, no final flush happens and the error is returned.
///
/// Bytes are decoded as UTF-8; see [`consume_with_encoding`] for other charsets.
pub async fn consume<S, F, Fut, E>(source: S, handle: F) -> Result<ConsumeSummary, ConsumeError<E>>
where
    S: Stream<Item = Result<Bytes, SourceError>>,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    consume_with_encoding(source, UTF_8, handle).await
}

/// Like [`consume`], decoding the bytes with `encoding`.
///
/// A byte order mark at the start of the stream overrides `encoding`.
pub async fn consume_with_encoding<S, F, Fut, E>(
    source: S,
    encoding: &'static Encoding,
    mut handle: F,
) -> Result<ConsumeSummary, ConsumeError<E>>
where
    S: Stream<Item = Result<Bytes, SourceError>>,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let mut source = pin!(source);
    let mut state = Tracker::new();
    let mut decoder = ChunkDecoder::new(encoding);
    engine_trace!("consume: decoding as {}", encoding.name());
    let mut carry = Carry::new();
    let mut summary = ConsumeSummary::default();

    state.enter(ConsumeState::Reading);
    while let Some(item) = source.next().await {
        let chunk = match item {
            Ok(chunk) => chunk,
            Err(err) => {
                engine_warn!("Source failed after {} chunks: {}", summary.chunks, err);
                state.enter(ConsumeState::Failed);
                return Err(ConsumeError::Source(err));
            }
        };
        summary.chunks += 1;
        summary.bytes += chunk.len() as u64;

        let text = decoder.decode(&chunk, false);
        let segment = carry.push(&text);
        engine_trace!(
            "Chunk {} ({} bytes) -> segment of {} bytes, carrying {} bytes",
            summary.chunks,
            chunk.len(),
            segment.len(),
            carry.pending().len()
        );

        summary.segments += 1;
        if let Err(err) = handle(segment).await {
            state.enter(ConsumeState::Failed);
            return Err(ConsumeError::Handler(err));
        }
    }

    state.enter(ConsumeState::Flushing);
    let mut rest = carry.finish();
    rest.push_str(&decoder.decode(&[], true));
    summary.segments += 1;
    if let Err(err) = handle(rest).await {
        state.enter(ConsumeState::Failed);
        return Err(ConsumeError::Handler(err));
    }

    state.enter(ConsumeState::Done);
    engine_debug!(
        "Stream fully consumed: {} chunks, {} bytes, {} segments",
        summary.chunks,
        summary.bytes,
        summary.segments
    );
    Ok(summary)
}

struct Tracker {
    current: ConsumeState,
}

impl Tracker {
    fn new() -> Self {
        Self {
            current: ConsumeState::Idle,
        }
    }

    fn enter(&mut self, next: ConsumeState) {
        engine_trace!("consume: {:?} -> {:?}", self.current, next);
        self.current = next;
    }
}

/// Incremental decoding; a character split across chunks comes out whole.
struct ChunkDecoder {
    decoder: Decoder,
}

impl ChunkDecoder {
    fn new(encoding: &'static Encoding) -> Self {
        Self {
            decoder: encoding.new_decoder(),
        }
    }

    fn decode(&mut self, bytes: &[u8], last: bool) -> String {
        let capacity = self
            .decoder
            .max_utf8_buffer_length(bytes.len())
            .unwrap_or(bytes.len() * 3 + 16);
        let mut text = String::with_capacity(capacity);
        // Invalid sequences become U+FFFD, which the tokenizer treats as a separator.
        let _ = self.decoder.decode_to_string(bytes, &mut text, last);
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_joins_split_characters() {
        let bytes = "naïve".as_bytes();
        let mut decoder = ChunkDecoder::new(UTF_8);
        let first = decoder.decode(&bytes[..3], false);
        let second = decoder.decode(&bytes[3..], false);
        assert_eq!(first, "na");
        assert_eq!(second, "ïve");
        assert_eq!(decoder.decode(&[], true), "");
    }

    #[test]
    fn decoder_replaces_truncated_tail() {
        let mut decoder = ChunkDecoder::new(UTF_8);
        assert_eq!(decoder.decode(&[b'a', 0xC3], false), "a");
        assert_eq!(decoder.decode(&[], true), "\u{FFFD}");
    }

    #[test]
    fn decoder_handles_utf16_split_between_code_units() {
        let bytes: Vec<u8> = "hi ü".encode_utf16().flat_map(u16::to_le_bytes).collect();
        let mut decoder = ChunkDecoder::new(encoding_rs::UTF_16LE);
        let first = decoder.decode(&bytes[..3], false);
        let second = decoder.decode(&bytes[3..], false);
        assert_eq!(first, "h");
        assert_eq!(second, "i ü");
        assert_eq!(decoder.decode(&[], true), "");
    }

    #[test]
    fn decoder_strips_byte_order_mark() {
        let mut decoder = ChunkDecoder::new(UTF_8);
        assert_eq!(decoder.decode(b"\xEF\xBB\xBFword", true), "word");
    }
}
