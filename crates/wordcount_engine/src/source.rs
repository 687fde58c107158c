use std::path::Path;

use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use crate::{FailureKind, SourceError};

/// A chunked input: bytes in arrival order, ending either cleanly or with an error.
pub type ByteStream = BoxStream<'static, Result<Bytes, SourceError>>;

/// A complete in-memory string delivered as a single chunk.
pub fn string_source(text: impl Into<String>) -> ByteStream {
    let chunk = Bytes::from(text.into());
    stream::iter(std::iter::once(Ok(chunk))).boxed()
}

/// Opens `path` and reads it in chunks of at most `chunk_size` bytes.
pub async fn file_source(path: &Path, chunk_size: usize) -> Result<ByteStream, SourceError> {
    let file = tokio::fs::File::open(path).await.map_err(SourceError::io)?;
    let chunks = ReaderStream::with_capacity(file, chunk_size.max(1))
        .map(|chunk| chunk.map_err(SourceError::io));
    Ok(chunks.boxed())
}

/// Ends `source` with a `Cancelled` error as soon as `token` is cancelled.
///
/// The wrapped source is dropped at that point, so closing it is how callers
/// abort a consumption that is in progress.
pub fn with_cancellation(source: ByteStream, token: CancellationToken) -> ByteStream {
    stream::unfold(Some((source, token)), |state| async move {
        let Some((mut source, token)) = state else {
            return None;
        };
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                drop(source);
                let err = SourceError::new(FailureKind::Cancelled, "source closed by caller");
                Some((Err(err), None))
            }
            item = source.next() => item.map(|item| (item, Some((source, token)))),
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn string_source_is_one_chunk() {
        let chunks: Vec<_> = string_source("hello world").collect().await;
        assert_eq!(chunks, vec![Ok(Bytes::from_static(b"hello world"))]);
    }

    #[tokio::test]
    async fn missing_file_fails_to_open() {
        let err = file_source(Path::new("/definitely/not/here.txt"), 16)
            .await
            .err()
            .expect("open should fail");
        assert_eq!(err.kind, FailureKind::Io);
    }

    #[tokio::test]
    async fn cancelled_token_ends_stream_with_error() {
        let token = CancellationToken::new();
        token.cancel();
        let chunks: Vec<_> = with_cancellation(string_source("never read"), token)
            .collect()
            .await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap_err().kind, FailureKind::Cancelled);
    }
}
