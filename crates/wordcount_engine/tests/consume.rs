use std::convert::Infallible;
use std::sync::Once;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{stream, StreamExt};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use wordcount_core::{map_words, FrequencyMap};
use wordcount_engine::{
    consume, string_source, with_cancellation, ByteStream, ConsumeError, FailureKind, SourceError,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(counter_logging::initialize_for_tests);
}

fn chunked(chunks: &[&str]) -> ByteStream {
    let items: Vec<Result<Bytes, SourceError>> = chunks
        .iter()
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk.as_bytes())))
        .collect();
    stream::iter(items).boxed()
}

async fn collect_segments(source: ByteStream) -> Vec<String> {
    let mut segments = Vec::new();
    consume(source, |segment| {
        segments.push(segment);
        async { Ok::<(), Infallible>(()) }
    })
    .await
    .expect("consume ok");
    segments
}

#[tokio::test]
async fn consumes_every_chunk_and_flushes_carry() {
    init_logging();
    let chunk = "this is a string to be processed";
    let chunks = [chunk, chunk, chunk];

    let segments = collect_segments(chunked(&chunks)).await;

    assert_eq!(segments.len(), chunks.len() + 1);
    assert_eq!(segments.concat(), chunks.concat());
}

#[tokio::test]
async fn carries_broken_words_into_next_segment() {
    init_logging();
    let chunks = [
        "The words in string are intentionally bro",
        "ken in the middle to make sure ",
        "that the stream is c",
        "onsumed correctly, and",
        " words remain intact.",
    ];

    let segments = collect_segments(chunked(&chunks)).await;

    assert_eq!(
        segments,
        vec![
            "The words in string are intentionally ",
            "broken in the middle to make sure ",
            "that the stream is ",
            "consumed correctly, ",
            "and words remain ",
            "intact.",
        ]
    );
}

#[tokio::test]
async fn multibyte_characters_split_between_chunks_are_decoded_once() {
    init_logging();
    let text = "crème brûlée and café";
    let bytes = text.as_bytes();
    let items: Vec<Result<Bytes, SourceError>> = bytes
        .chunks(3)
        .map(|piece| Ok(Bytes::copy_from_slice(piece)))
        .collect();

    let segments = collect_segments(stream::iter(items).boxed()).await;

    assert_eq!(segments.concat(), text);
}

#[tokio::test]
async fn counts_are_independent_of_chunk_size() {
    init_logging();
    let text = "It was the best of times, it was the worst of times; it was the age \
                of wisdom, it was the age of foolishness...";
    let expected = map_words(text);

    for size in 1..=text.len() {
        let pieces: Vec<&str> = text
            .as_bytes()
            .chunks(size)
            .map(|piece| std::str::from_utf8(piece).unwrap())
            .collect();
        let mut counted = FrequencyMap::new();
        consume(chunked(&pieces), |segment| {
            counted.absorb(&map_words(&segment));
            async { Ok::<(), Infallible>(()) }
        })
        .await
        .unwrap();
        assert_eq!(counted, expected, "chunk size {size}");
    }
}

#[tokio::test]
async fn source_error_stops_without_flush() {
    init_logging();
    let items: Vec<Result<Bytes, SourceError>> = vec![
        Ok(Bytes::from_static(b"first chunk wi")),
        Ok(Bytes::from_static(b"th carry ")),
        Err(SourceError::new(FailureKind::Network, "connection reset")),
        Ok(Bytes::from_static(b"never read")),
    ];

    let mut calls = Vec::new();
    let result = consume(stream::iter(items), |segment| {
        calls.push(segment);
        async { Ok::<(), Infallible>(()) }
    })
    .await;

    assert_eq!(calls, vec!["first chunk ", "with carry "]);
    match result {
        Err(ConsumeError::Source(err)) => {
            assert_eq!(err.kind, FailureKind::Network);
            assert_eq!(err.message, "connection reset");
        }
        other => panic!("expected source error, got {other:?}"),
    }
}

#[tokio::test]
async fn handler_error_stops_reading() {
    init_logging();
    let mut calls = 0;
    let result = consume(chunked(&["one ", "two ", "three "]), |_segment| {
        calls += 1;
        let fail = calls == 2;
        async move {
            if fail {
                Err("handler exploded".to_string())
            } else {
                Ok(())
            }
        }
    })
    .await;

    assert_eq!(calls, 2);
    match result {
        Err(ConsumeError::Handler(message)) => assert_eq!(message, "handler exploded"),
        other => panic!("expected handler error, got {other:?}"),
    }
}

#[tokio::test]
async fn failing_final_flush_is_reported() {
    init_logging();
    let mut calls = 0;
    let result = consume(string_source("a b"), |segment| {
        calls += 1;
        async move {
            if segment == "b" {
                Err("flush failed")
            } else {
                Ok(())
            }
        }
    })
    .await;

    assert_eq!(calls, 2);
    assert!(matches!(result, Err(ConsumeError::Handler("flush failed"))));
}

#[tokio::test]
async fn empty_source_flushes_once() {
    init_logging();
    let segments = collect_segments(chunked(&[])).await;
    assert_eq!(segments, vec![String::new()]);
}

#[tokio::test]
async fn handler_calls_never_overlap() {
    init_logging();
    let in_flight = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let chunks = ["a ", "b ", "c ", "d "];

    let summary = consume(chunked(&chunks), |_segment| {
        let in_flight = in_flight.clone();
        async move {
            let before = in_flight.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            assert_eq!(before, 0);
            tokio::time::sleep(Duration::from_millis(5)).await;
            in_flight.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
            Ok::<(), Infallible>(())
        }
    })
    .await
    .unwrap();

    assert_eq!(summary.chunks, 4);
    assert_eq!(summary.segments, 5);
}

#[tokio::test]
async fn closing_the_source_fails_consumption() {
    init_logging();
    let token = CancellationToken::new();
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Bytes, SourceError>>(4);
    let source = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    })
    .boxed();

    tx.send(Ok(Bytes::from_static(b"partial wor"))).await.unwrap();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let mut calls = Vec::new();
    let result = consume(with_cancellation(source, token), |segment| {
        calls.push(segment);
        async { Ok::<(), Infallible>(()) }
    })
    .await;

    assert_eq!(calls, vec!["partial "]);
    match result {
        Err(ConsumeError::Source(err)) => assert_eq!(err.kind, FailureKind::Cancelled),
        other => panic!("expected cancellation, got {other:?}"),
    }
    drop(tx);
}
