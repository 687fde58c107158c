use pretty_assertions::assert_eq;
use wordcount_core::{map_words, Carry, FrequencyMap};

fn segments_for(chunks: &[&str]) -> Vec<String> {
    let mut carry = Carry::new();
    let mut segments: Vec<String> = chunks.iter().map(|chunk| carry.push(chunk)).collect();
    segments.push(carry.finish());
    segments
}

fn per_segment_counts(segments: &[String]) -> FrequencyMap {
    let mut total = FrequencyMap::new();
    for segment in segments {
        total.absorb(&map_words(segment));
    }
    total
}

#[test]
fn words_broken_between_chunks_stay_intact() {
    let chunks = [
        "The words in string are intentionally bro",
        "ken in the middle to make sure ",
        "that the stream is c",
        "onsumed correctly, and",
        " words remain intact.",
    ];

    let segments = segments_for(&chunks);

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
    assert_eq!(segments.concat(), chunks.concat());
}

#[test]
fn repeated_chunks_are_reassembled() {
    let chunk = "this is a string to be processed";
    let chunks = [chunk, chunk, chunk];

    let segments = segments_for(&chunks);

    assert_eq!(segments.len(), chunks.len() + 1);
    assert_eq!(segments.concat(), chunks.concat());
    assert_eq!(per_segment_counts(&segments).get("processedthis"), 2);
}

#[test]
fn counts_do_not_depend_on_chunking() {
    let text = "Some text, with punctuation! And a_long_identifier plus\tTABS\nnew lines  \
                and double  spaces. The end";
    let expected = map_words(text);

    // Every split into two and three pieces, on char boundaries.
    let boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).skip(1).collect();
    for (n, &first) in boundaries.iter().enumerate() {
        let two = [&text[..first], &text[first..]];
        let segments = segments_for(&two);
        assert_eq!(segments.concat(), text);
        assert_eq!(per_segment_counts(&segments), expected, "split at {first}");

        for &second in boundaries.iter().skip(n + 1).step_by(7) {
            let three = [&text[..first], &text[first..second], &text[second..]];
            let segments = segments_for(&three);
            assert_eq!(segments.concat(), text);
            assert_eq!(
                per_segment_counts(&segments),
                expected,
                "split at {first} and {second}"
            );
        }
    }
}

#[test]
fn single_character_chunks() {
    let text = " leading space and trailing word";
    let chunks: Vec<String> = text.chars().map(String::from).collect();
    let chunk_refs: Vec<&str> = chunks.iter().map(String::as_str).collect();

    let segments = segments_for(&chunk_refs);

    assert_eq!(segments.len(), chunks.len() + 1);
    assert_eq!(segments.concat(), text);
    assert_eq!(per_segment_counts(&segments), map_words(text));
}
