/// Splits `text` after its last whitespace character.
///
/// Returns `(head, tail)` where `head` ends with that whitespace and `tail` is the
/// possibly incomplete word after it. Text without whitespace returns `None`,
/// since all of it may belong to a word that continues in the next chunk.
pub fn split_last_word(text: &str) -> Option<(&str, &str)> {
    let (index, ws) = text.char_indices().rev().find(|(_, c)| c.is_whitespace())?;
    Some(text.split_at(index + ws.len_utf8()))
}

/// Bytes of unbroken text a [`Carry`] holds back before releasing it anyway.
pub const DEFAULT_CARRY_LIMIT: usize = 1024 * 1024;

/// Trailing partial word retained between chunks of one stream.
///
/// Each pushed chunk produces exactly one segment. Concatenating every segment
/// returned by [`Carry::push`] followed by [`Carry::finish`] reproduces the input,
/// and no word shorter than the limit is ever split across two segments.
///
/// Input with no whitespace would otherwise accumulate without bound, so once the
/// held-back text exceeds the limit it is released with the current segment.
/// A longer run is then counted as more than one token.
#[derive(Debug)]
pub struct Carry {
    pending: String,
    limit: usize,
}

impl Default for Carry {
    fn default() -> Self {
        Self::with_limit(DEFAULT_CARRY_LIMIT)
    }
}

impl Carry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            pending: String::new(),
            limit,
        }
    }

    /// Accepts the next chunk and returns the text that is safe to tokenize now.
    ///
    /// A chunk that starts with whitespace still splits there, and a chunk with no
    /// whitespace at all is held back entirely (the returned segment is empty)
    /// unless that pushes the held-back text past the limit.
    pub fn push(&mut self, chunk: &str) -> String {
        let mut segment = match split_last_word(chunk) {
            Some((head, tail)) => {
                let mut segment = std::mem::take(&mut self.pending);
                segment.push_str(head);
                self.pending.push_str(tail);
                segment
            }
            None => {
                self.pending.push_str(chunk);
                String::new()
            }
        };
        if self.pending.len() > self.limit {
            segment.push_str(&std::mem::take(&mut self.pending));
        }
        segment
    }

    /// Text currently held back.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Ends the stream, returning whatever is still held back (possibly empty).
    pub fn finish(self) -> String {
        self.pending
    }
}
