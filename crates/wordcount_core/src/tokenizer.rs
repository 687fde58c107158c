/// Returns true for characters that belong to a word: ASCII letters, digits and `_`.
pub fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Lazily splits `text` into maximal runs of word characters.
///
/// Everything else (whitespace, punctuation, non-ASCII) is a separator and is
/// dropped. Tokens borrow from the input and keep their original casing.
pub fn tokenize(text: &str) -> Tokens<'_> {
    Tokens { rest: text }
}

/// Iterator returned by [`tokenize`].
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        // Word characters are ASCII, so byte offsets found here are char boundaries.
        let start = self.rest.find(is_word_char)?;
        let tail = &self.rest[start..];
        let len = tail.find(|c: char| !is_word_char(c)).unwrap_or(tail.len());
        let (token, rest) = tail.split_at(len);
        self.rest = rest;
        Some(token)
    }
}

impl std::iter::FusedIterator for Tokens<'_> {}
