//! Word counter core: pure tokenization, counting and chunk segmentation.
mod carry;
mod frequency;
mod outcome;
mod request;
mod tokenizer;

pub use carry::{split_last_word, Carry, DEFAULT_CARRY_LIMIT};
pub use frequency::{map_words, FrequencyMap};
pub use outcome::{CountOutcome, HealthReport, WordStatistics, GENERIC_FAILURE_MESSAGE};
pub use request::{validate_request, CountRequest, InputKind, ValidationErrors, INCORRECT_INPUT};
pub use tokenizer::{is_word_char, tokenize, Tokens};
