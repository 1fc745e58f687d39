//! Small text helpers shared by the dispatcher and the oracle algorithms

/// Count whitespace-delimited word tokens.
///
/// This is the default tokenizer behind the oracle's `max_len` stop
/// criterion. Callers that need a smarter tokenization (e.g. punctuation
/// splitting) supply their own counting function instead.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
