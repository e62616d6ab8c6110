use std::io;
use thiserror::Error;

use crate::selection::Environment;

/// Custom error types for the grammar generator
#[derive(Error, Debug)]
pub enum GrammarError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Malformed label selection `{chain}`: {reason}")]
    MalformedSelectionChain { chain: String, reason: String },

    #[error("Undefined non-terminal `{symbol}` (active selection: {environment})")]
    UndefinedSymbol { symbol: String, environment: String },

    #[error("Recursion limit of {limit} exceeded while expanding `{symbol}`")]
    RecursionLimitExceeded { symbol: String, limit: usize },

    #[error("Invalid grammar: {0}")]
    InvalidGrammar(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for grammar operations
pub type Result<T> = std::result::Result<T, GrammarError>;

/// Trait extension for Option<T> to convert a failed lookup into a GrammarError
pub trait OptionExt<T> {
    fn ok_or_undefined(self, symbol: &str, environment: &Environment) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_undefined(self, symbol: &str, environment: &Environment) -> Result<T> {
        self.ok_or_else(|| GrammarError::UndefinedSymbol {
            symbol: symbol.to_string(),
            environment: environment.to_string(),
        })
    }
}

/// Accumulates generated words, inserting a single space between them unless
/// the next word has been glued to the previous one.
#[derive(Debug, Default)]
pub struct TextBuffer {
    text: String,
    glue_pending: bool,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a word. Empty words are dropped and leave a pending glue intact.
    pub fn push_word(&mut self, word: &str) {
        if word.is_empty() {
            return;
        }
        if !self.text.is_empty() && !self.glue_pending {
            self.text.push(' ');
        }
        self.text.push_str(word);
        self.glue_pending = false;
    }

    /// Attach the next emitted word to the previous one without a separator.
    pub fn glue(&mut self) {
        self.glue_pending = true;
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_words_are_space_separated() {
        let mut buffer = TextBuffer::new();
        buffer.push_word("il");
        buffer.push_word("lupo");
        assert_eq!(buffer.into_string(), "il lupo");
    }

    #[test]
    fn test_glue_joins_without_separator() {
        let mut buffer = TextBuffer::new();
        buffer.push_word("pecor");
        buffer.glue();
        buffer.push_word("a");
        assert_eq!(buffer.into_string(), "pecora");
    }

    #[test]
    fn test_empty_word_keeps_glue_pending() {
        let mut buffer = TextBuffer::new();
        buffer.push_word("ragazz");
        buffer.glue();
        buffer.push_word("");
        buffer.push_word("o");
        buffer.push_word("");
        assert_eq!(buffer.into_string(), "ragazzo");
    }

    #[test]
    fn test_leading_glue_is_harmless() {
        let mut buffer = TextBuffer::new();
        buffer.glue();
        buffer.push_word("solo");
        assert!(!buffer.is_empty());
        assert_eq!(buffer.into_string(), "solo");
    }

    #[test]
    fn test_undefined_symbol_message_names_the_selection() {
        let environment = Environment::from_labels(["M", "S"]);
        let err = None::<()>.ok_or_undefined("Ogg", &environment).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Undefined non-terminal `Ogg` (active selection: .M.S)"
        );
    }
}
