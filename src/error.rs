//! Error handling module for the chat Markdown renderer.
//!
//! Grammar exhaustion is fatal and aborts a render. Collaborator failures
//! (math, highlighting) are recoverable and are caught by the renderer,
//! which degrades to plain escaped output.
use crate::lexer::Position;
use thiserror::Error;

/// Main error type for the renderer.
#[derive(Debug, Clone, Error)]
pub enum MarkdownError {
    /// No block rule matched the remaining input.
    #[error("Lexical error at line {}, column {}: {message}", position.line, position.column)]
    Lex { position: Position, message: String },

    /// No inline rule matched the remaining text of a token.
    #[error("Inline error at line {}, column {}: {message}", position.line, position.column)]
    Inline { position: Position, message: String },

    /// The math collaborator rejected its input.
    #[error("Math rendering error: {message}")]
    Math { message: String },

    /// The highlighting collaborator failed on a language it claimed to know.
    #[error("Highlight error for `{language}`: {message}")]
    Highlight { language: String, message: String },
}

/// Convenience type alias for Results in the renderer.
pub type Result<T> = std::result::Result<T, MarkdownError>;

impl MarkdownError {
    /// Creates a new block lexing error with position information.
    pub fn lex_error(position: Position, message: impl Into<String>) -> Self {
        MarkdownError::Lex {
            position,
            message: message.into(),
        }
    }

    /// Creates a new inline lexing error with position information.
    pub fn inline_error(position: Position, message: impl Into<String>) -> Self {
        MarkdownError::Inline {
            position,
            message: message.into(),
        }
    }

    /// Creates a new math rendering error.
    pub fn math_error(message: impl Into<String>) -> Self {
        MarkdownError::Math {
            message: message.into(),
        }
    }

    /// Creates a new highlighting error.
    pub fn highlight_error(language: impl Into<String>, message: impl Into<String>) -> Self {
        MarkdownError::Highlight {
            language: language.into(),
            message: message.into(),
        }
    }

    /// Returns the position associated with this error, if any.
    pub fn position(&self) -> Option<Position> {
        match self {
            MarkdownError::Lex { position, .. } | MarkdownError::Inline { position, .. } => {
                Some(*position)
            }
            _ => None,
        }
    }

    /// Returns true if the renderer can degrade gracefully from this error.
    pub fn is_recoverable(&self) -> bool {
        match self {
            MarkdownError::Lex { .. } => false,
            MarkdownError::Inline { .. } => false,
            MarkdownError::Math { .. } => true,
            MarkdownError::Highlight { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let position = Position {
            line: 1,
            column: 5,
            offset: 4,
        };
        let error = MarkdownError::lex_error(position, "Infinite loop on byte: 7");

        let error_str = format!("{}", error);
        assert!(error_str.contains("line 1"));
        assert!(error_str.contains("column 5"));
        assert!(error_str.contains("Infinite loop on byte"));
    }

    #[test]
    fn test_error_classification() {
        let position = Position::new();

        let lex_error = MarkdownError::lex_error(position, "no rule");
        assert_eq!(lex_error.position(), Some(position));
        assert!(!lex_error.is_recoverable());

        let inline_error = MarkdownError::inline_error(position, "no rule");
        assert_eq!(inline_error.position(), Some(position));
        assert!(!inline_error.is_recoverable());

        let math_error = MarkdownError::math_error("bad \\frac");
        assert_eq!(math_error.position(), None);
        assert!(math_error.is_recoverable());

        let highlight_error = MarkdownError::highlight_error("rust", "boom");
        assert!(highlight_error.is_recoverable());
        assert!(highlight_error.to_string().contains("`rust`"));
    }
}
