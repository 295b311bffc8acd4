//! Token model shared by the lexer, the parser and the documentation pass.

use serde::{Deserialize, Serialize};

use crate::validate::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenKind {
    Keyword,
    Identifier,
    Literal,
    Operator,
    Punctuation,
    Comment,
    Whitespace,
    Newline,
    StringInterpolation,
    TemplateLiteral,
}

impl TokenKind {
    /// Trivia never reaches the parser; newlines do, since statements end on them.
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }
}

/// A single lexeme. `value` is the exact source slice starting at `offset`,
/// so concatenating every token value reproduces the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub line: u32,
    pub column: u32,
    pub offset: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl Token {
    pub fn new(kind: TokenKind, value: &str, line: u32, column: u32, offset: usize) -> Self {
        Self {
            kind,
            value: value.to_string(),
            line,
            column,
            offset,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: &str) -> Self {
        self.hint = Some(hint.to_string());
        self
    }

    /// Byte offset one past the last byte of this token.
    pub fn end(&self) -> usize {
        self.offset + self.value.len()
    }

    /// Line on which the token ends (block comments and strings may span lines).
    pub fn end_line(&self) -> u32 {
        self.line + self.value.matches('\n').count() as u32
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
        }
    }

    pub fn is(&self, lexeme: &str) -> bool {
        self.value == lexeme
    }

    pub fn is_name(&self) -> bool {
        matches!(self.kind, TokenKind::Identifier | TokenKind::Keyword)
            && !self.value.starts_with('@')
            && self.hint.is_none()
    }
}
