//! Lamia lexer.
//!
//! Scanning is total: every byte of the input ends up in exactly one token and
//! problems are reported through token hints rather than errors.

use lazy_static::lazy_static;
use std::collections::HashSet;

use crate::token::{Token, TokenKind};

// ═══════════════════════════════════════════════════════════════════════════════
// TABLES
// ═══════════════════════════════════════════════════════════════════════════════

pub const HINT_UNRECOGNIZED: &str = "unrecognized character";
pub const HINT_UNTERMINATED_STRING: &str = "unterminated string literal";
pub const HINT_UNTERMINATED_TEMPLATE: &str = "unterminated template literal";
pub const HINT_UNTERMINATED_COMMENT: &str = "unterminated block comment";
pub const HINT_ANNOTATION: &str = "annotation";

lazy_static! {
    static ref KEYWORDS: HashSet<&'static str> = [
        // statements
        "create", "become", "invoke", "summon",
        // control flow
        "when", "otherwise", "while_shining", "for_each_star", "until_dark",
        // functions
        "manifest", "return_light", "yield_radiance",
        // classes
        "blueprint", "inherit_essence", "implement_facet",
        // async
        "await_dawn", "promise_light",
        // ui
        "emit_signal", "render_beauty", "style_with", "bind_data", "handle_touch",
        // types
        "radiant", "shimmer", "lumina", "void_star", "constellation", "nebula",
        "galaxy", "prism", "crystal", "aurora", "widget", "theme", "vault", "portal",
    ]
    .into_iter()
    .collect();

    static ref THREE_CHAR_OPERATORS: HashSet<&'static str> =
        ["<~>", "**>", "<<<", ">>>", "<*>", "===", "!=="].into_iter().collect();

    static ref TWO_CHAR_OPERATORS: HashSet<&'static str> = [
        "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
        "|=", "^=", "<<", ">>", "->", "~>", "<*", "**",
    ]
    .into_iter()
    .collect();
}

const OPERATOR_CHARS: &str = "+-*/%=!<>&|^~?:";
const PUNCTUATION_CHARS: &str = "()[]{},;.@#";

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(word)
}

/// Tokenize a complete Lamia source.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEXER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy)]
struct Mark {
    offset: usize,
    line: u32,
    column: u32,
}

pub struct Lexer<'a> {
    source: &'a str,
    offset: usize,
    line: u32,
    column: u32,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Vec<Token> {
        while let Some(c) = self.peek() {
            let start = self.mark();
            match c {
                '\n' => {
                    self.advance();
                    self.push(TokenKind::Newline, start, None);
                }
                c if c.is_whitespace() => {
                    while self.peek().is_some_and(|c| c.is_whitespace() && c != '\n') {
                        self.advance();
                    }
                    self.push(TokenKind::Whitespace, start, None);
                }
                '/' if self.peek_at(1) == Some('/') => self.line_comment(start),
                '/' if self.peek_at(1) == Some('*') => self.block_comment(start),
                '"' | '\'' => self.string(start, c),
                '`' => self.template(start),
                c if c.is_ascii_digit() => self.number(start),
                '.' if self.peek_at(1).is_some_and(|n| n.is_ascii_digit()) => self.number(start),
                c if c.is_ascii_alphabetic() || c == '_' => self.identifier(start),
                '@' if self.peek_at(1).is_some_and(is_ident_start) => {
                    self.advance();
                    self.eat_ident_chars();
                    self.push(TokenKind::Keyword, start, Some(HINT_ANNOTATION));
                }
                c if OPERATOR_CHARS.contains(c) => self.operator(start),
                c if PUNCTUATION_CHARS.contains(c) => {
                    self.advance();
                    self.push(TokenKind::Punctuation, start, None);
                }
                _ => {
                    self.advance();
                    self.push(TokenKind::Identifier, start, Some(HINT_UNRECOGNIZED));
                }
            }
        }
        self.tokens
    }

    fn peek(&self) -> Option<char> {
        self.source[self.offset..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.source[self.offset..].chars().nth(n)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn mark(&self) -> Mark {
        Mark {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }

    fn push(&mut self, kind: TokenKind, start: Mark, hint: Option<&str>) {
        let value = &self.source[start.offset..self.offset];
        let token = Token::new(kind, value, start.line, start.column, start.offset);
        self.tokens.push(match hint {
            Some(hint) => token.with_hint(hint),
            None => token,
        });
    }

    fn eat_ident_chars(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }
    }

    fn line_comment(&mut self, start: Mark) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.advance();
        }
        self.push(TokenKind::Comment, start, None);
    }

    fn block_comment(&mut self, start: Mark) {
        self.advance();
        self.advance();
        loop {
            match self.peek() {
                None => {
                    self.push(TokenKind::Comment, start, Some(HINT_UNTERMINATED_COMMENT));
                    return;
                }
                Some('*') if self.peek_at(1) == Some('/') => {
                    self.advance();
                    self.advance();
                    break;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        self.push(TokenKind::Comment, start, None);
    }

    fn string(&mut self, start: Mark, quote: char) {
        self.advance();
        let mut interpolated = false;
        let mut terminated = false;
        while let Some(c) = self.peek() {
            if c == quote {
                self.advance();
                terminated = true;
                break;
            }
            match c {
                '\\' => {
                    self.advance();
                    self.advance();
                }
                '$' if self.peek_at(1) == Some('{') => {
                    interpolated = true;
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }
        let kind = if interpolated {
            TokenKind::StringInterpolation
        } else {
            TokenKind::Literal
        };
        let hint = (!terminated).then_some(HINT_UNTERMINATED_STRING);
        self.push(kind, start, hint);
    }

    fn template(&mut self, start: Mark) {
        self.advance();
        let mut terminated = false;
        while let Some(c) = self.peek() {
            self.advance();
            match c {
                '`' => {
                    terminated = true;
                    break;
                }
                '\\' => {
                    self.advance();
                }
                _ => {}
            }
        }
        let hint = (!terminated).then_some(HINT_UNTERMINATED_TEMPLATE);
        self.push(TokenKind::TemplateLiteral, start, hint);
    }

    fn number(&mut self, start: Mark) {
        let mut seen_dot = false;
        if self.peek() == Some('.') {
            seen_dot = true;
            self.advance();
        }
        let mut seen_exponent = false;
        while let Some(c) = self.peek() {
            match c {
                c if c.is_ascii_digit() => {
                    self.advance();
                }
                '.' if !seen_dot
                    && !seen_exponent
                    && self.peek_at(1).is_some_and(|n| n.is_ascii_digit()) =>
                {
                    seen_dot = true;
                    self.advance();
                }
                'e' | 'E' if !seen_exponent && self.exponent_follows() => {
                    seen_exponent = true;
                    self.advance();
                    if matches!(self.peek(), Some('+') | Some('-')) {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
        self.push(TokenKind::Literal, start, None);
    }

    fn exponent_follows(&self) -> bool {
        match self.peek_at(1) {
            Some(c) if c.is_ascii_digit() => true,
            Some('+') | Some('-') => self.peek_at(2).is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        }
    }

    fn identifier(&mut self, start: Mark) {
        self.eat_ident_chars();
        let word = &self.source[start.offset..self.offset];
        let kind = if is_keyword(word) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        self.push(kind, start, None);
    }

    fn operator(&mut self, start: Mark) {
        let rest = &self.source[self.offset..];
        let width = if rest.get(..3).is_some_and(|s| THREE_CHAR_OPERATORS.contains(s)) {
            3
        } else if rest.get(..2).is_some_and(|s| TWO_CHAR_OPERATORS.contains(s)) {
            2
        } else {
            1
        };
        for _ in 0..width {
            self.advance();
        }
        self.push(TokenKind::Operator, start, None);
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source)
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .map(|t| (t.kind, t.value))
            .collect()
    }

    fn assert_covers(source: &str) {
        let tokens = tokenize(source);
        let joined: String = tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(joined, source);
        let mut offset = 0;
        for token in &tokens {
            assert_eq!(token.offset, offset, "gap before {:?}", token);
            offset = token.end();
        }
    }

    #[test]
    fn test_tokens_cover_input() {
        for source in [
            "",
            "create RADIANT_TEXT { content: \"Hi\" }",
            "manifest greet -> radiant {\n  return_light \"hello\"\n}\n",
            "\"unterminated",
            "/* never closed",
            "`tpl ${x}",
            "héllo → wörld ✨",
            "a <~> b **> c\r\n\t12.5e-3 .5 12em",
            "$ § ¤",
        ] {
            assert_covers(source);
        }
    }

    #[test]
    fn test_positions_never_decrease() {
        let tokens = tokenize("a\n  b /* x\ny */ c\n\"d\ne\" f");
        let mut previous = (1, 1);
        for token in tokens {
            assert!((token.line, token.column) >= previous, "{:?}", token);
            previous = (token.line, token.column);
        }
    }

    #[test]
    fn test_lines_and_columns() {
        let tokens: Vec<Token> = tokenize("create X\n  when")
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .collect();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (1, 8));
        assert_eq!(tokens[2].kind, TokenKind::Newline);
        assert_eq!((tokens[3].line, tokens[3].column), (2, 3));
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("create widget foo_bar"),
            vec![
                (TokenKind::Keyword, "create".to_string()),
                (TokenKind::Keyword, "widget".to_string()),
                (TokenKind::Identifier, "foo_bar".to_string()),
            ]
        );
    }

    #[test]
    fn test_annotation_is_keyword() {
        let tokens = tokenize("@startup manifest");
        assert_eq!(tokens[0].kind, TokenKind::Keyword);
        assert_eq!(tokens[0].value, "@startup");
        assert_eq!(tokens[0].hint.as_deref(), Some(HINT_ANNOTATION));
    }

    #[test]
    fn test_operators_longest_first() {
        let ops: Vec<String> = kinds("<~> ** ~> -> < === =")
            .into_iter()
            .map(|(_, v)| v)
            .collect();
        assert_eq!(ops, vec!["<~>", "**", "~>", "->", "<", "===", "="]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("12.5e-3 .5 12em 1.2.3"),
            vec![
                (TokenKind::Literal, "12.5e-3".to_string()),
                (TokenKind::Literal, ".5".to_string()),
                (TokenKind::Literal, "12".to_string()),
                (TokenKind::Identifier, "em".to_string()),
                (TokenKind::Literal, "1.2".to_string()),
                (TokenKind::Literal, ".3".to_string()),
            ]
        );
    }

    #[test]
    fn test_member_dot_is_punctuation() {
        assert_eq!(
            kinds("a.b"),
            vec![
                (TokenKind::Identifier, "a".to_string()),
                (TokenKind::Punctuation, ".".to_string()),
                (TokenKind::Identifier, "b".to_string()),
            ]
        );
    }

    #[test]
    fn test_strings_and_interpolation() {
        let tokens = kinds(r#""plain \" quote" 'single' "hi ${name}" `tpl`"#);
        assert_eq!(tokens[0].0, TokenKind::Literal);
        assert_eq!(tokens[0].1, r#""plain \" quote""#);
        assert_eq!(tokens[1].0, TokenKind::Literal);
        assert_eq!(tokens[2].0, TokenKind::StringInterpolation);
        assert_eq!(tokens[3].0, TokenKind::TemplateLiteral);
    }

    #[test]
    fn test_unterminated_string_runs_to_end() {
        let tokens = tokenize("x = \"abc\ndef");
        let last = tokens.last().unwrap();
        assert_eq!(last.value, "\"abc\ndef");
        assert_eq!(last.hint.as_deref(), Some(HINT_UNTERMINATED_STRING));
    }

    #[test]
    fn test_block_comment_counts_lines() {
        let tokens = tokenize("/* a\nb */ c");
        assert_eq!(tokens[0].kind, TokenKind::Comment);
        assert_eq!(tokens[0].end_line(), 2);
        let c = tokens.last().unwrap();
        assert_eq!((c.line, c.column), (2, 6));
    }

    #[test]
    fn test_unrecognized_character() {
        let tokens = tokenize("a § b");
        let odd = &tokens[2];
        assert_eq!(odd.value, "§");
        assert_eq!(odd.kind, TokenKind::Identifier);
        assert_eq!(odd.hint.as_deref(), Some(HINT_UNRECOGNIZED));
        // multi-byte char advances one column
        assert_eq!(tokens[4].column, 5);
    }
}
