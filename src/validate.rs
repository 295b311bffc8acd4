//! Validate Module for the Lamia compiler
//!
//! Diagnostics with stable `LAMIA-E`/`LAMIA-W` codes, plus the passes that
//! produce them outside the parser: delimiter balance and lexer hints before
//! parsing, structural checks over the finished tree after it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ast::{Expression, Function, NodeKind};
use crate::lexer::{HINT_UNTERMINATED_COMMENT, HINT_UNTERMINATED_STRING, HINT_UNTERMINATED_TEMPLATE};
use crate::token::{Token, TokenKind};
use crate::visitor::{walk_expression, walk_function, AstVisitor};

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const E_UNEXPECTED_TOKEN: &str = "LAMIA-E001";
pub const E_UNMATCHED_CLOSER: &str = "LAMIA-E002";
pub const E_UNCLOSED_DELIMITER: &str = "LAMIA-E003";
pub const E_UNEXPECTED_EOF: &str = "LAMIA-E004";
pub const E_DUPLICATE_ATTRIBUTE: &str = "LAMIA-E005";
pub const E_DANGLING_ANNOTATION: &str = "LAMIA-E006";
pub const E_MISPLACED_STATEMENT: &str = "LAMIA-E007";
pub const E_UNTERMINATED: &str = "LAMIA-E008";
pub const E_NESTING_TOO_DEEP: &str = "LAMIA-E009";
pub const W_SKIPPED_TOKEN: &str = "LAMIA-W001";
pub const W_UNRECOGNIZED_CHARACTER: &str = "LAMIA-W002";
pub const W_RETURN_OUTSIDE_MANIFEST: &str = "LAMIA-W003";
pub const W_UNKNOWN_ANNOTATION: &str = "LAMIA-W004";
pub const W_UNKNOWN_TYPE: &str = "LAMIA-W005";

/// Annotations the code generators understand.
pub const KNOWN_ANNOTATIONS: &[&str] = &["startup", "performance", "context", "async", "export"];

/// Fixed explanation for a diagnostic code.
pub fn describe(code: &str) -> &'static str {
    match code {
        E_UNEXPECTED_TOKEN => "The parser expected a different token at this position.",
        E_UNMATCHED_CLOSER => "A closing delimiter has no matching opener.",
        E_UNCLOSED_DELIMITER => "An opening delimiter is never closed.",
        E_UNEXPECTED_EOF => "The source ended in the middle of a construct.",
        E_DUPLICATE_ATTRIBUTE => "Attribute keys must be unique; the first occurrence is kept.",
        E_DANGLING_ANNOTATION => "An annotation must be followed by a manifest.",
        E_MISPLACED_STATEMENT => {
            "summon is only allowed at top level and blueprints only contain manifests."
        }
        E_UNTERMINATED => "A string, template or block comment runs to the end of the input.",
        E_NESTING_TOO_DEEP => "Expressions and blocks nest too deeply; the inner part was skipped.",
        W_SKIPPED_TOKEN => "A token that starts no statement was skipped.",
        W_UNRECOGNIZED_CHARACTER => "The character is not part of the Lamia alphabet.",
        W_RETURN_OUTSIDE_MANIFEST => "return_light only has meaning inside a manifest.",
        W_UNKNOWN_ANNOTATION => "The annotation is not understood by any code generator.",
        W_UNKNOWN_TYPE => "The type name is not a Lamia type; prism is assumed.",
        _ => "Unknown diagnostic.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// Recovery could not fully reconstruct the construct.
    Syntax,
    /// Tolerated problem; output is unaffected beyond the skipped input.
    Soft,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::Syntax => write!(f, "error"),
            DiagnosticKind::Soft => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: String,
    pub kind: DiagnosticKind,
    pub message: String,
    pub line: u32,
    pub column: u32,
    pub hint: String,
}

impl Diagnostic {
    pub fn new(code: &str, kind: DiagnosticKind, message: &str, location: SourceLocation) -> Self {
        Diagnostic {
            code: code.to_string(),
            kind,
            message: message.to_string(),
            line: location.line,
            column: location.column,
            hint: describe(code).to_string(),
        }
    }

    pub fn syntax(code: &str, message: &str, location: SourceLocation) -> Self {
        Self::new(code, DiagnosticKind::Syntax, message, location)
    }

    pub fn soft(code: &str, message: &str, location: SourceLocation) -> Self {
        Self::new(code, DiagnosticKind::Soft, message, location)
    }

    pub fn is_error(&self) -> bool {
        self.kind == DiagnosticKind::Syntax
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}[{}]: {}",
            self.line, self.column, self.kind, self.code, self.message
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DELIMITER PASS
// ═══════════════════════════════════════════════════════════════════════════════

fn closer_for(opener: &str) -> &'static str {
    match opener {
        "(" => ")",
        "[" => "]",
        _ => "}",
    }
}

/// Match every `{ [ (` against its closer with an explicit stack.
pub fn check_delimiters(tokens: &[Token]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut stack: Vec<&Token> = Vec::new();

    for token in tokens.iter().filter(|t| t.kind == TokenKind::Punctuation) {
        match token.value.as_str() {
            "(" | "[" | "{" => stack.push(token),
            ")" | "]" | "}" => {
                let matches_top = stack
                    .last()
                    .is_some_and(|open| closer_for(&open.value) == token.value);
                if matches_top {
                    stack.pop();
                } else if let Some(position) = stack
                    .iter()
                    .rposition(|open| closer_for(&open.value) == token.value)
                {
                    // Everything opened after the matching opener is unclosed.
                    for open in stack.drain(position + 1..) {
                        diagnostics.push(unclosed(open));
                    }
                    stack.pop();
                } else {
                    diagnostics.push(Diagnostic::syntax(
                        E_UNMATCHED_CLOSER,
                        &format!("unmatched closing `{}`", token.value),
                        token.location(),
                    ));
                }
            }
            _ => {}
        }
    }

    diagnostics.extend(stack.into_iter().map(unclosed));
    diagnostics
}

fn unclosed(open: &Token) -> Diagnostic {
    Diagnostic::syntax(
        E_UNCLOSED_DELIMITER,
        &format!(
            "`{}` is never closed; expected `{}`",
            open.value,
            closer_for(&open.value)
        ),
        open.location(),
    )
}

/// Lexer hints that make the input structurally incomplete.
pub fn check_token_hints(tokens: &[Token]) -> Vec<Diagnostic> {
    tokens
        .iter()
        .filter_map(|token| {
            let hint = token.hint.as_deref()?;
            [
                HINT_UNTERMINATED_STRING,
                HINT_UNTERMINATED_TEMPLATE,
                HINT_UNTERMINATED_COMMENT,
            ]
            .contains(&hint)
            .then(|| Diagnostic::syntax(E_UNTERMINATED, hint, token.location()))
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// STRUCTURAL CHECKS
// ═══════════════════════════════════════════════════════════════════════════════

struct StructureChecker {
    diagnostics: Vec<Diagnostic>,
}

impl AstVisitor for StructureChecker {
    fn visit_expression(&mut self, expr: &Expression) {
        if let NodeKind::Return(_) = expr.kind {
            if expr.defined_in.is_none() {
                self.diagnostics.push(Diagnostic::soft(
                    W_RETURN_OUTSIDE_MANIFEST,
                    "return_light outside of a manifest",
                    expr.location.unwrap_or_default(),
                ));
            }
        }
        walk_expression(self, expr);
    }

    fn visit_function(&mut self, expr: &Expression, function: &Function) {
        for annotation in &function.annotations {
            if !KNOWN_ANNOTATIONS.contains(&annotation.as_str()) {
                self.diagnostics.push(Diagnostic::soft(
                    W_UNKNOWN_ANNOTATION,
                    &format!("unknown annotation `@{}` on `{}`", annotation, function.name),
                    expr.location.unwrap_or_default(),
                ));
            }
        }
        walk_function(self, function);
    }
}

/// Post-parse checks over a complete tree.
pub fn check_structure(root: &Expression) -> Vec<Diagnostic> {
    let mut checker = StructureChecker {
        diagnostics: Vec::new(),
    };
    checker.visit_expression(root);
    checker.diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    #[test]
    fn test_balanced_delimiters() {
        assert!(check_delimiters(&tokenize("a { b [ c ( d ) ] }")).is_empty());
    }

    #[test]
    fn test_unclosed_opener_is_located() {
        let diagnostics = check_delimiters(&tokenize("x\n  {"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, E_UNCLOSED_DELIMITER);
        assert_eq!((diagnostics[0].line, diagnostics[0].column), (2, 3));
        assert!(diagnostics[0].is_error());
    }

    #[test]
    fn test_unmatched_closer() {
        let diagnostics = check_delimiters(&tokenize("a ) b"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, E_UNMATCHED_CLOSER);
    }

    #[test]
    fn test_crossed_delimiters_report_inner_opener() {
        let diagnostics = check_delimiters(&tokenize("{ ( }"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, E_UNCLOSED_DELIMITER);
        assert!(diagnostics[0].message.contains('('));
    }

    #[test]
    fn test_delimiters_inside_strings_are_ignored() {
        assert!(check_delimiters(&tokenize("x = \"{ [\" // ( \n")).is_empty());
    }

    #[test]
    fn test_unterminated_tokens_are_errors() {
        let diagnostics = check_token_hints(&tokenize("a = \"open"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, E_UNTERMINATED);
        assert_eq!(diagnostics[0].column, 5);
        assert!(check_token_hints(&tokenize("a § b")).is_empty());
    }

    #[test]
    fn test_display_format() {
        let diagnostic = Diagnostic::syntax(
            E_UNEXPECTED_TOKEN,
            "expected `{`",
            SourceLocation { line: 3, column: 7 },
        );
        assert_eq!(diagnostic.to_string(), "3:7: error[LAMIA-E001]: expected `{`");
        assert_eq!(diagnostic.hint, describe(E_UNEXPECTED_TOKEN));
    }
}
