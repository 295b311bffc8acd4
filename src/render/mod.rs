//! Per-target rendering of AST nodes.
//!
//! Every renderer is a pure function of a node and its children: no shared
//! state, no I/O. Document scaffolding (doctype, imports, `main`) is added by
//! the formatters in `codegen`.

mod css;
mod html;
mod js;
mod native;

use lazy_static::lazy_static;
use regex::Regex;

use crate::ast::{BinaryOperator, Expression, NodeKind};

pub(crate) use js::JsFlavor;

impl Expression {
    pub fn to_html(&self) -> String {
        html::render(self)
    }

    /// ES6 rendering.
    pub fn to_js(&self) -> String {
        js::render(self, JsFlavor::Es6)
    }

    pub fn to_es5(&self) -> String {
        js::render(self, JsFlavor::Es5)
    }

    pub fn to_css(&self) -> String {
        css::render(self)
    }

    pub fn to_native(&self) -> String {
        native::render(self)
    }
}

pub(crate) fn js_expression(expr: &Expression, flavor: JsFlavor) -> String {
    js::render(expr, flavor)
}

pub(crate) fn js_statement(expr: &Expression, flavor: JsFlavor) -> String {
    js::statement(expr, flavor)
}

pub(crate) fn native_statement(expr: &Expression) -> String {
    native::statement(expr)
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    static ref JS_IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
    static ref NON_ALNUM_RUN: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
    static ref INVALID_ATTRIBUTE_CHARS: Regex = Regex::new(r"[^A-Za-z0-9_:.\-]+").unwrap();
}

pub(crate) const INDENT: &str = "    ";

pub(crate) fn is_js_identifier(name: &str) -> bool {
    JS_IDENTIFIER.is_match(name)
}

/// `RADIANT_TEXT` -> `radiant-text`
pub(crate) fn kebab_case(widget_type: &str) -> String {
    let lower = widget_type.to_ascii_lowercase();
    let kebab = NON_ALNUM_RUN.replace_all(&lower, "-");
    let kebab = kebab.trim_matches('-');
    if kebab.is_empty() {
        "widget".to_string()
    } else {
        kebab.to_string()
    }
}

pub(crate) fn attribute_name(key: &str) -> String {
    let name = INVALID_ATTRIBUTE_CHARS.replace_all(key, "-");
    if name.is_empty() {
        "data-attribute".to_string()
    } else {
        name.into_owned()
    }
}

pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape for a double-quoted JS or C++ string literal.
pub(crate) fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out
}

pub(crate) fn quote(s: &str) -> String {
    format!("\"{}\"", escape_string(s))
}

/// Prefix every non-empty line with `levels` indents.
pub(crate) fn indent(text: &str, levels: usize) -> String {
    let prefix = INDENT.repeat(levels);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Inside of a back-tick template, without the back-ticks.
pub(crate) fn template_body(raw: &str) -> &str {
    let body = raw.strip_prefix('`').unwrap_or(raw);
    body.strip_suffix('`').unwrap_or(body)
}

/// Whether `child` needs parentheses as an operand of `parent`.
pub(crate) fn needs_parens(parent: BinaryOperator, child: &Expression, is_rhs: bool) -> bool {
    match &child.kind {
        NodeKind::BinaryOp { op, .. } => {
            let (parent_prec, child_prec) = (parent.precedence(), op.precedence());
            if child_prec != parent_prec {
                return child_prec < parent_prec;
            }
            // Same level: only the associative side goes bare.
            if parent.is_right_associative() {
                !is_rhs
            } else {
                is_rhs
            }
        }
        NodeKind::UnaryOp { .. } => parent == BinaryOperator::Power && !is_rhs,
        _ => false,
    }
}

/// Comment text that cannot terminate the surrounding comment early.
pub(crate) fn comment_safe(text: &str, terminator: &str) -> String {
    text.replace(terminator, " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kebab_case() {
        assert_eq!(kebab_case("RADIANT_TEXT"), "radiant-text");
        assert_eq!(kebab_case("Card"), "card");
        assert_eq!(kebab_case("__"), "widget");
    }

    #[test]
    fn test_escape_html_covers_quotes() {
        assert_eq!(escape_html("<a href=\"x\">'&'</a>"), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("say \"hi\"\n\\"), "say \\\"hi\\\"\\n\\\\");
    }

    #[test]
    fn test_indent_skips_blank_lines() {
        assert_eq!(indent("a\n\nb", 1), "    a\n\n    b");
    }

    #[test]
    fn test_js_identifier() {
        assert!(is_js_identifier("content"));
        assert!(is_js_identifier("$el"));
        assert!(!is_js_identifier("font-size"));
        assert!(!is_js_identifier("1st"));
    }

    #[test]
    fn test_attribute_name() {
        assert_eq!(attribute_name("font-size"), "font-size");
        assert_eq!(attribute_name("two words"), "two-words");
    }
}
