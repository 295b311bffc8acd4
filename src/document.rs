//! # Purple Pages
//!
//! Generates a standalone HTML reference page for one Lamia source file:
//! every manifest with its signature and the comments written directly above
//! it, the widgets and styles the file creates, the compilation statistics,
//! and the generated ES6 code.
//!
//! Comments are attached by line adjacency. A comment belongs to a manifest
//! when it ends on the line right above the manifest, or right above another
//! comment or annotation line that does. Tags of the form `@name text` inside
//! such a comment are listed separately.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::ast::{Expression, Function, NodeKind, Widget};
use crate::compile::CompilationStats;
use crate::lexer::HINT_ANNOTATION;
use crate::render::escape_html;
use crate::token::{Token, TokenKind};
use crate::visitor::{walk_expression, walk_function, walk_widget, AstVisitor};

lazy_static! {
    static ref COMMENT_CLOSE: Regex = Regex::new(r"\s*\*+/\s*$").unwrap();
    static ref COMMENT_OPEN: Regex = Regex::new(r"^\s*(?:/\*+|//+|\*+)\s?").unwrap();
    static ref DOC_TAG: Regex = Regex::new(r"^@([A-Za-z_][A-Za-z0-9_]*)\s*(.*)$").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMENT ATTACHMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Comment text split into prose and `@tag` lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocComment {
    pub text: String,
    pub tags: Vec<(String, String)>,
}

/// Strip `//`, `/* */` and leading `*` markers, line by line.
pub fn clean_comment(raw: &str) -> DocComment {
    let mut doc = DocComment::default();
    let mut prose = Vec::new();
    for line in raw.lines() {
        let line = COMMENT_CLOSE.replace(line, "");
        let line = COMMENT_OPEN.replace(&line, "");
        let line = line.trim_end();
        match DOC_TAG.captures(line) {
            Some(caps) => doc.tags.push((caps[1].to_string(), caps[2].trim().to_string())),
            None => prose.push(line.to_string()),
        }
    }
    doc.text = prose.join("\n").trim().to_string();
    doc
}

struct CommentIndex<'t> {
    by_end_line: HashMap<u32, &'t Token>,
    annotation_lines: HashSet<u32>,
}

impl<'t> CommentIndex<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        let mut by_end_line = HashMap::new();
        let mut annotation_lines = HashSet::new();
        for token in tokens {
            if token.kind == TokenKind::Comment {
                by_end_line.insert(token.end_line(), token);
            } else if token.hint.as_deref() == Some(HINT_ANNOTATION) {
                annotation_lines.insert(token.line);
            }
        }
        Self {
            by_end_line,
            annotation_lines,
        }
    }

    /// Comments stacked directly above `line`, top to bottom.
    fn above(&self, line: u32) -> Vec<&'t Token> {
        let mut found = Vec::new();
        let mut current = line;
        while current > 1 {
            let previous = current - 1;
            if let Some(comment) = self.by_end_line.get(&previous) {
                found.push(*comment);
                current = comment.line;
            } else if self.annotation_lines.contains(&previous) {
                current = previous;
            } else {
                break;
            }
        }
        found.reverse();
        found
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLECTION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct Collector {
    manifests: Vec<(Function, u32)>,
    widgets: Vec<Widget>,
    styles: Vec<(String, String)>,
}

impl AstVisitor for Collector {
    fn visit_expression(&mut self, expr: &Expression) {
        if let NodeKind::StyleApplication(style) = &expr.kind {
            self.styles.push((style.selector.clone(), style.theme.clone()));
        }
        walk_expression(self, expr);
    }

    fn visit_widget(&mut self, _expr: &Expression, widget: &Widget) {
        self.widgets.push(widget.clone());
        walk_widget(self, widget);
    }

    fn visit_function(&mut self, expr: &Expression, function: &Function) {
        let line = expr.location.map_or(0, |l| l.line);
        self.manifests.push((function.clone(), line));
        walk_function(self, function);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PAGE
// ═══════════════════════════════════════════════════════════════════════════════

const PAGE_STYLE: &str = "body { font-family: system-ui, sans-serif; margin: 2rem auto; max-width: 60rem; color: #2a1b3d; }
h1, h2 { color: #6b2fa3; }
code, pre { background: #f4eefa; border-radius: 4px; }
pre { padding: 1rem; overflow-x: auto; }
article.manifest { border-left: 4px solid #9b59d0; padding-left: 1rem; margin-bottom: 1.5rem; }
table { border-collapse: collapse; }
td, th { border: 1px solid #d8c6ea; padding: 0.25rem 0.75rem; text-align: left; }";

pub fn generate_documentation(
    file_name: &str,
    tokens: &[Token],
    root: Option<&Expression>,
    stats: &CompilationStats,
    es6: &str,
) -> String {
    let mut collector = Collector::default();
    if let Some(root) = root {
        collector.visit_expression(root);
    }
    let comments = CommentIndex::new(tokens);
    let title = escape_html(file_name);

    let mut sections = Vec::new();
    sections.push(manifest_section(&collector.manifests, &comments));
    sections.push(widget_section(&collector.widgets));
    if !collector.styles.is_empty() {
        sections.push(style_section(&collector.styles));
    }
    sections.push(stats_section(stats));
    sections.push(format!(
        "<section id=\"code\">\n<h2>Generated ES6</h2>\n<pre><code>{}</code></pre>\n</section>",
        escape_html(es6)
    ));

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n<title>Purple Pages: {title}</title>\n<style>\n{style}\n</style>\n</head>\n<body>\n<h1>Purple Pages</h1>\n<p class=\"source\"><code>{title}</code></p>\n{sections}\n</body>\n</html>\n",
        title = title,
        style = PAGE_STYLE,
        sections = sections.join("\n")
    )
}

fn manifest_section(manifests: &[(Function, u32)], comments: &CommentIndex<'_>) -> String {
    if manifests.is_empty() {
        return "<section id=\"manifests\">\n<h2>Manifests</h2>\n<p>No manifests.</p>\n</section>"
            .to_string();
    }
    let mut out = String::from("<section id=\"manifests\">\n<h2>Manifests</h2>");
    for (function, line) in manifests {
        out.push_str(&format!(
            "\n<article class=\"manifest\" id=\"manifest-{}\">\n<h3><code>{}</code></h3>",
            escape_html(&function.name),
            escape_html(&function.signature())
        ));
        if !function.annotations.is_empty() {
            let annotations: Vec<String> = function
                .annotations
                .iter()
                .map(|a| format!("<code>@{}</code>", escape_html(a)))
                .collect();
            out.push_str(&format!("\n<p class=\"annotations\">{}</p>", annotations.join(" ")));
        }

        let raw: Vec<&str> = comments.above(*line).iter().map(|t| t.value.as_str()).collect();
        let doc = clean_comment(&raw.join("\n"));
        if !doc.text.is_empty() {
            out.push_str(&format!("\n<p>{}</p>", escape_html(&doc.text).replace('\n', "<br>\n")));
        }
        if !doc.tags.is_empty() {
            out.push_str("\n<dl>");
            for (tag, text) in &doc.tags {
                out.push_str(&format!(
                    "\n<dt>@{}</dt><dd>{}</dd>",
                    escape_html(tag),
                    escape_html(text)
                ));
            }
            out.push_str("\n</dl>");
        }
        out.push_str("\n</article>");
    }
    out.push_str("\n</section>");
    out
}

fn widget_section(widgets: &[Widget]) -> String {
    if widgets.is_empty() {
        return "<section id=\"widgets\">\n<h2>Widgets</h2>\n<p>No widgets.</p>\n</section>"
            .to_string();
    }
    let items: Vec<String> = widgets
        .iter()
        .map(|w| {
            let keys: Vec<&str> = w.keys().collect();
            format!(
                "<li><code>{}</code> ({}){}</li>",
                escape_html(&w.widget_type),
                escape_html(&w.theme),
                if keys.is_empty() {
                    String::new()
                } else {
                    format!(": {}", escape_html(&keys.join(", ")))
                }
            )
        })
        .collect();
    format!(
        "<section id=\"widgets\">\n<h2>Widgets</h2>\n<ul>\n{}\n</ul>\n</section>",
        items.join("\n")
    )
}

fn style_section(styles: &[(String, String)]) -> String {
    let items: Vec<String> = styles
        .iter()
        .map(|(selector, theme)| {
            format!(
                "<li><code>{}</code> ({})</li>",
                escape_html(selector),
                escape_html(theme)
            )
        })
        .collect();
    format!(
        "<section id=\"styles\">\n<h2>Styles</h2>\n<ul>\n{}\n</ul>\n</section>",
        items.join("\n")
    )
}

fn stats_section(stats: &CompilationStats) -> String {
    let rows = [
        ("Tokens", stats.tokens.to_string()),
        ("AST nodes", stats.ast_nodes.to_string()),
        ("Output lines", stats.output_lines.to_string()),
        ("Errors", stats.errors.to_string()),
        ("Warnings", stats.warnings.to_string()),
        ("Time", format!("{:.2} ms", stats.elapsed_ms)),
    ];
    let rows: Vec<String> = rows
        .iter()
        .map(|(name, value)| format!("<tr><th>{}</th><td>{}</td></tr>", name, value))
        .collect();
    format!(
        "<section id=\"statistics\">\n<h2>Statistics</h2>\n<table>\n{}\n</table>\n</section>",
        rows.join("\n")
    )
}
