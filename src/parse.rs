//! Parse Module for the Lamia compiler
//!
//! Recursive-descent parser over the lexer's token stream. Whitespace and
//! comments are dropped up front; newlines stay because they end statements.
//! The parser never fails: problems become [`Diagnostic`]s and parsing resumes
//! at the next token that can start a statement.

#[cfg(feature = "napi")]
use napi_derive::napi;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ast::{
    find_attribute, insert_attribute, AssignOperator, Assignment, Attribute, BinaryOperator,
    Binding, Call, Class, Conditional, Expression, Function, Handler, IdGenerator, Import,
    LamiaType, LiteralValue, Loop, LoopKind, NodeId, NodeKind, Parameter, Style, UnaryOperator,
    Widget, DEFAULT_THEME,
};
use crate::lexer::{tokenize, HINT_UNRECOGNIZED};
use crate::token::{Token, TokenKind};
use crate::validate::{
    self, Diagnostic, SourceLocation, E_DANGLING_ANNOTATION, E_DUPLICATE_ATTRIBUTE,
    E_MISPLACED_STATEMENT, E_NESTING_TOO_DEEP, E_UNEXPECTED_EOF, E_UNEXPECTED_TOKEN,
    W_SKIPPED_TOKEN, W_UNKNOWN_TYPE, W_UNRECOGNIZED_CHARACTER,
};

// ═══════════════════════════════════════════════════════════════════════════════
// WORD OPERATORS
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    /// Natural-language spellings of the binary operators. `not` is unary and
    /// handled separately.
    static ref WORD_OPERATORS: HashMap<&'static str, BinaryOperator> = {
        let mut m = HashMap::new();
        m.insert("plus", BinaryOperator::Add);
        m.insert("minus", BinaryOperator::Subtract);
        m.insert("times", BinaryOperator::Multiply);
        m.insert("divided_by", BinaryOperator::Divide);
        m.insert("to_the", BinaryOperator::Power);
        m.insert("equals", BinaryOperator::Equal);
        m.insert("differs_from", BinaryOperator::NotEqual);
        m.insert("exceeds", BinaryOperator::Greater);
        m.insert("below", BinaryOperator::Less);
        m.insert("at_least", BinaryOperator::GreaterEqual);
        m.insert("at_most", BinaryOperator::LessEqual);
        m.insert("and_also", BinaryOperator::And);
        m.insert("or_else", BinaryOperator::Or);
        m
    };
}

/// Deepest expression or block nesting the parser descends into.
pub const MAX_NESTING: usize = 128;

// ═══════════════════════════════════════════════════════════════════════════════
// PUBLIC API
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    /// `None` only when nothing was recovered and a syntax error was reported.
    pub root: Option<Expression>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParserOptions {
    /// Theme assigned to widgets and styles without a `theme` attribute.
    pub default_theme: String,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            default_theme: DEFAULT_THEME.to_string(),
        }
    }
}

pub fn parse(tokens: &[Token]) -> ParseResult {
    parse_with(tokens, &ParserOptions::default())
}

pub fn parse_source(source: &str) -> ParseResult {
    parse(&tokenize(source))
}

pub fn parse_with(tokens: &[Token], options: &ParserOptions) -> ParseResult {
    let mut diagnostics = validate::check_delimiters(tokens);
    diagnostics.extend(validate::check_token_hints(tokens));

    let mut parser = Parser::new(tokens, &options.default_theme);
    let statements = parser.parse_program();
    let program_id = parser.ids.next_id();
    diagnostics.append(&mut parser.diagnostics);

    let recovered_nothing = statements.is_empty() && diagnostics.iter().any(Diagnostic::is_error);
    let root = (!recovered_nothing).then(|| Expression {
        id: program_id,
        kind: NodeKind::Program(statements),
        value_type: LamiaType::VoidStar,
        location: Some(SourceLocation { line: 1, column: 1 }),
        defined_in: None,
    });

    if let Some(root) = &root {
        diagnostics.extend(validate::check_structure(root));
    }
    diagnostics.sort_by_key(|d| (d.line, d.column));

    ParseResult { root, diagnostics }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSER
// ═══════════════════════════════════════════════════════════════════════════════

struct Parser<'t> {
    tokens: Vec<&'t Token>,
    position: usize,
    ids: IdGenerator,
    /// Enclosing manifest or blueprint ids, innermost last.
    scopes: Vec<NodeId>,
    depth: usize,
    /// Recursion depth across blocks, operands and operator chains.
    nesting: usize,
    theme: String,
    /// Set while parsing `${…}` so embedded nodes point at the string.
    location_override: Option<SourceLocation>,
    end: SourceLocation,
    diagnostics: Vec<Diagnostic>,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token], theme: &str) -> Self {
        Self {
            tokens: tokens.iter().filter(|t| !t.kind.is_trivia()).collect(),
            position: 0,
            ids: IdGenerator::new(),
            scopes: Vec::new(),
            depth: 0,
            nesting: 0,
            theme: theme.to_string(),
            location_override: None,
            end: end_of_input(tokens),
            diagnostics: Vec::new(),
        }
    }

    // ─── token access ────────────────────────────────────────────────────────

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.position).copied()
    }

    fn peek_nth(&self, n: usize) -> Option<&'t Token> {
        self.tokens.get(self.position + n).copied()
    }

    fn consume(&mut self) -> Option<&'t Token> {
        match self.peek() {
            Some(token) => {
                self.position += 1;
                Some(token)
            }
            None => {
                self.error(E_UNEXPECTED_EOF, "unexpected end of input", self.end);
                None
            }
        }
    }

    fn at(&self, lexeme: &str) -> bool {
        self.peek().is_some_and(|t| t.is(lexeme))
    }

    fn eat(&mut self, lexeme: &str) -> bool {
        if self.at(lexeme) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, lexeme: &str, context: &str) -> bool {
        if self.eat(lexeme) {
            return true;
        }
        match self.peek() {
            Some(found) => {
                let message = format!("expected `{}` {}, found {}", lexeme, context, describe_token(found));
                self.error(E_UNEXPECTED_TOKEN, &message, found.location());
            }
            // Missing closers are reported by the delimiter pass.
            None if matches!(lexeme, ")" | "]" | "}") => {}
            None => {
                let message = format!("expected `{}` {}, found end of input", lexeme, context);
                self.error(E_UNEXPECTED_EOF, &message, self.end);
            }
        }
        false
    }

    fn unexpected(&mut self, found: Option<&Token>, expected: &str) {
        match found {
            Some(token) => {
                let message = format!("expected {}, found {}", expected, describe_token(token));
                self.error(E_UNEXPECTED_TOKEN, &message, token.location());
            }
            None => {
                let message = format!("expected {}, found end of input", expected);
                self.error(E_UNEXPECTED_EOF, &message, self.end);
            }
        }
    }

    fn skip_newlines(&mut self) {
        while self.peek().is_some_and(|t| t.kind == TokenKind::Newline) {
            self.position += 1;
        }
    }

    fn skip_statement_separators(&mut self) {
        while self
            .peek()
            .is_some_and(|t| t.kind == TokenKind::Newline || t.is(";"))
        {
            self.position += 1;
        }
    }

    fn skip_pair_separators(&mut self) {
        while self
            .peek()
            .is_some_and(|t| t.kind == TokenKind::Newline || t.is(",") || t.is(";"))
        {
            self.position += 1;
        }
    }

    fn at_statement_end(&self) -> bool {
        match self.peek() {
            None => true,
            Some(t) => t.kind == TokenKind::Newline || t.is("}") || t.is(";"),
        }
    }

    fn next_significant(&self) -> Option<&'t Token> {
        self.tokens[self.position..]
            .iter()
            .find(|t| t.kind != TokenKind::Newline)
            .copied()
    }

    fn skip_unrecognized(&mut self) {
        let Some(token) = self.peek() else {
            return;
        };
        self.position += 1;
        if token.hint.as_deref() == Some(HINT_UNRECOGNIZED) {
            let message = format!("unrecognized character `{}`", token.value);
            self.warn(W_UNRECOGNIZED_CHARACTER, &message, token.location());
        } else {
            let message = format!("skipped unexpected {}", describe_token(token));
            self.warn(W_SKIPPED_TOKEN, &message, token.location());
        }
    }

    /// Enters one nesting level, or reports and skips the construct at the cap.
    fn descend(&mut self) -> bool {
        if self.nesting < MAX_NESTING {
            self.nesting += 1;
            return true;
        }
        let location = self.peek().map(Token::location).unwrap_or(self.end);
        let message = format!("nesting deeper than {} levels", MAX_NESTING);
        self.error(E_NESTING_TOO_DEEP, &message, location);
        self.skip_nested();
        false
    }

    /// Skips one bracketed group, or up to the end of the current item.
    fn skip_nested(&mut self) {
        let mut balance = 0usize;
        while let Some(token) = self.peek() {
            if token.is("(") || token.is("[") || token.is("{") {
                balance += 1;
            } else if token.is(")") || token.is("]") || token.is("}") {
                if balance == 0 {
                    return;
                }
                balance -= 1;
                if balance == 0 {
                    self.position += 1;
                    return;
                }
            } else if balance == 0
                && (token.kind == TokenKind::Newline || token.is(",") || token.is(";"))
            {
                return;
            }
            self.position += 1;
        }
    }

    // ─── diagnostics and node construction ───────────────────────────────────

    fn error(&mut self, code: &str, message: &str, location: SourceLocation) {
        let location = self.location_override.unwrap_or(location);
        self.diagnostics.push(Diagnostic::syntax(code, message, location));
    }

    fn warn(&mut self, code: &str, message: &str, location: SourceLocation) {
        let location = self.location_override.unwrap_or(location);
        self.diagnostics.push(Diagnostic::soft(code, message, location));
    }

    fn node(&mut self, kind: NodeKind, value_type: LamiaType, location: SourceLocation) -> Expression {
        let id = self.ids.next_id();
        self.node_with_id(id, kind, value_type, location)
    }

    fn node_with_id(
        &self,
        id: NodeId,
        kind: NodeKind,
        value_type: LamiaType,
        location: SourceLocation,
    ) -> Expression {
        Expression {
            id,
            kind,
            value_type,
            location: Some(self.location_override.unwrap_or(location)),
            defined_in: self.scopes.last().copied(),
        }
    }

    fn string_literal(&mut self, value: String, location: SourceLocation) -> Expression {
        self.node(
            NodeKind::Literal(LiteralValue::Str(value)),
            LamiaType::Radiant,
            location,
        )
    }

    // ═════════════════════════════════════════════════════════════════════════
    // STATEMENTS
    // ═════════════════════════════════════════════════════════════════════════

    fn parse_program(&mut self) -> Vec<Expression> {
        let mut statements = Vec::new();
        loop {
            self.skip_statement_separators();
            if self.peek().is_none() {
                break;
            }
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
        }
        statements
    }

    /// Parse one statement. Always consumes at least one token.
    fn parse_statement(&mut self) -> Option<Expression> {
        let token = self.peek()?;
        match token.value.as_str() {
            "create" => self.parse_widget(),
            "manifest" => self.parse_manifest(Vec::new()),
            "return_light" => self.parse_return(),
            "style_with" => self.parse_style(),
            "bind_data" => self.parse_binding(),
            "handle_touch" => self.parse_handler(),
            "when" => self.parse_conditional(),
            "while_shining" | "until_dark" | "for_each_star" => self.parse_loop(),
            "blueprint" => self.parse_blueprint(),
            "summon" => self.parse_import(),
            "become" => self.parse_become(),
            "invoke" => self.parse_invoke(),
            value if token.kind == TokenKind::Keyword && value.starts_with('@') => {
                self.parse_annotated()
            }
            _ if starts_expression(token) => self.parse_expression_statement(),
            _ => {
                self.skip_unrecognized();
                None
            }
        }
    }

    fn parse_block(&mut self, context: &str) -> Vec<Expression> {
        if !self.descend() {
            return Vec::new();
        }
        let statements = self.parse_block_body(context);
        self.nesting -= 1;
        statements
    }

    fn parse_block_body(&mut self, context: &str) -> Vec<Expression> {
        if !self.expect("{", context) {
            return Vec::new();
        }
        self.depth += 1;
        let mut statements = Vec::new();
        loop {
            self.skip_statement_separators();
            match self.peek() {
                None => break,
                Some(t) if t.is("}") => {
                    self.position += 1;
                    break;
                }
                Some(_) => {
                    if let Some(statement) = self.parse_statement() {
                        statements.push(statement);
                    }
                }
            }
        }
        self.depth -= 1;
        statements
    }

    /// `{ key: value, … }` with optional nested `create` children.
    fn parse_pair_block(&mut self, allow_children: bool) -> (Vec<Attribute>, Vec<Expression>) {
        if !self.descend() {
            return (Vec::new(), Vec::new());
        }
        let block = self.parse_pair_block_body(allow_children);
        self.nesting -= 1;
        block
    }

    fn parse_pair_block_body(&mut self, allow_children: bool) -> (Vec<Attribute>, Vec<Expression>) {
        let mut pairs = Vec::new();
        let mut children = Vec::new();
        self.position += 1;
        self.depth += 1;
        loop {
            self.skip_pair_separators();
            let Some(token) = self.peek() else {
                break;
            };
            if token.is("}") {
                self.position += 1;
                break;
            }
            if allow_children && token.is("create") {
                if let Some(child) = self.parse_widget() {
                    children.push(child);
                }
                continue;
            }
            let Some((name, location)) = self.parse_property_key() else {
                self.skip_unrecognized();
                continue;
            };
            if !self.expect(":", &format!("after `{}`", name)) {
                continue;
            }
            self.skip_newlines();
            let Some(value) = self.parse_expression() else {
                continue;
            };
            if insert_attribute(&mut pairs, name.clone(), value).is_err() {
                let message = format!("duplicate attribute `{}`; the first value is kept", name);
                self.error(E_DUPLICATE_ATTRIBUTE, &message, location);
            }
        }
        self.depth -= 1;
        (pairs, children)
    }

    fn parse_property_key(&mut self) -> Option<(String, SourceLocation)> {
        let token = self.peek()?;
        let location = token.location();
        if token.kind == TokenKind::Literal && is_quoted(&token.value) {
            self.position += 1;
            return Some((decode_string(&token.value), location));
        }
        if !token.is_name() {
            return None;
        }
        self.position += 1;
        let mut name = token.value.clone();
        let mut end = token.end();
        // font-size
        while let (Some(dash), Some(next)) = (self.peek(), self.peek_nth(1)) {
            if dash.is("-") && dash.offset == end && next.is_name() && next.offset == dash.end() {
                name.push('-');
                name.push_str(&next.value);
                end = next.end();
                self.position += 2;
            } else {
                break;
            }
        }
        Some((name, location))
    }

    fn parse_name(&mut self, expected: &str) -> Option<String> {
        match self.peek() {
            Some(token) if token.is_name() => {
                self.position += 1;
                Some(token.value.clone())
            }
            found => {
                self.unexpected(found, expected);
                None
            }
        }
    }

    /// `a` or `a.b.c`
    fn parse_member_path(&mut self, expected: &str) -> Option<String> {
        let mut path = self.parse_name(expected)?;
        while self.at(".") {
            match self.peek_nth(1) {
                Some(next) if next.is_name() => {
                    path.push('.');
                    path.push_str(&next.value);
                    self.position += 2;
                }
                _ => break,
            }
        }
        Some(path)
    }

    fn parse_type_name(&mut self) -> Option<LamiaType> {
        match self.peek() {
            Some(token) if token.is_name() => {
                self.position += 1;
                match LamiaType::from_keyword(&token.value) {
                    Some(lamia_type) => Some(lamia_type),
                    None => {
                        let message = format!("unknown type `{}`", token.value);
                        self.warn(W_UNKNOWN_TYPE, &message, token.location());
                        Some(LamiaType::Prism)
                    }
                }
            }
            found => {
                self.unexpected(found, "a type name");
                None
            }
        }
    }

    fn parse_string_or_name(&mut self, expected: &str) -> Option<String> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Literal && is_quoted(&token.value) => {
                self.position += 1;
                Some(decode_string(&token.value))
            }
            _ => self.parse_name(expected),
        }
    }

    // ─── widgets and styles ──────────────────────────────────────────────────

    fn parse_widget(&mut self) -> Option<Expression> {
        let location = self.consume()?.location();
        let widget_type = self.parse_name("a widget type after `create`")?;
        let mut widget = Widget::new(&widget_type, &self.theme);
        if self.at("{") {
            let (attributes, children) = self.parse_pair_block(true);
            widget.attributes = attributes;
            widget.children = children;
            if let Some(theme) = theme_override(&widget.attributes) {
                widget.theme = theme;
            }
        }
        Some(self.node(NodeKind::WidgetCreation(widget), LamiaType::Widget, location))
    }

    fn parse_style(&mut self) -> Option<Expression> {
        let location = self.consume()?.location();
        let selector = self.parse_selector()?;
        self.skip_newlines();
        let properties = if self.at("{") {
            self.parse_pair_block(false).0
        } else {
            self.expect("{", "to open the style block");
            Vec::new()
        };
        let theme = theme_override(&properties).unwrap_or_else(|| self.theme.clone());
        let style = Style {
            selector,
            properties,
            theme,
        };
        Some(self.node(NodeKind::StyleApplication(style), LamiaType::Theme, location))
    }

    fn parse_selector(&mut self) -> Option<String> {
        if let Some(token) = self.peek() {
            if token.kind == TokenKind::Literal && is_quoted(&token.value) {
                self.position += 1;
                return Some(decode_string(&token.value));
            }
        }
        let mut selector = String::new();
        let mut end = None;
        while let Some(token) = self.peek() {
            let joinable = token.is_name()
                || token.is(".")
                || token.is("#")
                || token.is(":")
                || token.is("-");
            if !joinable {
                break;
            }
            if end.is_some_and(|end| token.offset != end) {
                selector.push(' ');
            }
            selector.push_str(&token.value);
            end = Some(token.end());
            self.position += 1;
        }
        if selector.is_empty() {
            let found = self.peek();
            self.unexpected(found, "a style selector");
            return None;
        }
        Some(selector)
    }

    // ─── functions and classes ───────────────────────────────────────────────

    fn parse_annotated(&mut self) -> Option<Expression> {
        let mut annotations = Vec::new();
        let mut location = None;
        while let Some(token) = self
            .peek()
            .filter(|t| t.kind == TokenKind::Keyword && t.value.starts_with('@'))
        {
            self.position += 1;
            location.get_or_insert(token.location());
            annotations.push(token.value[1..].to_string());
            self.skip_newlines();
        }
        if self.at("manifest") {
            return self.parse_manifest(annotations);
        }
        let message = format!(
            "annotation `@{}` must be followed by a manifest",
            annotations.join("`, `@")
        );
        self.error(E_DANGLING_ANNOTATION, &message, location.unwrap_or(self.end));
        None
    }

    fn parse_manifest(&mut self, annotations: Vec<String>) -> Option<Expression> {
        let location = self.consume()?.location();
        // Allocated up front so body statements can point back at it.
        let id = self.ids.next_id();
        let name = self
            .parse_name("a manifest name")
            .unwrap_or_else(|| format!("manifest_{}", id.0));
        let params = if self.at("(") {
            self.parse_params()
        } else {
            Vec::new()
        };
        let return_type = if self.eat("->") {
            self.parse_type_name()
        } else {
            None
        };
        self.skip_newlines();

        self.scopes.push(id);
        let body = self.parse_block("to open the manifest body");
        self.scopes.pop();

        let function = Function {
            name,
            params,
            return_type,
            body,
            annotations,
        };
        Some(self.node_with_id(id, NodeKind::FunctionDef(function), LamiaType::Galaxy, location))
    }

    fn parse_params(&mut self) -> Vec<Parameter> {
        self.position += 1;
        let mut params = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek() {
                None => break,
                Some(t) if t.is(")") => {
                    self.position += 1;
                    break;
                }
                Some(t) if t.is(",") => self.position += 1,
                Some(t) if t.is_name() => {
                    self.position += 1;
                    let param_type = if self.eat(":") {
                        self.parse_type_name()
                    } else {
                        None
                    };
                    params.push(Parameter {
                        name: t.value.clone(),
                        param_type,
                    });
                }
                Some(t) if t.is("{") || t.is("}") => {
                    self.unexpected(Some(t), "`)` to close the parameter list");
                    break;
                }
                Some(_) => self.skip_unrecognized(),
            }
        }
        params
    }

    fn parse_return(&mut self) -> Option<Expression> {
        let location = self.consume()?.location();
        let value = if self.at_statement_end() {
            None
        } else {
            self.parse_expression().map(Box::new)
        };
        let value_type = value.as_ref().map_or(LamiaType::VoidStar, |v| v.value_type);
        Some(self.node(NodeKind::Return(value), value_type, location))
    }

    fn parse_blueprint(&mut self) -> Option<Expression> {
        let location = self.consume()?.location();
        let id = self.ids.next_id();
        let name = self
            .parse_name("a blueprint name")
            .unwrap_or_else(|| format!("blueprint_{}", id.0));
        let base = if self.eat("inherit_essence") {
            self.parse_member_path("a base blueprint after `inherit_essence`")
        } else {
            None
        };
        self.skip_newlines();

        let mut methods = Vec::new();
        if self.expect("{", "to open the blueprint body") {
            self.depth += 1;
            self.scopes.push(id);
            loop {
                self.skip_statement_separators();
                let Some(token) = self.peek() else {
                    break;
                };
                if token.is("}") {
                    self.position += 1;
                    break;
                }
                let member = if token.is("manifest") {
                    self.parse_manifest(Vec::new())
                } else if token.kind == TokenKind::Keyword && token.value.starts_with('@') {
                    self.parse_annotated()
                } else {
                    let message = format!(
                        "only manifests are allowed inside blueprint `{}`, found {}",
                        name,
                        describe_token(token)
                    );
                    self.error(E_MISPLACED_STATEMENT, &message, token.location());
                    let _ = self.parse_statement();
                    None
                };
                methods.extend(member);
            }
            self.scopes.pop();
            self.depth -= 1;
        }

        let class = Class {
            name,
            base,
            methods,
        };
        Some(self.node_with_id(id, NodeKind::ClassDef(class), LamiaType::Crystal, location))
    }

    fn parse_import(&mut self) -> Option<Expression> {
        let location = self.consume()?.location();
        let nested = self.depth > 0;
        let mut names = Vec::new();

        let source = match self.peek() {
            Some(token) if token.kind == TokenKind::Literal && is_quoted(&token.value) => {
                self.position += 1;
                decode_string(&token.value)
            }
            _ => {
                loop {
                    names.push(self.parse_name("a name to summon")?);
                    if !self.eat(",") {
                        break;
                    }
                }
                if !self.expect("from", "after the summoned names") {
                    return None;
                }
                match self.peek() {
                    Some(token) if token.kind == TokenKind::Literal && is_quoted(&token.value) => {
                        self.position += 1;
                        decode_string(&token.value)
                    }
                    found => {
                        self.unexpected(found, "a module path string");
                        return None;
                    }
                }
            }
        };

        if nested {
            self.error(
                E_MISPLACED_STATEMENT,
                "summon is only allowed at top level",
                location,
            );
            return None;
        }
        let import = Import { names, source };
        Some(self.node(NodeKind::Import(import), LamiaType::Portal, location))
    }

    // ─── reactive statements ─────────────────────────────────────────────────

    fn parse_binding(&mut self) -> Option<Expression> {
        let location = self.consume()?.location();
        let target = self.parse_member_path("a binding target")?;
        let two_way = if self.eat("<~>") {
            true
        } else if self.expect(":", "or `<~>` after the binding target") {
            false
        } else {
            return None;
        };
        let source = self.parse_expression()?;
        let value_type = source.value_type;
        let binding = Binding {
            target,
            source: Box::new(source),
            two_way,
        };
        Some(self.node(NodeKind::DataBinding(binding), value_type, location))
    }

    fn parse_handler(&mut self) -> Option<Expression> {
        let location = self.consume()?.location();
        let event = self.parse_string_or_name("an event name")?;
        let target = if self.at("on") {
            self.position += 1;
            self.parse_member_path("a handler target after `on`")
        } else {
            None
        };
        self.skip_newlines();
        let body = self.parse_block("to open the handler body");
        let handler = Handler {
            event,
            target,
            body,
        };
        Some(self.node(NodeKind::EventHandling(handler), LamiaType::Galaxy, location))
    }

    // ─── control flow ────────────────────────────────────────────────────────

    fn parse_conditional(&mut self) -> Option<Expression> {
        let location = self.consume()?.location();
        let condition = self.parse_expression()?;
        self.skip_newlines();
        let then_branch = self.parse_block("after the `when` condition");

        let otherwise = if self.next_significant().is_some_and(|t| t.is("otherwise")) {
            self.skip_newlines();
            self.position += 1;
            if !self.at("when") {
                self.skip_newlines();
                Some(self.parse_block("after `otherwise`"))
            } else if self.descend() {
                let nested = self.parse_conditional();
                self.nesting -= 1;
                nested.map(|nested| vec![nested])
            } else {
                None
            }
        } else {
            None
        };

        let conditional = Conditional {
            condition: Box::new(condition),
            then_branch,
            otherwise,
        };
        Some(self.node(NodeKind::Conditional(conditional), LamiaType::VoidStar, location))
    }

    fn parse_loop(&mut self) -> Option<Expression> {
        let head = self.consume()?;
        let location = head.location();
        let kind = match head.value.as_str() {
            "for_each_star" => {
                let item = self.parse_name("a loop variable after `for_each_star`")?;
                if !self.expect("in", "after the loop variable") {
                    return None;
                }
                LoopKind::ForEach { item }
            }
            "until_dark" => LoopKind::Until,
            _ => LoopKind::While,
        };
        let subject = self.parse_expression()?;
        self.skip_newlines();
        let body = self.parse_block("to open the loop body");
        let lp = Loop {
            kind,
            subject: Box::new(subject),
            body,
        };
        Some(self.node(NodeKind::Loop(lp), LamiaType::VoidStar, location))
    }

    // ─── assignments and calls ───────────────────────────────────────────────

    fn parse_become(&mut self) -> Option<Expression> {
        let location = self.consume()?.location();
        let target = self.parse_member_path("an assignment target after `become`")?;
        let Some(op) = self.assign_operator() else {
            let found = self.peek();
            self.unexpected(found, "`=`, `+=`, `-=`, `*=` or `/=`");
            return None;
        };
        self.position += 1;
        let value = self.parse_expression()?;
        Some(self.assignment(target, op, value, location))
    }

    fn assign_operator(&self) -> Option<AssignOperator> {
        self.peek()
            .filter(|t| t.kind == TokenKind::Operator)
            .and_then(|t| AssignOperator::from_symbol(&t.value))
    }

    fn assignment(
        &mut self,
        target: String,
        op: AssignOperator,
        value: Expression,
        location: SourceLocation,
    ) -> Expression {
        let value_type = value.value_type;
        let assignment = Assignment {
            target,
            op,
            value: Box::new(value),
        };
        self.node(NodeKind::Assignment(assignment), value_type, location)
    }

    fn parse_invoke(&mut self) -> Option<Expression> {
        let location = self.consume()?.location();
        let callee = self.parse_reference()?;
        if let NodeKind::Identifier(name) = &callee.kind {
            let call = Call {
                callee: name.clone(),
                args: Vec::new(),
            };
            return Some(self.node(NodeKind::Call(call), LamiaType::Prism, location));
        }
        Some(callee)
    }

    fn parse_expression_statement(&mut self) -> Option<Expression> {
        let start = self.position;
        let expression = self.parse_expression();
        if self.position == start {
            self.skip_unrecognized();
            return None;
        }
        let expression = expression?;
        if let (NodeKind::Identifier(target), Some(op)) = (&expression.kind, self.assign_operator()) {
            let target = target.clone();
            let location = expression.location.unwrap_or_default();
            self.position += 1;
            let value = self.parse_expression()?;
            return Some(self.assignment(target, op, value, location));
        }
        Some(expression)
    }

    // ═════════════════════════════════════════════════════════════════════════
    // EXPRESSIONS
    // ═════════════════════════════════════════════════════════════════════════

    fn parse_expression(&mut self) -> Option<Expression> {
        self.parse_binary(1)
    }

    fn binary_operator(&self) -> Option<BinaryOperator> {
        let token = self.peek()?;
        match token.kind {
            TokenKind::Operator => BinaryOperator::from_symbol(&token.value),
            TokenKind::Identifier => WORD_OPERATORS.get(token.value.as_str()).copied(),
            _ => None,
        }
    }

    /// Precedence climbing; `**` is the only right-associative operator.
    fn parse_binary(&mut self, min_precedence: u8) -> Option<Expression> {
        let base = self.nesting;
        if !self.descend() {
            return None;
        }
        let expression = self.parse_binary_chain(min_precedence);
        self.nesting = base;
        expression
    }

    /// Each folded operator deepens the left spine, so it counts as a level.
    fn parse_binary_chain(&mut self, min_precedence: u8) -> Option<Expression> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = self.binary_operator() {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            if !self.descend() {
                break;
            }
            self.position += 1;
            self.skip_newlines();
            let next_min = if op.is_right_associative() {
                precedence
            } else {
                precedence + 1
            };
            let Some(rhs) = self.parse_binary(next_min) else {
                break;
            };
            let value_type = op.result_type(lhs.value_type, rhs.value_type);
            let location = lhs.location.unwrap_or_default();
            lhs = self.node(
                NodeKind::BinaryOp {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                value_type,
                location,
            );
        }
        Some(lhs)
    }

    fn parse_unary(&mut self) -> Option<Expression> {
        let Some(token) = self.peek() else {
            self.unexpected(None, "an expression");
            return None;
        };
        let op = match (token.kind, token.value.as_str()) {
            (TokenKind::Operator, "!") | (TokenKind::Identifier, "not") => UnaryOperator::Not,
            (TokenKind::Operator, "-") => UnaryOperator::Negate,
            _ => return self.parse_primary(),
        };
        self.position += 1;
        if !self.descend() {
            return None;
        }
        let operand = self.parse_unary();
        self.nesting -= 1;
        let operand = operand?;
        let value_type = match op {
            UnaryOperator::Not => LamiaType::Lumina,
            UnaryOperator::Negate => LamiaType::Shimmer,
        };
        let kind = NodeKind::UnaryOp {
            op,
            operand: Box::new(operand),
        };
        Some(self.node(kind, value_type, token.location()))
    }

    fn parse_primary(&mut self) -> Option<Expression> {
        let Some(token) = self.peek() else {
            self.unexpected(None, "an expression");
            return None;
        };
        let location = token.location();
        match token.kind {
            TokenKind::Literal => {
                self.position += 1;
                let (value, value_type) = if is_quoted(&token.value) {
                    (LiteralValue::Str(decode_string(&token.value)), LamiaType::Radiant)
                } else {
                    (LiteralValue::Number(token.value.clone()), LamiaType::Shimmer)
                };
                Some(self.node(NodeKind::Literal(value), value_type, location))
            }
            TokenKind::StringInterpolation => {
                self.position += 1;
                Some(self.parse_interpolation(token))
            }
            TokenKind::TemplateLiteral => {
                self.position += 1;
                let value = LiteralValue::Template(token.value.clone());
                Some(self.node(NodeKind::Literal(value), LamiaType::Radiant, location))
            }
            TokenKind::Keyword if token.is("create") => self.parse_widget(),
            TokenKind::Keyword if LamiaType::from_keyword(&token.value).is_some() => {
                self.parse_reference()
            }
            TokenKind::Identifier if token.hint.is_none() => {
                let (value, value_type) = match token.value.as_str() {
                    "true" => (LiteralValue::Bool(true), LamiaType::Lumina),
                    "false" => (LiteralValue::Bool(false), LamiaType::Lumina),
                    "null" => (LiteralValue::Null, LamiaType::VoidStar),
                    _ => return self.parse_reference(),
                };
                self.position += 1;
                Some(self.node(NodeKind::Literal(value), value_type, location))
            }
            TokenKind::Punctuation if token.is("(") => {
                self.position += 1;
                self.skip_newlines();
                let inner = self.parse_expression();
                self.skip_newlines();
                self.expect(")", "to close the parenthesized expression");
                inner
            }
            TokenKind::Punctuation if token.is("[") => Some(self.parse_array()),
            _ => {
                self.unexpected(Some(token), "an expression");
                None
            }
        }
    }

    /// Identifier or member path, optionally called.
    fn parse_reference(&mut self) -> Option<Expression> {
        let location = self.peek()?.location();
        let path = self.parse_member_path("an identifier")?;
        if self.at("(") {
            let args = self.parse_delimited(")");
            let call = Call { callee: path, args };
            return Some(self.node(NodeKind::Call(call), LamiaType::Prism, location));
        }
        Some(self.node(NodeKind::Identifier(path), LamiaType::Prism, location))
    }

    fn parse_array(&mut self) -> Expression {
        let location = self.peek().map(Token::location).unwrap_or(self.end);
        let items = self.parse_delimited("]");
        self.node(
            NodeKind::Literal(LiteralValue::Array(items)),
            LamiaType::Constellation,
            location,
        )
    }

    /// Comma-separated expressions after an opener, up to `closer`.
    fn parse_delimited(&mut self, closer: &str) -> Vec<Expression> {
        self.position += 1;
        let mut items = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek() {
                None => break,
                Some(t) if t.is(closer) => {
                    self.position += 1;
                    break;
                }
                Some(t) if t.is(",") => self.position += 1,
                // Stray closer of another kind; the delimiter pass reports it.
                Some(t) if t.is("}") || t.is(")") || t.is("]") => break,
                Some(_) => {
                    let before = self.position;
                    match self.parse_expression() {
                        Some(item) => items.push(item),
                        None if self.position == before => self.skip_unrecognized(),
                        None => {}
                    }
                }
            }
        }
        items
    }

    /// `"a ${b} c"` becomes `"a " + b + " c"`.
    fn parse_interpolation(&mut self, token: &Token) -> Expression {
        let location = token.location();
        let mut parts = Vec::new();
        let mut rest = strip_quotes(&token.value);
        let mut text = String::new();

        while let Some(start) = find_interpolation(rest) {
            if parts.len() >= MAX_NESTING {
                let message = format!("more than {} interpolated parts", MAX_NESTING);
                self.error(E_NESTING_TOO_DEEP, &message, location);
                break;
            }
            let inner_start = start + 2;
            let Some(length) = matching_brace(&rest[inner_start..]) else {
                break;
            };
            text.push_str(&rest[..start]);
            if !text.is_empty() {
                let value = decode_escapes(&text);
                parts.push(self.string_literal(value, location));
                text.clear();
            }
            let inner = &rest[inner_start..inner_start + length];
            if let Some(expression) = self.parse_embedded(inner, location) {
                parts.push(expression);
            }
            rest = &rest[inner_start + length + 1..];
        }
        text.push_str(rest);
        if !text.is_empty() {
            let value = decode_escapes(&text);
            parts.push(self.string_literal(value, location));
        }

        let mut parts = parts.into_iter();
        let mut chain = match parts.next() {
            Some(first) if matches!(first.kind, NodeKind::Literal(LiteralValue::Str(_))) => first,
            Some(first) => {
                // Lead with "" so the chain concatenates as strings.
                let empty = self.string_literal(String::new(), location);
                self.concat(empty, first, location)
            }
            None => return self.string_literal(String::new(), location),
        };
        for part in parts {
            chain = self.concat(chain, part, location);
        }
        chain
    }

    fn concat(&mut self, lhs: Expression, rhs: Expression, location: SourceLocation) -> Expression {
        let kind = NodeKind::BinaryOp {
            op: BinaryOperator::Add,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        };
        self.node(kind, LamiaType::Radiant, location)
    }

    /// Re-lex and parse the inside of `${…}` with this parser's id generator.
    fn parse_embedded(&mut self, source: &str, location: SourceLocation) -> Option<Expression> {
        let tokens = tokenize(source);
        let mut sub = Parser::new(&tokens, &self.theme);
        sub.ids = std::mem::take(&mut self.ids);
        sub.scopes = self.scopes.clone();
        sub.nesting = self.nesting;
        sub.location_override = Some(location);
        sub.end = location;

        sub.skip_newlines();
        let expression = sub.parse_expression();
        sub.skip_newlines();
        if let Some(extra) = sub.peek() {
            let message = format!("unexpected {} in interpolation", describe_token(extra));
            sub.error(E_UNEXPECTED_TOKEN, &message, location);
        }

        self.ids = std::mem::take(&mut sub.ids);
        self.diagnostics.append(&mut sub.diagnostics);
        expression
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn starts_expression(token: &Token) -> bool {
    match token.kind {
        TokenKind::Literal | TokenKind::StringInterpolation | TokenKind::TemplateLiteral => true,
        TokenKind::Identifier => token.hint.is_none(),
        TokenKind::Operator => token.is("!") || token.is("-"),
        TokenKind::Punctuation => token.is("(") || token.is("["),
        _ => false,
    }
}

fn theme_override(attributes: &[Attribute]) -> Option<String> {
    match find_attribute(attributes, "theme").map(|e| &e.kind) {
        Some(NodeKind::Literal(LiteralValue::Str(theme))) => Some(theme.clone()),
        _ => None,
    }
}

fn describe_token(token: &Token) -> String {
    match token.kind {
        TokenKind::Newline => "end of line".to_string(),
        _ => {
            let value: String = token.value.chars().take(24).collect();
            format!("`{}`", value)
        }
    }
}

fn end_of_input(tokens: &[Token]) -> SourceLocation {
    let Some(last) = tokens.last() else {
        return SourceLocation { line: 1, column: 1 };
    };
    match last.value.rfind('\n') {
        Some(index) => SourceLocation {
            line: last.end_line(),
            column: last.value[index + 1..].chars().count() as u32 + 1,
        },
        None => SourceLocation {
            line: last.line,
            column: last.column + last.value.chars().count() as u32,
        },
    }
}

fn is_quoted(value: &str) -> bool {
    value.starts_with('"') || value.starts_with('\'')
}

/// Body of a string lexeme without its quotes; tolerates a missing closer.
fn strip_quotes(raw: &str) -> &str {
    let mut chars = raw.chars();
    let Some(quote) = chars.next() else {
        return raw;
    };
    let body = &raw[quote.len_utf8()..];
    let escaped_closer = body.ends_with(&format!("\\{}", quote)) && !body.ends_with(&format!("\\\\{}", quote));
    if body.ends_with(quote) && !escaped_closer {
        &body[..body.len() - quote.len_utf8()]
    } else {
        body
    }
}

fn decode_string(raw: &str) -> String {
    decode_escapes(strip_quotes(raw))
}

fn decode_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Byte offset of the first `${` not preceded by an escaping backslash.
fn find_interpolation(text: &str) -> Option<usize> {
    let mut chars = text.char_indices().peekable();
    while let Some((index, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '$' if chars.peek().is_some_and(|&(_, next)| next == '{') => return Some(index),
            _ => {}
        }
    }
    None
}

/// Length of the text before the `}` that closes an already-open `${`.
fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (index, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI EXPORTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
#[napi]
pub fn parse_lamia_native(source: String) -> napi::Result<serde_json::Value> {
    let result = parse_source(&source);
    serde_json::to_value(result).map_err(|e| napi::Error::from_reason(e.to_string()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn statements(source: &str) -> Vec<Expression> {
        let result = parse_source(source);
        assert!(
            !result.has_errors(),
            "unexpected errors: {:?}",
            result.diagnostics
        );
        match result.root.map(|root| root.kind) {
            Some(NodeKind::Program(statements)) => statements,
            other => panic!("expected program, got {:?}", other),
        }
    }

    fn single(source: &str) -> Expression {
        let mut statements = statements(source);
        assert_eq!(statements.len(), 1, "{:?}", statements);
        statements.remove(0)
    }

    #[test]
    fn test_widget_with_attributes_and_child() {
        let expr = single(
            r#"create CARD {
    title: "Hello", font-size: 12
    "data-x": true
    create RADIANT_TEXT { content: "Hi" }
}"#,
        );
        let widget = expr.as_widget().unwrap();
        assert_eq!(widget.widget_type, "CARD");
        assert_eq!(widget.theme, DEFAULT_THEME);
        assert_eq!(
            widget.keys().collect::<Vec<_>>(),
            vec!["title", "font-size", "data-x"]
        );
        assert_eq!(widget.children.len(), 1);
        assert_eq!(widget.children[0].as_widget().unwrap().widget_type, "RADIANT_TEXT");
    }

    #[test]
    fn test_theme_attribute_overrides_default() {
        let expr = single(r#"create RADIANT_TEXT { theme: "night", content: "x" }"#);
        let widget = expr.as_widget().unwrap();
        assert_eq!(widget.theme, "night");
        assert!(widget.attribute("theme").is_some());
    }

    #[test]
    fn test_manifest_signature_and_body() {
        let expr = single("manifest greet(name: radiant, n) -> radiant {\n    return_light \"hello\"\n}");
        let function = expr.as_function().unwrap();
        assert_eq!(function.name, "greet");
        assert_eq!(function.params.len(), 2);
        assert_eq!(function.params[0].param_type, Some(LamiaType::Radiant));
        assert_eq!(function.params[1].param_type, None);
        assert_eq!(function.return_type, Some(LamiaType::Radiant));
        assert_eq!(function.body.len(), 1);
        assert_eq!(function.body[0].defined_in, Some(expr.id));
        assert!(matches!(function.body[0].kind, NodeKind::Return(Some(_))));
    }

    #[test]
    fn test_return_without_value() {
        let expr = single("manifest stop {\n  return_light\n}");
        let function = expr.as_function().unwrap();
        assert!(matches!(function.body[0].kind, NodeKind::Return(None)));
    }

    #[test]
    fn test_annotation_wraps_manifest() {
        let expr = single("@startup\nmanifest boot { }");
        assert_eq!(expr.as_function().unwrap().annotations, vec!["startup"]);
    }

    #[test]
    fn test_dangling_annotation_is_error() {
        let result = parse_source("@startup\ncreate X");
        assert!(result.errors().any(|d| d.code == E_DANGLING_ANNOTATION));
        assert!(result.root.is_some());
    }

    #[test]
    fn test_precedence_and_associativity() {
        let expr = single("1 + 2 * 3 ** 2 ** 1");
        let NodeKind::BinaryOp { op, rhs, .. } = &expr.kind else {
            panic!("expected binary op");
        };
        assert_eq!(*op, BinaryOperator::Add);
        let NodeKind::BinaryOp { op, rhs, .. } = &rhs.kind else {
            panic!("expected product");
        };
        assert_eq!(*op, BinaryOperator::Multiply);
        let NodeKind::BinaryOp { op, rhs, .. } = &rhs.kind else {
            panic!("expected power");
        };
        assert_eq!(*op, BinaryOperator::Power);
        assert!(matches!(rhs.kind, NodeKind::BinaryOp { op: BinaryOperator::Power, .. }));
    }

    #[test]
    fn test_left_associative_subtraction() {
        let expr = single("10 - 4 - 3");
        let NodeKind::BinaryOp { lhs, .. } = &expr.kind else {
            panic!("expected binary op");
        };
        assert!(matches!(lhs.kind, NodeKind::BinaryOp { op: BinaryOperator::Subtract, .. }));
    }

    #[test]
    fn test_word_operators() {
        let expr = single("score plus 1 at_least limit and_also not done");
        let NodeKind::BinaryOp { op, lhs, rhs } = &expr.kind else {
            panic!("expected binary op");
        };
        assert_eq!(*op, BinaryOperator::And);
        assert!(matches!(lhs.kind, NodeKind::BinaryOp { op: BinaryOperator::GreaterEqual, .. }));
        assert!(matches!(rhs.kind, NodeKind::UnaryOp { op: UnaryOperator::Not, .. }));
    }

    #[test]
    fn test_pipeline_is_lowest() {
        let expr = single("a + 1 ~> render");
        assert!(matches!(expr.kind, NodeKind::BinaryOp { op: BinaryOperator::Pipeline, .. }));
    }

    #[test]
    fn test_interpolation_becomes_concatenation() {
        let expr = single(r#""Hello ${user.name}!""#);
        assert_eq!(expr.value_type, LamiaType::Radiant);
        let NodeKind::BinaryOp { op, lhs, rhs } = &expr.kind else {
            panic!("expected concatenation");
        };
        assert_eq!(*op, BinaryOperator::Add);
        assert_eq!(rhs.kind, NodeKind::Literal(LiteralValue::Str("!".into())));
        let NodeKind::BinaryOp { lhs: first, rhs: middle, .. } = &lhs.kind else {
            panic!("expected nested concatenation");
        };
        assert_eq!(first.kind, NodeKind::Literal(LiteralValue::Str("Hello ".into())));
        assert_eq!(middle.kind, NodeKind::Identifier("user.name".into()));
    }

    #[test]
    fn test_interpolation_leading_expression() {
        let expr = single(r#""${count} items""#);
        let NodeKind::BinaryOp { lhs, .. } = &expr.kind else {
            panic!("expected concatenation");
        };
        let NodeKind::BinaryOp { lhs: empty, .. } = &lhs.kind else {
            panic!("expected leading empty string");
        };
        assert_eq!(empty.kind, NodeKind::Literal(LiteralValue::Str(String::new())));
    }

    #[test]
    fn test_nested_arrays() {
        let expr = single("[1, 2, [3, 4]]");
        let NodeKind::Literal(LiteralValue::Array(items)) = &expr.kind else {
            panic!("expected array");
        };
        assert_eq!(items.len(), 3);
        assert!(matches!(&items[2].kind, NodeKind::Literal(LiteralValue::Array(inner)) if inner.len() == 2));
    }

    #[test]
    fn test_string_escapes_are_decoded() {
        let expr = single(r#"'it\'s "fine"\n'"#);
        assert_eq!(
            expr.kind,
            NodeKind::Literal(LiteralValue::Str("it's \"fine\"\n".into()))
        );
    }

    #[test]
    fn test_conditional_chain() {
        let expr = single("when a {\n  x\n}\notherwise when b {\n  y\n}\notherwise {\n  z\n}");
        let NodeKind::Conditional(conditional) = &expr.kind else {
            panic!("expected conditional");
        };
        let nested = conditional.otherwise.as_ref().unwrap();
        assert_eq!(nested.len(), 1);
        let NodeKind::Conditional(inner) = &nested[0].kind else {
            panic!("expected nested conditional");
        };
        assert_eq!(inner.otherwise.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_loops() {
        let loops = statements(
            "while_shining n < 3 { become n += 1 }\nfor_each_star item in items { invoke show(item) }\nuntil_dark done { tick() }",
        );
        let kinds: Vec<LoopKind> = loops
            .iter()
            .map(|l| match &l.kind {
                NodeKind::Loop(lp) => lp.kind.clone(),
                other => panic!("expected loop, got {:?}", other),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                LoopKind::While,
                LoopKind::ForEach { item: "item".into() },
                LoopKind::Until
            ]
        );
    }

    #[test]
    fn test_blueprint_with_base() {
        let expr = single("blueprint Hero inherit_essence Person {\n  manifest fly(height) { }\n  @performance manifest land { }\n}");
        let NodeKind::ClassDef(class) = &expr.kind else {
            panic!("expected class");
        };
        assert_eq!(class.base.as_deref(), Some("Person"));
        assert_eq!(class.methods.len(), 2);
        assert!(class.methods.iter().all(|m| m.defined_in == Some(expr.id)));
    }

    #[test]
    fn test_blueprint_rejects_non_manifest_members() {
        let result = parse_source("blueprint A {\n  create X\n  manifest ok { }\n}");
        assert!(result.errors().any(|d| d.code == E_MISPLACED_STATEMENT));
        let root = result.root.unwrap();
        let NodeKind::ClassDef(class) = &root.statements()[0].kind else {
            panic!("expected class");
        };
        assert_eq!(class.methods.len(), 1);
    }

    #[test]
    fn test_imports() {
        let imports = statements("summon Button, Card from \"./widgets\"\nsummon \"./theme.lamia\"");
        let NodeKind::Import(first) = &imports[0].kind else {
            panic!("expected import");
        };
        assert_eq!(first.names, vec!["Button", "Card"]);
        assert_eq!(first.source, "./widgets");
        let NodeKind::Import(second) = &imports[1].kind else {
            panic!("expected import");
        };
        assert!(second.names.is_empty());
    }

    #[test]
    fn test_nested_summon_is_rejected() {
        let result = parse_source("manifest f {\n  summon \"x\"\n}");
        assert!(result.errors().any(|d| d.code == E_MISPLACED_STATEMENT));
    }

    #[test]
    fn test_binding_and_handler() {
        let nodes = statements("bind_data user.name <~> input.value\nbind_data title: \"x\"\nhandle_touch click on submit {\n  invoke save\n}");
        let NodeKind::DataBinding(two_way) = &nodes[0].kind else {
            panic!("expected binding");
        };
        assert!(two_way.two_way);
        assert_eq!(two_way.target, "user.name");
        let NodeKind::DataBinding(one_way) = &nodes[1].kind else {
            panic!("expected binding");
        };
        assert!(!one_way.two_way);
        let NodeKind::EventHandling(handler) = &nodes[2].kind else {
            panic!("expected handler");
        };
        assert_eq!(handler.event, "click");
        assert_eq!(handler.target.as_deref(), Some("submit"));
        assert!(matches!(&handler.body[0].kind, NodeKind::Call(call) if call.callee == "save"));
    }

    #[test]
    fn test_style_selectors() {
        let nodes = statements("style_with .card-title {\n  font-size: \"12px\"\n}\nstyle_with \"#main > p\" { color: \"gold\" }");
        let NodeKind::StyleApplication(first) = &nodes[0].kind else {
            panic!("expected style");
        };
        assert_eq!(first.selector, ".card-title");
        assert_eq!(first.properties[0].name, "font-size");
        let NodeKind::StyleApplication(second) = &nodes[1].kind else {
            panic!("expected style");
        };
        assert_eq!(second.selector, "#main > p");
    }

    #[test]
    fn test_assignment_forms() {
        let nodes = statements("become count += 2\ntotal = count * 3");
        assert!(matches!(&nodes[0].kind, NodeKind::Assignment(a) if a.op == AssignOperator::AddAssign));
        assert!(matches!(&nodes[1].kind, NodeKind::Assignment(a) if a.target == "total"));
    }

    #[test]
    fn test_ids_are_unique_and_deterministic() {
        let source = r#"create A { x: "${a} ${b}" }
manifest f(p) { return_light p + 1 }"#;
        let first = parse_source(source).root.unwrap();
        let second = parse_source(source).root.unwrap();
        assert_eq!(first, second);

        fn collect(expr: &Expression, ids: &mut Vec<NodeId>) {
            ids.push(expr.id);
            for child in expr.children() {
                collect(child, ids);
            }
        }
        let mut ids = Vec::new();
        collect(&first, &mut ids);
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(ids.len(), deduped.len());
    }
}
