use std::borrow::Cow;
use std::collections::HashSet;

use lazy_static::lazy_static;

use crate::ast::{
    Attribute, BinaryOperator, Class, Conditional, Expression, Function, Import, LiteralValue,
    Loop, LoopKind, NodeId, NodeKind, Widget,
};
use crate::parse::parse_source;

use super::{indent, is_js_identifier, needs_parens, quote, template_body};

lazy_static! {
    /// Words JS rejects as binding names in strict mode. `this` and `super`
    /// are left alone so member paths through them keep working.
    static ref RESERVED_WORDS: HashSet<&'static str> = [
        "await", "break", "case", "catch", "class", "const", "continue", "debugger",
        "default", "delete", "do", "else", "enum", "export", "extends", "finally",
        "for", "function", "if", "implements", "import", "in", "instanceof",
        "interface", "let", "new", "package", "private", "protected", "public",
        "return", "static", "switch", "throw", "try", "typeof", "var", "void",
        "while", "with", "yield",
    ]
    .into_iter()
    .collect();
}

/// JavaScript dialect. ES5 lowers arrows, classes, `for…of`, template
/// literals and `**`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JsFlavor {
    Es6,
    Es5,
}

pub(crate) fn render(expr: &Expression, flavor: JsFlavor) -> String {
    match &expr.kind {
        NodeKind::Program(statements) => statements
            .iter()
            .map(|s| statement(s, flavor))
            .collect::<Vec<_>>()
            .join("\n"),
        NodeKind::Literal(value) => literal(value, flavor),
        NodeKind::Identifier(name) => js_path(name).into_owned(),
        NodeKind::BinaryOp { op, lhs, rhs } => binary(*op, lhs, rhs, flavor),
        NodeKind::UnaryOp { op, operand } => {
            let inner = render(operand, flavor);
            match operand.kind {
                NodeKind::BinaryOp { .. } | NodeKind::UnaryOp { .. } => {
                    format!("{}({})", op.symbol(), inner)
                }
                _ => format!("{}{}", op.symbol(), inner),
            }
        }
        NodeKind::WidgetCreation(widget) => widget_js(widget, flavor),
        NodeKind::StyleApplication(style) => format!(
            "LamiaTheme.applyStyle({}, {}).theme({})",
            quote(&style.selector),
            object(&style.properties, flavor),
            quote(&style.theme)
        ),
        NodeKind::DataBinding(binding) => format!(
            "LamiaBinding.{}({}, {})",
            if binding.two_way { "sync" } else { "bind" },
            quote(&binding.target),
            thunk(&binding.source, flavor)
        ),
        NodeKind::EventHandling(handler) => match &handler.target {
            Some(target) => format!(
                "LamiaEvents.on({}, {}, {})",
                quote(&handler.event),
                quote(target),
                callback(&handler.body, flavor)
            ),
            None => format!(
                "LamiaEvents.on({}, {})",
                quote(&handler.event),
                callback(&handler.body, flavor)
            ),
        },
        NodeKind::Conditional(conditional) => conditional_js(conditional, flavor),
        NodeKind::Loop(lp) => loop_js(expr.id, lp, flavor),
        NodeKind::FunctionDef(function) => function_js(function, flavor),
        NodeKind::ClassDef(class) => match flavor {
            JsFlavor::Es6 => class_es6(class),
            JsFlavor::Es5 => class_es5(class),
        },
        NodeKind::Import(import) => import_js(import, flavor),
        NodeKind::Return(Some(value)) => format!("return {};", render(value, flavor)),
        NodeKind::Return(None) => "return;".to_string(),
        NodeKind::Call(call) => format!("{}({})", js_path(&call.callee), arguments(&call.args, flavor)),
        NodeKind::Assignment(assignment) => format!(
            "{} {} {}",
            js_path(&assignment.target),
            assignment.op.symbol(),
            render(&assignment.value, flavor)
        ),
    }
}

/// Rendering in statement position, terminated where JS needs it.
pub(crate) fn statement(expr: &Expression, flavor: JsFlavor) -> String {
    let code = render(expr, flavor);
    match expr.kind {
        NodeKind::Program(_)
        | NodeKind::Conditional(_)
        | NodeKind::Loop(_)
        | NodeKind::FunctionDef(_)
        | NodeKind::ClassDef(_)
        | NodeKind::Import(_)
        | NodeKind::Return(_) => code,
        _ => format!("{};", code),
    }
}

fn block(statements: &[Expression], flavor: JsFlavor) -> String {
    if statements.is_empty() {
        return "{}".to_string();
    }
    let body = statements
        .iter()
        .map(|s| statement(s, flavor))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{{\n{}\n}}", indent(&body, 1))
}

fn callback(body: &[Expression], flavor: JsFlavor) -> String {
    match flavor {
        JsFlavor::Es6 => format!("() => {}", block(body, flavor)),
        JsFlavor::Es5 => format!("function () {}", block(body, flavor)),
    }
}

fn thunk(value: &Expression, flavor: JsFlavor) -> String {
    let code = render(value, flavor);
    match flavor {
        JsFlavor::Es6 => format!("() => ({})", code),
        JsFlavor::Es5 => format!("function () {{ return {}; }}", code),
    }
}

fn arguments(args: &[Expression], flavor: JsFlavor) -> String {
    args.iter()
        .map(|a| render(a, flavor))
        .collect::<Vec<_>>()
        .join(", ")
}

// ═══════════════════════════════════════════════════════════════════════════════
// LITERALS AND OPERATORS
// ═══════════════════════════════════════════════════════════════════════════════

fn literal(value: &LiteralValue, flavor: JsFlavor) -> String {
    match value {
        LiteralValue::Str(s) => quote(s),
        LiteralValue::Number(n) => n.clone(),
        LiteralValue::Bool(b) => b.to_string(),
        LiteralValue::Null => "null".to_string(),
        LiteralValue::Template(raw) => match flavor {
            JsFlavor::Es6 => format!("`{}`", template_body(raw)),
            JsFlavor::Es5 => template_to_concat(template_body(raw)),
        },
        LiteralValue::Array(items) => format!("[{}]", arguments(items, flavor)),
    }
}

fn binary(op: BinaryOperator, lhs: &Expression, rhs: &Expression, flavor: JsFlavor) -> String {
    match op {
        BinaryOperator::Pipeline => pipeline(lhs, rhs, flavor),
        BinaryOperator::Power if flavor == JsFlavor::Es5 => format!(
            "Math.pow({}, {})",
            render(lhs, flavor),
            render(rhs, flavor)
        ),
        _ => format!(
            "{} {} {}",
            operand(op, lhs, false, flavor),
            op.symbol(),
            operand(op, rhs, true, flavor)
        ),
    }
}

fn operand(parent: BinaryOperator, child: &Expression, is_rhs: bool, flavor: JsFlavor) -> String {
    let code = render(child, flavor);
    if needs_parens(parent, child, is_rhs) {
        format!("({})", code)
    } else {
        code
    }
}

/// `x ~> f` calls `f(x)`; `x ~> f(y)` calls `f(x, y)`.
fn pipeline(lhs: &Expression, rhs: &Expression, flavor: JsFlavor) -> String {
    let input = render(lhs, flavor);
    match &rhs.kind {
        NodeKind::Identifier(name) => format!("{}({})", js_path(name), input),
        NodeKind::Call(call) if call.args.is_empty() => {
            format!("{}({})", js_path(&call.callee), input)
        }
        NodeKind::Call(call) => format!(
            "{}({}, {})",
            js_path(&call.callee),
            input,
            arguments(&call.args, flavor)
        ),
        _ => format!("({})({})", render(rhs, flavor), input),
    }
}

/// Lower the inside of a template literal to `"…" + (expr) + "…"`.
fn template_to_concat(body: &str) -> String {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut chars = body.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, '`')) => text.push('`'),
                Some((_, '$')) => text.push('$'),
                Some((_, escaped)) => {
                    text.push('\\');
                    text.push(escaped);
                }
                None => text.push_str("\\\\"),
            },
            '$' if chars.peek().is_some_and(|(_, next)| *next == '{') => {
                let start = index + 2;
                let mut depth = 1usize;
                let mut end = None;
                for (i, ch) in body[start..].char_indices() {
                    match ch {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                end = Some(start + i);
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                let Some(end) = end else {
                    text.push(c);
                    continue;
                };
                if !text.is_empty() {
                    parts.push(format!("\"{}\"", text));
                    text.clear();
                }
                parts.push(format!("({})", es5_embedded(body[start..end].trim())));
                while chars.peek().is_some_and(|(i, _)| *i <= end) {
                    chars.next();
                }
            }
            '"' => text.push_str("\\\""),
            '\n' => text.push_str("\\n"),
            '\r' => text.push_str("\\r"),
            _ => text.push(c),
        }
    }
    if !text.is_empty() {
        parts.push(format!("\"{}\"", text));
    }
    match parts.first() {
        None => "\"\"".to_string(),
        Some(first) if first.starts_with('(') => format!("\"\" + {}", parts.join(" + ")),
        Some(_) => parts.join(" + "),
    }
}

/// Lamia expressions inside `${…}` are rendered as ES5; anything else is kept.
fn es5_embedded(source: &str) -> String {
    let result = parse_source(source);
    if result.has_errors() {
        return source.to_string();
    }
    match result.root.as_ref().map(Expression::statements) {
        Some([expression]) => render(expression, JsFlavor::Es5),
        _ => source.to_string(),
    }
}

/// Reserved words get a trailing `_` so they can name bindings.
fn js_name(name: &str) -> Cow<'_, str> {
    if RESERVED_WORDS.contains(name) {
        Cow::Owned(format!("{}_", name))
    } else {
        Cow::Borrowed(name)
    }
}

/// Only the head of `a.b.c` is a binding; property names may be reserved.
fn js_path(path: &str) -> Cow<'_, str> {
    match path.split_once('.') {
        Some((head, rest)) if RESERVED_WORDS.contains(head) => {
            Cow::Owned(format!("{}_.{}", head, rest))
        }
        Some(_) => Cow::Borrowed(path),
        None => js_name(path),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WIDGETS
// ═══════════════════════════════════════════════════════════════════════════════

fn widget_js(widget: &Widget, flavor: JsFlavor) -> String {
    let mut code = format!(
        "LamiaWidget.create({}, {}).theme({})",
        quote(&widget.widget_type),
        object(&widget.attributes, flavor),
        quote(&widget.theme)
    );
    if !widget.children.is_empty() {
        let children = widget
            .children
            .iter()
            .map(|c| render(c, flavor))
            .collect::<Vec<_>>()
            .join(",\n");
        code.push_str(&format!(".children([\n{}\n])", indent(&children, 1)));
    }
    code
}

fn object(attributes: &[Attribute], flavor: JsFlavor) -> String {
    if attributes.is_empty() {
        return "{}".to_string();
    }
    let entries: Vec<String> = attributes
        .iter()
        .map(|a| format!("{}: {}", object_key(&a.name), render(&a.value, flavor)))
        .collect();
    format!("{{ {} }}", entries.join(", "))
}

fn object_key(name: &str) -> String {
    if is_js_identifier(name) {
        name.to_string()
    } else {
        quote(name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTROL FLOW
// ═══════════════════════════════════════════════════════════════════════════════

fn conditional_js(conditional: &Conditional, flavor: JsFlavor) -> String {
    let mut code = format!(
        "if ({}) {}",
        render(&conditional.condition, flavor),
        block(&conditional.then_branch, flavor)
    );
    match conditional.otherwise.as_deref() {
        Some([nested]) if matches!(nested.kind, NodeKind::Conditional(_)) => {
            code.push_str(&format!(" else {}", render(nested, flavor)));
        }
        Some(branch) => code.push_str(&format!(" else {}", block(branch, flavor))),
        None => {}
    }
    code
}

fn loop_js(id: NodeId, lp: &Loop, flavor: JsFlavor) -> String {
    let subject = render(&lp.subject, flavor);
    match (&lp.kind, flavor) {
        (LoopKind::While, _) => format!("while ({}) {}", subject, block(&lp.body, flavor)),
        (LoopKind::Until, _) => format!("do {} while (!({}));", block(&lp.body, flavor), subject),
        (LoopKind::ForEach { item }, JsFlavor::Es6) => {
            format!("for (const {} of {}) {}", js_name(item), subject, block(&lp.body, flavor))
        }
        (LoopKind::ForEach { item }, JsFlavor::Es5) => {
            // Node ids keep the counters of nested loops apart.
            let index = format!("_i{}", id.0);
            let list = format!("_list{}", id.0);
            let mut body = vec![format!("var {} = {}[{}];", js_name(item), list, index)];
            body.extend(lp.body.iter().map(|s| statement(s, flavor)));
            format!(
                "for (var {i} = 0, {l} = {s}; {i} < {l}.length; {i}++) {{\n{b}\n}}",
                i = index,
                l = list,
                s = subject,
                b = indent(&body.join("\n"), 1)
            )
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FUNCTIONS, CLASSES, IMPORTS
// ═══════════════════════════════════════════════════════════════════════════════

fn parameter_list(function: &Function) -> String {
    function
        .params
        .iter()
        .map(|p| js_name(&p.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn annotation_comments(function: &Function, skip_startup: bool) -> Vec<String> {
    function
        .annotations
        .iter()
        .filter(|a| !(skip_startup && a.as_str() == "startup"))
        .map(|a| format!("// @{}", a))
        .collect()
}

fn function_js(function: &Function, flavor: JsFlavor) -> String {
    let mut lines = annotation_comments(function, true);
    lines.push(format!(
        "function {}({}) {}",
        js_name(&function.name),
        parameter_list(function),
        block(&function.body, flavor)
    ));
    if function.has_annotation("startup") {
        lines.push(format!(
            "document.addEventListener(\"DOMContentLoaded\", {});",
            js_name(&function.name)
        ));
    }
    lines.join("\n")
}

fn methods(class: &Class) -> impl Iterator<Item = &Function> {
    class.methods.iter().filter_map(Expression::as_function)
}

fn class_es6(class: &Class) -> String {
    let name = js_name(&class.name);
    let head = match &class.base {
        Some(base) => format!("class {} extends {}", name, js_path(base)),
        None => format!("class {}", name),
    };
    let members: Vec<String> = methods(class)
        .map(|method| {
            let mut lines = annotation_comments(method, false);
            lines.push(format!(
                "{}({}) {}",
                method.name,
                parameter_list(method),
                block(&method.body, JsFlavor::Es6)
            ));
            lines.join("\n")
        })
        .collect();
    if members.is_empty() {
        return format!("{} {{}}", head);
    }
    format!("{} {{\n{}\n}}", head, indent(&members.join("\n\n"), 1))
}

fn class_es5(class: &Class) -> String {
    let mut lines = Vec::new();
    let name = js_name(&class.name);
    match &class.base {
        Some(base) => {
            let base = js_path(base);
            lines.push(format!(
                "function {}() {{\n{}{}.apply(this, arguments);\n}}",
                name,
                super::INDENT,
                base
            ));
            lines.push(format!("{}.prototype = Object.create({}.prototype);", name, base));
            lines.push(format!("{}.prototype.constructor = {};", name, name));
        }
        None => lines.push(format!("function {}() {{}}", name)),
    }
    for method in methods(class) {
        lines.extend(annotation_comments(method, false));
        lines.push(format!(
            "{}.prototype.{} = function ({}) {};",
            name,
            method.name,
            parameter_list(method),
            block(&method.body, JsFlavor::Es5)
        ));
    }
    lines.join("\n")
}

fn import_js(import: &Import, flavor: JsFlavor) -> String {
    match (flavor, import.names.is_empty()) {
        (JsFlavor::Es6, true) => format!("import {};", quote(&import.source)),
        (JsFlavor::Es6, false) => format!(
            "import {{ {} }} from {};",
            import
                .names
                .iter()
                .map(|name| match js_name(name) {
                    Cow::Owned(local) => format!("{} as {}", name, local),
                    Cow::Borrowed(_) => name.clone(),
                })
                .collect::<Vec<_>>()
                .join(", "),
            quote(&import.source)
        ),
        (JsFlavor::Es5, true) => format!("LamiaModules.require({});", quote(&import.source)),
        (JsFlavor::Es5, false) => import
            .names
            .iter()
            .map(|name| {
                format!(
                    "var {} = LamiaModules.require({}).{};",
                    js_name(name),
                    quote(&import.source),
                    name
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_to_concat() {
        assert_eq!(template_to_concat("Hello ${name}!"), "\"Hello \" + (name) + \"!\"");
        assert_eq!(template_to_concat("${a}${b}"), "\"\" + (a) + (b)");
        assert_eq!(template_to_concat(""), "\"\"");
        assert_eq!(template_to_concat("say \"hi\"\nnow"), "\"say \\\"hi\\\"\\nnow\"");
        assert_eq!(template_to_concat("cost \\${x}"), "\"cost ${x}\"");
        assert_eq!(template_to_concat("${2 ** 3}"), "\"\" + (Math.pow(2, 3))");
        assert_eq!(template_to_concat("${(a) => a}"), "\"\" + ((a) => a)");
    }

    #[test]
    fn test_reserved_names() {
        assert_eq!(js_name("new"), "new_");
        assert_eq!(js_name("shine"), "shine");
        assert_eq!(js_path("delete.all"), "delete_.all");
        assert_eq!(js_path("this.delete"), "this.delete");
    }
}
