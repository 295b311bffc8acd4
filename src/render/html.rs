use std::collections::HashSet;

use crate::ast::{BinaryOperator, Expression, LamiaType, LiteralValue, LoopKind, NodeKind, Widget};

use super::{attribute_name, comment_safe, escape_html, indent, kebab_case, template_body};

pub(crate) fn render(expr: &Expression) -> String {
    match &expr.kind {
        NodeKind::Program(statements) => join_nonempty(statements),
        NodeKind::Literal(value) => literal(value),
        NodeKind::Identifier(name) => escape_html(name),
        // String concatenation, including `${…}` interpolation, reads as joined text.
        NodeKind::BinaryOp {
            op: BinaryOperator::Add,
            lhs,
            rhs,
        } if expr.value_type == LamiaType::Radiant => format!("{}{}", render(lhs), render(rhs)),
        NodeKind::BinaryOp { op, lhs, rhs } => format!(
            "{} {} {}",
            render(lhs),
            escape_html(op.symbol()),
            render(rhs)
        ),
        NodeKind::UnaryOp { op, operand } => {
            format!("{}{}", escape_html(op.symbol()), render(operand))
        }
        NodeKind::WidgetCreation(widget) => widget_html(expr, widget),
        NodeKind::StyleApplication(style) => format!(
            "<style data-theme=\"{}\">\n{}\n</style>",
            escape_html(&style.theme),
            indent(&super::css::render(expr), 1)
        ),
        NodeKind::DataBinding(binding) => format!(
            "<span data-bind=\"{}\" data-bind-mode=\"{}\" data-node=\"{}\"></span>",
            escape_html(&binding.target),
            if binding.two_way { "two-way" } else { "one-way" },
            expr.id.0
        ),
        NodeKind::EventHandling(handler) => match &handler.target {
            Some(target) => comment(&format!("handle_touch: {} on {}", handler.event, target)),
            None => comment(&format!("handle_touch: {}", handler.event)),
        },
        NodeKind::Conditional(conditional) => {
            let condition = render(&conditional.condition);
            let mut out = template("data-when", &condition, &conditional.then_branch);
            if let Some(branch) = &conditional.otherwise {
                out.push('\n');
                out.push_str(&template("data-otherwise", &condition, branch));
            }
            out
        }
        NodeKind::Loop(lp) => {
            let subject = render(&lp.subject);
            match &lp.kind {
                LoopKind::While => template("data-while", &subject, &lp.body),
                LoopKind::Until => template("data-until", &subject, &lp.body),
                LoopKind::ForEach { item } => {
                    let each = format!("{} in {}", escape_html(item), subject);
                    template("data-each", &each, &lp.body)
                }
            }
        }
        NodeKind::FunctionDef(function) => comment(&format!("manifest: {}", function.name)),
        NodeKind::ClassDef(class) => comment(&format!("blueprint: {}", class.name)),
        NodeKind::Import(import) => comment(&format!("summon: {}", import.source)),
        NodeKind::Call(call) => comment(&format!("invoke: {}", call.callee)),
        NodeKind::Assignment(assignment) => comment(&format!("become: {}", assignment.target)),
        NodeKind::Return(_) => String::new(),
    }
}

fn literal(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Str(s) => escape_html(s),
        LiteralValue::Number(n) => n.clone(),
        LiteralValue::Bool(b) => b.to_string(),
        LiteralValue::Null => String::new(),
        LiteralValue::Template(raw) => escape_html(template_body(raw)),
        LiteralValue::Array(items) => format!(
            "[{}]",
            items.iter().map(render).collect::<Vec<_>>().join(", ")
        ),
    }
}

fn join_nonempty(nodes: &[Expression]) -> String {
    nodes
        .iter()
        .map(render)
        .filter(|html| !html.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn comment(text: &str) -> String {
    format!("<!-- {} -->", comment_safe(&escape_html(text), "--"))
}

fn template(attribute: &str, value: &str, body: &[Expression]) -> String {
    let inner = join_nonempty(body);
    if inner.is_empty() {
        format!("<template {}=\"{}\"></template>", attribute, value)
    } else {
        format!(
            "<template {}=\"{}\">\n{}\n</template>",
            attribute,
            value,
            indent(&inner, 1)
        )
    }
}

/// Text usable inside a double-quoted attribute.
fn attribute_value(expr: &Expression) -> String {
    match &expr.kind {
        NodeKind::WidgetCreation(widget) => escape_html(&widget.widget_type),
        _ => render(expr).replace('"', "&quot;"),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WIDGETS
// ═══════════════════════════════════════════════════════════════════════════════

/// Prefix for block keys whose attribute name is already taken on the element.
const COLLISION_PREFIX: &str = "data-lamia-";

fn widget_html(expr: &Expression, widget: &Widget) -> String {
    let mut classes = format!("lamia-widget {}", kebab_case(&widget.widget_type));
    let mut attributes = String::new();
    let mut taken: HashSet<String> = ["class", "data-theme", "data-node"]
        .iter()
        .map(|name| name.to_string())
        .collect();
    for attribute in &widget.attributes {
        let value = attribute_value(&attribute.value);
        if attribute.name == "class" {
            classes.push(' ');
            classes.push_str(&value);
            continue;
        }
        let name = unique_attribute_name(&attribute.name, &mut taken);
        attributes.push_str(&format!(" {}=\"{}\"", name, value));
    }

    let open = format!(
        "<div class=\"{}\" data-theme=\"{}\" data-node=\"{}\"{}>",
        classes,
        escape_html(&widget.theme),
        expr.id.0,
        attributes
    );

    let mut inner: Vec<String> = widget_body(widget).into_iter().collect();
    inner.extend(
        widget
            .children
            .iter()
            .map(render)
            .filter(|html| !html.is_empty()),
    );

    if inner.is_empty() {
        format!("{}</div>", open)
    } else {
        format!("{}\n{}\n</div>", open, indent(&inner.join("\n"), 1))
    }
}

/// HTML attribute names are case-insensitive, so uniqueness is checked lowercased.
fn unique_attribute_name(key: &str, taken: &mut HashSet<String>) -> String {
    let mut name = attribute_name(key).to_ascii_lowercase();
    while taken.contains(&name) {
        name = format!("{}{}", COLLISION_PREFIX, name);
    }
    taken.insert(name.clone());
    name
}

/// Semantic markup for the built-in widget types.
fn widget_body(widget: &Widget) -> Option<String> {
    let text = |name: &str| widget.attribute(name).map(render).unwrap_or_default();
    let body = match widget.widget_type.as_str() {
        "RADIANT_HEADING" => format!("<h1>{}</h1>", text("content")),
        "RADIANT_TEXT" => format!("<p>{}</p>", text("content")),
        "RADIANT_BUTTON" => {
            let action = widget
                .attribute("action")
                .map(|a| format!(" data-action=\"{}\"", attribute_value(a)))
                .unwrap_or_default();
            format!("<button type=\"button\"{}>{}</button>", action, text("content"))
        }
        "CONSTELLATION_LIST" => {
            let mut out = String::new();
            if let Some(title) = widget.attribute("title") {
                out.push_str(&format!("<h3>{}</h3>\n", render(title)));
            }
            let items: Vec<String> = match widget.attribute("items").map(|e| &e.kind) {
                Some(NodeKind::Literal(LiteralValue::Array(items))) => items
                    .iter()
                    .map(|item| format!("<li>{}</li>", render(item)))
                    .collect(),
                Some(_) => vec![format!("<li>{}</li>", text("items"))],
                None => Vec::new(),
            };
            if items.is_empty() {
                out.push_str("<ul></ul>");
            } else {
                out.push_str(&format!("<ul>\n{}\n</ul>", indent(&items.join("\n"), 1)));
            }
            out
        }
        "RADIANT_QUOTE" => {
            let mut out = format!("<blockquote>{}</blockquote>", text("content"));
            if let Some(attribution) = widget.attribute("attribution") {
                out.push_str(&format!("\n<cite>{}</cite>", render(attribution)));
            }
            out
        }
        "GCODE_BLOCK" => format!("<h4>G-Code Block</h4>\n<pre>{}</pre>", text("commands")),
        _ => return None,
    };
    Some(body)
}
