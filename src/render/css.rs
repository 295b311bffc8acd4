use crate::ast::{Attribute, BinaryOperator, Expression, LiteralValue, NodeKind, Widget};

use super::{attribute_name, comment_safe, indent, kebab_case, quote, template_body};

pub(crate) fn render(expr: &Expression) -> String {
    match &expr.kind {
        NodeKind::Program(statements) => rules(statements),
        NodeKind::Literal(value) => literal(value),
        NodeKind::Identifier(name) => name.clone(),
        NodeKind::BinaryOp { op, lhs, rhs } => match op {
            BinaryOperator::Add
            | BinaryOperator::Subtract
            | BinaryOperator::Multiply
            | BinaryOperator::Divide => {
                format!("calc({} {} {})", render(lhs), op.symbol(), render(rhs))
            }
            _ => format!("{} {} {}", render(lhs), op.symbol(), render(rhs)),
        },
        NodeKind::UnaryOp { op, operand } => format!("{}{}", op.symbol(), render(operand)),
        NodeKind::WidgetCreation(widget) => widget_css(widget),
        NodeKind::StyleApplication(style) => {
            rule(&style.selector, &declarations(&style.properties, ""))
        }
        NodeKind::Conditional(conditional) => {
            let mut body: Vec<Expression> = conditional.then_branch.clone();
            body.extend(conditional.otherwise.iter().flatten().cloned());
            rules(&body)
        }
        NodeKind::Loop(lp) => rules(&lp.body),
        NodeKind::FunctionDef(function) => comment(&format!("manifest: {}", function.name)),
        NodeKind::ClassDef(class) => comment(&format!("blueprint: {}", class.name)),
        NodeKind::Import(import) => comment(&format!("summon: {}", import.source)),
        NodeKind::DataBinding(_)
        | NodeKind::EventHandling(_)
        | NodeKind::Return(_)
        | NodeKind::Call(_)
        | NodeKind::Assignment(_) => String::new(),
    }
}

fn literal(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Str(s) => s.clone(),
        LiteralValue::Number(n) => n.clone(),
        LiteralValue::Bool(b) => b.to_string(),
        LiteralValue::Null => "none".to_string(),
        LiteralValue::Template(raw) => template_body(raw).to_string(),
        LiteralValue::Array(items) => format!(
            "[{}]",
            items.iter().map(render).collect::<Vec<_>>().join(", ")
        ),
    }
}

fn rules(nodes: &[Expression]) -> String {
    nodes
        .iter()
        .map(render)
        .filter(|css| !css.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn comment(text: &str) -> String {
    format!("/* {} */", comment_safe(text, "*/"))
}

fn rule(selector: &str, body: &[String]) -> String {
    if body.is_empty() {
        format!("{} {{}}", selector)
    } else {
        format!("{} {{\n{}\n}}", selector, indent(&body.join("\n"), 1))
    }
}

/// Declaration value; a widget used as a value names its type.
fn value(expr: &Expression) -> String {
    match &expr.kind {
        NodeKind::WidgetCreation(widget) => quote(&widget.widget_type),
        _ => render(expr),
    }
}

fn declarations(properties: &[Attribute], prefix: &str) -> Vec<String> {
    properties
        .iter()
        .map(|p| format!("{}{}: {};", prefix, attribute_name(&p.name), value(&p.value)))
        .collect()
}

fn widget_css(widget: &Widget) -> String {
    let selector = format!(
        ".{}[data-theme={}]",
        kebab_case(&widget.widget_type),
        quote(&widget.theme)
    );
    let mut out = rule(&selector, &declarations(&widget.attributes, "--lamia-"));
    let children = rules(&widget.children);
    if !children.is_empty() {
        out.push_str("\n\n");
        out.push_str(&children);
    }
    out
}
