use crate::ast::{
    Attribute, BinaryOperator, Class, Conditional, Expression, Function, LamiaType, LiteralValue,
    Loop, LoopKind, NodeKind, Widget,
};

use super::{indent, needs_parens, quote, template_body};

pub(crate) fn render(expr: &Expression) -> String {
    match &expr.kind {
        NodeKind::Program(statements) => statements
            .iter()
            .map(statement)
            .collect::<Vec<_>>()
            .join("\n"),
        NodeKind::Literal(value) => literal(value),
        NodeKind::Identifier(name) => name.clone(),
        NodeKind::BinaryOp { op, lhs, rhs } => binary(*op, lhs, rhs),
        NodeKind::UnaryOp { op, operand } => match operand.kind {
            NodeKind::BinaryOp { .. } | NodeKind::UnaryOp { .. } => {
                format!("{}({})", op.symbol(), render(operand))
            }
            _ => format!("{}{}", op.symbol(), render(operand)),
        },
        NodeKind::WidgetCreation(widget) => widget_native(widget),
        NodeKind::StyleApplication(style) => format!(
            "LamiaTheme::Style({}).theme({}){}",
            quote(&style.selector),
            quote(&style.theme),
            setters(&style.properties)
        ),
        NodeKind::DataBinding(binding) => format!(
            "LamiaNative::{}({}, [&]() {{ return {}; }})",
            if binding.two_way { "sync" } else { "bind" },
            quote(&binding.target),
            render(&binding.source)
        ),
        NodeKind::EventHandling(handler) => match &handler.target {
            Some(target) => format!(
                "LamiaNative::on({}, {}, [&]() {})",
                quote(&handler.event),
                quote(target),
                block(&handler.body)
            ),
            None => format!(
                "LamiaNative::on({}, [&]() {})",
                quote(&handler.event),
                block(&handler.body)
            ),
        },
        NodeKind::Conditional(conditional) => conditional_native(conditional),
        NodeKind::Loop(lp) => loop_native(lp),
        NodeKind::FunctionDef(function) => function_native(function),
        NodeKind::ClassDef(class) => class_native(class),
        NodeKind::Import(import) => {
            let header = if import.source.ends_with(".hpp") || import.source.ends_with(".h") {
                import.source.clone()
            } else {
                format!("{}.hpp", import.source)
            };
            if import.names.is_empty() {
                format!("#include {}", quote(&header))
            } else {
                format!("#include {} // {}", quote(&header), import.names.join(", "))
            }
        }
        NodeKind::Return(Some(value)) => format!("return {};", render(value)),
        NodeKind::Return(None) => "return;".to_string(),
        NodeKind::Call(call) => format!("{}({})", call.callee, arguments(&call.args)),
        NodeKind::Assignment(assignment) => format!(
            "{} {} {}",
            assignment.target,
            assignment.op.symbol(),
            render(&assignment.value)
        ),
    }
}

/// Rendering inside a C++ block. Nested manifests become lambdas.
pub(crate) fn statement(expr: &Expression) -> String {
    match &expr.kind {
        NodeKind::FunctionDef(function) => lambda(function),
        NodeKind::Program(_)
        | NodeKind::Conditional(_)
        | NodeKind::Loop(_)
        | NodeKind::ClassDef(_)
        | NodeKind::Import(_)
        | NodeKind::Return(_) => render(expr),
        _ => format!("{};", render(expr)),
    }
}

fn block(statements: &[Expression]) -> String {
    if statements.is_empty() {
        return "{}".to_string();
    }
    let body = statements
        .iter()
        .map(statement)
        .collect::<Vec<_>>()
        .join("\n");
    format!("{{\n{}\n}}", indent(&body, 1))
}

fn arguments(args: &[Expression]) -> String {
    args.iter().map(render).collect::<Vec<_>>().join(", ")
}

fn literal(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Str(s) => format!("LamiaRadiant({})", quote(s)),
        LiteralValue::Number(n) => format!("LamiaShimmer({})", n),
        LiteralValue::Bool(b) => format!("LamiaLumina({})", b),
        LiteralValue::Null => "LamiaVoidStar()".to_string(),
        LiteralValue::Template(raw) => {
            format!("LamiaRadiant(R\"lamia({})lamia\")", template_body(raw))
        }
        LiteralValue::Array(items) => format!("LamiaConstellation{{{}}}", arguments(items)),
    }
}

fn binary(op: BinaryOperator, lhs: &Expression, rhs: &Expression) -> String {
    match op {
        BinaryOperator::Pipeline => {
            let input = render(lhs);
            match &rhs.kind {
                NodeKind::Identifier(name) => format!("{}({})", name, input),
                NodeKind::Call(call) if call.args.is_empty() => {
                    format!("{}({})", call.callee, input)
                }
                NodeKind::Call(call) => {
                    format!("{}({}, {})", call.callee, input, arguments(&call.args))
                }
                _ => format!("({})({})", render(rhs), input),
            }
        }
        BinaryOperator::Power => format!("std::pow({}, {})", render(lhs), render(rhs)),
        _ => {
            let side = |child: &Expression, is_rhs: bool| {
                let code = render(child);
                if needs_parens(op, child, is_rhs) {
                    format!("({})", code)
                } else {
                    code
                }
            };
            format!("{} {} {}", side(lhs, false), op.symbol(), side(rhs, true))
        }
    }
}

fn setters(attributes: &[Attribute]) -> String {
    attributes
        .iter()
        .map(|a| format!(".set({}, {})", quote(&a.name), render(&a.value)))
        .collect()
}

fn widget_native(widget: &Widget) -> String {
    let mut code = format!(
        "LamiaNative::Widget({}).theme({}){}",
        quote(&widget.widget_type),
        quote(&widget.theme),
        setters(&widget.attributes)
    );
    for child in &widget.children {
        code.push_str(&format!(".child({})", render(child)));
    }
    code
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTROL FLOW
// ═══════════════════════════════════════════════════════════════════════════════

fn conditional_native(conditional: &Conditional) -> String {
    let mut code = format!(
        "if ({}) {}",
        render(&conditional.condition),
        block(&conditional.then_branch)
    );
    match conditional.otherwise.as_deref() {
        Some([nested]) if matches!(nested.kind, NodeKind::Conditional(_)) => {
            code.push_str(&format!(" else {}", render(nested)));
        }
        Some(branch) => code.push_str(&format!(" else {}", block(branch))),
        None => {}
    }
    code
}

fn loop_native(lp: &Loop) -> String {
    let subject = render(&lp.subject);
    match &lp.kind {
        LoopKind::While => format!("while ({}) {}", subject, block(&lp.body)),
        LoopKind::Until => format!("do {} while (!({}));", block(&lp.body), subject),
        LoopKind::ForEach { item } => {
            format!("for (auto& {} : {}) {}", item, subject, block(&lp.body))
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FUNCTIONS AND CLASSES
// ═══════════════════════════════════════════════════════════════════════════════

fn cpp_type(lamia_type: Option<LamiaType>) -> &'static str {
    match lamia_type {
        Some(LamiaType::Radiant) => "std::string",
        Some(LamiaType::Shimmer) => "double",
        Some(LamiaType::Lumina) => "bool",
        Some(LamiaType::VoidStar) => "void",
        Some(LamiaType::Constellation) => "std::vector<LamiaValue>",
        Some(LamiaType::Nebula) => "std::map<std::string, LamiaValue>",
        Some(LamiaType::Widget) => "LamiaNative::Widget",
        _ => "LamiaValue",
    }
}

fn parameters(function: &Function) -> String {
    function
        .params
        .iter()
        .map(|p| format!("{} {}", cpp_type(p.param_type), p.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn annotation_comments(function: &Function) -> Vec<String> {
    function
        .annotations
        .iter()
        .filter(|a| a.as_str() != "startup")
        .map(|a| format!("// @{}", a))
        .collect()
}

fn return_type(function: &Function) -> &'static str {
    match function.return_type {
        None => "auto",
        some => cpp_type(some),
    }
}

fn function_native(function: &Function) -> String {
    let mut lines = annotation_comments(function);
    lines.push(format!(
        "{} {}({}) {}",
        return_type(function),
        function.name,
        parameters(function),
        block(&function.body)
    ));
    if function.has_annotation("startup") {
        lines.push(format!(
            "static const bool {name}_registered = LamiaNative::on_startup({name});",
            name = function.name
        ));
    }
    lines.join("\n")
}

fn lambda(function: &Function) -> String {
    let arrow = match function.return_type {
        None => String::new(),
        some => format!(" -> {}", cpp_type(some)),
    };
    let mut lines = annotation_comments(function);
    lines.push(format!(
        "auto {} = [&]({}){} {};",
        function.name,
        parameters(function),
        arrow,
        block(&function.body)
    ));
    if function.has_annotation("startup") {
        lines.push(format!("LamiaNative::on_startup({});", function.name));
    }
    lines.join("\n")
}

fn class_native(class: &Class) -> String {
    let head = match &class.base {
        Some(base) => format!("struct {} : public {}", class.name, base),
        None => format!("struct {}", class.name),
    };
    let members: Vec<String> = class
        .methods
        .iter()
        .filter_map(Expression::as_function)
        .map(|method| {
            let mut lines = annotation_comments(method);
            lines.push(format!(
                "{} {}({}) {}",
                return_type(method),
                method.name,
                parameters(method),
                block(&method.body)
            ));
            lines.join("\n")
        })
        .collect();
    if members.is_empty() {
        return format!("{} {{}};", head);
    }
    format!("{} {{\n{}\n}};", head, indent(&members.join("\n\n"), 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpp_types() {
        assert_eq!(cpp_type(Some(LamiaType::Radiant)), "std::string");
        assert_eq!(cpp_type(Some(LamiaType::Prism)), "LamiaValue");
        assert_eq!(cpp_type(None), "LamiaValue");
    }

    #[test]
    fn test_template_uses_raw_string() {
        let raw = LiteralValue::Template("`a \"b\"`".to_string());
        assert_eq!(literal(&raw), "LamiaRadiant(R\"lamia(a \"b\")lamia\")");
    }
}
