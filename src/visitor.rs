use crate::ast::{Class, Expression, Function, NodeKind, Widget};

/// The AstVisitor trait is the single traversal mechanism for Lamia trees.
///
/// Rules:
/// 1. Traversal order is source order.
/// 2. Implementers override `visit_*` methods to add behavior.
/// 3. Implementers call the matching `walk_*` function to continue traversal
///    unless pruning is intended.
pub trait AstVisitor {
    fn visit_expression(&mut self, expr: &Expression) {
        walk_expression(self, expr);
    }

    fn visit_widget(&mut self, _expr: &Expression, widget: &Widget) {
        walk_widget(self, widget);
    }

    fn visit_function(&mut self, _expr: &Expression, function: &Function) {
        walk_function(self, function);
    }

    fn visit_class(&mut self, _expr: &Expression, class: &Class) {
        walk_class(self, class);
    }
}

pub fn walk_expression<V: AstVisitor + ?Sized>(visitor: &mut V, expr: &Expression) {
    match &expr.kind {
        NodeKind::WidgetCreation(widget) => visitor.visit_widget(expr, widget),
        NodeKind::FunctionDef(function) => visitor.visit_function(expr, function),
        NodeKind::ClassDef(class) => visitor.visit_class(expr, class),
        _ => {
            for child in expr.children() {
                visitor.visit_expression(child);
            }
        }
    }
}

pub fn walk_widget<V: AstVisitor + ?Sized>(visitor: &mut V, widget: &Widget) {
    for attribute in &widget.attributes {
        visitor.visit_expression(&attribute.value);
    }
    for child in &widget.children {
        visitor.visit_expression(child);
    }
}

pub fn walk_function<V: AstVisitor + ?Sized>(visitor: &mut V, function: &Function) {
    for statement in &function.body {
        visitor.visit_expression(statement);
    }
}

pub fn walk_class<V: AstVisitor + ?Sized>(visitor: &mut V, class: &Class) {
    for method in &class.methods {
        visitor.visit_expression(method);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STOCK VISITORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Counts nodes per kind; used for compilation statistics.
#[derive(Debug, Default)]
pub struct NodeCounter {
    pub total: usize,
    pub widgets: usize,
    pub manifests: usize,
    pub blueprints: usize,
}

impl AstVisitor for NodeCounter {
    fn visit_expression(&mut self, expr: &Expression) {
        self.total += 1;
        walk_expression(self, expr);
    }

    fn visit_widget(&mut self, _expr: &Expression, widget: &Widget) {
        self.widgets += 1;
        walk_widget(self, widget);
    }

    fn visit_function(&mut self, _expr: &Expression, function: &Function) {
        self.manifests += 1;
        walk_function(self, function);
    }

    fn visit_class(&mut self, _expr: &Expression, class: &Class) {
        self.blueprints += 1;
        walk_class(self, class);
    }
}

pub fn count_nodes(root: &Expression) -> NodeCounter {
    let mut counter = NodeCounter::default();
    counter.visit_expression(root);
    counter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::parse::parse;

    #[test]
    fn test_counter_matches_node_count() {
        let source = r#"
create CARD {
    title: "A"
    create RADIANT_TEXT { content: 1 + 2 }
}
blueprint Greeter {
    manifest hello(name) { return_light name }
}
"#;
        let root = parse(&tokenize(source)).root.unwrap();
        let counter = count_nodes(&root);
        assert_eq!(counter.total, root.node_count());
        assert_eq!(counter.widgets, 2);
        assert_eq!(counter.manifests, 1);
        assert_eq!(counter.blueprints, 1);
    }
}
