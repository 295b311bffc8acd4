#[cfg(test)]
mod tests {
    use crate::ast::{BinaryOperator, Expression, LamiaType, LiteralValue, NodeKind};
    use crate::parse::{parse_source, ParseResult};
    use crate::validate::{
        E_DUPLICATE_ATTRIBUTE, E_NESTING_TOO_DEEP, E_UNCLOSED_DELIMITER, E_UNMATCHED_CLOSER, E_UNTERMINATED,
        W_RETURN_OUTSIDE_MANIFEST, W_SKIPPED_TOKEN, W_UNKNOWN_ANNOTATION, W_UNKNOWN_TYPE,
        W_UNRECOGNIZED_CHARACTER,
    };

    fn codes(result: &ParseResult) -> Vec<&str> {
        result.diagnostics.iter().map(|d| d.code.as_str()).collect()
    }

    fn assigned_value(source: &str) -> Expression {
        let result = parse_source(source);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let root = result.root.unwrap();
        match &root.statements()[0].kind {
            NodeKind::Assignment(assignment) => (*assignment.value).clone(),
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // ROOT PRESENCE
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_empty_and_blank_sources_give_empty_program() {
        for source in ["", "   \n\n\t", "// just a comment\n"] {
            let result = parse_source(source);
            assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
            let root = result.root.expect("empty program");
            assert!(matches!(root.kind, NodeKind::Program(ref s) if s.is_empty()));
        }
    }

    #[test]
    fn test_lone_brace_has_no_root() {
        let result = parse_source("{");
        assert!(result.root.is_none());
        assert!(result.has_errors());
        let unclosed = result
            .errors()
            .find(|d| d.code == E_UNCLOSED_DELIMITER)
            .expect("unclosed delimiter");
        assert_eq!((unclosed.line, unclosed.column), (1, 1));
    }

    #[test]
    fn test_partial_tree_survives_errors() {
        let result = parse_source("create A { x: 1 }\n}");
        assert!(result.has_errors());
        assert!(codes(&result).contains(&E_UNMATCHED_CLOSER));
        let root = result.root.expect("recovered statements keep the root");
        assert_eq!(root.statements().len(), 1);
    }

    #[test]
    fn test_stray_otherwise_is_soft() {
        let result = parse_source("otherwise { }");
        assert!(!result.has_errors());
        assert!(codes(&result).contains(&W_SKIPPED_TOKEN));
        assert!(result.root.is_some());
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // DIAGNOSTICS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_duplicate_key_keeps_first_value() {
        let result = parse_source("create A { x: 1, x: 2 }");
        assert_eq!(codes(&result), vec![E_DUPLICATE_ATTRIBUTE]);
        let root = result.root.unwrap();
        let widget = root.statements()[0].as_widget().unwrap();
        assert_eq!(widget.keys().collect::<Vec<_>>(), vec!["x"]);
        assert!(matches!(
            widget.attribute("x").map(|e| &e.kind),
            Some(NodeKind::Literal(LiteralValue::Number(n))) if n == "1"
        ));
    }

    #[test]
    fn test_return_outside_manifest_is_soft() {
        let result = parse_source("return_light 1");
        assert_eq!(codes(&result), vec![W_RETURN_OUTSIDE_MANIFEST]);
        assert!(!result.has_errors());
        assert!(result.diagnostics[0].hint.contains("inside a manifest"));
    }

    #[test]
    fn test_unknown_annotation_and_type_are_soft() {
        let result = parse_source("@mystery\nmanifest f(a: sparkle) { }");
        assert!(!result.has_errors());
        let found = codes(&result);
        assert!(found.contains(&W_UNKNOWN_ANNOTATION));
        assert!(found.contains(&W_UNKNOWN_TYPE));

        let root = result.root.unwrap();
        let function = root.statements()[0].as_function().unwrap();
        assert_eq!(function.params[0].param_type, Some(LamiaType::Prism));
        assert_eq!(function.annotations, vec!["mystery".to_string()]);
    }

    #[test]
    fn test_unrecognized_character_is_skipped() {
        let result = parse_source("a § b");
        assert_eq!(codes(&result), vec![W_UNRECOGNIZED_CHARACTER]);
        assert_eq!(result.root.unwrap().statements().len(), 2);
    }

    #[test]
    fn test_unterminated_string_is_error_but_keeps_tree() {
        let result = parse_source("x = \"open");
        assert!(codes(&result).contains(&E_UNTERMINATED));
        let root = result.root.unwrap();
        assert!(matches!(root.statements()[0].kind, NodeKind::Assignment(_)));
    }

    #[test]
    fn test_diagnostics_are_sorted_by_position() {
        let result = parse_source("return_light 1\ncreate A { x: 1, x: 2 }\n@odd manifest g { }");
        assert_eq!(result.diagnostics.len(), 3);
        assert!(result
            .diagnostics
            .windows(2)
            .all(|pair| pair[0].location() <= pair[1].location()));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // SCOPE LINKS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_defined_in_points_at_enclosing_definition() {
        let result = parse_source("blueprint G {\n    manifest m { return_light 1 }\n}");
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let root = result.root.unwrap();
        let class_expr = &root.statements()[0];
        let NodeKind::ClassDef(class) = &class_expr.kind else {
            panic!("expected blueprint");
        };
        let method = &class.methods[0];
        assert_eq!(method.defined_in, Some(class_expr.id));
        let function = method.as_function().unwrap();
        assert_eq!(function.body[0].defined_in, Some(method.id));
        assert_eq!(class_expr.defined_in, None);
    }

    #[test]
    fn test_nested_widgets_in_expressions() {
        let result = parse_source("create PANEL { header: create RADIANT_HEADING { content: \"T\" } }");
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let root = result.root.unwrap();
        let panel = root.statements()[0].as_widget().unwrap();
        let header = panel.attribute("header").and_then(|e| e.as_widget()).unwrap();
        assert_eq!(header.widget_type, "RADIANT_HEADING");
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // INTERPOLATION AND LAYOUT
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_escaped_interpolation_stays_literal_text() {
        let value = assigned_value(r#"x = "${a} \${b}""#);
        let NodeKind::BinaryOp { op: BinaryOperator::Add, lhs, rhs } = &value.kind else {
            panic!("expected concatenation, got {:?}", value.kind);
        };
        assert!(matches!(&rhs.kind, NodeKind::Literal(LiteralValue::Str(s)) if s == " ${b}"));
        let NodeKind::BinaryOp { lhs: empty, rhs: a, .. } = &lhs.kind else {
            panic!("expected leading concatenation");
        };
        assert!(matches!(&empty.kind, NodeKind::Literal(LiteralValue::Str(s)) if s.is_empty()));
        assert!(matches!(&a.kind, NodeKind::Identifier(name) if name == "a"));
    }

    #[test]
    fn test_only_escaped_interpolation_is_plain_string() {
        let value = assigned_value(r#"x = "cost \${b}""#);
        assert!(matches!(&value.kind, NodeKind::Literal(LiteralValue::Str(s)) if s == "cost ${b}"));
    }

    #[test]
    fn test_double_backslash_does_not_escape_interpolation() {
        let value = assigned_value(r#"x = "\\${b}""#);
        let NodeKind::BinaryOp { lhs, rhs, .. } = &value.kind else {
            panic!("expected concatenation, got {:?}", value.kind);
        };
        assert!(matches!(&lhs.kind, NodeKind::Literal(LiteralValue::Str(s)) if s == "\\"));
        assert!(matches!(&rhs.kind, NodeKind::Identifier(name) if name == "b"));
    }

    #[test]
    fn test_value_may_start_on_the_next_line() {
        let result = parse_source("create CARD {\n    title:\n        \"A\"\n}\nstyle_with .x { color:\n \"red\" }");
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let root = result.root.unwrap();
        let card = root.statements()[0].as_widget().unwrap();
        assert!(matches!(
            card.attribute("title").map(|e| &e.kind),
            Some(NodeKind::Literal(LiteralValue::Str(s))) if s == "A"
        ));
    }

    #[test]
    fn test_deep_nesting_reports_instead_of_recursing() {
        let depth = 10_000;
        let source = format!("x = 1\ny = {}1{}", "(".repeat(depth), ")".repeat(depth));
        let result = parse_source(&source);
        assert!(codes(&result).contains(&E_NESTING_TOO_DEEP), "{:?}", codes(&result));
        let root = result.root.expect("earlier statement survives");
        assert_eq!(root.statements().len(), 1);
    }
}
