#[cfg(test)]
mod tests {
    use html5ever::tendril::TendrilSink;
    use markup5ever_rcdom::{Handle, NodeData, RcDom};
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    use crate::codegen::{transpile, Target, COMPILATION_FAILED};
    use crate::parse::parse_source;

    const APP: &str = r#"summon Card, Panel from "./widgets"
summon "./theme"

@startup
manifest boot(limit: shimmer) -> radiant {
    count = 0
    while_shining count < limit {
        become count += 1
    }
    when count == limit {
        return_light "Ready after ${count} steps"
    } otherwise when count > limit {
        return_light "overshot"
    } otherwise {
        return_light `stopped at ${count}`
    }
}

blueprint Greeter inherit_essence Base {
    manifest greet(name: radiant) -> radiant {
        return_light "Hello, " + name
    }
    manifest shout(name) {
        return_light greet(name) ~> upper
    }
}

create RADIANT_HEADING { content: "Welcome" }
create CONSTELLATION_LIST { title: "Stars", items: ["Vega", "Deneb", 2 ** 3] }
create CARD {
    theme: "midnight"
    title: "Profile"
    create RADIANT_BUTTON { content: "Save", action: "save" }
}

style_with .card { color: "purple", font-size: 14 }
bind_data user.name: profile.name
bind_data form.email <~> user.email
handle_touch click on button.submit {
    invoke boot(3)
}
for_each_star star in ["a", "b"] {
    invoke shine(star)
}
until_dark done {
    become done = not done
}
total = [1, 2, 3] ~> sum
"#;

    fn parses_as_js(code: &str, typescript: bool) -> Result<(), Vec<String>> {
        let allocator = Allocator::default();
        let source_type = SourceType::default()
            .with_module(true)
            .with_typescript(typescript);
        let ret = Parser::new(&allocator, code, source_type).parse();
        if ret.errors.is_empty() {
            Ok(())
        } else {
            Err(ret.errors.iter().map(|e| e.to_string()).collect())
        }
    }

    fn parse_html(html: &str) -> RcDom {
        html5ever::parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())
            .unwrap()
    }

    fn find_elements(handle: &Handle, tag: &str, class: &str, out: &mut Vec<Handle>) {
        if let NodeData::Element { name, attrs, .. } = &handle.data {
            let has_class = attrs.borrow().iter().any(|a| {
                a.name.local.to_string() == "class"
                    && a.value.split_whitespace().any(|c| c == class)
            });
            if name.local.to_string() == tag && has_class {
                out.push(handle.clone());
            }
        }
        for child in handle.children.borrow().iter() {
            find_elements(child, tag, class, out);
        }
    }

    fn attribute_value(handle: &Handle, wanted: &str) -> Option<String> {
        match &handle.data {
            NodeData::Element { attrs, .. } => attrs
                .borrow()
                .iter()
                .find(|a| a.name.local.to_string() == wanted)
                .map(|a| a.value.to_string()),
            _ => None,
        }
    }

    fn attribute_names(handle: &Handle) -> Vec<String> {
        match &handle.data {
            NodeData::Element { attrs, .. } => attrs
                .borrow()
                .iter()
                .map(|a| a.name.local.to_string())
                .collect(),
            _ => Vec::new(),
        }
    }

    fn compile(source: &str, target: Target) -> String {
        let result = parse_source(source);
        transpile(result.root.as_ref(), target)
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // SCRIPT TARGETS PARSE
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_sample_app_is_clean() {
        let result = parse_source(APP);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn test_es6_output_parses() {
        let code = compile(APP, Target::Es6);
        if let Err(errors) = parses_as_js(&code, false) {
            panic!("ES6 output failed to parse: {:?}\n{}", errors, code);
        }
        assert!(code.contains("class Greeter extends Base"));
        assert!(code.contains("document.addEventListener(\"DOMContentLoaded\", boot);"));
    }

    #[test]
    fn test_es5_output_parses() {
        let code = compile(APP, Target::Es5);
        if let Err(errors) = parses_as_js(&code, false) {
            panic!("ES5 output failed to parse: {:?}\n{}", errors, code);
        }
        assert!(code.contains("\"use strict\";"));
        assert!(code.contains("Math.pow(2, 3)"));
        assert!(!code.contains("=>"));
        assert!(!code.contains('`'));
        assert!(!code.contains("class "));
    }

    #[test]
    fn test_typescript_output_parses() {
        let code = compile(APP, Target::TypeScript);
        if let Err(errors) = parses_as_js(&code, true) {
            panic!("TypeScript output failed to parse: {:?}\n{}", errors, code);
        }
        assert!(code.contains("from '@lamia/runtime';"));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // ATTRIBUTES
    // ═══════════════════════════════════════════════════════════════════════════════

    const KEYED: &str = "create CARD { title: \"A\", \"data-x\": 1, font-size: 2 }";

    #[test]
    fn test_html_attributes_match_block_keys() {
        let html = compile(KEYED, Target::Html5);
        let dom = parse_html(&html);
        let mut cards = Vec::new();
        find_elements(&dom.document, "div", "card", &mut cards);
        assert_eq!(cards.len(), 1, "{}", html);

        let names: Vec<String> = attribute_names(&cards[0])
            .into_iter()
            .filter(|n| !["class", "data-theme", "data-node"].contains(&n.as_str()))
            .collect();
        assert_eq!(names, vec!["title", "data-x", "font-size"]);
    }

    #[test]
    fn test_colliding_attribute_names_stay_distinct() {
        let source = r#"create CARD { "data-theme": "x", "a b": 1, a-b: 2, "Title": 3, title: 4 }"#;
        let html = compile(source, Target::Html5);
        let dom = parse_html(&html);
        let mut cards = Vec::new();
        find_elements(&dom.document, "div", "card", &mut cards);
        assert_eq!(cards.len(), 1, "{}", html);

        let names = attribute_names(&cards[0]);
        let unique: std::collections::HashSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), names.len(), "{:?}", names);
        // Scaffold plus one attribute per block key.
        assert_eq!(names.len(), 3 + 5, "{:?}", names);

        assert_eq!(attribute_value(&cards[0], "data-theme").as_deref(), Some("medusa-default"));
        assert_eq!(attribute_value(&cards[0], "data-lamia-data-theme").as_deref(), Some("x"));
        assert_eq!(attribute_value(&cards[0], "a-b").as_deref(), Some("1"));
        assert_eq!(attribute_value(&cards[0], "data-lamia-a-b").as_deref(), Some("2"));
        assert_eq!(attribute_value(&cards[0], "title").as_deref(), Some("3"));
        assert_eq!(attribute_value(&cards[0], "data-lamia-title").as_deref(), Some("4"));
    }

    #[test]
    fn test_js_object_keys_are_quoted_when_needed() {
        let code = compile(KEYED, Target::Es6);
        assert!(code.contains("{ title: \"A\", \"data-x\": 1, \"font-size\": 2 }"), "{}", code);
        assert!(parses_as_js(&code, false).is_ok());
    }

    #[test]
    fn test_nested_arrays_keep_their_shape() {
        let source = "create CARD { items: [1, 2, [3, 4]] }";
        let html = compile(source, Target::Html5);
        assert!(html.contains("items=\"[1, 2, [3, 4]]\""), "{}", html);
        let js = compile(source, Target::Es6);
        assert!(js.contains("items: [1, 2, [3, 4]]"), "{}", js);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // WIDGETS AND FUNCTIONS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_radiant_text_renders_paragraph() {
        let source = "create RADIANT_TEXT { content: \"Hi\" }";
        let html = compile(source, Target::Html5);
        assert!(html.contains("<p>Hi</p>"), "{}", html);
        assert!(html.contains("radiant-text"));

        let js = compile(source, Target::Es6);
        assert!(js.contains("content: \"Hi\""), "{}", js);
        assert!(js.contains("LamiaApp.mount("));
    }

    #[test]
    fn test_interpolated_text_renders_without_operators() {
        let html = compile("create RADIANT_TEXT { content: \"Hello ${user}!\" }", Target::Html5);
        assert!(html.contains("<p>Hello user!</p>"), "{}", html);

        let sum = compile("create RADIANT_TEXT { content: 1 + 2 }", Target::Html5);
        assert!(sum.contains("<p>1 + 2</p>"), "{}", sum);
    }

    #[test]
    fn test_html_document_structure() {
        let html = compile(APP, Target::Html5);
        let dom = parse_html(&html);
        let mut apps = Vec::new();
        find_elements(&dom.document, "div", "lamia-app", &mut apps);
        assert_eq!(apps.len(), 1);
        let mut lists = Vec::new();
        find_elements(&dom.document, "div", "constellation-list", &mut lists);
        assert_eq!(lists.len(), 1);
        assert!(html.contains("<li>Vega</li>"));
        assert!(html.contains("data-action=\"save\""));
    }

    #[test]
    fn test_manifest_becomes_function() {
        let code = compile("manifest greet() { return_light \"hello\" }", Target::Es6);
        assert!(code.contains("function greet()"), "{}", code);
        assert!(code.contains("return \"hello\";"));
    }

    #[test]
    fn test_manifest_with_return_type_in_script_targets() {
        let source = "manifest greet -> radiant { return_light \"hello\" }";
        assert!(parse_source(source).diagnostics.is_empty());
        for (target, typescript) in [(Target::Es6, false), (Target::TypeScript, true)] {
            let code = compile(source, target);
            assert!(code.contains("function greet("), "{}", code);
            assert!(code.contains("return \"hello\";"), "{}", code);
            if let Err(errors) = parses_as_js(&code, typescript) {
                panic!("{} output failed to parse: {:?}\n{}", target, errors, code);
            }
        }
    }

    #[test]
    fn test_reserved_word_names_are_renamed() {
        let source = "manifest delete(new, class) { return_light new + class }\ninvoke delete(1, 2)";
        for target in [Target::Es6, Target::Es5, Target::TypeScript] {
            let code = compile(source, target);
            if let Err(errors) = parses_as_js(&code, target == Target::TypeScript) {
                panic!("{} output failed to parse: {:?}\n{}", target, errors, code);
            }
            assert!(code.contains("delete_("), "{}", code);
        }
    }

    #[test]
    fn test_es5_template_expressions_are_lowered() {
        let code = compile("x = `area ${2 ** 3} of ${shape}`", Target::Es5);
        assert!(code.contains("\"area \" + (Math.pow(2, 3)) + \" of \" + (shape)"), "{}", code);
        assert!(parses_as_js(&code, false).is_ok(), "{}", code);
    }

    #[test]
    fn test_native_output_has_entry_point() {
        let code = compile(APP, Target::Native);
        assert!(code.contains("int main()"), "{}", code);
        assert!(code.contains("struct Greeter : public Base"));
        assert!(code.contains("std::pow(LamiaShimmer(2), LamiaShimmer(3))"));
        assert!(code.contains("#include \"./widgets.hpp\""));
    }

    #[test]
    fn test_css_output_has_style_and_theme_rules() {
        let css = compile(APP, Target::Css3);
        assert!(css.starts_with("@import url('lamia-base-theme.css');"), "{}", css);
        assert!(css.contains(".card {\n    color: purple;\n    font-size: 14;\n}"), "{}", css);
        assert!(css.contains(".card[data-theme=\"midnight\"]"));
    }

    #[test]
    fn test_unrecoverable_source_fails_every_target() {
        for target in Target::ALL {
            assert_eq!(compile("{", target), COMPILATION_FAILED);
        }
    }
}
