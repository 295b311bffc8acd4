//! Codegen module for the Lamia compiler
//!
//! Wraps the per-node renderings in the document scaffolding of each target.
//! Dispatch is a closed table of `(Target, formatter)` pairs; a new target is
//! one enum variant, one table entry and one formatter.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ast::{Expression, NodeKind};
use crate::error::LamiaError;
use crate::render::{escape_html, indent, js_expression, js_statement, native_statement, JsFlavor};

/// Output of every target when no AST root was produced.
pub const COMPILATION_FAILED: &str = "// Compilation failed";

pub const RUNTIME_MODULE: &str = "@lamia/runtime";
pub const BASE_THEME_STYLESHEET: &str = "lamia-base-theme.css";
pub const NATIVE_RUNTIME_HEADER: &str = "lamia_native_runtime.hpp";

// ═══════════════════════════════════════════════════════════════════════════════
// TARGETS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Html5,
    Es6,
    Es5,
    TypeScript,
    Css3,
    Native,
    Wasm,
}

impl Target {
    pub const ALL: [Target; 7] = [
        Target::Html5,
        Target::Es6,
        Target::Es5,
        Target::TypeScript,
        Target::Css3,
        Target::Native,
        Target::Wasm,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Target::Html5 => "html5",
            Target::Es6 => "es6",
            Target::Es5 => "es5",
            Target::TypeScript => "typescript",
            Target::Css3 => "css3",
            Target::Native => "native",
            Target::Wasm => "wasm",
        }
    }

    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Target::Html5 => "html",
            Target::Es6 => "js",
            Target::Es5 => "es5.js",
            Target::TypeScript => "ts",
            Target::Css3 => "css",
            Target::Native => "cpp",
            Target::Wasm => "wasm",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Target {
    type Err = LamiaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" | "html5" => Ok(Target::Html5),
            "js" | "es6" | "javascript" => Ok(Target::Es6),
            "es5" => Ok(Target::Es5),
            "ts" | "typescript" => Ok(Target::TypeScript),
            "css" | "css3" => Ok(Target::Css3),
            "native" | "cpp" | "c++" => Ok(Target::Native),
            "wasm" => Ok(Target::Wasm),
            _ => Err(LamiaError::UnknownTarget(s.to_string())),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodegenOptions {
    pub title: String,
    pub stylesheet_href: String,
    pub script_src: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            title: "Lamia Application".to_string(),
            stylesheet_href: "lamia-theme.css".to_string(),
            script_src: "app.js".to_string(),
        }
    }
}

impl CodegenOptions {
    /// Stable text mixed into cache keys.
    pub fn fingerprint(&self) -> String {
        format!("{}\u{1f}{}\u{1f}{}", self.title, self.stylesheet_href, self.script_src)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISPATCH
// ═══════════════════════════════════════════════════════════════════════════════

type Formatter = fn(&Expression, &CodegenOptions) -> String;

static DISPATCH: [(Target, Formatter); 7] = [
    (Target::Html5, format_html5 as Formatter),
    (Target::Es6, format_es6 as Formatter),
    (Target::Es5, format_es5 as Formatter),
    (Target::TypeScript, format_typescript as Formatter),
    (Target::Css3, format_css3 as Formatter),
    (Target::Native, format_native as Formatter),
    (Target::Wasm, format_wasm as Formatter),
];

pub fn transpile(root: Option<&Expression>, target: Target) -> String {
    transpile_with(root, target, &CodegenOptions::default())
}

pub fn transpile_with(root: Option<&Expression>, target: Target, options: &CodegenOptions) -> String {
    let Some(root) = root else {
        return COMPILATION_FAILED.to_string();
    };
    DISPATCH
        .iter()
        .find(|(t, _)| *t == target)
        .map(|(_, formatter)| formatter(root, options))
        .unwrap_or_else(|| COMPILATION_FAILED.to_string())
}

fn is_import(expr: &Expression) -> bool {
    matches!(expr.kind, NodeKind::Import(_))
}

fn is_widget(expr: &Expression) -> bool {
    matches!(expr.kind, NodeKind::WidgetCreation(_))
}

// ═══════════════════════════════════════════════════════════════════════════════
// FORMATTERS
// ═══════════════════════════════════════════════════════════════════════════════

fn format_html5(root: &Expression, options: &CodegenOptions) -> String {
    let body = root.to_html();
    let app = if body.is_empty() {
        "<div class=\"lamia-app\"></div>".to_string()
    } else {
        format!("<div class=\"lamia-app\">\n{}\n</div>", indent(&body, 1))
    };
    let lines = [
        "<!DOCTYPE html>".to_string(),
        "<html lang=\"en\">".to_string(),
        "<head>".to_string(),
        indent("<meta charset=\"UTF-8\">", 1),
        indent(
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">",
            1,
        ),
        indent(&format!("<title>{}</title>", escape_html(&options.title)), 1),
        indent(
            &format!(
                "<link rel=\"stylesheet\" href=\"{}\">",
                escape_html(&options.stylesheet_href)
            ),
            1,
        ),
        "</head>".to_string(),
        "<body>".to_string(),
        indent(&app, 1),
        indent(
            &format!(
                "<script type=\"module\" src=\"{}\"></script>",
                escape_html(&options.script_src)
            ),
            1,
        ),
        "</body>".to_string(),
        "</html>".to_string(),
    ];
    format!("{}\n", lines.join("\n"))
}

/// Hoisted imports, then the body with top-level widgets mounted.
fn js_sections(root: &Expression, flavor: JsFlavor) -> (Vec<String>, Vec<String>) {
    let statements = root.statements();
    let imports = statements
        .iter()
        .filter(|s| is_import(s))
        .map(|s| js_statement(s, flavor))
        .collect();
    let body = statements
        .iter()
        .filter(|s| !is_import(s))
        .map(|s| {
            if is_widget(s) {
                format!("LamiaApp.mount({});", js_expression(s, flavor))
            } else {
                js_statement(s, flavor)
            }
        })
        .collect();
    (imports, body)
}

fn es6_module(root: &Expression) -> String {
    let (imports, body) = js_sections(root, JsFlavor::Es6);
    let mut sections = Vec::new();
    if !imports.is_empty() {
        sections.push(imports.join("\n"));
    }
    if !body.is_empty() {
        sections.push(body.join("\n"));
    }
    sections.join("\n\n")
}

fn format_es6(root: &Expression, _options: &CodegenOptions) -> String {
    let module = es6_module(root);
    if module.is_empty() {
        return "// Generated by the Lamia compiler (ES6)\n".to_string();
    }
    format!("// Generated by the Lamia compiler (ES6)\n\n{}\n", module)
}

fn format_typescript(root: &Expression, _options: &CodegenOptions) -> String {
    let prologue = format!(
        "import {{ LamiaApp, LamiaWidget, LamiaTheme, LamiaBinding, LamiaEvents }} from '{}';",
        RUNTIME_MODULE
    );
    let module = es6_module(root);
    let mut out = format!("// Generated by the Lamia compiler (TypeScript)\n{}\n", prologue);
    if !module.is_empty() {
        out.push('\n');
        out.push_str(&module);
        out.push('\n');
    }
    out
}

fn format_es5(root: &Expression, _options: &CodegenOptions) -> String {
    let (imports, body) = js_sections(root, JsFlavor::Es5);
    let mut inner = vec!["\"use strict\";".to_string()];
    inner.extend(imports);
    inner.extend(body);
    format!(
        "// Generated by the Lamia compiler (ES5)\n(function () {{\n{}\n}})();\n",
        indent(&inner.join("\n"), 1)
    )
}

fn format_css3(root: &Expression, _options: &CodegenOptions) -> String {
    let rules = root.to_css();
    let prelude = format!("@import url('{}');", BASE_THEME_STYLESHEET);
    if rules.is_empty() {
        format!("{}\n", prelude)
    } else {
        format!("{}\n\n{}\n", prelude, rules)
    }
}

fn format_native(root: &Expression, _options: &CodegenOptions) -> String {
    let statements = root.statements();
    let mut includes = vec![format!("#include \"{}\"", NATIVE_RUNTIME_HEADER)];
    let mut definitions = Vec::new();
    let mut main_body = vec!["LamiaNative::Application app;".to_string()];

    for statement in statements {
        match &statement.kind {
            NodeKind::Import(_) => includes.push(statement.to_native()),
            NodeKind::FunctionDef(_) | NodeKind::ClassDef(_) => {
                definitions.push(statement.to_native())
            }
            NodeKind::WidgetCreation(_) => {
                main_body.push(format!("app.mount({});", statement.to_native()))
            }
            _ => main_body.push(native_statement(statement)),
        }
    }
    main_body.push("return app.run();".to_string());

    let mut sections = vec![
        "// Generated by the Lamia compiler (C++)".to_string(),
        includes.join("\n"),
    ];
    if !definitions.is_empty() {
        sections.push(definitions.join("\n\n"));
    }
    sections.push(format!(
        "int main() {{\n{}\n}}",
        indent(&main_body.join("\n"), 1)
    ));
    format!("{}\n", sections.join("\n\n"))
}

/// Placeholder text format; WebAssembly code generation is not implemented.
fn format_wasm(root: &Expression, _options: &CodegenOptions) -> String {
    let exports: Vec<String> = root
        .statements()
        .iter()
        .filter_map(Expression::as_function)
        .map(|f| format!(";; manifest {}", f.signature()))
        .collect();
    let mut out = String::from(";; Generated by the Lamia compiler (WebAssembly text placeholder)\n");
    if exports.is_empty() {
        out.push_str("(module)\n");
    } else {
        out.push_str(&format!("(module\n{}\n)\n", indent(&exports.join("\n"), 1)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_source;

    #[test]
    fn test_missing_root_gives_sentinel_for_every_target() {
        for target in Target::ALL {
            assert_eq!(transpile(None, target), COMPILATION_FAILED);
        }
    }

    #[test]
    fn test_every_target_is_dispatched() {
        let root = parse_source("create RADIANT_TEXT { content: \"Hi\" }").root.unwrap();
        for target in Target::ALL {
            assert_ne!(transpile(Some(&root), target), COMPILATION_FAILED, "{}", target);
        }
    }

    #[test]
    fn test_target_names_parse_back() {
        for target in Target::ALL {
            assert_eq!(target.name().parse::<Target>().unwrap(), target);
        }
        assert_eq!("c++".parse::<Target>().unwrap(), Target::Native);
        assert_eq!("JS".parse::<Target>().unwrap(), Target::Es6);
        assert!("cobol".parse::<Target>().is_err());
    }

    #[test]
    fn test_extensions() {
        assert_eq!(Target::Es5.extension(), "es5.js");
        assert_eq!(Target::TypeScript.extension(), "ts");
        assert_eq!(Target::Native.extension(), "cpp");
    }

    #[test]
    fn test_es6_hoists_imports_and_mounts_widgets() {
        let root = parse_source("create RADIANT_TEXT { content: \"Hi\" }\nsummon Card from \"./card\"")
            .root
            .unwrap();
        let js = transpile(Some(&root), Target::Es6);
        let import_at = js.find("import { Card } from \"./card\";").unwrap();
        let mount_at = js.find("LamiaApp.mount(LamiaWidget.create(\"RADIANT_TEXT\"").unwrap();
        assert!(import_at < mount_at);
    }

    #[test]
    fn test_wasm_lists_manifests() {
        let root = parse_source("manifest greet(who: radiant) { return_light who }").root.unwrap();
        let wat = transpile(Some(&root), Target::Wasm);
        assert!(wat.contains(";; manifest greet(who: radiant)"));
        assert!(wat.trim_end().ends_with(')'));
    }

    #[test]
    fn test_html5_uses_options() {
        let root = parse_source("").root.unwrap();
        let options = CodegenOptions {
            title: "A & B".to_string(),
            stylesheet_href: "page.css".to_string(),
            script_src: "page.js".to_string(),
        };
        let html = transpile_with(Some(&root), Target::Html5, &options);
        assert!(html.contains("<title>A &amp; B</title>"));
        assert!(html.contains("href=\"page.css\""));
        assert!(html.contains("<script type=\"module\" src=\"page.js\"></script>"));
        assert!(html.contains("<div class=\"lamia-app\"></div>"));
    }
}
