//! # Lamia Compiler
//!
//! Lexer, recursive-descent parser and multi-target code generator for the
//! Lamia UI language.
//!
//! ## Pipeline
//!
//! 1. [`lexer::tokenize`] turns source into tokens. It never fails; problems
//!    travel as token hints.
//! 2. [`parse::parse`] builds the AST and collects diagnostics. The root is
//!    `None` only when nothing was recovered and a syntax error was reported.
//! 3. [`codegen::transpile`] renders the root for one [`Target`]. A missing
//!    root yields [`COMPILATION_FAILED`] for every target.
//!
//! [`compile::Compiler`] drives the three steps for files, renders targets in
//! parallel, caches outputs and writes the Purple Pages documentation.

#[cfg(feature = "napi")]
use napi_derive::napi;

pub mod ast;
pub mod cache;
pub mod codegen;
pub mod compile;
pub mod discovery;
pub mod document;
pub mod error;
pub mod lexer;
pub mod parse;
mod render;
pub mod token;
pub mod validate;
pub mod visitor;

#[cfg(test)]
mod codegen_tests;
#[cfg(test)]
mod parse_tests;

pub use ast::{Expression, LamiaType, NodeId, NodeKind};
pub use codegen::{transpile, transpile_with, CodegenOptions, Target, COMPILATION_FAILED};
pub use compile::{CompilationStats, CompileOptions, Compiler, FileReport};
pub use error::LamiaError;
pub use lexer::tokenize;
pub use parse::{parse, parse_source, ParseResult};
pub use token::{Token, TokenKind};
pub use validate::{Diagnostic, DiagnosticKind, SourceLocation};

/// Source to target text in one call, with default options.
pub fn compile(source: &str, target: Target) -> String {
    let result = parse_source(source);
    transpile(result.root.as_ref(), target)
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI EXPORTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct NativeCompileResult {
    output: String,
    diagnostics: Vec<Diagnostic>,
}

#[cfg(feature = "napi")]
#[napi]
pub fn compile_lamia_native(source: String, target: String) -> napi::Result<serde_json::Value> {
    let target: Target = target
        .parse()
        .map_err(|e: LamiaError| napi::Error::from_reason(e.to_string()))?;
    let result = parse_source(&source);
    let native = NativeCompileResult {
        output: transpile(result.root.as_ref(), target),
        diagnostics: result.diagnostics,
    };
    serde_json::to_value(native).map_err(|e| napi::Error::from_reason(e.to_string()))
}

#[cfg(feature = "napi")]
#[napi]
pub fn tokenize_lamia_native(source: String) -> napi::Result<serde_json::Value> {
    serde_json::to_value(tokenize(&source)).map_err(|e| napi::Error::from_reason(e.to_string()))
}
