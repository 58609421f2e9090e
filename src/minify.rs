//! Minification capability for scripts and stylesheets.
//!
//! The cache only depends on the [`Minifier`] trait. [`StandardMinifier`]
//! uses oxc for JavaScript and lightningcss for CSS. Scripts are parsed as
//! classic (non-module) scripts so top-level declarations stay global and
//! are neither renamed nor dropped.

use crate::types::AssetKind;
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier as OxcMinifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

/// Text-to-text minification. `None` means the input could not be minified
/// (usually a parse error); callers keep the original text.
pub trait Minifier {
    fn minify_css(&self, source: &str) -> Option<String>;

    fn minify_js(&self, source: &str) -> Option<String>;

    /// Dispatch on asset kind.
    fn minify(&self, kind: AssetKind, source: &str) -> Option<String> {
        match kind {
            AssetKind::Script => self.minify_js(source),
            AssetKind::Style => self.minify_css(source),
        }
    }
}

/// oxc + lightningcss minifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardMinifier;

impl Minifier for StandardMinifier {
    fn minify_js(&self, source: &str) -> Option<String> {
        let allocator = Allocator::default();
        let source_type = SourceType::cjs();
        let ret = Parser::new(&allocator, source, source_type).parse();
        if !ret.errors.is_empty() {
            return None;
        }
        let mut program = ret.program;
        let options = MinifierOptions {
            mangle: Some(MangleOptions::default()),
            compress: Some(CompressOptions::smallest()),
        };
        let ret = OxcMinifier::new(options).minify(&allocator, &mut program);
        let code = Codegen::new()
            .with_options(CodegenOptions {
                minify: true,
                comments: CommentOptions::disabled(),
                ..CodegenOptions::default()
            })
            .with_scoping(ret.scoping)
            .build(&program)
            .code;
        Some(code)
    }

    fn minify_css(&self, source: &str) -> Option<String> {
        let stylesheet = StyleSheet::parse(source, ParserOptions::default()).ok()?;
        let result = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                ..PrinterOptions::default()
            })
            .ok()?;
        Some(result.code)
    }
}
