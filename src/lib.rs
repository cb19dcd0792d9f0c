//! Markdown to standalone HTML page conversion

pub mod ast;
pub mod config;
pub mod inline;
pub mod page;
pub mod parser;
pub mod renderer;
pub mod session;
pub mod viewer;

use ast::Document;
use parser::Parser;
use renderer::HtmlRenderer;

pub use page::{DEFAULT_TITLE, PageShell, wrap_fragment_as_document};
pub use renderer::RenderOptions;
pub use session::{Session, SessionError, SessionState, read_markdown_file};

/// Result of one conversion: the parsed tree and its rendered fragment
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub document: Document,
    pub fragment: String,
}

/// Parse markdown text and render it with the given options
pub fn convert(markdown: &str, options: &RenderOptions) -> Conversion {
    let document = Parser::new().parse(markdown);
    let fragment = HtmlRenderer::with_options(options.clone()).render(&document);
    Conversion { document, fragment }
}

/// Parse markdown text and render to an HTML fragment
pub fn convert_markdown_to_html_fragment(markdown: &str) -> String {
    convert_markdown_to_html_fragment_with(markdown, &RenderOptions::default())
}

pub fn convert_markdown_to_html_fragment_with(markdown: &str, options: &RenderOptions) -> String {
    convert(markdown, options).fragment
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_input() {
        assert_eq!(convert_markdown_to_html_fragment(""), "");
        assert_eq!(convert_markdown_to_html_fragment("  \n\t\n"), "");
    }

    #[test]
    fn test_heading() {
        assert_eq!(convert_markdown_to_html_fragment("# Heading"), "<h1>Heading</h1>\n");
    }

    #[test]
    fn test_bold_and_italic() {
        assert_eq!(
            convert_markdown_to_html_fragment("**bold** and *italic*"),
            "<p><strong>bold</strong> and <em>italic</em></p>\n"
        );
    }

    #[test]
    fn test_basic_image() {
        assert_eq!(
            convert_markdown_to_html_fragment("![foo](/url \"title\")\n"),
            "<p><img src=\"/url\" alt=\"foo\" /></p>\n"
        );
    }

    #[test]
    fn test_conversion_keeps_tree() {
        let conversion = convert("- a\n- b", &RenderOptions::default());
        assert_eq!(conversion.document.blocks.len(), 1);
        assert_eq!(conversion.fragment, "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n");
    }
}
