/// HTML renderer for the document tree
use crate::ast::{Block, Document, Inline, ListItem, ListKind, Spanned, plain_text};
use serde::{Deserialize, Serialize};

/// Rendering knobs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Emit `title="…"` on links and images that carry one
    pub link_titles: bool,
}

pub struct HtmlRenderer {
    options: RenderOptions,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        HtmlRenderer {
            options: RenderOptions::default(),
        }
    }

    pub fn with_options(options: RenderOptions) -> Self {
        HtmlRenderer { options }
    }

    /// Render a document as an HTML fragment, one block per line group
    pub fn render(&self, document: &Document) -> String {
        let mut out = String::new();
        self.render_blocks(&document.blocks, &mut out);
        out
    }

    fn render_blocks(&self, blocks: &[Spanned<Block>], out: &mut String) {
        for block in blocks {
            self.render_block(&block.node, out);
        }
    }

    fn render_block(&self, block: &Block, out: &mut String) {
        match block {
            Block::Paragraph(children) => {
                out.push_str("<p>");
                self.render_inlines(children, out);
                out.push_str("</p>\n");
            }
            Block::Heading { level, children } => {
                out.push_str(&format!("<h{}>", level));
                self.render_inlines(children, out);
                out.push_str(&format!("</h{}>\n", level));
            }
            Block::CodeBlock { info, literal } => {
                if info.is_empty() {
                    out.push_str("<pre><code>");
                } else {
                    out.push_str(&format!(
                        "<pre><code class=\"language-{}\">",
                        escape_attribute(info)
                    ));
                }
                out.push_str(&escape_html(literal));
                out.push_str("</code></pre>\n");
            }
            Block::ThematicBreak => out.push_str("<hr />\n"),
            Block::BlockQuote(children) => {
                out.push_str("<blockquote>\n");
                self.render_blocks(children, out);
                out.push_str("</blockquote>\n");
            }
            Block::List { kind, tight, items } => {
                let close = match kind {
                    ListKind::Bullet => {
                        out.push_str("<ul>\n");
                        "</ul>\n"
                    }
                    ListKind::Ordered { start: 1 } => {
                        out.push_str("<ol>\n");
                        "</ol>\n"
                    }
                    ListKind::Ordered { start } => {
                        out.push_str(&format!("<ol start=\"{}\">\n", start));
                        "</ol>\n"
                    }
                };
                for item in items {
                    self.render_list_item(item, *tight, out);
                }
                out.push_str(close);
            }
        }
    }

    fn render_list_item(&self, item: &ListItem, tight: bool, out: &mut String) {
        if tight {
            // Tight items render their text without <p> wrappers
            out.push_str("<li>");
            for (index, paragraph) in item.paragraphs.iter().enumerate() {
                if index > 0 {
                    out.push('\n');
                }
                self.render_inlines(paragraph, out);
            }
            out.push_str("</li>\n");
        } else {
            out.push_str("<li>\n");
            for paragraph in &item.paragraphs {
                out.push_str("<p>");
                self.render_inlines(paragraph, out);
                out.push_str("</p>\n");
            }
            out.push_str("</li>\n");
        }
    }

    fn render_inlines(&self, inlines: &[Spanned<Inline>], out: &mut String) {
        for inline in inlines {
            self.render_inline(&inline.node, out);
        }
    }

    fn render_inline(&self, inline: &Inline, out: &mut String) {
        match inline {
            Inline::Text(text) => out.push_str(&escape_html(text)),
            Inline::Code(code) => {
                out.push_str("<code>");
                out.push_str(&escape_html(code));
                out.push_str("</code>");
            }
            Inline::Emphasis(children) => {
                out.push_str("<em>");
                self.render_inlines(children, out);
                out.push_str("</em>");
            }
            Inline::Strong(children) => {
                out.push_str("<strong>");
                self.render_inlines(children, out);
                out.push_str("</strong>");
            }
            Inline::Link {
                href,
                title,
                children,
            } => {
                out.push_str(&format!("<a href=\"{}\"", escape_attribute(href)));
                self.render_title(title.as_deref(), out);
                out.push('>');
                self.render_inlines(children, out);
                out.push_str("</a>");
            }
            Inline::Image { src, title, alt } => {
                // Alt text is flattened: attributes cannot hold markup
                out.push_str(&format!(
                    "<img src=\"{}\" alt=\"{}\"",
                    escape_attribute(src),
                    escape_attribute(&plain_text(alt))
                ));
                self.render_title(title.as_deref(), out);
                out.push_str(" />");
            }
            Inline::LineBreak => out.push_str("<br />\n"),
        }
    }

    fn render_title(&self, title: Option<&str>, out: &mut String) {
        if self.options.link_titles
            && let Some(title) = title
        {
            out.push_str(&format!(" title=\"{}\"", escape_attribute(title)));
        }
    }
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape literal text content
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escape an attribute value; quotes included
pub fn escape_attribute(text: &str) -> String {
    escape_html(text).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn render(source: &str) -> String {
        HtmlRenderer::new().render(&Parser::new().parse(source))
    }

    fn render_with_titles(source: &str) -> String {
        HtmlRenderer::with_options(RenderOptions { link_titles: true })
            .render(&Parser::new().parse(source))
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b && c > \"d\""), "a &lt; b &amp;&amp; c &gt; \"d\"");
        assert_eq!(escape_attribute("\"x\" & <y>"), "&quot;x&quot; &amp; &lt;y&gt;");
    }

    #[test]
    fn test_ordered_list_start() {
        assert_eq!(
            render("7. seven\n8. eight"),
            "<ol start=\"7\">\n<li>seven</li>\n<li>eight</li>\n</ol>\n"
        );
    }

    #[test]
    fn test_loose_list_paragraphs() {
        assert_eq!(
            render("- a\n\n- b"),
            "<ul>\n<li>\n<p>a</p>\n</li>\n<li>\n<p>b</p>\n</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_code_block_language_class() {
        assert_eq!(
            render("```py\nif a < b:\n```"),
            "<pre><code class=\"language-py\">if a &lt; b:\n</code></pre>\n"
        );
    }

    #[test]
    fn test_blockquote() {
        assert_eq!(
            render("> quoted *text*"),
            "<blockquote>\n<p>quoted <em>text</em></p>\n</blockquote>\n"
        );
    }

    #[test]
    fn test_thematic_break() {
        assert_eq!(render("a\n\n***\n\nb"), "<p>a</p>\n<hr />\n<p>b</p>\n");
    }

    #[test]
    fn test_titles_hidden_by_default() {
        assert_eq!(
            render("[x](y \"z\") ![i](s \"t\")"),
            "<p><a href=\"y\">x</a> <img src=\"s\" alt=\"i\" /></p>\n"
        );
    }

    #[test]
    fn test_titles_when_enabled() {
        assert_eq!(
            render_with_titles("[x](y \"a \\\"q\\\"\")"),
            "<p><a href=\"y\" title=\"a &quot;q&quot;\">x</a></p>\n"
        );
    }

    #[test]
    fn test_attribute_injection_is_escaped() {
        assert_eq!(
            render("[x](\"onmouseover=alert(1))"),
            "<p><a href=\"&quot;onmouseover=alert(1)\">x</a></p>\n"
        );
    }

    #[test]
    fn test_hard_break() {
        assert_eq!(render("one  \ntwo"), "<p>one<br />\ntwo</p>\n");
    }
}
