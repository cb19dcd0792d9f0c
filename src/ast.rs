/// AST node types for converted Markdown documents
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Half-open byte range into the text a node was parsed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A node together with the region of text it covers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Spanned { node, span }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub blocks: Vec<Spanned<Block>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Block {
    Paragraph(Vec<Spanned<Inline>>),
    Heading {
        level: u8,
        children: Vec<Spanned<Inline>>,
    },
    List {
        kind: ListKind,
        tight: bool, // Tight lists don't add <p> tags in items
        items: Vec<ListItem>,
    },
    CodeBlock {
        info: String,
        literal: String,
    },
    ThematicBreak,
    // Spans of nested blocks are relative to the quote's de-marked content
    BlockQuote(Vec<Spanned<Block>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListKind {
    Bullet,
    Ordered { start: u32 },
}

/// One list entry; each paragraph's inline spans index into that paragraph's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub paragraphs: Vec<Vec<Spanned<Inline>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Inline {
    Text(String),
    Code(String),                  // Inline code span
    Emphasis(Vec<Spanned<Inline>>), // <em> tag
    Strong(Vec<Spanned<Inline>>),   // <strong> tag
    Link {
        href: String,
        title: Option<String>,
        children: Vec<Spanned<Inline>>,
    },
    Image {
        src: String,
        title: Option<String>,
        alt: Vec<Spanned<Inline>>, // Alt text can contain inline elements
    },
    LineBreak, // <br /> tag (two trailing spaces before a newline)
}

impl Inline {
    /// Visible text of this node, as a reader would see it
    pub fn plain_text(&self) -> String {
        match self {
            Inline::Text(text) | Inline::Code(text) => text.clone(),
            Inline::Emphasis(children)
            | Inline::Strong(children)
            | Inline::Link { children, .. }
            | Inline::Image { alt: children, .. } => plain_text(children),
            Inline::LineBreak => "\n".to_string(),
        }
    }
}

/// Concatenated visible text of a span sequence
pub fn plain_text(spans: &[Spanned<Inline>]) -> String {
    spans.iter().map(|span| span.node.plain_text()).collect()
}
