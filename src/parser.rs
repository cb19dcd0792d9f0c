/// Block segmentation and document tree construction
use crate::ast::{Block, Document, ListItem, ListKind, Span, Spanned};
use crate::inline::{self, Definitions, LinkDefinition, normalize_label};
use tracing::{debug, trace};

/// Block quotes nested deeper than this are kept as paragraph text
const MAX_QUOTE_DEPTH: usize = 32;

/// A block region classified by its line prefixes, inline content still raw
#[derive(Debug, Clone, PartialEq)]
pub enum RawBlock {
    /// Run of blank lines separating blocks; never emitted
    Blank,
    Paragraph(String),
    Heading {
        level: u8,
        text: String,
    },
    CodeBlock {
        info: String,
        literal: String,
    },
    ThematicBreak,
    BlockQuote(Vec<Spanned<RawBlock>>),
    List {
        kind: ListKind,
        tight: bool,
        items: Vec<Vec<String>>, // Paragraph texts of each item
    },
    /// `[label]: destination "title"`; never emitted
    Definition {
        label: String,
        definition: LinkDefinition,
    },
}

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    text: &'a str,
    start: usize,
    end: usize,
}

/// Split into lines without their terminators, keeping byte offsets
fn split_lines(source: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;

    for piece in source.split_inclusive('\n') {
        let text = piece
            .strip_suffix('\n')
            .map(|t| t.strip_suffix('\r').unwrap_or(t))
            .unwrap_or(piece);
        lines.push(Line {
            text,
            start,
            end: start + text.len(),
        });
        start += piece.len();
    }

    lines
}

#[derive(Debug, Clone, Copy)]
struct Fence {
    fence_char: char,
    len: usize,
    indent: usize,
}

/// A list item marker and where the item's content begins
#[derive(Debug, Clone, Copy)]
struct ListMarker {
    kind: ListKind,
    content_offset: usize,
}

impl ListMarker {
    /// Bullets continue bullet lists and numbers continue numbered lists
    fn is_compatible(&self, other: &ListMarker) -> bool {
        matches!(
            (self.kind, other.kind),
            (ListKind::Bullet, ListKind::Bullet) | (ListKind::Ordered { .. }, ListKind::Ordered { .. })
        )
    }
}

/// Split a source document into typed raw blocks.
///
/// Total over all inputs: every line lands in exactly one block, and text
/// matching no other rule becomes a paragraph.
pub fn segment(source: &str) -> Vec<Spanned<RawBlock>> {
    segment_at_depth(source, 0)
}

fn segment_at_depth(source: &str, depth: usize) -> Vec<Spanned<RawBlock>> {
    let lines = split_lines(source);
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].text;

        let (block, consumed) = if is_blank(line) {
            let run = lines[i..].iter().take_while(|l| is_blank(l.text)).count();
            (RawBlock::Blank, run)
        }
        // Fenced code before indented code: a fence may be indented up to 3 spaces
        else if let Some(fence) = is_fenced_code_start(line) {
            parse_fenced_code_block(&lines[i..], fence)
        } else if is_indented_code_line(line) {
            parse_indented_code_block(&lines[i..])
        } else if let Some((level, text)) = parse_atx_heading(line) {
            (RawBlock::Heading { level, text }, 1)
        }
        // Thematic break before lists so `* * *` is not a bullet
        else if is_thematic_break(line) {
            (RawBlock::ThematicBreak, 1)
        } else if is_blockquote_start(line) && depth < MAX_QUOTE_DEPTH {
            parse_blockquote(&lines[i..], depth)
        } else if let Some(marker) = is_list_start(line) {
            parse_list(&lines[i..], marker)
        } else if let Some((label, definition)) = parse_link_reference_definition(line) {
            (RawBlock::Definition { label, definition }, 1)
        } else {
            parse_paragraph(&lines[i..])
        };

        let span = Span::new(lines[i].start, lines[i + consumed - 1].end);
        trace!(?span, "segmented block");
        blocks.push(Spanned::new(block, span));
        i += consumed;
    }

    blocks
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Count the number of columns of indentation, treating tabs as advancing to next multiple of 4
fn count_indent_columns(line: &str) -> usize {
    let mut col = 0;
    for ch in line.chars() {
        match ch {
            ' ' => col += 1,
            '\t' => col = (col / 4 + 1) * 4,
            _ => break,
        }
    }
    col
}

fn count_leading_spaces(line: &str) -> usize {
    line.bytes().take_while(|&b| b == b' ').count()
}

/// Remove up to `columns` worth of indentation from a line
fn remove_indent_columns(line: &str, columns: usize) -> String {
    let mut col = 0;
    let mut chars = line.chars().peekable();
    let mut result = String::new();

    while col < columns {
        match chars.peek() {
            Some(' ') => {
                chars.next();
                col += 1;
            }
            Some('\t') => {
                chars.next();
                let next_tab_stop = (col / 4 + 1) * 4;
                if next_tab_stop <= columns {
                    col = next_tab_stop;
                } else {
                    // Partial tab: keep the columns past the cut as spaces
                    result.extend(std::iter::repeat_n(' ', next_tab_stop - columns));
                    col = columns;
                }
            }
            _ => break,
        }
    }

    result.extend(chars);
    result
}

fn is_indented_code_line(line: &str) -> bool {
    count_indent_columns(line) >= 4 && !is_blank(line)
}

fn parse_indented_code_block(lines: &[Line]) -> (RawBlock, usize) {
    let mut code_lines = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].text;

        if is_indented_code_line(line) {
            code_lines.push(remove_indent_columns(line, 4));
            i += 1;
        } else if is_blank(line) {
            // Blank lines belong to the block only if more code follows
            let next = i + lines[i..].iter().take_while(|l| is_blank(l.text)).count();
            if next < lines.len() && is_indented_code_line(lines[next].text) {
                for blank in &lines[i..next] {
                    code_lines.push(remove_indent_columns(blank.text, 4));
                }
                i = next;
            } else {
                break;
            }
        } else {
            break;
        }
    }

    let literal = code_lines.join("\n") + "\n";
    (
        RawBlock::CodeBlock {
            info: String::new(),
            literal,
        },
        i,
    )
}

/// Check if a line starts a fenced code block
fn is_fenced_code_start(line: &str) -> Option<Fence> {
    let indent = count_leading_spaces(line);
    if indent >= 4 {
        return None;
    }

    let after_indent = &line[indent..];
    let fence_char = after_indent.chars().next()?;
    if fence_char != '`' && fence_char != '~' {
        return None;
    }

    let len = after_indent.chars().take_while(|&c| c == fence_char).count();
    if len < 3 {
        return None;
    }

    // A backtick in the info string means this is inline code, not a fence
    if fence_char == '`' && after_indent[len..].contains('`') {
        return None;
    }

    Some(Fence {
        fence_char,
        len,
        indent,
    })
}

fn is_closing_fence(line: &str, fence: Fence) -> bool {
    let indent = count_leading_spaces(line);
    if indent >= 4 {
        return false;
    }

    let after_indent = &line[indent..];
    let len = after_indent
        .chars()
        .take_while(|&c| c == fence.fence_char)
        .count();
    len >= fence.len && is_blank(&after_indent[len..])
}

fn parse_fenced_code_block(lines: &[Line], fence: Fence) -> (RawBlock, usize) {
    let opening = lines[0].text;
    let info = opening[fence.indent + fence.len..]
        .split_whitespace()
        .next()
        .map(inline::process_backslash_escapes)
        .unwrap_or_default();

    let mut code_lines = Vec::new();
    let mut i = 1;

    // An unclosed fence runs to the end of the document
    while i < lines.len() {
        let line = lines[i].text;
        i += 1;
        if is_closing_fence(line, fence) {
            break;
        }
        code_lines.push(remove_indent_columns(line, fence.indent));
    }

    let literal = if code_lines.is_empty() {
        String::new()
    } else {
        code_lines.join("\n") + "\n"
    };

    (RawBlock::CodeBlock { info, literal }, i)
}

fn parse_atx_heading(line: &str) -> Option<(u8, String)> {
    if count_leading_spaces(line) >= 4 {
        return None;
    }

    let trimmed = line.trim_start();
    let hash_count = trimmed.bytes().take_while(|&b| b == b'#').count();
    if hash_count == 0 || hash_count > 6 {
        return None;
    }

    // At least one space or tab must follow the hashes
    let after_hashes = &trimmed[hash_count..];
    if !after_hashes.starts_with([' ', '\t']) {
        return None;
    }

    let text = after_hashes.trim();
    let without_closing = text.trim_end_matches('#');

    // Trailing `#` run is dropped; an escaped `\#` stays as text
    let text = if without_closing.ends_with('\\') && without_closing.len() < text.len() {
        &text[..without_closing.len() + 1]
    } else {
        without_closing.trim_end()
    };

    Some((hash_count as u8, text.to_string()))
}

fn is_thematic_break(line: &str) -> bool {
    if count_leading_spaces(line) >= 4 {
        return false;
    }

    let mut marks = line.chars().filter(|c| !c.is_whitespace());
    let Some(first @ ('-' | '*' | '_')) = marks.next() else {
        return false;
    };

    let mut count = 1;
    for c in marks {
        if c != first {
            return false;
        }
        count += 1;
    }
    count >= 3
}

/// `===` or `---` under a paragraph line; returns the heading level
fn is_setext_underline(line: &str) -> Option<u8> {
    if count_leading_spaces(line) >= 4 {
        return None;
    }

    let trimmed = line.trim();
    let level = match trimmed.chars().next()? {
        '=' => 1,
        '-' => 2,
        _ => return None,
    };
    let marker = if level == 1 { '=' } else { '-' };
    trimmed.chars().all(|c| c == marker).then_some(level)
}

fn is_blockquote_start(line: &str) -> bool {
    let indent = count_leading_spaces(line);
    indent < 4 && line[indent..].starts_with('>')
}

fn strip_blockquote_marker(line: &str) -> &str {
    let indent = count_leading_spaces(line);
    let after_marker = &line[indent + 1..];
    after_marker
        .strip_prefix([' ', '\t'])
        .unwrap_or(after_marker)
}

/// Block starters that end a paragraph or a lazy continuation
fn interrupts_paragraph(line: &str) -> bool {
    parse_atx_heading(line).is_some()
        || is_thematic_break(line)
        || is_fenced_code_start(line).is_some()
        || is_blockquote_start(line)
}

fn parse_blockquote(lines: &[Line], depth: usize) -> (RawBlock, usize) {
    let mut quote_lines = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].text;
        if is_blockquote_start(line) {
            quote_lines.push(strip_blockquote_marker(line));
        } else if !is_blank(line)
            && !interrupts_paragraph(line)
            && is_list_start(line).is_none()
            && quote_lines.last().is_some_and(|last| !is_blank(last))
        {
            // Lazy continuation of the quoted paragraph
            quote_lines.push(line);
        } else {
            break;
        }
        i += 1;
    }

    let content = quote_lines.join("\n");
    let children = segment_at_depth(&content, depth + 1);
    (RawBlock::BlockQuote(children), i)
}

/// Check if a line starts a list item
fn is_list_start(line: &str) -> Option<ListMarker> {
    let indent = count_leading_spaces(line);
    if indent > 3 {
        return None;
    }

    let rest = &line[indent..];
    let bytes = rest.as_bytes();

    let (kind, marker_len) = match bytes.first()? {
        b'-' | b'*' | b'+' => (ListKind::Bullet, 1),
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            if digits > 9 || bytes.get(digits) != Some(&b'.') {
                return None;
            }
            let start = rest[..digits].parse::<u32>().ok()?;
            (ListKind::Ordered { start }, digits + 1)
        }
        _ => return None,
    };

    // Marker must be followed by whitespace or end the line
    match bytes.get(marker_len) {
        None | Some(b' ' | b'\t') => Some(ListMarker {
            kind,
            content_offset: indent + marker_len,
        }),
        _ => None,
    }
}

/// Join paragraph lines; trailing spaces survive on inner lines for hard breaks
fn join_paragraph_lines(lines: &[&str]) -> String {
    let mut text = lines
        .iter()
        .map(|line| line.trim_start_matches([' ', '\t']))
        .collect::<Vec<_>>()
        .join("\n");
    text.truncate(text.trim_end_matches([' ', '\t']).len());
    text
}

/// Parse a run of compatible list items into one list
fn parse_list(lines: &[Line], first: ListMarker) -> (RawBlock, usize) {
    // Each item holds its paragraphs, each paragraph its lines
    let mut items: Vec<Vec<Vec<&str>>> = Vec::new();
    let mut loose = false;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].text;

        if i > 0 && is_thematic_break(line) {
            break;
        }

        if let Some(marker) = is_list_start(line) {
            if !first.is_compatible(&marker) {
                break;
            }
            let content = line[marker.content_offset..].trim_start();
            let paragraphs = if content.is_empty() {
                Vec::new()
            } else {
                vec![vec![content]]
            };
            items.push(paragraphs);
            i += 1;
            continue;
        }

        if is_blank(line) {
            // The list goes on only if something belonging to it follows
            let next = i + lines[i..].iter().take_while(|l| is_blank(l.text)).count();
            let Some(next_line) = lines.get(next).map(|l| l.text) else {
                break;
            };

            if let Some(marker) = is_list_start(next_line)
                && first.is_compatible(&marker)
                && !is_thematic_break(next_line)
            {
                loose = true;
                i = next;
                continue;
            }

            // Indented text after a blank starts another paragraph of the item
            if count_indent_columns(next_line) >= 2 && is_list_start(next_line).is_none() {
                loose = true;
                if let Some(item) = items.last_mut() {
                    item.push(Vec::new());
                }
                i = next;
                continue;
            }

            break;
        }

        if interrupts_paragraph(line) {
            break;
        }

        // Continuation line of the current item
        if let Some(item) = items.last_mut() {
            match item.last_mut() {
                Some(paragraph) => paragraph.push(line),
                None => item.push(vec![line]),
            }
        }
        i += 1;
    }

    let items = items
        .into_iter()
        .map(|paragraphs| {
            paragraphs
                .iter()
                .filter(|lines| !lines.is_empty())
                .map(|lines| join_paragraph_lines(lines))
                .collect()
        })
        .collect();

    (
        RawBlock::List {
            kind: first.kind,
            tight: !loose,
            items,
        },
        i,
    )
}

/// Parse a paragraph by collecting consecutive non-blank lines
/// that don't match any other block structure
fn parse_paragraph(lines: &[Line]) -> (RawBlock, usize) {
    let mut paragraph_lines = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].text;

        if is_blank(line) {
            break;
        }

        // An underline turns the lines so far into a heading
        if i > 0
            && let Some(level) = is_setext_underline(line)
        {
            let text = join_paragraph_lines(&paragraph_lines);
            return (RawBlock::Heading { level, text }, i + 1);
        }

        if i > 0 && interrupts_paragraph(line) {
            break;
        }

        // Empty items and ordered lists not starting at 1 cannot interrupt
        if i > 0
            && let Some(marker) = is_list_start(line)
            && !line[marker.content_offset..].trim().is_empty()
            && matches!(marker.kind, ListKind::Bullet | ListKind::Ordered { start: 1 })
        {
            break;
        }

        paragraph_lines.push(line);
        i += 1;
    }

    (RawBlock::Paragraph(join_paragraph_lines(&paragraph_lines)), i)
}

/// `[label]: destination "optional title"` on a single line
fn parse_link_reference_definition(line: &str) -> Option<(String, LinkDefinition)> {
    if count_indent_columns(line) > 3 {
        return None;
    }

    let rest = line.trim_start().strip_prefix('[')?;
    let label_end = rest.find(']')?;
    let label = &rest[..label_end];
    if label.trim().is_empty() || label.contains('[') {
        return None;
    }

    let rest = rest[label_end + 1..].strip_prefix(':')?.trim_start();

    let (destination, rest) = if let Some(inner) = rest.strip_prefix('<') {
        let close = inner.find('>')?;
        (&inner[..close], &inner[close + 1..])
    } else {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        if end == 0 {
            return None;
        }
        (&rest[..end], &rest[end..])
    };

    let rest = rest.trim();
    let title = if rest.is_empty() {
        None
    } else {
        let close = match rest.chars().next()? {
            '"' => '"',
            '\'' => '\'',
            '(' => ')',
            _ => return None,
        };
        let inner = rest[1..].strip_suffix(close)?;
        Some(inline::process_backslash_escapes(inner))
    };

    Some((
        label.to_string(),
        LinkDefinition {
            destination: inline::process_backslash_escapes(destination),
            title,
        },
    ))
}

pub struct Parser {
    /// Link reference definitions: normalized label -> target
    reference_definitions: Definitions,
}

impl Parser {
    pub fn new() -> Self {
        Parser {
            reference_definitions: Definitions::new(),
        }
    }

    pub fn parse(&mut self, input: &str) -> Document {
        let segments = segment(input);

        // FIRST PASS: collect link reference definitions anywhere in the tree
        self.collect_definitions(&segments);

        // SECOND PASS: resolve inline content with all references available
        let blocks = self.build_blocks(segments);
        debug!(
            blocks = blocks.len(),
            definitions = self.reference_definitions.len(),
            "parsed document"
        );

        Document { blocks }
    }

    fn collect_definitions(&mut self, segments: &[Spanned<RawBlock>]) {
        for segment in segments {
            match &segment.node {
                RawBlock::Definition { label, definition } => {
                    // The first definition of a label wins
                    self.reference_definitions
                        .entry(normalize_label(label))
                        .or_insert_with(|| definition.clone());
                }
                RawBlock::BlockQuote(children) => self.collect_definitions(children),
                _ => {}
            }
        }
    }

    fn build_blocks(&self, segments: Vec<Spanned<RawBlock>>) -> Vec<Spanned<Block>> {
        segments
            .into_iter()
            .filter_map(|segment| {
                let block = self.build_block(segment.node)?;
                Some(Spanned::new(block, segment.span))
            })
            .collect()
    }

    fn build_block(&self, raw: RawBlock) -> Option<Block> {
        let defs = &self.reference_definitions;
        let block = match raw {
            RawBlock::Blank | RawBlock::Definition { .. } => return None,
            RawBlock::Paragraph(text) => Block::Paragraph(inline::resolve(&text, defs)),
            RawBlock::Heading { level, text } => Block::Heading {
                level,
                children: inline::resolve(&text, defs),
            },
            RawBlock::CodeBlock { info, literal } => Block::CodeBlock { info, literal },
            RawBlock::ThematicBreak => Block::ThematicBreak,
            RawBlock::BlockQuote(children) => Block::BlockQuote(self.build_blocks(children)),
            RawBlock::List { kind, tight, items } => Block::List {
                kind,
                tight,
                items: items
                    .iter()
                    .map(|paragraphs| ListItem {
                        paragraphs: paragraphs
                            .iter()
                            .map(|text| inline::resolve(text, defs))
                            .collect(),
                    })
                    .collect(),
            },
        };
        Some(block)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}
