/// Inline span resolution: code spans, emphasis, links and images
use crate::ast::{Inline, Span, Spanned};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use unicode_casefold::UnicodeCaseFold;

/// Emphasis nested deeper than this stays literal
const MAX_EMPHASIS_DEPTH: usize = 64;

/// Target of a `[label]: destination "title"` definition
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDefinition {
    pub destination: String,
    pub title: Option<String>,
}

/// Link reference definitions keyed by normalized label
pub type Definitions = HashMap<String, LinkDefinition>;

/// Normalize a label for matching (Unicode case fold, collapse whitespace)
pub fn normalize_label(label: &str) -> String {
    label
        .chars()
        .case_fold()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Parse the inline content of one block.
///
/// Every byte of `text` is covered by exactly one top-level span, so joining
/// the spanned slices gives back `text`.
pub fn resolve(text: &str, definitions: &Definitions) -> Vec<Spanned<Inline>> {
    let resolver = InlineResolver::new(text, definitions, true, 0);
    resolver.parse_range(0, text.len())
}

/// Where the last closer for a delimiter may start, as far as it is known
#[derive(Debug, Clone, Copy)]
enum CloserBound {
    At(usize),
    NoneFrom(usize),
}

struct InlineResolver<'a> {
    text: &'a str,
    bytes: &'a [u8],
    definitions: &'a Definitions,
    // Cleared inside link text and image alt: links do not nest
    allow_links: bool,
    // Emphasis spans currently open around the range being parsed
    emphasis_depth: Cell<usize>,
    // (start, end) -> (width, close_start) of an emphasis opened at start
    emphasis_matches: RefCell<HashMap<(usize, usize), Option<(usize, usize)>>>,
    // end -> lowest start whose delimiters are already in `emphasis_matches`
    warmed_from: RefCell<HashMap<usize, usize>>,
    match_depth: Cell<usize>,
    closer_bounds: RefCell<HashMap<(u8, usize), CloserBound>>,
    // end -> (first scanned position, `[` -> matching `]`)
    bracket_pairs: RefCell<HashMap<usize, (usize, HashMap<usize, usize>)>>,
    // (end, run length) -> (searched from, first closing backtick run)
    code_closers: RefCell<HashMap<(usize, usize), (usize, Option<usize>)>>,
}

impl<'a> InlineResolver<'a> {
    fn new(
        text: &'a str,
        definitions: &'a Definitions,
        allow_links: bool,
        emphasis_depth: usize,
    ) -> Self {
        InlineResolver {
            text,
            bytes: text.as_bytes(),
            definitions,
            allow_links,
            emphasis_depth: Cell::new(emphasis_depth),
            emphasis_matches: RefCell::default(),
            warmed_from: RefCell::default(),
            match_depth: Cell::new(0),
            closer_bounds: RefCell::default(),
            bracket_pairs: RefCell::default(),
            code_closers: RefCell::default(),
        }
    }

    fn nested(&self) -> InlineResolver<'a> {
        InlineResolver::new(
            self.text,
            self.definitions,
            false,
            self.emphasis_depth.get(),
        )
    }

    fn parse_range(&self, start: usize, end: usize) -> Vec<Spanned<Inline>> {
        let mut nodes = Vec::new();
        let mut i = start;

        while i < end {
            let b = self.bytes[i];

            // Escaped punctuation is literal text
            if b == b'\\' && i + 1 < end && self.bytes[i + 1].is_ascii_punctuation() {
                let escaped = &self.text[i + 1..i + 2];
                push_text(&mut nodes, escaped, Span::new(i, i + 2));
                i += 2;
                continue;
            }

            // Code spans bind tighter than emphasis and links
            if b == b'`' {
                if let Some((node, new_i)) = self.try_parse_code_span(i, end) {
                    nodes.push(Spanned::new(node, Span::new(i, new_i)));
                    i = new_i;
                } else {
                    let run = self.run_length(i, end, b'`');
                    push_text(&mut nodes, &self.text[i..i + run], Span::new(i, i + run));
                    i += run;
                }
                continue;
            }

            if self.allow_links
                && b == b'!'
                && i + 1 < end
                && self.bytes[i + 1] == b'['
                && let Some((node, new_i)) = self.try_parse_image(i, end)
            {
                nodes.push(Spanned::new(node, Span::new(i, new_i)));
                i = new_i;
                continue;
            }

            if self.allow_links
                && b == b'['
                && let Some((node, new_i)) = self.try_parse_link(i, end)
            {
                nodes.push(Spanned::new(node, Span::new(i, new_i)));
                i = new_i;
                continue;
            }

            if self.allow_links
                && b == b'<'
                && let Some((node, new_i)) = self.try_parse_autolink(i, end)
            {
                nodes.push(Spanned::new(node, Span::new(i, new_i)));
                i = new_i;
                continue;
            }

            if b == b'*' || b == b'_' {
                if let Some((node, new_i)) = self.try_parse_emphasis(i, end) {
                    nodes.push(Spanned::new(node, Span::new(i, new_i)));
                    i = new_i;
                } else {
                    // Unmatched delimiter run stays literal
                    let run = self.run_length(i, end, b);
                    push_text(&mut nodes, &self.text[i..i + run], Span::new(i, i + run));
                    i += run;
                }
                continue;
            }

            // Two or more spaces before a newline is a hard break
            if b == b' ' {
                let run = self.run_length(i, end, b' ');
                if run >= 2 && i + run < end && self.bytes[i + run] == b'\n' {
                    nodes.push(Spanned::new(Inline::LineBreak, Span::new(i, i + run + 1)));
                    i += run + 1;
                } else {
                    push_text(&mut nodes, &self.text[i..i + run], Span::new(i, i + run));
                    i += run;
                }
                continue;
            }

            // Collect regular text until the next special character
            let text_start = i;
            i += 1;
            while i < end && !is_special(self.bytes[i]) {
                i += 1;
            }
            push_text(
                &mut nodes,
                &self.text[text_start..i],
                Span::new(text_start, i),
            );
        }

        nodes
    }

    fn run_length(&self, start: usize, end: usize, byte: u8) -> usize {
        self.bytes[start..end]
            .iter()
            .take_while(|&&b| b == byte)
            .count()
    }

    fn char_before(&self, pos: usize) -> Option<char> {
        self.text[..pos].chars().next_back()
    }

    fn char_at(&self, pos: usize, end: usize) -> Option<char> {
        if pos >= end {
            return None;
        }
        self.text[pos..end].chars().next()
    }

    fn try_parse_code_span(&self, start: usize, end: usize) -> Option<(Inline, usize)> {
        let backtick_count = self.run_length(start, end, b'`');
        let content_start = start + backtick_count;
        let close = self.find_backtick_run(content_start, backtick_count, end)?;

        let mut content = self.text[content_start..close].replace('\n', " ");

        // Strip one surrounding space when both ends have one
        if content.len() > 2
            && content.starts_with(' ')
            && content.ends_with(' ')
            && !content.trim().is_empty()
        {
            content = content[1..content.len() - 1].to_string();
        }

        Some((Inline::Code(content), close + backtick_count))
    }

    /// First backtick run of exactly `len` at or after `from`.
    ///
    /// `from` always sits just past a backtick run, so a search that started
    /// earlier and found nothing before `from` answers this one too.
    fn find_backtick_run(&self, from: usize, len: usize, end: usize) -> Option<usize> {
        if let Some(&(searched, found)) = self.code_closers.borrow().get(&(end, len))
            && searched <= from
            && found.is_none_or(|close| close >= from)
        {
            return found;
        }

        let mut found = None;
        let mut j = from;
        while j < end {
            if self.bytes[j] == b'`' {
                let run = self.run_length(j, end, b'`');
                if run == len {
                    found = Some(j);
                    break;
                }
                j += run;
            } else {
                j += 1;
            }
        }

        self.code_closers
            .borrow_mut()
            .insert((end, len), (from, found));
        found
    }

    /// Emphasis and strong emphasis.
    ///
    /// Strong (`**`, `__`) is attempted before simple emphasis so a double
    /// run is never split into two `<em>` spans.
    fn try_parse_emphasis(&self, start: usize, end: usize) -> Option<(Inline, usize)> {
        let depth = self.emphasis_depth.get();
        if depth >= MAX_EMPHASIS_DEPTH {
            return None;
        }

        let (width, close_start) = self.match_emphasis(start, end)?;
        self.emphasis_depth.set(depth + 1);
        let children = self.parse_range(start + width, close_start);
        self.emphasis_depth.set(depth);
        let node = if width == 2 {
            Inline::Strong(children)
        } else {
            Inline::Emphasis(children)
        };
        Some((node, close_start + width))
    }

    /// Locate the closer for a delimiter run at `start`.
    ///
    /// A match only depends on delimiters further right, so the first lookup
    /// for a range fills the memo from right to left. Later lookups, and the
    /// nested lookups made while scanning, then hit the memo instead of
    /// recursing once per unmatched opener.
    fn match_emphasis(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        if let Some(&cached) = self.emphasis_matches.borrow().get(&(start, end)) {
            return cached;
        }

        let depth = self.match_depth.get();
        if depth == 0 {
            self.warm_emphasis_matches(start, end);
            if let Some(&cached) = self.emphasis_matches.borrow().get(&(start, end)) {
                return cached;
            }
        }
        if depth >= MAX_EMPHASIS_DEPTH {
            return None;
        }

        self.match_depth.set(depth + 1);
        let found = self.scan_emphasis(start, end);
        self.match_depth.set(depth);

        self.emphasis_matches
            .borrow_mut()
            .insert((start, end), found);
        found
    }

    fn warm_emphasis_matches(&self, start: usize, end: usize) {
        let warmed_from = self.warmed_from.borrow().get(&end).copied().unwrap_or(end);
        if start >= warmed_from {
            return;
        }
        self.warmed_from.borrow_mut().insert(end, start);

        self.match_depth.set(1);
        for pos in (start..warmed_from).rev() {
            if matches!(self.bytes[pos], b'*' | b'_') {
                self.match_emphasis(pos, end);
            }
        }
        self.match_depth.set(0);
    }

    fn scan_emphasis(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        let delimiter = self.bytes[start];
        let run = self.run_length(start, end, delimiter);

        let mut found = None;
        if self.can_open(start, run, end, delimiter) {
            for width in [2, 1] {
                if run < width {
                    continue;
                }
                if let Some(close_start) =
                    self.find_closer(delimiter, width, run, start + width, start + run, end)
                {
                    found = Some((width, close_start));
                    break;
                }
            }
        }

        found
    }

    fn can_open(&self, start: usize, run: usize, end: usize, delimiter: u8) -> bool {
        let Some(next) = self.char_at(start + run, end) else {
            return false;
        };
        if next.is_whitespace() {
            return false;
        }
        // Underscores inside words are literal
        !(delimiter == b'_' && self.char_before(start).is_some_and(char::is_alphanumeric))
    }

    fn can_close(&self, pos: usize, run: usize, end: usize, delimiter: u8) -> bool {
        if self.char_before(pos).is_none_or(char::is_whitespace) {
            return false;
        }
        !(delimiter == b'_' && self.char_at(pos + run, end).is_some_and(char::is_alphanumeric))
    }

    /// Find where the closing delimiter starts, scanning from `scan_from`.
    /// Returns `None` when the content would be empty or no closer exists.
    fn find_closer(
        &self,
        delimiter: u8,
        width: usize,
        opener_run: usize,
        content_start: usize,
        scan_from: usize,
        end: usize,
    ) -> Option<usize> {
        if !self.may_close_after(delimiter, scan_from, end) {
            return None;
        }

        let mut j = scan_from;

        while j < end {
            let b = self.bytes[j];

            if b == b'\\' && j + 1 < end && self.bytes[j + 1].is_ascii_punctuation() {
                j += 2;
                continue;
            }

            // Delimiters inside code spans are not closers
            if b == b'`' {
                match self.try_parse_code_span(j, end) {
                    Some((_, new_j)) => j = new_j,
                    None => j += self.run_length(j, end, b'`'),
                }
                continue;
            }

            if b == delimiter {
                let run = self.run_length(j, end, delimiter);

                if run >= width && self.can_close(j, run, end, delimiter) {
                    // A symmetric run like `***x***` closes from its end
                    let close_start = if run == opener_run { j + run - width } else { j };
                    if close_start > content_start {
                        return Some(close_start);
                    }
                }

                // A nested span that opens here is skipped as a whole
                if let Some((nested_width, nested_close)) = self.match_emphasis(j, end) {
                    j = nested_close + nested_width;
                    continue;
                }

                j += run;
                continue;
            }

            j += 1;
        }

        None
    }

    /// Whether any `delimiter` at or after `from` could close a span.
    ///
    /// Scans only the part of the range no earlier call has covered.
    fn may_close_after(&self, delimiter: u8, from: usize, end: usize) -> bool {
        let scan_to = match self.closer_bounds.borrow().get(&(delimiter, end)) {
            Some(CloserBound::At(last)) => return *last >= from,
            Some(CloserBound::NoneFrom(lowest)) if from >= *lowest => return false,
            Some(CloserBound::NoneFrom(lowest)) => *lowest,
            None => end,
        };

        let mut last = None;
        let mut i = from;
        while i < scan_to {
            if self.bytes[i] != delimiter {
                i += 1;
                continue;
            }
            let run = self.run_length(i, end, delimiter);
            if self.can_close(i, run, end, delimiter) {
                last = Some(i);
            }
            // Positions inside a run follow a delimiter, not whitespace
            if run > 1 && self.can_close(i + 1, run - 1, end, delimiter) {
                last = Some(i + run - 1);
            }
            i += run;
        }

        let bound = match last {
            Some(last) => CloserBound::At(last),
            None => CloserBound::NoneFrom(from),
        };
        self.closer_bounds
            .borrow_mut()
            .insert((delimiter, end), bound);
        last.is_some()
    }

    fn try_parse_link(&self, start: usize, end: usize) -> Option<(Inline, usize)> {
        let (text_start, text_end) = self.find_bracket_text(start, end)?;
        let (href, title, new_i) = self.parse_link_target(text_start, text_end, end)?;
        let children = self.nested().parse_range(text_start, text_end);

        Some((
            Inline::Link {
                href,
                title,
                children,
            },
            new_i,
        ))
    }

    fn try_parse_image(&self, start: usize, end: usize) -> Option<(Inline, usize)> {
        // Skip the '!' and parse the rest like a link
        let (text_start, text_end) = self.find_bracket_text(start + 1, end)?;
        let (src, title, new_i) = self.parse_link_target(text_start, text_end, end)?;
        let alt = self.nested().parse_range(text_start, text_end);

        Some((Inline::Image { src, title, alt }, new_i))
    }

    /// Find the bracketed text starting at `[`, returning its inner range
    fn find_bracket_text(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        let mut cache = self.bracket_pairs.borrow_mut();
        let (from, pairs) = cache
            .entry(end)
            .or_insert_with(|| (start, self.pair_brackets(start, end)));
        if start < *from {
            *from = start;
            *pairs = self.pair_brackets(start, end);
        }

        pairs.get(&start).map(|&close| (start + 1, close))
    }

    /// Match every `[` in `start..end` with its `]` in one pass
    fn pair_brackets(&self, start: usize, end: usize) -> HashMap<usize, usize> {
        let mut pairs = HashMap::new();
        let mut open = Vec::new();
        let mut i = start;

        while i < end {
            match self.bytes[i] {
                b'\\' if i + 1 < end => i += 1,
                b'[' => open.push(i),
                b']' => {
                    if let Some(opener) = open.pop() {
                        pairs.insert(opener, i);
                    }
                }
                _ => {}
            }
            i += 1;
        }

        pairs
    }

    /// Parse what follows `]`: an inline `(dest "title")` or a reference
    fn parse_link_target(
        &self,
        text_start: usize,
        text_end: usize,
        end: usize,
    ) -> Option<(String, Option<String>, usize)> {
        let after = text_end + 1;

        if after < end && self.bytes[after] == b'(' {
            return self.parse_inline_destination(after, end);
        }

        // Full `[text][label]` or collapsed `[text][]` reference
        if after < end && self.bytes[after] == b'[' {
            let close = self.bytes[after + 1..end].iter().position(|&b| b == b']')?;
            let label_end = after + 1 + close;
            let label = &self.text[after + 1..label_end];
            let label = if label.trim().is_empty() {
                &self.text[text_start..text_end]
            } else {
                label
            };
            let definition = self.definitions.get(&normalize_label(label))?;
            return Some((
                definition.destination.clone(),
                definition.title.clone(),
                label_end + 1,
            ));
        }

        // Shortcut `[text]` reference
        let definition = self
            .definitions
            .get(&normalize_label(&self.text[text_start..text_end]))?;
        Some((
            definition.destination.clone(),
            definition.title.clone(),
            after,
        ))
    }

    fn parse_inline_destination(
        &self,
        open_paren: usize,
        end: usize,
    ) -> Option<(String, Option<String>, usize)> {
        let mut i = self.skip_whitespace(open_paren + 1, end);

        let destination = if i < end && self.bytes[i] == b'<' {
            // Angle-bracket enclosed destination
            let dest_start = i + 1;
            i = dest_start;
            while i < end && self.bytes[i] != b'>' && self.bytes[i] != b'\n' {
                if self.bytes[i] == b'\\' && i + 1 < end {
                    i += 1;
                }
                i += 1;
            }
            if i >= end || self.bytes[i] != b'>' {
                return None;
            }
            let raw = &self.text[dest_start..i];
            i += 1;
            process_backslash_escapes(raw)
        } else {
            // Raw destination: no whitespace, balanced parentheses
            let dest_start = i;
            let mut paren_depth = 0;
            while i < end {
                match self.bytes[i] {
                    b'(' => paren_depth += 1,
                    b')' => {
                        if paren_depth == 0 {
                            break;
                        }
                        paren_depth -= 1;
                    }
                    b'\\' if i + 1 < end => i += 1,
                    b if b.is_ascii_whitespace() => break,
                    _ => {}
                }
                i += 1;
            }
            process_backslash_escapes(&self.text[dest_start..i])
        };

        let before_title = i;
        i = self.skip_whitespace(i, end);

        let mut title = None;
        if i > before_title && i < end && matches!(self.bytes[i], b'"' | b'\'' | b'(') {
            let close = if self.bytes[i] == b'(' {
                b')'
            } else {
                self.bytes[i]
            };
            let title_start = i + 1;
            i = title_start;
            while i < end && self.bytes[i] != close {
                if self.bytes[i] == b'\\' && i + 1 < end {
                    i += 1;
                }
                i += 1;
            }
            if i >= end {
                return None;
            }
            title = Some(process_backslash_escapes(&self.text[title_start..i]));
            i = self.skip_whitespace(i + 1, end);
        }

        if i >= end || self.bytes[i] != b')' {
            return None;
        }

        Some((destination, title, i + 1))
    }

    fn skip_whitespace(&self, mut i: usize, end: usize) -> usize {
        while i < end && matches!(self.bytes[i], b' ' | b'\t' | b'\n') {
            i += 1;
        }
        i
    }

    /// `<scheme:rest>` autolinks; the link text is the URL itself
    fn try_parse_autolink(&self, start: usize, end: usize) -> Option<(Inline, usize)> {
        let scheme_start = start + 1;
        let mut i = scheme_start;
        while i < end && i - scheme_start <= 32 && is_scheme_byte(self.bytes[i]) {
            i += 1;
        }

        let scheme_len = i - scheme_start;
        if !(2..=32).contains(&scheme_len)
            || !self.bytes[scheme_start].is_ascii_alphabetic()
            || i >= end
            || self.bytes[i] != b':'
        {
            return None;
        }

        // The URL stops at the first `>`; whitespace, `<` or a control char
        // before it means this is not an autolink
        let rest_start = i + 1;
        let stop = self.text[rest_start..end]
            .find(|c: char| c == '>' || c == '<' || c.is_whitespace() || c.is_control())?;
        let close = rest_start + stop;
        if stop == 0 || self.bytes[close] != b'>' {
            return None;
        }
        let url = &self.text[scheme_start..close];

        let children = vec![Spanned::new(
            Inline::Text(url.to_string()),
            Span::new(start + 1, close),
        )];
        Some((
            Inline::Link {
                href: url.to_string(),
                title: None,
                children,
            },
            close + 1,
        ))
    }
}

fn is_scheme_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'+' | b'.' | b'-')
}

fn is_special(b: u8) -> bool {
    matches!(b, b'\\' | b'`' | b'!' | b'[' | b'<' | b'*' | b'_' | b' ')
}

/// Append literal text, merging with a directly preceding text span
fn push_text(nodes: &mut Vec<Spanned<Inline>>, text: &str, span: Span) {
    if let Some(last) = nodes.last_mut()
        && last.span.end == span.start
        && let Inline::Text(existing) = &mut last.node
    {
        existing.push_str(text);
        last.span.end = span.end;
        return;
    }
    nodes.push(Spanned::new(Inline::Text(text.to_string()), span));
}

/// Process backslash escapes in a string (for link destinations/titles)
pub(crate) fn process_backslash_escapes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\\'
            && let Some(&next) = chars.peek()
            && next.is_ascii_punctuation()
        {
            result.push(next);
            chars.next();
        } else {
            result.push(ch);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::plain_text;

    fn parse(text: &str) -> Vec<Inline> {
        resolve(text, &Definitions::new())
            .into_iter()
            .map(|spanned| spanned.node)
            .collect()
    }

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    fn assert_tiles(input: &str, spans: &[Spanned<Inline>]) {
        let mut pos = 0;
        for span in spans {
            assert_eq!(span.span.start, pos, "gap or overlap in {input:?}");
            pos = span.span.end;
        }
        assert_eq!(pos, input.len(), "spans do not reach the end of {input:?}");
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(parse("hello world"), vec![text("hello world")]);
    }

    #[test]
    fn test_strong_before_emphasis() {
        let nodes = parse("**bold**");
        assert!(matches!(&nodes[..], [Inline::Strong(_)]));
    }

    #[test]
    fn test_triple_delimiters_nest() {
        let nodes = parse("***both***");
        let [Inline::Strong(children)] = &nodes[..] else {
            panic!("expected strong, got {nodes:?}");
        };
        assert!(matches!(children[0].node, Inline::Emphasis(_)));
    }

    #[test]
    fn test_emphasis_with_nested_strong() {
        let nodes = parse("*a **b** c*");
        let [Inline::Emphasis(children)] = &nodes[..] else {
            panic!("expected emphasis, got {nodes:?}");
        };
        assert!(
            children
                .iter()
                .any(|child| matches!(child.node, Inline::Strong(_)))
        );
    }

    #[test]
    fn test_unmatched_delimiter_is_literal() {
        assert_eq!(parse("a * b"), vec![text("a * b")]);
        assert_eq!(parse("**open"), vec![text("**open")]);
    }

    #[test]
    fn test_intraword_underscore_is_literal() {
        assert_eq!(parse("snake_case_name"), vec![text("snake_case_name")]);
    }

    #[test]
    fn test_code_span_suppresses_emphasis() {
        assert_eq!(parse("`*not em*`"), vec![Inline::Code("*not em*".to_string())]);
    }

    #[test]
    fn test_double_backtick_code_span() {
        assert_eq!(parse("`` a`b ``"), vec![Inline::Code("a`b".to_string())]);
    }

    #[test]
    fn test_unclosed_backtick_is_literal() {
        assert_eq!(parse("`open"), vec![text("`open")]);
    }

    #[test]
    fn test_link_with_title() {
        let nodes = parse("[x](y \"z\")");
        let [Inline::Link { href, title, children }] = &nodes[..] else {
            panic!("expected link, got {nodes:?}");
        };
        assert_eq!(href, "y");
        assert_eq!(title.as_deref(), Some("z"));
        assert_eq!(plain_text(children), "x");
    }

    #[test]
    fn test_link_text_is_resolved_but_not_relinked() {
        let nodes = parse("[*a* [b](c)](d)");
        let [Inline::Link { children, .. }] = &nodes[..] else {
            panic!("expected link, got {nodes:?}");
        };
        assert!(matches!(children[0].node, Inline::Emphasis(_)));
        assert!(
            !children
                .iter()
                .any(|child| matches!(child.node, Inline::Link { .. }))
        );
    }

    #[test]
    fn test_image() {
        let nodes = parse("![alt *text*](pic.png)");
        let [Inline::Image { src, alt, .. }] = &nodes[..] else {
            panic!("expected image, got {nodes:?}");
        };
        assert_eq!(src, "pic.png");
        assert_eq!(plain_text(alt), "alt text");
    }

    #[test]
    fn test_unclosed_link_is_literal() {
        assert_eq!(parse("[x](y"), vec![text("[x](y")]);
        assert_eq!(parse("[x] y"), vec![text("[x] y")]);
    }

    #[test]
    fn test_reference_link() {
        let mut definitions = Definitions::new();
        definitions.insert(
            normalize_label("Foo  Bar"),
            LinkDefinition {
                destination: "/url".to_string(),
                title: None,
            },
        );
        for input in ["[x][foo bar]", "[FOO BAR][]", "[foo bar]"] {
            let nodes = resolve(input, &definitions);
            assert!(
                matches!(&nodes[0].node, Inline::Link { href, .. } if href == "/url"),
                "{input:?} gave {nodes:?}"
            );
        }
    }

    #[test]
    fn test_autolink() {
        let nodes = parse("see <https://example.com>");
        assert!(matches!(
            &nodes[1],
            Inline::Link { href, .. } if href == "https://example.com"
        ));
        assert_eq!(parse("<ab:c d>"), vec![text("<ab:c d>")]);
        assert_eq!(parse("<a:b>"), vec![text("<a:b>")]);
    }

    #[test]
    fn test_backslash_escape() {
        assert_eq!(parse("\\*literal\\*"), vec![text("*literal*")]);
    }

    #[test]
    fn test_hard_line_break() {
        let nodes = parse("one  \ntwo");
        assert_eq!(nodes, vec![text("one"), Inline::LineBreak, text("two")]);
    }

    #[test]
    fn test_spans_tile_input() {
        for input in [
            "**bold** and *italic*",
            "a `code` b [link](url \"t\") ![img](src) c",
            "unmatched ** and _ and ` and [",
            "***x*** \\* <http://a.b>",
            "ünïcödé *émph* ✓",
        ] {
            assert_tiles(input, &resolve(input, &Definitions::new()));
        }
    }

    #[test]
    fn test_unmatched_openers_stay_literal() {
        let input = "*a ".repeat(20_000);
        let nodes = parse(&input);
        assert_eq!(nodes, vec![text(&input)]);

        let input = "_a __b ".repeat(10_000);
        assert_eq!(parse(&input), vec![text(&input)]);
    }

    #[test]
    fn test_deep_emphasis_is_capped() {
        let input = format!("{}x{}", "*a ".repeat(3_000), " a*".repeat(3_000));
        let spans = resolve(&input, &Definitions::new());
        assert_tiles(&input, &spans);

        let mut depth = 0;
        let mut nodes = &spans;
        while let Some(children) = nodes.iter().find_map(|spanned| match &spanned.node {
            Inline::Emphasis(children) => Some(children),
            _ => None,
        }) {
            depth += 1;
            nodes = children;
        }
        assert_eq!(depth, MAX_EMPHASIS_DEPTH);

        let literal = 3_000 - MAX_EMPHASIS_DEPTH;
        let expected = format!(
            "{}{}x{}{}",
            "a ".repeat(MAX_EMPHASIS_DEPTH),
            "*a ".repeat(literal),
            " a*".repeat(literal),
            " a".repeat(MAX_EMPHASIS_DEPTH),
        );
        assert_eq!(plain_text(&spans), expected);
    }

    #[test]
    fn test_unmatched_brackets_and_angles() {
        let input = "[".repeat(50_000);
        assert_eq!(parse(&input), vec![text(&input)]);

        let input = format!("{}[a]({})", "[".repeat(10_000), "b");
        let nodes = parse(&input);
        assert_eq!(nodes[0], text(&"[".repeat(10_000)));
        assert!(matches!(&nodes[1], Inline::Link { href, .. } if href == "b"));

        let input = "<".repeat(50_000);
        assert_eq!(parse(&input), vec![text(&input)]);

        let input = "<ab:".repeat(20_000);
        assert_eq!(parse(&input), vec![text(&input)]);
    }

    #[test]
    fn test_code_spans_between_unmatched_openers() {
        let nodes = parse(&"*a `x` ".repeat(5_000));
        let code = nodes
            .iter()
            .filter(|node| matches!(node, Inline::Code(code) if code == "x"))
            .count();
        assert_eq!(code, 5_000);
        assert!(!nodes.iter().any(|node| matches!(node, Inline::Emphasis(_))));

        assert_eq!(parse("`a`` b `"), vec![Inline::Code("a`` b ".to_string())]);
    }

    #[test]
    fn test_normalize_label_case_folds() {
        assert_eq!(normalize_label("  Straße\tX "), "strasse x");
    }
}
