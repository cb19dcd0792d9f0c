use mdpage::ast::{Block, Inline, Spanned, plain_text};
use mdpage::inline::{Definitions, resolve};
use mdpage::parser::{Parser, segment};
use mdpage::{DEFAULT_TITLE, convert_markdown_to_html_fragment, wrap_fragment_as_document};
use proptest::prelude::*;

/// Text drawn mostly from characters that mean something to the parser
fn markdownish() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            4 => prop::char::range('a', 'e'),
            1 => Just(' '),
            1 => Just('\n'),
            1 => prop::sample::select(vec![
                '#', '*', '_', '`', '[', ']', '(', ')', '!', '<', '>', '-', '+', '.', '1', '\\',
                '"', '&', '=', '~', '\t', 'é',
            ]),
        ],
        0..160,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

fn assert_tiles(text: &str, spans: &[Spanned<Inline>]) -> Result<(), TestCaseError> {
    let mut pos = 0;
    for span in spans {
        prop_assert_eq!(span.span.start, pos);
        prop_assert!(span.span.end > span.span.start);
        pos = span.span.end;
    }
    prop_assert_eq!(pos, text.len());
    Ok(())
}

proptest! {
    #[test]
    fn prop_conversion_is_total(source in markdownish()) {
        let _ = convert_markdown_to_html_fragment(&source);
    }

    #[test]
    fn prop_conversion_is_total_on_any_text(source in "\\PC{0,200}") {
        let _ = convert_markdown_to_html_fragment(&source);
    }

    #[test]
    fn prop_script_tags_never_survive(prefix in markdownish(), suffix in markdownish()) {
        let source = format!("{prefix}<script>alert('x')</script>{suffix}");
        let html = convert_markdown_to_html_fragment(&source);
        prop_assert!(!html.to_ascii_lowercase().contains("<script"));
    }

    #[test]
    fn prop_inline_spans_tile_block_text(text in markdownish()) {
        let spans = resolve(&text, &Definitions::new());
        assert_tiles(&text, &spans)?;
    }

    #[test]
    fn prop_block_spans_increase(source in markdownish()) {
        let blocks = segment(&source);
        let mut last_end = 0;
        for block in &blocks {
            prop_assert!(block.span.start >= last_end);
            prop_assert!(block.span.start <= block.span.end);
            prop_assert!(block.span.end <= source.len());
            prop_assert!(source.is_char_boundary(block.span.start));
            last_end = block.span.end;
        }
    }

    #[test]
    fn prop_plain_words_round_trip(words in prop::collection::vec("[a-z]{1,8}", 1..12)) {
        let source = words.join(" ");
        let document = Parser::new().parse(&source);
        let [block] = &document.blocks[..] else {
            return Err(TestCaseError::fail("expected a single block"));
        };
        let Block::Paragraph(children) = &block.node else {
            return Err(TestCaseError::fail("expected a paragraph"));
        };
        prop_assert_eq!(plain_text(children), source.clone());
        prop_assert_eq!(
            convert_markdown_to_html_fragment(&source),
            format!("<p>{source}</p>\n")
        );
    }

    #[test]
    fn prop_emphasis_keeps_visible_text(word in "[a-z]{1,10}", rest in "[a-z ]{0,20}") {
        let source = format!("**{word}** {rest}");
        let spans = resolve(&source, &Definitions::new());
        prop_assert!(matches!(spans[0].node, Inline::Strong(_)));
        prop_assert_eq!(plain_text(&spans), format!("{word} {rest}"));
    }

    #[test]
    fn prop_wrapping_is_deterministic(fragment in markdownish(), title in "[A-Za-z ]{0,20}") {
        prop_assert_eq!(
            wrap_fragment_as_document(&fragment, &title),
            wrap_fragment_as_document(&fragment, &title)
        );
        let page = wrap_fragment_as_document(&fragment, DEFAULT_TITLE);
        prop_assert!(page.contains(&fragment));
    }
}
