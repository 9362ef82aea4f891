use once_cell::sync::Lazy;
use regex::Regex;

use super::syntax_highlighter::{HighlightedSpan, highlight_lines, resolve_language};
use crate::models::Theme;

static HEADING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s{0,3}(#{1,6})\s+(.*?)(?:\s+#+)?\s*$").expect("HEADING_REGEX pattern is valid")
});

// A backtick fence's info string may not contain a backtick, so a line like
// "```ls``` lists files" is inline code rather than an opening fence.
static FENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s*)(?:(?P<ticks>`{3,})(?P<tick_info>[^`]*)|(?P<tildes>~{3,})(?P<tilde_info>.*))$")
        .expect("FENCE_REGEX pattern is valid")
});

static BULLET_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)[-*+]\s+(.*)$").expect("BULLET_REGEX pattern is valid"));

static ORDERED_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s*)(\d{1,9})[.)]\s+(.*)$").expect("ORDERED_REGEX pattern is valid")
});

static TABLE_SEPARATOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\|?\s*:?-+:?\s*(\|\s*:?-+:?\s*)*\|?\s*$")
        .expect("TABLE_SEPARATOR_REGEX pattern is valid")
});

// Alternation order matters: code spans win over emphasis, bold over italic.
static INLINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"```(?P<code3>[^`]+?)```",
        r"|``(?P<code2>[^`]+?)``",
        r"|`(?P<code>[^`]+)`",
        r"|\*\*(?P<bold>[^*]+?)\*\*",
        r"|__(?P<bold_alt>[^_]+?)__",
        r"|\[(?P<link_text>[^\]]+)\]\((?P<link_url>[^)\s]+)\)",
        r"|\*(?P<italic>[^*\s][^*]*?)\*",
        r"|\b_(?P<italic_alt>[^_]+?)_\b",
    ))
    .expect("INLINE_REGEX pattern is valid")
});

/// Inline styling of a text run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InlineStyle {
    Plain,
    Code,
    Bold,
    Italic,
    Link { url: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineSpan {
    pub text: String,
    pub style: InlineStyle,
}

impl InlineSpan {
    fn new(text: impl Into<String>, style: InlineStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListMarker {
    Bullet,
    Number(u64),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListItem {
    /// Nesting level, 0 for top-level items
    pub depth: usize,
    pub marker: ListMarker,
    pub spans: Vec<InlineSpan>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeLine {
    /// 1-based line number
    pub number: usize,
    pub spans: Vec<HighlightedSpan>,
}

/// Fenced code block with highlighted, numbered lines
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: String,
    pub lines: Vec<CodeLine>,
    /// Payload for the copy action
    pub copy_text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Heading {
        level: u8,
        spans: Vec<InlineSpan>,
    },
    Paragraph(Vec<InlineSpan>),
    BlockQuote(Vec<Block>),
    List(Vec<ListItem>),
    Table {
        header: Vec<Vec<InlineSpan>>,
        rows: Vec<Vec<Vec<InlineSpan>>>,
    },
    Rule,
    Code(CodeBlock),
}

/// Structured rich content for one message body
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderedContent {
    pub blocks: Vec<Block>,
}

impl RenderedContent {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// All code blocks, including those nested in block quotes
    pub fn code_blocks(&self) -> Vec<&CodeBlock> {
        fn collect<'a>(blocks: &'a [Block], out: &mut Vec<&'a CodeBlock>) {
            for block in blocks {
                match block {
                    Block::Code(code) => out.push(code),
                    Block::BlockQuote(inner) => collect(inner, out),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        collect(&self.blocks, &mut out);
        out
    }
}

/// Render message text into blocks. Never fails: anything unrecognized is
/// kept as paragraph text.
pub fn render_markdown(text: &str, theme: Theme) -> RenderedContent {
    let lines: Vec<&str> = text.lines().collect();
    RenderedContent {
        blocks: parse_blocks(&lines, theme),
    }
}

fn parse_blocks(lines: &[&str], theme: Theme) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if line.trim().is_empty() {
            i += 1;
            continue;
        }

        if let Some(caps) = FENCE_REGEX.captures(line) {
            let indent = caps.get(1).map_or(0, |m| m.as_str().len());
            let (fence, info) = match (caps.name("ticks"), caps.name("tildes")) {
                (Some(ticks), _) => (ticks.as_str(), caps.name("tick_info")),
                (None, Some(tildes)) => (tildes.as_str(), caps.name("tilde_info")),
                (None, None) => ("```", None),
            };
            let annotation = info.and_then(|m| m.as_str().split_whitespace().next());
            let (block, next) = parse_code_block(lines, i + 1, indent, fence, annotation, theme);
            blocks.push(Block::Code(block));
            i = next;
            continue;
        }

        if let Some(caps) = HEADING_REGEX.captures(line) {
            let level = caps.get(1).map_or(1, |m| m.as_str().len()) as u8;
            let content = caps.get(2).map_or("", |m| m.as_str());
            blocks.push(Block::Heading {
                level,
                spans: parse_inline(content),
            });
            i += 1;
            continue;
        }

        if is_rule(line) {
            blocks.push(Block::Rule);
            i += 1;
            continue;
        }

        if is_quote(line) {
            let mut inner = Vec::new();
            while i < lines.len() && is_quote(lines[i]) {
                inner.push(strip_quote(lines[i]));
                i += 1;
            }
            blocks.push(Block::BlockQuote(parse_blocks(&inner, theme)));
            continue;
        }

        if list_item(line).is_some() {
            let (items, next) = parse_list(lines, i);
            blocks.push(Block::List(items));
            i = next;
            continue;
        }

        if let Some((header, next)) = table_start(lines, i) {
            let mut rows = Vec::new();
            i = next;
            while i < lines.len() && lines[i].contains('|') && !lines[i].trim().is_empty() {
                let mut cells = split_row(lines[i]);
                cells.resize(header.len(), String::new());
                rows.push(cells.iter().map(|c| parse_inline(c)).collect());
                i += 1;
            }
            blocks.push(Block::Table {
                header: header.iter().map(|c| parse_inline(c)).collect(),
                rows,
            });
            continue;
        }

        let mut paragraph = vec![line.trim()];
        i += 1;
        while i < lines.len() && !starts_block(lines, i) {
            paragraph.push(lines[i].trim());
            i += 1;
        }
        blocks.push(Block::Paragraph(parse_inline(&paragraph.join(" "))));
    }

    blocks
}

/// Consume a fenced block body starting at `start`. An unterminated fence
/// runs to the end of input.
fn parse_code_block(
    lines: &[&str],
    start: usize,
    indent: usize,
    fence: &str,
    annotation: Option<&str>,
    theme: Theme,
) -> (CodeBlock, usize) {
    let fence_char = fence.chars().next().unwrap_or('`');
    let mut body = Vec::new();
    let mut i = start;

    while i < lines.len() {
        let trimmed = lines[i].trim();
        let is_close = trimmed.len() >= fence.len() && trimmed.chars().all(|c| c == fence_char);
        if is_close {
            i += 1;
            break;
        }
        body.push(strip_indent(lines[i], indent));
        i += 1;
    }

    // Numbered lines and the copy payload come from the same trimmed text.
    // Leading blank lines go, but the first line keeps its indentation.
    let first = body
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(body.len());
    let code = body[first..].join("\n").trim_end().to_string();
    let language = resolve_language(annotation);
    let lines = highlight_lines(&code, &language, theme)
        .into_iter()
        .enumerate()
        .map(|(idx, spans)| CodeLine {
            number: idx + 1,
            spans,
        })
        .collect();

    (
        CodeBlock {
            language,
            lines,
            copy_text: code,
        },
        i,
    )
}

fn strip_indent(line: &str, indent: usize) -> &str {
    let leading = line.len() - line.trim_start_matches(' ').len();
    &line[leading.min(indent)..]
}

fn is_rule(line: &str) -> bool {
    let mut marks = line.chars().filter(|c| !c.is_whitespace());
    let Some(first) = marks.next() else {
        return false;
    };
    matches!(first, '-' | '*' | '_') && {
        let rest: Vec<char> = marks.collect();
        rest.len() >= 2 && rest.iter().all(|&c| c == first)
    }
}

fn is_quote(line: &str) -> bool {
    line.trim_start().starts_with('>')
}

fn strip_quote(line: &str) -> &str {
    let trimmed = line.trim_start();
    let rest = trimmed.strip_prefix('>').unwrap_or(trimmed);
    rest.strip_prefix(' ').unwrap_or(rest)
}

/// `(indent, marker, content)` when `line` is a list item
fn list_item(line: &str) -> Option<(usize, ListMarker, &str)> {
    if let Some(caps) = ORDERED_REGEX.captures(line) {
        let indent = caps.get(1).map_or(0, |m| m.as_str().len());
        let number = caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(1);
        let content = caps.get(3).map_or("", |m| m.as_str());
        return Some((indent, ListMarker::Number(number), content));
    }
    if is_rule(line) {
        return None;
    }
    BULLET_REGEX.captures(line).map(|caps| {
        let indent = caps.get(1).map_or(0, |m| m.as_str().len());
        let content = caps.get(2).map_or("", |m| m.as_str());
        (indent, ListMarker::Bullet, content)
    })
}

fn parse_list(lines: &[&str], start: usize) -> (Vec<ListItem>, usize) {
    let mut items: Vec<(usize, ListMarker, String)> = Vec::new();
    let mut i = start;

    while i < lines.len() {
        let line = lines[i];
        if let Some((indent, marker, content)) = list_item(line) {
            items.push((indent / 2, marker, content.trim().to_string()));
            i += 1;
            continue;
        }
        if line.trim().is_empty() {
            // A blank line only continues the list if another item follows
            if i + 1 < lines.len() && list_item(lines[i + 1]).is_some() {
                i += 1;
                continue;
            }
            break;
        }
        let is_continuation = line.starts_with(' ') || line.starts_with('\t');
        match items.last_mut() {
            Some((_, _, text)) if is_continuation => {
                text.push(' ');
                text.push_str(line.trim());
                i += 1;
            }
            _ => break,
        }
    }

    let items = items
        .into_iter()
        .map(|(depth, marker, text)| ListItem {
            depth,
            marker,
            spans: parse_inline(&text),
        })
        .collect();
    (items, i)
}

fn split_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('|').unwrap_or(trimmed);
    trimmed.split('|').map(|c| c.trim().to_string()).collect()
}

/// Header cells and the index after the separator when a table starts at `i`
fn table_start(lines: &[&str], i: usize) -> Option<(Vec<String>, usize)> {
    let header = lines.get(i)?;
    let separator = lines.get(i + 1)?;
    if !header.contains('|') || !separator.contains('-') {
        return None;
    }
    if !TABLE_SEPARATOR_REGEX.is_match(separator) {
        return None;
    }
    let cells = split_row(header);
    (split_row(separator).len() == cells.len()).then_some((cells, i + 2))
}

fn starts_block(lines: &[&str], i: usize) -> bool {
    let line = lines[i];
    line.trim().is_empty()
        || FENCE_REGEX.is_match(line)
        || HEADING_REGEX.is_match(line)
        || is_rule(line)
        || is_quote(line)
        || list_item(line).is_some()
        || table_start(lines, i).is_some()
}

fn push_span(span: InlineSpan, spans: &mut Vec<InlineSpan>) {
    if span.text.is_empty() {
        return;
    }
    if let Some(prev) = spans.last_mut()
        && prev.style == InlineStyle::Plain
        && span.style == InlineStyle::Plain
    {
        prev.text.push_str(&span.text);
        return;
    }
    spans.push(span);
}

/// Split text into styled runs; unmatched text stays plain
pub fn parse_inline(text: &str) -> Vec<InlineSpan> {
    let mut spans: Vec<InlineSpan> = Vec::new();
    let mut last_end = 0;

    for caps in INLINE_REGEX.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > last_end {
            push_span(
                InlineSpan::new(&text[last_end..whole.start()], InlineStyle::Plain),
                &mut spans,
            );
        }

        let code = caps
            .name("code")
            .or_else(|| caps.name("code2"))
            .or_else(|| caps.name("code3"));
        let span = if let Some(m) = code {
            InlineSpan::new(m.as_str(), InlineStyle::Code)
        } else if let Some(m) = caps.name("bold").or_else(|| caps.name("bold_alt")) {
            InlineSpan::new(m.as_str(), InlineStyle::Bold)
        } else if let (Some(label), Some(url)) = (caps.name("link_text"), caps.name("link_url")) {
            InlineSpan::new(
                label.as_str(),
                InlineStyle::Link {
                    url: url.as_str().to_string(),
                },
            )
        } else if let Some(m) = caps.name("italic").or_else(|| caps.name("italic_alt")) {
            InlineSpan::new(m.as_str(), InlineStyle::Italic)
        } else {
            InlineSpan::new(whole.as_str(), InlineStyle::Plain)
        };
        push_span(span, &mut spans);
        last_end = whole.end();
    }

    if last_end < text.len() {
        push_span(
            InlineSpan::new(&text[last_end..], InlineStyle::Plain),
            &mut spans,
        );
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(text: &str) -> Vec<Block> {
        render_markdown(text, Theme::Dark).blocks
    }

    fn plain(text: &str) -> InlineSpan {
        InlineSpan::new(text, InlineStyle::Plain)
    }

    #[test]
    fn test_plain_text_is_one_paragraph() {
        assert_eq!(
            render("Hi there\nhow are you?"),
            vec![Block::Paragraph(vec![plain("Hi there how are you?")])]
        );
    }

    #[test]
    fn test_empty_input_has_no_blocks() {
        assert!(render_markdown("", Theme::Dark).is_empty());
        assert!(render_markdown("\n\n  \n", Theme::Dark).is_empty());
    }

    #[test]
    fn test_inline_styles() {
        let spans = parse_inline("Use `cargo` for **speed**, *care* and [docs](https://docs.rs).");
        assert_eq!(
            spans,
            vec![
                plain("Use "),
                InlineSpan::new("cargo", InlineStyle::Code),
                plain(" for "),
                InlineSpan::new("speed", InlineStyle::Bold),
                plain(", "),
                InlineSpan::new("care", InlineStyle::Italic),
                plain(" and "),
                InlineSpan::new(
                    "docs",
                    InlineStyle::Link {
                        url: "https://docs.rs".into()
                    }
                ),
                plain("."),
            ]
        );
    }

    #[test]
    fn test_snake_case_is_not_italic() {
        assert_eq!(parse_inline("call snake_case_name now"), vec![plain("call snake_case_name now")]);
    }

    #[test]
    fn test_error_body_renders_bold_and_italic() {
        let body = crate::models::message::format_error_body("HTTP error! status: 500");
        let blocks = render(&body);
        assert_eq!(blocks.len(), 2);
        let Block::Paragraph(first) = &blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(first[0], InlineSpan::new("Error:", InlineStyle::Bold));
        assert_eq!(first[1], plain(" HTTP error! status: 500"));
        let Block::Paragraph(second) = &blocks[1] else {
            panic!("expected paragraph");
        };
        assert_eq!(second[0].style, InlineStyle::Italic);
    }

    #[test]
    fn test_headings_and_rule() {
        let blocks = render("# Title\n\n## Sub ##\n\n---\n\n### C#");
        assert_eq!(
            blocks,
            vec![
                Block::Heading {
                    level: 1,
                    spans: vec![plain("Title")]
                },
                Block::Heading {
                    level: 2,
                    spans: vec![plain("Sub")]
                },
                Block::Rule,
                Block::Heading {
                    level: 3,
                    spans: vec![plain("C#")]
                },
            ]
        );
    }

    #[test]
    fn test_code_block_language_and_lines() {
        let blocks = render("Here:\n```py\nx = 1\nprint(x)\n```\nDone.");
        assert_eq!(blocks.len(), 3);
        let Block::Code(code) = &blocks[1] else {
            panic!("expected code block");
        };
        assert_eq!(code.language, "python");
        assert_eq!(code.copy_text, "x = 1\nprint(x)");
        assert_eq!(code.lines.len(), 2);
        assert_eq!(code.lines[1].number, 2);
        let second: String = code.lines[1].spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(second, "print(x)");
    }

    #[test]
    fn test_code_block_without_or_unknown_language() {
        let blocks = render("```\nplain\n```\n\n```klingon\nqapla'\n```");
        let languages: Vec<&str> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::Code(c) => Some(c.language.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(languages, vec!["text", "text"]);
    }

    #[test]
    fn test_unterminated_fence_runs_to_end() {
        let blocks = render("```rust\nfn main() {}\n\nmore");
        assert_eq!(blocks.len(), 1);
        let Block::Code(code) = &blocks[0] else {
            panic!("expected code block");
        };
        assert_eq!(code.copy_text, "fn main() {}\n\nmore");
        assert_eq!(code.lines.len(), 3);
    }

    #[test]
    fn test_blank_edges_are_neither_numbered_nor_copied() {
        let blocks = render("```sh\n\n  ls -la\n\n\n```");
        let Block::Code(code) = &blocks[0] else {
            panic!("expected code block");
        };
        assert_eq!(code.copy_text, "  ls -la");
        assert_eq!(code.lines.len(), 1);
        assert_eq!(code.lines[0].number, 1);
    }

    #[test]
    fn test_inline_triple_backticks_are_not_a_fence() {
        let blocks = render("```ls``` lists files.\n\nThen run it again.\n\n- a list");
        assert_eq!(blocks.len(), 3);
        assert_eq!(
            blocks[0],
            Block::Paragraph(vec![
                InlineSpan::new("ls", InlineStyle::Code),
                plain(" lists files."),
            ])
        );
        assert_eq!(blocks[1], Block::Paragraph(vec![plain("Then run it again.")]));
        assert!(matches!(blocks[2], Block::List(_)));
    }

    #[test]
    fn test_fence_info_string_takes_first_word() {
        let blocks = render("```rust title=main.rs\nfn main() {}\n```\n~~~ `odd` info\nx\n~~~");
        let languages: Vec<&str> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::Code(c) => Some(c.language.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(languages, vec!["rust", "text"]);
    }

    #[test]
    fn test_markdown_inside_fence_is_literal() {
        let blocks = render("```md\n# not a heading\n- not a list\n```");
        assert_eq!(blocks.len(), 1);
        assert!(matches!(blocks[0], Block::Code(_)));
    }

    #[test]
    fn test_lists() {
        let blocks = render("- one\n- two\n  - nested\n\n1. first\n2. second\n   continued");
        assert_eq!(blocks.len(), 1);
        let Block::List(items) = &blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 5);
        assert_eq!(items[2].depth, 1);
        assert_eq!(items[2].spans, vec![plain("nested")]);
        assert_eq!(items[4].marker, ListMarker::Number(2));
        assert_eq!(items[4].spans, vec![plain("second continued")]);
    }

    #[test]
    fn test_block_quote_nests_blocks() {
        let blocks = render("> quoted **text**\n> - item\n\nafter");
        assert_eq!(blocks.len(), 2);
        let Block::BlockQuote(inner) = &blocks[0] else {
            panic!("expected block quote");
        };
        assert_eq!(inner.len(), 2);
        assert!(matches!(inner[1], Block::List(_)));
    }

    #[test]
    fn test_table() {
        let blocks = render("| Name | Age |\n|------|:---:|\n| Ann | 31 |\n| Bob |\n\ntail");
        let Block::Table { header, rows } = &blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(header.len(), 2);
        assert_eq!(header[1], vec![plain("Age")]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], vec![plain("Ann")]);
        // Short rows are padded to the header width
        assert_eq!(rows[1].len(), 2);
        assert!(rows[1][1].is_empty());
        assert!(matches!(blocks[1], Block::Paragraph(_)));
    }

    #[test]
    fn test_pipe_without_separator_is_paragraph() {
        let blocks = render("a | b\nc | d");
        assert_eq!(blocks, vec![Block::Paragraph(vec![plain("a | b c | d")])]);
    }

    #[test]
    fn test_code_blocks_collects_nested() {
        let content = render_markdown("> ```rs\n> let x = 1;\n> ```\n\n```\ny\n```", Theme::Light);
        let langs: Vec<&str> = content
            .code_blocks()
            .iter()
            .map(|c| c.language.as_str())
            .collect();
        assert_eq!(langs, vec!["rust", "text"]);
    }
}
