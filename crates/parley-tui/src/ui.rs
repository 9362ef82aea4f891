use parley_core::services::markdown::{self as md, InlineSpan, InlineStyle, ListMarker};
use parley_core::services::{Rgb, render_markdown};
use parley_core::{Message, NotificationLevel, Role, Theme};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, List, ListItem, ListState, Paragraph, Wrap};

use crate::app::{App, InputMode};

const SIDEBAR_WIDTH: u16 = 32;
const KEY_HINT: &str = "Enter send · Shift+Enter newline · ^N new · ^R retry · ^E edit · \
     ^L/^K feedback · ^Y copy · ^G copy code · ^O share · ^S export · ^T theme · ^B sidebar · ^C quit";

/// Colors for one theme
#[derive(Clone, Copy, Debug)]
pub struct Palette {
    pub fg: Color,
    pub bg: Color,
    pub muted: Color,
    pub accent: Color,
    pub user: Color,
    pub assistant: Color,
    pub error: Color,
    pub success: Color,
    pub code_bg: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                fg: Color::Rgb(236, 236, 236),
                bg: Color::Rgb(33, 33, 33),
                muted: Color::Rgb(140, 140, 140),
                accent: Color::Rgb(120, 180, 255),
                user: Color::Rgb(130, 210, 255),
                assistant: Color::Rgb(200, 160, 255),
                error: Color::Rgb(255, 110, 110),
                success: Color::Rgb(120, 220, 140),
                code_bg: Color::Rgb(23, 23, 23),
            },
            Theme::Light => Self {
                fg: Color::Rgb(33, 33, 33),
                bg: Color::Rgb(255, 255, 255),
                muted: Color::Rgb(110, 110, 110),
                accent: Color::Rgb(20, 90, 200),
                user: Color::Rgb(0, 110, 170),
                assistant: Color::Rgb(120, 60, 180),
                error: Color::Rgb(190, 30, 30),
                success: Color::Rgb(20, 130, 60),
                code_bg: Color::Rgb(244, 244, 244),
            },
        }
    }
}

pub fn draw(frame: &mut Frame, app: &App) {
    let palette = Palette::for_theme(app.controller.theme());
    let base = Style::default().fg(palette.fg).bg(palette.bg);
    frame.render_widget(Block::default().style(base), frame.area());

    let [main, input, status] = Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(app.input_rows() + 2),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let transcript_area = if app.controller.sidebar().is_open() {
        let [sidebar, transcript] =
            Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(10)])
                .areas(main);
        draw_sidebar(frame, app, sidebar, &palette);
        transcript
    } else {
        main
    };

    draw_transcript(frame, app, transcript_area, &palette);
    draw_input(frame, app, input, &palette);
    draw_status(frame, app, status, &palette);
}

fn draw_sidebar(frame: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let chats = app.controller.chats();
    let items: Vec<ListItem> = chats
        .iter()
        .map(|chat| ListItem::new(Line::from(chat.title.clone())))
        .collect();

    let selected = app
        .controller
        .current_chat_id()
        .and_then(|id| chats.iter().position(|c| &c.id == id));
    let mut state = ListState::default().with_selected(selected);

    let list = List::new(items)
        .block(
            Block::bordered()
                .title(" Chats ")
                .border_style(Style::default().fg(palette.muted)),
        )
        .highlight_style(
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_transcript(frame: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let theme = app.controller.theme();
    let chat = app.controller.current_chat();

    let mut title = chat
        .map(|c| format!(" {} ", c.title))
        .unwrap_or_else(|| " Parley ".to_string());
    if app.controller.is_loading() {
        title.push_str("· thinking… ");
    }

    let mut lines: Vec<Line<'static>> = Vec::new();
    match chat {
        Some(chat) if !chat.is_empty() => {
            for message in &chat.messages {
                lines.push(message_header(message, palette));
                lines.extend(message_lines(&message.content, theme, palette));
                lines.push(Line::default());
            }
        }
        _ => {
            lines.push(Line::styled(
                "How can I help you today?",
                Style::default().fg(palette.muted),
            ));
        }
    }

    let block = Block::bordered()
        .title(title)
        .border_style(Style::default().fg(palette.muted));
    let inner = block.inner(area);
    let total = wrapped_height(&lines, inner.width);
    let offset = total
        .saturating_sub(inner.height)
        .saturating_sub(app.scroll_back);

    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));
    frame.render_widget(paragraph, area);
}

fn draw_input(frame: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let (title, border) = match &app.mode {
        InputMode::Compose => (" Message ", palette.muted),
        InputMode::Edit(_) => (" Edit message (Enter save, Esc cancel) ", palette.accent),
        InputMode::ConfirmDelete => (" Delete all chats? ", palette.error),
    };

    let block = Block::bordered()
        .title(title)
        .border_style(Style::default().fg(border));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.mode == InputMode::ConfirmDelete {
        let prompt = Paragraph::new("Press y to confirm, any other key to cancel")
            .style(Style::default().fg(palette.error));
        frame.render_widget(prompt, inner);
    } else {
        frame.render_widget(&app.textarea, inner);
    }
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let line = match &app.status {
        Some(note) => {
            let color = match note.level {
                NotificationLevel::Success => palette.success,
                NotificationLevel::Info => palette.accent,
                NotificationLevel::Error => palette.error,
            };
            Line::styled(note.message.clone(), Style::default().fg(color))
        }
        None => Line::styled(KEY_HINT, Style::default().fg(palette.muted)),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn message_header(message: &Message, palette: &Palette) -> Line<'static> {
    let (label, color) = match message.role {
        Role::User => ("You", palette.user),
        Role::Assistant => ("Assistant", palette.assistant),
    };
    let mut spans = vec![
        Span::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {}", message.timestamp.format("%H:%M")),
            Style::default().fg(palette.muted),
        ),
    ];
    if message.is_error() {
        spans.push(Span::styled("  [error · ^R to retry]", Style::default().fg(palette.error)));
    }
    if message.is_liked() {
        spans.push(Span::styled("  [+1]", Style::default().fg(palette.success)));
    }
    if message.is_disliked() {
        spans.push(Span::styled("  [-1]", Style::default().fg(palette.error)));
    }
    Line::from(spans)
}

/// Markdown body of one message as terminal lines
pub fn message_lines(content: &str, theme: Theme, palette: &Palette) -> Vec<Line<'static>> {
    let rendered = render_markdown(content, theme);
    let mut lines = Vec::new();
    for (i, block) in rendered.blocks.iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        block_lines(block, palette, &mut lines);
    }
    lines
}

fn block_lines(block: &md::Block, palette: &Palette, out: &mut Vec<Line<'static>>) {
    match block {
        md::Block::Heading { level, spans } => {
            let mut style = Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD);
            if *level == 1 {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            out.push(Line::from(inline_spans(spans, palette, style)));
        }
        md::Block::Paragraph(spans) => {
            out.push(Line::from(inline_spans(spans, palette, Style::default())));
        }
        md::Block::BlockQuote(inner) => {
            let mut quoted = Vec::new();
            for (i, block) in inner.iter().enumerate() {
                if i > 0 {
                    quoted.push(Line::default());
                }
                block_lines(block, palette, &mut quoted);
            }
            for line in quoted {
                let mut spans = vec![Span::styled("│ ", Style::default().fg(palette.muted))];
                spans.extend(line.spans);
                out.push(Line::from(spans));
            }
        }
        md::Block::List(items) => {
            for item in items {
                let marker = match &item.marker {
                    ListMarker::Bullet => "• ".to_string(),
                    ListMarker::Number(n) => format!("{n}. "),
                };
                let mut spans = vec![Span::styled(
                    format!("{}{}", "  ".repeat(item.depth), marker),
                    Style::default().fg(palette.accent),
                )];
                spans.extend(inline_spans(&item.spans, palette, Style::default()));
                out.push(Line::from(spans));
            }
        }
        md::Block::Table { header, rows } => {
            let separator = Span::styled(" │ ", Style::default().fg(palette.muted));
            let row_line = |cells: &[Vec<InlineSpan>], base: Style| {
                let mut spans = Vec::new();
                for (i, cell) in cells.iter().enumerate() {
                    if i > 0 {
                        spans.push(separator.clone());
                    }
                    spans.extend(inline_spans(cell, palette, base));
                }
                Line::from(spans)
            };
            out.push(row_line(header, Style::default().add_modifier(Modifier::BOLD)));
            out.push(Line::styled(
                "─".repeat(24),
                Style::default().fg(palette.muted),
            ));
            for row in rows {
                out.push(row_line(row, Style::default()));
            }
        }
        md::Block::Rule => {
            out.push(Line::styled("─".repeat(40), Style::default().fg(palette.muted)));
        }
        md::Block::Code(code) => {
            let muted = Style::default().fg(palette.muted).bg(palette.code_bg);
            out.push(Line::styled(format!("┌─ {} ", code.language), muted));
            for line in &code.lines {
                let mut spans = vec![Span::styled(format!("{:>3} │ ", line.number), muted)];
                spans.extend(line.spans.iter().map(|s| {
                    Span::styled(
                        s.text.clone(),
                        Style::default().fg(rgb(s.color)).bg(palette.code_bg),
                    )
                }));
                out.push(Line::from(spans));
            }
            out.push(Line::styled("└─", muted));
        }
    }
}

fn inline_spans(spans: &[InlineSpan], palette: &Palette, base: Style) -> Vec<Span<'static>> {
    let mut out = Vec::with_capacity(spans.len());
    for span in spans {
        match &span.style {
            InlineStyle::Plain => out.push(Span::styled(span.text.clone(), base)),
            InlineStyle::Code => out.push(Span::styled(
                span.text.clone(),
                base.fg(palette.accent).bg(palette.code_bg),
            )),
            InlineStyle::Bold => out.push(Span::styled(
                span.text.clone(),
                base.add_modifier(Modifier::BOLD),
            )),
            InlineStyle::Italic => out.push(Span::styled(
                span.text.clone(),
                base.add_modifier(Modifier::ITALIC),
            )),
            InlineStyle::Link { url } => {
                out.push(Span::styled(
                    span.text.clone(),
                    base.fg(palette.accent).add_modifier(Modifier::UNDERLINED),
                ));
                out.push(Span::styled(
                    format!(" <{url}>"),
                    Style::default().fg(palette.muted),
                ));
            }
        }
    }
    out
}

fn rgb(color: Rgb) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

/// Rows needed to show `lines` wrapped at `width`
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = width.max(1) as usize;
    let rows: usize = lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum();
    rows.min(u16::MAX as usize) as u16
}
