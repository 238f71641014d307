use crate::state::timeline::{ItemBody, TimelineItem};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthChar;

/// Flattens the timeline into display lines, one prefix style per item kind.
pub fn timeline_lines(timeline: &[TimelineItem]) -> Vec<String> {
    let mut lines = Vec::new();
    for item in timeline {
        match &item.body {
            ItemBody::User { content } => {
                push_prefixed(&mut lines, "> ", content);
                lines.push(String::new());
            }
            ItemBody::Assistant { content } => {
                push_prefixed(&mut lines, "", content);
                lines.push(String::new());
            }
            ItemBody::Thought { content } => {
                push_prefixed(&mut lines, "· ", content);
            }
            ItemBody::ToolCall { name, payload } => {
                lines.push(format!("⚙ {name} {}", compact_json(payload)));
            }
            ItemBody::ToolResult { name, payload } => {
                lines.push(format!("→ {name}: {}", compact_json(payload)));
            }
            ItemBody::Error { content } => {
                push_prefixed(&mut lines, "[error] ", content);
            }
        }
    }
    lines
}

fn push_prefixed(lines: &mut Vec<String>, prefix: &str, content: &str) {
    let mut first = true;
    for line in content.lines() {
        if first {
            lines.push(format!("{prefix}{line}"));
            first = false;
        } else {
            lines.push(format!("{}{line}", " ".repeat(prefix.chars().count())));
        }
    }
    if first {
        lines.push(prefix.trim_end().to_string());
    }
}

fn compact_json(payload: &serde_json::Value) -> String {
    match payload {
        serde_json::Value::String(text) => text.replace('\n', " "),
        other => serde_json::to_string(other).unwrap_or_else(|_| "{}".to_string()),
    }
}

pub fn render_session_bar(frame: &mut Frame<'_>, area: Rect, session_id: &str, count: usize) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let text = truncate_line(&session_bar_text(session_id, count), area.width as usize);
    frame.render_widget(
        Paragraph::new(text).style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        area,
    );
}

fn session_bar_text(session_id: &str, count: usize) -> String {
    format!("workdeck | session {session_id} ({count} total)")
}

/// History pane. `scroll_from_bottom` of zero follows the tail.
pub fn render_timeline(frame: &mut Frame<'_>, area: Rect, lines: &[String], scroll_from_bottom: usize) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let visible = area.height as usize;
    let max_scroll = lines.len().saturating_sub(visible);
    let scroll_top = max_scroll.saturating_sub(scroll_from_bottom.min(max_scroll));

    let paragraph = Paragraph::new(lines.join("\n"))
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: false })
        .scroll((scroll_top as u16, 0));
    frame.render_widget(paragraph, area);
}

pub fn render_editor_panel(
    frame: &mut Frame<'_>,
    area: Rect,
    path: &str,
    content: &str,
    dirty: bool,
) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let marker = if dirty { " *" } else { "" };
    let block = Block::default()
        .borders(Borders::LEFT)
        .title(format!("{path}{marker}"));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    frame.render_widget(
        Paragraph::new(content.to_string())
            .style(Style::default().fg(Color::Gray))
            .wrap(Wrap { trim: false }),
        inner,
    );
}

pub fn render_input(frame: &mut Frame<'_>, area: Rect, input: &str) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let width = area.width.saturating_sub(2).max(1) as usize;
    let visible = tail_window(input, width);
    frame.render_widget(
        Paragraph::new(Line::from(format!("> {visible}")))
            .style(Style::default().fg(Color::Gray)),
        area,
    );

    let cursor_x = area
        .x
        .saturating_add(2 + display_width(&visible) as u16)
        .min(area.x + area.width.saturating_sub(1));
    frame.set_cursor_position((cursor_x, area.y));
}

pub fn render_status_line(frame: &mut Frame<'_>, area: Rect, status: &str) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    let text = truncate_line(status, area.width as usize);
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn display_width(input: &str) -> usize {
    input
        .chars()
        .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(0))
        .sum()
}

/// Keeps the rightmost slice of the input that fits the given display width.
fn tail_window(input: &str, width: usize) -> String {
    let mut used = 0usize;
    let mut out: Vec<char> = Vec::new();
    for ch in input.chars().rev() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + ch_width > width {
            break;
        }
        used += ch_width;
        out.push(ch);
    }
    out.into_iter().rev().collect()
}

fn truncate_line(input: &str, width: usize) -> String {
    let width = width.max(1);
    let mut out = String::new();
    let mut used = 0usize;

    for ch in input.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + ch_width > width {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out
}
