// streamchat - A terminal chat client for streaming model endpoints
// Copyright (C) 2025  Simon Peter Rothgang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::app::{AnswerBlock, BlockCache, ChatMessage, MessageBlock, MessageRole, ReasoningBlock};
use crate::stream::STOPPED_MARKER;
use crate::ui::markdown::{plain_text, render_markdown_safe};
use crate::ui::theme;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

pub const SPINNER_FRAMES: &[char] = &[
    '\u{280B}', '\u{2819}', '\u{2839}', '\u{2838}', '\u{283C}', '\u{2834}', '\u{2826}', '\u{2827}',
    '\u{2807}', '\u{280F}',
];

/// View state shared by every message in a frame, snapshotted before the
/// message loop so the loop can hold `&mut msg`.
#[derive(Clone, Copy)]
pub struct RenderContext {
    pub spinner_frame: usize,
    pub reasoning_collapsed: bool,
}

impl RenderContext {
    fn spinner(self) -> char {
        SPINNER_FRAMES[self.spinner_frame % SPINNER_FRAMES.len()]
    }
}

/// Render a single chat message, reusing per-block caches.
pub fn render_message(
    msg: &mut ChatMessage,
    ctx: RenderContext,
    width: u16,
    out: &mut Vec<Line<'static>>,
) {
    match msg.role {
        MessageRole::User => {
            out.push(role_label("You", theme::ROLE_USER));
            for block in &mut msg.blocks {
                if let MessageBlock::Text(text, cache) = block {
                    render_user_text(text, cache, out);
                }
            }
        }
        MessageRole::System => {
            out.push(role_label("Notice", theme::ROLE_SYSTEM));
            for block in &msg.blocks {
                if let MessageBlock::Text(text, _) = block {
                    out.extend(styled_lines(text, Style::default().fg(theme::ROLE_SYSTEM)));
                }
            }
        }
        MessageRole::Assistant => {
            out.push(role_label("Assistant", theme::ROLE_ASSISTANT));
            for block in &mut msg.blocks {
                render_assistant_block(block, ctx, width, out);
            }
        }
    }

    // Blank separator between messages
    out.push(Line::default());
}

fn role_label(label: &'static str, color: Color) -> Line<'static> {
    Line::from(Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)))
}

fn styled_lines(text: &str, style: Style) -> Vec<Line<'static>> {
    text.split('\n').map(|l| Line::from(Span::styled(l.to_owned(), style))).collect()
}

fn render_assistant_block(
    block: &mut MessageBlock,
    ctx: RenderContext,
    width: u16,
    out: &mut Vec<Line<'static>>,
) {
    match block {
        MessageBlock::Placeholder(kind) => {
            out.push(Line::from(Span::styled(
                format!("{} {}", ctx.spinner(), kind.label()),
                Style::default().fg(theme::DIM),
            )));
        }
        MessageBlock::Reasoning(reasoning) => render_reasoning(reasoning, ctx, width, out),
        MessageBlock::Answer(answer) => render_answer(answer, ctx, out),
        MessageBlock::Text(text, cache) => render_markdown_cached(text, cache, None, out),
        MessageBlock::Error(message) => {
            out.extend(styled_lines(
                &format!("Error: {message}"),
                Style::default().fg(theme::STATUS_ERROR),
            ));
        }
        MessageBlock::Stopped => {
            out.push(Line::from(Span::styled(
                format!("\u{25A0} {STOPPED_MARKER}"),
                Style::default().fg(theme::STATUS_STOPPED).add_modifier(Modifier::ITALIC),
            )));
        }
    }
}

fn render_reasoning(
    reasoning: &mut ReasoningBlock,
    ctx: RenderContext,
    width: u16,
    out: &mut Vec<Line<'static>>,
) {
    let style = Style::default().fg(theme::REASONING).add_modifier(Modifier::ITALIC);
    if ctx.reasoning_collapsed {
        let count = reasoning.text.lines().count();
        out.push(Line::from(Span::styled(
            format!("\u{25B8} Reasoning ({count} lines, Ctrl+O to expand)"),
            Style::default().fg(theme::DIM),
        )));
        return;
    }
    out.push(Line::from(Span::styled("\u{25BE} Reasoning", Style::default().fg(theme::DIM))));
    if let Some(cached) = reasoning.cache.get() {
        out.extend_from_slice(cached);
        return;
    }
    // Replaced wholesale from the full buffer; never appended piecemeal.
    let marker_width = theme::REASONING_MARKER.chars().count();
    let wrap_at = usize::from(width).saturating_sub(marker_width).max(20);
    let fresh: Vec<Line<'static>> = reasoning
        .text
        .lines()
        .flat_map(|line| wrap_plain(line, wrap_at))
        .map(|line| {
            Line::from(vec![
                Span::styled(theme::REASONING_MARKER, Style::default().fg(theme::DIM)),
                Span::styled(line, style),
            ])
        })
        .collect();
    reasoning.cache.store(fresh);
    if let Some(stored) = reasoning.cache.get() {
        out.extend_from_slice(stored);
    }
}

/// Hard-wrap so the marker repeats on every visual row.
fn wrap_plain(line: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars.chunks(width.max(1)).map(|c| c.iter().collect()).collect()
}

fn render_answer(answer: &mut AnswerBlock, ctx: RenderContext, out: &mut Vec<Line<'static>>) {
    if answer.markdown.is_empty() && !answer.finalized {
        out.push(Line::from(Span::styled(
            format!("{} Thinking...", ctx.spinner()),
            Style::default().fg(theme::DIM),
        )));
        return;
    }
    render_markdown_cached(&answer.markdown, &mut answer.cache, None, out);

    let Some(blocks) = answer.code_blocks.as_ref().filter(|b| !b.is_empty()) else {
        return;
    };
    out.push(Line::default());
    for (i, block) in blocks.iter().enumerate() {
        let language = if block.language.is_empty() { "text" } else { block.language.as_str() };
        out.push(Line::from(vec![
            Span::styled(format!("[{}] ", i + 1), Style::default().fg(theme::CODE_LABEL)),
            Span::styled(
                format!("{language} \u{00B7} {} lines", block.line_count()),
                Style::default().fg(theme::DIM),
            ),
            Span::styled(format!("   /save {} <path>", i + 1), Style::default().fg(theme::DIM)),
        ]));
    }
}

fn render_markdown_cached(
    text: &str,
    cache: &mut BlockCache,
    bg: Option<Color>,
    out: &mut Vec<Line<'static>>,
) {
    if let Some(cached_lines) = cache.get() {
        out.extend_from_slice(cached_lines);
        return;
    }
    let fresh = render_markdown_safe(text, bg);
    // Store first, then extend from stored ref to avoid double-clone.
    cache.store(fresh);
    if let Some(stored) = cache.get() {
        out.extend_from_slice(stored);
    }
}

/// User text is shown as typed: no markdown, newlines kept.
fn render_user_text(text: &str, cache: &mut BlockCache, out: &mut Vec<Line<'static>>) {
    if cache.get().is_none() {
        cache.store(plain_text(text, Some(theme::USER_MSG_BG)));
    }
    if let Some(stored) = cache.get() {
        out.extend_from_slice(stored);
    }
}
