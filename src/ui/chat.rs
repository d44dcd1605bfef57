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

use crate::app::{App, ScrollMetrics};
use crate::ui::message::{self, RenderContext};
use crate::ui::theme;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Paragraph, Wrap};

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
pub fn render(frame: &mut Frame, area: Rect, app: &mut App) {
    let ctx = RenderContext {
        spinner_frame: app.spinner_frame,
        reasoning_collapsed: app.reasoning_collapsed,
    };

    let mut all_lines = Vec::new();
    if app.messages.is_empty() {
        all_lines.extend(welcome_lines(app));
    }
    for msg in &mut app.messages {
        message::render_message(msg, ctx, area.width, &mut all_lines);
    }

    // Build paragraph once; line_count gives the real wrapped height
    let paragraph = Paragraph::new(Text::from(all_lines)).wrap(Wrap { trim: false });
    let content_height = paragraph.line_count(area.width);
    let viewport_height = area.height as usize;

    if content_height <= viewport_height {
        // Short content: bottom-aligned so it stacks above the input
        let offset = (viewport_height - content_height) as u16;
        let render_area = Rect {
            x: area.x,
            y: area.y + offset,
            width: area.width,
            height: content_height as u16,
        };
        app.scroll_offset = 0;
        app.scroll_target = 0;
        app.scroll_pos = 0.0;
        app.pending_scroll_to_bottom = false;
        app.chat_metrics = ScrollMetrics { content_height, viewport_height, offset: 0 };
        frame.render_widget(paragraph, render_area);
        return;
    }

    let max_scroll = content_height - viewport_height;
    if app.pending_scroll_to_bottom {
        app.pending_scroll_to_bottom = false;
        app.scroll_target = max_scroll;
    }
    app.scroll_target = app.scroll_target.min(max_scroll);

    let target = app.scroll_target as f32;
    let delta = target - app.scroll_pos;
    if delta.abs() < 0.01 {
        app.scroll_pos = target;
    } else {
        // Smooth over ~2-3 frames
        app.scroll_pos += delta * 0.5;
    }
    app.scroll_offset = (app.scroll_pos.round() as usize).min(max_scroll);
    // Decisions are made against where the view is headed, not mid-animation.
    app.chat_metrics = ScrollMetrics { content_height, viewport_height, offset: app.scroll_target };
    frame.render_widget(paragraph.scroll((scroll_rows(app.scroll_offset), 0)), area);
}

/// Ratatui scrolls by `u16`; past that the view pins to its last reachable row.
fn scroll_rows(offset: usize) -> u16 {
    u16::try_from(offset).unwrap_or(u16::MAX)
}

fn welcome_lines(app: &App) -> Vec<Line<'static>> {
    let pad = "  ";
    let dim = Style::default().fg(theme::DIM);
    let mut lines = vec![
        Line::from(Span::styled(
            format!("{pad}streamchat"),
            Style::default().fg(theme::ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(vec![
            Span::styled(format!("{pad}Server: "), dim),
            Span::styled(app.server_label.clone(), Style::default().fg(theme::ACCENT)),
        ]),
    ];
    if let Some(id) = app.conversation_id.as_deref() {
        lines.push(Line::from(Span::styled(format!("{pad}Conversation: {id}"), dim)));
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        format!("{pad}Tips: Enter to send, Shift+Enter for newline, /help for commands"),
        dim,
    )));
    lines.push(Line::default());
    lines
}
