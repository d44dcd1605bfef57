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

mod chat;
mod header;
mod input;
mod layout;
pub mod markdown;
mod message;
pub mod theme;

use crate::app::App;
use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub fn render(frame: &mut Frame, app: &mut App) {
    let frame_area = frame.area();
    let input_visual_lines = input::visual_line_count(app, frame_area.width);
    let areas = layout::compute(frame_area, input_visual_lines);

    if areas.header.height > 0 {
        header::render(frame, areas.header, app);
        render_separator(frame, areas.header_sep);
    }

    // Body: chat (includes welcome text when no messages yet)
    chat::render(frame, areas.body, app);

    render_separator(frame, areas.input_sep);
    input::render(frame, areas.input, app);
    render_separator(frame, areas.input_bottom_sep);

    if let Some(footer_area) = areas.footer {
        render_footer(frame, footer_area, app);
    }
}

const FOOTER_PAD: u16 = 2;
const FOOTER_COLUMN_GAP: u16 = 1;

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let padded = Rect {
        x: area.x + FOOTER_PAD,
        y: area.y,
        width: area.width.saturating_sub(FOOTER_PAD * 2),
        height: area.height,
    };

    let line = footer_left_line(app);
    match footer_right_text(app) {
        Some((text, color)) => {
            let (left_area, right_area) = split_footer_columns(padded);
            frame.render_widget(Paragraph::new(line), left_area);
            render_footer_right_info(frame, right_area, &text, color);
        }
        None => frame.render_widget(Paragraph::new(line), padded),
    }
}

fn footer_left_line(app: &App) -> Line<'static> {
    if app.loading {
        let ch = message::SPINNER_FRAMES[app.spinner_frame % message::SPINNER_FRAMES.len()];
        return Line::from(vec![
            Span::styled(format!("{ch} "), Style::default().fg(theme::ACCENT)),
            Span::styled("Esc", Style::default().fg(Color::White)),
            Span::styled(" to stop", Style::default().fg(theme::DIM)),
        ]);
    }
    if app.pending_switch.is_some() {
        return Line::from(Span::styled("Loading conversation...", Style::default().fg(theme::DIM)));
    }
    Line::from(vec![
        Span::styled("/help", Style::default().fg(Color::White)),
        Span::styled(" : commands", Style::default().fg(theme::DIM)),
    ])
}

fn footer_right_text(app: &App) -> Option<(String, Color)> {
    if app.scroll.user_scrolled_away() {
        return Some(("Scrolled up  PgDn to follow".to_owned(), theme::ACCENT));
    }
    if let Some(image) = &app.pending_image {
        return Some((format!("Attached: {}", image.name), theme::DIM));
    }
    app.active_document.as_ref().map(|name| (format!("Document: {name}"), theme::DIM))
}

fn split_footer_columns(area: Rect) -> (Rect, Rect) {
    if area.width == 0 {
        return (area, Rect { width: 0, ..area });
    }

    let gap = if area.width > 2 { FOOTER_COLUMN_GAP } else { 0 };
    let usable_width = area.width.saturating_sub(gap);
    let left_width = usable_width.saturating_add(1) / 2;
    let right_width = usable_width.saturating_sub(left_width);

    let left = Rect { width: left_width, ..area };
    let right = Rect {
        x: area.x.saturating_add(left_width).saturating_add(gap),
        width: right_width,
        ..area
    };
    (left, right)
}

fn fit_footer_right_text(text: &str, max_width: usize) -> Option<String> {
    if max_width == 0 || text.trim().is_empty() {
        return None;
    }
    if UnicodeWidthStr::width(text) <= max_width {
        return Some(text.to_owned());
    }
    if max_width <= 3 {
        return Some(".".repeat(max_width));
    }

    let mut fitted = String::new();
    let mut width: usize = 0;
    for ch in text.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width.saturating_add(ch_width).saturating_add(3) > max_width {
            break;
        }
        fitted.push(ch);
        width = width.saturating_add(ch_width);
    }
    fitted.push_str("...");
    Some(fitted)
}

fn render_footer_right_info(frame: &mut Frame, area: Rect, text: &str, color: Color) {
    if area.width == 0 {
        return;
    }
    let Some(fitted) = fit_footer_right_text(text, usize::from(area.width)) else {
        return;
    };
    let line = Line::from(Span::styled(fitted, Style::default().fg(color)));
    frame.render_widget(Paragraph::new(line).alignment(Alignment::Right), area);
}

fn render_separator(frame: &mut Frame, area: Rect) {
    if area.height == 0 {
        return;
    }
    let sep_str = theme::SEPARATOR_CHAR.repeat(usize::from(area.width));
    let line = Line::from(Span::styled(sep_str, Style::default().fg(theme::DIM)));
    frame.render_widget(Paragraph::new(line), area);
}
