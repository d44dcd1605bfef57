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

//! Markdown rendering for answers, plus the code-block pass run once per
//! finished answer.

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use std::panic::{self, AssertUnwindSafe};

/// A fenced or indented code block found in an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Fence info string, e.g. `rust`; empty when absent.
    pub language: String,
    pub code: String,
}

impl CodeBlock {
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.code.lines().count()
    }
}

#[must_use]
pub fn extract_code_blocks(markdown: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<CodeBlock> = None;
    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().unwrap_or_default().to_owned()
                    }
                    CodeBlockKind::Indented => String::new(),
                };
                current = Some(CodeBlock { language, code: String::new() });
            }
            Event::Text(text) => {
                if let Some(block) = current.as_mut() {
                    block.code.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => blocks.extend(current.take()),
            _ => {}
        }
    }
    blocks
}

pub(super) fn render_markdown_safe(text: &str, bg: Option<Color>) -> Vec<Line<'static>> {
    render_markdown_safe_with(text, bg, render_with_tui_markdown)
}

fn render_markdown_safe_with<F>(text: &str, bg: Option<Color>, renderer: F) -> Vec<Line<'static>>
where
    F: FnOnce(&str, Option<Color>) -> Vec<Line<'static>>,
{
    if let Ok(lines) = panic::catch_unwind(AssertUnwindSafe(|| renderer(text, bg))) {
        lines
    } else {
        tracing::warn!("tui-markdown panic; falling back to plain-text rendering");
        plain_text(text, bg)
    }
}

fn render_with_tui_markdown(text: &str, bg: Option<Color>) -> Vec<Line<'static>> {
    let with_bg = |style: Style| bg.map_or(style, |color| style.bg(color));
    tui_markdown::from_str(text)
        .lines
        .into_iter()
        .map(|line| {
            let spans: Vec<Span<'static>> = line
                .spans
                .into_iter()
                .map(|span| Span::styled(span.content.into_owned(), with_bg(span.style)))
                .collect();
            Line::from(spans).style(with_bg(line.style))
        })
        .collect()
}

pub(super) fn plain_text(text: &str, bg: Option<Color>) -> Vec<Line<'static>> {
    let style = bg.map_or_else(Style::default, |color| Style::default().bg(color));
    text.split('\n').map(|line| Line::from(Span::styled(line.to_owned(), style))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fenced_blocks_are_extracted_in_order() {
        let md = "intro\n\n```rust\nfn a() {}\n```\n\ntext\n\n```\nplain\n```\n";
        assert_eq!(
            extract_code_blocks(md),
            vec![
                CodeBlock { language: "rust".into(), code: "fn a() {}\n".into() },
                CodeBlock { language: String::new(), code: "plain\n".into() },
            ]
        );
    }

    #[test]
    fn inline_code_is_not_a_block() {
        assert!(extract_code_blocks("use `cargo` here").is_empty());
    }

    #[test]
    fn unterminated_fence_still_counts() {
        let blocks = extract_code_blocks("```py\nprint(1)\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, "py");
        assert_eq!(blocks[0].line_count(), 1);
    }

    #[test]
    fn partial_markdown_renders_without_panicking() {
        for input in ["**bold", "```rust\nfn", "| a | b |\n|---", "- [ ] task", "[link](", ""] {
            let result = std::panic::catch_unwind(|| render_markdown_safe(input, None));
            assert!(result.is_ok(), "input triggered panic: {input}");
        }
    }

    #[test]
    fn renderer_panic_falls_back_to_plain_text() {
        let lines = render_markdown_safe_with("line1\nline2", None, |_text, _bg| {
            panic!("forced renderer panic for fallback path")
        });
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].spans[0].content.as_ref(), "line2");
    }
}
