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

use ratatui::style::Color;

// Accent
pub const ACCENT: Color = Color::Rgb(244, 118, 0);

// UI chrome
pub const DIM: Color = Color::DarkGray;
pub const PROMPT_CHAR: &str = "❯";
pub const SEPARATOR_CHAR: &str = "─";

// Role header colors
pub const ROLE_USER: Color = Color::White;
pub const ROLE_ASSISTANT: Color = ACCENT;
pub const ROLE_SYSTEM: Color = Color::Yellow;

// User message background
pub const USER_MSG_BG: Color = Color::Rgb(40, 44, 52);

// Reasoning region
pub const REASONING: Color = Color::Gray;
pub const REASONING_MARKER: &str = "│ ";

// Code block list under a finished answer
pub const CODE_LABEL: Color = Color::Cyan;

pub const PREMIUM: Color = Color::Rgb(255, 196, 0);

pub const STATUS_ERROR: Color = Color::Red;
pub const STATUS_STOPPED: Color = Color::LightRed;
