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

pub mod app;
pub mod backend;
pub mod config;
pub mod error;
pub mod store;
pub mod stream;
pub mod ui;

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "streamchat", version, about = "Terminal client for a streaming chat server")]
pub struct Cli {
    /// Server base URL (env: STREAMCHAT_SERVER, default http://127.0.0.1:5000)
    #[arg(long, short)]
    pub server: Option<String>,

    /// Open this conversation at startup
    #[arg(long, short)]
    pub conversation: Option<String>,

    /// Directory for the local cache and credentials (env: STREAMCHAT_DATA_DIR)
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Keep the conversation cache in memory only (env: STREAMCHAT_NO_CACHE)
    #[arg(long)]
    pub no_cache: bool,

    /// Write tracing diagnostics to a file (disabled unless explicitly set)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Tracing filter directives (example: `info,streamchat::stream=debug`)
    /// Falls back to `RUST_LOG` when omitted.
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,

    /// Append to `--log-file` instead of truncating on startup
    #[arg(long)]
    pub log_append: bool,
}
