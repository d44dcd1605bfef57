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

use crate::Cli;
use crate::backend::parse_base_url;
use crate::error::AppError;
use std::path::PathBuf;
use url::Url;

pub const SERVER_ENV: &str = "STREAMCHAT_SERVER";
pub const DATA_DIR_ENV: &str = "STREAMCHAT_DATA_DIR";
pub const NO_CACHE_ENV: &str = "STREAMCHAT_NO_CACHE";
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";
const DATA_DIR_NAME: &str = "streamchat";

/// Resolved startup settings: flags first, then environment, then defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub server: Url,
    pub data_dir: PathBuf,
    pub persist_cache: bool,
    pub initial_conversation: Option<String>,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self, AppError> {
        Self::resolve(cli, |name| std::env::var(name).ok())
    }

    fn resolve(cli: &Cli, env: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let raw_server = cli
            .server
            .clone()
            .or_else(|| env(SERVER_ENV).filter(|v| !v.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_SERVER.to_owned());
        let server = parse_base_url(&raw_server)?;

        let data_dir = match cli.data_dir.clone() {
            Some(dir) => dir,
            None => match env(DATA_DIR_ENV).filter(|v| !v.trim().is_empty()) {
                Some(dir) => PathBuf::from(dir),
                None => dirs::data_dir()
                    .map(|dir| dir.join(DATA_DIR_NAME))
                    .ok_or(AppError::DataDirUnavailable)?,
            },
        };

        let no_cache = cli.no_cache || env(NO_CACHE_ENV).is_some_and(|v| is_truthy(&v));
        let initial_conversation =
            cli.conversation.clone().map(|id| id.trim().to_owned()).filter(|id| !id.is_empty());

        Ok(Self { server, data_dir, persist_cache: !no_cache, initial_conversation })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}
