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

/// Startup failures that map to a distinct process exit code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error("Invalid server URL: {0}")]
    InvalidServerUrl(String),
    #[error("Data directory unavailable")]
    DataDirUnavailable,
    #[error("HTTP client could not be built")]
    HttpClientInit,
}

impl AppError {
    pub const INVALID_SERVER_URL_EXIT_CODE: i32 = 20;
    pub const DATA_DIR_UNAVAILABLE_EXIT_CODE: i32 = 21;
    pub const HTTP_CLIENT_INIT_EXIT_CODE: i32 = 22;

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidServerUrl(_) => Self::INVALID_SERVER_URL_EXIT_CODE,
            Self::DataDirUnavailable => Self::DATA_DIR_UNAVAILABLE_EXIT_CODE,
            Self::HttpClientInit => Self::HTTP_CLIENT_INIT_EXIT_CODE,
        }
    }

    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidServerUrl(_) => {
                "The server URL is not valid. Pass an http(s) URL with --server or STREAMCHAT_SERVER."
            }
            Self::DataDirUnavailable => {
                "No data directory could be determined. Pass one with --data-dir or STREAMCHAT_DATA_DIR."
            }
            Self::HttpClientInit => "Failed to initialize the HTTP client (TLS backend unavailable?).",
        }
    }
}

/// Failures of a single HTTP call against the chat server.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered with an `{"error": ..}` body.
    #[error("{0}")]
    Server(String),
    /// Non-success status without a usable error body.
    #[error("Network error")]
    Status(u16),
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("Invalid response: {0}")]
    Decode(String),
    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}
