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

use super::wire::{
    ChatRequest, ClearDocumentRequest, ConversationListResponse, ConversationMessagesResponse,
    ConversationSummary, CreateConversationResponse, ErrorBody, StoredMessage,
    UploadDocumentResponse, ValidateCodeRequest, ValidateCodeResponse,
};
use crate::error::{ApiError, AppError};
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

pub const ACCESS_CODE_HEADER: &str = "X-Access-Code";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Applies to every call except the streamed body, which may run for minutes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Uploads wait for server-side text extraction.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client for the chat server. Cheap to clone; background tasks take
/// their own copy, so a credential change only affects calls made afterwards.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base: Url,
    user_id: String,
    access_code: Option<String>,
}

impl ChatClient {
    pub fn new(base: Url, user_id: impl Into<String>) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("streamchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                tracing::error!("failed to build HTTP client: {e}");
                AppError::HttpClientInit
            })?;
        Ok(Self { http, base, user_id: user_id.into(), access_code: None })
    }

    #[must_use]
    pub fn with_access_code(mut self, code: Option<String>) -> Self {
        self.access_code = code.filter(|c| !c.is_empty());
        self
    }

    pub fn set_access_code(&mut self, code: Option<String>) {
        self.access_code = code.filter(|c| !c.is_empty());
    }

    /// `POST /chat/stream`. Returns the response once headers arrive; the
    /// caller reads the body incrementally.
    pub async fn open_chat_stream(&self, request: &ChatRequest) -> Result<Response, ApiError> {
        let url = self.endpoint("chat/stream")?;
        tracing::debug!(
            %url,
            conversation_id = request.conversation_id.as_deref().unwrap_or("-"),
            has_image = request.image.is_some(),
            "opening chat stream"
        );
        let response = self.privileged(self.http.post(url)).json(request).send().await?;
        ensure_success(response).await
    }

    /// `POST /cancel_stream`. The caller decides what to do with failure.
    pub async fn cancel_stream(&self) -> Result<(), ApiError> {
        let url = self.endpoint("cancel_stream")?;
        let response = self
            .privileged(self.http.post(url))
            .timeout(REQUEST_TIMEOUT)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        ensure_success(response).await.map(drop)
    }

    pub async fn conversation_messages(&self, id: &str) -> Result<Vec<StoredMessage>, ApiError> {
        let url = self.conversation_url(id)?;
        let body: ConversationMessagesResponse = self.get_json(url).await?;
        Ok(body.messages)
    }

    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, ApiError> {
        let url = self.endpoint("conversations")?;
        let body: ConversationListResponse = self.get_json(url).await?;
        Ok(body.conversations)
    }

    pub async fn create_conversation(&self) -> Result<String, ApiError> {
        let url = self.endpoint("conversations")?;
        let response = self
            .identified(self.http.post(url))
            .timeout(REQUEST_TIMEOUT)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let body: CreateConversationResponse = decode(ensure_success(response).await?).await?;
        body.conversation_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::Decode("missing conversation_id".to_owned()))
    }

    pub async fn delete_conversation(&self, id: &str) -> Result<(), ApiError> {
        let url = self.conversation_url(id)?;
        let response =
            self.identified(self.http.delete(url)).timeout(REQUEST_TIMEOUT).send().await?;
        ensure_success(response).await.map(drop)
    }

    pub async fn validate_code(&self, code: &str) -> Result<bool, ApiError> {
        let url = self.endpoint("validate_code")?;
        let response = self
            .identified(self.http.post(url))
            .timeout(REQUEST_TIMEOUT)
            .json(&ValidateCodeRequest { code })
            .send()
            .await?;
        let body: ValidateCodeResponse = decode(ensure_success(response).await?).await?;
        Ok(body.valid)
    }

    pub async fn clear_context(&self) -> Result<(), ApiError> {
        let url = self.endpoint("clear_context")?;
        let response = self
            .identified(self.http.post(url))
            .timeout(REQUEST_TIMEOUT)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        ensure_success(response).await.map(drop)
    }

    /// `POST /upload_document` as multipart field `document`. Returns the
    /// server's confirmation text.
    pub async fn upload_document(
        &self,
        name: &str,
        mime: &str,
        bytes: Vec<u8>,
        conversation_id: Option<&str>,
    ) -> Result<String, ApiError> {
        let mut url = self.endpoint("upload_document")?;
        if let Some(id) = conversation_id {
            url.query_pairs_mut().append_pair("conversation_id", id);
        }
        tracing::debug!(%url, name, size = bytes.len(), "uploading document");
        let part = Part::bytes(bytes).file_name(name.to_owned()).mime_str(mime)?;
        let response = self
            .privileged(self.http.post(url))
            .timeout(UPLOAD_TIMEOUT)
            .multipart(Form::new().part("document", part))
            .send()
            .await?;
        let body: UploadDocumentResponse = decode(ensure_success(response).await?).await?;
        let filename = body.filename.unwrap_or_else(|| name.to_owned());
        Ok(body
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Document \"{filename}\" uploaded.")))
    }

    /// `POST /clear_document`: the server forgets the uploaded document.
    pub async fn clear_document(&self, conversation_id: Option<&str>) -> Result<(), ApiError> {
        let url = self.endpoint("clear_document")?;
        let response = self
            .identified(self.http.post(url))
            .timeout(REQUEST_TIMEOUT)
            .json(&ClearDocumentRequest { conversation_id })
            .send()
            .await?;
        ensure_success(response).await.map(drop)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self.identified(self.http.get(url)).timeout(REQUEST_TIMEOUT).send().await?;
        decode(ensure_success(response).await?).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path)?)
    }

    fn conversation_url(&self, id: &str) -> Result<Url, ApiError> {
        let mut url = self.endpoint("conversations")?;
        url.path_segments_mut()
            .map_err(|()| ApiError::Decode(format!("base URL cannot carry a path: {}", self.base)))?
            .push(id);
        Ok(url)
    }

    fn identified(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.headers(self.identity_headers())
    }

    fn privileged(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = self.identified(builder);
        match &self.access_code {
            Some(code) => builder.header(ACCESS_CODE_HEADER, code),
            None => builder,
        }
    }

    fn identity_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        match HeaderValue::from_str(&format!("user_id={}", self.user_id)) {
            Ok(value) => {
                headers.insert(COOKIE, value);
            }
            Err(e) => tracing::warn!("user id not usable as cookie: {e}"),
        }
        headers
    }
}

/// Non-2xx responses carry `{"error": ..}`; surface that message, or
/// `Network error` when the body has none.
async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error)
        .filter(|m| !m.is_empty());
    tracing::debug!(status = status.as_u16(), ?message, "server returned error status");
    Err(message.map_or(ApiError::Status(status.as_u16()), ApiError::Server))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Normalize a user-supplied server URL so relative joins keep its path.
pub fn parse_base_url(raw: &str) -> Result<Url, AppError> {
    let trimmed = raw.trim();
    let mut url = Url::parse(trimmed).map_err(|_| AppError::InvalidServerUrl(trimmed.to_owned()))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(AppError::InvalidServerUrl(trimmed.to_owned()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
