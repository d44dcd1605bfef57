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

use super::state::PendingImage;
use anyhow::{Context as _, bail};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use std::path::Path;

pub const PREMIUM_IMAGE_NOTICE: &str =
    "Image upload is a premium feature. Enter a premium code to unlock.";

/// Larger files are refused before reading.
pub const PREMIUM_DOCUMENT_NOTICE: &str = "Document upload is only available for premium users.";

pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;
pub const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

/// A document read from disk, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFile {
    pub name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

#[must_use]
pub fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Server-side text extraction handles PDF and DOCX only.
pub fn document_mime_for(path: &Path) -> anyhow::Result<&'static str> {
    let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("pdf") => Ok("application/pdf"),
        Some("docx") => {
            Ok("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
        }
        Some("doc") => bail!(".doc files are not supported; save the file as .docx and try again"),
        _ => bail!("unsupported document type (use pdf or docx)"),
    }
}

pub fn load_document(path: &Path) -> anyhow::Result<DocumentFile> {
    let mime = document_mime_for(path)?;
    let bytes = read_limited(path, MAX_DOCUMENT_BYTES)?;
    Ok(DocumentFile { name: display_name(path), mime, bytes })
}

fn read_limited(path: &Path, limit: u64) -> anyhow::Result<Vec<u8>> {
    let size = std::fs::metadata(path)
        .with_context(|| format!("failed to read {}", path.display()))?
        .len();
    if size > limit {
        bail!("{} is larger than {} MiB", path.display(), limit / (1024 * 1024));
    }
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

pub fn load_image(path: &Path) -> anyhow::Result<PendingImage> {
    let Some(mime) = mime_for(path) else {
        bail!("unsupported image type (use png, jpg, gif or webp)");
    };
    let bytes = read_limited(path, MAX_IMAGE_BYTES)?;
    Ok(PendingImage { name: display_name(path), data_uri: data_uri(mime, &bytes) })
}

#[must_use]
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64_STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for(Path::new("a.PNG")), Some("image/png"));
        assert_eq!(mime_for(Path::new("a.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_for(Path::new("a.txt")), None);
        assert_eq!(mime_for(Path::new("noext")), None);
    }

    #[test]
    fn data_uri_is_base64() {
        assert_eq!(data_uri("image/gif", b"GIF"), "data:image/gif;base64,R0lG");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_image(&dir.path().join("gone.png")).is_err());
    }

    #[test]
    fn unsupported_type_is_rejected_before_reading() {
        let err = load_image(Path::new("/does/not/matter.bmp")).unwrap_err();
        assert!(err.to_string().contains("unsupported image type"));
    }

    #[test]
    fn documents_accept_pdf_and_docx_only() {
        assert_eq!(document_mime_for(Path::new("r.PDF")).unwrap(), "application/pdf");
        assert!(document_mime_for(Path::new("r.docx")).unwrap().ends_with("wordprocessingml.document"));
        assert!(document_mime_for(Path::new("r.doc")).unwrap_err().to_string().contains(".docx"));
        assert!(document_mime_for(Path::new("r.txt")).is_err());
    }

    #[test]
    fn document_is_read_with_its_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        let doc = load_document(&path).unwrap();
        assert_eq!(doc.name, "report.pdf");
        assert_eq!(doc.mime, "application/pdf");
        assert_eq!(doc.bytes, b"%PDF-1.4");
    }

    #[test]
    fn oversized_document_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.pdf");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(MAX_DOCUMENT_BYTES + 1).unwrap();
        let err = load_document(&path).unwrap_err();
        assert!(err.to_string().contains("larger than 10 MiB"));
    }
}
