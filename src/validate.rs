//! File input validation for document and cover uploads.

use crate::config::UploadConfig;
use crate::dom::{Document, NodeId};
use base64::{Engine, engine::general_purpose::STANDARD};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A file picked in a file input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectedFile {
    /// File name without directories.
    pub name: String,
    /// MIME type reported by the browser (may be empty).
    pub mime: String,
    /// Size in bytes.
    pub size: u64,
    /// Contents, when the host read them.
    pub bytes: Option<Vec<u8>>,
}

impl SelectedFile {
    /// Describe a file by metadata only.
    pub fn new(name: impl Into<String>, mime: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            size,
            bytes: None,
        }
    }

    /// Attach file contents.
    pub fn with_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.size = bytes.len() as u64;
        self.bytes = Some(bytes);
        self
    }
}

/// Which upload an input feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    /// The book file itself.
    Document,
    /// Cover image.
    Cover,
}

impl UploadKind {
    /// Parse the `data-upload-kind` attribute.
    pub fn from_attr(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "document" | "book" | "pdf" => Some(UploadKind::Document),
            "cover" | "image" => Some(UploadKind::Cover),
            _ => None,
        }
    }
}

/// Limits for one upload kind.
#[derive(Debug, Clone, PartialEq)]
pub struct FileConstraints {
    /// Maximum size in bytes.
    pub max_bytes: u64,
    /// Accepted MIME types.
    pub allowed_types: Vec<String>,
}

impl FileConstraints {
    /// Constraints for `kind` from configuration.
    pub fn for_kind(kind: UploadKind, config: &UploadConfig) -> Self {
        match kind {
            UploadKind::Document => Self {
                max_bytes: config.document_max_mb * MB,
                allowed_types: config.document_types.clone(),
            },
            UploadKind::Cover => Self {
                max_bytes: config.cover_max_mb * MB,
                allowed_types: config.cover_types.clone(),
            },
        }
    }

    fn allows(&self, mime: &str) -> bool {
        let mime = normalize_mime(mime);
        self.allowed_types.iter().any(|t| normalize_mime(t) == mime)
    }
}

const MB: u64 = 1024 * 1024;

/// Why a file was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// MIME type outside the allowed set.
    #[error("{}", wrong_type_message(.kind))]
    WrongType {
        /// Upload kind being validated.
        kind: UploadKind,
        /// MIME type reported for the file.
        actual: String,
    },

    /// File exceeds the size limit.
    #[error("{} size must be less than {}MB.", size_subject(.kind), .max_bytes / MB)]
    TooLarge {
        /// Upload kind being validated.
        kind: UploadKind,
        /// Limit in bytes.
        max_bytes: u64,
        /// Actual size in bytes.
        actual: u64,
    },

    /// Contents do not match the declared type.
    #[error("The file contents do not look like a valid image.")]
    ContentMismatch {
        /// MIME type reported for the file.
        declared: String,
    },
}

fn wrong_type_message(kind: &UploadKind) -> &'static str {
    match kind {
        UploadKind::Document => "Please select a PDF file.",
        UploadKind::Cover => "Please select a valid image file (JPEG, PNG, GIF, WebP).",
    }
}

fn size_subject(kind: &UploadKind) -> &'static str {
    match kind {
        UploadKind::Document => "File",
        UploadKind::Cover => "Image",
    }
}

fn normalize_mime(mime: &str) -> String {
    let base = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match base.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        _ => base,
    }
}

/// Check a file against the constraints of `kind`.
pub fn validate(
    file: &SelectedFile,
    kind: UploadKind,
    constraints: &FileConstraints,
) -> Result<(), ValidationError> {
    if !constraints.allows(&file.mime) {
        return Err(ValidationError::WrongType {
            kind,
            actual: file.mime.clone(),
        });
    }

    if file.size > constraints.max_bytes {
        return Err(ValidationError::TooLarge {
            kind,
            max_bytes: constraints.max_bytes,
            actual: file.size,
        });
    }

    if kind == UploadKind::Cover
        && let Some(bytes) = &file.bytes
    {
        let sniffed = image::guess_format(bytes).ok().map(image_mime);
        if !sniffed.is_some_and(|m| constraints.allows(m)) {
            return Err(ValidationError::ContentMismatch {
                declared: file.mime.clone(),
            });
        }
    }

    Ok(())
}

fn image_mime(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Png => "image/png",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Guess a MIME type from contents, then from the file extension.
pub fn guess_mime(name: &str, bytes: &[u8]) -> String {
    if bytes.starts_with(b"%PDF-") {
        return "application/pdf".to_string();
    }
    if let Ok(format) = image::guess_format(bytes) {
        let mime = image_mime(format);
        if mime != "application/octet-stream" {
            return mime.to_string();
        }
    }

    let ext = name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("txt") => "text/plain",
        Some("epub") => "application/epub+zip",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// Human readable file size.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Preview URL for an accepted cover.
pub fn preview_url(file: &SelectedFile) -> String {
    match &file.bytes {
        Some(bytes) => format!("data:{};base64,{}", normalize_mime(&file.mime), STANDARD.encode(bytes)),
        None => format!("blob:{}", urlencoding::encode(&file.name)),
    }
}

/// Outcome of validating a file input in place.
#[derive(Debug, Clone, PartialEq)]
pub enum InputOutcome {
    /// Nothing selected; feedback cleared.
    Cleared,
    /// File accepted.
    Accepted(SelectedFile),
    /// File rejected and input cleared.
    Rejected(ValidationError),
}

/// Element ids derived from a file input id.
fn feedback_ids(input_id: &str) -> (String, String, String) {
    (
        format!("{}-error", input_id),
        format!("{}-filename", input_id),
        format!("{}-preview", input_id),
    )
}

/// Validate the current selection of `input` and update the page.
///
/// On rejection the input is cleared, marked `is-invalid`, and the matching
/// `#<id>-error` element shows the message. Covers get their preview hidden.
/// On acceptance documents show their name and size, covers their preview.
pub fn apply_to_input(
    doc: &mut Document,
    input: NodeId,
    kind: UploadKind,
    constraints: &FileConstraints,
) -> Option<InputOutcome> {
    let el = doc.get(input)?;
    let input_id = el.id().unwrap_or_default().to_string();
    let file = el.files().first().cloned();
    let (error_id, filename_id, preview_id) = feedback_ids(&input_id);

    let outcome = match file {
        None => InputOutcome::Cleared,
        Some(file) => match validate(&file, kind, constraints) {
            Ok(()) => InputOutcome::Accepted(file),
            Err(e) => InputOutcome::Rejected(e),
        },
    };

    let error_node = doc.by_id(&error_id);
    let filename_node = doc.by_id(&filename_id);
    let preview_node = doc.by_id(&preview_id);

    match &outcome {
        InputOutcome::Rejected(err) => {
            tracing::debug!(input = %input_id, error = %err, "Rejected selected file");
            if let Some(el) = doc.get_mut(input) {
                el.clear_files();
                el.add_class("is-invalid");
                el.remove_class("is-valid");
            }
            if let Some(n) = error_node
                && let Some(el) = doc.get_mut(n)
            {
                el.set_text(err.to_string());
                el.set_hidden(false);
            }
            if let Some(n) = filename_node
                && let Some(el) = doc.get_mut(n)
            {
                el.set_text("");
                el.set_hidden(true);
            }
            if let Some(n) = preview_node
                && let Some(el) = doc.get_mut(n)
            {
                el.remove_attr("src");
                el.set_hidden(true);
            }
        }
        InputOutcome::Accepted(file) => {
            if let Some(el) = doc.get_mut(input) {
                el.remove_class("is-invalid");
                el.add_class("is-valid");
            }
            if let Some(n) = error_node
                && let Some(el) = doc.get_mut(n)
            {
                el.set_text("");
                el.set_hidden(true);
            }
            match kind {
                UploadKind::Document => {
                    if let Some(n) = filename_node
                        && let Some(el) = doc.get_mut(n)
                    {
                        el.set_text(format!("{} ({})", file.name, format_file_size(file.size)));
                        el.set_hidden(false);
                    }
                }
                UploadKind::Cover => {
                    if let Some(n) = preview_node
                        && let Some(el) = doc.get_mut(n)
                    {
                        el.set_attr("src", preview_url(file));
                        el.set_attr("alt", file.name.as_str());
                        el.set_hidden(false);
                    }
                }
            }
        }
        InputOutcome::Cleared => {
            if let Some(el) = doc.get_mut(input) {
                el.remove_class("is-invalid");
                el.remove_class("is-valid");
            }
            for node in [error_node, filename_node, preview_node].into_iter().flatten() {
                if let Some(el) = doc.get_mut(node) {
                    el.set_hidden(true);
                }
            }
        }
    }

    Some(outcome)
}
