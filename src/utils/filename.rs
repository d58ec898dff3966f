//! Client-facing file names
//!
//! Object names follow `<display-name>####<anything>.<extension>`. Before the
//! display name and extension are derived, the object name goes through a
//! browser compatibility transform:
//! - IE 8-11 (`MSIE` in any case, or `Trident/7.0`) get the name form-urlencoded
//! - every other agent gets the UTF-8 bytes reinterpreted as ISO-8859-1
//!
//! The second branch means the raw UTF-8 bytes of the name end up in the
//! header, which is what modern browsers decode.

use axum::http::header::InvalidHeaderValue;
use axum::http::HeaderValue;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Separator between the display name and the storage suffix.
pub const NAME_SEPARATOR: &str = "####";

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const TEXT_CONTENT_TYPE: &str = "text/plain;charset=UTF-8";
pub const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// Extensions that may be rendered as thumbnails.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "bmp", "dib", "gif", "jfif", "jpe", "jpeg", "jpg", "png", "tif", "tiff", "ico",
];

// application/x-www-form-urlencoded leaves only these unescaped.
const FORM_URLENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'.')
    .remove(b'-')
    .remove(b'*')
    .remove(b'_');

#[derive(Debug, thiserror::Error)]
pub enum DispositionError {
    #[error("file name contains characters outside ISO-8859-1")]
    NotLatin1,

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
}

pub fn is_legacy_agent(user_agent: &str) -> bool {
    user_agent.to_uppercase().contains("MSIE") || user_agent.contains("Trident/7.0")
}

/// Apply the browser compatibility transform. A missing agent counts as modern.
pub fn encode_for_agent(object_name: &str, user_agent: Option<&str>) -> String {
    match user_agent {
        Some(agent) if is_legacy_agent(agent) => form_urlencode(object_name),
        _ => reinterpret_as_latin1(object_name),
    }
}

/// Form-urlencode as UTF-8, spaces become `+`.
pub fn form_urlencode(value: &str) -> String {
    // `%` itself is escaped, so every `%20` here came from a space.
    utf8_percent_encode(value, FORM_URLENCODE_SET)
        .to_string()
        .replace("%20", "+")
}

/// Read each UTF-8 byte as one ISO-8859-1 character.
pub fn reinterpret_as_latin1(value: &str) -> String {
    value.bytes().map(char::from).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }
}

/// Display name and extension recovered from an encoded object name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName {
    pub name: String,
    pub extension: String,
}

impl DisplayName {
    /// Split an already encoded object name.
    ///
    /// The name is the text before the first separator; the extension is the
    /// text after the last `.` of the whole name, or the whole name when it
    /// has no dot.
    pub fn parse(encoded: &str) -> Self {
        let name = encoded
            .split(NAME_SEPARATOR)
            .next()
            .unwrap_or_default()
            .to_string();
        let extension = match encoded.rfind('.') {
            Some(idx) => &encoded[idx + 1..],
            None => encoded,
        };

        Self {
            name,
            extension: extension.to_string(),
        }
    }

    /// Transform for the client's agent, then split.
    pub fn for_agent(object_name: &str, user_agent: Option<&str>) -> Self {
        Self::parse(&encode_for_agent(object_name, user_agent))
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.extension)
    }

    pub fn is_pdf(&self) -> bool {
        self.extension.eq_ignore_ascii_case("pdf")
    }

    pub fn is_image(&self) -> bool {
        IMAGE_EXTENSIONS
            .iter()
            .any(|ext| self.extension.eq_ignore_ascii_case(ext))
    }

    pub fn preview_content_type(&self) -> &'static str {
        if self.is_pdf() {
            PDF_CONTENT_TYPE
        } else {
            TEXT_CONTENT_TYPE
        }
    }

    /// `Content-Disposition` value. Characters are written as single bytes,
    /// so the header carries exactly the bytes the transform produced.
    pub fn content_disposition(
        &self,
        disposition: Disposition,
    ) -> Result<HeaderValue, DispositionError> {
        let value = format!("{};filename={}", disposition.as_str(), self.file_name());
        let bytes = value
            .chars()
            .map(|c| u8::try_from(c).map_err(|_| DispositionError::NotLatin1))
            .collect::<Result<Vec<u8>, _>>()?;
        Ok(HeaderValue::from_bytes(&bytes)?)
    }
}
