//! Renders documents as extended JSON text.
//!
//! [`format_document`] produces compact single-line text, [`indent`]
//! re-indents any JSON text with two spaces per level. Output of either
//! compiles back to an equal document.

use crate::error::FormatError;
use crate::extjson::encode_document;
use crate::value::Document;
use serde_json::Value as Json;

/// Compact extended JSON for `doc`, keys in document order.
pub fn format_document(doc: &Document) -> Result<String, FormatError> {
    serde_json::to_string(&encode_document(doc)).map_err(FormatError::Serialize)
}

/// Re-indents JSON text with two-space indentation and one entry per line.
pub fn indent(json: &str) -> Result<String, FormatError> {
    let value: Json = serde_json::from_str(json).map_err(FormatError::InvalidJson)?;
    serde_json::to_string_pretty(&value).map_err(FormatError::Serialize)
}

/// Multi-line text shown in the document view and handed to the editor.
pub fn render_document(doc: &Document) -> Result<String, FormatError> {
    indent(&format_document(doc)?)
}
