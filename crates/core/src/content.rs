//! Content carried between files on disk and a document's `content` subtree

/// Decoded file payload
///
/// Text files land as a single scalar. Structured codecs produce a JSON
/// tree, which documents may store per key so concurrent edits to
/// different keys merge independently.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// UTF-8 text, written verbatim
    Text(String),
    /// Bytes that are not valid UTF-8
    Bytes(Vec<u8>),
    /// Structured tree
    Json(serde_json::Value),
}

impl Content {
    /// Decode raw bytes as text, keeping invalid UTF-8 as bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => Content::Text(text),
            Err(e) => Content::Bytes(e.into_bytes()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Content::Text(_) => "text",
            Content::Bytes(_) => "bytes",
            Content::Json(_) => "json",
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}
