//! File content codecs
//!
//! A codec turns raw file bytes into `Content` and back. Codecs must be
//! stable: `decode(encode(decode(b))) == decode(b)` for any input they
//! accept, and `encode(decode(b)) == b` for input already in the codec's
//! canonical form.

use bz_core::Content;

pub trait Codec: Send + Sync {
    /// Short name, used in logs
    fn name(&self) -> &'static str;

    fn decode(&self, bytes: Vec<u8>) -> Result<Content, String>;

    fn encode(&self, content: &Content) -> Result<Vec<u8>, String>;
}

/// Plain text, the fallback for every extension
///
/// Bytes round-trip exactly. Invalid UTF-8 is carried as raw bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextCodec;

impl Codec for TextCodec {
    fn name(&self) -> &'static str {
        "text"
    }

    fn decode(&self, bytes: Vec<u8>) -> Result<Content, String> {
        Ok(Content::from_bytes(bytes))
    }

    fn encode(&self, content: &Content) -> Result<Vec<u8>, String> {
        match content {
            Content::Text(text) => Ok(text.as_bytes().to_vec()),
            Content::Bytes(bytes) => Ok(bytes.clone()),
            Content::Json(value) => serde_json::to_vec(value).map_err(|e| e.to_string()),
        }
    }
}

/// JSON documents, stored as a keyed tree
///
/// Canonical form: two-space pretty printing, object keys sorted, one
/// trailing newline. Other layouts are normalized on the next write.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn decode(&self, bytes: Vec<u8>) -> Result<Content, String> {
        serde_json::from_slice(&bytes)
            .map(Content::Json)
            .map_err(|e| format!("invalid JSON: {e}"))
    }

    fn encode(&self, content: &Content) -> Result<Vec<u8>, String> {
        match content {
            Content::Json(value) => {
                let mut out = serde_json::to_vec_pretty(value).map_err(|e| e.to_string())?;
                out.push(b'\n');
                Ok(out)
            }
            // Written by a text codec before the extension changed hands
            Content::Text(text) => Ok(text.as_bytes().to_vec()),
            Content::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}
