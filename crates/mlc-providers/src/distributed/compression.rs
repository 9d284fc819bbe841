//! Value codec for the distributed tier
//!
//! Compressed payloads are zlib streams encoded as base64 text behind a
//! `z:` marker. JSON text never starts with `z`, so plain and compressed
//! values can share a keyspace and are always readable.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use mlc_domain::error::{Error, Result};
use std::io::{Read, Write};

/// Marker prepended to compressed payloads
pub const COMPRESSED_PREFIX: &str = "z:";

/// A payload ready for the backend
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    /// Text stored in the backend
    pub payload: String,
    /// Stored size over original size, when compression was attempted
    pub ratio: Option<f64>,
}

/// Encode a JSON payload, compressing it when asked and large enough
///
/// The compressed form is kept only when it is smaller than the input.
#[allow(clippy::cast_precision_loss)]
pub fn encode(json: String, compress: bool, threshold: usize) -> Result<Encoded> {
    if !compress || json.len() < threshold {
        return Ok(Encoded {
            payload: json,
            ratio: None,
        });
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(json.as_bytes())?;
    let compressed = encoder.finish()?;
    let payload = format!("{COMPRESSED_PREFIX}{}", STANDARD.encode(compressed));

    let original = json.len() as f64;
    if payload.len() < json.len() {
        let ratio = payload.len() as f64 / original;
        Ok(Encoded {
            payload,
            ratio: Some(ratio),
        })
    } else {
        Ok(Encoded {
            payload: json,
            ratio: Some(1.0),
        })
    }
}

/// Decode a stored payload back to JSON text
pub fn decode(raw: String) -> Result<String> {
    let Some(encoded) = raw.strip_prefix(COMPRESSED_PREFIX) else {
        return Ok(raw);
    };
    let compressed = STANDARD
        .decode(encoded)
        .map_err(|e| Error::serialization(format!("invalid base64 payload: {e}")))?;
    let mut json = String::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_string(&mut json)
        .map_err(|e| Error::serialization(format!("invalid compressed payload: {e}")))?;
    Ok(json)
}
