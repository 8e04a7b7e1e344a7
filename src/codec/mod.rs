//! Encoding and decoding of update-check request bodies.
//!
//! API version 1.0 endpoints exchange payloads in the repository's legacy
//! native-serialization format; later versions use JSON. The format is an
//! explicit parameter so the codec holds no state of its own.

mod legacy;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::endpoint::EndpointKind;

/// Wire format of an update-check request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializationFormat {
    /// Native-serialization format spoken by API version 1.0.
    Legacy,
    Json,
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Decodes a raw request-body field into a JSON value.
pub fn decode(raw: &[u8], format: SerializationFormat) -> Result<Value, CodecError> {
    match format {
        SerializationFormat::Json => {
            serde_json::from_slice(raw).map_err(|e| CodecError::Malformed(e.to_string()))
        }
        SerializationFormat::Legacy => legacy::unserialize(raw),
    }
}

/// Encodes a payload back into the given wire format.
///
/// Legacy plugin payloads are encoded with an object top level rather than a
/// plain map; that is the shape the repository endpoint receives from the
/// host and expects back.
pub fn encode(
    data: &Value,
    format: SerializationFormat,
    kind: EndpointKind,
) -> Result<Vec<u8>, CodecError> {
    match format {
        SerializationFormat::Json => {
            serde_json::to_vec(data).map_err(|e| CodecError::Malformed(e.to_string()))
        }
        SerializationFormat::Legacy => {
            Ok(legacy::serialize(data, kind == EndpointKind::Plugins))
        }
    }
}
