//! Decoding of byte-encoded attribute group records.

use crate::data::Data;

/// Serializer format versions the JSON deserializer accepts.
pub const SUPPORTED_FORMAT_VERSIONS: &[u32] = &[2, 3];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeserializeError {
    #[error("unsupported serializer version {0}")]
    UnsupportedVersion(u32),

    #[error("malformed record bytes: {0}")]
    Malformed(String),
}

/// Decodes serialized records, e.g. default parameter datasets.
pub trait RecordDeserializer: Send + Sync {
    fn deserialize(&self, format_version: u32, bytes: &[u8]) -> Result<Data, DeserializeError>;
}

/// Records serialized as tagged JSON [`Data`] trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRecordDeserializer;

impl RecordDeserializer for JsonRecordDeserializer {
    fn deserialize(&self, format_version: u32, bytes: &[u8]) -> Result<Data, DeserializeError> {
        if !SUPPORTED_FORMAT_VERSIONS.contains(&format_version) {
            return Err(DeserializeError::UnsupportedVersion(format_version));
        }
        let data: Data = serde_json::from_slice(bytes)
            .map_err(|error| DeserializeError::Malformed(error.to_string()))?;
        match data {
            Data::Record(_) => Ok(data),
            _ => Err(DeserializeError::Malformed(
                "top level value must be a record".to_string(),
            )),
        }
    }
}

/// Encode a record the way [`JsonRecordDeserializer`] expects it.
pub fn serialize_record(data: &Data) -> Result<Vec<u8>, DeserializeError> {
    serde_json::to_vec(data).map_err(|error| DeserializeError::Malformed(error.to_string()))
}
