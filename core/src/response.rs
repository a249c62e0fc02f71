//! Classified result of a `send` call.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Classification data attached to every response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Metadata {
    /// True iff the HTTP status was in 200..300.
    pub status: bool,
    pub message: Option<String>,
    pub code: Option<u16>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Status metadata plus the untouched response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub metadata: Metadata,
    pub raw_data: Option<Vec<u8>>,
}

impl Response {
    pub fn new(metadata: Metadata, raw_data: Option<Vec<u8>>) -> Self {
        Self { metadata, raw_data }
    }

    /// Decode the raw body as JSON. A missing body decodes as `null`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        match self.raw_data.as_deref() {
            Some(bytes) => serde_json::from_slice(bytes),
            None => serde_json::from_value(serde_json::Value::Null),
        }
        .map_err(ApiError::DecodingError)
    }
}

/// Best-effort `message` field of a JSON object body.
pub(crate) fn extract_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .as_object()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn message_from_object_body() {
        assert_eq!(extract_message(br#"{"message":"ok"}"#).as_deref(), Some("ok"));
    }

    #[test]
    fn no_message_from_non_object_or_invalid_body() {
        assert_eq!(extract_message(b"[1,2,3]"), None);
        assert_eq!(extract_message(b"not json"), None);
        assert_eq!(extract_message(b""), None);
        assert_eq!(extract_message(br#"{"message":42}"#), None);
        assert_eq!(extract_message(br#"{"other":"x"}"#), None);
    }

    #[test]
    fn decode_typed_body() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Item {
            id: u32,
        }

        let response = Response::new(Metadata::default(), Some(br#"{"id":7}"#.to_vec()));
        assert_eq!(response.decode::<Item>().unwrap(), Item { id: 7 });

        let err = response.decode::<Vec<u32>>().unwrap_err();
        assert!(matches!(err, ApiError::DecodingError(_)));
    }

    #[test]
    fn decode_missing_body_as_null() {
        let response = Response::new(Metadata::default(), None);
        assert_eq!(response.decode::<Option<u32>>().unwrap(), None);
        assert!(response.decode::<u32>().is_err());
    }
}
