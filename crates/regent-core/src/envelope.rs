//! Guarded JSON responses.
//!
//! Structured replies are prefixed with `)]}\n` so that a cross-site
//! `<script>` include of the endpoint cannot evaluate them. The prefix must
//! be present and is stripped before parsing; a reply without it is a hard
//! error, never parsed as bare JSON.

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// The four-byte guard in front of every JSON reply.
pub const XSSI_PREFIX: &str = ")]}\n";

#[derive(Debug)]
pub enum EnvelopeError {
    /// The reply body was empty.
    Empty,
    /// The reply did not start with [`XSSI_PREFIX`].
    MissingPrefix,
    /// The payload after the prefix was not the expected JSON.
    Json(serde_json::Error),
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty response"),
            Self::MissingPrefix => write!(f, "response is missing the JSON guard prefix"),
            Self::Json(e) => write!(f, "malformed JSON payload: {e}"),
        }
    }
}

impl std::error::Error for EnvelopeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for EnvelopeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// The payload after the guard.
pub fn strip(body: &str) -> Result<&str, EnvelopeError> {
    if body.is_empty() {
        return Err(EnvelopeError::Empty);
    }
    body.strip_prefix(XSSI_PREFIX)
        .ok_or(EnvelopeError::MissingPrefix)
}

pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, EnvelopeError> {
    Ok(serde_json::from_str(strip(body)?)?)
}

pub fn decode_value(body: &str) -> Result<Value, EnvelopeError> {
    decode(body)
}

/// Wrap `value` the way a server would. Used by scripted transports.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, EnvelopeError> {
    let json = serde_json::to_string(value)?;
    Ok(format!("{XSSI_PREFIX}{json}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_guard_before_parsing() {
        let value = decode_value(")]}\n{\"a\":1}").unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn bare_json_is_rejected() {
        assert!(matches!(
            decode_value("{\"a\":1}"),
            Err(EnvelopeError::MissingPrefix)
        ));
    }

    #[test]
    fn empty_body_is_its_own_error() {
        assert!(matches!(decode_value(""), Err(EnvelopeError::Empty)));
    }

    #[test]
    fn garbage_after_guard_is_json_error() {
        let err = decode_value(")]}\n{not json").unwrap_err();
        assert!(matches!(err, EnvelopeError::Json(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn encode_adds_guard() {
        let body = encode(&json!([1, 2])).unwrap();
        assert_eq!(body, ")]}\n[1,2]");
        let back: Vec<u8> = decode(&body).unwrap();
        assert_eq!(back, [1, 2]);
    }
}
