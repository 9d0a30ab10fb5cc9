//! Inbound request validation.
//!
//! # Responsibilities
//! - Parse the JSON body of add/reject requests
//! - Check required fields and the callback URL
//! - Build the `RelayRequest` handed to the orchestrator
//!
//! # Design Decisions
//! - Body is parsed by hand (not via `Json<T>`) so every failure maps to a
//!   400 with a field-specific message
//! - `null` counts as missing
//! - `cname_id` and `user_id` accept strings or numbers and pass through

use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use crate::relay::types::{CertFields, RelayRequest};

/// Fields every add/reject body must carry, in checking order.
pub const REQUIRED_FIELDS: [&str; 5] = ["callback_url", "cname_id", "domain", "email", "user_id"];

/// Validation failures, surfaced as 400.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Missing JSON body")]
    MissingBody,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid callback_url")]
    InvalidCallbackUrl,

    #[error("Invalid {0}")]
    InvalidField(&'static str),
}

/// Parse and validate a relay request body.
pub fn parse_relay_request(body: &[u8]) -> Result<RelayRequest, RequestError> {
    let object = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) if !map.is_empty() => map,
        _ => return Err(RequestError::MissingBody),
    };

    for field in REQUIRED_FIELDS {
        if object.get(field).map_or(true, Value::is_null) {
            return Err(RequestError::MissingField(field));
        }
    }

    let callback_url = parse_callback_url(&object["callback_url"])?;

    Ok(RelayRequest {
        callback_url,
        fields: CertFields {
            cname_id: identifier(&object, "cname_id")?,
            domain: non_empty_string(&object, "domain")?,
            email: non_empty_string(&object, "email")?,
            user_id: identifier(&object, "user_id")?,
        },
    })
}

fn parse_callback_url(value: &Value) -> Result<Url, RequestError> {
    let raw = value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(RequestError::InvalidCallbackUrl)?;

    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(url),
        _ => Err(RequestError::InvalidCallbackUrl),
    }
}

fn non_empty_string(object: &Map<String, Value>, field: &'static str) -> Result<String, RequestError> {
    object[field]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(RequestError::InvalidField(field))
}

fn identifier(object: &Map<String, Value>, field: &'static str) -> Result<Value, RequestError> {
    match &object[field] {
        Value::String(s) if !s.trim().is_empty() => Ok(object[field].clone()),
        Value::Number(_) => Ok(object[field].clone()),
        _ => Err(RequestError::InvalidField(field)),
    }
}
