//! Body parsing stage.
//!
//! Replaces the raw request body with its decoded form so later stages and
//! the handler work with a [`serde_json::Value`]:
//!
//! | Body | Result |
//! |---|---|
//! | empty | `null` |
//! | `application/json`, `*/*+json` | parsed JSON |
//! | `application/x-www-form-urlencoded` | object of strings |
//! | no content type, starts with `{` or `[` | parsed JSON |
//! | anything else, valid UTF-8 | JSON string |
//! | anything else | left raw |
//!
//! Malformed JSON or form data fails with `INVALID_INPUT`.

use crate::middleware::{BoxFuture, Middleware, Outcome};
use cirrus_core::{ApiError, Body, RequestContext, ResponseContext};
use serde_json::{Map, Value};

/// Stage that decodes the request body in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyParser;

impl BodyParser {
    /// Creates the stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decodes `body` according to `content_type`.
    ///
    /// Returns `Ok(None)` when the body should stay raw.
    pub fn parse(content_type: Option<&str>, body: &[u8]) -> Result<Option<Value>, ApiError> {
        if body.is_empty() {
            return Ok(Some(Value::Null));
        }

        let mime = content_type.and_then(|ct| ct.parse::<mime::Mime>().ok());
        match mime {
            Some(m) if m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON) => {
                parse_json(body).map(Some)
            }
            Some(m)
                if m.type_() == mime::APPLICATION && m.subtype() == mime::WWW_FORM_URLENCODED =>
            {
                parse_form(body).map(Some)
            }
            None if content_type.is_none() && looks_like_json(body) => parse_json(body).map(Some),
            _ => Ok(std::str::from_utf8(body)
                .ok()
                .map(|text| Value::String(text.to_string()))),
        }
    }
}

fn parse_json(body: &[u8]) -> Result<Value, ApiError> {
    serde_json::from_slice(body)
        .map_err(|err| ApiError::invalid_input(format!("malformed JSON body: {err}")))
}

fn parse_form(body: &[u8]) -> Result<Value, ApiError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
        .map_err(|err| ApiError::invalid_input(format!("malformed form body: {err}")))?;
    Ok(Value::Object(
        pairs
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect::<Map<_, _>>(),
    ))
}

fn looks_like_json(body: &[u8]) -> bool {
    matches!(
        body.iter().find(|b| !b.is_ascii_whitespace()),
        Some(b'{' | b'[')
    )
}

impl Middleware for BodyParser {
    fn name(&self) -> &'static str {
        "body_parser"
    }

    fn handle<'a>(
        &'a self,
        req: &'a mut RequestContext,
        _res: &'a mut ResponseContext,
    ) -> BoxFuture<'a, Outcome> {
        Box::pin(async move {
            let Body::Raw(bytes) = req.body() else {
                return Outcome::Continue;
            };

            match Self::parse(req.header("content-type"), bytes) {
                Ok(Some(value)) => {
                    req.set_parsed_body(value);
                    Outcome::Continue
                }
                Ok(None) => Outcome::Continue,
                Err(err) => Outcome::fail(err),
            }
        })
    }
}
