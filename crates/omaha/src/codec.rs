//! Encoding and decoding of Omaha documents.
//!
//! Decoding applies the checks in a fixed order: content type, empty body,
//! XML parse (where a body cut short by the size ceiling is reported as
//! truncated rather than malformed), then protocol version.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CodecError;
use crate::protocol::{Request, Response, PROTOCOL_VERSION};

/// Largest response body accepted, in bytes.
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Content type sent with every encoded document.
pub const XML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Accept an empty content type, `text/xml` or `application/xml`, optionally
/// with a UTF-8 charset parameter.
pub fn check_content_type(content_type: &str) -> Result<(), CodecError> {
    let content_type = content_type.trim();
    if content_type.is_empty() {
        return Ok(());
    }

    let invalid = || CodecError::InvalidContentType(content_type.to_string());
    let mut parts = content_type.split(';');
    let media = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
    if media != "text/xml" && media != "application/xml" {
        return Err(invalid());
    }

    for param in parts {
        let (key, value) = param.split_once('=').ok_or_else(invalid)?;
        let value = value.trim().trim_matches('"');
        if !key.trim().eq_ignore_ascii_case("charset") || !value.eq_ignore_ascii_case("utf-8") {
            return Err(invalid());
        }
    }

    Ok(())
}

/// Serialize a request, prefixed with the XML declaration.
pub fn encode_request(request: &Request) -> Result<Vec<u8>, CodecError> {
    encode(request)
}

/// Serialize a response, prefixed with the XML declaration.
pub fn encode_response(response: &Response) -> Result<Vec<u8>, CodecError> {
    encode(response)
}

/// Parse a request received by a server.
pub fn decode_request(content_type: &str, body: &[u8]) -> Result<Request, CodecError> {
    let request: Request = decode(content_type, body)?;
    check_protocol(&request.protocol)?;
    Ok(request)
}

/// Parse a response received by a client.
///
/// `body` may hold up to `MAX_BODY_SIZE + 1` bytes; anything beyond the
/// ceiling marks the body as cut short.
pub fn decode_response(content_type: &str, body: &[u8]) -> Result<Response, CodecError> {
    let response: Response = decode(content_type, body)?;
    check_protocol(&response.protocol)?;
    Ok(response)
}

fn encode<T: Serialize>(document: &T) -> Result<Vec<u8>, CodecError> {
    let xml = quick_xml::se::to_string(document).map_err(|e| CodecError::Encode(e.to_string()))?;
    let mut out = Vec::with_capacity(XML_DECLARATION.len() + xml.len());
    out.extend_from_slice(XML_DECLARATION.as_bytes());
    out.extend_from_slice(xml.as_bytes());
    Ok(out)
}

fn decode<T: DeserializeOwned>(content_type: &str, body: &[u8]) -> Result<T, CodecError> {
    check_content_type(content_type)?;

    let truncated = body.len() > MAX_BODY_SIZE;
    let body = &body[..body.len().min(MAX_BODY_SIZE)];
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(CodecError::EmptyBody);
    }

    let parse_error = |detail: String| {
        if truncated {
            CodecError::TruncatedBody
        } else {
            CodecError::Malformed(detail)
        }
    };

    let text = std::str::from_utf8(body).map_err(|e| parse_error(e.to_string()))?;
    quick_xml::de::from_str(text).map_err(|e| parse_error(e.to_string()))
}

fn check_protocol(protocol: &str) -> Result<(), CodecError> {
    if protocol != PROTOCOL_VERSION {
        return Err(CodecError::UnsupportedProtocol(protocol.to_string()));
    }
    Ok(())
}
