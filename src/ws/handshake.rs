//! HTTP upgrade handshake. One request comes in, gets validated against the
//! websocket upgrade rules, and either a 101 with the computed accept key or
//! a 400/426 goes back out.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::engine::Engine as _;

use crate::error::HandshakeError;

const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Request heads larger than this are treated as malformed.
pub const MAX_REQUEST_HEAD: usize = 8 * 1024;

/// A parsed HTTP/1.1 request head. Header names are stored lowercased; the
/// game client is not consistent about casing.
#[derive(Debug)]
pub struct Request {
    pub method: String,
    pub target: String,
    pub version: String,
    headers: HashMap<String, String>,
}

impl Request {
    /// Parse a request head from the front of `input`. Returns the request
    /// and the bytes consumed (including the blank line), or `None` until
    /// the terminating `\r\n\r\n` has arrived.
    pub fn parse(input: &[u8]) -> Result<Option<(Request, usize)>, HandshakeError> {
        let Some(end) = input.windows(4).position(|w| w == b"\r\n\r\n") else {
            if input.len() > MAX_REQUEST_HEAD {
                return Err(HandshakeError::MalformedRequest);
            }
            return Ok(None);
        };
        let head =
            std::str::from_utf8(&input[..end]).map_err(|_| HandshakeError::MalformedRequest)?;

        let mut lines = head.split("\r\n");
        let request_line = lines.next().ok_or(HandshakeError::MalformedRequest)?;
        let mut parts = request_line.split(' ');
        let method = parts.next().ok_or(HandshakeError::MalformedRequest)?;
        let target = parts.next().ok_or(HandshakeError::MalformedRequest)?;
        let version = parts.next().ok_or(HandshakeError::MalformedRequest)?;
        if method.is_empty() || target.is_empty() || version.is_empty() {
            return Err(HandshakeError::MalformedRequest);
        }

        let mut headers = HashMap::new();
        for line in lines {
            let (name, value) = line.split_once(':').ok_or(HandshakeError::MalformedRequest)?;
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }

        Ok(Some((
            Request {
                method: method.to_string(),
                target: target.to_string(),
                version: version.to_string(),
                headers,
            },
            end + 4,
        )))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// True when the header exists and one of its comma-separated tokens
    /// equals `token`, case-insensitively.
    fn header_has_token(&self, name: &str, token: &str) -> bool {
        self.header(name)
            .map(|value| {
                value
                    .split(',')
                    .any(|t| t.trim().eq_ignore_ascii_case(token))
            })
            .unwrap_or(false)
    }
}

/// Check the upgrade rules and compute the accept key for the 101 response.
pub fn validate(request: &Request) -> Result<String, HandshakeError> {
    if request.method != "GET" {
        return Err(HandshakeError::BadMethod);
    }
    if request.version != "HTTP/1.1" {
        return Err(HandshakeError::BadHttpVersion);
    }
    if request.header("host").is_none() {
        return Err(HandshakeError::MissingHost);
    }
    if !request.header_has_token("upgrade", "websocket") {
        return Err(HandshakeError::NotWebSocket);
    }
    if !request.header_has_token("connection", "upgrade") {
        return Err(HandshakeError::NotAnUpgrade);
    }
    if request.header("sec-websocket-version") != Some("13") {
        return Err(HandshakeError::UnsupportedVersion);
    }
    let key = request
        .header("sec-websocket-key")
        .ok_or(HandshakeError::BadKey)?;
    match BASE64.decode(key) {
        Ok(decoded) if decoded.len() == 16 => {}
        _ => return Err(HandshakeError::BadKey),
    }
    Ok(accept_key(key))
}

/// `base64(SHA1(key || guid))` per the upgrade handshake.
pub fn accept_key(key: &str) -> String {
    let digest = sha1_smol::Sha1::from(format!("{key}{WS_GUID}")).digest();
    BASE64.encode(digest.bytes())
}

pub fn accept_response(accept: &str) -> String {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: {accept}\r\n\r\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_REQUEST: &[u8] = b"GET / HTTP/1.1\r\nHost: h\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\nSec-WebSocket-Version: 13\r\n\r\n";

    #[test]
    fn rfc_sample_accept_key() {
        assert_eq!(
            accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn sample_request_upgrades() {
        let (request, consumed) = Request::parse(SAMPLE_REQUEST)
            .expect("parse failed")
            .expect("incomplete");
        assert_eq!(consumed, SAMPLE_REQUEST.len());
        assert_eq!(request.method, "GET");
        assert_eq!(request.target, "/");
        let accept = validate(&request).expect("handshake rejected");
        let response = accept_response(&accept);
        assert!(response.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
        assert!(response.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));
    }

    #[test]
    fn partial_head_needs_more_bytes() {
        for cut in 0..SAMPLE_REQUEST.len() - 3 {
            assert!(Request::parse(&SAMPLE_REQUEST[..cut])
                .expect("parse failed")
                .is_none());
        }
    }

    fn request_with(replace: &str, with: &str) -> Request {
        let raw = String::from_utf8_lossy(SAMPLE_REQUEST).replace(replace, with);
        Request::parse(raw.as_bytes())
            .expect("parse failed")
            .expect("incomplete")
            .0
    }

    #[test]
    fn version_mismatch_gets_a_426() {
        let request = request_with("Sec-WebSocket-Version: 13", "Sec-WebSocket-Version: 8");
        let err = validate(&request).unwrap_err();
        assert_eq!(err, HandshakeError::UnsupportedVersion);
        assert!(err.response().starts_with("HTTP/1.1 426 "));
        assert!(err.response().contains("Sec-WebSocket-Version: 13"));
    }

    #[test]
    fn post_is_rejected() {
        let request = request_with("GET /", "POST /");
        assert_eq!(validate(&request).unwrap_err(), HandshakeError::BadMethod);
    }

    #[test]
    fn missing_key_is_rejected() {
        let request = request_with("Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n", "");
        assert_eq!(validate(&request).unwrap_err(), HandshakeError::BadKey);
    }

    #[test]
    fn key_must_decode_to_sixteen_bytes() {
        let request = request_with("dGhlIHNhbXBsZSBub25jZQ==", "c2hvcnQ=");
        assert_eq!(validate(&request).unwrap_err(), HandshakeError::BadKey);
    }

    #[test]
    fn connection_header_is_token_listed() {
        let request = request_with("Connection: Upgrade", "Connection: keep-alive, UPGRADE");
        assert!(validate(&request).is_ok());
    }

    #[test]
    fn plain_http_request_is_rejected() {
        let request = request_with("Upgrade: websocket\r\n", "");
        assert_eq!(validate(&request).unwrap_err(), HandshakeError::NotWebSocket);
    }
}
