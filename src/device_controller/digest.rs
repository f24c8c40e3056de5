//! HTTP Digest authentication (RFC 2617, MD5 / qop=auth)
//!
//! Camera firmwares answer the first request with `401` and a
//! `WWW-Authenticate: Digest ...` challenge; the request is then replayed
//! with the computed `Authorization` header.

use rand::Rng;
use std::collections::HashMap;

/// Parsed `WWW-Authenticate: Digest` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    pub algorithm: Option<String>,
    /// `Some("auth")` when the server offers qop=auth
    pub qop: Option<String>,
}

/// Request-side inputs of a digest response
#[derive(Debug, Clone)]
pub struct DigestRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub method: &'a str,
    pub uri: &'a str,
    pub cnonce: &'a str,
    pub nc: u32,
}

impl DigestChallenge {
    /// Parse a `WWW-Authenticate` header value; `None` if it is not a Digest challenge
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let scheme_end = header.find(char::is_whitespace)?;
        if !header[..scheme_end].eq_ignore_ascii_case("digest") {
            return None;
        }

        let params = parse_params(&header[scheme_end..]);
        let realm = params.get("realm")?.clone();
        let nonce = params.get("nonce")?.clone();

        // qop may list several options ("auth,auth-int"); only auth is supported
        let qop = params.get("qop").and_then(|q| {
            q.split(',')
                .map(str::trim)
                .find(|v| v.eq_ignore_ascii_case("auth"))
                .map(|_| "auth".to_string())
        });

        Some(Self {
            realm,
            nonce,
            opaque: params.get("opaque").cloned(),
            algorithm: params.get("algorithm").cloned(),
            qop,
        })
    }

    /// Only MD5 (or an absent algorithm) is understood
    pub fn is_supported(&self) -> bool {
        self.algorithm
            .as_deref()
            .map(|a| a.eq_ignore_ascii_case("md5"))
            .unwrap_or(true)
    }

    /// Hex digest `response` value
    pub fn response(&self, req: &DigestRequest<'_>) -> String {
        let ha1 = md5_hex(&format!("{}:{}:{}", req.username, self.realm, req.password));
        let ha2 = md5_hex(&format!("{}:{}", req.method, req.uri));

        match self.qop.as_deref() {
            Some(qop) => md5_hex(&format!(
                "{}:{}:{:08x}:{}:{}:{}",
                ha1, self.nonce, req.nc, req.cnonce, qop, ha2
            )),
            None => md5_hex(&format!("{}:{}:{}", ha1, self.nonce, ha2)),
        }
    }

    /// Full `Authorization` header value
    pub fn authorization(&self, req: &DigestRequest<'_>) -> String {
        let mut header = format!(
            r#"Digest username="{}", realm="{}", nonce="{}", uri="{}", response="{}""#,
            req.username,
            self.realm,
            self.nonce,
            req.uri,
            self.response(req)
        );
        if let Some(qop) = &self.qop {
            header.push_str(&format!(
                r#", qop={}, nc={:08x}, cnonce="{}""#,
                qop, req.nc, req.cnonce
            ));
        }
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(r#", opaque="{}""#, opaque));
        }
        if let Some(algorithm) = &self.algorithm {
            header.push_str(&format!(", algorithm={}", algorithm));
        }
        header
    }
}

/// Random client nonce (16 hex chars)
pub fn generate_cnonce() -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

/// Split `key=value, key="quoted, value"` pairs; keys are lower-cased
pub(crate) fn parse_params(input: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut chars = input.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
            chars.next();
        }

        let key: String = chars
            .by_ref()
            .take_while(|c| *c != '=')
            .collect::<String>()
            .trim()
            .to_ascii_lowercase();
        if key.is_empty() {
            break;
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            let mut escaped = false;
            for c in chars.by_ref() {
                match c {
                    '\\' if !escaped => escaped = true,
                    '"' if !escaped => break,
                    _ => {
                        value.push(c);
                        escaped = false;
                    }
                }
            }
        } else {
            while let Some(c) = chars.peek() {
                if *c == ',' {
                    break;
                }
                value.push(*c);
                chars.next();
            }
            value = value.trim().to_string();
        }

        params.insert(key, value);
    }

    params
}
