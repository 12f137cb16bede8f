//! Body framing and connection persistence, decided once the header
//! section is complete (RFC 9112 §6.3, §9.3).

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::types::{Header, ParserMode};

/// How the end of the message body is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "length", rename_all = "snake_case")]
pub enum BodyStrategy {
    /// The message has no body.
    NoBody,
    /// Exactly this many bytes follow the header section.
    Identity(u64),
    /// `Transfer-Encoding: chunked`.
    Chunked,
    /// The body runs until the peer closes the connection (responses only).
    UntilClose,
}

/// What to do when `Content-Length` accompanies chunked encoding.
///
/// This combination is the classic request-smuggling vector, so the choice
/// is never implicit: [`ParserConfig`](crate::ParserConfig) carries it and
/// defaults to [`Strictness::Strict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Reject the message with [`ErrorKind::ConflictingContentLength`].
    #[default]
    Strict,
    /// Frame by chunked encoding and ignore `Content-Length`.
    Lenient,
}

/// Inputs to [`resolve`] besides the header list.
#[derive(Debug, Clone, Copy)]
pub struct FramingContext {
    pub mode: ParserMode,
    pub http_major: u8,
    pub http_minor: u8,
    /// Response status code; ignored in request mode.
    pub status_code: u16,
    /// The response answers a HEAD request.
    pub head_response: bool,
    pub strictness: Strictness,
    pub max_body_size: Option<u64>,
}

/// Outcome of [`resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framing {
    pub strategy: BodyStrategy,
    /// The `Content-Length` that was honoured, if any.
    pub content_length: Option<u64>,
    pub chunked: bool,
    pub keep_alive: bool,
}

/// Decide body framing and keep-alive for a completed header section.
pub fn resolve(headers: &[Header], ctx: &FramingContext) -> Result<Framing, ErrorKind> {
    let te = transfer_coding(headers);
    let chunked = te == TransferCoding::Chunked;

    // Transfer-Encoding takes precedence over Content-Length (RFC 9112 §6.1).
    let content_length = if chunked {
        match (has_content_length(headers), ctx.strictness) {
            (true, Strictness::Strict) => return Err(ErrorKind::ConflictingContentLength),
            _ => None,
        }
    } else {
        content_length(headers)?
    };

    let strategy = if ctx.mode == ParserMode::Response && response_has_no_body(ctx) {
        BodyStrategy::NoBody
    } else {
        match te {
            TransferCoding::Chunked => BodyStrategy::Chunked,
            TransferCoding::Other if ctx.mode == ParserMode::Request => {
                return Err(ErrorKind::InvalidTransferEncoding);
            }
            TransferCoding::Other => BodyStrategy::UntilClose,
            TransferCoding::Absent => match content_length {
                Some(0) => BodyStrategy::NoBody,
                Some(n) => {
                    if ctx.max_body_size.is_some_and(|max| n > max) {
                        return Err(ErrorKind::BodyTooLarge);
                    }
                    BodyStrategy::Identity(n)
                }
                None if ctx.mode == ParserMode::Response => BodyStrategy::UntilClose,
                None => BodyStrategy::NoBody,
            },
        }
    };

    let keep_alive = strategy != BodyStrategy::UntilClose
        && keep_alive(headers, ctx.http_major, ctx.http_minor);

    Ok(Framing {
        strategy,
        content_length,
        chunked,
        keep_alive,
    })
}

/// Resolve connection persistence from the version default and any
/// `Connection` tokens. `close` wins over `keep-alive`.
pub fn keep_alive(headers: &[Header], http_major: u8, http_minor: u8) -> bool {
    let mut keep = (http_major, http_minor) >= (1, 1);
    let mut close = false;

    for token in header_tokens(headers, "connection") {
        if token.eq_ignore_ascii_case(b"close") {
            close = true;
        } else if token.eq_ignore_ascii_case(b"keep-alive") {
            keep = true;
        }
    }

    keep && !close
}

fn response_has_no_body(ctx: &FramingContext) -> bool {
    ctx.head_response
        || (100..200).contains(&ctx.status_code)
        || ctx.status_code == 204
        || ctx.status_code == 304
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferCoding {
    Absent,
    Chunked,
    Other,
}

fn transfer_coding(headers: &[Header]) -> TransferCoding {
    let mut last = None;
    for token in header_tokens(headers, "transfer-encoding") {
        last = Some(token);
    }
    match last {
        None => TransferCoding::Absent,
        Some(coding) => {
            // Drop transfer parameters such as `;q=1`.
            let name = coding.split(|&b| b == b';').next().unwrap_or(coding);
            if trim_ows(name).eq_ignore_ascii_case(b"chunked") {
                TransferCoding::Chunked
            } else {
                TransferCoding::Other
            }
        }
    }
}

fn has_content_length(headers: &[Header]) -> bool {
    headers
        .iter()
        .any(|h| h.name.eq_ignore_ascii_case(b"content-length"))
}

/// Parse every `Content-Length` value; they must all agree (RFC 9112 §6.3).
fn content_length(headers: &[Header]) -> Result<Option<u64>, ErrorKind> {
    let mut found: Option<u64> = None;

    for h in headers
        .iter()
        .filter(|h| h.name.eq_ignore_ascii_case(b"content-length"))
    {
        let value = parse_decimal(trim_ows(&h.value)).ok_or(ErrorKind::InvalidContentLength)?;
        match found {
            Some(prev) if prev != value => return Err(ErrorKind::ConflictingContentLength),
            _ => found = Some(value),
        }
    }

    Ok(found)
}

fn parse_decimal(digits: &[u8]) -> Option<u64> {
    if digits.is_empty() {
        return None;
    }
    digits.iter().try_fold(0u64, |acc, &b| {
        if !b.is_ascii_digit() {
            return None;
        }
        acc.checked_mul(10)?.checked_add(u64::from(b - b'0'))
    })
}

/// Comma-separated, OWS-trimmed, non-empty list elements of every header
/// named `name`, in document order.
fn header_tokens<'a>(headers: &'a [Header], name: &'a str) -> impl Iterator<Item = &'a [u8]> {
    headers
        .iter()
        .filter(move |h| h.name.eq_ignore_ascii_case(name.as_bytes()))
        .flat_map(|h| h.value.split(|&b| b == b','))
        .map(trim_ows)
        .filter(|t| !t.is_empty())
}

fn trim_ows(mut s: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = s {
        s = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = s {
        s = rest;
    }
    s
}
