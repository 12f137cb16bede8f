use bytes::Bytes;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::framing::BodyStrategy;

// ---------------------------------------------------------------------------
// ParserMode
// ---------------------------------------------------------------------------

/// Which side of the conversation the parser reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserMode {
    /// Parse requests (`METHOD SP URL SP HTTP/x.y`).
    Request,
    /// Parse responses (`HTTP/x.y SP code SP reason`).
    Response,
}

impl ParserMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
        }
    }
}

impl fmt::Display for ParserMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ParserState
// ---------------------------------------------------------------------------

/// Coarse parser state exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParserState {
    Start,
    Method,
    Url,
    HttpVersion,
    StatusCode,
    StatusReason,
    HeaderField,
    HeaderValue,
    HeadersDone,
    BodyIdentity,
    BodyChunkSize,
    BodyChunkData,
    BodyChunkTrailer,
    MessageDone,
    Error,
}

impl ParserState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Method => "METHOD",
            Self::Url => "URL",
            Self::HttpVersion => "HTTP_VERSION",
            Self::StatusCode => "STATUS_CODE",
            Self::StatusReason => "STATUS_REASON",
            Self::HeaderField => "HEADER_FIELD",
            Self::HeaderValue => "HEADER_VALUE",
            Self::HeadersDone => "HEADERS_DONE",
            Self::BodyIdentity => "BODY_IDENTITY",
            Self::BodyChunkSize => "BODY_CHUNK_SIZE",
            Self::BodyChunkData => "BODY_CHUNK_DATA",
            Self::BodyChunkTrailer => "BODY_CHUNK_TRAILER",
            Self::MessageDone => "MESSAGE_DONE",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for ParserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// HttpMethod
// ---------------------------------------------------------------------------

/// Standard HTTP request methods as defined in RFC 9110 (plus PATCH).
///
/// The parser accepts any token as a method; this enum only classifies the
/// well-known ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HttpMethod {
    GET,
    HEAD,
    POST,
    PUT,
    DELETE,
    CONNECT,
    OPTIONS,
    TRACE,
    PATCH,
}

impl HttpMethod {
    /// Classify a method token. Matching is case-sensitive, as methods are.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"GET" => Some(Self::GET),
            b"HEAD" => Some(Self::HEAD),
            b"POST" => Some(Self::POST),
            b"PUT" => Some(Self::PUT),
            b"DELETE" => Some(Self::DELETE),
            b"CONNECT" => Some(Self::CONNECT),
            b"OPTIONS" => Some(Self::OPTIONS),
            b"TRACE" => Some(Self::TRACE),
            b"PATCH" => Some(Self::PATCH),
            _ => None,
        }
    }

    /// Return the method as a static string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GET => "GET",
            Self::HEAD => "HEAD",
            Self::POST => "POST",
            Self::PUT => "PUT",
            Self::DELETE => "DELETE",
            Self::CONNECT => "CONNECT",
            Self::OPTIONS => "OPTIONS",
            Self::TRACE => "TRACE",
            Self::PATCH => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// A single header (or trailer) field, bytes exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    /// Field name, original casing preserved.
    #[serde(serialize_with = "serialize_lossy")]
    pub name: Bytes,
    /// Field value with leading/trailing OWS trimmed.
    #[serde(serialize_with = "serialize_lossy")]
    pub value: Bytes,
}

impl Header {
    pub fn name_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    pub fn value_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}

// ---------------------------------------------------------------------------
// MessageMetadata
// ---------------------------------------------------------------------------

/// Everything known about the message currently being parsed.
///
/// Handed to the sink with [`Event::HeadersComplete`](crate::Event::HeadersComplete)
/// and readable through [`Parser::metadata`](crate::Parser::metadata)
/// afterwards, including after a parse error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageMetadata {
    /// Request method token (request mode only).
    #[serde(serialize_with = "serialize_lossy")]
    pub method: Bytes,
    /// Request target, raw (request mode only).
    #[serde(serialize_with = "serialize_lossy")]
    pub url: Bytes,
    pub http_major: u8,
    pub http_minor: u8,
    /// Response status code (response mode only, 0 until parsed).
    pub status_code: u16,
    /// Response reason phrase (response mode only).
    #[serde(serialize_with = "serialize_lossy")]
    pub status_reason: Bytes,
    /// Header fields in document order, duplicates preserved.
    pub headers: Vec<Header>,
    /// Trailer fields of a chunked body, in document order.
    pub trailers: Vec<Header>,
    /// Declared `Content-Length`, when it governs framing.
    pub content_length: Option<u64>,
    /// `Transfer-Encoding` ends with `chunked`.
    pub chunked: bool,
    /// Connection may be reused; resolved when the header section ends.
    pub keep_alive: bool,
    /// How the body is delimited; resolved when the header section ends.
    #[serde(rename = "framing")]
    pub body: Option<BodyStrategy>,
}

impl Default for MessageMetadata {
    fn default() -> Self {
        Self {
            method: Bytes::new(),
            url: Bytes::new(),
            http_major: 1,
            http_minor: 1,
            status_code: 0,
            status_reason: Bytes::new(),
            headers: Vec::new(),
            trailers: Vec::new(),
            content_length: None,
            chunked: false,
            keep_alive: false,
            body: None,
        }
    }
}

impl MessageMetadata {
    /// Classify the method token, if it is a well-known one.
    pub fn method_kind(&self) -> Option<HttpMethod> {
        HttpMethod::from_bytes(&self.method)
    }

    /// Look up the first header value by name (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name.as_bytes()))
            .map(|h| &h.value[..])
    }

    /// Return all values for headers matching `name` (case-insensitive).
    pub fn header_values(&self, name: &str) -> Vec<&[u8]> {
        self.headers
            .iter()
            .filter(|h| h.name.eq_ignore_ascii_case(name.as_bytes()))
            .map(|h| &h.value[..])
            .collect()
    }

    /// Look up the first trailer value by name (case-insensitive).
    pub fn trailer_value(&self, name: &str) -> Option<&[u8]> {
        self.trailers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name.as_bytes()))
            .map(|h| &h.value[..])
    }
}

// ---------------------------------------------------------------------------
// ParsedMessage
// ---------------------------------------------------------------------------

/// A complete message collected by [`parse_request`](crate::parse_request)
/// or [`parse_response`](crate::parse_response).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedMessage {
    #[serde(flatten)]
    pub metadata: MessageMetadata,
    /// Concatenated body bytes (chunk framing removed).
    #[serde(serialize_with = "serialize_lossy")]
    pub body: Bytes,
}

impl ParsedMessage {
    /// Return the body as a UTF-8 `&str` if it is valid UTF-8.
    pub fn body_as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// Serialize bytes as a UTF-8 string (lossy) for JSON output.
pub(crate) fn serialize_lossy<S: Serializer>(bytes: &Bytes, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&String::from_utf8_lossy(bytes))
}
