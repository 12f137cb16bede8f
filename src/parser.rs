use bytes::Bytes;
use serde::Deserialize;

use crate::accumulator::{Accumulator, TokenKind};
use crate::error::{ErrorKind, ParseError};
use crate::event::{Event, EventSink};
use crate::framing::{self, BodyStrategy, FramingContext, Strictness};
use crate::scanner::Scanner;
use crate::types::{Header, HttpMethod, MessageMetadata, ParserMode, ParserState};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configurable limits and policies for the parser.
///
/// All sizes are in bytes unless stated otherwise. Deserializable so it can
/// be loaded from a JSON file; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserConfig {
    /// Maximum length of the method token (default: 32).
    pub max_method_len: usize,
    /// Maximum length of the request target (default: 65 536).
    pub max_url_len: usize,
    /// Maximum length of a header or trailer field name (default: 8 192).
    pub max_header_field_len: usize,
    /// Maximum length of a header or trailer field value (default: 8 192).
    pub max_header_value_len: usize,
    /// Maximum length of the status reason phrase (default: 8 192).
    pub max_reason_len: usize,
    /// Maximum length of a single chunk extension (default: 8 192).
    pub max_chunk_extension_len: usize,
    /// Maximum number of header fields, and separately of trailer fields
    /// (default: 128).
    pub max_headers: usize,
    /// Maximum declared body size; `None` means unbounded (default).
    pub max_body_size: Option<u64>,
    /// Handling of `Content-Length` next to chunked encoding
    /// (default: [`Strictness::Strict`]).
    pub strictness: Strictness,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_method_len: 32,
            max_url_len: 65_536,
            max_header_field_len: 8_192,
            max_header_value_len: 8_192,
            max_reason_len: 8_192,
            max_chunk_extension_len: 8_192,
            max_headers: 128,
            max_body_size: None,
            strictness: Strictness::Strict,
        }
    }
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

const HTTP_NAME: &[u8] = b"HTTP/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,

    // ---- Request line ----
    Method,
    Url,

    // ---- Version (both modes); index of the next expected "HTTP/" byte ----
    VersionName(usize),
    VersionMajor,
    VersionMinor,
    RequestLineLf,

    // ---- Status line ----
    StatusCode,
    StatusAfterCode,
    StatusReason,
    StatusLineLf,

    // ---- Header and trailer section ----
    FieldLineStart,
    FieldName,
    FieldValueOws,
    FieldValue,
    FieldValueLf,
    SectionEndLf,

    // ---- Bodies ----
    BodyIdentity,
    BodyUntilClose,

    // ---- Chunked transfer encoding ----
    ChunkSize,
    ChunkExt,
    ChunkSizeLf,
    ChunkData,
    ChunkDataCr,
    ChunkDataLf,

    MessageDone,
    Error,
}

/// A protocol violation detected while stepping, before it is located.
struct Violation(ErrorKind, &'static str);

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// An incremental, event-driven HTTP/1.x parser.
///
/// Bytes go in through [`feed`](Self::feed) in chunks of any size; events
/// come out through the caller's [`EventSink`] in stream order. Nothing from
/// the caller's chunks is retained once `feed` returns.
///
/// # Usage
///
/// ```rust
/// use h1stream::{OwnedEvent, Parser, ParserMode};
///
/// let mut parser = Parser::new(ParserMode::Request);
/// let mut events: Vec<OwnedEvent> = Vec::new();
///
/// let raw = b"GET /test HTTP/1.1\r\n\r\n";
/// let consumed = parser.feed(raw, &mut events).unwrap();
///
/// assert_eq!(consumed, raw.len());
/// assert!(parser.is_complete());
/// assert_eq!(parser.url(), b"/test");
/// assert_eq!(events.last(), Some(&OwnedEvent::MessageComplete));
/// ```
#[derive(Debug)]
pub struct Parser {
    mode: ParserMode,
    config: ParserConfig,
    state: State,
    paused: bool,
    error: Option<ParseError>,
    /// Bytes consumed since the last reset.
    position: usize,

    acc: Accumulator,
    pending_field: Bytes,
    meta: MessageMetadata,

    /// Scratch for version digits, status code and chunk size.
    number: u64,
    digits: u8,
    in_trailers: bool,
    head_response: bool,

    body_remaining: u64,
    chunk_remaining: u64,
    body_received: u64,
}

impl Parser {
    /// Create a parser with default configuration.
    pub fn new(mode: ParserMode) -> Self {
        Self::with_config(mode, ParserConfig::default())
    }

    /// Create a parser with custom limits and policies.
    pub fn with_config(mode: ParserMode, config: ParserConfig) -> Self {
        Self {
            mode,
            config,
            state: State::Start,
            paused: false,
            error: None,
            position: 0,
            acc: Accumulator::new(),
            pending_field: Bytes::new(),
            meta: MessageMetadata::default(),
            number: 0,
            digits: 0,
            in_trailers: false,
            head_response: false,
            body_remaining: 0,
            chunk_remaining: 0,
            body_received: 0,
        }
    }

    /// Shorthand for `Parser::new(ParserMode::Request)`.
    pub fn request() -> Self {
        Self::new(ParserMode::Request)
    }

    /// Shorthand for `Parser::new(ParserMode::Response)`.
    pub fn response() -> Self {
        Self::new(ParserMode::Response)
    }

    // ----- control surface ------------------------------------------------

    /// Stop consuming input. `feed` returns `Ok(0)` until [`resume`](Self::resume).
    pub fn pause(&mut self) {
        tracing::trace!("parser paused");
        self.paused = true;
    }

    pub fn resume(&mut self) {
        tracing::trace!("parser resumed");
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Discard all message state, clear the pause flag and any error, and
    /// return to `START` in the current mode.
    pub fn reset(&mut self) {
        self.reset_with_mode(self.mode);
    }

    /// Like [`reset`](Self::reset), switching to `mode`.
    pub fn reset_with_mode(&mut self, mode: ParserMode) {
        tracing::trace!(%mode, "parser reset");
        self.mode = mode;
        self.state = State::Start;
        self.paused = false;
        self.error = None;
        self.position = 0;
        self.acc.clear();
        self.pending_field = Bytes::new();
        self.meta = MessageMetadata::default();
        self.number = 0;
        self.digits = 0;
        self.in_trailers = false;
        self.head_response = false;
        self.body_remaining = 0;
        self.chunk_remaining = 0;
        self.body_received = 0;
    }

    /// Acknowledge that another response follows the completed one.
    ///
    /// Returns `false` (and does nothing) unless the parser is in
    /// `MESSAGE_DONE` with keep-alive resolved true. A connection that was
    /// not kept alive carries no further messages; use
    /// [`reset`](Self::reset) to start over.
    pub fn next_message(&mut self) -> bool {
        if self.state != State::MessageDone || !self.meta.keep_alive {
            return false;
        }
        self.state = State::Start;
        true
    }

    /// Declare that the next response answers a HEAD request, so it carries
    /// no body whatever its headers say. Cleared when that response
    /// completes.
    pub fn set_head_response(&mut self, head: bool) {
        self.head_response = head;
    }

    // ----- feeding ----------------------------------------------------------

    /// Feed a chunk of bytes into the parser, delivering events to `sink`.
    ///
    /// Returns the number of bytes consumed from `data`. Fewer than
    /// `data.len()` are consumed when the parser pauses, or when a message
    /// completes and the next one cannot start on its own (see
    /// [`next_message`](Self::next_message)); the caller re-feeds the rest.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] on any protocol violation or limit breach. The
    /// parser then stays in `ERROR` and returns the same error until reset.
    pub fn feed<S: EventSink + ?Sized>(
        &mut self,
        data: &[u8],
        sink: &mut S,
    ) -> Result<usize, ParseError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        let mut scan = Scanner::new(data);

        while !scan.is_empty() && !self.paused {
            if self.state == State::MessageDone {
                if self.mode == ParserMode::Request && self.meta.keep_alive {
                    self.state = State::Start;
                } else {
                    break;
                }
            }

            if let Err(Violation(kind, reason)) = self.step(&mut scan, sink) {
                let offset = scan.pos().saturating_sub(1);
                return Err(self.fail(kind, reason, offset));
            }
        }

        self.position += scan.pos();
        Ok(scan.pos())
    }

    /// Signal end of stream.
    ///
    /// Completes a body delimited by connection close (emitting
    /// [`Event::MessageComplete`]). Succeeds without effect when idle or
    /// after a complete message.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::UnexpectedEndOfStream`] inside a length-delimited or
    /// chunked body, [`ErrorKind::PrematureMessageEnd`] inside the start
    /// line or header section, or the stored error when already failed.
    pub fn finish<S: EventSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), ParseError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        match self.state {
            State::Start | State::MessageDone => Ok(()),
            State::BodyUntilClose => {
                self.complete_message(sink);
                Ok(())
            }
            State::BodyIdentity
            | State::ChunkSize
            | State::ChunkExt
            | State::ChunkSizeLf
            | State::ChunkData
            | State::ChunkDataCr
            | State::ChunkDataLf => Err(self.fail(
                ErrorKind::UnexpectedEndOfStream,
                "stream ended before the declared body was received",
                0,
            )),
            _ if self.in_trailers => Err(self.fail(
                ErrorKind::UnexpectedEndOfStream,
                "stream ended inside the trailer section",
                0,
            )),
            _ => Err(self.fail(
                ErrorKind::PrematureMessageEnd,
                "stream ended in the middle of the message head",
                0,
            )),
        }
    }

    // ----- state machine ----------------------------------------------------

    /// Advance over one byte, or one run of bytes belonging to the same
    /// token or body.
    fn step<S: EventSink + ?Sized>(
        &mut self,
        scan: &mut Scanner<'_>,
        sink: &mut S,
    ) -> Result<(), Violation> {
        // ----- bulk paths -----
        match self.state {
            State::BodyIdentity => {
                let data = scan.take(clamp(self.body_remaining));
                self.body_remaining -= data.len() as u64;
                self.paused |= sink.on_event(Event::Body(data)).is_pause();
                if self.body_remaining == 0 {
                    self.complete_message(sink);
                }
                return Ok(());
            }
            State::BodyUntilClose => {
                let data = scan.take(scan.remaining());
                self.paused |= sink.on_event(Event::Body(data)).is_pause();
                return Ok(());
            }
            State::ChunkData => {
                let data = scan.take(clamp(self.chunk_remaining));
                self.chunk_remaining -= data.len() as u64;
                self.paused |= sink.on_event(Event::Body(data)).is_pause();
                if self.chunk_remaining == 0 {
                    self.state = State::ChunkDataCr;
                }
                return Ok(());
            }
            State::Method => self.capture(scan, is_tchar, "method is too long")?,
            State::Url => self.capture(scan, is_url_byte, "request target is too long")?,
            State::StatusReason => {
                self.capture(scan, is_field_content_byte, "reason phrase is too long")?
            }
            State::FieldName => self.capture(scan, is_tchar, "field name is too long")?,
            State::FieldValue => {
                self.capture(scan, is_field_content_byte, "field value is too long")?
            }
            State::ChunkExt => {
                self.capture(scan, is_field_content_byte, "chunk extension is too long")?
            }
            _ => {}
        }

        // ----- byte-by-byte path -----
        let Some(byte) = scan.bump() else {
            return Ok(());
        };

        match self.state {
            State::Start => {
                // RFC 9112 §2.2: tolerate empty lines ahead of a message.
                if byte == b'\r' || byte == b'\n' {
                    return Ok(());
                }
                self.begin_message(sink);
                match self.mode {
                    ParserMode::Request if is_tchar(byte) => {
                        self.acc.begin(TokenKind::Method, self.config.max_method_len);
                        self.acc
                            .push(byte)
                            .map_err(|k| Violation(k, "method is too long"))?;
                        self.state = State::Method;
                    }
                    ParserMode::Response if byte == HTTP_NAME[0] => {
                        self.state = State::VersionName(1);
                    }
                    ParserMode::Request => {
                        return Err(Violation(
                            ErrorKind::MalformedStartLine,
                            "expected method token",
                        ));
                    }
                    ParserMode::Response => {
                        return Err(Violation(ErrorKind::MalformedStartLine, "expected HTTP/"));
                    }
                }
            }

            // ===================== REQUEST LINE =====================
            State::Method => {
                if byte != b' ' {
                    return Err(Violation(
                        ErrorKind::MalformedStartLine,
                        "expected token character or SP in method",
                    ));
                }
                self.meta.method = self.acc.end();
                self.acc.begin(TokenKind::Url, self.config.max_url_len);
                self.state = State::Url;
            }

            State::Url => {
                if byte != b' ' {
                    return Err(Violation(
                        ErrorKind::MalformedStartLine,
                        "expected visible character or SP in request target",
                    ));
                }
                if self.acc.is_empty() {
                    return Err(Violation(ErrorKind::MalformedStartLine, "empty request target"));
                }
                self.meta.url = self.acc.end();
                self.paused |= sink.on_event(Event::Url(&self.meta.url)).is_pause();
                self.state = State::VersionName(0);
            }

            // ===================== VERSION =====================
            State::VersionName(i) => {
                if byte != HTTP_NAME[i] {
                    return Err(Violation(ErrorKind::MalformedStartLine, "expected HTTP/"));
                }
                if i + 1 == HTTP_NAME.len() {
                    self.begin_number();
                    self.state = State::VersionMajor;
                } else {
                    self.state = State::VersionName(i + 1);
                }
            }

            State::VersionMajor => {
                if byte == b'.' && self.digits > 0 {
                    self.meta.http_major = self.number as u8;
                    self.begin_number();
                    self.state = State::VersionMinor;
                } else {
                    self.push_version_digit(byte)?;
                }
            }

            State::VersionMinor => {
                let end = match self.mode {
                    ParserMode::Request => b'\r',
                    ParserMode::Response => b' ',
                };
                if byte == end && self.digits > 0 {
                    self.meta.http_minor = self.number as u8;
                    match self.mode {
                        ParserMode::Request => self.state = State::RequestLineLf,
                        ParserMode::Response => {
                            self.begin_number();
                            self.state = State::StatusCode;
                        }
                    }
                } else {
                    self.push_version_digit(byte)?;
                }
            }

            State::RequestLineLf => {
                if byte != b'\n' {
                    return Err(Violation(
                        ErrorKind::MalformedStartLine,
                        "expected LF after request line",
                    ));
                }
                self.state = State::FieldLineStart;
            }

            // ===================== STATUS LINE =====================
            State::StatusCode => {
                if !byte.is_ascii_digit() {
                    return Err(Violation(
                        ErrorKind::MalformedStartLine,
                        "status code must be three digits",
                    ));
                }
                self.number = self.number * 10 + u64::from(byte - b'0');
                self.digits += 1;
                if self.digits == 3 {
                    if self.number < 100 {
                        return Err(Violation(
                            ErrorKind::MalformedStartLine,
                            "status code out of range",
                        ));
                    }
                    self.meta.status_code = self.number as u16;
                    self.state = State::StatusAfterCode;
                }
            }

            State::StatusAfterCode => match byte {
                b' ' => {
                    self.acc.begin(TokenKind::Reason, self.config.max_reason_len);
                    self.state = State::StatusReason;
                }
                b'\r' => self.state = State::StatusLineLf,
                _ => {
                    return Err(Violation(
                        ErrorKind::MalformedStartLine,
                        "expected SP after status code",
                    ));
                }
            },

            State::StatusReason => {
                if byte != b'\r' {
                    return Err(Violation(
                        ErrorKind::MalformedStartLine,
                        "invalid character in reason phrase",
                    ));
                }
                self.meta.status_reason = self.acc.end();
                self.state = State::StatusLineLf;
            }

            State::StatusLineLf => {
                if byte != b'\n' {
                    return Err(Violation(
                        ErrorKind::MalformedStartLine,
                        "expected LF after status line",
                    ));
                }
                let event = Event::Status {
                    code: self.meta.status_code,
                    reason: &self.meta.status_reason,
                };
                self.paused |= sink.on_event(event).is_pause();
                self.state = State::FieldLineStart;
            }

            // ===================== HEADERS / TRAILERS =====================
            State::FieldLineStart => {
                if byte == b'\r' {
                    self.state = State::SectionEndLf;
                } else if byte == b' ' || byte == b'\t' {
                    return Err(Violation(
                        ErrorKind::InvalidHeaderSyntax,
                        "obsolete line folding is not supported",
                    ));
                } else if is_tchar(byte) {
                    let count = if self.in_trailers {
                        self.meta.trailers.len()
                    } else {
                        self.meta.headers.len()
                    };
                    if count >= self.config.max_headers {
                        return Err(Violation(
                            ErrorKind::TooManyHeaders,
                            "header count exceeds configured maximum",
                        ));
                    }
                    self.acc
                        .begin(TokenKind::HeaderField, self.config.max_header_field_len);
                    self.acc
                        .push(byte)
                        .map_err(|k| Violation(k, "field name is too long"))?;
                    self.state = State::FieldName;
                } else {
                    return Err(Violation(
                        ErrorKind::InvalidHeaderSyntax,
                        "expected field name or CR",
                    ));
                }
            }

            State::FieldName => {
                if byte != b':' {
                    return Err(Violation(
                        ErrorKind::InvalidHeaderSyntax,
                        "expected token character or ':' in field name",
                    ));
                }
                self.pending_field = self.acc.end();
                self.paused |= sink
                    .on_event(Event::HeaderField(&self.pending_field))
                    .is_pause();
                self.acc
                    .begin(TokenKind::HeaderValue, self.config.max_header_value_len);
                self.state = State::FieldValueOws;
            }

            State::FieldValueOws => {
                if byte == b' ' || byte == b'\t' {
                    // Leading OWS is not part of the value.
                } else if byte == b'\r' {
                    self.state = State::FieldValueLf;
                } else if is_field_content_byte(byte) {
                    self.acc
                        .push(byte)
                        .map_err(|k| Violation(k, "field value is too long"))?;
                    self.state = State::FieldValue;
                } else {
                    return Err(Violation(
                        ErrorKind::InvalidHeaderSyntax,
                        "invalid character in field value",
                    ));
                }
            }

            State::FieldValue => {
                if byte != b'\r' {
                    return Err(Violation(
                        ErrorKind::InvalidHeaderSyntax,
                        "invalid character in field value",
                    ));
                }
                self.acc.trim_trailing_ows();
                self.state = State::FieldValueLf;
            }

            State::FieldValueLf => {
                if byte != b'\n' {
                    return Err(Violation(
                        ErrorKind::InvalidHeaderSyntax,
                        "expected LF after field value",
                    ));
                }
                let value = self.acc.end();
                self.paused |= sink.on_event(Event::HeaderValue(&value)).is_pause();
                let header = Header {
                    name: std::mem::take(&mut self.pending_field),
                    value,
                };
                if self.in_trailers {
                    self.meta.trailers.push(header);
                } else {
                    self.meta.headers.push(header);
                }
                self.state = State::FieldLineStart;
            }

            State::SectionEndLf => {
                if byte != b'\n' {
                    return Err(Violation(
                        ErrorKind::InvalidHeaderSyntax,
                        "expected LF after blank line",
                    ));
                }
                if self.in_trailers {
                    self.complete_message(sink);
                } else {
                    self.headers_complete(sink)?;
                }
            }

            // ===================== CHUNKED ENCODING =====================
            State::ChunkSize => {
                if let Some(digit) = hex_value(byte) {
                    if self.digits == 16 {
                        return Err(Violation(ErrorKind::InvalidChunkSize, "chunk size overflows"));
                    }
                    self.number = (self.number << 4) | u64::from(digit);
                    self.digits += 1;
                } else if self.digits == 0 {
                    return Err(Violation(
                        ErrorKind::InvalidChunkSize,
                        "expected hex digit in chunk size",
                    ));
                } else if byte == b';' {
                    self.acc
                        .begin(TokenKind::ChunkExtension, self.config.max_chunk_extension_len);
                    self.state = State::ChunkExt;
                } else if byte == b'\r' {
                    self.state = State::ChunkSizeLf;
                } else {
                    return Err(Violation(
                        ErrorKind::InvalidChunkSize,
                        "expected hex digit, ';' or CR in chunk size",
                    ));
                }
            }

            // RFC 9112 §7.1.1: extensions are captured for the length cap
            // and otherwise ignored.
            State::ChunkExt => {
                if byte != b'\r' {
                    return Err(Violation(
                        ErrorKind::InvalidChunkSize,
                        "invalid character in chunk extension",
                    ));
                }
                self.acc.clear();
                self.state = State::ChunkSizeLf;
            }

            State::ChunkSizeLf => {
                if byte != b'\n' {
                    return Err(Violation(
                        ErrorKind::InvalidChunkSize,
                        "expected LF after chunk size",
                    ));
                }
                let size = self.number;
                if size == 0 {
                    self.in_trailers = true;
                    self.state = State::FieldLineStart;
                } else {
                    self.body_received = self.body_received.saturating_add(size);
                    if self
                        .config
                        .max_body_size
                        .is_some_and(|max| self.body_received > max)
                    {
                        return Err(Violation(
                            ErrorKind::BodyTooLarge,
                            "chunked body exceeds configured maximum",
                        ));
                    }
                    self.chunk_remaining = size;
                    self.state = State::ChunkData;
                }
            }

            State::ChunkDataCr => {
                if byte != b'\r' {
                    return Err(Violation(
                        ErrorKind::InvalidChunkSize,
                        "expected CR after chunk data",
                    ));
                }
                self.state = State::ChunkDataLf;
            }

            State::ChunkDataLf => {
                if byte != b'\n' {
                    return Err(Violation(
                        ErrorKind::InvalidChunkSize,
                        "expected LF after chunk data",
                    ));
                }
                self.begin_number();
                self.state = State::ChunkSize;
            }

            // Bulk states return above; MessageDone and Error never step.
            State::BodyIdentity
            | State::BodyUntilClose
            | State::ChunkData
            | State::MessageDone
            | State::Error => {
                unreachable!("handled by bulk paths or before stepping");
            }
        }

        Ok(())
    }

    // ----- helpers --------------------------------------------------------

    /// Append the run of bytes matching `pred` to the current token.
    ///
    /// At most one byte past the token's cap is consumed, so an overflow is
    /// reported at the first byte that does not fit.
    fn capture(
        &mut self,
        scan: &mut Scanner<'_>,
        pred: fn(u8) -> bool,
        too_long: &'static str,
    ) -> Result<(), Violation> {
        let run = scan.take_while_max(pred, self.acc.room().saturating_add(1));
        self.acc.extend(run).map_err(|kind| {
            tracing::debug!(token = ?self.acc.kind(), len = self.acc.len(), "token exceeds cap");
            Violation(kind, too_long)
        })
    }

    fn begin_number(&mut self) {
        self.number = 0;
        self.digits = 0;
    }

    /// Version numbers are 1–3 digits and must fit in a `u8`.
    fn push_version_digit(&mut self, byte: u8) -> Result<(), Violation> {
        if !byte.is_ascii_digit() || self.digits == 3 {
            return Err(Violation(ErrorKind::MalformedStartLine, "malformed HTTP version"));
        }
        self.number = self.number * 10 + u64::from(byte - b'0');
        self.digits += 1;
        if self.number > u64::from(u8::MAX) {
            return Err(Violation(ErrorKind::MalformedStartLine, "HTTP version out of range"));
        }
        Ok(())
    }

    fn begin_message<S: EventSink + ?Sized>(&mut self, sink: &mut S) {
        tracing::trace!(mode = %self.mode, position = self.position, "message begin");
        self.meta = MessageMetadata::default();
        self.in_trailers = false;
        self.body_remaining = 0;
        self.chunk_remaining = 0;
        self.body_received = 0;
        self.begin_number();
        self.paused |= sink.on_event(Event::MessageBegin).is_pause();
    }

    /// Resolve framing once the header section is complete, announce it and
    /// move to the matching body state.
    fn headers_complete<S: EventSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), Violation> {
        let ctx = FramingContext {
            mode: self.mode,
            http_major: self.meta.http_major,
            http_minor: self.meta.http_minor,
            status_code: self.meta.status_code,
            head_response: self.head_response,
            strictness: self.config.strictness,
            max_body_size: self.config.max_body_size,
        };
        let framing = framing::resolve(&self.meta.headers, &ctx)
            .map_err(|kind| Violation(kind, framing_reason(kind)))?;

        self.meta.content_length = framing.content_length;
        self.meta.chunked = framing.chunked;
        self.meta.keep_alive = framing.keep_alive;
        self.meta.body = Some(framing.strategy);

        tracing::debug!(
            headers = self.meta.headers.len(),
            strategy = ?framing.strategy,
            keep_alive = framing.keep_alive,
            "headers complete"
        );
        self.paused |= sink
            .on_event(Event::HeadersComplete(&self.meta))
            .is_pause();

        match framing.strategy {
            BodyStrategy::NoBody => self.complete_message(sink),
            BodyStrategy::Identity(len) => {
                self.body_remaining = len;
                self.state = State::BodyIdentity;
            }
            BodyStrategy::Chunked => {
                self.begin_number();
                self.state = State::ChunkSize;
            }
            BodyStrategy::UntilClose => self.state = State::BodyUntilClose,
        }
        Ok(())
    }

    fn complete_message<S: EventSink + ?Sized>(&mut self, sink: &mut S) {
        tracing::trace!(
            keep_alive = self.meta.keep_alive,
            trailers = self.meta.trailers.len(),
            "message complete"
        );
        self.state = State::MessageDone;
        self.head_response = false;
        self.paused |= sink.on_event(Event::MessageComplete).is_pause();
    }

    /// Enter `ERROR`, remembering the failure for subsequent calls.
    fn fail(&mut self, kind: ErrorKind, reason: &'static str, offset: usize) -> ParseError {
        let err = ParseError {
            kind,
            state: self.state(),
            offset,
            position: self.position + offset,
            reason,
        };
        tracing::debug!(error = %err, code = kind.code(), "parse error");
        self.state = State::Error;
        self.acc.clear();
        self.error = Some(err.clone());
        err
    }

    /// Error for a one-shot parse whose input ended without a complete
    /// message and without `finish` objecting (e.g. empty input).
    pub(crate) fn incomplete(&self) -> ParseError {
        ParseError {
            kind: ErrorKind::PrematureMessageEnd,
            state: self.state(),
            offset: 0,
            position: self.position,
            reason: "input ended before a complete message",
        }
    }

    // ----- accessors ------------------------------------------------------

    pub fn mode(&self) -> ParserMode {
        self.mode
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Current coarse state.
    pub fn state(&self) -> ParserState {
        match self.state {
            State::Start => ParserState::Start,
            State::Method => ParserState::Method,
            State::Url => ParserState::Url,
            State::VersionName(_)
            | State::VersionMajor
            | State::VersionMinor
            | State::RequestLineLf => ParserState::HttpVersion,
            State::StatusCode | State::StatusAfterCode => ParserState::StatusCode,
            State::StatusReason | State::StatusLineLf => ParserState::StatusReason,
            _ if self.in_trailers
                && matches!(
                    self.state,
                    State::FieldLineStart
                        | State::FieldName
                        | State::FieldValueOws
                        | State::FieldValue
                        | State::FieldValueLf
                        | State::SectionEndLf
                ) =>
            {
                ParserState::BodyChunkTrailer
            }
            State::FieldLineStart | State::FieldName => ParserState::HeaderField,
            State::FieldValueOws | State::FieldValue | State::FieldValueLf => {
                ParserState::HeaderValue
            }
            State::SectionEndLf => ParserState::HeadersDone,
            State::BodyIdentity | State::BodyUntilClose => ParserState::BodyIdentity,
            State::ChunkSize | State::ChunkExt | State::ChunkSizeLf => ParserState::BodyChunkSize,
            State::ChunkData | State::ChunkDataCr | State::ChunkDataLf => {
                ParserState::BodyChunkData
            }
            State::MessageDone => ParserState::MessageDone,
            State::Error => ParserState::Error,
        }
    }

    /// Returns `true` once the current message has been fully parsed.
    pub fn is_complete(&self) -> bool {
        self.state == State::MessageDone
    }

    /// The error that put the parser into `ERROR`, if any.
    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    /// Metadata of the current (or most recently completed) message.
    pub fn metadata(&self) -> &MessageMetadata {
        &self.meta
    }

    pub fn http_major(&self) -> u8 {
        self.meta.http_major
    }

    pub fn http_minor(&self) -> u8 {
        self.meta.http_minor
    }

    pub fn method(&self) -> &[u8] {
        &self.meta.method
    }

    pub fn method_kind(&self) -> Option<HttpMethod> {
        self.meta.method_kind()
    }

    pub fn url(&self) -> &[u8] {
        &self.meta.url
    }

    pub fn status_code(&self) -> u16 {
        self.meta.status_code
    }

    pub fn status_reason(&self) -> &[u8] {
        &self.meta.status_reason
    }

    pub fn headers(&self) -> &[Header] {
        &self.meta.headers
    }

    pub fn trailers(&self) -> &[Header] {
        &self.meta.trailers
    }

    /// Whether the connection may carry another message after this one.
    /// Meaningful once the header section is complete.
    pub fn should_keep_alive(&self) -> bool {
        self.meta.keep_alive
    }

    /// Whether the body only ends when the peer closes the connection,
    /// i.e. the caller must call [`finish`](Self::finish).
    pub fn message_needs_eof(&self) -> bool {
        self.meta.body == Some(BodyStrategy::UntilClose)
    }

    /// Total number of bytes consumed since construction or the last reset.
    pub fn bytes_consumed(&self) -> usize {
        self.position
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::request()
    }
}

fn framing_reason(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::ConflictingContentLength => "content-length conflicts with message framing",
        ErrorKind::InvalidContentLength => "content-length is not a decimal integer",
        ErrorKind::InvalidTransferEncoding => "transfer-encoding does not end with chunked",
        ErrorKind::BodyTooLarge => "declared body exceeds configured maximum",
        _ => "header section does not frame a valid body",
    }
}

#[inline]
fn clamp(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

#[inline]
fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Character classification helpers (RFC 9110 / RFC 9112)
// ---------------------------------------------------------------------------

/// `tchar` – characters allowed in HTTP tokens (method, field names).
///
/// ```text
/// tchar = "!" / "#" / "$" / "%" / "&" / "'" / "*" / "+" / "-" / "." /
///         "^" / "_" / "`" / "|" / "~" / DIGIT / ALPHA
/// ```
#[inline]
fn is_tchar(b: u8) -> bool {
    matches!(
        b,
        b'!' | b'#'
            | b'$'
            | b'%'
            | b'&'
            | b'\''
            | b'*'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~'
            | b'0'..=b'9'
            | b'a'..=b'z'
            | b'A'..=b'Z'
    )
}

/// Request-target bytes: anything visible, no SP, no CTL.
#[inline]
fn is_url_byte(b: u8) -> bool {
    b > b' ' && b != 0x7F
}

/// Bytes permitted inside a field value, reason phrase or chunk extension:
/// `SP / HTAB / VCHAR / obs-text`.
#[inline]
fn is_field_content_byte(b: u8) -> bool {
    b == b' ' || b == b'\t' || (0x21..=0x7E).contains(&b) || b >= 0x80
}

// ---------------------------------------------------------------------------
// Tests (unit)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Flow, FnSink, OwnedEvent};

    #[test]
    fn tchar_accepts_valid_bytes() {
        for &b in b"abcXYZ019!#$%&'*+-.^_`|~" {
            assert!(is_tchar(b), "expected tchar for byte 0x{b:02X}");
        }
    }

    #[test]
    fn tchar_rejects_invalid_bytes() {
        for &b in b" \t\r\n@[]{}:" {
            assert!(!is_tchar(b), "expected non-tchar for byte 0x{b:02X}");
        }
    }

    #[test]
    fn field_content_byte_rejects_ctl() {
        assert!(!is_field_content_byte(0x00));
        assert!(!is_field_content_byte(b'\r'));
        assert!(!is_field_content_byte(0x7F));
        assert!(is_field_content_byte(0x80));
    }

    #[test]
    fn url_byte_rejects_space_and_ctl() {
        assert!(is_url_byte(b'/'));
        assert!(is_url_byte(b'?'));
        assert!(!is_url_byte(b' '));
        assert!(!is_url_byte(b'\r'));
        assert!(!is_url_byte(0x7F));
    }

    #[test]
    fn hex_value_covers_both_cases() {
        assert_eq!(hex_value(b'0'), Some(0));
        assert_eq!(hex_value(b'a'), Some(10));
        assert_eq!(hex_value(b'F'), Some(15));
        assert_eq!(hex_value(b'g'), None);
    }

    #[test]
    fn internal_states_map_to_public_states() {
        let mut p = Parser::request();
        let mut sink = ();
        let steps: &[(&[u8], ParserState)] = &[
            (b"GE", ParserState::Method),
            (b"T /a", ParserState::Url),
            (b" HTTP/1.", ParserState::HttpVersion),
            (b"1\r\nHo", ParserState::HeaderField),
            (b"st: x", ParserState::HeaderValue),
            (b"\r\nTransfer-Encoding: chunked\r\n\r", ParserState::HeadersDone),
            (b"\n4", ParserState::BodyChunkSize),
            (b"\r\nab", ParserState::BodyChunkData),
            (b"cd\r\n0\r\nX-T", ParserState::BodyChunkTrailer),
            (b": 1\r\n\r\n", ParserState::MessageDone),
        ];
        for (chunk, expected) in steps {
            p.feed(chunk, &mut sink).unwrap();
            assert_eq!(p.state(), *expected, "after {:?}", String::from_utf8_lossy(chunk));
        }
    }

    #[test]
    fn status_line_states() {
        let mut p = Parser::response();
        let mut sink = ();
        p.feed(b"HTTP/1.1 2", &mut sink).unwrap();
        assert_eq!(p.state(), ParserState::StatusCode);
        p.feed(b"00 O", &mut sink).unwrap();
        assert_eq!(p.state(), ParserState::StatusReason);
    }

    #[test]
    fn sink_pause_stops_after_triggering_byte() {
        let raw = b"GET /a HTTP/1.1\r\n\r\n";
        let mut p = Parser::request();
        let mut sink = FnSink(|event: Event<'_>| {
            if matches!(event, Event::Url(_)) {
                Flow::Pause
            } else {
                Flow::Continue
            }
        });
        let consumed = p.feed(raw, &mut sink).unwrap();
        // "GET /a " – the SP ends the URL token.
        assert_eq!(consumed, 7);
        assert!(p.is_paused());
        assert_eq!(p.feed(&raw[consumed..], &mut sink).unwrap(), 0);
        p.resume();
        let rest = p.feed(&raw[consumed..], &mut sink).unwrap();
        assert_eq!(consumed + rest, raw.len());
        assert!(p.is_complete());
    }

    #[test]
    fn error_carries_state_and_offset() {
        let mut p = Parser::request();
        let mut events: Vec<OwnedEvent> = Vec::new();
        let err = p.feed(b"GET /a HTTP/1.1\r\nBad Header: x\r\n\r\n", &mut events).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidHeaderSyntax);
        assert_eq!(err.state, ParserState::HeaderField);
        // The SP inside "Bad Header".
        assert_eq!(err.offset, 20);
        assert_eq!(err.position, 20);
        assert_eq!(p.state(), ParserState::Error);
    }

    #[test]
    fn error_position_spans_feeds() {
        let mut p = Parser::request();
        let mut sink = ();
        p.feed(b"GET / HTTP/1.1\r\n", &mut sink).unwrap();
        let err = p.feed(b"\x01", &mut sink).unwrap_err();
        assert_eq!(err.offset, 0);
        assert_eq!(err.position, 16);
    }

    #[test]
    fn token_overflow_points_at_first_byte_past_the_cap() {
        let config = ParserConfig {
            max_url_len: 4,
            ..ParserConfig::default()
        };
        let mut p = Parser::with_config(ParserMode::Request, config);
        let mut sink = ();
        let raw = b"GET /abcdefghij HTTP/1.1\r\n\r\n";
        let err = p.feed(raw, &mut sink).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenTooLong);
        assert_eq!(err.offset, 8);
        assert_eq!(raw[err.offset], b'd');
        assert_eq!(err.position, 8);
    }

    #[test]
    fn version_digits_are_bounded() {
        let mut sink = ();
        let mut p = Parser::request();
        assert!(p.feed(b"GET / HTTP/1000.1\r\n", &mut sink).is_err());
        p.reset();
        assert!(p.feed(b"GET / HTTP/256.1\r\n", &mut sink).is_err());
        p.reset();
        p.feed(b"GET / HTTP/10.25\r\n\r\n", &mut sink).unwrap();
        assert_eq!((p.http_major(), p.http_minor()), (10, 25));
    }

    #[test]
    fn chunk_size_overflow_is_rejected() {
        let mut p = Parser::request();
        let mut sink = ();
        let raw = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n10000000000000000\r\n";
        let err = p.feed(raw, &mut sink).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidChunkSize);
    }
}
