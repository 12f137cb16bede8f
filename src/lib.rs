//! # h1stream
//!
//! An **incremental, event-driven HTTP/1.x parser** for requests and
//! responses, implemented as a byte-driven state machine.
//!
//! Input arrives in chunks of any size through [`Parser::feed`]; the parser
//! emits [`Event`]s into a caller-owned [`EventSink`] as soon as each piece
//! of the message is recognised, so bodies are never buffered. Body framing
//! follows RFC 9112: `Content-Length`, `Transfer-Encoding: chunked` (with
//! extensions and trailers) and read-until-close for responses.
//!
//! ## Quick start — streaming
//!
//! ```rust
//! use h1stream::{OwnedEvent, Parser, ParserMode};
//!
//! let mut parser = Parser::new(ParserMode::Response);
//! let mut events: Vec<OwnedEvent> = Vec::new();
//!
//! parser.feed(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n", &mut events).unwrap();
//! parser.feed(b"5\r\nHello\r\n0\r\n\r\n", &mut events).unwrap();
//!
//! assert!(parser.is_complete());
//! assert_eq!(parser.status_code(), 200);
//! assert_eq!(events.last(), Some(&OwnedEvent::MessageComplete));
//! ```
//!
//! ## Quick start — one-shot parsing
//!
//! ```rust
//! use h1stream::parse_request;
//!
//! let raw = b"POST /api HTTP/1.1\r\nContent-Length: 13\r\n\r\n{\"test\":true}";
//! let message = parse_request(raw).expect("valid request");
//! assert_eq!(&message.metadata.method[..], b"POST");
//! assert_eq!(message.body_as_str(), Some("{\"test\":true}"));
//! ```

mod accumulator;
mod error;
mod event;
mod framing;
mod output;
mod parser;
mod scanner;
mod types;

use bytes::BytesMut;

// Re-export public API.
pub use error::{ErrorKind, ParseError};
pub use event::{Event, EventKind, EventSink, FnSink, Flow, OwnedEvent};
pub use framing::{BodyStrategy, Strictness};
pub use output::{format_debug, format_events_jsonl, format_headers_only, format_json};
pub use parser::{Parser, ParserConfig};
pub use types::{
    Header, HttpMethod, MessageMetadata, ParsedMessage, ParserMode, ParserState,
};

/// Parse one **complete** HTTP request from a byte slice.
///
/// This is a convenience wrapper around [`Parser`] that collects the body.
/// Bytes after the first message (pipelining) are ignored.
///
/// # Errors
///
/// Returns [`ParseError`] if the data is malformed or incomplete.
pub fn parse_request(data: &[u8]) -> Result<ParsedMessage, ParseError> {
    parse_message(data, ParserMode::Request, ParserConfig::default())
}

/// Parse one **complete** HTTP response from a byte slice. The end of the
/// slice counts as connection close.
///
/// # Errors
///
/// Returns [`ParseError`] if the data is malformed or incomplete.
pub fn parse_response(data: &[u8]) -> Result<ParsedMessage, ParseError> {
    parse_message(data, ParserMode::Response, ParserConfig::default())
}

/// Parse one **complete** message using custom [`ParserConfig`] limits.
///
/// # Errors
///
/// Returns [`ParseError`] if the data is malformed, incomplete, or
/// exceeds the configured limits.
pub fn parse_message(
    data: &[u8],
    mode: ParserMode,
    config: ParserConfig,
) -> Result<ParsedMessage, ParseError> {
    let mut parser = Parser::with_config(mode, config);
    let mut body = BytesMut::new();

    {
        // Pausing on completion keeps a pipelined follower from starting.
        let mut sink = FnSink(|event: Event<'_>| match event {
            Event::Body(chunk) => {
                body.extend_from_slice(chunk);
                Flow::Continue
            }
            Event::MessageComplete => Flow::Pause,
            _ => Flow::Continue,
        });
        parser.feed(data, &mut sink)?;
        parser.finish(&mut sink)?;
    }

    if !parser.is_complete() {
        return Err(parser.incomplete());
    }

    Ok(ParsedMessage {
        metadata: parser.metadata().clone(),
        body: body.freeze(),
    })
}
