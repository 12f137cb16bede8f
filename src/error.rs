use thiserror::Error;

use crate::types::ParserState;

/// Classification of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    /// The request line or status line does not follow the HTTP/1.x grammar.
    #[error("malformed start line")]
    MalformedStartLine,
    /// A header (or trailer) line is not `field-name ":" OWS field-value`.
    #[error("invalid header syntax")]
    InvalidHeaderSyntax,
    /// A token grew past its configured cap.
    #[error("token too long")]
    TokenTooLong,
    /// `Content-Length` values disagree, or appear alongside chunked
    /// encoding under [`Strictness::Strict`](crate::Strictness::Strict).
    #[error("conflicting content-length")]
    ConflictingContentLength,
    /// A `Content-Length` value is not a decimal integer.
    #[error("invalid content-length")]
    InvalidContentLength,
    /// A request carries a `Transfer-Encoding` whose final coding is not
    /// `chunked`.
    #[error("invalid transfer-encoding")]
    InvalidTransferEncoding,
    /// The chunk-size line is not valid hexadecimal or overflows.
    #[error("invalid chunk size")]
    InvalidChunkSize,
    /// More header fields than [`ParserConfig::max_headers`](crate::ParserConfig::max_headers).
    #[error("too many headers")]
    TooManyHeaders,
    /// The declared body length exceeds [`ParserConfig::max_body_size`](crate::ParserConfig::max_body_size).
    #[error("body too large")]
    BodyTooLarge,
    /// End of stream arrived before a declared body was fully received.
    #[error("unexpected end of stream")]
    UnexpectedEndOfStream,
    /// End of stream arrived in the middle of a token or line.
    #[error("premature message end")]
    PrematureMessageEnd,
}

impl ErrorKind {
    /// Stable numeric code for callers that need one (bindings, logs).
    pub fn code(self) -> u16 {
        match self {
            Self::MalformedStartLine => 1,
            Self::InvalidHeaderSyntax => 2,
            Self::TokenTooLong => 3,
            Self::ConflictingContentLength => 4,
            Self::InvalidContentLength => 5,
            Self::InvalidTransferEncoding => 6,
            Self::InvalidChunkSize => 7,
            Self::TooManyHeaders => 8,
            Self::BodyTooLarge => 9,
            Self::UnexpectedEndOfStream => 10,
            Self::PrematureMessageEnd => 11,
        }
    }

    /// Look a kind up by its numeric code.
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.code() == code)
    }

    /// Longer human-readable description of the kind.
    pub fn message(self) -> &'static str {
        match self {
            Self::MalformedStartLine => "Request or status line is malformed",
            Self::InvalidHeaderSyntax => "Header line is malformed",
            Self::TokenTooLong => "Token exceeds its configured maximum length",
            Self::ConflictingContentLength => {
                "Content-Length conflicts with another framing header"
            }
            Self::InvalidContentLength => "Invalid content-length value",
            Self::InvalidTransferEncoding => "Transfer-Encoding must end with chunked",
            Self::InvalidChunkSize => "Invalid chunk size",
            Self::TooManyHeaders => "Number of headers exceeds maximum",
            Self::BodyTooLarge => "Declared body exceeds maximum allowed size",
            Self::UnexpectedEndOfStream => "Connection closed before body completed",
            Self::PrematureMessageEnd => "Connection closed in the middle of a message",
        }
    }

    pub const ALL: [ErrorKind; 11] = [
        Self::MalformedStartLine,
        Self::InvalidHeaderSyntax,
        Self::TokenTooLong,
        Self::ConflictingContentLength,
        Self::InvalidContentLength,
        Self::InvalidTransferEncoding,
        Self::InvalidChunkSize,
        Self::TooManyHeaders,
        Self::BodyTooLarge,
        Self::UnexpectedEndOfStream,
        Self::PrematureMessageEnd,
    ];
}

/// A fatal parse error together with where it happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} in state {state}: {reason} (offset {offset}, stream position {position})")]
pub struct ParseError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Parser state the offending byte was read in.
    pub state: ParserState,
    /// Index of the offending byte within the chunk passed to the failing
    /// `feed` call (0 for `finish`).
    pub offset: usize,
    /// Absolute position in the stream since the last reset.
    pub position: usize,
    /// Short description of what was expected.
    pub reason: &'static str,
}
