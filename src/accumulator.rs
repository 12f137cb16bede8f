//! Parser-owned capture buffer for tokens that may span several chunks.

use bytes::{Bytes, BytesMut};

use crate::error::ErrorKind;

/// Which token is currently being captured. Only used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Method,
    Url,
    Reason,
    HeaderField,
    HeaderValue,
    ChunkExtension,
}

#[derive(Debug)]
pub(crate) struct Accumulator {
    buf: BytesMut,
    kind: Option<TokenKind>,
    limit: usize,
}

impl Accumulator {
    pub(crate) fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(256),
            kind: None,
            limit: 0,
        }
    }

    /// Start capturing a new token, discarding anything left over.
    pub(crate) fn begin(&mut self, kind: TokenKind, limit: usize) {
        self.buf.clear();
        self.kind = Some(kind);
        self.limit = limit;
    }

    pub(crate) fn push(&mut self, byte: u8) -> Result<(), ErrorKind> {
        self.extend(&[byte])
    }

    pub(crate) fn extend(&mut self, bytes: &[u8]) -> Result<(), ErrorKind> {
        if self.buf.len() + bytes.len() > self.limit {
            return Err(ErrorKind::TokenTooLong);
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Drop trailing SP / HTAB from the captured bytes.
    pub(crate) fn trim_trailing_ows(&mut self) {
        while self.buf.last().is_some_and(|&b| b == b' ' || b == b'\t') {
            self.buf.truncate(self.buf.len() - 1);
        }
    }

    /// Finish the current token and hand it out as an immutable buffer.
    pub(crate) fn end(&mut self) -> Bytes {
        self.kind = None;
        self.buf.split().freeze()
    }

    /// Bytes that still fit under the cap.
    pub(crate) fn room(&self) -> usize {
        self.limit.saturating_sub(self.buf.len())
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub(crate) fn kind(&self) -> Option<TokenKind> {
        self.kind
    }

    pub(crate) fn clear(&mut self) {
        self.buf.clear();
        self.kind = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_survives_several_appends() {
        let mut acc = Accumulator::new();
        acc.begin(TokenKind::Url, 64);
        acc.extend(b"/api").unwrap();
        acc.push(b'/').unwrap();
        acc.extend(b"users").unwrap();
        assert_eq!(acc.kind(), Some(TokenKind::Url));
        assert_eq!(&acc.end()[..], b"/api/users");
        assert!(acc.is_empty());
        assert_eq!(acc.kind(), None);
    }

    #[test]
    fn exceeding_the_cap_is_rejected() {
        let mut acc = Accumulator::new();
        acc.begin(TokenKind::Method, 3);
        acc.extend(b"GET").unwrap();
        assert_eq!(acc.room(), 0);
        assert_eq!(acc.push(b'X'), Err(ErrorKind::TokenTooLong));
        assert_eq!(acc.len(), 3);
    }

    #[test]
    fn begin_discards_previous_capture() {
        let mut acc = Accumulator::new();
        acc.begin(TokenKind::HeaderField, 16);
        acc.extend(b"Host").unwrap();
        acc.begin(TokenKind::HeaderValue, 16);
        assert!(acc.is_empty());
    }

    #[test]
    fn trailing_ows_is_trimmed() {
        let mut acc = Accumulator::new();
        acc.begin(TokenKind::HeaderValue, 32);
        acc.extend(b"hello  world \t ").unwrap();
        acc.trim_trailing_ows();
        assert_eq!(&acc.end()[..], b"hello  world");
    }

    #[test]
    fn ended_token_is_independent_of_the_buffer() {
        let mut acc = Accumulator::new();
        acc.begin(TokenKind::Reason, 16);
        acc.extend(b"OK").unwrap();
        let token = acc.end();
        acc.begin(TokenKind::Reason, 16);
        acc.extend(b"Not Found").unwrap();
        assert_eq!(&token[..], b"OK");
    }
}
