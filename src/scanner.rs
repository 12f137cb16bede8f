//! Cursor over a single input chunk.

/// A read cursor over one chunk handed to [`Parser::feed`](crate::Parser::feed).
///
/// The scanner never copies and never looks past the slice it was built
/// from; tokens that straddle two chunks are the accumulator's problem.
#[derive(Debug)]
pub(crate) struct Scanner<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Next byte without consuming it.
    #[inline]
    pub(crate) fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    /// Consume and return the next byte.
    #[inline]
    pub(crate) fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Consume the longest run of at most `max` bytes for which `pred` holds.
    pub(crate) fn take_while_max(&mut self, pred: impl Fn(u8) -> bool, max: usize) -> &'a [u8] {
        let start = self.pos;
        let window = &self.buf[start..start + max.min(self.remaining())];
        let len = window
            .iter()
            .position(|&b| !pred(b))
            .unwrap_or(window.len());
        self.pos += len;
        &self.buf[start..start + len]
    }

    /// Consume up to `n` bytes.
    pub(crate) fn take(&mut self, n: usize) -> &'a [u8] {
        let start = self.pos;
        let len = n.min(self.remaining());
        self.pos += len;
        &self.buf[start..start + len]
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Offset of the next unread byte within the chunk.
    #[inline]
    pub(crate) fn pos(&self) -> usize {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_does_not_advance() {
        let mut s = Scanner::new(b"ab");
        assert_eq!(s.peek(), Some(b'a'));
        assert_eq!(s.peek(), Some(b'a'));
        assert_eq!(s.bump(), Some(b'a'));
        assert_eq!(s.pos(), 1);
        assert_eq!(s.bump(), Some(b'b'));
        assert!(s.is_empty());
        assert_eq!(s.bump(), None);
        assert_eq!(s.pos(), 2);
    }

    #[test]
    fn take_while_stops_at_first_mismatch() {
        let mut s = Scanner::new(b"GET /x");
        assert_eq!(s.take_while_max(|b| b.is_ascii_uppercase(), usize::MAX), b"GET");
        assert_eq!(s.peek(), Some(b' '));
        assert_eq!(s.take_while_max(|b| b.is_ascii_uppercase(), usize::MAX), b"");
    }

    #[test]
    fn take_while_runs_to_end_of_chunk() {
        let mut s = Scanner::new(b"abc");
        assert_eq!(s.take_while_max(|b| b.is_ascii_lowercase(), 10), b"abc");
        assert!(s.is_empty());
    }

    #[test]
    fn take_while_stops_at_max() {
        let mut s = Scanner::new(b"abcdef");
        assert_eq!(s.take_while_max(|b| b.is_ascii_lowercase(), 4), b"abcd");
        assert_eq!(s.pos(), 4);
        assert_eq!(s.take_while_max(|b| b.is_ascii_lowercase(), 0), b"");
        assert_eq!(s.peek(), Some(b'e'));
    }

    #[test]
    fn take_is_clamped_to_remaining() {
        let mut s = Scanner::new(b"hello");
        assert_eq!(s.take(2), b"he");
        assert_eq!(s.remaining(), 3);
        assert_eq!(s.take(10), b"llo");
        assert_eq!(s.remaining(), 0);
    }
}
