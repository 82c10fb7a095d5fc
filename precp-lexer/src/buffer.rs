use std::rc::Rc;

/// How many consecutive characters may be pushed back before the next one
/// is read. Enforced as a logical invariant on the `history` stack rather
/// than a hard ring-buffer capacity, since exceeding it is a caller bug,
/// not an end-user-triggerable condition.
pub const MAX_UNGETC: usize = 8;

/// An opaque, copyable snapshot of a [`CharBuffer`]'s reading position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSnapshot {
    pos: usize,
    line: u32,
    column: u32,
}

/// A byte cursor over an in-memory source buffer with bounded push-back
/// and line/column tracking that survives `ungetc`.
pub struct CharBuffer {
    source: Rc<str>,
    pos: usize,
    line: u32,
    column: u32,
    // Position recorded *before* each of the last few `getc` calls, so
    // `ungetc` can restore line/column exactly rather than recomputing
    // them by rescanning.
    history: Vec<(u32, u32)>,
}

impl CharBuffer {
    pub fn new(source: Rc<str>) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            column: 0,
            history: Vec::with_capacity(MAX_UNGETC),
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    /// Reads and consumes the next byte, or `None` at end of input.
    pub fn getc(&mut self) -> Option<u8> {
        if self.pos >= self.source.len() {
            return None;
        }
        let c = self.source.as_bytes()[self.pos];
        self.history.push((self.line, self.column));
        if self.history.len() > MAX_UNGETC {
            self.history.remove(0);
        }
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Pushes the most recently read character back onto the buffer.
    ///
    /// # Panics
    ///
    /// Panics if called more than [`MAX_UNGETC`] times in a row without an
    /// intervening `getc`, or with no prior `getc` at all — both are
    /// caller bugs, never end-user-triggerable.
    pub fn ungetc(&mut self) {
        let (line, column) = self
            .history
            .pop()
            .expect("ungetc called without a matching getc");
        self.pos -= 1;
        self.line = line;
        self.column = column;
    }

    pub fn peek(&mut self) -> Option<u8> {
        let c = self.getc();
        if c.is_some() {
            self.ungetc();
        }
        c
    }

    /// Rewinds to the start of the buffer, as if freshly constructed.
    /// Used to re-tokenize a macro body or captured argument more than
    /// once.
    pub fn rewind(&mut self) {
        self.pos = 0;
        self.line = 1;
        self.column = 0;
        self.history.clear();
    }

    /// Captures the current reading position for later restoration via
    /// [`Self::restore`]. Used to implement "peek a token, then put it
    /// back" for lookahead.
    pub fn snapshot(&self) -> BufferSnapshot {
        BufferSnapshot {
            pos: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    /// Jumps straight to a previously captured position. This is a seek,
    /// not an `ungetc` — it discards the push-back history, so it should
    /// only be used to restore a snapshot taken via [`Self::snapshot`],
    /// not as a substitute for `ungetc`.
    pub fn restore(&mut self, snapshot: BufferSnapshot) {
        self.pos = snapshot.pos;
        self.line = snapshot.line;
        self.column = snapshot.column;
        self.history.clear();
    }

    pub fn at_eof(&self) -> bool {
        self.pos >= self.source.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_line_and_column_across_newlines() {
        let mut buf = CharBuffer::new(Rc::from("ab\ncd"));
        assert_eq!(buf.getc(), Some(b'a'));
        assert_eq!((buf.line(), buf.column()), (1, 1));
        assert_eq!(buf.getc(), Some(b'b'));
        assert_eq!(buf.getc(), Some(b'\n'));
        assert_eq!((buf.line(), buf.column()), (2, 0));
        assert_eq!(buf.getc(), Some(b'c'));
        assert_eq!((buf.line(), buf.column()), (2, 1));
    }

    #[test]
    fn ungetc_restores_position_exactly() {
        let mut buf = CharBuffer::new(Rc::from("ab\nc"));
        buf.getc();
        buf.getc();
        buf.getc(); // consumes '\n', line becomes 2, column 0
        let snapshot = (buf.line(), buf.column());
        buf.ungetc();
        assert_ne!((buf.line(), buf.column()), snapshot);
        assert_eq!(buf.getc(), Some(b'\n'));
        assert_eq!((buf.line(), buf.column()), snapshot);
    }

    #[test]
    fn peek_does_not_advance() {
        let mut buf = CharBuffer::new(Rc::from("xy"));
        assert_eq!(buf.peek(), Some(b'x'));
        assert_eq!(buf.peek(), Some(b'x'));
        assert_eq!(buf.getc(), Some(b'x'));
        assert_eq!(buf.getc(), Some(b'y'));
        assert_eq!(buf.getc(), None);
    }
}
