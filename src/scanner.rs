//! The low-level source cursor.
//!
//! The scanner exposes peeking, marker-run measurement, and checkpointing
//! over a borrowed source string. It never allocates; every returned text
//! fragment borrows from the source. Construct parsers drive it through
//! [`Context`](crate::Context).

/// A set of bytes that terminate a literal run.
///
/// Only ASCII bytes are ever inserted, so stopping on a member can never
/// split a UTF-8 sequence.
#[derive(Clone)]
pub(crate) struct ByteSet([bool; 256]);

impl ByteSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self([false; 256])
    }

    /// Inserts a byte.
    pub fn insert(&mut self, byte: u8) {
        self.0[usize::from(byte)] = true;
    }

    /// Returns true if the set contains the given byte.
    pub fn contains(&self, byte: u8) -> bool {
        self.0[usize::from(byte)]
    }
}

/// A saved scanner position.
#[derive(Clone, Copy, Debug)]
pub struct Checkpoint {
    offset: usize,
    line_start: bool,
}

/// A cursor over a source string.
#[derive(Clone, Copy)]
pub struct Scanner<'a> {
    source: &'a str,
    offset: usize,
    /// True when no non-whitespace character has been consumed since the
    /// last line break. Horizontal whitespace does not clear it, so block
    /// constructs still match after leading indentation.
    line_start: bool,
}

impl core::fmt::Debug for Scanner<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let rest = self.rest();
        let mut limit = 40.min(rest.len());
        while !rest.is_char_boundary(limit) {
            limit += 1;
        }
        f.debug_struct("Scanner")
            .field("offset", &self.offset)
            .field("line_start", &self.line_start)
            .field("rest", &&rest[..limit])
            .finish()
    }
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner over the given source.
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            line_start: true,
        }
    }

    /// The full source string.
    #[must_use]
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// The current byte offset.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The unconsumed remainder of the source.
    #[must_use]
    pub fn rest(&self) -> &'a str {
        &self.source[self.offset..]
    }

    /// Returns true if the entire source has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offset >= self.source.len()
    }

    /// Returns true if only horizontal whitespace has been consumed on the
    /// current line.
    #[must_use]
    pub fn is_line_start(&self) -> bool {
        self.line_start
    }

    /// The next character, without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Returns true if the unconsumed input begins with `pattern`.
    #[must_use]
    pub fn starts_with(&self, pattern: &str) -> bool {
        self.rest().starts_with(pattern)
    }

    /// Like [`Self::starts_with`], ignoring case. `pattern` must be ASCII.
    #[must_use]
    pub fn starts_with_ignore_case(&self, pattern: &str) -> bool {
        self.rest().get(..pattern.len()).is_some_and(|prefix| {
            unicase::UniCase::new(prefix) == unicase::UniCase::new(pattern)
        })
    }

    /// Consumes and returns the next character.
    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        self.note(c);
        Some(c)
    }

    /// Consumes `pattern` if the input begins with it.
    pub fn eat(&mut self, pattern: &str) -> bool {
        if self.starts_with(pattern) {
            self.advance(pattern.len());
            true
        } else {
            false
        }
    }

    /// Like [`Self::eat`], ignoring case. `pattern` must be ASCII.
    pub fn eat_ignore_case(&mut self, pattern: &str) -> bool {
        if self.starts_with_ignore_case(pattern) {
            self.advance(pattern.len());
            true
        } else {
            false
        }
    }

    /// The length of the run of `c` at the current position.
    #[must_use]
    pub fn run_len(&self, c: char) -> usize {
        self.rest().chars().take_while(|&next| next == c).count()
    }

    /// Consumes `count` repetitions of `c`, which must be present.
    pub fn eat_run(&mut self, c: char, count: usize) {
        debug_assert!(self.run_len(c) >= count);
        self.advance(c.len_utf8() * count);
    }

    /// Consumes characters while `pred` holds, returning the consumed text.
    pub fn bump_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|&(_, c)| !pred(c))
            .map_or(rest.len(), |(at, _)| at);
        self.advance(len);
        &rest[..len]
    }

    /// Consumes horizontal whitespace, returning true if any was consumed.
    pub fn skip_hspace(&mut self) -> bool {
        !self.bump_while(|c| c == ' ' || c == '\t').is_empty()
    }

    /// Consumes all whitespace, including line breaks.
    pub fn skip_whitespace(&mut self) {
        self.bump_while(char::is_whitespace);
    }

    /// Consumes and returns the run of literal text up to the next byte in
    /// `stops`, which may be empty.
    pub(crate) fn literal_run(&mut self, stops: &ByteSet) -> &'a str {
        let rest = self.rest();
        let len = rest
            .bytes()
            .position(|b| stops.contains(b))
            .unwrap_or(rest.len());
        self.advance(len);
        &rest[..len]
    }

    /// Saves the current position.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            offset: self.offset,
            line_start: self.line_start,
        }
    }

    /// Restores a previously saved position.
    pub fn rewind(&mut self, checkpoint: Checkpoint) {
        self.offset = checkpoint.offset;
        self.line_start = checkpoint.line_start;
    }

    /// Consumes `</name>` at the current position, tolerating interior
    /// whitespace and ignoring the case of `name`. Returns false, consuming
    /// nothing, if the input does not begin with a matching close tag.
    pub fn eat_close_tag(&mut self, name: &str) -> bool {
        let mut probe = *self;
        if !probe.eat("</") {
            return false;
        }
        probe.skip_whitespace();
        if !probe.eat_ignore_case(name) {
            return false;
        }
        probe.skip_whitespace();
        if !probe.eat(">") {
            return false;
        }
        *self = probe;
        true
    }

    /// Like [`Self::eat_close_tag`], without consuming.
    #[must_use]
    pub fn peek_close_tag(&self, name: &str) -> bool {
        let mut probe = *self;
        probe.eat_close_tag(name)
    }

    /// Searches forward for `</name>`. On success returns the offset where
    /// the close tag begins and a scanner positioned after it.
    pub(crate) fn find_close_tag(&self, name: &str) -> Option<(usize, Scanner<'a>)> {
        let mut from = self.offset;
        loop {
            let at = from + memchr::memchr(b'<', self.source[from..].as_bytes())?;
            let mut probe = Scanner {
                source: self.source,
                offset: at,
                line_start: false,
            };
            if probe.eat_close_tag(name) {
                return Some((at, probe));
            }
            from = at + 1;
        }
    }

    /// Advances by `len` bytes, which must end on a character boundary.
    fn advance(&mut self, len: usize) {
        let run = &self.source[self.offset..self.offset + len];
        for c in run.chars() {
            self.note(c);
        }
        self.offset += len;
    }

    /// Updates line start tracking for a consumed character.
    fn note(&mut self, c: char) {
        if c == '\n' {
            self.line_start = true;
        } else {
            self.line_start = self.line_start && c.is_whitespace();
        }
    }
}
