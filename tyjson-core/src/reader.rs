//! Character sources feeding the driver.
//!
//! `CharSource` is the out-of-scope collaborator that supplies decoded
//! characters; `tyjson-core` ships two concrete implementations: `Utf8Reader`
//! over any `embedded_io::Read` byte source, doing incremental UTF-8
//! decoding one byte at a time, and `SliceReader` over an in-memory `&str`,
//! which the test suite uses almost everywhere since it needs no I/O error
//! type.

use crate::error::IoErrorKind;
use embedded_io::{Error, Read};

/// Supplies decoded `char`s one at a time to the driver.
pub trait CharSource {
    /// Returns the next character, or `None` at end of input.
    fn next_char(&mut self) -> Result<Option<char>, IoErrorKind>;
}

/// In-memory `CharSource` over a borrowed string. No I/O involved, so it
/// never fails.
pub struct SliceReader<'a> {
    chars: core::str::Chars<'a>,
}

impl<'a> SliceReader<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars(),
        }
    }
}

impl CharSource for SliceReader<'_> {
    fn next_char(&mut self) -> Result<Option<char>, IoErrorKind> {
        Ok(self.chars.next())
    }
}

/// Size of `Utf8Reader`'s internal staging buffer. One batched `read` call
/// fills this much at a time; bytes are then handed out one at a time to
/// the UTF-8 decode logic until it is drained and needs another refill.
const UTF8_READER_BUF_SIZE: usize = 256;

/// Incremental UTF-8 decoder over any `embedded_io::Read` byte source.
///
/// Refills its internal buffer with a single batched `read` call per
/// refill (mirroring a chunked reader's "one `read` per refill, not one
/// `read` per byte" contract), then hands bytes out of that buffer one at a
/// time to assemble a UTF-8 sequence, so a multi-byte character never needs
/// a big pre-sized buffer and a sequence can straddle two underlying reads
/// without extra bookkeeping at the call site.
pub struct Utf8Reader<R: Read> {
    inner: R,
    buf: [u8; UTF8_READER_BUF_SIZE],
    len: usize,
    pos: usize,
}

impl<R: Read> Utf8Reader<R> {
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: [0u8; UTF8_READER_BUF_SIZE],
            len: 0,
            pos: 0,
        }
    }

    /// Batched refill: one `read` call into the whole staging buffer,
    /// retrying only on `Interrupted`. `len == 0` after this means EOF.
    fn refill(&mut self) -> Result<(), IoErrorKind> {
        loop {
            return match self.inner.read(&mut self.buf) {
                Ok(n) => {
                    self.len = n;
                    self.pos = 0;
                    Ok(())
                }
                Err(e) if e.kind() == embedded_io::ErrorKind::Interrupted => continue,
                Err(_) => Err(IoErrorKind::Other("reader failed")),
            };
        }
    }

    fn read_one_byte(&mut self) -> Result<Option<u8>, IoErrorKind> {
        if self.pos >= self.len {
            self.refill()?;
            if self.len == 0 {
                return Ok(None);
            }
        }
        let byte = self.buf[self.pos];
        self.pos += 1;
        Ok(Some(byte))
    }

    fn utf8_len(lead: u8) -> usize {
        if lead & 0x80 == 0 {
            1
        } else if lead & 0xE0 == 0xC0 {
            2
        } else if lead & 0xF0 == 0xE0 {
            3
        } else if lead & 0xF8 == 0xF0 {
            4
        } else {
            0
        }
    }
}

impl<R: Read> CharSource for Utf8Reader<R> {
    fn next_char(&mut self) -> Result<Option<char>, IoErrorKind> {
        let Some(lead) = self.read_one_byte()? else {
            return Ok(None);
        };
        let len = Self::utf8_len(lead);
        if len == 0 {
            return Err(IoErrorKind::InvalidUtf8);
        }
        let mut buf = [0u8; 4];
        buf[0] = lead;
        for slot in buf.iter_mut().take(len).skip(1) {
            match self.read_one_byte()? {
                Some(b) => *slot = b,
                None => return Err(IoErrorKind::UnexpectedEof),
            }
        }
        core::str::from_utf8(&buf[..len])
            .map(|s| s.chars().next())
            .map_err(|_| IoErrorKind::InvalidUtf8)
    }
}

/// Fixed-capacity chunk staging area between a `CharSource` and the driver's
/// per-character dispatch loop. Distinct from the lexeme buffer (`C1`): this
/// buffer never survives past its own refill, while the lexeme buffer
/// accumulates exactly the characters of the token currently being
/// recognized, which may span many refills.
pub struct ChunkBuffer {
    chars: Vec<char>,
    pos: usize,
}

impl ChunkBuffer {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            chars: Vec::with_capacity(capacity),
            pos: 0,
        }
    }

    /// Returns the next character, refilling from `source` in chunks of up
    /// to `capacity` when the buffer is drained.
    pub fn next_char<S: CharSource>(
        &mut self,
        source: &mut S,
        capacity: usize,
    ) -> Result<Option<char>, IoErrorKind> {
        if self.pos >= self.chars.len() {
            self.refill(source, capacity)?;
            if self.chars.is_empty() {
                return Ok(None);
            }
        }
        let ch = self.chars[self.pos];
        self.pos += 1;
        Ok(Some(ch))
    }

    fn refill<S: CharSource>(&mut self, source: &mut S, capacity: usize) -> Result<(), IoErrorKind> {
        self.chars.clear();
        self.pos = 0;
        for _ in 0..capacity {
            match source.next_char()? {
                Some(ch) => self.chars.push(ch),
                None => break,
            }
        }
        Ok(())
    }
}
