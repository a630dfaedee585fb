//! `C1`: growable lexeme accumulator, distinct from the chunk-sized reader
//! buffer in `reader::ChunkBuffer`.

/// Accumulates the decoded characters of the token currently being
/// recognized (a string, a number, or a bareword literal).
#[derive(Debug, Default)]
pub struct LexemeBuffer {
    chars: String,
}

impl LexemeBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            chars: String::with_capacity(32),
        }
    }

    pub fn append(&mut self, ch: char) {
        self.chars.push(ch);
    }

    /// Returns the accumulated lexeme and clears the buffer for the next
    /// token, keeping its allocated capacity.
    pub fn take(&mut self) -> String {
        core::mem::take(&mut self.chars)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.chars
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn clear(&mut self) {
        self.chars.clear();
    }
}
