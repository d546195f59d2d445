//! Incremental framing of newline-delimited JSON byte streams.
//!
//! Network chunk boundaries carry no meaning: a chunk may end in the
//! middle of a line, or in the middle of a multi-byte UTF-8 character.
//! [`Utf8Decoder`] carries incomplete characters across chunks and
//! [`LineFramer`] carries incomplete lines, so every complete line is
//! emitted exactly once, in order, no matter how the stream was split.
//!
//! ```text
//! chunk ─▶ Utf8Decoder ─▶ buffer += text ─▶ split '\n' ─▶ complete lines
//!                                              │
//!                                              └─ last fragment stays buffered
//! ```
//!
//! A fragment still buffered when the stream ends is discarded by
//! [`LineFramer::finish`]; it is never parsed.

/// Streaming UTF-8 decoder.
///
/// Bytes of a character split across chunks are held back until the
/// rest arrives. Invalid sequences decode to U+FFFD rather than failing.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning all text that is complete so far.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    // The prefix is valid UTF-8, so the lossy conversion never substitutes.
                    out.push_str(&String::from_utf8_lossy(&rest[..valid]));
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &rest[valid + len..];
                        }
                        None => {
                            // Incomplete sequence at the end: wait for more bytes.
                            rest = &rest[valid..];
                            break;
                        }
                    }
                }
            }
        }

        self.pending = rest.to_vec();
        out
    }

    /// Number of bytes held back waiting for the rest of a character.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Splits a decoded byte stream into complete `\n`-terminated lines.
#[derive(Debug, Default)]
pub struct LineFramer {
    decoder: Utf8Decoder,
    buffer: String,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the lines it completed, without their
    /// terminating newline. Blank lines are returned too; callers decide
    /// whether to skip them.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decoder.decode(chunk);
        self.buffer.push_str(&text);

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };

        let tail = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, tail);
        complete[..complete.len() - 1]
            .split('\n')
            .map(str::to_string)
            .collect()
    }

    /// Bytes of text currently buffered as an incomplete line.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() + self.decoder.pending_len()
    }

    /// End of stream. Returns the unterminated fragment (if any) so the
    /// caller can report it; the fragment is not a line and must not be
    /// parsed.
    pub fn finish(self) -> Option<String> {
        let mut fragment = self.buffer;
        if self.decoder.pending_len() > 0 {
            fragment.push(char::REPLACEMENT_CHARACTER);
        }
        if fragment.is_empty() {
            None
        } else {
            Some(fragment)
        }
    }
}
