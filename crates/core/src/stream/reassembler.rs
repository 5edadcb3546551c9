//! Line reassembly across transport chunks.

/// Turns arbitrarily split chunks into complete `\n`-terminated lines.
///
/// Holds back the unterminated tail of the most recent chunk (and, for
/// byte input, an incomplete trailing UTF-8 sequence) until more data
/// arrives or the stream ends.
#[derive(Debug, Default)]
pub struct LineReassembler {
    pending: String,
    partial_utf8: Vec<u8>,
}

impl LineReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text chunk and yield every line it completes.
    ///
    /// Lines are yielded without their terminating newline. Lines the caller
    /// does not pull before dropping the iterator stay buffered and are
    /// yielded by the next call.
    pub fn feed(&mut self, chunk: &str) -> Lines<'_> {
        self.pending.push_str(chunk);
        Lines {
            buffer: &mut self.pending,
            consumed: 0,
        }
    }

    /// Append a raw byte chunk and yield every line it completes.
    pub fn feed_bytes(&mut self, chunk: &[u8]) -> Lines<'_> {
        let mut bytes = std::mem::take(&mut self.partial_utf8);
        bytes.extend_from_slice(chunk);

        let mut text = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    text.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(bad) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[bad..];
                        }
                        None => {
                            // Sequence continues in the next chunk.
                            self.partial_utf8 = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        self.feed(&text)
    }

    /// End of stream: return the unterminated remainder, if any.
    pub fn flush(&mut self) -> Option<String> {
        if !self.partial_utf8.is_empty() {
            let tail = std::mem::take(&mut self.partial_utf8);
            self.pending.push_str(&String::from_utf8_lossy(&tail));
        }
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}

/// Complete lines produced by one [`LineReassembler::feed`] call.
pub struct Lines<'a> {
    buffer: &'a mut String,
    consumed: usize,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let rest = &self.buffer[self.consumed..];
        let newline = rest.find('\n')?;
        let line = rest[..newline].to_string();
        self.consumed += newline + 1;
        Some(line)
    }
}

impl Drop for Lines<'_> {
    fn drop(&mut self) {
        self.buffer.drain(..self.consumed);
    }
}
