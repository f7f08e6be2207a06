//! Escape sequence filtering for interpreter output
//!
//! The front-end does not emulate a terminal, but interpreters still emit the
//! odd color or title sequence. `EscapeFilter` drops those sequences while
//! keeping the printable text. It keeps state between batches because a
//! sequence can be split across two reads.

/// Upper bound on a buffered sequence before it is abandoned
const MAX_SEQUENCE_LEN: usize = 256;

#[derive(Debug, Clone, Default)]
pub struct EscapeFilter {
    /// Bytes of the sequence currently being skipped, starting with ESC
    sequence: String,
    in_escape: bool,
}

impl EscapeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a sequence is still open at the end of the last batch
    pub fn in_escape(&self) -> bool {
        self.in_escape
    }

    /// Return `text` with complete or partial escape sequences removed.
    pub fn filter(&mut self, text: &str) -> String {
        if !self.in_escape && !text.contains('\x1b') {
            return text.to_string();
        }

        let mut result = String::with_capacity(text.len());
        for ch in text.chars() {
            if self.in_escape {
                if ch == '\n' && self.sequence.starts_with("\x1b]") {
                    // Unterminated OSC; the line break still belongs to the output
                    self.reset();
                    result.push(ch);
                    continue;
                }
                self.sequence.push(ch);
                if self.sequence.len() > MAX_SEQUENCE_LEN {
                    tracing::debug!("Dropping escape sequence longer than {MAX_SEQUENCE_LEN} bytes");
                    self.reset();
                } else if self.is_sequence_complete() {
                    self.reset();
                }
            } else if ch == '\x1b' {
                self.in_escape = true;
                self.sequence.clear();
                self.sequence.push(ch);
            } else {
                result.push(ch);
            }
        }
        result
    }

    fn reset(&mut self) {
        self.sequence.clear();
        self.in_escape = false;
    }

    fn is_sequence_complete(&self) -> bool {
        let seq = self.sequence.as_str();
        if seq.len() < 2 {
            return false;
        }

        // CSI: ESC [ params final-byte
        if let Some(rest) = seq.strip_prefix("\x1b[") {
            return rest
                .chars()
                .last()
                .is_some_and(|c| ('\x40'..='\x7e').contains(&c));
        }

        // OSC: terminated by BEL or ST
        if seq.starts_with("\x1b]") {
            return seq.ends_with('\x07') || seq.ends_with("\x1b\\");
        }

        // Two-character sequences such as ESC c or ESC =
        seq.chars().count() == 2
    }
}
