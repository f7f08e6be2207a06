//! Byte/text conversion at the process boundary
//!
//! The interpreter speaks a fixed encoding for the whole session: UTF-8 on
//! most systems, a single-byte OEM code page such as IBM866 for `cmd.exe`.
//! Decoding is streaming, so a multi-byte character split across two reads
//! still comes out whole.

use encoding_rs::{Decoder, Encoding, UTF_8};

use super::ansi::EscapeFilter;

/// Session encoder/decoder for interpreter I/O
pub struct StreamCodec {
    encoding: &'static Encoding,
    decoder: Decoder,
    escapes: EscapeFilter,
}

impl std::fmt::Debug for StreamCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCodec")
            .field("encoding", &self.encoding.name())
            .finish()
    }
}

impl StreamCodec {
    pub fn new(encoding: &'static Encoding) -> Self {
        Self {
            encoding,
            decoder: encoding.new_decoder_without_bom_handling(),
            escapes: EscapeFilter::new(),
        }
    }

    pub fn utf8() -> Self {
        Self::new(UTF_8)
    }

    /// Look up an encoding by WHATWG label ("utf-8", "ibm866", "cp866", ...).
    pub fn for_label(label: &str) -> Option<Self> {
        Encoding::for_label(label.trim().as_bytes()).map(Self::new)
    }

    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Decode one output batch into displayable text.
    ///
    /// Carriage returns, escape sequences and control characters other than
    /// line feed and tab are dropped.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let capacity = self
            .decoder
            .max_utf8_buffer_length(bytes.len())
            .unwrap_or(bytes.len().saturating_mul(3));
        let mut decoded = String::with_capacity(capacity);
        let (_, _, had_errors) = self.decoder.decode_to_string(bytes, &mut decoded, false);
        if had_errors {
            tracing::debug!(
                "Malformed {} sequence in process output",
                self.encoding.name()
            );
        }

        let decoded = self.escapes.filter(&decoded);
        decoded
            .chars()
            .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
            .collect()
    }

    /// Encode a submitted line for the interpreter's stdin.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let (bytes, _, had_unmappable) = self.encoding.encode(text);
        if had_unmappable {
            tracing::debug!(
                "Input contains characters not representable in {}",
                self.encoding.name()
            );
        }
        bytes.into_owned()
    }
}

/// Remove the interpreter's echo of the last submitted line from an output batch.
///
/// Returns the remainder when `data` starts with `echo`, where a line feed in
/// `echo` also matches a CR LF pair in `data`. Returns `None` when the batch
/// does not start with the echo.
pub fn strip_echo<'a>(data: &'a [u8], echo: &[u8]) -> Option<&'a [u8]> {
    let mut pos = 0;
    for &byte in echo {
        if byte == b'\n' && data.get(pos) == Some(&b'\r') {
            pos += 1;
        }
        if data.get(pos) != Some(&byte) {
            return None;
        }
        pos += 1;
    }
    Some(&data[pos..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_split_across_batches() {
        let mut codec = StreamCodec::utf8();
        let bytes = "naïve\n".as_bytes();
        // split inside the two-byte 'ï'
        let first = codec.decode(&bytes[..3]);
        let second = codec.decode(&bytes[3..]);
        assert_eq!(format!("{first}{second}"), "naïve\n");
    }

    #[test]
    fn test_ibm866_decoding() {
        let mut codec = StreamCodec::for_label("ibm866").unwrap();
        // 0x8F 0xE0 0xA8 0xA2 0xA5 0xE2 = "Привет" in code page 866
        let text = codec.decode(&[0x8F, 0xE0, 0xA8, 0xA2, 0xA5, 0xE2, b'\r', b'\n']);
        assert_eq!(text, "Привет\n");
        assert_eq!(codec.encoding_name(), "IBM866");
    }

    #[test]
    fn test_ibm866_encoding_round_trip() {
        let mut codec = StreamCodec::for_label("cp866").unwrap();
        let bytes = codec.encode("dir Привет");
        assert_eq!(bytes.len(), 10);
        assert_eq!(codec.decode(&bytes), "dir Привет");
    }

    #[test]
    fn test_unknown_label() {
        assert!(StreamCodec::for_label("klingon").is_none());
    }

    #[test]
    fn test_controls_and_escapes_dropped() {
        let mut codec = StreamCodec::utf8();
        assert_eq!(
            codec.decode(b"\x1b[32mok\x1b[0m\r\n\x07\tdone\n"),
            "ok\n\tdone\n"
        );
    }

    #[test]
    fn test_output_after_unterminated_title_is_kept() {
        let mut codec = StreamCodec::utf8();
        codec.decode(b"\x1b]0;title-with-no-terminator\n");
        let rest: String = (0..50)
            .map(|_| codec.decode(b"important output line\n"))
            .collect();
        assert_eq!(rest.len(), 50 * "important output line\n".len());
    }

    #[test]
    fn test_strip_echo_exact() {
        assert_eq!(strip_echo(b"dir\nvolume", b"dir\n"), Some(&b"volume"[..]));
    }

    #[test]
    fn test_strip_echo_crlf() {
        assert_eq!(
            strip_echo(b"dir\r\n Volume in drive C", b"dir\n"),
            Some(&b" Volume in drive C"[..])
        );
    }

    #[test]
    fn test_strip_echo_mismatch() {
        assert_eq!(strip_echo(b"Volume", b"dir\n"), None);
        assert_eq!(strip_echo(b"di", b"dir\n"), None);
    }

    #[test]
    fn test_strip_echo_whole_batch() {
        assert_eq!(strip_echo(b"ver\r\n", b"ver\n"), Some(&b""[..]));
    }
}
