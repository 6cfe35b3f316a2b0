//! Byte-level output sink for the [`presenter`](crate::presenter).
//!
//! Buffers the text the presenter produces and flushes it to the
//! underlying sink in one call, transcoding to the stream's configured
//! encoding (UTF-8/16LE/16BE/32LE/32BE) on the way out.

use crate::error::WriterError;
use crate::Encoding;

const OUTPUT_BUFFER_SIZE: usize = 16384;

/// Buffers presented text and flushes it to a byte sink, transcoding to the
/// configured [`Encoding`]. UTF-8 is passed through; the UTF-16 and UTF-32
/// variants go through `char`-by-`char` conversion.
pub struct Writer<'w> {
    sink: &'w mut dyn std::io::Write,
    encoding: Encoding,
    buffer: String,
    raw_buffer: Vec<u8>,
}

impl<'w> Writer<'w> {
    /// Create a writer over `sink` using `encoding`, which must be a
    /// concrete encoding (not [`Encoding::Any`]).
    pub fn new(sink: &'w mut dyn std::io::Write, encoding: Encoding) -> Self {
        assert_ne!(
            encoding,
            Encoding::Any,
            "writer requires a concrete output encoding"
        );
        Writer {
            sink,
            encoding,
            buffer: String::with_capacity(OUTPUT_BUFFER_SIZE),
            raw_buffer: Vec::with_capacity(OUTPUT_BUFFER_SIZE),
        }
    }

    /// The encoding this writer transcodes to.
    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub(crate) fn write_str(&mut self, s: &str) -> Result<(), WriterError> {
        self.buffer.push_str(s);
        if self.buffer.len() >= OUTPUT_BUFFER_SIZE {
            self.flush()?;
        }
        Ok(())
    }

    pub(crate) fn write_char(&mut self, ch: char) -> Result<(), WriterError> {
        self.buffer.push(ch);
        if self.buffer.len() >= OUTPUT_BUFFER_SIZE {
            self.flush()?;
        }
        Ok(())
    }

    /// Flush accumulated text to the underlying sink now, rather than
    /// waiting for the buffer to fill.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError::Io`] if the sink rejects the write.
    // TODO: support partial writes; this fails unless the sink accepts the
    // whole buffer in one call.
    pub fn flush(&mut self) -> Result<(), WriterError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        if self.encoding == Encoding::Utf8 {
            self.sink.write_all(self.buffer.as_bytes())?;
            self.buffer.clear();
            return Ok(());
        }

        let (big_endian, four_byte) = match self.encoding {
            Encoding::Utf16Le => (false, false),
            Encoding::Utf16Be => (true, false),
            Encoding::Utf32Le => (false, true),
            Encoding::Utf32Be => (true, true),
            Encoding::Utf8 | Encoding::Any => unreachable!("handled above"),
        };

        if four_byte {
            for ch in self.buffer.chars() {
                let bytes = if big_endian {
                    (ch as u32).to_be_bytes()
                } else {
                    (ch as u32).to_le_bytes()
                };
                self.raw_buffer.extend_from_slice(&bytes);
            }
        } else {
            for unit in self.buffer.encode_utf16() {
                let bytes = if big_endian {
                    unit.to_be_bytes()
                } else {
                    unit.to_le_bytes()
                };
                self.raw_buffer.extend_from_slice(&bytes);
            }
        }

        self.sink.write_all(&self.raw_buffer)?;
        self.buffer.clear();
        self.raw_buffer.clear();
        Ok(())
    }
}

impl Drop for Writer<'_> {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_passes_through() {
        let mut out = Vec::new();
        {
            let mut writer = Writer::new(&mut out, Encoding::Utf8);
            writer.write_str("hello").unwrap();
            writer.flush().unwrap();
        }
        assert_eq!(out, b"hello");
    }

    #[test]
    fn utf16_le_encodes_ascii_with_null_high_byte() {
        let mut out = Vec::new();
        {
            let mut writer = Writer::new(&mut out, Encoding::Utf16Le);
            writer.write_str("A").unwrap();
        }
        assert_eq!(out, vec![0x41, 0x00]);
    }

    #[test]
    fn utf32_be_encodes_one_code_point_as_four_bytes() {
        let mut out = Vec::new();
        {
            let mut writer = Writer::new(&mut out, Encoding::Utf32Be);
            writer.write_str("A").unwrap();
        }
        assert_eq!(out, vec![0x00, 0x00, 0x00, 0x41]);
    }

    #[test]
    fn flushes_pending_buffer_on_drop() {
        let mut out = Vec::new();
        {
            let mut writer = Writer::new(&mut out, Encoding::Utf8);
            writer.write_str("tail").unwrap();
        }
        assert_eq!(out, b"tail");
    }

    #[test]
    #[should_panic(expected = "concrete")]
    fn refuses_any_encoding() {
        let mut out = Vec::new();
        let _ = Writer::new(&mut out, Encoding::Any);
    }
}
