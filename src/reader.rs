//! Decodes the input into a stream of validated Unicode code points.
//!
//! Three kinds of sources are accepted: already decoded text, raw bytes and anything
//! implementing [`std::io::Read`]. Bytes are sniffed for a BOM (UTF-8, UTF-16LE, UTF-16BE,
//! defaulting to UTF-8) and decoded incrementally with `encoding_rs`, so a byte slice and a
//! file handle with the same content produce the exact same characters and errors.

use std::io::Read;
use std::str::Chars;

use arraydeque::ArrayDeque;
use encoding_rs::{Decoder, DecoderResult, Encoding, UTF_8};

use crate::char_traits::{is_bom, is_printable};
use crate::error::ReaderError;

/// The number of characters the scanner may look ahead of the current position.
pub(crate) const BUFFER_LEN: usize = 16;

/// Size of the chunks read from byte sources.
const CHUNK_LEN: usize = 8192;

/// A location in a yaml document.
#[derive(Clone, Copy, PartialEq, Debug, Eq, Default, Hash, PartialOrd, Ord)]
pub struct Marker {
    index: usize,
    line: usize,
    col: usize,
}

impl Marker {
    #[must_use]
    pub fn new(index: usize, line: usize, col: usize) -> Marker {
        Marker { index, line, col }
    }

    /// Return the index (in characters) of the marker in the source.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Return the line of the marker in the source (1-based).
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Return the column of the marker in the source (0-based).
    #[must_use]
    pub fn col(&self) -> usize {
        self.col
    }
}

enum Source<'a> {
    Text(Chars<'a>),
    Bytes {
        input: Box<dyn Read + 'a>,
        decoder: Option<Decoder>,
        raw: Vec<u8>,
        /// Bytes of `raw` already handed to the decoder.
        raw_pos: usize,
        /// Bytes consumed from `input` before `raw`.
        raw_base: usize,
        decoded: String,
        decoded_pos: usize,
        input_done: bool,
        /// Byte offset of a malformed sequence, reported once the text before it is consumed.
        malformed_at: Option<usize>,
    },
}

/// A pull-based stream of code points with position tracking.
pub struct Reader<'a> {
    source: Source<'a>,
    buffer: ArrayDeque<char, BUFFER_LEN>,
    mark: Marker,
    /// Index of the next character to enter `buffer`.
    read_index: usize,
    eof: bool,
    encoding: &'static Encoding,
    started: bool,
}

impl<'a> Reader<'a> {
    /// Reads from already decoded text.
    #[must_use]
    pub fn from_str(text: &'a str) -> Reader<'a> {
        Reader::new(Source::Text(text.chars()))
    }

    /// Reads from raw bytes, auto-detecting the encoding.
    #[must_use]
    pub fn from_bytes(bytes: &'a [u8]) -> Reader<'a> {
        Reader::from_read(bytes)
    }

    /// Reads from a byte stream, auto-detecting the encoding.
    pub fn from_read<R: Read + 'a>(input: R) -> Reader<'a> {
        Reader::new(Source::Bytes {
            input: Box::new(input),
            decoder: None,
            raw: Vec::new(),
            raw_pos: 0,
            raw_base: 0,
            decoded: String::new(),
            decoded_pos: 0,
            input_done: false,
            malformed_at: None,
        })
    }

    fn new(source: Source<'a>) -> Reader<'a> {
        Reader {
            source,
            buffer: ArrayDeque::new(),
            mark: Marker::new(0, 1, 0),
            read_index: 0,
            eof: false,
            encoding: UTF_8,
            started: false,
        }
    }

    /// Name of the encoding the source is decoded with.
    #[must_use]
    pub fn encoding(&self) -> &'static str {
        self.encoding.name()
    }

    /// Current position.
    #[must_use]
    pub fn mark(&self) -> Marker {
        self.mark
    }

    /// Make sure `count` characters are available to [`Reader::peek`].
    ///
    /// Past the end of the input, `'\0'` is returned by `peek`.
    ///
    /// # Panics
    /// If `count` exceeds the lookahead capacity.
    pub fn lookahead(&mut self, count: usize) -> Result<(), ReaderError> {
        assert!(count <= BUFFER_LEN);
        while self.buffer.len() < count {
            let c = if self.eof {
                '\0'
            } else if let Some(c) = self.next_char()? {
                self.check_printable(c)?;
                c
            } else {
                self.eof = true;
                '\0'
            };
            self.read_index += 1;
            // Capacity is checked above.
            let _ = self.buffer.push_back(c);
        }
        Ok(())
    }

    /// Character `idx` positions ahead. [`Reader::lookahead`] must have been called with at
    /// least `idx + 1`.
    #[inline]
    #[must_use]
    pub fn peek(&self, idx: usize) -> char {
        self.buffer[idx]
    }

    /// Consume one character, updating the position.
    pub fn forward(&mut self) {
        let Some(c) = self.buffer.pop_front() else {
            return;
        };
        if c == '\0' && self.eof {
            return;
        }
        self.mark.index += 1;
        if c == '\n' {
            self.mark.line += 1;
            self.mark.col = 0;
        } else {
            self.mark.col += 1;
        }
    }

    /// Consume `n` characters.
    pub fn forward_n(&mut self, n: usize) {
        for _ in 0..n {
            self.forward();
        }
    }

    /// The next `n` characters, without consuming them.
    pub fn prefix(&mut self, n: usize) -> Result<String, ReaderError> {
        self.lookahead(n)?;
        Ok(self.buffer.iter().take(n).collect())
    }

    fn check_printable(&self, c: char) -> Result<(), ReaderError> {
        if is_printable(c) {
            return Ok(());
        }
        let offset = match &self.source {
            Source::Text(_) => self.read_index,
            // Exact for UTF-8, the end of the current chunk otherwise.
            Source::Bytes {
                raw_base,
                raw_pos,
                decoded,
                decoded_pos,
                ..
            } if self.encoding == UTF_8 => {
                raw_base + raw_pos - (decoded.len() - decoded_pos) - c.len_utf8()
            }
            Source::Bytes {
                raw_base, raw_pos, ..
            } => raw_base + raw_pos,
        };
        Err(ReaderError {
            mark: self.char_mark(),
            offset,
            encoding: self.encoding.name(),
            info: format!("special characters are not allowed: #x{:04x}", c as u32),
        })
    }

    /// Position of the character about to be pushed into the buffer.
    fn char_mark(&self) -> Marker {
        let mut mark = self.mark;
        for &c in &self.buffer {
            mark.index += 1;
            if c == '\n' {
                mark.line += 1;
                mark.col = 0;
            } else {
                mark.col += 1;
            }
        }
        mark
    }

    fn next_char(&mut self) -> Result<Option<char>, ReaderError> {
        let first = !self.started;
        self.started = true;
        let c = if let Source::Text(chars) = &mut self.source {
            chars.next()
        } else {
            self.next_decoded_char()?
        };
        // A leading byte order mark is not content.
        if first && c.map_or(false, is_bom) {
            return self.next_char();
        }
        Ok(c)
    }

    fn next_decoded_char(&mut self) -> Result<Option<char>, ReaderError> {
        loop {
            if let Source::Bytes {
                decoded,
                decoded_pos,
                ..
            } = &mut self.source
            {
                if let Some(c) = decoded[*decoded_pos..].chars().next() {
                    *decoded_pos += c.len_utf8();
                    return Ok(Some(c));
                }
            }
            if !self.fill()? {
                return Ok(None);
            }
        }
    }

    /// Decode another chunk. Returns `false` at the end of the input.
    fn fill(&mut self) -> Result<bool, ReaderError> {
        let mark = self.char_mark();
        let encoding_name = self.encoding.name();
        let Source::Bytes {
            input,
            decoder,
            raw,
            raw_pos,
            raw_base,
            decoded,
            decoded_pos,
            input_done,
            malformed_at,
        } = &mut self.source
        else {
            return Ok(false);
        };
        if let Some(offset) = *malformed_at {
            return Err(ReaderError {
                mark,
                offset,
                encoding: encoding_name,
                info: "invalid byte sequence for the stream encoding".to_owned(),
            });
        }
        decoded.clear();
        *decoded_pos = 0;

        if *raw_pos >= raw.len() {
            if *input_done {
                return Ok(false);
            }
            *raw_base += raw.len();
            raw.clear();
            *raw_pos = 0;
            raw.resize(CHUNK_LEN, 0);
            let n = loop {
                match input.read(&mut raw[..]) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        return Err(ReaderError {
                            mark,
                            offset: *raw_base,
                            encoding: encoding_name,
                            info: format!("error reading the input: {e}"),
                        })
                    }
                }
            };
            raw.truncate(n);
            *input_done = n == 0;
        }

        if decoder.is_none() {
            let (encoding, bom_len) = Encoding::for_bom(raw).unwrap_or((UTF_8, 0));
            log::debug!("decoding the input as {}", encoding.name());
            self.encoding = encoding;
            *raw_pos = bom_len;
            *decoder = Some(encoding.new_decoder_without_bom_handling());
        }
        let Some(dec) = decoder.as_mut() else {
            return Ok(false);
        };

        let chunk = &raw[*raw_pos..];
        let capacity = dec
            .max_utf8_buffer_length_without_replacement(chunk.len())
            .unwrap_or(CHUNK_LEN * 4);
        decoded.reserve(capacity.max(4));
        let (result, read) =
            dec.decode_to_string_without_replacement(chunk, decoded, *input_done);
        match result {
            DecoderResult::Malformed(bad, after) => {
                *malformed_at =
                    Some(*raw_base + *raw_pos + read - usize::from(bad) - usize::from(after));
                *raw_pos += read;
                // Hand out what was decoded before the bad sequence first.
                return Ok(true);
            }
            DecoderResult::InputEmpty | DecoderResult::OutputFull => {
                *raw_pos += read;
            }
        }
        if decoded.is_empty() && *input_done && *raw_pos >= raw.len() {
            return Ok(false);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn drain(mut reader: Reader) -> Result<String, ReaderError> {
        let mut out = String::new();
        loop {
            reader.lookahead(1)?;
            if reader.peek(0) == '\0' {
                return Ok(out);
            }
            out.push(reader.peek(0));
            reader.forward();
        }
    }

    #[test]
    fn test_utf16_bom() {
        let mut bytes = vec![0xff, 0xfe];
        for c in "a: b".encode_utf16() {
            bytes.extend_from_slice(&c.to_le_bytes());
        }
        let mut reader = Reader::from_bytes(&bytes);
        assert_eq!(drain(Reader::from_bytes(&bytes)).unwrap(), "a: b");
        reader.lookahead(1).unwrap();
        assert_eq!(reader.encoding(), "UTF-16LE");
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        assert_eq!(drain(Reader::from_str("\u{feff}x")).unwrap(), "x");
        assert_eq!(drain(Reader::from_bytes(b"\xef\xbb\xbfx")).unwrap(), "x");
    }

    #[test]
    fn test_control_character() {
        let err = drain(Reader::from_str("ab\x07")).unwrap_err();
        assert_eq!(err.mark.col(), 2);
        let err = drain(Reader::from_bytes(b"ab\x07")).unwrap_err();
        assert_eq!(err.mark.col(), 2);
    }

    #[test]
    fn test_invalid_utf8() {
        let err = drain(Reader::from_bytes(b"ab\xff")).unwrap_err();
        assert_eq!(err.offset, 2);
        assert_eq!(err.encoding, "UTF-8");
    }

    #[test]
    fn test_marks() {
        let mut reader = Reader::from_str("a\nb");
        reader.lookahead(3).unwrap();
        reader.forward_n(2);
        assert_eq!(reader.mark(), Marker::new(2, 2, 0));
    }
}
