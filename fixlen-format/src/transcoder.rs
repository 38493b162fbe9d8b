//! Buffer-to-buffer transcoding of fixed-length characters into UTF-8.
//!
//! The [`Decompressor`] trait is the needs-input / set-input / produce-output
//! protocol a streaming codec is driven by. [`FixedLengthTranscoder`] is its
//! implementation for fixed-length charsets: no I/O, only byte buffers.

use crate::charset::CharsetDescriptor;
use crate::error::{Error, Result};

/// Pull-driven codec protocol.
///
/// A driver calls [`set_input`](Decompressor::set_input) whenever
/// [`needs_input`](Decompressor::needs_input) is true and otherwise drains
/// output with [`decompress`](Decompressor::decompress).
pub trait Decompressor {
    /// True when no buffered input (or pending output) is left to produce from.
    fn needs_input(&self) -> bool;

    /// Supply more input. Fails with [`Error::InvalidState`] while previous
    /// input has not been fully consumed.
    fn set_input(&mut self, input: &[u8]) -> Result<()>;

    /// Write as much output as fits into `output`, returning the number of
    /// bytes produced. `0` means more input is needed.
    fn decompress(&mut self, output: &mut [u8]) -> Result<usize>;

    /// True once every byte supplied so far has been turned into output.
    fn finished(&self) -> bool;

    /// Total number of input bytes accepted so far.
    fn consumed_bytes(&self) -> u64;

    fn reset(&mut self);

    /// Release buffers. The decompressor refuses input afterwards until reset.
    fn end(&mut self);
}

/// Transcoder from a fixed-length charset into UTF-8.
///
/// Input bytes are counted as consumed as soon as they are accepted by
/// [`set_input`](Decompressor::set_input): the count tracks what has been
/// pulled from the source, which is what position reporting is based on.
/// A trailing fragment shorter than one character is held back and prefixed
/// onto the next input.
#[derive(Debug)]
pub struct FixedLengthTranscoder {
    charset: CharsetDescriptor,
    input: Vec<u8>,
    cursor: usize,
    spill: Spill,
    consumed: u64,
    ended: bool,
}

/// Encoded bytes of a character that did not fit into the caller's output.
#[derive(Debug, Default)]
struct Spill {
    bytes: [u8; 4],
    pos: usize,
    len: usize,
}

impl Spill {
    #[inline(always)]
    fn is_empty(&self) -> bool {
        self.pos == self.len
    }

    fn drain_into(&mut self, output: &mut [u8]) -> usize {
        let n = (self.len - self.pos).min(output.len());
        output[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
        self.pos += n;
        n
    }

    fn clear(&mut self) {
        self.pos = 0;
        self.len = 0;
    }
}

impl FixedLengthTranscoder {
    pub fn new(charset: CharsetDescriptor) -> Self {
        FixedLengthTranscoder {
            charset,
            input: Vec::new(),
            cursor: 0,
            spill: Spill::default(),
            consumed: 0,
            ended: false,
        }
    }

    #[inline(always)]
    pub fn charset(&self) -> &CharsetDescriptor {
        &self.charset
    }

    #[inline(always)]
    fn remaining(&self) -> usize {
        self.input.len() - self.cursor
    }

    /// Number of bytes held back because they do not form a whole character yet.
    pub fn pending_tail(&self) -> usize {
        let remaining = self.remaining();
        if remaining < self.charset.bytes_per_character() {
            remaining
        } else {
            0
        }
    }
}

impl Decompressor for FixedLengthTranscoder {
    #[inline]
    fn needs_input(&self) -> bool {
        self.spill.is_empty() && self.remaining() < self.charset.bytes_per_character()
    }

    fn set_input(&mut self, input: &[u8]) -> Result<()> {
        if self.ended {
            return Err(Error::InvalidState("input supplied after end()"));
        }

        if !self.needs_input() {
            return Err(Error::InvalidState(
                "input supplied while previous input is still pending",
            ));
        }

        // Keep the held-back tail in front of the new bytes.
        self.input.drain(..self.cursor);
        self.cursor = 0;
        self.input.extend_from_slice(input);
        self.consumed += input.len() as u64;

        Ok(())
    }

    fn decompress(&mut self, output: &mut [u8]) -> Result<usize> {
        if self.ended {
            return Err(Error::InvalidState("decompress called after end()"));
        }

        let width = self.charset.bytes_per_character();
        let mut written = self.spill.drain_into(output);

        while written < output.len() && self.remaining() >= width {
            let c = self
                .charset
                .decode(&self.input[self.cursor..self.cursor + width]);
            self.cursor += width;

            let mut encoded = [0u8; 4];
            let len = c.encode_utf8(&mut encoded).len();
            let room = output.len() - written;

            if len <= room {
                output[written..written + len].copy_from_slice(&encoded[..len]);
                written += len;
            } else {
                self.spill = Spill {
                    bytes: encoded,
                    pos: 0,
                    len,
                };
                written += self.spill.drain_into(&mut output[written..]);
            }
        }

        Ok(written)
    }

    fn finished(&self) -> bool {
        self.spill.is_empty() && self.remaining() == 0
    }

    #[inline(always)]
    fn consumed_bytes(&self) -> u64 {
        self.consumed
    }

    fn reset(&mut self) {
        self.input.clear();
        self.cursor = 0;
        self.spill.clear();
        self.consumed = 0;
        self.ended = false;
    }

    fn end(&mut self) {
        self.input = Vec::new();
        self.cursor = 0;
        self.spill.clear();
        self.ended = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::FixedLengthCharset;

    fn utf32(s: &str) -> Vec<u8> {
        s.chars().flat_map(|c| (c as u32).to_be_bytes()).collect()
    }

    fn transcoder(charset: FixedLengthCharset) -> FixedLengthTranscoder {
        FixedLengthTranscoder::new(charset.descriptor())
    }

    #[test]
    fn decodes_whole_input() {
        let mut t = transcoder(FixedLengthCharset::Utf32Be);
        assert!(t.needs_input());

        t.set_input(&utf32("héllo")).unwrap();
        assert!(!t.needs_input());
        assert_eq!(t.consumed_bytes(), 20);

        let mut out = [0u8; 32];
        let n = t.decompress(&mut out).unwrap();
        assert_eq!(&out[..n], "héllo".as_bytes());
        assert!(t.needs_input());
        assert!(t.finished());
        assert_eq!(t.decompress(&mut out).unwrap(), 0);
    }

    #[test]
    fn tail_is_carried_into_next_input() {
        let mut t = transcoder(FixedLengthCharset::Utf32Be);
        let bytes = utf32("abc");
        let mut out = [0u8; 8];

        t.set_input(&bytes[..6]).unwrap();
        assert_eq!(t.decompress(&mut out).unwrap(), 1);
        assert_eq!(out[0], b'a');
        assert_eq!(t.pending_tail(), 2);
        assert!(t.needs_input());
        assert!(!t.finished());

        t.set_input(&bytes[6..]).unwrap();
        let n = t.decompress(&mut out).unwrap();
        assert_eq!(&out[..n], b"bc");
        assert_eq!(t.pending_tail(), 0);
        assert_eq!(t.consumed_bytes(), 12);
    }

    #[test]
    fn input_shorter_than_a_character_produces_nothing() {
        let mut t = transcoder(FixedLengthCharset::Utf16Le);
        let mut out = [0u8; 4];

        t.set_input(&[b'x']).unwrap();
        assert_eq!(t.decompress(&mut out).unwrap(), 0);
        assert!(t.needs_input());
        assert_eq!(t.consumed_bytes(), 1);

        t.set_input(&[0]).unwrap();
        assert_eq!(t.decompress(&mut out).unwrap(), 1);
        assert_eq!(out[0], b'x');
    }

    #[test]
    fn rejects_input_while_pending() {
        let mut t = transcoder(FixedLengthCharset::Utf32Be);
        t.set_input(&utf32("ab")).unwrap();
        let err = t.set_input(&utf32("c")).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(t.consumed_bytes(), 8);
    }

    #[test]
    fn output_smaller_than_an_encoded_character() {
        let mut t = transcoder(FixedLengthCharset::Utf32Be);
        t.set_input(&utf32("€!")).unwrap();

        let mut collected = Vec::new();
        let mut out = [0u8; 1];
        loop {
            let n = t.decompress(&mut out).unwrap();
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&out[..n]);
        }

        assert_eq!(collected, "€!".as_bytes());
        assert!(t.finished());
    }

    #[test]
    fn spill_blocks_new_input() {
        let mut t = transcoder(FixedLengthCharset::Utf32Be);
        t.set_input(&utf32("€")).unwrap();

        let mut out = [0u8; 2];
        assert_eq!(t.decompress(&mut out).unwrap(), 2);
        assert!(!t.needs_input());
        assert!(t.set_input(&utf32("x")).is_err());
        assert_eq!(t.decompress(&mut out).unwrap(), 1);
        assert!(t.needs_input());
    }

    #[test]
    fn empty_output_region() {
        let mut t = transcoder(FixedLengthCharset::Iso8859_1);
        t.set_input(b"abc").unwrap();
        assert_eq!(t.decompress(&mut []).unwrap(), 0);
        assert!(!t.needs_input());
    }

    #[test]
    fn reset_and_end() {
        let mut t = transcoder(FixedLengthCharset::Utf16Be);
        t.set_input(&[0, b'a', 0]).unwrap();
        t.reset();
        assert_eq!(t.consumed_bytes(), 0);
        assert_eq!(t.pending_tail(), 0);
        assert!(t.needs_input());

        t.end();
        assert!(matches!(t.set_input(b"zz"), Err(Error::InvalidState(_))));
        assert!(matches!(
            t.decompress(&mut [0u8; 4]),
            Err(Error::InvalidState(_))
        ));

        t.reset();
        t.set_input(&[0, b'z']).unwrap();
        let mut out = [0u8; 1];
        assert_eq!(t.decompress(&mut out).unwrap(), 1);
        assert_eq!(out[0], b'z');
    }
}
