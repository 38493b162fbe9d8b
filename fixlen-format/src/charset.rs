//! Fixed-length charsets and the descriptors used to decode them.
//!
//! A [`CharsetDescriptor`] is the only thing the transcoding layers look at:
//! a character width plus a total function turning exactly that many bytes
//! into one `char`. [`FixedLengthCharset`] is the registry of charsets known
//! by name.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use encoding_rs::Encoding;

use crate::error::{Error, Result};

mod ebcdic;

/// Decodes one character's worth of bytes. Must be total: undecodable input
/// maps to U+FFFD rather than failing.
pub type DecodeFn = dyn Fn(&[u8]) -> char + Send + Sync;

/// Immutable description of a fixed-length charset.
///
/// Cloning is cheap and a descriptor can be shared between any number of
/// streams on any number of threads.
#[derive(Clone)]
pub struct CharsetDescriptor {
    name: Cow<'static, str>,
    bytes_per_character: usize,
    decode: Arc<DecodeFn>,
}

impl CharsetDescriptor {
    /// Create a descriptor for a custom charset. Fails with
    /// [`Error::InvalidConfiguration`] if `bytes_per_character` is zero.
    pub fn new<N, F>(name: N, bytes_per_character: usize, decode: F) -> Result<Self>
    where
        N: Into<Cow<'static, str>>,
        F: Fn(&[u8]) -> char + Send + Sync + 'static,
    {
        if bytes_per_character < 1 {
            return Err(Error::config("bytes per character must be at least 1"));
        }

        Ok(Self::from_parts(name, bytes_per_character, decode))
    }

    fn from_parts<N, F>(name: N, bytes_per_character: usize, decode: F) -> Self
    where
        N: Into<Cow<'static, str>>,
        F: Fn(&[u8]) -> char + Send + Sync + 'static,
    {
        CharsetDescriptor {
            name: name.into(),
            bytes_per_character,
            decode: Arc::new(decode),
        }
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn bytes_per_character(&self) -> usize {
        self.bytes_per_character
    }

    /// Decode exactly `bytes_per_character` bytes into one character.
    #[inline]
    pub fn decode(&self, bytes: &[u8]) -> char {
        debug_assert_eq!(bytes.len(), self.bytes_per_character);
        (self.decode)(bytes)
    }
}

impl fmt::Debug for CharsetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharsetDescriptor")
            .field("name", &self.name)
            .field("bytes_per_character", &self.bytes_per_character)
            .finish_non_exhaustive()
    }
}

#[inline(always)]
fn scalar(value: u32) -> char {
    char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn utf32_be(b: &[u8]) -> char {
    scalar(BigEndian::read_u32(b))
}

fn utf32_le(b: &[u8]) -> char {
    scalar(LittleEndian::read_u32(b))
}

/// Surrogate halves are not scalars and come out as U+FFFD.
fn utf16_be(b: &[u8]) -> char {
    scalar(u32::from(BigEndian::read_u16(b)))
}

fn utf16_le(b: &[u8]) -> char {
    scalar(u32::from(LittleEndian::read_u16(b)))
}

fn ibm037(b: &[u8]) -> char {
    char::from(ebcdic::IBM037[b[0] as usize])
}

fn single_byte_table(encoding: &'static Encoding) -> [char; 256] {
    let mut table = [char::REPLACEMENT_CHARACTER; 256];
    for (byte, slot) in (0..=u8::MAX).zip(table.iter_mut()) {
        let bytes = [byte];
        let (decoded, _) = encoding.decode_without_bom_handling(&bytes);
        if let Some(c) = decoded.chars().next() {
            *slot = c;
        }
    }
    table
}

/// Charsets known by name.
#[derive(Clone, Copy, Eq, PartialEq)]
pub enum FixedLengthCharset {
    Utf32Be,
    Utf32Le,
    /// Basic Multilingual Plane only; surrogate code units decode to U+FFFD.
    Utf16Be,
    /// Basic Multilingual Plane only; surrogate code units decode to U+FFFD.
    Utf16Le,
    Iso8859_1,
    Ibm037,
    /// Any other single-byte encoding known to `encoding_rs`.
    SingleByte(&'static Encoding),
}

impl FixedLengthCharset {
    pub const fn available_variants() -> &'static [&'static str] {
        &[
            "UTF-32BE",
            "UTF-32LE",
            "UTF-16BE",
            "UTF-16LE",
            "ISO-8859-1",
            "IBM037",
        ]
    }

    pub const fn builtin() -> &'static [FixedLengthCharset] {
        use FixedLengthCharset::*;

        &[Utf32Be, Utf32Le, Utf16Be, Utf16Le, Iso8859_1, Ibm037]
    }

    /// Look up a charset by label, case-insensitively.
    ///
    /// Built-in names and aliases are tried first, then any WHATWG label
    /// naming a single-byte encoding.
    pub fn for_name(label: &str) -> Result<Self> {
        use FixedLengthCharset::*;

        let trimmed = label.trim();
        let builtin = match trimmed.to_ascii_lowercase().as_str() {
            "utf-32" | "utf-32be" | "utf32" | "utf32be" => Some(Utf32Be),
            "utf-32le" | "utf32le" => Some(Utf32Le),
            "utf-16" | "utf-16be" | "utf16" | "utf16be" | "ucs-2" | "ucs2" => Some(Utf16Be),
            "utf-16le" | "utf16le" => Some(Utf16Le),
            // encoding_rs resolves these to windows-1252, which differs in 0x80..=0x9F.
            "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "l1" => Some(Iso8859_1),
            "ibm037" | "ibm-037" | "cp037" | "ebcdic-cp-us" => Some(Ibm037),
            _ => None,
        };

        if let Some(charset) = builtin {
            return Ok(charset);
        }

        match Encoding::for_label(trimmed.as_bytes()) {
            Some(encoding) if encoding.is_single_byte() => Ok(SingleByte(encoding)),
            _ => Err(Error::UnknownCharset(label.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        use FixedLengthCharset::*;

        match self {
            Utf32Be => "UTF-32BE",
            Utf32Le => "UTF-32LE",
            Utf16Be => "UTF-16BE",
            Utf16Le => "UTF-16LE",
            Iso8859_1 => "ISO-8859-1",
            Ibm037 => "IBM037",
            SingleByte(encoding) => encoding.name(),
        }
    }

    pub const fn bytes_per_character(&self) -> usize {
        use FixedLengthCharset::*;

        match self {
            Utf32Be | Utf32Le => 4,
            Utf16Be | Utf16Le => 2,
            Iso8859_1 | Ibm037 | SingleByte(_) => 1,
        }
    }

    pub fn descriptor(&self) -> CharsetDescriptor {
        use FixedLengthCharset::*;

        let name = self.name();
        let width = self.bytes_per_character();

        match *self {
            Utf32Be => CharsetDescriptor::from_parts(name, width, utf32_be),
            Utf32Le => CharsetDescriptor::from_parts(name, width, utf32_le),
            Utf16Be => CharsetDescriptor::from_parts(name, width, utf16_be),
            Utf16Le => CharsetDescriptor::from_parts(name, width, utf16_le),
            Iso8859_1 => CharsetDescriptor::from_parts(name, width, |b| char::from(b[0])),
            Ibm037 => CharsetDescriptor::from_parts(name, width, ibm037),
            SingleByte(encoding) => {
                let table = single_byte_table(encoding);
                CharsetDescriptor::from_parts(name, width, move |b| table[b[0] as usize])
            }
        }
    }
}

impl FromStr for FixedLengthCharset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FixedLengthCharset::for_name(s)
    }
}

impl fmt::Display for FixedLengthCharset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Debug for FixedLengthCharset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<FixedLengthCharset> for CharsetDescriptor {
    fn from(charset: FixedLengthCharset) -> Self {
        charset.descriptor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(charset: FixedLengthCharset, bytes: &[u8]) -> String {
        let descriptor = charset.descriptor();
        bytes
            .chunks(descriptor.bytes_per_character())
            .map(|c| descriptor.decode(c))
            .collect()
    }

    #[test]
    fn rejects_zero_width() {
        let err = CharsetDescriptor::new("broken", 0, |_| 'x').unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn custom_descriptor() {
        let descriptor = CharsetDescriptor::new("upper", 3, |b| char::from(b[2])).unwrap();
        assert_eq!(descriptor.name(), "upper");
        assert_eq!(descriptor.bytes_per_character(), 3);
        assert_eq!(descriptor.decode(b"\0\0z"), 'z');
    }

    #[test]
    fn lookup_aliases() {
        use FixedLengthCharset::*;

        assert_eq!(FixedLengthCharset::for_name("UTF-32").unwrap(), Utf32Be);
        assert_eq!(FixedLengthCharset::for_name(" utf-32le ").unwrap(), Utf32Le);
        assert_eq!(FixedLengthCharset::for_name("UCS-2").unwrap(), Utf16Be);
        assert_eq!(FixedLengthCharset::for_name("Latin1").unwrap(), Iso8859_1);
        assert_eq!("cp037".parse::<FixedLengthCharset>().unwrap(), Ibm037);
        assert_eq!(
            FixedLengthCharset::for_name("cp1252").unwrap(),
            SingleByte(encoding_rs::WINDOWS_1252)
        );
    }

    #[test]
    fn lookup_rejects_variable_width() {
        for label in ["utf-8", "shift_jis", "gb18030", "no-such-charset"] {
            let err = FixedLengthCharset::for_name(label).unwrap_err();
            assert!(matches!(err, Error::UnknownCharset(ref l) if l == label));
        }
    }

    #[test]
    fn names_round_trip() {
        for charset in FixedLengthCharset::builtin() {
            let parsed: FixedLengthCharset = charset.to_string().parse().unwrap();
            assert_eq!(&parsed, charset);
        }
        assert_eq!(
            FixedLengthCharset::available_variants().len(),
            FixedLengthCharset::builtin().len()
        );
    }

    #[test]
    fn utf32() {
        use FixedLengthCharset::*;

        let grinning = [0, 0, 0, b'a', 0, 1, 0xF6, 0x00];
        assert_eq!(decode_all(Utf32Be, &grinning), "a\u{1F600}");
        assert_eq!(decode_all(Utf32Le, &[b'a', 0, 0, 0, 0xE9, 0, 0, 0]), "aé");
        // Above U+10FFFF
        assert_eq!(decode_all(Utf32Be, &[0, 0x11, 0, 0]), "\u{FFFD}");
    }

    #[test]
    fn utf16_bmp_only() {
        use FixedLengthCharset::*;

        assert_eq!(decode_all(Utf16Le, &[b'h', 0, 0xAC, 0x20]), "h€");
        assert_eq!(decode_all(Utf16Be, &[0, b'h', 0x20, 0xAC]), "h€");
        assert_eq!(
            decode_all(Utf16Be, &[0xD8, 0x3D, 0xDE, 0x00]),
            "\u{FFFD}\u{FFFD}"
        );
    }

    #[test]
    fn latin1_is_not_windows_1252() {
        use FixedLengthCharset::*;

        assert_eq!(decode_all(Iso8859_1, &[0x80, 0xE9]), "\u{80}é");
        let cp1252 = FixedLengthCharset::for_name("windows-1252").unwrap();
        assert_eq!(decode_all(cp1252, &[0x80, 0xE9]), "€é");
    }

    #[test]
    fn ebcdic() {
        let hello = [0xC8, 0xC5, 0xD3, 0xD3, 0xD6, 0x25];
        assert_eq!(decode_all(FixedLengthCharset::Ibm037, &hello), "HELLO\n");
    }

    #[test]
    fn single_byte_table_from_encoding_rs() {
        let koi8 = FixedLengthCharset::for_name("koi8-r").unwrap();
        assert_eq!(koi8.bytes_per_character(), 1);
        assert_eq!(koi8.name(), "KOI8-R");
        assert_eq!(decode_all(koi8, &[0xC1, b'z']), "аz");
    }
}
