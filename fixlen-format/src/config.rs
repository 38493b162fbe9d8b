use std::collections::HashMap;
use std::io::{Read, Seek};

use crate::charset::{CharsetDescriptor, FixedLengthCharset};
use crate::error::{Error, Result};
use crate::line::LineRecordReader;
use crate::source::{BoundaryFetch, Partition};
use crate::stream::TranscodingStream;

pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;

const KEY_CHARSET: &str = "charset";
const KEY_BUFFER_CAPACITY: &str = "buffer_capacity";
const KEY_BOUNDARY_FETCH: &str = "boundary_fetch";

/// Everything needed to open streams over partitions of one input.
#[derive(Clone, Debug)]
pub struct TranscodeConfig {
    pub charset: FixedLengthCharset,
    pub buffer_capacity: usize,
    pub boundary_fetch: BoundaryFetch,
    pub options: HashMap<String, String>,
}

impl TranscodeConfig {
    pub fn new(charset: FixedLengthCharset) -> Self {
        Self {
            charset,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            boundary_fetch: BoundaryFetch::default(),
            options: HashMap::new(),
        }
    }

    /// Build a config from string options. `charset` is required;
    /// `buffer_capacity` and `boundary_fetch` fall back to their defaults.
    pub fn from_options<I, K, V>(options: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let options: HashMap<String, String> = options
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let charset = options
            .get(KEY_CHARSET)
            .ok_or_else(|| Error::config("missing required option 'charset'"))?
            .parse()?;

        let mut config = Self::new(charset);
        config.options = options;
        config.apply_options()?;
        Ok(config)
    }

    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.options.insert(key.into(), value.into());
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.options.get(key).and_then(|v| v.trim().parse().ok())
    }

    /// Copy the recognised keys of the option map into the typed fields.
    pub fn apply_options(&mut self) -> Result<()> {
        if let Some(charset) = self.get_str(KEY_CHARSET) {
            self.charset = charset.parse()?;
        }

        if let Some(raw) = self.get_str(KEY_BUFFER_CAPACITY) {
            let invalid = || Error::config(format!("invalid buffer capacity '{}'", raw));
            self.buffer_capacity = raw.trim().parse().map_err(|_| invalid())?;
        }

        if let Some(policy) = self.get_str(KEY_BOUNDARY_FETCH) {
            self.boundary_fetch = policy.parse()?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let width = self.charset.bytes_per_character();
        if self.buffer_capacity < width {
            return Err(Error::config(format!(
                "buffer capacity {} is smaller than one {} character ({} bytes)",
                self.buffer_capacity, self.charset, width
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn descriptor(&self) -> CharsetDescriptor {
        self.charset.descriptor()
    }

    /// Open a stream over `partition`, seeking `raw` to its start.
    pub fn open_stream<R>(&self, raw: R, partition: Partition) -> Result<TranscodingStream<R>>
    where
        R: Read + Seek,
    {
        self.validate()?;
        TranscodingStream::seekable(
            raw,
            &self.descriptor(),
            self.buffer_capacity,
            partition,
            self.boundary_fetch,
        )
    }

    pub fn open_lines<R>(&self, raw: R, partition: Partition) -> Result<LineRecordReader<R>>
    where
        R: Read + Seek,
    {
        self.open_stream(raw, partition).map(LineRecordReader::new)
    }

    /// Like [`open_stream`](TranscodeConfig::open_stream) for sources that
    /// cannot seek: everything before the partition start is read and dropped.
    pub fn open_stream_sequential<R: Read>(
        &self,
        raw: R,
        partition: Partition,
    ) -> Result<TranscodingStream<R>> {
        self.validate()?;
        TranscodingStream::with_partition(
            raw,
            &self.descriptor(),
            self.buffer_capacity,
            partition,
            self.boundary_fetch,
        )
    }

    pub fn open_lines_sequential<R: Read>(
        &self,
        raw: R,
        partition: Partition,
    ) -> Result<LineRecordReader<R>> {
        self.open_stream_sequential(raw, partition).map(LineRecordReader::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[test]
    fn defaults() {
        let config = TranscodeConfig::new(FixedLengthCharset::Utf16Le);
        assert_eq!(config.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
        assert_eq!(config.boundary_fetch, BoundaryFetch::Character);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn from_options() {
        let config = TranscodeConfig::from_options([
            ("charset", "utf-32le"),
            ("buffer_capacity", "64"),
            ("boundary_fetch", "buffer"),
            ("note", "kept"),
        ])
        .unwrap();

        assert_eq!(config.charset, FixedLengthCharset::Utf32Le);
        assert_eq!(config.buffer_capacity, 64);
        assert_eq!(config.boundary_fetch, BoundaryFetch::Buffer);
        assert_eq!(config.get_str("note"), Some("kept"));
        assert_eq!(config.get_usize("buffer_capacity"), Some(64));
    }

    #[test]
    fn bad_options() {
        assert!(matches!(
            TranscodeConfig::from_options([("buffer_capacity", "64")]),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            TranscodeConfig::from_options([("charset", "utf-8")]),
            Err(Error::UnknownCharset(_))
        ));
        assert!(
            TranscodeConfig::from_options([("charset", "latin1"), ("buffer_capacity", "lots")])
                .is_err()
        );
        assert!(
            TranscodeConfig::from_options([("charset", "latin1"), ("boundary_fetch", "line")])
                .is_err()
        );
    }

    #[test]
    fn set_option_then_apply() {
        let mut config = TranscodeConfig::new(FixedLengthCharset::Iso8859_1);
        config.set_option("charset", "UTF-16BE");
        config.set_option("buffer_capacity", "2");
        config.apply_options().unwrap();
        assert_eq!(config.charset, FixedLengthCharset::Utf16Be);
        assert!(config.validate().is_ok());

        config.buffer_capacity = 1;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(config
            .open_stream(Cursor::new(Vec::new()), Partition::unbounded())
            .is_err());
    }

    #[test]
    fn open_stream_and_lines() {
        let config = TranscodeConfig::new(FixedLengthCharset::Ibm037);
        // "HI\nOK\n" in EBCDIC
        let raw = vec![0xC8, 0xC9, 0x25, 0xD6, 0xD2, 0x25];

        let mut text = String::new();
        config
            .open_stream(Cursor::new(raw.clone()), Partition::unbounded())
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "HI\nOK\n");

        let lines: Vec<_> = config
            .open_lines(Cursor::new(raw), Partition::new(2, 6).unwrap())
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].offset, 3);
        assert_eq!(lines[0].text, "OK");
    }

    #[test]
    fn sequential_sources() {
        let config = TranscodeConfig::new(FixedLengthCharset::Ibm037);
        let raw: &[u8] = &[0xC8, 0xC9, 0x25, 0xD6, 0xD2, 0x25];

        let lines: Vec<_> = config
            .open_lines_sequential(raw, Partition::new(2, 6).unwrap())
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].offset, 3);
        assert_eq!(lines[0].text, "OK");

        let mut text = String::new();
        config
            .open_stream_sequential(raw.chain(raw), Partition::new(3, 12).unwrap())
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "OK\nHI\nOK\n");
    }
}
