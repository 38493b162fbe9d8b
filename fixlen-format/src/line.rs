//! Line records on top of a [`TranscodingStream`].
//!
//! A partition owns every line that starts at or before its end offset,
//! except the line it starts in the middle of (or exactly at), which belongs
//! to the previous partition. Reading adjacent partitions independently
//! therefore yields every line of the input exactly once.

use std::io::{self, Read};

use crate::error::{Error, Result};
use crate::stream::TranscodingStream;

const READ_CHUNK: usize = 4096;

/// One decoded line, without its terminator.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LineRecord {
    /// Offset of the first byte of the line in the raw input.
    pub offset: u64,
    pub text: String,
}

pub struct LineRecordReader<R> {
    stream: TranscodingStream<R>,
    pending: Vec<u8>,
    head: usize,
    chunk: Box<[u8]>,
    end: u64,
    /// Characters returned or skipped so far, counted from the partition start.
    chars_consumed: u64,
    skip_first: bool,
    done: bool,
}

/// Number of characters in valid UTF-8.
#[inline]
fn char_count(utf8: &[u8]) -> u64 {
    utf8.iter().filter(|&&b| (b & 0xC0) != 0x80).count() as u64
}

impl<R: Read> LineRecordReader<R> {
    /// Wrap a stream that has not been read from yet.
    pub fn new(stream: TranscodingStream<R>) -> Self {
        let partition = stream.partition();

        LineRecordReader {
            stream,
            pending: Vec::new(),
            head: 0,
            chunk: vec![0u8; READ_CHUNK].into_boxed_slice(),
            end: partition.end(),
            chars_consumed: 0,
            skip_first: partition.start() != 0,
            done: false,
        }
    }

    /// Next raw line including its `\n`, or whatever is left at end of source.
    fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        let mut scan = self.head;

        loop {
            if let Some(i) = memchr::memchr(b'\n', &self.pending[scan..]) {
                let newline = scan + i;
                let line = self.pending[self.head..=newline].to_vec();
                self.head = newline + 1;
                return Ok(Some(line));
            }

            if self.head > 0 {
                self.pending.drain(..self.head);
                self.head = 0;
            }
            scan = self.pending.len();

            let n = self.stream.read_decoded(&mut self.chunk)?;
            if n == 0 {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(std::mem::take(&mut self.pending)));
            }
            self.pending.extend_from_slice(&self.chunk[..n]);
        }
    }

    /// The next line owned by this partition, or `None` once the partition
    /// (or the input) is done.
    pub fn next_record(&mut self) -> Result<Option<LineRecord>> {
        if self.done {
            return Ok(None);
        }

        if self.skip_first {
            self.skip_first = false;
            match self.read_line()? {
                Some(line) => {
                    self.chars_consumed += char_count(&line);
                    tracing::trace!(
                        bytes = line.len(),
                        position = self.stream.position(),
                        "skipped line owned by previous partition"
                    );
                }
                None => {
                    self.done = true;
                    return Ok(None);
                }
            }
        }

        if self.stream.position() > self.end {
            tracing::trace!(
                position = self.stream.position(),
                end = self.end,
                "stopping past partition end"
            );
            self.done = true;
            return Ok(None);
        }

        let width = self.stream.charset().bytes_per_character() as u64;
        let offset = self.stream.partition().start() + self.chars_consumed * width;

        let mut line = match self.read_line()? {
            Some(line) => line,
            None => {
                self.done = true;
                return Ok(None);
            }
        };
        self.chars_consumed += char_count(&line);

        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }

        let text = String::from_utf8(line)
            .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        Ok(Some(LineRecord { offset, text }))
    }

    /// Fraction of the partition read so far, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        let partition = self.stream.partition();
        if partition.is_empty() {
            return 0.0;
        }

        let read = self.stream.position().saturating_sub(partition.start());
        (read as f64 / partition.len() as f64).min(1.0) as f32
    }

    #[inline(always)]
    pub fn position(&self) -> u64 {
        self.stream.position()
    }

    #[inline(always)]
    pub fn stream(&self) -> &TranscodingStream<R> {
        &self.stream
    }

    pub fn close(self) -> Result<()> {
        self.stream.close()
    }
}

impl<R: Read> Iterator for LineRecordReader<R> {
    type Item = Result<LineRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(record) => record.map(Ok),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
