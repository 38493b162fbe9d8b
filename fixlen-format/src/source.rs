//! Partition-aware buffered reads from the raw input.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::str::FromStr;

use crate::charset::CharsetDescriptor;
use crate::error::{Error, Result};

/// A `[start, end)` byte range of the raw input assigned to one worker.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Partition {
    start: u64,
    end: u64,
}

impl Partition {
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if start > end {
            return Err(Error::config(format!(
                "partition start {} is past its end {}",
                start, end
            )));
        }

        Ok(Partition { start, end })
    }

    /// The whole input, with no boundary to throttle against.
    pub const fn unbounded() -> Self {
        Partition {
            start: 0,
            end: u64::MAX,
        }
    }

    #[inline(always)]
    pub const fn start(&self) -> u64 {
        self.start
    }

    #[inline(always)]
    pub const fn end(&self) -> u64 {
        self.end
    }

    #[inline(always)]
    pub const fn len(&self) -> u64 {
        self.end - self.start
    }

    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.end == u64::MAX {
            write!(f, "[{}, ..)", self.start)
        } else {
            write!(f, "[{}, {})", self.start, self.end)
        }
    }
}

/// How much to fetch once less than one character is left before the
/// partition end. Neither policy stops the source: ending a partition is
/// the consumer's decision.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum BoundaryFetch {
    /// Fetch exactly one character's worth of bytes at a time.
    #[default]
    Character,
    /// Fetch a full buffer.
    Buffer,
}

impl BoundaryFetch {
    pub const fn available_variants() -> &'static [&'static str] {
        &["character", "buffer"]
    }
}

impl FromStr for BoundaryFetch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "character" | "char" => Ok(BoundaryFetch::Character),
            "buffer" => Ok(BoundaryFetch::Buffer),
            other => Err(Error::config(format!(
                "unknown boundary fetch policy '{}', expected one of {:?}",
                other,
                BoundaryFetch::available_variants()
            ))),
        }
    }
}

impl fmt::Display for BoundaryFetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryFetch::Character => write!(f, "character"),
            BoundaryFetch::Buffer => write!(f, "buffer"),
        }
    }
}

fn short_source(start: u64, available: u64) -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!(
            "cannot skip to partition start {}: source ends at {}",
            start, available
        ),
    ))
}

/// Advance `reader` by `n` bytes by reading them, failing if it ends first.
fn skip<R: Read>(reader: &mut R, n: u64) -> Result<()> {
    let skipped = io::copy(&mut reader.by_ref().take(n), &mut io::sink())?;
    if skipped < n {
        return Err(short_source(n, skipped));
    }
    Ok(())
}

/// Move `reader` `n` bytes forward without reading, failing if that is past
/// its end.
fn seek_forward<R: Seek>(reader: &mut R, n: u64) -> Result<()> {
    let here = reader.stream_position()?;
    let len = reader.seek(SeekFrom::End(0))?;
    let available = len.saturating_sub(here);

    if available < n {
        reader.seek(SeekFrom::Start(here))?;
        return Err(short_source(n, available));
    }

    reader.seek(SeekFrom::Start(here + n))?;
    Ok(())
}

fn check_capacity(charset: &CharsetDescriptor, capacity: usize) -> Result<()> {
    let width = charset.bytes_per_character();
    if capacity < width {
        return Err(Error::config(format!(
            "buffer capacity {} is smaller than one {} character ({} bytes)",
            capacity,
            charset.name(),
            width
        )));
    }
    Ok(())
}

/// Fills a bounded buffer from the raw input, sizing each read against the
/// partition end.
///
/// Reads are never allowed to cross the partition end in one go while more
/// than a character is left before it. Past that point every fetch still
/// returns data as long as the raw input has some; see [`BoundaryFetch`].
pub struct PartitionBoundedSource<R> {
    inner: R,
    buffer: Box<[u8]>,
    partition: Partition,
    bytes_per_character: usize,
    policy: BoundaryFetch,
    delivered: u64,
}

impl<R> PartitionBoundedSource<R> {
    /// Wrap `inner`, which must already be positioned at the partition start.
    pub fn positioned(
        inner: R,
        charset: &CharsetDescriptor,
        capacity: usize,
        partition: Partition,
        policy: BoundaryFetch,
    ) -> Result<Self> {
        check_capacity(charset, capacity)?;

        Ok(PartitionBoundedSource {
            inner,
            buffer: vec![0u8; capacity].into_boxed_slice(),
            partition,
            bytes_per_character: charset.bytes_per_character(),
            policy,
            delivered: 0,
        })
    }

    /// Absolute offset in the raw input of the next byte to be fetched.
    #[inline(always)]
    pub fn position(&self) -> u64 {
        self.partition.start().saturating_add(self.delivered)
    }

    #[inline(always)]
    pub fn partition(&self) -> Partition {
        self.partition
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Number of bytes the next fetch asks the raw input for.
    pub fn next_read_len(&self) -> usize {
        let width = self.bytes_per_character;
        let remaining = self.partition.end().saturating_sub(self.position());
        let budget = usize::try_from(remaining).unwrap_or(usize::MAX);

        let budget = if budget < width {
            // A character cut by an earlier fetch is completed first, so
            // every byte before an aligned end is delivered before any past it.
            let partial = (self.delivered % width as u64) as usize;
            if partial != 0 {
                width - partial
            } else {
                match self.policy {
                    BoundaryFetch::Character => width,
                    BoundaryFetch::Buffer => self.buffer.len(),
                }
            }
        } else {
            budget
        };

        self.buffer.len().min(budget)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> PartitionBoundedSource<R> {
    /// Skips `inner` forward to the partition start by reading and
    /// discarding every byte before it. Prefer [`seekable`] for sources that
    /// can seek.
    ///
    /// [`seekable`]: PartitionBoundedSource::seekable
    pub fn new(
        mut inner: R,
        charset: &CharsetDescriptor,
        capacity: usize,
        partition: Partition,
        policy: BoundaryFetch,
    ) -> Result<Self> {
        check_capacity(charset, capacity)?;
        skip(&mut inner, partition.start())?;
        Self::positioned(inner, charset, capacity, partition, policy)
    }

    /// Read the next chunk of raw input. `None` signals end of source.
    pub fn fetch(&mut self) -> Result<Option<&[u8]>> {
        let requested = self.next_read_len();
        let read = self.inner.read(&mut self.buffer[..requested])?;

        tracing::trace!(
            requested,
            read,
            position = self.position(),
            "fetched raw input"
        );

        if read == 0 {
            return Ok(None);
        }

        self.delivered += read as u64;
        Ok(Some(&self.buffer[..read]))
    }
}

impl<R: Read + Seek> PartitionBoundedSource<R> {
    /// Seeks `inner` forward to the partition start, relative to its current
    /// position.
    pub fn seekable(
        mut inner: R,
        charset: &CharsetDescriptor,
        capacity: usize,
        partition: Partition,
        policy: BoundaryFetch,
    ) -> Result<Self> {
        check_capacity(charset, capacity)?;
        seek_forward(&mut inner, partition.start())?;
        Self::positioned(inner, charset, capacity, partition, policy)
    }
}

impl<R> fmt::Debug for PartitionBoundedSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionBoundedSource")
            .field("partition", &self.partition)
            .field("capacity", &self.buffer.len())
            .field("bytes_per_character", &self.bytes_per_character)
            .field("policy", &self.policy)
            .field("delivered", &self.delivered)
            .finish_non_exhaustive()
    }
}
