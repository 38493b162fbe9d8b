//! The position-aware UTF-8 byte stream handed to record readers.

use std::fmt;
use std::io::{self, Read, Seek};

use crate::charset::CharsetDescriptor;
use crate::error::{Error, Result};
use crate::source::{BoundaryFetch, Partition, PartitionBoundedSource};
use crate::transcoder::{Decompressor, FixedLengthTranscoder};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum State {
    NeedsInput,
    HasInput,
    /// Terminal: the raw source ended and nothing is left to produce.
    Exhausted,
}

/// Pull-based stream of UTF-8 bytes decoded from one partition of a
/// fixed-length encoded input.
///
/// [`position`](TranscodingStream::position) is always expressed in bytes of
/// the raw input, never in decoded bytes. The stream does not stop at the
/// partition end by itself; a record reader decides when to stop pulling
/// (see [`LineRecordReader`](crate::LineRecordReader)).
pub struct TranscodingStream<R> {
    source: PartitionBoundedSource<R>,
    transcoder: FixedLengthTranscoder,
    state: State,
}

impl<R: Read> TranscodingStream<R> {
    /// Open a stream over `[start, end)` of `raw`, skipping `raw` forward to
    /// `start` by reading.
    ///
    /// Uses [`BoundaryFetch::Character`]: once the boundary is reached, each
    /// fetch asks for one character. For full-buffer fetches past the
    /// boundary use [`with_partition`] with [`BoundaryFetch::Buffer`].
    ///
    /// [`with_partition`]: TranscodingStream::with_partition
    pub fn new(
        raw: R,
        charset: &CharsetDescriptor,
        buffer_capacity: usize,
        start: u64,
        end: u64,
    ) -> Result<Self> {
        Self::with_partition(
            raw,
            charset,
            buffer_capacity,
            Partition::new(start, end)?,
            BoundaryFetch::default(),
        )
    }

    /// Open a stream over the whole of `raw` with no partition throttling.
    pub fn unbounded(raw: R, charset: &CharsetDescriptor, buffer_capacity: usize) -> Result<Self> {
        Self::with_partition(
            raw,
            charset,
            buffer_capacity,
            Partition::unbounded(),
            BoundaryFetch::default(),
        )
    }

    /// Open a stream over `partition`, reading `raw` forward to its start.
    /// See [`seekable`](TranscodingStream::seekable) for sources that can seek.
    pub fn with_partition(
        raw: R,
        charset: &CharsetDescriptor,
        buffer_capacity: usize,
        partition: Partition,
        policy: BoundaryFetch,
    ) -> Result<Self> {
        let source = PartitionBoundedSource::new(raw, charset, buffer_capacity, partition, policy)?;
        Ok(Self::from_source(source, charset, policy))
    }

    /// Read decoded UTF-8 bytes into `output`. `Ok(0)` signals end of source
    /// (or an empty `output`).
    pub fn read_decoded(&mut self, output: &mut [u8]) -> Result<usize> {
        if output.is_empty() {
            return Ok(0);
        }

        loop {
            match self.state {
                State::Exhausted => return Ok(0),
                State::NeedsInput => match self.source.fetch()? {
                    Some(chunk) => {
                        self.transcoder.set_input(chunk)?;
                        self.state = State::HasInput;
                    }
                    None => {
                        self.state = State::Exhausted;
                        tracing::debug!(
                            position = self.position(),
                            trailing = self.transcoder.pending_tail(),
                            "raw source exhausted"
                        );
                        return Ok(0);
                    }
                },
                State::HasInput => {
                    let produced = self.transcoder.decompress(output)?;
                    if self.transcoder.needs_input() {
                        self.state = State::NeedsInput;
                    }
                    // Nothing produced means the fetch ended inside a character.
                    if produced > 0 {
                        return Ok(produced);
                    }
                }
            }
        }
    }

    /// Release the stream, reporting a character cut short by the end of
    /// the raw source.
    pub fn close(mut self) -> Result<()> {
        let trailing = self.transcoder.pending_tail();
        let exhausted = self.state == State::Exhausted;
        let position = self.position();
        self.transcoder.end();

        if exhausted && trailing > 0 {
            return Err(Error::IncompleteTrailingCharacter {
                pending: trailing,
                bytes_per_character: self.transcoder.charset().bytes_per_character(),
                position: position - trailing as u64,
            });
        }

        Ok(())
    }

    /// Give back the raw source, discarding any buffered state.
    pub fn into_inner(self) -> R {
        self.source.into_inner()
    }
}

impl<R: Read + Seek> TranscodingStream<R> {
    /// Open a stream over `partition`, seeking `raw` forward to its start.
    pub fn seekable(
        raw: R,
        charset: &CharsetDescriptor,
        buffer_capacity: usize,
        partition: Partition,
        policy: BoundaryFetch,
    ) -> Result<Self> {
        let source =
            PartitionBoundedSource::seekable(raw, charset, buffer_capacity, partition, policy)?;
        Ok(Self::from_source(source, charset, policy))
    }
}

impl<R> TranscodingStream<R> {
    fn from_source(
        source: PartitionBoundedSource<R>,
        charset: &CharsetDescriptor,
        policy: BoundaryFetch,
    ) -> Self {
        tracing::debug!(
            charset = charset.name(),
            buffer_capacity = source.capacity(),
            partition = %source.partition(),
            %policy,
            "opened transcoding stream"
        );

        TranscodingStream {
            source,
            transcoder: FixedLengthTranscoder::new(charset.clone()),
            state: State::NeedsInput,
        }
    }

    /// Absolute offset in the raw input: partition start plus every byte
    /// pulled from the raw source so far.
    #[inline]
    pub fn position(&self) -> u64 {
        self.source
            .partition()
            .start()
            .saturating_add(self.transcoder.consumed_bytes())
    }

    #[inline(always)]
    pub fn partition(&self) -> Partition {
        self.source.partition()
    }

    #[inline(always)]
    pub fn charset(&self) -> &CharsetDescriptor {
        self.transcoder.charset()
    }

    #[inline(always)]
    pub fn is_exhausted(&self) -> bool {
        self.state == State::Exhausted
    }

    /// Bytes held back because they do not complete a character.
    #[inline(always)]
    pub fn trailing_bytes(&self) -> usize {
        self.transcoder.pending_tail()
    }
}

impl<R: Read> Read for TranscodingStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_decoded(buf).map_err(Error::into_io_error)
    }
}

impl<R> fmt::Debug for TranscodingStream<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscodingStream")
            .field("source", &self.source)
            .field("transcoder", &self.transcoder)
            .field("state", &self.state)
            .finish()
    }
}
