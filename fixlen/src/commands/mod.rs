mod charsets;
mod decode;
mod split;
mod verify;

pub use charsets::run as charsets;
pub use decode::run as decode;
pub use split::run as split;
pub use verify::run as verify;

use std::fs::File;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};

use fixlen_format::{LineRecord, Partition, TranscodeConfig};
use memmap2::Mmap;
use rayon::prelude::*;

use crate::error::{Error, Result};

/// Read-only view of the whole input file.
pub(crate) struct Input {
    path: PathBuf,
    // Zero-length files cannot be mapped on every platform.
    map: Option<Mmap>,
}

impl Input {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::OpenInput {
            path: path.to_path_buf(),
            source,
        })?;

        let len = file
            .metadata()
            .map_err(|source| Error::OpenInput {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        let map = if len == 0 {
            None
        } else {
            // SAFETY: the input is only read, and is expected to stay unmodified
            // while the command runs.
            let map = unsafe { Mmap::map(&file) }.map_err(|source| Error::MapInput {
                path: path.to_path_buf(),
                source,
            })?;
            Some(map)
        };

        Ok(Input {
            path: path.to_path_buf(),
            map,
        })
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }

    /// Seekable reader over the mapped bytes, starting at offset 0.
    #[inline]
    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.bytes())
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.bytes().len() as u64
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Records of one partition, decoded independently of every other partition.
pub(crate) struct DecodedPartition {
    pub partition: Partition,
    pub records: Vec<LineRecord>,
}

pub(crate) fn decode_partition(
    config: &TranscodeConfig,
    input: &Input,
    partition: Partition,
) -> Result<DecodedPartition> {
    let decode_error = |source| Error::Decode {
        path: input.path().to_path_buf(),
        partition,
        source,
    };

    let mut lines = config
        .open_lines(input.reader(), partition)
        .map_err(decode_error)?;

    let mut records = Vec::new();
    for record in &mut lines {
        records.push(record.map_err(decode_error)?);
    }
    lines.close().map_err(decode_error)?;

    tracing::debug!(%partition, records = records.len(), "decoded partition");

    Ok(DecodedPartition { partition, records })
}

/// Decode every partition on the rayon pool, returning results in partition order.
pub(crate) fn decode_partitions(
    config: &TranscodeConfig,
    input: &Input,
    partitions: &[Partition],
    jobs: Option<usize>,
) -> Result<Vec<DecodedPartition>> {
    let run = || {
        partitions
            .par_iter()
            .map(|&partition| decode_partition(config, input, partition))
            .collect::<Result<Vec<_>>>()
    };

    match jobs {
        Some(jobs) => rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .map_err(|source| Error::BuildThreadPool { source })?
            .install(run),
        None => run(),
    }
}

pub(crate) fn write_record<W: Write>(
    out: &mut W,
    record: &LineRecord,
    offsets: bool,
) -> io::Result<()> {
    if offsets {
        writeln!(out, "{}\t{}", record.offset, record.text)
    } else {
        writeln!(out, "{}", record.text)
    }
}

/// Output file, or stdout when none is given.
pub(crate) fn create_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|source| Error::WriteOutput {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(Box::new(io::BufWriter::new(file)))
        }
        None => Ok(Box::new(io::BufWriter::new(io::stdout()))),
    }
}

/// Path used in error messages about the output.
pub(crate) fn output_name(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("<stdout>"))
}
