//! Streaming transcoding of fixed-length encoded text (UTF-32, UTF-16,
//! EBCDIC and other single-byte charsets) into UTF-8, one partition of the
//! input at a time.
//!
//! ```no_run
//! use std::fs::File;
//! use fixlen_format::{FixedLengthCharset, Partition, TranscodeConfig};
//!
//! # fn main() -> fixlen_format::Result<()> {
//! let config = TranscodeConfig::new(FixedLengthCharset::Utf32Be);
//! let file = File::open("input.txt")?;
//! for record in config.open_lines(file, Partition::new(4096, 8192)?)? {
//!     let record = record?;
//!     println!("{}: {}", record.offset, record.text);
//! }
//! # Ok(())
//! # }
//! ```

mod charset;
mod config;
mod error;
mod line;
mod source;
pub mod split;
mod stream;
mod transcoder;

pub use charset::{CharsetDescriptor, DecodeFn, FixedLengthCharset};
pub use config::{TranscodeConfig, DEFAULT_BUFFER_CAPACITY};
pub use error::{Error, Result};
pub use line::{LineRecord, LineRecordReader};
pub use source::{BoundaryFetch, Partition, PartitionBoundedSource};
pub use split::{plan_by_count, plan_by_size};
pub use stream::TranscodingStream;
pub use transcoder::{Decompressor, FixedLengthTranscoder};
