use std::path::PathBuf;

use fixlen_format::Partition;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Option `{0}` is not of the form key=value")]
    MalformedOption(String),

    #[error("Invalid transcoding settings")]
    Configure {
        #[source]
        source: fixlen_format::Error,
    },

    #[error("Cannot open input `{}`", .path.display())]
    OpenInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot map input `{}` into memory", .path.display())]
    MapInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot plan partitions of `{}`", .path.display())]
    PlanPartitions {
        path: PathBuf,
        #[source]
        source: fixlen_format::Error,
    },

    #[error("Cannot decode partition {partition} of `{}`", .path.display())]
    Decode {
        path: PathBuf,
        partition: Partition,
        #[source]
        source: fixlen_format::Error,
    },

    #[error("Cannot write output `{}`", .path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot build worker thread pool")]
    BuildThreadPool {
        #[source]
        source: rayon::ThreadPoolBuildError,
    },

    #[error("Split decoding of `{}` differs from whole-file decoding", .path.display())]
    Mismatch { path: PathBuf },
}
