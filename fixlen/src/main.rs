mod commands;
mod error;

use std::path::PathBuf;

use fixlen_format::{BoundaryFetch, FixedLengthCharset, TranscodeConfig};
use structopt::clap::AppSettings::*;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

#[derive(Debug, StructOpt)]
pub struct TranscodeArgs {
    #[structopt(
        short,
        long,
        help = "Charset of the input, e.g. UTF-32BE, UTF-16LE, IBM037, windows-1252"
    )]
    pub charset: FixedLengthCharset,

    #[structopt(
        short = "b",
        long = "buffer",
        default_value = "4096",
        help = "Bytes read from the input per fetch"
    )]
    pub buffer_capacity: usize,

    #[structopt(
        long,
        default_value = "character",
        possible_values = BoundaryFetch::available_variants(),
        help = "Fetch size once a partition boundary is reached"
    )]
    pub boundary_fetch: BoundaryFetch,

    #[structopt(
        short = "O",
        long = "option",
        number_of_values = 1,
        help = "Extra transcoding option as key=value"
    )]
    pub options: Vec<String>,
}

impl TranscodeArgs {
    pub fn config(&self) -> Result<TranscodeConfig> {
        let mut config = TranscodeConfig::new(self.charset);
        config.buffer_capacity = self.buffer_capacity;
        config.boundary_fetch = self.boundary_fetch;

        for option in &self.options {
            let (key, value) = option
                .split_once('=')
                .ok_or_else(|| Error::MalformedOption(option.clone()))?;
            config.set_option(key.trim(), value.trim());
        }

        config
            .apply_options()
            .and_then(|_| config.validate())
            .map_err(|source| Error::Configure { source })?;

        Ok(config)
    }
}

#[derive(Debug, StructOpt)]
pub struct DecodeArgs {
    #[structopt(flatten)]
    pub transcode: TranscodeArgs,

    #[structopt(long, help = "First byte of the partition to decode")]
    pub start: Option<u64>,

    #[structopt(long, help = "End of the partition to decode [default: end of file]")]
    pub end: Option<u64>,

    #[structopt(long, help = "Prefix each line with its byte offset in the input")]
    pub offsets: bool,

    #[structopt(
        short,
        long,
        parse(from_os_str),
        help = "Write output here instead of stdout"
    )]
    pub output: Option<PathBuf>,

    #[structopt(name = "file", parse(from_os_str), help = "Input file")]
    pub path: PathBuf,
}

#[derive(Debug, StructOpt)]
pub struct SplitArgs {
    #[structopt(flatten)]
    pub transcode: TranscodeArgs,

    #[structopt(
        short = "n",
        long,
        required_unless = "split-size",
        conflicts_with = "split-size",
        help = "Number of partitions"
    )]
    pub partitions: Option<usize>,

    #[structopt(long, help = "Bytes per partition, rounded down to whole characters")]
    pub split_size: Option<u64>,

    #[structopt(short, long, help = "Worker threads [default: one per CPU]")]
    pub jobs: Option<usize>,

    #[structopt(long, help = "Prefix each line with its byte offset in the input")]
    pub offsets: bool,

    #[structopt(long, help = "Print partition statistics as JSON")]
    pub json: bool,

    #[structopt(
        short,
        long,
        parse(from_os_str),
        help = "Write output here instead of stdout"
    )]
    pub output: Option<PathBuf>,

    #[structopt(name = "file", parse(from_os_str), help = "Input file")]
    pub path: PathBuf,
}

#[derive(Debug, StructOpt)]
pub struct VerifyArgs {
    #[structopt(flatten)]
    pub transcode: TranscodeArgs,

    #[structopt(short = "n", long, default_value = "4", help = "Number of partitions")]
    pub partitions: usize,

    #[structopt(short, long, help = "Worker threads [default: one per CPU]")]
    pub jobs: Option<usize>,

    #[structopt(name = "file", parse(from_os_str), help = "Input file")]
    pub path: PathBuf,
}

#[derive(Debug, StructOpt)]
enum Commands {
    #[structopt(
        name = "d",
        visible_alias = "decode",
        about = "Decode a file, or one partition of it, to UTF-8"
    )]
    Decode(DecodeArgs),

    #[structopt(
        name = "s",
        visible_alias = "split",
        about = "Decode a file as parallel partitions"
    )]
    Split(SplitArgs),

    #[structopt(
        name = "t",
        visible_alias = "verify",
        about = "Check that split decoding matches whole-file decoding"
    )]
    Verify(VerifyArgs),

    #[structopt(
        name = "l",
        visible_alias = "charsets",
        about = "List built-in charsets"
    )]
    Charsets {
        #[structopt(long, help = "Print as JSON")]
        json: bool,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "fixlen",
    about = "Decode files in fixed-length charsets to UTF-8, whole or split.",
    settings = &[SubcommandRequiredElseHelp, DisableHelpSubcommand, VersionlessSubcommands]
)]
struct CliOpts {
    #[structopt(short, long, help = "Show verbose output", global = true)]
    verbose: bool,

    #[structopt(subcommand)]
    cmd: Commands,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let opts = CliOpts::from_iter(wild::args_os());
    init_tracing(opts.verbose);

    match opts.cmd {
        Commands::Decode(args) => commands::decode(args)?,
        Commands::Split(args) => commands::split(args)?,
        Commands::Verify(args) => commands::verify(args)?,
        Commands::Charsets { json } => commands::charsets(json)?,
    };

    Ok(())
}
