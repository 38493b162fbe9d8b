use std::io::Write;

use fixlen_format::Partition;

use super::{create_output, output_name, write_record, Input};
use crate::error::{Error, Result};
use crate::DecodeArgs;

pub fn run(args: DecodeArgs) -> Result<()> {
    let config = args.transcode.config()?;
    let input = Input::open(&args.path)?;
    let output = args.output.as_deref();
    let mut out = create_output(output)?;

    let write_error = |source| Error::WriteOutput {
        path: output_name(output),
        source,
    };

    if args.start.is_none() && args.end.is_none() && !args.offsets {
        // Plain transcoding: no line handling, the whole file as UTF-8.
        let partition = Partition::unbounded();
        let decode_error = |source| Error::Decode {
            path: args.path.clone(),
            partition,
            source,
        };

        let mut stream = config
            .open_stream(input.reader(), partition)
            .map_err(decode_error)?;

        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = stream.read_decoded(&mut buf).map_err(decode_error)?;
            if n == 0 {
                break;
            }
            out.write_all(&buf[..n]).map_err(write_error)?;
        }
        tracing::debug!(position = stream.position(), "decoded input");

        stream.close().map_err(decode_error)?;
        return out.flush().map_err(write_error);
    }

    let start = args.start.unwrap_or(0);
    let end = args.end.unwrap_or_else(|| input.len());
    let partition = Partition::new(start, end).map_err(|source| Error::PlanPartitions {
        path: args.path.clone(),
        source,
    })?;

    let decoded = super::decode_partition(&config, &input, partition)?;
    for record in &decoded.records {
        write_record(&mut out, record, args.offsets).map_err(write_error)?;
    }

    out.flush().map_err(write_error)
}
