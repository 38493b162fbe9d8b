use std::io::Write;

use fixlen_format::{plan_by_count, plan_by_size};
use humansize::{file_size_opts, FileSize};
use serde_json::json;

use super::{create_output, decode_partitions, output_name, write_record, DecodedPartition, Input};
use crate::error::{Error, Result};
use crate::SplitArgs;

pub fn run(args: SplitArgs) -> Result<()> {
    let config = args.transcode.config()?;
    let input = Input::open(&args.path)?;
    let width = config.charset.bytes_per_character();

    let planned = match (args.partitions, args.split_size) {
        (_, Some(size)) => plan_by_size(input.len(), size, width),
        (Some(count), None) => plan_by_count(input.len(), count, width),
        (None, None) => plan_by_count(input.len(), rayon::current_num_threads(), width),
    };
    let partitions = planned.map_err(|source| Error::PlanPartitions {
        path: args.path.clone(),
        source,
    })?;

    tracing::debug!(
        input = input.len(),
        partitions = partitions.len(),
        "splitting input"
    );

    let decoded = decode_partitions(&config, &input, &partitions, args.jobs)?;

    let output = args.output.as_deref();
    let write_error = |source| Error::WriteOutput {
        path: output_name(output),
        source,
    };

    let mut out = create_output(output)?;
    for part in &decoded {
        for record in &part.records {
            write_record(&mut out, record, args.offsets).map_err(write_error)?;
        }
    }
    out.flush().map_err(write_error)?;

    if args.json {
        eprintln!("{}", stats_json(&decoded));
    } else {
        print_stats(&decoded);
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    bytes
        .file_size(file_size_opts::BINARY)
        .unwrap_or_else(|_| bytes.to_string())
}

fn print_stats(decoded: &[DecodedPartition]) {
    eprintln!("{:>4}  {:<28}  {:>12}  {:>8}", "#", "Range", "Size", "Records");

    let mut total_records = 0;
    for (i, part) in decoded.iter().enumerate() {
        total_records += part.records.len();
        eprintln!(
            "{:>4}  {:<28}  {:>12}  {:>8}",
            i,
            part.partition.to_string(),
            format_size(part.partition.len()),
            part.records.len()
        );
    }

    let total_bytes = decoded.iter().map(|p| p.partition.len()).sum::<u64>();
    eprintln!(
        "{:>4}  {:<28}  {:>12}  {:>8}",
        "",
        "total",
        format_size(total_bytes),
        total_records
    );
}

fn stats_json(decoded: &[DecodedPartition]) -> serde_json::Value {
    let partitions = decoded
        .iter()
        .map(|part| {
            json!({
                "start": part.partition.start(),
                "end": part.partition.end(),
                "bytes": part.partition.len(),
                "records": part.records.len(),
            })
        })
        .collect::<Vec<_>>();

    json!({
        "partitions": partitions,
        "records": decoded.iter().map(|p| p.records.len()).sum::<usize>(),
    })
}
