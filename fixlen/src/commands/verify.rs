use std::path::Path;

use fixlen_format::{plan_by_count, Partition};

use super::{decode_partition, decode_partitions, DecodedPartition, Input};
use crate::error::{Error, Result};
use crate::VerifyArgs;

/// Record count and checksum over offsets and text of every record.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct Digest {
    records: usize,
    crc32: u32,
}

fn digest(decoded: &[DecodedPartition]) -> Digest {
    let mut hasher = crc32fast::Hasher::new();
    let mut records = 0;

    for record in decoded.iter().flat_map(|p| &p.records) {
        hasher.update(&record.offset.to_le_bytes());
        hasher.update(record.text.as_bytes());
        hasher.update(b"\n");
        records += 1;
    }

    Digest {
        records,
        crc32: hasher.finalize(),
    }
}

fn check(path: &Path, unsplit: Digest, split: Digest) -> Result<()> {
    if unsplit != split {
        return Err(Error::Mismatch {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

pub fn run(args: VerifyArgs) -> Result<()> {
    let config = args.transcode.config()?;
    let input = Input::open(&args.path)?;
    let plan_error = |source| Error::PlanPartitions {
        path: args.path.clone(),
        source,
    };

    let whole = Partition::new(0, input.len()).map_err(plan_error)?;
    let unsplit = digest(&[decode_partition(&config, &input, whole)?]);

    let width = config.charset.bytes_per_character();
    let partitions = plan_by_count(input.len(), args.partitions, width).map_err(plan_error)?;
    let split = digest(&decode_partitions(&config, &input, &partitions, args.jobs)?);

    println!(
        "unsplit: {} records, crc32 {:08x}",
        unsplit.records, unsplit.crc32
    );
    println!(
        "{} partitions: {} records, crc32 {:08x}",
        partitions.len(),
        split.records,
        split.crc32
    );

    check(&args.path, unsplit, split)?;
    println!("OK");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixlen_format::LineRecord;
    use structopt::StructOpt;

    fn part(start: u64, end: u64, records: &[(u64, &str)]) -> DecodedPartition {
        DecodedPartition {
            partition: Partition::new(start, end).unwrap(),
            records: records
                .iter()
                .map(|&(offset, text)| LineRecord {
                    offset,
                    text: text.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn digest_covers_offsets_and_text() {
        let whole = digest(&[part(0, 9, &[(0, "ab"), (3, "cd"), (6, "ef")])]);
        let split = digest(&[
            part(0, 4, &[(0, "ab"), (3, "cd")]),
            part(4, 9, &[(6, "ef")]),
        ]);
        assert_eq!(whole, split);
        assert_eq!(whole.records, 3);

        let shifted = digest(&[part(0, 9, &[(0, "ab"), (4, "cd"), (6, "ef")])]);
        assert_eq!(shifted.records, 3);
        assert_ne!(whole, shifted);
    }

    #[test]
    fn lost_or_shifted_records_are_a_mismatch() {
        let path = Path::new("input.ebcdic");
        let whole = digest(&[part(0, 6, &[(0, "ab"), (3, "cd")])]);
        let dropped = digest(&[part(0, 3, &[(0, "ab")]), part(3, 6, &[])]);
        let doubled = digest(&[
            part(0, 3, &[(0, "ab"), (3, "cd")]),
            part(3, 6, &[(3, "cd")]),
        ]);

        assert!(check(path, whole, whole).is_ok());
        for split in [dropped, doubled] {
            match check(path, whole, split) {
                Err(Error::Mismatch { path: reported }) => assert_eq!(reported, path),
                other => panic!("expected a mismatch, got {:?}", other),
            }
        }
    }

    #[test]
    fn split_decoding_matches_on_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.ebcdic");
        // "HI\n\nOK\nEND" in IBM037
        let raw: [u8; 10] = [0xC8, 0xC9, 0x25, 0x25, 0xD6, 0xD2, 0x25, 0xC5, 0xD5, 0xC4];
        std::fs::write(&path, raw).unwrap();

        for count in ["1", "3", "10"] {
            let args = VerifyArgs::from_iter_safe([
                "verify",
                "-c",
                "ibm037",
                "-b",
                "2",
                "-n",
                count,
                path.to_str().unwrap(),
            ])
            .unwrap();
            run(args).unwrap();
        }
    }
}
