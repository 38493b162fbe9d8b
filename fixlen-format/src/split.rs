//! Planning character-aligned partitions over an input of known length.

use crate::error::{Error, Result};
use crate::source::Partition;

fn check_width(bytes_per_character: usize) -> Result<u64> {
    if bytes_per_character == 0 {
        return Err(Error::config("bytes per character must be at least 1"));
    }
    Ok(bytes_per_character as u64)
}

/// Cut `[0, len)` into partitions of `split_size` bytes, rounded down to a
/// whole number of characters (but never below one character). The last
/// partition takes whatever is left, including a trailing partial character.
pub fn plan_by_size(
    len: u64,
    split_size: u64,
    bytes_per_character: usize,
) -> Result<Vec<Partition>> {
    let width = check_width(bytes_per_character)?;
    if split_size == 0 {
        return Err(Error::config("split size must be greater than zero"));
    }

    if len == 0 {
        return Ok(vec![Partition::new(0, 0)?]);
    }

    let step = (split_size - split_size % width).max(width);
    let mut partitions = Vec::with_capacity(usize::try_from(len.div_ceil(step)).unwrap_or(0));

    let mut start = 0;
    while start < len {
        let end = start.saturating_add(step).min(len);
        partitions.push(Partition::new(start, end)?);
        start = end;
    }

    tracing::debug!(len, step, count = partitions.len(), "planned partitions");
    Ok(partitions)
}

/// Cut `[0, len)` into at most `count` partitions of near-equal character
/// counts. Fewer partitions come back when the input has fewer characters
/// than `count`.
pub fn plan_by_count(len: u64, count: usize, bytes_per_character: usize) -> Result<Vec<Partition>> {
    let width = check_width(bytes_per_character)?;
    if count == 0 {
        return Err(Error::config("partition count must be greater than zero"));
    }

    let chars = len.div_ceil(width);
    let per_partition = chars.div_ceil(count as u64).max(1);
    let split_size = per_partition.saturating_mul(width);
    plan_by_size(len, split_size, bytes_per_character)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(partitions: &[Partition]) -> Vec<(u64, u64)> {
        partitions.iter().map(|p| (p.start(), p.end())).collect()
    }

    #[test]
    fn by_size_aligns_to_characters() {
        let plan = plan_by_size(128, 30, 4).unwrap();
        assert_eq!(
            bounds(&plan),
            vec![(0, 28), (28, 56), (56, 84), (84, 112), (112, 128)]
        );
    }

    #[test]
    fn by_size_never_below_one_character() {
        let plan = plan_by_size(8, 1, 4).unwrap();
        assert_eq!(bounds(&plan), vec![(0, 4), (4, 8)]);
    }

    #[test]
    fn partial_trailing_character_stays_in_last_partition() {
        let plan = plan_by_size(10, 4, 4).unwrap();
        assert_eq!(bounds(&plan), vec![(0, 4), (4, 8), (8, 10)]);
    }

    #[test]
    fn by_count() {
        assert_eq!(
            bounds(&plan_by_count(128, 4, 4).unwrap()),
            vec![(0, 32), (32, 64), (64, 96), (96, 128)]
        );
        assert_eq!(
            bounds(&plan_by_count(128, 3, 4).unwrap()),
            vec![(0, 44), (44, 88), (88, 128)]
        );
        let plan = plan_by_count(6, 10, 2).unwrap();
        assert_eq!(bounds(&plan), vec![(0, 2), (2, 4), (4, 6)]);
    }

    #[test]
    fn empty_input() {
        assert_eq!(bounds(&plan_by_size(0, 10, 4).unwrap()), vec![(0, 0)]);
        assert_eq!(bounds(&plan_by_count(0, 3, 1).unwrap()), vec![(0, 0)]);
    }

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(matches!(
            plan_by_size(10, 0, 1),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            plan_by_count(10, 0, 1),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(plan_by_count(10, 1, 0).is_err());
    }

    #[test]
    fn huge_split_size() {
        let plan = plan_by_size(12, u64::MAX, 4).unwrap();
        assert_eq!(bounds(&plan), vec![(0, 12)]);
    }
}
