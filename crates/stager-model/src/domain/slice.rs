use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Address of one of `count` contiguous partitions of a line-delimited dataset.
///
/// Partition arithmetic works on physical line indices (blank lines included):
/// `part_length = ceil(total / count)` and line `i` belongs to slice `i / part_length`.
/// The last slice has no upper bound so any remainder lands in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SliceSpec {
    index: usize,
    count: usize,
}

impl SliceSpec {
    pub fn new(index: usize, count: usize) -> Result<Self, ModelError> {
        if count == 0 || index >= count {
            return Err(ModelError::InvalidSlice { index, count });
        }
        Ok(Self { index, count })
    }

    /// The whole dataset as a single slice.
    pub fn whole() -> Self {
        Self { index: 0, count: 1 }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_last(&self) -> bool {
        self.index + 1 == self.count
    }

    /// Number of physical lines per slice for a file of `total_lines` lines.
    pub fn part_length(&self, total_lines: u64) -> u64 {
        total_lines.div_ceil(self.count as u64)
    }

    /// Half-open physical line window `[start, end)` covered by this slice.
    ///
    /// `end` is `None` for the last slice.
    pub fn bounds(&self, total_lines: u64) -> (u64, Option<u64>) {
        let part = self.part_length(total_lines);
        let start = part.saturating_mul(self.index as u64);
        if self.is_last() {
            (start, None)
        } else {
            (start, Some(start.saturating_add(part)))
        }
    }

    /// Returns `true` if the physical line at `line_index` belongs to this slice.
    pub fn contains(&self, line_index: u64, total_lines: u64) -> bool {
        let (start, end) = self.bounds(total_lines);
        line_index >= start && end.is_none_or(|end| line_index < end)
    }
}

impl Default for SliceSpec {
    fn default() -> Self {
        Self::whole()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(
            SliceSpec::new(4, 4),
            Err(ModelError::InvalidSlice { index: 4, count: 4 })
        );
        assert!(SliceSpec::new(0, 0).is_err());
        assert!(SliceSpec::new(3, 4).is_ok());
    }

    #[test]
    fn hundred_and_one_lines_in_four_slices() {
        let total = 101;
        let sizes: Vec<u64> = (0..4)
            .map(|i| {
                let spec = SliceSpec::new(i, 4).unwrap();
                (0..total).filter(|&line| spec.contains(line, total)).count() as u64
            })
            .collect();

        assert_eq!(SliceSpec::new(0, 4).unwrap().part_length(total), 26);
        assert_eq!(sizes, vec![26, 26, 26, 23]);
        assert_eq!(SliceSpec::new(3, 4).unwrap().bounds(total), (78, None));
    }

    #[test]
    fn every_line_lands_in_exactly_one_slice() {
        for total in [0u64, 1, 2, 5, 7, 10, 99, 100, 101] {
            for count in 1..=8 {
                for line in 0..total {
                    let owners = (0..count)
                        .filter(|&i| SliceSpec::new(i, count).unwrap().contains(line, total))
                        .count();
                    assert_eq!(owners, 1, "line {line} of {total} with {count} slices");
                }
            }
        }
    }

    #[test]
    fn more_slices_than_lines_leaves_trailing_slices_empty() {
        let total = 5;
        let spec = SliceSpec::new(3, 4).unwrap();
        assert_eq!(spec.part_length(total), 2);
        assert!((0..total).all(|line| !spec.contains(line, total)));
    }
}
