use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter, Result},
    num::NonZeroU32,
};

#[derive(Debug, PartialEq, Clone, Copy)]
struct SequenceRange {
    start: NonZeroU32,
    end: NonZeroU32,
}

impl Display for SequenceRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

/// Compact wire form of a set of message numbers, e.g. `3:5,12,14:15`.
#[derive(Debug, PartialEq, Clone)]
pub struct SequenceSet {
    ranges: Vec<SequenceRange>,
}

impl SequenceSet {
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranges
            .iter()
            .map(|range| (range.end.get() - range.start.get()) as usize + 1)
            .sum()
    }
}

impl<T: Into<NonZeroU32>> FromIterator<T> for SequenceSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let sorted: BTreeSet<NonZeroU32> = iter.into_iter().map(Into::into).collect();
        let mut ranges: Vec<SequenceRange> = Vec::new();

        for num in sorted {
            match ranges.last_mut() {
                Some(range) if range.end.checked_add(1) == Some(num) => range.end = num,
                _ => ranges.push(SequenceRange {
                    start: num,
                    end: num,
                }),
            }
        }

        Self { ranges }
    }
}

impl Display for SequenceSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let mut ranges = self.ranges.iter();
        if let Some(first) = ranges.next() {
            write!(f, "{first}")?;
        }
        for range in ranges {
            write!(f, ",{range}")?;
        }
        Ok(())
    }
}
