//! Bucket queue of thinning candidates

use crate::core::error::Error;
use crate::core::types::{try_reserve, Result};
use crate::thinning::config::ValueOrdering;

/// A voxel that may still be changed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Linear voxel index
    pub index: usize,
    pub coords: [usize; 3],
    /// Whole neighborhood inside the volume
    pub inside: bool,
    /// Current classification value, mirrors the volume
    pub state: u8,
}

/// Candidates grouped by priority bucket
///
/// Bucket `b` holds values in `[first + b * bin, first + (b + 1) * bin)`.
#[derive(Debug)]
pub struct BucketQueue {
    buckets: Vec<Vec<Candidate>>,
    first_value: u32,
    last_value: u32,
    bin_length: u32,
}

impl BucketQueue {
    /// Allocate buckets covering `[first_value, last_value]`
    pub fn new(first_value: u32, last_value: u32, bin_length: u32) -> Result<Self> {
        let bin_length = bin_length.max(1);
        let count = ((last_value.saturating_sub(first_value)) / bin_length) as usize + 1;
        let mut buckets = Vec::new();
        try_reserve(&mut buckets, count, "priority buckets")?;
        buckets.resize_with(count, Vec::new);
        Ok(Self { buckets, first_value, last_value, bin_length })
    }

    /// Bucket of a priority value, `None` outside the span
    pub fn bucket_of(&self, value: u32) -> Option<usize> {
        if value < self.first_value || value > self.last_value {
            return None;
        }
        let b = ((value - self.first_value) / self.bin_length) as usize;
        (b < self.buckets.len()).then_some(b)
    }

    pub fn push(&mut self, value: u32, candidate: Candidate) -> Result<()> {
        let b = self.bucket_of(value).ok_or(Error::ValueOutOfRange {
            value,
            index: candidate.index,
            min: self.first_value,
            max: self.last_value,
        })?;
        let bucket = &mut self.buckets[b];
        try_reserve(bucket, 1, "bucket points")?;
        bucket.push(candidate);
        Ok(())
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn bucket(&self, b: usize) -> &[Candidate] {
        &self.buckets[b]
    }

    pub fn bucket_mut(&mut self, b: usize) -> &mut Vec<Candidate> {
        &mut self.buckets[b]
    }

    /// Total number of queued candidates
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }
}

/// Walks bucket indices in the configured order
#[derive(Clone, Copy, Debug)]
pub struct Sweep {
    first: isize,
    last: isize,
    step: isize,
}

impl Sweep {
    pub fn new(bucket_count: usize, ordering: ValueOrdering) -> Self {
        let n = bucket_count as isize;
        match ordering {
            ValueOrdering::Increasing => Self { first: 0, last: n - 1, step: 1 },
            ValueOrdering::Decreasing => Self { first: n - 1, last: 0, step: -1 },
        }
    }

    pub fn first(&self) -> isize {
        self.first
    }

    pub fn step(&self) -> isize {
        self.step
    }

    /// True while `b` has not run past the last bucket
    pub fn contains(&self, b: isize) -> bool {
        if self.step > 0 { b <= self.last } else { b >= self.last }
    }

    /// True when `a` comes strictly after `b` in processing order
    pub fn is_after(&self, a: isize, b: isize) -> bool {
        if self.step > 0 { a > b } else { a < b }
    }

    /// True when bucket `b` has not yet reached bucket `gate`
    pub fn is_before(&self, b: isize, gate: isize) -> bool {
        self.is_after(gate, b)
    }
}
