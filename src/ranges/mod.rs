//! Genomic intervals and range validation.
//!

use std::fmt;
use std::ops::Range;

use crate::{error::GenofuseError, traits::GenericRange, Position, DEFAULT_WINDOW};

/// A 0-indexed, right-exclusive interval `[start, end)` on one sequence (e.g. chromosome).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Interval {
    pub seqname: String,
    pub start: Position,
    pub end: Position,
}

impl Interval {
    /// Create a new interval, checking that `start < end`.
    pub fn new(seqname: impl Into<String>, start: Position, end: Position) -> Result<Self, GenofuseError> {
        if start >= end {
            return Err(GenofuseError::InvalidGenomicRange(start, end));
        }
        Ok(Self {
            seqname: seqname.into(),
            start,
            end,
        })
    }

    /// Create the fixed-width interval `[start, start + window)`.
    ///
    /// A zero `window`, or a `window` that would overflow [`Position`], is an
    /// [`GenofuseError::InvalidGenomicRange`].
    pub fn with_window(
        seqname: impl Into<String>,
        start: Position,
        window: Position,
    ) -> Result<Self, GenofuseError> {
        let end = start
            .checked_add(window)
            .ok_or(GenofuseError::InvalidGenomicRange(start, Position::MAX))?;
        Self::new(seqname, start, end)
    }

    /// Create an interval with the [`DEFAULT_WINDOW`] width.
    pub fn default_window(seqname: impl Into<String>, start: Position) -> Result<Self, GenofuseError> {
        Self::with_window(seqname, start, DEFAULT_WINDOW)
    }
}

impl GenericRange for Interval {
    fn start(&self) -> Position {
        self.start
    }
    fn end(&self) -> Position {
        self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.seqname, self.start, self.end)
    }
}

/// Validates whether a given range is valid for accessing a sequence of a given `length`.
///
/// # Arguments
///
/// * `start` - The 0-indexed start position.
/// * `end` - The right-exclusive end position.
/// * `length` - The length of the sequence.
pub fn validate_range(start: Position, end: Position, length: Position) -> Result<(), GenofuseError> {
    if start >= end {
        return Err(GenofuseError::InvalidGenomicRange(start, end));
    }

    if end > length {
        return Err(GenofuseError::InvalidGenomicRangeForSequence(
            start, end, length,
        ));
    }
    Ok(())
}

/// Build a [`Range<usize>`] for indexing into a sequence of `length`, after validating it.
pub fn try_range(start: Position, end: Position, length: Position) -> Result<Range<usize>, GenofuseError> {
    validate_range(start, end, length)?;
    Ok(start as usize..end as usize)
}
