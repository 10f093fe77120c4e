//! Analysis window and segmentation.

use thiserror::Error;

/// Tolerance used when snapping `duration / segment_time` to an integer.
const SEGMENT_SNAP_EPSILON: f64 = 1e-6;

/// Largest number of segments a window may span.
pub const MAX_SEGMENTS: usize = 100_000_000;

/// Errors raised when validating an analysis window.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WindowError {
    #[error("segment time must be a positive number of seconds, got {0}")]
    InvalidSegmentTime(f64),

    #[error("duration must be a non-negative number of seconds, got {0}")]
    InvalidDuration(f64),

    #[error("skip must be a non-negative number of seconds, got {0}")]
    InvalidSkip(f64),

    #[error("{duration}s at {segment_time}s per segment exceeds {max} segments")]
    TooManySegments {
        duration: f64,
        segment_time: f64,
        max: usize,
    },
}

/// The `[skip, skip + duration)` interval, in seconds from the start of the
/// log, sampled every `segment_time` seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisWindow {
    skip: f64,
    duration: f64,
    segment_time: f64,
}

impl AnalysisWindow {
    /// Build a validated window.
    pub fn new(skip: f64, duration: f64, segment_time: f64) -> Result<Self, WindowError> {
        if !segment_time.is_finite() || segment_time <= 0.0 {
            return Err(WindowError::InvalidSegmentTime(segment_time));
        }
        if !duration.is_finite() || duration < 0.0 {
            return Err(WindowError::InvalidDuration(duration));
        }
        if !skip.is_finite() || skip < 0.0 {
            return Err(WindowError::InvalidSkip(skip));
        }
        checked_segment_count(duration, segment_time)?;
        Ok(Self {
            skip,
            duration,
            segment_time,
        })
    }

    #[inline]
    pub fn skip(&self) -> f64 {
        self.skip
    }

    #[inline]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    #[inline]
    pub fn segment_time(&self) -> f64 {
        self.segment_time
    }

    /// Number of segments in the window.
    #[inline]
    pub fn num_segments(&self) -> usize {
        segment_count(self.duration, self.segment_time)
    }
}

/// Number of `segment_time` steps needed to cover `duration`.
///
/// This is `ceil(duration / segment_time)`, except that a ratio within
/// floating point noise of an integer is taken as that integer, so
/// `5.0 / 0.0001` yields exactly 50000 segments.
pub fn segment_count(duration: f64, segment_time: f64) -> usize {
    if !(duration > 0.0) || !(segment_time > 0.0) {
        return 0;
    }
    let ratio = duration / segment_time;
    let nearest = ratio.round();
    let count = if (ratio - nearest).abs() < SEGMENT_SNAP_EPSILON {
        nearest
    } else {
        ratio.ceil()
    };
    count as usize
}

/// [`segment_count`], rejecting windows longer than [`MAX_SEGMENTS`].
pub fn checked_segment_count(duration: f64, segment_time: f64) -> Result<usize, WindowError> {
    if duration / segment_time > MAX_SEGMENTS as f64 {
        return Err(WindowError::TooManySegments {
            duration,
            segment_time,
            max: MAX_SEGMENTS,
        });
    }
    Ok(segment_count(duration, segment_time))
}
