//! Vertical sample windows
//!
//! Samples along a trace sit at `sample_offset + k * stepsize` for integer
//! `k`. A window `[top, bottom]` covers every such sample inside the closed
//! interval, extended by `margin` samples on both ends. All boundary
//! arithmetic goes through the tolerant helpers in [`crate::utils`], so a
//! boundary within [`crate::utils::TOLERANCE`] of a sample includes it.

use crate::error::{Result, SliceError};
use crate::utils::{ceil_with_tolerance, floor_with_tolerance, fmod_with_tolerance};

/// Margin of the raw windows, in samples, on each side
pub const RAW_MARGIN: usize = 2;

/// Sample spacing plus margin shared by raw and resampled windows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentBlueprint {
    stepsize: f64,
    margin: usize,
}

impl SegmentBlueprint {
    pub fn new(stepsize: f64, margin: usize) -> Result<Self> {
        if !(stepsize.is_finite() && stepsize > 0.0) {
            return Err(SliceError::BadRequest(format!(
                "Stepsize must be a positive number, got {}",
                stepsize
            )));
        }
        Ok(Self { stepsize, margin })
    }

    pub fn stepsize(&self) -> f64 {
        self.stepsize
    }

    pub fn margin(&self) -> usize {
        self.margin
    }

    /// Sample number of the first sample of the window
    fn above_sample_index(&self, top_boundary: f64, sample_offset: f64) -> i64 {
        ceil_with_tolerance((top_boundary - sample_offset) / self.stepsize) as i64
            - self.margin as i64
    }

    /// Sample number of the last sample of the window
    fn below_sample_index(&self, bottom_boundary: f64, sample_offset: f64) -> i64 {
        floor_with_tolerance((bottom_boundary - sample_offset) / self.stepsize) as i64
            + self.margin as i64
    }

    fn size(&self, top_boundary: f64, bottom_boundary: f64, sample_offset: f64) -> usize {
        let above = self.above_sample_index(top_boundary, sample_offset);
        let below = self.below_sample_index(bottom_boundary, sample_offset);
        (below - above + 1).max(0) as usize
    }

    fn top_sample_position(&self, top_boundary: f64, sample_offset: f64) -> f64 {
        self.above_sample_index(top_boundary, sample_offset) as f64 * self.stepsize + sample_offset
    }

    fn bottom_sample_position(&self, bottom_boundary: f64, sample_offset: f64) -> f64 {
        self.below_sample_index(bottom_boundary, sample_offset) as f64 * self.stepsize
            + sample_offset
    }
}

/// Window over the samples as stored in the volume
///
/// The phase of the samples is fixed by the volume's first sample, and the
/// window carries [`RAW_MARGIN`] extra samples on each side so the
/// interpolant is well defined up to the boundaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSegmentBlueprint {
    blueprint: SegmentBlueprint,
    sample_offset: f64,
}

impl RawSegmentBlueprint {
    /// `sample_position` is the position of any sample in the volume,
    /// typically the first one.
    pub fn new(stepsize: f64, sample_position: f64) -> Result<Self> {
        let blueprint = SegmentBlueprint::new(stepsize, RAW_MARGIN)?;
        Ok(Self {
            blueprint,
            sample_offset: fmod_with_tolerance(sample_position, stepsize),
        })
    }

    pub fn stepsize(&self) -> f64 {
        self.blueprint.stepsize
    }

    pub fn margin(&self) -> usize {
        self.blueprint.margin
    }

    pub fn sample_offset(&self) -> f64 {
        self.sample_offset
    }

    /// Number of samples in the window, margins included
    pub fn size(&self, top_boundary: f64, bottom_boundary: f64) -> usize {
        self.blueprint
            .size(top_boundary, bottom_boundary, self.sample_offset)
    }

    pub fn top_sample_position(&self, top_boundary: f64) -> f64 {
        self.blueprint
            .top_sample_position(top_boundary, self.sample_offset)
    }

    pub fn bottom_sample_position(&self, bottom_boundary: f64) -> f64 {
        self.blueprint
            .bottom_sample_position(bottom_boundary, self.sample_offset)
    }
}

/// Window over the uniformly resampled trace
///
/// The destination grid is anchored at each cell's reference depth, so the
/// sample offset is derived from the reference on every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResampledSegmentBlueprint {
    blueprint: SegmentBlueprint,
}

impl ResampledSegmentBlueprint {
    pub fn new(stepsize: f64) -> Result<Self> {
        Ok(Self {
            blueprint: SegmentBlueprint::new(stepsize, 0)?,
        })
    }

    pub fn stepsize(&self) -> f64 {
        self.blueprint.stepsize
    }

    fn sample_offset(&self, reference: f64) -> f64 {
        fmod_with_tolerance(reference, self.blueprint.stepsize)
    }

    pub fn size(&self, reference: f64, top_boundary: f64, bottom_boundary: f64) -> usize {
        self.blueprint
            .size(top_boundary, bottom_boundary, self.sample_offset(reference))
    }

    pub fn top_sample_position(&self, reference: f64, top_boundary: f64) -> f64 {
        self.blueprint
            .top_sample_position(top_boundary, self.sample_offset(reference))
    }

    pub fn bottom_sample_position(&self, reference: f64, bottom_boundary: f64) -> f64 {
        self.blueprint
            .bottom_sample_position(bottom_boundary, self.sample_offset(reference))
    }

    /// Number of samples in the window strictly above the reference sample
    pub fn nsamples_above(&self, reference: f64, top_boundary: f64) -> usize {
        let sample_offset = self.sample_offset(reference);
        let reference_index = ((reference - sample_offset) / self.blueprint.stepsize).round() as i64;
        let above = self.blueprint.above_sample_index(top_boundary, sample_offset);
        (reference_index - above).max(0) as usize
    }
}
