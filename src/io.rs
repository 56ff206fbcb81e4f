//! Data sources for seismic volumes

use crate::error::{Result, SliceError};
use crate::geometry::Point;
use crate::metadata::VolumeMetadata;
use crate::types::Interpolation;
use async_trait::async_trait;
use ndarray::{s, Array3, ArrayView1};

/// Box in index space, `lower` inclusive and `upper` exclusive, ordered
/// (inline, crossline, sample)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubcubeBounds {
    pub lower: [usize; 3],
    pub upper: [usize; 3],
}

impl SubcubeBounds {
    pub fn new(lower: [usize; 3], upper: [usize; 3]) -> Result<Self> {
        if lower.iter().zip(upper.iter()).any(|(l, u)| l >= u) {
            return Err(SliceError::BadRequest(format!(
                "Invalid subcube: lower bound {:?} must be below upper bound {:?}",
                lower, upper
            )));
        }
        Ok(Self { lower, upper })
    }

    /// Whole volume of the given shape
    pub fn full(shape: [usize; 3]) -> Result<Self> {
        Self::new([0; 3], shape)
    }

    pub fn shape(&self) -> [usize; 3] {
        [
            self.upper[0] - self.lower[0],
            self.upper[1] - self.lower[1],
            self.upper[2] - self.lower[2],
        ]
    }

    pub fn nvalues(&self) -> usize {
        self.shape().iter().product()
    }

    /// Whether the box fits inside a volume of the given shape
    pub fn fits(&self, shape: [usize; 3]) -> bool {
        self.upper.iter().zip(shape.iter()).all(|(u, n)| u <= n)
    }
}

/// Trait for reading samples out of a seismic volume
///
/// Implement this for the storage the volume lives in. Buffers are filled
/// with `f32` samples in C order over (inline, crossline, sample).
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Metadata of the volume
    fn metadata(&self) -> &VolumeMetadata;

    /// Size in bytes of the buffer `read` needs for `bounds`
    fn buffer_size_for(&self, bounds: &SubcubeBounds) -> usize {
        bounds.nvalues() * std::mem::size_of::<f32>()
    }

    /// Size in bytes of the buffer `read_traces` needs for `ntraces` traces
    fn traces_buffer_size(&self, ntraces: usize) -> usize {
        ntraces * self.metadata().sample().nsamples * std::mem::size_of::<f32>()
    }

    /// Read the samples inside `bounds`
    async fn read(&self, buffer: &mut [f32], bounds: &SubcubeBounds) -> Result<()>;

    /// Read full traces at fractional (inline, crossline) index positions
    async fn read_traces(
        &self,
        buffer: &mut [f32],
        positions: &[Point],
        interpolation: Interpolation,
    ) -> Result<()>;
}

/// Data source over a volume held in memory
#[derive(Debug, Clone)]
pub struct MemoryDataSource {
    metadata: VolumeMetadata,
    data: Array3<f32>,
}

impl MemoryDataSource {
    /// `data` must have the shape described by `metadata`
    pub fn new(metadata: VolumeMetadata, data: Array3<f32>) -> Result<Self> {
        let expected = metadata.shape();
        if data.shape() != expected {
            return Err(SliceError::BadRequest(format!(
                "Data shape {:?} does not match metadata shape {:?}",
                data.shape(),
                expected
            )));
        }
        Ok(Self { metadata, data })
    }

    /// Volume with `f(inline, crossline, sample)` at every index
    pub fn from_fn<F>(metadata: VolumeMetadata, f: F) -> Self
    where
        F: FnMut((usize, usize, usize)) -> f32,
    {
        let [ni, nj, nk] = metadata.shape();
        let data = Array3::from_shape_fn((ni, nj, nk), f);
        Self { metadata, data }
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    fn trace(&self, inline: usize, crossline: usize) -> ArrayView1<'_, f32> {
        self.data.slice(s![inline, crossline, ..])
    }

    fn write_trace(&self, dst: &mut [f32], position: Point, interpolation: Interpolation) -> Result<()> {
        let iline = self.metadata.iline();
        let xline = self.metadata.xline();

        match interpolation {
            Interpolation::Nearest => {
                let i = iline.nearest_index(position.x)?;
                let j = xline.nearest_index(position.y)?;
                for (dst, src) in dst.iter_mut().zip(self.trace(i, j)) {
                    *dst = *src;
                }
            }
            Interpolation::Linear => {
                if !self.metadata.contains_trace(position) {
                    return Err(SliceError::OutOfRange(format!(
                        "Index out of range: trace position ({}, {})",
                        position.x, position.y
                    )));
                }
                let (i0, i1, fi) = bracket(position.x, iline.nsamples);
                let (j0, j1, fj) = bracket(position.y, xline.nsamples);
                let weights = [
                    ((i0, j0), (1.0 - fi) * (1.0 - fj)),
                    ((i1, j0), fi * (1.0 - fj)),
                    ((i0, j1), (1.0 - fi) * fj),
                    ((i1, j1), fi * fj),
                ];
                dst.fill(0.0);
                for ((i, j), weight) in weights {
                    if weight == 0.0 {
                        continue;
                    }
                    for (dst, src) in dst.iter_mut().zip(self.trace(i, j)) {
                        *dst += (weight as f32) * *src;
                    }
                }
            }
            other => {
                return Err(SliceError::BadRequest(format!(
                    "Interpolation method {:?} is not supported by the in-memory data source",
                    other
                )))
            }
        }
        Ok(())
    }
}

/// Neighbouring indices of a fractional position and the weight of the
/// upper one, clamped to the axis
fn bracket(position: f64, n: usize) -> (usize, usize, f64) {
    let last = n.saturating_sub(1);
    let clamped = position.clamp(0.0, last as f64);
    let lower = clamped.floor() as usize;
    let upper = (lower + 1).min(last);
    (lower, upper, clamped - lower as f64)
}

#[async_trait]
impl DataSource for MemoryDataSource {
    fn metadata(&self) -> &VolumeMetadata {
        &self.metadata
    }

    async fn read(&self, buffer: &mut [f32], bounds: &SubcubeBounds) -> Result<()> {
        if !bounds.fits(self.metadata.shape()) {
            return Err(SliceError::OutOfRange(format!(
                "Index out of range: subcube {:?}..{:?} outside volume of shape {:?}",
                bounds.lower,
                bounds.upper,
                self.metadata.shape()
            )));
        }
        if buffer.len() != bounds.nvalues() {
            return Err(SliceError::BadRequest(format!(
                "Buffer holds {} values, subcube has {}",
                buffer.len(),
                bounds.nvalues()
            )));
        }

        let [l0, l1, l2] = bounds.lower;
        let [u0, u1, u2] = bounds.upper;
        let subcube = self.data.slice(s![l0..u0, l1..u1, l2..u2]);
        for (dst, src) in buffer.iter_mut().zip(subcube.iter()) {
            *dst = *src;
        }
        Ok(())
    }

    async fn read_traces(
        &self,
        buffer: &mut [f32],
        positions: &[Point],
        interpolation: Interpolation,
    ) -> Result<()> {
        let nsamples = self.metadata.sample().nsamples;
        if buffer.len() != positions.len() * nsamples {
            return Err(SliceError::BadRequest(format!(
                "Buffer holds {} values, {} traces need {}",
                buffer.len(),
                positions.len(),
                positions.len() * nsamples
            )));
        }
        if nsamples == 0 {
            return Ok(());
        }

        for (dst, position) in buffer.chunks_mut(nsamples).zip(positions) {
            self.write_trace(dst, *position, interpolation)?;
        }
        Ok(())
    }
}
