//! Surface-bounded subvolumes
//!
//! A subvolume holds, for every cell of a horizon grid, the raw trace samples
//! between that cell's top and bottom boundary (plus margin). The per-cell
//! windows have different lengths, so they are stored back to back in one
//! flat buffer indexed by a prefix-sum offset table: cell `i` owns
//! `data[offsets[i]..offsets[i + 1]]`, and a cell without data owns an empty
//! range.
//!
//! Because the ranges are disjoint, the buffer can be split into independent
//! partitions ([`SurfaceBoundedSubVolume::partitions_mut`]) that are filled
//! concurrently.

use crate::error::{Result, SliceError};
use crate::metadata::VolumeMetadata;
use crate::surface::{RegularSurface, SurfaceView};
use crate::utils::TOLERANCE;
use crate::verticalwindow::{RawSegmentBlueprint, ResampledSegmentBlueprint};
use ndarray::Data;

/// Reference, top and bottom boundary of a cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundaries {
    pub reference: f64,
    pub top: f64,
    pub bottom: f64,
}

/// View of the raw samples of one cell
///
/// Re-pointed at a new cell with [`SurfaceBoundedSubVolume::reinitialize_raw`]
/// so a single value is reused across the whole cell loop.
#[derive(Debug, Clone, Copy)]
pub struct RawSegment<'a> {
    blueprint: &'a RawSegmentBlueprint,
    data: &'a [f32],
    boundaries: Boundaries,
}

impl<'a> RawSegment<'a> {
    pub fn new(blueprint: &'a RawSegmentBlueprint) -> Self {
        Self {
            blueprint,
            data: &[],
            boundaries: Boundaries {
                reference: 0.0,
                top: 0.0,
                bottom: 0.0,
            },
        }
    }

    pub fn reinitialize(&mut self, data: &'a [f32], boundaries: Boundaries) {
        self.data = data;
        self.boundaries = boundaries;
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn values(&self) -> &'a [f32] {
        self.data
    }

    pub fn boundaries(&self) -> Boundaries {
        self.boundaries
    }

    pub fn top_sample_position(&self) -> f64 {
        self.blueprint.top_sample_position(self.boundaries.top)
    }

    pub fn bottom_sample_position(&self) -> f64 {
        self.blueprint.bottom_sample_position(self.boundaries.bottom)
    }

    /// Vertical position of every sample, top to bottom
    pub fn sample_positions(&self) -> impl Iterator<Item = f64> + '_ {
        let top = self.top_sample_position();
        let stepsize = self.blueprint.stepsize();
        (0..self.size()).map(move |k| top + k as f64 * stepsize)
    }
}

/// Uniformly resampled samples of one cell
///
/// Owns its buffer. Reinitializing only grows the allocation when a cell
/// needs more samples than any cell before it.
#[derive(Debug, Clone)]
pub struct ResampledSegment<'a> {
    blueprint: &'a ResampledSegmentBlueprint,
    data: Vec<f64>,
    boundaries: Boundaries,
}

impl<'a> ResampledSegment<'a> {
    pub fn new(blueprint: &'a ResampledSegmentBlueprint) -> Self {
        Self {
            blueprint,
            data: Vec::new(),
            boundaries: Boundaries {
                reference: 0.0,
                top: 0.0,
                bottom: 0.0,
            },
        }
    }

    pub fn reinitialize(&mut self, boundaries: Boundaries) {
        let size = self
            .blueprint
            .size(boundaries.reference, boundaries.top, boundaries.bottom);
        self.data.clear();
        self.data.resize(size, 0.0);
        self.boundaries = boundaries;
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn boundaries(&self) -> Boundaries {
        self.boundaries
    }

    pub fn stepsize(&self) -> f64 {
        self.blueprint.stepsize()
    }

    /// Index of the sample at the reference depth
    pub fn reference_index(&self) -> usize {
        self.blueprint
            .nsamples_above(self.boundaries.reference, self.boundaries.top)
    }

    pub fn top_sample_position(&self) -> f64 {
        self.blueprint
            .top_sample_position(self.boundaries.reference, self.boundaries.top)
    }

    pub fn bottom_sample_position(&self) -> f64 {
        self.blueprint
            .bottom_sample_position(self.boundaries.reference, self.boundaries.bottom)
    }

    pub fn sample_positions(&self) -> impl Iterator<Item = f64> + '_ {
        let top = self.top_sample_position();
        let stepsize = self.blueprint.stepsize();
        (0..self.size()).map(move |k| top + k as f64 * stepsize)
    }
}

/// Surfaces, vertical window layout and offset table of a subvolume
#[derive(Debug)]
pub struct SubVolumeGeometry<'a> {
    reference: SurfaceView<'a>,
    top: SurfaceView<'a>,
    bottom: SurfaceView<'a>,
    blueprint: RawSegmentBlueprint,
    offsets: Vec<usize>,
}

impl<'a> SubVolumeGeometry<'a> {
    /// Number of horizontal cells
    pub fn hsize(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn is_empty(&self, index: usize) -> bool {
        self.offsets[index] == self.offsets[index + 1]
    }

    pub fn reference(&self) -> &SurfaceView<'a> {
        &self.reference
    }

    pub fn top(&self) -> &SurfaceView<'a> {
        &self.top
    }

    pub fn bottom(&self) -> &SurfaceView<'a> {
        &self.bottom
    }

    pub fn raw_blueprint(&self) -> &RawSegmentBlueprint {
        &self.blueprint
    }

    /// Fill value written for cells without data
    pub fn fillvalue(&self) -> f32 {
        self.reference.fillvalue()
    }

    pub fn boundaries(&self, index: usize) -> Result<Boundaries> {
        Ok(Boundaries {
            reference: self.reference.value_at(index)? as f64,
            top: self.top.value_at(index)? as f64,
            bottom: self.bottom.value_at(index)? as f64,
        })
    }

    fn range(&self, index: usize) -> Result<(usize, usize)> {
        if index >= self.hsize() {
            return Err(SliceError::OutOfRange(format!(
                "Index out of range: cell {} of {}",
                index,
                self.hsize()
            )));
        }
        Ok((self.offsets[index], self.offsets[index + 1]))
    }

    /// Nearest (inline, crossline) trace index of a cell
    pub fn trace_index(&self, index: usize, metadata: &VolumeMetadata) -> Result<(usize, usize)> {
        let cdp = self.reference.to_cdp_index(index)?;
        let position = metadata.transformer().world_to_index(cdp);
        Ok((
            metadata.iline().nearest_index(position.x)?,
            metadata.xline().nearest_index(position.y)?,
        ))
    }

    /// Index of the first raw sample of a cell on the volume's sample axis
    pub fn first_sample_index(&self, index: usize, metadata: &VolumeMetadata) -> Result<usize> {
        let top = self.boundaries(index)?.top;
        let position = self.blueprint.top_sample_position(top);
        let sample = metadata.sample();
        let first = sample.annotation_to_index(position).round();
        if first < 0.0 {
            return Err(SliceError::OutOfRange(format!(
                "Index out of range: sample position {} above the first sample {}",
                position, sample.min
            )));
        }
        Ok(first as usize)
    }
}

/// Raw samples of every cell between a top and bottom surface
#[derive(Debug)]
pub struct SurfaceBoundedSubVolume<'a> {
    geometry: SubVolumeGeometry<'a>,
    data: Vec<f32>,
}

impl<'a> SurfaceBoundedSubVolume<'a> {
    pub fn geometry(&self) -> &SubVolumeGeometry<'a> {
        &self.geometry
    }

    pub fn hsize(&self) -> usize {
        self.geometry.hsize()
    }

    pub fn is_empty(&self, index: usize) -> bool {
        self.geometry.is_empty(index)
    }

    pub fn offsets(&self) -> &[usize] {
        self.geometry.offsets()
    }

    pub fn fillvalue(&self) -> f32 {
        self.geometry.fillvalue()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Raw samples of one cell
    pub fn segment(&self, index: usize) -> Result<&[f32]> {
        let (begin, end) = self.geometry.range(index)?;
        Ok(&self.data[begin..end])
    }

    pub fn segment_mut(&mut self, index: usize) -> Result<&mut [f32]> {
        let (begin, end) = self.geometry.range(index)?;
        Ok(&mut self.data[begin..end])
    }

    /// Point `segment` at the raw samples of cell `index`
    pub fn reinitialize_raw<'s>(&'s self, index: usize, segment: &mut RawSegment<'s>) -> Result<()> {
        let (begin, end) = self.geometry.range(index)?;
        segment.reinitialize(&self.data[begin..end], self.geometry.boundaries(index)?);
        Ok(())
    }

    /// Resize `segment` to the resampled window of cell `index`
    pub fn reinitialize_resampled(
        &self,
        index: usize,
        segment: &mut ResampledSegment<'_>,
    ) -> Result<()> {
        segment.reinitialize(self.geometry.boundaries(index)?);
        Ok(())
    }

    /// Split the raw buffer into disjoint runs of at most `partition_size`
    /// cells
    pub fn partitions_mut(
        &mut self,
        partition_size: usize,
    ) -> Result<Vec<SubVolumePartition<'_, 'a>>> {
        if partition_size == 0 {
            return Err(SliceError::BadRequest(
                "Partition size must be positive".to_string(),
            ));
        }

        let Self { geometry, data } = self;
        let geometry: &SubVolumeGeometry<'a> = geometry;
        let hsize = geometry.hsize();
        let mut partitions = Vec::with_capacity(hsize.div_ceil(partition_size));
        let mut rest: &mut [f32] = data.as_mut_slice();

        for from in (0..hsize).step_by(partition_size) {
            let to = (from + partition_size).min(hsize);
            let len = geometry.offsets[to] - geometry.offsets[from];
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(len);
            rest = tail;
            partitions.push(SubVolumePartition {
                geometry,
                from,
                to,
                data: head,
            });
        }

        Ok(partitions)
    }
}

/// Cells `[from, to)` of a subvolume with exclusive access to their samples
#[derive(Debug)]
pub struct SubVolumePartition<'s, 'a> {
    geometry: &'s SubVolumeGeometry<'a>,
    from: usize,
    to: usize,
    data: &'s mut [f32],
}

impl<'s, 'a> SubVolumePartition<'s, 'a> {
    pub fn from(&self) -> usize {
        self.from
    }

    pub fn to(&self) -> usize {
        self.to
    }

    pub fn geometry(&self) -> &'s SubVolumeGeometry<'a> {
        self.geometry
    }

    /// Raw samples of cell `index`, which must be in `[from, to)`
    pub fn segment_mut(&mut self, index: usize) -> Result<&mut [f32]> {
        if index < self.from || index >= self.to {
            return Err(SliceError::OutOfRange(format!(
                "Index out of range: cell {} outside partition [{}, {})",
                index, self.from, self.to
            )));
        }
        let base = self.geometry.offsets[self.from];
        let begin = self.geometry.offsets[index] - base;
        let end = self.geometry.offsets[index + 1] - base;
        Ok(&mut self.data[begin..end])
    }
}

/// Lay out the subvolume bounded by `top` and `bottom` around `reference`.
///
/// A cell has no data if any surface holds its fill value there or if its
/// position falls outside the volume's inline/crossline range. Any cell with
/// data whose boundaries are not ordered `top <= reference <= bottom` fails
/// the whole request. The sample buffer is allocated but not filled.
pub fn make_subvolume<'a, R, T, B>(
    metadata: &VolumeMetadata,
    reference: &'a RegularSurface<R>,
    top: &'a RegularSurface<T>,
    bottom: &'a RegularSurface<B>,
) -> Result<SurfaceBoundedSubVolume<'a>>
where
    R: Data<Elem = f32>,
    T: Data<Elem = f32>,
    B: Data<Elem = f32>,
{
    let same_size = |nrows: usize, ncols: usize| {
        nrows == reference.nrows() && ncols == reference.ncols()
    };
    if !same_size(top.nrows(), top.ncols()) || !same_size(bottom.nrows(), bottom.ncols()) {
        return Err(SliceError::BadRequest(
            "Expected surfaces to have the same size".to_string(),
        ));
    }
    if reference.grid() != top.grid() || reference.grid() != bottom.grid() {
        return Err(SliceError::BadRequest(
            "Expected surfaces to have the same plane".to_string(),
        ));
    }

    let sample = metadata.sample();
    let blueprint = RawSegmentBlueprint::new(sample.stepsize(), sample.min)?;
    let hsize = reference.size();

    let mut offsets = Vec::with_capacity(hsize + 1);
    offsets.push(0usize);
    let mut total = 0usize;

    for index in 0..hsize {
        let r = reference.value_at(index)?;
        let t = top.value_at(index)?;
        let b = bottom.value_at(index)?;

        if reference.is_fill(r) || top.is_fill(t) || bottom.is_fill(b) {
            offsets.push(total);
            continue;
        }

        if !(t <= r && r <= b) {
            let (row, col) = reference.grid().row_col(index)?;
            return Err(SliceError::Runtime(format!(
                "Planes are not ordered as top <= reference <= bottom at row: {}, col: {} \
                 (top: {}, reference: {}, bottom: {})",
                row, col, t, r, b
            )));
        }

        let position = metadata
            .transformer()
            .world_to_index(reference.to_cdp_index(index)?);
        if !metadata.contains_trace(position) {
            offsets.push(total);
            continue;
        }

        let top_position = blueprint.top_sample_position(t as f64);
        let bottom_position = blueprint.bottom_sample_position(b as f64);
        if top_position < sample.min - TOLERANCE || bottom_position > sample.max + TOLERANCE {
            let (row, col) = reference.grid().row_col(index)?;
            return Err(SliceError::BadRequest(format!(
                "Vertical window is out of vertical bounds at row: {}, col: {}. \
                 Request: [{}, {}] (with margin [{}, {}]). Seismic bounds: [{}, {}]",
                row, col, t, b, top_position, bottom_position, sample.min, sample.max
            )));
        }

        total += blueprint.size(t as f64, b as f64);
        offsets.push(total);
    }

    log::debug!(
        "Subvolume layout: {} cells, {} raw samples",
        hsize,
        total
    );

    Ok(SurfaceBoundedSubVolume {
        geometry: SubVolumeGeometry {
            reference: reference.view(),
            top: top.view(),
            bottom: bottom.view(),
            blueprint,
            offsets,
        },
        data: vec![0.0; total],
    })
}
