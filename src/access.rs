//! Volume data access - main API for slicing volumes and computing attributes

use crate::attribute::calc_attributes_parallel;
use crate::config::AttributeOptions;
use crate::error::{Result, SliceError};
use crate::geometry::Point;
use crate::io::{DataSource, SubcubeBounds};
use crate::metadata::VolumeMetadata;
use crate::subvolume::{make_subvolume, SurfaceBoundedSubVolume};
use crate::surface::{align_surfaces, RegularSurface, Surface};
use crate::types::{Axis, CoordinateSystem, Direction, Interpolation};
use crate::utils::{format_bytes, samples_to_bytes};
use crate::verticalwindow::ResampledSegmentBlueprint;
use bytes::Bytes;
use futures::future::try_join_all;
use ndarray::Data;
use std::sync::Arc;

const DEPTH_UNITS: [&str; 3] = ["m", "ft", "usft"];
const TIME_UNITS: [&str; 2] = ["ms", "s"];

/// A 2D slice through the volume
#[derive(Debug, Clone)]
pub struct Slice {
    /// `f32` little-endian samples, row-major over (`x`, `y`)
    pub data: Bytes,
    pub shape: [usize; 2],
    pub x: Axis,
    pub y: Axis,
}

/// Main interface for reading from a seismic volume
#[derive(Clone)]
pub struct SeismicVolume {
    source: Arc<dyn DataSource>,
}

impl SeismicVolume {
    pub fn new(source: impl DataSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn from_source(source: Arc<dyn DataSource>) -> Self {
        Self { source }
    }

    /// Get the volume metadata
    pub fn metadata(&self) -> &VolumeMetadata {
        self.source.metadata()
    }

    /// Read the slice at line `lineno` across `direction`
    ///
    /// Annotation directions take `lineno` as an annotation, index
    /// directions (`I`, `J`, `K`) as a zero-based index.
    pub async fn slice(&self, lineno: f64, direction: Direction) -> Result<Slice> {
        let metadata = self.metadata();
        let dimension = direction.dimension();
        let axis = metadata.axis(dimension)?;
        check_vertical_unit(direction, metadata.sample())?;

        let index = if direction.is_annotation() {
            axis.index_of_line(lineno)?
        } else {
            index_of_position(lineno, axis)?
        };

        let shape = metadata.shape();
        let mut lower = [0; 3];
        let mut upper = shape;
        lower[dimension] = index;
        upper[dimension] = index + 1;
        let bounds = SubcubeBounds::new(lower, upper)?;

        let nvalues = self.source.buffer_size_for(&bounds) / std::mem::size_of::<f32>();
        let mut buffer = vec![0.0f32; nvalues];
        self.source.read(&mut buffer, &bounds).await?;

        let remaining: Vec<usize> = (0..3).filter(|&d| d != dimension).collect();
        let x = metadata.axis(remaining[0])?.clone();
        let y = metadata.axis(remaining[1])?.clone();
        log::info!(
            "Read {} slice at {} ({} x {} samples)",
            direction,
            lineno,
            x.nsamples,
            y.nsamples
        );

        Ok(Slice {
            data: samples_to_bytes(&buffer),
            shape: [x.nsamples, y.nsamples],
            x,
            y,
        })
    }

    /// Read full traces at arbitrary horizontal positions
    ///
    /// Points whose nearest trace is outside the volume get `fillvalue` for
    /// every sample, or fail the request when no fill value is given.
    pub async fn fence(
        &self,
        system: CoordinateSystem,
        points: &[Point],
        interpolation: Interpolation,
        fillvalue: Option<f32>,
    ) -> Result<Bytes> {
        let metadata = self.metadata();
        let transformer = metadata.transformer();
        let nsamples = metadata.sample().nsamples;

        let mut inside = Vec::with_capacity(points.len());
        let mut positions = Vec::with_capacity(points.len());
        for point in points {
            let position = match system {
                CoordinateSystem::Index => *point,
                CoordinateSystem::Annotation => transformer.annotation_to_index(*point),
                CoordinateSystem::Cdp => transformer.world_to_index(*point),
            };

            if metadata.contains_trace(position) {
                positions.push(position);
                inside.push(true);
            } else if fillvalue.is_some() {
                inside.push(false);
            } else {
                let dimension = if metadata.iline().contains_index(position.x) {
                    1
                } else {
                    0
                };
                return Err(SliceError::BadRequest(format!(
                    "Coordinate ({}, {}) is out of boundaries in dimension {}.",
                    point.x, point.y, dimension
                )));
            }
        }

        let nvalues = self.source.traces_buffer_size(positions.len()) / std::mem::size_of::<f32>();
        let mut traces = vec![0.0f32; nvalues];
        if !positions.is_empty() {
            self.source
                .read_traces(&mut traces, &positions, interpolation)
                .await?;
        }

        let fill = fillvalue.unwrap_or_default();
        let mut fence = Vec::with_capacity(points.len() * nsamples);
        let mut read = traces.chunks(nsamples.max(1));
        for is_inside in inside {
            if is_inside {
                let trace = read.next().ok_or_else(|| {
                    SliceError::Runtime("Fence trace count mismatch".to_string())
                })?;
                fence.extend_from_slice(trace);
            } else {
                fence.extend(std::iter::repeat(fill).take(nsamples));
            }
        }

        log::info!(
            "Read fence of {} traces ({} inside the volume)",
            points.len(),
            positions.len()
        );
        Ok(samples_to_bytes(&fence))
    }

    /// Fill every non-empty cell of `subvolume` with the samples of its
    /// nearest trace
    ///
    /// Partitions of `partition_size` cells are read concurrently.
    pub async fn fetch_subvolume(
        &self,
        subvolume: &mut SurfaceBoundedSubVolume<'_>,
        partition_size: usize,
    ) -> Result<()> {
        let metadata = self.metadata();
        let size = format_bytes(std::mem::size_of_val(subvolume.data()));
        let partitions = subvolume.partitions_mut(partition_size)?;
        log::debug!(
            "Fetching {} of subvolume samples in {} partition(s)",
            size,
            partitions.len()
        );

        let reads = partitions.into_iter().map(|mut partition| {
            let source = &self.source;
            async move {
                let geometry = partition.geometry();
                for index in partition.from()..partition.to() {
                    if geometry.is_empty(index) {
                        continue;
                    }
                    let (inline, crossline) = geometry.trace_index(index, metadata)?;
                    let first = geometry.first_sample_index(index, metadata)?;
                    let segment = partition.segment_mut(index)?;
                    let bounds = SubcubeBounds::new(
                        [inline, crossline, first],
                        [inline + 1, crossline + 1, first + segment.len()],
                    )?;
                    source.read(segment, &bounds).await?;
                }
                Ok::<_, SliceError>(())
            }
        });

        try_join_all(reads).await?;
        Ok(())
    }

    /// Attributes of the window `[reference - above, reference + below]`
    /// around a horizon
    ///
    /// Returns one buffer per requested attribute, one value per surface
    /// cell, with the surface's fill value where there is no data.
    ///
    /// The traces are fetched concurrently, but the attributes are then
    /// computed on the rayon pool and the calling task blocks until every
    /// partition is done. Call it from a blocking-tolerant context when the
    /// surface is large.
    pub async fn attributes_along_surface<S>(
        &self,
        reference: &RegularSurface<S>,
        above: f32,
        below: f32,
        options: &AttributeOptions,
    ) -> Result<Vec<Vec<f32>>>
    where
        S: Data<Elem = f32>,
    {
        if !(above >= 0.0 && below >= 0.0) {
            return Err(SliceError::BadRequest(format!(
                "Above and below must be non-negative, got above: {}, below: {}",
                above, below
            )));
        }

        let shifted = |offset: f32| -> Result<Surface> {
            let values = reference
                .values()
                .map(|value| {
                    if reference.is_fill(value) {
                        value
                    } else {
                        value + offset
                    }
                })
                .collect();
            Surface::from_vec(values, *reference.grid(), reference.fillvalue())
        };
        let top = shifted(-above)?;
        let bottom = shifted(below)?;

        log::info!(
            "Computing {} attribute(s) along surface of {} x {} cells, window [-{}, +{}]",
            options.attributes.len(),
            reference.nrows(),
            reference.ncols(),
            above,
            below
        );
        self.attributes_in_window(reference, &top, &bottom, options)
            .await
    }

    /// Attributes of the window between two horizons
    ///
    /// `secondary` is resampled onto the grid of `primary`, which is the
    /// reference surface and defines the output layout.
    ///
    /// Blocks the calling task while the attributes are computed, like
    /// [`SeismicVolume::attributes_along_surface`].
    pub async fn attributes_between_surfaces<P, Q>(
        &self,
        primary: &RegularSurface<P>,
        secondary: &RegularSurface<Q>,
        options: &AttributeOptions,
    ) -> Result<Vec<Vec<f32>>>
    where
        P: Data<Elem = f32>,
        Q: Data<Elem = f32>,
    {
        let fillvalue = primary.fillvalue();
        let mut aligned = Surface::filled(*primary.grid(), fillvalue, fillvalue);
        let primary_is_top = align_surfaces(primary, secondary, &mut aligned)?;

        log::info!(
            "Computing {} attribute(s) between surfaces of {} x {} cells, primary on {}",
            options.attributes.len(),
            primary.nrows(),
            primary.ncols(),
            if primary_is_top { "top" } else { "bottom" }
        );
        if primary_is_top {
            self.attributes_in_window(primary, primary, &aligned, options)
                .await
        } else {
            self.attributes_in_window(primary, &aligned, primary, options)
                .await
        }
    }

    async fn attributes_in_window<R, T, B>(
        &self,
        reference: &RegularSurface<R>,
        top: &RegularSurface<T>,
        bottom: &RegularSurface<B>,
        options: &AttributeOptions,
    ) -> Result<Vec<Vec<f32>>>
    where
        R: Data<Elem = f32>,
        T: Data<Elem = f32>,
        B: Data<Elem = f32>,
    {
        options.validate()?;
        let metadata = self.metadata();
        let dst_blueprint = ResampledSegmentBlueprint::new(options.stepsize_for(metadata))?;

        let mut subvolume = make_subvolume(metadata, reference, top, bottom)?;
        self.fetch_subvolume(&mut subvolume, options.partition_size)
            .await?;

        // blocking from here on; the subvolume borrows the caller's surfaces
        let mut outputs = vec![vec![0.0f32; subvolume.hsize()]; options.attributes.len()];
        calc_attributes_parallel(
            &subvolume,
            &dst_blueprint,
            &options.attributes,
            &mut outputs,
            options.partition_size,
        )?;
        Ok(outputs)
    }
}

fn check_vertical_unit(direction: Direction, sample: &Axis) -> Result<()> {
    let allowed: &[&str] = match direction {
        Direction::Depth => &DEPTH_UNITS,
        Direction::Time => &TIME_UNITS,
        _ => return Ok(()),
    };
    if allowed.iter().any(|unit| unit.eq_ignore_ascii_case(&sample.unit)) {
        Ok(())
    } else {
        Err(SliceError::BadRequest(format!(
            "Unable to use {} on cube with depth units: {}",
            direction, sample.unit
        )))
    }
}

fn index_of_position(lineno: f64, axis: &Axis) -> Result<usize> {
    if lineno.fract() != 0.0 || lineno < 0.0 || lineno >= axis.nsamples as f64 {
        return Err(SliceError::BadRequest(format!(
            "Invalid lineno: {}, valid range: [0:{}:1]",
            lineno,
            axis.nsamples.saturating_sub(1)
        )));
    }
    Ok(lineno as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeKind;
    use crate::io::MemoryDataSource;
    use crate::subvolume::tests::{create_metadata, grid, FILL};
    use crate::utils::bytes_to_samples;

    /// 3 x 3 x 8 volume where each trace is linear in depth
    fn volume() -> SeismicVolume {
        SeismicVolume::new(MemoryDataSource::from_fn(create_metadata(), |(i, j, k)| {
            (1000 * i + 100 * j + 4 * k) as f32
        }))
    }

    fn offset(row: usize, col: usize) -> f32 {
        (1000 * row + 100 * col) as f32
    }

    #[tokio::test]
    async fn test_inline_slice() {
        let slice = volume().slice(2.0, Direction::Inline).await.unwrap();
        assert_eq!(slice.shape, [3, 8]);
        assert_eq!(slice.x.name, "Crossline");
        assert_eq!(slice.y.name, "Sample");

        let values = bytes_to_samples(&slice.data).unwrap();
        assert_eq!(values.len(), 24);
        assert_eq!(values[0], 1000.0);
        assert_eq!(values[9], 1104.0);
    }

    #[tokio::test]
    async fn test_time_and_index_slices() {
        let volume = volume();
        let slice = volume.slice(8.0, Direction::Time).await.unwrap();
        assert_eq!(slice.shape, [3, 3]);
        let values = bytes_to_samples(&slice.data).unwrap();
        assert_eq!(values[4], 1108.0);

        let slice = volume.slice(2.0, Direction::J).await.unwrap();
        assert_eq!(slice.shape, [3, 8]);
        let values = bytes_to_samples(&slice.data).unwrap();
        assert_eq!(values[0], 200.0);
    }

    #[tokio::test]
    async fn test_invalid_slices() {
        let volume = volume();
        let err = volume.slice(8.0, Direction::Depth).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to use Depth on cube with depth units: ms"
        );

        let err = volume.slice(1.5, Direction::Inline).await.unwrap_err();
        assert!(err.to_string().starts_with("Invalid lineno: 1.5"));
        assert!(volume.slice(13.0, Direction::Crossline).await.is_err());
        assert!(volume.slice(3.0, Direction::I).await.is_err());
        assert!(volume.slice(0.5, Direction::K).await.is_err());
    }

    #[tokio::test]
    async fn test_fence() {
        let volume = volume();
        let points = [Point::new(0.0, 0.0), Point::new(2.4, 1.0), Point::new(5.0, 5.0)];

        let fence = volume
            .fence(CoordinateSystem::Cdp, &points, Interpolation::Nearest, Some(-1.0))
            .await
            .unwrap();
        let values = bytes_to_samples(&fence).unwrap();
        assert_eq!(values.len(), 24);
        assert_eq!(values[1], 4.0);
        assert_eq!(values[8], 2100.0);
        assert!(values[16..].iter().all(|&v| v == -1.0));

        let err = volume
            .fence(CoordinateSystem::Cdp, &points, Interpolation::Nearest, None)
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Coordinate (5, 5) is out of boundaries"));
    }

    #[tokio::test]
    async fn test_fence_annotation() {
        let fence = volume()
            .fence(
                CoordinateSystem::Annotation,
                &[Point::new(2.0, 12.0)],
                Interpolation::Linear,
                None,
            )
            .await
            .unwrap();
        let values = bytes_to_samples(&fence).unwrap();
        assert_eq!(values[0], 1200.0);
    }

    #[tokio::test]
    async fn test_fetch_subvolume() {
        let volume = volume();
        let metadata = volume.metadata();
        let g = grid(0.0, 3, 3);
        let reference = Surface::filled(g, 12.0, FILL);
        let top = Surface::filled(g, 10.0, FILL);
        let bottom = Surface::filled(g, 14.0, FILL);

        let mut subvolume = make_subvolume(metadata, &reference, &top, &bottom).unwrap();
        volume.fetch_subvolume(&mut subvolume, 2).await.unwrap();

        for index in 0..subvolume.hsize() {
            let (row, col) = g.row_col(index).unwrap();
            let segment = subvolume.segment(index).unwrap();
            let expected: Vec<f32> = (1..6).map(|k| offset(row, col) + 4.0 * k as f32).collect();
            assert_eq!(segment, expected.as_slice());
        }
    }

    #[tokio::test]
    async fn test_attributes_along_surface() {
        let volume = volume();
        let g = grid(0.0, 3, 3);
        let mut values = vec![12.0f32; 9];
        values[4] = FILL;
        let reference = Surface::from_vec(values, g, FILL).unwrap();

        let options = AttributeOptions::new([
            AttributeKind::Min,
            AttributeKind::Max,
            AttributeKind::Mean,
            AttributeKind::Value,
        ])
        .with_partition_size(4);
        let outputs = volume
            .attributes_along_surface(&reference, 4.0, 4.0, &options)
            .await
            .unwrap();
        assert_eq!(outputs.len(), 4);

        for index in 0..9 {
            if index == 4 {
                assert!(outputs.iter().all(|output| output[index] == FILL));
                continue;
            }
            let (row, col) = g.row_col(index).unwrap();
            let base = offset(row, col);
            let expected = [base + 8.0, base + 16.0, base + 12.0, base + 12.0];
            for (output, expected) in outputs.iter().zip(expected) {
                assert!((output[index] - expected).abs() < 1e-3);
            }
        }
    }

    #[tokio::test]
    async fn test_attributes_along_surface_errors() {
        let volume = volume();
        let reference = Surface::filled(grid(0.0, 1, 1), 12.0, FILL);
        let options = AttributeOptions::new([AttributeKind::Mean]);

        let err = volume
            .attributes_along_surface(&reference, -1.0, 4.0, &options)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::BadRequest);

        let err = volume
            .attributes_along_surface(&reference, 12.0, 4.0, &options)
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Vertical window is out of vertical bounds"));

        let err = volume
            .attributes_along_surface(&reference, 4.0, 4.0, &AttributeOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No attributes requested");
    }

    #[tokio::test]
    async fn test_attributes_between_surfaces() {
        let volume = volume();
        let g = grid(0.0, 2, 2);
        let primary = Surface::filled(g, 12.0, FILL);
        let options = AttributeOptions::new([AttributeKind::Min, AttributeKind::Max]);

        let below = Surface::filled(g, 20.0, FILL);
        let outputs = volume
            .attributes_between_surfaces(&primary, &below, &options)
            .await
            .unwrap();
        for index in 0..4 {
            let (row, col) = g.row_col(index).unwrap();
            assert!((outputs[0][index] - (offset(row, col) + 12.0)).abs() < 1e-3);
            assert!((outputs[1][index] - (offset(row, col) + 20.0)).abs() < 1e-3);
        }

        let above = Surface::filled(g, 8.0, FILL);
        let outputs = volume
            .attributes_between_surfaces(&primary, &above, &options)
            .await
            .unwrap();
        assert!((outputs[0][3] - (offset(1, 1) + 8.0)).abs() < 1e-3);
        assert!((outputs[1][3] - (offset(1, 1) + 12.0)).abs() < 1e-3);
    }
}
