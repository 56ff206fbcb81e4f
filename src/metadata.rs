//! Volume metadata and coordinate transformations

use crate::error::{Result, SliceError};
use crate::geometry::{AffineTransformation, Point};
use crate::types::Axis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conversions between index, annotation and world (cdp) coordinates in the
/// horizontal plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateTransformer {
    index_to_world: AffineTransformation,
    world_to_index: AffineTransformation,
    inline_min: f64,
    inline_stepsize: f64,
    crossline_min: f64,
    crossline_stepsize: f64,
}

impl CoordinateTransformer {
    /// Create a transformer from the world position of the first trace and
    /// the world displacement of one inline and one crossline index step.
    pub fn new(
        origin: Point,
        inline_spacing: Point,
        crossline_spacing: Point,
        iline: &Axis,
        xline: &Axis,
    ) -> Result<Self> {
        let index_to_world = AffineTransformation::new([
            [inline_spacing.x, crossline_spacing.x, origin.x],
            [inline_spacing.y, crossline_spacing.y, origin.y],
        ]);
        let world_to_index = index_to_world.inverse().map_err(|_| {
            SliceError::BadRequest(
                "Inline and crossline spacing vectors must not be parallel".to_string(),
            )
        })?;

        Ok(Self {
            index_to_world,
            world_to_index,
            inline_min: iline.min,
            inline_stepsize: iline.stepsize(),
            crossline_min: xline.min,
            crossline_stepsize: xline.stepsize(),
        })
    }

    pub fn index_to_world(&self, index: Point) -> Point {
        self.index_to_world.apply(index)
    }

    /// Fractional index position of a world point
    pub fn world_to_index(&self, world: Point) -> Point {
        self.world_to_index.apply(world)
    }

    pub fn index_to_annotation(&self, index: Point) -> Point {
        Point::new(
            self.inline_min + index.x * self.inline_stepsize,
            self.crossline_min + index.y * self.crossline_stepsize,
        )
    }

    pub fn annotation_to_index(&self, annotation: Point) -> Point {
        Point::new(
            scale_to_index(annotation.x, self.inline_min, self.inline_stepsize),
            scale_to_index(annotation.y, self.crossline_min, self.crossline_stepsize),
        )
    }

    pub fn annotation_to_world(&self, annotation: Point) -> Point {
        self.index_to_world(self.annotation_to_index(annotation))
    }

    pub fn world_to_annotation(&self, world: Point) -> Point {
        self.index_to_annotation(self.world_to_index(world))
    }
}

fn scale_to_index(annotation: f64, min: f64, stepsize: f64) -> f64 {
    if stepsize == 0.0 {
        annotation - min
    } else {
        (annotation - min) / stepsize
    }
}

/// Corners of the horizontal extent of a volume, in three coordinate systems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub cdp: [Point; 4],
    pub ilxl: [Point; 4],
    pub ij: [Point; 4],
}

/// Complete metadata for a seismic volume
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMetadata {
    /// Inline axis
    pub iline: Axis,

    /// Crossline axis
    pub xline: Axis,

    /// Vertical sample axis (time or depth)
    pub sample: Axis,

    /// Coordinate reference system of world coordinates
    pub crs: String,

    /// Name of the file the volume was imported from
    pub input_filename: String,

    /// When the volume was imported
    pub import_time_stamp: Option<DateTime<Utc>>,

    /// Horizontal coordinate transformations
    pub transformer: CoordinateTransformer,
}

impl VolumeMetadata {
    /// Create new metadata
    pub fn new(iline: Axis, xline: Axis, sample: Axis, transformer: CoordinateTransformer) -> Self {
        Self {
            iline,
            xline,
            sample,
            crs: String::new(),
            input_filename: String::new(),
            import_time_stamp: None,
            transformer,
        }
    }

    /// Set coordinate reference system
    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = crs.into();
        self
    }

    /// Set input file name
    pub fn with_input_filename(mut self, filename: impl Into<String>) -> Self {
        self.input_filename = filename.into();
        self
    }

    /// Set import timestamp
    pub fn with_import_time_stamp(mut self, time_stamp: DateTime<Utc>) -> Self {
        self.import_time_stamp = Some(time_stamp);
        self
    }

    pub fn iline(&self) -> &Axis {
        &self.iline
    }

    pub fn xline(&self) -> &Axis {
        &self.xline
    }

    pub fn sample(&self) -> &Axis {
        &self.sample
    }

    pub fn transformer(&self) -> &CoordinateTransformer {
        &self.transformer
    }

    /// Axis by volume dimension (0 = inline, 1 = crossline, 2 = sample)
    pub fn axis(&self, dimension: usize) -> Result<&Axis> {
        match dimension {
            0 => Ok(&self.iline),
            1 => Ok(&self.xline),
            2 => Ok(&self.sample),
            _ => Err(SliceError::BadRequest(format!(
                "Invalid dimension: {}",
                dimension
            ))),
        }
    }

    /// Number of samples along inline, crossline and sample axes
    pub fn shape(&self) -> [usize; 3] {
        [self.iline.nsamples, self.xline.nsamples, self.sample.nsamples]
    }

    /// Whether the nearest trace of a fractional index position is in the
    /// volume
    pub fn contains_trace(&self, index: Point) -> bool {
        self.iline.contains_index(index.x) && self.xline.contains_index(index.y)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let last_inline = self.iline.nsamples.saturating_sub(1) as f64;
        let last_crossline = self.xline.nsamples.saturating_sub(1) as f64;
        let ij = [
            Point::new(0.0, 0.0),
            Point::new(last_inline, 0.0),
            Point::new(last_inline, last_crossline),
            Point::new(0.0, last_crossline),
        ];

        BoundingBox {
            cdp: ij.map(|p| self.transformer.index_to_world(p)),
            ilxl: ij.map(|p| self.transformer.index_to_annotation(p)),
            ij,
        }
    }
}
