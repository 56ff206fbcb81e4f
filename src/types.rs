//! Core data types: axes and request enumerations

use crate::error::{Result, SliceError};
use crate::utils::TOLERANCE;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Axis of a seismic volume in annotation coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Axis {
    /// Annotation of the first sample
    pub min: f64,
    /// Annotation of the last sample
    pub max: f64,
    /// Number of samples along this axis
    pub nsamples: usize,
    /// Name of the axis (e.g., "Inline", "Crossline", "Sample")
    pub name: String,
    /// Unit of measurement (e.g., "unitless", "ms", "m")
    pub unit: String,
    /// Dimension of this axis in the underlying store
    pub dimension: usize,
}

impl Axis {
    /// Create a new axis
    pub fn new(
        min: f64,
        max: f64,
        nsamples: usize,
        name: impl Into<String>,
        unit: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            min,
            max,
            nsamples,
            name: name.into(),
            unit: unit.into(),
            dimension,
        }
    }

    /// Annotation distance between two samples
    pub fn stepsize(&self) -> f64 {
        if self.nsamples <= 1 {
            0.0
        } else {
            (self.max - self.min) / (self.nsamples - 1) as f64
        }
    }

    /// Annotation of a (possibly fractional) index position
    pub fn index_to_annotation(&self, index: f64) -> f64 {
        self.min + index * self.stepsize()
    }

    /// Index position of an annotation, fractional if the annotation falls
    /// between samples
    pub fn annotation_to_index(&self, annotation: f64) -> f64 {
        let stepsize = self.stepsize();
        if stepsize == 0.0 {
            annotation - self.min
        } else {
            (annotation - self.min) / stepsize
        }
    }

    /// Whether the nearest sample of a fractional index position is on the
    /// axis
    pub fn contains_index(&self, position: f64) -> bool {
        position >= -0.5 && position < self.nsamples as f64 - 0.5
    }

    /// Nearest sample of a fractional index position
    pub fn nearest_index(&self, position: f64) -> Result<usize> {
        if !self.contains_index(position) {
            return Err(SliceError::OutOfRange(format!(
                "Index out of range: {} on axis {} with {} samples",
                position, self.name, self.nsamples
            )));
        }
        Ok((position + 0.5).floor().max(0.0) as usize)
    }

    /// Whether an annotation lies within `[min, max]`
    pub fn contains_annotation(&self, annotation: f64) -> bool {
        let (low, high) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        annotation >= low - TOLERANCE && annotation <= high + TOLERANCE
    }

    /// Exact index of an annotation that must be on the axis
    pub fn index_of_line(&self, lineno: f64) -> Result<usize> {
        let position = self.annotation_to_index(lineno);
        let nearest = position.round();
        if (position - nearest).abs() > TOLERANCE || !self.contains_index(nearest) {
            return Err(SliceError::BadRequest(format!(
                "Invalid lineno: {}, valid range: [{}:{}:{}]",
                lineno,
                self.min,
                self.max,
                self.stepsize()
            )));
        }
        Ok(nearest as usize)
    }
}

/// Slice direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Inline,
    Crossline,
    Depth,
    Time,
    Sample,
    I,
    J,
    K,
}

impl Direction {
    /// Volume dimension the direction slices across (0 = inline,
    /// 1 = crossline, 2 = sample)
    pub fn dimension(&self) -> usize {
        match self {
            Direction::Inline | Direction::I => 0,
            Direction::Crossline | Direction::J => 1,
            Direction::Depth | Direction::Time | Direction::Sample | Direction::K => 2,
        }
    }

    /// Whether line numbers are given in annotation coordinates
    pub fn is_annotation(&self) -> bool {
        !matches!(self, Direction::I | Direction::J | Direction::K)
    }
}

impl FromStr for Direction {
    type Err = SliceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "INLINE" => Ok(Direction::Inline),
            "CROSSLINE" => Ok(Direction::Crossline),
            "DEPTH" => Ok(Direction::Depth),
            "TIME" => Ok(Direction::Time),
            "SAMPLE" => Ok(Direction::Sample),
            "I" => Ok(Direction::I),
            "J" => Ok(Direction::J),
            "K" => Ok(Direction::K),
            _ => Err(SliceError::BadRequest(format!("Invalid direction: {}", s))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Coordinate system of fence points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CoordinateSystem {
    /// Inline/crossline index
    Index,
    /// Inline/crossline annotation
    Annotation,
    /// World coordinates
    Cdp,
}

impl FromStr for CoordinateSystem {
    type Err = SliceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "INDEX" | "IJ" => Ok(CoordinateSystem::Index),
            "ANNOTATION" | "ILXL" => Ok(CoordinateSystem::Annotation),
            "CDP" => Ok(CoordinateSystem::Cdp),
            _ => Err(SliceError::BadRequest(format!(
                "Invalid coordinate system: {}",
                s
            ))),
        }
    }
}

/// Horizontal interpolation for fences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Interpolation {
    #[default]
    Nearest,
    Linear,
    Cubic,
    Angular,
    Triangular,
}

impl FromStr for Interpolation {
    type Err = SliceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "NEAREST" => Ok(Interpolation::Nearest),
            "LINEAR" => Ok(Interpolation::Linear),
            "CUBIC" => Ok(Interpolation::Cubic),
            "ANGULAR" => Ok(Interpolation::Angular),
            "TRIANGULAR" => Ok(Interpolation::Triangular),
            _ => Err(SliceError::BadRequest(format!(
                "Invalid interpolation method: {}",
                s
            ))),
        }
    }
}
