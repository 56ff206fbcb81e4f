//! Planar geometry: world points, affine transformations and regular grids
//!
//! A [`Grid`] maps grid index space `(row, col)` onto world (cdp) coordinates.
//! Rows run along the grid's rotated x-axis, columns along its rotated y-axis.

use crate::error::{Result, SliceError};
use serde::{Deserialize, Serialize};

/// A world (cdp) or grid-space coordinate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A 2x3 affine transformation matrix
///
/// Equality is exact on all six coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransformation {
    matrix: [[f64; 3]; 2],
}

impl AffineTransformation {
    pub fn new(matrix: [[f64; 3]; 2]) -> Self {
        Self { matrix }
    }

    /// Scale by `(xinc, yinc)`, rotate counter-clockwise by `rotation`
    /// degrees and translate to `(xori, yori)`.
    pub fn from_rotation(xori: f64, yori: f64, xinc: f64, yinc: f64, rotation: f64) -> Self {
        let (sin, cos) = rotation.to_radians().sin_cos();
        Self::new([
            [xinc * cos, -yinc * sin, xori],
            [xinc * sin, yinc * cos, yori],
        ])
    }

    /// Closed-form inverse of [`AffineTransformation::from_rotation`] with the
    /// same parameters.
    pub fn inverse_from_rotation(
        xori: f64,
        yori: f64,
        xinc: f64,
        yinc: f64,
        rotation: f64,
    ) -> Self {
        let (sin, cos) = rotation.to_radians().sin_cos();
        Self::new([
            [cos / xinc, sin / xinc, -(cos * xori + sin * yori) / xinc],
            [-sin / yinc, cos / yinc, (sin * xori - cos * yori) / yinc],
        ])
    }

    /// Numeric inverse for general (non-rotational) transformations
    pub fn inverse(&self) -> Result<Self> {
        let [[a, b, c], [d, e, f]] = self.matrix;
        let det = a * e - b * d;
        if det == 0.0 || !det.is_finite() {
            return Err(SliceError::Runtime(
                "Affine transformation is not invertible".to_string(),
            ));
        }

        Ok(Self::new([
            [e / det, -b / det, (b * f - c * e) / det],
            [-d / det, a / det, (c * d - a * f) / det],
        ]))
    }

    pub fn apply(&self, point: Point) -> Point {
        let [[a, b, c], [d, e, f]] = self.matrix;
        Point {
            x: a * point.x + b * point.y + c,
            y: d * point.x + e * point.y + f,
        }
    }

    pub fn matrix(&self) -> &[[f64; 3]; 2] {
        &self.matrix
    }
}

/// Unbounded regular grid: a forward transformation and its exact inverse
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    transformation: AffineTransformation,
    inverse: AffineTransformation,
}

impl Grid {
    pub fn new(xori: f64, yori: f64, xinc: f64, yinc: f64, rotation: f64) -> Self {
        Self {
            transformation: AffineTransformation::from_rotation(xori, yori, xinc, yinc, rotation),
            inverse: AffineTransformation::inverse_from_rotation(
                xori, yori, xinc, yinc, rotation,
            ),
        }
    }

    /// World position of a (possibly fractional) grid position
    pub fn to_cdp(&self, position: Point) -> Point {
        self.transformation.apply(position)
    }

    /// Grid position of a world point. Fractional and unbounded.
    pub fn from_cdp(&self, point: Point) -> Point {
        self.inverse.apply(point)
    }

    pub fn transformation(&self) -> &AffineTransformation {
        &self.transformation
    }

    pub fn inverse(&self) -> &AffineTransformation {
        &self.inverse
    }
}

/// A [`Grid`] with a fixed number of rows and columns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundedGrid {
    grid: Grid,
    nrows: usize,
    ncols: usize,
}

impl BoundedGrid {
    pub fn new(grid: Grid, nrows: usize, ncols: usize) -> Self {
        Self { grid, nrows, ncols }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of cells
    pub fn size(&self) -> usize {
        self.nrows * self.ncols
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// World position of cell `(row, col)`
    pub fn to_cdp(&self, row: usize, col: usize) -> Result<Point> {
        if row >= self.nrows || col >= self.ncols {
            return Err(SliceError::OutOfRange(format!(
                "Index out of range: row {} col {} on a {}x{} grid",
                row, col, self.nrows, self.ncols
            )));
        }
        Ok(self.grid.to_cdp(Point::new(row as f64, col as f64)))
    }

    /// World position of the cell at row-major flat `index`
    pub fn to_cdp_index(&self, index: usize) -> Result<Point> {
        let (row, col) = self.row_col(index)?;
        self.to_cdp(row, col)
    }

    /// Grid position of a world point. Not bounds checked.
    pub fn from_cdp(&self, point: Point) -> Point {
        self.grid.from_cdp(point)
    }

    /// Split a row-major flat index into `(row, col)`
    pub fn row_col(&self, index: usize) -> Result<(usize, usize)> {
        if index >= self.size() {
            return Err(SliceError::OutOfRange(format!(
                "Index out of range: {} on a grid of {} cells",
                index,
                self.size()
            )));
        }
        Ok((index / self.ncols, index % self.ncols))
    }
}
