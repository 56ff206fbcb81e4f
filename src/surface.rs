//! Regular surfaces (horizons) on a rotated grid
//!
//! A surface is a 2D height map laid out row-major on a [`BoundedGrid`]. Cells
//! equal to the surface's fill value carry no data. The storage is any
//! [`ndarray`] representation, so the same type serves as a borrowed view over
//! a caller buffer ([`SurfaceView`], [`SurfaceViewMut`]) or as an owned map
//! ([`Surface`]).

use crate::error::{Result, SliceError};
use crate::geometry::{BoundedGrid, Point};
use ndarray::{
    ArrayBase, ArrayView2, ArrayViewMut2, Data, DataMut, Ix2, OwnedRepr, RawData, ViewRepr,
};
use std::fmt;

/// Height map over a bounded grid
pub struct RegularSurface<S: RawData<Elem = f32>> {
    data: ArrayBase<S, Ix2>,
    grid: BoundedGrid,
    fillvalue: f32,
}

impl<S: Data<Elem = f32>> fmt::Debug for RegularSurface<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegularSurface")
            .field("grid", &self.grid)
            .field("fillvalue", &self.fillvalue)
            .field("data", &self.data)
            .finish()
    }
}

/// Read-only surface over a borrowed buffer
pub type SurfaceView<'a> = RegularSurface<ViewRepr<&'a f32>>;

/// Writable surface over a borrowed buffer
pub type SurfaceViewMut<'a> = RegularSurface<ViewRepr<&'a mut f32>>;

/// Surface owning its values
pub type Surface = RegularSurface<OwnedRepr<f32>>;

fn shape_of(grid: &BoundedGrid, len: usize) -> Result<(usize, usize)> {
    if len != grid.size() {
        return Err(SliceError::BadRequest(format!(
            "Surface data has {} values, expected {} ({} rows x {} cols)",
            len,
            grid.size(),
            grid.nrows(),
            grid.ncols()
        )));
    }
    Ok((grid.nrows(), grid.ncols()))
}

impl<'a> RegularSurface<ViewRepr<&'a f32>> {
    /// Wrap a row-major buffer of `nrows * ncols` values
    pub fn from_slice(data: &'a [f32], grid: BoundedGrid, fillvalue: f32) -> Result<Self> {
        let shape = shape_of(&grid, data.len())?;
        Ok(Self {
            data: ArrayView2::from_shape(shape, data)?,
            grid,
            fillvalue,
        })
    }
}

impl<'a> RegularSurface<ViewRepr<&'a mut f32>> {
    /// Wrap a writable row-major buffer of `nrows * ncols` values
    pub fn from_slice_mut(data: &'a mut [f32], grid: BoundedGrid, fillvalue: f32) -> Result<Self> {
        let shape = shape_of(&grid, data.len())?;
        Ok(Self {
            data: ArrayViewMut2::from_shape(shape, data)?,
            grid,
            fillvalue,
        })
    }
}

impl RegularSurface<OwnedRepr<f32>> {
    pub fn from_vec(data: Vec<f32>, grid: BoundedGrid, fillvalue: f32) -> Result<Self> {
        let shape = shape_of(&grid, data.len())?;
        Ok(Self {
            data: ndarray::Array2::from_shape_vec(shape, data)?,
            grid,
            fillvalue,
        })
    }

    /// Surface of `grid` with every cell set to `value`
    pub fn filled(grid: BoundedGrid, value: f32, fillvalue: f32) -> Self {
        Self {
            data: ndarray::Array2::from_elem((grid.nrows(), grid.ncols()), value),
            grid,
            fillvalue,
        }
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }
}

impl<S: Data<Elem = f32>> RegularSurface<S> {
    /// Value at `(row, col)`
    pub fn value(&self, row: usize, col: usize) -> Result<f32> {
        self.data.get((row, col)).copied().ok_or_else(|| {
            SliceError::OutOfRange(format!(
                "Index out of range: row {} col {} on a {}x{} surface",
                row,
                col,
                self.nrows(),
                self.ncols()
            ))
        })
    }

    /// Value at row-major flat `index`
    pub fn value_at(&self, index: usize) -> Result<f32> {
        let (row, col) = self.grid.row_col(index)?;
        self.value(row, col)
    }

    pub fn is_fill(&self, value: f32) -> bool {
        value == self.fillvalue
    }

    pub fn view(&self) -> SurfaceView<'_> {
        RegularSurface {
            data: self.data.view(),
            grid: self.grid,
            fillvalue: self.fillvalue,
        }
    }

    /// Values in row-major order
    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.data.iter().copied()
    }
}

impl<S: DataMut<Elem = f32>> RegularSurface<S> {
    pub fn set(&mut self, row: usize, col: usize, value: f32) -> Result<()> {
        let (nrows, ncols) = (self.nrows(), self.ncols());
        let cell = self.data.get_mut((row, col)).ok_or_else(|| {
            SliceError::OutOfRange(format!(
                "Index out of range: row {} col {} on a {}x{} surface",
                row, col, nrows, ncols
            ))
        })?;
        *cell = value;
        Ok(())
    }

    pub fn set_at(&mut self, index: usize, value: f32) -> Result<()> {
        let (row, col) = self.grid.row_col(index)?;
        self.set(row, col, value)
    }
}

impl<S: RawData<Elem = f32>> RegularSurface<S> {
    pub fn grid(&self) -> &BoundedGrid {
        &self.grid
    }

    pub fn fillvalue(&self) -> f32 {
        self.fillvalue
    }

    pub fn nrows(&self) -> usize {
        self.grid.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.grid.ncols()
    }

    /// Number of cells
    pub fn size(&self) -> usize {
        self.grid.size()
    }

    pub fn to_cdp(&self, row: usize, col: usize) -> Result<Point> {
        self.grid.to_cdp(row, col)
    }

    pub fn to_cdp_index(&self, index: usize) -> Result<Point> {
        self.grid.to_cdp_index(index)
    }

    pub fn from_cdp(&self, point: Point) -> Point {
        self.grid.from_cdp(point)
    }
}

/// Resample `secondary` onto the grid of `primary` by nearest cell, writing
/// the result into `aligned`.
///
/// Cells where `primary` has no data, or whose world position falls outside
/// `secondary` or onto a secondary fill value, are set to `aligned`'s fill
/// value. Returns whether `primary` lies above `secondary`. Surfaces that are
/// equal everywhere count as primary on top.
pub fn align_surfaces<P, Q, A>(
    primary: &RegularSurface<P>,
    secondary: &RegularSurface<Q>,
    aligned: &mut RegularSurface<A>,
) -> Result<bool>
where
    P: Data<Elem = f32>,
    Q: Data<Elem = f32>,
    A: DataMut<Elem = f32>,
{
    if primary.grid() != aligned.grid() {
        return Err(SliceError::BadRequest(
            "Expected aligned surface to have the same plane as the primary surface".to_string(),
        ));
    }

    let mut primary_is_top: Option<bool> = None;

    for index in 0..primary.size() {
        let (row, col) = primary.grid().row_col(index)?;
        let reference = primary.value(row, col)?;
        if primary.is_fill(reference) {
            aligned.set(row, col, aligned.fillvalue())?;
            continue;
        }

        let position = secondary.from_cdp(primary.to_cdp(row, col)?);
        let nearest_row = position.x.round();
        let nearest_col = position.y.round();
        let inside = nearest_row >= 0.0
            && nearest_col >= 0.0
            && nearest_row < secondary.nrows() as f64
            && nearest_col < secondary.ncols() as f64;
        if !inside {
            aligned.set(row, col, aligned.fillvalue())?;
            continue;
        }

        let value = secondary.value(nearest_row as usize, nearest_col as usize)?;
        if secondary.is_fill(value) {
            aligned.set(row, col, aligned.fillvalue())?;
            continue;
        }

        if value != reference {
            let above = reference < value;
            match primary_is_top {
                None => primary_is_top = Some(above),
                Some(expected) if expected != above => {
                    return Err(SliceError::BadRequest(format!(
                        "Surfaces intersect at primary surface point ({}, {})",
                        row, col
                    )));
                }
                Some(_) => {}
            }
        }
        aligned.set(row, col, value)?;
    }

    Ok(primary_is_top.unwrap_or(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Grid;

    const FILL: f32 = -999.25;

    fn grid(nrows: usize, ncols: usize) -> BoundedGrid {
        BoundedGrid::new(Grid::new(0.0, 0.0, 1.0, 1.0, 0.0), nrows, ncols)
    }

    #[test]
    fn test_surface_access() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let surface = SurfaceView::from_slice(&data, grid(2, 3), FILL).unwrap();

        assert_eq!(surface.size(), 6);
        assert_eq!(surface.value(1, 0).unwrap(), 4.0);
        assert_eq!(surface.value_at(5).unwrap(), 6.0);
        assert!(matches!(
            surface.value(2, 0).unwrap_err(),
            SliceError::OutOfRange(_)
        ));
        assert!(surface.value(0, 3).is_err());
        assert!(surface.value_at(6).is_err());
    }

    #[test]
    fn test_surface_size_mismatch() {
        let data = vec![1.0, 2.0, 3.0];
        assert!(SurfaceView::from_slice(&data, grid(2, 2), FILL).is_err());
    }

    #[test]
    fn test_surface_write() {
        let mut data = vec![0.0; 4];
        {
            let mut surface = SurfaceViewMut::from_slice_mut(&mut data, grid(2, 2), FILL).unwrap();
            surface.set(0, 1, 7.0).unwrap();
            surface.set_at(2, 8.0).unwrap();
            assert!(surface.set_at(4, 1.0).is_err());
        }
        assert_eq!(data, vec![0.0, 7.0, 8.0, 0.0]);
    }

    #[test]
    fn test_surface_coordinates() {
        let bounded = BoundedGrid::new(Grid::new(100.0, 200.0, 10.0, 20.0, 0.0), 2, 2);
        let surface = Surface::filled(bounded, 1.0, FILL);
        assert_eq!(surface.to_cdp(1, 1).unwrap(), Point::new(110.0, 220.0));
        assert_eq!(
            surface.from_cdp(Point::new(105.0, 240.0)),
            Point::new(0.5, 2.0)
        );
        assert!(surface.to_cdp_index(4).is_err());
    }

    #[test]
    fn test_align_surfaces_nearest_cell() {
        let primary = Surface::from_vec(vec![10.0, 10.0, FILL, 10.0], grid(2, 2), FILL).unwrap();
        // offset by less than half a cell, so every cell maps onto its own index
        let secondary_grid = BoundedGrid::new(Grid::new(-0.4, 0.0, 1.0, 1.0, 0.0), 2, 2);
        let secondary =
            Surface::from_vec(vec![20.0, 21.0, 22.0, 23.0], secondary_grid, FILL).unwrap();
        let mut aligned = Surface::filled(grid(2, 2), 0.0, FILL);

        let primary_is_top = align_surfaces(&primary, &secondary, &mut aligned).unwrap();
        assert!(primary_is_top);
        assert_eq!(aligned.into_vec(), vec![20.0, 21.0, FILL, 23.0]);
    }

    #[test]
    fn test_align_surfaces_outside_secondary() {
        let primary = Surface::from_vec(vec![30.0, 30.0, 30.0, 30.0], grid(2, 2), FILL).unwrap();
        let secondary_grid = BoundedGrid::new(Grid::new(1.0, 0.0, 1.0, 1.0, 0.0), 2, 2);
        let secondary =
            Surface::from_vec(vec![20.0, FILL, 22.0, 23.0], secondary_grid, FILL).unwrap();
        let mut aligned = Surface::filled(grid(2, 2), 0.0, -1.0);

        let primary_is_top = align_surfaces(&primary, &secondary, &mut aligned).unwrap();
        assert!(!primary_is_top);
        assert_eq!(aligned.into_vec(), vec![-1.0, -1.0, 20.0, -1.0]);
    }

    #[test]
    fn test_align_surfaces_intersecting() {
        let primary = Surface::from_vec(vec![10.0, 30.0], grid(1, 2), FILL).unwrap();
        let secondary = Surface::from_vec(vec![20.0, 20.0], grid(1, 2), FILL).unwrap();
        let mut aligned = Surface::filled(grid(1, 2), 0.0, FILL);

        let err = align_surfaces(&primary, &secondary, &mut aligned).unwrap_err();
        assert!(err.to_string().contains("Surfaces intersect"));
    }

    #[test]
    fn test_align_surfaces_grid_mismatch() {
        let primary = Surface::filled(grid(2, 2), 1.0, FILL);
        let secondary = Surface::filled(grid(2, 2), 2.0, FILL);
        let mut aligned = Surface::filled(grid(2, 3), 0.0, FILL);
        assert!(align_surfaces(&primary, &secondary, &mut aligned).is_err());
    }
}
