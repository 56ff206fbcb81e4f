//! vdsslice - slices, fences and horizon attributes from 3D seismic volumes
//!
//! Reads 2D slices and arbitrary trace fences out of a regular seismic volume
//! addressed by inline, crossline and sample, and computes per-trace
//! statistical attributes over vertical windows bounded by horizon surfaces.
//!
//! # Features
//!
//! - Slices along inline, crossline and time/depth, by annotation or index
//! - Fences in index, annotation or world (cdp) coordinates
//! - Surface-bounded subvolumes with ragged per-trace windows, fetched
//!   concurrently
//! - Modified Akima resampling onto a uniform vertical grid
//! - Attributes (min, max, mean, median, RMS, variance, ...) computed in
//!   parallel with rayon
//!
//! # Storage
//!
//! vdsslice does not read any storage format itself. Implement the
//! [`DataSource`] trait for your backend; [`MemoryDataSource`] serves a volume
//! held in an `ndarray`.
//!
//! # Logging
//!
//! Progress is reported through the `log` facade. Install any logger in the
//! application to see it.
//!
//! # Example
//!
//! ```rust,ignore
//! use vdsslice::{AttributeKind, AttributeOptions, SeismicVolume, Surface};
//!
//! # async fn example(volume: SeismicVolume, horizon: Surface) -> vdsslice::Result<()> {
//! let options = AttributeOptions::new([AttributeKind::Rms, AttributeKind::Median]);
//! let attributes = volume
//!     .attributes_along_surface(&horizon, 20.0, 20.0, &options)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod attribute;
pub mod config;
pub mod error;
pub mod geometry;
pub mod interpolation;
pub mod io;
pub mod metadata;
pub mod subvolume;
pub mod surface;
pub mod types;
pub mod utils;
pub mod verticalwindow;

// Re-exports
pub use access::{SeismicVolume, Slice};
pub use attribute::{calc_attributes, calc_attributes_parallel, AttributeKind, AttributeMap};
pub use config::AttributeOptions;
pub use error::{ErrorKind, Result, SliceError};
pub use geometry::{AffineTransformation, BoundedGrid, Grid, Point};
pub use interpolation::{resample, Makima, Resampler};
pub use io::{DataSource, MemoryDataSource, SubcubeBounds};
pub use metadata::{BoundingBox, CoordinateTransformer, VolumeMetadata};
pub use subvolume::{make_subvolume, SurfaceBoundedSubVolume};
pub use surface::{align_surfaces, RegularSurface, Surface, SurfaceView, SurfaceViewMut};
pub use types::{Axis, CoordinateSystem, Direction, Interpolation};
pub use verticalwindow::{RawSegmentBlueprint, ResampledSegmentBlueprint};

/// Version of the vdsslice implementation
pub const VDSSLICE_VERSION: &str = env!("CARGO_PKG_VERSION");
