//! Attribute reducers and the attribute driver
//!
//! Every reducer turns one resampled column into a single value and writes
//! it into its own output buffer. The drivers walk a range of subvolume
//! cells, resample each non-empty cell once and hand the result to every
//! requested reducer.

use crate::error::{Result, SliceError};
use crate::interpolation::Resampler;
use crate::subvolume::{RawSegment, ResampledSegment, SurfaceBoundedSubVolume};
use crate::verticalwindow::ResampledSegmentBlueprint;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Attribute identifiers as they appear in requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttributeKind {
    Value,
    Min,
    Max,
    MaxAbs,
    Mean,
    MeanAbs,
    MeanPos,
    MeanNeg,
    Median,
    Rms,
    Var,
    Sd,
    SumPos,
    SumNeg,
    MinAt,
    MaxAt,
    MaxAbsAt,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 17] = [
        AttributeKind::Value,
        AttributeKind::Min,
        AttributeKind::Max,
        AttributeKind::MaxAbs,
        AttributeKind::Mean,
        AttributeKind::MeanAbs,
        AttributeKind::MeanPos,
        AttributeKind::MeanNeg,
        AttributeKind::Median,
        AttributeKind::Rms,
        AttributeKind::Var,
        AttributeKind::Sd,
        AttributeKind::SumPos,
        AttributeKind::SumNeg,
        AttributeKind::MinAt,
        AttributeKind::MaxAt,
        AttributeKind::MaxAbsAt,
    ];

    /// Wire identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeKind::Value => "VALUE",
            AttributeKind::Min => "MIN",
            AttributeKind::Max => "MAX",
            AttributeKind::MaxAbs => "MAXABS",
            AttributeKind::Mean => "MEAN",
            AttributeKind::MeanAbs => "MEANABS",
            AttributeKind::MeanPos => "MEANPOS",
            AttributeKind::MeanNeg => "MEANNEG",
            AttributeKind::Median => "MEDIAN",
            AttributeKind::Rms => "RMS",
            AttributeKind::Var => "VAR",
            AttributeKind::Sd => "SD",
            AttributeKind::SumPos => "SUMPOS",
            AttributeKind::SumNeg => "SUMNEG",
            AttributeKind::MinAt => "MINAT",
            AttributeKind::MaxAt => "MAXAT",
            AttributeKind::MaxAbsAt => "MAXABSAT",
        }
    }

    /// Whether a reducer exists for this attribute
    pub fn is_implemented(&self) -> bool {
        !matches!(
            self,
            AttributeKind::MinAt | AttributeKind::MaxAt | AttributeKind::MaxAbsAt
        )
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeKind {
    type Err = SliceError;

    fn from_str(s: &str) -> Result<Self> {
        AttributeKind::ALL
            .iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| SliceError::BadRequest(format!("Invalid attribute: {}", s)))
    }
}

/// Reduction of one resampled column
#[derive(Debug, Clone)]
enum Reducer {
    Value,
    Min,
    Max,
    MaxAbs,
    Mean,
    MeanAbs,
    MeanPos,
    MeanNeg,
    /// Selection reorders its input, so the median works on its own copy
    Median(Vec<f64>),
    Rms,
    Var,
    Sd,
    SumPos,
    SumNeg,
}

impl TryFrom<AttributeKind> for Reducer {
    type Error = SliceError;

    fn try_from(kind: AttributeKind) -> Result<Self> {
        let reducer = match kind {
            AttributeKind::Value => Reducer::Value,
            AttributeKind::Min => Reducer::Min,
            AttributeKind::Max => Reducer::Max,
            AttributeKind::MaxAbs => Reducer::MaxAbs,
            AttributeKind::Mean => Reducer::Mean,
            AttributeKind::MeanAbs => Reducer::MeanAbs,
            AttributeKind::MeanPos => Reducer::MeanPos,
            AttributeKind::MeanNeg => Reducer::MeanNeg,
            AttributeKind::Median => Reducer::Median(Vec::new()),
            AttributeKind::Rms => Reducer::Rms,
            AttributeKind::Var => Reducer::Var,
            AttributeKind::Sd => Reducer::Sd,
            AttributeKind::SumPos => Reducer::SumPos,
            AttributeKind::SumNeg => Reducer::SumNeg,
            AttributeKind::MinAt | AttributeKind::MaxAt | AttributeKind::MaxAbsAt => {
                return Err(SliceError::BadRequest(format!(
                    "Attribute not implemented: {}",
                    kind
                )))
            }
        };
        Ok(reducer)
    }
}

impl Reducer {
    fn compute(&mut self, segment: &ResampledSegment<'_>) -> f32 {
        let data = segment.data();
        let value = match self {
            Reducer::Value => data
                .get(segment.reference_index())
                .copied()
                .unwrap_or(f64::NAN),
            Reducer::Min => data.iter().copied().fold(f64::INFINITY, f64::min),
            Reducer::Max => data.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Reducer::MaxAbs => data.iter().fold(0.0, |acc: f64, x| acc.max(x.abs())),
            Reducer::Mean => mean(data.iter().copied()),
            Reducer::MeanAbs => mean(data.iter().map(|x| x.abs())),
            Reducer::MeanPos => mean(data.iter().copied().filter(|&x| x > 0.0)),
            Reducer::MeanNeg => mean(data.iter().copied().filter(|&x| x < 0.0)),
            Reducer::Median(scratch) => {
                scratch.clear();
                scratch.extend_from_slice(data);
                median(scratch)
            }
            Reducer::Rms => mean(data.iter().map(|x| x * x)).sqrt(),
            Reducer::Var => variance(data),
            Reducer::Sd => variance(data).sqrt(),
            Reducer::SumPos => data.iter().filter(|&&x| x > 0.0).sum::<f64>(),
            Reducer::SumNeg => data.iter().filter(|&&x| x < 0.0).sum::<f64>(),
        };
        value as f32
    }
}

/// Arithmetic mean, 0 for an empty input
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), x| (sum + x, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Population variance
fn variance(values: &[f64]) -> f64 {
    let mu = mean(values.iter().copied());
    mean(values.iter().map(|x| (x - mu) * (x - mu)))
}

/// Exact median by selection. Reorders `values`.
fn median(values: &mut [f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let middle = n / 2;
    let (left, upper, _) = values.select_nth_unstable_by(middle, f64::total_cmp);
    let upper = *upper;
    if n % 2 == 1 {
        return upper;
    }
    let lower = left.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (lower + upper) / 2.0
}

/// One requested attribute and its output buffer
///
/// `offset` is the cell index of `dst[0]`, so a map over a chunk of the
/// full output is still addressed with absolute cell indices.
#[derive(Debug)]
pub struct AttributeMap<'b> {
    kind: AttributeKind,
    reducer: Reducer,
    dst: &'b mut [f32],
    offset: usize,
}

impl<'b> AttributeMap<'b> {
    pub fn new(kind: AttributeKind, dst: &'b mut [f32]) -> Result<Self> {
        Self::with_offset(kind, dst, 0)
    }

    pub fn with_offset(kind: AttributeKind, dst: &'b mut [f32], offset: usize) -> Result<Self> {
        Ok(Self {
            kind,
            reducer: Reducer::try_from(kind)?,
            dst,
            offset,
        })
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    pub fn compute(&mut self, segment: &ResampledSegment<'_>) -> f32 {
        self.reducer.compute(segment)
    }

    /// Store `value` for cell `index`
    pub fn write(&mut self, value: f32, index: usize) -> Result<()> {
        let size = self.dst.len() * std::mem::size_of::<f32>();
        let slot = index
            .checked_sub(self.offset)
            .filter(|&i| i < self.dst.len())
            .ok_or_else(|| {
                SliceError::OutOfRange(format!(
                    "Attempting to write outside of buffer: {} attribute for cell {}, \
                     buffer covers cells [{}, {}) ({} bytes)",
                    self.kind,
                    index,
                    self.offset,
                    self.offset + self.dst.len(),
                    size
                ))
            })?;
        self.dst[slot] = value;
        Ok(())
    }
}

/// Compute `attributes` for cells `[from, to)` of `subvolume`.
///
/// Empty cells get the reference surface's fill value. Fails on the first
/// error, leaving the outputs partially written.
pub fn calc_attributes(
    subvolume: &SurfaceBoundedSubVolume<'_>,
    dst_blueprint: &ResampledSegmentBlueprint,
    attributes: &mut [AttributeMap<'_>],
    from: usize,
    to: usize,
) -> Result<()> {
    if from > to || to > subvolume.hsize() {
        return Err(SliceError::BadRequest(format!(
            "Invalid cell range [{}, {}) for subvolume with {} cells",
            from,
            to,
            subvolume.hsize()
        )));
    }

    let fillvalue = subvolume.fillvalue();
    let mut raw = RawSegment::new(subvolume.geometry().raw_blueprint());
    let mut resampled = ResampledSegment::new(dst_blueprint);
    let mut resampler = Resampler::new();

    for index in from..to {
        if subvolume.is_empty(index) {
            for attribute in attributes.iter_mut() {
                attribute.write(fillvalue, index)?;
            }
            continue;
        }

        subvolume.reinitialize_raw(index, &mut raw)?;
        subvolume.reinitialize_resampled(index, &mut resampled)?;
        resampler.resample(&raw, &mut resampled)?;

        for attribute in attributes.iter_mut() {
            let value = attribute.compute(&resampled);
            attribute.write(value, index)?;
        }
    }
    Ok(())
}

/// Compute `kinds` for every cell of `subvolume` on the rayon thread pool.
///
/// `outputs[k]` receives attribute `kinds[k]` and must hold one value per
/// cell. Cells are processed in runs of `partition_size`.
pub fn calc_attributes_parallel(
    subvolume: &SurfaceBoundedSubVolume<'_>,
    dst_blueprint: &ResampledSegmentBlueprint,
    kinds: &[AttributeKind],
    outputs: &mut [Vec<f32>],
    partition_size: usize,
) -> Result<()> {
    let hsize = subvolume.hsize();
    if partition_size == 0 {
        return Err(SliceError::BadRequest(
            "Partition size must be positive".to_string(),
        ));
    }
    if kinds.len() != outputs.len() {
        return Err(SliceError::BadRequest(format!(
            "Expected one output buffer per attribute, got {} attributes and {} buffers",
            kinds.len(),
            outputs.len()
        )));
    }
    if let Some(output) = outputs.iter().find(|output| output.len() != hsize) {
        return Err(SliceError::BadRequest(format!(
            "Output buffer holds {} values, expected {}",
            output.len(),
            hsize
        )));
    }

    let mut chunks: Vec<_> = outputs
        .iter_mut()
        .map(|output| output.chunks_mut(partition_size))
        .collect();

    let mut partitions = Vec::with_capacity(hsize.div_ceil(partition_size));
    for from in (0..hsize).step_by(partition_size) {
        let to = (from + partition_size).min(hsize);
        let maps = kinds
            .iter()
            .zip(chunks.iter_mut())
            .map(|(&kind, chunks)| {
                let chunk = chunks.next().ok_or_else(|| {
                    SliceError::Runtime(format!("Missing output chunk for cells [{}, {})", from, to))
                })?;
                AttributeMap::with_offset(kind, chunk, from)
            })
            .collect::<Result<Vec<_>>>()?;
        partitions.push((from, to, maps));
    }

    log::debug!(
        "Computing {} attribute(s) over {} cells in {} partition(s)",
        kinds.len(),
        hsize,
        partitions.len()
    );

    partitions
        .into_par_iter()
        .try_for_each(|(from, to, mut maps)| {
            calc_attributes(subvolume, dst_blueprint, &mut maps, from, to)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subvolume::make_subvolume;
    use crate::subvolume::tests::{create_metadata, grid, FILL};
    use crate::surface::Surface;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn compute(kind: AttributeKind, values: &[f64]) -> f32 {
        let mut reducer = Reducer::try_from(kind).unwrap();
        // reference at the top so the resampled window covers exactly `values`
        let blueprint = ResampledSegmentBlueprint::new(1.0).unwrap();
        let mut segment = ResampledSegment::new(&blueprint);
        segment.reinitialize(crate::subvolume::Boundaries {
            reference: 0.0,
            top: 0.0,
            bottom: values.len() as f64 - 1.0,
        });
        segment.data_mut().copy_from_slice(values);
        reducer.compute(&segment)
    }

    #[test]
    fn test_attribute_names() {
        assert_eq!("MAXABS".parse::<AttributeKind>().unwrap(), AttributeKind::MaxAbs);
        assert_eq!("meanneg".parse::<AttributeKind>().unwrap(), AttributeKind::MeanNeg);
        let err = "MODE".parse::<AttributeKind>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid attribute: MODE");

        let kinds: Vec<AttributeKind> =
            serde_json::from_str(r#"["VALUE", "SUMPOS", "MAXABSAT"]"#).unwrap();
        assert_eq!(
            kinds,
            vec![AttributeKind::Value, AttributeKind::SumPos, AttributeKind::MaxAbsAt]
        );
        for kind in AttributeKind::ALL {
            assert_eq!(kind.to_string().parse::<AttributeKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_positional_attributes_not_implemented() {
        let mut buffer = vec![0.0f32; 1];
        for kind in [AttributeKind::MinAt, AttributeKind::MaxAt, AttributeKind::MaxAbsAt] {
            assert!(!kind.is_implemented());
            let err = AttributeMap::new(kind, &mut buffer).unwrap_err();
            assert_eq!(err.to_string(), format!("Attribute not implemented: {}", kind));
        }
    }

    #[test]
    fn test_reducers() {
        let values = [2.0, -4.0, 4.0, -1.0, 5.0];
        assert_eq!(compute(AttributeKind::Min, &values), -4.0);
        assert_eq!(compute(AttributeKind::Max, &values), 5.0);
        assert_eq!(compute(AttributeKind::MaxAbs, &[2.0, -6.0, 5.0]), 6.0);
        assert_eq!(compute(AttributeKind::Mean, &values), 1.2);
        assert_eq!(compute(AttributeKind::MeanAbs, &values), 3.2);
        assert!((compute(AttributeKind::MeanPos, &values) - 11.0 / 3.0).abs() < 1e-6);
        assert_eq!(compute(AttributeKind::MeanNeg, &values), -2.5);
        assert_eq!(compute(AttributeKind::SumPos, &values), 11.0);
        assert_eq!(compute(AttributeKind::SumNeg, &values), -5.0);
        assert!((compute(AttributeKind::Rms, &[3.0, -4.0]) - 12.5f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_mean_of_sign_without_qualifying_values() {
        assert_eq!(compute(AttributeKind::MeanPos, &[-1.0, -2.0, 0.0]), 0.0);
        assert_eq!(compute(AttributeKind::MeanNeg, &[1.0, 2.0, 0.0]), 0.0);
        assert_eq!(compute(AttributeKind::SumPos, &[-1.0]), 0.0);
    }

    #[test]
    fn test_population_variance() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(compute(AttributeKind::Var, &values), 4.0);
        assert_eq!(compute(AttributeKind::Sd, &values), 2.0);
    }

    #[test]
    fn test_median() {
        assert_eq!(compute(AttributeKind::Median, &[1.0, 5.0, 3.0]), 3.0);
        assert_eq!(compute(AttributeKind::Median, &[4.0, 2.0, 3.0, 1.0]), 2.5);
        assert_eq!(compute(AttributeKind::Median, &[7.0]), 7.0);
    }

    #[test]
    fn test_median_matches_full_sort() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let n = rng.random_range(1..40);
            let mut values: Vec<f64> = (0..n).map(|_| rng.random_range(-10.0..10.0)).collect();
            // duplicates
            if n > 3 {
                values[1] = values[0];
            }

            let mut sorted = values.clone();
            sorted.sort_by(f64::total_cmp);
            let expected = if n % 2 == 1 {
                sorted[n / 2]
            } else {
                (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
            };

            assert_eq!(median(&mut values), expected);
        }
    }

    #[test]
    fn test_median_does_not_disturb_value() {
        let blueprint = ResampledSegmentBlueprint::new(1.0).unwrap();
        let mut segment = ResampledSegment::new(&blueprint);
        segment.reinitialize(crate::subvolume::Boundaries {
            reference: 2.0,
            top: 0.0,
            bottom: 4.0,
        });
        segment.data_mut().copy_from_slice(&[9.0, 8.0, 1.0, 7.0, 6.0]);

        let mut median_buffer = vec![0.0f32; 1];
        let mut value_buffer = vec![0.0f32; 1];
        let mut median = AttributeMap::new(AttributeKind::Median, &mut median_buffer).unwrap();
        let mut value = AttributeMap::new(AttributeKind::Value, &mut value_buffer).unwrap();
        assert_eq!(median.compute(&segment), 7.0);
        assert_eq!(value.compute(&segment), 1.0);
    }

    #[test]
    fn test_write_outside_buffer() {
        let mut buffer = vec![0.0f32; 2];
        {
            let mut map = AttributeMap::new(AttributeKind::Min, &mut buffer).unwrap();
            map.write(1.0, 1).unwrap();
            let err = map.write(5.0, 2).unwrap_err();
            assert!(err
                .to_string()
                .starts_with("Attempting to write outside of buffer"));
            assert_eq!(err.kind(), crate::error::ErrorKind::BadRequest);
        }
        assert_eq!(buffer, vec![0.0, 1.0]);

        let mut chunk = vec![0.0f32; 2];
        let mut map = AttributeMap::with_offset(AttributeKind::Max, &mut chunk, 4).unwrap();
        assert!(map.write(1.0, 3).is_err());
        map.write(2.0, 5).unwrap();
        assert!(map.write(1.0, 6).is_err());
    }

    /// Two cells at inline 0 and 1, each trace holding `trace[k] = k * k`
    /// at sample `4 * k`
    fn quadratic_subvolume_values() -> Vec<f32> {
        (0..8).map(|k| (k * k) as f32).collect()
    }

    #[test]
    fn test_calc_attributes_min_max() {
        let metadata = create_metadata();
        let g = grid(0.0, 2, 1);
        let reference = Surface::from_vec(vec![12.0, 14.0], g, FILL).unwrap();
        let top = Surface::from_vec(vec![8.0, 10.0], g, FILL).unwrap();
        let bottom = Surface::from_vec(vec![16.0, 18.0], g, FILL).unwrap();
        let mut subvolume = make_subvolume(&metadata, &reference, &top, &bottom).unwrap();

        let trace = quadratic_subvolume_values();
        for index in 0..2 {
            let first = subvolume
                .geometry()
                .first_sample_index(index, &metadata)
                .unwrap();
            let segment = subvolume.segment_mut(index).unwrap();
            let len = segment.len();
            segment.copy_from_slice(&trace[first..first + len]);
        }

        let blueprint = ResampledSegmentBlueprint::new(4.0).unwrap();
        let mut min = vec![0.0f32; 2];
        let mut max = vec![0.0f32; 2];
        {
            let mut maps = vec![
                AttributeMap::new(AttributeKind::Min, &mut min).unwrap(),
                AttributeMap::new(AttributeKind::Max, &mut max).unwrap(),
            ];
            calc_attributes(&subvolume, &blueprint, &mut maps, 0, 2).unwrap();
        }

        // cell 0 resamples at 8, 12, 16 (raw samples 2, 3, 4)
        assert!((min[0] - 4.0).abs() < 1e-3);
        assert!((max[0] - 16.0).abs() < 1e-3);
        // cell 1 is anchored at 14: 10, 14, 18 fall between raw samples 1..=6
        assert!((min[1] - 6.239583).abs() < 1e-3);
        assert!((max[1] - 20.245833).abs() < 1e-3);
    }

    #[test]
    fn test_calc_attributes_linear_data() {
        let metadata = create_metadata();
        let g = grid(0.0, 2, 1);
        let reference = Surface::from_vec(vec![12.0, 14.0], g, FILL).unwrap();
        let top = Surface::from_vec(vec![8.0, 10.0], g, FILL).unwrap();
        let bottom = Surface::from_vec(vec![16.0, 18.0], g, FILL).unwrap();
        let mut subvolume = make_subvolume(&metadata, &reference, &top, &bottom).unwrap();

        // value == depth on every trace
        for index in 0..2 {
            let first = subvolume
                .geometry()
                .first_sample_index(index, &metadata)
                .unwrap();
            for (k, value) in subvolume.segment_mut(index).unwrap().iter_mut().enumerate() {
                *value = 4.0 * (first + k) as f32;
            }
        }

        let blueprint = ResampledSegmentBlueprint::new(4.0).unwrap();
        let kinds = [AttributeKind::Min, AttributeKind::Max, AttributeKind::Value];
        let mut outputs = vec![vec![0.0f32; 2]; 3];
        calc_attributes_parallel(&subvolume, &blueprint, &kinds, &mut outputs, 1).unwrap();

        let expected = [[8.0, 10.0], [16.0, 18.0], [12.0, 14.0]];
        for (output, expected) in outputs.iter().zip(expected.iter()) {
            for (actual, expected) in output.iter().zip(expected.iter()) {
                assert!((actual - expected).abs() < 1e-3, "{} != {}", actual, expected);
            }
        }
    }

    #[test]
    fn test_fill_propagation() {
        let metadata = create_metadata();
        let g = grid(0.0, 2, 2);
        let reference = Surface::from_vec(vec![12.0, FILL, 12.0, 12.0], g, FILL).unwrap();
        let top = Surface::from_vec(vec![8.0, 8.0, FILL, 8.0], g, FILL).unwrap();
        let bottom = Surface::from_vec(vec![16.0, 16.0, 16.0, 16.0], g, FILL).unwrap();
        let mut subvolume = make_subvolume(&metadata, &reference, &top, &bottom).unwrap();
        subvolume.data_mut().fill(1.0);

        let blueprint = ResampledSegmentBlueprint::new(2.0).unwrap();
        let kinds: Vec<AttributeKind> = AttributeKind::ALL
            .iter()
            .copied()
            .filter(AttributeKind::is_implemented)
            .collect();
        let mut outputs = vec![vec![0.0f32; 4]; kinds.len()];
        calc_attributes_parallel(&subvolume, &blueprint, &kinds, &mut outputs, 3).unwrap();

        for output in &outputs {
            assert_eq!(output[1], FILL);
            assert_eq!(output[2], FILL);
            assert_ne!(output[0], FILL);
            assert_ne!(output[3], FILL);
        }
    }

    #[test]
    fn test_calc_attributes_parallel_validation() {
        let metadata = create_metadata();
        let g = grid(0.0, 1, 2);
        let reference = Surface::from_vec(vec![12.0, 12.0], g, FILL).unwrap();
        let top = Surface::from_vec(vec![8.0, 8.0], g, FILL).unwrap();
        let bottom = Surface::from_vec(vec![16.0, 16.0], g, FILL).unwrap();
        let subvolume = make_subvolume(&metadata, &reference, &top, &bottom).unwrap();
        let blueprint = ResampledSegmentBlueprint::new(4.0).unwrap();

        let kinds = [AttributeKind::Mean];
        let mut wrong_size = vec![vec![0.0f32; 3]];
        assert!(calc_attributes_parallel(&subvolume, &blueprint, &kinds, &mut wrong_size, 8).is_err());

        let mut outputs = vec![vec![0.0f32; 2]];
        assert!(calc_attributes_parallel(&subvolume, &blueprint, &kinds, &mut outputs, 0).is_err());

        let kinds = [AttributeKind::MinAt];
        let err = calc_attributes_parallel(&subvolume, &blueprint, &kinds, &mut outputs, 8)
            .unwrap_err();
        assert_eq!(err.to_string(), "Attribute not implemented: MINAT");

        let mut buffer = vec![0.0f32; 2];
        let mut maps = vec![AttributeMap::new(AttributeKind::Mean, &mut buffer).unwrap()];
        assert!(calc_attributes(&subvolume, &blueprint, &mut maps, 1, 3).is_err());
    }
}
