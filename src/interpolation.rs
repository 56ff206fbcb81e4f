//! Resampling of raw trace windows onto a uniform vertical grid
//!
//! Interpolation uses the modified Akima piecewise cubic ("makima"). Its
//! node derivatives are weighted averages of neighbouring secant slopes,
//! which keeps it free of overshoot on flat or step-like data while still
//! reproducing linear trends exactly. End slopes are extended by quadratic
//! extrapolation.

use crate::error::{Result, SliceError};
use crate::subvolume::{RawSegment, ResampledSegment};

/// Modified Akima interpolant
///
/// Buffers are kept between fits, so refitting a spline of at most the same
/// size does not allocate.
#[derive(Debug, Clone, Default)]
pub struct Makima {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Secant slopes with two extrapolated slopes on either end
    slopes: Vec<f64>,
    derivatives: Vec<f64>,
}

impl Makima {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the interpolant through `(x, y)`. `x` must be strictly
    /// increasing.
    pub fn fit(
        &mut self,
        x: impl IntoIterator<Item = f64>,
        y: impl IntoIterator<Item = f64>,
    ) -> Result<()> {
        self.x.clear();
        self.y.clear();
        self.x.extend(x);
        self.y.extend(y);

        let n = self.x.len();
        if n != self.y.len() {
            return Err(SliceError::Runtime(format!(
                "Interpolation requires as many positions as values, got {} and {}",
                n,
                self.y.len()
            )));
        }
        if n < 2 {
            return Err(SliceError::Runtime(format!(
                "Interpolation requires at least 2 samples, got {}",
                n
            )));
        }
        if self.x.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(SliceError::Runtime(
                "Interpolation positions must be strictly increasing".to_string(),
            ));
        }

        self.slopes.clear();
        self.slopes.resize(n + 3, 0.0);
        for k in 0..n - 1 {
            self.slopes[k + 2] = (self.y[k + 1] - self.y[k]) / (self.x[k + 1] - self.x[k]);
        }

        // quadratic extrapolation; a single interval extends as a line
        let (first, second) = if n > 2 {
            (self.slopes[2], self.slopes[3])
        } else {
            (self.slopes[2], self.slopes[2])
        };
        self.slopes[1] = 2.0 * first - second;
        self.slopes[0] = 2.0 * self.slopes[1] - first;

        let (last, before_last) = if n > 2 {
            (self.slopes[n], self.slopes[n - 1])
        } else {
            (self.slopes[n], self.slopes[n])
        };
        self.slopes[n + 1] = 2.0 * last - before_last;
        self.slopes[n + 2] = 2.0 * self.slopes[n + 1] - last;

        self.derivatives.clear();
        self.derivatives.extend((0..n).map(|i| {
            let [m_im2, m_im1, m_i, m_ip1] = [
                self.slopes[i],
                self.slopes[i + 1],
                self.slopes[i + 2],
                self.slopes[i + 3],
            ];
            let w1 = (m_ip1 - m_i).abs() + (m_ip1 + m_i).abs() / 2.0;
            let w2 = (m_im1 - m_im2).abs() + (m_im1 + m_im2).abs() / 2.0;
            let derivative = (w1 * m_im1 + w2 * m_i) / (w1 + w2);
            if derivative.is_nan() {
                0.0
            } else {
                derivative
            }
        }));

        Ok(())
    }

    /// Number of nodes of the current fit
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Value of the interpolant at `at`, which must lie between the first
    /// and last node
    pub fn eval(&self, at: f64) -> Result<f64> {
        let n = self.x.len();
        if n < 2 {
            return Err(SliceError::Runtime(
                "Interpolation requires at least 2 samples, got none fitted".to_string(),
            ));
        }
        if !(at >= self.x[0] && at <= self.x[n - 1]) {
            return Err(SliceError::Runtime(format!(
                "Requested position {} is outside of interpolation range [{}, {}]",
                at,
                self.x[0],
                self.x[n - 1]
            )));
        }

        let k = self
            .x
            .partition_point(|&node| node <= at)
            .saturating_sub(1)
            .min(n - 2);

        let h = self.x[k + 1] - self.x[k];
        let t = (at - self.x[k]) / h;
        let t2 = t * t;
        let t3 = t2 * t;

        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        Ok(h00 * self.y[k]
            + h10 * h * self.derivatives[k]
            + h01 * self.y[k + 1]
            + h11 * h * self.derivatives[k + 1])
    }
}

/// Reusable resampling state for one worker
#[derive(Debug, Clone, Default)]
pub struct Resampler {
    spline: Makima,
}

impl Resampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpolate `src` at every sample position of `dst`
    pub fn resample(&mut self, src: &RawSegment<'_>, dst: &mut ResampledSegment<'_>) -> Result<()> {
        self.spline.fit(
            src.sample_positions(),
            src.values().iter().map(|&value| value as f64),
        )?;

        let top = dst.top_sample_position();
        let stepsize = dst.stepsize();
        for (k, value) in dst.data_mut().iter_mut().enumerate() {
            *value = self.spline.eval(top + k as f64 * stepsize)?;
        }
        Ok(())
    }
}

/// Interpolate `src` at every sample position of `dst`
pub fn resample(src: &RawSegment<'_>, dst: &mut ResampledSegment<'_>) -> Result<()> {
    Resampler::new().resample(src, dst)
}
