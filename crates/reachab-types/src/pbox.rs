use serde::{Deserialize, Serialize};

use crate::ReachabError;

/// Number of discretization bins used to approximate a p-box's pair of CDF
/// bounds. Fixed rather than configurable: the engine's arithmetic is written
/// once against this width, matching the "operations propagate bounds"
/// requirement without the combinatorial blowup of a variable-width scheme.
const BINS: usize = 24;

/// A probability box: a pair of CDF bounds over `[0, 1]`, represented here as
/// two length-[`BINS`] arrays of ascending quantile values (`lo`, the lower
/// envelope / upper CDF bound trace, and `hi`, the upper envelope / lower CDF
/// bound trace). Degenerate at a point `x` when `lo == hi == [x; BINS]`.
///
/// Arithmetic combines two boxes under an independence assumption: each
/// array is convolved against the other variable's corresponding array via
/// the full `BINS * BINS` cartesian product of pointwise results, which is
/// then re-binned down to `BINS` evenly-weighted quantiles. This is the
/// standard coarse numerical convolution used for independent p-box
/// arithmetic; it is not a Frechet (dependency-free) bound, because the
/// engine's own correctness model (§4.6) already establishes independence
/// between the quantities being combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PBox {
    lo: Vec<f64>,
    hi: Vec<f64>,
}

impl PBox {
    /// Build a p-box from explicit bounds, sorting each side ascending.
    /// Intended for callers constructing priors/edge probabilities from
    /// external input; `lo` and `hi` must have equal, nonzero length.
    pub fn from_bounds(mut lo: Vec<f64>, mut hi: Vec<f64>) -> Result<Self, ReachabError> {
        if lo.is_empty() || lo.len() != hi.len() {
            return Err(ReachabError::invalid_input(
                "PBox lo/hi arrays must be non-empty and equal length",
            ));
        }
        lo.sort_by(f64::total_cmp);
        hi.sort_by(f64::total_cmp);
        let pbox = PBox { lo, hi };
        pbox.validate()?;
        Ok(pbox)
    }

    /// A box degenerate at a single point (both bounds collapse to `x`).
    pub fn degenerate(x: f64) -> Self {
        PBox {
            lo: vec![x; BINS],
            hi: vec![x; BINS],
        }
    }

    pub fn validate(&self) -> Result<(), ReachabError> {
        if self.lo.len() != self.hi.len() || self.lo.is_empty() {
            return Err(ReachabError::invalid_input(
                "PBox lo/hi arrays must be non-empty and equal length",
            ));
        }
        for (&l, &h) in self.lo.iter().zip(&self.hi) {
            if !(0.0..=1.0).contains(&l) || !(0.0..=1.0).contains(&h) {
                return Err(ReachabError::invalid_input(format!(
                    "PBox bound {l}/{h} out of [0, 1]"
                )));
            }
        }
        Ok(())
    }

    /// §9 Open Question resolution: degenerate at 0 or 1, not merely
    /// sharply concentrated.
    pub fn is_degenerate_at_0_or_1(&self) -> bool {
        let ml = self.lo.first().copied().unwrap_or(f64::NAN);
        let mh = self.hi.last().copied().unwrap_or(f64::NAN);
        (ml == 0.0 && mh == 0.0) || (ml == 1.0 && mh == 1.0)
    }

    pub fn midpoint(&self) -> f64 {
        let lo_mid = self.lo.iter().sum::<f64>() / self.lo.len() as f64;
        let hi_mid = self.hi.iter().sum::<f64>() / self.hi.len() as f64;
        (lo_mid + hi_mid) / 2.0
    }

    fn combine(a: &[f64], b: &[f64], op: impl Fn(f64, f64) -> f64) -> Vec<f64> {
        let mut product = Vec::with_capacity(a.len() * b.len());
        for &x in a {
            for &y in b {
                product.push(op(x, y));
            }
        }
        product.sort_by(f64::total_cmp);
        downsample(&product, BINS)
    }

    pub fn add(&self, other: &Self) -> Self {
        PBox {
            lo: Self::combine(&self.lo, &other.lo, |x, y| x + y),
            hi: Self::combine(&self.hi, &other.hi, |x, y| x + y),
        }
    }

    pub fn sub(&self, other: &Self) -> Self {
        // lo' draws from (self.lo - other.hi), hi' from (self.hi - other.lo),
        // mirroring Moore interval subtraction.
        PBox {
            lo: Self::combine(&self.lo, &other.hi, |x, y| x - y),
            hi: Self::combine(&self.hi, &other.lo, |x, y| x - y),
        }
    }

    pub fn mul(&self, other: &Self) -> Self {
        PBox {
            lo: Self::combine(&self.lo, &other.lo, |x, y| x * y),
            hi: Self::combine(&self.hi, &other.hi, |x, y| x * y),
        }
    }

    pub fn complement(&self) -> Self {
        let mut lo: Vec<f64> = self.hi.iter().map(|h| 1.0 - h).collect();
        let mut hi: Vec<f64> = self.lo.iter().map(|l| 1.0 - l).collect();
        lo.sort_by(f64::total_cmp);
        hi.sort_by(f64::total_cmp);
        PBox { lo, hi }
    }
}

/// Downsample a sorted array to `n` evenly-weighted quantile representatives.
fn downsample(sorted: &[f64], n: usize) -> Vec<f64> {
    let len = sorted.len();
    (0..n)
        .map(|k| {
            // Index of the midpoint of the k-th of n equal-mass groups.
            let idx = ((k as f64 + 0.5) * len as f64 / n as f64) as usize;
            sorted[idx.min(len - 1)]
        })
        .collect()
}
