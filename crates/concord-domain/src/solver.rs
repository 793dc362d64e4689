//! One-dimensional root finders
//!
//! Brent's method for bracketed roots, a bracket-extending wrapper, and a
//! monotone dichotomy for threshold searches.

use std::fmt;

/// Failure of a root finder
#[derive(Debug, Clone, PartialEq)]
pub enum SolveError {
    /// `f(a)` and `f(b)` have the same sign
    NoSignChange {
        /// Lower end of the bracket
        a: f64,
        /// Upper end of the bracket
        b: f64,
    },

    /// The iteration budget ran out
    MaxIterations {
        /// Iterations performed
        iterations: usize,
        /// Best estimate when stopping
        best: f64,
    },
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::NoSignChange { a, b } => {
                write!(f, "No sign change on the bracket [{}, {}]", a, b)
            }
            SolveError::MaxIterations { iterations, best } => {
                write!(f, "No convergence after {} iterations (best estimate {})", iterations, best)
            }
        }
    }
}

impl std::error::Error for SolveError {}

/// Default iteration budget of [`brentq`]
pub const DEFAULT_MAX_ITER: usize = 200;

const RTOL: f64 = 4.0 * f64::EPSILON;

/// Find a root of `f` on `[a, b]` with Brent's method
///
/// `f(a)` and `f(b)` must have opposite signs (or one of them be zero).
/// Stops when the bracket is narrower than `xtol` (plus a tiny relative term).
///
/// # Examples
///
/// ```
/// use concord_domain::solver::brentq;
///
/// let root = brentq(|x| x * x - 2.0, 0.0, 2.0, 1e-12, 100).unwrap();
/// assert!((root - 2f64.sqrt()).abs() < 1e-10);
/// ```
pub fn brentq<F>(mut f: F, a: f64, b: f64, xtol: f64, max_iter: usize) -> Result<f64, SolveError>
where
    F: FnMut(f64) -> f64,
{
    let (mut xpre, mut xcur) = (a, b);
    let (mut fpre, mut fcur) = (f(xpre), f(xcur));

    if fpre == 0.0 {
        return Ok(xpre);
    }
    if fcur == 0.0 {
        return Ok(xcur);
    }
    if fpre.signum() == fcur.signum() || fpre.is_nan() || fcur.is_nan() {
        return Err(SolveError::NoSignChange { a, b });
    }

    let (mut xblk, mut fblk) = (0.0, 0.0);
    let (mut spre, mut scur) = (0.0, 0.0);

    for _ in 0..max_iter {
        if fpre != 0.0 && fcur != 0.0 && fpre.signum() != fcur.signum() {
            xblk = xpre;
            fblk = fpre;
            spre = xcur - xpre;
            scur = spre;
        }
        if fblk.abs() < fcur.abs() {
            xpre = xcur;
            xcur = xblk;
            xblk = xpre;
            fpre = fcur;
            fcur = fblk;
            fblk = fpre;
        }

        let delta = (xtol + RTOL * xcur.abs()) / 2.0;
        let sbis = (xblk - xcur) / 2.0;
        if fcur == 0.0 || sbis.abs() < delta {
            return Ok(xcur);
        }

        if spre.abs() > delta && fcur.abs() < fpre.abs() {
            let stry = if xpre == xblk {
                // secant
                -fcur * (xcur - xpre) / (fcur - fpre)
            } else {
                // inverse quadratic interpolation
                let dpre = (fpre - fcur) / (xpre - xcur);
                let dblk = (fblk - fcur) / (xblk - xcur);
                -fcur * (fblk * dblk - fpre * dpre) / (dblk * dpre * (fblk - fpre))
            };
            if 2.0 * stry.abs() < spre.abs().min(3.0 * sbis.abs() - delta) {
                spre = scur;
                scur = stry;
            } else {
                spre = sbis;
                scur = sbis;
            }
        } else {
            spre = sbis;
            scur = sbis;
        }

        xpre = xcur;
        fpre = fcur;
        if scur.abs() > delta {
            xcur += scur;
        } else if sbis > 0.0 {
            xcur += delta;
        } else {
            xcur -= delta;
        }
        fcur = f(xcur);
    }

    Err(SolveError::MaxIterations {
        iterations: max_iter,
        best: xcur,
    })
}

/// Like [`brentq`], doubling the bracket around its center until the sign changes
pub fn brentq_extending<F>(mut f: F, a: f64, b: f64, xtol: f64, max_iter: usize) -> Result<f64, SolveError>
where
    F: FnMut(f64) -> f64,
{
    let center = (a + b) / 2.0;
    let mut half_width = ((b - a) / 2.0).abs().max(1.0);
    let (mut lo, mut hi) = (center - half_width, center + half_width);
    for _ in 0..64 {
        let (flo, fhi) = (f(lo), f(hi));
        if flo == 0.0 || fhi == 0.0 || flo.signum() != fhi.signum() {
            return brentq(f, lo, hi, xtol, max_iter);
        }
        half_width *= 2.0;
        lo = center - half_width;
        hi = center + half_width;
    }
    Err(SolveError::NoSignChange { a: lo, b: hi })
}

/// Bisect a monotone predicate on `[lo, hi]`
///
/// `exceeds(x)` must be false below some threshold and true above it.
/// Returns the lower end of the final bracket, so `exceeds` is false at the
/// result whenever it is false at `lo`.
pub fn dichotomy<P>(mut exceeds: P, mut lo: f64, mut hi: f64, xtol: f64) -> f64
where
    P: FnMut(f64) -> bool,
{
    while hi - lo > xtol {
        let mid = (lo + hi) / 2.0;
        if mid <= lo || mid >= hi {
            break;
        }
        if exceeds(mid) {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    lo
}
