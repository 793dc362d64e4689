//! Score module - values with asymmetric uncertainties

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A score value with left and right uncertainties
///
/// Represents the interval `[value - left_unc, value + right_unc]`.
/// Arithmetic between scores is interval arithmetic: the result encloses
/// every value reachable from the operand intervals.
///
/// A NaN score has `value = NaN` and both uncertainties infinite. NaN is
/// absorbing for every operation.
#[derive(Debug, Clone, Copy)]
pub struct Score {
    /// Point estimate
    pub value: f64,
    /// Distance from `value` to the lower end of the interval (>= 0)
    pub left_unc: f64,
    /// Distance from `value` to the upper end of the interval (>= 0)
    pub right_unc: f64,
}

impl Score {
    /// Create a new score
    ///
    /// A NaN value yields [`Score::nan`].
    ///
    /// # Panics
    /// Panics if an uncertainty is negative
    pub fn new(value: f64, left_unc: f64, right_unc: f64) -> Self {
        if value.is_nan() {
            return Self::nan();
        }
        assert!(left_unc >= 0.0, "Left uncertainty must be >= 0, got {}", left_unc);
        assert!(right_unc >= 0.0, "Right uncertainty must be >= 0, got {}", right_unc);

        Self { value, left_unc, right_unc }
    }

    /// A score without uncertainty
    pub fn exact(value: f64) -> Self {
        Self::new(value, 0.0, 0.0)
    }

    /// A score with the same uncertainty on both sides
    pub fn symmetric(value: f64, uncertainty: f64) -> Self {
        Self::new(value, uncertainty, uncertainty)
    }

    /// The NaN score
    pub fn nan() -> Self {
        Self {
            value: f64::NAN,
            left_unc: f64::INFINITY,
            right_unc: f64::INFINITY,
        }
    }

    /// Build a score from its value and interval bounds, clipping rounding noise
    fn from_bounds(value: f64, min: f64, max: f64) -> Self {
        if value.is_nan() || min.is_nan() || max.is_nan() {
            return Self::nan();
        }
        Self {
            value,
            left_unc: (value - min).max(0.0),
            right_unc: (max - value).max(0.0),
        }
    }

    /// Lower end of the interval
    pub fn min(&self) -> f64 {
        self.value - self.left_unc
    }

    /// Upper end of the interval
    pub fn max(&self) -> f64 {
        self.value + self.right_unc
    }

    /// Whether this is the NaN score
    pub fn is_nan(&self) -> bool {
        self.value.is_nan() || (self.left_unc.is_infinite() && self.right_unc.is_infinite())
    }

    /// Whether the value and both uncertainties are finite
    pub fn is_finite(&self) -> bool {
        self.value.is_finite() && self.left_unc.is_finite() && self.right_unc.is_finite()
    }

    /// Whether the interval contains `x`
    pub fn contains(&self, x: f64) -> bool {
        self.min() <= x && x <= self.max()
    }

    /// Mean of the left and right uncertainties
    pub fn average_uncertainty(&self) -> f64 {
        (self.left_unc + self.right_unc) / 2.0
    }

    /// `(value, left_unc, right_unc)`
    pub fn to_triplet(&self) -> (f64, f64, f64) {
        (self.value, self.left_unc, self.right_unc)
    }

    /// True if the whole interval lies strictly below `other`'s interval
    pub fn definitely_less_than(&self, other: &Score) -> bool {
        self.max() < other.min()
    }

    /// True if the whole interval lies strictly above `other`'s interval
    pub fn definitely_greater_than(&self, other: &Score) -> bool {
        self.min() > other.max()
    }

    /// Absolute value, folding the interval about zero
    pub fn abs(&self) -> Score {
        if self.is_nan() {
            return Self::nan();
        }
        if self.contains(0.0) {
            let value = self.value.abs();
            let max = self.min().abs().max(self.max());
            return Self::from_bounds(value, 0.0, max);
        }
        if self.value > 0.0 {
            *self
        } else {
            Self {
                value: -self.value,
                left_unc: self.right_unc,
                right_unc: self.left_unc,
            }
        }
    }

    /// Image of both intervals' corners under `op`, or NaN if any corner is NaN
    fn corners(&self, other: &Score, op: impl Fn(f64, f64) -> f64) -> Score {
        let value = op(self.value, other.value);
        let extremes = [
            op(self.min(), other.min()),
            op(self.min(), other.max()),
            op(self.max(), other.min()),
            op(self.max(), other.max()),
        ];
        if extremes.iter().any(|e| e.is_nan()) {
            return Self::nan();
        }
        let min = extremes.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = extremes.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Self::from_bounds(value, min, max)
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::nan()
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        if self.is_nan() || other.is_nan() {
            return self.is_nan() && other.is_nan();
        }
        self.to_triplet() == other.to_triplet()
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ± [-{}, +{}]", self.value, self.left_unc, self.right_unc)
    }
}

impl Neg for Score {
    type Output = Score;

    fn neg(self) -> Score {
        if self.is_nan() {
            return Score::nan();
        }
        Score {
            value: -self.value,
            left_unc: self.right_unc,
            right_unc: self.left_unc,
        }
    }
}

impl Add for Score {
    type Output = Score;

    fn add(self, other: Score) -> Score {
        if self.is_nan() || other.is_nan() {
            return Score::nan();
        }
        Score {
            value: self.value + other.value,
            left_unc: self.left_unc + other.left_unc,
            right_unc: self.right_unc + other.right_unc,
        }
    }
}

impl Sub for Score {
    type Output = Score;

    fn sub(self, other: Score) -> Score {
        self + (-other)
    }
}

impl Mul for Score {
    type Output = Score;

    fn mul(self, other: Score) -> Score {
        if self.is_nan() || other.is_nan() {
            return Score::nan();
        }
        self.corners(&other, |a, b| a * b)
    }
}

impl Div for Score {
    type Output = Score;

    /// Returns NaN when the divisor interval contains zero
    fn div(self, other: Score) -> Score {
        if self.is_nan() || other.is_nan() || other.contains(0.0) {
            return Score::nan();
        }
        self.corners(&other, |a, b| a / b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_creation() {
        let s = Score::new(2.0, 0.5, 1.0);
        assert_eq!(s.min(), 1.5);
        assert_eq!(s.max(), 3.0);
        assert!(s.contains(2.9));
        assert!(!s.contains(3.1));
    }

    #[test]
    #[should_panic]
    fn test_negative_uncertainty() {
        Score::new(1.0, -0.1, 0.0);
    }

    #[test]
    fn test_nan_value_gives_nan_score() {
        let s = Score::new(f64::NAN, 0.0, 0.0);
        assert!(s.is_nan());
        assert!(s.left_unc.is_infinite() && s.right_unc.is_infinite());
        assert_eq!(s, Score::nan());
    }

    #[test]
    fn test_negation_swaps_uncertainties() {
        let s = -Score::new(1.0, 0.2, 0.7);
        assert_eq!(s.to_triplet(), (-1.0, 0.7, 0.2));
    }

    #[test]
    fn test_addition_and_subtraction() {
        let a = Score::new(1.0, 0.1, 0.2);
        let b = Score::new(2.0, 0.3, 0.4);
        let sum = a + b;
        assert!((sum.value - 3.0).abs() < 1e-12);
        assert!((sum.left_unc - 0.4).abs() < 1e-12);
        assert!((sum.right_unc - 0.6).abs() < 1e-12);

        let diff = b - a;
        assert!((diff.value - 1.0).abs() < 1e-12);
        // [1.7, 2.4] - [0.9, 1.2] = [0.5, 1.5]
        assert!((diff.left_unc - 0.5).abs() < 1e-12);
        assert!((diff.right_unc - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_multiplication_encloses_corners() {
        let a = Score::new(2.0, 1.0, 1.0); // [1, 3]
        let b = Score::new(-1.0, 1.0, 2.0); // [-2, 1]
        let p = a * b;
        assert_eq!(p.value, -2.0);
        assert_eq!(p.min(), -6.0);
        assert_eq!(p.max(), 3.0);
    }

    #[test]
    fn test_division_by_interval_containing_zero() {
        let a = Score::exact(1.0);
        let b = Score::new(0.5, 1.0, 1.0);
        assert!((a / b).is_nan());
    }

    #[test]
    fn test_division() {
        let a = Score::new(4.0, 2.0, 2.0); // [2, 6]
        let b = Score::new(2.0, 1.0, 2.0); // [1, 4]
        let q = a / b;
        assert_eq!(q.value, 2.0);
        assert_eq!(q.min(), 0.5);
        assert_eq!(q.max(), 6.0);
    }

    #[test]
    fn test_abs_folds_about_zero() {
        let s = Score::new(-1.0, 1.0, 3.0); // [-2, 2]
        let a = s.abs();
        assert_eq!(a.value, 1.0);
        assert_eq!(a.min(), 0.0);
        assert_eq!(a.max(), 2.0);

        let negative = Score::new(-3.0, 1.0, 0.5);
        assert_eq!(negative.abs().to_triplet(), (3.0, 0.5, 1.0));
    }

    #[test]
    fn test_nan_propagates() {
        let nan = Score::nan();
        let one = Score::exact(1.0);
        assert!((nan + one).is_nan());
        assert!((one * nan).is_nan());
        assert!((-nan).is_nan());
        assert!(nan.abs().is_nan());
    }

    #[test]
    fn test_definite_ordering() {
        let low = Score::new(0.0, 1.0, 1.0);
        let high = Score::new(3.0, 1.0, 1.0);
        assert!(low.definitely_less_than(&high));
        assert!(high.definitely_greater_than(&low));
        assert!(!low.definitely_less_than(&Score::new(1.5, 1.0, 1.0)));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_score() -> impl Strategy<Value = Score> {
        (-100.0..100.0f64, 0.0..10.0f64, 0.0..10.0f64)
            .prop_map(|(v, l, r)| Score::new(v, l, r))
    }

    proptest! {
        /// Property: double negation is the identity
        #[test]
        fn test_double_negation(s in arb_score()) {
            prop_assert_eq!(-(-s), s);
        }

        /// Property: adding the exact zero is the identity
        #[test]
        fn test_additive_identity(s in arb_score()) {
            prop_assert_eq!(s + Score::exact(0.0), s);
        }

        /// Property: absolute value ignores sign
        #[test]
        fn test_abs_of_negation(s in arb_score()) {
            prop_assert_eq!((-s).abs(), s.abs());
        }

        /// Property: uncertainties stay non-negative under all operations
        #[test]
        fn test_uncertainties_non_negative(a in arb_score(), b in arb_score()) {
            for s in [a + b, a - b, a * b, a / b, a.abs(), -a] {
                if !s.is_nan() {
                    prop_assert!(s.left_unc >= 0.0 && s.right_unc >= 0.0);
                }
            }
        }

        /// Property: the product interval contains the product of any interior points
        #[test]
        fn test_product_enclosure(a in arb_score(), b in arb_score(), ta in 0.0..1.0f64, tb in 0.0..1.0f64) {
            let x = a.min() + ta * (a.max() - a.min());
            let y = b.min() + tb * (b.max() - b.min());
            let p = a * b;
            let tol = 1e-9 * (1.0 + (x * y).abs());
            prop_assert!(p.min() - tol <= x * y && x * y <= p.max() + tol);
        }
    }
}
