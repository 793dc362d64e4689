//! Root laws of the generalized Bradley–Terry model
//!
//! A root law is characterized by its cumulant-generating function ψ. The
//! negative log-likelihood of a comparison `r` on a score difference `d` is
//! `ψ(d) - r·d`, and `ψ'(d)` is the expected comparison given `d`.

/// Cumulant-generating function of a root law
pub trait RootLaw: Send + Sync {
    /// Short name of the law
    fn name(&self) -> &'static str;

    /// ψ(d)
    fn cumulant(&self, d: f64) -> f64;

    /// ψ'(d), odd and increasing with values in (-1, 1)
    fn cumulant_derivative(&self, d: f64) -> f64;

    /// Negative log-likelihood of normalized comparison `r` on difference `d`
    fn loss(&self, d: f64, r: f64) -> f64 {
        self.cumulant(d) - r * d
    }
}

/// Uniform root law on [-1, 1]: ψ(d) = log(sinh d / d)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UniformGbt;

impl RootLaw for UniformGbt {
    fn name(&self) -> &'static str {
        "uniform"
    }

    fn cumulant(&self, d: f64) -> f64 {
        let a = d.abs();
        if a <= 0.1 {
            let d2 = d * d;
            d2 / 6.0 - d2 * d2 / 180.0
        } else if a >= 20.0 {
            a - std::f64::consts::LN_2 - a.ln()
        } else {
            (a.sinh() / a).ln()
        }
    }

    fn cumulant_derivative(&self, d: f64) -> f64 {
        if d.abs() < 1e-2 {
            d / 3.0
        } else {
            1.0 / d.tanh() - 1.0 / d
        }
    }
}
