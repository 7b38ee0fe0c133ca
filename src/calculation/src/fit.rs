//! Least-squares polynomial fitting.
//!
//! Builds the Vandermonde design matrix and solves the normal equations
//! `XᵀX c = Xᵀy`. Coefficients come back highest power first, so for a line
//! `coefficients[0]` is the slope and `coefficients[1]` the intercept.

use ndarray::{Array1, Array2};
use ndarray_linalg::Inverse;

/// Result of a polynomial least-squares fit.
#[derive(Debug, Clone, PartialEq)]
pub struct PolyFit {
    /// Coefficients, highest power first
    pub coefficients: Array1<f64>,
    /// Sum of squared residuals
    pub residual_ss: f64,
}

impl PolyFit {
    /// Polynomial degree of the fit.
    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// Evaluate the fitted polynomial at `x` (Horner).
    pub fn eval(&self, x: f64) -> f64 {
        self.coefficients.iter().fold(0.0, |acc, &c| acc * x + c)
    }
}

/// Fit `y ≈ p(x)` of the given degree by ordinary least squares.
///
/// Returns `None` when there are not enough points or the normal matrix
/// cannot be inverted (e.g. all `x` identical). A NaN in `y` propagates into
/// NaN coefficients.
pub fn polynomial_fit(x: &[f64], y: &[f64], degree: usize) -> Option<PolyFit> {
    let n = x.len();
    if n != y.len() || n < degree + 1 {
        return None;
    }

    // 构建设计矩阵
    let mut design = Array2::<f64>::zeros((n, degree + 1));
    for (i, &xi) in x.iter().enumerate() {
        for j in 0..=degree {
            design[(i, j)] = xi.powi((degree - j) as i32);
        }
    }
    let y = Array1::from_vec(y.to_vec());

    // 计算正规方程
    let xt = design.t();
    let xtx = xt.dot(&design);
    let xty = xt.dot(&y);

    // 求逆并计算系数
    let xtx_inv = xtx.inv().ok()?;
    let coefficients = xtx_inv.dot(&xty);

    let residuals = &y - &design.dot(&coefficients);
    let residual_ss = residuals.dot(&residuals);

    Some(PolyFit {
        coefficients,
        residual_ss,
    })
}

/// Slope of the least-squares line through `(x, y)`.
pub fn linear_slope(x: &[f64], y: &[f64]) -> Option<f64> {
    polynomial_fit(x, y, 1).map(|fit| fit.coefficients[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_fit_exact() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        let fit = polynomial_fit(&x, &y, 1).unwrap();
        assert_relative_eq!(fit.coefficients[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(fit.coefficients[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(fit.residual_ss, 0.0, epsilon = 1e-18);
        assert_eq!(fit.degree(), 1);
    }

    #[test]
    fn test_linear_fit_least_squares() {
        // Sxx = 26, Sxy = 3.4
        let slope = linear_slope(&[-2.0, 0.0, 5.0], &[0.0, 0.2, 0.9]).unwrap();
        assert_relative_eq!(slope, 3.4 / 26.0, epsilon = 1e-12);
    }

    #[test]
    fn test_quadratic_fit() {
        let x: Vec<f64> = (-3..=3).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| 0.5 * v * v - v + 2.0).collect();
        let fit = polynomial_fit(&x, &y, 2).unwrap();
        assert_relative_eq!(fit.coefficients[0], 0.5, epsilon = 1e-10);
        assert_relative_eq!(fit.coefficients[1], -1.0, epsilon = 1e-10);
        assert_relative_eq!(fit.coefficients[2], 2.0, epsilon = 1e-10);
        assert_relative_eq!(fit.eval(4.0), 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_too_few_points() {
        assert!(polynomial_fit(&[1.0], &[2.0], 1).is_none());
        assert!(polynomial_fit(&[1.0, 2.0], &[2.0], 1).is_none());
    }

    #[test]
    fn test_singular_fit() {
        assert!(linear_slope(&[1.0, 1.0, 1.0], &[0.1, 0.2, 0.3]).is_none());
    }

    #[test]
    fn test_nan_propagates() {
        let slope = linear_slope(&[0.0, 1.0, 2.0], &[0.0, f64::NAN, 2.0]).unwrap();
        assert!(slope.is_nan());
    }
}
