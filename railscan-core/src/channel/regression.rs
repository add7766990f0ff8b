//! Ordinary least squares against the window-relative bar index.

use crate::config::DispersionMeasure;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LineFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LineFit {
    pub fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Fit `y = intercept + slope * x` for x = 0..ys.len().
///
/// A degenerate x spread (fewer than two points) yields a flat line at the mean.
pub(crate) fn least_squares(ys: &[f64]) -> LineFit {
    let n = ys.len();
    if n == 0 {
        return LineFit {
            slope: 0.0,
            intercept: 0.0,
        };
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = ys.iter().sum::<f64>() / n as f64;

    let mut num = 0.0;
    let mut denom = 0.0;
    for (i, &y) in ys.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        denom += dx * dx;
    }

    if denom == 0.0 {
        return LineFit {
            slope: 0.0,
            intercept: y_mean,
        };
    }
    let slope = num / denom;
    LineFit {
        slope,
        intercept: y_mean - slope * x_mean,
    }
}

/// Dispersion of the residuals around `fit`.
pub(crate) fn residual_dispersion(ys: &[f64], fit: &LineFit, measure: DispersionMeasure) -> f64 {
    let residuals = ys.iter().enumerate().map(|(i, &y)| y - fit.at(i as f64));
    match measure {
        DispersionMeasure::StdDev => {
            let n = ys.len();
            if n < 2 {
                return 0.0;
            }
            // Residuals of an OLS fit have zero mean.
            let ss: f64 = residuals.map(|r| r * r).sum();
            let dof = if n >= 3 { n - 1 } else { n };
            (ss / dof as f64).sqrt()
        }
        DispersionMeasure::MaxResidual => residuals.fold(0.0_f64, |acc, r| acc.max(r.abs())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::assert_approx;

    #[test]
    fn exact_line_is_recovered() {
        let ys: Vec<f64> = (0..10).map(|i| 5.0 + 0.5 * i as f64).collect();
        let fit = least_squares(&ys);
        assert_approx(fit.slope, 0.5, 1e-12);
        assert_approx(fit.intercept, 5.0, 1e-12);
        assert_approx(
            residual_dispersion(&ys, &fit, DispersionMeasure::StdDev),
            0.0,
            1e-12,
        );
    }

    #[test]
    fn constant_series_is_flat() {
        let ys = vec![100.0; 50];
        let fit = least_squares(&ys);
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.intercept, 100.0);
        assert_eq!(residual_dispersion(&ys, &fit, DispersionMeasure::StdDev), 0.0);
        assert_eq!(
            residual_dispersion(&ys, &fit, DispersionMeasure::MaxResidual),
            0.0
        );
    }

    #[test]
    fn sample_stddev_of_residuals() {
        // Alternating +1/-1 around a flat line of 10: fit is flat-ish,
        // residuals are +-1 shifted by the tiny fitted slope.
        let ys = vec![11.0, 9.0, 11.0, 9.0];
        let fit = least_squares(&ys);
        // x = 0..3, x_mean = 1.5; num = -1.5 - 0.5*-1 ... = -2.0, denom = 5
        assert_approx(fit.slope, -0.4, 1e-12);
        assert_approx(fit.intercept, 10.6, 1e-12);
        // residuals: 0.4, -1.2, 1.2, -0.4 → ss = 3.2, ddof=1 → sqrt(3.2/3)
        assert_approx(
            residual_dispersion(&ys, &fit, DispersionMeasure::StdDev),
            (3.2_f64 / 3.0).sqrt(),
            1e-12,
        );
        assert_approx(
            residual_dispersion(&ys, &fit, DispersionMeasure::MaxResidual),
            1.2,
            1e-12,
        );
    }

    #[test]
    fn two_points_use_population_stddev() {
        let ys = vec![1.0, 3.0];
        let fit = least_squares(&ys);
        assert_approx(fit.slope, 2.0, 1e-12);
        assert_approx(
            residual_dispersion(&ys, &fit, DispersionMeasure::StdDev),
            0.0,
            1e-12,
        );
    }
}
