//!
//! # Adaptive moments
//!
//! Iterative fit of an elliptical Gaussian weight matched to the image
//! (Bernstein & Jarvis 2002): the weight centroid and covariance are updated
//! with the weighted first and second moments until they stop changing.
//! The size statistic is `sigma = det(M)^(1/4)` in pixels, `M` being the weight covariance.

use nalgebra::{Matrix2, Vector2};
use serde::Serialize;

use crate::Image;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MomentsError {
    #[error("adaptive moments did not converge after {0} iterations")]
    NonConvergence(usize),
    #[error("no positive flux under the weight function")]
    NoFlux,
    #[error("the moment matrix is not positive definite")]
    NotPositiveDefinite,
    #[error("the weight function moved outside of the image")]
    OutOfBounds,
}
pub type Result<T> = std::result::Result<T, MomentsError>;

/// Adaptive moments of an image
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShapeData {
    /// Size `det(M)^(1/4)` in pixels
    pub moments_sigma: f64,
    /// Weight centroid in pixels
    pub centroid: (f64, f64),
    /// Best-fit elliptical Gaussian amplitude
    pub amplitude: f64,
    /// Ellipticity `(Mxx-Myy)/(Mxx+Myy)`
    pub e1: f64,
    /// Ellipticity `2Mxy/(Mxx+Myy)`
    pub e2: f64,
    /// Number of iterations
    pub n_iter: usize,
}

/// Adaptive moments estimator
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveMoments {
    pub max_iter: usize,
    pub tolerance: f64,
    pub guess_sigma: Option<f64>,
}
/// Default properties:
///  * max. iterations : 400
///  * tolerance       : 1e-6
///  * guess sigma     : none, from the unweighted moments
impl Default for AdaptiveMoments {
    fn default() -> Self {
        Self {
            max_iter: 400,
            tolerance: 1e-6,
            guess_sigma: None,
        }
    }
}

struct Sums {
    flux: f64,
    first: Vector2<f64>,
    second: Matrix2<f64>,
}

impl AdaptiveMoments {
    pub fn max_iter(self, max_iter: usize) -> Self {
        Self { max_iter, ..self }
    }
    pub fn tolerance(self, tolerance: f64) -> Self {
        Self { tolerance, ..self }
    }
    /// Set the initial weight size in pixels
    pub fn guess_sigma(self, guess_sigma: f64) -> Self {
        Self {
            guess_sigma: Some(guess_sigma),
            ..self
        }
    }
    /// Weighted sums centered on `centroid` with weight covariance `m`
    fn sums(image: &Image, centroid: &Vector2<f64>, m_inv: &Matrix2<f64>) -> Sums {
        let mut sums = Sums {
            flux: 0f64,
            first: Vector2::zeros(),
            second: Matrix2::zeros(),
        };
        for j in 0..image.ny {
            for i in 0..image.nx {
                let d = Vector2::new(i as f64, j as f64) - centroid;
                let rho2 = (d.transpose() * m_inv * d)[0];
                if rho2 > 36.0 {
                    continue;
                }
                let iw = image.get(i, j) * (-0.5 * rho2).exp();
                sums.flux += iw;
                sums.first += d * iw;
                sums.second += d * d.transpose() * iw;
            }
        }
        sums
    }
    /// Starting centroid and covariance from the positive pixels
    fn initial(&self, image: &Image) -> Result<(Vector2<f64>, Matrix2<f64>)> {
        let mut flux = 0f64;
        let mut first = Vector2::zeros();
        for j in 0..image.ny {
            for i in 0..image.nx {
                let v = image.get(i, j).max(0.0);
                flux += v;
                first += Vector2::new(i as f64, j as f64) * v;
            }
        }
        if !(flux > 0.0) {
            return Err(MomentsError::NoFlux);
        }
        let centroid = first / flux;
        let sigma = match self.guess_sigma {
            Some(sigma) => sigma,
            None => {
                let mut second = 0f64;
                for j in 0..image.ny {
                    for i in 0..image.nx {
                        let v = image.get(i, j).max(0.0);
                        let d = Vector2::new(i as f64, j as f64) - centroid;
                        second += d.norm_squared() * v;
                    }
                }
                (0.5 * second / flux).sqrt().max(1.0)
            }
        };
        Ok((centroid, Matrix2::identity() * sigma * sigma))
    }
    /// Fits the adaptive moments of `image`
    pub fn find(&self, image: &Image) -> Result<ShapeData> {
        let (mut centroid, mut m) = self.initial(image)?;
        let bound = (image.nx.max(image.ny) as f64).powi(2);
        for n_iter in 1..=self.max_iter {
            let m_inv = m.try_inverse().ok_or(MomentsError::NotPositiveDefinite)?;
            let sums = Self::sums(image, &centroid, &m_inv);
            if !(sums.flux > 0.0) {
                return Err(MomentsError::NoFlux);
            }
            let shift = sums.first / sums.flux;
            let new_m = (sums.second / sums.flux - shift * shift.transpose()) * 2.0;
            if !(new_m[(0, 0)] > 0.0 && new_m.determinant() > 0.0) {
                return Err(MomentsError::NotPositiveDefinite);
            }
            let dm = (new_m - m).abs().max() / m.trace();
            centroid += shift;
            m = new_m;
            if centroid.iter().any(|c| !c.is_finite())
                || centroid.x < 0.0
                || centroid.y < 0.0
                || centroid.x > image.nx as f64
                || centroid.y > image.ny as f64
                || m.trace() > bound
            {
                return Err(MomentsError::OutOfBounds);
            }
            if shift.norm() < self.tolerance && dm < self.tolerance {
                let det = m.determinant();
                let trace = m.trace();
                let m_inv = m.try_inverse().ok_or(MomentsError::NotPositiveDefinite)?;
                let sums = Self::sums(image, &centroid, &m_inv);
                return Ok(ShapeData {
                    moments_sigma: det.powf(0.25),
                    centroid: (centroid.x, centroid.y),
                    amplitude: 2.0 * sums.flux,
                    e1: (m[(0, 0)] - m[(1, 1)]) / trace,
                    e2: 2.0 * m[(0, 1)] / trace,
                    n_iter,
                });
            }
        }
        Err(MomentsError::NonConvergence(self.max_iter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaussian(n: usize, sigma_x: f64, sigma_y: f64, x0: f64, y0: f64) -> Image {
        let data = (0..n * n)
            .map(|k| {
                let x = (k % n) as f64 - x0;
                let y = (k / n) as f64 - y0;
                (-0.5 * (x * x / (sigma_x * sigma_x) + y * y / (sigma_y * sigma_y))).exp()
            })
            .collect();
        Image::from_vec(n, n, 0.1, data).unwrap()
    }

    #[test]
    fn round_gaussian() {
        let image = gaussian(48, 3.0, 3.0, 23.5, 23.5);
        let shape = AdaptiveMoments::default().find(&image).unwrap();
        assert!((shape.moments_sigma - 3.0).abs() < 1e-3, "{shape:?}");
        assert!((shape.centroid.0 - 23.5).abs() < 1e-4);
        assert!((shape.centroid.1 - 23.5).abs() < 1e-4);
        assert!(shape.e1.abs() < 1e-4 && shape.e2.abs() < 1e-4);
    }

    #[test]
    fn elliptical_gaussian() {
        let image = gaussian(64, 4.0, 2.0, 30.0, 33.0);
        let shape = AdaptiveMoments::default().find(&image).unwrap();
        assert!((shape.moments_sigma - 8f64.sqrt()).abs() < 1e-3, "{shape:?}");
        assert!((shape.e1 - 0.6).abs() < 1e-3);
        assert!((shape.centroid.0 - 30.0).abs() < 1e-4);
    }

    #[test]
    fn blank_image() {
        let image = Image::new(16, 16, 0.1).unwrap();
        assert_eq!(
            AdaptiveMoments::default().find(&image),
            Err(MomentsError::NoFlux)
        );
    }

    #[test]
    fn not_enough_iterations() {
        let image = gaussian(48, 3.0, 3.0, 23.5, 23.5);
        assert_eq!(
            AdaptiveMoments::default()
                .guess_sigma(10.0)
                .max_iter(2)
                .find(&image),
            Err(MomentsError::NonConvergence(2))
        );
    }
}
