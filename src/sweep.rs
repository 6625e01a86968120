//!
//! # Cutoff sweep
//!
//! For each critical spatial frequency `kcrit` of a 4 points logarithmic grid,
//! the PSFs of the two methods are rendered and their sizes measured.
//! A size measurement that fails is not an error, the sweep point is kept without it.

use serde::Serialize;
use std::{fs::File, path::Path};

use crate::{AdaptiveMoments, Image, Result, SecondKickError};

/// Number of cutoff values in a sweep
pub const N_CUTOFF: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("cutoff range [{0},{1}] must be strictly positive")]
    Range(f64, f64),
}

/// A PSF rendering method
pub trait PsfMethod {
    /// Method label
    fn name(&self) -> &str;
    /// Renders the PSF of the turbulence above `kcrit` (in units of 1/r0)
    fn draw(&mut self, kcrit: f64) -> Result<Image>;
}

/// Image size measurement
pub trait MomentFit {
    /// Image size in pixels or `None` if the measurement fails
    fn sigma(&self, image: &Image) -> Option<f64>;
}
impl MomentFit for AdaptiveMoments {
    fn sigma(&self, image: &Image) -> Option<f64> {
        match self.find(image) {
            Ok(shape) => Some(shape.moments_sigma),
            Err(e) => {
                log::warn!("adaptive moments failed: {e}");
                None
            }
        }
    }
}

/// Logarithmically spaced cutoffs from `kmin` to `kmax`
pub fn cutoff_grid(kmin: f64, kmax: f64) -> std::result::Result<[f64; N_CUTOFF], SweepError> {
    if !(kmin > 0.0 && kmax > 0.0) {
        return Err(SweepError::Range(kmin, kmax));
    }
    let (l0, l1) = (kmin.log10(), kmax.log10());
    let step = (l1 - l0) / (N_CUTOFF - 1) as f64;
    let mut grid = [0f64; N_CUTOFF];
    grid.iter_mut()
        .enumerate()
        .for_each(|(k, g)| *g = 10f64.powf(l0 + k as f64 * step));
    Ok(grid)
}

/// PSFs and sizes for one cutoff
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepPoint {
    pub kcrit: f64,
    pub fft: Image,
    pub second_kick: Image,
    pub fft_sigma: Option<f64>,
    pub second_kick_sigma: Option<f64>,
}

/// Sweep results, one point per cutoff
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepResults {
    pub points: Vec<SweepPoint>,
}
impl SweepResults {
    /// Cutoff values
    pub fn kcrits(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.kcrit).collect()
    }
    /// Writes the results into a pickle file
    pub fn to_pickle<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(&path)
            .map_err(|e| SecondKickError::Create(e, path.as_ref().to_path_buf()))?;
        serde_pickle::to_writer(&mut file, self, Default::default())?;
        Ok(())
    }
}

/// Sweep over cutoff values
#[derive(Debug, Clone, PartialEq)]
pub struct Sweep {
    kcrits: [f64; N_CUTOFF],
}
impl Sweep {
    pub fn new(kmin: f64, kmax: f64) -> Result<Self> {
        Ok(Self {
            kcrits: cutoff_grid(kmin, kmax)?,
        })
    }
    pub fn kcrits(&self) -> &[f64] {
        &self.kcrits
    }
    /// Runs the sweep, one cutoff after the other
    pub fn run<A, B, M>(&self, fft: &mut A, second_kick: &mut B, fit: &M) -> Result<SweepResults>
    where
        A: PsfMethod,
        B: PsfMethod,
        M: MomentFit,
    {
        let mut points = Vec::with_capacity(N_CUTOFF);
        for &kcrit in &self.kcrits {
            log::info!("kcrit={:.4}: rendering {}", kcrit, fft.name());
            let fft_image = fft.draw(kcrit)?;
            log::info!("kcrit={:.4}: rendering {}", kcrit, second_kick.name());
            let second_kick_image = second_kick.draw(kcrit)?;
            let fft_sigma = fit.sigma(&fft_image);
            let second_kick_sigma = fit.sigma(&second_kick_image);
            log::info!(
                "kcrit={:.4}: sigma {} {:?}, {} {:?}",
                kcrit,
                fft.name(),
                fft_sigma,
                second_kick.name(),
                second_kick_sigma
            );
            points.push(SweepPoint {
                kcrit,
                fft: fft_image,
                second_kick: second_kick_image,
                fft_sigma,
                second_kick_sigma,
            });
        }
        Ok(SweepResults { points })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flat(Vec<f64>);
    impl PsfMethod for Flat {
        fn name(&self) -> &str {
            "flat"
        }
        fn draw(&mut self, kcrit: f64) -> Result<Image> {
            self.0.push(kcrit);
            Ok(Image::from_vec(4, 4, 0.1, vec![kcrit; 16])?)
        }
    }
    struct Failing;
    impl MomentFit for Failing {
        fn sigma(&self, _image: &Image) -> Option<f64> {
            None
        }
    }
    struct Constant;
    impl MomentFit for Constant {
        fn sigma(&self, _image: &Image) -> Option<f64> {
            Some(1.5)
        }
    }

    #[test]
    fn log_spaced_grid() {
        let grid = cutoff_grid(0.05, 0.5).unwrap();
        let expected = [0.05, 0.1077, 0.2321, 0.5];
        for (g, e) in grid.iter().zip(expected) {
            assert!((g - e).abs() < 1e-4, "{grid:?}");
        }
    }

    #[test]
    fn degenerate_range() {
        let grid = cutoff_grid(0.1, 0.1).unwrap();
        assert!(grid.iter().all(|k| (k - 0.1).abs() < 1e-12));
        assert!(matches!(cutoff_grid(0.0, 0.1), Err(SweepError::Range(..))));
    }

    #[test]
    fn always_four_points() {
        for (kmin, kmax) in [(0.01, 10.0), (0.2, 0.3), (0.5, 0.5)] {
            let sweep = Sweep::new(kmin, kmax).unwrap();
            let (mut a, mut b) = (Flat(vec![]), Flat(vec![]));
            let results = sweep.run(&mut a, &mut b, &Constant).unwrap();
            assert_eq!(results.points.len(), N_CUTOFF);
            assert_eq!(a.0, results.kcrits());
            assert_eq!(b.0, results.kcrits());
        }
    }

    #[test]
    fn failed_measurements_keep_images() {
        let sweep = Sweep::new(0.05, 0.5).unwrap();
        let (mut a, mut b) = (Flat(vec![]), Flat(vec![]));
        let results = sweep.run(&mut a, &mut b, &Failing).unwrap();
        for point in &results.points {
            assert!(point.fft_sigma.is_none() && point.second_kick_sigma.is_none());
            assert_eq!(point.fft.get(0, 0), point.kcrit);
            assert_eq!(point.second_kick.array().len(), 16);
        }
    }

    #[test]
    fn adaptive_moments_failure_is_none() {
        let blank = Image::new(8, 8, 0.1).unwrap();
        assert_eq!(AdaptiveMoments::default().sigma(&blank), None);
    }
}
