use rand::Rng;
use rand_distr::StandardNormal;
use rustfft::num_complex::Complex64;

use crate::fft::{fftfreq, Fft2};

/// Kolmogorov phase power spectrum constant, `f` in cycles per meter
const PSD_CST: f64 = 0.023;

/// Von Karman phase power spectrum density in rd^2.m^2 at 500nm
///
/// `f` is the spatial frequency in cycles per meter
pub fn phase_psd(f: f64, r0: f64, oscale: f64) -> f64 {
    PSD_CST * r0.powf(-5.0 / 3.0) * (f * f + oscale.powi(-2)).powf(-11.0 / 6.0)
}

/// A periodic phase screen
///
/// The screen is frozen and moves with the wind, the phase is in radians at 500nm.
#[derive(Debug, Clone)]
pub struct PhaseScreen {
    n_px: usize,
    scale: f64,
    velocity: (f64, f64),
    data: Vec<f64>,
}
impl PhaseScreen {
    /// Draws a `n_px x n_px` phase screen with `scale` meter pixels
    ///
    /// Only the spatial frequencies `k>=kmin` (in radians per meter) are kept,
    /// the piston mode is always removed.
    pub fn generate<R: Rng>(
        n_px: usize,
        scale: f64,
        r0: f64,
        oscale: f64,
        kmin: f64,
        velocity: (f64, f64),
        rng: &mut R,
    ) -> Self {
        let size = n_px as f64 * scale;
        let df = size.recip();
        let freq = fftfreq(n_px, scale);
        let mut spectrum: Vec<Complex64> = Vec::with_capacity(n_px * n_px);
        for fy in &freq {
            for fx in &freq {
                let f = fx.hypot(*fy);
                // drawn for every mode so that the realization does not depend on kmin
                let (re, im): (f64, f64) = (rng.sample(StandardNormal), rng.sample(StandardNormal));
                let amplitude = if f == 0.0 || 2.0 * std::f64::consts::PI * f < kmin {
                    0.0
                } else {
                    phase_psd(f, r0, oscale).sqrt() * df
                };
                spectrum.push(Complex64::new(re, im) * amplitude);
            }
        }
        Fft2::new(n_px).inverse(&mut spectrum);
        Self {
            n_px,
            scale,
            velocity,
            data: spectrum.into_iter().map(|c| c.re).collect(),
        }
    }
    /// Screen side length in pixels
    pub fn n_px(&self) -> usize {
        self.n_px
    }
    /// Screen side length in meters
    pub fn size(&self) -> f64 {
        self.n_px as f64 * self.scale
    }
    /// Screen phase values
    pub fn data(&self) -> &[f64] {
        &self.data
    }
    /// Phase at `(x,y)` meters and `t` seconds
    ///
    /// The screen wraps around its edges and is bilinearly interpolated.
    pub fn phase(&self, x: f64, y: f64, t: f64) -> f64 {
        let n = self.n_px as f64;
        let u = ((x - self.velocity.0 * t) / self.scale).rem_euclid(n);
        let v = ((y - self.velocity.1 * t) / self.scale).rem_euclid(n);
        let (i0, j0) = (u.floor() as usize % self.n_px, v.floor() as usize % self.n_px);
        let (i1, j1) = ((i0 + 1) % self.n_px, (j0 + 1) % self.n_px);
        let (du, dv) = (u - u.floor(), v - v.floor());
        let at = |i: usize, j: usize| self.data[j * self.n_px + i];
        (1.0 - du) * (1.0 - dv) * at(i0, j0)
            + du * (1.0 - dv) * at(i1, j0)
            + (1.0 - du) * dv * at(i0, j1)
            + du * dv * at(i1, j1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn variance(data: &[f64]) -> f64 {
        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n
    }

    #[test]
    fn psd_decreases_with_frequency() {
        assert!(phase_psd(0.1, 0.15, 25.0) > phase_psd(1.0, 0.15, 25.0));
        assert!(phase_psd(1.0, 0.1, 25.0) > phase_psd(1.0, 0.2, 25.0));
    }

    #[test]
    fn seeded_screens_are_identical() {
        let draw = || {
            let mut rng = StdRng::seed_from_u64(7);
            PhaseScreen::generate(32, 0.1, 0.15, 25.0, 0.0, (1.0, 0.0), &mut rng)
        };
        assert_eq!(draw().data(), draw().data());
    }

    #[test]
    fn cutoff_keeps_the_realization() {
        let (n, scale, kmin) = (32, 0.1, 3.0);
        let draw = |kmin: f64| {
            let mut rng = StdRng::seed_from_u64(11);
            PhaseScreen::generate(n, scale, 0.15, 25.0, kmin, (0.0, 0.0), &mut rng)
        };
        let spectrum = |screen: &PhaseScreen| {
            let mut c: Vec<Complex64> = screen
                .data()
                .iter()
                .map(|x| Complex64::new(*x, 0.0))
                .collect();
            Fft2::new(n).forward(&mut c);
            c
        };
        let (full, cut) = (spectrum(&draw(0.0)), spectrum(&draw(kmin)));
        let freq = fftfreq(n, scale);
        let mut n_kept = 0;
        for (j, fy) in freq.iter().enumerate() {
            for (i, fx) in freq.iter().enumerate() {
                let k = j * n + i;
                if 2.0 * std::f64::consts::PI * fx.hypot(*fy) >= kmin {
                    assert!(
                        (full[k] - cut[k]).norm() < 1e-9 * full[k].norm().max(1.0),
                        "mode ({i},{j}): {} != {}",
                        full[k],
                        cut[k]
                    );
                    n_kept += 1;
                } else {
                    assert!(cut[k].norm() < 1e-8, "mode ({i},{j}): {}", cut[k]);
                }
            }
        }
        assert!(n_kept > 0 && n_kept < n * n);
    }

    #[test]
    fn cutoff_removes_power() {
        let mut rng = StdRng::seed_from_u64(1);
        let full = PhaseScreen::generate(64, 0.1, 0.15, 25.0, 0.0, (0.0, 0.0), &mut rng);
        let mut rng = StdRng::seed_from_u64(1);
        let cut = PhaseScreen::generate(64, 0.1, 0.15, 25.0, 10.0, (0.0, 0.0), &mut rng);
        assert!(variance(cut.data()) < variance(full.data()));
    }

    #[test]
    fn frozen_flow() {
        let mut rng = StdRng::seed_from_u64(3);
        let screen = PhaseScreen::generate(32, 0.1, 0.15, 25.0, 0.0, (2.0, -1.0), &mut rng);
        let a = screen.phase(0.3, 0.4, 0.0);
        let b = screen.phase(0.3 + 2.0 * 0.5, 0.4 - 0.5, 0.5);
        assert!((a - b).abs() < 1e-9);
        let c = screen.phase(0.3 + screen.size(), 0.4, 0.0);
        assert!((a - c).abs() < 1e-9);
    }
}
