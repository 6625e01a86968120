//!
//! # Second kick
//!
//! Analytic PSF of the turbulence modes above the critical spatial frequency `kcrit`.
//! The optical transfer function is the telescope transfer function times
//! `exp(-D(rho)/2)`, `D` being the phase structure function of the Kolmogorov
//! spectrum restricted to `k>=kcrit/r0`:
//!
//! `D(rho) = 6.88 (rho/r0)^(5/3) G(kcrit rho/r0) / G(0)`
//!
//! with `G(u) = int_u^inf x^(-8/3) (1-J0(x)) dx`.
//! The PSF is rendered on the output image by shooting photons.

use indicatif::{ProgressBar, ProgressStyle};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rustfft::num_complex::Complex64;
use std::f64::consts::PI;

use crate::{
    aperture::ApertureBuilder, fft::fftshift, fft::Fft2, r0_at, Aperture, Builder, FromBuilder,
    Image, PsfMethod, Result, SecondKickError,
};

/// Kolmogorov structure function coefficient: `2[(24/5)Gamma(6/5)]^(5/6)`
const D_CST: f64 = 6.883877;
/// Upper integration bound of `G`
const U_MAX: f64 = 1e3;
/// Lower integration bound of `G`, the integrand is `~x^(-2/3)/4` below
const U_MIN: f64 = 1e-6;
/// Number of samples of `G` integrand
const N_U: usize = 2000;
/// Number of samples of the tabulated structure function
const N_RHO: usize = 512;

/// `1-J0(x)` accurate for small `x`
fn one_minus_j0(x: f64) -> f64 {
    if x < 1e-3 {
        let x2 = x * x;
        x2 / 4.0 - x2 * x2 / 64.0
    } else {
        1.0 - libm::j0(x)
    }
}

/// Closed form of `G(0)`
pub fn kolmogorov_integral() -> f64 {
    let a = 8.0 / 3.0;
    PI / (2f64.powf(a) * libm::tgamma(0.5 * (a + 1.0)).powi(2) * (0.5 * PI * (a - 1.0)).sin())
}

/// `G(u) = int_u^inf x^(-8/3) (1-J0(x)) dx`
///
/// Trapezoidal integration on a logarithmic grid up to `U_MAX`, the remainder
/// is approximated by `int x^(-8/3) dx`.
pub fn tail_integral(u: f64) -> f64 {
    let u0 = u.max(U_MIN);
    if u0 >= U_MAX {
        return 0.6 * u0.powf(-5.0 / 3.0);
    }
    let head = if u < U_MIN {
        0.75 * (U_MIN.powf(1.0 / 3.0) - u.max(0.0).powf(1.0 / 3.0))
    } else {
        0.0
    };
    let (s0, s1) = (u0.ln(), U_MAX.ln());
    let ds = (s1 - s0) / N_U as f64;
    let body = (0..=N_U)
        .map(|k| {
            let x = (s0 + k as f64 * ds).exp();
            let w = if k == 0 || k == N_U { 0.5 } else { 1.0 };
            w * x.powf(-5.0 / 3.0) * one_minus_j0(x)
        })
        .sum::<f64>()
        * ds;
    head + body + 0.6 * U_MAX.powf(-5.0 / 3.0)
}

/// Phase structure function at wavelength in radians^2 of the turbulence above `kcrit`
///
/// `rho` is the separation in meters, `r0` the Fried parameter at the same wavelength
/// and `kcrit` is in units of `1/r0`.
pub fn structure_function(rho: f64, r0: f64, kcrit: f64) -> f64 {
    if rho == 0.0 {
        return 0.0;
    }
    D_CST * (rho / r0).powf(5.0 / 3.0) * tail_integral(kcrit * rho / r0) / kolmogorov_integral()
}

/// [`SecondKick`] builder
#[derive(Debug, Clone, PartialEq)]
pub struct SecondKickBuilder {
    pub r0_500: f64,
    pub aperture: ApertureBuilder,
    pub n_photon: usize,
    pub nx: usize,
    pub scale: f64,
    pub seed: u64,
}
/// Default properties:
///  * r0 at 500nm : 15cm
///  * aperture    : see [`ApertureBuilder`]
///  * photons     : 3e6
///  * image       : 64x64 pixels of 0.04arcsec
///  * seed        : 3
impl Default for SecondKickBuilder {
    fn default() -> Self {
        Self {
            r0_500: 0.15,
            aperture: Default::default(),
            n_photon: 3_000_000,
            nx: 64,
            scale: 0.04,
            seed: 3,
        }
    }
}
impl SecondKickBuilder {
    /// Set the Fried parameter at 500nm in meters
    pub fn r0_500(self, r0_500: f64) -> Self {
        Self { r0_500, ..self }
    }
    /// Set the telescope aperture
    pub fn aperture(self, aperture: ApertureBuilder) -> Self {
        Self { aperture, ..self }
    }
    /// Set the number of photons to shoot
    pub fn n_photon(self, n_photon: usize) -> Self {
        Self { n_photon, ..self }
    }
    /// Set the output image size in pixels and the pixel scale in arcsecond
    pub fn image(self, nx: usize, scale: f64) -> Self {
        Self { nx, scale, ..self }
    }
    /// Set the seed of the photon shooting random generator
    pub fn seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }
}
impl Builder for SecondKickBuilder {
    type Component = SecondKick;
    fn build(self) -> Result<SecondKick> {
        if !(self.r0_500 > 0.0) {
            return Err(SecondKickError::NonPositive("r0_500", self.r0_500));
        }
        if self.n_photon == 0 {
            return Err(SecondKickError::NonPositive("photon number", 0.0));
        }
        Image::new(self.nx, self.nx, self.scale)?;
        let wavelength = self.aperture.wavelength;
        let aperture = self.aperture.field(self.nx as f64 * self.scale).build()?;
        let fft = Fft2::new(aperture.n_px());
        Ok(SecondKick {
            r0_500: self.r0_500,
            wavelength,
            n_photon: self.n_photon,
            nx: self.nx,
            scale: self.scale,
            seed: self.seed,
            aperture,
            fft,
        })
    }
}

/// Second kick PSF generator
#[derive(Debug, Clone)]
pub struct SecondKick {
    pub r0_500: f64,
    pub wavelength: f64,
    pub n_photon: usize,
    nx: usize,
    scale: f64,
    seed: u64,
    aperture: Aperture,
    fft: Fft2,
}
impl FromBuilder for SecondKick {
    type ComponentBuilder = SecondKickBuilder;
}
impl SecondKick {
    /// Fried parameter at the PSF wavelength
    pub fn r0(&self) -> f64 {
        r0_at(self.r0_500, self.wavelength)
    }
    pub fn aperture(&self) -> &Aperture {
        &self.aperture
    }
    /// Tabulated structure function up to `rho_max` meters
    fn structure_table(&self, kcrit: f64, rho_max: f64) -> Vec<f64> {
        let r0 = self.r0();
        (0..=N_RHO)
            .map(|k| structure_function(rho_max * k as f64 / N_RHO as f64, r0, kcrit))
            .collect()
    }
    /// PSF on the aperture Fourier grid, origin at the grid center, unit flux
    pub fn psf_grid(&self, kcrit: f64) -> Vec<f64> {
        let n = self.aperture.n_px();
        let dx = self.aperture.scale();
        let mut field: Vec<Complex64> = self
            .aperture
            .mask()
            .iter()
            .map(|&m| Complex64::new(if m { 1.0 } else { 0.0 }, 0.0))
            .collect();
        // telescope OTF as the pupil autocorrelation
        self.fft.forward(&mut field);
        field.iter_mut().for_each(|c| *c = Complex64::new(c.norm_sqr(), 0.0));
        self.fft.inverse(&mut field);

        let h = (n / 2) as f64;
        let rho_max = 2f64.sqrt() * h * dx;
        let table = self.structure_table(kcrit, rho_max);
        let d_rho = rho_max / N_RHO as f64;
        let lag = |i: usize| if i < n / 2 { i as f64 } else { i as f64 - n as f64 };
        for j in 0..n {
            let y = lag(j) * dx;
            for i in 0..n {
                let x = lag(i) * dx;
                let u = x.hypot(y) / d_rho;
                let k = (u.floor() as usize).min(N_RHO - 1);
                let w = (u - k as f64).min(1.0);
                let d = (1.0 - w) * table[k] + w * table[k + 1];
                field[j * n + i] *= (-0.5 * d).exp();
            }
        }
        self.fft.forward(&mut field);
        let psf: Vec<f64> = field.iter().map(|c| c.re.max(0.0)).collect();
        let total: f64 = psf.iter().sum();
        fftshift(&psf, n).into_iter().map(|x| x / total).collect()
    }
    /// Renders `psf` on the output image by shooting photons
    pub fn shoot<R: Rng>(&self, psf: &[f64], rng: &mut R) -> Result<Image> {
        let n = self.aperture.n_px();
        let theta = self.aperture.focal_scale(self.wavelength);
        let cdf: Vec<f64> = psf
            .iter()
            .scan(0f64, |acc, x| {
                *acc += x;
                Some(*acc)
            })
            .collect();
        let total = cdf.last().cloned().unwrap_or_default();
        let mut image = Image::new(self.nx, self.nx, self.scale)?;
        let flux = (self.n_photon as f64).recip();
        let h = (n / 2) as f64;
        let pb = ProgressBar::new(self.n_photon as u64);
        pb.set_style(
            ProgressStyle::with_template("{msg} [{eta_precise}] {bar:50.cyan/blue} {pos:>7}/{len:7}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb.set_message("Shooting photons");
        let mut n_lost = 0usize;
        for k in 0..self.n_photon {
            let p = rng.gen::<f64>() * total;
            let idx = cdf.partition_point(|c| *c <= p).min(n * n - 1);
            let x = ((idx % n) as f64 - h + rng.gen::<f64>() - 0.5) * theta;
            let y = ((idx / n) as f64 - h + rng.gen::<f64>() - 0.5) * theta;
            if !image.accumulate(x, y, flux) {
                n_lost += 1;
            }
            if k % 10_000 == 0 {
                pb.set_position(k as u64);
            }
        }
        pb.finish_and_clear();
        log::debug!("{} photons out of {} fell outside the image", n_lost, self.n_photon);
        Ok(image)
    }
}
impl PsfMethod for SecondKick {
    fn name(&self) -> &str {
        "2nd kick"
    }
    fn draw(&mut self, kcrit: f64) -> Result<Image> {
        log::info!("Drawing the second kick with kcrit={:.4}", kcrit);
        let psf = self.psf_grid(kcrit);
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.shoot(&psf, &mut rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SecondKick {
        SecondKick::builder()
            .aperture(
                ApertureBuilder::default()
                    .diameter(1.0)
                    .obscuration(0.3)
                    .max_scale(0.05),
            )
            .image(16, 0.2)
            .n_photon(20_000)
            .build()
            .unwrap()
    }

    #[test]
    fn closed_form_integral() {
        let g0 = tail_integral(0.0);
        assert!((g0 - kolmogorov_integral()).abs() < 1e-4, "{g0}");
        assert!((kolmogorov_integral() - 1.11833).abs() < 1e-4);
    }

    #[test]
    fn kolmogorov_limit() {
        let (r0, rho) = (0.2, 0.5);
        let d = structure_function(rho, r0, 0.0);
        let kolmogorov = D_CST * (rho / r0).powf(5.0 / 3.0);
        assert!((d - kolmogorov).abs() / kolmogorov < 1e-4);
    }

    #[test]
    fn cutoff_reduces_structure_function() {
        let d: Vec<f64> = [0.0, 0.05, 0.2, 0.5, 2.0]
            .iter()
            .map(|kcrit| structure_function(1.0, 0.2, *kcrit))
            .collect();
        assert!(d.windows(2).all(|d| d[1] < d[0]), "{d:?}");
        assert_eq!(structure_function(0.0, 0.2, 0.1), 0.0);
    }

    #[test]
    fn unit_flux_grid() {
        let kick = small();
        let psf = kick.psf_grid(0.2);
        assert!((psf.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        let n = kick.aperture().n_px();
        let peak = psf[(n / 2) * n + n / 2];
        assert_eq!(psf.iter().cloned().fold(0f64, f64::max), peak);
    }

    #[test]
    fn reproducible_photons() {
        let mut kick = small();
        let a = kick.draw(0.2).unwrap();
        let b = kick.draw(0.2).unwrap();
        assert_eq!(a, b);
        assert!(a.flux() > 0.5 && a.flux() <= 1.0 + 1e-9);
    }
}
