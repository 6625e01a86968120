//!
//! # Fourier optics PSF
//!
//! Long exposure PSF integrated over time steps: at each step the pupil field
//! `exp(i phi)` through the wind-advected phase screens is Fourier transformed
//! and its squared modulus accumulated.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rustfft::num_complex::Complex64;

use crate::{
    aperture::ApertureBuilder,
    atmosphere::AtmosphereBuilder,
    fft::{fftshift, Fft2},
    r0_at, Aperture, Atmosphere, Builder, FromBuilder, Image, PsfMethod, Result, SecondKickError,
};

/// [`FourierOptics`] builder
#[derive(Debug, Clone, PartialEq)]
pub struct FourierOpticsBuilder {
    pub atmosphere: AtmosphereBuilder,
    pub aperture: ApertureBuilder,
    pub exposure_time: f64,
    pub time_step: f64,
    pub nx: usize,
    pub scale: f64,
}
/// Default properties:
///  * atmosphere    : see [`AtmosphereBuilder`]
///  * aperture      : see [`ApertureBuilder`]
///  * exposure time : 30s
///  * time step     : 25ms
///  * image         : 64x64 pixels of 0.04arcsec
impl Default for FourierOpticsBuilder {
    fn default() -> Self {
        Self {
            atmosphere: Default::default(),
            aperture: Default::default(),
            exposure_time: 30.0,
            time_step: 0.025,
            nx: 64,
            scale: 0.04,
        }
    }
}
impl FourierOpticsBuilder {
    /// Set the atmosphere
    pub fn atmosphere(self, atmosphere: AtmosphereBuilder) -> Self {
        Self { atmosphere, ..self }
    }
    /// Set the telescope aperture
    ///
    /// The aperture is sampled at most at the phase screens resolution
    pub fn aperture(self, aperture: ApertureBuilder) -> Self {
        Self { aperture, ..self }
    }
    /// Set the exposure time in seconds
    pub fn exposure_time(self, exposure_time: f64) -> Self {
        Self {
            exposure_time,
            ..self
        }
    }
    /// Set the time step in seconds
    pub fn time_step(self, time_step: f64) -> Self {
        Self { time_step, ..self }
    }
    /// Set the output image size in pixels and the pixel scale in arcsecond
    pub fn image(self, nx: usize, scale: f64) -> Self {
        Self { nx, scale, ..self }
    }
}
impl Builder for FourierOpticsBuilder {
    type Component = FourierOptics;
    fn build(self) -> Result<FourierOptics> {
        for (name, value) in [
            ("exposure time", self.exposure_time),
            ("time step", self.time_step),
        ] {
            if !(value > 0.0) {
                return Err(SecondKickError::NonPositive(name, value));
            }
        }
        Image::new(self.nx, self.nx, self.scale)?;
        let wavelength = self.aperture.wavelength;
        let r0_500 = self.atmosphere.r0_500;
        let aperture = self
            .aperture
            .max_scale(self.atmosphere.screen_scale)
            .field(self.nx as f64 * self.scale)
            .build()?;
        let n_step = ((self.exposure_time / self.time_step).round() as usize).max(1);
        let fft = Fft2::new(aperture.n_px());
        Ok(FourierOptics {
            atmosphere: self.atmosphere.build()?,
            r0_500,
            wavelength,
            n_step,
            time_step: self.time_step,
            nx: self.nx,
            scale: self.scale,
            aperture,
            fft,
        })
    }
}

/// Fourier optics PSF generator
#[derive(Debug, Clone)]
pub struct FourierOptics {
    atmosphere: Atmosphere,
    pub r0_500: f64,
    pub wavelength: f64,
    pub n_step: usize,
    pub time_step: f64,
    nx: usize,
    scale: f64,
    aperture: Aperture,
    fft: Fft2,
}
impl FromBuilder for FourierOptics {
    type ComponentBuilder = FourierOpticsBuilder;
}
impl FourierOptics {
    /// Fried parameter at the PSF wavelength
    pub fn r0(&self) -> f64 {
        r0_at(self.r0_500, self.wavelength)
    }
    pub fn atmosphere(&self) -> &Atmosphere {
        &self.atmosphere
    }
    pub fn aperture(&self) -> &Aperture {
        &self.aperture
    }
    /// Instantaneous PSF at time `t` accumulated into `psf`
    fn accumulate(&self, atm: &Atmosphere, t: f64, field: &mut [Complex64], psf: &mut [f64]) {
        field.iter_mut().for_each(|c| *c = Complex64::new(0.0, 0.0));
        let wavelength = self.wavelength;
        let phase: Vec<(usize, f64)> = self
            .aperture
            .illuminated()
            .par_iter()
            .map(|&(k, x, y)| (k, atm.phase(x, y, t, wavelength)))
            .collect();
        for (k, phi) in phase {
            field[k] = Complex64::from_polar(1.0, phi);
        }
        self.fft.forward(field);
        psf.par_iter_mut()
            .zip(field.par_iter())
            .for_each(|(p, c)| *p += c.norm_sqr());
    }
    /// Long exposure PSF on the aperture Fourier grid, origin at the grid center, unit flux
    pub fn psf_grid(&self, atm: &Atmosphere) -> Vec<f64> {
        let n = self.aperture.n_px();
        let mut field = vec![Complex64::new(0.0, 0.0); n * n];
        let mut psf = vec![0f64; n * n];
        let pb = ProgressBar::new(self.n_step as u64);
        pb.set_style(
            ProgressStyle::with_template("{msg} [{eta_precise}] {bar:50.cyan/blue} {pos:>7}/{len:7}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb.set_message("Fourier optics");
        for k in 0..self.n_step {
            self.accumulate(atm, k as f64 * self.time_step, &mut field, &mut psf);
            pb.inc(1);
        }
        pb.finish_and_clear();
        let total: f64 = psf.iter().sum();
        fftshift(&psf, n).into_iter().map(|x| x / total).collect()
    }
}
impl PsfMethod for FourierOptics {
    fn name(&self) -> &str {
        "FFT"
    }
    fn draw(&mut self, kcrit: f64) -> Result<Image> {
        let mut atm = self.atmosphere.clone();
        atm.instantiate(kcrit / self.r0());
        log::info!(
            "Drawing with Fourier optics: {} steps of {}s",
            self.n_step,
            self.time_step
        );
        let psf = self.psf_grid(&atm);
        Ok(Image::resample(
            &psf,
            self.aperture.n_px(),
            self.aperture.focal_scale(self.wavelength),
            self.nx,
            self.scale,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> FourierOptics {
        FourierOptics::builder()
            .atmosphere(
                AtmosphereBuilder::default()
                    .screen_size(6.4)
                    .screen_scale(0.1),
            )
            .aperture(ApertureBuilder::default().diameter(1.0).obscuration(0.3))
            .exposure_time(0.1)
            .time_step(0.05)
            .image(16, 0.2)
            .build()
            .unwrap()
    }

    #[test]
    fn time_steps() {
        let fft = small();
        assert_eq!(fft.n_step, 2);
        assert!(!fft.atmosphere().is_instantiated());
        assert!(fft.aperture().scale() <= 0.1);
    }

    #[test]
    fn unit_flux_psf() {
        let fft = small();
        let atm = Atmosphere::builder()
            .screen_size(6.4)
            .screen_scale(0.1)
            .build()
            .unwrap();
        let psf = fft.psf_grid(&atm);
        assert!((psf.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn reproducible_draws() {
        let mut fft = small();
        let a = fft.draw(0.1).unwrap();
        let b = fft.draw(0.1).unwrap();
        assert_eq!(a, b);
        assert!(a.flux() > 0.3);
    }

    #[test]
    fn non_positive_time_step() {
        assert!(matches!(
            FourierOptics::builder().time_step(0.0).build(),
            Err(SecondKickError::NonPositive("time step", _))
        ));
    }
}
