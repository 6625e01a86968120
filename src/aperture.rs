//!
//! # Telescope pupil
//!
//! An annular pupil sampled on a square grid large enough for the PSF
//! computed by Fourier transform to be Nyquist sampled (times the oversampling factor)
//! and to cover the output image field (times the padding factor).

use skyangle::Conversion;

use crate::{Builder, FromBuilder, Result};

#[derive(Debug, thiserror::Error)]
pub enum ApertureError {
    #[error("obscuration must be in [0,1), found {0}")]
    Obscuration(f64),
    #[error("invalid aperture {0}: {1}, expected a strictly positive value")]
    NonPositive(&'static str, f64),
    #[error("no pupil sample falls inside the aperture")]
    Empty,
}

/// [`Aperture`] builder
#[derive(Debug, Clone, PartialEq)]
pub struct ApertureBuilder {
    pub diameter: f64,
    pub obscuration: f64,
    pub wavelength: f64,
    pub pad_factor: f64,
    pub oversampling: f64,
    pub max_scale: f64,
    pub field: f64,
}
/// Default properties:
///  * diameter     : 8.36m
///  * obscuration  : 0.61
///  * wavelength   : 700nm
///  * pad factor   : 1
///  * oversampling : 1
///  * max. scale   : 1.25cm
///  * field        : 2.56arcsec
impl Default for ApertureBuilder {
    fn default() -> Self {
        Self {
            diameter: 8.36,
            obscuration: 0.61,
            wavelength: 700.,
            pad_factor: 1.,
            oversampling: 1.,
            max_scale: 0.0125,
            field: 2.56,
        }
    }
}
impl ApertureBuilder {
    /// Set the pupil diameter in meters
    pub fn diameter(self, diameter: f64) -> Self {
        Self { diameter, ..self }
    }
    /// Set the linear fractional obscuration
    pub fn obscuration(self, obscuration: f64) -> Self {
        Self {
            obscuration,
            ..self
        }
    }
    /// Set the wavelength in nanometers
    pub fn wavelength(self, wavelength: f64) -> Self {
        Self { wavelength, ..self }
    }
    /// Set the factor by which the PSF field is extended beyond the image field
    pub fn pad_factor(self, pad_factor: f64) -> Self {
        Self { pad_factor, ..self }
    }
    /// Set the factor by which the PSF is oversampled with respect to Nyquist
    pub fn oversampling(self, oversampling: f64) -> Self {
        Self {
            oversampling,
            ..self
        }
    }
    /// Set the largest pupil sampling in meters, usually the phase screen resolution
    pub fn max_scale(self, max_scale: f64) -> Self {
        Self { max_scale, ..self }
    }
    /// Set the image field of view in arcseconds
    pub fn field(self, field: f64) -> Self {
        Self { field, ..self }
    }
}
impl Builder for ApertureBuilder {
    type Component = Aperture;
    fn build(self) -> Result<Aperture> {
        if !(0.0..1.0).contains(&self.obscuration) {
            return Err(ApertureError::Obscuration(self.obscuration).into());
        }
        for (name, value) in [
            ("diameter", self.diameter),
            ("wavelength", self.wavelength),
            ("pad factor", self.pad_factor),
            ("oversampling", self.oversampling),
            ("max. scale", self.max_scale),
            ("field", self.field),
        ] {
            if !(value > 0.0) {
                return Err(ApertureError::NonPositive(name, value).into());
            }
        }
        let lambda = self.wavelength * 1e-9;
        // the PSF field lambda/scale must cover twice the padded image field
        let field_limited_scale = lambda / (2.0 * self.pad_factor * self.field.from_arcsec());
        let scale = self.max_scale.min(field_limited_scale);
        let plane_size = 2.0 * self.diameter * self.oversampling;
        let n = (plane_size / scale).ceil() as usize;
        let n_px = n + n % 2;

        let h = 0.5 * n_px as f64;
        let (r_out, r_in) = (0.5 * self.diameter, 0.5 * self.diameter * self.obscuration);
        let mut mask = vec![false; n_px * n_px];
        let mut illuminated = vec![];
        for j in 0..n_px {
            let y = (j as f64 - h + 0.5) * scale;
            for i in 0..n_px {
                let x = (i as f64 - h + 0.5) * scale;
                let r = x.hypot(y);
                if r <= r_out && r >= r_in {
                    let k = j * n_px + i;
                    mask[k] = true;
                    illuminated.push((k, x, y));
                }
            }
        }
        if illuminated.is_empty() {
            return Err(ApertureError::Empty.into());
        }
        log::info!(
            "Aperture: {}x{} pupil samples of {:.2}cm, {} illuminated",
            n_px,
            n_px,
            scale * 1e2,
            illuminated.len()
        );
        Ok(Aperture {
            diameter: self.diameter,
            obscuration: self.obscuration,
            n_px,
            scale,
            mask,
            illuminated,
        })
    }
}

/// Sampled annular pupil
#[derive(Debug, Clone)]
pub struct Aperture {
    pub diameter: f64,
    pub obscuration: f64,
    n_px: usize,
    scale: f64,
    mask: Vec<bool>,
    illuminated: Vec<(usize, f64, f64)>,
}
impl FromBuilder for Aperture {
    type ComponentBuilder = ApertureBuilder;
}
impl Aperture {
    /// Pupil plane side length in pixels
    pub fn n_px(&self) -> usize {
        self.n_px
    }
    /// Pupil plane sampling in meters
    pub fn scale(&self) -> f64 {
        self.scale
    }
    /// Pupil mask
    pub fn mask(&self) -> &[bool] {
        &self.mask
    }
    /// Illuminated samples as (index, x, y) with x and y in meters
    pub fn illuminated(&self) -> &[(usize, f64, f64)] {
        &self.illuminated
    }
    /// Sampled pupil area in m^2
    pub fn area(&self) -> f64 {
        self.illuminated.len() as f64 * self.scale * self.scale
    }
    /// Angular sampling in arcsecond of the PSF computed by Fourier transform at `wavelength` (nm)
    pub fn focal_scale(&self, wavelength: f64) -> f64 {
        (wavelength * 1e-9 / (self.n_px as f64 * self.scale)).to_arcsec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SecondKickError;
    use std::f64::consts::PI;

    #[test]
    fn annulus_area() {
        let aperture = Aperture::builder()
            .diameter(2.0)
            .obscuration(0.3)
            .max_scale(0.01)
            .build()
            .unwrap();
        let area = 0.25 * PI * 4.0 * (1.0 - 0.09);
        assert!((aperture.area() - area).abs() / area < 1e-2);
        assert_eq!(aperture.n_px() % 2, 0);
        assert!(aperture.n_px() as f64 * aperture.scale() >= 4.0);
    }

    #[test]
    fn nyquist_sampling() {
        let aperture = Aperture::builder()
            .diameter(1.0)
            .obscuration(0.0)
            .max_scale(0.05)
            .build()
            .unwrap();
        let nyquist = (700e-9 / 2.0).to_arcsec();
        assert!(aperture.focal_scale(700.0) <= nyquist * 1.0001);
    }

    #[test]
    fn invalid_obscuration() {
        assert!(matches!(
            Aperture::builder().obscuration(1.0).build(),
            Err(SecondKickError::Aperture(ApertureError::Obscuration(_)))
        ));
    }
}
