//!
//! # Validation run
//!
//! Sets up the turbulence, the two PSF methods and the sweep from a single set of
//! parameters, then runs the sweep and writes the comparison figure.
//!
//! Three independent random streams are derived from the seed:
//!  * `seed` for the layers wind,
//!  * `seed+1` for the phase screens,
//!  * `seed+2` for the photon shooting.

use rand::{rngs::StdRng, SeedableRng};
use std::path::{Path, PathBuf};

use crate::{
    aperture::ApertureBuilder, atmosphere::AtmosphereBuilder, fourier::FourierOpticsBuilder,
    second_kick::SecondKickBuilder, AdaptiveMoments, Builder, Figure, FourierOptics, FromBuilder,
    ReferenceProfile, Result, SecondKick, Sweep, SweepResults, TurbulenceProfile,
};

/// [`Validation`] builder
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationBuilder {
    pub seed: u64,
    pub r0_500: f64,
    pub turb_factor: f64,
    pub oscale: f64,
    pub n_layer: usize,
    pub reference: ReferenceProfile,
    pub time_step: f64,
    pub exposure_time: f64,
    pub screen_size: f64,
    pub screen_scale: f64,
    pub max_speed: f64,
    pub kmin: f64,
    pub kmax: f64,
    pub n_photon: usize,
    pub wavelength: f64,
    pub diameter: f64,
    pub obscuration: f64,
    pub nx: usize,
    pub scale: f64,
    pub pad_factor: f64,
    pub oversampling: f64,
    pub outfile: PathBuf,
}
/// Default properties:
///  * seed               : 1
///  * r0 at 500nm        : 15cm
///  * turb. factor       : 1
///  * L0                 : 25m
///  * layers             : 6
///  * reference profile  : Cerro Pachon, see [`ReferenceProfile`]
///  * time step          : 25ms
///  * exposure time      : 30s
///  * screen size        : 102.4m
///  * screen scale       : 1.25cm
///  * max. wind speed    : 20m/s
///  * kcrit range        : [0.05,0.5]
///  * photons            : 3e6
///  * wavelength         : 700nm
///  * diameter           : 8.36m
///  * obscuration        : 0.61
///  * image              : 64x64 pixels of 0.04arcsec
///  * pad factor         : 1
///  * oversampling       : 1
///  * figure             : output/secondKick.png
impl Default for ValidationBuilder {
    fn default() -> Self {
        Self {
            seed: 1,
            r0_500: 0.15,
            turb_factor: 1.0,
            oscale: 25.0,
            n_layer: 6,
            reference: ReferenceProfile::default(),
            time_step: 0.025,
            exposure_time: 30.0,
            screen_size: 102.4,
            screen_scale: 0.0125,
            max_speed: 20.0,
            kmin: 0.05,
            kmax: 0.5,
            n_photon: 3_000_000,
            wavelength: 700.0,
            diameter: 8.36,
            obscuration: 0.61,
            nx: 64,
            scale: 0.04,
            pad_factor: 1.0,
            oversampling: 1.0,
            outfile: Path::new("output").join("secondKick.png"),
        }
    }
}
impl ValidationBuilder {
    /// Set the random seed
    pub fn seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }
    /// Set the Fried parameter at 500nm in meters
    pub fn r0_500(self, r0_500: f64) -> Self {
        Self { r0_500, ..self }
    }
    /// Set the turbulence fudge factor
    pub fn turb_factor(self, turb_factor: f64) -> Self {
        Self {
            turb_factor,
            ..self
        }
    }
    /// Set the outer scale in meters
    pub fn oscale(self, oscale: f64) -> Self {
        Self { oscale, ..self }
    }
    /// Set the number of turbulence layers
    pub fn n_layer(self, n_layer: usize) -> Self {
        Self { n_layer, ..self }
    }
    /// Set the reference turbulence profile the layers are sampled from
    pub fn reference(self, reference: ReferenceProfile) -> Self {
        Self { reference, ..self }
    }
    /// Set the exposure time and the time step in seconds
    pub fn exposure(self, exposure_time: f64, time_step: f64) -> Self {
        Self {
            exposure_time,
            time_step,
            ..self
        }
    }
    /// Set the phase screens size and resolution in meters
    pub fn screen(self, screen_size: f64, screen_scale: f64) -> Self {
        Self {
            screen_size,
            screen_scale,
            ..self
        }
    }
    /// Set the maximum wind speed in m/s
    pub fn max_speed(self, max_speed: f64) -> Self {
        Self { max_speed, ..self }
    }
    /// Set the range of the critical spatial frequency in units of 1/r0
    pub fn kcrit_range(self, kmin: f64, kmax: f64) -> Self {
        Self { kmin, kmax, ..self }
    }
    /// Set the number of photons of the second kick PSF
    pub fn n_photon(self, n_photon: usize) -> Self {
        Self { n_photon, ..self }
    }
    /// Set the wavelength in nm
    pub fn wavelength(self, wavelength: f64) -> Self {
        Self { wavelength, ..self }
    }
    /// Set the pupil diameter in meters and the linear obscuration ratio
    pub fn pupil(self, diameter: f64, obscuration: f64) -> Self {
        Self {
            diameter,
            obscuration,
            ..self
        }
    }
    /// Set the output image size in pixels and the pixel scale in arcsecond
    pub fn image(self, nx: usize, scale: f64) -> Self {
        Self { nx, scale, ..self }
    }
    /// Set the PSF field padding and oversampling factors
    pub fn sampling(self, pad_factor: f64, oversampling: f64) -> Self {
        Self {
            pad_factor,
            oversampling,
            ..self
        }
    }
    /// Set the figure path
    pub fn outfile<P: AsRef<Path>>(self, outfile: P) -> Self {
        Self {
            outfile: outfile.as_ref().to_path_buf(),
            ..self
        }
    }
}
impl Builder for ValidationBuilder {
    type Component = Validation;
    fn build(self) -> Result<Validation> {
        let sweep = Sweep::new(self.kmin, self.kmax)?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let turbulence = TurbulenceProfile::from_reference(&self.reference, self.n_layer)?
            .random_wind(self.max_speed, &mut rng);
        let atmosphere = AtmosphereBuilder::default()
            .r0_500(self.r0_500)
            .turb_factor(self.turb_factor)
            .oscale(self.oscale)
            .turbulence_profile(turbulence)
            .screen_size(self.screen_size)
            .screen_scale(self.screen_scale)
            .seed(self.seed.wrapping_add(1));
        let aperture = ApertureBuilder::default()
            .diameter(self.diameter)
            .obscuration(self.obscuration)
            .wavelength(self.wavelength)
            .pad_factor(self.pad_factor)
            .oversampling(self.oversampling);
        let fourier = FourierOpticsBuilder::default()
            .atmosphere(atmosphere.clone())
            .aperture(aperture.clone())
            .exposure_time(self.exposure_time)
            .time_step(self.time_step)
            .image(self.nx, self.scale)
            .build()?;
        let second_kick = SecondKickBuilder::default()
            .r0_500(self.r0_500)
            .aperture(aperture.max_scale(self.screen_scale))
            .n_photon(self.n_photon)
            .image(self.nx, self.scale)
            .seed(self.seed.wrapping_add(2))
            .build()?;
        log::info!(
            "PSF sampling: {}x{} pupil pixels of {:.4}m",
            fourier.aperture().n_px(),
            fourier.aperture().n_px(),
            fourier.aperture().scale()
        );
        Ok(Validation {
            atmosphere,
            fourier,
            second_kick,
            sweep,
            moments: AdaptiveMoments::default(),
            figure: Figure::default(),
            outfile: self.outfile,
        })
    }
}

/// Second kick versus Fourier optics comparison
#[derive(Debug, Clone)]
pub struct Validation {
    atmosphere: AtmosphereBuilder,
    fourier: FourierOptics,
    second_kick: SecondKick,
    sweep: Sweep,
    moments: AdaptiveMoments,
    figure: Figure,
    outfile: PathBuf,
}
impl FromBuilder for Validation {
    type ComponentBuilder = ValidationBuilder;
}
impl Validation {
    /// Atmosphere configuration with the drawn winds
    pub fn atmosphere(&self) -> &AtmosphereBuilder {
        &self.atmosphere
    }
    pub fn sweep(&self) -> &Sweep {
        &self.sweep
    }
    pub fn outfile(&self) -> &Path {
        &self.outfile
    }
    /// Runs the cutoff sweep and saves the comparison figure
    pub fn run(&mut self) -> Result<SweepResults> {
        let results = self
            .sweep
            .run(&mut self.fourier, &mut self.second_kick, &self.moments)?;
        self.figure.save(&results.points, &self.outfile)?;
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AtmosphereError, SecondKickError};

    fn small() -> ValidationBuilder {
        Validation::builder()
            .n_layer(2)
            .screen(6.4, 0.1)
            .exposure(0.1, 0.05)
            .pupil(1.0, 0.3)
            .image(16, 0.2)
            .n_photon(10_000)
    }

    #[test]
    fn one_layer_is_degenerate() {
        assert!(matches!(
            small().n_layer(1).build(),
            Err(SecondKickError::Atmosphere(
                AtmosphereError::DegenerateLayerCount(1)
            ))
        ));
    }

    #[test]
    fn reproducible_winds() {
        let a = small().seed(7).build().unwrap();
        let b = small().seed(7).build().unwrap();
        let c = small().seed(8).build().unwrap();
        assert_eq!(a.atmosphere(), b.atmosphere());
        assert_ne!(
            a.atmosphere().turbulence.wind_speed,
            c.atmosphere().turbulence.wind_speed
        );
        assert_eq!(a.atmosphere().seed, 8);
        assert!(a
            .atmosphere()
            .turbulence
            .wind_speed
            .iter()
            .all(|v| (0.0..20.0).contains(v)));
    }

    #[test]
    fn cutoff_grid() {
        let validation = small().build().unwrap();
        let kcrits = validation.sweep().kcrits();
        assert_eq!(kcrits.len(), 4);
        assert!((kcrits[0] - 0.05).abs() < 1e-12 && (kcrits[3] - 0.5).abs() < 1e-12);
    }
}
