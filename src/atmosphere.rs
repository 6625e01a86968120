use indicatif::{ProgressBar, ProgressStyle};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{
    f64::consts::PI,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use crate::FromBuilder;

mod builder;
mod screen;
pub use builder::{AtmosphereBuilder, AtmosphereBuilderError};
pub use screen::{phase_psd, PhaseScreen};

#[derive(Debug, thiserror::Error)]
pub enum AtmosphereError {
    #[error("cannot create `::second_kick::AtmosphereBuilder`")]
    Builder(#[from] AtmosphereBuilderError),
    #[error("cannot space {0} layer(s) uniformly in altitude: division by zero, at least 2 layers are required")]
    DegenerateLayerCount(usize),
    #[error("reference profile altitudes must be sorted and as many as the weights")]
    ReferenceProfile,
    #[error("reference profile weights must be finite, non-negative and not all zero")]
    ReferenceWeights,
    #[error("cannot open reference profile toml file: {1}")]
    Open(#[source] std::io::Error, PathBuf),
    #[error("cannot deserialize reference profile from toml")]
    Load(#[from] toml::de::Error),
    #[error("screen of {size}m cannot be sampled with {scale}m pixels")]
    ScreenSampling { size: f64, scale: f64 },
    #[error("the turbulence profile has {n_layer} layers but {found} {what}")]
    ProfileLength {
        n_layer: usize,
        found: usize,
        what: &'static str,
    },
}
pub type Result<T> = std::result::Result<T, AtmosphereError>;

/// Reference turbulence profile: relative strength versus altitude
///
/// Default to the SCIDAR measurements on Cerro Pachon from the 1998 Gemini site
/// selection (Ellerbroek 2002, JOSA Vol 19 No 9)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceProfile {
    /// Altitudes in km
    pub altitude: Vec<f64>,
    /// Refractive index structure function weights
    pub weight: Vec<f64>,
}
impl Default for ReferenceProfile {
    fn default() -> Self {
        Self::ellerbroek()
    }
}
impl ReferenceProfile {
    /// Cerro Pachon SCIDAR profile
    pub fn ellerbroek() -> Self {
        Self {
            altitude: vec![0.0, 2.58, 5.16, 7.73, 12.89, 15.46],
            weight: vec![0.652, 0.172, 0.055, 0.025, 0.074, 0.022],
        }
    }
    /// Load a reference profile from a toml file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(&path)
            .map_err(|e| AtmosphereError::Open(e, path.as_ref().to_path_buf()))?;
        let mut toml = String::new();
        file.read_to_string(&mut toml)
            .map_err(|e| AtmosphereError::Open(e, path.as_ref().to_path_buf()))?;
        let profile: ReferenceProfile = toml::from_str(&toml)?;
        profile.check()?;
        Ok(profile)
    }
    fn check(&self) -> Result<()> {
        if self.altitude.is_empty()
            || self.altitude.len() != self.weight.len()
            || self.altitude.windows(2).any(|h| h[1] < h[0])
        {
            Err(AtmosphereError::ReferenceProfile)
        } else if self.weight.iter().any(|w| !(w.is_finite() && *w >= 0.0)) {
            Err(AtmosphereError::ReferenceWeights)
        } else {
            Ok(())
        }
    }
    /// Highest altitude of the profile in km
    pub fn max_altitude(&self) -> f64 {
        self.altitude.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }
    /// Linear interpolation of the weights at `altitude` (km)
    ///
    /// Beyond the profile, the weights of the first and last altitudes are used.
    pub fn interpolate(&self, altitude: f64) -> f64 {
        let n = self.altitude.len();
        if altitude <= self.altitude[0] {
            return self.weight[0];
        }
        if altitude >= self.altitude[n - 1] {
            return self.weight[n - 1];
        }
        let k = self.altitude.partition_point(|h| *h <= altitude);
        let (h0, h1) = (self.altitude[k - 1], self.altitude[k]);
        let (w0, w1) = (self.weight[k - 1], self.weight[k]);
        if h1 == h0 {
            w0
        } else {
            w0 + (w1 - w0) * (altitude - h0) / (h1 - h0)
        }
    }
}

/// Turbulence layers parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurbulenceProfile {
    pub n_layer: usize,
    /// Altitudes in km
    pub altitude: Vec<f64>,
    /// Fractional weights summing to 1
    pub xi0: Vec<f64>,
    /// Wind speeds in m/s
    pub wind_speed: Vec<f64>,
    /// Wind directions in radians
    pub wind_direction: Vec<f64>,
}
/// Default properties:
///  * n_layer        : 6
///  * altitude       : uniformly spaced from 0 to 15.46km
///  * xi0            : Cerro Pachon profile interpolated at the altitudes
///  * wind speed     : 0 m/s
///  * wind direction : 0 rd
impl Default for TurbulenceProfile {
    fn default() -> Self {
        let reference = ReferenceProfile::ellerbroek();
        let (altitude, weight) = Self::sample(&reference, reference.altitude.len());
        Self::normalized(altitude, weight)
    }
}
impl TurbulenceProfile {
    /// Samples a reference profile at `n_layer` uniformly spaced altitudes
    ///
    /// The layers span from the ground to the highest reference altitude and the
    /// interpolated weights are renormalized to unit sum.
    /// Wind speeds and directions are set to 0.
    pub fn from_reference(reference: &ReferenceProfile, n_layer: usize) -> Result<Self> {
        reference.check()?;
        if n_layer < 2 {
            return Err(AtmosphereError::DegenerateLayerCount(n_layer));
        }
        let (altitude, weight) = Self::sample(reference, n_layer);
        if !(weight.iter().sum::<f64>() > 0.0) {
            return Err(AtmosphereError::ReferenceWeights);
        }
        Ok(Self::normalized(altitude, weight))
    }
    fn sample(reference: &ReferenceProfile, n_layer: usize) -> (Vec<f64>, Vec<f64>) {
        let max_altitude = reference.max_altitude();
        let altitude: Vec<f64> = (0..n_layer)
            .map(|i| max_altitude * i as f64 / (n_layer - 1) as f64)
            .collect();
        let weight = altitude.iter().map(|h| reference.interpolate(*h)).collect();
        (altitude, weight)
    }
    fn normalized(altitude: Vec<f64>, weight: Vec<f64>) -> Self {
        let n_layer = altitude.len();
        let total: f64 = weight.iter().sum();
        Self {
            n_layer,
            altitude,
            xi0: weight.into_iter().map(|w| w / total).collect(),
            wind_speed: vec![0f64; n_layer],
            wind_direction: vec![0f64; n_layer],
        }
    }
    /// Draws a random wind for each layer
    ///
    /// For each layer in turn, the speed is drawn uniformly in `[0,max_speed)` m/s
    /// and then the direction uniformly in `[0,2pi)`.
    pub fn random_wind<R: Rng>(self, max_speed: f64, rng: &mut R) -> Self {
        let mut wind_speed = Vec::with_capacity(self.n_layer);
        let mut wind_direction = Vec::with_capacity(self.n_layer);
        for _ in 0..self.n_layer {
            wind_speed.push(rng.gen::<f64>() * max_speed);
            wind_direction.push(rng.gen::<f64>() * 2.0 * PI);
        }
        Self {
            wind_speed,
            wind_direction,
            ..self
        }
    }
    fn check(&self) -> Result<()> {
        for (found, what) in [
            (self.altitude.len(), "altitudes"),
            (self.xi0.len(), "weights"),
            (self.wind_speed.len(), "wind speeds"),
            (self.wind_direction.len(), "wind directions"),
        ] {
            if found != self.n_layer {
                return Err(AtmosphereError::ProfileLength {
                    n_layer: self.n_layer,
                    found,
                    what,
                });
            }
        }
        Ok(())
    }
    /// Per layer records with the Fried parameter of each layer
    ///
    /// The net Fried parameter `r0_500` is distributed according to the layer weights
    /// as `r0_500 * xi0^(-3/5)`, then scaled by `turb_factor^(-3/5)`.
    pub fn layers(&self, r0_500: f64, turb_factor: f64) -> Vec<Layer> {
        let fudge = turb_factor.powf(-0.6);
        self.altitude
            .iter()
            .zip(&self.xi0)
            .zip(self.wind_speed.iter().zip(&self.wind_direction))
            .map(|((&altitude, &weight), (&wind_speed, &wind_direction))| Layer {
                altitude,
                weight,
                wind_speed,
                wind_direction,
                r0_500: layer_r0(r0_500, weight) * fudge,
            })
            .collect()
    }
}

/// Fried parameter of a layer of fractional `weight`
pub fn layer_r0(r0_500: f64, weight: f64) -> f64 {
    r0_500 * weight.powf(-0.6)
}

/// A turbulence layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Altitude in km
    pub altitude: f64,
    /// Fractional weight
    pub weight: f64,
    /// Wind speed in m/s
    pub wind_speed: f64,
    /// Wind direction in radians
    pub wind_direction: f64,
    /// Fried parameter at 500nm in meters
    pub r0_500: f64,
}
impl Layer {
    /// Wind velocity vector in m/s
    pub fn velocity(&self) -> (f64, f64) {
        let (s, c) = self.wind_direction.sin_cos();
        (self.wind_speed * c, self.wind_speed * s)
    }
}

/// Stack of turbulence layers
///
/// The phase screens are drawn by [`Atmosphere::instantiate`] from the atmosphere seed,
/// instantiating the same atmosphere twice gives the same screens.
#[derive(Debug, Clone)]
pub struct Atmosphere {
    pub oscale: f64,
    pub screen_size: f64,
    pub screen_scale: f64,
    pub seed: u64,
    layers: Vec<Layer>,
    screens: Vec<PhaseScreen>,
}
impl FromBuilder for Atmosphere {
    type ComponentBuilder = AtmosphereBuilder;
}
impl Atmosphere {
    /// Turbulence layers
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
    /// Phase screens, empty until instantiated
    pub fn screens(&self) -> &[PhaseScreen] {
        &self.screens
    }
    /// Fried parameter at 500nm of the whole atmosphere
    pub fn r0_500(&self) -> f64 {
        self.layers
            .iter()
            .map(|l| l.r0_500.powf(-5.0 / 3.0))
            .sum::<f64>()
            .powf(-0.6)
    }
    pub fn is_instantiated(&self) -> bool {
        !self.screens.is_empty()
    }
    /// Draws the phase screens keeping only the modes with `k>=kmin` (radians per meter)
    pub fn instantiate(&mut self, kmin: f64) -> &mut Self {
        let n_px = (self.screen_size / self.screen_scale).round() as usize;
        log::info!(
            "Inflating {} {}x{} phase screens with kmin={:.3}rd/m",
            self.layers.len(),
            n_px,
            n_px,
            kmin
        );
        let mut rng = StdRng::seed_from_u64(self.seed);
        let seeds: Vec<u64> = self.layers.iter().map(|_| rng.gen()).collect();
        let pb = ProgressBar::new(self.layers.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{msg} [{eta_precise}] {bar:50.cyan/blue} {pos:>7}/{len:7}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb.set_message("Phase screens");
        let (scale, oscale) = (self.screen_scale, self.oscale);
        self.screens = self
            .layers
            .par_iter()
            .zip(seeds.into_par_iter())
            .map(|(layer, seed)| {
                let mut rng = StdRng::seed_from_u64(seed);
                let screen = PhaseScreen::generate(
                    n_px,
                    scale,
                    layer.r0_500,
                    oscale,
                    kmin,
                    layer.velocity(),
                    &mut rng,
                );
                pb.inc(1);
                screen
            })
            .collect();
        pb.finish_and_clear();
        self
    }
    /// Phase in radians at `wavelength` (nm) through all the layers at `(x,y)` meters and `t` seconds
    pub fn phase(&self, x: f64, y: f64, t: f64, wavelength: f64) -> f64 {
        self.screens.iter().map(|s| s.phase(x, y, t)).sum::<f64>() * 500.0 / wavelength
    }
}
