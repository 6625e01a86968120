use std::{
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use crate::{Builder, SecondKickError};

use super::{layer_r0, Atmosphere, AtmosphereError, TurbulenceProfile};

/// [`Atmosphere`] builder type
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AtmosphereBuilder {
    pub r0_500: f64,
    pub turb_factor: f64,
    pub oscale: f64,
    pub turbulence: TurbulenceProfile,
    pub screen_size: f64,
    pub screen_scale: f64,
    pub seed: u64,
}
/// Default properties:
///  * r0 at 500nm  : 15cm
///  * turb. factor : 1
///  * L0           : 25m
///  * turbulence profile: Cerro Pachon, see [`TurbulenceProfile`]
///  * screen size  : 102.4m
///  * screen scale : 1.25cm
///  * seed         : 2
impl Default for AtmosphereBuilder {
    fn default() -> Self {
        AtmosphereBuilder {
            r0_500: 0.15,
            turb_factor: 1.0,
            oscale: 25.,
            turbulence: TurbulenceProfile::default(),
            screen_size: 102.4,
            screen_scale: 0.0125,
            seed: 2,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AtmosphereBuilderError {
    #[error("cannot open `::second_kick::AtmosphereBuilder` toml file: {1}")]
    Open(#[source] std::io::Error, PathBuf),
    #[error("cannot create `::second_kick::AtmosphereBuilder` toml file: {1}")]
    Create(#[source] std::io::Error, PathBuf),
    #[error("cannot read `::second_kick::AtmosphereBuilder` toml file: {1}")]
    Read(#[source] std::io::Error, PathBuf),
    #[error("cannot write `::second_kick::AtmosphereBuilder` toml file: {1}")]
    Write(#[source] std::io::Error, PathBuf),
    #[error("cannot deserialize `::second_kick::AtmosphereBuilder` from toml")]
    Load(#[from] toml::de::Error),
    #[error("cannot serialize `::second_kick::AtmosphereBuilder` into toml")]
    Save(#[from] toml::ser::Error),
}

/// ## `Atmosphere` builder
impl AtmosphereBuilder {
    /// Load the atmospheric builder from a toml
    pub fn load<P: AsRef<Path>>(path: P) -> std::result::Result<Self, AtmosphereBuilderError> {
        let mut file = File::open(&path)
            .map_err(|e| AtmosphereBuilderError::Open(e, path.as_ref().to_path_buf()))?;
        let mut toml = String::new();
        file.read_to_string(&mut toml)
            .map_err(|e| AtmosphereBuilderError::Read(e, path.as_ref().to_path_buf()))?;
        let builder: AtmosphereBuilder = toml::from_str(&toml)?;
        Ok(builder)
    }
    /// Save the atmospheric builder into a toml
    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::result::Result<(), AtmosphereBuilderError> {
        let toml = toml::to_string_pretty(self)?;
        let mut file = File::create(&path)
            .map_err(|e| AtmosphereBuilderError::Create(e, path.as_ref().to_path_buf()))?;
        write!(file, "# ::second_kick::AtmosphereBuilder\n\n{}", toml)
            .map_err(|e| AtmosphereBuilderError::Write(e, path.as_ref().to_path_buf()))?;
        Ok(())
    }
    /// Set the net Fried parameter at 500nm in meters
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
    /// Set outer scale value in meters
    pub fn oscale(self, oscale: f64) -> Self {
        Self { oscale, ..self }
    }
    /// Set the turbulence profile
    pub fn turbulence_profile(self, turbulence: TurbulenceProfile) -> Self {
        Self { turbulence, ..self }
    }
    /// Set the phase screens size in meters
    ///
    /// The screens are periodic
    pub fn screen_size(self, screen_size: f64) -> Self {
        Self {
            screen_size,
            ..self
        }
    }
    /// Set the phase screens resolution in meters
    pub fn screen_scale(self, screen_scale: f64) -> Self {
        Self {
            screen_scale,
            ..self
        }
    }
    /// Set the seed of the phase screens random generator
    pub fn seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }
}
impl Builder for AtmosphereBuilder {
    type Component = Atmosphere;
    /// Build the `Atmosphere`
    fn build(self) -> std::result::Result<Atmosphere, SecondKickError> {
        self.turbulence.check()?;
        for (name, value) in [
            ("r0_500", self.r0_500),
            ("turb_factor", self.turb_factor),
            ("L0", self.oscale),
        ] {
            if !(value > 0.0) {
                return Err(SecondKickError::NonPositive(name, value));
            }
        }
        if !(self.screen_scale > 0.0 && self.screen_size >= 2.0 * self.screen_scale) {
            return Err(AtmosphereError::ScreenSampling {
                size: self.screen_size,
                scale: self.screen_scale,
            }
            .into());
        }
        let layers = self.turbulence.layers(self.r0_500, self.turb_factor);
        for layer in &layers {
            let (vx, vy) = layer.velocity();
            log::info!(
                "Adding layer at altitude {:5.2} km with velocity ({:5.2}, {:5.2}) m/s, and r0_500 {:5.3} m.",
                layer.altitude,
                vx,
                vy,
                layer_r0(self.r0_500, layer.weight)
            );
        }
        let atm = Atmosphere {
            oscale: self.oscale,
            screen_size: self.screen_size,
            screen_scale: self.screen_scale,
            seed: self.seed,
            layers,
            screens: vec![],
        };
        log::info!("Atmosphere r0 at 500nm: {:.3}m", atm.r0_500());
        Ok(atm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FromBuilder;

    #[test]
    fn toml_round_trip() -> anyhow::Result<()> {
        let path = std::env::temp_dir().join("second-kick_atm_builder.toml");
        let builder = Atmosphere::builder().seed(11).oscale(30.0);
        builder.save(&path)?;
        let loaded = AtmosphereBuilder::load(&path)?;
        assert_eq!(builder, loaded);
        std::fs::remove_file(path)?;
        Ok(())
    }

    #[test]
    fn missing_toml() {
        let path = std::env::temp_dir().join("second-kick_missing_atm_builder.toml");
        let err = AtmosphereBuilder::load(&path).unwrap_err();
        assert!(matches!(err, AtmosphereBuilderError::Open(..)));
        assert!(err
            .to_string()
            .starts_with("cannot open `::second_kick::AtmosphereBuilder` toml file"));
    }

    #[test]
    fn invalid_sampling() {
        let result = Atmosphere::builder()
            .screen_size(1.0)
            .screen_scale(0.6)
            .build();
        assert!(matches!(
            result,
            Err(SecondKickError::Atmosphere(AtmosphereError::ScreenSampling { .. }))
        ));
    }

    #[test]
    fn layers_are_built() {
        let atm = Atmosphere::builder().build().unwrap();
        assert_eq!(atm.layers().len(), 6);
        assert!(!atm.is_instantiated());
        assert!((atm.r0_500() - 0.15).abs() < 1e-12);
    }
}
