//!
//! # Second kick validation
//!
//! Compares two ways of simulating the point spread function of a telescope
//! looking through a turbulent atmosphere:
//!  * the full Fourier optics integration of the PSF through a stack of
//!    wind-advected phase screens, see [`FourierOptics`],
//!  * the analytic "second kick" approximation of the high spatial
//!    frequencies of the turbulence, see [`SecondKick`].
//!
//! Both methods are restricted to the turbulence modes above a critical
//! spatial frequency `kcrit` (in units of 1/r0). A [`Sweep`] over 4
//! log-spaced `kcrit` values renders both PSFs, measures their size with
//! [`AdaptiveMoments`] and the [`Figure`] lays them out side by side.
//!
//! Every element is created with the builder associated to it:
//! ```no_run
//! use second_kick::{Builder, FromBuilder, Validation};
//! let mut validation = Validation::builder().n_layer(3).build().unwrap();
//! let results = validation.run().unwrap();
//! ```

pub mod aperture;
pub mod atmosphere;
pub mod builders;
pub mod error;
pub mod fft;
pub mod figure;
pub mod fourier;
pub mod imaging;
pub mod moments;
pub mod second_kick;
pub mod sweep;
pub mod validation;

#[doc(inline)]
pub use self::aperture::{Aperture, ApertureError};
#[doc(inline)]
pub use self::atmosphere::{
    Atmosphere, AtmosphereError, Layer, ReferenceProfile, TurbulenceProfile,
};
#[doc(inline)]
pub use self::error::SecondKickError;
#[doc(inline)]
pub use self::figure::{Figure, FigureError};
#[doc(inline)]
pub use self::fourier::FourierOptics;
#[doc(inline)]
pub use self::imaging::{Image, ImagingError};
#[doc(inline)]
pub use self::moments::{AdaptiveMoments, MomentsError, ShapeData};
#[doc(inline)]
pub use self::second_kick::SecondKick;
#[doc(inline)]
pub use self::sweep::{MomentFit, PsfMethod, Sweep, SweepError, SweepPoint, SweepResults};
#[doc(inline)]
pub use self::validation::Validation;

pub type Result<T> = std::result::Result<T, SecondKickError>;

/// Builder type trait
pub trait Builder: Default {
    type Component;
    fn new() -> Self {
        Default::default()
    }
    fn build(self) -> Result<Self::Component>;
}

/// Access to the builder of a component
pub trait FromBuilder {
    type ComponentBuilder: Builder;
    fn builder() -> Self::ComponentBuilder {
        Self::ComponentBuilder::default()
    }
}

/// Fried parameter at `wavelength` (in nm) scaled from its value at 500nm
pub fn r0_at(r0_500: f64, wavelength: f64) -> f64 {
    r0_500 * (wavelength / 500.0).powf(1.2)
}
