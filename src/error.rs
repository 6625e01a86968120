use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SecondKickError {
    #[error("cannot build `::second_kick::Atmosphere`")]
    Atmosphere(#[from] crate::AtmosphereError),
    #[error("cannot build `::second_kick::Aperture`")]
    Aperture(#[from] crate::ApertureError),
    #[error("invalid `::second_kick::Image`")]
    Imaging(#[from] crate::ImagingError),
    #[error("cannot run the cutoff sweep")]
    Sweep(#[from] crate::SweepError),
    #[error("cannot draw the comparison figure")]
    Figure(#[from] crate::FigureError),
    #[error("invalid {0}: {1}, expected a strictly positive value")]
    NonPositive(&'static str, f64),
    #[error("cannot create pickle file: {1}")]
    Create(#[source] std::io::Error, PathBuf),
    #[error("cannot serialize the sweep results into pickle")]
    Pickle(#[from] serde_pickle::Error),
}
