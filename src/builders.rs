pub use crate::aperture::ApertureBuilder;
pub use crate::atmosphere::{AtmosphereBuilder, AtmosphereBuilderError};
pub use crate::fourier::FourierOpticsBuilder;
pub use crate::second_kick::SecondKickBuilder;
pub use crate::validation::ValidationBuilder;
