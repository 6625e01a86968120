/*!
# Second kick validation

Renders the PSFs of the Fourier optics and of the second kick approximation for 4
critical spatial frequencies and writes the comparison figure.

```shell
RUST_LOG=info cargo r -r -- --nlayers 6 --outfile output/secondKick.png
```
*/

use std::path::PathBuf;

use clap::Parser;
use second_kick::{Builder, FromBuilder, ReferenceProfile, Validation};

#[derive(Debug, Parser)]
#[command(
    name = "second-kick",
    about = "Compares the second kick PSF approximation against Fourier optics"
)]
struct Cli {
    /// random seed
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Fried parameter at 500nm [m]
    #[arg(long = "r0_500", default_value_t = 0.15)]
    r0_500: f64,
    /// turbulence fudge factor
    #[arg(long = "turb_factor", default_value_t = 1.0)]
    turb_factor: f64,
    /// outer scale [m]
    #[arg(long = "L0", default_value_t = 25.0)]
    oscale: f64,
    /// number of turbulence layers
    #[arg(long, default_value_t = 6)]
    nlayers: usize,
    /// time step [s]
    #[arg(long = "time_step", default_value_t = 0.025)]
    time_step: f64,
    /// exposure time [s]
    #[arg(long, default_value_t = 30.0)]
    exptime: f64,
    /// phase screens size [m], the screens are periodic
    #[arg(long = "screen_size", default_value_t = 102.4)]
    screen_size: f64,
    /// phase screens resolution [m]
    #[arg(long = "screen_scale", default_value_t = 0.0125)]
    screen_scale: f64,
    /// maximum wind speed [m/s]
    #[arg(long = "max_speed", default_value_t = 20.0)]
    max_speed: f64,
    /// minimum kcrit [1/r0]
    #[arg(long, default_value_t = 0.05)]
    kmin: f64,
    /// maximum kcrit [1/r0]
    #[arg(long, default_value_t = 0.5)]
    kmax: f64,
    /// number of photons of the second kick PSF
    #[arg(long, default_value_t = 3_000_000)]
    nphot: usize,
    /// wavelength [nm]
    #[arg(long, default_value_t = 700.0)]
    lam: f64,
    /// pupil diameter [m]
    #[arg(long, default_value_t = 8.36)]
    diam: f64,
    /// linear fractional obscuration
    #[arg(long, default_value_t = 0.61)]
    obscuration: f64,
    /// output image size [px]
    #[arg(long, default_value_t = 64)]
    nx: usize,
    /// output pixel scale [arcsec]
    #[arg(long, default_value_t = 0.04)]
    scale: f64,
    /// PSF field padding factor
    #[arg(long = "pad_factor", default_value_t = 1.0)]
    pad_factor: f64,
    /// PSF oversampling factor
    #[arg(long, default_value_t = 1.0)]
    oversampling: f64,
    /// figure path
    #[arg(long, default_value = "output/secondKick.png")]
    outfile: PathBuf,
    /// reference turbulence profile toml file
    #[arg(long)]
    profile: Option<PathBuf>,
    /// saves the atmosphere configuration into a toml file
    #[arg(long = "save-profile")]
    save_profile: Option<PathBuf>,
    /// saves the sweep results into a pickle file
    #[arg(long)]
    pickle: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let reference = match &cli.profile {
        Some(path) => ReferenceProfile::load(path)?,
        None => ReferenceProfile::default(),
    };
    let mut validation = Validation::builder()
        .seed(cli.seed)
        .r0_500(cli.r0_500)
        .turb_factor(cli.turb_factor)
        .oscale(cli.oscale)
        .n_layer(cli.nlayers)
        .reference(reference)
        .exposure(cli.exptime, cli.time_step)
        .screen(cli.screen_size, cli.screen_scale)
        .max_speed(cli.max_speed)
        .kcrit_range(cli.kmin, cli.kmax)
        .n_photon(cli.nphot)
        .wavelength(cli.lam)
        .pupil(cli.diam, cli.obscuration)
        .image(cli.nx, cli.scale)
        .sampling(cli.pad_factor, cli.oversampling)
        .outfile(&cli.outfile)
        .build()?;
    if let Some(path) = &cli.save_profile {
        validation.atmosphere().save(path)?;
        log::info!("Atmosphere saved to {}", path.display());
    }

    let results = validation.run()?;
    for point in &results.points {
        println!(
            "kcrit={:.4}: FFT sigma={:?}, 2nd kick sigma={:?}",
            point.kcrit, point.fft_sigma, point.second_kick_sigma
        );
    }
    if let Some(path) = &cli.pickle {
        results.to_pickle(path)?;
        log::info!("Sweep results saved to {}", path.display());
    }

    Ok(())
}
