use std::{path::PathBuf, process::Command, time::Instant};

use second_kick::{
    AtmosphereError, Builder, FromBuilder, ReferenceProfile, SecondKickError, Validation,
};

fn tmp(name: &str) -> PathBuf {
    std::env::temp_dir().join("second-kick_tests").join(name)
}

fn small(outfile: &PathBuf) -> second_kick::builders::ValidationBuilder {
    Validation::builder()
        .n_layer(2)
        .screen(6.4, 0.1)
        .exposure(0.1, 0.05)
        .pupil(1.0, 0.3)
        .image(16, 0.2)
        .n_photon(20_000)
        .kcrit_range(0.1, 0.1)
        .outfile(outfile)
}

#[test]
fn end_to_end() {
    let outfile = tmp("end_to_end").join("secondKick.png");
    if outfile.exists() {
        std::fs::remove_file(&outfile).unwrap();
    }
    let mut validation = small(&outfile).build().unwrap();
    let now = Instant::now();
    let results = validation.run().unwrap();
    println!("Validation in {:?}", now.elapsed());
    assert_eq!(results.points.len(), 4);
    assert!(results.kcrits().iter().all(|k| (k - 0.1).abs() < 1e-12));
    for point in &results.points {
        assert_eq!(point.fft.nx, 16);
        assert_eq!(point.second_kick.nx, 16);
        assert!(point.fft.flux() > 0.0);
        assert!(point.second_kick.flux() > 0.0);
    }
    // same cutoff, same seeds
    assert_eq!(results.points[0], results.points[3]);
    assert!(outfile.exists());
}

#[test]
fn single_layer() {
    let outfile = tmp("single_layer").join("secondKick.png");
    assert!(matches!(
        small(&outfile).n_layer(1).build(),
        Err(SecondKickError::Atmosphere(
            AtmosphereError::DegenerateLayerCount(1)
        ))
    ));
    assert!(!outfile.exists());
}

#[test]
fn custom_reference_profile() {
    let dir = tmp("custom_reference_profile");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("profile.toml");
    std::fs::write(&path, "altitude = [0.0, 10.0]\nweight = [0.8, 0.2]\n").unwrap();
    let reference = ReferenceProfile::load(&path).unwrap();
    let validation = small(&dir.join("secondKick.png"))
        .reference(reference)
        .build()
        .unwrap();
    let turbulence = &validation.atmosphere().turbulence;
    assert_eq!(turbulence.altitude, vec![0.0, 10.0]);
    assert!((turbulence.xi0[0] - 0.8).abs() < 1e-12);
}

#[test]
fn command_line() {
    let dir = tmp("command_line");
    std::fs::create_dir_all(&dir).unwrap();
    let outfile = dir.join("figure.png");
    let pickle = dir.join("results.pkl");
    let profile = dir.join("atmosphere.toml");
    let status = Command::new(env!("CARGO_BIN_EXE_second-kick"))
        .args(["--nlayers", "2"])
        .args(["--screen_size", "6.4", "--screen_scale", "0.1"])
        .args(["--exptime", "0.1", "--time_step", "0.05"])
        .args(["--diam", "1", "--obscuration", "0.3"])
        .args(["--nx", "16", "--scale", "0.2", "--nphot", "10000"])
        .arg("--outfile")
        .arg(&outfile)
        .arg("--pickle")
        .arg(&pickle)
        .arg("--save-profile")
        .arg(&profile)
        .status()
        .unwrap();
    assert!(status.success());
    assert!(outfile.exists() && pickle.exists() && profile.exists());
    let atmosphere = second_kick::builders::AtmosphereBuilder::load(&profile).unwrap();
    assert_eq!(atmosphere.turbulence.n_layer, 2);
    assert_eq!(atmosphere.seed, 2);
}

#[test]
fn command_line_failure() {
    let status = Command::new(env!("CARGO_BIN_EXE_second-kick"))
        .args(["--nlayers", "1"])
        .status()
        .unwrap();
    assert!(!status.success());
}
