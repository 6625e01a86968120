use criterion::*;
use rustfft::num_complex::Complex64;
use second_kick::{
    aperture::ApertureBuilder, fft::Fft2, AdaptiveMoments, Builder, FromBuilder, Image, SecondKick,
};

pub fn fft2(c: &mut Criterion) {
    let mut group = c.benchmark_group("2D FFT");
    for n in [64usize, 128, 256] {
        let fft = Fft2::new(n);
        let mut data = vec![Complex64::new(1.0, 0.0); n * n];
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| fft.forward(&mut data))
        });
    }
    group.finish();
}

pub fn second_kick_psf(c: &mut Criterion) {
    let second_kick = SecondKick::builder()
        .aperture(ApertureBuilder::default().max_scale(0.05))
        .build()
        .unwrap();
    c.bench_function("second kick PSF", |b| {
        b.iter(|| second_kick.psf_grid(black_box(0.1)))
    });
}

pub fn adaptive_moments(c: &mut Criterion) {
    let n = 64;
    let data = (0..n * n)
        .map(|k| {
            let (x, y) = ((k % n) as f64 - 31.5, (k / n) as f64 - 31.5);
            (-0.5 * (x * x + y * y) / 9.0).exp()
        })
        .collect();
    let image = Image::from_vec(n, n, 0.04, data).unwrap();
    let moments = AdaptiveMoments::default();
    c.bench_function("adaptive moments", |b| b.iter(|| moments.find(&image)));
}

criterion_group!(benches, fft2, second_kick_psf, adaptive_moments);
criterion_main!(benches);
