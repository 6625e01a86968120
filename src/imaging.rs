//!
//! # PSF images
//!
//! [`Image`] is the rendered PSF: a `nx x ny` row-major grid of pixel fluxes
//! with a pixel scale in arcseconds.
//! The image center is at the pixel corner `(nx/2,ny/2)`, so for even sizes
//! the PSF is centered between the 4 central pixels.

use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ImagingError {
    #[error("image size must be at least 1x1, found {0}x{1}")]
    Size(usize, usize),
    #[error("pixel scale must be strictly positive, found {0}")]
    Scale(f64),
    #[error("expected {expected} pixels, found {found}")]
    Length { expected: usize, found: usize },
}
pub type Result<T> = std::result::Result<T, ImagingError>;

/// Sub-pixel sampling used to integrate a PSF over an image pixel
const SUBSAMPLING: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Image {
    /// Number of pixels along the x axis
    pub nx: usize,
    /// Number of pixels along the y axis
    pub ny: usize,
    /// Pixel scale in arcsecond
    pub scale: f64,
    data: Vec<f64>,
}
impl Image {
    /// Creates an empty image
    pub fn new(nx: usize, ny: usize, scale: f64) -> Result<Self> {
        if nx == 0 || ny == 0 {
            return Err(ImagingError::Size(nx, ny));
        }
        if !(scale > 0.0) {
            return Err(ImagingError::Scale(scale));
        }
        Ok(Self {
            nx,
            ny,
            scale,
            data: vec![0f64; nx * ny],
        })
    }
    /// Creates an image from row-major pixel values
    pub fn from_vec(nx: usize, ny: usize, scale: f64, data: Vec<f64>) -> Result<Self> {
        let mut image = Self::new(nx, ny, scale)?;
        if data.len() != nx * ny {
            return Err(ImagingError::Length {
                expected: nx * ny,
                found: data.len(),
            });
        }
        image.data = data;
        Ok(image)
    }
    /// Row-major pixel values
    pub fn array(&self) -> &[f64] {
        &self.data
    }
    /// Pixel value at column `i` and row `j`
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[j * self.nx + i]
    }
    /// Adds `value` to the pixel that contains the point `(x,y)` given in arcsecond
    ///
    /// Returns `false` if the point falls outside the image
    pub fn accumulate(&mut self, x: f64, y: f64, value: f64) -> bool {
        let i = (x / self.scale + 0.5 * self.nx as f64).floor();
        let j = (y / self.scale + 0.5 * self.ny as f64).floor();
        if i < 0.0 || j < 0.0 || i >= self.nx as f64 || j >= self.ny as f64 {
            return false;
        }
        let k = j as usize * self.nx + i as usize;
        self.data[k] += value;
        true
    }
    /// Sum of the pixel values
    pub fn flux(&self) -> f64 {
        self.data.iter().sum()
    }
    /// Minimum and maximum pixel values
    pub fn range(&self) -> (f64, f64) {
        self.data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &x| {
                (min.min(x), max.max(x))
            })
    }
    /// Resamples a centered square PSF grid onto a `nx x nx` image
    ///
    /// The `grid` is `n_grid x n_grid` with the PSF origin at index `(n_grid/2,n_grid/2)`,
    /// each grid value is the flux within a `grid_scale` wide square (in arcsecond).
    /// The PSF is bilinearly interpolated and integrated over each image pixel.
    pub fn resample(
        grid: &[f64],
        n_grid: usize,
        grid_scale: f64,
        nx: usize,
        scale: f64,
    ) -> Result<Self> {
        if grid.len() != n_grid * n_grid {
            return Err(ImagingError::Length {
                expected: n_grid * n_grid,
                found: grid.len(),
            });
        }
        if !(grid_scale > 0.0) {
            return Err(ImagingError::Scale(grid_scale));
        }
        let mut image = Self::new(nx, nx, scale)?;
        let h = (n_grid / 2) as f64;
        let lookup = |u: f64, v: f64| -> f64 {
            if u < 0.0 || v < 0.0 {
                return 0.0;
            }
            let (i0, j0) = (u.floor() as usize, v.floor() as usize);
            if i0 + 1 >= n_grid || j0 + 1 >= n_grid {
                return 0.0;
            }
            let (du, dv) = (u - i0 as f64, v - j0 as f64);
            let at = |i: usize, j: usize| grid[j * n_grid + i];
            (1.0 - du) * (1.0 - dv) * at(i0, j0)
                + du * (1.0 - dv) * at(i0 + 1, j0)
                + (1.0 - du) * dv * at(i0, j0 + 1)
                + du * dv * at(i0 + 1, j0 + 1)
        };
        let sub = scale / SUBSAMPLING as f64;
        let area = (sub / grid_scale).powi(2);
        let x0 = -0.5 * nx as f64 * scale;
        for j in 0..nx {
            for i in 0..nx {
                let mut flux = 0f64;
                for q in 0..SUBSAMPLING {
                    let y = x0 + j as f64 * scale + (q as f64 + 0.5) * sub;
                    for p in 0..SUBSAMPLING {
                        let x = x0 + i as f64 * scale + (p as f64 + 0.5) * sub;
                        flux += lookup(x / grid_scale + h, y / grid_scale + h);
                    }
                }
                image.data[j * nx + i] = flux * area;
            }
        }
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_image() {
        assert!(matches!(Image::new(0, 4, 1.0), Err(ImagingError::Size(0, 4))));
        assert!(matches!(Image::new(4, 4, 0.0), Err(ImagingError::Scale(_))));
        let image = Image::new(4, 2, 0.1).unwrap();
        assert_eq!(image.array().len(), 8);
        assert_eq!(image.flux(), 0.0);
    }

    #[test]
    fn from_vec_length() {
        assert!(matches!(
            Image::from_vec(2, 2, 1.0, vec![1.0; 3]),
            Err(ImagingError::Length {
                expected: 4,
                found: 3
            })
        ));
    }

    #[test]
    fn accumulate_pixels() {
        let mut image = Image::new(4, 4, 0.5).unwrap();
        assert!(image.accumulate(0.1, 0.1, 1.0));
        assert_eq!(image.get(2, 2), 1.0);
        assert!(image.accumulate(-0.1, -0.1, 1.0));
        assert_eq!(image.get(1, 1), 1.0);
        assert!(!image.accumulate(1.0, 0.0, 1.0));
        assert_eq!(image.flux(), 2.0);
    }

    #[test]
    fn resample_conserves_flux() {
        let n_grid = 64;
        let grid_scale = 0.01;
        let sigma = 0.05;
        let h = (n_grid / 2) as f64;
        let mut grid: Vec<f64> = (0..n_grid * n_grid)
            .map(|k| {
                let x = ((k % n_grid) as f64 - h) * grid_scale;
                let y = ((k / n_grid) as f64 - h) * grid_scale;
                (-0.5 * (x * x + y * y) / (sigma * sigma)).exp()
            })
            .collect();
        let total: f64 = grid.iter().sum();
        grid.iter_mut().for_each(|x| *x /= total);
        let image = Image::resample(&grid, n_grid, grid_scale, 16, 0.03).unwrap();
        assert!((image.flux() - 1.0).abs() < 1e-2);
        let (i, j) = (7, 7);
        assert!(image.get(i, j) > image.get(0, 0));
        assert!((image.get(7, 7) - image.get(8, 8)).abs() < 1e-3);
    }
}
