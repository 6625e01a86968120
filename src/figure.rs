//!
//! # Comparison figure
//!
//! A 2 rows by 4 columns grid of PSF images: the Fourier optics PSFs in the top row,
//! the second kick PSFs in the bottom row and one cutoff per column.
//! Each image is annotated with its measured size when available.

use plotters::{
    coord::Shift,
    prelude::*,
    style::text_anchor::{HPos, Pos, VPos},
};
use std::path::{Path, PathBuf};

use crate::{sweep::N_CUTOFF, Image, SweepPoint};

#[derive(Debug, thiserror::Error)]
pub enum FigureError {
    #[error("cannot create the figure directory {1}")]
    CreateDir(#[source] std::io::Error, PathBuf),
    #[error("plotting failed: {0}")]
    Backend(String),
    #[error("expected {N_CUTOFF} sweep points, found {0}")]
    Points(usize),
    #[error("a {0}x{1} pixels figure is too small for 2x{N_CUTOFF} panels")]
    Size(u32, u32),
}
pub type Result<T> = std::result::Result<T, FigureError>;

fn backend<E: std::fmt::Display>(e: E) -> FigureError {
    FigureError::Backend(e.to_string())
}

/// Figure layout
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    /// Figure size in pixels
    pub size: (u32, u32),
    /// Row labels
    pub row_labels: [String; 2],
    /// Space around each image for the labels in pixels
    pub label_size: u32,
}
/// Default properties:
///  * size       : 800x500 pixels
///  * row labels : "FFT" and "2nd kick"
///  * label size : 24 pixels
impl Default for Figure {
    fn default() -> Self {
        Self {
            size: (800, 500),
            row_labels: ["FFT".to_string(), "2nd kick".to_string()],
            label_size: 24,
        }
    }
}
impl Figure {
    /// Set the figure size in pixels
    pub fn size(self, width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            ..self
        }
    }
    /// Draws `image` into `panel` and returns the image bounds in panel pixels
    fn draw_image(
        &self,
        panel: &DrawingArea<BitMapBackend, Shift>,
        image: &Image,
    ) -> Result<(i32, i32, i32)> {
        let (w, h) = panel.dim_in_pixel();
        let side = w
            .min(h)
            .saturating_sub(2 * self.label_size)
            .max(1)
            .min(w.min(h));
        let (left, top) = (w.saturating_sub(side) / 2, h.saturating_sub(side) / 2);
        let mut chart = ChartBuilder::on(panel)
            .margin_left(left)
            .margin_right(w.saturating_sub(side + left))
            .margin_top(top)
            .margin_bottom(h.saturating_sub(side + top))
            .build_cartesian_2d(0f64..image.nx as f64, 0f64..image.ny as f64)
            .map_err(backend)?;
        let (min, max) = image.range();
        let span = if max > min { max - min } else { 1.0 };
        let ny = image.ny;
        chart
            .draw_series((0..ny).flat_map(|j| {
                (0..image.nx).map(move |i| {
                    let t = (image.get(i, j) - min) / span;
                    let (r, g, b) = colorous::VIRIDIS.eval_continuous(t).as_tuple();
                    // row 0 at the top
                    let y = (ny - 1 - j) as f64;
                    Rectangle::new(
                        [(i as f64, y), (i as f64 + 1.0, y + 1.0)],
                        RGBColor(r, g, b).filled(),
                    )
                })
            }))
            .map_err(backend)?;
        Ok((left as i32, top as i32, side as i32))
    }
    /// Draws a label, a missing font is not fatal
    fn label(
        panel: &DrawingArea<BitMapBackend, Shift>,
        text: &str,
        style: &TextStyle,
        pos: (i32, i32),
    ) {
        if let Err(e) = panel.draw_text(text, style, pos) {
            log::warn!("cannot draw label {:?}: {}", text, e);
        }
    }
    /// Writes the figure of the sweep `points` into `path`
    ///
    /// The directory of `path` is created if it does not exist
    pub fn save<P: AsRef<Path>>(&self, points: &[SweepPoint], path: P) -> Result<()> {
        if points.len() != N_CUTOFF {
            return Err(FigureError::Points(points.len()));
        }
        let (width, height) = self.size;
        if width < N_CUTOFF as u32 || height < 2 {
            return Err(FigureError::Size(width, height));
        }
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.exists() {
                std::fs::create_dir_all(dir)
                    .map_err(|e| FigureError::CreateDir(e, dir.to_path_buf()))?;
            }
        }
        let root = BitMapBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE).map_err(backend)?;
        let panels = root.split_evenly((2, N_CUTOFF));
        let size = self.label_size as f64 * 0.6;
        let black = ("sans-serif", size).into_font().color(&BLACK);
        let white = ("sans-serif", size)
            .into_font()
            .color(&WHITE)
            .pos(Pos::new(HPos::Center, VPos::Top));
        let title = black.pos(Pos::new(HPos::Center, VPos::Bottom));
        let row_label = ("sans-serif", size)
            .into_font()
            .transform(FontTransform::Rotate270)
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Top));
        for (icol, point) in points.iter().enumerate() {
            for (irow, (image, sigma)) in [
                (&point.fft, point.fft_sigma),
                (&point.second_kick, point.second_kick_sigma),
            ]
            .into_iter()
            .enumerate()
            {
                let panel = &panels[irow * N_CUTOFF + icol];
                let (left, top, side) = self.draw_image(panel, image)?;
                if let Some(sigma) = sigma {
                    Self::label(
                        panel,
                        &format!("{:6.3}", sigma),
                        &white,
                        (left + side / 2, top + side / 10),
                    );
                }
                if irow == 0 {
                    Self::label(
                        panel,
                        &format!("{:4.2}", point.kcrit),
                        &title,
                        (left + side / 2, top - 2),
                    );
                }
                if icol == 0 {
                    Self::label(
                        panel,
                        &self.row_labels[irow],
                        &row_label,
                        (left - self.label_size as i32 + 2, top + side / 2),
                    );
                }
            }
        }
        root.present().map_err(backend)?;
        log::info!("Figure saved to {}", path.display());
        Ok(())
    }
}
