//! Meshgrids of normalized `x/λ` coordinates corresponding to SLM pixels.
//!
//! Every phase function takes an [AsGrid] rather than a [Grid], so an [Slm](crate::slm::Slm)
//! (which precomputes its grid) can be passed wherever a grid is expected.

use thiserror::Error;

use crate::linear::Matrix;

#[derive(Debug, Error, PartialEq)]
#[error("x grid is {x_rows}x{x_cols} but y grid is {y_rows}x{y_cols}")]
pub struct GridShapeMismatch {
    pub x_rows: usize,
    pub x_cols: usize,
    pub y_rows: usize,
    pub y_cols: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    x: Matrix<f64>,
    y: Matrix<f64>,
}
impl Grid {
    pub fn new(x: Matrix<f64>, y: Matrix<f64>) -> Result<Self, GridShapeMismatch> {
        if x.shape() != y.shape() {
            return Err(GridShapeMismatch {
                x_rows: x.rows(),
                x_cols: x.cols(),
                y_rows: y.rows(),
                y_cols: y.cols(),
            });
        }
        Ok(Self { x, y })
    }

    /// Builds a meshgrid from the given axes: `x` varies along columns and `y` along rows.
    pub fn from_axes(xs: &[f64], ys: &[f64]) -> Self {
        let x = Matrix::from_fn(ys.len(), xs.len(), |_, col| xs[col]);
        let y = Matrix::from_fn(ys.len(), xs.len(), |row, _| ys[row]);
        Self { x, y }
    }

    /// The grid of a `width`x`height` pixel array with the given pitch (µm), centred on the
    /// middle of the array and normalized by the wavelength `wav_um`.
    pub fn centered(width: usize, height: usize, pitch_um: (f64, f64), wav_um: f64) -> Self {
        let axis = |len: usize, pitch: f64| -> Vec<f64> {
            let centre = (len as f64 - 1.0) / 2.0;
            (0..len)
                .map(|index| (index as f64 - centre) * pitch / wav_um)
                .collect()
        };
        Self::from_axes(&axis(width, pitch_um.0), &axis(height, pitch_um.1))
    }

    pub fn x(&self) -> &Matrix<f64> {
        &self.x
    }

    pub fn y(&self) -> &Matrix<f64> {
        &self.y
    }

    /// `(rows, cols)`, i.e. `(height, width)`.
    pub fn shape(&self) -> (usize, usize) {
        self.x.shape()
    }

    pub fn max_x(&self) -> f64 {
        self.x.nan_max()
    }

    pub fn max_y(&self) -> f64 {
        self.y.nan_max()
    }

    /// Evaluates `f(x, y)` at every point of the grid.
    pub fn map(&self, mut f: impl FnMut(f64, f64) -> f64) -> Matrix<f64> {
        self.x.zip_map(&self.y, |&x, &y| f(x, y))
    }

    /// A copy of this grid with `x` and `y` multiplied by the given factors.
    pub fn scaled(&self, x_scale: f64, y_scale: f64) -> Self {
        Self {
            x: self.x.map(|x| x * x_scale),
            y: self.y.map(|y| y * y_scale),
        }
    }
}

pub trait AsGrid {
    fn grid(&self) -> &Grid;
}

impl AsGrid for Grid {
    fn grid(&self) -> &Grid {
        self
    }
}

impl<G: AsGrid + ?Sized> AsGrid for &G {
    fn grid(&self) -> &Grid {
        (**self).grid()
    }
}
