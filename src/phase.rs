//! Analytic phase patterns on normalized SLM grids.
//!
//! All patterns are in radians and are evaluated over an [AsGrid], so they accept either a
//! bare [Grid](crate::grid::Grid) or an [Slm](crate::slm::Slm).

use std::f64::consts::{PI, SQRT_2, TAU};

use strum_macros::{Display, EnumString};
use thiserror::Error;

use crate::grid::AsGrid;
use crate::linear::Matrix;
use crate::special::{genlaguerre, heaviside, hermite};

#[derive(Debug, Error, PartialEq)]
pub enum PhaseError {
    #[error("cannot interpret a focal length of zero")]
    ZeroFocalLength,

    #[error("invalid mode: {0}")]
    InvalidMode(String),

    #[error("{0} beams are not supported")]
    Unsupported(&'static str),
}

/// Focal lengths along `x` and `y` in normalized units. An infinite focal length contributes
/// no power along its axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Focus {
    pub x: f64,
    pub y: f64,
}
impl Focus {
    pub const NONE: Focus = Focus {
        x: f64::INFINITY,
        y: f64::INFINITY,
    };

    fn validate(&self) -> Result<(), PhaseError> {
        if self.x == 0.0 || self.y == 0.0 {
            return Err(PhaseError::ZeroFocalLength);
        }
        Ok(())
    }
}

impl From<f64> for Focus {
    fn from(f: f64) -> Self {
        Self { x: f, y: f }
    }
}

impl From<(f64, f64)> for Focus {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// A linear phase ramp steering light to the normalized k-vector `(kx, ky)`.
pub fn blaze(grid: &impl AsGrid, vector: (f64, f64), offset: f64) -> Matrix<f64> {
    let (kx, ky) = vector;
    let grid = grid.grid();
    match (kx == 0.0, ky == 0.0) {
        (true, true) => grid.map(|_, _| offset),
        (false, true) => grid.map(|x, _| TAU * kx * x + offset),
        (true, false) => grid.map(|_, y| TAU * ky * y + offset),
        (false, false) => grid.map(|x, y| TAU * (kx * x + ky * y) + offset),
    }
}

/// A parabolic (optionally cylindrical) lens focusing at `focus`.
pub fn lens(grid: &impl AsGrid, focus: impl Into<Focus>) -> Result<Matrix<f64>, PhaseError> {
    let focus = focus.into();
    focus.validate()?;
    let grid = grid.grid();
    let pattern = match (focus.x.is_infinite(), focus.y.is_infinite()) {
        (true, true) => grid.map(|_, _| 0.0),
        (false, true) => grid.map(|x, _| PI * x * x / focus.x),
        (true, false) => grid.map(|_, y| PI * y * y / focus.y),
        (false, false) => grid.map(|x, y| PI * (x * x / focus.x + y * y / focus.y)),
    };
    Ok(pattern)
}

/// The radius of structured-light patterns: `w` if given, otherwise a quarter of the smaller
/// normalized half-extent of the grid.
pub fn source_radius(grid: &impl AsGrid, w: Option<f64>) -> f64 {
    match w {
        Some(w) => w,
        None => {
            let grid = grid.grid();
            f64::min(grid.max_x(), grid.max_y()) / 4.0
        }
    }
}

/// An axicon producing a Bessel beam centred at `focus`, blazing by `w / f / 2` per axis.
pub fn axicon(
    grid: &impl AsGrid,
    focus: impl Into<Focus>,
    w: Option<f64>,
) -> Result<Matrix<f64>, PhaseError> {
    let focus = focus.into();
    focus.validate()?;
    let w = source_radius(grid, w);
    let (x_angle, y_angle) = (w / focus.x / 2.0, w / focus.y / 2.0);
    let grid = grid.grid();
    let pattern = match (x_angle == 0.0, y_angle == 0.0) {
        (true, true) => grid.map(|_, _| 0.0),
        (true, false) => grid.map(|_, y| TAU * y_angle * y.abs()),
        (false, true) => grid.map(|x, _| TAU * x_angle * x.abs()),
        (false, false) => grid.map(|x, y| TAU * f64::hypot(x * x_angle, y * y_angle)),
    };
    Ok(pattern)
}

/// Phase of the Laguerre-Gaussian mode `LG_{p,l}`: the azimuthal winding `l·θ` plus a `π`
/// jump on every ring where the associated Laguerre polynomial is negative. Values lie in
/// `[0, 2π)`.
pub fn laguerre_gaussian(grid: &impl AsGrid, l: i32, p: u32, w: Option<f64>) -> Matrix<f64> {
    let w = source_radius(grid, w);
    let alpha = l.unsigned_abs() as f64;
    grid.grid().map(|x, y| {
        let theta = f64::atan2(x, y);
        let radius_sq = x * x + y * y;
        let ring = heaviside(-genlaguerre(p, alpha, 2.0 * radius_sq / (w * w)), 0.0);
        (l as f64 * theta + PI * ring + PI).rem_euclid(TAU)
    })
}

/// Binary phase of the Hermite-Gaussian mode `HG_{n,m}`: `π` where
/// `H_n(√2·x/w)·H_m(√2·y/w)` is positive, `0` elsewhere.
pub fn hermite_gaussian(grid: &impl AsGrid, n: u32, m: u32, w: Option<f64>) -> Matrix<f64> {
    let w = source_radius(grid, w);
    let factor = SQRT_2 / w;
    grid.grid().map(|x, y| {
        if hermite(n, factor * x) * hermite(m, factor * y) > 0.0 {
            PI
        } else {
            0.0
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum InceParity {
    Even,
    Odd,
    Helical,
}

/// Ince-Gaussian modes. The mode indices are validated, but the pattern itself is not
/// available.
pub fn ince_gaussian(
    _grid: &impl AsGrid,
    p: u32,
    m: u32,
    parity: InceParity,
    _ellipticity: f64,
    _w: Option<f64>,
) -> Result<Matrix<f64>, PhaseError> {
    let lowest = match parity {
        InceParity::Even => 0,
        InceParity::Odd | InceParity::Helical => 1,
    };
    if m < lowest || m > p {
        return Err(PhaseError::InvalidMode(format!(
            "{parity} Ince-Gaussian modes require {lowest} <= m <= p, got p = {p}, m = {m}"
        )));
    }
    Err(PhaseError::Unsupported("Ince-Gaussian"))
}

/// Mathieu-Gaussian modes are not available.
pub fn mathieu_gaussian(
    _grid: &impl AsGrid,
    _r: u32,
    _q: u32,
    _w: Option<f64>,
) -> Result<Matrix<f64>, PhaseError> {
    Err(PhaseError::Unsupported("Mathieu-Gaussian"))
}
