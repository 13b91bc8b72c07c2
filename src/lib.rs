//! Analytic phase patterns for spatial light modulator (SLM) holography, with hardware
//! abstractions for Meadowlark SLMs and Allied Vision cameras.
//!
//! Patterns are evaluated over normalized `x/λ`, `y/λ` grids. Zernike polynomials are summed
//! through an optimal monomial pathing that reuses intermediate powers across terms.

pub mod camera;
pub mod csv;
pub mod display;
pub mod factorial;
pub mod file;
pub mod grid;
pub mod linear;
pub mod phase;
pub mod polynomial;
pub mod print;
pub mod slm;
pub mod special;
pub mod timed;
pub mod zernike;

#[cfg(test)]
pub(crate) mod testing;

#[doc = include_str!("../README.md")]
#[cfg(doc)]
fn readme() {}
