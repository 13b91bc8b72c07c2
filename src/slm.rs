//! Spatial light modulators: settings, the hardware seam and the phase-to-display pipeline.
//!
//! An [Slm] owns a device-specific [SlmHardware] and precomputes the normalized grid of its
//! pixels. Phases handed to [Slm::set_phase] are wrapped to `[0, 2π)`, scaled for the operating
//! wavelength and quantized to the device's bitdepth before reaching the hardware.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::display::DisplayShape;
use crate::grid::{AsGrid, Grid};
use crate::linear::Matrix;

pub mod meadowlark;
pub mod simulated;

#[derive(Debug, Error)]
pub enum SlmError {
    #[error("invalid SLM settings: {0}")]
    InvalidSettings(String),

    #[error("phase is {} but the SLM is {}", DisplayShape(*.actual), DisplayShape(*.expected))]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("{0}")]
    Unsupported(String),

    #[error("SLM has been closed")]
    Closed,

    #[error("{0}")]
    Meadowlark(#[from] meadowlark::MeadowlarkError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlmSettings {
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub bitdepth: u8,
    pub wav_um: f64,
    #[serde(default)]
    pub wav_design_um: Option<f64>,
    pub pitch_um: (f64, f64),
}
impl SlmSettings {
    pub const MAX_BITDEPTH: u8 = 16;

    pub fn validate(&self) -> Result<(), SlmError> {
        let invalid = |message: String| Err(SlmError::InvalidSettings(message));
        if self.width == 0 || self.height == 0 {
            return invalid(format!(
                "shape {} has no pixels",
                DisplayShape((self.height, self.width))
            ));
        }
        if self.bitdepth == 0 || self.bitdepth > Self::MAX_BITDEPTH {
            return invalid(format!(
                "bitdepth must lie in 1..={}, got {}",
                Self::MAX_BITDEPTH,
                self.bitdepth
            ));
        }
        let positive = |value: f64| value.is_finite() && value > 0.0;
        if !positive(self.wav_um) {
            return invalid(format!("wavelength must be positive, got {} µm", self.wav_um));
        }
        if !positive(self.wav_design_um()) {
            return invalid(format!(
                "design wavelength must be positive, got {} µm",
                self.wav_design_um()
            ));
        }
        if !positive(self.pitch_um.0) || !positive(self.pitch_um.1) {
            return invalid(format!(
                "pitch must be positive, got {:?} µm",
                self.pitch_um
            ));
        }
        if self.wav_um > self.wav_design_um() {
            return invalid(format!(
                "wavelength {} µm exceeds the design wavelength {} µm; the SLM cannot reach 2π",
                self.wav_um,
                self.wav_design_um()
            ));
        }
        Ok(())
    }

    /// The wavelength the device's phase range was calibrated for, defaulting to the operating
    /// wavelength.
    pub fn wav_design_um(&self) -> f64 {
        self.wav_design_um.unwrap_or(self.wav_um)
    }

    /// Fraction of the full gray range that spans 2π at the operating wavelength.
    pub fn phase_scaling(&self) -> f64 {
        self.wav_um / self.wav_design_um()
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn grid(&self) -> Grid {
        Grid::centered(self.width, self.height, self.pitch_um, self.wav_um)
    }
}

/// The device side of an SLM. Implementations receive quantized displays whose values never
/// exceed `2^bitdepth - 1`.
pub trait SlmHardware {
    fn write(&mut self, display: &Matrix<u16>, bitdepth: u8) -> Result<(), SlmError>;

    fn close(&mut self) -> Result<(), SlmError>;
}

/// Converts a phase (radians) to gray levels: `floor(mod(φ, 2π) / 2π · scaling · 2^bitdepth)`,
/// clamped to the top level.
pub fn phase_to_display(phase: &Matrix<f64>, bitdepth: u8, phase_scaling: f64) -> Matrix<u16> {
    let levels = (1u32 << bitdepth) as f64;
    let top = levels - 1.0;
    let factor = phase_scaling * levels / TAU;
    phase.map(|&phi| (phi.rem_euclid(TAU) * factor).floor().clamp(0.0, top) as u16)
}

pub struct Slm<H: SlmHardware> {
    settings: SlmSettings,
    grid: Grid,
    hardware: H,
    phase: Matrix<f64>,
    display: Matrix<u16>,
    closed: bool,
}
impl<H: SlmHardware> Slm<H> {
    pub fn new(settings: SlmSettings, hardware: H) -> Result<Self, SlmError> {
        settings.validate()?;
        let grid = settings.grid();
        let (rows, cols) = settings.shape();
        debug!(
            "{} is {} at {}-bit, scaling {:.3}",
            settings.name,
            DisplayShape((rows, cols)),
            settings.bitdepth,
            settings.phase_scaling()
        );
        Ok(Self {
            settings,
            grid,
            hardware,
            phase: Matrix::allocate(rows, cols),
            display: Matrix::allocate(rows, cols),
            closed: false,
        })
    }

    pub fn settings(&self) -> &SlmSettings {
        &self.settings
    }

    pub fn shape(&self) -> (usize, usize) {
        self.settings.shape()
    }

    pub fn bitdepth(&self) -> u8 {
        self.settings.bitdepth
    }

    /// The last phase written; zeros until the first write.
    pub fn phase(&self) -> &Matrix<f64> {
        &self.phase
    }

    /// The last gray levels handed to the hardware.
    pub fn display(&self) -> &Matrix<u16> {
        &self.display
    }

    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    /// Writes `phase` to the device; `None` writes a flat (zero) phase. [Self::phase] and
    /// [Self::display] are updated only once the hardware accepts the write.
    pub fn set_phase(&mut self, phase: Option<&Matrix<f64>>) -> Result<&Matrix<u16>, SlmError> {
        if self.closed {
            return Err(SlmError::Closed);
        }
        let (rows, cols) = self.shape();
        let phase = match phase {
            None => Matrix::filled(rows, cols, 0.0),
            Some(phase) => {
                if phase.shape() != (rows, cols) {
                    return Err(SlmError::ShapeMismatch {
                        expected: (rows, cols),
                        actual: phase.shape(),
                    });
                }
                phase.clone()
            }
        };
        let display = phase_to_display(&phase, self.settings.bitdepth, self.settings.phase_scaling());
        // a failed write leaves the last displayed state intact
        self.hardware.write(&display, self.settings.bitdepth)?;
        self.phase = phase;
        self.display = display;
        Ok(&self.display)
    }

    /// Releases the hardware. Subsequent writes fail; closing twice is a no-op.
    pub fn close(&mut self) -> Result<(), SlmError> {
        if !self.closed {
            self.closed = true;
            self.hardware.close()?;
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<H: SlmHardware> AsGrid for Slm<H> {
    fn grid(&self) -> &Grid {
        &self.grid
    }
}
