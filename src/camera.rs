//! Cameras: settings, the hardware seam and a wrapper enforcing exposure and frame invariants.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::display::DisplayShape;
use crate::linear::Matrix;

pub mod alliedvision;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("invalid camera settings: {0}")]
    InvalidSettings(String),

    #[error("exposure must be positive and finite, got {0} s")]
    InvalidExposure(f64),

    #[error("invalid timeout {0} s")]
    InvalidTimeout(f64),

    #[error("frame is {} but the camera is {}", DisplayShape(*.actual), DisplayShape(*.expected))]
    FrameShape {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("camera has been closed")]
    Closed,

    #[error("{0}")]
    AlliedVision(#[from] alliedvision::AlliedVisionError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub bitdepth: u8,
    #[serde(default)]
    pub pitch_um: Option<(f64, f64)>,
}
impl CameraSettings {
    pub const MAX_BITDEPTH: u8 = 16;

    pub fn validate(&self) -> Result<(), CameraError> {
        if self.width == 0 || self.height == 0 {
            return Err(CameraError::InvalidSettings(format!(
                "shape {} has no pixels",
                DisplayShape(self.shape())
            )));
        }
        if self.bitdepth == 0 || self.bitdepth > Self::MAX_BITDEPTH {
            return Err(CameraError::InvalidSettings(format!(
                "bitdepth must lie in 1..={}, got {}",
                Self::MAX_BITDEPTH,
                self.bitdepth
            )));
        }
        if let Some((x, y)) = self.pitch_um {
            if !(x.is_finite() && x > 0.0 && y.is_finite() && y > 0.0) {
                return Err(CameraError::InvalidSettings(format!(
                    "pitch must be positive, got ({x}, {y}) µm"
                )));
            }
        }
        Ok(())
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }
}

/// The device side of a camera. Exposures are in seconds.
pub trait CameraHardware {
    fn exposure(&self) -> Result<f64, CameraError>;

    fn set_exposure(&mut self, exposure_s: f64) -> Result<(), CameraError>;

    fn get_image(&mut self, timeout: Duration) -> Result<Matrix<u16>, CameraError>;

    fn close(&mut self) -> Result<(), CameraError>;
}

pub struct Camera<H: CameraHardware> {
    settings: CameraSettings,
    hardware: H,
    closed: bool,
}
impl<H: CameraHardware> Camera<H> {
    pub fn new(settings: CameraSettings, hardware: H) -> Result<Self, CameraError> {
        settings.validate()?;
        debug!(
            "{} is {} at {}-bit",
            settings.name,
            DisplayShape(settings.shape()),
            settings.bitdepth
        );
        Ok(Self {
            settings,
            hardware,
            closed: false,
        })
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    pub fn shape(&self) -> (usize, usize) {
        self.settings.shape()
    }

    pub fn bitdepth(&self) -> u8 {
        self.settings.bitdepth
    }

    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    pub fn exposure(&self) -> Result<f64, CameraError> {
        self.check_open()?;
        self.hardware.exposure()
    }

    pub fn set_exposure(&mut self, exposure_s: f64) -> Result<(), CameraError> {
        self.check_open()?;
        if !exposure_s.is_finite() || exposure_s <= 0.0 {
            return Err(CameraError::InvalidExposure(exposure_s));
        }
        self.hardware.set_exposure(exposure_s)
    }

    /// Grabs a frame, waiting up to `timeout_s` seconds.
    pub fn get_image(&mut self, timeout_s: f64) -> Result<Matrix<u16>, CameraError> {
        self.check_open()?;
        let timeout = Duration::try_from_secs_f64(timeout_s)
            .map_err(|_| CameraError::InvalidTimeout(timeout_s))?;
        let image = self.hardware.get_image(timeout)?;
        if image.shape() != self.shape() {
            return Err(CameraError::FrameShape {
                expected: self.shape(),
                actual: image.shape(),
            });
        }
        Ok(image)
    }

    /// Releases the hardware. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<(), CameraError> {
        if !self.closed {
            self.closed = true;
            self.hardware.close()?;
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check_open(&self) -> Result<(), CameraError> {
        if self.closed {
            Err(CameraError::Closed)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FixedFrame {
        exposure_s: f64,
        frame: Matrix<u16>,
        closes: usize,
    }

    impl CameraHardware for FixedFrame {
        fn exposure(&self) -> Result<f64, CameraError> {
            Ok(self.exposure_s)
        }

        fn set_exposure(&mut self, exposure_s: f64) -> Result<(), CameraError> {
            self.exposure_s = exposure_s;
            Ok(())
        }

        fn get_image(&mut self, _timeout: Duration) -> Result<Matrix<u16>, CameraError> {
            Ok(self.frame.clone())
        }

        fn close(&mut self) -> Result<(), CameraError> {
            self.closes += 1;
            Ok(())
        }
    }

    fn settings() -> CameraSettings {
        CameraSettings {
            name: "fixed".into(),
            width: 3,
            height: 2,
            bitdepth: 12,
            pitch_um: None,
        }
    }

    fn camera(frame: Matrix<u16>) -> Camera<FixedFrame> {
        Camera::new(
            settings(),
            FixedFrame {
                frame,
                ..FixedFrame::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn validate_settings() {
        assert!(settings().validate().is_ok());
        assert_eq!(
            "invalid camera settings: shape 3x0 has no pixels",
            CameraSettings {
                height: 0,
                ..settings()
            }
            .validate()
            .unwrap_err()
            .to_string()
        );
        assert!(CameraSettings {
            bitdepth: 0,
            ..settings()
        }
        .validate()
        .is_err());
        assert!(CameraSettings {
            pitch_um: Some((5.5, 0.0)),
            ..settings()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn exposure_round_trip() {
        let mut camera = camera(Matrix::allocate(2, 3));
        camera.set_exposure(0.002).unwrap();
        assert_eq!(0.002, camera.exposure().unwrap());
        assert!(matches!(
            camera.set_exposure(0.0),
            Err(CameraError::InvalidExposure(_))
        ));
        assert!(matches!(
            camera.set_exposure(f64::NAN),
            Err(CameraError::InvalidExposure(_))
        ));
    }

    #[test]
    fn get_image_checks_shape() {
        let mut camera = camera(Matrix::filled(2, 3, 7));
        assert!(camera.get_image(0.1).unwrap().iter().all(|&value| value == 7));
        assert!(matches!(
            camera.get_image(-1.0),
            Err(CameraError::InvalidTimeout(_))
        ));

        let mut camera = self::camera(Matrix::allocate(3, 2));
        assert_eq!(
            "frame is 2x3 but the camera is 3x2",
            camera.get_image(0.1).unwrap_err().to_string()
        );
    }

    #[test]
    fn close_once() {
        let mut camera = camera(Matrix::allocate(2, 3));
        camera.close().unwrap();
        camera.close().unwrap();
        assert_eq!(1, camera.hardware().closes);
        assert!(matches!(camera.get_image(0.1), Err(CameraError::Closed)));
        assert!(matches!(camera.exposure(), Err(CameraError::Closed)));
    }
}
