//! Allied Vision cameras driven through Vimba X.
//!
//! The SDK is reached through the [VimbaSystem] and [VimbaCamera] traits, which a binding to
//! `VmbC` implements on the target machine. Only monochrome cameras are supported.

use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

use crate::camera::{Camera, CameraError, CameraHardware, CameraSettings};
use crate::display::DisplayShape;
use crate::linear::Matrix;

pub mod mock;

/// Feature assignments applied when a camera is opened: manual gain and exposure, single-frame
/// acquisition and software triggering.
pub const CONFIGURATION: [(&str, &str); 8] = [
    ("GainAuto", "Off"),
    ("ExposureAuto", "Off"),
    ("ExposureMode", "Timed"),
    ("AcquisitionMode", "SingleFrame"),
    ("TriggerSelector", "AcquisitionStart"),
    ("TriggerMode", "Off"),
    ("TriggerActivation", "RisingEdge"),
    ("TriggerSource", "Software"),
];

/// Some cameras deliver this frame (a single pixel at 31, the rest dark) in place of a real
/// acquisition.
const BLANK_FRAME_LEVEL: u16 = 31;

#[derive(Debug, Error)]
pub enum AlliedVisionError {
    #[error("no cameras found by {0}")]
    NoCameras(String),

    #[error("serial {serial} not found by {sdk}; available: {available:?}")]
    SerialNotFound {
        sdk: String,
        serial: String,
        available: Vec<String>,
    },

    #[error("ADC bitdepth {0} not found")]
    AdcBitdepthNotFound(u8),

    #[error("feature {feature}: {message}")]
    Feature { feature: String, message: String },

    #[error("feature {feature} is not {expected}: {actual}")]
    FeatureType {
        feature: String,
        expected: &'static str,
        actual: FeatureValue,
    },

    #[error("{0}")]
    Vimba(String),
}

/// An entry of an enumeration feature, e.g. `("Bpp12", 1)` of `SensorBitDepth`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumEntry {
    pub name: String,
    pub value: i64,
}
impl EnumEntry {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Enum(EnumEntry),
}
impl FeatureValue {
    /// Integers, and the numeric value of enumeration entries.
    pub fn as_int(&self, feature: &str) -> Result<i64, AlliedVisionError> {
        match self {
            FeatureValue::Int(value) => Ok(*value),
            FeatureValue::Enum(entry) => Ok(entry.value),
            _ => Err(self.type_error(feature, "an integer")),
        }
    }

    pub fn as_float(&self, feature: &str) -> Result<f64, AlliedVisionError> {
        match self {
            FeatureValue::Float(value) => Ok(*value),
            FeatureValue::Int(value) => Ok(*value as f64),
            _ => Err(self.type_error(feature, "a number")),
        }
    }

    fn type_error(&self, feature: &str, expected: &'static str) -> AlliedVisionError {
        AlliedVisionError::FeatureType {
            feature: feature.into(),
            expected,
            actual: self.clone(),
        }
    }
}

impl Display for FeatureValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureValue::Int(value) => write!(f, "{value}"),
            FeatureValue::Float(value) => write!(f, "{value}"),
            FeatureValue::Bool(value) => write!(f, "{value}"),
            FeatureValue::Str(value) => write!(f, "{value}"),
            FeatureValue::Enum(entry) => write!(f, "{}", entry.name),
        }
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Str(value.into())
    }
}

/// The Vimba X system: the process-wide SDK handle.
pub trait VimbaSystem {
    type Camera: VimbaCamera;

    /// The binding's name, used in diagnostics.
    fn name(&self) -> &str;

    fn is_running(&self) -> bool;

    fn startup(&mut self) -> Result<(), AlliedVisionError>;

    fn shutdown(&mut self);

    fn cameras(&mut self) -> Result<Vec<Self::Camera>, AlliedVisionError>;
}

impl<S: VimbaSystem + ?Sized> VimbaSystem for &mut S {
    type Camera = S::Camera;

    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_running(&self) -> bool {
        (**self).is_running()
    }

    fn startup(&mut self) -> Result<(), AlliedVisionError> {
        (**self).startup()
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }

    fn cameras(&mut self) -> Result<Vec<Self::Camera>, AlliedVisionError> {
        (**self).cameras()
    }
}

/// A camera discovered by a [VimbaSystem]. Features are addressed by their GenICam names.
pub trait VimbaCamera {
    fn serial(&self) -> String;

    fn open(&mut self) -> Result<(), AlliedVisionError>;

    fn close(&mut self);

    fn feature_names(&self) -> Vec<String>;

    fn get(&self, feature: &str) -> Result<FeatureValue, AlliedVisionError>;

    /// Enumeration features accept either an entry name ([FeatureValue::Str]) or an entry
    /// value ([FeatureValue::Int]).
    fn set(&mut self, feature: &str, value: FeatureValue) -> Result<(), AlliedVisionError>;

    fn entries(&self, feature: &str) -> Result<Vec<EnumEntry>, AlliedVisionError>;

    fn unit(&self, feature: &str) -> Result<String, AlliedVisionError>;

    fn description(&self, feature: &str) -> Result<String, AlliedVisionError>;

    fn get_frame(&mut self, timeout: Duration) -> Result<Matrix<u16>, AlliedVisionError>;
}

/// A feature's readout; fields the camera does not provide are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: Option<FeatureValue>,
    pub unit: Option<String>,
    pub description: Option<String>,
}

pub struct AlliedVision<S: VimbaSystem> {
    system: S,
    camera: S::Camera,
    serial: String,
    camera_open: bool,
}
impl<S: VimbaSystem> AlliedVision<S> {
    /// Serials of every camera visible to `system`. The SDK is shut down again if it was not
    /// already running.
    pub fn info(system: &mut S) -> Result<Vec<String>, CameraError> {
        let started_here = !system.is_running();
        if started_here {
            system.startup()?;
        }
        let cameras = system.cameras();
        if started_here {
            system.shutdown();
        }
        let serials: Vec<_> = cameras?.iter().map(VimbaCamera::serial).collect();
        info!("{} serials: {serials:?}", system.name());
        Ok(serials)
    }

    /// Opens the camera with the given `serial`, or the first camera found when `serial` is
    /// empty, and configures it for software-triggered single frames. On failure the camera is
    /// closed again, as is the SDK if this call started it.
    pub fn open(
        mut system: S,
        serial: &str,
        pitch_um: Option<(f64, f64)>,
    ) -> Result<Camera<Self>, CameraError> {
        let started_here = !system.is_running();
        if started_here {
            info!("{} initializing", system.name());
            system.startup()?;
        }

        let (camera, serial, settings) = match Self::connect(&mut system, serial, pitch_um) {
            Ok(connected) => connected,
            Err(err) => {
                if started_here {
                    system.shutdown();
                }
                return Err(err);
            }
        };
        let hardware = Self {
            system,
            camera,
            serial,
            camera_open: true,
        };
        Camera::new(settings, hardware)
    }

    /// Selects and opens a camera, then reads back validated settings.
    fn connect(
        system: &mut S,
        serial: &str,
        pitch_um: Option<(f64, f64)>,
    ) -> Result<(S::Camera, String, CameraSettings), CameraError> {
        let mut cameras = system.cameras()?;
        let serials: Vec<_> = cameras.iter().map(VimbaCamera::serial).collect();
        let index = if serial.is_empty() {
            if cameras.is_empty() {
                return Err(AlliedVisionError::NoCameras(system.name().into()).into());
            }
            if cameras.len() > 1 {
                info!("no serial given; choosing first of {serials:?}");
            }
            0
        } else {
            serials
                .iter()
                .position(|candidate| candidate == serial)
                .ok_or_else(|| AlliedVisionError::SerialNotFound {
                    sdk: system.name().into(),
                    serial: serial.into(),
                    available: serials.clone(),
                })?
        };
        let mut camera = cameras.swap_remove(index);
        let serial = serials[index].clone();

        info!("{} sn '{serial}' initializing", system.name());
        camera.open()?;
        match configure(&mut camera, &serial, pitch_um) {
            Ok(settings) => Ok((camera, serial, settings)),
            Err(err) => {
                camera.close();
                Err(err)
            }
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn system(&self) -> &S {
        &self.system
    }

    pub fn vimba_camera(&self) -> &S::Camera {
        &self.camera
    }

    /// Selects the `SensorBitDepth` entry whose name mentions `bitdepth`, e.g. `Bpp12` for 12.
    pub fn set_adc_bitdepth(&mut self, bitdepth: u8) -> Result<(), CameraError> {
        let needle = bitdepth.to_string();
        let entry = self
            .camera
            .entries("SensorBitDepth")?
            .into_iter()
            .find(|entry| entry.name.contains(&needle))
            .ok_or(AlliedVisionError::AdcBitdepthNotFound(bitdepth))?;
        self.camera
            .set("SensorBitDepth", FeatureValue::Int(entry.value))?;
        Ok(())
    }

    /// The digits of the current `SensorBitDepth` entry.
    pub fn adc_bitdepth(&self) -> Result<u8, CameraError> {
        let value = self.camera.get("SensorBitDepth")?;
        let digits: String = value
            .to_string()
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        digits
            .parse()
            .map_err(|_| value.type_error("SensorBitDepth", "a bitdepth").into())
    }

    /// Every feature the camera exposes, with whatever value, unit and description it reports.
    pub fn properties(&self) -> Vec<Property> {
        self.camera
            .feature_names()
            .into_iter()
            .map(|name| Property {
                value: self.camera.get(&name).ok(),
                unit: self.camera.unit(&name).ok(),
                description: self.camera.description(&name).ok(),
                name,
            })
            .collect()
    }

    /// Closes the camera and, if `close_sdk`, shuts the SDK down.
    pub fn close_camera(&mut self, close_sdk: bool) {
        if self.camera_open {
            self.camera_open = false;
            self.camera.close();
        }
        if close_sdk && self.system.is_running() {
            self.system.shutdown();
        }
    }

    /// Hands back the SDK, e.g. to open another camera after [Self::close_camera]`(false)`.
    pub fn into_system(self) -> S {
        self.system
    }
}

/// Applies [CONFIGURATION] to an open camera and reads its geometry.
fn configure(
    camera: &mut impl VimbaCamera,
    serial: &str,
    pitch_um: Option<(f64, f64)>,
) -> Result<CameraSettings, CameraError> {
    for feature in ["BinningHorizontal", "BinningVertical"] {
        if let Err(err) = camera.set(feature, FeatureValue::Int(1)) {
            debug!("binning unavailable: {err}");
        }
    }
    for (feature, value) in CONFIGURATION {
        camera.set(feature, value.into())?;
    }

    let width = read_usize(&*camera, "SensorWidth")?;
    let height = read_usize(&*camera, "SensorHeight")?;
    let pixel_size = camera.get("PixelSize")?;
    let bitdepth = u8::try_from(pixel_size.as_int("PixelSize")?)
        .map_err(|_| pixel_size.type_error("PixelSize", "a bitdepth"))?;
    info!("sn '{serial}' is {} at {bitdepth}-bit", DisplayShape((height, width)));

    let settings = CameraSettings {
        name: serial.into(),
        width,
        height,
        bitdepth,
        pitch_um,
    };
    settings.validate()?;
    Ok(settings)
}

fn read_usize(camera: &impl VimbaCamera, feature: &str) -> Result<usize, AlliedVisionError> {
    let value = camera.get(feature)?;
    usize::try_from(value.as_int(feature)?).map_err(|_| value.type_error(feature, "a size"))
}

fn is_blank(frame: &Matrix<u16>) -> bool {
    let sum: u64 = frame.iter().map(|&level| level as u64).sum();
    let max = frame.iter().copied().max().unwrap_or(0);
    sum == BLANK_FRAME_LEVEL as u64 && max == BLANK_FRAME_LEVEL
}

impl<S: VimbaSystem> CameraHardware for AlliedVision<S> {
    fn exposure(&self) -> Result<f64, CameraError> {
        let micros = self.camera.get("ExposureTime")?.as_float("ExposureTime")?;
        Ok(micros / 1e6)
    }

    fn set_exposure(&mut self, exposure_s: f64) -> Result<(), CameraError> {
        self.camera
            .set("ExposureTime", FeatureValue::Float(exposure_s * 1e6))?;
        Ok(())
    }

    /// Re-acquires while the camera returns its blank frame, until `timeout` has elapsed.
    fn get_image(&mut self, timeout: Duration) -> Result<Matrix<u16>, CameraError> {
        if !self.camera_open {
            return Err(CameraError::Closed);
        }
        let start_time = Instant::now();
        let mut frame = self.camera.get_frame(timeout)?;
        while is_blank(&frame) && start_time.elapsed() < timeout {
            debug!("blank frame from sn '{}'; re-acquiring", self.serial);
            frame = self.camera.get_frame(timeout)?;
        }
        Ok(frame)
    }

    fn close(&mut self) -> Result<(), CameraError> {
        self.close_camera(true);
        Ok(())
    }
}

#[cfg(test)]
mod tests;
