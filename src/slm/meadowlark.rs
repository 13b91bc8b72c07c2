//! Meadowlark SLMs driven through the Blink SDK.
//!
//! The SDK itself is reached through the [BlinkSdk] trait; a binding to `Blink_C_Wrapper.dll`
//! implements it on the target machine. This module locates the SDK installation, resolves the
//! voltage look-up table (LUT) and runs the device's initialization sequence.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::display::DisplayShape;
use crate::file::{most_recent, recurse_dir};
use crate::linear::Matrix;
use crate::slm::{Slm, SlmError, SlmHardware, SlmSettings};

pub mod mock;

pub const DEFAULT_SDK_SEARCH_PATH: &str = "C:\\Program Files\\Meadowlark Optics\\";
const SDK_LIBRARY_STEM: &str = "Blink_C_Wrapper";
const LUT_DIR: &str = "LUT Files";

#[derive(Debug, Error)]
pub enum MeadowlarkError {
    #[error("no Blink_C_Wrapper.dll files found in '{}'", .0.display())]
    SdkNotFound(PathBuf),

    #[error("could not find a .lut file at path '{}'", .0.display())]
    LutNotFound(PathBuf),

    #[error("failed to validate DPI awareness; errors: get={get}, set={set}, awareness={awareness}")]
    DpiAwareness { get: i32, set: i32, awareness: i32 },

    #[error("Blink SDK: {0}")]
    Sdk(String),

    #[error("{0}")]
    Io(#[from] io::Error),
}

/// Outcome of the process DPI-awareness calls that must precede SDK construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DpiAwareness {
    pub get: i32,
    pub set: i32,
    pub awareness: i32,
    pub success: bool,
}

/// The subset of the Blink C wrapper used by [Meadowlark].
pub trait BlinkSdk {
    fn validate_dpi_awareness(&mut self) -> DpiAwareness;

    fn create_sdk(&mut self) -> Result<(), MeadowlarkError>;

    fn load_lut(&mut self, path: &Path) -> Result<(), MeadowlarkError>;

    fn width(&self) -> usize;

    fn height(&self) -> usize;

    fn depth(&self) -> u8;

    /// Writes a row-major image; 8-bit images hold one byte per pixel, others two
    /// (little-endian).
    fn write_image(&mut self, image: &[u8], is_8bit: bool) -> Result<(), MeadowlarkError>;

    /// Degrees Celsius.
    fn temperature(&self) -> f64;

    fn coverglass_voltage(&self) -> f64;

    fn delete_sdk(&mut self);
}

impl<S: BlinkSdk + ?Sized> BlinkSdk for &mut S {
    fn validate_dpi_awareness(&mut self) -> DpiAwareness {
        (**self).validate_dpi_awareness()
    }

    fn create_sdk(&mut self) -> Result<(), MeadowlarkError> {
        (**self).create_sdk()
    }

    fn load_lut(&mut self, path: &Path) -> Result<(), MeadowlarkError> {
        (**self).load_lut(path)
    }

    fn width(&self) -> usize {
        (**self).width()
    }

    fn height(&self) -> usize {
        (**self).height()
    }

    fn depth(&self) -> u8 {
        (**self).depth()
    }

    fn write_image(&mut self, image: &[u8], is_8bit: bool) -> Result<(), MeadowlarkError> {
        (**self).write_image(image, is_8bit)
    }

    fn temperature(&self) -> f64 {
        (**self).temperature()
    }

    fn coverglass_voltage(&self) -> f64 {
        (**self).coverglass_voltage()
    }

    fn delete_sdk(&mut self) {
        (**self).delete_sdk()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeadowlarkConfig {
    #[serde(default = "MeadowlarkConfig::default_name")]
    pub name: String,
    #[serde(default)]
    pub sdk_path: Option<PathBuf>,
    #[serde(default)]
    pub lut_path: Option<PathBuf>,
    #[serde(default = "MeadowlarkConfig::default_wav_um")]
    pub wav_um: f64,
    #[serde(default)]
    pub wav_design_um: Option<f64>,
    #[serde(default = "MeadowlarkConfig::default_pitch_um")]
    pub pitch_um: (f64, f64),
}
impl MeadowlarkConfig {
    fn default_name() -> String {
        "Meadowlark".into()
    }

    fn default_wav_um() -> f64 {
        1.0
    }

    /// Most Meadowlark models have 8 µm pixels, but not all.
    fn default_pitch_um() -> (f64, f64) {
        (8.0, 8.0)
    }
}

impl Default for MeadowlarkConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            sdk_path: None,
            lut_path: None,
            wav_um: Self::default_wav_um(),
            wav_design_um: None,
            pitch_um: Self::default_pitch_um(),
        }
    }
}

/// Locates the Blink SDK under `search_dir`: the directory holding a `*Blink_C_Wrapper*.dll`.
/// When several installations are present, the most recently created one wins.
pub fn find_sdk_path(search_dir: &Path) -> Result<PathBuf, MeadowlarkError> {
    let mut libraries = vec![];
    if search_dir.exists() {
        recurse_dir(search_dir.to_path_buf(), &mut libraries, &mut |path| {
            let is_dll = path
                .extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case("dll"));
            let is_wrapper = path
                .file_name()
                .map_or(false, |name| name.to_string_lossy().contains(SDK_LIBRARY_STEM));
            is_dll && is_wrapper
        })?;
    }

    let library = match libraries.len() {
        0 => None,
        1 => libraries.first(),
        _ => {
            let newest = most_recent(&libraries)?;
            if let Some(newest) = newest {
                warn!(
                    "{} Meadowlark SDKs located; defaulting to the most recent one {}",
                    libraries.len(),
                    newest.display()
                );
            }
            newest
        }
    };
    library
        .and_then(|library| library.parent())
        .map(Path::to_path_buf)
        .ok_or_else(|| MeadowlarkError::SdkNotFound(search_dir.to_path_buf()))
}

/// Resolves the LUT file to load.
///
/// `None` searches `<sdk_path>/LUT Files`. A path ending in `.lut` is taken as given. Any other
/// path is searched as a directory: the alphabetically first `.lut` file whose name starts with
/// `slm` is chosen (Meadowlark ships per-device tables such as `slm5758_at532.lut`), falling
/// back to the alphabetically first `.lut` file.
pub fn resolve_lut_path(lut_path: Option<&Path>, sdk_path: &Path) -> Result<PathBuf, MeadowlarkError> {
    let lut_path = match lut_path {
        None => sdk_path.join(LUT_DIR),
        Some(path) => path.to_path_buf(),
    };
    if has_lut_extension(&lut_path) {
        return Ok(lut_path);
    }

    let mut names = fs::read_dir(&lut_path)
        .map_err(|_| MeadowlarkError::LutNotFound(lut_path.clone()))?
        .map(|entry| entry.map(|entry| entry.file_name().to_string_lossy().into_owned()))
        .collect::<Result<Vec<_>, _>>()?;
    names.sort();

    let luts: Vec<_> = names
        .iter()
        .filter(|name| has_lut_extension(Path::new(name)))
        .collect();
    let preferred = luts
        .iter()
        .find(|name| name.to_ascii_lowercase().starts_with("slm"))
        .or_else(|| luts.first());
    match preferred {
        Some(name) => Ok(lut_path.join(name)),
        None => Err(MeadowlarkError::LutNotFound(lut_path)),
    }
}

fn has_lut_extension(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("lut"))
}

pub struct Meadowlark<S: BlinkSdk> {
    sdk: S,
    sdk_path: PathBuf,
    lut_path: PathBuf,
    buffer: Vec<u8>,
}
impl<S: BlinkSdk> Meadowlark<S> {
    /// Initializes the SLM behind `sdk` and blanks its display. Once the SDK has been created,
    /// any failure deletes it before returning.
    pub fn open(mut sdk: S, config: &MeadowlarkConfig) -> Result<Slm<Self>, SlmError> {
        let sdk_path = match &config.sdk_path {
            Some(sdk_path) => sdk_path.clone(),
            None => find_sdk_path(Path::new(DEFAULT_SDK_SEARCH_PATH))?,
        };

        info!("validating DPI awareness");
        let dpi = sdk.validate_dpi_awareness();
        if !dpi.success {
            return Err(MeadowlarkError::DpiAwareness {
                get: dpi.get,
                set: dpi.set,
                awareness: dpi.awareness,
            }
            .into());
        }

        info!("constructing Blink SDK from {}", sdk_path.display());
        sdk.create_sdk()?;

        let (lut_path, settings) = match Self::configure(&mut sdk, &sdk_path, config) {
            Ok(configured) => configured,
            Err(err) => {
                sdk.delete_sdk();
                return Err(err);
            }
        };
        let meadowlark = Self {
            sdk,
            sdk_path,
            lut_path,
            buffer: vec![],
        };
        let mut slm = Slm::new(settings, meadowlark)?;
        if slm.bitdepth() > 8 {
            warn!(
                "bitdepth of {} > 8 detected; this has not been tested and might fail",
                slm.bitdepth()
            );
        }
        let blanked = slm.set_phase(None).map(|_| ());
        if let Err(err) = blanked {
            if let Err(close_err) = slm.close() {
                warn!("failed to release the SDK after a failed write: {close_err}");
            }
            return Err(err);
        }
        Ok(slm)
    }

    /// Loads the LUT and reads the device geometry, returning validated settings.
    fn configure(
        sdk: &mut S,
        sdk_path: &Path,
        config: &MeadowlarkConfig,
    ) -> Result<(PathBuf, SlmSettings), SlmError> {
        let lut_path = resolve_lut_path(config.lut_path.as_deref(), sdk_path)?;
        sdk.load_lut(&lut_path)?;
        info!("loaded LUT from {}", lut_path.display());

        let settings = SlmSettings {
            name: config.name.clone(),
            width: sdk.width(),
            height: sdk.height(),
            bitdepth: sdk.depth(),
            wav_um: config.wav_um,
            wav_design_um: config.wav_design_um,
            pitch_um: config.pitch_um,
        };
        info!(
            "{} reports {} at {}-bit",
            settings.name,
            DisplayShape(settings.shape()),
            settings.bitdepth
        );
        settings.validate()?;
        Ok((lut_path, settings))
    }

    /// Display discovery is not possible: the vendor software drives a single SLM.
    pub fn info() -> Result<Vec<String>, SlmError> {
        Err(SlmError::Unsupported(
            "Meadowlark software does not support multiple SLMs, so display discovery is moot"
                .into(),
        ))
    }

    pub fn temperature(&self) -> f64 {
        self.sdk.temperature()
    }

    pub fn coverglass_voltage(&self) -> f64 {
        self.sdk.coverglass_voltage()
    }

    pub fn sdk_path(&self) -> &Path {
        &self.sdk_path
    }

    pub fn lut_path(&self) -> &Path {
        &self.lut_path
    }

    pub fn sdk(&self) -> &S {
        &self.sdk
    }
}

impl<S: BlinkSdk> SlmHardware for Meadowlark<S> {
    fn write(&mut self, display: &Matrix<u16>, bitdepth: u8) -> Result<(), SlmError> {
        let is_8bit = bitdepth <= 8;
        self.buffer.clear();
        if is_8bit {
            self.buffer.extend(display.iter().map(|&level| level as u8));
        } else {
            self.buffer
                .extend(display.iter().flat_map(|level| level.to_le_bytes()));
        }
        self.sdk.write_image(&self.buffer, is_8bit)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SlmError> {
        self.sdk.delete_sdk();
        self.buffer = Vec::new();
        Ok(())
    }
}
