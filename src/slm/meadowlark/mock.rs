//! Mock instantiation of the [BlinkSdk](super::BlinkSdk) interface.
//!
//! The mock records every call so tests can assert on the initialization sequence without a
//! device or the vendor library.
#![cfg(any(test, feature = "mocks"))]

use std::path::{Path, PathBuf};

use super::{BlinkSdk, DpiAwareness, MeadowlarkError};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ValidateDpiAwareness,
    CreateSdk,
    LoadLut(PathBuf),
    WriteImage { len: usize, is_8bit: bool },
    DeleteSdk,
}

#[derive(Debug)]
pub struct MockBlinkSdk {
    pub width: usize,
    pub height: usize,
    pub depth: u8,
    pub dpi: DpiAwareness,
    pub temperature: f64,
    pub coverglass_voltage: f64,
    pub calls: Vec<Call>,
    pub images: Vec<Vec<u8>>,
    pub fail_lut: bool,
    pub fail_writes: bool,
}
impl MockBlinkSdk {
    pub fn new(width: usize, height: usize, depth: u8) -> Self {
        Self {
            width,
            height,
            depth,
            dpi: DpiAwareness {
                get: 0,
                set: 0,
                awareness: 2,
                success: true,
            },
            temperature: 25.0,
            coverglass_voltage: 0.0,
            calls: vec![],
            images: vec![],
            fail_lut: false,
            fail_writes: false,
        }
    }

    /// Fails DPI validation with the given error codes.
    pub fn with_dpi_failure(mut self, get: i32, set: i32, awareness: i32) -> Self {
        self.dpi = DpiAwareness {
            get,
            set,
            awareness,
            success: false,
        };
        self
    }

    pub fn with_failing_lut(mut self) -> Self {
        self.fail_lut = true;
        self
    }

    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn last_image(&self) -> Option<&[u8]> {
        self.images.last().map(Vec::as_slice)
    }
}

impl BlinkSdk for MockBlinkSdk {
    fn validate_dpi_awareness(&mut self) -> DpiAwareness {
        self.calls.push(Call::ValidateDpiAwareness);
        self.dpi
    }

    fn create_sdk(&mut self) -> Result<(), MeadowlarkError> {
        self.calls.push(Call::CreateSdk);
        Ok(())
    }

    fn load_lut(&mut self, path: &Path) -> Result<(), MeadowlarkError> {
        self.calls.push(Call::LoadLut(path.to_path_buf()));
        if self.fail_lut {
            return Err(MeadowlarkError::Sdk(format!("cannot load {}", path.display())));
        }
        Ok(())
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn depth(&self) -> u8 {
        self.depth
    }

    fn write_image(&mut self, image: &[u8], is_8bit: bool) -> Result<(), MeadowlarkError> {
        if self.fail_writes {
            return Err(MeadowlarkError::Sdk("display disconnected".into()));
        }
        let expected = self.width * self.height * if is_8bit { 1 } else { 2 };
        if image.len() != expected {
            return Err(MeadowlarkError::Sdk(format!(
                "image holds {} bytes, expected {expected}",
                image.len()
            )));
        }
        self.calls.push(Call::WriteImage {
            len: image.len(),
            is_8bit,
        });
        self.images.push(image.to_vec());
        Ok(())
    }

    fn temperature(&self) -> f64 {
        self.temperature
    }

    fn coverglass_voltage(&self) -> f64 {
        self.coverglass_voltage
    }

    fn delete_sdk(&mut self) {
        self.calls.push(Call::DeleteSdk);
    }
}
