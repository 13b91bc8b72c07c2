//! An in-memory SLM, for running patterns without a device attached.

use tracing::debug;

use crate::linear::Matrix;
use crate::slm::{Slm, SlmError, SlmHardware, SlmSettings};

#[derive(Debug, Default)]
pub struct SimulatedSlm {
    frame: Option<Matrix<u16>>,
    writes: usize,
    closed: bool,
}
impl SimulatedSlm {
    pub fn open(settings: SlmSettings) -> Result<Slm<Self>, SlmError> {
        let mut slm = Slm::new(settings, Self::default())?;
        slm.set_phase(None)?;
        Ok(slm)
    }

    /// The last frame written, if any.
    pub fn frame(&self) -> Option<&Matrix<u16>> {
        self.frame.as_ref()
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl SlmHardware for SimulatedSlm {
    fn write(&mut self, display: &Matrix<u16>, bitdepth: u8) -> Result<(), SlmError> {
        if self.closed {
            return Err(SlmError::Closed);
        }
        self.writes += 1;
        debug!("frame {} at {bitdepth}-bit", self.writes);
        self.frame = Some(display.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), SlmError> {
        self.closed = true;
        Ok(())
    }
}
