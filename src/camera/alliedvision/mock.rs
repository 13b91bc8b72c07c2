//! Mock instantiation of the [VimbaSystem](super::VimbaSystem) and
//! [VimbaCamera](super::VimbaCamera) interfaces.
//!
//! Cameras are backed by an in-memory feature table and a queue of frames.
#![cfg(any(test, feature = "mocks"))]

use std::cell::Cell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use super::{AlliedVisionError, EnumEntry, FeatureValue, VimbaCamera, VimbaSystem};
use crate::linear::Matrix;

#[derive(Debug, Default)]
pub struct MockVimbaSystem {
    pub running: bool,
    pub startups: usize,
    pub shutdowns: usize,
    pub cameras: Vec<MockVimbaCamera>,
    pub fail_listing: bool,
}
impl MockVimbaSystem {
    pub fn with_cameras(cameras: Vec<MockVimbaCamera>) -> Self {
        Self {
            cameras,
            ..Self::default()
        }
    }
}

impl VimbaSystem for MockVimbaSystem {
    type Camera = MockVimbaCamera;

    fn name(&self) -> &str {
        "mock-vimba"
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn startup(&mut self) -> Result<(), AlliedVisionError> {
        self.running = true;
        self.startups += 1;
        Ok(())
    }

    fn shutdown(&mut self) {
        self.running = false;
        self.shutdowns += 1;
    }

    fn cameras(&mut self) -> Result<Vec<MockVimbaCamera>, AlliedVisionError> {
        if !self.running {
            return Err(AlliedVisionError::Vimba("system is not running".into()));
        }
        if self.fail_listing {
            return Err(AlliedVisionError::Vimba("transport layer unavailable".into()));
        }
        Ok(self.cameras.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockFeature {
    pub value: FeatureValue,
    pub entries: Vec<EnumEntry>,
    pub unit: Option<String>,
    pub description: Option<String>,
}
impl MockFeature {
    pub fn int(value: i64) -> Self {
        Self::new(FeatureValue::Int(value))
    }

    pub fn float(value: f64, unit: &str) -> Self {
        Self {
            unit: Some(unit.into()),
            ..Self::new(FeatureValue::Float(value))
        }
    }

    /// An enumeration holding the given entry names, valued by position; the first is current.
    pub fn enumeration(names: &[&str]) -> Self {
        let entries: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(index, &name)| EnumEntry::new(name, index as i64))
            .collect();
        Self {
            value: FeatureValue::Enum(entries[0].clone()),
            entries,
            unit: None,
            description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.into());
        self
    }

    fn new(value: FeatureValue) -> Self {
        Self {
            value,
            entries: vec![],
            unit: None,
            description: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockVimbaCamera {
    pub serial: String,
    pub open: bool,
    pub features: BTreeMap<String, MockFeature>,
    pub frames: VecDeque<Matrix<u16>>,
    pub frame_requests: usize,
    pub assignments: Vec<(String, FeatureValue)>,
    /// Shared by every clone, so closes remain visible after the system hands out copies.
    pub closes: Rc<Cell<usize>>,
}
impl MockVimbaCamera {
    /// A 4x3 camera with 12-bit pixels and the features set on open.
    pub fn new(serial: &str) -> Self {
        let mut features = BTreeMap::new();
        let mut add = |name: &str, feature: MockFeature| {
            features.insert(name.to_string(), feature);
        };
        add("SensorWidth", MockFeature::int(4));
        add("SensorHeight", MockFeature::int(3));
        add(
            "PixelSize",
            MockFeature {
                value: FeatureValue::Enum(EnumEntry::new("Bpp12", 12)),
                entries: vec![EnumEntry::new("Bpp8", 8), EnumEntry::new("Bpp12", 12)],
                unit: None,
                description: None,
            },
        );
        add(
            "ExposureTime",
            MockFeature::float(10_000.0, "us").with_description("Exposure duration"),
        );
        add("SensorBitDepth", MockFeature::enumeration(&["Bpp10", "Bpp12"]));
        add("GainAuto", MockFeature::enumeration(&["Continuous", "Off", "Once"]));
        add("ExposureAuto", MockFeature::enumeration(&["Continuous", "Off", "Once"]));
        add("ExposureMode", MockFeature::enumeration(&["TriggerWidth", "Timed"]));
        add(
            "AcquisitionMode",
            MockFeature::enumeration(&["Continuous", "SingleFrame", "MultiFrame"]),
        );
        add(
            "TriggerSelector",
            MockFeature::enumeration(&["FrameStart", "AcquisitionStart"]),
        );
        add("TriggerMode", MockFeature::enumeration(&["On", "Off"]));
        add(
            "TriggerActivation",
            MockFeature::enumeration(&["FallingEdge", "RisingEdge"]),
        );
        add("TriggerSource", MockFeature::enumeration(&["Line0", "Software"]));
        Self {
            serial: serial.into(),
            open: false,
            features,
            frames: VecDeque::new(),
            frame_requests: 0,
            assignments: vec![],
            closes: Rc::default(),
        }
    }

    pub fn with_feature(mut self, name: &str, feature: MockFeature) -> Self {
        self.features.insert(name.into(), feature);
        self
    }

    pub fn with_frames(mut self, frames: impl IntoIterator<Item = Matrix<u16>>) -> Self {
        self.frames.extend(frames);
        self
    }

    fn feature(&self, name: &str) -> Result<&MockFeature, AlliedVisionError> {
        self.features.get(name).ok_or_else(|| missing(name))
    }
}

fn missing(feature: &str) -> AlliedVisionError {
    AlliedVisionError::Feature {
        feature: feature.into(),
        message: "not available".into(),
    }
}

impl VimbaCamera for MockVimbaCamera {
    fn serial(&self) -> String {
        self.serial.clone()
    }

    fn open(&mut self) -> Result<(), AlliedVisionError> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.closes.set(self.closes.get() + 1);
    }

    fn feature_names(&self) -> Vec<String> {
        self.features.keys().cloned().collect()
    }

    fn get(&self, feature: &str) -> Result<FeatureValue, AlliedVisionError> {
        Ok(self.feature(feature)?.value.clone())
    }

    fn set(&mut self, feature: &str, value: FeatureValue) -> Result<(), AlliedVisionError> {
        let target = self.features.get_mut(feature).ok_or_else(|| missing(feature))?;
        target.value = if target.entries.is_empty() {
            value.clone()
        } else {
            let entry = target.entries.iter().find(|entry| match &value {
                FeatureValue::Str(name) => entry.name == *name,
                FeatureValue::Int(number) => entry.value == *number,
                _ => false,
            });
            match entry {
                Some(entry) => FeatureValue::Enum(entry.clone()),
                None => {
                    return Err(AlliedVisionError::Feature {
                        feature: feature.into(),
                        message: format!("no entry {value}"),
                    })
                }
            }
        };
        self.assignments.push((feature.into(), value));
        Ok(())
    }

    fn entries(&self, feature: &str) -> Result<Vec<EnumEntry>, AlliedVisionError> {
        Ok(self.feature(feature)?.entries.clone())
    }

    fn unit(&self, feature: &str) -> Result<String, AlliedVisionError> {
        self.feature(feature)?
            .unit
            .clone()
            .ok_or_else(|| missing(feature))
    }

    fn description(&self, feature: &str) -> Result<String, AlliedVisionError> {
        self.feature(feature)?
            .description
            .clone()
            .ok_or_else(|| missing(feature))
    }

    fn get_frame(&mut self, _timeout: Duration) -> Result<Matrix<u16>, AlliedVisionError> {
        self.frame_requests += 1;
        self.frames
            .pop_front()
            .ok_or_else(|| AlliedVisionError::Vimba("frame timed out".into()))
    }
}
