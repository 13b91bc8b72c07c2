use super::mock::{MockFeature, MockVimbaCamera, MockVimbaSystem};
use super::*;

fn blank_frame() -> Matrix<u16> {
    let mut frame = Matrix::allocate(3, 4);
    frame[(1, 2)] = BLANK_FRAME_LEVEL;
    frame
}

fn open(serial: &str) -> Camera<AlliedVision<MockVimbaSystem>> {
    let system = MockVimbaSystem::with_cameras(vec![
        MockVimbaCamera::new("DEV_1AB22C00041A"),
        MockVimbaCamera::new("DEV_1AB22C00041B"),
    ]);
    AlliedVision::open(system, serial, Some((3.45, 3.45))).unwrap()
}

#[test]
fn info_lists_serials() {
    let mut system = MockVimbaSystem::with_cameras(vec![
        MockVimbaCamera::new("A"),
        MockVimbaCamera::new("B"),
    ]);
    assert_eq!(vec!["A", "B"], AlliedVision::info(&mut system).unwrap());
    assert!(!system.running);
    assert_eq!((1, 1), (system.startups, system.shutdowns));

    system.startup().unwrap();
    AlliedVision::info(&mut system).unwrap();
    assert!(system.running);
}

#[test]
fn info_shuts_down_when_listing_fails() {
    let mut system = MockVimbaSystem {
        fail_listing: true,
        ..MockVimbaSystem::with_cameras(vec![MockVimbaCamera::new("A")])
    };
    let err = AlliedVision::info(&mut system).unwrap_err();
    assert_eq!("transport layer unavailable", err.to_string());
    assert!(!system.running);
    assert_eq!((1, 1), (system.startups, system.shutdowns));
}

#[test]
fn open_first_camera() {
    let camera = open("");
    assert_eq!("DEV_1AB22C00041A", camera.hardware().serial());
    assert_eq!("DEV_1AB22C00041A", camera.settings().name);
    assert_eq!((3, 4), camera.shape());
    assert_eq!(12, camera.bitdepth());
    assert_eq!(Some((3.45, 3.45)), camera.settings().pitch_um);
    assert!(camera.hardware().vimba_camera().open);
}

#[test]
fn open_by_serial() {
    let camera = open("DEV_1AB22C00041B");
    assert_eq!("DEV_1AB22C00041B", camera.hardware().serial());
}

#[test]
fn open_unknown_serial() {
    let system = MockVimbaSystem::with_cameras(vec![MockVimbaCamera::new("A")]);
    let err = AlliedVision::open(system, "Z", None).err().unwrap();
    assert_eq!(
        r#"serial Z not found by mock-vimba; available: ["A"]"#,
        err.to_string()
    );
}

#[test]
fn open_without_cameras() {
    let err = AlliedVision::open(MockVimbaSystem::default(), "", None)
        .err()
        .unwrap();
    assert_eq!("no cameras found by mock-vimba", err.to_string());
}

#[test]
fn open_shuts_down_when_geometry_unreadable() {
    let mut camera = MockVimbaCamera::new("A");
    camera.features.remove("SensorWidth");
    let closes = camera.closes.clone();
    let mut system = MockVimbaSystem::with_cameras(vec![camera]);
    let err = AlliedVision::open(&mut system, "", None).err().unwrap();
    assert_eq!("feature SensorWidth: not available", err.to_string());
    assert_eq!(1, closes.get());
    assert!(!system.running);
    assert_eq!((1, 1), (system.startups, system.shutdowns));
}

#[test]
fn open_shuts_down_when_configuration_fails() {
    let mut camera = MockVimbaCamera::new("A");
    camera.features.remove("TriggerSource");
    let closes = camera.closes.clone();
    let mut system = MockVimbaSystem::with_cameras(vec![camera]);
    let err = AlliedVision::open(&mut system, "A", None).err().unwrap();
    assert_eq!("feature TriggerSource: not available", err.to_string());
    assert_eq!(1, closes.get());
    assert_eq!(1, system.shutdowns);
}

#[test]
fn open_rejects_empty_sensor() {
    let camera = MockVimbaCamera::new("A").with_feature("SensorHeight", MockFeature::int(0));
    let closes = camera.closes.clone();
    let mut system = MockVimbaSystem::with_cameras(vec![camera]);
    let err = AlliedVision::open(&mut system, "", None).err().unwrap();
    assert_eq!(
        "invalid camera settings: shape 0x4 has no pixels",
        err.to_string()
    );
    assert_eq!(1, closes.get());
    assert_eq!(1, system.shutdowns);
}

#[test]
fn failed_open_keeps_running_sdk() {
    let mut camera = MockVimbaCamera::new("A");
    camera.features.remove("PixelSize");
    let mut system = MockVimbaSystem::with_cameras(vec![camera]);
    system.startup().unwrap();
    AlliedVision::open(&mut system, "", None).err().unwrap();
    assert!(system.running);
    assert_eq!(0, system.shutdowns);
}

#[test]
fn open_without_cameras_shuts_down() {
    let mut system = MockVimbaSystem::default();
    AlliedVision::open(&mut system, "", None).err().unwrap();
    assert!(!system.running);
    assert_eq!(1, system.shutdowns);
}

#[test]
fn open_configures_features() {
    let camera = open("");
    let vimba = camera.hardware().vimba_camera();
    let assigned: Vec<_> = vimba
        .assignments
        .iter()
        .map(|(feature, value)| (feature.as_str(), value.to_string()))
        .collect();
    let expected: Vec<_> = CONFIGURATION
        .iter()
        .map(|&(feature, value)| (feature, value.to_string()))
        .collect();
    // binning is not available on the mock, so only the configuration lands
    assert_eq!(expected, assigned);
    assert_eq!(
        FeatureValue::Enum(EnumEntry::new("Software", 1)),
        vimba.get("TriggerSource").unwrap()
    );
}

#[test]
fn open_sets_binning_when_available() {
    let vimba = MockVimbaCamera::new("A")
        .with_feature("BinningHorizontal", MockFeature::int(2))
        .with_feature("BinningVertical", MockFeature::int(2));
    let camera =
        AlliedVision::open(MockVimbaSystem::with_cameras(vec![vimba]), "", None).unwrap();
    let vimba = camera.hardware().vimba_camera();
    assert_eq!(FeatureValue::Int(1), vimba.get("BinningHorizontal").unwrap());
    assert_eq!(FeatureValue::Int(1), vimba.get("BinningVertical").unwrap());
}

#[test]
fn exposure_in_seconds() {
    let mut camera = open("");
    assert_eq!(0.01, camera.exposure().unwrap());
    camera.set_exposure(0.0025).unwrap();
    assert_eq!(
        FeatureValue::Float(2500.0),
        camera.hardware().vimba_camera().get("ExposureTime").unwrap()
    );
}

#[test]
fn adc_bitdepth() {
    let mut camera = open("");
    assert_eq!(10, camera.hardware().adc_bitdepth().unwrap());
    camera.hardware_mut().set_adc_bitdepth(12).unwrap();
    assert_eq!(12, camera.hardware().adc_bitdepth().unwrap());
    assert_eq!(
        "ADC bitdepth 14 not found",
        camera
            .hardware_mut()
            .set_adc_bitdepth(14)
            .unwrap_err()
            .to_string()
    );
}

#[test]
fn blank_frames_are_retried() {
    let mut frame = Matrix::allocate(3, 4);
    frame[(0, 0)] = 500;
    let vimba = MockVimbaCamera::new("A").with_frames([blank_frame(), blank_frame(), frame]);
    let mut camera =
        AlliedVision::open(MockVimbaSystem::with_cameras(vec![vimba]), "", None).unwrap();
    let image = camera.get_image(10.0).unwrap();
    assert_eq!(500, image[(0, 0)]);
    assert_eq!(3, camera.hardware().vimba_camera().frame_requests);
}

#[test]
fn blank_frame_returned_after_timeout() {
    let vimba = MockVimbaCamera::new("A").with_frames([blank_frame(), Matrix::allocate(3, 4)]);
    let mut camera =
        AlliedVision::open(MockVimbaSystem::with_cameras(vec![vimba]), "", None).unwrap();
    let image = camera.get_image(0.0).unwrap();
    assert!(is_blank(&image));
    assert_eq!(1, camera.hardware().vimba_camera().frame_requests);
}

#[test]
fn is_blank_frame() {
    assert!(is_blank(&blank_frame()));
    assert!(!is_blank(&Matrix::allocate(3, 4)));
    let mut split = Matrix::allocate(3, 4);
    split[(0, 0)] = 16;
    split[(0, 1)] = 15;
    assert!(!is_blank(&split));
}

#[test]
fn properties_tolerate_missing_fields() {
    let camera = open("");
    let properties = camera.hardware().properties();
    assert_eq!(camera.hardware().vimba_camera().features.len(), properties.len());

    let exposure = properties
        .iter()
        .find(|property| property.name == "ExposureTime")
        .unwrap();
    assert_eq!(Some(FeatureValue::Float(10_000.0)), exposure.value);
    assert_eq!(Some("us"), exposure.unit.as_deref());
    assert_eq!(Some("Exposure duration"), exposure.description.as_deref());

    let width = properties
        .iter()
        .find(|property| property.name == "SensorWidth")
        .unwrap();
    assert_eq!(Some(FeatureValue::Int(4)), width.value);
    assert_eq!(None, width.unit);
    assert_eq!(None, width.description);
}

#[test]
fn close_shuts_down_sdk() {
    let mut camera = open("");
    camera.close().unwrap();
    assert!(!camera.hardware().vimba_camera().open);
    assert!(!camera.hardware().system().running);
    assert_eq!(1, camera.hardware().system().shutdowns);
}

#[test]
fn close_camera_keeps_sdk() {
    let mut camera = open("");
    camera.hardware_mut().close_camera(false);
    assert!(!camera.hardware().vimba_camera().open);
    assert!(matches!(camera.get_image(1.0), Err(CameraError::Closed)));
    assert!(camera.hardware().system().running);
}
