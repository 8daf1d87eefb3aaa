//! End-to-end tests driving the library the way a host does, against the
//! simulated camera.
//!
//! Each test owns its diagnostics queue, so they run in parallel.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use eds_tether::fsutil;
use eds_tether::traits::{PropertyId, PropertyValue, SAVE_TO_HOST};
use eds_tether::{
    Camera, CameraConfig, CameraModelProfile, Diagnostics, LiveViewState, MockSdk, Point,
    Severity, Size, WhiteBalance,
};
use tempfile::tempdir;

fn connect(sdk: MockSdk, config: CameraConfig) -> Camera<MockSdk> {
    let mut camera = Camera::new(sdk, config)
        .expect("sdk initializes")
        .with_diagnostics(Diagnostics::new(Severity::Warning));
    camera.open().expect("camera connects");
    camera
}

/// Pump until live view settles or the attempts run out.
fn settle(camera: &mut Camera<MockSdk>) {
    for _ in 0..4 {
        camera.process_events();
        if !camera.live_view_state().is_waiting() {
            break;
        }
    }
}

fn messages(camera: &Camera<MockSdk>) -> Vec<String> {
    std::iter::from_fn(|| camera.pop_error_message())
        .map(|message| message.text)
        .collect()
}

#[test]
fn test_host_session() {
    let dir = tempdir().expect("tempdir");
    let frame = vec![0xFF, 0xD8, 1, 2, 3, 4, 0xFF, 0xD9];
    let mut camera = connect(
        MockSdk::new().with_live_view_image(frame.clone()),
        CameraConfig::default(),
    );

    assert!(!camera.grab_live_view_frame(), "live view is off");
    assert!(camera.start_live_view());
    assert!(!camera.grab_live_view_frame(), "not yet on");
    settle(&mut camera);
    assert_eq!(camera.live_view_state(), LiveViewState::On);

    assert!(camera.grab_live_view_frame());
    assert_eq!(camera.live_view_frame(), frame.as_slice());
    assert_eq!(camera.live_view_frame_size(), frame.len());

    let dest = dir.path().join("session").join("shot.jpg");
    assert!(camera.take_single_picture(&dest));
    settle(&mut camera);

    assert_eq!(camera.live_view_state(), LiveViewState::On);
    assert_eq!(camera.pop_picture_done(), Some(dest.clone()));
    assert!(fs::read(&dest).expect("picture written").starts_with(&[0xFF, 0xD8]));

    assert!(camera.stop_live_view());
    settle(&mut camera);
    assert_eq!(camera.live_view_state(), LiveViewState::Off);

    assert!(camera.terminate());
    assert!(!camera.is_connected());
    assert!(!camera.sdk().is_initialized());
    assert!(messages(&camera).is_empty());
}

#[test]
fn test_session_is_configured_for_tethering() {
    let camera = connect(
        MockSdk::new().with_property(PropertyId::IMAGE_QUALITY, PropertyValue::UInt(0x0064_FF0F)),
        CameraConfig::default().with_force_jpeg(true),
    );

    let sdk = camera.sdk();
    assert!(sdk.is_subscribed());
    assert_eq!(
        sdk.stored_property(PropertyId::SAVE_TO),
        Some(PropertyValue::UInt(SAVE_TO_HOST))
    );
    assert_eq!(
        sdk.stored_property(PropertyId::IMAGE_QUALITY),
        Some(PropertyValue::UInt(0x0014_FF0F))
    );
}

#[test]
fn test_pictures_land_on_unique_paths() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("photo.jpg"), b"first").expect("write");
    fs::write(dir.path().join("photo_1.jpg"), b"second").expect("write");
    assert_eq!(
        fsutil::resolve_unique(&dir.path().join("photo.jpg")),
        dir.path().join("photo_2.jpg")
    );

    let mut camera = connect(MockSdk::new(), CameraConfig::default());
    assert!(camera.take_single_picture(dir.path().join("photo.jpg")));
    settle(&mut camera);

    assert_eq!(camera.pop_picture_done(), Some(dir.path().join("photo_2.jpg")));
    assert_eq!(fs::read(dir.path().join("photo.jpg")).expect("read"), b"first");
}

#[test]
fn test_staging_dir_from_config() {
    let dir = tempdir().expect("tempdir");
    let staging = dir.path().join("staging");
    let dest = dir.path().join("out").join("photo.jpg");

    let mut camera = connect(
        MockSdk::new(),
        CameraConfig::default().with_staging_dir(&staging),
    );
    assert!(camera.take_single_picture(&dest));
    settle(&mut camera);

    assert!(dest.exists());
    let leftovers = fs::read_dir(&staging).expect("staging dir created").count();
    assert_eq!(leftovers, 0);
}

#[test]
fn test_fast_batch_with_callback() {
    let dir = tempdir().expect("tempdir");
    let seen: Arc<Mutex<Vec<PathBuf>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let mut camera = connect(MockSdk::new(), CameraConfig::default());
    camera.set_picture_complete_callback(move |path: &Path| {
        sink.lock().expect("lock").push(path.to_path_buf());
    });
    assert!(camera.start_live_view());
    settle(&mut camera);

    let shots: Vec<PathBuf> = (0..3)
        .map(|i| dir.path().join(format!("burst_{i}.jpg")))
        .collect();
    assert!(camera.begin_fast_pictures());
    for shot in &shots {
        assert!(camera.take_fast_picture(shot));
    }
    assert!(camera.end_fast_pictures());
    settle(&mut camera);

    let done: Vec<PathBuf> = std::iter::from_fn(|| camera.pop_picture_done()).collect();
    assert_eq!(done, shots);
    assert_eq!(*seen.lock().expect("lock"), shots);
    assert_eq!(camera.live_view_state(), LiveViewState::On);
}

#[test]
fn test_property_writes_follow_frames() {
    let mut camera = connect(MockSdk::new(), CameraConfig::default());
    assert!(camera.start_live_view());
    settle(&mut camera);

    camera.set_zoom_ratio(2);
    camera.set_zoom_ratio(5);
    camera.set_zoom_position(Point::new(640, 480));
    camera.set_white_balance(WhiteBalance::DAYLIGHT);
    assert!(camera.sdk().property_writes(PropertyId::EVF_ZOOM).is_empty());

    camera.grab_live_view_frame();
    let sdk = camera.sdk();
    assert_eq!(
        sdk.property_writes(PropertyId::EVF_ZOOM),
        vec![PropertyValue::UInt(5)]
    );
    assert_eq!(
        sdk.property_writes(PropertyId::EVF_ZOOM_POSITION),
        vec![PropertyValue::Point(Point::new(640, 480))]
    );
    assert_eq!(
        sdk.property_writes(PropertyId::WHITE_BALANCE),
        vec![PropertyValue::Int(1)]
    );

    let profile = camera.camera_specific_data();
    assert_eq!(camera.live_view_image_size(), profile.zoom500_image_size);
}

#[test]
fn test_unknown_model_uses_fallback_profile() {
    let camera = connect(
        MockSdk::new().with_name("Canon EOS 1100D"),
        CameraConfig::default(),
    );

    assert_eq!(camera.name(), "Canon EOS 1100D");
    assert_eq!(
        camera.camera_specific_data(),
        CameraModelProfile::lookup("Canon EOS 40D")
    );
    assert_ne!(camera.zoom_box_size(), Size::default());
}

#[test]
fn test_unplugged_camera() {
    let mut camera = connect(MockSdk::new(), CameraConfig::default());
    assert!(camera.start_live_view());
    settle(&mut camera);

    camera.sdk_mut().emit_shutdown();
    camera.process_events();

    assert!(!camera.is_connected());
    assert_eq!(camera.live_view_state(), LiveViewState::Off);
    assert!(!camera.take_single_picture("photo.jpg"));
    let reported = messages(&camera);
    assert!(reported.iter().any(|text| text.contains("shut down")));
}
