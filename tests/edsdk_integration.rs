//! Integration tests against a real camera through the EDSDK.
//!
//! These tests require:
//! - The `integration` and `edsdk` feature flags:
//!   `cargo test --features integration,edsdk`
//! - `EDSDK_DIR` pointing at the directory holding the EDSDK library
//! - Exactly one Canon EOS body attached over USB, switched on, in a shooting
//!   mode (P, Av, Tv or M) with a lens that can autofocus or is set to MF
//!
//! Tests will fail if no camera is attached.

#![cfg(all(feature = "integration", feature = "edsdk"))]

use std::thread;
use std::time::{Duration, Instant};

use eds_tether::{Camera, CameraConfig, CameraModelProfile, EdsSdk, LiveViewState};
use serial_test::serial;
use tempfile::tempdir;

/// How long to wait for the camera to acknowledge live view or deliver a
/// picture.
const TIMEOUT: Duration = Duration::from_secs(10);

/// Macro to fail test if no camera is attached.
///
/// Integration tests MUST have a camera - they should fail, not silently
/// skip.
macro_rules! require_camera {
    () => {
        match Camera::connect(EdsSdk::new(), CameraConfig::default().with_force_jpeg(true)) {
            Ok(camera) => camera,
            Err(err) => {
                panic!(
                    "No usable camera attached: {err}\n\
                     Attach one Canon EOS body and switch it on.\n\
                     Or run unit tests only: cargo test --lib"
                );
            }
        }
    };
}

/// Pump events until `done` holds or the timeout expires.
fn wait_for<F>(camera: &mut Camera<EdsSdk>, mut done: F) -> bool
where
    F: FnMut(&mut Camera<EdsSdk>) -> bool,
{
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        camera.process_events();
        if done(camera) {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    false
}

#[test]
#[serial]
fn test_camera_connect() {
    let mut camera = require_camera!();

    println!("Connected camera: {}", camera.name());
    println!(
        "Known model: {}",
        CameraModelProfile::is_known(camera.name())
    );
    assert!(camera.is_connected());
    assert!(!camera.name().is_empty(), "camera should report its model");

    assert!(camera.terminate());
}

#[test]
#[serial]
fn test_camera_live_view() {
    let mut camera = require_camera!();

    assert!(camera.start_live_view());
    assert!(
        wait_for(&mut camera, |c| c.live_view_state() == LiveViewState::On),
        "live view was not acknowledged"
    );

    let grabbed = wait_for(&mut camera, Camera::grab_live_view_frame);
    assert!(grabbed, "no live view frame within {TIMEOUT:?}");

    let frame = camera.live_view_frame();
    println!("Live view frame: {} bytes", frame.len());
    assert!(frame.starts_with(&[0xFF, 0xD8]), "frame should be a JPEG");

    assert!(camera.stop_live_view());
    assert!(wait_for(&mut camera, |c| c.live_view_state() == LiveViewState::Off));
    assert!(camera.terminate());
}

#[test]
#[serial]
fn test_camera_single_picture() {
    let dir = tempdir().expect("tempdir");
    let mut camera = require_camera!();

    assert!(camera.take_single_picture(dir.path()));
    assert!(
        wait_for(&mut camera, |c| c.picture_done_count() > 0),
        "picture was not transferred"
    );

    let path = camera.pop_picture_done().expect("picture done");
    let size = std::fs::metadata(&path).expect("picture on disk").len();
    println!("Picture: {} ({size} bytes)", path.display());
    assert!(size > 0);

    while let Some(message) = camera.pop_error_message() {
        println!("{:?}: {}", message.severity, message.text);
    }
    assert!(camera.terminate());
}
