//! eds-tether binary: connects, previews and shoots one picture.
//!
//! Built with the `edsdk` feature it drives the attached camera; otherwise
//! it runs against the simulated one.

use std::path::{Path, PathBuf};
use std::thread;

use eds_tether::{Camera, CameraConfig, CameraSdk};
use tracing_subscriber::EnvFilter;

/// Frames to preview before and after the shot.
const PREVIEW_FRAMES: usize = 10;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let dest = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from("."), PathBuf::from);

    if let Err(err) = run(sdk(), &dest) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

#[cfg(feature = "edsdk")]
fn sdk() -> eds_tether::EdsSdk {
    eds_tether::EdsSdk::new()
}

#[cfg(not(feature = "edsdk"))]
fn sdk() -> eds_tether::MockSdk {
    eds_tether::MockSdk::new()
}

fn run<S: CameraSdk>(sdk: S, dest: &Path) -> eds_tether::Result<()> {
    let config = CameraConfig::default().with_force_jpeg(true);
    let poll_interval = config.poll_interval();
    let mut camera = Camera::connect(sdk, config)?;

    let image = camera.live_view_image_size();
    let zoom_box = camera.zoom_box_size();
    println!("Camera: {}", camera.name());
    println!(
        "Live view: {}x{}, zoom box {}x{}",
        image.width, image.height, zoom_box.width, zoom_box.height
    );

    camera.start_live_view();
    preview(&mut camera, poll_interval);

    if camera.take_single_picture(dest) {
        preview(&mut camera, poll_interval);
    }

    while let Some(path) = camera.pop_picture_done() {
        println!("Picture: {}", path.display());
    }
    while let Some(message) = camera.pop_error_message() {
        println!("{:?}: {}", message.severity, message.text);
    }

    camera.stop_live_view();
    camera.terminate();
    Ok(())
}

fn preview<S: CameraSdk>(camera: &mut Camera<S>, poll_interval: std::time::Duration) {
    for _ in 0..PREVIEW_FRAMES {
        camera.process_events();
        if camera.grab_live_view_frame() {
            println!(
                "Frame: {} bytes ({:?})",
                camera.live_view_frame_size(),
                camera.live_view_state()
            );
        }
        thread::sleep(poll_interval);
    }
}
