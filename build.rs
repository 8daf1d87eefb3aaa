//! Build script for eds-tether
//!
//! Links the Canon EDSDK when the `edsdk` feature is enabled.

use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=EDSDK_DIR");

    if env::var_os("CARGO_FEATURE_EDSDK").is_none() {
        return;
    }

    if let Some(dir) = env::var_os("EDSDK_DIR") {
        println!("cargo:rustc-link-search=native={}", dir.to_string_lossy());
    }
    println!("cargo:rustc-link-lib=dylib=EDSDK");
}
