//! Build script for detecting system dependencies and providing installation guidance.
//!
//! Checks for OpenCV (capture, preview), the X11 and XTEST libraries (pointer
//! and click injection) and pkg-config, printing hints for anything missing.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    check_opencv();

    // Pointer warp and synthetic clicks go through X11 on Linux
    if env::var("TARGET").unwrap_or_default().contains("linux") {
        check_pkg("x11", "X11 libraries", "libx11-dev");
        check_pkg("xtst", "XTEST extension library", "libxtst-dev");
    }

    check_pkg_config();

    println!(
        "cargo:rustc-env=BUILD_TARGET={}",
        env::var("TARGET").unwrap_or_default()
    );
}

fn pkg_version(name: &str) -> Option<String> {
    let output = Command::new("pkg-config").args(["--modversion", name]).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn check_opencv() {
    println!("cargo:rerun-if-env-changed=PKG_CONFIG_PATH");
    println!("cargo:rerun-if-env-changed=OPENCV_LINK_PATHS");
    println!("cargo:rerun-if-env-changed=OPENCV_INCLUDE_PATHS");

    match pkg_version("opencv4").or_else(|| pkg_version("opencv")) {
        Some(version) => println!("cargo:warning=Found OpenCV version: {version}"),
        None => {
            println!("cargo:warning=OpenCV not found via pkg-config. Camera capture and preview need it.");
            println!("cargo:warning=On Ubuntu: sudo apt-get install libopencv-dev");
            println!("cargo:warning=On macOS: brew install opencv");
        }
    }
}

fn check_pkg(name: &str, what: &str, ubuntu_package: &str) {
    if pkg_version(name).is_none() {
        println!("cargo:warning={what} not found. Pointer control will not work.");
        println!("cargo:warning=On Ubuntu: sudo apt-get install {ubuntu_package}");
    }
}

fn check_pkg_config() {
    let output = Command::new("pkg-config").arg("--version").output();

    match output {
        Ok(output) if output.status.success() => {}
        _ => {
            println!("cargo:warning=pkg-config not found. This is required to find system libraries.");
            println!("cargo:warning=On Ubuntu: sudo apt-get install pkg-config");
            println!("cargo:warning=On macOS: brew install pkg-config");
        }
    }
}
