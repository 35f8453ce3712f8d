//! Build script: reports missing native libraries before the link step fails.
//!
//! OpenCV backs capture and preview, ALSA backs audio output on Linux.

use std::env;
use std::process::Command;

/// A native library located through pkg-config
struct NativeLib {
    /// pkg-config module names, tried in order
    modules: &'static [&'static str],
    /// Human-readable name
    label: &'static str,
    /// Only required when the target triple contains this string
    target: Option<&'static str>,
    /// Install hint printed when the library is missing
    hint: &'static str,
}

const NATIVE_LIBS: &[NativeLib] = &[
    NativeLib {
        modules: &["opencv4", "opencv"],
        label: "OpenCV",
        target: None,
        hint: "install libopencv-dev (Debian/Ubuntu) or opencv (Homebrew)",
    },
    NativeLib {
        modules: &["alsa"],
        label: "ALSA",
        target: Some("linux"),
        hint: "install libasound2-dev (Debian/Ubuntu); stimulus playback needs it",
    },
];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=PKG_CONFIG_PATH");
    println!("cargo:rerun-if-env-changed=OPENCV_LINK_PATHS");
    println!("cargo:rerun-if-env-changed=OPENCV_INCLUDE_PATHS");

    if pkg_config(&["--version"]).is_none() {
        println!("cargo:warning=pkg-config not found; native libraries cannot be located");
        return;
    }

    let target = env::var("TARGET").unwrap_or_default();
    for lib in NATIVE_LIBS {
        if lib.target.is_some_and(|t| !target.contains(t)) {
            continue;
        }
        let version = lib
            .modules
            .iter()
            .find_map(|module| pkg_config(&["--modversion", module]));
        match version {
            Some(version) => println!("cargo:warning=Found {} {}", lib.label, version),
            None => println!("cargo:warning={} not found: {}", lib.label, lib.hint),
        }
    }
}

/// Run pkg-config and return its trimmed stdout on success
fn pkg_config(args: &[&str]) -> Option<String> {
    let output = Command::new("pkg-config").args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}
