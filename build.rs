//! Build-time hints for locating FFmpeg.
//!
//! Linking itself is done by `ffmpeg-sys-next` (pulled in by `ffmpeg-next`);
//! this script only warns early when the environment is unlikely to work.

use std::{
    env,
    path::{Path, PathBuf},
};

fn main() {
    for var in ["FFMPEG_DIR", "PKG_CONFIG_PATH", "VCPKG_ROOT", "VCPKGRS_TRIPLET"] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    if let Some(dir) = env::var_os("FFMPEG_DIR") {
        check_ffmpeg_dir(Path::new(&dir));
        return;
    }

    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("windows") {
        suggest_vcpkg();
    }
}

/// `FFMPEG_DIR` must hold `include/libavcodec` and a `lib` directory.
fn check_ffmpeg_dir(dir: &Path) {
    if !dir.join("include").join("libavcodec").is_dir() {
        println!(
            "cargo:warning=FFMPEG_DIR={} has no include/libavcodec; FFmpeg headers will not be found.",
            dir.display()
        );
    }
    if !dir.join("lib").is_dir() {
        println!(
            "cargo:warning=FFMPEG_DIR={} has no lib directory; linking will likely fail.",
            dir.display()
        );
    }
}

fn suggest_vcpkg() {
    let Ok(root) = env::var("VCPKG_ROOT") else {
        println!(
            "cargo:warning=Neither FFMPEG_DIR nor VCPKG_ROOT is set. Install FFmpeg with vcpkg and point FFMPEG_DIR at the installed triplet."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let candidate: PathBuf = [root.as_str(), "installed", triplet.as_str()].iter().collect();

    if candidate.is_dir() {
        println!(
            "cargo:warning=Found FFmpeg under {}; set FFMPEG_DIR to this path to use it.",
            candidate.display()
        );
    } else {
        println!(
            "cargo:warning=VCPKG_ROOT is set but {} does not exist. Run `vcpkg install ffmpeg:{triplet}`.",
            candidate.display()
        );
    }
}
