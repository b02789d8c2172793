use std::env;
use std::path::{Path, PathBuf};

const WATCHED_VARIABLES: [&str; 4] = ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"];

fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    if let Some(dir) = env::var_os("FFMPEG_DIR") {
        check_explicit_install(Path::new(&dir));
        return;
    }

    if env::var("CARGO_CFG_TARGET_OS").unwrap_or_default() == "windows" {
        hint_vcpkg_install();
    }
}

/// Warn when `FFMPEG_DIR` points somewhere without FFmpeg headers.
fn check_explicit_install(dir: &Path) {
    let header = dir.join("include").join("libavcodec").join("avcodec.h");
    if !header.exists() {
        println!(
            "cargo:warning=FFMPEG_DIR={} has no include/libavcodec/avcodec.h; ffmpeg-sys-next will likely fail to build.",
            dir.display()
        );
    }
}

fn hint_vcpkg_install() {
    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        println!(
            "cargo:warning=FFMPEG_DIR is not set. On Windows, install an FFmpeg build with libxevd and set FFMPEG_DIR (or VCPKG_ROOT)."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let ffmpeg_dir = PathBuf::from(&vcpkg_root).join("installed").join(&triplet);

    if ffmpeg_dir.exists() {
        println!(
            "cargo:warning=Detected vcpkg FFmpeg at {}. Set FFMPEG_DIR={} to make ffmpeg-sys-next discovery explicit; the default decoder also needs libxevd.",
            ffmpeg_dir.display(),
            ffmpeg_dir.display(),
        );
        if env::var_os("VCPKGRS_DYNAMIC").is_none() {
            println!(
                "cargo:warning=Consider setting VCPKGRS_DYNAMIC=1 when using vcpkg dynamic FFmpeg builds on Windows."
            );
        }
    } else {
        println!(
            "cargo:warning=VCPKG_ROOT is set but no FFmpeg install was found at {}.",
            ffmpeg_dir.display(),
        );
    }
}
