//! Shell scripts standing in for `magick` and `ffmpeg`.
//!
//! Frames are small text files. Equal contents mean identical frames.
//! Special contents: `fail` makes the tool error out, `hang` makes it
//! sleep, and `exit3` makes `magick` print a value but exit with code 3.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::TempDir;

/// MSE reported for frames with different contents
pub const FAKE_MSE: f64 = 0.02;
/// SSIM reported for frames with different contents
pub const FAKE_SSIM: f64 = 0.5;

// `compare -metric MSE -format %[distortion] A B [-crop G] info:`
// or, for cropping, `<in> -crop G +repage <out>` (keeps the first byte).
const MAGICK: &str = r#"#!/bin/sh
if [ "$1" = "compare" ]; then
  a=$(cat "$6") || exit 2
  b=$(cat "$7") || exit 2
  if [ "$a" = "fail" ] || [ "$b" = "fail" ]; then
    echo "compare: unable to read image data" >&2
    exit 2
  fi
  if [ "$a" = "hang" ] || [ "$b" = "hang" ]; then
    exec sleep 30
  fi
  if [ "$a" = "exit3" ] || [ "$b" = "exit3" ]; then
    printf '0'
    exit 3
  fi
  if [ "$a" = "$b" ]; then
    printf '0'
    exit 0
  fi
  printf '0.02'
  exit 1
fi
head -c 1 "$1" > "$5" || exit 1
"#;

// `-hide_banner -nostats -i A -i B -filter_complex G -f null -`
const FFMPEG: &str = r#"#!/bin/sh
a=$(cat "$4") || exit 1
b=$(cat "$6") || exit 1
if [ "$a" = "fail" ] || [ "$b" = "fail" ]; then
  echo "Error while decoding stream #0:0" >&2
  exit 1
fi
if [ "$a" = "hang" ] || [ "$b" = "hang" ]; then
  exec sleep 30
fi
echo "[Parsed_ssim_2 @ 0x0] graph: $8" >&2
if [ "$a" = "$b" ]; then
  echo "[Parsed_ssim_2 @ 0x0] SSIM Y:1.000000 (inf) All:1.000000 (inf)" >&2
else
  echo "[Parsed_ssim_2 @ 0x0] SSIM Y:0.500000 (3.010300) All:0.500000 (3.010300)" >&2
fi
"#;

pub struct FakeTools {
    _dir: TempDir,
    pub magick: PathBuf,
    pub ffmpeg: PathBuf,
}

/// Written once per test binary so no script is open for writing while
/// another test spawns a process.
pub fn fake_tools() -> &'static FakeTools {
    static TOOLS: OnceLock<FakeTools> = OnceLock::new();
    TOOLS.get_or_init(|| {
        let dir = TempDir::new().unwrap();
        let magick = write_script(dir.path(), "magick", MAGICK);
        let ffmpeg = write_script(dir.path(), "ffmpeg", FFMPEG);
        FakeTools {
            _dir: dir,
            magick,
            ffmpeg,
        }
    })
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A directory of `img{i}.png` frames with the given contents
pub fn frames(contents: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (i, content) in contents.iter().enumerate() {
        fs::write(dir.path().join(format!("img{i}.png")), content).unwrap();
    }
    dir
}

pub fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}
