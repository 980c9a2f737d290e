#![allow(dead_code)]

use audio_test::TomlConfig;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Stand-in for ffmpeg: concat appends every listed file, mix keeps the longest input.
const FAKE_FFMPEG: &str = r#"#!/bin/sh
mode=mix
inputs=""
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    -y) shift ;;
    -f) [ "$2" = "concat" ] && mode=concat; shift 2 ;;
    -i) inputs="$inputs
$2"; shift 2 ;;
    -safe|-c|-filter_complex) shift 2 ;;
    *) out="$1"; shift ;;
  esac
done
echo "fake ffmpeg $mode -> $out" >&2
: > "$out"
printf '%s\n' "$inputs" | while IFS= read -r f; do
  [ -n "$f" ] || continue
  if [ "$mode" = concat ]; then
    sed -n "s/^file '\(.*\)'\$/\1/p" "$f" | while IFS= read -r part; do
      cat "$part" >> "$out"
    done
  else
    new=$(wc -c < "$f")
    cur=$(wc -c < "$out")
    if [ $new -gt $cur ]; then
      cat "$f" > "$out"
    fi
  fi
done
"#;

const FAILING_FFMPEG: &str = r#"#!/bin/sh
echo "Invalid data found when processing input: $*" >&2
exit 1
"#;

pub const FIXTURES: &[(&str, &[u8])] = &[
    ("short_a.mp3", b"aa"),
    ("short_b.mp3", b"bbb"),
    ("mid_a.mp3", b"mmmm"),
    ("mid_b.mp3", b"nnnnn"),
    ("long_a.mp3", b"long-a-"),
    ("long_b.mp3", b"long-b-longer"),
];

pub struct TestEnv {
    pub root: TempDir,
    pub resources: PathBuf,
    pub outputs: PathBuf,
    pub work: PathBuf,
    pub ffmpeg: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_script(FAKE_FFMPEG)
    }

    pub fn with_failing_ffmpeg() -> Self {
        Self::with_script(FAILING_FFMPEG)
    }

    fn with_script(script: &str) -> Self {
        let root = TempDir::new().unwrap();
        let resources = root.path().join("resources");
        let outputs = root.path().join("outputs");
        let work = root.path().join("work");
        std::fs::create_dir_all(&resources).unwrap();
        std::fs::create_dir_all(&outputs).unwrap();

        for (name, data) in FIXTURES {
            std::fs::write(resources.join(name), data).unwrap();
        }

        let ffmpeg = root.path().join("fake-ffmpeg");
        write_executable(&ffmpeg, script);

        Self {
            root,
            resources,
            outputs,
            work,
            ffmpeg,
        }
    }

    pub fn config(&self) -> TomlConfig {
        let mut config = TomlConfig::default();
        config.ffmpeg.binary = self.ffmpeg.display().to_string();
        config.storage.resource_dir = self.resources.display().to_string();
        config.storage.output_dir = self.outputs.display().to_string();
        config.ffmpeg.work_dir = Some(self.work.display().to_string());
        config.flows.short_repetitions = 3;
        config.flows.mid_repetitions = 2;
        config
    }

    pub fn output(&self, name: &str) -> Vec<u8> {
        std::fs::read(self.outputs.join(name)).unwrap()
    }

    /// ffmpeg 工作目錄底下還留著的項目
    pub fn leftover_work_dirs(&self) -> Vec<String> {
        match std::fs::read_dir(&self.work) {
            Ok(entries) => entries
                .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

fn write_executable(path: &Path, script: &str) {
    std::fs::write(path, script).unwrap();
    let mut permissions = std::fs::metadata(path).unwrap().permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(path, permissions).unwrap();
}
