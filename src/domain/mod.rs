// Domain layer: audio models and ports. Nothing here talks to ffmpeg or the filesystem.

pub mod model;
pub mod ports;
