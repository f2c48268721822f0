//! Video assembly from the rendered frames.

/// `ffmpeg`-based MP4 output.
pub mod ffmpeg;

pub use ffmpeg::{VideoOpts, assemble_video, is_ffmpeg_on_path};
